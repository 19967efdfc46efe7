use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::error::{Error, Result};
use crate::models::{RecurringTransaction, Schedule, TransactionTemplate};

const RECURRING_COLUMNS: &str = "id, name, next_occurs, category, amount, note, account_id, \
     schedule_type, interval_seconds, day_of, seconds_before_to_post";

/// Raw row image of a recurring transaction; the schedule is still the
/// flattened tag plus two nullable columns.
struct RecurringRow {
    id: i64,
    name: String,
    next_occurs: DateTime<Utc>,
    category: Option<String>,
    amount: i64,
    note: Option<String>,
    account_id: i64,
    schedule_type: String,
    interval_seconds: Option<i64>,
    day_of: Option<i64>,
    seconds_before_to_post: i64,
}

impl RecurringRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(RecurringRow {
            id: row.get(0)?,
            name: row.get(1)?,
            next_occurs: row.get(2)?,
            category: row.get(3)?,
            amount: row.get(4)?,
            note: row.get(5)?,
            account_id: row.get(6)?,
            schedule_type: row.get(7)?,
            interval_seconds: row.get(8)?,
            day_of: row.get(9)?,
            seconds_before_to_post: row.get(10)?,
        })
    }

    fn into_recurring(self) -> Result<RecurringTransaction> {
        let schedule =
            Schedule::from_parts(&self.schedule_type, self.interval_seconds, self.day_of)
                .map_err(|reason| Error::CorruptRule { id: self.id, reason })?;
        Ok(RecurringTransaction {
            id: self.id,
            template: TransactionTemplate {
                name: self.name,
                category: self.category,
                amount: self.amount,
                note: self.note,
                account_id: self.account_id,
            },
            schedule,
            next_occurs: self.next_occurs,
            seconds_before_to_post: self.seconds_before_to_post,
        })
    }
}

fn validate(recurring: &RecurringTransaction) -> Result<()> {
    recurring.schedule.validate().map_err(Error::InvalidRule)?;
    if recurring.seconds_before_to_post < 0 {
        return Err(Error::InvalidRule(format!(
            "seconds_before_to_post must be non-negative, got {}",
            recurring.seconds_before_to_post
        )));
    }
    Ok(())
}

/// Insert a new rule. The anchor date is snapped forward to the first
/// occurrence that satisfies the schedule; an anchor already on schedule
/// stays where it is.
pub fn create_recurring(conn: &Connection, recurring: &mut RecurringTransaction) -> Result<()> {
    validate(recurring)?;
    recurring.next_occurs = recurring.schedule.next_occurrence(recurring.next_occurs, true);

    let (schedule_type, interval_seconds, day_of) = recurring.schedule.to_parts();
    conn.execute(
        "INSERT INTO recurring_transactions (name, next_occurs, category, amount, note, account_id, \
         schedule_type, interval_seconds, day_of, seconds_before_to_post) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            recurring.template.name,
            recurring.next_occurs,
            recurring.template.category,
            recurring.template.amount,
            recurring.template.note,
            recurring.template.account_id,
            schedule_type,
            interval_seconds,
            day_of,
            recurring.seconds_before_to_post,
        ],
    )?;
    recurring.id = conn.last_insert_rowid();
    Ok(())
}

/// Update a rule in place, re-snapping its date exactly like create.
pub fn update_recurring(conn: &Connection, recurring: &mut RecurringTransaction) -> Result<()> {
    validate(recurring)?;
    recurring.next_occurs = recurring.schedule.next_occurrence(recurring.next_occurs, true);

    let (schedule_type, interval_seconds, day_of) = recurring.schedule.to_parts();
    conn.execute(
        "UPDATE recurring_transactions SET name = ?1, next_occurs = ?2, category = ?3, \
         amount = ?4, note = ?5, account_id = ?6, schedule_type = ?7, interval_seconds = ?8, \
         day_of = ?9, seconds_before_to_post = ?10 WHERE id = ?11",
        params![
            recurring.template.name,
            recurring.next_occurs,
            recurring.template.category,
            recurring.template.amount,
            recurring.template.note,
            recurring.template.account_id,
            schedule_type,
            interval_seconds,
            day_of,
            recurring.seconds_before_to_post,
            recurring.id,
        ],
    )?;
    Ok(())
}

/// Advance only the next-occurrence pointer. The generation engine's one
/// write to a rule: nothing else about it changes while posting.
pub(crate) fn advance_recurring(
    conn: &Connection,
    id: i64,
    next_occurs: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "UPDATE recurring_transactions SET next_occurs = ?1 WHERE id = ?2",
        params![next_occurs, id],
    )?;
    Ok(())
}

/// Delete a rule. Transactions it already generated are ordinary rows and
/// stay behind.
pub fn delete_recurring(conn: &Connection, id: i64) -> Result<()> {
    conn.execute(
        "DELETE FROM recurring_transactions WHERE id = ?1",
        params![id],
    )?;
    Ok(())
}

/// Fetch the recurring transactions attached to one account.
pub fn get_recurring(conn: &Connection, account_id: i64) -> Result<Vec<RecurringTransaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECURRING_COLUMNS} FROM recurring_transactions WHERE account_id = ?1 ORDER BY name"
    ))?;
    let rows = stmt.query_map(params![account_id], RecurringRow::from_row)?;
    collect(rows)
}

pub fn get_all_recurring(conn: &Connection) -> Result<Vec<RecurringTransaction>> {
    let mut stmt =
        conn.prepare(&format!("SELECT {RECURRING_COLUMNS} FROM recurring_transactions"))?;
    let rows = stmt.query_map([], RecurringRow::from_row)?;
    collect(rows)
}

/// Every rule whose due window (`next_occurs - seconds_before_to_post`)
/// has passed. Read-only; the batch runs it inside its own transaction
/// for a consistent snapshot.
pub fn select_due(conn: &Connection, now: DateTime<Utc>) -> Result<Vec<RecurringTransaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECURRING_COLUMNS} FROM recurring_transactions \
         WHERE datetime(next_occurs, (-seconds_before_to_post) || ' seconds') <= datetime(?1)"
    ))?;
    let rows = stmt.query_map(params![now], RecurringRow::from_row)?;
    collect(rows)
}

fn collect(
    rows: impl Iterator<Item = rusqlite::Result<RecurringRow>>,
) -> Result<Vec<RecurringTransaction>> {
    let mut recurring = Vec::new();
    for row in rows {
        recurring.push(row?.into_recurring()?);
    }
    Ok(recurring)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::models::Account;
    use chrono::{Datelike, Duration, TimeZone, Weekday};

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        conn
    }

    fn test_account(conn: &Connection) -> i64 {
        let mut account = Account {
            id: 0,
            name: "Checking".to_string(),
            currency: "USD".to_string(),
            created_at: String::new(),
        };
        crate::accounts::create_account(conn, &mut account).unwrap();
        account.id
    }

    fn test_rule(
        account_id: i64,
        schedule: Schedule,
        next_occurs: DateTime<Utc>,
    ) -> RecurringTransaction {
        RecurringTransaction {
            id: 0,
            template: TransactionTemplate {
                name: "Rent".to_string(),
                category: Some("Housing".to_string()),
                amount: -120_000,
                note: Some("monthly rent".to_string()),
                account_id,
            },
            schedule,
            next_occurs,
            seconds_before_to_post: 0,
        }
    }

    #[test]
    fn create_rejects_invalid_rules() {
        let conn = test_db();
        let account_id = test_account(&conn);
        let anchor = Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap();

        let bad_schedules = [
            Schedule::FixedInterval { interval_seconds: 0 },
            Schedule::FixedInterval { interval_seconds: -86_400 },
            Schedule::FixedDayOfWeek { day_of: 7 },
            Schedule::FixedDayOfMonth { day_of: 32 },
            Schedule::FixedDayOfYear { day_of: 0 },
        ];
        for schedule in bad_schedules {
            let mut rule = test_rule(account_id, schedule, anchor);
            let err = create_recurring(&conn, &mut rule).unwrap_err();
            assert!(matches!(err, Error::InvalidRule(_)), "{:?}", schedule);
        }

        let mut rule = test_rule(
            account_id,
            Schedule::FixedInterval { interval_seconds: 60 },
            anchor,
        );
        rule.seconds_before_to_post = -1;
        assert!(matches!(
            create_recurring(&conn, &mut rule).unwrap_err(),
            Error::InvalidRule(_)
        ));
        assert!(get_all_recurring(&conn).unwrap().is_empty());
    }

    #[test]
    fn create_keeps_interval_anchor_unchanged() {
        let conn = test_db();
        let account_id = test_account(&conn);
        let anchor = Utc.with_ymd_and_hms(2025, 2, 17, 12, 0, 0).unwrap();

        let mut rule = test_rule(
            account_id,
            Schedule::FixedInterval {
                interval_seconds: 12 * 86_400,
            },
            anchor,
        );
        create_recurring(&conn, &mut rule).unwrap();
        assert_eq!(rule.next_occurs, anchor);

        let stored = get_recurring(&conn, account_id).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0], rule);
    }

    #[test]
    fn create_snaps_weekday_anchor_forward() {
        let conn = test_db();
        let account_id = test_account(&conn);
        // 2025-02-17 is a Monday; the rule wants Tuesdays (2).
        let anchor = Utc.with_ymd_and_hms(2025, 2, 17, 12, 0, 0).unwrap();

        let mut rule = test_rule(account_id, Schedule::FixedDayOfWeek { day_of: 2 }, anchor);
        create_recurring(&conn, &mut rule).unwrap();

        assert_eq!(rule.next_occurs.weekday(), Weekday::Tue);
        assert!(rule.next_occurs >= anchor);
        assert!(rule.next_occurs < anchor + Duration::days(7));

        let stored = get_recurring(&conn, account_id).unwrap();
        assert_eq!(stored[0].next_occurs, rule.next_occurs);
    }

    #[test]
    fn update_and_delete_round_trip() {
        let conn = test_db();
        let account_id = test_account(&conn);
        let anchor = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();

        let mut rule = test_rule(account_id, Schedule::FixedDayOfMonth { day_of: 1 }, anchor);
        create_recurring(&conn, &mut rule).unwrap();

        rule.template.amount = -130_000;
        rule.schedule = Schedule::FixedDayOfMonth { day_of: 15 };
        update_recurring(&conn, &mut rule).unwrap();
        // re-snap moved the date onto the new schedule
        assert_eq!(rule.next_occurs, Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap());

        let stored = get_all_recurring(&conn).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].template.amount, -130_000);
        assert_eq!(stored[0].schedule, Schedule::FixedDayOfMonth { day_of: 15 });

        delete_recurring(&conn, rule.id).unwrap();
        assert!(get_all_recurring(&conn).unwrap().is_empty());
    }

    #[test]
    fn select_due_honors_lead_time() {
        let conn = test_db();
        let account_id = test_account(&conn);
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap();

        // due exactly at now
        let mut at_now = test_rule(
            account_id,
            Schedule::FixedInterval { interval_seconds: 86_400 },
            now,
        );
        create_recurring(&conn, &mut at_now).unwrap();

        // a day out, no lead: not due
        let mut tomorrow = test_rule(
            account_id,
            Schedule::FixedInterval { interval_seconds: 86_400 },
            now + Duration::days(1),
        );
        create_recurring(&conn, &mut tomorrow).unwrap();

        // a day out with a two-day lead window: due
        let mut early = test_rule(
            account_id,
            Schedule::FixedInterval { interval_seconds: 86_400 },
            now + Duration::days(1),
        );
        early.seconds_before_to_post = 2 * 86_400;
        create_recurring(&conn, &mut early).unwrap();

        let due: Vec<i64> = select_due(&conn, now).unwrap().iter().map(|r| r.id).collect();
        assert!(due.contains(&at_now.id));
        assert!(due.contains(&early.id));
        assert!(!due.contains(&tomorrow.id));
    }

    #[test]
    fn corrupt_schedule_surfaces_as_corrupt_rule() {
        let conn = test_db();
        let account_id = test_account(&conn);
        let anchor = Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap();

        let mut rule = test_rule(
            account_id,
            Schedule::FixedInterval { interval_seconds: 86_400 },
            anchor,
        );
        create_recurring(&conn, &mut rule).unwrap();
        conn.execute(
            "UPDATE recurring_transactions SET schedule_type = 'every_other_blue_moon' WHERE id = ?1",
            params![rule.id],
        )
        .unwrap();

        let err = get_all_recurring(&conn).unwrap_err();
        match err {
            Error::CorruptRule { id, .. } => assert_eq!(id, rule.id),
            other => panic!("expected CorruptRule, got {:?}", other),
        }
    }
}
