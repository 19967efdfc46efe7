use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use serde::Serialize;

use crate::error::Result;
use crate::models::{RecurringTransaction, Transaction};
use crate::{recurring, transactions};

/// What one batch run accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub rules_processed: usize,
    pub transactions_posted: usize,
}

/// Generate everything a rule owes as of `now`.
///
/// A pure fold: returns the advanced rule plus one transaction per due
/// occurrence, oldest first, without touching storage. Each emitted
/// transaction carries the occurrence date the rule pointed at when it
/// was generated, not the date the rule ends up on. The loop terminates
/// because `next_occurrence` without same-day strictly advances the date.
pub fn catch_up(
    rule: &RecurringTransaction,
    now: DateTime<Utc>,
) -> (RecurringTransaction, Vec<Transaction>) {
    let mut rule = rule.clone();
    let mut emitted = Vec::new();
    while rule.next_occurs - Duration::seconds(rule.seconds_before_to_post) < now {
        emitted.push(rule.template.materialize(rule.next_occurs));
        rule.next_occurs = rule.schedule.next_occurrence(rule.next_occurs, false);
    }
    (rule, emitted)
}

/// Post every due recurring transaction and advance each rule past what
/// it generated, all in one database transaction.
///
/// A rule's generated transactions and its pointer advance commit
/// together: a failure anywhere rolls back the entire batch, and the next
/// scheduled run re-selects the same rules and resumes from the committed
/// state. No retry happens here.
pub fn post_due_recurring(conn: &mut Connection, now: DateTime<Utc>) -> Result<BatchOutcome> {
    let tx = conn.transaction()?;
    let due = recurring::select_due(&tx, now)?;
    log::debug!("{} recurring transactions due at {}", due.len(), now);

    let mut outcome = BatchOutcome::default();
    for rule in &due {
        let (advanced, generated) = catch_up(rule, now);
        log::debug!(
            "recurring transaction {} owes {} transactions, next occurrence {}",
            rule.id,
            generated.len(),
            advanced.next_occurs
        );
        for mut transaction in generated {
            if let Err(err) = transactions::create_transaction(&tx, &mut transaction) {
                log::error!(
                    "failed to post transaction dated {} for recurring transaction {}: {}",
                    transaction.date,
                    rule.id,
                    err
                );
                return Err(err);
            }
            outcome.transactions_posted += 1;
        }
        if let Err(err) = recurring::advance_recurring(&tx, advanced.id, advanced.next_occurs) {
            log::error!(
                "failed to advance recurring transaction {} to {}: {}",
                rule.id,
                advanced.next_occurs,
                err
            );
            return Err(err);
        }
        outcome.rules_processed += 1;
    }

    if let Err(err) = tx.commit() {
        log::error!("failed to commit recurring transaction batch: {}", err);
        return Err(err.into());
    }
    Ok(outcome)
}
