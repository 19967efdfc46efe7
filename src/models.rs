use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Account {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub currency: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Transaction {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub date: DateTime<Utc>,
    pub category: Option<String>,
    /// Signed amount in minor currency units (cents).
    pub amount: i64,
    pub note: Option<String>,
    pub account_id: i64,
}

/// The transaction fields a recurring rule stamps onto every generated
/// transaction. A snapshot: generation never mutates it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TransactionTemplate {
    pub name: String,
    pub category: Option<String>,
    pub amount: i64,
    pub note: Option<String>,
    pub account_id: i64,
}

impl TransactionTemplate {
    /// Stamp out a concrete transaction for one due date.
    pub fn materialize(&self, date: DateTime<Utc>) -> Transaction {
        Transaction {
            id: 0,
            name: self.name.clone(),
            date,
            category: self.category.clone(),
            amount: self.amount,
            note: self.note.clone(),
            account_id: self.account_id,
        }
    }
}

/// When a recurring transaction repeats. Each variant carries only the
/// parameter it needs, so a rule with a mismatched schedule field cannot
/// be represented.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "schedule_type", rename_all = "snake_case")]
pub enum Schedule {
    /// A fixed number of seconds between occurrences.
    FixedInterval { interval_seconds: i64 },
    /// Weekly on a weekday, 0 = Sunday through 6 = Saturday.
    FixedDayOfWeek { day_of: u32 },
    /// Monthly on a day 1-31; months shorter than `day_of` clamp to their
    /// last day.
    FixedDayOfMonth { day_of: u32 },
    /// Yearly on a day-of-year 1-366, leap-year aware.
    FixedDayOfYear { day_of: u32 },
}

/// A user-defined rule that periodically generates transactions.
///
/// `next_occurs` starts at the rule's anchor date and is advanced by the
/// engine past every occurrence it posts; it always points at the next
/// unposted occurrence. The rule is due once
/// `next_occurs - seconds_before_to_post` has passed.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RecurringTransaction {
    #[serde(default)]
    pub id: i64,
    pub template: TransactionTemplate,
    #[serde(flatten)]
    pub schedule: Schedule,
    pub next_occurs: DateTime<Utc>,
    pub seconds_before_to_post: i64,
}
