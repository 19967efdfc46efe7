mod accounts;
mod db;
mod engine;
mod error;
mod models;
mod recurring;
mod schedule;
mod transactions;

// Re-export the data model
pub use models::{Account, RecurringTransaction, Schedule, Transaction, TransactionTemplate};

// Re-export errors
pub use error::{Error, Result};

// Re-export database helpers
pub use db::{default_db_path, init_db, open_db};

// Re-export account functions
pub use accounts::{create_account, get_accounts};

// Re-export transaction functions
pub use transactions::{create_transaction, get_transactions};

// Re-export recurring-rule functions
pub use recurring::{
    create_recurring, delete_recurring, get_all_recurring, get_recurring, select_due,
    update_recurring,
};

// Re-export the generation engine
pub use engine::{catch_up, post_due_recurring, BatchOutcome};
