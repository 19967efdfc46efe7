use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::error::Result;

/// Default on-disk database location: the platform data directory under
/// the product name.
pub fn default_db_path() -> PathBuf {
    let base_dir = dirs::data_dir().expect("failed to resolve platform data dir");
    let app_dir = base_dir.join("MoneyBook");
    fs::create_dir_all(&app_dir).expect("failed to create app data dir");
    app_dir.join("moneybook.db")
}

/// Open a database and make sure the schema exists.
pub fn open_db<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let conn = Connection::open(path)?;
    init_db(&conn)?;
    Ok(conn)
}

/// Initialize the database schema if not exists.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;
    CREATE TABLE IF NOT EXISTS accounts (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      name TEXT NOT NULL,
      currency TEXT NOT NULL DEFAULT 'USD',
      created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
    CREATE TABLE IF NOT EXISTS transactions (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      name TEXT NOT NULL,
      occurred TEXT NOT NULL,
      category TEXT,
      amount INTEGER NOT NULL,
      note TEXT,
      account_id INTEGER NOT NULL,
      FOREIGN KEY (account_id) REFERENCES accounts (id) ON DELETE CASCADE
    );
    CREATE TABLE IF NOT EXISTS recurring_transactions (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      name TEXT NOT NULL,
      next_occurs TEXT NOT NULL,
      category TEXT,
      amount INTEGER NOT NULL,
      note TEXT,
      account_id INTEGER NOT NULL,
      schedule_type TEXT NOT NULL,
      interval_seconds INTEGER,
      day_of INTEGER,
      seconds_before_to_post INTEGER NOT NULL DEFAULT 0,
      FOREIGN KEY (account_id) REFERENCES accounts (id) ON DELETE CASCADE
    );
  "#,
    )?;
    Ok(())
}
