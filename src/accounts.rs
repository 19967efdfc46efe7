use rusqlite::{params, Connection};

use crate::error::Result;
use crate::models::Account;

/// Insert a new account and assign its id.
pub fn create_account(conn: &Connection, account: &mut Account) -> Result<()> {
    conn.execute(
        "INSERT INTO accounts (name, currency) VALUES (?1, ?2)",
        params![account.name, account.currency],
    )?;
    account.id = conn.last_insert_rowid();
    Ok(())
}

pub fn get_accounts(conn: &Connection) -> Result<Vec<Account>> {
    let mut stmt =
        conn.prepare("SELECT id, name, currency, created_at FROM accounts ORDER BY name")?;
    let rows = stmt.query_map([], |row| {
        Ok(Account {
            id: row.get(0)?,
            name: row.get(1)?,
            currency: row.get(2)?,
            created_at: row.get(3)?,
        })
    })?;

    let mut accounts = Vec::new();
    for account in rows {
        accounts.push(account?);
    }
    Ok(accounts)
}
