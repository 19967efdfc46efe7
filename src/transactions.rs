use rusqlite::{params, Connection};

use crate::error::Result;
use crate::models::Transaction;

/// Insert a transaction and assign its id. The generation engine calls
/// this once per occurrence; the insert is acknowledged before the rule's
/// pointer advances past the date.
pub fn create_transaction(conn: &Connection, transaction: &mut Transaction) -> Result<()> {
    conn.execute(
        "INSERT INTO transactions (name, occurred, category, amount, note, account_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            transaction.name,
            transaction.date,
            transaction.category,
            transaction.amount,
            transaction.note,
            transaction.account_id,
        ],
    )?;
    transaction.id = conn.last_insert_rowid();
    Ok(())
}

/// Fetch an account's transactions, newest first.
pub fn get_transactions(conn: &Connection, account_id: i64) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, occurred, category, amount, note, account_id
         FROM transactions WHERE account_id = ?1 ORDER BY occurred DESC, id",
    )?;
    let rows = stmt.query_map(params![account_id], |row| {
        Ok(Transaction {
            id: row.get(0)?,
            name: row.get(1)?,
            date: row.get(2)?,
            category: row.get(3)?,
            amount: row.get(4)?,
            note: row.get(5)?,
            account_id: row.get(6)?,
        })
    })?;

    let mut transactions = Vec::new();
    for transaction in rows {
        transactions.push(transaction?);
    }
    Ok(transactions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::models::Account;
    use chrono::{TimeZone, Utc};

    #[test]
    fn create_and_list_transactions() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();

        let mut account = Account {
            id: 0,
            name: "Checking".to_string(),
            currency: "USD".to_string(),
            created_at: String::new(),
        };
        crate::accounts::create_account(&conn, &mut account).unwrap();

        let mut transaction = Transaction {
            id: 0,
            name: "Rent".to_string(),
            date: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
            category: Some("Housing".to_string()),
            amount: -120_000,
            note: None,
            account_id: account.id,
        };
        create_transaction(&conn, &mut transaction).unwrap();
        assert!(transaction.id > 0);

        let listed = get_transactions(&conn, account.id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], transaction);
    }
}
