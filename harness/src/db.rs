//! Promotions table access
//!
//! The service under test records every credit award in `promotions`; the
//! harness seeds rows to simulate prior state and queries them to assert
//! awards. Pre-scenario cleanup deletes rows by the user ids a scenario
//! owns, never the whole table.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};

use shared::HarnessResult;

#[derive(Debug, Clone, PartialEq)]
pub struct PromotionRow {
    pub user_id: i64,
    pub promotion_id: String,
    pub created_at: DateTime<Utc>,
    pub credited_amount: f64,
}

/// Shared handle to the promotions database.
#[derive(Clone)]
pub struct PromotionsStore {
    conn: Arc<Mutex<Connection>>,
}

impl PromotionsStore {
    /// Open a database at the given path, creating the table if needed.
    pub fn open(path: &Path) -> HarnessResult<Self> {
        Self::initialize(Connection::open(path)?)
    }

    /// Open an in-memory database.
    pub fn open_in_memory() -> HarnessResult<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> HarnessResult<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS promotions (
                user_id INTEGER NOT NULL,
                promotion_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                credited_amount REAL NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn insert(&self, row: &PromotionRow) -> HarnessResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO promotions (user_id, promotion_id, created_at, credited_amount)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                row.user_id,
                row.promotion_id,
                row.created_at.to_rfc3339(),
                row.credited_amount
            ],
        )?;
        Ok(())
    }

    pub fn rows_for_user(&self, user_id: i64) -> HarnessResult<Vec<PromotionRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, promotion_id, created_at, credited_amount
             FROM promotions WHERE user_id = ?1 ORDER BY created_at",
        )?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                let created_at: String = row.get(2)?;
                let created_at = DateTime::parse_from_rfc3339(&created_at)
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            2,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?
                    .with_timezone(&Utc);
                Ok(PromotionRow {
                    user_id: row.get(0)?,
                    promotion_id: row.get(1)?,
                    created_at,
                    credited_amount: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Delete every row for a user; returns how many went away.
    pub fn delete_for_user(&self, user_id: i64) -> HarnessResult<usize> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM promotions WHERE user_id = ?1", params![user_id])?;
        Ok(deleted)
    }

    /// Sum of every credited amount across all users.
    pub fn total_credited(&self) -> HarnessResult<f64> {
        let conn = self.conn.lock().unwrap();
        let total = conn.query_row(
            "SELECT COALESCE(SUM(credited_amount), 0) FROM promotions",
            [],
            |row| row.get(0),
        )?;
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(user_id: i64, amount: f64) -> PromotionRow {
        PromotionRow {
            user_id,
            promotion_id: "account_credit_hudl2".to_string(),
            created_at: Utc::now(),
            credited_amount: amount,
        }
    }

    #[test]
    fn insert_then_query_roundtrips() {
        let store = PromotionsStore::open_in_memory().unwrap();
        let inserted = row(123, 10.0);
        store.insert(&inserted).unwrap();

        let rows = store.rows_for_user(123).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].promotion_id, "account_credit_hudl2");
        assert_eq!(rows[0].credited_amount, 10.0);
        assert_eq!(
            rows[0].created_at.timestamp(),
            inserted.created_at.timestamp()
        );
    }

    #[test]
    fn delete_removes_only_the_given_user() {
        let store = PromotionsStore::open_in_memory().unwrap();
        store.insert(&row(123, 10.0)).unwrap();
        store.insert(&row(124, 350000.0)).unwrap();

        assert_eq!(store.delete_for_user(123).unwrap(), 1);
        assert!(store.rows_for_user(123).unwrap().is_empty());
        assert_eq!(store.rows_for_user(124).unwrap().len(), 1);
    }

    #[test]
    fn total_credited_sums_across_users() {
        let store = PromotionsStore::open_in_memory().unwrap();
        assert_eq!(store.total_credited().unwrap(), 0.0);

        store.insert(&row(123, 10.0)).unwrap();
        store.insert(&row(124, 350000.0)).unwrap();
        assert_eq!(store.total_credited().unwrap(), 350010.0);
    }
}
