use rusqlite::{OptionalExtension, params};
use tracing::info;

use super::{ArtifactStore, StoreError, StoreResult};

impl ArtifactStore {
    pub async fn credit_balance(&self, user_id: &str) -> StoreResult<i64> {
        let db = self.db.lock().await;
        let balance = db
            .query_row(
                "SELECT balance FROM user_credits WHERE user_id = ?1",
                params![user_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(balance.unwrap_or(0))
    }

    /// Add credits and return the new balance.
    pub async fn grant_credits(&self, user_id: &str, amount: i64, reason: &str) -> StoreResult<i64> {
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;
        tx.execute(
            "INSERT INTO user_credits (user_id, balance) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET
                 balance = balance + excluded.balance,
                 updated_at = CURRENT_TIMESTAMP",
            params![user_id, amount],
        )?;
        tx.execute(
            "INSERT INTO credit_ledger (user_id, delta, reason) VALUES (?1, ?2, ?3)",
            params![user_id, amount, reason],
        )?;
        let balance = tx.query_row(
            "SELECT balance FROM user_credits WHERE user_id = ?1",
            params![user_id],
            |row| row.get::<_, i64>(0),
        )?;
        tx.commit()?;
        info!("Granted {} credits to {} (balance {})", amount, user_id, balance);
        Ok(balance)
    }

    /// Take one credit. Fails without side effects when the balance is zero.
    pub async fn deduct_credit(&self, user_id: &str, reason: &str) -> StoreResult<i64> {
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;
        let changed = tx.execute(
            "UPDATE user_credits SET balance = balance - 1, updated_at = CURRENT_TIMESTAMP
             WHERE user_id = ?1 AND balance > 0",
            params![user_id],
        )?;
        if changed == 0 {
            let balance = tx
                .query_row(
                    "SELECT balance FROM user_credits WHERE user_id = ?1",
                    params![user_id],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?
                .unwrap_or(0);
            return Err(StoreError::InsufficientCredits {
                user_id: user_id.to_string(),
                balance,
            });
        }
        tx.execute(
            "INSERT INTO credit_ledger (user_id, delta, reason) VALUES (?1, -1, ?2)",
            params![user_id, reason],
        )?;
        let balance = tx.query_row(
            "SELECT balance FROM user_credits WHERE user_id = ?1",
            params![user_id],
            |row| row.get::<_, i64>(0),
        )?;
        tx.commit()?;
        Ok(balance)
    }
}
