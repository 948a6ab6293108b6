use rusqlite::{OptionalExtension, params};
use sha2::{Digest, Sha256};

use super::types::ApiTokenRecord;
use super::{ArtifactStore, StoreError, StoreResult};

pub const TOKEN_PREFIX: &str = "jmp_";

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn generate_raw_token() -> String {
    let bytes: [u8; 16] = rand::random();
    format!("{}{}", TOKEN_PREFIX, hex::encode(bytes))
}

impl ArtifactStore {
    /// Mint a bearer token for `user_id`. Only the hash is stored; the raw
    /// token is returned once.
    pub async fn create_api_token(&self, user_id: &str, name: &str) -> StoreResult<(String, ApiTokenRecord)> {
        let raw_token = generate_raw_token();
        let token_hash = hash_token(&raw_token);
        let id = uuid::Uuid::new_v4().to_string();

        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO api_tokens (id, user_id, name, token_hash) VALUES (?1, ?2, ?3, ?4)",
            params![id, user_id, name, token_hash],
        )?;

        let created_at = db.query_row(
            "SELECT created_at FROM api_tokens WHERE id = ?1",
            params![id],
            |row| row.get::<_, String>(0),
        )?;

        Ok((
            raw_token,
            ApiTokenRecord {
                id,
                user_id: user_id.to_string(),
                name: name.to_string(),
                created_at,
            },
        ))
    }

    pub async fn list_api_tokens(&self, user_id: &str) -> StoreResult<Vec<ApiTokenRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT id, user_id, name, created_at FROM api_tokens WHERE user_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok(ApiTokenRecord {
                id: row.get(0)?,
                user_id: row.get(1)?,
                name: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;
        let mut tokens = Vec::new();
        for row in rows {
            tokens.push(row?);
        }
        Ok(tokens)
    }

    pub async fn delete_api_token(&self, id: &str) -> StoreResult<()> {
        let db = self.db.lock().await;
        let rows = db.execute("DELETE FROM api_tokens WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("token {id}")));
        }
        Ok(())
    }

    /// Resolve a raw bearer token to its user. `None` when unknown.
    pub async fn user_for_token(&self, raw_token: &str) -> StoreResult<Option<String>> {
        if !raw_token.starts_with(TOKEN_PREFIX) {
            return Ok(None);
        }
        let token_hash = hash_token(raw_token);
        let db = self.db.lock().await;
        let user = db
            .query_row(
                "SELECT user_id FROM api_tokens WHERE token_hash = ?1",
                params![token_hash],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(user)
    }
}
