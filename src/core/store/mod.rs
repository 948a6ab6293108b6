mod credits;
mod jumps;
mod tokens;
pub mod types;

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

pub use types::{ApiTokenRecord, JumpRecord, JumpSummary, StoredComponent};

/// Owner recorded for requests without a valid bearer token.
pub const GUEST_USER: &str = "guest";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("insufficient credits for {user_id} (balance {balance})")]
    InsufficientCredits { user_id: String, balance: i64 },
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("stored JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Relational home of generated Jumps, their components, API tokens and
/// credit balances. One SQLite connection shared behind an async mutex.
#[derive(Clone)]
pub struct ArtifactStore {
    db: Arc<Mutex<Connection>>,
}

impl ArtifactStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        info!("Opened artifact store at {}", path.display());
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        init_schema(&conn)?;
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS user_jumps (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL,
            full_content TEXT NOT NULL,
            structured_plan TEXT NOT NULL,
            comprehensive_plan TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
        CREATE INDEX IF NOT EXISTS idx_jumps_user ON user_jumps(user_id, created_at DESC);

        CREATE TABLE IF NOT EXISTS user_tool_prompts (
            id TEXT PRIMARY KEY,
            jump_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            title TEXT NOT NULL,
            tool_name TEXT NOT NULL,
            tool_url TEXT,
            category TEXT NOT NULL,
            difficulty TEXT NOT NULL,
            cost_estimate TEXT NOT NULL,
            description TEXT NOT NULL,
            prompt_text TEXT NOT NULL,
            alternatives TEXT NOT NULL,
            use_cases TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY(jump_id) REFERENCES user_jumps(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_tool_prompts_jump ON user_tool_prompts(jump_id, position);

        CREATE TABLE IF NOT EXISTS user_components (
            id TEXT PRIMARY KEY,
            jump_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            position INTEGER NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            details TEXT NOT NULL,
            FOREIGN KEY(jump_id) REFERENCES user_jumps(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_components_jump ON user_components(jump_id, kind, position);

        CREATE TABLE IF NOT EXISTS api_tokens (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            token_hash TEXT NOT NULL UNIQUE,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS user_credits (
            user_id TEXT PRIMARY KEY,
            balance INTEGER NOT NULL DEFAULT 0 CHECK (balance >= 0),
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS credit_ledger (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            delta INTEGER NOT NULL,
            reason TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
        "#,
    )?;
    Ok(())
}
