use rusqlite::{Connection, OptionalExtension, Row, params};
use serde_json::Value;
use tracing::info;

use super::types::{JumpRecord, JumpSummary, StoredComponent};
use super::{ArtifactStore, StoreError, StoreResult};
use crate::core::generation::{ComponentKind, JumpArtifact, ToolPromptCombo};

const COMBO_COLUMNS: &str = "id, title, tool_name, tool_url, category, difficulty, cost_estimate, \
                             description, prompt_text, alternatives, use_cases";

fn combo_from_row(row: &Row<'_>) -> rusqlite::Result<ToolPromptCombo> {
    let alternatives: String = row.get(9)?;
    let use_cases: String = row.get(10)?;
    Ok(ToolPromptCombo {
        id: row.get(0)?,
        title: row.get(1)?,
        tool_name: row.get(2)?,
        tool_url: row.get(3)?,
        category: row.get(4)?,
        difficulty: row.get(5)?,
        cost_estimate: row.get(6)?,
        description: row.get(7)?,
        prompt_text: row.get(8)?,
        alternatives: serde_json::from_str(&alternatives).unwrap_or_default(),
        use_cases: serde_json::from_str(&use_cases).unwrap_or_default(),
    })
}

fn ensure_jump(db: &Connection, owner: &str, jump_id: &str) -> StoreResult<()> {
    let found: Option<String> = db
        .query_row(
            "SELECT id FROM user_jumps WHERE id = ?1 AND user_id = ?2",
            params![jump_id, owner],
            |row| row.get(0),
        )
        .optional()?;
    match found {
        Some(_) => Ok(()),
        None => Err(StoreError::NotFound(format!("jump {jump_id}"))),
    }
}

fn insert_combo(
    db: &Connection,
    owner: &str,
    jump_id: &str,
    position: i64,
    combo: &ToolPromptCombo,
) -> StoreResult<usize> {
    let changed = db.execute(
        "INSERT INTO user_tool_prompts (id, jump_id, user_id, position, title, tool_name, tool_url,
             category, difficulty, cost_estimate, description, prompt_text, alternatives, use_cases)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         ON CONFLICT(id) DO UPDATE SET
             title = excluded.title,
             tool_name = excluded.tool_name,
             tool_url = excluded.tool_url,
             category = excluded.category,
             difficulty = excluded.difficulty,
             cost_estimate = excluded.cost_estimate,
             description = excluded.description,
             prompt_text = excluded.prompt_text,
             alternatives = excluded.alternatives,
             use_cases = excluded.use_cases
         WHERE user_tool_prompts.jump_id = excluded.jump_id",
        params![
            combo.id,
            jump_id,
            owner,
            position,
            combo.title,
            combo.tool_name,
            combo.tool_url,
            combo.category,
            combo.difficulty,
            combo.cost_estimate,
            combo.description,
            combo.prompt_text,
            serde_json::to_string(&combo.alternatives)?,
            serde_json::to_string(&combo.use_cases)?,
        ],
    )?;
    Ok(changed)
}

impl ArtifactStore {
    /// Persist a finished Jump with all of its components in one transaction.
    /// Returns the new jump id.
    pub async fn save_artifact(&self, owner: &str, artifact: &JumpArtifact) -> StoreResult<String> {
        let jump_id = uuid::Uuid::new_v4().to_string();
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;

        tx.execute(
            "INSERT INTO user_jumps (id, user_id, title, full_content, structured_plan, comprehensive_plan)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                jump_id,
                owner,
                artifact.title,
                artifact.full_content,
                serde_json::to_string(&artifact.structured_plan)?,
                serde_json::to_string(&artifact.comprehensive_plan)?,
            ],
        )?;

        // Model output may carry its own ids; stored rows always get fresh ones.
        for (i, combo) in artifact.components.tool_prompts.iter().enumerate() {
            let combo = ToolPromptCombo {
                id: uuid::Uuid::new_v4().to_string(),
                ..combo.clone()
            };
            insert_combo(&tx, owner, &jump_id, i as i64, &combo)?;
        }

        for kind in [
            ComponentKind::Workflow,
            ComponentKind::Blueprint,
            ComponentKind::Strategy,
        ] {
            for (i, record) in artifact.components.records(kind).iter().enumerate() {
                tx.execute(
                    "INSERT INTO user_components (id, jump_id, kind, position, title, description, details)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        uuid::Uuid::new_v4().to_string(),
                        jump_id,
                        kind.as_str(),
                        i as i64,
                        record.title,
                        record.description,
                        serde_json::to_string(&record.details)?,
                    ],
                )?;
            }
        }

        tx.commit()?;
        info!(
            "Saved jump {} for {} ({} tool prompts)",
            jump_id,
            owner,
            artifact.components.tool_prompts.len()
        );
        Ok(jump_id)
    }

    pub async fn get_jump(&self, owner: &str, jump_id: &str) -> StoreResult<JumpRecord> {
        let db = self.db.lock().await;
        let row = db
            .query_row(
                "SELECT id, user_id, title, full_content, structured_plan, comprehensive_plan,
                        created_at, updated_at
                 FROM user_jumps WHERE id = ?1 AND user_id = ?2",
                params![jump_id, owner],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, user_id, title, full_content, structured, comprehensive, created_at, updated_at)) = row
        else {
            return Err(StoreError::NotFound(format!("jump {jump_id}")));
        };

        Ok(JumpRecord {
            id,
            user_id,
            title,
            full_content,
            structured_plan: serde_json::from_str::<Value>(&structured)?,
            comprehensive_plan: serde_json::from_str::<Value>(&comprehensive)?,
            created_at,
            updated_at,
        })
    }

    pub async fn list_jumps(&self, owner: &str) -> StoreResult<Vec<JumpSummary>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT j.id, j.title, j.created_at,
                    (SELECT COUNT(*) FROM user_tool_prompts t WHERE t.jump_id = j.id)
             FROM user_jumps j WHERE j.user_id = ?1
             ORDER BY j.created_at DESC, j.rowid DESC",
        )?;
        let rows = stmt.query_map(params![owner], |row| {
            Ok(JumpSummary {
                id: row.get(0)?,
                title: row.get(1)?,
                created_at: row.get(2)?,
                tool_prompt_count: row.get(3)?,
            })
        })?;

        let mut jumps = Vec::new();
        for row in rows {
            jumps.push(row?);
        }
        Ok(jumps)
    }

    /// Remove a Jump; its tool prompts and components go with it.
    pub async fn delete_jump(&self, owner: &str, jump_id: &str) -> StoreResult<()> {
        let db = self.db.lock().await;
        let rows = db.execute(
            "DELETE FROM user_jumps WHERE id = ?1 AND user_id = ?2",
            params![jump_id, owner],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("jump {jump_id}")));
        }
        info!("Deleted jump {}", jump_id);
        Ok(())
    }

    pub async fn list_tool_prompts(&self, owner: &str, jump_id: &str) -> StoreResult<Vec<ToolPromptCombo>> {
        let db = self.db.lock().await;
        ensure_jump(&db, owner, jump_id)?;
        let mut stmt = db.prepare(&format!(
            "SELECT {COMBO_COLUMNS} FROM user_tool_prompts WHERE jump_id = ?1 ORDER BY position"
        ))?;
        let rows = stmt.query_map(params![jump_id], combo_from_row)?;

        let mut combos = Vec::new();
        for row in rows {
            combos.push(row?);
        }
        Ok(combos)
    }

    /// Insert a new combo or replace the one with the same id. New combos go
    /// to the end of the list; edited ones keep their position.
    pub async fn upsert_tool_prompt(
        &self,
        owner: &str,
        jump_id: &str,
        combo: &ToolPromptCombo,
    ) -> StoreResult<ToolPromptCombo> {
        let db = self.db.lock().await;
        ensure_jump(&db, owner, jump_id)?;

        let next_position: i64 = db.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM user_tool_prompts WHERE jump_id = ?1",
            params![jump_id],
            |row| row.get(0),
        )?;
        if insert_combo(&db, owner, jump_id, next_position, combo)? == 0 {
            // id belongs to another jump
            return Err(StoreError::NotFound(format!("tool prompt {}", combo.id)));
        }

        let stored = db.query_row(
            &format!("SELECT {COMBO_COLUMNS} FROM user_tool_prompts WHERE id = ?1"),
            params![combo.id],
            combo_from_row,
        )?;
        Ok(stored)
    }

    pub async fn delete_tool_prompt(&self, owner: &str, jump_id: &str, tool_id: &str) -> StoreResult<()> {
        let db = self.db.lock().await;
        ensure_jump(&db, owner, jump_id)?;
        let rows = db.execute(
            "DELETE FROM user_tool_prompts WHERE id = ?1 AND jump_id = ?2",
            params![tool_id, jump_id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(format!("tool prompt {tool_id}")));
        }
        Ok(())
    }

    pub async fn list_components(&self, owner: &str, jump_id: &str) -> StoreResult<Vec<StoredComponent>> {
        let db = self.db.lock().await;
        ensure_jump(&db, owner, jump_id)?;
        let mut stmt = db.prepare(
            "SELECT id, kind, position, title, description, details
             FROM user_components WHERE jump_id = ?1 ORDER BY kind, position",
        )?;
        let rows = stmt.query_map(params![jump_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, kind, position, title, description, details) = row?;
            let Some(kind) = ComponentKind::from_name(&kind) else {
                continue;
            };
            out.push(StoredComponent {
                id,
                kind,
                position,
                title,
                description,
                details: serde_json::from_str(&details)?,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::generation::{ComponentRecord, Components};
    use serde_json::json;

    fn combo(tool: &str) -> ToolPromptCombo {
        serde_json::from_value(json!({
            "title": format!("Use {tool}"),
            "toolName": tool,
            "promptText": "Write three headlines",
            "alternatives": ["Gemini"]
        }))
        .unwrap()
    }

    fn record(title: &str) -> ComponentRecord {
        serde_json::from_value(json!({"title": title, "description": "d", "steps": ["a"]})).unwrap()
    }

    fn artifact() -> JumpArtifact {
        JumpArtifact {
            id: None,
            title: "Agency Launch Plan".to_string(),
            full_content: "# Agency Launch Plan".to_string(),
            structured_plan: json!({"phases": [{"phase": 1}]}),
            comprehensive_plan: json!({"executiveSummary": "s"}),
            components: Components {
                tool_prompts: vec![combo("ChatGPT"), combo("Canva")],
                workflows: vec![record("W1"), record("W2")],
                blueprints: vec![record("B1")],
                strategies: vec![],
            },
        }
    }

    #[tokio::test]
    async fn save_and_read_back() {
        let store = ArtifactStore::open_in_memory().unwrap();
        let id = store.save_artifact("u1", &artifact()).await.unwrap();

        let jump = store.get_jump("u1", &id).await.unwrap();
        assert_eq!(jump.title, "Agency Launch Plan");
        assert_eq!(jump.structured_plan["phases"][0]["phase"], 1);

        let prompts = store.list_tool_prompts("u1", &id).await.unwrap();
        let tools: Vec<&str> = prompts.iter().map(|c| c.tool_name.as_str()).collect();
        assert_eq!(tools, vec!["ChatGPT", "Canva"]);
        assert_eq!(prompts[0].alternatives, vec!["Gemini".to_string()]);

        let components = store.list_components("u1", &id).await.unwrap();
        assert_eq!(components.len(), 3);
        assert!(components.iter().any(|c| c.kind == ComponentKind::Blueprint && c.title == "B1"));
        assert_eq!(components[0].details["steps"], json!(["a"]));

        let list = store.list_jumps("u1").await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].tool_prompt_count, 2);
    }

    #[tokio::test]
    async fn other_owners_cannot_see_jumps() {
        let store = ArtifactStore::open_in_memory().unwrap();
        let id = store.save_artifact("u1", &artifact()).await.unwrap();
        assert!(matches!(store.get_jump("u2", &id).await, Err(StoreError::NotFound(_))));
        assert!(store.list_jumps("u2").await.unwrap().is_empty());
        assert!(matches!(store.delete_jump("u2", &id).await, Err(StoreError::NotFound(_))));
        assert!(matches!(
            store.list_tool_prompts("u2", &id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_cascades_to_children() {
        let store = ArtifactStore::open_in_memory().unwrap();
        let id = store.save_artifact("u1", &artifact()).await.unwrap();
        store.delete_jump("u1", &id).await.unwrap();

        let db = store.db.lock().await;
        let prompts: i64 = db
            .query_row("SELECT COUNT(*) FROM user_tool_prompts", [], |r| r.get(0))
            .unwrap();
        let components: i64 = db
            .query_row("SELECT COUNT(*) FROM user_components", [], |r| r.get(0))
            .unwrap();
        assert_eq!((prompts, components), (0, 0));
    }

    #[tokio::test]
    async fn upsert_edits_in_place_and_appends_new() {
        let store = ArtifactStore::open_in_memory().unwrap();
        let id = store.save_artifact("u1", &artifact()).await.unwrap();
        let mut existing = store.list_tool_prompts("u1", &id).await.unwrap()[0].clone();
        existing.prompt_text = "Edited".to_string();
        store.upsert_tool_prompt("u1", &id, &existing).await.unwrap();

        let added = store.upsert_tool_prompt("u1", &id, &combo("Zapier")).await.unwrap();
        assert_eq!(added.tool_name, "Zapier");

        let prompts = store.list_tool_prompts("u1", &id).await.unwrap();
        assert_eq!(prompts.len(), 3);
        assert_eq!(prompts[0].prompt_text, "Edited");
        assert_eq!(prompts[2].tool_name, "Zapier");

        store.delete_tool_prompt("u1", &id, &added.id).await.unwrap();
        assert_eq!(store.list_tool_prompts("u1", &id).await.unwrap().len(), 2);
        assert!(matches!(
            store.delete_tool_prompt("u1", &id, &added.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn upsert_cannot_steal_a_combo_from_another_jump() {
        let store = ArtifactStore::open_in_memory().unwrap();
        let first = store.save_artifact("u1", &artifact()).await.unwrap();
        let second = store.save_artifact("u1", &artifact()).await.unwrap();
        assert_eq!(store.list_tool_prompts("u1", &second).await.unwrap().len(), 2);
        let foreign = store.list_tool_prompts("u1", &first).await.unwrap()[0].clone();
        assert!(matches!(
            store.upsert_tool_prompt("u1", &second, &foreign).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
