use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::generation::ComponentKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JumpSummary {
    pub id: String,
    pub title: String,
    pub tool_prompt_count: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JumpRecord {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub full_content: String,
    pub structured_plan: Value,
    pub comprehensive_plan: Value,
    pub created_at: String,
    pub updated_at: String,
}

/// Workflow, blueprint or strategy row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredComponent {
    pub id: String,
    pub kind: ComponentKind,
    pub position: i64,
    pub title: String,
    pub description: String,
    pub details: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiTokenRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub created_at: String,
}
