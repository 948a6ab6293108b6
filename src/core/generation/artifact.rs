use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::step::{Step, StepResult};

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Models emit ids as strings, numbers or nothing at all.
fn scalar_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.trim().is_empty() => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => new_id(),
    })
}

/// One recommended tool with a prompt tailored to the user's situation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPromptCombo {
    #[serde(default = "new_id", deserialize_with = "scalar_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(alias = "tool_name", alias = "tool")]
    pub tool_name: String,
    #[serde(default, alias = "tool_url", skip_serializing_if = "Option::is_none")]
    pub tool_url: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default, alias = "cost_estimate")]
    pub cost_estimate: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "prompt_text", alias = "prompt")]
    pub prompt_text: String,
    #[serde(default)]
    pub alternatives: Vec<String>,
    #[serde(default, alias = "use_cases")]
    pub use_cases: Vec<String>,
}

/// Workflow, blueprint or strategy record. Only `title`/`description` are
/// fixed; everything else the model returned is kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
    #[serde(default = "new_id", deserialize_with = "scalar_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    ToolPrompt,
    Workflow,
    Blueprint,
    Strategy,
}

impl ComponentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentKind::ToolPrompt => "tool_prompt",
            ComponentKind::Workflow => "workflow",
            ComponentKind::Blueprint => "blueprint",
            ComponentKind::Strategy => "strategy",
        }
    }

    pub fn from_name(value: &str) -> Option<Self> {
        match value {
            "tool_prompt" => Some(ComponentKind::ToolPrompt),
            "workflow" => Some(ComponentKind::Workflow),
            "blueprint" => Some(ComponentKind::Blueprint),
            "strategy" => Some(ComponentKind::Strategy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    #[serde(default)]
    pub tool_prompts: Vec<ToolPromptCombo>,
    #[serde(default)]
    pub workflows: Vec<ComponentRecord>,
    #[serde(default)]
    pub blueprints: Vec<ComponentRecord>,
    #[serde(default)]
    pub strategies: Vec<ComponentRecord>,
}

impl Components {
    /// Categories that ended up with no entries.
    pub fn empty_categories(&self) -> Vec<ComponentKind> {
        let mut out = Vec::new();
        if self.tool_prompts.is_empty() {
            out.push(ComponentKind::ToolPrompt);
        }
        if self.workflows.is_empty() {
            out.push(ComponentKind::Workflow);
        }
        if self.blueprints.is_empty() {
            out.push(ComponentKind::Blueprint);
        }
        if self.strategies.is_empty() {
            out.push(ComponentKind::Strategy);
        }
        out
    }

    pub fn records(&self, kind: ComponentKind) -> &[ComponentRecord] {
        match kind {
            ComponentKind::Workflow => &self.workflows,
            ComponentKind::Blueprint => &self.blueprints,
            ComponentKind::Strategy => &self.strategies,
            ComponentKind::ToolPrompt => &[],
        }
    }
}

/// The assembled Jump.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JumpArtifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub full_content: String,
    pub structured_plan: Value,
    pub comprehensive_plan: Value,
    pub components: Components,
}

impl JumpArtifact {
    pub fn apply_naming(&mut self, data: &Value) {
        if let Some(name) = data.get("jumpName").and_then(Value::as_str) {
            self.title = name.to_string();
        }
    }

    pub fn apply_overview(&mut self, data: &Value) {
        self.comprehensive_plan = data.clone();
        self.full_content = render_overview_markdown(&self.title, data);
    }

    pub fn apply_comprehensive(&mut self, data: &Value) {
        if let Some(plan) = data.get("structuredPlan") {
            self.structured_plan = plan.clone();
        }
        self.components.workflows = records_from(data.get("workflows"));
        self.components.blueprints = records_from(data.get("blueprints"));
        self.components.strategies = records_from(data.get("strategies"));
    }

    pub fn apply_tool_prompts(&mut self, data: &Value) {
        self.components.tool_prompts = combos_from(data.get("toolPrompts"));
    }

    /// Fold one step event into the artifact. Error and complete events
    /// carry no content.
    pub fn apply_event(&mut self, event: &StepResult) {
        match event.kind.step() {
            Some(Step::Naming) => self.apply_naming(&event.data),
            Some(Step::Overview) => self.apply_overview(&event.data),
            Some(Step::Comprehensive) => self.apply_comprehensive(&event.data),
            Some(Step::ToolPrompts) => self.apply_tool_prompts(&event.data),
            None => {}
        }
    }
}

/// Entries that do not deserialize are skipped rather than failing the whole
/// category.
pub fn combos_from(value: Option<&Value>) -> Vec<ToolPromptCombo> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

fn records_from(value: Option<&Value>) -> Vec<ComponentRecord> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| item.is_object())
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Render the overview step as the markdown body shown on the Jump page.
pub fn render_overview_markdown(title: &str, overview: &Value) -> String {
    let mut out = String::new();
    if !title.is_empty() {
        out.push_str(&format!("# {title}\n\n"));
    }

    if let Some(summary) = overview.get("executiveSummary").and_then(Value::as_str) {
        out.push_str("## Executive Summary\n\n");
        out.push_str(summary.trim());
        out.push_str("\n\n");
    }

    if let Some(analysis) = overview.get("situationAnalysis") {
        out.push_str("## Situation Analysis\n\n");
        if let Some(current) = analysis.get("currentState").and_then(Value::as_str) {
            out.push_str(current.trim());
            out.push_str("\n\n");
        }
        push_list(&mut out, "Challenges", analysis.get("challenges"));
        push_list(&mut out, "Opportunities", analysis.get("opportunities"));
    }

    if let Some(vision) = overview.get("strategicVision").and_then(Value::as_str) {
        out.push_str("## Strategic Vision\n\n");
        out.push_str(vision.trim());
        out.push_str("\n\n");
    }

    if let Some(roadmap) = overview.get("roadmap").and_then(Value::as_object) {
        out.push_str("## Roadmap\n\n");
        let mut phases: Vec<(&String, &Value)> = roadmap.iter().collect();
        phases.sort_by(|a, b| a.0.cmp(b.0));
        for (_, phase) in phases {
            let title = phase.get("title").and_then(Value::as_str).unwrap_or("Phase");
            match phase.get("duration").and_then(Value::as_str) {
                Some(duration) => out.push_str(&format!("### {title} ({duration})\n\n")),
                None => out.push_str(&format!("### {title}\n\n")),
            }
            if let Some(milestones) = phase.get("milestones").and_then(Value::as_array) {
                for m in milestones.iter().filter_map(Value::as_str) {
                    out.push_str(&format!("- {m}\n"));
                }
                out.push('\n');
            }
        }
    }

    push_list(&mut out, "Success Factors", overview.get("successFactors"));

    if let Some(risks) = overview.get("riskAssessment").and_then(Value::as_array) {
        out.push_str("## Risks\n\n");
        for risk in risks {
            let name = risk.get("risk").and_then(Value::as_str).unwrap_or_default();
            match risk.get("mitigation").and_then(Value::as_str) {
                Some(m) => out.push_str(&format!("- **{name}**: {m}\n")),
                None => out.push_str(&format!("- {name}\n")),
            }
        }
        out.push('\n');
    }

    out.trim_end().to_string()
}

fn push_list(out: &mut String, heading: &str, items: Option<&Value>) {
    let Some(items) = items.and_then(Value::as_array) else {
        return;
    };
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("### {heading}\n\n"));
    for item in items.iter().filter_map(Value::as_str) {
        out.push_str(&format!("- {item}\n"));
    }
    out.push('\n');
}
