//! Deterministic provider for unit tests.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::step::Step;
use crate::core::llm::{ChatMessage, CompletionOptions, LlmProvider, ProviderError};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<ChatMessage>,
}

/// Answers each step with a canned payload. The step is recognised by its
/// token budget, which is unique per step.
#[derive(Clone)]
pub struct ScriptedProvider {
    responses: HashMap<Step, String>,
    failures: HashMap<Step, u16>,
    fenced: bool,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl ScriptedProvider {
    pub fn happy() -> Self {
        Self {
            responses: Step::ALL
                .into_iter()
                .map(|s| (s, sample_response(s).to_string()))
                .collect(),
            failures: HashMap::new(),
            fenced: false,
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn fenced(mut self) -> Self {
        self.fenced = true;
        self
    }

    pub fn with_raw(mut self, step: Step, raw: &str) -> Self {
        self.responses.insert(step, raw.to_string());
        self
    }

    pub fn failing_at(mut self, step: Step, status: u16) -> Self {
        self.failures.insert(step, status);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn steps_called(&self) -> Vec<u32> {
        self.calls()
            .iter()
            .filter_map(|c| Step::ALL.into_iter().find(|s| s.max_tokens() == c.max_tokens))
            .map(Step::number)
            .collect()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn provider_id(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-1"
    }

    async fn complete(
        &self,
        model_id: &str,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> Result<String, ProviderError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedCall {
                model: model_id.to_string(),
                max_tokens: options.max_tokens,
                messages: messages.to_vec(),
            });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let step = Step::ALL
            .into_iter()
            .find(|s| s.max_tokens() == options.max_tokens)
            .ok_or_else(|| ProviderError::EmptyResponse {
                provider: "scripted".to_string(),
            })?;

        if let Some(status) = self.failures.get(&step) {
            return Err(ProviderError::Status {
                provider: "scripted".to_string(),
                status: *status,
                body: "scripted failure".to_string(),
            });
        }

        let body = self.responses.get(&step).cloned().unwrap_or_default();
        Ok(if self.fenced {
            format!("```json\n{body}\n```")
        } else {
            body
        })
    }
}

pub fn sample_response(step: Step) -> Value {
    match step {
        Step::Naming => json!({ "jumpName": "Content Agency Launchpad" }),
        Step::Overview => json!({
            "executiveSummary": "Build a lean AI-assisted content agency for local businesses.",
            "situationAnalysis": {
                "currentState": "Solo founder without a technical background.",
                "challenges": ["Limited budget", "No technical skills"],
                "opportunities": ["Underserved local market"]
            },
            "strategicVision": "Become the go-to content partner for 20 local businesses.",
            "roadmap": {
                "phase1": {"title": "Foundation", "duration": "Weeks 1-4", "milestones": ["Pick a niche", "Set up tools"]},
                "phase2": {"title": "First Clients", "duration": "Weeks 5-8", "milestones": ["Sign 3 clients"]},
                "phase3": {"title": "Scale", "duration": "Weeks 9-12", "milestones": ["Hire a freelancer"]}
            },
            "successFactors": ["Consistent output", "Clear pricing"],
            "riskAssessment": [{"risk": "Low margins", "mitigation": "Package services"}]
        }),
        Step::Comprehensive => json!({
            "structuredPlan": {
                "phases": [
                    {"phase": 1, "title": "Foundation", "duration": "4 weeks", "steps": [
                        {"title": "Choose niche", "description": "Pick restaurants", "tools": ["ChatGPT"], "deliverable": "Niche brief"}
                    ]},
                    {"phase": 2, "title": "First Clients", "duration": "4 weeks", "steps": []},
                    {"phase": 3, "title": "Scale", "duration": "4 weeks", "steps": []}
                ]
            },
            "workflows": [
                {"title": "Blog production", "description": "Idea to post", "steps": ["Outline", "Draft", "Edit"], "tools": ["ChatGPT"]},
                {"title": "Social scheduling", "description": "Weekly batch", "steps": ["Draft", "Schedule"], "tools": ["Buffer"]}
            ],
            "blueprints": [
                {"title": "Agency stack", "description": "Core tools", "components": ["CRM", "Editor"]},
                {"title": "Client onboarding", "description": "Intake", "components": ["Form", "Kickoff call"]}
            ],
            "strategies": [
                {"title": "Local niche", "description": "Own one vertical", "tactics": ["Case studies"], "kpis": ["Clients"]},
                {"title": "Retainers", "description": "Recurring revenue", "tactics": ["Monthly plans"], "kpis": ["MRR"]}
            ]
        }),
        Step::ToolPrompts => {
            let tools = [
                "ChatGPT", "Claude", "Jasper", "Canva", "Buffer", "Zapier", "ChatGPT", "Notion AI",
                "Grammarly",
            ];
            let combos: Vec<Value> = tools
                .iter()
                .enumerate()
                .map(|(i, tool)| {
                    json!({
                        "title": format!("Prompt {}", i + 1),
                        "toolName": tool,
                        "category": "Content",
                        "difficulty": "Beginner",
                        "costEstimate": "$0-20/mo",
                        "description": format!("Use {tool} for task {}", i + 1),
                        "promptText": format!("You are helping a small agency. Task {}.", i + 1),
                        "alternatives": ["Gemini"],
                        "useCases": ["Blog posts"]
                    })
                })
                .collect();
            json!({ "toolPrompts": combos })
        }
    }
}
