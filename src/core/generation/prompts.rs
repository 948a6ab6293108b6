//! Prompt templates, fallback payloads and output shape checks, per step.

use serde_json::{Value, json};
use std::collections::HashSet;

use super::artifact::combos_from;
use super::parse::ParseError;
use super::request::ValidatedRequest;
use super::step::Step;
use crate::core::llm::ChatMessage;

pub const TOOL_PROMPT_COUNT: usize = 9;
pub const MIN_DISTINCT_TOOLS: usize = 6;
const OVERVIEW_UNAVAILABLE: &str =
    "(The situation overview could not be generated. Base the plan on the goals and challenges alone.)";

/// What earlier steps produced, as far as later prompts need it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepContext {
    pub jump_name: Option<String>,
    /// Raw model text of the overview step.
    pub overview_raw: Option<String>,
}

const JSON_ONLY: &str = "Respond with a single valid JSON value and nothing else. \
Do not wrap it in markdown code fences. Do not add commentary.";

pub fn build_messages(step: Step, req: &ValidatedRequest, ctx: &StepContext) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt(step)),
        ChatMessage::user(user_prompt(step, req, ctx)),
    ]
}

fn system_prompt(step: Step) -> String {
    let role = match step {
        Step::Naming => {
            "You name AI transformation plans. Names are memorable, specific to the \
             user's situation and between 3 and 5 words long."
        }
        Step::Overview => {
            "You are a senior AI transformation strategist. You analyse a person's goals \
             and challenges and write a concise, practical strategic overview."
        }
        Step::Comprehensive => {
            "You are an AI implementation consultant. You turn a strategic overview into \
             a phased, actionable plan with concrete workflows, blueprints and strategies."
        }
        Step::ToolPrompts => {
            "You are an expert in AI tools and prompt engineering. You recommend real, \
             currently available AI tools and write ready-to-use prompts tailored to the \
             user's plan."
        }
    };
    format!("{role}\n\n{JSON_ONLY}")
}

fn profile(req: &ValidatedRequest) -> String {
    format!(
        "GOALS:\n{}\n\nCHALLENGES:\n{}\n\nINDUSTRY: {}\nAI EXPERIENCE: {}\nURGENCY: {}\nBUDGET: {}",
        req.goals, req.challenges, req.industry, req.ai_experience, req.urgency, req.budget
    )
}

fn overview_context(ctx: &StepContext) -> &str {
    ctx.overview_raw
        .as_deref()
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .unwrap_or(OVERVIEW_UNAVAILABLE)
}

fn user_prompt(step: Step, req: &ValidatedRequest, ctx: &StepContext) -> String {
    let name = ctx.jump_name.as_deref().unwrap_or("Your AI Jump");
    match step {
        Step::Naming => format!(
            "{}\n\nReturn: {{\"jumpName\": \"<3 to 5 word name>\"}}",
            profile(req)
        ),
        Step::Overview => format!(
            "{}\n\nPLAN NAME: {name}\n\nReturn an object with exactly these keys:\n\
             {{\n  \"executiveSummary\": string,\n  \"situationAnalysis\": {{\"currentState\": string, \"challenges\": [string], \"opportunities\": [string]}},\n  \
             \"strategicVision\": string,\n  \"roadmap\": {{\"phase1\": {{\"title\": string, \"duration\": string, \"milestones\": [string]}}, \"phase2\": {{...}}, \"phase3\": {{...}}}},\n  \
             \"successFactors\": [string],\n  \"riskAssessment\": [{{\"risk\": string, \"mitigation\": string}}]\n}}",
            profile(req)
        ),
        Step::Comprehensive => format!(
            "{}\n\nPLAN NAME: {name}\n\nSTRATEGIC OVERVIEW:\n{}\n\nReturn an object with these keys:\n\
             {{\n  \"structuredPlan\": {{\"phases\": [{{\"phase\": number, \"title\": string, \"duration\": string, \"steps\": [{{\"title\": string, \"description\": string, \"tools\": [string], \"deliverable\": string}}]}}]}},\n  \
             \"workflows\": [{{\"title\": string, \"description\": string, \"steps\": [string], \"tools\": [string]}}],\n  \
             \"blueprints\": [{{\"title\": string, \"description\": string, \"components\": [string]}}],\n  \
             \"strategies\": [{{\"title\": string, \"description\": string, \"tactics\": [string], \"kpis\": [string]}}]\n}}\n\
             Provide 3 phases, and 2 to 4 entries for each of workflows, blueprints and strategies.",
            profile(req),
            overview_context(ctx)
        ),
        Step::ToolPrompts => format!(
            "{}\n\nPLAN NAME: {name}\n\nSTRATEGIC OVERVIEW:\n{}\n\nReturn {{\"toolPrompts\": [...]}} with EXACTLY {TOOL_PROMPT_COUNT} entries \
             using at least {MIN_DISTINCT_TOOLS} different tools. Each entry:\n\
             {{\"title\": string, \"toolName\": string, \"toolUrl\": string, \"category\": string, \
             \"difficulty\": \"Beginner\"|\"Intermediate\"|\"Advanced\", \"costEstimate\": string, \
             \"description\": string, \"promptText\": string, \"alternatives\": [string], \"useCases\": [string]}}\n\
             promptText must be a complete prompt the user can paste into the tool.",
            profile(req),
            overview_context(ctx)
        ),
    }
}

/// Placeholder payload used when a step's output cannot be parsed.
pub fn fallback(step: Step, req: &ValidatedRequest) -> Value {
    match step {
        Step::Naming => json!({ "jumpName": fallback_name(req) }),
        Step::Overview => json!({
            "executiveSummary": format!(
                "A focused AI adoption plan for a {} context, built around your stated goals.",
                req.industry
            ),
            "situationAnalysis": {
                "currentState": "Details could not be generated for this section.",
                "challenges": [req.challenges],
                "opportunities": []
            },
            "strategicVision": "",
            "roadmap": {},
            "successFactors": [],
            "riskAssessment": []
        }),
        Step::Comprehensive => json!({
            "structuredPlan": { "phases": [] },
            "workflows": [],
            "blueprints": [],
            "strategies": []
        }),
        Step::ToolPrompts => json!({ "toolPrompts": [] }),
    }
}

fn fallback_name(req: &ValidatedRequest) -> String {
    format!("{} AI Jump", req.industry)
}

/// Check a parsed payload against what the step promised. Hard shape
/// violations are parse errors; soft ones become warnings and the data is
/// kept.
pub fn normalize(step: Step, value: Value) -> Result<(Value, Vec<String>), ParseError> {
    let mut warnings = Vec::new();
    match step {
        Step::Naming => {
            let raw_name = value
                .get("jumpName")
                .or_else(|| value.get("name"))
                .and_then(Value::as_str)
                .ok_or_else(|| ParseError::Invalid("missing jumpName".to_string()))?;
            let cleaned = raw_name
                .trim()
                .trim_matches(|c: char| c == '"' || c == '\'' || c == '*');
            let words: Vec<&str> = cleaned.split_whitespace().collect();
            if words.is_empty() {
                return Err(ParseError::Invalid("empty jumpName".to_string()));
            }
            let name = if words.len() > 5 {
                warnings.push(format!("jumpName had {} words, truncated to 5", words.len()));
                words[..5].join(" ")
            } else {
                if words.len() < 3 {
                    warnings.push(format!("jumpName has only {} word(s)", words.len()));
                }
                words.join(" ")
            };
            Ok((json!({ "jumpName": name }), warnings))
        }
        Step::Overview => {
            if !value.is_object() {
                return Err(ParseError::Invalid("overview is not an object".to_string()));
            }
            for key in ["executiveSummary", "roadmap"] {
                if value.get(key).is_none() {
                    warnings.push(format!("overview is missing {key}"));
                }
            }
            Ok((value, warnings))
        }
        Step::Comprehensive => {
            if !value.is_object() {
                return Err(ParseError::Invalid("plan is not an object".to_string()));
            }
            for key in ["structuredPlan", "workflows", "blueprints", "strategies"] {
                let empty = match value.get(key) {
                    None | Some(Value::Null) => true,
                    Some(Value::Array(items)) => items.is_empty(),
                    Some(_) => false,
                };
                if empty {
                    warnings.push(format!("plan returned no {key}"));
                }
            }
            Ok((value, warnings))
        }
        Step::ToolPrompts => {
            // A bare array is accepted as the list itself.
            let value = match value {
                Value::Array(items) => json!({ "toolPrompts": items }),
                Value::Object(_) if value.get("toolPrompts").is_some() => value,
                Value::Object(ref map) => match map.values().find(|v| v.is_array()) {
                    Some(items) => json!({ "toolPrompts": items }),
                    None => return Err(ParseError::Invalid("missing toolPrompts".to_string())),
                },
                _ => return Err(ParseError::Invalid("missing toolPrompts".to_string())),
            };
            let combos = combos_from(value.get("toolPrompts"));
            if combos.len() != TOOL_PROMPT_COUNT {
                warnings.push(format!(
                    "expected {TOOL_PROMPT_COUNT} tool prompts, got {}",
                    combos.len()
                ));
            }
            let distinct = distinct_tools(&value);
            if distinct < MIN_DISTINCT_TOOLS {
                warnings.push(format!(
                    "expected at least {MIN_DISTINCT_TOOLS} distinct tools, got {distinct}"
                ));
            }
            Ok((json!({ "toolPrompts": combos }), warnings))
        }
    }
}

fn distinct_tools(value: &Value) -> usize {
    combos_from(value.get("toolPrompts"))
        .iter()
        .map(|c| c.tool_name.trim().to_lowercase())
        .filter(|n| !n.is_empty())
        .collect::<HashSet<_>>()
        .len()
}
