//! Client-side view of a generation in flight.
//!
//! [`reduce`] folds one [`StepResult`] into a [`ProgressiveResult`] and is
//! pure: the caller supplies the event timestamp.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::core::generation::{EventKind, JumpArtifact, Step, StepResult};

pub const EMPTY_CATEGORIES_HINT: &str = "Some categories returned empty - retry from Studio";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Generating { step: u32 },
    Complete,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStatus {
    pub stage: String,
    pub progress: u8,
    pub current_task: String,
    pub is_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepIssue {
    pub step: u32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressiveResult {
    pub phase: Phase,
    pub artifact: JumpArtifact,
    pub processing_status: ProcessingStatus,
    /// Steps that have reported, successfully or not.
    pub settled_steps: Vec<u32>,
    /// Milliseconds between consecutive checkpoints, keyed by step number.
    pub step_timings: BTreeMap<u32, i64>,
    pub errors: Vec<StepIssue>,
    pub warnings: Vec<String>,
    pub hints: Vec<String>,
    pub jump_id: Option<String>,
    pub last_checkpoint: Option<DateTime<Utc>>,
}

impl Default for ProgressiveResult {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            artifact: JumpArtifact::default(),
            processing_status: ProcessingStatus {
                stage: "idle".to_string(),
                progress: 0,
                current_task: "Waiting to start".to_string(),
                is_complete: false,
            },
            settled_steps: Vec::new(),
            step_timings: BTreeMap::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            hints: Vec::new(),
            jump_id: None,
            last_checkpoint: None,
        }
    }
}

impl ProgressiveResult {
    /// State right after the request was sent.
    pub fn started(now: DateTime<Utc>) -> Self {
        let first = Step::ALL[0];
        let mut state = Self {
            phase: Phase::Generating {
                step: first.number(),
            },
            last_checkpoint: Some(now),
            ..Self::default()
        };
        state.processing_status.stage = stage_name(first).to_string();
        state.processing_status.current_task = first.task_label().to_string();
        state
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Complete | Phase::Failed)
    }
}

fn stage_name(step: Step) -> &'static str {
    match step {
        Step::Naming => "naming",
        Step::Overview => "overview",
        Step::Comprehensive => "comprehensive",
        Step::ToolPrompts => "tool_prompts",
    }
}

pub fn reduce(mut state: ProgressiveResult, event: &StepResult, now: DateTime<Utc>) -> ProgressiveResult {
    if state.is_finished() {
        return state;
    }

    if let Some(prev) = state.last_checkpoint {
        let elapsed = (now - prev).num_milliseconds().max(0);
        state.step_timings.insert(event.step, elapsed);
    }
    state.last_checkpoint = Some(now);

    match event.kind {
        EventKind::Complete => {
            state.phase = Phase::Complete;
            state.jump_id = event
                .data
                .get("jumpId")
                .and_then(Value::as_str)
                .map(str::to_string);
            if !state.artifact.components.empty_categories().is_empty() {
                state.hints.push(EMPTY_CATEGORIES_HINT.to_string());
            }
            state.processing_status = ProcessingStatus {
                stage: "complete".to_string(),
                progress: 100,
                current_task: "Your Jump is ready".to_string(),
                is_complete: true,
            };
            return state;
        }
        EventKind::Error => {
            let message = event
                .error
                .clone()
                .unwrap_or_else(|| "Generation failed".to_string());
            state.errors.push(StepIssue {
                step: event.step,
                message: message.clone(),
            });
            if event.fatal {
                state.phase = Phase::Failed;
                state.processing_status.stage = "error".to_string();
                state.processing_status.current_task = message;
                state.processing_status.is_complete = false;
                return state;
            }
        }
        _ => {
            state.artifact.apply_event(event);
            for w in &event.warnings {
                state.warnings.push(format!("step {}: {}", event.step, w));
            }
            if let Some(e) = &event.parse_error {
                state
                    .warnings
                    .push(format!("step {} used placeholder content: {}", event.step, e));
            }
        }
    }

    if !state.settled_steps.contains(&event.step) {
        state.settled_steps.push(event.step);
    }

    let next = Step::from_number(event.step + 1);
    state.phase = Phase::Generating {
        step: next.map(Step::number).unwrap_or(event.step),
    };
    state.processing_status.stage = next.map(stage_name).unwrap_or("finalizing").to_string();
    state.processing_status.current_task = next
        .map(Step::task_label)
        .unwrap_or("Saving your Jump")
        .to_string();

    let settled = state.settled_steps.len() as u32;
    let computed = (settled * 100 / Step::total()).min(99) as u8;
    state.processing_status.progress = state.processing_status.progress.max(computed);
    state
}
