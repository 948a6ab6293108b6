use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Wire sentinel carried by the terminal `complete` event.
pub const COMPLETE_STEP: u32 = 9;

/// The fixed generation pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Naming,
    Overview,
    Comprehensive,
    ToolPrompts,
}

impl Step {
    pub const ALL: [Step; 4] = [
        Step::Naming,
        Step::Overview,
        Step::Comprehensive,
        Step::ToolPrompts,
    ];

    pub fn number(self) -> u32 {
        match self {
            Step::Naming => 1,
            Step::Overview => 2,
            Step::Comprehensive => 3,
            Step::ToolPrompts => 4,
        }
    }

    pub fn from_number(n: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.number() == n)
    }

    pub fn kind(self) -> EventKind {
        match self {
            Step::Naming => EventKind::Naming,
            Step::Overview => EventKind::Overview,
            Step::Comprehensive => EventKind::Comprehensive,
            Step::ToolPrompts => EventKind::ToolPrompts,
        }
    }

    /// Completion token budget for the step.
    pub fn max_tokens(self) -> u32 {
        match self {
            Step::Naming => 500,
            Step::Overview => 8_000,
            Step::Comprehensive => 16_000,
            Step::ToolPrompts => 50_000,
        }
    }

    pub fn temperature(self) -> f32 {
        match self {
            Step::Naming => 0.9,
            _ => 0.7,
        }
    }

    /// Short present-tense description shown while the step runs.
    pub fn task_label(self) -> &'static str {
        match self {
            Step::Naming => "Naming your Jump",
            Step::Overview => "Analyzing your situation",
            Step::Comprehensive => "Building your action plan",
            Step::ToolPrompts => "Crafting tools and prompts",
        }
    }

    pub fn total() -> u32 {
        Self::ALL.len() as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Naming,
    Overview,
    Comprehensive,
    ToolPrompts,
    Error,
    Complete,
}

impl EventKind {
    pub fn step(self) -> Option<Step> {
        match self {
            EventKind::Naming => Some(Step::Naming),
            EventKind::Overview => Some(Step::Overview),
            EventKind::Comprehensive => Some(Step::Comprehensive),
            EventKind::ToolPrompts => Some(Step::ToolPrompts),
            EventKind::Error | EventKind::Complete => None,
        }
    }
}

/// One event of the generation stream. Serialized as the SSE frame payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: u32,
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when the model output could not be parsed and fallback content
    /// was substituted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// True when this error ends the stream.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fatal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl StepResult {
    pub fn step_done(
        step: Step,
        data: Value,
        parse_error: Option<String>,
        warnings: Vec<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            step: step.number(),
            kind: step.kind(),
            data,
            error: None,
            parse_error,
            warnings,
            fatal: false,
            duration_ms: Some(duration_ms),
        }
    }

    pub fn error(step: u32, message: impl Into<String>, fatal: bool) -> Self {
        let message = message.into();
        Self {
            step,
            kind: EventKind::Error,
            data: json!({ "message": message }),
            error: Some(message),
            parse_error: None,
            warnings: Vec::new(),
            fatal,
            duration_ms: None,
        }
    }

    pub fn complete(data: Value) -> Self {
        Self {
            step: COMPLETE_STEP,
            kind: EventKind::Complete,
            data,
            error: None,
            parse_error: None,
            warnings: Vec::new(),
            fatal: false,
            duration_ms: None,
        }
    }

    /// Whether the stream ends after this event.
    pub fn is_terminal(&self) -> bool {
        match self.kind {
            EventKind::Complete => true,
            EventKind::Error => self.fatal,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_numbers_are_ordered_and_reversible() {
        let numbers: Vec<u32> = Step::ALL.iter().map(|s| s.number()).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        for step in Step::ALL {
            assert_eq!(Step::from_number(step.number()), Some(step));
            assert_eq!(step.kind().step(), Some(step));
        }
        assert_eq!(Step::from_number(COMPLETE_STEP), None);
    }

    #[test]
    fn token_budgets_are_fixed() {
        assert_eq!(Step::Naming.max_tokens(), 500);
        assert_eq!(Step::Overview.max_tokens(), 8_000);
        assert_eq!(Step::Comprehensive.max_tokens(), 16_000);
        assert_eq!(Step::ToolPrompts.max_tokens(), 50_000);
    }

    #[test]
    fn wire_shape_of_events() {
        let done = StepResult::step_done(
            Step::Naming,
            json!({"jumpName": "Fast Agency Launch"}),
            None,
            vec![],
            12,
        );
        let v = serde_json::to_value(&done).unwrap();
        assert_eq!(v["step"], 1);
        assert_eq!(v["type"], "naming");
        assert!(v.get("error").is_none());
        assert!(v.get("fatal").is_none());

        let err = serde_json::to_value(StepResult::error(3, "boom", true)).unwrap();
        assert_eq!(err["type"], "error");
        assert_eq!(err["step"], 3);
        assert_eq!(err["fatal"], true);
        assert_eq!(err["data"]["message"], "boom");

        let complete = StepResult::complete(json!({}));
        assert_eq!(complete.step, COMPLETE_STEP);
        assert!(complete.is_terminal());
        assert!(!StepResult::error(2, "x", false).is_terminal());
    }
}
