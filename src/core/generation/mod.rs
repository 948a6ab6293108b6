//! Jump generation: request validation, per-step model calls and the
//! sequencer that chains them.

mod adapter;
pub mod artifact;
pub mod parse;
pub mod prompts;
pub mod request;
mod sequencer;
pub mod step;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{StepOutput, invoke_step};
pub use artifact::{ComponentKind, ComponentRecord, Components, JumpArtifact, ToolPromptCombo};
pub use parse::{ParseError, parse_model_json};
pub use prompts::StepContext;
pub use request::{FieldError, GenerationRequest, ValidatedRequest, ValidationError};
pub use sequencer::{FailurePolicy, JumpSequencer};
pub use step::{COMPLETE_STEP, EventKind, Step, StepResult};
