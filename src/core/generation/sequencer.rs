//! Drives the fixed step pipeline for one request.
//!
//! Steps run strictly one after another; each step's output is folded into
//! the context the next prompts see. Results are pushed into a bounded
//! channel so transports can relay them as they arrive.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info, warn};

use super::adapter::invoke_step;
use super::prompts::StepContext;
use super::request::ValidatedRequest;
use super::step::{Step, StepResult};
use crate::core::llm::LlmProvider;

const CHANNEL_CAPACITY: usize = 8;

/// What happens to the remaining steps after a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Report the failed step and keep going; the stream ends with `complete`.
    ContinueOnError,
    /// The failed step's `error` is the last event.
    HaltOnError,
}

#[derive(Clone)]
pub struct JumpSequencer {
    provider: Arc<dyn LlmProvider>,
    model: String,
    policy: FailurePolicy,
}

impl JumpSequencer {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>, policy: FailurePolicy) -> Self {
        Self {
            provider,
            model: model.into(),
            policy,
        }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Start generation on a background task and return its events.
    /// Dropping the stream stops the run before the next step.
    pub fn stream(&self, request: ValidatedRequest) -> ReceiverStream<StepResult> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let sequencer = self.clone();
        tokio::spawn(async move {
            sequencer.run(request, tx).await;
        });
        ReceiverStream::new(rx)
    }

    pub async fn run(&self, request: ValidatedRequest, tx: mpsc::Sender<StepResult>) {
        let mut ctx = StepContext::default();
        let mut failed_steps: Vec<u32> = Vec::new();
        let mut degraded_steps: Vec<u32> = Vec::new();

        for step in Step::ALL {
            if tx.is_closed() {
                info!("Consumer went away before step {}, stopping", step.number());
                return;
            }

            info!(
                "Jump step {}/{}: {}",
                step.number(),
                Step::total(),
                step.task_label()
            );
            let started = Instant::now();

            let event = match invoke_step(
                self.provider.as_ref(),
                &self.model,
                step,
                &request,
                &ctx,
            )
            .await
            {
                Ok(output) => {
                    match step {
                        Step::Naming => {
                            ctx.jump_name = output
                                .data
                                .get("jumpName")
                                .and_then(Value::as_str)
                                .map(str::to_string);
                        }
                        // A fallback overview is not worth quoting to later steps.
                        Step::Overview if output.parse_error.is_none() => {
                            ctx.overview_raw = Some(output.raw.clone());
                        }
                        _ => {}
                    }
                    if output.parse_error.is_some() {
                        degraded_steps.push(step.number());
                    }
                    StepResult::step_done(
                        step,
                        output.data,
                        output.parse_error.map(|e| e.to_string()),
                        output.warnings,
                        started.elapsed().as_millis() as u64,
                    )
                }
                Err(e) => {
                    error!("Jump step {} failed: {}", step.number(), e);
                    failed_steps.push(step.number());
                    let fatal = self.policy == FailurePolicy::HaltOnError;
                    let event = StepResult::error(step.number(), e.to_string(), fatal);
                    if fatal {
                        let _ = tx.send(event).await;
                        return;
                    }
                    event
                }
            };

            if tx.send(event).await.is_err() {
                warn!("Consumer dropped during step {}", step.number());
                return;
            }
        }

        let summary = json!({
            "title": ctx.jump_name,
            "failedSteps": failed_steps,
            "degradedSteps": degraded_steps,
        });
        let _ = tx.send(StepResult::complete(summary)).await;
    }
}
