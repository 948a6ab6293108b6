use anyhow::{Context, Result};
use chrono::Utc;
use console::style;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tokio_util::io::StreamReader;

use super::GenerateArgs;
use crate::core::generation::{EventKind, StepResult};
use crate::core::progress::{self, Phase, ProgressiveResult};
use crate::core::terminal::{print_error, print_progress, print_step, print_success, print_warn};

/// Reads `text/event-stream` line by line and yields the `data` payload of
/// each frame once its blank line arrives. Lines are decoded only when whole,
/// so multibyte characters split across network chunks survive intact.
pub(crate) struct SseFrames<R> {
    reader: R,
    line: String,
    data: Vec<String>,
}

impl<R: AsyncBufRead + Unpin> SseFrames<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            data: Vec::new(),
        }
    }

    pub(crate) async fn next_payload(&mut self) -> std::io::Result<Option<String>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line).await? == 0 {
                // EOF flushes a final frame that lacked its blank line
                return Ok(self.take_frame());
            }
            let line = self.line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                if let Some(payload) = self.take_frame() {
                    return Ok(Some(payload));
                }
                continue;
            }
            if let Some(rest) = line.strip_prefix("data:") {
                self.data
                    .push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
            }
        }
    }

    fn take_frame(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let payload = self.data.join("\n");
        self.data.clear();
        Some(payload)
    }
}

pub async fn run_generate(args: GenerateArgs) -> Result<()> {
    let url = format!("{}/functions/v1/jumps-ai-streaming", args.api_url);
    let client = reqwest::Client::new();
    let mut request = client
        .post(&url)
        .json(&serde_json::json!({ "formData": args.form }));
    if let Some(token) = &args.token {
        request = request.bearer_auth(token);
    }

    let response = request
        .send()
        .await
        .with_context(|| format!("Could not reach {}. Is `jumpinai serve` running?", url))?;

    if !response.status().is_success() {
        let status = response.status();
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let message = body
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or("request failed");
        print_error(&format!("{} ({})", message, status));
        if let Some(details) = body.get("details").and_then(|v| v.as_array()) {
            for detail in details {
                println!(
                    "   {} {}",
                    style(detail["field"].as_str().unwrap_or("?")).bold(),
                    detail["message"].as_str().unwrap_or("")
                );
            }
        }
        anyhow::bail!("generation was rejected");
    }

    print_step("Generating your Jump");
    let mut state = ProgressiveResult::started(Utc::now());
    print_progress(&state);

    let mut reader = StreamReader::new(
        response
            .bytes_stream()
            .map(|r| r.map_err(std::io::Error::other)),
    );
    let mut frames = SseFrames::new(BufReader::new(&mut reader));
    while let Some(payload) = frames.next_payload().await.context("Stream interrupted")? {
        let event: StepResult = match serde_json::from_str(&payload) {
            Ok(event) => event,
            Err(e) => {
                print_warn(&format!("Skipping malformed frame: {}", e));
                continue;
            }
        };
        if event.kind == EventKind::Error {
            print_warn(&format!(
                "Step {} failed: {}",
                event.step,
                event.error.as_deref().unwrap_or("unknown error")
            ));
        }
        state = progress::reduce(state, &event, Utc::now());
        print_progress(&state);
        if state.is_finished() {
            break;
        }
    }

    summarize(&state);
    match state.phase {
        Phase::Complete => Ok(()),
        _ => anyhow::bail!("generation did not complete"),
    }
}

fn summarize(state: &ProgressiveResult) {
    println!();
    if state.phase == Phase::Complete {
        print_success(&format!("\"{}\" is ready", state.artifact.title));
    }
    if let Some(id) = &state.jump_id {
        println!("   {} {}", style("Jump id:").bold(), id);
    }
    println!(
        "   {} {} tool prompts, {} workflows, {} blueprints, {} strategies",
        style("Contents:").bold(),
        state.artifact.components.tool_prompts.len(),
        state.artifact.components.workflows.len(),
        state.artifact.components.blueprints.len(),
        state.artifact.components.strategies.len(),
    );
    for warning in &state.warnings {
        print_warn(warning);
    }
    for hint in &state.hints {
        println!("   {} {}", style("hint:").dim(), hint);
    }
}
