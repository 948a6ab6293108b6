use serde_json::Value;
use tracing::{debug, warn};

use super::parse::{ParseError, parse_model_json};
use super::prompts::{self, StepContext};
use super::request::ValidatedRequest;
use super::step::Step;
use crate::core::llm::{CompletionOptions, LlmProvider, ProviderError};

/// Result of one step's model call.
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub data: Value,
    /// Unparsed model text; later prompts quote it verbatim.
    pub raw: String,
    /// Present when `data` is the step's fallback payload.
    pub parse_error: Option<ParseError>,
    pub warnings: Vec<String>,
}

/// Run one step against the model: build prompts, make a single call with
/// the step's token budget, then parse and shape-check the reply.
///
/// Provider failures are returned to the caller. Unusable output is not an
/// error here; it yields the fallback payload with `parse_error` set.
pub async fn invoke_step(
    provider: &dyn LlmProvider,
    model: &str,
    step: Step,
    request: &ValidatedRequest,
    context: &StepContext,
) -> Result<StepOutput, ProviderError> {
    let messages = prompts::build_messages(step, request, context);
    let options = CompletionOptions {
        max_tokens: step.max_tokens(),
        temperature: step.temperature(),
    };

    let raw = provider.complete(model, &messages, options).await?;
    debug!("step {} returned {} chars", step.number(), raw.len());

    let parsed = parse_model_json(&raw).and_then(|value| prompts::normalize(step, value));
    Ok(match parsed {
        Ok((data, warnings)) => StepOutput {
            data,
            raw,
            parse_error: None,
            warnings,
        },
        Err(e) => {
            warn!("step {} output unusable, using fallback: {}", step.number(), e);
            StepOutput {
                data: prompts::fallback(step, request),
                raw,
                parse_error: Some(e),
                warnings: Vec::new(),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::generation::request::GenerationRequest;
    use crate::core::generation::testing::ScriptedProvider;
    use serde_json::json;

    fn req() -> ValidatedRequest {
        GenerationRequest::new(
            "Launch an AI content agency serving small businesses",
            "No technical background, limited budget, need results fast",
        )
        .validate()
        .unwrap()
    }

    #[tokio::test]
    async fn scenario_naming_overview_and_tool_prompts() {
        let provider = ScriptedProvider::happy();
        let ctx = StepContext::default();

        let naming = invoke_step(&provider, "m", Step::Naming, &req(), &ctx).await.unwrap();
        let name = naming.data["jumpName"].as_str().unwrap();
        let words = name.split_whitespace().count();
        assert!((3..=5).contains(&words), "{name}");

        let overview = invoke_step(&provider, "m", Step::Overview, &req(), &ctx).await.unwrap();
        assert!(overview.data["executiveSummary"].as_str().is_some_and(|s| !s.is_empty()));
        assert!(overview.data["roadmap"].as_object().is_some_and(|r| !r.is_empty()));

        let tools = invoke_step(&provider, "m", Step::ToolPrompts, &req(), &ctx).await.unwrap();
        let combos = tools.data["toolPrompts"].as_array().unwrap();
        assert_eq!(combos.len(), 9);
        let distinct: std::collections::HashSet<&str> = combos
            .iter()
            .map(|c| c["toolName"].as_str().unwrap())
            .collect();
        assert!(distinct.len() >= 6);
        assert!(tools.warnings.is_empty());
    }

    #[tokio::test]
    async fn fenced_output_matches_plain_output() {
        let plain = ScriptedProvider::happy();
        let fenced = ScriptedProvider::happy().fenced();
        let a = invoke_step(&plain, "m", Step::Overview, &req(), &StepContext::default())
            .await
            .unwrap();
        let b = invoke_step(&fenced, "m", Step::Overview, &req(), &StepContext::default())
            .await
            .unwrap();
        assert_eq!(a.data, b.data);
        assert!(b.parse_error.is_none());
    }

    #[tokio::test]
    async fn garbage_output_degrades_to_fallback() {
        let provider = ScriptedProvider::happy().with_raw(Step::Comprehensive, "Sorry, I can't.");
        let out = invoke_step(&provider, "m", Step::Comprehensive, &req(), &StepContext::default())
            .await
            .unwrap();
        assert!(matches!(out.parse_error, Some(ParseError::NoJson(_))));
        assert_eq!(out.data, prompts::fallback(Step::Comprehensive, &req()));
        assert_eq!(out.raw, "Sorry, I can't.");
    }

    #[tokio::test]
    async fn provider_failure_is_returned() {
        let provider = ScriptedProvider::happy().failing_at(Step::Overview, 500);
        let err = invoke_step(&provider, "m", Step::Overview, &req(), &StepContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn same_inputs_same_request_and_no_shared_state() {
        let provider = ScriptedProvider::happy();
        let ctx = StepContext {
            jump_name: Some("Agency Launch Plan".to_string()),
            overview_raw: Some(json!({"executiveSummary": "x"}).to_string()),
        };
        let first = invoke_step(&provider, "m", Step::ToolPrompts, &req(), &ctx).await.unwrap();
        let second = invoke_step(&provider, "m", Step::ToolPrompts, &req(), &ctx).await.unwrap();
        // ids are generated per combo; compare everything else
        let strip = |v: &Value| {
            v["toolPrompts"]
                .as_array()
                .unwrap()
                .iter()
                .map(|c| (c["toolName"].clone(), c["promptText"].clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(strip(&first.data), strip(&second.data));
        let calls = provider.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], calls[1]);
        assert_eq!(calls[0].max_tokens, 50_000);
    }
}
