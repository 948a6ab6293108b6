use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::registry::{AuthType, ProviderDef};
use super::{ChatMessage, CompletionOptions, LlmProvider};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider} API error ({status}): {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} returned no choices")]
    EmptyResponse { provider: String },
}

// ── OpenAI-compatible request/response ──

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessageOwned,
}

#[derive(Deserialize)]
struct OpenAiMessageOwned {
    #[serde(default)]
    content: Option<String>,
}

pub struct GenericProvider {
    provider_def: ProviderDef,
    api_key: String,
    client: Client,
}

impl GenericProvider {
    pub fn new(provider_def: ProviderDef, api_key: String) -> Self {
        Self {
            provider_def,
            api_key,
            client: Client::new(),
        }
    }

    fn transport_err(&self, source: reqwest::Error) -> ProviderError {
        ProviderError::Transport {
            provider: self.provider_def.name.clone(),
            source,
        }
    }
}

#[async_trait]
impl LlmProvider for GenericProvider {
    fn provider_id(&self) -> &str {
        &self.provider_def.id
    }

    fn default_model(&self) -> &str {
        &self.provider_def.default_model
    }

    async fn complete(
        &self,
        model_id: &str,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> Result<String, ProviderError> {
        let req = OpenAiRequest {
            model: model_id,
            messages: messages
                .iter()
                .map(|m| OpenAiMessage {
                    role: &m.role,
                    content: &m.content,
                })
                .collect(),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        let mut request = self.client.post(&self.provider_def.base_url).json(&req);
        request = match self.provider_def.auth.auth_type {
            AuthType::Bearer => request.bearer_auth(&self.api_key),
            AuthType::Header => {
                let name = self
                    .provider_def
                    .auth
                    .header_name
                    .as_deref()
                    .unwrap_or("x-api-key");
                request.header(name, &self.api_key)
            }
        };
        for (name, value) in &self.provider_def.extra_headers {
            request = request.header(name, value);
        }

        debug!(
            "{} completion: model={} max_tokens={}",
            self.provider_def.name, model_id, options.max_tokens
        );
        let res = request.send().await.map_err(|e| self.transport_err(e))?;
        let status = res.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                provider: self.provider_def.name.clone(),
                status: status.as_u16(),
                body: res.text().await.unwrap_or_default(),
            });
        }

        let parsed: OpenAiResponse = res.json().await.map_err(|e| self.transport_err(e))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| ProviderError::EmptyResponse {
                provider: self.provider_def.name.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::llm::registry::AuthConfig;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::{Value, json};

    fn def_for(url: String) -> ProviderDef {
        ProviderDef {
            id: "mock".to_string(),
            name: "Mock".to_string(),
            base_url: url,
            auth: AuthConfig {
                auth_type: AuthType::Bearer,
                header_name: None,
            },
            default_model: "mock-1".to_string(),
            models: vec![],
            extra_headers: Default::default(),
        }
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{}/v1/chat/completions", addr)
    }

    #[tokio::test]
    async fn sends_budget_and_returns_content() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|headers: axum::http::HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(
                    headers.get("authorization").unwrap().to_str().unwrap(),
                    "Bearer sk-test"
                );
                assert_eq!(body["max_tokens"], 500);
                assert_eq!(body["messages"][0]["role"], "system");
                Json(json!({"choices": [{"message": {"content": "hello"}}]}))
            }),
        );
        let url = serve(app).await;
        let provider = GenericProvider::new(def_for(url), "sk-test".to_string());
        let out = provider
            .complete(
                "mock-1",
                &[ChatMessage::system("s"), ChatMessage::user("u")],
                CompletionOptions {
                    max_tokens: 500,
                    temperature: 0.2,
                },
            )
            .await
            .unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn non_success_status_is_typed() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream down") }),
        );
        let url = serve(app).await;
        let provider = GenericProvider::new(def_for(url), "k".to_string());
        let err = provider
            .complete("m", &[ChatMessage::user("u")], CompletionOptions::default())
            .await
            .unwrap_err();
        match err {
            ProviderError::Status { status, body, .. } => {
                assert_eq!(status, 500);
                assert_eq!(body, "upstream down");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(json!({"choices": []})) }),
        );
        let url = serve(app).await;
        let provider = GenericProvider::new(def_for(url), "k".to_string());
        let err = provider
            .complete("m", &[ChatMessage::user("u")], CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse { .. }));
    }
}
