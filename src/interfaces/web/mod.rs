pub(crate) mod auth;
mod error;
mod handlers;
pub(crate) mod router;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot};
use tokio_stream::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{error, info};

use crate::core::config::Config;
use crate::core::generation::{FailurePolicy, JumpSequencer};
use crate::core::lifecycle::LifecycleComponent;
use crate::core::llm::LlmProvider;
use crate::core::store::ArtifactStore;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: ArtifactStore,
    /// `None` when no API key is configured; generation endpoints refuse.
    pub(crate) provider: Option<Arc<dyn LlmProvider>>,
    pub(crate) config: Arc<Config>,
    pub(crate) log_tx: broadcast::Sender<String>,
}

impl AppState {
    pub(crate) fn sequencer(&self, policy: FailurePolicy) -> Option<JumpSequencer> {
        let provider = self.provider.clone()?;
        let model = provider.default_model().to_string();
        Some(JumpSequencer::new(provider, model, policy))
    }
}

pub struct ApiServer {
    state: AppState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ApiServer {
    pub fn new(
        config: Config,
        store: ArtifactStore,
        provider: Option<Arc<dyn LlmProvider>>,
        log_tx: broadcast::Sender<String>,
    ) -> Self {
        Self {
            state: AppState {
                store,
                provider,
                config: Arc::new(config),
                log_tx,
            },
            shutdown_tx: None,
        }
    }
}

// --- SSE Logs (used by router) ---

async fn sse_logs_endpoint(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.log_tx.subscribe();
    let stream = BroadcastStream::new(receiver).map(|msg| match msg {
        Ok(log) => Ok(Event::default().data(log)),
        Err(_) => Ok(Event::default().data("Log stream lagged")),
    });

    Sse::new(stream)
}

#[async_trait]
impl LifecycleComponent for ApiServer {
    async fn on_init(&mut self) -> Result<()> {
        info!("API Server initializing...");
        match &self.state.provider {
            Some(provider) => info!(
                "Generation provider: {} ({})",
                provider.provider_id(),
                provider.default_model()
            ),
            None => {
                tracing::warn!("No LLM API key configured; generation endpoints will return 500")
            }
        }
        Ok(())
    }

    async fn on_start(&mut self) -> Result<()> {
        let addr = self.state.config.api_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind API server to {addr}"))?;
        let app = router::build_api_router(self.state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        self.shutdown_tx = Some(shutdown_tx);

        info!("API Server running at http://{addr}");
        tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = serve.await {
                error!("API Server crashed: {}", e);
            }
        });
        Ok(())
    }

    async fn on_shutdown(&mut self) -> Result<()> {
        info!("API Server shutting down...");
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        Ok(())
    }
}
