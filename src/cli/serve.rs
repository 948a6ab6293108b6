use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use super::ServeArgs;
use crate::core::config::Config;
use crate::core::lifecycle::{LifecycleManager, LifecycleState};
use crate::core::llm::provider_from_config;
use crate::core::store::ArtifactStore;
use crate::core::terminal::{print_link, print_status, print_success, print_warn};
use crate::interfaces::web::ApiServer;

pub async fn run_server(args: ServeArgs) -> Result<()> {
    let config = Config::load(args.config.as_deref())?.with_api_addr(args.api_host, args.api_port);

    let (log_tx, _) = tokio::sync::broadcast::channel::<String>(500);
    crate::logging::init(config.log_level, log_tx.clone());

    info!("Starting jumpinai {}", env!("CARGO_PKG_VERSION"));

    let store = ArtifactStore::open(&config.db_path)?;
    let provider = provider_from_config(&config.provider)?;
    if provider.is_none() {
        print_warn("No LLM API key configured. Generation requests will fail until one is set.");
    }
    if !config.is_loopback() {
        print_warn("Listening on a non-loopback address: /api routes require a bearer token.");
    }

    let addr = config.api_addr();
    print_status("Provider", &config.provider.id);
    print_status("Database", &config.db_path.display().to_string());
    print_link("API", &format!("http://{addr}"));

    let mut lifecycle = LifecycleManager::new();
    let server = ApiServer::new(config, store, provider, log_tx);
    lifecycle.attach(Arc::new(Mutex::new(server)));
    lifecycle.start().await?;
    if lifecycle.state() == LifecycleState::Ready {
        print_success("Ready. Press Ctrl+C to stop.");
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");
    lifecycle.shutdown().await?;
    Ok(())
}
