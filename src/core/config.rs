//! Runtime configuration.
//!
//! Layering, lowest to highest precedence: built-in defaults, an optional
//! `jumpinai.toml`, environment variables, then CLI flags (applied by the
//! caller through [`Config::with_api_addr`]).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::generation::FailurePolicy;

pub const DEFAULT_API_HOST: &str = "127.0.0.1";
pub const DEFAULT_API_PORT: u16 = 17990;
pub const CONFIG_FILE_NAME: &str = "jumpinai.toml";

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub api_host: String,
    pub api_port: u16,
    pub log_level: tracing::Level,
    pub provider: ProviderConfig,
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Registry id (`xai` or `openai`).
    pub id: String,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Delay between WebSocket component emissions.
    pub pacing: Duration,
    pub charge_credits: bool,
    pub sse_policy: FailurePolicy,
    pub realtime_policy: FailurePolicy,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            pacing: Duration::from_millis(300),
            charge_credits: false,
            sse_policy: FailurePolicy::ContinueOnError,
            realtime_policy: FailurePolicy::HaltOnError,
        }
    }
}

/// Shape of `jumpinai.toml`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    data_dir: Option<PathBuf>,
    db_path: Option<PathBuf>,
    log: Option<String>,
    server: FileServer,
    provider: FileProvider,
    generation: FileGeneration,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileServer {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileProvider {
    id: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileGeneration {
    pacing_ms: Option<u64>,
    charge_credits: Option<bool>,
    sse_policy: Option<String>,
    realtime_policy: Option<String>,
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("jumpinai")
}

impl Config {
    /// Load from `explicit_file` (must exist) or `<data_dir>/jumpinai.toml`
    /// (optional), then apply the process environment.
    pub fn load(explicit_file: Option<&Path>) -> Result<Self> {
        Self::load_with(explicit_file, |key| std::env::var(key).ok())
    }

    pub(crate) fn load_with<F>(explicit_file: Option<&Path>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env_data_dir = env("JUMPINAI_DATA_DIR").map(PathBuf::from);

        let file = match explicit_file {
            Some(path) => read_file_config(path)?,
            None => {
                let dir = env_data_dir.clone().unwrap_or_else(default_data_dir);
                let candidate = dir.join(CONFIG_FILE_NAME);
                if candidate.exists() {
                    read_file_config(&candidate)?
                } else {
                    FileConfig::default()
                }
            }
        };

        let data_dir = env_data_dir
            .or(file.data_dir)
            .unwrap_or_else(default_data_dir);
        let db_path = env("JUMPINAI_DB_PATH")
            .map(PathBuf::from)
            .or(file.db_path)
            .unwrap_or_else(|| data_dir.join("jumpinai.db"));

        let api_host = env("JUMPINAI_API_HOST")
            .or(file.server.host)
            .unwrap_or_else(|| DEFAULT_API_HOST.to_string());
        let api_port = match env("JUMPINAI_API_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("JUMPINAI_API_PORT is not a port: {raw}"))?,
            None => file.server.port.unwrap_or(DEFAULT_API_PORT),
        };

        let log_raw = env("JUMPINAI_LOG")
            .or(file.log)
            .unwrap_or_else(|| "info".to_string());
        let log_level = parse_level(&log_raw)?;

        let provider_id = env("JUMPINAI_PROVIDER")
            .or(file.provider.id)
            .unwrap_or_else(|| "xai".to_string())
            .to_lowercase();
        let provider_key_var = match provider_id.as_str() {
            "openai" => "OPENAI_API_KEY",
            _ => "XAI_API_KEY",
        };
        let api_key = env("JUMPINAI_API_KEY")
            .or_else(|| env(provider_key_var))
            .or(file.provider.api_key)
            .filter(|k| !k.trim().is_empty());

        let provider = ProviderConfig {
            id: provider_id,
            api_key,
            model: env("JUMPINAI_MODEL").or(file.provider.model),
            base_url: env("JUMPINAI_PROVIDER_URL").or(file.provider.base_url),
        };

        let mut generation = GenerationConfig::default();
        if let Some(ms) = env("JUMPINAI_PACING_MS")
            .map(|raw| {
                raw.parse::<u64>()
                    .with_context(|| format!("JUMPINAI_PACING_MS is not a number: {raw}"))
            })
            .transpose()?
            .or(file.generation.pacing_ms)
        {
            generation.pacing = Duration::from_millis(ms);
        }
        if let Some(flag) = env("JUMPINAI_CHARGE_CREDITS")
            .map(|raw| parse_bool(&raw))
            .or(file.generation.charge_credits)
        {
            generation.charge_credits = flag;
        }
        if let Some(raw) = env("JUMPINAI_SSE_POLICY").or(file.generation.sse_policy) {
            generation.sse_policy = parse_policy(&raw)?;
        }
        if let Some(raw) = env("JUMPINAI_REALTIME_POLICY").or(file.generation.realtime_policy) {
            generation.realtime_policy = parse_policy(&raw)?;
        }

        Ok(Self {
            data_dir,
            db_path,
            api_host,
            api_port,
            log_level,
            provider,
            generation,
        })
    }

    pub fn with_api_addr(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.api_host = host;
        }
        if let Some(port) = port {
            self.api_port = port;
        }
        self
    }

    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    pub fn is_loopback(&self) -> bool {
        matches!(self.api_host.as_str(), "127.0.0.1" | "::1" | "localhost")
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("Invalid config file {}", path.display()))
}

fn parse_level(raw: &str) -> Result<tracing::Level> {
    raw.trim()
        .parse::<tracing::Level>()
        .map_err(|_| anyhow::anyhow!("Unknown log level: {raw}"))
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_policy(raw: &str) -> Result<FailurePolicy> {
    match raw.trim().to_lowercase().as_str() {
        "continue" | "continue_on_error" => Ok(FailurePolicy::ContinueOnError),
        "halt" | "halt_on_error" => Ok(FailurePolicy::HaltOnError),
        other => Err(anyhow::anyhow!(
            "Unknown failure policy '{other}' (expected 'continue' or 'halt')"
        )),
    }
}
