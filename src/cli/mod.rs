mod admin;
mod generate;
mod serve;

use anyhow::Result;
use console::style;
use std::path::PathBuf;

use crate::core::config::DEFAULT_API_PORT;
use crate::core::terminal::{self, GuideSection, print_error};

fn print_help() {
    terminal::print_banner();

    GuideSection::new("Server")
        .command("serve", "Run the generation API (SSE + WebSocket + dashboard)")
        .command("  --config <path>", "TOML config file (default: <data_dir>/jumpinai.toml)")
        .command("  --api-host <host>", "Bind address (default 127.0.0.1)")
        .command("  --api-port <port>", "Bind port (default 17990)")
        .print();

    GuideSection::new("Client")
        .command("generate", "Stream a new Jump from a running server")
        .command("  --goals <text>", "What you want to achieve (required)")
        .command("  --challenges <text>", "What is in your way (required)")
        .command("  --industry / --ai-experience", "Optional context")
        .command("  --urgency / --budget", "Optional context")
        .command("  --api-url <url>", "Server base URL")
        .command("  --token <token>", "Bearer token for an authenticated user")
        .print();

    GuideSection::new("Administration")
        .command("token create --user <id>", "Issue an API token [--name <label>]")
        .command("token list --user <id>", "List a user's tokens")
        .command("token revoke --id <id>", "Revoke a token")
        .command("credits grant --user <id> --amount <n>", "Add credits to a balance")
        .command("credits show --user <id>", "Show a credit balance")
        .command("jumps list --user <id>", "List saved Jumps")
        .print();

    println!(
        "\n {} {} <command> [options]\n",
        style("Usage:").bold(),
        style("jumpinai").green()
    );
}

/// Value following `name` anywhere after `start`, if present.
pub(crate) fn flag_value(args: &[String], start: usize, name: &str) -> Option<String> {
    let mut i = start;
    while i < args.len() {
        if args[i] == name {
            return args.get(i + 1).cloned();
        }
        i += 1;
    }
    None
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ServeArgs {
    pub config: Option<PathBuf>,
    pub api_host: Option<String>,
    pub api_port: Option<u16>,
}

pub(crate) fn parse_serve_args(args: &[String], start: usize) -> Result<ServeArgs> {
    let mut parsed = ServeArgs::default();
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    parsed.config = Some(PathBuf::from(&args[i + 1]));
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--api-host" => {
                if i + 1 < args.len() {
                    parsed.api_host = Some(args[i + 1].clone());
                    i += 2;
                } else {
                    i += 1;
                }
            }
            "--api-port" => {
                if i + 1 < args.len() {
                    let port = args[i + 1]
                        .parse()
                        .map_err(|_| anyhow::anyhow!("Invalid --api-port: {}", args[i + 1]))?;
                    parsed.api_port = Some(port);
                    i += 2;
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    Ok(parsed)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GenerateArgs {
    pub api_url: String,
    pub token: Option<String>,
    pub form: serde_json::Value,
}

pub(crate) fn parse_generate_args(args: &[String], start: usize) -> Result<GenerateArgs> {
    let goals = flag_value(args, start, "--goals")
        .ok_or_else(|| anyhow::anyhow!("--goals is required"))?;
    let challenges = flag_value(args, start, "--challenges")
        .ok_or_else(|| anyhow::anyhow!("--challenges is required"))?;

    let mut form = serde_json::json!({ "goals": goals, "challenges": challenges });
    for (flag, key) in [
        ("--industry", "industry"),
        ("--ai-experience", "ai_experience"),
        ("--urgency", "urgency"),
        ("--budget", "budget"),
    ] {
        if let Some(value) = flag_value(args, start, flag) {
            form[key] = serde_json::Value::String(value);
        }
    }

    let api_url = flag_value(args, start, "--api-url")
        .unwrap_or_else(|| format!("http://127.0.0.1:{}", DEFAULT_API_PORT));

    Ok(GenerateArgs {
        api_url: api_url.trim_end_matches('/').to_string(),
        token: flag_value(args, start, "--token"),
        form,
    })
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    let sub_cmd = args.get(2).map(String::as_str).unwrap_or("");
    match args[1].as_str() {
        "serve" => serve::run_server(parse_serve_args(&args, 2)?).await,
        "generate" => generate::run_generate(parse_generate_args(&args, 2)?).await,
        "token" | "tokens" => admin::run_token_command(sub_cmd, &args).await,
        "credits" => admin::run_credits_command(sub_cmd, &args).await,
        "jumps" => admin::run_jumps_command(sub_cmd, &args).await,
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        other => {
            print_error(&format!("Unknown command: {}", other));
            print_help();
            Ok(())
        }
    }
}
