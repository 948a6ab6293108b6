//! Local administration against the artifact store. These commands open the
//! database directly, so run them on the machine hosting `jumpinai serve`.

use anyhow::Result;
use console::style;

use super::flag_value;
use crate::core::config::Config;
use crate::core::store::ArtifactStore;
use crate::core::terminal::{print_error, print_info, print_success};

fn open_store(args: &[String]) -> Result<ArtifactStore> {
    let config_path = flag_value(args, 2, "--config").map(std::path::PathBuf::from);
    let config = Config::load(config_path.as_deref())?;
    ArtifactStore::open(&config.db_path)
}

fn required(args: &[String], name: &str, usage: &str) -> Option<String> {
    let value = flag_value(args, 3, name).filter(|v| !v.trim().is_empty());
    if value.is_none() {
        println!("{}", style(format!("Usage: {}", usage)).bold());
    }
    value
}

pub async fn run_token_command(sub_cmd: &str, args: &[String]) -> Result<()> {
    match sub_cmd {
        "create" => {
            let Some(user) = required(args, "--user", "jumpinai token create --user <id> [--name <label>]")
            else {
                return Ok(());
            };
            let name = flag_value(args, 3, "--name").unwrap_or_else(|| "cli".to_string());
            let store = open_store(args)?;
            let (token, record) = store.create_api_token(&user, &name).await?;

            println!();
            print_success(&format!("API token '{}' created for user '{}'.", record.name, user));
            println!("\n  {} {}\n", style("Token:").bold(), style(&token).green().bold());
            println!(
                "  {} Save this token now. It will not be shown again.",
                style("!").yellow()
            );
            println!(
                "  {} Use it with: Authorization: Bearer {}\n",
                style("->").cyan(),
                token
            );
        }
        "list" | "ls" => {
            let Some(user) = required(args, "--user", "jumpinai token list --user <id>") else {
                return Ok(());
            };
            let tokens = open_store(args)?.list_api_tokens(&user).await?;
            if tokens.is_empty() {
                print_info(&format!("No API tokens for user '{}'.", user));
                return Ok(());
            }
            println!("\n  {:<38} {:<20} {}", style("ID").bold(), style("NAME").bold(), style("CREATED").bold());
            for token in tokens {
                println!("  {:<38} {:<20} {}", token.id, token.name, token.created_at);
            }
            println!();
        }
        "revoke" | "delete" | "rm" => {
            let Some(id) = required(args, "--id", "jumpinai token revoke --id <token-id>") else {
                return Ok(());
            };
            match open_store(args)?.delete_api_token(&id).await {
                Ok(()) => print_success(&format!("Token {} revoked.", id)),
                Err(e) => print_error(&format!("Error: {}", e)),
            }
        }
        _ => {
            print_error("Unknown token command. Expected: create, list, revoke");
        }
    }
    Ok(())
}

pub async fn run_credits_command(sub_cmd: &str, args: &[String]) -> Result<()> {
    match sub_cmd {
        "grant" => {
            let usage = "jumpinai credits grant --user <id> --amount <n>";
            let Some(user) = required(args, "--user", usage) else {
                return Ok(());
            };
            let Some(raw_amount) = required(args, "--amount", usage) else {
                return Ok(());
            };
            let amount: i64 = raw_amount
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid --amount: {}", raw_amount))?;
            if amount <= 0 {
                anyhow::bail!("--amount must be positive");
            }
            let reason = flag_value(args, 3, "--reason").unwrap_or_else(|| "cli grant".to_string());
            let balance = open_store(args)?.grant_credits(&user, amount, &reason).await?;
            print_success(&format!("Granted {} credits to '{}'. Balance: {}", amount, user, balance));
        }
        "show" => {
            let Some(user) = required(args, "--user", "jumpinai credits show --user <id>") else {
                return Ok(());
            };
            let balance = open_store(args)?.credit_balance(&user).await?;
            println!("\n  {} {}\n", style(format!("{}:", user)).bold(), balance);
        }
        _ => print_error("Unknown credits command. Expected: grant, show"),
    }
    Ok(())
}

pub async fn run_jumps_command(sub_cmd: &str, args: &[String]) -> Result<()> {
    match sub_cmd {
        "list" | "ls" => {
            let user = flag_value(args, 3, "--user")
                .unwrap_or_else(|| crate::core::store::GUEST_USER.to_string());
            let jumps = open_store(args)?.list_jumps(&user).await?;
            if jumps.is_empty() {
                print_info(&format!("No saved Jumps for '{}'.", user));
                return Ok(());
            }
            println!();
            for jump in jumps {
                println!(
                    "  {}  {}  {}",
                    style(&jump.id).dim(),
                    style(&jump.title).bold(),
                    style(format!("{} tool prompts, {}", jump.tool_prompt_count, jump.created_at)).dim()
                );
            }
            println!();
        }
        _ => print_error("Unknown jumps command. Expected: list"),
    }
    Ok(())
}
