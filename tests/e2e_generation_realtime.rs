
use e2e_harness::{COMPREHENSIVE_TOKENS, MockLlmServer, ServerHarness, TestResult, sample_form};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;

const REALTIME_PATH: &str = "/functions/v1/jumps-realtime-generation";

/// Sends one `generate` request and collects messages until a terminal one.
async fn run_realtime(server: &ServerHarness, payload: Value) -> TestResult<Vec<Value>> {
    let (mut ws, _) = tokio_tungstenite::connect_async(server.ws_url(REALTIME_PATH)).await?;
    ws.send(Message::Text(
        json!({ "type": "generate", "payload": payload }).to_string(),
    ))
    .await?;

    let mut received = Vec::new();
    loop {
        let next = tokio::time::timeout(Duration::from_secs(20), ws.next()).await?;
        let text = match next {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(_)) => continue,
            _ => break,
        };
        let message: Value = serde_json::from_str(&text)?;
        let terminal = message["type"] == "generation_complete"
            || (message["type"] == "error" && message["fatal"] != json!(false));
        received.push(message);
        if terminal {
            break;
        }
    }
    let _ = ws.close(None).await;
    Ok(received)
}

fn kinds(messages: &[Value]) -> Vec<&str> {
    messages
        .iter()
        .map(|m| m["type"].as_str().unwrap_or_default())
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn realtime_generation_reports_components_and_saves() -> TestResult<()> {
    let mock = match MockLlmServer::start().await {
        Ok(mock) => mock,
        Err(err) if e2e_harness::is_bind_denied(err.as_ref()) => {
            eprintln!("Skipping realtime E2E test: socket bind not permitted");
            return Ok(());
        }
        Err(err) => return Err(err),
    };
    let server = ServerHarness::spawn(&mock.base_url(), &[]).await?;

    let messages = run_realtime(&server, sample_form()).await?;
    let types = kinds(&messages);

    assert_eq!(types.first(), Some(&"status"));
    assert!(types.contains(&"infrastructure_ready"));
    assert_eq!(types.iter().filter(|t| **t == "plan_ready").count(), 3);
    // 1 workflow + 1 blueprint + 1 strategy + 9 tool prompts
    assert_eq!(types.iter().filter(|t| **t == "component_ready").count(), 12);
    assert_eq!(types.last(), Some(&"generation_complete"));

    let saved = messages
        .iter()
        .find(|m| m["type"] == "jump_saved")
        .expect("jump_saved is sent before completion");
    let jump_id = saved["jumpId"].as_str().unwrap_or_default().to_string();
    let complete = messages.last().unwrap();
    assert_eq!(complete["jumpId"], json!(jump_id));
    assert_eq!(complete["title"], "Content Agency Launchpad");

    let (status, jump) = server.get_json(&format!("/api/jumps/{jump_id}")).await?;
    assert_eq!(status, 200);
    assert_eq!(jump["jump"]["title"], "Content Agency Launchpad");

    drop(server);
    mock.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn realtime_generation_halts_on_provider_failure() -> TestResult<()> {
    let mock = match MockLlmServer::start_failing_at(Some(COMPREHENSIVE_TOKENS)).await {
        Ok(mock) => mock,
        Err(err) if e2e_harness::is_bind_denied(err.as_ref()) => {
            eprintln!("Skipping realtime E2E test: socket bind not permitted");
            return Ok(());
        }
        Err(err) => return Err(err),
    };
    let server = ServerHarness::spawn(&mock.base_url(), &[]).await?;

    let messages = run_realtime(&server, sample_form()).await?;
    let last = messages.last().expect("at least one message");
    assert_eq!(last["type"], "error");
    assert_eq!(last["step"], 3);
    assert_eq!(last["fatal"], true);
    assert!(!kinds(&messages).contains(&"generation_complete"));

    // Tool prompts are never requested once the run halts.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(mock.budgets_seen().len(), 3);

    let (_, listing) = server.get_json("/api/jumps").await?;
    assert_eq!(listing["jumps"].as_array().map(Vec::len), Some(0));

    drop(server);
    mock.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn realtime_policy_can_be_switched_to_continue() -> TestResult<()> {
    let mock = match MockLlmServer::start_failing_at(Some(COMPREHENSIVE_TOKENS)).await {
        Ok(mock) => mock,
        Err(err) if e2e_harness::is_bind_denied(err.as_ref()) => {
            eprintln!("Skipping realtime E2E test: socket bind not permitted");
            return Ok(());
        }
        Err(err) => return Err(err),
    };
    let server =
        ServerHarness::spawn(&mock.base_url(), &[("JUMPINAI_REALTIME_POLICY", "continue")])
            .await?;

    let messages = run_realtime(&server, sample_form()).await?;
    let types = kinds(&messages);
    assert!(types.contains(&"error"));
    assert_eq!(types.last(), Some(&"generation_complete"));
    assert_eq!(messages.last().unwrap()["failedSteps"], json!([3]));

    drop(server);
    mock.shutdown().await;
    Ok(())
}
