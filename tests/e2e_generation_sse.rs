
use e2e_harness::{COMPREHENSIVE_TOKENS, MockLlmServer, ServerHarness, TestResult, sample_form};
use serde_json::{Value, json};

fn shape(frames: &[Value]) -> Vec<(u64, String)> {
    frames
        .iter()
        .map(|f| {
            (
                f["step"].as_u64().unwrap_or_default(),
                f["type"].as_str().unwrap_or_default().to_string(),
            )
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn streams_four_steps_then_complete_and_persists() -> TestResult<()> {
    let mock = match MockLlmServer::start().await {
        Ok(mock) => mock,
        Err(err) if e2e_harness::is_bind_denied(err.as_ref()) => {
            eprintln!("Skipping SSE E2E test: socket bind not permitted");
            return Ok(());
        }
        Err(err) => return Err(err),
    };
    let server = ServerHarness::spawn(&mock.base_url(), &[]).await?;

    let (status, frames) = server.stream_generation(sample_form()).await?;
    assert_eq!(status, 200);
    assert_eq!(
        shape(&frames),
        vec![
            (1, "naming".to_string()),
            (2, "overview".to_string()),
            (3, "comprehensive".to_string()),
            (4, "tool_prompts".to_string()),
            (9, "complete".to_string()),
        ],
        "server log:\n{}",
        server.server_log()
    );
    assert_eq!(frames[0]["data"]["jumpName"], "Content Agency Launchpad");

    let jump_id = frames[4]["data"]["jumpId"]
        .as_str()
        .expect("complete frame carries the saved jump id")
        .to_string();

    let (status, listing) = server.get_json("/api/jumps").await?;
    assert_eq!(status, 200);
    assert_eq!(listing["jumps"][0]["id"], json!(jump_id));
    assert_eq!(listing["jumps"][0]["title"], "Content Agency Launchpad");

    let (_, prompts) = server
        .get_json(&format!("/api/jumps/{jump_id}/tool-prompts"))
        .await?;
    assert_eq!(prompts["toolPrompts"].as_array().map(Vec::len), Some(9));

    let (_, components) = server
        .get_json(&format!("/api/jumps/{jump_id}/components"))
        .await?;
    assert_eq!(components["components"].as_array().map(Vec::len), Some(3));

    drop(server);
    mock.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn provider_failure_mid_run_does_not_stop_the_stream() -> TestResult<()> {
    let mock = match MockLlmServer::start_failing_at(Some(COMPREHENSIVE_TOKENS)).await {
        Ok(mock) => mock,
        Err(err) if e2e_harness::is_bind_denied(err.as_ref()) => {
            eprintln!("Skipping SSE E2E test: socket bind not permitted");
            return Ok(());
        }
        Err(err) => return Err(err),
    };
    let server = ServerHarness::spawn(&mock.base_url(), &[]).await?;

    let (_, frames) = server.stream_generation(sample_form()).await?;
    assert_eq!(
        shape(&frames),
        vec![
            (1, "naming".to_string()),
            (2, "overview".to_string()),
            (3, "error".to_string()),
            (4, "tool_prompts".to_string()),
            (9, "complete".to_string()),
        ]
    );
    assert!(frames[2]["error"].as_str().unwrap_or_default().contains("500"));
    assert_eq!(frames[4]["data"]["failedSteps"], json!([3]));
    assert_eq!(mock.budgets_seen().len(), 4);

    drop(server);
    mock.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn invalid_form_is_rejected_before_any_model_call() -> TestResult<()> {
    let mock = match MockLlmServer::start().await {
        Ok(mock) => mock,
        Err(err) if e2e_harness::is_bind_denied(err.as_ref()) => {
            eprintln!("Skipping SSE E2E test: socket bind not permitted");
            return Ok(());
        }
        Err(err) => return Err(err),
    };
    let server = ServerHarness::spawn(&mock.base_url(), &[]).await?;

    let (status, frames) = server
        .stream_generation(json!({ "goals": "too short", "challenges": "x" }))
        .await?;
    assert_eq!(status, 400);
    assert!(frames.is_empty());
    assert!(mock.budgets_seen().is_empty());

    drop(server);
    mock.shutdown().await;
    Ok(())
}
