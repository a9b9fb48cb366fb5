//! Messaging tool tests for Courier MCP.
//!
//! Runs `read_thread` and `send_message` against the fake Slack API:
//! - Role classification and status-marker filtering
//! - Recent-window `limit`, across pages for long threads
//! - Structured failures: missing credential, upstream rejection, network error
//! - The transport loop keeps serving after a failure

use super::common::*;
use serde_json::json;

// =============================================================================
// READ THREAD
// =============================================================================

pub async fn test_read_thread_filters_status_messages(ctx: &TestContext) {
    println!("  🧪 test_read_thread_filters_status_messages");

    let response = call_tool(
        &ctx.server(),
        "read_thread",
        json!({"channel": OPS_CHANNEL, "thread_ts": OPS_THREAD}),
    )
    .await;

    let result = result_of(&response);
    assert_eq!(result["isError"], false);
    assert_eq!(
        result["structuredContent"],
        json!({
            "success": true,
            "messages": [
                {"role": "user", "text": "Which stores missed a deposit yesterday?"},
                {"role": "assistant", "text": "S004 has no deposit for 2026-03-31."},
                {"role": "user", "text": "Ping their carrier."},
                {"role": "assistant", "text": "Draft: Brinks, please confirm pickup at S004."}
            ]
        })
    );

    println!("     ✓ Status chatter dropped, bot messages tagged assistant");
}

pub async fn test_read_thread_limit_keeps_most_recent(ctx: &TestContext) {
    println!("  🧪 test_read_thread_limit_keeps_most_recent");

    let response = call_tool(
        &ctx.server(),
        "read_thread",
        json!({"channel": OPS_CHANNEL, "thread_ts": OPS_THREAD, "limit": 3}),
    )
    .await;

    let messages = result_of(&response)["structuredContent"]["messages"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(
        messages,
        vec![
            json!({"role": "user", "text": "Ping their carrier."}),
            json!({"role": "assistant", "text": "Draft: Brinks, please confirm pickup at S004."}),
        ]
    );

    println!("     ✓ Last 3 replies fetched, 1 status message filtered");
}

pub async fn test_read_thread_follows_pagination(ctx: &TestContext) {
    println!("  🧪 test_read_thread_follows_pagination");

    let response = call_tool(
        &ctx.server(),
        "read_thread",
        json!({"channel": OPS_CHANNEL, "thread_ts": LONG_THREAD, "limit": 10}),
    )
    .await;

    let texts: Vec<String> = result_of(&response)["structuredContent"]["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["text"].as_str().unwrap().to_string())
        .collect();
    let expected: Vec<String> = (LONG_THREAD_REPLIES - 10..LONG_THREAD_REPLIES)
        .map(|i| format!("reply {i}"))
        .collect();
    assert_eq!(texts, expected);

    println!("     ✓ {} replies over two pages, newest 10 returned", LONG_THREAD_REPLIES);
}

pub async fn test_read_thread_upstream_error(ctx: &TestContext) {
    println!("  🧪 test_read_thread_upstream_error");

    let response = call_tool(
        &ctx.server(),
        "read_thread",
        json!({"channel": OPS_CHANNEL, "thread_ts": "1.000"}),
    )
    .await;

    let result = result_of(&response);
    assert_eq!(result["isError"], true);
    assert_eq!(
        result["structuredContent"],
        json!({"success": false, "error": "thread_not_found"})
    );

    println!("     ✓ Slack error code returned as structured failure");
}

pub async fn test_read_thread_missing_credential(ctx: &TestContext) {
    println!("  🧪 test_read_thread_missing_credential");

    let server = ctx.server_without_token();
    let input = format!(
        "{}\n{}\n",
        tool_call_line(1, "read_thread", json!({"channel": OPS_CHANNEL, "thread_ts": OPS_THREAD})),
        tool_call_line(2, "list_tables", json!({})),
    );
    let responses = exchange(&server, &input).await;

    assert_eq!(responses.len(), 2);
    assert_eq!(
        result_of(&responses[0])["structuredContent"],
        json!({"success": false, "error": format!("{SLACK_TOKEN_ENV} not configured")})
    );
    assert_eq!(result_of(&responses[0])["isError"], true);
    assert_eq!(responses[1]["id"], 2);
    assert!(responses[1].get("result").is_some());

    println!("     ✓ Missing token is a result, not an exception; loop alive");
}

// =============================================================================
// SEND MESSAGE
// =============================================================================

pub async fn test_send_message(ctx: &TestContext) {
    println!("  🧪 test_send_message");

    ctx.take_posted();
    let response = call_tool(
        &ctx.server(),
        "send_message",
        json!({"channel": OPS_CHANNEL, "message": "Brinks confirmed pickup at S004 for Friday."}),
    )
    .await;

    let result = result_of(&response);
    assert_eq!(result["isError"], false);
    assert_eq!(
        result["structuredContent"],
        json!({"success": true, "channel": OPS_CHANNEL})
    );
    assert_eq!(
        ctx.take_posted(),
        vec![(
            OPS_CHANNEL.to_string(),
            "Brinks confirmed pickup at S004 for Friday.".to_string()
        )]
    );

    println!("     ✓ Message posted once with the exact text");
}

pub async fn test_send_message_not_in_channel(ctx: &TestContext) {
    println!("  🧪 test_send_message_not_in_channel");

    ctx.take_posted();
    let response = call_tool(
        &ctx.server(),
        "send_message",
        json!({"channel": PRIVATE_CHANNEL, "message": "hello"}),
    )
    .await;

    assert_eq!(
        result_of(&response)["structuredContent"],
        json!({"success": false, "error": "not_in_channel"})
    );
    assert!(ctx.take_posted().is_empty());

    println!("     ✓ Platform error code passed through");
}

pub async fn test_send_message_missing_credential(ctx: &TestContext) {
    println!("  🧪 test_send_message_missing_credential");

    ctx.take_posted();
    let response = call_tool(
        &ctx.server_without_token(),
        "send_message",
        json!({"channel": OPS_CHANNEL, "message": "hello"}),
    )
    .await;

    assert_eq!(
        result_of(&response)["structuredContent"]["error"],
        format!("{SLACK_TOKEN_ENV} not configured")
    );
    assert!(ctx.take_posted().is_empty());

    println!("     ✓ Nothing posted without a credential");
}

pub async fn test_unreachable_api(ctx: &TestContext) {
    println!("  🧪 test_unreachable_api");

    let mut config = ctx.config();
    config.slack.api_base_url = "http://127.0.0.1:9/api".to_string();
    let server = server_from(&config);

    let response = call_tool(&server, "send_message", json!({"channel": OPS_CHANNEL, "message": "hi"})).await;

    let structured = &result_of(&response)["structuredContent"];
    assert_eq!(structured["success"], false);
    assert!(
        structured["error"]
            .as_str()
            .unwrap()
            .starts_with("Slack API request failed"),
        "got {}",
        structured
    );

    println!("     ✓ Network failure reported with cause text");
}

// =============================================================================
// TEST RUNNER
// =============================================================================

/// Run all messaging tool tests
pub async fn run_all_tests(ctx: &TestContext) {
    println!("\n💬 Running Slack Tool Tests\n");

    // read_thread
    test_read_thread_filters_status_messages(ctx).await;
    test_read_thread_limit_keeps_most_recent(ctx).await;
    test_read_thread_follows_pagination(ctx).await;
    test_read_thread_upstream_error(ctx).await;
    test_read_thread_missing_credential(ctx).await;

    // send_message
    test_send_message(ctx).await;
    test_send_message_not_in_channel(ctx).await;
    test_send_message_missing_credential(ctx).await;
    test_unreachable_api(ctx).await;

    println!("\n✅ All Slack Tool tests passed!\n");
}
