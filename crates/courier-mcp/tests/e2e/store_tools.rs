//! Store tool tests for Courier MCP.
//!
//! Exercises the four SQLite tools through the transport loop:
//! - `list_tables`: lexical order, internal tables hidden
//! - `describe_table`: native column order, flags, unknown table
//! - `read_query`: exact counts, empty results, truncation, store errors
//! - `write_query`: commit, rollback on constraint violation
//! - Connection failure after retries

use super::common::*;
use serde_json::{Value, json};

// =============================================================================
// LIST TABLES
// =============================================================================

pub async fn test_list_tables_two_table_store(ctx: &TestContext) {
    println!("  🧪 test_list_tables_two_table_store");

    let path = ctx
        .extra_store(
            "two_tables.db",
            "CREATE TABLE locations (id INTEGER PRIMARY KEY, store_code TEXT);
             CREATE TABLE carriers (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT);
             INSERT INTO carriers (name) VALUES ('Brinks');",
        )
        .await;
    let server = server_from(&ctx.config_for(&path));

    let input = format!(
        "{}\n",
        json!({"id": 1, "method": "tools/call", "params": {"name": "list_tables", "arguments": {}}})
    );
    let responses = exchange(&server, &input).await;

    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["id"], 1);
    assert_eq!(text_of(&responses[0]), "Tables in database:\n- carriers\n- locations");
    assert_eq!(
        result_of(&responses[0])["structuredContent"]["tables"],
        json!(["carriers", "locations"])
    );

    println!("     ✓ Exactly carriers, locations (no sqlite_sequence)");
}

pub async fn test_list_tables_seeded_store(ctx: &TestContext) {
    println!("  🧪 test_list_tables_seeded_store");

    let response = call_tool(&ctx.server(), "list_tables", json!({})).await;
    assert_eq!(
        result_of(&response)["structuredContent"]["tables"],
        json!(["carriers", "deposits", "locations", "pickup_schedules"])
    );
    assert_eq!(result_of(&response)["isError"], false);

    println!("     ✓ Four tables, ascending");
}

// =============================================================================
// DESCRIBE TABLE
// =============================================================================

pub async fn test_describe_table(ctx: &TestContext) {
    println!("  🧪 test_describe_table");

    let response = call_tool(&ctx.server(), "describe_table", json!({"table_name": "locations"})).await;

    assert_eq!(
        text_of(&response),
        "Schema for locations:\n- id (INTEGER)\n- store_code (TEXT)\n- name (TEXT)\n- city (TEXT)"
    );
    let columns = &result_of(&response)["structuredContent"]["columns"];
    assert_eq!(
        columns[0],
        json!({"name": "id", "type": "INTEGER", "notnull": false, "pk": true})
    );
    assert_eq!(
        columns[1],
        json!({"name": "store_code", "type": "TEXT", "notnull": true, "pk": false})
    );
    assert_eq!(columns[3]["notnull"], false);

    println!("     ✓ Columns in declaration order with flags");
}

pub async fn test_describe_unknown_table(ctx: &TestContext) {
    println!("  🧪 test_describe_unknown_table");

    let response = call_tool(&ctx.server(), "describe_table", json!({"table_name": "vaults"})).await;

    assert_eq!(result_of(&response)["structuredContent"]["columns"], json!([]));
    assert_eq!(text_of(&response), "Schema for vaults:\n");

    println!("     ✓ Unknown table → empty column list, not an error");
}

pub async fn test_describe_table_name_is_bound(ctx: &TestContext) {
    println!("  🧪 test_describe_table_name_is_bound");

    let server = ctx.server();
    let response = call_tool(
        &server,
        "describe_table",
        json!({"table_name": "locations'); DROP TABLE carriers; --"}),
    )
    .await;
    assert_eq!(result_of(&response)["structuredContent"]["columns"], json!([]));

    let response = call_tool(&server, "read_query", json!({"query": "SELECT COUNT(*) FROM carriers"})).await;
    assert_eq!(result_of(&response)["structuredContent"]["rows"], json!([[3]]));

    println!("     ✓ Table name treated as data");
}

// =============================================================================
// READ QUERY
// =============================================================================

pub async fn test_read_query_exact_deposit_count(ctx: &TestContext) {
    println!("  🧪 test_read_query_exact_deposit_count");

    let response = call_tool(&ctx.server(), "read_query", json!({"query": "SELECT COUNT(*) FROM deposits"})).await;

    let structured = &result_of(&response)["structuredContent"];
    assert_eq!(structured["columns"], json!(["COUNT(*)"]));
    assert_eq!(structured["rows"], json!([[DEPOSIT_DAYS * LOCATION_COUNT]]));
    assert_eq!(
        text_of(&response),
        format!("Columns: COUNT(*)\n\nResults (1 rows):\n[{}]\n", DEPOSIT_DAYS * LOCATION_COUNT)
    );

    println!("     ✓ {} deposits = 90 days × {} locations", DEPOSIT_DAYS * LOCATION_COUNT, LOCATION_COUNT);
}

pub async fn test_read_query_scalar_types(ctx: &TestContext) {
    println!("  🧪 test_read_query_scalar_types");

    let response = call_tool(
        &ctx.server(),
        "read_query",
        json!({"query": "SELECT l.store_code, l.city, d.amount, d.location_id \
                         FROM deposits d JOIN locations l ON l.id = d.location_id \
                         WHERE l.store_code = 'S004' AND d.deposit_date = '2026-01-01'"}),
    )
    .await;

    let structured = &result_of(&response)["structuredContent"];
    assert_eq!(
        structured["columns"],
        json!(["store_code", "city", "amount", "location_id"])
    );
    assert_eq!(structured["rows"], json!([["S004", null, 1040.0, 4]]));

    println!("     ✓ TEXT, NULL, REAL and INTEGER mapped");
}

pub async fn test_read_query_empty_result(ctx: &TestContext) {
    println!("  🧪 test_read_query_empty_result");

    let response = call_tool(
        &ctx.server(),
        "read_query",
        json!({"query": "SELECT id, store_code FROM locations WHERE city = 'Atlantis'"}),
    )
    .await;

    assert_eq!(
        result_of(&response)["structuredContent"],
        json!({"columns": ["id", "store_code"], "rows": []})
    );
    assert_eq!(text_of(&response), "Query returned no results.");

    println!("     ✓ Zero rows → columns kept, rows empty");
}

pub async fn test_read_query_truncates_display(ctx: &TestContext) {
    println!("  🧪 test_read_query_truncates_display");

    let response = call_tool(
        &ctx.server(),
        "read_query",
        json!({"query": "SELECT location_id, deposit_date FROM deposits WHERE location_id = 1 ORDER BY deposit_date"}),
    )
    .await;

    let rows = result_of(&response)["structuredContent"]["rows"].as_array().unwrap().len();
    assert_eq!(rows, 90);
    assert!(!text_of(&response).contains("more rows"));

    let response = call_tool(
        &ctx.server(),
        "read_query",
        json!({"query": "SELECT id FROM deposits ORDER BY id"}),
    )
    .await;
    let text = text_of(&response);
    let structured_rows = result_of(&response)["structuredContent"]["rows"].as_array().unwrap().len();
    assert_eq!(structured_rows, 360);
    assert!(text.contains("Results (360 rows):"));
    assert!(text.ends_with("\n... and 260 more rows"));
    assert_eq!(text.lines().filter(|l| l.starts_with('[')).count(), 100);

    println!("     ✓ Text shows 100 rows, structured result keeps all 360");
}

pub async fn test_read_query_syntax_error_verbatim(ctx: &TestContext) {
    println!("  🧪 test_read_query_syntax_error_verbatim");

    let response = call_tool(&ctx.server(), "read_query", json!({"query": "SELEC * FROM deposits"})).await;

    assert_eq!(error_code(&response), -32000);
    assert_eq!(response["error"]["message"], "near \"SELEC\": syntax error");

    let response = call_tool(&ctx.server(), "read_query", json!({"query": "SELECT * FROM vaults"})).await;
    assert_eq!(error_code(&response), -32000);
    assert_eq!(response["error"]["message"], "no such table: vaults");

    println!("     ✓ Store error text passed through unmodified");
}

pub async fn test_read_query_cannot_write(ctx: &TestContext) {
    println!("  🧪 test_read_query_cannot_write");

    let server = ctx.server();
    let response = call_tool(&server, "read_query", json!({"query": "DELETE FROM carriers"})).await;
    assert_eq!(error_code(&response), -32000);
    assert!(
        response["error"]["message"]
            .as_str()
            .unwrap()
            .contains("readonly"),
        "got {}",
        response
    );

    let response = call_tool(&server, "read_query", json!({"query": "SELECT COUNT(*) FROM carriers"})).await;
    assert_eq!(result_of(&response)["structuredContent"]["rows"], json!([[3]]));

    println!("     ✓ Read-only connection rejected DELETE");
}

pub async fn test_multiple_statements_rejected(ctx: &TestContext) {
    println!("  🧪 test_multiple_statements_rejected");

    let server = ctx.server();
    let response = call_tool(&server, "read_query", json!({"query": "SELECT 1; SELECT 2"})).await;
    assert_eq!(error_code(&response), -32000);
    assert_eq!(
        response["error"]["message"],
        "You can only execute one statement at a time."
    );

    let response = call_tool(
        &server,
        "write_query",
        json!({"query": "INSERT INTO carriers (name) VALUES ('Dunbar'); DELETE FROM carriers"}),
    )
    .await;
    assert_eq!(error_code(&response), -32000);

    let response = call_tool(&server, "read_query", json!({"query": "SELECT COUNT(*) FROM carriers"})).await;
    assert_eq!(result_of(&response)["structuredContent"]["rows"], json!([[3]]));

    println!("     ✓ Text with a second statement refused by both query tools");
}

// =============================================================================
// WRITE QUERY
// =============================================================================

pub async fn test_write_query_commits(ctx: &TestContext) {
    println!("  🧪 test_write_query_commits");

    let server = ctx.server();
    let response = call_tool(
        &server,
        "write_query",
        json!({"query": "UPDATE pickup_schedules SET weekday = 2 WHERE location_id = 1"}),
    )
    .await;

    assert_eq!(text_of(&response), "Query executed. Affected rows: 2");
    assert_eq!(
        result_of(&response)["structuredContent"],
        json!({"affected_rows": 2})
    );

    let response = call_tool(
        &server,
        "read_query",
        json!({"query": "SELECT DISTINCT weekday FROM pickup_schedules WHERE location_id = 1"}),
    )
    .await;
    assert_eq!(result_of(&response)["structuredContent"]["rows"], json!([[2]]));

    println!("     ✓ Update committed and visible to the next call");
}

pub async fn test_write_query_rolls_back_on_constraint_violation(ctx: &TestContext) {
    println!("  🧪 test_write_query_rolls_back_on_constraint_violation");

    let server = ctx.server();
    let count = |server_response: &Value| {
        result_of(server_response)["structuredContent"]["rows"][0][0]
            .as_i64()
            .unwrap()
    };
    let before = count(&call_tool(&server, "read_query", json!({"query": "SELECT COUNT(*) FROM locations"})).await);

    // The first row is valid; the second duplicates store_code S001.
    let response = call_tool(
        &server,
        "write_query",
        json!({"query": "INSERT INTO locations (store_code, name) VALUES ('S005', 'Pier 9'), ('S001', 'Duplicate')"}),
    )
    .await;
    assert_eq!(error_code(&response), -32000);
    assert!(
        response["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("UNIQUE constraint failed"),
        "got {}",
        response
    );

    let after = count(&call_tool(&server, "read_query", json!({"query": "SELECT COUNT(*) FROM locations"})).await);
    assert_eq!(before, after);

    let response = call_tool(
        &server,
        "read_query",
        json!({"query": "SELECT id FROM locations WHERE store_code = 'S005'"}),
    )
    .await;
    assert_eq!(result_of(&response)["structuredContent"]["rows"], json!([]));

    println!("     ✓ Row count unchanged at {} after failed insert", after);
}

// =============================================================================
// CONNECTION FAILURE
// =============================================================================

pub async fn test_missing_store_fails_after_retries(ctx: &TestContext) {
    println!("  🧪 test_missing_store_fails_after_retries");

    let missing = ctx.dir.path().join("missing.db");
    let server = server_from(&ctx.config_for(&missing));
    let input = format!(
        "{}\n{}\n",
        tool_call_line(1, "list_tables", json!({})),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})
    );
    let responses = exchange(&server, &input).await;

    assert_eq!(error_code(&responses[0]), -32000);
    assert!(
        responses[0]["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Failed to connect after 3 attempts"),
        "got {}",
        responses[0]
    );
    assert!(!missing.exists(), "store must not be created");
    assert_eq!(responses[1]["id"], 2);

    println!("     ✓ Three attempts, internal error, loop still serving");
}

// =============================================================================
// TEST RUNNER
// =============================================================================

/// Run all store tool tests
pub async fn run_all_tests(ctx: &TestContext) {
    println!("\n🗄️  Running Store Tool Tests\n");

    // list_tables
    test_list_tables_two_table_store(ctx).await;
    test_list_tables_seeded_store(ctx).await;

    // describe_table
    test_describe_table(ctx).await;
    test_describe_unknown_table(ctx).await;
    test_describe_table_name_is_bound(ctx).await;

    // read_query
    test_read_query_exact_deposit_count(ctx).await;
    test_read_query_scalar_types(ctx).await;
    test_read_query_empty_result(ctx).await;
    test_read_query_truncates_display(ctx).await;
    test_read_query_syntax_error_verbatim(ctx).await;
    test_read_query_cannot_write(ctx).await;
    test_multiple_statements_rejected(ctx).await;

    // write_query
    test_write_query_commits(ctx).await;
    test_write_query_rolls_back_on_constraint_violation(ctx).await;

    // Connection failure
    test_missing_store_fails_after_retries(ctx).await;

    println!("\n✅ All Store Tool tests passed!\n");
}
