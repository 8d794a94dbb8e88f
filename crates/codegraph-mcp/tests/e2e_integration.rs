//! End-to-end workflow tests: index a small repository, drive it through
//! the full discover -> query -> impact-analysis -> reset lifecycle a real
//! assistant session would use.

mod common;

use rmcp::handler::server::wrapper::Parameters;

use codegraph_mcp::tools::{
    AnalyzeCodeImpactParams, GetGraphHealthParams, IndexParams, QueryParams, ResetGraphParams,
    SemanticSearchParams,
};

use common::{build_server, response_json};

fn write_multi_module_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.rs"),
        "pub struct Config {\n    pub path: String,\n}\n\npub fn load_config(path: &str) -> Config {\n    Config { path: path.to_string() }\n}\n\npub fn bootstrap(path: &str) -> Config {\n    load_config(path)\n}\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("server.rs"),
        "pub fn start_server(path: &str) {\n    run(path);\n}\n\nfn run(_path: &str) {}\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("client.rs"),
        "pub fn request(url: &str) -> String {\n    url.to_string()\n}\n",
    )
    .unwrap();
    dir
}

#[tokio::test]
async fn full_index_query_impact_reset_workflow() {
    let dir = write_multi_module_repo();
    let server = common::build_server(dir.path().to_path_buf()).await;

    // 1. Index the repository from scratch.
    let index_result = server
        .index(Parameters(IndexParams { directory: None, incremental: Some(false), exclude_patterns: None }))
        .await
        .unwrap();
    let index_json = response_json(&index_result);
    assert_eq!(index_json["summary"]["total_indexed"], 3);
    assert_eq!(index_json["summary"]["total_failed"], 0);

    // 2. A structural query should surface the function by name.
    let query_result = server
        .query(Parameters(QueryParams { query: "load_config".to_string(), limit: Some(5) }))
        .await
        .unwrap();
    let hits = response_json(&query_result);
    let entity_id = hits["results"][0]["id"].as_str().unwrap().to_string();

    // 3. Re-indexing incrementally afterward should skip every unchanged file.
    let second_pass = server
        .index(Parameters(IndexParams { directory: None, incremental: Some(true), exclude_patterns: None }))
        .await
        .unwrap();
    let second_json = response_json(&second_pass);
    assert_eq!(second_json["summary"]["total_skipped"], 3);
    assert_eq!(second_json["summary"]["total_indexed"], 0);

    // 4. Impact analysis on the loader should find its in-file caller.
    let impact_result = server
        .analyze_code_impact(Parameters(AnalyzeCodeImpactParams { entity_id, depth: Some(2) }))
        .await
        .unwrap();
    let impact_json = response_json(&impact_result);
    let impacted = impact_json["impacted"].as_array().unwrap();
    assert!(impacted.iter().any(|e| e["name"] == "bootstrap"));

    // 5. Semantic search should still return a well-formed response shape.
    let semantic_result = server
        .semantic_search(Parameters(SemanticSearchParams { query: "loading configuration".to_string(), limit: Some(5) }))
        .await
        .unwrap();
    let semantic_json = response_json(&semantic_result);
    assert!(semantic_json["results"].is_array());

    // 6. Resetting clears the graph and re-indexing from scratch restores it.
    let reset_result = server
        .reset_graph(Parameters(ResetGraphParams { directory: Some(dir.path().to_string_lossy().to_string()) }))
        .await
        .unwrap();
    let reset_json = response_json(&reset_result);
    assert_eq!(reset_json["success"], true);

    let health_result = server
        .get_graph_health(Parameters(GetGraphHealthParams { min_entities: Some(1), sample: Some(5) }))
        .await
        .unwrap();
    let health_json = response_json(&health_result);
    assert_eq!(health_json["healthy"], true);
    assert!(health_json["totals"]["entities"].as_u64().unwrap() >= 4);
}

#[tokio::test]
async fn clean_index_is_an_alias_for_reset_graph() {
    let dir = write_multi_module_repo();
    let server = build_server(dir.path().to_path_buf()).await;

    server
        .index(Parameters(IndexParams { directory: None, incremental: Some(false), exclude_patterns: None }))
        .await
        .unwrap();

    let result = server
        .clean_index(Parameters(ResetGraphParams { directory: None }))
        .await
        .unwrap();
    let json = response_json(&result);
    assert_eq!(json["success"], true);

    let health_result = server
        .get_graph_health(Parameters(GetGraphHealthParams { min_entities: Some(1), sample: Some(1) }))
        .await
        .unwrap();
    let health_json = response_json(&health_result);
    assert_eq!(health_json["healthy"], false);
    assert_eq!(health_json["totals"]["entities"], 0);
}
