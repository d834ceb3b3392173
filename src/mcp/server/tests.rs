// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;
use crate::backend::BackendSlot;
use crate::dispatch::{lock_document, shared_document, Dispatcher, SharedDocument};
use crate::model::fixtures::demo_document;
use crate::query::addressing::canonical_id;
use crate::rpc::{build_router, ErrorCode, HandlerContext, DEFAULT_REQUEST_TIMEOUT};

fn server_over(document: SharedDocument) -> NvxMcp {
    let slot = Arc::new(BackendSlot::new(Dispatcher::new(), document));
    let router = build_router("mcp-test", &HandlerContext::new(slot, DEFAULT_REQUEST_TIMEOUT));
    NvxMcp::new(Arc::new(router))
}

fn args<T: serde::de::DeserializeOwned>(value: Value) -> Parameters<T> {
    Parameters(serde_json::from_value(value).expect("tool args"))
}

#[test]
fn exposes_every_rpc_method_as_a_tool() {
    let server = server_over(shared_document(demo_document()));
    let mut tools: Vec<String> =
        server.tool_router.list_all().into_iter().map(|tool| tool.name.to_string()).collect();
    tools.sort();
    let methods: Vec<String> = server.router.methods().map(|info| info.name.clone()).collect();
    assert_eq!(tools, methods);
}

#[tokio::test]
async fn overview_is_forwarded_with_a_fresh_request_id() {
    let server = server_over(shared_document(demo_document()));

    let Json(response) = server.get_model_overview().await.expect("overview");

    assert!(response.ok);
    assert!(response.meta.request_id.starts_with("mcp-"));
    assert_eq!(response.meta.server_version, "mcp-test");
    assert_eq!(response.data.expect("data")["title"], json!("Demo Project"));
}

#[tokio::test]
async fn counts_demo_walls() {
    let server = server_over(shared_document(demo_document()));

    let Json(response) = server
        .get_element_count_by_category(args(json!({"category": "walls"})))
        .await
        .expect("count");

    assert_eq!(response.data.expect("data")["count"], json!(4));
}

#[tokio::test]
async fn invalid_arguments_stay_inside_the_envelope() {
    let server = server_over(shared_document(demo_document()));

    let Json(response) = server
        .get_element_count_by_category(args(json!({"category": "  "})))
        .await
        .expect("tool result, not protocol error");

    assert!(!response.ok);
    assert_eq!(response.error_code(), Some(ErrorCode::InvalidArg));
}

#[tokio::test]
async fn selection_round_trip_through_tools() {
    let document = shared_document(demo_document());
    let server = server_over(Arc::clone(&document));
    let (wall, wall_id) = {
        let doc = lock_document(&document);
        let wall = doc
            .all_items()
            .find(|node| doc.node(*node).is_ok_and(|data| data.display_name == "Basic Wall 0"))
            .expect("wall");
        (wall, canonical_id(&doc, wall))
    };

    let Json(applied) = server
        .apply_selection(args(json!({"canonical_id": wall_id, "keepExistingSelection": false})))
        .await
        .expect("apply");
    assert_eq!(applied.data.expect("data")["selected_count"], json!(1));
    assert_eq!(lock_document(&document).current_selection(), &[wall]);

    let Json(snapshot) = server
        .get_current_selection_snapshot(args(json!({})))
        .await
        .expect("snapshot");
    let snapshot = snapshot.data.expect("data");
    assert_eq!(snapshot["items"][0]["canonical_id"], json!(wall_id));

    let Json(cleared) = server.clear_selection().await.expect("clear");
    assert_eq!(cleared.data.expect("data")["cleared"], json!(1));
    assert!(lock_document(&document).current_selection().is_empty());
}

#[tokio::test]
async fn streamable_http_tools_call_reaches_the_document() {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use rmcp::transport::{
        streamable_http_server::session::local::LocalSessionManager, StreamableHttpServerConfig,
        StreamableHttpService,
    };

    let document = shared_document(demo_document());
    let server = server_over(Arc::clone(&document));
    let config = StreamableHttpServerConfig {
        stateful_mode: false,
        sse_keep_alive: None,
        ..StreamableHttpServerConfig::default()
    };
    let session_manager = Arc::new(LocalSessionManager::default());
    let service = {
        let server = server.clone();
        StreamableHttpService::new(move || Ok(server.clone()), session_manager, config)
    };

    let body = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": {"name": "clear_selection", "arguments": {}}
    })
    .to_string();
    let wall = lock_document(&document).all_items().nth(3).expect("node");
    lock_document(&document).set_selection([wall]);

    let response = service
        .handle(
            Request::builder()
                .method("POST")
                .uri("/mcp")
                .header(axum::http::header::ACCEPT, "application/json, text/event-stream")
                .header(axum::http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .expect("request"),
        )
        .await;

    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let bytes = tokio::time::timeout(
        std::time::Duration::from_secs(3),
        to_bytes(Body::new(response.into_body()), usize::MAX),
    )
    .await
    .expect("timeout collecting response body")
    .expect("collect response body");
    assert!(!bytes.is_empty());
    assert!(lock_document(&document).current_selection().is_empty());
}
