// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! HTTP surface: `/rpc`, health, manifest and permissive CORS.
//!
//! CORS headers come from [`CorsLayer`]. Every `OPTIONS` response, preflight or not, is
//! answered with `204 No Content`.

use std::sync::Arc;
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{Method, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};

use super::envelope::{ErrorCode, RpcRequest};
use super::manifest::{Manifest, HEALTH_PATH, MANIFEST_FILE_PATH, MANIFEST_PATH, RPC_PATH};
use super::router::RpcRouter;

#[derive(Clone)]
struct HttpState {
    router: Arc<RpcRouter>,
    manifest: Arc<Manifest>,
}

/// Routes without CORS; callers nest extra services and then wrap with [`with_cors`].
pub fn routes(router: Arc<RpcRouter>, base_url: &str) -> Router {
    let manifest = Arc::new(Manifest::from_router(&router, base_url));
    Router::new()
        .route(RPC_PATH, post(rpc))
        .route(HEALTH_PATH, get(health))
        .route(MANIFEST_PATH, get(manifest_json))
        .route(MANIFEST_FILE_PATH, get(manifest_json))
        .with_state(HttpState { router, manifest })
}

pub fn with_cors(app: Router) -> Router {
    app.fallback(not_found)
        .layer(cors_layer())
        .layer(middleware::map_response(options_no_content))
}

/// The complete HTTP application for a router.
pub fn app(router: Arc<RpcRouter>, base_url: &str) -> Router {
    with_cors(routes(router, base_url))
}

async fn rpc(State(state): State<HttpState>, body: Bytes) -> Response {
    let started = Instant::now();
    let raw: Value = match serde_json::from_slice(&body) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::debug!(error = %err, "malformed rpc body");
            let response = state.router.reject(
                String::new(),
                ErrorCode::BadRequest,
                format!("malformed request body: {err}"),
                started,
            );
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        }
    };
    let request_id = match raw.get("id") {
        Some(Value::String(id)) => id.clone(),
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    };
    let request: RpcRequest = match serde_json::from_value(raw) {
        Ok(request) => request,
        Err(err) => {
            let response = state.router.reject(
                request_id,
                ErrorCode::BadRequest,
                format!("malformed request envelope: {err}"),
                started,
            );
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        }
    };

    let method = request.method.clone().unwrap_or_default();
    let response = state.router.dispatch(request).await;
    tracing::debug!(
        method = %method,
        ok = response.ok,
        query_ms = response.meta.query_ms,
        "rpc call"
    );
    Json(response).into_response()
}

async fn health() -> &'static str {
    "OK"
}

async fn manifest_json(State(state): State<HttpState>) -> Json<Manifest> {
    Json(Manifest::clone(&state.manifest))
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
}

async fn options_no_content(method: Method, response: Response) -> Response {
    if method != Method::OPTIONS {
        return response;
    }
    let (mut parts, _) = response.into_parts();
    parts.status = StatusCode::NO_CONTENT;
    parts.headers.remove(CONTENT_TYPE);
    parts.headers.remove(CONTENT_LENGTH);
    Response::from_parts(parts, Body::empty())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::app;
    use crate::rpc::envelope::RpcResponse;
    use crate::rpc::router::RpcRouter;

    fn test_app() -> Router {
        let mut router = RpcRouter::new("0.0.1");
        router.register::<Value, Value, _, _>("echo", "Echoes params.", |request| async move {
            RpcResponse::success(request.params)
        });
        app(Arc::new(router), "http://127.0.0.1:27436")
    }

    async fn send(request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = test_app().oneshot(request).await.expect("response");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, headers, bytes.to_vec())
    }

    fn post_rpc(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/rpc")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .expect("request")
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).expect("request")
    }

    #[tokio::test]
    async fn rpc_round_trip() {
        let (status, headers, body) =
            send(post_rpc(r#"{"id": "a-1", "method": "echo", "params": {"x": 1}}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let envelope: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(envelope["ok"], json!(true));
        assert_eq!(envelope["data"], json!({"x": 1}));
        assert_eq!(envelope["meta"]["request_id"], json!("a-1"));
    }

    #[tokio::test]
    async fn unknown_method_is_an_envelope_not_a_status() {
        let (status, _, body) = send(post_rpc(r#"{"id": "a-2", "method": "nope"}"#)).await;

        assert_eq!(status, StatusCode::OK);
        let envelope: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(envelope["ok"], json!(false));
        assert_eq!(envelope["error"]["code"], json!("NVX_NOT_FOUND"));
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let (status, _, body) = send(post_rpc("{not json")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let envelope: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(envelope["error"]["code"], json!("NVX_BAD_REQUEST"));
        assert_eq!(envelope["meta"]["server_version"], json!("0.0.1"));
    }

    #[tokio::test]
    async fn non_object_body_keeps_no_id() {
        let (status, _, body) = send(post_rpc("[1, 2]")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let envelope: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(envelope["meta"]["request_id"], json!(""));
    }

    #[tokio::test]
    async fn health_and_manifest() {
        let (status, _, body) = send(get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");

        for uri in ["/manifest", "/mcp_manifest.json"] {
            let (status, _, body) = send(get(uri)).await;
            assert_eq!(status, StatusCode::OK);
            let manifest: Value = serde_json::from_slice(&body).expect("json");
            assert_eq!(manifest["methods"][0]["name"], json!("echo"));
            assert_eq!(manifest["endpoints"]["rpc"], json!("http://127.0.0.1:27436/rpc"));
        }
    }

    fn header_list(headers: &axum::http::HeaderMap, name: header::HeaderName) -> Vec<String> {
        let value = headers.get(name).expect("header").to_str().expect("ascii");
        value.split(',').map(|item| item.trim().to_ascii_lowercase()).collect()
    }

    #[tokio::test]
    async fn preflight_gets_no_content() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/rpc")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .expect("request");
        let (status, headers, body) = send(request).await;

        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_empty());
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            header_list(&headers, header::ACCESS_CONTROL_ALLOW_METHODS),
            vec!["get", "post", "options"]
        );
        assert_eq!(
            header_list(&headers, header::ACCESS_CONTROL_ALLOW_HEADERS),
            vec!["content-type", "authorization"]
        );
    }

    #[tokio::test]
    async fn bare_options_anywhere_gets_no_content() {
        for uri in ["/rpc", "/nowhere"] {
            let request = Request::builder()
                .method(Method::OPTIONS)
                .uri(uri)
                .body(Body::empty())
                .expect("request");
            let (status, headers, body) = send(request).await;

            assert_eq!(status, StatusCode::NO_CONTENT, "{uri}");
            assert!(body.is_empty());
            assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        }
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (status, headers, _) = send(get("/nowhere")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
