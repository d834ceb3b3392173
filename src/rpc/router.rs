// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Method routing with a timing layer.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use futures::FutureExt;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::envelope::{ErrorCode, RpcRequest, RpcResponse};

type Handler = Arc<dyn Fn(RpcRequest) -> BoxFuture<'static, RpcResponse<Value>> + Send + Sync>;

/// What the manifest publishes about a registered method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MethodInfo {
    pub name: String,
    pub description: String,
    pub params_schema: Value,
    pub result_schema: Value,
}

#[derive(Clone)]
struct Registered {
    info: MethodInfo,
    handler: Handler,
}

fn schema_value<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or(Value::Null)
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn stamp(
    response: &mut RpcResponse<Value>,
    request_id: String,
    started: Instant,
    server_version: &str,
) {
    response.meta.request_id = request_id;
    response.meta.query_ms = elapsed_ms(started);
    response.meta.server_version = server_version.to_owned();
}

#[derive(Clone)]
pub struct RpcRouter {
    methods: BTreeMap<String, Registered>,
    server_version: String,
}

impl RpcRouter {
    pub fn new(server_version: impl Into<String>) -> Self {
        Self { methods: BTreeMap::new(), server_version: server_version.into() }
    }

    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    /// Registers `handler` under `name`. `P` and `R` only feed the published schemas.
    ///
    /// The stored handler is wrapped so every response carries the request id, the elapsed
    /// time and the server version.
    pub fn register<P, R, H, Fut>(&mut self, name: &str, description: &str, handler: H)
    where
        P: JsonSchema,
        R: JsonSchema,
        H: Fn(RpcRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RpcResponse<Value>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let server_version = self.server_version.clone();
        let timed: Handler = Arc::new(move |request: RpcRequest| {
            let handler = Arc::clone(&handler);
            let server_version = server_version.clone();
            async move {
                let started = Instant::now();
                let request_id = request.id.clone();
                let mut response = (*handler)(request).await;
                stamp(&mut response, request_id, started, &server_version);
                response
            }
            .boxed()
        });

        let info = MethodInfo {
            name: name.to_owned(),
            description: description.to_owned(),
            params_schema: schema_value::<P>(),
            result_schema: schema_value::<R>(),
        };
        if self.methods.insert(name.to_owned(), Registered { info, handler: timed }).is_some() {
            tracing::warn!(method = name, "method registered twice, keeping the latest handler");
        }
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodInfo> + '_ {
        self.methods.values().map(|registered| &registered.info)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub async fn dispatch(&self, request: RpcRequest) -> RpcResponse<Value> {
        let started = Instant::now();
        let method = request.method.as_deref().map(str::trim).unwrap_or_default();
        if method.is_empty() {
            return self.reject(request.id, ErrorCode::BadRequest, "missing method", started);
        }
        let Some(registered) = self.methods.get(method) else {
            tracing::debug!(method, "unknown method");
            let msg = format!("unknown method '{method}'");
            return self.reject(request.id, ErrorCode::NotFound, msg, started);
        };
        let handler = Arc::clone(&registered.handler);
        (*handler)(request).await
    }

    /// An envelope failure stamped like a handled call, for requests that never reach a handler.
    pub fn reject(
        &self,
        request_id: String,
        code: ErrorCode,
        msg: impl Into<String>,
        started: Instant,
    ) -> RpcResponse<Value> {
        let mut response = RpcResponse::failure(code, msg);
        stamp(&mut response, request_id, started, &self.server_version);
        response
    }
}

impl std::fmt::Debug for RpcRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcRouter")
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("server_version", &self.server_version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use super::RpcRouter;
    use crate::rpc::envelope::{ErrorCode, RpcRequest, RpcResponse};

    fn router() -> RpcRouter {
        let mut router = RpcRouter::new("9.9.9");
        router.register::<Value, Value, _, _>(
            "echo",
            "Echoes params.",
            |request: RpcRequest| async move { RpcResponse::success(request.params) },
        );
        router.register::<Value, Value, _, _>(
            "slow",
            "Sleeps briefly.",
            |_request: RpcRequest| async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                RpcResponse::success(Value::Null)
            },
        );
        router
    }

    #[tokio::test]
    async fn stamps_meta_on_handled_calls() {
        let response = router().dispatch(RpcRequest::new("r-1", "echo", json!({"a": 1}))).await;
        assert!(response.ok);
        assert_eq!(response.data, Some(json!({"a": 1})));
        assert_eq!(response.meta.request_id, "r-1");
        assert_eq!(response.meta.server_version, "9.9.9");
    }

    #[tokio::test]
    async fn measures_elapsed_time() {
        let response = router().dispatch(RpcRequest::new("r-2", "slow", Value::Null)).await;
        assert!(response.meta.query_ms >= 20, "{}", response.meta.query_ms);
    }

    #[tokio::test]
    async fn missing_method_is_a_bad_request() {
        let request = RpcRequest { id: "r-3".into(), method: None, params: Value::Null };
        let response = router().dispatch(request).await;
        assert!(!response.ok);
        assert_eq!(response.error_code(), Some(ErrorCode::BadRequest));
        assert_eq!(response.meta.request_id, "r-3");

        let blank = RpcRequest::new("r-4", "  ", Value::Null);
        assert_eq!(router().dispatch(blank).await.error_code(), Some(ErrorCode::BadRequest));
    }

    #[tokio::test]
    async fn unknown_method_is_not_found() {
        let response = router().dispatch(RpcRequest::new("r-5", "nope", Value::Null)).await;
        assert_eq!(response.error_code(), Some(ErrorCode::NotFound));
        assert_eq!(response.meta.server_version, "9.9.9");
    }

    #[test]
    fn lists_methods_in_name_order() {
        let router = router();
        let names: Vec<&str> = router.methods().map(|info| info.name.as_str()).collect();
        assert_eq!(names, vec!["echo", "slow"]);
        assert!(router.contains("echo"));
    }
}
