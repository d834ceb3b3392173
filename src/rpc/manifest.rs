// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Self-description of the running server.

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::router::{MethodInfo, RpcRouter};
use crate::store::{write_json_atomic, StoreError};

pub const RPC_PATH: &str = "/rpc";
pub const HEALTH_PATH: &str = "/health";
pub const MANIFEST_PATH: &str = "/manifest";
pub const MANIFEST_FILE_PATH: &str = "/mcp_manifest.json";
pub const MCP_PATH: &str = "/mcp";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Endpoints {
    pub base_url: String,
    pub rpc: String,
    pub health: String,
    pub manifest: String,
    pub mcp: String,
}

impl Endpoints {
    pub fn for_base(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            base_url: base.to_owned(),
            rpc: format!("{base}{RPC_PATH}"),
            health: format!("{base}{HEALTH_PATH}"),
            manifest: format!("{base}{MANIFEST_PATH}"),
            mcp: format!("{base}{MCP_PATH}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    pub endpoints: Endpoints,
    pub methods: Vec<MethodInfo>,
}

impl Manifest {
    pub fn from_router(router: &RpcRouter, base_url: &str) -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_owned(),
            version: router.server_version().to_owned(),
            endpoints: Endpoints::for_base(base_url),
            methods: router.methods().cloned().collect(),
        }
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.methods.iter().map(|method| method.name.as_str())
    }

    pub fn write_to(&self, path: &Path) -> Result<(), StoreError> {
        write_json_atomic(path, self)?;
        tracing::info!(path = %path.display(), methods = self.methods.len(), "manifest written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    use super::Manifest;
    use crate::rpc::envelope::RpcResponse;
    use crate::rpc::router::RpcRouter;

    fn router() -> RpcRouter {
        let mut router = RpcRouter::new("1.2.3");
        router.register::<Value, Value, _, _>("ping", "Answers.", |_request| async move {
            RpcResponse::success(Value::Bool(true))
        });
        router
    }

    #[test]
    fn lists_methods_and_endpoints() {
        let manifest = Manifest::from_router(&router(), "http://127.0.0.1:27436/");

        assert_eq!(manifest.version, "1.2.3");
        assert_eq!(manifest.method_names().collect::<Vec<_>>(), vec!["ping"]);
        assert_eq!(manifest.endpoints.base_url, "http://127.0.0.1:27436");
        assert_eq!(manifest.endpoints.rpc, "http://127.0.0.1:27436/rpc");
        assert_eq!(manifest.endpoints.mcp, "http://127.0.0.1:27436/mcp");
    }

    #[test]
    fn persists_to_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mcp_manifest.json");
        let manifest = Manifest::from_router(&router(), "http://localhost:1");

        manifest.write_to(&path).expect("write manifest");

        let text = std::fs::read_to_string(&path).expect("read manifest");
        let back: Manifest = serde_json::from_str(&text).expect("parse manifest");
        assert_eq!(back, manifest);
    }
}
