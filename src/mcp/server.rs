// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::{Json, Parameters};
use rmcp::model::{ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_handler, tool_router, ErrorData, ServerHandler, ServiceExt};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::query::clash::ClashRunArgs;
use crate::query::items::{CountByCategoryArgs, DistributionArgs, ItemPropertiesArgs, ListItemsArgs};
use crate::query::selection::{ApplySelectionArgs, SelectionSnapshotArgs};
use crate::rpc::handlers::{
    NoParams, METHOD_APPLY_SELECTION, METHOD_CLEAR_SELECTION, METHOD_COUNT_BY_CATEGORY,
    METHOD_LIST_ITEMS_TO_PROPERTY, METHOD_LIST_PROPERTIES_FOR_ITEM, METHOD_MODEL_OVERVIEW,
    METHOD_PROPERTY_DISTRIBUTION, METHOD_RUN_SIMPLE_CLASH, METHOD_SELECTION_SNAPSHOT,
    METHOD_UNITS_AND_TOLERANCES,
};
use crate::rpc::{RpcRequest, RpcResponse, RpcRouter};

#[derive(Clone)]
pub struct NvxMcp {
    router: Arc<RpcRouter>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl NvxMcp {
    pub fn new(router: Arc<RpcRouter>) -> Self {
        Self { router, tool_router: Self::tool_router() }
    }

    pub async fn serve_stdio(self) -> Result<(), rmcp::RmcpError> {
        let service = self.serve((tokio::io::stdin(), tokio::io::stdout())).await?;
        service.waiting().await?;
        Ok(())
    }

    async fn forward<P: Serialize>(
        &self,
        method: &str,
        params: &P,
    ) -> Result<Json<RpcResponse<Value>>, ErrorData> {
        let params = serde_json::to_value(params)
            .map_err(|err| {
                ErrorData::internal_error(format!("params not serializable: {err}"), None)
            })?;
        let request = RpcRequest::new(format!("mcp-{}", Uuid::new_v4()), method, params);
        let response = self.router.dispatch(request).await;
        if let Some(error) = &response.error {
            tracing::debug!(method, code = %error.code, msg = %error.msg, "tool call failed");
        }
        Ok(Json(response))
    }

    /// Document title, revision, units and per-submodel item/geometry counts; start here.
    #[tool(name = "get_model_overview")]
    async fn get_model_overview(&self) -> Result<Json<RpcResponse<Value>>, ErrorData> {
        self.forward(METHOD_MODEL_OVERVIEW, &NoParams {}).await
    }

    /// Document units and the default clash tolerance in meters and model units.
    #[tool(name = "get_units_and_tolerances")]
    async fn get_units_and_tolerances(&self) -> Result<Json<RpcResponse<Value>>, ErrorData> {
        self.forward(METHOD_UNITS_AND_TOLERANCES, &NoParams {}).await
    }

    /// Count items of a category within a scope (`all`, submodel names, canonical ids).
    #[tool(name = "get_element_count_by_category")]
    async fn get_element_count_by_category(
        &self,
        params: Parameters<CountByCategoryArgs>,
    ) -> Result<Json<RpcResponse<Value>>, ErrorData> {
        self.forward(METHOD_COUNT_BY_CATEGORY, &params.0).await
    }

    /// Items carrying a property, with optional value match (`equals`/`contains`) and filters.
    #[tool(name = "list_items_to_property")]
    async fn list_items_to_property(
        &self,
        params: Parameters<ListItemsArgs>,
    ) -> Result<Json<RpcResponse<Value>>, ErrorData> {
        self.forward(METHOD_LIST_ITEMS_TO_PROPERTY, &params.0).await
    }

    /// All property categories of one item addressed by canonical id.
    #[tool(name = "list_properties_for_item")]
    async fn list_properties_for_item(
        &self,
        params: Parameters<ItemPropertiesArgs>,
    ) -> Result<Json<RpcResponse<Value>>, ErrorData> {
        self.forward(METHOD_LIST_PROPERTIES_FOR_ITEM, &params.0).await
    }

    /// Value histogram of a property within a category and scope.
    #[tool(name = "get_property_distribution_by_category")]
    async fn get_property_distribution_by_category(
        &self,
        params: Parameters<DistributionArgs>,
    ) -> Result<Json<RpcResponse<Value>>, ErrorData> {
        self.forward(METHOD_PROPERTY_DISTRIBUTION, &params.0).await
    }

    /// Select the geometry behind canonical ids; unknown ids leave the selection untouched.
    #[tool(name = "apply_selection")]
    async fn apply_selection(
        &self,
        params: Parameters<ApplySelectionArgs>,
    ) -> Result<Json<RpcResponse<Value>>, ErrorData> {
        self.forward(METHOD_APPLY_SELECTION, &params.0).await
    }

    #[tool(name = "clear_selection")]
    async fn clear_selection(&self) -> Result<Json<RpcResponse<Value>>, ErrorData> {
        self.forward(METHOD_CLEAR_SELECTION, &NoParams {}).await
    }

    /// Up to `limit` selected items with canonical ids.
    #[tool(name = "get_current_selection_snapshot")]
    async fn get_current_selection_snapshot(
        &self,
        params: Parameters<SelectionSnapshotArgs>,
    ) -> Result<Json<RpcResponse<Value>>, ErrorData> {
        self.forward(METHOD_SELECTION_SNAPSHOT, &params.0).await
    }

    /// Hard clash test between two scopes; tolerance in meters.
    #[tool(name = "run_simple_clash")]
    async fn run_simple_clash(
        &self,
        params: Parameters<ClashRunArgs>,
    ) -> Result<Json<RpcResponse<Value>>, ErrorData> {
        self.forward(METHOD_RUN_SIMPLE_CLASH, &params.0).await
    }
}

#[tool_handler]
impl ServerHandler for NvxMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                concat!(
                    "Nvx document bridge (tools: get_model_overview, get_units_and_tolerances, ",
                    "get_element_count_by_category, list_items_to_property, ",
                    "list_properties_for_item, get_property_distribution_by_category, ",
                    "apply_selection, clear_selection, get_current_selection_snapshot, ",
                    "run_simple_clash). Every tool returns an envelope {ok, data, error, meta}."
                )
                .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests;
