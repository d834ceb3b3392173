// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Method handlers: parameter parsing, backend hop, timeout and envelope wrapping.

use std::sync::Arc;
use std::time::Duration;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::backend::{self, BackendSlot};
use crate::error::ServiceError;
use crate::model::Document;
use crate::query::clash::{run_clash, ClashRunArgs, ClashSummaryDto};
use crate::query::items::{
    count_by_category, list_items_to_property, list_properties_for_item,
    property_distribution_by_category, CategoryCountDto, CountByCategoryArgs, DistributionArgs,
    DistributionDto, ItemListDto, ItemPropertiesArgs, ItemPropertiesDto, ListItemsArgs,
};
use crate::query::overview::{model_overview, units_and_tolerances, ModelOverviewDto, UnitsDto};
use crate::query::selection::{
    apply_selection, clear_selection, current_selection_snapshot, ApplySelectionArgs,
    ClearSelectionDto, SelectionResultDto, SelectionSnapshotArgs, SelectionSnapshotDto,
};

use super::envelope::{RpcRequest, RpcResponse};
use super::middleware;
use super::router::RpcRouter;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Parameters of methods that take none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NoParams {}

/// Shared state every handler runs with.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    backends: Arc<BackendSlot>,
    timeout: Duration,
}

impl HandlerContext {
    pub fn new(backends: Arc<BackendSlot>, timeout: Duration) -> Self {
        Self { backends, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `op` against the document through the selected backend.
    ///
    /// The token handed to `op` is canceled once the timeout fires or the caller goes away.
    async fn run<T, F>(&self, op: F) -> Result<RpcResponse<Value>, ServiceError>
    where
        T: Serialize + Send + 'static,
        F: Fn(&mut Document, &CancellationToken) -> Result<T, ServiceError> + Send + Sync + 'static,
    {
        let cancel = CancellationToken::new();
        let _cancel_on_exit = cancel.clone().drop_guard();
        let backend = self.backends.get();
        let call = backend::call(backend.as_ref(), move |document| op(document, &cancel));
        let observed = match tokio::time::timeout(self.timeout, call).await {
            Ok(observed) => observed?,
            Err(_) => return Err(ServiceError::Timeout(self.timeout)),
        };
        let value = observed.value?;
        Ok(RpcResponse::success(value).with_revision(observed.revision).into_value())
    }
}

fn parse_params<P: DeserializeOwned>(params: &Value) -> Result<P, ServiceError> {
    let params = match params {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other.clone(),
    };
    serde_json::from_value(params)
        .map_err(|err| ServiceError::invalid_argument(format!("invalid params: {err}")))
}

fn register_method<P, R, F>(
    router: &mut RpcRouter,
    context: &HandlerContext,
    name: &str,
    description: &str,
    op: F,
) where
    P: DeserializeOwned + JsonSchema + Send + Sync + 'static,
    R: Serialize + JsonSchema + Send + 'static,
    F: Fn(&mut Document, &P, &CancellationToken) -> Result<R, ServiceError>
        + Copy
        + Send
        + Sync
        + 'static,
{
    let context = context.clone();
    router.register::<P, R, _, _>(name, description, move |request: RpcRequest| {
        let context = context.clone();
        middleware::wrap(async move {
            let params: P = parse_params(&request.params)?;
            context.run(move |document, cancel| op(document, &params, cancel)).await
        })
    });
}

pub const METHOD_COUNT_BY_CATEGORY: &str = "get_element_count_by_category";
pub const METHOD_LIST_ITEMS_TO_PROPERTY: &str = "list_items_to_property";
pub const METHOD_LIST_PROPERTIES_FOR_ITEM: &str = "list_properties_for_item";
pub const METHOD_APPLY_SELECTION: &str = "apply_selection";
pub const METHOD_CLEAR_SELECTION: &str = "clear_selection";
pub const METHOD_SELECTION_SNAPSHOT: &str = "get_current_selection_snapshot";
pub const METHOD_RUN_SIMPLE_CLASH: &str = "run_simple_clash";
pub const METHOD_MODEL_OVERVIEW: &str = "get_model_overview";
pub const METHOD_UNITS_AND_TOLERANCES: &str = "get_units_and_tolerances";
pub const METHOD_PROPERTY_DISTRIBUTION: &str = "get_property_distribution_by_category";

pub fn register_all(router: &mut RpcRouter, context: &HandlerContext) {
    register_method::<CountByCategoryArgs, CategoryCountDto, _>(
        router,
        context,
        METHOD_COUNT_BY_CATEGORY,
        "Count items whose class or Category property matches `category` in `scope` (`all`).",
        |document, args, cancel| count_by_category(document, args, cancel),
    );
    register_method::<ListItemsArgs, ItemListDto, _>(
        router,
        context,
        METHOD_LIST_ITEMS_TO_PROPERTY,
        "List items carrying `property_name`, filtered by value, category, model and scope.",
        |document, args, cancel| list_items_to_property(document, args, cancel),
    );
    register_method::<ItemPropertiesArgs, ItemPropertiesDto, _>(
        router,
        context,
        METHOD_LIST_PROPERTIES_FOR_ITEM,
        "List every property category and typed value of the item with `canonical_id`.",
        |document, args, cancel| list_properties_for_item(document, args, cancel),
    );
    register_method::<ApplySelectionArgs, SelectionResultDto, _>(
        router,
        context,
        METHOD_APPLY_SELECTION,
        "Select the geometric targets of canonical ids; unmatched ids leave the selection as is.",
        |document, args, cancel| apply_selection(document, args, cancel),
    );
    register_method::<NoParams, ClearSelectionDto, _>(
        router,
        context,
        METHOD_CLEAR_SELECTION,
        "Clear the current selection.",
        |document, _, _| clear_selection(document),
    );
    register_method::<SelectionSnapshotArgs, SelectionSnapshotDto, _>(
        router,
        context,
        METHOD_SELECTION_SNAPSHOT,
        "Describe up to `limit` (default 100) currently selected items.",
        |document, args, cancel| current_selection_snapshot(document, args, cancel),
    );
    register_method::<ClashRunArgs, ClashSummaryDto, _>(
        router,
        context,
        METHOD_RUN_SIMPLE_CLASH,
        "Hard clash test between `scopeA` and `scopeB`, `tolerance_m` in meters (default 0.01).",
        |document, args, cancel| run_clash(document, args, cancel),
    );
    register_method::<NoParams, ModelOverviewDto, _>(
        router,
        context,
        METHOD_MODEL_OVERVIEW,
        "Summarize the open document: submodels with item and geometry counts.",
        |document, _, cancel| model_overview(document, cancel),
    );
    register_method::<NoParams, UnitsDto, _>(
        router,
        context,
        METHOD_UNITS_AND_TOLERANCES,
        "Report document units and the default clash tolerance.",
        |document, _, _| units_and_tolerances(document),
    );
    register_method::<DistributionArgs, DistributionDto, _>(
        router,
        context,
        METHOD_PROPERTY_DISTRIBUTION,
        "Histogram of `property_name` values in `category_name` within `scope`, top `top_n` (50).",
        |document, args, cancel| property_distribution_by_category(document, args, cancel),
    );
}

/// A router with every document method registered.
pub fn build_router(server_version: impl Into<String>, context: &HandlerContext) -> RpcRouter {
    let mut router = RpcRouter::new(server_version);
    register_all(&mut router, context);
    router
}
