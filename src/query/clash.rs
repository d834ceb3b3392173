// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Clash orchestration: two scopes plus a tolerance become a hard clash test on the host.

use std::collections::BTreeSet;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;
use crate::model::{ClashResultNode, ClashTestDefinition, ClashTestId, ClashTestType, Document};

use super::scope::{resolve_scope, ResolvedScope, ScopeAppliedInfo};
use super::{checkpoint, require_active};

pub const DEFAULT_TOLERANCE_M: f64 = 0.01;
pub const DEFAULT_TEST_NAME: &str = "nvx_simple_clash";
const RESULT_POLL_ATTEMPTS: usize = 20;
const RESULT_POLL_INTERVAL: Duration = Duration::from_millis(25);

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE_M
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClashRunArgs {
    /// Scope for the first selection.
    #[serde(rename = "scopeA", alias = "scope_a")]
    pub scope_a: String,
    /// Scope for the second selection.
    #[serde(rename = "scopeB", alias = "scope_b")]
    pub scope_b: String,
    /// Hard clash tolerance in meters.
    #[serde(default = "default_tolerance")]
    pub tolerance_m: f64,
    /// Name of the clash test; an existing test with the same name is replaced.
    #[serde(default)]
    pub test_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClashSummaryDto {
    pub success: bool,
    pub message: String,
    /// JSON object with the `scopeA` and `scopeB` applied-info lists.
    pub details: String,
    pub test_name: String,
    pub results: u64,
}

#[derive(Debug, Serialize)]
struct ClashDetails<'a> {
    #[serde(rename = "scopeA")]
    scope_a: &'a [ScopeAppliedInfo],
    #[serde(rename = "scopeB")]
    scope_b: &'a [ScopeAppliedInfo],
}

fn details_json(
    scope_a: &[ScopeAppliedInfo],
    scope_b: &[ScopeAppliedInfo],
) -> Result<String, ServiceError> {
    Ok(serde_json::to_string(&ClashDetails { scope_a, scope_b })?)
}

fn failure(test_name: &str, message: String, details: String) -> ClashSummaryDto {
    ClashSummaryDto {
        success: false,
        message,
        details,
        test_name: test_name.to_owned(),
        results: 0,
    }
}

fn zero_items_message(stage: &str, scope: &str, resolved: &ResolvedScope) -> String {
    let reasons: BTreeSet<&str> =
        resolved.applied.iter().map(|info| info.reason.as_str()).collect();
    let reasons = if reasons.is_empty() {
        "no tokens".to_owned()
    } else {
        reasons.into_iter().collect::<Vec<_>>().join(", ")
    };
    format!("{stage}: scope '{scope}' resolved to 0 items ({reasons})")
}

pub fn run_clash(
    document: &mut Document,
    args: &ClashRunArgs,
    cancel: &CancellationToken,
) -> Result<ClashSummaryDto, ServiceError> {
    require_active(document)?;
    let test_name = match args.test_name.trim() {
        "" => DEFAULT_TEST_NAME,
        name => name,
    };

    if args.scope_a.trim().is_empty() || args.scope_b.trim().is_empty() {
        return Ok(failure(
            test_name,
            "INPUT_VALIDATE: scopeA and scopeB are required".to_owned(),
            details_json(&[], &[])?,
        ));
    }
    if !args.tolerance_m.is_finite() || args.tolerance_m < 0.0 {
        return Ok(failure(
            test_name,
            format!(
                "INPUT_VALIDATE: tolerance_m must be a non-negative number, got {}",
                args.tolerance_m
            ),
            details_json(&[], &[])?,
        ));
    }

    let side_a = resolve_scope(document, &args.scope_a, cancel)?;
    if side_a.is_empty() {
        return Ok(failure(
            test_name,
            zero_items_message("RESOLVE_A", &args.scope_a, &side_a),
            details_json(&side_a.applied, &[])?,
        ));
    }
    let side_b = resolve_scope(document, &args.scope_b, cancel)?;
    if side_b.is_empty() {
        return Ok(failure(
            test_name,
            zero_items_message("RESOLVE_B", &args.scope_b, &side_b),
            details_json(&side_a.applied, &side_b.applied)?,
        ));
    }
    let details = details_json(&side_a.applied, &side_b.applied)?;

    document.remove_clash_tests_named(test_name);
    let tolerance = args.tolerance_m / document.units().meters_per_unit();
    let test = document.add_clash_test(ClashTestDefinition {
        name: test_name.to_owned(),
        test_type: ClashTestType::Hard,
        tolerance,
        selection_a: side_a.nodes,
        selection_b: side_b.nodes,
    });
    document.run_clash_test(test)?;
    wait_for_results(document, test, cancel)?;
    let results = count_clash_results(document, test);

    tracing::info!(
        test = %test,
        test_name,
        results,
        tolerance_m = args.tolerance_m,
        "clash test completed"
    );
    Ok(ClashSummaryDto {
        success: true,
        message: format!("clash test '{test_name}' completed with {results} result(s)"),
        details,
        test_name: test_name.to_owned(),
        results,
    })
}

/// Polls until the host has materialized the result collection, or gives up quietly.
fn wait_for_results(
    document: &mut Document,
    test: ClashTestId,
    cancel: &CancellationToken,
) -> Result<(), ServiceError> {
    for attempt in 0..RESULT_POLL_ATTEMPTS {
        checkpoint(cancel)?;
        match document.poll_clash_results(test) {
            Ok(true) => return Ok(()),
            Ok(false) => std::thread::sleep(RESULT_POLL_INTERVAL),
            Err(err) => {
                tracing::warn!(%test, attempt, error = %err, "clash results became unavailable");
                return Ok(());
            }
        }
    }
    tracing::warn!(%test, attempts = RESULT_POLL_ATTEMPTS, "clash results did not materialize");
    Ok(())
}

/// Counts leaf results among the direct children and one level of nested groups.
///
/// Any host failure (unknown or invalidated test) counts as zero results.
pub fn count_clash_results(document: &Document, test: ClashTestId) -> u64 {
    let children = match document.clash_results(test) {
        Ok(Some(children)) => children,
        Ok(None) => return 0,
        Err(err) => {
            tracing::warn!(%test, error = %err, "clash results could not be counted");
            return 0;
        }
    };

    let mut total = 0u64;
    for child in children {
        match child {
            ClashResultNode::Result(_) => total += 1,
            ClashResultNode::Group(group) => {
                let leaves = group
                    .children
                    .iter()
                    .filter(|nested| matches!(nested, ClashResultNode::Result(_)))
                    .count();
                total += leaves as u64;
            }
        }
    }
    total
}
