// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Geometric promotion and demotion.
//!
//! Selection and clash testing only make sense against nodes with geometry. Grouping nodes are
//! replaced by the nearest geometric ancestor, or failing that by every geometric descendant on
//! the shallowest level that has any.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;
use crate::model::{BoxSpace, Document, NodeHandle};

use super::checkpoint;

pub const DEMOTION_MAX_DEPTH: usize = 5;
pub const DEMOTION_MAX_NODES: usize = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum TargetReason {
    #[serde(rename = "ok")]
    Ok,
    #[serde(rename = "promoted:no-geometry")]
    PromotedNoGeometry,
    #[serde(rename = "demoted:nearest-descendants")]
    DemotedNearestDescendants,
    #[serde(rename = "no-geometry-in-subtree")]
    NoGeometryInSubtree,
    #[serde(rename = "fallback:none")]
    FallbackNone,
}

impl TargetReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::PromotedNoGeometry => "promoted:no-geometry",
            Self::DemotedNearestDescendants => "demoted:nearest-descendants",
            Self::NoGeometryInSubtree => "no-geometry-in-subtree",
            Self::FallbackNone => "fallback:none",
        }
    }
}

impl fmt::Display for TargetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometricTargets {
    pub targets: Vec<NodeHandle>,
    pub reason: TargetReason,
    /// Ancestor levels climbed for a promotion, zero otherwise.
    pub steps: usize,
}

impl GeometricTargets {
    fn new(targets: Vec<NodeHandle>, reason: TargetReason, steps: usize) -> Self {
        Self { targets, reason, steps }
    }
}

/// Whether `node` carries geometry: a bounding box with positive extent on at least one axis.
///
/// The world box is tried first, then the local box. Host failures (disposed nodes, broken
/// transforms) count as "no geometry".
pub fn has_geometry(document: &Document, node: NodeHandle) -> bool {
    [BoxSpace::World, BoxSpace::Local].into_iter().any(|space| {
        matches!(document.bounding_box(node, space), Ok(Some(bounds)) if !bounds.is_degenerate())
    })
}

pub fn resolve_geometric_targets(
    document: &Document,
    node: Option<NodeHandle>,
    cancel: &CancellationToken,
) -> Result<GeometricTargets, ServiceError> {
    resolve_within_budget(document, node, DEMOTION_MAX_NODES, cancel)
}

fn resolve_within_budget(
    document: &Document,
    node: Option<NodeHandle>,
    max_nodes: usize,
    cancel: &CancellationToken,
) -> Result<GeometricTargets, ServiceError> {
    let Some(node) = node else {
        return Ok(GeometricTargets::new(Vec::new(), TargetReason::FallbackNone, 0));
    };

    if has_geometry(document, node) {
        return Ok(GeometricTargets::new(vec![node], TargetReason::Ok, 0));
    }

    let ancestors = document.ancestors(node).unwrap_or_default();
    for (index, ancestor) in ancestors.into_iter().enumerate() {
        checkpoint(cancel)?;
        if has_geometry(document, ancestor) {
            return Ok(GeometricTargets::new(
                vec![ancestor],
                TargetReason::PromotedNoGeometry,
                index + 1,
            ));
        }
    }

    let nearest = nearest_geometric_descendants(document, node, max_nodes, cancel)?;
    if nearest.is_empty() {
        Ok(GeometricTargets::new(Vec::new(), TargetReason::NoGeometryInSubtree, 0))
    } else {
        Ok(GeometricTargets::new(nearest, TargetReason::DemotedNearestDescendants, 0))
    }
}

/// Breadth-first search below `node` returning every geometric node on the first level that
/// has any. A level cut short by the node budget is discarded rather than returned partially.
fn nearest_geometric_descendants(
    document: &Document,
    node: NodeHandle,
    max_nodes: usize,
    cancel: &CancellationToken,
) -> Result<Vec<NodeHandle>, ServiceError> {
    let mut level = document.children(node).map(<[NodeHandle]>::to_vec).unwrap_or_default();
    let mut visited = 0usize;

    for _depth in 1..=DEMOTION_MAX_DEPTH {
        if level.is_empty() {
            break;
        }

        let mut found = Vec::new();
        let mut next = Vec::new();
        for candidate in &level {
            checkpoint(cancel)?;
            visited += 1;
            if visited > max_nodes {
                tracing::debug!(%node, visited, "demotion search hit its node budget");
                return Ok(Vec::new());
            }
            if has_geometry(document, *candidate) {
                found.push(*candidate);
            } else if let Ok(children) = document.children(*candidate) {
                next.extend_from_slice(children);
            }
        }

        if !found.is_empty() {
            return Ok(found);
        }
        level = next;
    }

    Ok(Vec::new())
}
