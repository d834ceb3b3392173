// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Clash sub-API of the host document.
//!
//! Tests are definitions over two node selections. Running a test computes results, but the
//! host only exposes them after a configurable number of polls, mirroring hosts that populate
//! result collections after the run call returns.

use serde::{Deserialize, Serialize};

use super::geometry::BoundingBox3;
use super::ids::{ClashTestId, NodeHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClashTestType {
    /// Geometry penetrates by more than the tolerance.
    Hard,
    /// Geometry comes closer than the tolerance.
    Clearance,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClashTestDefinition {
    pub name: String,
    pub test_type: ClashTestType,
    /// Tolerance in document units.
    pub tolerance: f64,
    pub selection_a: Vec<NodeHandle>,
    pub selection_b: Vec<NodeHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClashTestStatus {
    New,
    Completed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClashResult {
    pub item_a: NodeHandle,
    pub item_b: NodeHandle,
    /// Negative values are penetration depth, positive values are clearance.
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClashResultGroup {
    pub name: String,
    pub children: Vec<ClashResultNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClashResultNode {
    Result(ClashResult),
    Group(ClashResultGroup),
}

#[derive(Debug, Clone)]
pub struct ClashTest {
    id: ClashTestId,
    definition: ClashTestDefinition,
    status: ClashTestStatus,
    results: Option<Vec<ClashResultNode>>,
    pending: Option<Vec<ClashResultNode>>,
    polls_until_ready: u32,
    invalidated: bool,
}

impl ClashTest {
    pub(crate) fn new(id: ClashTestId, definition: ClashTestDefinition) -> Self {
        Self {
            id,
            definition,
            status: ClashTestStatus::New,
            results: None,
            pending: None,
            polls_until_ready: 0,
            invalidated: false,
        }
    }

    pub fn id(&self) -> ClashTestId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &ClashTestDefinition {
        &self.definition
    }

    pub fn status(&self) -> ClashTestStatus {
        self.status
    }

    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    pub(crate) fn results(&self) -> Option<&[ClashResultNode]> {
        self.results.as_deref()
    }

    pub(crate) fn results_mut(&mut self) -> Option<&mut Vec<ClashResultNode>> {
        self.results.as_mut()
    }

    pub(crate) fn complete(&mut self, results: Vec<ClashResultNode>, latency: u32) {
        self.status = ClashTestStatus::Completed;
        self.results = None;
        if latency == 0 {
            self.results = Some(results);
            self.pending = None;
        } else {
            self.pending = Some(results);
        }
        self.polls_until_ready = latency;
    }

    /// Advances the host's asynchronous materialization by one poll.
    pub(crate) fn poll(&mut self) -> bool {
        if self.results.is_some() {
            return true;
        }
        if self.polls_until_ready > 0 {
            self.polls_until_ready -= 1;
        }
        if self.polls_until_ready == 0 {
            if let Some(pending) = self.pending.take() {
                self.results = Some(pending);
            }
        }
        self.results.is_some()
    }

    pub(crate) fn invalidate(&mut self) {
        self.invalidated = true;
        self.results = None;
        self.pending = None;
    }
}

/// Computes clash results between two sets of geometric leaves.
///
/// Pairs are unordered and reported once; an item never clashes with itself.
pub(crate) fn detect(
    test_type: ClashTestType,
    tolerance: f64,
    leaves_a: &[(NodeHandle, BoundingBox3)],
    leaves_b: &[(NodeHandle, BoundingBox3)],
) -> Vec<ClashResultNode> {
    let mut seen = std::collections::HashSet::new();
    let mut results = Vec::new();

    for (item_a, box_a) in leaves_a {
        for (item_b, box_b) in leaves_b {
            if item_a == item_b {
                continue;
            }
            let key = if item_a < item_b { (*item_a, *item_b) } else { (*item_b, *item_a) };
            if seen.contains(&key) {
                continue;
            }

            let penetration = box_a.penetration(box_b);
            let clashes = match test_type {
                ClashTestType::Hard => penetration > tolerance,
                ClashTestType::Clearance => -penetration < tolerance,
            };
            if clashes {
                seen.insert(key);
                results.push(ClashResultNode::Result(ClashResult {
                    item_a: *item_a,
                    item_b: *item_b,
                    distance: -penetration,
                }));
            }
        }
    }

    results
}
