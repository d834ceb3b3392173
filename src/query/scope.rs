// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Scope resolution.
//!
//! A scope is a `,`/`;`/newline separated list of tokens. Each token is tried against the
//! strategies below in order and the first one that yields nodes wins:
//!
//! 1. canonical ids, replaced by their geometric targets (exact items, no expansion);
//! 2. submodel file name, display name, extension or canonical id (full subtree);
//! 3. substring of a model root's display name (full subtree).
//!
//! A canonical id that resolves to an item with no geometry anywhere below it contributes
//! no nodes and is reported as `no-geometry-in-subtree`. Only ids the lookup did not find
//! fall through to the later strategies.
//!
//! `all` is not special here; document-wide callers check [`is_all_scope`] first.

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;
use crate::model::{Document, NodeHandle};

use super::addressing::{canonical_id, looks_like_canonical_id, resolve_items_by_canonical_ids};
use super::checkpoint;
use super::geometry::{resolve_geometric_targets, TargetReason};
use super::submodel::{enumerate_submodels, SubModelDescriptor};

pub const SCOPE_ALL: &str = "all";
const SCOPE_DELIMITERS: [char; 4] = [',', ';', '\n', '\r'];

/// How one scope token ended up on one concrete node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScopeAppliedInfo {
    pub input_id: String,
    pub resolved_id: String,
    pub applied_id: String,
    pub reason: TargetReason,
    pub element_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedScope {
    pub nodes: Vec<NodeHandle>,
    pub applied: Vec<ScopeAppliedInfo>,
    pub unresolved_tokens: Vec<String>,
}

impl ResolvedScope {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn insert(&mut self, seen: &mut HashSet<NodeHandle>, node: NodeHandle) {
        if seen.insert(node) {
            self.nodes.push(node);
        }
    }
}

pub fn is_all_scope(scope: &str) -> bool {
    let scope = scope.trim();
    scope.is_empty() || scope.eq_ignore_ascii_case(SCOPE_ALL)
}

/// Splits a scope string into trimmed, non-empty tokens, dropping case-insensitive repeats.
pub fn split_scope_tokens(scope: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    scope
        .split(SCOPE_DELIMITERS)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter(|token| seen.insert(token.to_lowercase()))
        .map(str::to_owned)
        .collect()
}

fn element_name(document: &Document, node: NodeHandle) -> String {
    document.node(node).map(|data| data.display_name.clone()).unwrap_or_default()
}

pub fn resolve_scope(
    document: &Document,
    scope: &str,
    cancel: &CancellationToken,
) -> Result<ResolvedScope, ServiceError> {
    let tokens = split_scope_tokens(scope);
    let mut resolved = ResolvedScope::default();
    let mut seen = HashSet::new();

    let id_tokens: Vec<&str> =
        tokens.iter().map(String::as_str).filter(|token| looks_like_canonical_id(token)).collect();
    let lookup = resolve_items_by_canonical_ids(document, &id_tokens, cancel)?;

    let mut pending = Vec::new();
    for token in &tokens {
        if !looks_like_canonical_id(token) {
            pending.push(token.as_str());
            continue;
        }
        let hits = lookup.nodes_for(token);
        if hits.is_empty() {
            pending.push(token.as_str());
            continue;
        }

        for hit in hits {
            let resolved_id = canonical_id(document, *hit);
            let geometric = resolve_geometric_targets(document, Some(*hit), cancel)?;
            if geometric.targets.is_empty() {
                resolved.applied.push(ScopeAppliedInfo {
                    input_id: token.clone(),
                    resolved_id,
                    applied_id: String::new(),
                    reason: geometric.reason,
                    element_name: element_name(document, *hit),
                });
                continue;
            }
            for target in geometric.targets {
                resolved.insert(&mut seen, target);
                resolved.applied.push(ScopeAppliedInfo {
                    input_id: token.clone(),
                    resolved_id: resolved_id.clone(),
                    applied_id: canonical_id(document, target),
                    reason: geometric.reason,
                    element_name: element_name(document, target),
                });
            }
        }
    }

    let mut submodels: Option<Vec<SubModelDescriptor>> = None;
    for token in pending {
        checkpoint(cancel)?;
        let submodels = submodels.get_or_insert_with(|| enumerate_submodels(document));
        let matched: Vec<&SubModelDescriptor> =
            submodels.iter().filter(|submodel| submodel.matches_token(token)).collect();
        if !matched.is_empty() {
            for submodel in matched {
                extend_subtree(document, &mut resolved, &mut seen, submodel.root, cancel)?;
                resolved.applied.push(ScopeAppliedInfo {
                    input_id: token.to_owned(),
                    resolved_id: submodel.canonical_id.clone(),
                    applied_id: submodel.canonical_id.clone(),
                    reason: TargetReason::Ok,
                    element_name: submodel.display.clone(),
                });
            }
            continue;
        }

        let needle = token.to_lowercase();
        let roots: Vec<NodeHandle> = document
            .root_items()
            .filter(|root| element_name(document, *root).to_lowercase().contains(&needle))
            .collect();
        if !roots.is_empty() {
            for root in roots {
                extend_subtree(document, &mut resolved, &mut seen, root, cancel)?;
                let root_id = canonical_id(document, root);
                resolved.applied.push(ScopeAppliedInfo {
                    input_id: token.to_owned(),
                    resolved_id: root_id.clone(),
                    applied_id: root_id,
                    reason: TargetReason::Ok,
                    element_name: element_name(document, root),
                });
            }
            continue;
        }

        tracing::debug!(token, "scope token resolved to nothing");
        resolved.unresolved_tokens.push(token.to_owned());
        resolved.applied.push(ScopeAppliedInfo {
            input_id: token.to_owned(),
            resolved_id: String::new(),
            applied_id: String::new(),
            reason: TargetReason::FallbackNone,
            element_name: String::new(),
        });
    }

    Ok(resolved)
}

fn extend_subtree(
    document: &Document,
    resolved: &mut ResolvedScope,
    seen: &mut HashSet<NodeHandle>,
    root: NodeHandle,
    cancel: &CancellationToken,
) -> Result<(), ServiceError> {
    for node in document.descendants_and_self(root) {
        checkpoint(cancel)?;
        resolved.insert(seen, node);
    }
    Ok(())
}

/// Submodel roots whose canonical id, file name, display name or extension matches any
/// filter token. Returns `None` when the filter has no tokens, meaning "no restriction".
pub fn allowed_model_roots_by_model_filter(
    document: &Document,
    filter: &str,
) -> Option<HashSet<NodeHandle>> {
    let tokens = split_scope_tokens(filter);
    if tokens.is_empty() {
        return None;
    }
    let mut allowed = HashSet::new();
    for submodel in enumerate_submodels(document) {
        if tokens.iter().any(|token| submodel.matches_token(token)) {
            allowed.insert(submodel.root);
        }
    }
    Some(allowed)
}

/// Whether `node` sits below (or is) one of the allowed submodel roots.
pub fn passes_model_filter(
    document: &Document,
    node: NodeHandle,
    allowed: &HashSet<NodeHandle>,
) -> bool {
    document
        .ancestors_and_self(node)
        .map(|chain| chain.iter().any(|candidate| allowed.contains(candidate)))
        .unwrap_or(false)
}
