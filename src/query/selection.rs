// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Host selection: apply by canonical id, clear, snapshot.

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;
use crate::model::Document;

use super::addressing::{canonical_id, resolve_items_by_canonical_ids};
use super::geometry::resolve_geometric_targets;
use super::scope::{split_scope_tokens, ScopeAppliedInfo};
use super::submodel::ModelFiles;
use super::{checkpoint, require_active};

pub const DEFAULT_SNAPSHOT_LIMIT: usize = 100;

fn default_snapshot_limit() -> usize {
    DEFAULT_SNAPSHOT_LIMIT
}

/// One id, a delimited list of ids, or an array of ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum IdList {
    One(String),
    Many(Vec<String>),
}

impl IdList {
    pub fn tokens(&self) -> Vec<String> {
        match self {
            Self::One(value) => split_scope_tokens(value),
            Self::Many(values) => split_scope_tokens(&values.join(",")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ApplySelectionArgs {
    pub canonical_id: IdList,
    /// Adds to the current selection instead of replacing it.
    #[serde(default, rename = "keepExistingSelection", alias = "keep_existing_selection")]
    pub keep_existing_selection: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SelectionResultDto {
    pub success: bool,
    /// One entry per selected geometric target.
    pub applied: Vec<ScopeAppliedInfo>,
    /// Ids that matched nothing or carry no geometry.
    pub unresolved: Vec<String>,
    /// Size of the host selection after the call.
    pub selected_count: usize,
}

pub fn apply_selection(
    document: &mut Document,
    args: &ApplySelectionArgs,
    cancel: &CancellationToken,
) -> Result<SelectionResultDto, ServiceError> {
    require_active(document)?;
    let tokens = args.canonical_id.tokens();
    if tokens.is_empty() {
        return Err(ServiceError::invalid_argument("canonical_id is required"));
    }

    let lookup = resolve_items_by_canonical_ids(document, &tokens, cancel)?;
    let mut unresolved = lookup.unresolved.clone();
    unresolved.extend(lookup.unknown_format.iter().cloned());

    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    let mut applied = Vec::new();
    for entry in &lookup.matches {
        let mut targeted = false;
        for hit in &entry.nodes {
            let geometric = resolve_geometric_targets(document, Some(*hit), cancel)?;
            let resolved_id = canonical_id(document, *hit);
            for target in geometric.targets {
                checkpoint(cancel)?;
                targeted = true;
                if !seen.insert(target) {
                    continue;
                }
                targets.push(target);
                applied.push(ScopeAppliedInfo {
                    input_id: entry.id.clone(),
                    resolved_id: resolved_id.clone(),
                    applied_id: canonical_id(document, target),
                    reason: geometric.reason,
                    element_name: document
                        .node(target)
                        .map(|data| data.display_name.clone())
                        .unwrap_or_default(),
                });
            }
        }
        if !targeted && !entry.nodes.is_empty() {
            unresolved.push(entry.id.clone());
        }
    }

    if targets.is_empty() {
        tracing::debug!(ids = tokens.len(), "selection left untouched, no geometric targets");
        return Ok(SelectionResultDto {
            success: true,
            applied,
            unresolved,
            selected_count: document.current_selection().len(),
        });
    }

    if args.keep_existing_selection {
        document.add_to_selection(targets);
    } else {
        document.set_selection(targets);
    }
    let selected_count = document.current_selection().len();
    tracing::info!(
        applied = applied.len(),
        selected_count,
        keep = args.keep_existing_selection,
        "selection applied"
    );
    Ok(SelectionResultDto { success: true, applied, unresolved, selected_count })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClearSelectionDto {
    pub success: bool,
    pub cleared: usize,
}

pub fn clear_selection(document: &mut Document) -> Result<ClearSelectionDto, ServiceError> {
    require_active(document)?;
    let cleared = document.clear_selection();
    Ok(ClearSelectionDto { success: true, cleared })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SelectionSnapshotArgs {
    #[serde(default = "default_snapshot_limit")]
    pub limit: usize,
}

impl Default for SelectionSnapshotArgs {
    fn default() -> Self {
        Self { limit: DEFAULT_SNAPSHOT_LIMIT }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SelectedItemDto {
    pub canonical_id: String,
    pub display_name: String,
    pub class_display_name: String,
    pub model_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SelectionSnapshotDto {
    pub success: bool,
    pub total: usize,
    pub truncated: bool,
    pub items: Vec<SelectedItemDto>,
}

pub fn current_selection_snapshot(
    document: &Document,
    args: &SelectionSnapshotArgs,
    cancel: &CancellationToken,
) -> Result<SelectionSnapshotDto, ServiceError> {
    require_active(document)?;
    let selection = document.current_selection();
    let files = ModelFiles::new(document);
    let mut items = Vec::new();
    for node in selection.iter().take(args.limit) {
        checkpoint(cancel)?;
        let Ok(data) = document.node(*node) else {
            continue;
        };
        items.push(SelectedItemDto {
            canonical_id: canonical_id(document, *node),
            display_name: data.display_name.clone(),
            class_display_name: data.class_display_name.clone(),
            model_file: files.of(document, *node),
        });
    }
    Ok(SelectionSnapshotDto {
        success: true,
        total: selection.len(),
        truncated: selection.len() > args.limit,
        items,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::model::fixtures::{demo_document, nested_geometry_document};
    use crate::model::NodeHandle;
    use crate::query::geometry::TargetReason;

    fn find(document: &Document, name: &str) -> NodeHandle {
        document
            .all_items()
            .find(|node| {
                document.node(*node).map(|data| data.display_name == name).unwrap_or(false)
            })
            .unwrap_or_else(|| panic!("missing node {name}"))
    }

    fn apply(document: &mut Document, ids: IdList, keep: bool) -> SelectionResultDto {
        let args = ApplySelectionArgs { canonical_id: ids, keep_existing_selection: keep };
        apply_selection(document, &args, &CancellationToken::new()).expect("apply selection")
    }

    #[test]
    fn unknown_id_leaves_selection_untouched() {
        let mut doc = demo_document();
        let wall = find(&doc, "Basic Wall 2");
        doc.set_selection([wall]);
        let revision = doc.revision();

        let result = apply(&mut doc, IdList::Many(vec!["p:deadbeef".into()]), false);

        assert!(result.applied.is_empty());
        assert_eq!(result.unresolved, vec!["p:deadbeef".to_owned()]);
        assert_eq!(doc.current_selection(), &[wall]);
        assert_eq!(doc.revision(), revision);
        assert_eq!(result.selected_count, 1);
    }

    #[test]
    fn replaces_or_extends_the_selection() {
        let mut doc = demo_document();
        let desk = find(&doc, "Desk");
        let chair = find(&doc, "Chair");
        doc.set_selection([desk]);

        let chair_id = canonical_id(&doc, chair);
        let result = apply(&mut doc, IdList::One(chair_id.clone()), false);
        assert_eq!(doc.current_selection(), &[chair]);
        assert_eq!(result.applied[0].reason, TargetReason::Ok);

        let desk_id = canonical_id(&doc, desk);
        let result = apply(&mut doc, IdList::One(desk_id), true);
        assert_eq!(doc.current_selection(), &[chair, desk]);
        assert_eq!(result.selected_count, 2);
    }

    #[test]
    fn group_ids_are_demoted_to_geometry() {
        let mut fixture = nested_geometry_document();
        let group_id = canonical_id(&fixture.document, fixture.group);
        let result = apply(&mut fixture.document, IdList::One(group_id), false);

        assert_eq!(fixture.document.current_selection(), fixture.depth3.as_slice());
        assert!(result
            .applied
            .iter()
            .all(|info| info.reason == TargetReason::DemotedNearestDescendants));
    }

    #[test]
    fn accepts_string_or_array_on_the_wire() {
        let one: ApplySelectionArgs =
            serde_json::from_value(serde_json::json!({ "canonical_id": "a, b" }))
                .expect("string form");
        assert_eq!(one.canonical_id.tokens(), vec!["a".to_owned(), "b".to_owned()]);
        assert!(!one.keep_existing_selection);

        let many: ApplySelectionArgs = serde_json::from_value(
            serde_json::json!({ "canonical_id": ["a", "b"], "keepExistingSelection": true }),
        )
        .expect("array form");
        assert_eq!(many.canonical_id.tokens(), vec!["a".to_owned(), "b".to_owned()]);
        assert!(many.keep_existing_selection);
    }

    #[test]
    fn empty_ids_are_rejected() {
        let mut doc = demo_document();
        let args = ApplySelectionArgs {
            canonical_id: IdList::Many(Vec::new()),
            keep_existing_selection: false,
        };
        let err = apply_selection(&mut doc, &args, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
    }

    #[test]
    fn clear_and_snapshot() {
        let mut doc = demo_document();
        let walls: Vec<_> =
            (0..4).map(|index| find(&doc, &format!("Basic Wall {index}"))).collect();
        doc.set_selection(walls.clone());

        let snapshot = current_selection_snapshot(
            &doc,
            &SelectionSnapshotArgs { limit: 3 },
            &CancellationToken::new(),
        )
        .expect("snapshot");
        assert_eq!(snapshot.total, 4);
        assert!(snapshot.truncated);
        assert_eq!(snapshot.items.len(), 3);
        assert_eq!(snapshot.items[0].display_name, "Basic Wall 0");
        assert_eq!(snapshot.items[0].model_file, "Architecture.ifc");

        assert_eq!(clear_selection(&mut doc).expect("clear").cleared, 4);
        let snapshot = current_selection_snapshot(
            &doc,
            &SelectionSnapshotArgs::default(),
            &CancellationToken::new(),
        )
        .expect("snapshot");
        assert_eq!(snapshot.total, 0);
        assert!(snapshot.items.is_empty());
    }
}
