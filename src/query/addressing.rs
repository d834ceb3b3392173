// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Canonical addressing of document nodes.
//!
//! Nodes with a native instance GUID are addressed by it. Everything else gets a path hash:
//! `p:` followed by eight hex digits of FNV-1a over the `/`-joined display names from the
//! model root down to the node. Path hashes are session-scoped: renaming an ancestor changes
//! them, and structurally identical subtrees share them.

use std::collections::{HashMap, HashSet};
use std::fmt;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::model::{Document, HostError, NodeData, NodeHandle};

use super::checkpoint;

pub const PATH_HASH_PREFIX: &str = "p:";
const UNNAMED_SEGMENT: &str = "<unnamed>";
const PATH_SEPARATOR: char = '/';

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// A parsed canonical id token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CanonicalId {
    Guid(Uuid),
    /// Normalized `p:<hex>` form.
    PathHash(String),
}

impl CanonicalId {
    /// Parses a token shaped like a canonical id: a non-nil GUID in any common notation, or
    /// `p:` followed by a non-empty suffix.
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        let hash_suffix = token
            .get(..PATH_HASH_PREFIX.len())
            .filter(|prefix| prefix.eq_ignore_ascii_case(PATH_HASH_PREFIX))
            .map(|_| &token[PATH_HASH_PREFIX.len()..]);
        if let Some(suffix) = hash_suffix {
            let suffix = suffix.trim();
            if suffix.is_empty() {
                return None;
            }
            return Some(Self::PathHash(format!(
                "{PATH_HASH_PREFIX}{}",
                suffix.to_ascii_lowercase()
            )));
        }
        Uuid::parse_str(token).ok().filter(|guid| !guid.is_nil()).map(Self::Guid)
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guid(guid) => write!(f, "{}", guid.hyphenated()),
            Self::PathHash(hash) => f.write_str(hash),
        }
    }
}

pub fn looks_like_canonical_id(token: &str) -> bool {
    CanonicalId::parse(token).is_some()
}

/// Returns the canonical id of `node`.
///
/// Never fails: host errors are reported inline as `ERR:<message>` so a bad node cannot abort
/// a batch.
pub fn canonical_id(document: &Document, node: NodeHandle) -> String {
    let data = match document.node(node) {
        Ok(data) => data,
        Err(err) => return format!("ERR:{err}"),
    };
    if let Some(guid) = native_guid(data) {
        return CanonicalId::Guid(guid).to_string();
    }
    compute_path_hash(document, node).unwrap_or_else(|err| format!("ERR:{err}"))
}

pub fn compute_path_hash(document: &Document, node: NodeHandle) -> Result<String, HostError> {
    let mut chain = document.ancestors_and_self(node)?;
    chain.reverse();

    let mut path = String::new();
    for (index, handle) in chain.into_iter().enumerate() {
        if index > 0 {
            path.push(PATH_SEPARATOR);
        }
        path.push_str(path_segment(document.node(handle)?));
    }
    Ok(hash_path(&path))
}

fn native_guid(data: &NodeData) -> Option<Uuid> {
    data.instance_guid.filter(|guid| !guid.is_nil())
}

fn path_segment(data: &NodeData) -> &str {
    [&data.display_name, &data.class_display_name, &data.class_name]
        .into_iter()
        .map(|name| name.trim())
        .find(|name| !name.is_empty())
        .unwrap_or(UNNAMED_SEGMENT)
}

fn hash_path(path: &str) -> String {
    let hash = path.bytes().fold(FNV_OFFSET_BASIS, |state, byte| {
        (state ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    });
    format!("{PATH_HASH_PREFIX}{hash:08x}")
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdMatch {
    pub id: String,
    pub nodes: Vec<NodeHandle>,
}

/// Result of a reverse canonical-id lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdLookup {
    /// One entry per well-formed input id, in input order.
    pub matches: Vec<IdMatch>,
    /// Every matched node, deduplicated across ids, in first-match order.
    pub nodes: Vec<NodeHandle>,
    /// Well-formed ids that matched nothing.
    pub unresolved: Vec<String>,
    /// Inputs that are neither GUIDs nor path hashes.
    pub unknown_format: Vec<String>,
}

impl IdLookup {
    pub fn nodes_for(&self, id: &str) -> &[NodeHandle] {
        self.matches.iter().find(|entry| entry.id == id).map_or(&[], |entry| entry.nodes.as_slice())
    }
}

/// Resolves canonical ids back to nodes with a single pass over the whole document.
///
/// The cost is proportional to the document size, not to the number of ids, because path
/// hashes are only known after walking every node.
pub fn resolve_items_by_canonical_ids<S: AsRef<str>>(
    document: &Document,
    ids: &[S],
    cancel: &CancellationToken,
) -> Result<IdLookup, ServiceError> {
    let mut lookup = IdLookup::default();
    let mut guid_bucket: HashMap<Uuid, Vec<usize>> = HashMap::new();
    let mut hash_bucket: HashMap<String, Vec<usize>> = HashMap::new();

    for raw in ids {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            continue;
        }
        let Some(parsed) = CanonicalId::parse(raw) else {
            tracing::debug!(id = raw, "ignoring id with unknown format");
            lookup.unknown_format.push(raw.to_owned());
            continue;
        };
        let index = lookup.matches.len();
        lookup.matches.push(IdMatch { id: raw.to_owned(), nodes: Vec::new() });
        match parsed {
            CanonicalId::Guid(guid) => guid_bucket.entry(guid).or_default().push(index),
            CanonicalId::PathHash(hash) => hash_bucket.entry(hash).or_default().push(index),
        }
    }

    if guid_bucket.is_empty() && hash_bucket.is_empty() {
        return Ok(lookup);
    }

    let want_hashes = !hash_bucket.is_empty();
    let roots: Vec<NodeHandle> = document.root_items().collect();
    let mut stack: Vec<(NodeHandle, Option<String>)> =
        roots.into_iter().rev().map(|root| (root, None)).collect();

    while let Some((node, parent_path)) = stack.pop() {
        checkpoint(cancel)?;
        let Ok(data) = document.node(node) else {
            continue;
        };

        if let Some(indices) = native_guid(data).and_then(|guid| guid_bucket.get(&guid)) {
            for index in indices {
                lookup.matches[*index].nodes.push(node);
            }
        }

        let path = if want_hashes {
            let segment = path_segment(data);
            let path = match parent_path {
                Some(parent) => format!("{parent}{PATH_SEPARATOR}{segment}"),
                None => segment.to_owned(),
            };
            if let Some(indices) = hash_bucket.get(&hash_path(&path)) {
                for index in indices {
                    lookup.matches[*index].nodes.push(node);
                }
            }
            Some(path)
        } else {
            None
        };

        if let Ok(children) = document.children(node) {
            for child in children.iter().rev() {
                stack.push((*child, path.clone()));
            }
        }
    }

    let mut seen = HashSet::new();
    for entry in &lookup.matches {
        if entry.nodes.is_empty() {
            lookup.unresolved.push(entry.id.clone());
        }
        for node in &entry.nodes {
            if seen.insert(*node) {
                lookup.nodes.push(*node);
            }
        }
    }
    if !lookup.unresolved.is_empty() {
        tracing::warn!(unresolved = ?lookup.unresolved, "canonical ids matched no document node");
    }

    Ok(lookup)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    use super::{canonical_id, compute_path_hash, resolve_items_by_canonical_ids, CanonicalId};
    use crate::error::ServiceError;
    use crate::model::fixtures::{clash_pair_document, demo_document};
    use crate::model::{Document, NodeData};

    #[test]
    fn parses_guid_and_path_hash_tokens() {
        let guid = Uuid::from_u128(7);
        assert_eq!(CanonicalId::parse(&guid.to_string()), Some(CanonicalId::Guid(guid)));
        assert_eq!(
            CanonicalId::parse(&format!("{{{}}}", guid.hyphenated())),
            Some(CanonicalId::Guid(guid))
        );
        assert_eq!(
            CanonicalId::parse("P:DeadBeef"),
            Some(CanonicalId::PathHash("p:deadbeef".into()))
        );
        assert_eq!(CanonicalId::parse("p:"), None);
        assert_eq!(CanonicalId::parse(&Uuid::nil().to_string()), None);
        assert_eq!(CanonicalId::parse("ModelA.ifc"), None);
    }

    #[test]
    fn canonical_id_prefers_native_guid() {
        let mut doc = Document::new("guid");
        let guid = Uuid::from_u128(0xabc);
        let root = doc.add_model("a.ifc", NodeData::new("a.ifc").guid(guid));
        assert_eq!(canonical_id(&doc, root), guid.hyphenated().to_string());
    }

    #[test]
    fn canonical_id_is_idempotent() {
        let doc = demo_document();
        for node in doc.all_items() {
            assert_eq!(canonical_id(&doc, node), canonical_id(&doc, node));
        }
    }

    #[test]
    fn path_hash_depends_on_ancestor_names() {
        let mut doc = Document::new("hash");
        let root = doc.add_model("a.ifc", NodeData::new("a.ifc"));
        let unnamed = doc.add_child(root, NodeData::new("")).expect("child");
        let class_named = doc
            .add_child(root, NodeData::new("  ").class("LcOaGroup", "Group"))
            .expect("child");

        let id = canonical_id(&doc, unnamed);
        assert!(id.starts_with("p:"));
        assert_eq!(id.len(), 10);
        assert_ne!(id, canonical_id(&doc, class_named));
        assert_eq!(compute_path_hash(&doc, unnamed).expect("hash"), id);
    }

    #[test]
    fn disposed_nodes_report_inline_errors() {
        let mut doc = clash_pair_document();
        let node = doc.all_items().nth(2).expect("node");
        doc.dispose(node).expect("dispose");
        assert!(canonical_id(&doc, node).starts_with("ERR:"));
    }

    #[test]
    fn reverse_lookup_round_trips_every_node() {
        let doc = demo_document();
        let cancel = CancellationToken::new();
        for node in doc.all_items() {
            let id = canonical_id(&doc, node);
            let lookup =
                resolve_items_by_canonical_ids(&doc, &[id.as_str()], &cancel).expect("lookup");
            assert!(lookup.nodes.contains(&node), "{id} did not resolve back to {node}");
        }
    }

    #[test]
    fn reverse_lookup_keeps_order_and_reports_bad_ids() {
        let doc = clash_pair_document();
        let cancel = CancellationToken::new();
        let nodes: Vec<_> = doc.all_items().collect();
        let first = canonical_id(&doc, nodes[3]);
        let second = canonical_id(&doc, nodes[1]);

        let lookup = resolve_items_by_canonical_ids(
            &doc,
            &[second.as_str(), "garbage", first.as_str(), "p:00000000", second.as_str()],
            &cancel,
        )
        .expect("lookup");

        assert_eq!(lookup.nodes, vec![nodes[1], nodes[3]]);
        assert_eq!(lookup.unknown_format, vec!["garbage".to_owned()]);
        assert_eq!(lookup.unresolved, vec!["p:00000000".to_owned()]);
        assert_eq!(lookup.nodes_for(&first), &[nodes[3]]);
    }

    #[test]
    fn reverse_lookup_honors_cancellation() {
        let doc = demo_document();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = resolve_items_by_canonical_ids(&doc, &["p:1234abcd"], &cancel).unwrap_err();
        assert!(matches!(err, ServiceError::Canceled));
    }
}
