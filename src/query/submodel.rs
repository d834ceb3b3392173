// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Submodel enumeration.
//!
//! Every model root is a submodel. Roots loaded from container formats (`.nwd`, `.nwf`) also
//! contribute their immediate children, which are the files appended into the container.

use std::collections::HashMap;

use crate::model::{Document, NodeHandle};

use super::addressing::canonical_id;

const CONTAINER_EXTENSIONS: [&str; 2] = ["nwd", "nwf"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubModelDescriptor {
    pub file_only: String,
    /// Lowercase extension without the leading dot.
    pub ext: String,
    pub display: String,
    pub root: NodeHandle,
    pub canonical_id: String,
    pub is_container: bool,
}

impl SubModelDescriptor {
    fn new(document: &Document, root: NodeHandle, source_name: &str) -> Self {
        let file_only = file_only(source_name).to_owned();
        let ext = extension(&file_only);
        let display = document.node(root).map(|data| data.display_name.clone()).unwrap_or_default();
        Self {
            is_container: CONTAINER_EXTENSIONS.contains(&ext.as_str()),
            file_only,
            ext,
            display,
            root,
            canonical_id: canonical_id(document, root),
        }
    }

    /// Case-insensitive equality against file name, display name, extension or canonical id.
    /// Extensions match with or without a leading dot.
    pub fn matches_token(&self, token: &str) -> bool {
        let token = token.trim();
        if token.is_empty() {
            return false;
        }
        let bare_ext = token.strip_prefix('.').unwrap_or(token);
        self.file_only.eq_ignore_ascii_case(token)
            || self.display.eq_ignore_ascii_case(token)
            || (!self.ext.is_empty() && self.ext.eq_ignore_ascii_case(bare_ext))
            || self.canonical_id.eq_ignore_ascii_case(token)
    }
}

pub fn file_only(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn extension(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// Lists model roots and, for container roots, their immediate children.
pub fn enumerate_submodels(document: &Document) -> Vec<SubModelDescriptor> {
    let mut descriptors = Vec::new();
    for model in document.models() {
        if !document.is_alive(model.root()) {
            continue;
        }
        let descriptor = SubModelDescriptor::new(document, model.root(), model.file_name());
        let is_container = descriptor.is_container;
        descriptors.push(descriptor);
        if !is_container {
            continue;
        }
        for child in document.children(model.root()).unwrap_or_default() {
            let name =
                document.node(*child).map(|data| data.display_name.clone()).unwrap_or_default();
            descriptors.push(SubModelDescriptor::new(document, *child, &name));
        }
    }
    descriptors
}

/// The submodel root owning `node`: the model root, or the container child on the path to it.
pub fn submodel_root_of(document: &Document, node: NodeHandle) -> Option<NodeHandle> {
    let chain = document.ancestors_and_self(node).ok()?;
    let top = *chain.last()?;
    let top_is_container = document
        .models()
        .iter()
        .find(|model| model.root() == top)
        .map(|model| {
            CONTAINER_EXTENSIONS.contains(&extension(file_only(model.file_name())).as_str())
        })
        .unwrap_or(false);
    if top_is_container && chain.len() >= 2 {
        return Some(chain[chain.len() - 2]);
    }
    Some(top)
}

/// Maps submodel roots to their file names so items can report where they came from.
pub(crate) struct ModelFiles(HashMap<NodeHandle, String>);

impl ModelFiles {
    pub(crate) fn new(document: &Document) -> Self {
        Self(
            enumerate_submodels(document)
                .into_iter()
                .map(|submodel| (submodel.root, submodel.file_only))
                .collect(),
        )
    }

    pub(crate) fn of(&self, document: &Document, node: NodeHandle) -> String {
        submodel_root_of(document, node)
            .and_then(|root| self.0.get(&root).cloned())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{enumerate_submodels, file_only, submodel_root_of};
    use crate::model::fixtures::{clash_pair_document, demo_document};

    #[test]
    fn file_only_strips_both_separators() {
        assert_eq!(file_only("C:\\models\\a.ifc"), "a.ifc");
        assert_eq!(file_only("/srv/models/b.nwc"), "b.nwc");
        assert_eq!(file_only("plain.rvt"), "plain.rvt");
    }

    #[test]
    fn plain_models_are_single_submodels() {
        let doc = clash_pair_document();
        let submodels = enumerate_submodels(&doc);
        let names: Vec<_> = submodels.iter().map(|s| s.file_only.as_str()).collect();
        assert_eq!(names, vec!["ModelA.ifc", "ModelB.ifc"]);
        assert!(submodels.iter().all(|s| s.ext == "ifc" && !s.is_container));
    }

    #[test]
    fn container_children_are_enumerated() {
        let doc = demo_document();
        let submodels = enumerate_submodels(&doc);
        let names: Vec<_> =
            submodels.iter().map(|s| (s.file_only.as_str(), s.is_container)).collect();
        assert_eq!(
            names,
            vec![("Project.nwf", true), ("Architecture.ifc", false), ("Services.ifc", false)]
        );
    }

    #[test]
    fn token_matching_covers_every_field() {
        let doc = clash_pair_document();
        let model_a = enumerate_submodels(&doc).remove(0);
        assert!(model_a.matches_token("modela.IFC"));
        assert!(model_a.matches_token(".ifc"));
        assert!(model_a.matches_token("IFC"));
        assert!(model_a.matches_token(&model_a.canonical_id.to_uppercase()));
        assert!(!model_a.matches_token("ModelA"));
        assert!(!model_a.matches_token(""));
    }

    #[test]
    fn submodel_root_skips_container() {
        let doc = demo_document();
        let duct = doc
            .all_items()
            .find(|node| doc.node(*node).map(|d| d.display_name == "Duct Run 1").unwrap_or(false))
            .expect("duct");
        let services = submodel_root_of(&doc, duct).expect("root");
        assert_eq!(doc.node(services).expect("node").display_name, "Services.ifc");
    }
}
