// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::clash::{self, ClashResultGroup, ClashResultNode, ClashTest, ClashTestDefinition};
use super::geometry::{BoundingBox3, Point3};
use super::ids::{ClashTestId, NodeHandle};
use super::property::PropertyCategory;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("node {0} does not exist")]
    InvalidHandle(NodeHandle),
    #[error("node {0} has been disposed")]
    Disposed(NodeHandle),
    #[error("world transform of node {0} is unavailable")]
    TransformUnavailable(NodeHandle),
    #[error("{0} does not exist")]
    UnknownClashTest(ClashTestId),
    #[error("{0} has been invalidated")]
    ClashTestInvalidated(ClashTestId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Units {
    #[default]
    Meters,
    Centimeters,
    Millimeters,
    Feet,
    Inches,
}

impl Units {
    pub fn meters_per_unit(self) -> f64 {
        match self {
            Self::Meters => 1.0,
            Self::Centimeters => 0.01,
            Self::Millimeters => 0.001,
            Self::Feet => 0.3048,
            Self::Inches => 0.0254,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Meters => "meters",
            Self::Centimeters => "centimeters",
            Self::Millimeters => "millimeters",
            Self::Feet => "feet",
            Self::Inches => "inches",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxSpace {
    World,
    Local,
}

/// Host-side payload of a node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeData {
    pub display_name: String,
    pub class_name: String,
    pub class_display_name: String,
    pub instance_guid: Option<Uuid>,
    pub properties: Vec<PropertyCategory>,
    pub bounds: Option<BoundingBox3>,
    pub offset: Point3,
}

impl NodeData {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self { display_name: display_name.into(), ..Self::default() }
    }

    pub fn class(
        mut self,
        class_name: impl Into<String>,
        class_display_name: impl Into<String>,
    ) -> Self {
        self.class_name = class_name.into();
        self.class_display_name = class_display_name.into();
        self
    }

    pub fn guid(mut self, guid: Uuid) -> Self {
        self.instance_guid = Some(guid);
        self
    }

    pub fn bounds(mut self, bounds: BoundingBox3) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn offset(mut self, offset: Point3) -> Self {
        self.offset = offset;
        self
    }

    pub fn category(mut self, category: PropertyCategory) -> Self {
        self.properties.push(category);
        self
    }
}

#[derive(Debug, Clone)]
struct NodeSlot {
    data: NodeData,
    parent: Option<NodeHandle>,
    children: Vec<NodeHandle>,
    disposed: bool,
}

/// A top-level model appended to the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEntry {
    file_name: String,
    root: NodeHandle,
}

impl ModelEntry {
    /// Source file path as recorded by the host.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn root(&self) -> NodeHandle {
        self.root
    }
}

/// In-process document model owned by the host application.
#[derive(Debug, Clone, Default)]
pub struct Document {
    title: String,
    units: Units,
    nodes: Vec<NodeSlot>,
    models: Vec<ModelEntry>,
    selection: Vec<NodeHandle>,
    clash_tests: Vec<ClashTest>,
    next_clash_test: u32,
    clash_result_latency: u32,
    revision: u64,
}

impl Document {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), ..Self::default() }
    }

    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn units(&self) -> Units {
        self.units
    }

    /// Monotonic counter bumped by every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn bump(&mut self) {
        self.revision = self.revision.saturating_add(1);
    }

    pub fn models(&self) -> &[ModelEntry] {
        &self.models
    }

    /// A document without models is what the host reports when nothing is open.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn root_items(&self) -> impl Iterator<Item = NodeHandle> + '_ {
        self.models.iter().map(ModelEntry::root)
    }

    pub fn add_model(&mut self, file_name: impl Into<String>, root: NodeData) -> NodeHandle {
        let root = self.push_node(root, None);
        self.models.push(ModelEntry { file_name: file_name.into(), root });
        self.bump();
        root
    }

    pub fn add_child(
        &mut self,
        parent: NodeHandle,
        data: NodeData,
    ) -> Result<NodeHandle, HostError> {
        self.slot(parent)?;
        let child = self.push_node(data, Some(parent));
        if let Some(slot) = self.nodes.get_mut(parent.index()) {
            slot.children.push(child);
        }
        self.bump();
        Ok(child)
    }

    fn push_node(&mut self, data: NodeData, parent: Option<NodeHandle>) -> NodeHandle {
        let handle = NodeHandle::from_index(self.nodes.len());
        self.nodes.push(NodeSlot { data, parent, children: Vec::new(), disposed: false });
        handle
    }

    fn slot(&self, handle: NodeHandle) -> Result<&NodeSlot, HostError> {
        let slot = self.nodes.get(handle.index()).ok_or(HostError::InvalidHandle(handle))?;
        if slot.disposed {
            return Err(HostError::Disposed(handle));
        }
        Ok(slot)
    }

    pub fn node(&self, handle: NodeHandle) -> Result<&NodeData, HostError> {
        self.slot(handle).map(|slot| &slot.data)
    }

    pub fn is_alive(&self, handle: NodeHandle) -> bool {
        self.slot(handle).is_ok()
    }

    pub fn parent(&self, handle: NodeHandle) -> Result<Option<NodeHandle>, HostError> {
        self.slot(handle).map(|slot| slot.parent)
    }

    pub fn children(&self, handle: NodeHandle) -> Result<&[NodeHandle], HostError> {
        self.slot(handle).map(|slot| slot.children.as_slice())
    }

    /// Ancestors ordered nearest first, excluding `handle` itself.
    pub fn ancestors(&self, handle: NodeHandle) -> Result<Vec<NodeHandle>, HostError> {
        let mut ancestors = Vec::new();
        let mut current = self.slot(handle)?.parent;
        while let Some(parent) = current {
            ancestors.push(parent);
            current = self.slot(parent)?.parent;
        }
        Ok(ancestors)
    }

    /// `handle` followed by its ancestors, nearest first.
    pub fn ancestors_and_self(&self, handle: NodeHandle) -> Result<Vec<NodeHandle>, HostError> {
        let mut chain = vec![handle];
        chain.extend(self.ancestors(handle)?);
        Ok(chain)
    }

    /// Pre-order walk of `handle` and everything below it. Disposed nodes are skipped.
    pub fn descendants_and_self(&self, handle: NodeHandle) -> Descendants<'_> {
        Descendants { document: self, stack: vec![handle] }
    }

    /// Pre-order walk over every model in document order.
    pub fn all_items(&self) -> Descendants<'_> {
        Descendants {
            document: self,
            stack: self.models.iter().rev().map(ModelEntry::root).collect(),
        }
    }

    pub fn bounding_box(
        &self,
        handle: NodeHandle,
        space: BoxSpace,
    ) -> Result<Option<BoundingBox3>, HostError> {
        let slot = self.slot(handle)?;
        let Some(bounds) = slot.data.bounds else {
            return Ok(None);
        };
        match space {
            BoxSpace::Local => Ok(Some(bounds)),
            BoxSpace::World => {
                let mut offset = Point3::ORIGIN;
                for node in self.ancestors_and_self(handle)? {
                    let node_offset = self.slot(node)?.data.offset;
                    if !node_offset.is_finite() {
                        return Err(HostError::TransformUnavailable(handle));
                    }
                    offset = offset.offset_by(node_offset);
                }
                Ok(Some(bounds.translated(offset)))
            }
        }
    }

    /// Removes `handle` and its subtree from the live document.
    pub fn dispose(&mut self, handle: NodeHandle) -> Result<(), HostError> {
        let parent = self.slot(handle)?.parent;
        let doomed: Vec<NodeHandle> = self.descendants_and_self(handle).collect();
        for node in &doomed {
            if let Some(slot) = self.nodes.get_mut(node.index()) {
                slot.disposed = true;
            }
        }
        if let Some(parent) = parent {
            if let Some(slot) = self.nodes.get_mut(parent.index()) {
                slot.children.retain(|child| *child != handle);
            }
        }
        self.models.retain(|model| model.root != handle);
        self.selection.retain(|node| !doomed.contains(node));
        self.bump();
        Ok(())
    }

    pub fn current_selection(&self) -> &[NodeHandle] {
        &self.selection
    }

    pub fn set_selection(&mut self, nodes: impl IntoIterator<Item = NodeHandle>) {
        self.selection.clear();
        self.extend_selection(nodes);
    }

    pub fn add_to_selection(&mut self, nodes: impl IntoIterator<Item = NodeHandle>) {
        self.extend_selection(nodes);
    }

    fn extend_selection(&mut self, nodes: impl IntoIterator<Item = NodeHandle>) {
        for node in nodes {
            if self.is_alive(node) && !self.selection.contains(&node) {
                self.selection.push(node);
            }
        }
        self.bump();
    }

    pub fn clear_selection(&mut self) -> usize {
        let cleared = self.selection.len();
        self.selection.clear();
        self.bump();
        cleared
    }

    pub fn clash_tests(&self) -> &[ClashTest] {
        &self.clash_tests
    }

    /// Number of polls a completed run needs before its results become visible.
    pub fn set_clash_result_latency(&mut self, polls: u32) {
        self.clash_result_latency = polls;
    }

    pub fn add_clash_test(&mut self, definition: ClashTestDefinition) -> ClashTestId {
        self.next_clash_test = self.next_clash_test.saturating_add(1);
        let id = ClashTestId::new(self.next_clash_test);
        self.clash_tests.push(ClashTest::new(id, definition));
        self.bump();
        id
    }

    pub fn remove_clash_tests_named(&mut self, name: &str) -> usize {
        let before = self.clash_tests.len();
        self.clash_tests.retain(|test| test.name() != name);
        let removed = before - self.clash_tests.len();
        if removed > 0 {
            self.bump();
        }
        removed
    }

    pub fn clash_test(&self, id: ClashTestId) -> Result<&ClashTest, HostError> {
        let test = self
            .clash_tests
            .iter()
            .find(|test| test.id() == id)
            .ok_or(HostError::UnknownClashTest(id))?;
        if test.is_invalidated() {
            return Err(HostError::ClashTestInvalidated(id));
        }
        Ok(test)
    }

    fn clash_test_mut(&mut self, id: ClashTestId) -> Result<&mut ClashTest, HostError> {
        let test = self
            .clash_tests
            .iter_mut()
            .find(|test| test.id() == id)
            .ok_or(HostError::UnknownClashTest(id))?;
        if test.is_invalidated() {
            return Err(HostError::ClashTestInvalidated(id));
        }
        Ok(test)
    }

    pub fn run_clash_test(&mut self, id: ClashTestId) -> Result<(), HostError> {
        let definition = self.clash_test(id)?.definition().clone();
        let leaves_a = self.geometric_leaves(&definition.selection_a);
        let leaves_b = self.geometric_leaves(&definition.selection_b);
        let results =
            clash::detect(definition.test_type, definition.tolerance, &leaves_a, &leaves_b);
        let latency = self.clash_result_latency;
        self.clash_test_mut(id)?.complete(results, latency);
        self.bump();
        Ok(())
    }

    fn geometric_leaves(&self, selection: &[NodeHandle]) -> Vec<(NodeHandle, BoundingBox3)> {
        let mut seen = std::collections::HashSet::new();
        let mut leaves = Vec::new();
        for root in selection {
            for node in self.descendants_and_self(*root) {
                if !seen.insert(node) {
                    continue;
                }
                let bounds = self
                    .bounding_box(node, BoxSpace::World)
                    .or_else(|_| self.bounding_box(node, BoxSpace::Local));
                if let Ok(Some(bounds)) = bounds {
                    if !bounds.is_degenerate() {
                        leaves.push((node, bounds));
                    }
                }
            }
        }
        leaves
    }

    /// Lets the host materialize results; returns whether the result collection exists.
    pub fn poll_clash_results(&mut self, id: ClashTestId) -> Result<bool, HostError> {
        Ok(self.clash_test_mut(id)?.poll())
    }

    pub fn clash_results(&self, id: ClashTestId) -> Result<Option<&[ClashResultNode]>, HostError> {
        Ok(self.clash_test(id)?.results())
    }

    /// Moves the top-level results at `indices` into a named group, like a user would.
    pub fn group_clash_results(
        &mut self,
        id: ClashTestId,
        name: impl Into<String>,
        indices: &[usize],
    ) -> Result<(), HostError> {
        let Some(results) = self.clash_test_mut(id)?.results_mut() else {
            return Ok(());
        };
        let mut grouped = Vec::new();
        let mut kept = Vec::new();
        for (index, node) in results.drain(..).enumerate() {
            if indices.contains(&index) {
                grouped.push(node);
            } else {
                kept.push(node);
            }
        }
        kept.push(ClashResultNode::Group(ClashResultGroup {
            name: name.into(),
            children: grouped,
        }));
        *results = kept;
        self.bump();
        Ok(())
    }

    pub fn invalidate_clash_test(&mut self, id: ClashTestId) -> Result<(), HostError> {
        self.clash_test_mut(id)?.invalidate();
        self.bump();
        Ok(())
    }
}

/// Iterator returned by [`Document::descendants_and_self`] and [`Document::all_items`].
pub struct Descendants<'a> {
    document: &'a Document,
    stack: Vec<NodeHandle>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeHandle;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(handle) = self.stack.pop() {
            let Ok(children) = self.document.children(handle) else {
                continue;
            };
            self.stack.extend(children.iter().rev().copied());
            return Some(handle);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{BoxSpace, Document, HostError, NodeData};
    use crate::model::{BoundingBox3, Point3};

    fn small_document() -> (Document, [crate::model::NodeHandle; 4]) {
        let mut doc = Document::new("small");
        let root = doc.add_model("C:/models/Site.ifc", NodeData::new("Site.ifc"));
        let storey = doc
            .add_child(root, NodeData::new("Level 1").offset(Point3::new(0.0, 0.0, 3.0)))
            .expect("storey");
        let wall = doc
            .add_child(
                storey,
                NodeData::new("Wall").bounds(BoundingBox3::from_extents([0.0; 3], [1.0; 3])),
            )
            .expect("wall");
        let door = doc.add_child(storey, NodeData::new("Door")).expect("door");
        (doc, [root, storey, wall, door])
    }

    #[test]
    fn descendants_are_pre_order() {
        let (doc, [root, storey, wall, door]) = small_document();
        let order: Vec<_> = doc.descendants_and_self(root).collect();
        assert_eq!(order, vec![root, storey, wall, door]);
        assert_eq!(doc.all_items().count(), 4);
    }

    #[test]
    fn ancestors_are_nearest_first() {
        let (doc, [root, storey, wall, _]) = small_document();
        assert_eq!(doc.ancestors(wall).expect("ancestors"), vec![storey, root]);
        assert_eq!(doc.ancestors_and_self(wall).expect("chain"), vec![wall, storey, root]);
    }

    #[test]
    fn world_box_applies_accumulated_offsets() {
        let (doc, [_, _, wall, door]) = small_document();
        let world = doc.bounding_box(wall, BoxSpace::World).expect("world").expect("box");
        assert_eq!(world.min(), Point3::new(0.0, 0.0, 3.0));
        assert_eq!(doc.bounding_box(door, BoxSpace::Local).expect("local"), None);
    }

    #[test]
    fn broken_transform_fails_world_query_only() {
        let mut doc = Document::new("broken");
        let broken = NodeData::new("a.ifc").offset(Point3::new(f64::NAN, 0.0, 0.0));
        let root = doc.add_model("a.ifc", broken);
        let bounds = BoundingBox3::from_extents([0.0; 3], [1.0; 3]);
        let item = doc.add_child(root, NodeData::new("item").bounds(bounds)).expect("item");

        assert_eq!(
            doc.bounding_box(item, BoxSpace::World),
            Err(HostError::TransformUnavailable(item))
        );
        assert!(doc.bounding_box(item, BoxSpace::Local).expect("local").is_some());
    }

    #[test]
    fn dispose_detaches_subtree_and_selection() {
        let (mut doc, [root, storey, wall, _]) = small_document();
        doc.set_selection([wall]);
        doc.dispose(storey).expect("dispose");

        assert_eq!(doc.node(wall), Err(HostError::Disposed(wall)));
        assert!(doc.current_selection().is_empty());
        assert_eq!(doc.descendants_and_self(root).count(), 1);
    }

    #[test]
    fn mutations_bump_revision() {
        let (mut doc, [_, _, wall, _]) = small_document();
        let before = doc.revision();
        doc.add_to_selection([wall]);
        assert!(doc.revision() > before);
    }
}
