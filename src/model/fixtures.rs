// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Canned documents used by the demo mode, tests and benches.

use uuid::Uuid;

use super::document::{Document, NodeData, Units};
use super::geometry::BoundingBox3;
use super::ids::NodeHandle;
use super::property::{PropertyCategory, VariantValue};

fn cube(min: [f64; 3], edge: f64) -> BoundingBox3 {
    BoundingBox3::from_extents(min, [min[0] + edge, min[1] + edge, min[2] + edge])
}

fn guid(seed: u128) -> Uuid {
    Uuid::from_u128(0x6e76_7800_0000_4000_8000_0000_0000_0000 | seed)
}

fn element(name: &str, class_display: &str, material: &str) -> NodeData {
    NodeData::new(name)
        .class(format!("Lc{}", class_display.replace(' ', "")), class_display)
        .category(
            PropertyCategory::new("Element")
                .with("Category", VariantValue::DisplayString(class_display.to_owned()))
                .with("Material", VariantValue::DisplayString(material.to_owned())),
        )
}

/// A federated `.nwf` project with an architectural and a services model.
///
/// The duct run in `Services.ifc` penetrates exactly one wall of `Architecture.ifc`.
pub fn demo_document() -> Document {
    let mut doc = Document::new("Demo Project").with_units(Units::Meters);
    let project = doc.add_model("C:/projects/demo/Project.nwf", NodeData::new("Project.nwf"));

    let arch = add(
        &mut doc,
        project,
        NodeData::new("Architecture.ifc").class("LcOaPartition", "File"),
    );
    let level =
        add(&mut doc, arch, NodeData::new("Level 1").class("LcIfcBuildingStorey", "Storey"));
    for index in 0..4u32 {
        let x = f64::from(index) * 5.0;
        let wall = element(&format!("Basic Wall {index}"), "Walls", "Concrete")
            .guid(guid(u128::from(index) + 1))
            .bounds(BoundingBox3::from_extents([x, 0.0, 0.0], [x + 0.2, 4.0, 3.0]))
            .category(
                PropertyCategory::new("Dimensions")
                    .with("Length", VariantValue::Length(4.0))
                    .with("Height", VariantValue::Length(3.0)),
            );
        add(&mut doc, level, wall);
    }
    let furniture = add(&mut doc, level, NodeData::new("Furniture").class("LcOaGroup", "Group"));
    let desk_set = add(&mut doc, furniture, NodeData::new("Desk Set").class("LcOaGroup", "Group"));
    add(
        &mut doc,
        desk_set,
        element("Desk", "Furniture", "Oak").bounds(cube([1.0, 1.0, 0.0], 0.8)),
    );
    add(
        &mut doc,
        desk_set,
        element("Chair", "Furniture", "Steel").bounds(cube([1.0, 2.0, 0.0], 0.5)),
    );

    let services =
        add(&mut doc, project, NodeData::new("Services.ifc").class("LcOaPartition", "File"));
    let system =
        add(&mut doc, services, NodeData::new("Supply Air").class("LcIfcSystem", "System"));
    add(
        &mut doc,
        system,
        element("Duct Run 1", "Ducts", "Galvanized Steel")
            .guid(guid(0x100))
            .bounds(BoundingBox3::from_extents([4.5, 1.0, 2.0], [5.5, 1.4, 2.4])),
    );
    add(
        &mut doc,
        system,
        element("Duct Run 2", "Ducts", "Galvanized Steel")
            .guid(guid(0x101))
            .bounds(BoundingBox3::from_extents([2.0, 1.0, 2.0], [3.0, 1.4, 2.4])),
    );

    doc
}

/// One `.ifc` model with `count` wall elements and a few non-wall items.
pub fn walls_document(count: usize) -> Document {
    let mut doc = Document::new("Walls");
    let root = doc.add_model("D:/bim/Building.ifc", NodeData::new("Building.ifc"));
    let storey =
        add(&mut doc, root, NodeData::new("Level 0").class("LcIfcBuildingStorey", "Storey"));
    for index in 0..count {
        let x = index as f64 * 2.0;
        add(
            &mut doc,
            storey,
            element(&format!("Wall {index}"), "Walls", "Brick")
                .bounds(BoundingBox3::from_extents([x, 0.0, 0.0], [x + 0.3, 5.0, 3.0])),
        );
    }
    for index in 0..3 {
        add(
            &mut doc,
            storey,
            element(&format!("Slab {index}"), "Floors", "Concrete")
                .bounds(BoundingBox3::from_extents([0.0, 0.0, -0.3], [10.0, 10.0, 0.0])),
        );
    }
    doc
}

/// Two disjoint `.ifc` models whose geometry produces exactly one hard clash.
pub fn clash_pair_document() -> Document {
    let mut doc = Document::new("Clash Pair");
    let model_a = doc.add_model("C:/clash/ModelA.ifc", NodeData::new("ModelA.ifc"));
    let group_a = add(&mut doc, model_a, NodeData::new("Structure").class("LcOaGroup", "Group"));
    add(
        &mut doc,
        group_a,
        element("Beam A1", "Structural Framing", "Steel").bounds(cube([0.0; 3], 1.0)),
    );
    add(
        &mut doc,
        group_a,
        element("Beam A2", "Structural Framing", "Steel").bounds(cube([10.0, 0.0, 0.0], 1.0)),
    );

    let model_b = doc.add_model("C:/clash/ModelB.ifc", NodeData::new("ModelB.ifc"));
    let group_b = add(&mut doc, model_b, NodeData::new("Piping").class("LcOaGroup", "Group"));
    add(
        &mut doc,
        group_b,
        element("Pipe B1", "Pipes", "Copper").bounds(cube([0.5, 0.5, 0.5], 1.0)),
    );
    add(
        &mut doc,
        group_b,
        element("Pipe B2", "Pipes", "Copper").bounds(cube([20.0, 0.0, 0.0], 1.0)),
    );
    doc
}

/// Handles into [`nested_geometry_document`].
#[derive(Debug, Clone)]
pub struct NestedGeometry {
    pub document: Document,
    pub root: NodeHandle,
    pub group: NodeHandle,
    pub depth3: Vec<NodeHandle>,
    pub depth4: NodeHandle,
}

/// A non-geometric group whose nearest geometric descendants sit three levels down.
///
/// One branch continues below depth 3 with deeper geometry that must never be returned.
pub fn nested_geometry_document() -> NestedGeometry {
    let mut doc = Document::new("Nested");
    let root = doc.add_model("E:/nested/Nested.ifc", NodeData::new("Nested.ifc"));
    let group = add(&mut doc, root, NodeData::new("Assembly").class("LcOaGroup", "Group"));
    let mut depth3 = Vec::new();
    let mut depth4 = None;
    for branch in 0..2 {
        let level1 = add(&mut doc, group, NodeData::new(format!("Sub {branch}")));
        let level2 = add(&mut doc, level1, NodeData::new(format!("Part {branch}")));
        let leaf = add(
            &mut doc,
            level2,
            NodeData::new(format!("Solid {branch}"))
                .bounds(cube([f64::from(branch) * 3.0, 0.0, 0.0], 1.0)),
        );
        depth3.push(leaf);
        if branch == 0 {
            let holder = add(&mut doc, level2, NodeData::new("Holder"));
            depth4 = Some(add(
                &mut doc,
                holder,
                NodeData::new("Deep Solid").bounds(cube([0.0, 5.0, 0.0], 1.0)),
            ));
        }
    }
    let depth4 = depth4.unwrap_or(group);
    NestedGeometry { document: doc, root, group, depth3, depth4 }
}

fn add(doc: &mut Document, parent: NodeHandle, data: NodeData) -> NodeHandle {
    doc.add_child(parent, data).expect("fixture parent is alive")
}
