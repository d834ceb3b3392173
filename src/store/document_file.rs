// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! JSON scene files: a serializable mirror of the document tree.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StoreError;
use crate::model::{BoundingBox3, Document, NodeData, NodeHandle, Point3, PropertyCategory, Units};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneFile {
    pub title: String,
    #[serde(default)]
    pub units: Units,
    /// Number of polls before clash results become readable.
    #[serde(default)]
    pub clash_result_latency: u32,
    #[serde(default)]
    pub models: Vec<SceneModel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneModel {
    pub file: String,
    pub root: SceneNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneBounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub class_display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<SceneBounds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyCategory>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    fn node_data(&self, path: &str) -> Result<NodeData, StoreError> {
        if self.name.trim().is_empty() {
            return Err(StoreError::InvalidScene(format!("node at {path} has an empty name")));
        }
        let mut data = NodeData::new(self.name.clone())
            .class(self.class_name.clone(), self.class_display_name.clone());
        if let Some(guid) = self.guid {
            data = data.guid(guid);
        }
        if let Some(bounds) = &self.bounds {
            let finite = bounds.min.iter().chain(bounds.max.iter()).all(|v| v.is_finite());
            if !finite {
                return Err(StoreError::InvalidScene(format!(
                    "node '{}' has non-finite bounds",
                    self.name
                )));
            }
            data = data.bounds(BoundingBox3::from_extents(bounds.min, bounds.max));
        }
        if let Some([x, y, z]) = self.offset {
            data = data.offset(Point3::new(x, y, z));
        }
        data.properties = self.properties.clone();
        Ok(data)
    }
}

/// Builds a document from scene text.
pub fn parse_document(text: &str, origin: &Path) -> Result<Document, StoreError> {
    let scene: SceneFile = serde_json::from_str(text)
        .map_err(|source| StoreError::Json { path: origin.to_path_buf(), source })?;
    scene.into_document()
}

pub fn load_document(path: &Path) -> Result<Document, StoreError> {
    let text = fs::read_to_string(path)
        .map_err(|source| StoreError::Io { path: path.to_path_buf(), source })?;
    let document = parse_document(&text, path)?;
    tracing::info!(
        path = %path.display(),
        title = document.title(),
        models = document.models().len(),
        "scene loaded"
    );
    Ok(document)
}

impl SceneFile {
    pub fn into_document(self) -> Result<Document, StoreError> {
        let mut document = Document::new(self.title).with_units(self.units);
        document.set_clash_result_latency(self.clash_result_latency);
        for model in &self.models {
            if model.file.trim().is_empty() {
                return Err(StoreError::InvalidScene("model with an empty file name".to_owned()));
            }
            let root = document.add_model(model.file.clone(), model.root.node_data(&model.file)?);
            for child in &model.root.children {
                add_subtree(&mut document, root, child, &model.file)?;
            }
        }
        Ok(document)
    }
}

fn add_subtree(
    document: &mut Document,
    parent: NodeHandle,
    node: &SceneNode,
    path: &str,
) -> Result<(), StoreError> {
    let path = format!("{path}/{}", node.name);
    let handle = document
        .add_child(parent, node.node_data(&path)?)
        .map_err(|err| StoreError::InvalidScene(err.to_string()))?;
    for child in &node.children {
        add_subtree(document, handle, child, &path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use pretty_assertions::assert_eq;

    use super::{load_document, parse_document};
    use crate::model::{BoxSpace, Units};
    use crate::store::StoreError;

    const SCENE: &str = r#"{
        "title": "Two walls",
        "units": "millimeters",
        "clash_result_latency": 2,
        "models": [{
            "file": "C:/scenes/walls.ifc",
            "root": {
                "name": "walls.ifc",
                "class_display_name": "File",
                "children": [
                    {
                        "name": "Wall A",
                        "class_name": "LcWall",
                        "class_display_name": "Walls",
                        "guid": "6e767800-0000-4000-8000-000000000001",
                        "bounds": {"min": [0, 0, 0], "max": [200, 4000, 3000]},
                        "properties": [{
                            "name": "Element",
                            "properties": [{
                                "name": "Material",
                                "value": {"type": "display_string", "value": "Brick"}
                            }]
                        }]
                    },
                    {
                        "name": "Wall B",
                        "class_display_name": "Walls",
                        "bounds": {"min": [0, 0, 0], "max": [200, 4000, 3000]},
                        "offset": [5000, 0, 0]
                    }
                ]
            }
        }]
    }"#;

    #[test]
    fn parses_tree_units_and_geometry() {
        let doc = parse_document(SCENE, Path::new("inline.json")).expect("scene");

        assert_eq!(doc.title(), "Two walls");
        assert_eq!(doc.units(), Units::Millimeters);
        assert_eq!(doc.models().len(), 1);
        assert_eq!(doc.models()[0].file_name(), "C:/scenes/walls.ifc");

        let root = doc.models()[0].root();
        let walls = doc.children(root).expect("children").to_vec();
        assert_eq!(walls.len(), 2);

        let wall_a = doc.node(walls[0]).expect("wall a");
        assert!(wall_a.instance_guid.is_some());
        assert_eq!(wall_a.properties[0].properties[0].label(), "Material");

        let wall_b = doc.bounding_box(walls[1], BoxSpace::World).expect("bounds").expect("some");
        assert_eq!(wall_b.min().x, 5000.0);
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("scene.json");
        std::fs::write(&path, SCENE).expect("write scene");

        let doc = load_document(&path).expect("load");
        assert_eq!(doc.all_items().count(), 3);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load_document(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn malformed_json_is_json_error() {
        let err = parse_document("{\"title\": ", Path::new("broken.json")).unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));
    }

    #[test]
    fn rejects_unnamed_nodes() {
        let text = r#"{"title": "t", "models": [
            {"file": "a.ifc", "root": {"name": "a", "children": [{"name": " "}]}}
        ]}"#;
        let err = parse_document(text, Path::new("t.json")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidScene(message) if message.contains("a.ifc/")));
    }
}
