// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Document overview and unit information.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;
use crate::model::Document;

use super::clash::DEFAULT_TOLERANCE_M;
use super::geometry::has_geometry;
use super::submodel::enumerate_submodels;
use super::{checkpoint, require_active};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SubModelDto {
    pub file_name: String,
    pub display_name: String,
    pub extension: String,
    pub canonical_id: String,
    pub is_container: bool,
    pub item_count: u64,
    pub geometry_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ModelOverviewDto {
    pub success: bool,
    pub title: String,
    pub revision: u64,
    pub units: String,
    pub total_items: u64,
    pub submodels: Vec<SubModelDto>,
}

pub fn model_overview(
    document: &Document,
    cancel: &CancellationToken,
) -> Result<ModelOverviewDto, ServiceError> {
    require_active(document)?;

    let mut submodels = Vec::new();
    for submodel in enumerate_submodels(document) {
        let mut item_count = 0u64;
        let mut geometry_count = 0u64;
        for node in document.descendants_and_self(submodel.root) {
            checkpoint(cancel)?;
            item_count += 1;
            if has_geometry(document, node) {
                geometry_count += 1;
            }
        }
        submodels.push(SubModelDto {
            file_name: submodel.file_only,
            display_name: submodel.display,
            extension: submodel.ext,
            canonical_id: submodel.canonical_id,
            is_container: submodel.is_container,
            item_count,
            geometry_count,
        });
    }

    let mut total_items = 0u64;
    for _ in document.all_items() {
        checkpoint(cancel)?;
        total_items += 1;
    }

    Ok(ModelOverviewDto {
        success: true,
        title: document.title().to_owned(),
        revision: document.revision(),
        units: document.units().as_str().to_owned(),
        total_items,
        submodels,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UnitsDto {
    pub success: bool,
    pub units: String,
    pub meters_per_unit: f64,
    pub default_clash_tolerance_m: f64,
    /// The default clash tolerance expressed in document units.
    pub default_clash_tolerance_model: f64,
}

pub fn units_and_tolerances(document: &Document) -> Result<UnitsDto, ServiceError> {
    require_active(document)?;
    let units = document.units();
    Ok(UnitsDto {
        success: true,
        units: units.as_str().to_owned(),
        meters_per_unit: units.meters_per_unit(),
        default_clash_tolerance_m: DEFAULT_TOLERANCE_M,
        default_clash_tolerance_model: DEFAULT_TOLERANCE_M / units.meters_per_unit(),
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tokio_util::sync::CancellationToken;

    use super::{model_overview, units_and_tolerances};
    use crate::error::ServiceError;
    use crate::model::fixtures::demo_document;
    use crate::model::{Document, Units};

    #[test]
    fn overview_lists_container_and_children() {
        let doc = demo_document();
        let overview = model_overview(&doc, &CancellationToken::new()).expect("overview");

        let files: Vec<&str> =
            overview.submodels.iter().map(|sub| sub.file_name.as_str()).collect();
        assert_eq!(files, vec!["Project.nwf", "Architecture.ifc", "Services.ifc"]);
        assert!(overview.submodels[0].is_container);
        assert_eq!(overview.submodels[0].item_count, overview.total_items);
        assert_eq!(overview.submodels[1].geometry_count, 6);
        assert_eq!(overview.submodels[2].item_count, 4);
        assert_eq!(overview.submodels[2].geometry_count, 2);
        assert_eq!(overview.units, "meters");
        assert_eq!(overview.title, "Demo Project");
    }

    #[test]
    fn tolerance_is_reported_in_document_units() {
        let doc = demo_document().with_units(Units::Millimeters);
        let units = units_and_tolerances(&doc).expect("units");
        assert_eq!(units.units, "millimeters");
        assert!((units.default_clash_tolerance_model - 10.0).abs() < 1e-9);
        assert!((units.meters_per_unit - 0.001).abs() < 1e-12);
    }

    #[test]
    fn empty_document_has_no_overview() {
        let doc = Document::new("nothing open");
        assert!(matches!(
            model_overview(&doc, &CancellationToken::new()),
            Err(ServiceError::NoActiveDocument)
        ));
    }
}
