// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Host document model.
//!
//! An in-process stand-in for the CAD host's document API: models with a root node each,
//! nodes carrying names, class names, an optional instance GUID, typed property categories and
//! bounding boxes, plus the selection and clash sub-APIs.

pub mod clash;
pub mod document;
pub mod fixtures;
pub mod geometry;
pub mod ids;
pub mod property;

pub use clash::{
    ClashResult, ClashResultGroup, ClashResultNode, ClashTest, ClashTestDefinition,
    ClashTestStatus, ClashTestType,
};
pub use document::{BoxSpace, Descendants, Document, HostError, ModelEntry, NodeData, Units};
pub use geometry::{BoundingBox3, Point3};
pub use ids::{ClashTestId, NodeHandle};
pub use property::{DataProperty, PropertyCategory, VariantValue};
