// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn offset_by(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

/// Axis-aligned bounding box.
///
/// Boxes are normalized on construction so that `min <= max` on every axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox3 {
    min: Point3,
    max: Point3,
}

impl BoundingBox3 {
    pub fn new(a: Point3, b: Point3) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    pub fn from_extents(min: [f64; 3], max: [f64; 3]) -> Self {
        Self::new(Point3::new(min[0], min[1], min[2]), Point3::new(max[0], max[1], max[2]))
    }

    pub fn min(&self) -> Point3 {
        self.min
    }

    pub fn max(&self) -> Point3 {
        self.max
    }

    pub fn size(&self) -> Point3 {
        Point3::new(self.max.x - self.min.x, self.max.y - self.min.y, self.max.z - self.min.z)
    }

    /// A box is degenerate when it has no positive, finite extent on any axis.
    pub fn is_degenerate(&self) -> bool {
        let size = self.size();
        ![size.x, size.y, size.z].iter().any(|extent| extent.is_finite() && *extent > 0.0)
    }

    pub fn translated(&self, offset: Point3) -> Self {
        Self { min: self.min.offset_by(offset), max: self.max.offset_by(offset) }
    }

    /// Signed overlap along the axis with the smallest overlap.
    ///
    /// Positive values are penetration depth; negative values are the separating gap.
    pub fn penetration(&self, other: &Self) -> f64 {
        let overlap_x = self.max.x.min(other.max.x) - self.min.x.max(other.min.x);
        let overlap_y = self.max.y.min(other.max.y) - self.min.y.max(other.min.y);
        let overlap_z = self.max.z.min(other.max.z) - self.min.z.max(other.min.z);
        overlap_x.min(overlap_y).min(overlap_z)
    }
}
