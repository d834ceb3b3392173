// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

/// Handle to a node inside a [`crate::model::Document`] arena.
///
/// Handles are plain indices: they stay valid for the lifetime of the document, but the node
/// they point at may be disposed by the host, in which case every accessor reports
/// [`crate::model::HostError::Disposed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(u32);

impl NodeHandle {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to a clash test registered with the document's clash sub-API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClashTestId(u32);

impl ClashTestId {
    pub(crate) fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ClashTestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clash-test-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{ClashTestId, NodeHandle};

    #[test]
    fn node_handle_round_trips_index() {
        let handle = NodeHandle::from_index(42);
        assert_eq!(handle.index(), 42);
        assert_eq!(handle.to_string(), "#42");
    }

    #[test]
    fn clash_test_id_displays_with_prefix() {
        assert_eq!(ClashTestId::new(3).to_string(), "clash-test-3");
    }
}
