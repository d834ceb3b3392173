// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Document queries behind the RPC methods.
//!
//! Everything here runs against a borrowed [`Document`] on the host thread. Long scans take a
//! [`CancellationToken`] and check it at every visited node.

use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;
use crate::model::Document;

pub mod addressing;
pub mod clash;
pub mod geometry;
pub mod items;
pub mod overview;
pub mod scope;
pub mod selection;
pub mod submodel;

pub(crate) fn checkpoint(cancel: &CancellationToken) -> Result<(), ServiceError> {
    if cancel.is_cancelled() {
        return Err(ServiceError::Canceled);
    }
    Ok(())
}

pub(crate) fn require_active(document: &Document) -> Result<(), ServiceError> {
    if document.is_empty() {
        return Err(ServiceError::NoActiveDocument);
    }
    Ok(())
}
