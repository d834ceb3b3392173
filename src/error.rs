// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::time::Duration;

use thiserror::Error;

use crate::backend::BackendError;
use crate::model::HostError;
use crate::rpc::ErrorCode;

/// Failure of a document operation, mapped onto the envelope error taxonomy by [`Self::code`].
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("no active document")]
    NoActiveDocument,
    #[error("operation timed out after {} ms", .0.as_millis())]
    Timeout(Duration),
    #[error("operation canceled")]
    Canceled,
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Host(#[from] HostError),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ServiceError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Timeout(_) => ErrorCode::Timeout,
            Self::InvalidArgument(_) => ErrorCode::InvalidArg,
            Self::Canceled => ErrorCode::Canceled,
            Self::NoActiveDocument | Self::Backend(_) | Self::Host(_) | Self::Serialization(_) => {
                ErrorCode::Unexpected
            }
        }
    }
}
