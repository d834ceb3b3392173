// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Error mapping around handler bodies.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::dispatch::panic_message;
use crate::error::ServiceError;

use super::envelope::{ErrorCode, RpcResponse};

/// Turns service errors and panics into envelope failures so nothing escapes to the transport.
pub async fn wrap<T, Fut>(handler: Fut) -> RpcResponse<T>
where
    Fut: Future<Output = Result<RpcResponse<T>, ServiceError>>,
{
    match AssertUnwindSafe(handler).catch_unwind().await {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            let code = err.code();
            tracing::warn!(code = %code, error = %err, "handler failed");
            RpcResponse::failure(code, err.to_string())
        }
        Err(payload) => {
            let message = panic_message(payload);
            tracing::error!(panic = %message, "handler panicked");
            RpcResponse::failure(ErrorCode::Unexpected, format!("handler panicked: {message}"))
        }
    }
}
