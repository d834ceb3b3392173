// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! JSON-RPC surface: envelope, router, handlers, manifest and HTTP routes.

pub mod envelope;
pub mod handlers;
pub mod http;
pub mod manifest;
pub mod middleware;
pub mod router;

pub use envelope::{ErrorCode, Meta, RpcError, RpcRequest, RpcResponse};
pub use handlers::{build_router, HandlerContext, DEFAULT_REQUEST_TIMEOUT};
pub use manifest::Manifest;
pub use router::{MethodInfo, RpcRouter};
