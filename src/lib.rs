// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Nvx: a JSON-RPC and MCP bridge over a hosted CAD document.
//!
//! Requests are routed by [`rpc::RpcRouter`], executed against the [`model::Document`] through a
//! [`backend::DocumentBackend`] (the host thread when available, direct access otherwise) and
//! answered with a uniform [`rpc::RpcResponse`] envelope.

pub mod backend;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod mcp;
pub mod model;
pub mod query;
pub mod rpc;
pub mod store;
