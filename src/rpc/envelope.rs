// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Request and response envelope shared by every RPC method.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ErrorCode {
    #[serde(rename = "NVX_BAD_REQUEST")]
    BadRequest,
    #[serde(rename = "NVX_NOT_FOUND")]
    NotFound,
    #[serde(rename = "NVX_INVALID_ARG")]
    InvalidArg,
    #[serde(rename = "NVX_TIMEOUT")]
    Timeout,
    #[serde(rename = "NVX_CANCELED")]
    Canceled,
    #[serde(rename = "NVX_UNEXPECTED")]
    Unexpected,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BadRequest => "NVX_BAD_REQUEST",
            Self::NotFound => "NVX_NOT_FOUND",
            Self::InvalidArg => "NVX_INVALID_ARG",
            Self::Timeout => "NVX_TIMEOUT",
            Self::Canceled => "NVX_CANCELED",
            Self::Unexpected => "NVX_UNEXPECTED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Incoming call. `id` may be sent as a string or a number; it is echoed back as a string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(default, deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Value,
}

impl RpcRequest {
    pub fn new(id: impl Into<String>, method: impl Into<String>, params: Value) -> Self {
        Self { id: id.into(), method: Some(method.into()), params }
    }
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(id) => id,
        other => other.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RpcError {
    pub code: ErrorCode,
    pub msg: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Meta {
    pub request_id: String,
    pub query_ms: u64,
    pub server_version: String,
    pub model_revision: Option<u64>,
}

/// `ok=false` always carries an error; `ok=true` never does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RpcResponse<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<RpcError>,
    pub meta: Meta,
}

impl<T> RpcResponse<T> {
    pub fn success(data: T) -> Self {
        Self { ok: true, data: Some(data), error: None, meta: Meta::default() }
    }

    pub fn failure(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(RpcError { code, msg: msg.into() }),
            meta: Meta::default(),
        }
    }

    pub fn with_revision(mut self, revision: u64) -> Self {
        self.meta.model_revision = Some(revision);
        self
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|error| error.code)
    }
}

impl<T: Serialize> RpcResponse<T> {
    /// Erases the payload type so every handler can share one signature.
    pub fn into_value(self) -> RpcResponse<Value> {
        let RpcResponse { ok, data, error, meta } = self;
        match data.map(serde_json::to_value).transpose() {
            Ok(data) => RpcResponse { ok, data, error, meta },
            Err(err) => RpcResponse {
                meta,
                ..RpcResponse::failure(
                    ErrorCode::Unexpected,
                    format!("serialization failed: {err}"),
                )
            },
        }
    }
}
