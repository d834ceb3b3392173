// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};

/// Typed property value as exposed by the host document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum VariantValue {
    None,
    DisplayString(String),
    Identifier(String),
    Boolean(bool),
    Int32(i32),
    Double(f64),
    Length(f64),
    Area(f64),
    Volume(f64),
    DateTime(String),
    NamedConstant { name: String, display: String },
}

impl VariantValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::DisplayString(_) => "display_string",
            Self::Identifier(_) => "identifier",
            Self::Boolean(_) => "boolean",
            Self::Int32(_) => "int32",
            Self::Double(_) => "double",
            Self::Length(_) => "length",
            Self::Area(_) => "area",
            Self::Volume(_) => "volume",
            Self::DateTime(_) => "date_time",
            Self::NamedConstant { .. } => "named_constant",
        }
    }

    /// Human-readable rendering used for matching and histograms.
    pub fn display(&self) -> String {
        match self {
            Self::None => String::new(),
            Self::DisplayString(value) | Self::Identifier(value) | Self::DateTime(value) => {
                value.clone()
            }
            Self::Boolean(value) => {
                if *value {
                    "Yes".to_owned()
                } else {
                    "No".to_owned()
                }
            }
            Self::Int32(value) => value.to_string(),
            Self::Double(value) | Self::Length(value) | Self::Area(value) | Self::Volume(value) => {
                format_number(*value)
            }
            Self::NamedConstant { display, name } => {
                if display.is_empty() {
                    name.clone()
                } else {
                    display.clone()
                }
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::None => serde_json::Value::Null,
            Self::Boolean(value) => serde_json::Value::Bool(*value),
            Self::Int32(value) => serde_json::Value::from(*value),
            Self::Double(value) | Self::Length(value) | Self::Area(value) | Self::Volume(value) => {
                serde_json::Number::from_f64(*value)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null)
            }
            other => serde_json::Value::String(other.display()),
        }
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        let text = format!("{value:.6}");
        text.trim_end_matches('0').trim_end_matches('.').to_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataProperty {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    pub value: VariantValue,
}

impl DataProperty {
    pub fn new(name: impl Into<String>, value: VariantValue) -> Self {
        let name = name.into();
        Self { display_name: name.clone(), name, value }
    }

    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.display_name.eq_ignore_ascii_case(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyCategory {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub properties: Vec<DataProperty>,
}

impl PropertyCategory {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self { display_name: name.clone(), name, properties: Vec::new() }
    }

    pub fn with(mut self, name: impl Into<String>, value: VariantValue) -> Self {
        self.properties.push(DataProperty::new(name, value));
        self
    }

    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }

    /// Name match against either the internal or the display name, ignoring case.
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.display_name.eq_ignore_ascii_case(name)
    }
}
