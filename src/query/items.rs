// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nvx-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nvx and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Property-driven item queries: category counts, property search, per-item property dumps
//! and value distributions.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;
use crate::model::{DataProperty, Document, NodeData, NodeHandle, PropertyCategory};

use super::addressing::{canonical_id, looks_like_canonical_id, resolve_items_by_canonical_ids};
use super::scope::{
    allowed_model_roots_by_model_filter, is_all_scope, passes_model_filter, resolve_scope,
    ScopeAppliedInfo, SCOPE_ALL,
};
use super::submodel::ModelFiles;
use super::{checkpoint, require_active};

pub const DEFAULT_LIST_LIMIT: usize = 200;
pub const DEFAULT_TOP_N: usize = 50;
const CATEGORY_PROPERTY: &str = "Category";

fn default_scope() -> String {
    SCOPE_ALL.to_owned()
}

fn default_list_limit() -> usize {
    DEFAULT_LIST_LIMIT
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

/// Nodes covered by a scope: every live node for `all`, the resolved scope otherwise.
struct ScopedNodes {
    nodes: Vec<NodeHandle>,
    applied: Vec<ScopeAppliedInfo>,
}

fn scoped_nodes(
    document: &Document,
    scope: &str,
    cancel: &CancellationToken,
) -> Result<ScopedNodes, ServiceError> {
    if is_all_scope(scope) {
        let mut nodes = Vec::new();
        for node in document.all_items() {
            checkpoint(cancel)?;
            nodes.push(node);
        }
        return Ok(ScopedNodes { nodes, applied: Vec::new() });
    }
    let resolved = resolve_scope(document, scope, cancel)?;
    Ok(ScopedNodes { nodes: resolved.nodes, applied: resolved.applied })
}

fn require_text(value: &str, field: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::invalid_argument(format!("{field} is required")));
    }
    Ok(())
}

/// A node belongs to a category when its class (display) name or any `Category` property
/// equals it, ignoring case.
pub fn node_matches_category(data: &NodeData, category: &str) -> bool {
    let category = category.trim();
    if data.class_display_name.eq_ignore_ascii_case(category)
        || data.class_name.eq_ignore_ascii_case(category)
    {
        return true;
    }
    data.properties
        .iter()
        .flat_map(|group| group.properties.iter())
        .any(|property| {
            property.matches(CATEGORY_PROPERTY)
                && property.value.display().eq_ignore_ascii_case(category)
        })
}

fn find_property<'a>(
    data: &'a NodeData,
    category_name: Option<&str>,
    property_name: &str,
) -> Option<(&'a PropertyCategory, &'a DataProperty)> {
    data.properties
        .iter()
        .filter(|group| category_name.map_or(true, |name| group.matches(name)))
        .find_map(|group| {
            group
                .properties
                .iter()
                .find(|property| property.matches(property_name))
                .map(|property| (group, property))
        })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CountByCategoryArgs {
    /// Class name, class display name or `Category` property value to count.
    pub category: String,
    #[serde(default = "default_scope")]
    pub scope: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CategoryCountDto {
    pub success: bool,
    pub count: u64,
    pub scope: String,
    pub category: String,
    #[serde(default)]
    pub applied: Vec<ScopeAppliedInfo>,
}

pub fn count_by_category(
    document: &Document,
    args: &CountByCategoryArgs,
    cancel: &CancellationToken,
) -> Result<CategoryCountDto, ServiceError> {
    require_active(document)?;
    require_text(&args.category, "category")?;

    let scoped = scoped_nodes(document, &args.scope, cancel)?;
    let mut count = 0u64;
    for node in &scoped.nodes {
        checkpoint(cancel)?;
        if let Ok(data) = document.node(*node) {
            if node_matches_category(data, &args.category) {
                count += 1;
            }
        }
    }

    let scope = if is_all_scope(&args.scope) { SCOPE_ALL.to_owned() } else { args.scope.clone() };
    Ok(CategoryCountDto {
        success: true,
        count,
        scope,
        category: args.category.clone(),
        applied: scoped.applied,
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Equals,
    Contains,
}

impl MatchMode {
    fn accepts(self, actual: &str, expected: &str) -> bool {
        match self {
            Self::Equals => actual.trim().eq_ignore_ascii_case(expected.trim()),
            Self::Contains => actual.to_lowercase().contains(&expected.trim().to_lowercase()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ListItemsArgs {
    pub property_name: String,
    /// Restricts the search to one property category.
    #[serde(default)]
    pub category_name: Option<String>,
    /// Value filter; omitted means any value.
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default, rename = "match")]
    pub match_mode: MatchMode,
    /// Submodel tokens (file name, display name, extension or canonical id).
    #[serde(default)]
    pub model_filter: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default = "default_list_limit")]
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ItemPropertyDto {
    pub canonical_id: String,
    pub display_name: String,
    pub class_display_name: String,
    pub model_file: String,
    pub category: String,
    pub property: String,
    pub value: String,
    pub value_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ItemListDto {
    pub success: bool,
    pub items: Vec<ItemPropertyDto>,
    pub total_matches: u64,
    pub truncated: bool,
    #[serde(default)]
    pub applied: Vec<ScopeAppliedInfo>,
}

pub fn list_items_to_property(
    document: &Document,
    args: &ListItemsArgs,
    cancel: &CancellationToken,
) -> Result<ItemListDto, ServiceError> {
    require_active(document)?;
    require_text(&args.property_name, "property_name")?;
    if args.limit == 0 {
        return Err(ServiceError::invalid_argument("limit must be at least 1"));
    }

    let scoped = scoped_nodes(document, args.scope.as_deref().unwrap_or(SCOPE_ALL), cancel)?;
    let allowed = args
        .model_filter
        .as_deref()
        .and_then(|filter| allowed_model_roots_by_model_filter(document, filter));
    let category_name = args.category_name.as_deref().filter(|name| !name.trim().is_empty());
    let expected = args.value.as_deref().filter(|value| !value.trim().is_empty());
    let files = ModelFiles::new(document);

    let mut items = Vec::new();
    let mut total_matches = 0u64;
    for node in &scoped.nodes {
        checkpoint(cancel)?;
        if let Some(allowed) = &allowed {
            if !passes_model_filter(document, *node, allowed) {
                continue;
            }
        }
        let Ok(data) = document.node(*node) else {
            continue;
        };
        let Some((group, property)) = find_property(data, category_name, &args.property_name) else {
            continue;
        };
        let value = property.value.display();
        if let Some(expected) = expected {
            if !args.match_mode.accepts(&value, expected) {
                continue;
            }
        }

        total_matches += 1;
        if items.len() < args.limit {
            items.push(ItemPropertyDto {
                canonical_id: canonical_id(document, *node),
                display_name: data.display_name.clone(),
                class_display_name: data.class_display_name.clone(),
                model_file: files.of(document, *node),
                category: group.label().to_owned(),
                property: property.label().to_owned(),
                value,
                value_type: property.value.type_name().to_owned(),
            });
        }
    }

    Ok(ItemListDto {
        success: true,
        truncated: total_matches > items.len() as u64,
        items,
        total_matches,
        applied: scoped.applied,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ItemPropertiesArgs {
    pub canonical_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PropertyDto {
    pub name: String,
    pub display_name: String,
    pub value_type: String,
    pub value: serde_json::Value,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PropertyCategoryDto {
    pub name: String,
    pub display_name: String,
    pub properties: Vec<PropertyDto>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ItemPropertiesDto {
    pub success: bool,
    pub message: String,
    pub canonical_id: String,
    pub display_name: String,
    pub class_name: String,
    pub class_display_name: String,
    pub model_file: String,
    pub categories: Vec<PropertyCategoryDto>,
}

pub fn list_properties_for_item(
    document: &Document,
    args: &ItemPropertiesArgs,
    cancel: &CancellationToken,
) -> Result<ItemPropertiesDto, ServiceError> {
    require_active(document)?;
    require_text(&args.canonical_id, "canonical_id")?;
    let id = args.canonical_id.trim();
    if !looks_like_canonical_id(id) {
        return Ok(ItemPropertiesDto {
            message: format!("'{id}' is not a canonical id"),
            canonical_id: id.to_owned(),
            ..ItemPropertiesDto::default()
        });
    }

    let lookup = resolve_items_by_canonical_ids(document, &[id], cancel)?;
    let Some(node) = lookup.nodes_for(id).first().copied() else {
        return Ok(ItemPropertiesDto {
            message: format!("canonical id '{id}' resolved to no items"),
            canonical_id: id.to_owned(),
            ..ItemPropertiesDto::default()
        });
    };
    let data = document.node(node)?;
    let categories = data
        .properties
        .iter()
        .map(|group| PropertyCategoryDto {
            name: group.name.clone(),
            display_name: group.label().to_owned(),
            properties: group
                .properties
                .iter()
                .map(|property| PropertyDto {
                    name: property.name.clone(),
                    display_name: property.label().to_owned(),
                    value_type: property.value.type_name().to_owned(),
                    value: property.value.to_json(),
                    display: property.value.display(),
                })
                .collect(),
        })
        .collect();

    Ok(ItemPropertiesDto {
        success: true,
        message: String::new(),
        canonical_id: canonical_id(document, node),
        display_name: data.display_name.clone(),
        class_name: data.class_name.clone(),
        class_display_name: data.class_display_name.clone(),
        model_file: ModelFiles::new(document).of(document, node),
        categories,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DistributionArgs {
    pub category_name: String,
    pub property_name: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValueCountDto {
    pub value: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DistributionDto {
    pub success: bool,
    pub category_name: String,
    pub property_name: String,
    pub scope: String,
    pub items_scanned: u64,
    pub items_with_property: u64,
    pub distinct_values: u64,
    /// Most frequent values first; ties ordered by value.
    pub values: Vec<ValueCountDto>,
}

pub fn property_distribution_by_category(
    document: &Document,
    args: &DistributionArgs,
    cancel: &CancellationToken,
) -> Result<DistributionDto, ServiceError> {
    require_active(document)?;
    require_text(&args.category_name, "category_name")?;
    require_text(&args.property_name, "property_name")?;

    let scoped = scoped_nodes(document, &args.scope, cancel)?;
    let mut histogram: BTreeMap<String, u64> = BTreeMap::new();
    let mut items_scanned = 0u64;
    let mut items_with_property = 0u64;
    for node in &scoped.nodes {
        checkpoint(cancel)?;
        let Ok(data) = document.node(*node) else {
            continue;
        };
        items_scanned += 1;
        if let Some((_, property)) =
            find_property(data, Some(&args.category_name), &args.property_name)
        {
            items_with_property += 1;
            *histogram.entry(property.value.display()).or_default() += 1;
        }
    }

    let distinct_values = histogram.len() as u64;
    let mut values: Vec<ValueCountDto> =
        histogram.into_iter().map(|(value, count)| ValueCountDto { value, count }).collect();
    values.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    values.truncate(args.top_n);

    let scope = if is_all_scope(&args.scope) { SCOPE_ALL.to_owned() } else { args.scope.clone() };
    Ok(DistributionDto {
        success: true,
        category_name: args.category_name.clone(),
        property_name: args.property_name.clone(),
        scope,
        items_scanned,
        items_with_property,
        distinct_values,
        values,
    })
}
