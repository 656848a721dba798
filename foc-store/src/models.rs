//! Serializable view structs handed to rendering layers. These are plain
//! data with no framework types so any frontend (or the CLI) can consume
//! them.

use chrono::{DateTime, Utc};
use foc_model::crop::FilterKind;
use foc_model::operation::CategoryId;
use serde::Serialize;

/// One leaf row of the rendered sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRow {
    pub name: String,
    pub cost_per_ha: f64,
    pub total_cost: f64,
}

/// A category row together with its sub-operation rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryView {
    pub id: CategoryId,
    pub name: String,
    pub cost_per_ha: f64,
    pub total_cost: f64,
    pub sub_operations: Vec<SheetRow>,
}

/// The whole sheet as currently displayed: the active view selection, the
/// hectare basis it resolves to, and every row's figures for that view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetView {
    pub template_id: String,
    pub template_name: String,
    pub is_editable: bool,
    pub crop: String,
    pub filter: FilterKind,
    pub sub_filters: Vec<String>,
    pub effective_hectares: f64,
    pub categories: Vec<CategoryView>,
    pub total_average_cost: f64,
    pub total_cost: f64,
}

/// One line of the template picker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: String,
    pub name: String,
    pub is_default: bool,
    pub is_editable: bool,
    pub is_selected: bool,
    pub combination_count: usize,
    pub assignment_count: usize,
    pub updated_at: DateTime<Utc>,
}

/// One line of the unsaved-changes panel, with names resolved for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLogRow {
    pub crop: String,
    pub category: CategoryId,
    pub operation: String,
    pub previous_cost_per_ha: f64,
    pub recorded_at: DateTime<Utc>,
}
