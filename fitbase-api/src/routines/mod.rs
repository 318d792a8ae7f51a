//! Fitness routines over the query facade
//!
//! One module per user table. Each routine takes typed input, builds facade
//! requests and returns rows, counts or derived values. The derived
//! computations (weight statistics, nutrient totals, cardio speed) live here
//! as pure functions so they can be tested without a service.

pub mod calories;
pub mod cardio;
pub mod goals;
pub mod settings;
pub mod strength;
pub mod weight;

use fitbase_core::{FitError, FitResult, RecordId, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::facade::QueryBuilder;

// ============================================================================
// DERIVED VALUES
// ============================================================================

/// Summary of recorded body weights.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightStats {
    pub count: u64,
    pub average: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl WeightStats {
    /// Statistics over the given weights. All three are null when empty.
    pub fn from_weights(weights: impl IntoIterator<Item = f64>) -> Self {
        let mut stats = WeightStats::default();
        let mut sum = 0.0;
        for weight in weights {
            stats.count += 1;
            sum += weight;
            stats.min = Some(stats.min.map_or(weight, |m| m.min(weight)));
            stats.max = Some(stats.max.map_or(weight, |m| m.max(weight)));
        }
        if stats.count > 0 {
            stats.average = Some(sum / stats.count as f64);
        }
        stats
    }
}

/// Nutrient sums for one day. Missing cells count as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionTotals {
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fats: f64,
}

impl NutritionTotals {
    pub fn from_rows(rows: &[Row]) -> Self {
        rows.iter().fold(Self::default(), |acc, row| Self {
            total_calories: acc.total_calories + number(row, "totalCalories").unwrap_or(0.0),
            total_protein: acc.total_protein + number(row, "totalProtein").unwrap_or(0.0),
            total_carbs: acc.total_carbs + number(row, "totalCarbs").unwrap_or(0.0),
            total_fats: acc.total_fats + number(row, "totalFats").unwrap_or(0.0),
        })
    }
}

/// Average speed in distance units per hour for a duration in minutes.
///
/// `None` when the duration is not positive.
pub fn cardio_speed(distance: f64, duration_minutes: f64) -> Option<f64> {
    (duration_minutes > 0.0).then(|| distance / (duration_minutes / 60.0))
}

// ============================================================================
// SHARED HELPERS
// ============================================================================

pub(crate) fn number(row: &Row, column: &str) -> Option<f64> {
    row.get(column).and_then(Value::as_f64)
}

/// Build a row from column/value pairs.
pub(crate) fn row_of<'k>(pairs: impl IntoIterator<Item = (&'k str, Value)>) -> Row {
    pairs
        .into_iter()
        .map(|(column, value)| (column.to_string(), value))
        .collect()
}

/// Add `value` under `column` only when it is present.
pub(crate) fn set_if(row: &mut Row, column: &str, value: Option<impl Into<Value>>) {
    if let Some(value) = value {
        row.insert(column.to_string(), value.into());
    }
}

/// A single-select cell holds a list of labels.
pub(crate) fn label(value: &str) -> Value {
    Value::Array(vec![Value::String(value.to_string())])
}

/// Fetch one row by id, projected onto `columns`.
pub(crate) async fn find_by_id(
    query: &QueryBuilder,
    table: &str,
    columns: &[&str],
    id: RecordId,
) -> FitResult<Row> {
    query
        .select_from(table)
        .select(columns)
        .filter_eq("id", id)
        .execute_take_first()
        .await?
        .ok_or_else(|| FitError::NotFound {
            table: table.to_string(),
            id,
        })
}

pub(crate) async fn update_by_id(
    query: &QueryBuilder,
    table: &str,
    id: RecordId,
    set: Row,
) -> FitResult<u64> {
    query.update(table).set(set).filter_eq("id", id).execute().await
}

pub(crate) async fn delete_by_id(query: &QueryBuilder, table: &str, id: RecordId) -> FitResult<u64> {
    query.delete_from(table).filter_eq("id", id).execute().await
}
