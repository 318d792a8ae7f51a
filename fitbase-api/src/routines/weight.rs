//! Body weight log.

use fitbase_core::tables::WEIGHT;
use fitbase_core::{
    AggregationOperator, AggregationResult, Direction, FilterOperator, FitResult, RecordId, Row,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{delete_by_id, find_by_id, number, row_of, set_if, update_by_id, WeightStats};
use crate::facade::QueryBuilder;

const COLUMNS: [&str; 6] = ["id", "date", "weight", "name", "createdAt", "updatedAt"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewWeightRecord {
    pub date: String,
    pub weight: f64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WeightRecordUpdate {
    pub id: RecordId,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Inclusive day range.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WeightAggregation {
    pub aggregations: Vec<AggregationOperator>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// Every record, newest first.
pub async fn get_all(query: &QueryBuilder) -> FitResult<Vec<Row>> {
    query
        .select_from(WEIGHT)
        .select(&COLUMNS)
        .order_by("date", Direction::Desc)
        .execute()
        .await
}

pub async fn get_by_id(query: &QueryBuilder, id: RecordId) -> FitResult<Row> {
    find_by_id(query, WEIGHT, &COLUMNS, id).await
}

/// Records between two days inclusive, oldest first.
pub async fn get_by_date_range(query: &QueryBuilder, range: &DateRange) -> FitResult<Vec<Row>> {
    query
        .select_from(WEIGHT)
        .select(&COLUMNS)
        .filter("date", FilterOperator::Gte, json!(["exactDay", range.start_date]))
        .filter("date", FilterOperator::Lte, json!(["exactDay", range.end_date]))
        .order_by("date", Direction::Asc)
        .execute()
        .await
}

pub async fn create(query: &QueryBuilder, input: NewWeightRecord) -> FitResult<Row> {
    let row = row_of([
        ("date", Value::from(input.date)),
        ("weight", Value::from(input.weight)),
        ("name", Value::from(input.name.unwrap_or_default())),
    ]);
    query.insert_into(WEIGHT).values(row).execute_take_first().await
}

pub async fn update(query: &QueryBuilder, input: WeightRecordUpdate) -> FitResult<u64> {
    let mut set = Row::new();
    set_if(&mut set, "date", input.date);
    set_if(&mut set, "weight", input.weight);
    set_if(&mut set, "name", input.name);
    update_by_id(query, WEIGHT, input.id, set).await
}

pub async fn delete(query: &QueryBuilder, id: RecordId) -> FitResult<u64> {
    delete_by_id(query, WEIGHT, id).await
}

pub async fn delete_multiple(query: &QueryBuilder, ids: &[RecordId]) -> FitResult<u64> {
    if ids.is_empty() {
        return Ok(0);
    }
    query
        .delete_from(WEIGHT)
        .filter("id", FilterOperator::HasAnyOf, ids.to_vec())
        .execute()
        .await
}

/// Count, average, minimum and maximum over every recorded weight.
pub async fn stats(query: &QueryBuilder) -> FitResult<WeightStats> {
    let rows = query.select_from(WEIGHT).select(&["weight"]).execute().await?;
    Ok(WeightStats::from_weights(
        rows.iter().filter_map(|row| number(row, "weight")),
    ))
}

/// Service-side aggregations of the weight column, optionally bounded by
/// start and end days.
pub async fn aggregate(
    query: &QueryBuilder,
    input: &WeightAggregation,
) -> FitResult<AggregationResult> {
    let mut request = query
        .aggregate_from(WEIGHT)
        .aggregate("weight", &input.aggregations);
    if let Some(start) = &input.start_date {
        request = request.filter("date", FilterOperator::Gte, json!(["exactDay", start]));
    }
    if let Some(end) = &input.end_date {
        request = request.filter("date", FilterOperator::Lte, json!(["exactDay", end]));
    }
    request.execute().await
}
