//! Fitness goals.

use fitbase_core::tables::GOALS;
use fitbase_core::{FitResult, RecordId, Row};
use serde::Deserialize;
use serde_json::Value;

use super::{delete_by_id, find_by_id, row_of, set_if, update_by_id};
use crate::facade::QueryBuilder;

const COLUMNS: [&str; 6] = ["id", "name", "value", "description", "createdAt", "updatedAt"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewGoal {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GoalUpdate {
    pub id: RecordId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Every goal in service order.
pub async fn get_all(query: &QueryBuilder) -> FitResult<Vec<Row>> {
    query.select_from(GOALS).select(&COLUMNS).execute().await
}

pub async fn get_by_id(query: &QueryBuilder, id: RecordId) -> FitResult<Row> {
    find_by_id(query, GOALS, &COLUMNS, id).await
}

pub async fn create(query: &QueryBuilder, input: NewGoal) -> FitResult<Row> {
    let row = row_of([
        ("name", Value::from(input.name)),
        ("value", Value::from(input.value)),
        ("description", Value::from(input.description.unwrap_or_default())),
    ]);
    query.insert_into(GOALS).values(row).execute_take_first().await
}

pub async fn update(query: &QueryBuilder, input: GoalUpdate) -> FitResult<u64> {
    let mut set = Row::new();
    set_if(&mut set, "name", input.name);
    set_if(&mut set, "value", input.value);
    set_if(&mut set, "description", input.description);
    update_by_id(query, GOALS, input.id, set).await
}

pub async fn delete(query: &QueryBuilder, id: RecordId) -> FitResult<u64> {
    delete_by_id(query, GOALS, id).await
}
