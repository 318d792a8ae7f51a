//! Named user settings.

use fitbase_core::tables::SETTINGS;
use fitbase_core::{FitResult, RecordId, Row};
use serde::Deserialize;
use serde_json::Value;

use super::{delete_by_id, row_of, set_if, update_by_id};
use crate::facade::QueryBuilder;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewSetting {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Only the value and description of a setting change; its name is fixed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SettingUpdate {
    pub id: RecordId,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Every setting stored under `name`. Text equality ignores case.
pub async fn get_by_name(query: &QueryBuilder, name: &str) -> FitResult<Vec<Row>> {
    query.select_from(SETTINGS).filter_eq("name", name).execute().await
}

pub async fn create(query: &QueryBuilder, input: NewSetting) -> FitResult<Row> {
    let row = row_of([
        ("name", Value::from(input.name)),
        ("value", Value::from(input.value)),
        ("description", Value::from(input.description.unwrap_or_default())),
    ]);
    query.insert_into(SETTINGS).values(row).execute_take_first().await
}

pub async fn update(query: &QueryBuilder, input: SettingUpdate) -> FitResult<u64> {
    let mut set = Row::new();
    set_if(&mut set, "value", input.value);
    set_if(&mut set, "description", input.description);
    update_by_id(query, SETTINGS, input.id, set).await
}

pub async fn delete(query: &QueryBuilder, id: RecordId) -> FitResult<u64> {
    delete_by_id(query, SETTINGS, id).await
}
