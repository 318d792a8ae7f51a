//! Strength training log.

use fitbase_core::tables::STRENGTH;
use fitbase_core::{Direction, FitResult, RecordId, Row};
use serde::Deserialize;
use serde_json::Value;

use super::{delete_by_id, find_by_id, label, row_of, set_if, update_by_id};
use crate::facade::QueryBuilder;

const COLUMNS: [&str; 6] = ["id", "date", "exercise", "reps", "weight", "name"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewStrengthWorkout {
    pub exercise: String,
    pub reps: f64,
    pub weight: f64,
    pub date: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StrengthWorkoutUpdate {
    pub id: RecordId,
    #[serde(default)]
    pub reps: Option<f64>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub exercise: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Workouts newest first, optionally only those for one exercise.
pub async fn get_all(query: &QueryBuilder, exercise: Option<&str>) -> FitResult<Vec<Row>> {
    let mut request = query
        .select_from(STRENGTH)
        .select(&COLUMNS)
        .order_by("date", Direction::Desc);
    if let Some(exercise) = exercise {
        request = request.filter_eq("exercise", exercise);
    }
    request.execute().await
}

pub async fn get_by_id(query: &QueryBuilder, id: RecordId) -> FitResult<Row> {
    find_by_id(query, STRENGTH, &COLUMNS, id).await
}

pub async fn create(query: &QueryBuilder, input: NewStrengthWorkout) -> FitResult<Row> {
    let row = row_of([
        ("exercise", label(&input.exercise)),
        ("reps", Value::from(input.reps)),
        ("weight", Value::from(input.weight)),
        ("date", Value::from(input.date)),
        ("name", Value::from(input.name.unwrap_or_default())),
    ]);
    query.insert_into(STRENGTH).values(row).execute_take_first().await
}

pub async fn update(query: &QueryBuilder, input: StrengthWorkoutUpdate) -> FitResult<u64> {
    let mut set = Row::new();
    set_if(&mut set, "reps", input.reps);
    set_if(&mut set, "weight", input.weight);
    set_if(&mut set, "exercise", input.exercise.as_deref().map(label));
    set_if(&mut set, "date", input.date);
    set_if(&mut set, "name", input.name);
    update_by_id(query, STRENGTH, input.id, set).await
}

pub async fn delete(query: &QueryBuilder, id: RecordId) -> FitResult<u64> {
    delete_by_id(query, STRENGTH, id).await
}
