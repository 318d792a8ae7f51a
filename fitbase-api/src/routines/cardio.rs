//! Cardio log with derived speed.
//!
//! Speed is kept as `distance / (duration / 60)` with duration in minutes.
//! An update touching either input re-reads the stored counterpart first;
//! two concurrent updates can therefore race and the last write wins.

use fitbase_core::tables::CARDIO;
use fitbase_core::{Direction, FitResult, RecordId, Row};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{cardio_speed, delete_by_id, find_by_id, label, number, row_of, set_if, update_by_id};
use crate::facade::QueryBuilder;

const COLUMNS: [&str; 7] = ["id", "date", "exercise", "duration", "distance", "speed", "name"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCardioExercise {
    pub exercise: String,
    /// Minutes
    pub duration: f64,
    pub distance: f64,
    pub date: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Computed from distance and duration when absent.
    #[serde(default)]
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CardioExerciseUpdate {
    pub id: RecordId,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub exercise: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Every exercise, newest first.
pub async fn get_all(query: &QueryBuilder) -> FitResult<Vec<Row>> {
    query
        .select_from(CARDIO)
        .select(&COLUMNS)
        .order_by("date", Direction::Desc)
        .execute()
        .await
}

pub async fn get_by_id(query: &QueryBuilder, id: RecordId) -> FitResult<Row> {
    find_by_id(query, CARDIO, &COLUMNS, id).await
}

pub async fn create(query: &QueryBuilder, input: NewCardioExercise) -> FitResult<Row> {
    let mut row = row_of([
        ("exercise", label(&input.exercise)),
        ("duration", Value::from(input.duration)),
        ("distance", Value::from(input.distance)),
        ("date", Value::from(input.date)),
        ("name", Value::from(input.name.unwrap_or_default())),
    ]);
    let speed = input
        .speed
        .or_else(|| cardio_speed(input.distance, input.duration));
    set_if(&mut row, "speed", speed);
    query.insert_into(CARDIO).values(row).execute_take_first().await
}

pub async fn update(query: &QueryBuilder, input: CardioExerciseUpdate) -> FitResult<u64> {
    let mut set = Row::new();
    set_if(&mut set, "duration", input.duration);
    set_if(&mut set, "distance", input.distance);
    set_if(&mut set, "exercise", input.exercise.as_deref().map(label));
    set_if(&mut set, "date", input.date);
    set_if(&mut set, "name", input.name);

    if input.duration.is_some() || input.distance.is_some() {
        let stored = query
            .select_from(CARDIO)
            .select(&["duration", "distance"])
            .filter_eq("id", input.id)
            .execute_take_first()
            .await?;
        if let Some(stored) = stored {
            let duration = input
                .duration
                .or_else(|| number(&stored, "duration"))
                .unwrap_or(0.0);
            let distance = input
                .distance
                .or_else(|| number(&stored, "distance"))
                .unwrap_or(0.0);
            let speed = cardio_speed(distance, duration);
            debug!(id = input.id, duration, distance, speed = ?speed, "Recomputed cardio speed");
            // Null clears a speed the new inputs no longer support.
            set.insert("speed".to_string(), speed.map_or(Value::Null, Value::from));
        }
    }

    update_by_id(query, CARDIO, input.id, set).await
}

pub async fn delete(query: &QueryBuilder, id: RecordId) -> FitResult<u64> {
    delete_by_id(query, CARDIO, id).await
}
