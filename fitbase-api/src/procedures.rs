//! Named procedures over the fitness routines
//!
//! A transport hands [`Database::call`] a dotted procedure name and a JSON
//! input. The input is decoded into the routine's typed arguments before any
//! request is built; the result comes back as JSON. Update and delete
//! procedures answer `{"affected": n}`.

use chrono::{SecondsFormat, Utc};
use fitbase_core::RecordId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::database::Database;
use crate::error::{ApiError, ApiResult};
use crate::routines::{calories, cardio, goals, settings, strength, weight};

/// Every procedure [`Database::call`] accepts.
pub const PROCEDURES: &[&str] = &[
    "hello",
    "weight.getAll",
    "weight.getById",
    "weight.getByDateRange",
    "weight.create",
    "weight.update",
    "weight.delete",
    "weight.deleteMultiple",
    "weight.getStats",
    "weight.aggregate",
    "goals.getAll",
    "goals.getById",
    "goals.create",
    "goals.update",
    "goals.delete",
    "strength.getAll",
    "strength.getById",
    "strength.create",
    "strength.update",
    "strength.delete",
    "cardio.getAll",
    "cardio.getById",
    "cardio.create",
    "cardio.update",
    "cardio.delete",
    "calories.getByTimeOfDay",
    "calories.getById",
    "calories.getTotalForDate",
    "calories.create",
    "calories.update",
    "calories.delete",
    "settings.getByName",
    "settings.create",
    "settings.update",
    "settings.delete",
];

// ============================================================================
// INPUT TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IdInput {
    id: RecordId,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IdsInput {
    ids: Vec<RecordId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct HelloInput {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExerciseInput {
    #[serde(default)]
    exercise: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct TimeOfDayInput {
    time_of_day: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DateInput {
    date: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NameInput {
    name: String,
}

#[derive(Debug, Serialize)]
struct Greeting {
    message: String,
    timestamp: String,
    /// Seconds since the handle was initialized
    uptime: f64,
}

fn parse<T: DeserializeOwned>(procedure: &str, input: Value) -> ApiResult<T> {
    serde_json::from_value(input)
        .map_err(|e| ApiError::invalid_input(format!("{}: {}", procedure, e)))
}

/// Like [`parse`], with `null` standing for an empty input.
fn parse_or_default<T: DeserializeOwned + Default>(procedure: &str, input: Value) -> ApiResult<T> {
    if input.is_null() {
        return Ok(T::default());
    }
    parse(procedure, input)
}

fn reply(value: impl Serialize) -> ApiResult<Value> {
    Ok(serde_json::to_value(value)?)
}

fn affected(count: u64) -> ApiResult<Value> {
    Ok(json!({ "affected": count }))
}

// ============================================================================
// DISPATCH
// ============================================================================

impl Database {
    /// Run one procedure by name.
    pub async fn call(&self, procedure: &str, input: Value) -> ApiResult<Value> {
        debug!(procedure, "Calling procedure");
        let result = self.route(procedure, input).await;
        if let Err(e) = &result {
            warn!(procedure, code = %e.code, error = %e.message, "Procedure failed");
        }
        result
    }

    async fn route(&self, procedure: &str, input: Value) -> ApiResult<Value> {
        let q = self.query();
        let p = procedure;
        match procedure {
            "hello" => {
                let input: HelloInput = parse_or_default(p, input)?;
                reply(Greeting {
                    message: format!("Hello {}!", input.name.as_deref().unwrap_or("World")),
                    timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                    uptime: self.uptime().as_secs_f64(),
                })
            }

            "weight.getAll" => reply(weight::get_all(q).await?),
            "weight.getById" => {
                let input: IdInput = parse(p, input)?;
                reply(weight::get_by_id(q, input.id).await?)
            }
            "weight.getByDateRange" => {
                let input: weight::DateRange = parse(p, input)?;
                reply(weight::get_by_date_range(q, &input).await?)
            }
            "weight.create" => reply(weight::create(q, parse(p, input)?).await?),
            "weight.update" => affected(weight::update(q, parse(p, input)?).await?),
            "weight.delete" => {
                let input: IdInput = parse(p, input)?;
                affected(weight::delete(q, input.id).await?)
            }
            "weight.deleteMultiple" => {
                let input: IdsInput = parse(p, input)?;
                affected(weight::delete_multiple(q, &input.ids).await?)
            }
            "weight.getStats" => reply(weight::stats(q).await?),
            "weight.aggregate" => {
                let input: weight::WeightAggregation = parse(p, input)?;
                reply(weight::aggregate(q, &input).await?)
            }

            "goals.getAll" => reply(goals::get_all(q).await?),
            "goals.getById" => {
                let input: IdInput = parse(p, input)?;
                reply(goals::get_by_id(q, input.id).await?)
            }
            "goals.create" => reply(goals::create(q, parse(p, input)?).await?),
            "goals.update" => affected(goals::update(q, parse(p, input)?).await?),
            "goals.delete" => {
                let input: IdInput = parse(p, input)?;
                affected(goals::delete(q, input.id).await?)
            }

            "strength.getAll" => {
                let input: ExerciseInput = parse_or_default(p, input)?;
                reply(strength::get_all(q, input.exercise.as_deref()).await?)
            }
            "strength.getById" => {
                let input: IdInput = parse(p, input)?;
                reply(strength::get_by_id(q, input.id).await?)
            }
            "strength.create" => reply(strength::create(q, parse(p, input)?).await?),
            "strength.update" => affected(strength::update(q, parse(p, input)?).await?),
            "strength.delete" => {
                let input: IdInput = parse(p, input)?;
                affected(strength::delete(q, input.id).await?)
            }

            "cardio.getAll" => reply(cardio::get_all(q).await?),
            "cardio.getById" => {
                let input: IdInput = parse(p, input)?;
                reply(cardio::get_by_id(q, input.id).await?)
            }
            "cardio.create" => reply(cardio::create(q, parse(p, input)?).await?),
            "cardio.update" => affected(cardio::update(q, parse(p, input)?).await?),
            "cardio.delete" => {
                let input: IdInput = parse(p, input)?;
                affected(cardio::delete(q, input.id).await?)
            }

            "calories.getByTimeOfDay" => {
                let input: TimeOfDayInput = parse(p, input)?;
                reply(calories::get_by_time_of_day(q, &input.time_of_day).await?)
            }
            "calories.getById" => {
                let input: IdInput = parse(p, input)?;
                reply(calories::get_by_id(q, input.id).await?)
            }
            "calories.getTotalForDate" => {
                let input: DateInput = parse(p, input)?;
                reply(calories::total_for_date(q, &input.date).await?)
            }
            "calories.create" => reply(calories::create(q, parse(p, input)?).await?),
            "calories.update" => affected(calories::update(q, parse(p, input)?).await?),
            "calories.delete" => {
                let input: IdInput = parse(p, input)?;
                affected(calories::delete(q, input.id).await?)
            }

            "settings.getByName" => {
                let input: NameInput = parse(p, input)?;
                reply(settings::get_by_name(q, &input.name).await?)
            }
            "settings.create" => reply(settings::create(q, parse(p, input)?).await?),
            "settings.update" => affected(settings::update(q, parse(p, input)?).await?),
            "settings.delete" => {
                let input: IdInput = parse(p, input)?;
                affected(settings::delete(q, input.id).await?)
            }

            other => Err(ApiError::unknown_procedure(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use fitbase_core::tables::{fitness_schema, fitness_tables};
    use fitbase_storage::MockDataService;
    use std::sync::Arc;

    fn database() -> (Database, MockDataService) {
        let mock = MockDataService::new(Arc::new(fitness_schema().unwrap()));
        let db = Database::init(Arc::new(mock.clone()), &fitness_tables()).unwrap();
        (db, mock)
    }

    #[tokio::test]
    async fn test_hello_defaults_to_world() {
        let (db, _) = database();
        let reply = db.call("hello", Value::Null).await.unwrap();
        assert_eq!(reply["message"], json!("Hello World!"));
        assert!(reply["uptime"].as_f64().unwrap() >= 0.0);
        assert!(reply["timestamp"].as_str().unwrap().ends_with('Z'));

        let reply = db.call("hello", json!({"name": "Ada"})).await.unwrap();
        assert_eq!(reply["message"], json!("Hello Ada!"));
    }

    #[tokio::test]
    async fn test_unknown_procedure() {
        let (db, _) = database();
        let err = db.call("posts.getAll", Value::Null).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownProcedure);
    }

    #[tokio::test]
    async fn test_malformed_input_is_not_dispatched() {
        let (db, mock) = database();
        let err = db
            .call("weight.create", json!({"date": "2024-01-01", "weight": "heavy"}))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);

        let err = db
            .call("goals.create", json!({"name": "run", "value": "5k", "colour": "red"}))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_option_label_fails_validation() {
        let (db, mock) = database();
        let err = db
            .call(
                "strength.create",
                json!({"exercise": "Curling", "reps": 5, "weight": 40, "date": "2024-01-01"}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_get_by_id_missing_is_not_found() {
        let (db, _) = database();
        let err = db.call("goals.getById", json!({"id": 42})).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::EntityNotFound);
    }

    #[test]
    fn test_procedure_names_are_unique() {
        let unique: std::collections::HashSet<_> = PROCEDURES.iter().collect();
        assert_eq!(unique.len(), PROCEDURES.len());
    }
}
