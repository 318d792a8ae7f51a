//! fitbase Test Utilities
//!
//! Fixtures, proptest generators and the in-memory data service shared by
//! the crates' test suites.

use std::sync::Arc;

pub use fitbase_storage::MockDataService;

pub use fitbase_core::{
    AggregationOperator, ColumnDeclaration, ColumnKind, CompiledSchema, FilterOperator, Row,
    TableDeclaration,
};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Strategies for schema and row values.

    use chrono::NaiveDate;
    use fitbase_core::tables::{CARDIO_EXERCISE_OPTIONS, STRENGTH_EXERCISE_OPTIONS};
    use fitbase_core::{AggregationOperator, ColumnKind, FilterOperator};
    use proptest::prelude::*;

    pub fn arb_column_kind() -> impl Strategy<Value = ColumnKind> {
        prop_oneof![
            Just(ColumnKind::Text),
            Just(ColumnKind::Number),
            Just(ColumnKind::Date),
            Just(ColumnKind::Checkbox),
            Just(ColumnKind::AutoNumber),
            Just(ColumnKind::AutoDate),
            Just(ColumnKind::Attachment),
            Just(ColumnKind::SingleSelect {
                options: vec!["Low".to_string(), "High".to_string()],
            }),
            Just(ColumnKind::Link {
                linked_to: "goals".to_string(),
            }),
        ]
    }

    pub fn arb_filter_operator() -> impl Strategy<Value = FilterOperator> {
        prop::sample::select(FilterOperator::ALL.to_vec())
    }

    pub fn arb_aggregation_operator() -> impl Strategy<Value = AggregationOperator> {
        prop::sample::select(AggregationOperator::ALL.to_vec())
    }

    /// Days within 2020..2030.
    pub fn arb_day() -> impl Strategy<Value = NaiveDate> {
        (2020i32..2030, 1u32..=12, 1u32..=28)
            .prop_filter_map("valid date", |(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
    }

    /// ISO day string as stored in date columns.
    pub fn arb_iso_day() -> impl Strategy<Value = String> {
        arb_day().prop_map(|d| d.format("%Y-%m-%d").to_string())
    }

    pub fn arb_body_weight() -> impl Strategy<Value = f64> {
        (400u32..1500).prop_map(|tenths| f64::from(tenths) / 10.0)
    }

    pub fn arb_strength_exercise() -> impl Strategy<Value = &'static str> {
        prop::sample::select(STRENGTH_EXERCISE_OPTIONS.to_vec())
    }

    pub fn arb_cardio_exercise() -> impl Strategy<Value = &'static str> {
        prop::sample::select(CARDIO_EXERCISE_OPTIONS.to_vec())
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Ready-made schema, service and rows.

    use super::*;
    use chrono::NaiveDate;
    use fitbase_core::tables::fitness_schema;
    use serde_json::{json, Value};

    /// The fitness schema, compiled.
    pub fn schema() -> Arc<CompiledSchema> {
        match fitness_schema() {
            Ok(schema) => Arc::new(schema),
            Err(e) => panic!("fitness schema must compile: {}", e),
        }
    }

    /// Fixed "today" so relative date operands are deterministic.
    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap_or_default()
    }

    /// Empty in-memory service over the fitness schema.
    pub fn mock_service() -> MockDataService {
        MockDataService::new(schema()).with_today(today())
    }

    /// Convert a JSON object literal into a row.
    pub fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            other => panic!("row fixture must be an object, got {}", other),
        }
    }

    pub fn weight_input(date: &str, weight: f64) -> Value {
        json!({ "date": date, "weight": weight })
    }

    pub fn calorie_input(date: &str, total_calories: f64) -> Value {
        json!({
            "date": date,
            "timeOfDay": "Lunch",
            "mealName": "Chicken bowl",
            "mealIngredient": "chicken",
            "quantity": 250,
            "unit": "1 g ≈ 0.035 oz",
            "totalCalories": total_calories,
            "totalProtein": 30,
            "totalCarbs": 40,
            "totalFats": 10
        })
    }

    pub fn cardio_input(duration: f64, distance: f64) -> Value {
        json!({
            "exercise": "Running",
            "duration": duration,
            "distance": distance,
            "date": "2024-03-10"
        })
    }
}
