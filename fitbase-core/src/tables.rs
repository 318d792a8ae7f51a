//! Fitness-tracker database declaration
//!
//! The three internal tables back select, attachment and collaborator
//! columns; the remaining tables hold the user's data.

use crate::column::ColumnDeclaration;
use crate::error::SchemaError;
use crate::schema::{CompiledSchema, TableDeclaration};

pub const CALORIES_TIME_OF_DAY_OPTIONS: [&str; 5] =
    ["Breakfast", "Lunch", "Dinner", "Supper", "Snack"];

pub const CALORIES_UNIT_OPTIONS: [&str; 10] = [
    "1 tsp = 5 mL ≈ 0.17 fl oz",
    "1 tbsp = 15 mL ≈ 0.5 fl oz",
    "1 cup = 240 mL = 8 fl oz",
    "1 fl oz ≈ 29.57 mL",
    "1 mL ≈ 0.034 fl oz",
    "1 L ≈ 33.814 fl oz",
    "1 g ≈ 0.035 oz",
    "1 oz ≈ 28.35 g",
    "1 kg ≈ 2.205 lb",
    "1 lb ≈ 453.59 g",
];

pub const STRENGTH_EXERCISE_OPTIONS: [&str; 11] = [
    "Push-ups",
    "Pull-ups",
    "Pistol Squat",
    "Deadlifts",
    "Bench Press",
    "Sit-ups",
    "Lunges",
    "Squats",
    "Cable Pull-downs",
    "Diamond Push-ups",
    "Biceps Curls",
];

pub const CARDIO_EXERCISE_OPTIONS: [&str; 3] = ["Running", "Cycling", "Swimming"];

pub const SELECT_TABLE: &str = "selectTable";
pub const COLLABORATORS_TABLE: &str = "collaboratorsTable";
pub const CALORIES: &str = "calories";
pub const STRENGTH: &str = "strength";
pub const CARDIO: &str = "cardio";
pub const WEIGHT: &str = "weight";
pub const GOALS: &str = "goals";
pub const SETTINGS: &str = "settings";

/// Every user table starts with an id and the two bookkeeping timestamps.
fn user_table(name: &str) -> TableDeclaration {
    TableDeclaration::new(name)
        .column(ColumnDeclaration::auto_number("id"))
        .column(ColumnDeclaration::auto_date("createdAt"))
        .column(ColumnDeclaration::auto_date("updatedAt"))
}

pub fn fitness_tables() -> Vec<TableDeclaration> {
    vec![
        TableDeclaration::internal(SELECT_TABLE)
            .column(ColumnDeclaration::auto_number("id"))
            .column(ColumnDeclaration::text("name").required())
            .column(ColumnDeclaration::text("color").required()),
        TableDeclaration::internal(crate::column::ATTACHMENT_TABLE)
            .column(ColumnDeclaration::auto_number("id"))
            .column(ColumnDeclaration::text("name").required())
            .column(ColumnDeclaration::text("metadata").required())
            .column(ColumnDeclaration::number("size").required())
            .column(ColumnDeclaration::text("fileType").required())
            .column(ColumnDeclaration::text("url").required()),
        TableDeclaration::internal(COLLABORATORS_TABLE)
            .column(ColumnDeclaration::auto_number("id"))
            .column(ColumnDeclaration::text("name").required())
            .column(ColumnDeclaration::text("emailAddress").required())
            .column(ColumnDeclaration::text("avatar").required()),
        user_table(CALORIES)
            .column(ColumnDeclaration::date("date"))
            .column(ColumnDeclaration::single_select(
                "timeOfDay",
                &CALORIES_TIME_OF_DAY_OPTIONS,
            ))
            .column(ColumnDeclaration::number("proteinPer100G"))
            .column(ColumnDeclaration::number("carbsPer100G"))
            .column(ColumnDeclaration::number("fatsPer100G"))
            .column(ColumnDeclaration::number("totalCalories"))
            .column(ColumnDeclaration::number("totalCarbs"))
            .column(ColumnDeclaration::number("totalFats"))
            .column(ColumnDeclaration::number("totalProtein"))
            .column(ColumnDeclaration::text("mealName"))
            .column(ColumnDeclaration::text("name"))
            .column(ColumnDeclaration::text("mealIngredient"))
            .column(ColumnDeclaration::number("quantity"))
            .column(ColumnDeclaration::single_select("unit", &CALORIES_UNIT_OPTIONS))
            .column(ColumnDeclaration::number("quantityInGramsmL"))
            .column(ColumnDeclaration::number("quantityInFlOzozlb")),
        user_table(STRENGTH)
            .column(ColumnDeclaration::number("reps"))
            .column(ColumnDeclaration::number("weight"))
            .column(ColumnDeclaration::date("date"))
            .column(ColumnDeclaration::text("name"))
            .column(ColumnDeclaration::single_select(
                "exercise",
                &STRENGTH_EXERCISE_OPTIONS,
            )),
        user_table(CARDIO)
            .column(ColumnDeclaration::date("date"))
            .column(ColumnDeclaration::number("duration"))
            .column(ColumnDeclaration::number("distance"))
            .column(ColumnDeclaration::single_select(
                "exercise",
                &CARDIO_EXERCISE_OPTIONS,
            ))
            .column(ColumnDeclaration::text("name"))
            .column(ColumnDeclaration::number("speed")),
        user_table(WEIGHT)
            .column(ColumnDeclaration::date("date"))
            .column(ColumnDeclaration::number("weight"))
            .column(ColumnDeclaration::text("name")),
        user_table(GOALS)
            .column(ColumnDeclaration::text("name"))
            .column(ColumnDeclaration::text("value"))
            .column(ColumnDeclaration::text("description")),
        user_table(SETTINGS)
            .column(ColumnDeclaration::text("name"))
            .column(ColumnDeclaration::text("value"))
            .column(ColumnDeclaration::text("description")),
    ]
}

pub fn fitness_schema() -> Result<CompiledSchema, SchemaError> {
    CompiledSchema::compile(&fitness_tables())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnKind;

    #[test]
    fn test_fitness_schema_compiles() {
        let schema = fitness_schema().unwrap();
        assert_eq!(schema.tables().count(), 9);
        assert_eq!(schema.tables().filter(|t| t.is_internal()).count(), 3);
    }

    #[test]
    fn test_user_tables_have_bookkeeping_columns() {
        let schema = fitness_schema().unwrap();
        for name in [CALORIES, STRENGTH, CARDIO, WEIGHT, GOALS, SETTINGS] {
            let table = schema.queryable_table(name).unwrap();
            assert_eq!(table.column("id").unwrap().kind, ColumnKind::AutoNumber);
            assert_eq!(table.column("createdAt").unwrap().kind, ColumnKind::AutoDate);
            assert_eq!(table.shapes().mandatory_insert_columns().count(), 0);
        }
    }

    #[test]
    fn test_cardio_exercise_options() {
        let schema = fitness_schema().unwrap();
        let exercise = schema.table(CARDIO).unwrap().column("exercise").unwrap();
        assert_eq!(
            exercise.kind.options().unwrap(),
            &["Running", "Cycling", "Swimming"]
        );
    }
}
