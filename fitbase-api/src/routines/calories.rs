//! Meal and nutrient log.

use fitbase_core::tables::CALORIES;
use fitbase_core::{FitResult, RecordId, Row};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{delete_by_id, find_by_id, label, row_of, set_if, update_by_id, NutritionTotals};
use crate::facade::QueryBuilder;

const COLUMNS: [&str; 8] = [
    "id",
    "date",
    "timeOfDay",
    "mealName",
    "totalCalories",
    "totalProtein",
    "totalCarbs",
    "totalFats",
];

const TOTAL_COLUMNS: [&str; 4] = ["totalCalories", "totalProtein", "totalCarbs", "totalFats"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewCalorieEntry {
    pub date: String,
    pub time_of_day: String,
    pub meal_name: String,
    pub meal_ingredient: String,
    pub quantity: f64,
    pub unit: String,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fats: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CalorieEntryUpdate {
    pub id: RecordId,
    #[serde(default)]
    pub total_calories: Option<f64>,
    #[serde(default)]
    pub total_protein: Option<f64>,
    #[serde(default)]
    pub total_carbs: Option<f64>,
    #[serde(default)]
    pub total_fats: Option<f64>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub meal_name: Option<String>,
}

/// Entries logged for one time of day.
pub async fn get_by_time_of_day(query: &QueryBuilder, time_of_day: &str) -> FitResult<Vec<Row>> {
    query
        .select_from(CALORIES)
        .select(&COLUMNS)
        .filter_eq("timeOfDay", time_of_day)
        .execute()
        .await
}

pub async fn get_by_id(query: &QueryBuilder, id: RecordId) -> FitResult<Row> {
    find_by_id(query, CALORIES, &COLUMNS, id).await
}

/// Nutrient sums over every entry on `date`; all zero when there are none.
pub async fn total_for_date(query: &QueryBuilder, date: &str) -> FitResult<NutritionTotals> {
    let rows = query
        .select_from(CALORIES)
        .select(&TOTAL_COLUMNS)
        .filter_eq("date", json!(["exactDay", date]))
        .execute()
        .await?;
    Ok(NutritionTotals::from_rows(&rows))
}

/// Per-100g and converted quantity columns are not derived yet and start at
/// zero.
pub async fn create(query: &QueryBuilder, input: NewCalorieEntry) -> FitResult<Row> {
    let row = row_of([
        ("date", Value::from(input.date)),
        ("timeOfDay", label(&input.time_of_day)),
        ("mealName", Value::from(input.meal_name)),
        ("mealIngredient", Value::from(input.meal_ingredient)),
        ("quantity", Value::from(input.quantity)),
        ("unit", label(&input.unit)),
        ("totalCalories", Value::from(input.total_calories)),
        ("totalProtein", Value::from(input.total_protein)),
        ("totalCarbs", Value::from(input.total_carbs)),
        ("totalFats", Value::from(input.total_fats)),
        ("name", Value::from("")),
        ("proteinPer100G", Value::from(0)),
        ("carbsPer100G", Value::from(0)),
        ("fatsPer100G", Value::from(0)),
        ("quantityInGramsmL", Value::from(0)),
        ("quantityInFlOzozlb", Value::from(0)),
    ]);
    query.insert_into(CALORIES).values(row).execute_take_first().await
}

pub async fn update(query: &QueryBuilder, input: CalorieEntryUpdate) -> FitResult<u64> {
    let mut set = Row::new();
    set_if(&mut set, "totalCalories", input.total_calories);
    set_if(&mut set, "totalProtein", input.total_protein);
    set_if(&mut set, "totalCarbs", input.total_carbs);
    set_if(&mut set, "totalFats", input.total_fats);
    set_if(&mut set, "quantity", input.quantity);
    set_if(&mut set, "mealName", input.meal_name);
    update_by_id(query, CALORIES, input.id, set).await
}

pub async fn delete(query: &QueryBuilder, id: RecordId) -> FitResult<u64> {
    delete_by_id(query, CALORIES, id).await
}
