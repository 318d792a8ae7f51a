//! Aggregation folds over matched rows.

use chrono::{Datelike, NaiveDate};
use fitbase_core::date::{parse_cell_day, parse_cell_instant};
use fitbase_core::{
    AggregationOperator, AggregationResult, AggregationResultType, AggregationValue, ColumnKind,
    KindTag, Row,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Compute each requested aggregation of `column` over `rows`.
pub fn aggregate(
    rows: &[Row],
    column: &str,
    kind: &ColumnKind,
    aggregations: &[AggregationOperator],
) -> AggregationResult {
    let total = rows.len() as u64;
    let filled: Vec<&Value> = rows
        .iter()
        .filter_map(|row| row.get(column))
        .filter(|v| !is_blank(v))
        .collect();
    let filled_count = filled.len() as u64;
    let unique_count = filled
        .iter()
        .map(|v| v.to_string())
        .collect::<HashSet<_>>()
        .len() as u64;

    let tally = |op: AggregationOperator| match op {
        AggregationOperator::Empty | AggregationOperator::PercentEmpty => total - filled_count,
        AggregationOperator::Unique | AggregationOperator::PercentUnique => unique_count,
        _ => filled_count,
    };

    let mut result = AggregationResult::new();
    for &op in aggregations {
        let value = match op.result_type() {
            AggregationResultType::Count => AggregationValue::Count(tally(op)),
            AggregationResultType::Percent => percent(tally(op), total),
            AggregationResultType::Histogram => AggregationValue::Histogram(histogram(&filled)),
            AggregationResultType::Number => match kind.tag() {
                KindTag::Date | KindTag::AutoDate => date_statistic(op, &filled),
                _ => number_statistic(op, &numbers(&filled)),
            },
        };
        result.insert(op, value);
    }
    result
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Percentage in `[0, 100]`; null when there are no rows.
fn percent(part: u64, total: u64) -> AggregationValue {
    if total == 0 {
        return AggregationValue::Number(None);
    }
    AggregationValue::Number(Some(part as f64 * 100.0 / total as f64))
}

fn histogram(values: &[&Value]) -> BTreeMap<String, u64> {
    let mut buckets = BTreeMap::new();
    for value in values {
        let label = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        *buckets.entry(label).or_insert(0) += 1;
    }
    buckets
}

fn numbers(values: &[&Value]) -> Vec<f64> {
    values.iter().filter_map(|v| v.as_f64()).collect()
}

fn number_statistic(op: AggregationOperator, values: &[f64]) -> AggregationValue {
    if values.is_empty() {
        return AggregationValue::Number(None);
    }
    let n = values.len() as f64;
    let sum: f64 = values.iter().sum();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let value = match op {
        AggregationOperator::Sum => sum,
        AggregationOperator::Average => sum / n,
        AggregationOperator::Min => min,
        AggregationOperator::Max => max,
        AggregationOperator::Range => max - min,
        AggregationOperator::Median => {
            let mut sorted = values.to_vec();
            sorted.sort_by(f64::total_cmp);
            let mid = sorted.len() / 2;
            if sorted.len() % 2 == 0 {
                (sorted[mid - 1] + sorted[mid]) / 2.0
            } else {
                sorted[mid]
            }
        }
        AggregationOperator::StandardDeviation => {
            let mean = sum / n;
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            variance.sqrt()
        }
        _ => return AggregationValue::Number(None),
    };
    AggregationValue::Number(Some(value))
}

/// `min`/`max` as epoch milliseconds, ranges in whole days or months.
fn date_statistic(op: AggregationOperator, values: &[&Value]) -> AggregationValue {
    let cells: Vec<&str> = values.iter().filter_map(|v| v.as_str()).collect();
    match op {
        AggregationOperator::Min | AggregationOperator::Max => {
            let instants = cells.iter().filter_map(|s| parse_cell_instant(s));
            let pick = if op == AggregationOperator::Min {
                instants.min()
            } else {
                instants.max()
            };
            AggregationValue::Number(pick.map(|ts| ts.timestamp_millis() as f64))
        }
        AggregationOperator::DaysRange | AggregationOperator::MonthRange => {
            let days: Vec<NaiveDate> = cells.iter().filter_map(|s| parse_cell_day(s)).collect();
            let (Some(first), Some(last)) = (days.iter().min(), days.iter().max()) else {
                return AggregationValue::Number(None);
            };
            let span = if op == AggregationOperator::DaysRange {
                (*last - *first).num_days() as f64
            } else {
                let months = |d: &NaiveDate| i64::from(d.year()) * 12 + i64::from(d.month0());
                (months(last) - months(first)) as f64
            };
            AggregationValue::Number(Some(span))
        }
        _ => AggregationValue::Number(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(values: &[Value]) -> Vec<Row> {
        values
            .iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn test_number_statistics() {
        let data = rows(&[
            json!({"weight": 80.0}),
            json!({"weight": 78.5}),
            json!({"weight": 79.0}),
            json!({}),
        ]);
        let result = aggregate(
            &data,
            "weight",
            &ColumnKind::Number,
            &[
                AggregationOperator::Sum,
                AggregationOperator::Median,
                AggregationOperator::Range,
                AggregationOperator::Empty,
                AggregationOperator::PercentFilled,
            ],
        );
        assert_eq!(result[&AggregationOperator::Sum], AggregationValue::Number(Some(237.5)));
        assert_eq!(result[&AggregationOperator::Median], AggregationValue::Number(Some(79.0)));
        assert_eq!(result[&AggregationOperator::Range], AggregationValue::Number(Some(1.5)));
        assert_eq!(result[&AggregationOperator::Empty], AggregationValue::Count(1));
        assert_eq!(
            result[&AggregationOperator::PercentFilled],
            AggregationValue::Number(Some(75.0))
        );
    }

    #[test]
    fn test_empty_input_yields_nulls_and_zero_counts() {
        let result = aggregate(
            &[],
            "weight",
            &ColumnKind::Number,
            &[
                AggregationOperator::Average,
                AggregationOperator::Filled,
                AggregationOperator::PercentEmpty,
            ],
        );
        assert_eq!(result[&AggregationOperator::Average], AggregationValue::Number(None));
        assert_eq!(result[&AggregationOperator::Filled], AggregationValue::Count(0));
        assert_eq!(result[&AggregationOperator::PercentEmpty], AggregationValue::Number(None));
    }

    #[test]
    fn test_date_ranges() {
        let data = rows(&[
            json!({"date": "2024-01-30"}),
            json!({"date": "2024-03-02"}),
        ]);
        let result = aggregate(
            &data,
            "date",
            &ColumnKind::Date,
            &[
                AggregationOperator::DaysRange,
                AggregationOperator::MonthRange,
                AggregationOperator::Min,
            ],
        );
        assert_eq!(result[&AggregationOperator::DaysRange], AggregationValue::Number(Some(32.0)));
        assert_eq!(result[&AggregationOperator::MonthRange], AggregationValue::Number(Some(2.0)));
        assert_eq!(
            result[&AggregationOperator::Min],
            AggregationValue::Number(Some(1_706_572_800_000.0))
        );
    }

    #[test]
    fn test_histogram_counts_distinct_values() {
        let data = rows(&[json!({"reps": 10}), json!({"reps": 12}), json!({"reps": 10})]);
        let result = aggregate(&data, "reps", &ColumnKind::Number, &[AggregationOperator::Histogram]);
        let AggregationValue::Histogram(buckets) = &result[&AggregationOperator::Histogram] else {
            panic!("expected histogram");
        };
        assert_eq!(buckets.get("10"), Some(&2));
        assert_eq!(buckets.get("12"), Some(&1));
    }

    #[test]
    fn test_each_value_matches_operator_result_type() {
        let data = rows(&[json!({"weight": 80}), json!({"weight": 78}), json!({})]);
        let result = aggregate(&data, "weight", &ColumnKind::Number, &AggregationOperator::ALL);
        for (op, value) in &result {
            let matches = match (op.result_type(), value) {
                (AggregationResultType::Count, AggregationValue::Count(_)) => true,
                (AggregationResultType::Histogram, AggregationValue::Histogram(_)) => true,
                (
                    AggregationResultType::Percent | AggregationResultType::Number,
                    AggregationValue::Number(_),
                ) => true,
                _ => false,
            };
            assert!(matches, "{} produced {:?}", op, value);
        }
        assert_eq!(result[&AggregationOperator::Unique], AggregationValue::Count(2));
        assert_eq!(
            result[&AggregationOperator::PercentUnique],
            AggregationValue::Number(Some(200.0 / 3.0))
        );
    }
}
