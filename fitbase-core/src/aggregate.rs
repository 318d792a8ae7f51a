//! Aggregation operator grammar

use crate::column::ColumnKind;
use crate::error::ValidationError;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Summary statistic over a column across matched rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregationOperator {
    Sum,
    Average,
    Median,
    Min,
    Max,
    Range,
    StandardDeviation,
    Histogram,
    Empty,
    Filled,
    Unique,
    PercentEmpty,
    PercentFilled,
    PercentUnique,
    DaysRange,
    MonthRange,
}

/// Type of value an aggregation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregationResultType {
    Count,
    Percent,
    /// Nullable number; null when there is nothing to aggregate
    Number,
    Histogram,
}

impl AggregationOperator {
    pub const ALL: [AggregationOperator; 16] = [
        AggregationOperator::Sum,
        AggregationOperator::Average,
        AggregationOperator::Median,
        AggregationOperator::Min,
        AggregationOperator::Max,
        AggregationOperator::Range,
        AggregationOperator::StandardDeviation,
        AggregationOperator::Histogram,
        AggregationOperator::Empty,
        AggregationOperator::Filled,
        AggregationOperator::Unique,
        AggregationOperator::PercentEmpty,
        AggregationOperator::PercentFilled,
        AggregationOperator::PercentUnique,
        AggregationOperator::DaysRange,
        AggregationOperator::MonthRange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationOperator::Sum => "sum",
            AggregationOperator::Average => "average",
            AggregationOperator::Median => "median",
            AggregationOperator::Min => "min",
            AggregationOperator::Max => "max",
            AggregationOperator::Range => "range",
            AggregationOperator::StandardDeviation => "standardDeviation",
            AggregationOperator::Histogram => "histogram",
            AggregationOperator::Empty => "empty",
            AggregationOperator::Filled => "filled",
            AggregationOperator::Unique => "unique",
            AggregationOperator::PercentEmpty => "percentEmpty",
            AggregationOperator::PercentFilled => "percentFilled",
            AggregationOperator::PercentUnique => "percentUnique",
            AggregationOperator::DaysRange => "daysRange",
            AggregationOperator::MonthRange => "monthRange",
        }
    }

    pub fn result_type(&self) -> AggregationResultType {
        match self {
            AggregationOperator::Empty
            | AggregationOperator::Filled
            | AggregationOperator::Unique => AggregationResultType::Count,
            AggregationOperator::PercentEmpty
            | AggregationOperator::PercentFilled
            | AggregationOperator::PercentUnique => AggregationResultType::Percent,
            AggregationOperator::Histogram => AggregationResultType::Histogram,
            _ => AggregationResultType::Number,
        }
    }
}

impl fmt::Display for AggregationOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AggregationOperator::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("Unknown aggregation: {}", s))
    }
}

/// Value produced by one aggregation.
///
/// The wire form carries no tag; decode with [`AggregationValue::decode`],
/// which reads the shape from the operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AggregationValue {
    Count(u64),
    Number(Option<f64>),
    Histogram(BTreeMap<String, u64>),
}

impl AggregationValue {
    /// Decode the wire value of `op`.
    pub fn decode(op: AggregationOperator, value: Value) -> Result<Self, String> {
        match (op.result_type(), value) {
            (AggregationResultType::Count, Value::Number(n)) => n
                .as_u64()
                .map(AggregationValue::Count)
                .ok_or_else(|| format!("{} must be a non-negative integer, got {}", op, n)),
            (AggregationResultType::Percent | AggregationResultType::Number, Value::Null) => {
                Ok(AggregationValue::Number(None))
            }
            (AggregationResultType::Percent | AggregationResultType::Number, Value::Number(n)) => {
                Ok(AggregationValue::Number(n.as_f64()))
            }
            (AggregationResultType::Histogram, Value::Object(buckets)) => buckets
                .into_iter()
                .map(|(label, count)| match count.as_u64() {
                    Some(count) => Ok((label, count)),
                    None => Err(format!("{} bucket '{}' is not a count: {}", op, label, count)),
                })
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(AggregationValue::Histogram),
            (_, other) => Err(format!("unexpected {} value: {}", op, other)),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AggregationValue::Count(n) => Some(*n as f64),
            AggregationValue::Number(n) => *n,
            AggregationValue::Histogram(_) => None,
        }
    }
}

/// Aggregation results keyed by operator.
pub type AggregationResult = BTreeMap<AggregationOperator, AggregationValue>;

/// Deserialize an [`AggregationResult`], each value decoded by its operator.
pub fn deserialize_result<'de, D>(deserializer: D) -> Result<AggregationResult, D::Error>
where
    D: Deserializer<'de>,
{
    BTreeMap::<AggregationOperator, Value>::deserialize(deserializer)?
        .into_iter()
        .map(|(op, value)| {
            AggregationValue::decode(op, value)
                .map(|decoded| (op, decoded))
                .map_err(de::Error::custom)
        })
        .collect()
}

/// Check that `aggregation` is legal for `kind`.
pub fn validate_aggregation(
    column: &str,
    kind: &ColumnKind,
    aggregation: AggregationOperator,
) -> Result<(), ValidationError> {
    if kind.descriptor().aggregations.contains(&aggregation) {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedAggregation {
            column: column.to_string(),
            kind: kind.tag(),
            aggregation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_supports_statistics() {
        for op in [
            AggregationOperator::Sum,
            AggregationOperator::Median,
            AggregationOperator::StandardDeviation,
            AggregationOperator::Histogram,
            AggregationOperator::PercentUnique,
        ] {
            assert!(validate_aggregation("weight", &ColumnKind::Number, op).is_ok());
        }
        assert!(validate_aggregation("weight", &ColumnKind::Number, AggregationOperator::DaysRange).is_err());
    }

    #[test]
    fn test_date_supports_ranges_but_not_sum() {
        assert!(validate_aggregation("date", &ColumnKind::Date, AggregationOperator::MonthRange).is_ok());
        assert!(validate_aggregation("date", &ColumnKind::AutoDate, AggregationOperator::Min).is_ok());
        assert!(matches!(
            validate_aggregation("date", &ColumnKind::Date, AggregationOperator::Sum),
            Err(ValidationError::UnsupportedAggregation { .. })
        ));
    }

    #[test]
    fn test_link_supports_only_emptiness_counts() {
        let kind = ColumnKind::Link {
            linked_to: "goals".to_string(),
        };
        assert!(validate_aggregation("goal", &kind, AggregationOperator::Filled).is_ok());
        assert!(validate_aggregation("goal", &kind, AggregationOperator::PercentEmpty).is_ok());
        assert!(validate_aggregation("goal", &kind, AggregationOperator::Unique).is_err());
        assert!(validate_aggregation("goal", &kind, AggregationOperator::Max).is_err());
    }

    #[test]
    fn test_result_serialization() {
        let mut result = AggregationResult::new();
        result.insert(AggregationOperator::Filled, AggregationValue::Count(2));
        result.insert(AggregationOperator::Max, AggregationValue::Number(None));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value, json!({"max": null, "filled": 2}));

        let back = deserialize_result(value).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_integer_statistics_decode_as_numbers() {
        let result =
            deserialize_result(json!({"sum": 80, "min": 78, "filled": 2, "percentFilled": 100}))
                .unwrap();
        assert_eq!(result[&AggregationOperator::Sum], AggregationValue::Number(Some(80.0)));
        assert_eq!(result[&AggregationOperator::Min], AggregationValue::Number(Some(78.0)));
        assert_eq!(result[&AggregationOperator::Filled], AggregationValue::Count(2));
        assert_eq!(
            result[&AggregationOperator::PercentFilled],
            AggregationValue::Number(Some(100.0))
        );
    }

    #[test]
    fn test_decode_checks_shape_against_operator() {
        let histogram =
            AggregationValue::decode(AggregationOperator::Histogram, json!({"Running": 3})).unwrap();
        assert_eq!(
            histogram,
            AggregationValue::Histogram(BTreeMap::from([("Running".to_string(), 3)]))
        );

        assert!(AggregationValue::decode(AggregationOperator::Filled, json!(null)).is_err());
        assert!(AggregationValue::decode(AggregationOperator::Unique, json!(1.5)).is_err());
        assert!(AggregationValue::decode(AggregationOperator::Sum, json!("80")).is_err());
        assert!(AggregationValue::decode(AggregationOperator::Histogram, json!({"a": -1})).is_err());
        assert!(deserialize_result(json!({"average": [1]})).is_err());
    }
}
