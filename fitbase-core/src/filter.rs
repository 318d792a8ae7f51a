//! Filter operator grammar
//!
//! Every column kind owns a table mapping operator to the operand it expects
//! (see [`crate::column::KindDescriptor`]). A single routine,
//! [`validate_filter`], checks any `(column, operator, operand)` clause
//! against that table.

use crate::column::ColumnKind;
use crate::date::{kind_name, DateOperand, WithinOperand};
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Filter operator, serialized with its wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "caseEqual")]
    CaseEqual,
    #[serde(rename = "hasAnyOf")]
    HasAnyOf,
    #[serde(rename = "hasAllOf")]
    HasAllOf,
    #[serde(rename = "isExactly")]
    IsExactly,
    #[serde(rename = "hasNoneOf")]
    HasNoneOf,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "doesNotContain")]
    DoesNotContain,
    #[serde(rename = "startsWith")]
    StartsWith,
    #[serde(rename = "endsWith")]
    EndsWith,
    #[serde(rename = "isWithin", alias = "isWithIn")]
    IsWithin,
    #[serde(rename = "isEmpty")]
    IsEmpty,
    #[serde(rename = "isNotEmpty")]
    IsNotEmpty,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 18] = [
        FilterOperator::Eq,
        FilterOperator::Ne,
        FilterOperator::Gt,
        FilterOperator::Gte,
        FilterOperator::Lt,
        FilterOperator::Lte,
        FilterOperator::CaseEqual,
        FilterOperator::HasAnyOf,
        FilterOperator::HasAllOf,
        FilterOperator::IsExactly,
        FilterOperator::HasNoneOf,
        FilterOperator::Contains,
        FilterOperator::DoesNotContain,
        FilterOperator::StartsWith,
        FilterOperator::EndsWith,
        FilterOperator::IsWithin,
        FilterOperator::IsEmpty,
        FilterOperator::IsNotEmpty,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::Ne => "!=",
            FilterOperator::Gt => ">",
            FilterOperator::Gte => ">=",
            FilterOperator::Lt => "<",
            FilterOperator::Lte => "<=",
            FilterOperator::CaseEqual => "caseEqual",
            FilterOperator::HasAnyOf => "hasAnyOf",
            FilterOperator::HasAllOf => "hasAllOf",
            FilterOperator::IsExactly => "isExactly",
            FilterOperator::HasNoneOf => "hasNoneOf",
            FilterOperator::Contains => "contains",
            FilterOperator::DoesNotContain => "doesNotContain",
            FilterOperator::StartsWith => "startsWith",
            FilterOperator::EndsWith => "endsWith",
            FilterOperator::IsWithin => "isWithin",
            FilterOperator::IsEmpty => "isEmpty",
            FilterOperator::IsNotEmpty => "isNotEmpty",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "isWithIn" {
            return Ok(FilterOperator::IsWithin);
        }
        FilterOperator::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("Unknown filter operator: {}", s))
    }
}

/// Shape of the operand an operator expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperandType {
    /// Zero-operand operators (`isEmpty`, `isNotEmpty`)
    None,
    Text,
    TextList,
    Number,
    NumberList,
    /// Checkbox state, as a boolean or 0/1
    Flag,
    /// One label from the column's option list
    SelectOption,
    SelectOptionList,
    /// Linked record id
    Id,
    IdList,
    Date,
    DateWithin,
}

impl fmt::Display for OperandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            OperandType::None => "no operand",
            OperandType::Text => "text",
            OperandType::TextList => "a list of text",
            OperandType::Number => "a number",
            OperandType::NumberList => "a list of numbers",
            OperandType::Flag => "a checkbox flag",
            OperandType::SelectOption => "a select option",
            OperandType::SelectOptionList => "a list of select options",
            OperandType::Id => "a record id",
            OperandType::IdList => "a list of record ids",
            OperandType::Date => "a date",
            OperandType::DateWithin => "a date period",
        };
        f.write_str(value)
    }
}

/// One `(column, operator, operand)` predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    pub column: String,
    pub operator: FilterOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operand: Option<Value>,
}

impl FilterClause {
    pub fn new(column: impl Into<String>, operator: FilterOperator, operand: Value) -> Self {
        Self {
            column: column.into(),
            operator,
            operand: Some(operand),
        }
    }

    /// Clause for a zero-operand operator.
    pub fn unary(column: impl Into<String>, operator: FilterOperator) -> Self {
        Self {
            column: column.into(),
            operator,
            operand: None,
        }
    }

    pub fn eq(column: impl Into<String>, operand: Value) -> Self {
        Self::new(column, FilterOperator::Eq, operand)
    }

    /// Operand with `null` normalised to absent.
    pub fn operand(&self) -> Option<&Value> {
        self.operand.as_ref().filter(|v| !v.is_null())
    }
}

/// Check that `operator` is legal for `kind` and that `operand` has the
/// expected shape.
pub fn validate_filter(
    column: &str,
    kind: &ColumnKind,
    operator: FilterOperator,
    operand: Option<&Value>,
) -> Result<(), ValidationError> {
    let expected = kind
        .descriptor()
        .operand_for(operator)
        .ok_or_else(|| ValidationError::InvalidOperator {
            column: column.to_string(),
            kind: kind.tag(),
            operator: operator.to_string(),
        })?;

    let operand = operand.filter(|v| !v.is_null());
    match (expected, operand) {
        (OperandType::None, None) => Ok(()),
        (OperandType::None, Some(_)) => Err(ValidationError::UnexpectedOperand {
            column: column.to_string(),
            operator,
        }),
        (_, None) => Err(ValidationError::MissingOperand {
            column: column.to_string(),
            operator,
        }),
        (expected, Some(value)) => check_operand(expected, kind, value).map_err(|reason| {
            ValidationError::OperandTypeMismatch {
                column: column.to_string(),
                operator,
                expected,
                reason,
            }
        }),
    }
}

fn check_operand(expected: OperandType, kind: &ColumnKind, value: &Value) -> Result<(), String> {
    match expected {
        OperandType::None => Ok(()),
        OperandType::Text => expect_string(value).map(|_| ()),
        OperandType::TextList => each(value, |v| expect_string(v).map(|_| ())),
        OperandType::Number => expect_number(value),
        OperandType::NumberList => each(value, expect_number),
        OperandType::Flag => match value {
            Value::Bool(_) => Ok(()),
            Value::Number(n) if n.as_u64() == Some(0) || n.as_u64() == Some(1) => Ok(()),
            other => Err(format!("expected true/false or 0/1, got {}", other)),
        },
        OperandType::SelectOption => expect_option(kind, value),
        OperandType::SelectOptionList => each(value, |v| expect_option(kind, v)),
        OperandType::Id => expect_id(value),
        OperandType::IdList => each(value, expect_id),
        OperandType::Date => DateOperand::parse(value).map(|_| ()),
        OperandType::DateWithin => WithinOperand::parse(value).map(|_| ()),
    }
}

fn each(value: &Value, check: impl Fn(&Value) -> Result<(), String>) -> Result<(), String> {
    let items = value
        .as_array()
        .ok_or_else(|| format!("expected an array, got {}", kind_name(value)))?;
    items.iter().try_for_each(check)
}

fn expect_string(value: &Value) -> Result<&str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("expected a string, got {}", kind_name(value)))
}

fn expect_number(value: &Value) -> Result<(), String> {
    match value.as_f64() {
        Some(n) if n.is_finite() => Ok(()),
        _ => Err(format!("expected a number, got {}", kind_name(value))),
    }
}

fn expect_id(value: &Value) -> Result<(), String> {
    value
        .as_i64()
        .filter(|id| *id >= 0)
        .map(|_| ())
        .ok_or_else(|| format!("expected a record id, got {}", value))
}

fn expect_option(kind: &ColumnKind, value: &Value) -> Result<(), String> {
    let label = expect_string(value)?;
    match kind.options() {
        Some(options) if options.iter().any(|o| o == label) => Ok(()),
        Some(_) => Err(format!("{} is not one of the column's options", label)),
        None => Err("column has no options".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn select() -> ColumnKind {
        ColumnKind::SingleSelect {
            options: vec!["Running".to_string(), "Cycling".to_string()],
        }
    }

    #[test]
    fn test_operator_wire_names_roundtrip() {
        for op in FilterOperator::ALL {
            assert_eq!(op.as_str().parse::<FilterOperator>(), Ok(op));
        }
        assert_eq!("isWithIn".parse::<FilterOperator>(), Ok(FilterOperator::IsWithin));
        assert!("like".parse::<FilterOperator>().is_err());
    }

    #[test]
    fn test_text_has_any_of_requires_list() {
        let result = validate_filter("name", &ColumnKind::Text, FilterOperator::HasAnyOf, Some(&json!("a")));
        assert!(matches!(
            result,
            Err(ValidationError::OperandTypeMismatch { expected: OperandType::TextList, .. })
        ));
        assert!(validate_filter(
            "name",
            &ColumnKind::Text,
            FilterOperator::HasAnyOf,
            Some(&json!(["a", "b"]))
        )
        .is_ok());
    }

    #[test]
    fn test_zero_operand_operators_are_distinct_errors() {
        assert!(validate_filter("name", &ColumnKind::Text, FilterOperator::IsEmpty, None).is_ok());
        assert!(validate_filter(
            "name",
            &ColumnKind::Text,
            FilterOperator::IsEmpty,
            Some(&Value::Null)
        )
        .is_ok());
        assert!(matches!(
            validate_filter("name", &ColumnKind::Text, FilterOperator::IsEmpty, Some(&json!("x"))),
            Err(ValidationError::UnexpectedOperand { .. })
        ));
        assert!(matches!(
            validate_filter("name", &ColumnKind::Text, FilterOperator::Eq, None),
            Err(ValidationError::MissingOperand { .. })
        ));
    }

    #[test]
    fn test_operator_outside_kind_table_is_invalid() {
        assert!(matches!(
            validate_filter("weight", &ColumnKind::Number, FilterOperator::Contains, Some(&json!("8"))),
            Err(ValidationError::InvalidOperator { .. })
        ));
        assert!(matches!(
            validate_filter("done", &ColumnKind::Checkbox, FilterOperator::Ne, Some(&json!(true))),
            Err(ValidationError::InvalidOperator { .. })
        ));
    }

    #[test]
    fn test_select_operands_must_be_declared_options() {
        let kind = select();
        assert!(validate_filter("exercise", &kind, FilterOperator::Eq, Some(&json!("Running"))).is_ok());
        assert!(validate_filter("exercise", &kind, FilterOperator::Eq, Some(&json!("Rowing"))).is_err());
        assert!(validate_filter(
            "exercise",
            &kind,
            FilterOperator::HasNoneOf,
            Some(&json!(["Running", "Cycling"]))
        )
        .is_ok());
        assert!(validate_filter("exercise", &kind, FilterOperator::Contains, Some(&json!("Run"))).is_ok());
    }

    #[test]
    fn test_date_operands() {
        let kind = ColumnKind::Date;
        assert!(validate_filter("date", &kind, FilterOperator::Gte, Some(&json!(["exactDay", "2024-01-01"]))).is_ok());
        assert!(validate_filter("date", &kind, FilterOperator::Lt, Some(&json!("pastWeek"))).is_err());
        assert!(validate_filter("date", &kind, FilterOperator::IsWithin, Some(&json!("pastWeek"))).is_ok());
        assert!(validate_filter("date", &kind, FilterOperator::IsWithin, Some(&json!(["hoursAgo", 1]))).is_err());
    }

    #[test]
    fn test_checkbox_flag_operand() {
        let kind = ColumnKind::Checkbox;
        assert!(validate_filter("done", &kind, FilterOperator::Eq, Some(&json!(1))).is_ok());
        assert!(validate_filter("done", &kind, FilterOperator::Eq, Some(&json!(false))).is_ok());
        assert!(validate_filter("done", &kind, FilterOperator::Eq, Some(&json!(2))).is_err());
    }

    #[test]
    fn test_clause_serializes_with_wire_operator() {
        let clause = FilterClause::new("id", FilterOperator::HasAnyOf, json!([1, 2]));
        let value = serde_json::to_value(&clause).unwrap();
        assert_eq!(value, json!({"column": "id", "operator": "hasAnyOf", "operand": [1, 2]}));

        let unary: FilterClause =
            serde_json::from_value(json!({"column": "date", "operator": "isNotEmpty"})).unwrap();
        assert_eq!(unary.operand(), None);
    }
}
