//! Filter evaluation and row ordering for the in-memory service.

use chrono::NaiveDate;
use fitbase_core::date::{parse_cell_day, parse_cell_instant};
use fitbase_core::{
    ColumnKind, DateOperand, Direction, FilterClause, FilterOperator, KindTag, OrderBy, Row,
    WithinOperand,
};
use serde_json::Value;
use std::cmp::Ordering;

/// Whether `row` satisfies `clause` for a column of `kind`.
///
/// Clauses are assumed to have passed grammar validation; an operand that
/// cannot be interpreted matches nothing.
pub fn matches(row: &Row, clause: &FilterClause, kind: &ColumnKind, today: NaiveDate) -> bool {
    let cell = row.get(&clause.column).filter(|v| !v.is_null());

    match clause.operator {
        FilterOperator::IsEmpty => return is_blank(cell),
        FilterOperator::IsNotEmpty => return !is_blank(cell),
        _ => {}
    }

    let Some(operand) = clause.operand() else {
        return false;
    };

    match kind.tag() {
        KindTag::Text => match_text(cell.and_then(Value::as_str), clause.operator, operand),
        KindTag::Number | KindTag::AutoNumber => {
            match_number(cell.and_then(Value::as_f64), clause.operator, operand)
        }
        KindTag::Date | KindTag::AutoDate => {
            match_date(cell.and_then(Value::as_str), clause.operator, operand, today)
        }
        KindTag::Checkbox => {
            let state = cell.and_then(Value::as_bool).unwrap_or(false);
            clause.operator == FilterOperator::Eq && flag(operand) == Some(state)
        }
        KindTag::SingleSelect => {
            let labels: Vec<String> = cell
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default();
            let wanted: Vec<String> = list(operand)
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect();
            match_set(&labels, &wanted, clause.operator, operand, cell)
        }
        KindTag::Link | KindTag::Attachment => {
            let ids: Vec<i64> = cell.map(linked_ids).unwrap_or_default();
            let wanted: Vec<i64> = list(operand).iter().filter_map(|v| v.as_i64()).collect();
            match_set(&ids, &wanted, clause.operator, operand, cell)
        }
    }
}

fn is_blank(cell: Option<&Value>) -> bool {
    match cell {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

/// Scalar operands become a one-element list.
fn list(operand: &Value) -> Vec<Value> {
    match operand {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn flag(operand: &Value) -> Option<bool> {
    match operand {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_u64().map(|n| n == 1),
        _ => None,
    }
}

/// Ids of linked records, read from `{id}` objects or bare ids.
pub fn linked_ids(cell: &Value) -> Vec<i64> {
    cell.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_i64().or_else(|| item.get("id").and_then(Value::as_i64)))
                .collect()
        })
        .unwrap_or_default()
}

fn match_text(cell: Option<&str>, op: FilterOperator, operand: &Value) -> bool {
    let cell_lower = cell.map(str::to_lowercase);
    let needle = operand.as_str().map(str::to_lowercase);

    match op {
        FilterOperator::CaseEqual => cell.is_some() && cell == operand.as_str(),
        FilterOperator::Eq => cell_lower.is_some() && cell_lower == needle,
        FilterOperator::Ne => cell_lower != needle,
        FilterOperator::HasAnyOf => match &cell_lower {
            Some(value) => list(operand)
                .iter()
                .filter_map(|v| v.as_str())
                .any(|candidate| candidate.to_lowercase() == *value),
            None => false,
        },
        FilterOperator::Contains => match (&cell_lower, &needle) {
            (Some(value), Some(needle)) => value.contains(needle.as_str()),
            _ => false,
        },
        FilterOperator::DoesNotContain => match (&cell_lower, &needle) {
            (Some(value), Some(needle)) => !value.contains(needle.as_str()),
            _ => true,
        },
        FilterOperator::StartsWith => match (&cell_lower, &needle) {
            (Some(value), Some(needle)) => value.starts_with(needle.as_str()),
            _ => false,
        },
        FilterOperator::EndsWith => match (&cell_lower, &needle) {
            (Some(value), Some(needle)) => value.ends_with(needle.as_str()),
            _ => false,
        },
        _ => false,
    }
}

fn match_number(cell: Option<f64>, op: FilterOperator, operand: &Value) -> bool {
    if op == FilterOperator::HasNoneOf {
        return match cell {
            Some(value) => !list(operand).iter().filter_map(Value::as_f64).any(|n| n == value),
            None => true,
        };
    }
    if op == FilterOperator::Ne {
        return cell != operand.as_f64();
    }

    let Some(value) = cell else {
        return false;
    };
    if op == FilterOperator::HasAnyOf {
        return list(operand).iter().filter_map(Value::as_f64).any(|n| n == value);
    }
    let Some(target) = operand.as_f64() else {
        return false;
    };
    compare(value.partial_cmp(&target), op)
}

fn match_date(cell: Option<&str>, op: FilterOperator, operand: &Value, today: NaiveDate) -> bool {
    if op == FilterOperator::IsWithin {
        let (Some(day), Ok(within)) = (cell.and_then(parse_cell_day), WithinOperand::parse(operand))
        else {
            return false;
        };
        let (start, end) = within.range(today);
        return start <= day && day <= end;
    }

    let Ok(target) = DateOperand::parse(operand) else {
        return false;
    };
    let ordering = match (&target, cell) {
        (DateOperand::ExactTimestamp(ts), Some(cell)) => {
            parse_cell_instant(cell).map(|instant| instant.cmp(ts))
        }
        (_, Some(cell)) => parse_cell_day(cell).map(|day| day.cmp(&target.resolve(today))),
        (_, None) => None,
    };

    match (op, ordering) {
        (FilterOperator::Ne, None) => true,
        (_, None) => false,
        (op, Some(ordering)) => compare(Some(ordering), op),
    }
}

fn compare(ordering: Option<Ordering>, op: FilterOperator) -> bool {
    let Some(ordering) = ordering else {
        return false;
    };
    match op {
        FilterOperator::Eq => ordering == Ordering::Equal,
        FilterOperator::Ne => ordering != Ordering::Equal,
        FilterOperator::Gt => ordering == Ordering::Greater,
        FilterOperator::Gte => ordering != Ordering::Less,
        FilterOperator::Lt => ordering == Ordering::Less,
        FilterOperator::Lte => ordering != Ordering::Greater,
        _ => false,
    }
}

fn match_set<T: PartialEq>(
    have: &[T],
    wanted: &[T],
    op: FilterOperator,
    operand: &Value,
    cell: Option<&Value>,
) -> bool {
    match op {
        FilterOperator::Eq => !wanted.is_empty() && wanted.iter().all(|w| have.contains(w)),
        FilterOperator::HasAnyOf => wanted.iter().any(|w| have.contains(w)),
        FilterOperator::HasAllOf => wanted.iter().all(|w| have.contains(w)),
        FilterOperator::IsExactly => {
            wanted.iter().all(|w| have.contains(w)) && have.iter().all(|h| wanted.contains(h))
        }
        FilterOperator::HasNoneOf => !wanted.iter().any(|w| have.contains(w)),
        FilterOperator::Contains => contains_text(cell, operand),
        FilterOperator::DoesNotContain => !contains_text(cell, operand),
        _ => false,
    }
}

/// Case-insensitive substring search over the labels or linked-record fields.
fn contains_text(cell: Option<&Value>, operand: &Value) -> bool {
    let (Some(cell), Some(needle)) = (cell, operand.as_str()) else {
        return false;
    };
    let needle = needle.to_lowercase();
    let hit = |s: &str| s.to_lowercase().contains(&needle);
    cell.as_array().is_some_and(|items| {
        items.iter().any(|item| match item {
            Value::String(s) => hit(s),
            Value::Object(map) => map.values().filter_map(Value::as_str).any(hit),
            _ => false,
        })
    })
}

// ============================================================================
// ORDERING
// ============================================================================

/// Sort rows by each key in turn. Absent values sort first ascending.
pub fn sort_rows(rows: &mut [Row], order_by: &[OrderBy]) {
    if order_by.is_empty() {
        return;
    }
    rows.sort_by(|a, b| {
        for key in order_by {
            let ordering = compare_cells(
                a.get(&key.column).filter(|v| !v.is_null()),
                b.get(&key.column).filter(|v| !v.is_null()),
            );
            let ordering = match key.direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn compare_cells(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_values(a, b),
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => {
            match (parse_cell_instant(x), parse_cell_instant(y)) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => match (x.first(), y.first()) {
            (Some(x), Some(y)) => compare_values(x, y),
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
        },
        (Value::Object(x), Value::Object(y)) => compare_cells(x.get("id"), y.get("id")),
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    fn check(row_value: Value, clause: FilterClause, kind: ColumnKind) -> bool {
        matches(&row(row_value), &clause, &kind, today())
    }

    #[test]
    fn test_text_equality_ignores_case_but_case_equal_does_not() {
        let r = json!({"name": "Morning Run"});
        assert!(check(r.clone(), FilterClause::eq("name", json!("morning run")), ColumnKind::Text));
        assert!(!check(
            r.clone(),
            FilterClause::new("name", FilterOperator::CaseEqual, json!("morning run")),
            ColumnKind::Text
        ));
        assert!(check(
            r.clone(),
            FilterClause::new("name", FilterOperator::StartsWith, json!("MORN")),
            ColumnKind::Text
        ));
        assert!(check(
            r,
            FilterClause::new("name", FilterOperator::DoesNotContain, json!("swim")),
            ColumnKind::Text
        ));
    }

    #[test]
    fn test_emptiness_checks() {
        let kind = ColumnKind::Text;
        assert!(check(json!({"name": ""}), FilterClause::unary("name", FilterOperator::IsEmpty), kind.clone()));
        assert!(check(json!({}), FilterClause::unary("name", FilterOperator::IsEmpty), kind.clone()));
        assert!(check(json!({"name": "x"}), FilterClause::unary("name", FilterOperator::IsNotEmpty), kind));
    }

    #[test]
    fn test_number_comparisons() {
        let r = json!({"weight": 80.0});
        assert!(check(r.clone(), FilterClause::new("weight", FilterOperator::Gte, json!(80)), ColumnKind::Number));
        assert!(!check(r.clone(), FilterClause::new("weight", FilterOperator::Lt, json!(80)), ColumnKind::Number));
        assert!(check(
            r.clone(),
            FilterClause::new("weight", FilterOperator::HasAnyOf, json!([70, 80])),
            ColumnKind::Number
        ));
        assert!(check(
            r,
            FilterClause::new("weight", FilterOperator::HasNoneOf, json!([70])),
            ColumnKind::Number
        ));
    }

    #[test]
    fn test_date_forms() {
        let r = json!({"date": "2024-03-10"});
        assert!(check(
            r.clone(),
            FilterClause::eq("date", json!(["exactDay", "2024-03-10"])),
            ColumnKind::Date
        ));
        assert!(check(
            r.clone(),
            FilterClause::new("date", FilterOperator::Gte, json!(["daysAgo", 7])),
            ColumnKind::Date
        ));
        assert!(check(
            r.clone(),
            FilterClause::new("date", FilterOperator::IsWithin, json!("pastWeek")),
            ColumnKind::Date
        ));
        assert!(!check(
            r,
            FilterClause::new("date", FilterOperator::IsWithin, json!("nextWeek")),
            ColumnKind::Date
        ));
        assert!(check(
            json!({"date": "2024-03-15T08:30:00Z"}),
            FilterClause::eq("date", json!("today")),
            ColumnKind::Date
        ));
    }

    #[test]
    fn test_select_set_operators() {
        let kind = ColumnKind::SingleSelect {
            options: vec!["Running".to_string(), "Cycling".to_string()],
        };
        let r = json!({"exercise": ["Running"]});
        assert!(check(r.clone(), FilterClause::eq("exercise", json!("Running")), kind.clone()));
        assert!(!check(r.clone(), FilterClause::eq("exercise", json!("Cycling")), kind.clone()));
        assert!(check(
            r.clone(),
            FilterClause::new("exercise", FilterOperator::IsExactly, json!(["Running"])),
            kind.clone()
        ));
        assert!(check(
            r,
            FilterClause::new("exercise", FilterOperator::HasNoneOf, json!(["Cycling"])),
            kind
        ));
    }

    #[test]
    fn test_link_ids() {
        let kind = ColumnKind::Link {
            linked_to: "goals".to_string(),
        };
        let r = json!({"goal": [{"id": 3, "name": "Lose 5kg"}]});
        assert!(check(r.clone(), FilterClause::eq("goal", json!(3)), kind.clone()));
        assert!(check(
            r.clone(),
            FilterClause::new("goal", FilterOperator::Contains, json!("5KG")),
            kind.clone()
        ));
        assert!(!check(
            r,
            FilterClause::new("goal", FilterOperator::HasAllOf, json!([3, 4])),
            kind
        ));
    }

    #[test]
    fn test_sort_rows_desc_with_absent_values() {
        let mut rows = vec![
            row(json!({"id": 1, "date": "2024-01-08"})),
            row(json!({"id": 2})),
            row(json!({"id": 3, "date": "2024-01-01"})),
        ];
        sort_rows(
            &mut rows,
            &[OrderBy {
                column: "date".to_string(),
                direction: Direction::Desc,
            }],
        );
        let ids: Vec<_> = rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }
}
