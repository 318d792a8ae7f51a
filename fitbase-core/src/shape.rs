//! Value shapes for raw, insert and update payloads

use crate::attachment::Attachment;
use crate::date::{kind_name, parse_cell_day};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structural type of one column value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ValueShape {
    Text,
    Number,
    Boolean,
    /// ISO day or timestamp string
    Date,
    /// List of labels drawn from the given options
    Options { options: Vec<String> },
    /// Linked records as returned on read
    LinkedRecords,
    /// Foreign record ids
    IdList,
    /// Full replacement id list or a `{newIds, deletedIds}` delta
    IdListOrDelta,
    /// Attachment objects as returned on read
    Attachments,
    /// Attachment objects or their ids
    AttachmentsOrIds,
    /// Attachment objects, ids, or a `{newIds, deletedIds}` delta
    AttachmentsIdsOrDelta,
}

impl ValueShape {
    /// Check a non-null value against this shape.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            ValueShape::Text => value
                .as_str()
                .map(|_| ())
                .ok_or_else(|| expected("a string", value)),
            ValueShape::Number => match value.as_f64() {
                Some(n) if n.is_finite() => Ok(()),
                _ => Err(expected("a number", value)),
            },
            ValueShape::Boolean => value
                .as_bool()
                .map(|_| ())
                .ok_or_else(|| expected("a boolean", value)),
            ValueShape::Date => match value.as_str() {
                Some(s) if parse_cell_day(s).is_some() => Ok(()),
                Some(s) => Err(format!("expected an ISO date, got {}", s)),
                None => Err(expected("an ISO date string", value)),
            },
            ValueShape::Options { options } => {
                let items = array(value)?;
                for item in items {
                    let label = item.as_str().ok_or_else(|| expected("a string label", item))?;
                    if !options.iter().any(|o| o == label) {
                        return Err(format!("{} is not an allowed option", label));
                    }
                }
                Ok(())
            }
            ValueShape::LinkedRecords => {
                let items = array(value)?;
                items
                    .iter()
                    .all(Value::is_object)
                    .then_some(())
                    .ok_or_else(|| "expected linked record objects".to_string())
            }
            ValueShape::IdList => check_ids(value),
            ValueShape::IdListOrDelta => check_ids(value).or_else(|_| check_delta(value)),
            ValueShape::Attachments => check_attachment_records(value),
            ValueShape::AttachmentsOrIds => {
                check_ids(value).or_else(|_| check_attachments(value))
            }
            ValueShape::AttachmentsIdsOrDelta => check_ids(value)
                .or_else(|_| check_delta(value))
                .or_else(|_| check_attachments(value)),
        }
    }
}

/// A column's position in one of the derived table shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldShape {
    pub column: String,
    pub shape: ValueShape,
    /// Raw: value may be absent. Insert: may be omitted. Update: always true.
    pub optional: bool,
}

/// Raw, Insert and Update shapes derived for one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableShapes {
    pub raw: Vec<FieldShape>,
    pub insert: Vec<FieldShape>,
    pub update: Vec<FieldShape>,
}

impl TableShapes {
    /// Columns that must be present on insert.
    pub fn mandatory_insert_columns(&self) -> impl Iterator<Item = &str> {
        self.insert
            .iter()
            .filter(|f| !f.optional)
            .map(|f| f.column.as_str())
    }
}

fn expected(what: &str, value: &Value) -> String {
    format!("expected {}, got {}", what, kind_name(value))
}

fn array(value: &Value) -> Result<&Vec<Value>, String> {
    value.as_array().ok_or_else(|| expected("an array", value))
}

fn check_ids(value: &Value) -> Result<(), String> {
    array(value)?
        .iter()
        .all(|v| v.as_i64().is_some_and(|id| id >= 0))
        .then_some(())
        .ok_or_else(|| "expected a list of record ids".to_string())
}

fn check_delta(value: &Value) -> Result<(), String> {
    let map = value
        .as_object()
        .ok_or_else(|| expected("an id list or {newIds, deletedIds}", value))?;
    if map.keys().any(|k| k != "newIds" && k != "deletedIds") {
        return Err("delta accepts only newIds and deletedIds".to_string());
    }
    for key in ["newIds", "deletedIds"] {
        let ids = map
            .get(key)
            .ok_or_else(|| format!("delta is missing {}", key))?;
        check_ids(ids).map_err(|_| format!("{} must be a list of record ids", key))?;
    }
    Ok(())
}

/// Read side: full attachment objects or `{id}` references into the
/// attachment table.
fn check_attachment_records(value: &Value) -> Result<(), String> {
    for item in array(value)? {
        if item.get("id").and_then(Value::as_i64).is_some() {
            continue;
        }
        serde_json::from_value::<Attachment>(item.clone())
            .map_err(|e| format!("invalid attachment: {}", e))?;
    }
    Ok(())
}

fn check_attachments(value: &Value) -> Result<(), String> {
    for item in array(value)? {
        serde_json::from_value::<Attachment>(item.clone())
            .map_err(|e| format!("invalid attachment: {}", e))?;
    }
    Ok(())
}
