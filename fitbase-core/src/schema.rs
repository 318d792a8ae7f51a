//! Table schema compiler
//!
//! Declarations are compiled once into a [`CompiledSchema`]: an arena of
//! [`CompiledTable`]s indexed by name, each carrying its derived Raw, Insert
//! and Update shapes. All structural checks (duplicate names, empty tables,
//! dangling links, kind parameters) run eagerly here so that a broken schema
//! never reaches the first query.

use crate::column::{kind_of, ColumnDeclaration, ColumnKind};
use crate::error::{SchemaError, TransportError, ValidationError};
use crate::shape::{FieldShape, TableShapes};
use crate::Row;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

// ============================================================================
// DECLARATIONS
// ============================================================================

/// A table as declared: a name and an ordered list of columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableDeclaration {
    pub name: String,
    /// Internal tables back link and attachment columns and are never
    /// queried directly.
    #[serde(default)]
    pub internal: bool,
    #[serde(default, rename = "column")]
    pub columns: Vec<ColumnDeclaration>,
}

impl TableDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            internal: false,
            columns: Vec::new(),
        }
    }

    pub fn internal(name: impl Into<String>) -> Self {
        Self {
            internal: true,
            ..Self::new(name)
        }
    }

    pub fn column(mut self, column: ColumnDeclaration) -> Self {
        self.columns.push(column);
        self
    }
}

/// TOML document form: a list of `[[table]]` entries with `[[table.column]]`
/// children.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaDocument {
    #[serde(default, rename = "table")]
    tables: Vec<TableDeclaration>,
}

// ============================================================================
// COMPILED FORM
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledColumn {
    pub name: String,
    pub kind: ColumnKind,
    pub required: bool,
}

impl CompiledColumn {
    pub fn is_insertable(&self) -> bool {
        self.kind.insert_shape().is_some()
    }

    pub fn is_updatable(&self) -> bool {
        self.kind.update_shape().is_some()
    }
}

#[derive(Debug, Clone)]
pub struct CompiledTable {
    name: String,
    internal: bool,
    columns: Vec<CompiledColumn>,
    index: HashMap<String, usize>,
    shapes: TableShapes,
}

impl CompiledTable {
    /// Compile one table. `known_tables` holds every declared table name and
    /// is used for the dangling-link check.
    pub fn compile(
        decl: &TableDeclaration,
        known_tables: &HashSet<&str>,
    ) -> Result<Self, SchemaError> {
        if decl.columns.is_empty() {
            return Err(SchemaError::EmptyTable {
                table: decl.name.clone(),
            });
        }

        let mut columns = Vec::with_capacity(decl.columns.len());
        let mut index = HashMap::with_capacity(decl.columns.len());

        for column in &decl.columns {
            if index.contains_key(&column.name) {
                return Err(SchemaError::DuplicateColumn {
                    table: decl.name.clone(),
                    column: column.name.clone(),
                });
            }

            let kind = kind_of(&decl.name, column)?;
            if let Some(target) = kind.linked_to() {
                if !known_tables.contains(target) {
                    return Err(SchemaError::DanglingLink {
                        table: decl.name.clone(),
                        column: column.name.clone(),
                        target: target.to_string(),
                    });
                }
            }

            index.insert(column.name.clone(), columns.len());
            columns.push(CompiledColumn {
                name: column.name.clone(),
                kind,
                required: column.required,
            });
        }

        let shapes = derive_shapes(&columns);
        debug!(
            table = %decl.name,
            columns = columns.len(),
            mandatory = shapes.mandatory_insert_columns().count(),
            "Compiled table"
        );

        Ok(Self {
            name: decl.name.clone(),
            internal: decl.internal,
            columns,
            index,
            shapes,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_internal(&self) -> bool {
        self.internal
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> &[CompiledColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&CompiledColumn> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    pub fn require_column(&self, name: &str) -> Result<&CompiledColumn, ValidationError> {
        self.column(name)
            .ok_or_else(|| ValidationError::UnknownColumn {
                table: self.name.clone(),
                column: name.to_string(),
            })
    }

    pub fn shapes(&self) -> &TableShapes {
        &self.shapes
    }

    /// Check an insert payload against the Insert shape.
    ///
    /// A `null` value counts as absent.
    pub fn validate_insert(&self, row: &Row) -> Result<(), ValidationError> {
        for (key, value) in row {
            let column = self.require_column(key)?;
            let shape = column
                .kind
                .insert_shape()
                .ok_or_else(|| ValidationError::NotInsertable {
                    column: key.clone(),
                })?;
            if value.is_null() {
                continue;
            }
            shape
                .check(value)
                .map_err(|reason| ValidationError::InvalidValue {
                    field: key.clone(),
                    reason,
                })?;
        }

        for field in self.shapes.mandatory_insert_columns() {
            if row.get(field).map_or(true, Value::is_null) {
                return Err(ValidationError::RequiredFieldMissing {
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Check a partial update against the Update shape.
    ///
    /// `null` clears an optional column and is rejected for a required one.
    pub fn validate_update(&self, set: &Row) -> Result<(), ValidationError> {
        if set.is_empty() {
            return Err(ValidationError::EmptyPayload {
                operation: "update",
            });
        }

        for (key, value) in set {
            let column = self.require_column(key)?;
            let shape = column
                .kind
                .update_shape()
                .ok_or_else(|| ValidationError::NotUpdatable {
                    column: key.clone(),
                })?;
            if value.is_null() {
                if column.required {
                    return Err(ValidationError::InvalidValue {
                        field: key.clone(),
                        reason: "required column cannot be cleared".to_string(),
                    });
                }
                continue;
            }
            shape
                .check(value)
                .map_err(|reason| ValidationError::InvalidValue {
                    field: key.clone(),
                    reason,
                })?;
        }
        Ok(())
    }

    /// Bring a row returned by the data service into the Raw shape.
    ///
    /// Unknown keys are dropped. When `projection` is `None` every required
    /// column must be present.
    pub fn conform_row(
        &self,
        row: Row,
        projection: Option<&[String]>,
    ) -> Result<Row, TransportError> {
        let mut conformed = Row::new();
        for (key, value) in row {
            let Some(column) = self.column(&key) else {
                continue;
            };
            if value.is_null() {
                if column.required {
                    return Err(TransportError::InvalidResponse {
                        reason: format!("{}.{} is required but null", self.name, key),
                    });
                }
                continue;
            }
            column
                .kind
                .raw_shape()
                .check(&value)
                .map_err(|reason| TransportError::InvalidResponse {
                    reason: format!("{}.{}: {}", self.name, key, reason),
                })?;
            conformed.insert(key, value);
        }

        if projection.is_none() {
            for column in self.columns.iter().filter(|c| c.required) {
                if !conformed.contains_key(&column.name) {
                    return Err(TransportError::InvalidResponse {
                        reason: format!("{}.{} is required but missing", self.name, column.name),
                    });
                }
            }
        }
        Ok(conformed)
    }
}

fn derive_shapes(columns: &[CompiledColumn]) -> TableShapes {
    let mut shapes = TableShapes::default();
    for column in columns {
        shapes.raw.push(FieldShape {
            column: column.name.clone(),
            shape: column.kind.raw_shape(),
            optional: !column.required,
        });
        if let Some(shape) = column.kind.insert_shape() {
            shapes.insert.push(FieldShape {
                column: column.name.clone(),
                shape,
                optional: !column.required,
            });
        }
        if let Some(shape) = column.kind.update_shape() {
            shapes.update.push(FieldShape {
                column: column.name.clone(),
                shape,
                optional: true,
            });
        }
    }
    shapes
}

/// All tables of one database, compiled and indexed by name.
///
/// Read-only after construction; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    tables: Vec<CompiledTable>,
    index: HashMap<String, usize>,
}

impl CompiledSchema {
    pub fn compile(declarations: &[TableDeclaration]) -> Result<Self, SchemaError> {
        let mut known = HashSet::with_capacity(declarations.len());
        for decl in declarations {
            if !known.insert(decl.name.as_str()) {
                return Err(SchemaError::DuplicateTable {
                    table: decl.name.clone(),
                });
            }
        }

        let mut tables = Vec::with_capacity(declarations.len());
        let mut index = HashMap::with_capacity(declarations.len());
        for decl in declarations {
            index.insert(decl.name.clone(), tables.len());
            tables.push(CompiledTable::compile(decl, &known)?);
        }

        info!(
            tables = tables.len(),
            internal = tables.iter().filter(|t| t.internal).count(),
            "Schema compiled"
        );
        Ok(Self { tables, index })
    }

    /// Parse `[[table]]` declarations from TOML and compile them.
    pub fn from_toml(source: &str) -> Result<Self, SchemaError> {
        let document: SchemaDocument = toml::from_str(source).map_err(|e| SchemaError::Parse {
            reason: e.to_string(),
        })?;
        Self::compile(&document.tables)
    }

    pub fn tables(&self) -> impl Iterator<Item = &CompiledTable> {
        self.tables.iter()
    }

    pub fn table(&self, name: &str) -> Result<&CompiledTable, ValidationError> {
        self.index
            .get(name)
            .map(|&i| &self.tables[i])
            .ok_or_else(|| ValidationError::UnknownTable {
                table: name.to_string(),
            })
    }

    /// Like [`CompiledSchema::table`], refusing internal tables.
    pub fn queryable_table(&self, name: &str) -> Result<&CompiledTable, ValidationError> {
        let table = self.table(name)?;
        if table.internal {
            return Err(ValidationError::InternalTable {
                table: name.to_string(),
            });
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ValueShape;
    use serde_json::json;

    fn journal() -> Vec<TableDeclaration> {
        vec![
            TableDeclaration::new("goals").column(ColumnDeclaration::text("name").required()),
            TableDeclaration::new("journal")
                .column(ColumnDeclaration::auto_number("id"))
                .column(ColumnDeclaration::date("date").required())
                .column(ColumnDeclaration::text("note"))
                .column(ColumnDeclaration::single_select("mood", &["Good", "Bad"]))
                .column(ColumnDeclaration::link("goal", "goals"))
                .column(ColumnDeclaration::auto_date("createdAt")),
        ]
    }

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_shapes_follow_required_and_insertability() {
        let schema = CompiledSchema::compile(&journal()).unwrap();
        let shapes = schema.table("journal").unwrap().shapes();

        let raw: Vec<_> = shapes.raw.iter().map(|f| (f.column.as_str(), f.optional)).collect();
        assert_eq!(
            raw,
            vec![
                ("id", true),
                ("date", false),
                ("note", true),
                ("mood", true),
                ("goal", true),
                ("createdAt", true)
            ]
        );

        let insert: Vec<_> = shapes.insert.iter().map(|f| f.column.as_str()).collect();
        assert_eq!(insert, vec!["date", "note", "mood", "goal"]);
        assert_eq!(shapes.mandatory_insert_columns().collect::<Vec<_>>(), vec!["date"]);

        assert!(shapes.update.iter().all(|f| f.optional));
        let goal = shapes.update.iter().find(|f| f.column == "goal").unwrap();
        assert_eq!(goal.shape, ValueShape::IdListOrDelta);
    }

    #[test]
    fn test_compile_rejects_duplicates_and_empty_tables() {
        let dup_column = vec![TableDeclaration::new("t")
            .column(ColumnDeclaration::text("a"))
            .column(ColumnDeclaration::number("a"))];
        assert!(matches!(
            CompiledSchema::compile(&dup_column),
            Err(SchemaError::DuplicateColumn { .. })
        ));

        let dup_table = vec![
            TableDeclaration::new("t").column(ColumnDeclaration::text("a")),
            TableDeclaration::new("t").column(ColumnDeclaration::text("b")),
        ];
        assert!(matches!(
            CompiledSchema::compile(&dup_table),
            Err(SchemaError::DuplicateTable { .. })
        ));

        let empty = vec![TableDeclaration::new("t")];
        assert!(matches!(
            CompiledSchema::compile(&empty),
            Err(SchemaError::EmptyTable { .. })
        ));
    }

    #[test]
    fn test_dangling_link_fails_eagerly() {
        let tables = vec![TableDeclaration::new("cardio")
            .column(ColumnDeclaration::link("route", "routes"))];
        assert_eq!(
            CompiledSchema::compile(&tables).unwrap_err(),
            SchemaError::DanglingLink {
                table: "cardio".to_string(),
                column: "route".to_string(),
                target: "routes".to_string(),
            }
        );

        let attachment_without_table =
            vec![TableDeclaration::new("meals").column(ColumnDeclaration::attachment("photo"))];
        assert!(matches!(
            CompiledSchema::compile(&attachment_without_table),
            Err(SchemaError::DanglingLink { .. })
        ));
    }

    #[test]
    fn test_validate_insert() {
        let schema = CompiledSchema::compile(&journal()).unwrap();
        let table = schema.table("journal").unwrap();

        assert!(table
            .validate_insert(&row(json!({"date": "2024-01-01", "mood": ["Good"], "goal": [1]})))
            .is_ok());
        assert_eq!(
            table.validate_insert(&row(json!({"note": "x"}))),
            Err(ValidationError::RequiredFieldMissing {
                field: "date".to_string()
            })
        );
        assert_eq!(
            table.validate_insert(&row(json!({"date": null}))),
            Err(ValidationError::RequiredFieldMissing {
                field: "date".to_string()
            })
        );
        assert!(matches!(
            table.validate_insert(&row(json!({"date": "2024-01-01", "createdAt": "2024-01-01"}))),
            Err(ValidationError::NotInsertable { .. })
        ));
        assert!(matches!(
            table.validate_insert(&row(json!({"date": "2024-01-01", "mood": ["Meh"]}))),
            Err(ValidationError::InvalidValue { .. })
        ));
        assert!(matches!(
            table.validate_insert(&row(json!({"date": "2024-01-01", "colour": "red"}))),
            Err(ValidationError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_validate_update() {
        let schema = CompiledSchema::compile(&journal()).unwrap();
        let table = schema.table("journal").unwrap();

        assert!(table.validate_update(&row(json!({"note": null}))).is_ok());
        assert!(table
            .validate_update(&row(json!({"goal": {"newIds": [1], "deletedIds": []}})))
            .is_ok());
        assert!(matches!(
            table.validate_update(&row(json!({"date": null}))),
            Err(ValidationError::InvalidValue { .. })
        ));
        assert!(matches!(
            table.validate_update(&row(json!({"id": 4}))),
            Err(ValidationError::NotUpdatable { .. })
        ));
        assert!(matches!(
            table.validate_update(&Row::new()),
            Err(ValidationError::EmptyPayload { operation: "update" })
        ));
    }

    #[test]
    fn test_conform_row() {
        let schema = CompiledSchema::compile(&journal()).unwrap();
        let table = schema.table("journal").unwrap();

        let conformed = table
            .conform_row(row(json!({"id": 1, "date": "2024-01-01", "note": null, "extra": 1})), None)
            .unwrap();
        assert_eq!(conformed, row(json!({"id": 1, "date": "2024-01-01"})));

        assert!(table.conform_row(row(json!({"id": 1})), None).is_err());
        let projected = vec!["id".to_string()];
        assert!(table.conform_row(row(json!({"id": 1})), Some(&projected)).is_ok());
    }

    #[test]
    fn test_internal_tables_are_not_queryable() {
        let tables = vec![
            TableDeclaration::internal("selectTable").column(ColumnDeclaration::text("name")),
            TableDeclaration::new("weight").column(ColumnDeclaration::number("weight")),
        ];
        let schema = CompiledSchema::compile(&tables).unwrap();
        assert!(schema.table("selectTable").is_ok());
        assert!(matches!(
            schema.queryable_table("selectTable"),
            Err(ValidationError::InternalTable { .. })
        ));
        assert!(matches!(
            schema.queryable_table("posts"),
            Err(ValidationError::UnknownTable { .. })
        ));
    }

    #[test]
    fn test_from_toml() {
        let source = r#"
            [[table]]
            name = "weight"

            [[table.column]]
            name = "date"
            kind = "date"
            required = true

            [[table.column]]
            name = "weight"
            kind = "number"
        "#;
        let schema = CompiledSchema::from_toml(source).unwrap();
        let table = schema.table("weight").unwrap();
        assert_eq!(table.columns().len(), 2);
        assert!(table.column("date").unwrap().required);

        let bad = r#"
            [[table]]
            name = "weight"
            [[table.column]]
            name = "w"
            kind = "decimal"
        "#;
        assert!(matches!(
            CompiledSchema::from_toml(bad),
            Err(SchemaError::UnknownKind { .. })
        ));
        assert!(matches!(
            CompiledSchema::from_toml("[[table]]\nname = 3"),
            Err(SchemaError::Parse { .. })
        ));
    }
}
