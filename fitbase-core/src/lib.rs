//! fitbase core - table schema and query capability model
//!
//! Pure data and validation, no I/O. A database is declared as a list of
//! tables; each column has a kind drawn from a fixed catalog. Compiling the
//! declarations yields Raw/Insert/Update shapes per table and the operator
//! grammar used to validate every request before it is dispatched.

pub mod aggregate;
pub mod attachment;
pub mod column;
pub mod config;
pub mod date;
pub mod error;
pub mod filter;
pub mod query;
pub mod schema;
pub mod shape;
pub mod tables;

// ============================================================================
// SHARED TYPES
// ============================================================================

/// A table row keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Identifier the data service assigns to every row.
pub type RecordId = i64;

pub use aggregate::{
    deserialize_result, validate_aggregation, AggregationOperator, AggregationResult,
    AggregationResultType, AggregationValue,
};
pub use attachment::{Attachment, AttachmentColumnValue};
pub use column::{
    kind_of, ColumnDeclaration, ColumnKind, KindDescriptor, KindTag, ATTACHMENT_TABLE,
};
pub use config::ServiceConfig;
pub use date::{DateOperand, RelativeDay, WithinOperand, WithinPeriod};
pub use error::{ConfigError, FitError, FitResult, SchemaError, TransportError, ValidationError};
pub use filter::{validate_filter, FilterClause, FilterOperator, OperandType};
pub use query::{Direction, OrderBy, Operation, Payload, QueryRequest, ServiceResponse};
pub use schema::{CompiledColumn, CompiledSchema, CompiledTable, TableDeclaration};
pub use shape::{FieldShape, TableShapes, ValueShape};

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn column_kind() -> impl Strategy<Value = ColumnKind> {
        prop_oneof![
            Just(ColumnKind::Text),
            Just(ColumnKind::Number),
            Just(ColumnKind::Date),
            Just(ColumnKind::Checkbox),
            Just(ColumnKind::SingleSelect {
                options: vec!["A".to_string(), "B".to_string()]
            }),
            Just(ColumnKind::Link {
                linked_to: "goals".to_string()
            }),
            Just(ColumnKind::Attachment),
            Just(ColumnKind::AutoNumber),
            Just(ColumnKind::AutoDate),
        ]
    }

    fn operand() -> impl Strategy<Value = Option<Value>> {
        prop_oneof![
            Just(None),
            Just(Some(json!("x"))),
            Just(Some(json!(1))),
            Just(Some(json!([1, 2]))),
            Just(Some(json!(["A"]))),
            Just(Some(json!(true))),
            Just(Some(json!("pastWeek"))),
            Just(Some(json!(["daysAgo", 3]))),
        ]
    }

    /// Declarations for one table with a random required/optional split.
    fn table_columns() -> impl Strategy<Value = Vec<(ColumnKind, bool)>> {
        prop::collection::vec((column_kind(), any::<bool>()), 1..8)
    }

    fn declare(columns: &[(ColumnKind, bool)]) -> Vec<TableDeclaration> {
        let mut table = TableDeclaration::new("t");
        for (i, (kind, required)) in columns.iter().enumerate() {
            let mut decl = ColumnDeclaration::new(format!("c{}", i), kind.tag());
            decl.options = kind.options().map(|o| o.to_vec()).unwrap_or_default();
            decl.linked_to = match kind {
                ColumnKind::Link { linked_to } => Some(linked_to.clone()),
                _ => None,
            };
            decl.required = *required && !kind.is_auto_generated();
            table = table.column(decl);
        }
        vec![
            table,
            TableDeclaration::internal("goals").column(ColumnDeclaration::text("name")),
            TableDeclaration::internal(ATTACHMENT_TABLE).column(ColumnDeclaration::text("url")),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Operators outside a kind's table are rejected as invalid whatever
        /// the operand.
        #[test]
        fn prop_operator_outside_table_is_invalid(
            kind in column_kind(),
            op in prop::sample::select(FilterOperator::ALL.to_vec()),
            operand in operand(),
        ) {
            prop_assume!(kind.descriptor().operand_for(op).is_none());
            let result = validate_filter("c", &kind, op, operand.as_ref());
            let is_invalid_operator = matches!(result, Err(ValidationError::InvalidOperator { .. }));
            prop_assert!(is_invalid_operator);
        }

        /// The Insert shape holds exactly the required columns as mandatory
        /// and every other insertable column as optional.
        #[test]
        fn prop_insert_shape_mandatory_columns(columns in table_columns()) {
            let schema = CompiledSchema::compile(&declare(&columns)).unwrap();
            let table = schema.table("t").unwrap();
            let shapes = table.shapes();

            for (i, (kind, required)) in columns.iter().enumerate() {
                let name = format!("c{}", i);
                let field = shapes.insert.iter().find(|f| f.column == name);
                match (kind.insert_shape(), field) {
                    (None, None) => {}
                    (Some(_), Some(field)) => {
                        prop_assert_eq!(field.optional, !(*required && !kind.is_auto_generated()));
                    }
                    _ => prop_assert!(false, "insert shape mismatch for {}", name),
                }
                let update = shapes.update.iter().find(|f| f.column == name);
                prop_assert_eq!(update.is_some(), kind.update_shape().is_some());
                prop_assert!(update.map_or(true, |f| f.optional));
            }
        }

        /// Dropping any mandatory column from an otherwise complete insert
        /// fails with RequiredFieldMissing.
        #[test]
        fn prop_missing_required_column_fails(columns in table_columns()) {
            let schema = CompiledSchema::compile(&declare(&columns)).unwrap();
            let table = schema.table("t").unwrap();
            let mandatory: Vec<String> =
                table.shapes().mandatory_insert_columns().map(str::to_string).collect();
            prop_assume!(!mandatory.is_empty());

            let empty = Row::new();
            let result = table.validate_insert(&empty);
            prop_assert_eq!(
                result,
                Err(ValidationError::RequiredFieldMissing { field: mandatory[0].clone() })
            );
        }

        /// Every aggregation a kind lists validates, every other one fails.
        #[test]
        fn prop_aggregation_table_is_exact(
            kind in column_kind(),
            op in prop::sample::select(AggregationOperator::ALL.to_vec()),
        ) {
            let listed = kind.descriptor().aggregations.contains(&op);
            prop_assert_eq!(validate_aggregation("c", &kind, op).is_ok(), listed);
        }
    }
}
