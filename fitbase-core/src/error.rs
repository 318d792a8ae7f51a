//! Error types for fitbase operations

use crate::aggregate::AggregationOperator;
use crate::column::KindTag;
use crate::filter::{FilterOperator, OperandType};
use crate::RecordId;
use thiserror::Error;

/// Invalid table or column declarations. Fatal at startup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Table {table} declares no columns")]
    EmptyTable { table: String },

    #[error("Table {table} is declared more than once")]
    DuplicateTable { table: String },

    #[error("Column {column} is declared more than once in table {table}")]
    DuplicateColumn { table: String, column: String },

    #[error("Column {table}.{column} links to undeclared table {target}")]
    DanglingLink {
        table: String,
        column: String,
        target: String,
    },

    #[error("Column {table}.{column} has unsupported kind {kind}")]
    UnknownKind {
        table: String,
        column: String,
        kind: String,
    },

    #[error("Column {table}.{column} of kind {kind} requires parameter {parameter}")]
    MissingKindParameter {
        table: String,
        column: String,
        kind: KindTag,
        parameter: &'static str,
    },

    #[error("Select column {table}.{column} declares no options")]
    EmptyOptions { table: String, column: String },

    #[error("Select column {table}.{column} declares option {option} twice")]
    DuplicateOption {
        table: String,
        column: String,
        option: String,
    },

    #[error("Auto-generated column {table}.{column} cannot be required")]
    RequiredAutoGenerated { table: String, column: String },

    #[error("Failed to parse schema document: {reason}")]
    Parse { reason: String },
}

/// Caller-supplied payloads that violate the schema. Raised before dispatch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unknown table: {table}")]
    UnknownTable { table: String },

    #[error("Table {table} is internal and cannot be queried directly")]
    InternalTable { table: String },

    #[error("Unknown column {column} in table {table}")]
    UnknownColumn { table: String, column: String },

    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Column {column} is not insertable")]
    NotInsertable { column: String },

    #[error("Column {column} is not updatable")]
    NotUpdatable { column: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Operator {operator} is not valid for {kind} column {column}")]
    InvalidOperator {
        column: String,
        kind: KindTag,
        operator: String,
    },

    #[error("Operator {operator} on {column} expects {expected}: {reason}")]
    OperandTypeMismatch {
        column: String,
        operator: FilterOperator,
        expected: OperandType,
        reason: String,
    },

    #[error("Operator {operator} on {column} requires an operand")]
    MissingOperand {
        column: String,
        operator: FilterOperator,
    },

    #[error("Operator {operator} on {column} takes no operand")]
    UnexpectedOperand {
        column: String,
        operator: FilterOperator,
    },

    #[error("Aggregation {aggregation} is not supported for {kind} column {column}")]
    UnsupportedAggregation {
        column: String,
        kind: KindTag,
        aggregation: AggregationOperator,
    },

    #[error("Empty {operation} payload")]
    EmptyPayload { operation: &'static str },
}

/// Failures talking to the external tabular service. Passed through unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Data service unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("Data service returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response from data service: {reason}")]
    InvalidResponse { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read config file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to parse config TOML: {reason}")]
    Parse { reason: String },
}

/// Master error type for all fitbase errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FitError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Record not found: {table} with id {id}")]
    NotFound { table: String, id: RecordId },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for fitbase operations.
pub type FitResult<T> = Result<T, FitError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_display_dangling_link() {
        let err = SchemaError::DanglingLink {
            table: "cardio".to_string(),
            column: "route".to_string(),
            target: "routes".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("cardio.route"));
        assert!(msg.contains("routes"));
    }

    #[test]
    fn test_validation_error_display_operand_mismatch() {
        let err = ValidationError::OperandTypeMismatch {
            column: "name".to_string(),
            operator: FilterOperator::HasAnyOf,
            expected: OperandType::TextList,
            reason: "expected an array".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("hasAnyOf"));
        assert!(msg.contains("list of text"));
    }

    #[test]
    fn test_transport_error_display_status() {
        let err = TransportError::Status {
            status: 502,
            message: "bad gateway".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("502"));
        assert!(msg.contains("bad gateway"));
    }

    #[test]
    fn test_fit_error_from_variants() {
        let schema = FitError::from(SchemaError::EmptyTable {
            table: "t".to_string(),
        });
        assert!(matches!(schema, FitError::Schema(_)));

        let validation = FitError::from(ValidationError::RequiredFieldMissing {
            field: "date".to_string(),
        });
        assert!(matches!(validation, FitError::Validation(_)));

        let transport = FitError::from(TransportError::Unreachable {
            reason: "refused".to_string(),
        });
        assert!(matches!(transport, FitError::Transport(_)));

        let config = FitError::from(ConfigError::MissingRequired {
            field: "base_url".to_string(),
        });
        assert!(matches!(config, FitError::Config(_)));
    }

    #[test]
    fn test_not_found_display() {
        let err = FitError::NotFound {
            table: "weight".to_string(),
            id: 42,
        };
        assert_eq!(format!("{}", err), "Record not found: weight with id 42");
    }
}
