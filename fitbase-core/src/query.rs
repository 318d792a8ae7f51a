//! Query requests and data-service responses
//!
//! A [`QueryRequest`] is built per facade call, validated against the
//! compiled schema, handed to a data service and then dropped.

use crate::aggregate::{
    deserialize_result, validate_aggregation, AggregationOperator, AggregationResult,
};
use crate::error::ValidationError;
use crate::filter::{validate_filter, FilterClause};
use crate::schema::CompiledSchema;
use crate::Row;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
    Aggregate,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Select => "select",
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Aggregate => "aggregate",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    #[serde(default)]
    pub direction: Direction,
}

/// Operation-specific part of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum Payload {
    Select {
        /// `None` selects every column.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        columns: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<usize>,
    },
    Insert {
        rows: Vec<Row>,
    },
    Update {
        set: Row,
    },
    Delete,
    Aggregate {
        column: String,
        aggregations: Vec<AggregationOperator>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub table: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterClause>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderBy>,
    pub payload: Payload,
}

impl QueryRequest {
    pub fn new(table: impl Into<String>, payload: Payload) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            order_by: Vec::new(),
            payload,
        }
    }

    pub fn operation(&self) -> Operation {
        match self.payload {
            Payload::Select { .. } => Operation::Select,
            Payload::Insert { .. } => Operation::Insert,
            Payload::Update { .. } => Operation::Update,
            Payload::Delete => Operation::Delete,
            Payload::Aggregate { .. } => Operation::Aggregate,
        }
    }

    /// Selected columns, if the request projects a subset.
    pub fn projection(&self) -> Option<&[String]> {
        match &self.payload {
            Payload::Select {
                columns: Some(columns),
                ..
            } => Some(columns),
            _ => None,
        }
    }

    /// Check the whole request against the schema. Nothing is dispatched
    /// for a request that fails here.
    pub fn validate(&self, schema: &CompiledSchema) -> Result<(), ValidationError> {
        let table = schema.queryable_table(&self.table)?;

        for clause in &self.filters {
            let column = table.require_column(&clause.column)?;
            validate_filter(&column.name, &column.kind, clause.operator, clause.operand())?;
        }
        for order in &self.order_by {
            table.require_column(&order.column)?;
        }

        match &self.payload {
            Payload::Select { columns, .. } => {
                for name in columns.iter().flatten() {
                    table.require_column(name)?;
                }
            }
            Payload::Insert { rows } => {
                if rows.is_empty() {
                    return Err(ValidationError::EmptyPayload {
                        operation: "insert",
                    });
                }
                for row in rows {
                    table.validate_insert(row)?;
                }
            }
            Payload::Update { set } => table.validate_update(set)?,
            Payload::Delete => {}
            Payload::Aggregate {
                column,
                aggregations,
            } => {
                let compiled = table.require_column(column)?;
                if aggregations.is_empty() {
                    return Err(ValidationError::EmptyPayload {
                        operation: "aggregate",
                    });
                }
                for aggregation in aggregations {
                    validate_aggregation(&compiled.name, &compiled.kind, *aggregation)?;
                }
            }
        }
        Ok(())
    }
}

/// What the data service returns for a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ServiceResponse {
    /// Selected or newly inserted rows.
    Rows { rows: Vec<Row> },
    /// Rows touched by an update or delete.
    Affected { count: u64 },
    Aggregates {
        #[serde(deserialize_with = "deserialize_result")]
        result: AggregationResult,
    },
}

impl ServiceResponse {
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceResponse::Rows { .. } => "rows",
            ServiceResponse::Affected { .. } => "affected",
            ServiceResponse::Aggregates { .. } => "aggregates",
        }
    }
}
