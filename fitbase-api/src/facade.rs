//! Query Capability Facade
//!
//! Fluent builders over one compiled schema and one [`DataService`]. Each
//! builder assembles a [`QueryRequest`], validates it against the schema and
//! only then dispatches it. Rows coming back are brought into the table's Raw
//! shape before they reach the caller.
//!
//! ```ignore
//! let rows = query
//!     .select_from("weight")
//!     .select(&["id", "date", "weight"])
//!     .filter("date", FilterOperator::Gte, json!(["exactDay", "2024-01-01"]))
//!     .order_by("date", Direction::Desc)
//!     .execute()
//!     .await?;
//! ```

use fitbase_core::{
    AggregationOperator, AggregationResult, CompiledSchema, Direction, FilterClause,
    FilterOperator, FitError, FitResult, OrderBy, Payload, QueryRequest, Row, ServiceResponse,
    TransportError,
};
use fitbase_storage::DataService;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Entry point for building requests against one database.
#[derive(Clone)]
pub struct QueryBuilder {
    schema: Arc<CompiledSchema>,
    service: Arc<dyn DataService>,
}

impl QueryBuilder {
    pub fn new(schema: Arc<CompiledSchema>, service: Arc<dyn DataService>) -> Self {
        Self { schema, service }
    }

    pub fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    pub fn select_from(&self, table: &str) -> SelectQuery<'_> {
        SelectQuery {
            builder: self,
            request: QueryRequest::new(
                table,
                Payload::Select {
                    columns: None,
                    limit: None,
                },
            ),
        }
    }

    pub fn insert_into(&self, table: &str) -> InsertQuery<'_> {
        InsertQuery {
            builder: self,
            request: QueryRequest::new(table, Payload::Insert { rows: Vec::new() }),
        }
    }

    pub fn update(&self, table: &str) -> UpdateQuery<'_> {
        UpdateQuery {
            builder: self,
            request: QueryRequest::new(table, Payload::Update { set: Row::new() }),
        }
    }

    pub fn delete_from(&self, table: &str) -> DeleteQuery<'_> {
        DeleteQuery {
            builder: self,
            request: QueryRequest::new(table, Payload::Delete),
        }
    }

    pub fn aggregate_from(&self, table: &str) -> AggregateQuery<'_> {
        AggregateQuery {
            builder: self,
            request: QueryRequest::new(
                table,
                Payload::Aggregate {
                    column: String::new(),
                    aggregations: Vec::new(),
                },
            ),
        }
    }

    /// Validate, then hand the request to the data service.
    async fn dispatch(&self, request: &QueryRequest) -> FitResult<ServiceResponse> {
        if let Err(e) = request.validate(&self.schema) {
            debug!(
                table = %request.table,
                operation = %request.operation(),
                error = %e,
                "Request rejected before dispatch"
            );
            return Err(e.into());
        }

        debug!(
            table = %request.table,
            operation = %request.operation(),
            filters = request.filters.len(),
            service = self.service.name(),
            "Dispatching request"
        );
        self.service.execute(request).await.inspect_err(|e| {
            if let FitError::Transport(transport) = e {
                warn!(
                    table = %request.table,
                    operation = %request.operation(),
                    error = %transport,
                    "Data service request failed"
                );
            }
        })
    }

    async fn fetch_rows(&self, request: &QueryRequest) -> FitResult<Vec<Row>> {
        let rows = match self.dispatch(request).await? {
            ServiceResponse::Rows { rows } => rows,
            other => return Err(unexpected("rows", &other)),
        };
        let table = self.schema.table(&request.table)?;
        let projection = request.projection();
        rows.into_iter()
            .map(|row| table.conform_row(row, projection).map_err(FitError::from))
            .collect()
    }

    async fn fetch_count(&self, request: &QueryRequest) -> FitResult<u64> {
        match self.dispatch(request).await? {
            ServiceResponse::Affected { count } => Ok(count),
            other => Err(unexpected("affected", &other)),
        }
    }
}

impl std::fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("tables", &self.schema.tables().count())
            .field("service", &self.service.name())
            .finish()
    }
}

fn unexpected(expected: &str, got: &ServiceResponse) -> FitError {
    TransportError::InvalidResponse {
        reason: format!("expected {} response, got {}", expected, got.kind()),
    }
    .into()
}

/// Filter methods shared by every builder that narrows rows.
macro_rules! impl_filters {
    ($builder:ident) => {
        impl<'a> $builder<'a> {
            /// Add a filter clause. Clauses are ANDed.
            pub fn filter(
                mut self,
                column: &str,
                operator: FilterOperator,
                operand: impl Into<Value>,
            ) -> Self {
                self.request
                    .filters
                    .push(FilterClause::new(column, operator, operand.into()));
                self
            }

            /// Add an operand-less clause such as `isEmpty`.
            pub fn filter_unary(mut self, column: &str, operator: FilterOperator) -> Self {
                self.request
                    .filters
                    .push(FilterClause::unary(column, operator));
                self
            }

            /// Shorthand for `filter(column, Eq, operand)`.
            pub fn filter_eq(self, column: &str, operand: impl Into<Value>) -> Self {
                self.filter(column, FilterOperator::Eq, operand)
            }

            /// The request as it would be sent.
            pub fn request(&self) -> &QueryRequest {
                &self.request
            }
        }
    };
}

// ============================================================================
// SELECT
// ============================================================================

pub struct SelectQuery<'a> {
    builder: &'a QueryBuilder,
    request: QueryRequest,
}

impl_filters!(SelectQuery);

impl<'a> SelectQuery<'a> {
    /// Project onto the given columns instead of the whole row.
    pub fn select(mut self, columns: &[&str]) -> Self {
        if let Payload::Select { columns: ref mut projection, .. } = self.request.payload {
            *projection = Some(columns.iter().map(|c| c.to_string()).collect());
        }
        self
    }

    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.request.order_by.push(OrderBy {
            column: column.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        if let Payload::Select { ref mut limit, .. } = self.request.payload {
            *limit = Some(n);
        }
        self
    }

    pub async fn execute(self) -> FitResult<Vec<Row>> {
        self.builder.fetch_rows(&self.request).await
    }

    /// First matching row, if any.
    pub async fn execute_take_first(self) -> FitResult<Option<Row>> {
        let query = match self.request.payload {
            Payload::Select { limit: None, .. } => self.limit(1),
            _ => self,
        };
        Ok(query.execute().await?.into_iter().next())
    }
}

// ============================================================================
// INSERT
// ============================================================================

pub struct InsertQuery<'a> {
    builder: &'a QueryBuilder,
    request: QueryRequest,
}

impl<'a> InsertQuery<'a> {
    /// Queue one row. May be called repeatedly for a batch insert.
    pub fn values(mut self, row: Row) -> Self {
        if let Payload::Insert { ref mut rows } = self.request.payload {
            rows.push(row);
        }
        self
    }

    pub fn request(&self) -> &QueryRequest {
        &self.request
    }

    /// Created rows as the service materialized them.
    pub async fn execute(self) -> FitResult<Vec<Row>> {
        self.builder.fetch_rows(&self.request).await
    }

    /// The single created row.
    pub async fn execute_take_first(self) -> FitResult<Row> {
        self.execute()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                TransportError::InvalidResponse {
                    reason: "insert returned no rows".to_string(),
                }
                .into()
            })
    }
}

// ============================================================================
// UPDATE
// ============================================================================

pub struct UpdateQuery<'a> {
    builder: &'a QueryBuilder,
    request: QueryRequest,
}

impl_filters!(UpdateQuery);

impl<'a> UpdateQuery<'a> {
    /// Merge columns into the update payload. A `null` value clears an
    /// optional column.
    pub fn set(mut self, values: Row) -> Self {
        if let Payload::Update { ref mut set } = self.request.payload {
            set.extend(values);
        }
        self
    }

    /// Number of rows touched.
    pub async fn execute(self) -> FitResult<u64> {
        self.builder.fetch_count(&self.request).await
    }
}

// ============================================================================
// DELETE
// ============================================================================

pub struct DeleteQuery<'a> {
    builder: &'a QueryBuilder,
    request: QueryRequest,
}

impl_filters!(DeleteQuery);

impl<'a> DeleteQuery<'a> {
    /// Number of rows removed. Deleting nothing is not an error.
    pub async fn execute(self) -> FitResult<u64> {
        self.builder.fetch_count(&self.request).await
    }
}

// ============================================================================
// AGGREGATE
// ============================================================================

pub struct AggregateQuery<'a> {
    builder: &'a QueryBuilder,
    request: QueryRequest,
}

impl_filters!(AggregateQuery);

impl<'a> AggregateQuery<'a> {
    /// Column to fold and the aggregations to compute over it.
    pub fn aggregate(mut self, column: &str, operators: &[AggregationOperator]) -> Self {
        if let Payload::Aggregate {
            column: ref mut target,
            ref mut aggregations,
        } = self.request.payload
        {
            *target = column.to_string();
            aggregations.extend_from_slice(operators);
        }
        self
    }

    pub async fn execute(self) -> FitResult<AggregationResult> {
        match self.builder.dispatch(&self.request).await? {
            ServiceResponse::Aggregates { result } => Ok(result),
            other => Err(unexpected("aggregates", &other)),
        }
    }
}
