//! Database handle lifecycle
//!
//! A [`Database`] compiles its table declarations once and owns the query
//! facade for one data service. Handles are independent; several may live in
//! one process against different services or schemas.

use fitbase_client::HttpDataService;
use fitbase_core::tables::fitness_tables;
use fitbase_core::{CompiledSchema, FitResult, ServiceConfig, TableDeclaration};
use fitbase_storage::DataService;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

use crate::facade::QueryBuilder;

pub struct Database {
    query: QueryBuilder,
    started_at: Instant,
}

impl Database {
    /// Compile `declarations` and bind them to `service`.
    pub fn init(
        service: Arc<dyn DataService>,
        declarations: &[TableDeclaration],
    ) -> FitResult<Self> {
        let schema = Arc::new(CompiledSchema::compile(declarations)?);
        info!(
            tables = schema.tables().count(),
            service = service.name(),
            "Database initialized"
        );
        Ok(Self {
            query: QueryBuilder::new(schema, service),
            started_at: Instant::now(),
        })
    }

    /// The fitness tables against the hosted service.
    pub fn connect(config: &ServiceConfig) -> FitResult<Self> {
        let service = HttpDataService::new(config)?;
        Self::init(Arc::new(service), &fitness_tables())
    }

    pub fn query(&self) -> &QueryBuilder {
        &self.query
    }

    pub fn schema(&self) -> &CompiledSchema {
        self.query.schema()
    }

    /// Time since this handle was initialized.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn shutdown(self) {
        info!(
            uptime_ms = self.uptime().as_millis() as u64,
            "Database shut down"
        );
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("query", &self.query)
            .field("started_at", &self.started_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitbase_core::{ColumnDeclaration, FitError, SchemaError};
    use fitbase_storage::MockDataService;

    #[test]
    fn test_init_rejects_invalid_declarations() {
        let schema = Arc::new(fitbase_core::tables::fitness_schema().unwrap());
        let service = Arc::new(MockDataService::new(schema));
        let declarations = vec![TableDeclaration::new("empty")];
        let err = Database::init(service, &declarations).unwrap_err();
        assert!(matches!(err, FitError::Schema(SchemaError::EmptyTable { .. })));
    }

    #[test]
    fn test_init_and_shutdown() {
        let declarations = vec![TableDeclaration::new("notes").column(ColumnDeclaration::text("body"))];
        let schema = Arc::new(CompiledSchema::compile(&declarations).unwrap());
        let db = Database::init(Arc::new(MockDataService::new(schema)), &declarations).unwrap();
        assert!(db.schema().table("notes").is_ok());
        db.shutdown();
    }

    #[test]
    fn test_connect_requires_valid_config() {
        let err = Database::connect(&ServiceConfig::new("ftp://nope", "b", "k")).unwrap_err();
        assert!(matches!(err, FitError::Config(_)));
    }
}
