//! Async seam to the external tabular-data service.
//!
//! The facade hands every validated [`QueryRequest`] to a `DataService` and
//! maps the [`ServiceResponse`] back into rows, counts or aggregates.
//! Implementations report failures as `FitError::Transport` and never retry.

use ::async_trait::async_trait;
use fitbase_core::{FitResult, QueryRequest, ServiceResponse};
use std::sync::Arc;

#[async_trait]
pub trait DataService: Send + Sync {
    /// Execute one request.
    ///
    /// Select and insert answer with `Rows`, update and delete with
    /// `Affected`, aggregate with `Aggregates`. A filter that matches nothing
    /// is a success with zero rows or a zero count.
    async fn execute(&self, request: &QueryRequest) -> FitResult<ServiceResponse>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<T: DataService + ?Sized> DataService for Arc<T> {
    async fn execute(&self, request: &QueryRequest) -> FitResult<ServiceResponse> {
        (**self).execute(request).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
