//! fitbase API - query facade, fitness routines and procedures
//!
//! [`Database`] binds a compiled schema to a data service and exposes the
//! fluent [`QueryBuilder`]. The [`routines`] build the fitness operations on
//! top of it, and [`Database::call`] dispatches them by procedure name for
//! any transport.

pub mod database;
pub mod error;
pub mod facade;
pub mod procedures;
pub mod routines;
pub mod telemetry;

pub use database::Database;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use facade::{AggregateQuery, DeleteQuery, InsertQuery, QueryBuilder, SelectQuery, UpdateQuery};
pub use procedures::PROCEDURES;
pub use routines::{cardio_speed, NutritionTotals, WeightStats};
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig};
