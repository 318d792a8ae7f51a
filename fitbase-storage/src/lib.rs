//! fitbase storage - data-service trait and in-memory implementation
//!
//! [`DataService`] is the seam to the hosted tabular service. The HTTP
//! implementation lives in fitbase-client; [`MockDataService`] evaluates
//! filters, ordering and aggregations in memory.

mod eval;
mod fold;
pub mod mock;
pub mod service;

pub use mock::MockDataService;
pub use service::DataService;
