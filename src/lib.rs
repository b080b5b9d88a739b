// ============================================================================
// cartbench-cql Library
// ============================================================================

pub mod api;
pub mod connection;
pub mod core;
pub mod dao;
pub mod facade;
pub mod model;

// Re-export main types for convenience
pub use crate::api::{BenchmarkAdapter, FieldSet, RecordBlob};
pub use crate::core::{AdapterError, Result, Status};
pub use crate::facade::CartBenchClient;
pub use crate::model::{CartState, ShoppingCart};

// Re-export connection API
pub use crate::connection::{
    CqlContext, SessionManager,
    config::AdapterConfig,
    lifecycle::SharedResource,
};

// Re-export data access API
pub use crate::dao::CartDao;
