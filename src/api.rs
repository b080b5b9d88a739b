//! The contract between the benchmark harness and a database adapter.
//!
//! The harness hands each worker one adapter instance, calls `init` once
//! before the workload and `cleanup` once after it, and drives the five
//! verbs in between. Results travel in the harness's generic shape: a map
//! from key to opaque value bytes.

use crate::core::{Result, Status};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};

/// Set of requested field names.
pub type FieldSet = BTreeSet<String>;

/// One record in the harness's generic representation: key to opaque bytes.
pub type RecordBlob = HashMap<String, Vec<u8>>;

#[async_trait]
pub trait BenchmarkAdapter: Send {
    /// Initialize this instance. Called once per worker before any verb.
    async fn init(&mut self) -> Result<()>;

    /// Tear this instance down. Called once per worker after the workload.
    async fn cleanup(&mut self) -> Result<()>;

    /// Point read of `key`. `fields` selects a projection, or all fields
    /// when `None`.
    async fn read(
        &mut self,
        table: &str,
        key: &str,
        fields: Option<&FieldSet>,
        result: &mut RecordBlob,
    ) -> Status;

    /// Range scan of up to `record_count` records starting at `start_key`.
    async fn scan(
        &mut self,
        table: &str,
        start_key: &str,
        record_count: usize,
        fields: Option<&FieldSet>,
        result: &mut Vec<RecordBlob>,
    ) -> Status;

    /// Update the record under `key` with the given field values.
    async fn update(&mut self, table: &str, key: &str, values: &RecordBlob) -> Status;

    /// Insert a record under `key` with the given field values.
    async fn insert(&mut self, table: &str, key: &str, values: &RecordBlob) -> Status;

    /// Delete the record under `key`.
    async fn delete(&mut self, table: &str, key: &str) -> Status;
}
