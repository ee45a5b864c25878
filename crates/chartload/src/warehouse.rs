//! 🏛️ Warehouse: the append-only end of the line.
//!
//! One destination table per source (`shazam`, `last_fm`, `spotify`). The
//! loader appends rows and that's it. It never creates a table, never alters
//! one, never upserts. The schema is somebody else's contract; we only check
//! we aren't about to violate it.
//!
//! 🧠 Knowledge graph:
//! - Pattern: trait → concrete impls (InMemoryWarehouse, PostgresWarehouse) → WarehouseBackend enum.
//!   Same shape as the object store backends, same reason: the supervisor stays ignorant.
//! - Every append owns its connection for exactly as long as the append runs.
//! - Failures are reported, not retried. Retry policy belongs to whoever scheduled us.

use async_trait::async_trait;

use crate::classifier::SourceTag;
use crate::common::Table;
use crate::error::ChartError;

pub(crate) mod in_mem;
pub(crate) mod postgres;

pub use postgres::PostgresWarehouseConfig;

/// 🏛️ Somewhere normalized tables go to live forever.
///
/// # Contract 📜
/// - `append` writes every row of `table` into `source.table_name()` and returns the row count.
/// - An empty table is a no-op returning 0.
/// - Can't reach it: `WarehouseUnavailable`. Columns don't fit: `SchemaMismatch`.
#[async_trait]
pub(crate) trait Warehouse: std::fmt::Debug + Send + Sync {
    async fn append(&self, source: SourceTag, table: &Table) -> Result<usize, ChartError>;
}

/// 🎭 The many faces of a warehouse.
#[derive(Debug)]
pub(crate) enum WarehouseBackend {
    InMemory(in_mem::InMemoryWarehouse),
    Postgres(postgres::PostgresWarehouse),
}

#[async_trait]
impl Warehouse for WarehouseBackend {
    async fn append(&self, source: SourceTag, table: &Table) -> Result<usize, ChartError> {
        match self {
            WarehouseBackend::InMemory(warehouse) => warehouse.append(source, table).await,
            WarehouseBackend::Postgres(warehouse) => warehouse.append(source, table).await,
        }
    }
}
