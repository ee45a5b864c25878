//! 📦 A warehouse in a `BTreeMap`. For tests and dry runs.
//!
//! Clone it, hand one copy to the supervisor, keep the other to count rows.
//! Optionally declare column sets per table, and it will enforce them the way
//! a real warehouse would: unknown table or unknown column is a `SchemaMismatch`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::classifier::SourceTag;
use crate::common::Table;
use crate::error::ChartError;
use crate::warehouse::Warehouse;

#[derive(Debug, Default, Clone)]
pub(crate) struct InMemoryWarehouse {
    /// 🔒 table name → every table appended to it, in append order.
    appended: Arc<Mutex<BTreeMap<String, Vec<Table>>>>,
    /// 📐 When set, only these tables exist, with only these columns.
    schemas: Option<BTreeMap<String, Vec<String>>>,
    unavailable: bool,
}

impl InMemoryWarehouse {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// 📐 Declare a destination table. Once any table is declared, undeclared ones don't exist.
    #[cfg(test)]
    pub(crate) fn with_table(mut self, name: &str, columns: &[&str]) -> Self {
        self.schemas
            .get_or_insert_with(BTreeMap::new)
            .insert(name.to_string(), columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// 💀 A warehouse that's down for maintenance. Forever.
    #[cfg(test)]
    pub(crate) fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// 🔍 Total rows appended to `table_name` so far.
    #[cfg(test)]
    pub(crate) async fn row_count(&self, table_name: &str) -> usize {
        self.appended
            .lock()
            .await
            .get(table_name)
            .map(|tables| tables.iter().map(Table::row_count).sum())
            .unwrap_or(0)
    }

    /// 🔍 How many appends hit `table_name`.
    #[cfg(test)]
    pub(crate) async fn append_count(&self, table_name: &str) -> usize {
        self.appended
            .lock()
            .await
            .get(table_name)
            .map(Vec::len)
            .unwrap_or(0)
    }

    fn check_schema(&self, table_name: &str, table: &Table) -> Result<(), ChartError> {
        let Some(schemas) = &self.schemas else {
            return Ok(());
        };
        let declared = schemas.get(table_name).ok_or_else(|| ChartError::SchemaMismatch {
            table: table_name.to_string(),
            reason: "table does not exist".to_string(),
        })?;
        let unknown: Vec<&str> = table
            .columns()
            .iter()
            .filter(|c| !declared.contains(c))
            .map(String::as_str)
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(ChartError::SchemaMismatch {
                table: table_name.to_string(),
                reason: format!("columns not in the destination: {}", unknown.join(", ")),
            })
        }
    }
}

#[async_trait]
impl Warehouse for InMemoryWarehouse {
    async fn append(&self, source: SourceTag, table: &Table) -> Result<usize, ChartError> {
        let table_name = source.table_name();
        if self.unavailable {
            return Err(ChartError::WarehouseUnavailable {
                table: table_name.to_string(),
                reason: "in-memory warehouse is marked unavailable".to_string(),
            });
        }
        if table.is_empty() {
            return Ok(0);
        }
        self.check_schema(table_name, table)?;
        self.appended
            .lock()
            .await
            .entry(table_name.to_string())
            .or_default()
            .push(table.clone());
        debug!("🏛️ appended {} rows to in-memory '{}'", table.row_count(), table_name);
        Ok(table.row_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart() -> Table {
        let mut table = Table::with_columns(vec!["Rank".into(), "Artist".into()]);
        table.push_row(vec![Some("1".into()), Some("SZA".into())]);
        table
    }

    #[tokio::test]
    async fn the_one_where_appends_pile_up_under_the_source_table() -> anyhow::Result<()> {
        let warehouse = InMemoryWarehouse::new();
        let peek = warehouse.clone();
        assert_eq!(warehouse.append(SourceTag::LastFm, &chart()).await?, 1);
        assert_eq!(warehouse.append(SourceTag::LastFm, &chart()).await?, 1);
        assert_eq!(peek.row_count("last_fm").await, 2);
        assert_eq!(peek.append_count("last_fm").await, 2);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_an_empty_table_never_reaches_the_shelf() -> anyhow::Result<()> {
        let warehouse = InMemoryWarehouse::new();
        assert_eq!(warehouse.append(SourceTag::Shazam, &Table::default()).await?, 0);
        assert_eq!(warehouse.append_count("shazam").await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn the_one_where_a_stray_column_is_a_schema_mismatch() {
        let warehouse = InMemoryWarehouse::new().with_table("shazam", &["Rank"]);
        let outcome = warehouse.append(SourceTag::Shazam, &chart()).await;
        assert!(matches!(outcome, Err(ChartError::SchemaMismatch { .. })));
    }

    #[tokio::test]
    async fn the_one_where_an_undeclared_table_does_not_exist() {
        let warehouse = InMemoryWarehouse::new().with_table("shazam", &["Rank", "Artist"]);
        let outcome = warehouse.append(SourceTag::Spotify, &chart()).await;
        assert!(matches!(outcome, Err(ChartError::SchemaMismatch { .. })));
    }

    #[tokio::test]
    async fn the_one_where_the_warehouse_is_closed_for_renovations() {
        let outcome = InMemoryWarehouse::unavailable().append(SourceTag::Shazam, &chart()).await;
        assert!(matches!(outcome, Err(ChartError::WarehouseUnavailable { .. })));
    }
}
