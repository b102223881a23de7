//! Batch writer inserting into one ClickHouse table

use std::marker::PhantomData;

use async_trait::async_trait;
use clickhouse::Client;
use clickhouse::insert::Insert;

use super::tables::TableRecord;
use crate::batching::BatchWriter;
use crate::error::SinkError;

/// Writes each batch as a single `INSERT` into `table`
pub struct ClickHouseWriter<R> {
    client: Client,
    table: String,
    _record: PhantomData<fn() -> R>,
}

impl<R: TableRecord> ClickHouseWriter<R> {
    pub fn new(client: Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
            _record: PhantomData,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the table if it does not exist
    pub async fn ensure_table(&self) -> Result<(), SinkError> {
        let sql = R::create_table_sql(&self.table);
        self.client.query(&sql).execute().await?;
        tracing::info!(table = %self.table, "table ready");
        Ok(())
    }
}

#[async_trait]
impl<R> BatchWriter<R> for ClickHouseWriter<R>
where
    R: TableRecord,
    for<'a> R::Row: clickhouse::Row<Value<'a> = R::Row>,
{
    fn writer_type(&self) -> &'static str {
        "clickhouse"
    }

    async fn write_batch(&mut self, records: &[R]) -> Result<(), SinkError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut insert: Insert<R::Row> = self.client.insert(&self.table).await?;
        for record in records {
            insert.write(&record.to_row()).await?;
        }
        insert.end().await?;

        tracing::trace!(table = %self.table, rows = records.len(), "insert complete");
        Ok(())
    }
}
