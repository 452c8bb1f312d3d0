use async_trait::async_trait;
use tracing::debug;

use crate::config::Mode;
use crate::error::Result;
use crate::history::store::HistoryStore;
use crate::types::HistoryEntry;

/// SQLite-backed history. The table is fixed for the lifetime of the store.
pub struct SqliteHistoryStore {
    pool: sqlx::SqlitePool,
    table: &'static str,
    insert_sql: String,
    scan_sql: String,
}

impl SqliteHistoryStore {
    pub fn new(pool: sqlx::SqlitePool, mode: Mode) -> Self {
        let table = mode.history_table();
        Self {
            pool,
            table,
            insert_sql: format!(
                "INSERT INTO {table} (id, input_context, generated_output) VALUES (?, ?, ?)"
            ),
            scan_sql: format!("SELECT id, input_context, generated_output FROM {table}"),
        }
    }

    pub fn table(&self) -> &'static str {
        self.table
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn append(&self, entry: &HistoryEntry) -> Result<()> {
        sqlx::query(&self.insert_sql)
            .bind(entry.id)
            .bind(&entry.input_context)
            .bind(&entry.generated_output)
            .execute(&self.pool)
            .await?;
        debug!("Appended history entry {} to {}", entry.id, self.table);
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<HistoryEntry>> {
        let rows = sqlx::query_as::<_, HistoryEntry>(&self.scan_sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> sqlx::SqlitePool {
        // One connection: every `sqlite::memory:` connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn entry(id: i64) -> HistoryEntry {
        HistoryEntry {
            id,
            input_context: format!("forecast {id}"),
            generated_output: format!("summary {id}"),
        }
    }

    #[tokio::test]
    async fn append_then_read_recent_windows_by_id() {
        let store = SqliteHistoryStore::new(memory_pool().await, Mode::Dev);
        for id in [5_000, 1_000, 9_000, 3_000, 7_000] {
            store.append(&entry(id)).await.unwrap();
        }

        let recent = store.read_recent(3).await.unwrap();
        let ids: Vec<i64> = recent.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![5_000, 7_000, 9_000]);
        assert_eq!(recent[0].input_context, "forecast 5000");
        assert_eq!(recent[0].generated_output, "summary 5000");
    }

    #[tokio::test]
    async fn repeated_reads_are_identical() {
        let store = SqliteHistoryStore::new(memory_pool().await, Mode::Prod);
        for id in 1..=9 {
            store.append(&entry(id)).await.unwrap();
        }

        let first = store.read_recent(7).await.unwrap();
        let second = store.read_recent(7).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 7);
    }

    #[tokio::test]
    async fn dev_and_prod_tables_are_isolated() {
        let pool = memory_pool().await;
        let dev = SqliteHistoryStore::new(pool.clone(), Mode::Dev);
        let prod = SqliteHistoryStore::new(pool, Mode::Prod);

        dev.append(&entry(1)).await.unwrap();

        assert_eq!(dev.scan().await.unwrap().len(), 1);
        assert!(prod.scan().await.unwrap().is_empty());
        assert_eq!(prod.table(), "history_prod");
    }

    #[tokio::test]
    async fn colliding_ids_are_both_kept() {
        let store = SqliteHistoryStore::new(memory_pool().await, Mode::Dev);
        store.append(&entry(42)).await.unwrap();
        store.append(&entry(42)).await.unwrap();

        assert_eq!(store.scan().await.unwrap().len(), 2);
    }
}
