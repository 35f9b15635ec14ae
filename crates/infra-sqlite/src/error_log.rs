// SQLite ErrorLog Implementation (survives restarts)

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use jobsync_core::domain::TaskKind;
use jobsync_core::error::Result;
use jobsync_core::port::{ErrorLog, ErrorLogEntry};
use sqlx::SqlitePool;

/// Bounded error log table, trimmed to `capacity` rows on every append
pub struct SqliteErrorLog {
    pool: SqlitePool,
    capacity: i64,
}

impl SqliteErrorLog {
    pub fn new(pool: SqlitePool, capacity: usize) -> Self {
        Self {
            pool,
            capacity: capacity.max(1) as i64,
        }
    }
}

#[async_trait]
impl ErrorLog for SqliteErrorLog {
    async fn record(&self, entry: ErrorLogEntry) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("INSERT INTO error_log (timestamp, task, source, message) VALUES (?, ?, ?, ?)")
            .bind(entry.timestamp)
            .bind(entry.task.as_str())
            .bind(&entry.source)
            .bind(&entry.message)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            DELETE FROM error_log
            WHERE seq NOT IN (SELECT seq FROM error_log ORDER BY seq DESC LIMIT ?)
            "#,
        )
        .bind(self.capacity)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ErrorLogEntry>> {
        let rows: Vec<(i64, String, Option<String>, String)> = sqlx::query_as(
            "SELECT timestamp, task, source, message FROM error_log ORDER BY seq DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|(timestamp, task, source, message)| -> Result<ErrorLogEntry> {
                let task: TaskKind = task.parse()?;
                Ok(ErrorLogEntry {
                    timestamp,
                    task,
                    source,
                    message,
                })
            })
            .collect()
    }

    async fn prune_older_than(&self, cutoff: i64) -> Result<usize> {
        let result = sqlx::query("DELETE FROM error_log WHERE timestamp < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() as usize)
    }

    async fn len(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM error_log")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(count as usize)
    }
}
