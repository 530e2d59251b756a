//! DuckDB storage over a single connection.

use async_trait::async_trait;
use duckdb::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::error::{MigrateError, Result};
use crate::storage::{QueryOutcome, Storage, StorageConfig, StorageFactory};

/// DuckDB connection parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuckdbParams {
    /// Database path (None for in-memory).
    #[serde(default, alias = "db_path", skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// DuckDB backend. All statements share one connection.
pub struct DuckdbStorage {
    conn: Arc<Mutex<Option<Connection>>>,
}

impl DuckdbStorage {
    /// Open the database at `params.path`, or an in-memory one.
    pub fn open(params: &DuckdbParams) -> Result<Self> {
        let conn = match params.path.as_deref() {
            Some(path) => Connection::open(path)
                .map_err(|e| MigrateError::Backend(format!("Failed to open database: {}", e)))?,
            None => Connection::open_in_memory().map_err(|e| {
                MigrateError::Backend(format!("Failed to create in-memory database: {}", e))
            })?,
        };

        tracing::info!(path = ?params.path, "Opened DuckDB connection");

        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        })
    }

    /// Open an in-memory database.
    pub fn in_memory() -> Result<Self> {
        Self::open(&DuckdbParams::default())
    }

    fn execute_blocking(
        conn: &Mutex<Option<Connection>>,
        sql: &str,
        values: &[serde_json::Value],
    ) -> Result<QueryOutcome> {
        let guard = conn
            .lock()
            .map_err(|e| MigrateError::Backend(format!("Failed to acquire connection lock: {}", e)))?;
        let conn = guard
            .as_ref()
            .ok_or_else(|| MigrateError::Backend("Connection is closed".to_string()))?;

        if values.is_empty() {
            conn.execute_batch(sql)?;
            return Ok(QueryOutcome::default());
        }

        let duckdb_params: Vec<Box<dyn duckdb::ToSql>> =
            values.iter().map(json_to_duckdb_param).collect();
        let param_refs: Vec<&dyn duckdb::ToSql> =
            duckdb_params.iter().map(|p| p.as_ref()).collect();

        let affected = conn.execute(sql, param_refs.as_slice())?;
        Ok(QueryOutcome {
            affected_rows: affected as u64,
        })
    }
}

#[async_trait]
impl Storage for DuckdbStorage {
    fn kind(&self) -> &'static str {
        "duckdb"
    }

    async fn query(&self, sql: &str, values: &[serde_json::Value]) -> Result<QueryOutcome> {
        // DuckDB is sync
        let conn = Arc::clone(&self.conn);
        let sql = sql.to_string();
        let values = values.to_vec();

        tokio::task::spawn_blocking(move || Self::execute_blocking(&conn, &sql, &values))
            .await
            .map_err(|e| MigrateError::Backend(format!("Task join error: {}", e)))?
    }

    async fn end(&self) {
        let conn = match self.conn.lock() {
            Ok(mut guard) => guard.take(),
            Err(e) => {
                tracing::warn!(error = %e, "DuckDB connection lock poisoned");
                return;
            }
        };

        if let Some(conn) = conn {
            if let Err((_, e)) = conn.close() {
                tracing::warn!(error = %e, "Failed to close DuckDB connection");
            }
        }
        tracing::debug!("DuckDB connection closed");
    }
}

/// Factory for the `duckdb` kind.
pub struct DuckdbFactory;

#[async_trait]
impl StorageFactory for DuckdbFactory {
    fn kind(&self) -> &'static str {
        "duckdb"
    }

    async fn connect(&self, config: &StorageConfig) -> Result<Box<dyn Storage>> {
        let params: DuckdbParams = config.parse_params()?;
        Ok(Box::new(DuckdbStorage::open(&params)?))
    }
}

/// Convert JSON value to DuckDB parameter.
fn json_to_duckdb_param(value: &serde_json::Value) -> Box<dyn duckdb::ToSql> {
    match value {
        serde_json::Value::Null => Box::new(Option::<String>::None),
        serde_json::Value::Bool(b) => Box::new(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Box::new(i)
            } else if let Some(f) = n.as_f64() {
                Box::new(f)
            } else {
                Box::new(n.to_string())
            }
        }
        serde_json::Value::String(s) => Box::new(s.clone()),
        _ => Box::new(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn count(storage: &DuckdbStorage, sql: &str) -> i64 {
        let guard = storage.conn.lock().unwrap();
        guard
            .as_ref()
            .unwrap()
            .query_row(sql, [], |row| row.get(0))
            .unwrap()
    }

    #[tokio::test]
    async fn test_batch_then_parameterized_insert() {
        let storage = DuckdbStorage::in_memory().unwrap();

        storage
            .query(
                "CREATE TABLE countries (code VARCHAR, name VARCHAR); \
                 CREATE TABLE flags (code VARCHAR);",
                &[],
            )
            .await
            .unwrap();

        let outcome = storage
            .query(
                "INSERT INTO countries (code, name) VALUES (?, ?)",
                &[json!("NZ"), json!("New Zealand")],
            )
            .await
            .unwrap();
        assert_eq!(outcome.affected_rows, 1);

        assert_eq!(count(&storage, "SELECT COUNT(*) FROM countries"), 1);
        assert_eq!(count(&storage, "SELECT COUNT(*) FROM flags"), 0);
    }

    #[tokio::test]
    async fn test_parameter_types() {
        let storage = DuckdbStorage::in_memory().unwrap();
        storage
            .query(
                "CREATE TABLE t (i INTEGER, f DOUBLE, b BOOLEAN, s VARCHAR, j VARCHAR, n INTEGER)",
                &[],
            )
            .await
            .unwrap();

        storage
            .query(
                "INSERT INTO t VALUES (?, ?, ?, ?, ?, ?)",
                &[
                    json!(7),
                    json!(1.5),
                    json!(true),
                    json!("NZ"),
                    json!({"a": 1}),
                    json!(null),
                ],
            )
            .await
            .unwrap();

        let guard = storage.conn.lock().unwrap();
        let row: (i64, f64, bool, String, String, Option<i64>) = guard
            .as_ref()
            .unwrap()
            .query_row("SELECT i, f, b, s, j, n FROM t", [], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?))
            })
            .unwrap();
        assert_eq!(
            row,
            (7, 1.5, true, "NZ".to_string(), r#"{"a":1}"#.to_string(), None)
        );
    }

    #[tokio::test]
    async fn test_query_error_is_backend_error() {
        let storage = DuckdbStorage::in_memory().unwrap();
        let result = storage.query("SELECT * FROM missing_table", &[]).await;
        assert!(matches!(result, Err(MigrateError::Backend(_))));
    }

    #[tokio::test]
    async fn test_query_after_end_fails() {
        let storage = DuckdbStorage::in_memory().unwrap();
        storage.end().await;

        let result = storage.query("SELECT 1", &[]).await;
        assert!(matches!(result, Err(MigrateError::Backend(msg)) if msg.contains("closed")));
    }

    #[tokio::test]
    async fn test_factory_from_config() {
        let factory = DuckdbFactory;
        let storage = factory.connect(&StorageConfig::new("duckdb")).await.unwrap();
        assert_eq!(storage.kind(), "duckdb");
        storage.end().await;
    }

    #[test]
    fn test_params_alias() {
        let config = StorageConfig::new("duckdb").with_param("db_path", json!("/tmp/app.duckdb"));
        let params: DuckdbParams = config.parse_params().unwrap();
        assert_eq!(params.path.as_deref(), Some("/tmp/app.duckdb"));
    }
}
