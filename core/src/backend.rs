//! sqlx 后端
//!
//! - `Execute` 为 `sqlx::Pool<DB>` 实现，MySQL 与 SQLite 报告自增 ID，PostgreSQL 不报告
//! - `SqlxRows` 是一次性取回的结果集上的 `Cursor`，通过 `FetchRows::fetch_rows` 构建
//!
//! 每个数据库后端由对应的 feature 开启（`mysql` / `postgres` / `sqlite`）。

use crate::error::{Result, RowbindError};
#[cfg(any(feature = "mysql", feature = "postgres", feature = "sqlite"))]
use crate::executor::{Cursor, ExecOutcome, Execute};
#[cfg(any(feature = "mysql", feature = "postgres", feature = "sqlite"))]
use crate::mutation::Statement;
use crate::value::{Value, ValueKind};
use async_trait::async_trait;
#[cfg(any(feature = "mysql", feature = "postgres", feature = "sqlite"))]
use chrono::{DateTime, Utc};
use sqlx::{Column, Row};

/// NULL 绑定时使用的类型，未知时按文本绑定
#[cfg(any(feature = "mysql", feature = "postgres", feature = "sqlite"))]
fn null_kind(kind: Option<ValueKind>) -> ValueKind {
    kind.unwrap_or(ValueKind::String)
}

/// 将单个 `Value` 绑定到查询上
///
/// NULL 按 `$kind` 绑定为对应类型的 `None`，PostgreSQL 会校验参数类型与列类型是否一致
macro_rules! bind_value {
    ($query:expr, $value:expr, $kind:expr) => {
        match $value {
            Value::Null => match null_kind($kind) {
                ValueKind::Int64 => $query.bind(Option::<i64>::None),
                ValueKind::Float64 => $query.bind(Option::<f64>::None),
                ValueKind::Bool => $query.bind(Option::<bool>::None),
                ValueKind::String => $query.bind(Option::<String>::None),
                ValueKind::Timestamp => $query.bind(Option::<DateTime<Utc>>::None),
            },
            Value::Int64(v) => $query.bind(*v),
            Value::Float64(v) => $query.bind(*v),
            Value::Bool(v) => $query.bind(*v),
            Value::String(v) => $query.bind(v.clone()),
            Value::Timestamp(v) => $query.bind(*v),
        }
    };
}

/// 已取回的结果集
///
/// 列名取自第一行，空结果集没有列。
pub struct SqlxRows<R> {
    columns: Vec<String>,
    rows: std::vec::IntoIter<R>,
    current: Option<R>,
    closed: bool,
}

impl<R: Row> SqlxRows<R> {
    pub fn new(rows: Vec<R>) -> Self {
        let columns = rows
            .first()
            .map(|row| {
                row.columns()
                    .iter()
                    .map(|column| column.name().to_string())
                    .collect()
            })
            .unwrap_or_default();
        Self {
            columns,
            rows: rows.into_iter(),
            current: None,
            closed: false,
        }
    }

    /// 尚未读取的行数
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn step(&mut self) -> Result<bool> {
        if self.closed {
            return Err(RowbindError::Precondition("cursor is closed".to_string()));
        }
        self.current = self.rows.next();
        Ok(self.current.is_some())
    }

    fn current_row(&self) -> Result<&R> {
        self.current
            .as_ref()
            .ok_or_else(|| RowbindError::Precondition("no current row".to_string()))
    }

    fn release(&mut self) {
        self.closed = true;
        self.current = None;
        self.rows = Vec::new().into_iter();
    }
}

/// 查询并取回全部行
#[async_trait]
pub trait FetchRows: Send + Sync {
    type Row: Row;

    async fn fetch_rows(&self, sql: &str, binds: &[Value]) -> Result<SqlxRows<Self::Row>>;
}

/// 按期望类型解码一列，SQL NULL 解码为 `Value::Null`
///
/// 整数列依次尝试 i64 / i32 / i16，浮点列依次尝试 f64 / f32，
/// 以兼容 PostgreSQL 这类严格区分列宽的后端。
/// 浮点字段读到整数列时按 i64 读取后转换；文本字段读到数值列时格式化为文本。
#[cfg(any(feature = "mysql", feature = "postgres", feature = "sqlite"))]
fn decode_column<'r, R>(row: &'r R, index: usize, kind: ValueKind) -> Result<Value>
where
    R: Row,
    usize: sqlx::ColumnIndex<R>,
    i64: sqlx::Type<R::Database> + sqlx::Decode<'r, R::Database>,
    i32: sqlx::Type<R::Database> + sqlx::Decode<'r, R::Database>,
    i16: sqlx::Type<R::Database> + sqlx::Decode<'r, R::Database>,
    f64: sqlx::Type<R::Database> + sqlx::Decode<'r, R::Database>,
    f32: sqlx::Type<R::Database> + sqlx::Decode<'r, R::Database>,
    bool: sqlx::Type<R::Database> + sqlx::Decode<'r, R::Database>,
    String: sqlx::Type<R::Database> + sqlx::Decode<'r, R::Database>,
    DateTime<Utc>: sqlx::Type<R::Database> + sqlx::Decode<'r, R::Database>,
{
    let value = match kind {
        ValueKind::Int64 => {
            if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
                v.map(Value::Int64)
            } else if let Ok(v) = row.try_get::<Option<i32>, _>(index) {
                v.map(|v| Value::Int64(v.into()))
            } else {
                row.try_get::<Option<i16>, _>(index)?
                    .map(|v| Value::Int64(v.into()))
            }
        }
        ValueKind::Float64 => {
            if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
                v.map(Value::Float64)
            } else if let Ok(v) = row.try_get::<Option<f32>, _>(index) {
                v.map(|v| Value::Float64(v.into()))
            } else {
                row.try_get::<Option<i64>, _>(index)?
                    .map(|v| Value::Float64(v as f64))
            }
        }
        ValueKind::Bool => row.try_get::<Option<bool>, _>(index)?.map(Value::Bool),
        ValueKind::String => {
            if let Ok(v) = row.try_get::<Option<String>, _>(index) {
                v.map(Value::String)
            } else if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
                v.map(|v| Value::String(v.to_string()))
            } else {
                row.try_get::<Option<f64>, _>(index)?
                    .map(|v| Value::String(v.to_string()))
            }
        }
        ValueKind::Timestamp => row
            .try_get::<Option<DateTime<Utc>>, _>(index)?
            .map(Value::Timestamp),
    };
    Ok(value.unwrap_or(Value::Null))
}

/// 为一个数据库后端实现 `Execute`、`FetchRows` 与 `Cursor`
macro_rules! impl_backend {
    ($db:ty, $row:ty, |$result:ident| $generated_id:expr) => {
        #[async_trait]
        impl Execute for sqlx::Pool<$db> {
            async fn execute(&self, sql: &str, binds: &[Value]) -> Result<ExecOutcome> {
                let mut query = sqlx::query::<$db>(sql);
                for value in binds {
                    query = bind_value!(query, value, value.kind());
                }
                let $result = query.execute(self).await?;
                Ok(ExecOutcome::new($result.rows_affected(), $generated_id))
            }

            async fn execute_statement(&self, statement: &Statement) -> Result<ExecOutcome> {
                let mut query = sqlx::query::<$db>(&statement.sql);
                for (index, value) in statement.binds.iter().enumerate() {
                    query = bind_value!(query, value, statement.kinds.get(index).copied());
                }
                let $result = query.execute(self).await?;
                Ok(ExecOutcome::new($result.rows_affected(), $generated_id))
            }
        }

        #[async_trait]
        impl FetchRows for sqlx::Pool<$db> {
            type Row = $row;

            async fn fetch_rows(&self, sql: &str, binds: &[Value]) -> Result<SqlxRows<$row>> {
                let mut query = sqlx::query::<$db>(sql);
                for value in binds {
                    query = bind_value!(query, value, value.kind());
                }
                let rows = query.fetch_all(self).await?;
                tracing::trace!(rows = rows.len(), "rows fetched");
                Ok(SqlxRows::new(rows))
            }
        }

        #[async_trait]
        impl Cursor for SqlxRows<$row> {
            async fn advance(&mut self) -> Result<bool> {
                self.step()
            }

            fn columns(&self) -> Result<Vec<String>> {
                Ok(self.columns.clone())
            }

            fn read_row(&mut self, reads: &[Option<ValueKind>]) -> Result<Vec<Value>> {
                let row = self.current_row()?;
                reads
                    .iter()
                    .enumerate()
                    .map(|(index, read)| match read {
                        Some(kind) => decode_column(row, index, *kind),
                        None => Ok(Value::Null),
                    })
                    .collect()
            }

            async fn close(&mut self) -> Result<()> {
                self.release();
                Ok(())
            }
        }
    };
}

// ========== MySQL ==========

#[cfg(feature = "mysql")]
impl_backend!(sqlx::MySql, sqlx::mysql::MySqlRow, |result| Some(
    result.last_insert_id() as i64
));

// ========== PostgreSQL ==========

// PostgreSQL 没有 last_insert_id，需要自增 ID 时应使用 RETURNING 查询
#[cfg(feature = "postgres")]
impl_backend!(sqlx::Postgres, sqlx::postgres::PgRow, |_result| None);

// ========== SQLite ==========

#[cfg(feature = "sqlite")]
impl_backend!(sqlx::Sqlite, sqlx::sqlite::SqliteRow, |result| Some(
    result.last_insert_rowid()
));

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_execute_reports_rowid() {
        let pool = memory_pool().await;
        pool.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)", &[])
            .await
            .unwrap();
        let outcome = pool
            .execute("INSERT INTO t (name) VALUES (?)", &[Value::from("a")])
            .await
            .unwrap();
        assert_eq!(outcome.rows_affected, 1);
        assert_eq!(outcome.last_insert_id().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rows_cursor() {
        let pool = memory_pool().await;
        pool.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT, score REAL)", &[])
            .await
            .unwrap();
        pool.execute(
            "INSERT INTO t (name, score) VALUES (?, ?), (?, ?)",
            &[
                Value::from("a"),
                Value::Float64(1.5),
                Value::Null,
                Value::Null,
            ],
        )
        .await
        .unwrap();

        let mut rows = pool
            .fetch_rows("SELECT id, name, score FROM t ORDER BY id", &[])
            .await
            .unwrap();
        assert_eq!(rows.columns().unwrap(), vec!["id", "name", "score"]);
        assert_eq!(rows.remaining(), 2);

        let reads = [
            Some(ValueKind::Int64),
            Some(ValueKind::String),
            Some(ValueKind::Float64),
        ];
        assert!(rows.advance().await.unwrap());
        assert_eq!(
            rows.read_row(&reads).unwrap(),
            vec![Value::Int64(1), Value::from("a"), Value::Float64(1.5)]
        );
        assert!(rows.advance().await.unwrap());
        assert_eq!(
            rows.read_row(&[Some(ValueKind::Int64), None, Some(ValueKind::Float64)])
                .unwrap(),
            vec![Value::Int64(2), Value::Null, Value::Null]
        );
        assert!(!rows.advance().await.unwrap());

        rows.close().await.unwrap();
        assert!(rows.is_closed());
        assert!(rows.advance().await.is_err());
    }

    #[test]
    fn test_null_kind() {
        for kind in [
            ValueKind::Int64,
            ValueKind::Float64,
            ValueKind::Bool,
            ValueKind::String,
            ValueKind::Timestamp,
        ] {
            assert_eq!(null_kind(Some(kind)), kind);
        }
        assert_eq!(null_kind(None), ValueKind::String);
    }

    #[tokio::test]
    async fn test_execute_statement_binds_typed_nulls() {
        let pool = memory_pool().await;
        pool.execute(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, age INTEGER, score REAL, at TEXT)",
            &[],
        )
        .await
        .unwrap();
        let statement = Statement {
            sql: "INSERT INTO t (age, score, at) VALUES (?, ?, ?)".to_string(),
            binds: vec![Value::Null, Value::Null, Value::Null],
            kinds: vec![ValueKind::Int64, ValueKind::Float64, ValueKind::Timestamp],
        };
        let outcome = pool.execute_statement(&statement).await.unwrap();
        assert_eq!(outcome.last_insert_id().unwrap(), 1);

        let mut rows = pool
            .fetch_rows("SELECT typeof(age), typeof(score), typeof(at) FROM t", &[])
            .await
            .unwrap();
        assert!(rows.advance().await.unwrap());
        assert_eq!(
            rows.read_row(&[Some(ValueKind::String); 3]).unwrap(),
            vec![Value::from("null"); 3]
        );
    }

    #[tokio::test]
    async fn test_numeric_columns_widen_to_requested_kind() {
        let pool = memory_pool().await;
        pool.execute("CREATE TABLE s (total NUMERIC, label TEXT)", &[])
            .await
            .unwrap();
        pool.execute(
            "INSERT INTO s (total, label) VALUES (?, ?)",
            &[Value::Float64(10.0), Value::Null],
        )
        .await
        .unwrap();

        // NUMERIC 列把 10.0 存为整数
        let mut rows = pool
            .fetch_rows("SELECT total, label FROM s", &[])
            .await
            .unwrap();
        assert!(rows.advance().await.unwrap());
        assert_eq!(
            rows.read_row(&[Some(ValueKind::Float64), Some(ValueKind::String)])
                .unwrap(),
            vec![Value::Float64(10.0), Value::Null]
        );

        let mut rows = pool
            .fetch_rows("SELECT 7 AS label, 2.5 AS ratio", &[])
            .await
            .unwrap();
        assert!(rows.advance().await.unwrap());
        assert_eq!(
            rows.read_row(&[Some(ValueKind::String), Some(ValueKind::String)])
                .unwrap(),
            vec![Value::from("7"), Value::from("2.5")]
        );
    }

    #[tokio::test]
    async fn test_empty_result_has_no_columns() {
        let pool = memory_pool().await;
        pool.execute("CREATE TABLE t (id INTEGER PRIMARY KEY)", &[])
            .await
            .unwrap();
        let mut rows = pool.fetch_rows("SELECT id FROM t", &[]).await.unwrap();
        assert!(rows.columns().unwrap().is_empty());
        assert!(!rows.advance().await.unwrap());
    }
}
