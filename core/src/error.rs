use thiserror::Error;

#[derive(Debug, Error)]
pub enum RowbindError {
    #[error("Unsupported database URL: {0}")]
    UnsupportedDatabase(String),
    /// 记录类型无法映射（重复列名、没有可映射字段等）
    #[error("Metadata error: {0}")]
    Metadata(String),
    /// 调用方前置条件不满足
    #[error("Precondition failed: {0}")]
    Precondition(String),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    /// 后端无法返回自增 ID
    #[error("Backend did not report a generated id")]
    NoGeneratedId,
    /// 行中的值无法写入目标字段
    #[error("Cannot convert column `{column}`: expected {expected}, found {found}")]
    Conversion {
        column: String,
        expected: &'static str,
        found: &'static str,
    },
    /// 读取单行失败，附带本次尝试绑定的列名
    #[error("Row scan failed (columns: {columns:?}): {source}")]
    Scan {
        columns: Vec<String>,
        #[source]
        source: Box<RowbindError>,
    },
    #[error("Invalid config: {0}")]
    Config(#[from] serde_json::Error),
}

impl RowbindError {
    /// 是否为执行 / 游标层面的错误
    pub fn is_execution(&self) -> bool {
        matches!(
            self,
            RowbindError::DatabaseError(_) | RowbindError::NoGeneratedId | RowbindError::Scan { .. }
        )
    }

    /// 为转换错误补充列名
    pub(crate) fn in_column(self, column: &str) -> Self {
        match self {
            RowbindError::Conversion {
                expected, found, ..
            } => RowbindError::Conversion {
                column: column.to_string(),
                expected,
                found,
            },
            other => other,
        }
    }

    pub(crate) fn with_columns(self, columns: &[String]) -> Self {
        RowbindError::Scan {
            columns: columns.to_vec(),
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, RowbindError>;
