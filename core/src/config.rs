//! 映射配置
//!
//! 所有开关都通过 `Config` 显式传入 `Mapper`，没有进程级全局状态。

use crate::error::{Result, RowbindError};
use serde::Deserialize;

/// 占位符格式化函数，参数为从 1 开始的序号
pub type PlaceholderFn = fn(usize) -> String;

/// `?`，MySQL / SQLite 使用
pub fn question_mark(_ordinal: usize) -> String {
    "?".to_string()
}

/// `$1`, `$2`, ...，PostgreSQL 使用
pub fn dollar_numbered(ordinal: usize) -> String {
    format!("${}", ordinal)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbDriver {
    MySql,
    Postgres,
    Sqlite,
}

impl DbDriver {
    pub fn from_url(url: &str) -> Result<Self> {
        if url.starts_with("mysql://") || url.starts_with("mariadb://") {
            Ok(DbDriver::MySql)
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(DbDriver::Postgres)
        } else if url.starts_with("sqlite://") || url.starts_with("sqlite:") {
            Ok(DbDriver::Sqlite)
        } else {
            Err(RowbindError::UnsupportedDatabase(url.to_string()))
        }
    }

    pub fn placeholder_fn(&self) -> PlaceholderFn {
        match self {
            DbDriver::MySql | DbDriver::Sqlite => question_mark,
            DbDriver::Postgres => dollar_numbered,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// 关闭时 upsert 退化为 insert
    pub enable_upsert: bool,
    /// 后端无法返回自增 ID 时，insert / upsert 返回 0 而不是报错
    pub tolerate_missing_insert_id: bool,
    pub placeholder: PlaceholderFn,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_upsert: false,
            tolerate_missing_insert_id: false,
            placeholder: question_mark,
        }
    }
}

/// JSON 配置文件的形态
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    enable_upsert: bool,
    tolerate_missing_insert_id: bool,
    driver: Option<DbDriver>,
}

impl Config {
    /// 按驱动选择占位符风格，其余选项保持默认
    ///
    /// PostgreSQL 不报告自增 ID，而 `tolerate_missing_insert_id` 默认为 false，
    /// 此时 `insert` / `upsert` 会返回 `NoGeneratedId`。不需要 ID 时请加上
    /// `.with_tolerate_missing_insert_id(true)`，需要 ID 时改用 `RETURNING` 查询。
    pub fn for_driver(driver: DbDriver) -> Self {
        Self {
            placeholder: driver.placeholder_fn(),
            ..Self::default()
        }
    }

    pub fn from_url(url: &str) -> Result<Self> {
        Ok(Self::for_driver(DbDriver::from_url(url)?))
    }

    /// 从 JSON 读取配置
    ///
    /// ```ignore
    /// let config = Config::from_json(r#"{"enable_upsert": true, "driver": "postgres"}"#)?;
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(json)?;
        let base = match raw.driver {
            Some(driver) => Self::for_driver(driver),
            None => Self::default(),
        };
        Ok(Self {
            enable_upsert: raw.enable_upsert,
            tolerate_missing_insert_id: raw.tolerate_missing_insert_id,
            ..base
        })
    }

    pub fn with_upsert(mut self, enabled: bool) -> Self {
        self.enable_upsert = enabled;
        self
    }

    pub fn with_tolerate_missing_insert_id(mut self, tolerate: bool) -> Self {
        self.tolerate_missing_insert_id = tolerate;
        self
    }

    pub fn with_placeholder(mut self, placeholder: PlaceholderFn) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn placeholder(&self, ordinal: usize) -> String {
        (self.placeholder)(ordinal)
    }
}
