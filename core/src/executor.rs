//! 执行器与游标 trait
//!
//! 映射层只依赖这两个接口；sqlx 连接池的实现见 `backend` 模块，
//! 内存游标见 `memory` 模块。

use crate::error::{Result, RowbindError};
use crate::mutation::Statement;
use crate::value::{Value, ValueKind};
use async_trait::async_trait;

/// 语句执行结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    /// 后端报告的自增 ID，不支持时为 None
    pub generated_id: Option<i64>,
}

impl ExecOutcome {
    pub fn new(rows_affected: u64, generated_id: Option<i64>) -> Self {
        Self {
            rows_affected,
            generated_id,
        }
    }

    pub fn last_insert_id(&self) -> Result<i64> {
        self.generated_id.ok_or(RowbindError::NoGeneratedId)
    }
}

/// 语句执行接口：SQL 文本 + 按位置排列的绑定值
///
/// 注意：此 trait 要求 `Send + Sync`，因为异步方法需要在不同线程之间传递 Future
#[async_trait]
pub trait Execute: Send + Sync {
    async fn execute(&self, sql: &str, binds: &[Value]) -> Result<ExecOutcome>;

    /// 执行映射器构建的语句
    ///
    /// 默认忽略 `statement.kinds` 直接调用 `execute`；需要按字段类型绑定 NULL 的后端应覆盖此方法。
    async fn execute_statement(&self, statement: &Statement) -> Result<ExecOutcome> {
        self.execute(&statement.sql, &statement.binds).await
    }
}

/// 结果集游标
///
/// 调用顺序：`advance` 返回 true 后，`read_row` 读取当前行；
/// `columns` 返回当前结果集的列名；`close` 释放游标。
#[async_trait]
pub trait Cursor: Send {
    /// 移动到下一行，没有更多行时返回 false
    async fn advance(&mut self) -> Result<bool>;

    fn columns(&self) -> Result<Vec<String>>;

    /// 按位置读取当前行
    ///
    /// `reads[i]` 为第 i 列期望的值类型，None 表示该列不需要（返回 `Value::Null` 即可）。
    /// 返回值的长度必须与列数一致，SQL NULL 以 `Value::Null` 表示。
    fn read_row(&mut self, reads: &[Option<ValueKind>]) -> Result<Vec<Value>>;

    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
impl<C: Cursor + ?Sized> Cursor for &mut C {
    async fn advance(&mut self) -> Result<bool> {
        (**self).advance().await
    }

    fn columns(&self) -> Result<Vec<String>> {
        (**self).columns()
    }

    fn read_row(&mut self, reads: &[Option<ValueKind>]) -> Result<Vec<Value>> {
        (**self).read_row(reads)
    }

    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }
}
