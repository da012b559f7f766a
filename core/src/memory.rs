//! 内存游标：在已经取回的行上实现 `Cursor`

use crate::error::{Result, RowbindError};
use crate::executor::Cursor;
use crate::value::{Value, ValueKind};
use async_trait::async_trait;
use std::collections::VecDeque;

#[derive(Debug, Clone, Default)]
pub struct MemoryCursor {
    columns: Vec<String>,
    rows: VecDeque<Vec<Value>>,
    current: Option<Vec<Value>>,
    closed: bool,
}

impl MemoryCursor {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// 追加一行（可链式调用）
    pub fn row<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_row(values);
        self
    }

    pub fn push_row<I, V>(&mut self, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.rows
            .push_back(values.into_iter().map(Into::into).collect());
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// 尚未读取的行数
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

#[async_trait]
impl Cursor for MemoryCursor {
    async fn advance(&mut self) -> Result<bool> {
        if self.closed {
            return Err(RowbindError::Precondition("cursor is closed".to_string()));
        }
        self.current = self.rows.pop_front();
        Ok(self.current.is_some())
    }

    fn columns(&self) -> Result<Vec<String>> {
        Ok(self.columns.clone())
    }

    fn read_row(&mut self, reads: &[Option<ValueKind>]) -> Result<Vec<Value>> {
        let row = self
            .current
            .as_ref()
            .ok_or_else(|| RowbindError::Precondition("no current row".to_string()))?;
        if row.len() != self.columns.len() || reads.len() != self.columns.len() {
            return Err(RowbindError::Precondition(format!(
                "row has {} values for {} columns ({} reads requested)",
                row.len(),
                self.columns.len(),
                reads.len()
            )));
        }
        Ok(row
            .iter()
            .zip(reads)
            .map(|(value, read)| match read {
                Some(_) => value.clone(),
                None => Value::Null,
            })
            .collect())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.current = None;
        self.rows.clear();
        Ok(())
    }
}
