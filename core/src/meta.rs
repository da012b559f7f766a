//! 记录元数据，由 derive(Record) 生成，也可以手写
//!
//! 每个记录类型的元数据只构建一次，缓存在类型私有的 `OnceLock` 中。

use crate::error::{Result, RowbindError};
use crate::value::{Storage, Value, ValueKind};
use std::collections::HashSet;
use std::sync::OnceLock;

/// 字段描述符：列名与记录字段之间的映射
pub struct FieldDescriptor<T> {
    /// 列名
    pub column: &'static str,
    /// Rust 字段名
    pub field: &'static str,
    /// 只读字段不参与 INSERT / UPDATE
    pub read_only: bool,
    /// 时间字段以 Unix 秒读写
    pub unix: bool,
    pub storage: Storage,
    pub get: fn(&T) -> Value,
    pub set: fn(&mut T, Value) -> Result<()>,
}

/// 去掉类型参数的字段信息，供扫描时跨类型使用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    pub column: &'static str,
    pub read_only: bool,
    pub unix: bool,
    pub storage: Storage,
}

impl FieldInfo {
    /// 读取该列时向游标请求的值类型
    pub fn read_kind(&self) -> ValueKind {
        if self.unix && self.storage.kind == ValueKind::Timestamp {
            ValueKind::Int64
        } else {
            self.storage.kind
        }
    }
}

impl<T> FieldDescriptor<T> {
    pub fn new(
        column: &'static str,
        field: &'static str,
        storage: Storage,
        get: fn(&T) -> Value,
        set: fn(&mut T, Value) -> Result<()>,
    ) -> Self {
        Self {
            column,
            field,
            read_only: false,
            unix: false,
            storage,
            get,
            set,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn unix(mut self) -> Self {
        self.unix = true;
        self
    }

    pub fn info(&self) -> FieldInfo {
        FieldInfo {
            column: self.column,
            read_only: self.read_only,
            unix: self.unix,
            storage: self.storage,
        }
    }

    /// 字段的原始值
    pub fn value_of(&self, record: &T) -> Value {
        (self.get)(record)
    }

    /// 绑定到语句时使用的值，unix 字段的时间转换为 Unix 秒
    pub fn bind_value(&self, record: &T) -> Value {
        let value = self.value_of(record);
        if self.unix {
            value.into_unix()
        } else {
            value
        }
    }

    pub fn assign(&self, record: &mut T, value: Value) -> Result<()> {
        (self.set)(record, value).map_err(|e| e.in_column(self.column))
    }
}

/// 记录类型的元数据
pub struct RecordMeta<T> {
    type_name: &'static str,
    fields: Vec<FieldDescriptor<T>>,
}

impl<T> RecordMeta<T> {
    pub fn new(type_name: &'static str, fields: Vec<FieldDescriptor<T>>) -> Result<Self> {
        Self::checked(type_name, fields).map_err(RowbindError::Metadata)
    }

    fn checked(
        type_name: &'static str,
        fields: Vec<FieldDescriptor<T>>,
    ) -> std::result::Result<Self, String> {
        if fields.is_empty() {
            return Err(format!("{} has no mapped columns", type_name));
        }
        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !seen.insert(field.column) {
                return Err(format!(
                    "{} maps column `{}` more than once",
                    type_name, field.column
                ));
            }
        }
        Ok(Self { type_name, fields })
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// 按声明顺序排列的字段
    pub fn fields(&self) -> &[FieldDescriptor<T>] {
        &self.fields
    }

    pub fn field(&self, column: &str) -> Option<&FieldDescriptor<T>> {
        self.fields.iter().find(|f| f.column == column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.column)
    }
}

/// 可映射的记录类型
///
/// 通常由 `#[derive(Record)]` 实现：
///
/// ```ignore
/// #[derive(Default, Record)]
/// struct User {
///     #[sql(readonly)]
///     id: i64,
///     name: String,
///     age: Option<i32>,
///     #[sql(column = "created_at", unix)]
///     created: chrono::DateTime<chrono::Utc>,
/// }
/// ```
pub trait Record: Sized + 'static {
    fn metadata() -> Result<&'static RecordMeta<Self>>;
}

/// 表信息，由 `#[derive(Table)]` 生成
pub trait Table {
    /// 表名
    const TABLE: &'static str;
    /// 主键列名
    const ID_COLUMN: &'static str;
}

/// 元数据缓存单元，每个记录类型一个 `static`
pub type MetaCell<T> = OnceLock<std::result::Result<RecordMeta<T>, String>>;

/// 首次调用时构建并校验元数据，之后返回缓存结果（包括缓存的错误）
pub fn resolve<T>(
    cell: &'static MetaCell<T>,
    type_name: &'static str,
    build: impl FnOnce() -> Vec<FieldDescriptor<T>>,
) -> Result<&'static RecordMeta<T>> {
    cell.get_or_init(|| RecordMeta::checked(type_name, build()))
        .as_ref()
        .map_err(|msg| RowbindError::Metadata(msg.clone()))
}
