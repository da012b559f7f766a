//! 值模型
//!
//! `Value` 同时用于绑定参数、读取结果行以及可空字段的中转（nullable holder）。
//! 整数统一以 `Int64` 传输，浮点统一以 `Float64` 传输，写回字段时再按字段声明的宽度转换。

use crate::error::{Result, RowbindError};
use chrono::{DateTime, Utc};

/// 绑定值 / 行值
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int64(i64),
    Float64(f64),
    Bool(bool),
    String(String),
    Timestamp(DateTime<Utc>),
}

/// 读取一列时期望的值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int64,
    Float64,
    Bool,
    String,
    Timestamp,
}

impl Value {
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Null => None,
            Value::Int64(_) => Some(ValueKind::Int64),
            Value::Float64(_) => Some(ValueKind::Float64),
            Value::Bool(_) => Some(ValueKind::Bool),
            Value::String(_) => Some(ValueKind::String),
            Value::Timestamp(_) => Some(ValueKind::Timestamp),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// 是否为零值（NULL、0、空字符串、false、Unix 纪元）
    ///
    /// 用于判断主键是否已设置
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Int64(v) => *v == 0,
            Value::Float64(v) => *v == 0.0,
            Value::Bool(v) => !*v,
            Value::String(v) => v.is_empty(),
            Value::Timestamp(v) => v.timestamp() == 0 && v.timestamp_subsec_nanos() == 0,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Int64(_) => "Int64",
            Value::Float64(_) => "Float64",
            Value::Bool(_) => "Bool",
            Value::String(_) => "String",
            Value::Timestamp(_) => "Timestamp",
        }
    }

    /// 时间值转换为 Unix 秒，其余值原样返回
    pub fn into_unix(self) -> Value {
        match self {
            Value::Timestamp(t) => Value::Int64(t.timestamp()),
            other => other,
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int64(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int64(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float64(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Timestamp(t)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// 字段的存储形态：标量类型 + 是否为 `Option`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Storage {
    pub kind: ValueKind,
    pub optional: bool,
}

impl Storage {
    pub const fn scalar(kind: ValueKind) -> Self {
        Self {
            kind,
            optional: false,
        }
    }

    pub const fn optional(kind: ValueKind) -> Self {
        Self {
            kind,
            optional: true,
        }
    }

    /// 是否需要经由 nullable holder 读取
    ///
    /// 只有整数、浮点、布尔、字符串四类 `Option` 字段走 holder；
    /// `Option<DateTime>` 与非 `Option` 字段直接写回。
    pub fn uses_holder(&self) -> bool {
        self.optional && self.kind != ValueKind::Timestamp
    }
}

fn mismatch(expected: &'static str, found: &Value) -> RowbindError {
    RowbindError::Conversion {
        column: String::new(),
        expected,
        found: found.type_name(),
    }
}

/// 可映射的标量类型
pub trait SqlScalar: Sized {
    const KIND: ValueKind;

    fn to_value(&self) -> Value;

    /// 精确转换：类型不符、NULL 或超出范围时报错
    fn from_value(value: Value) -> Result<Self>;

    /// holder 回填时的转换，整数与浮点按目标宽度截断
    fn narrow(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

macro_rules! impl_int_scalar {
    ($($ty:ty),*) => {
        $(
            impl SqlScalar for $ty {
                const KIND: ValueKind = ValueKind::Int64;

                fn to_value(&self) -> Value {
                    Value::Int64(*self as i64)
                }

                fn from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::Int64(v) => <$ty>::try_from(v).map_err(|_| RowbindError::Conversion {
                            column: String::new(),
                            expected: stringify!($ty),
                            found: "out-of-range Int64",
                        }),
                        Value::Bool(b) => Ok(b as $ty),
                        other => Err(mismatch(stringify!($ty), &other)),
                    }
                }

                fn narrow(value: Value) -> Result<Self> {
                    match value {
                        Value::Int64(v) => Ok(v as $ty),
                        other => Self::from_value(other),
                    }
                }
            }
        )*
    };
}

impl_int_scalar!(i8, i16, i32, i64);

macro_rules! impl_float_scalar {
    ($($ty:ty),*) => {
        $(
            impl SqlScalar for $ty {
                const KIND: ValueKind = ValueKind::Float64;

                fn to_value(&self) -> Value {
                    Value::Float64(*self as f64)
                }

                fn from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::Float64(v) => Ok(v as $ty),
                        Value::Int64(v) => Ok(v as $ty),
                        other => Err(mismatch(stringify!($ty), &other)),
                    }
                }
            }
        )*
    };
}

impl_float_scalar!(f32, f64);

impl SqlScalar for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            // MySQL / SQLite 以整数存储布尔值
            Value::Int64(0) => Ok(false),
            Value::Int64(1) => Ok(true),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl SqlScalar for String {
    const KIND: ValueKind = ValueKind::String;

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(mismatch("String", &other)),
        }
    }
}

impl SqlScalar for DateTime<Utc> {
    const KIND: ValueKind = ValueKind::Timestamp;

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Timestamp(t) => Ok(t),
            // unix 字段以秒读取
            Value::Int64(secs) => DateTime::from_timestamp(secs, 0).ok_or_else(|| {
                RowbindError::Conversion {
                    column: String::new(),
                    expected: "DateTime<Utc>",
                    found: "out-of-range Unix timestamp",
                }
            }),
            other => Err(mismatch("DateTime<Utc>", &other)),
        }
    }
}

/// 记录字段：标量或 `Option<标量>`
///
/// 由 derive(Record) 生成的字段描述符通过此 trait 读写字段
pub trait SqlField {
    const STORAGE: Storage;

    fn to_value(&self) -> Value;

    /// 将行中的值写入字段
    ///
    /// - 非 `Option` 字段：NULL 报错
    /// - `Option` 字段：NULL 置为 `None`，其余值按声明宽度窄化后置为 `Some`
    fn assign(&mut self, value: Value) -> Result<()>;
}

macro_rules! impl_sql_field {
    ($($ty:ty),*) => {
        $(
            impl SqlField for $ty {
                const STORAGE: Storage = Storage::scalar(<$ty as SqlScalar>::KIND);

                fn to_value(&self) -> Value {
                    SqlScalar::to_value(self)
                }

                fn assign(&mut self, value: Value) -> Result<()> {
                    *self = <$ty as SqlScalar>::from_value(value)?;
                    Ok(())
                }
            }

            impl SqlField for Option<$ty> {
                const STORAGE: Storage = Storage::optional(<$ty as SqlScalar>::KIND);

                fn to_value(&self) -> Value {
                    match self {
                        Some(v) => SqlScalar::to_value(v),
                        None => Value::Null,
                    }
                }

                fn assign(&mut self, value: Value) -> Result<()> {
                    *self = match value {
                        Value::Null => None,
                        other => Some(<$ty as SqlScalar>::narrow(other)?),
                    };
                    Ok(())
                }
            }
        )*
    };
}

impl_sql_field!(i8, i16, i32, i64, f32, f64, bool, String, DateTime<Utc>);
