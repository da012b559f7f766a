//! 单元测试使用的手写记录类型

use crate::error::Result;
use crate::meta::{resolve, FieldDescriptor, MetaCell, Record, RecordMeta};
use crate::value::SqlField;
use chrono::{DateTime, Utc};
use std::sync::OnceLock;

macro_rules! column {
    ($record:ty, $field:ident: $ty:ty => $column:literal) => {
        FieldDescriptor::new(
            $column,
            stringify!($field),
            <$ty as SqlField>::STORAGE,
            |record: &$record| SqlField::to_value(&record.$field),
            |record: &mut $record, value| SqlField::assign(&mut record.$field, value),
        )
    };
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub age: Option<i32>,
}

impl Record for Person {
    fn metadata() -> Result<&'static RecordMeta<Self>> {
        static META: MetaCell<Person> = OnceLock::new();
        resolve(&META, "Person", || {
            vec![
                column!(Person, id: i64 => "id").read_only(),
                column!(Person, name: String => "name"),
                column!(Person, age: Option<i32> => "age"),
            ]
        })
    }
}

/// 覆盖全部字段宽度与 unix 时间的记录
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Account {
    pub id: i64,
    pub owner: String,
    pub tiny: Option<i8>,
    pub small: Option<i16>,
    pub big: Option<i64>,
    pub ratio: Option<f32>,
    pub balance: f64,
    pub verified: Option<bool>,
    pub note: Option<String>,
    pub created: DateTime<Utc>,
    pub closed: Option<DateTime<Utc>>,
    pub version: i32,
}

impl Record for Account {
    fn metadata() -> Result<&'static RecordMeta<Self>> {
        static META: MetaCell<Account> = OnceLock::new();
        resolve(&META, "Account", || {
            vec![
                column!(Account, id: i64 => "id"),
                column!(Account, owner: String => "owner"),
                column!(Account, tiny: Option<i8> => "tiny"),
                column!(Account, small: Option<i16> => "small"),
                column!(Account, big: Option<i64> => "big"),
                column!(Account, ratio: Option<f32> => "ratio"),
                column!(Account, balance: f64 => "balance"),
                column!(Account, verified: Option<bool> => "verified"),
                column!(Account, note: Option<String> => "note"),
                column!(Account, created: DateTime<Utc> => "created_at").unix(),
                column!(Account, closed: Option<DateTime<Utc>> => "closed_at").unix(),
                column!(Account, version: i32 => "version").read_only(),
            ]
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Left {
    pub x: i64,
    pub label: Option<String>,
}

impl Record for Left {
    fn metadata() -> Result<&'static RecordMeta<Self>> {
        static META: MetaCell<Left> = OnceLock::new();
        resolve(&META, "Left", || {
            vec![
                column!(Left, x: i64 => "x"),
                column!(Left, label: Option<String> => "label"),
            ]
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Right {
    pub x: i64,
    pub label: Option<String>,
}

impl Record for Right {
    fn metadata() -> Result<&'static RecordMeta<Self>> {
        static META: MetaCell<Right> = OnceLock::new();
        resolve(&META, "Right", || {
            vec![
                column!(Right, x: i64 => "x"),
                column!(Right, label: Option<String> => "label"),
            ]
        })
    }
}

/// 两个字段映射到同一列，元数据解析失败
#[derive(Debug, Default)]
pub struct Clash {
    pub a: i64,
    pub b: i64,
}

impl Record for Clash {
    fn metadata() -> Result<&'static RecordMeta<Self>> {
        static META: MetaCell<Clash> = OnceLock::new();
        resolve(&META, "Clash", || {
            vec![
                column!(Clash, a: i64 => "x"),
                column!(Clash, b: i64 => "x"),
            ]
        })
    }
}
