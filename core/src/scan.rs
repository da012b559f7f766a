//! 扫描绑定：把一行结果按列名写回一个或多个记录
//!
//! ```ignore
//! // SELECT u.*, o.id AS o_id, ... FROM users u JOIN orders o ...
//! let mut user = User::default();
//! let mut order = Order::default();
//! rowbind::scan!(&mut cursor, &mut user, "o_", &mut order)?;
//! ```
//!
//! 规则：
//!
//! - 字符串参数是下一个记录的列名前缀，只作用一次
//! - 多个记录映射到同一列时，先注册的生效，后面的被忽略
//! - 整数 / 浮点 / 布尔 / 字符串的 `Option` 字段经由 holder 读取，**不加前缀**
//! - 结果集与元数据中多出的列都被静默忽略
//! - holder 读到 NULL 时字段保持原值（不会被重置为 None），复用记录前需要自行清空

use crate::error::{Result, RowbindError};
use crate::executor::Cursor;
use crate::meta::{FieldInfo, Record};
use crate::value::{Value, ValueKind};
use std::collections::HashMap;

/// 可作为扫描目标的记录（对象安全，允许一次扫描多个不同类型）
pub trait ScanRecord {
    fn scan_fields(&self) -> Result<Vec<FieldInfo>>;

    /// 写入第 `index` 个字段（元数据中的位置）
    fn assign(&mut self, index: usize, value: Value) -> Result<()>;
}

impl<T: Record> ScanRecord for T {
    fn scan_fields(&self) -> Result<Vec<FieldInfo>> {
        Ok(T::metadata()?.fields().iter().map(|f| f.info()).collect())
    }

    fn assign(&mut self, index: usize, value: Value) -> Result<()> {
        let meta = T::metadata()?;
        let field = meta.fields().get(index).ok_or_else(|| {
            RowbindError::Metadata(format!(
                "{} has no field at position {}",
                meta.type_name(),
                index
            ))
        })?;
        field.assign(self, value)
    }
}

/// 扫描参数：列名前缀或记录
pub enum ScanArg<'a> {
    Prefix(&'a str),
    Record(&'a mut dyn ScanRecord),
}

impl<'a> From<&'a str> for ScanArg<'a> {
    fn from(prefix: &'a str) -> Self {
        ScanArg::Prefix(prefix)
    }
}

impl<'a, T: Record> From<&'a mut T> for ScanArg<'a> {
    fn from(record: &'a mut T) -> Self {
        ScanArg::Record(record)
    }
}

/// 简化多目标扫描的写法
///
/// `scan!(cursor, &mut a, "b_", &mut b)` 等价于
/// `scan(cursor, [ScanArg::from(&mut a), ScanArg::from("b_"), ScanArg::from(&mut b)])`
#[macro_export]
macro_rules! scan {
    ($cursor:expr, $($arg:expr),+ $(,)?) => {
        $crate::scan::scan($cursor, [$($crate::scan::ScanArg::from($arg)),+])
    };
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Field {
        record: usize,
        field: usize,
        kind: ValueKind,
    },
    Holder(usize),
}

struct Holder {
    record: usize,
    field: usize,
    kind: ValueKind,
    value: Value,
}

/// 读取游标当前行并写回到参数中的记录
pub fn scan<'a, C, I>(cursor: &mut C, args: I) -> Result<()>
where
    C: Cursor + ?Sized,
    I: IntoIterator<Item = ScanArg<'a>>,
{
    let mut prefix: &'a str = "";
    let mut records: Vec<&'a mut dyn ScanRecord> = Vec::new();
    let mut targets: HashMap<String, Target> = HashMap::new();
    let mut holders: Vec<Holder> = Vec::new();

    for arg in args {
        let record = match arg {
            ScanArg::Prefix(p) => {
                prefix = p;
                continue;
            }
            ScanArg::Record(record) => record,
        };

        let index = records.len();
        for (field, info) in record.scan_fields()?.into_iter().enumerate() {
            let kind = info.read_kind();
            if info.storage.uses_holder() {
                let holder = holders.len();
                holders.push(Holder {
                    record: index,
                    field,
                    kind,
                    value: Value::Null,
                });
                targets
                    .entry(info.column.to_string())
                    .or_insert(Target::Holder(holder));
            } else {
                targets
                    .entry(format!("{}{}", prefix, info.column))
                    .or_insert(Target::Field {
                        record: index,
                        field,
                        kind,
                    });
            }
        }

        records.push(record);
        prefix = "";
    }

    tracing::trace!(
        records = records.len(),
        targets = targets.len(),
        holders = holders.len(),
        "scan targets registered"
    );

    let columns = cursor.columns()?;
    let reads: Vec<Option<ValueKind>> = columns
        .iter()
        .map(|column| {
            targets.get(column).map(|target| match *target {
                Target::Field { kind, .. } => kind,
                Target::Holder(h) => holders[h].kind,
            })
        })
        .collect();

    write_row(cursor, &columns, &reads, &targets, &mut records, holders).map_err(|e| {
        tracing::debug!(columns = ?columns, error = %e, "row scan failed");
        e.with_columns(&columns)
    })
}

fn write_row<C: Cursor + ?Sized>(
    cursor: &mut C,
    columns: &[String],
    reads: &[Option<ValueKind>],
    targets: &HashMap<String, Target>,
    records: &mut [&mut dyn ScanRecord],
    mut holders: Vec<Holder>,
) -> Result<()> {
    let values = cursor.read_row(reads)?;
    if values.len() != columns.len() {
        return Err(RowbindError::Precondition(format!(
            "cursor returned {} values for {} columns",
            values.len(),
            columns.len()
        )));
    }

    for (column, value) in columns.iter().zip(values) {
        match targets.get(column) {
            Some(Target::Field { record, field, .. }) => {
                records[*record].assign(*field, value)?;
            }
            Some(Target::Holder(h)) => holders[*h].value = value,
            None => {}
        }
    }

    // holder 回填：NULL 不覆盖字段原值
    for holder in holders {
        if !holder.value.is_null() {
            records[holder.record].assign(holder.field, holder.value)?;
        }
    }
    Ok(())
}
