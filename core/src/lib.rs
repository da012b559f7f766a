pub mod backend;
pub mod batch;
pub mod config;
pub mod crud;
pub mod error;
pub mod executor;
pub mod memory;
pub mod meta;
pub mod mutation;
pub mod scan;
pub mod value;

#[cfg(test)]
mod test_fixtures;

pub use backend::{FetchRows, SqlxRows};
pub use batch::scan_all;
pub use config::{dollar_numbered, question_mark, Config, DbDriver, PlaceholderFn};
pub use crud::{Crud, Id};
pub use executor::{Cursor, ExecOutcome, Execute};
pub use memory::MemoryCursor;
pub use meta::{FieldDescriptor, FieldInfo, Record, RecordMeta, Table};
pub use mutation::{Mapper, Statement};
pub use scan::{scan, ScanArg, ScanRecord};
pub use value::{SqlField, SqlScalar, Storage, Value, ValueKind};

// 重新导出 derive 的所有公共 API（宏）
pub use error::{Result, RowbindError};
pub use rowbind_derive::*;
