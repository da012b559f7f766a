//! 基于 `Table` 信息的便捷写操作
//!
//! ```ignore
//! #[derive(Default, Record, Table)]
//! #[table(name = "users")]
//! struct User { ... }
//!
//! let id = user.insert(&mapper, &pool).await?;
//! ```

use crate::error::Result;
use crate::executor::Execute;
use crate::meta::{Record, Table};
use crate::mutation::Mapper;
use async_trait::async_trait;

/// 主键 ID 类型
pub type Id = i64;

/// 为同时实现了 `Record` 与 `Table` 的类型提供写操作
#[async_trait]
pub trait Crud: Record + Table + Sync {
    /// 插入记录，返回自增 ID
    async fn insert<E>(&self, mapper: &Mapper, db: &E) -> Result<Id>
    where
        E: Execute + ?Sized,
    {
        mapper.insert(db, Self::TABLE, Self::ID_COLUMN, self).await
    }

    /// 按主键更新记录，返回受影响的行数
    async fn update<E>(&self, mapper: &Mapper, db: &E) -> Result<u64>
    where
        E: Execute + ?Sized,
    {
        mapper.update(db, Self::TABLE, Self::ID_COLUMN, self).await
    }

    /// 插入或在冲突时更新，返回自增 ID
    async fn upsert<E>(&self, mapper: &Mapper, db: &E) -> Result<Id>
    where
        E: Execute + ?Sized,
    {
        mapper.upsert(db, Self::TABLE, Self::ID_COLUMN, self).await
    }
}

impl<T: Record + Table + Sync> Crud for T {}
