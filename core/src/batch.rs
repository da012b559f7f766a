//! 批量扫描
//!
//! `scan_all` 替代下面的手写循环：
//!
//! ```ignore
//! let mut users = Vec::new();
//! while cursor.advance().await? {
//!     let mut user = User::default();
//!     rowbind::scan!(&mut cursor, &mut user)?;
//!     users.push(user);
//! }
//! cursor.close().await?;
//! ```

use crate::error::Result;
use crate::executor::Cursor;
use crate::meta::Record;
use crate::scan::{scan, ScanArg};

/// 读取游标中的所有行，逐行追加到 `dest`
///
/// 游标在返回前总会被关闭（无论成功与否）。遇到第一个错误即停止，
/// 已经追加到 `dest` 的元素保留。
pub async fn scan_all<C, T>(mut cursor: C, dest: &mut Vec<T>) -> Result<()>
where
    C: Cursor,
    T: Record + Default,
{
    let collected = collect_rows(&mut cursor, dest).await;
    let closed = cursor.close().await;
    collected?;
    closed
}

async fn collect_rows<C, T>(cursor: &mut C, dest: &mut Vec<T>) -> Result<()>
where
    C: Cursor,
    T: Record + Default,
{
    while cursor.advance().await? {
        let mut item = T::default();
        scan(cursor, [ScanArg::from(&mut item)])?;
        dest.push(item);
    }
    tracing::trace!(rows = dest.len(), "scan_all finished");
    Ok(())
}
