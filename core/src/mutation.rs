//! 写操作：UPDATE / INSERT / UPSERT
//!
//! 列的顺序即元数据顺序（字段声明顺序），SQL 文本与绑定值顺序都是确定的。
//! 占位符序号在整条语句内连续递增，`?` 与 `$n` 两种风格都能直接使用。

use crate::config::Config;
use crate::error::{Result, RowbindError};
use crate::executor::{ExecOutcome, Execute};
use crate::meta::{FieldDescriptor, Record};
use crate::value::{Value, ValueKind};

/// 构建好的语句：SQL 文本 + 按位置排列的绑定值
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub binds: Vec<Value>,
    /// 与 `binds` 一一对应的字段类型，后端据此绑定带类型的 NULL
    pub kinds: Vec<ValueKind>,
}

/// 参与写入的列（非只读、非主键）及其占位符
struct Columns {
    names: Vec<&'static str>,
    placeholders: Vec<String>,
    binds: Vec<Value>,
    kinds: Vec<ValueKind>,
}

impl Columns {
    fn collect<T: Record>(
        config: &Config,
        fields: &[FieldDescriptor<T>],
        id_column: &str,
        record: &T,
    ) -> Self {
        let mut columns = Columns {
            names: Vec::new(),
            placeholders: Vec::new(),
            binds: Vec::new(),
            kinds: Vec::new(),
        };
        for field in fields
            .iter()
            .filter(|f| !f.read_only && f.column != id_column)
        {
            columns.names.push(field.column);
            columns
                .placeholders
                .push(config.placeholder(columns.binds.len() + 1));
            columns.binds.push(field.bind_value(record));
            columns.kinds.push(field.info().read_kind());
        }
        columns
    }

    fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// `c1 = p1, c2 = p2`，序号从 `first` 开始
    fn assignments(&self, config: &Config, first: usize) -> String {
        self.names
            .iter()
            .enumerate()
            .map(|(i, name)| format!("{} = {}", name, config.placeholder(first + i)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// 映射器：持有配置，负责构建并执行写语句
///
/// ```ignore
/// let mapper = Mapper::new(Config::for_driver(DbDriver::MySql).with_upsert(true));
/// let id = mapper.insert(&pool, "users", "id", &user).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Mapper {
    config: Config,
}

impl Mapper {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `UPDATE <table> SET c1 = ?, c2 = ? WHERE <id> = ?`
    ///
    /// 主键字段无论是否只读都会被读取；主键为零值（或不存在）时返回前置条件错误。
    pub fn build_update<T: Record>(
        &self,
        table: &str,
        id_column: &str,
        record: &T,
    ) -> Result<Statement> {
        let meta = T::metadata()?;
        let (id, id_kind) = meta
            .field(id_column)
            .map(|f| (f.bind_value(record), f.info().read_kind()))
            .unwrap_or((Value::Null, ValueKind::Int64));
        if id.is_zero() {
            return Err(RowbindError::Precondition(format!(
                "{} is 0 or not set, cannot update",
                id_column
            )));
        }

        let columns = Columns::collect(&self.config, meta.fields(), id_column, record);
        if columns.is_empty() {
            return Err(RowbindError::Precondition(format!(
                "{} has no updatable columns",
                meta.type_name()
            )));
        }

        let sql = format!(
            "UPDATE {} SET {} WHERE {} = {}",
            table,
            columns.assignments(&self.config, 1),
            id_column,
            self.config.placeholder(columns.binds.len() + 1)
        );
        let mut binds = columns.binds;
        binds.push(id);
        let mut kinds = columns.kinds;
        kinds.push(id_kind);
        Ok(Statement { sql, binds, kinds })
    }

    /// `INSERT INTO <table> (c1, c2) VALUES (?, ?)`，主键列不参与
    pub fn build_insert<T: Record>(
        &self,
        table: &str,
        id_column: &str,
        record: &T,
    ) -> Result<Statement> {
        let meta = T::metadata()?;
        let columns = Columns::collect(&self.config, meta.fields(), id_column, record);
        if columns.is_empty() {
            return Err(RowbindError::Precondition(format!(
                "{} has no insertable columns",
                meta.type_name()
            )));
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.names.join(", "),
            columns.placeholders.join(", ")
        );
        Ok(Statement {
            sql,
            binds: columns.binds,
            kinds: columns.kinds,
        })
    }

    /// `INSERT ... ON DUPLICATE KEY UPDATE c1 = ?, ...`
    ///
    /// 绑定值重复一次（插入部分 + 冲突更新部分）。未开启 `enable_upsert` 时等同于 `build_insert`。
    pub fn build_upsert<T: Record>(
        &self,
        table: &str,
        id_column: &str,
        record: &T,
    ) -> Result<Statement> {
        if !self.config.enable_upsert {
            return self.build_insert(table, id_column, record);
        }

        let meta = T::metadata()?;
        let columns = Columns::collect(&self.config, meta.fields(), id_column, record);
        if columns.is_empty() {
            return Err(RowbindError::Precondition(format!(
                "{} has no insertable columns",
                meta.type_name()
            )));
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON DUPLICATE KEY UPDATE {}",
            table,
            columns.names.join(", "),
            columns.placeholders.join(", "),
            columns.assignments(&self.config, columns.binds.len() + 1)
        );
        let mut binds = columns.binds.clone();
        binds.extend(columns.binds);
        let mut kinds = columns.kinds.clone();
        kinds.extend(columns.kinds);
        Ok(Statement { sql, binds, kinds })
    }

    /// 执行 UPDATE，返回受影响的行数
    pub async fn update<E, T>(&self, db: &E, table: &str, id_column: &str, record: &T) -> Result<u64>
    where
        E: Execute + ?Sized,
        T: Record,
    {
        let statement = self.build_update(table, id_column, record)?;
        let outcome = self.run(db, table, &statement).await?;
        Ok(outcome.rows_affected)
    }

    /// 执行 INSERT，返回自增 ID
    pub async fn insert<E, T>(&self, db: &E, table: &str, id_column: &str, record: &T) -> Result<i64>
    where
        E: Execute + ?Sized,
        T: Record,
    {
        let statement = self.build_insert(table, id_column, record)?;
        let outcome = self.run(db, table, &statement).await?;
        self.generated_id(outcome)
    }

    /// 执行 UPSERT，返回自增 ID
    pub async fn upsert<E, T>(&self, db: &E, table: &str, id_column: &str, record: &T) -> Result<i64>
    where
        E: Execute + ?Sized,
        T: Record,
    {
        let statement = self.build_upsert(table, id_column, record)?;
        let outcome = self.run(db, table, &statement).await?;
        self.generated_id(outcome)
    }

    async fn run<E: Execute + ?Sized>(
        &self,
        db: &E,
        table: &str,
        statement: &Statement,
    ) -> Result<ExecOutcome> {
        tracing::debug!(
            table = table,
            sql = %statement.sql,
            binds = statement.binds.len(),
            "executing statement"
        );
        db.execute_statement(statement).await
    }

    fn generated_id(&self, outcome: ExecOutcome) -> Result<i64> {
        match outcome.last_insert_id() {
            Err(RowbindError::NoGeneratedId) if self.config.tolerate_missing_insert_id => Ok(0),
            other => other,
        }
    }
}
