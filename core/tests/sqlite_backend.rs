#![cfg(feature = "sqlite")]

use chrono::{DateTime, Utc};
use rowbind::{
    scan_all, Config, Crud, Cursor, DbDriver, Execute, FetchRows, Mapper, Record, Table, Value,
};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

#[derive(Debug, Default, Clone, PartialEq, Record, Table)]
#[table(name = "accounts")]
struct Account {
    #[sql(readonly)]
    id: i64,
    owner: String,
    nickname: Option<String>,
    balance: f64,
    visits: Option<i32>,
    #[sql(column = "opened_at", unix)]
    opened: DateTime<Utc>,
}

async fn setup() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    pool.execute(
        "CREATE TABLE accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner TEXT NOT NULL,
            nickname TEXT,
            balance REAL NOT NULL,
            visits INTEGER,
            opened_at INTEGER NOT NULL
        )",
        &[],
    )
    .await
    .unwrap();
    pool
}

fn account(owner: &str, nickname: Option<&str>, visits: Option<i32>) -> Account {
    Account {
        id: 0,
        owner: owner.to_string(),
        nickname: nickname.map(str::to_string),
        balance: 10.5,
        visits,
        opened: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
    }
}

async fn load_all(pool: &SqlitePool) -> Vec<Account> {
    let rows = pool
        .fetch_rows("SELECT * FROM accounts ORDER BY id", &[])
        .await
        .unwrap();
    let mut accounts = Vec::new();
    scan_all(rows, &mut accounts).await.unwrap();
    accounts
}

#[tokio::test]
async fn test_insert_and_scan_round_trip() {
    let pool = setup().await;
    let mapper = Mapper::new(Config::for_driver(DbDriver::Sqlite));

    let mut ann = account("ann", Some("a"), Some(3));
    ann.id = ann.insert(&mapper, &pool).await.unwrap();
    let mut bo = account("bo", None, None);
    bo.id = bo.insert(&mapper, &pool).await.unwrap();
    assert_eq!((ann.id, bo.id), (1, 2));

    let loaded = load_all(&pool).await;
    assert_eq!(loaded, vec![ann, bo]);
}

#[tokio::test]
async fn test_update_by_id() {
    let pool = setup().await;
    let mapper = Mapper::new(Config::from_url("sqlite::memory:").unwrap());

    let mut ann = account("ann", None, Some(1));
    ann.id = ann.insert(&mapper, &pool).await.unwrap();

    ann.nickname = Some("annie".to_string());
    ann.visits = Some(2);
    ann.balance = 0.25;
    let affected = ann.update(&mapper, &pool).await.unwrap();
    assert_eq!(affected, 1);

    let loaded = load_all(&pool).await;
    assert_eq!(loaded, vec![ann]);
}

#[tokio::test]
async fn test_scan_with_manual_cursor() {
    let pool = setup().await;
    let mapper = Mapper::default();
    account("cy", Some("c"), None)
        .insert(&mapper, &pool)
        .await
        .unwrap();

    let mut rows = pool
        .fetch_rows(
            "SELECT id, owner, visits, opened_at, 'ignored' AS extra FROM accounts WHERE owner = ?",
            &[Value::from("cy")],
        )
        .await
        .unwrap();
    assert!(rows.advance().await.unwrap());

    // 查询中没有的列保持原值
    let mut loaded = Account {
        visits: Some(7),
        nickname: Some("kept".to_string()),
        ..Account::default()
    };
    rowbind::scan!(&mut rows, &mut loaded).unwrap();
    assert_eq!(loaded.id, 1);
    assert_eq!(loaded.owner, "cy");
    assert_eq!(loaded.visits, Some(7));
    assert_eq!(loaded.nickname.as_deref(), Some("kept"));
    assert_eq!(loaded.opened.timestamp(), 1_700_000_000);

    assert!(!rows.advance().await.unwrap());
    rows.close().await.unwrap();
}

#[tokio::test]
async fn test_metadata_matches_table_columns() {
    let meta = Account::metadata().unwrap();
    let columns: Vec<_> = meta.columns().collect();
    assert_eq!(
        columns,
        vec!["id", "owner", "nickname", "balance", "visits", "opened_at"]
    );
    assert_eq!(Account::TABLE, "accounts");
}

#[derive(Debug, Default, PartialEq, Record)]
struct Summary {
    total: f64,
    label: Option<String>,
}

#[tokio::test]
async fn test_scan_numeric_columns_into_text_and_float_fields() {
    let pool = setup().await;
    pool.execute("CREATE TABLE summary (total NUMERIC, label INTEGER)", &[])
        .await
        .unwrap();
    pool.execute(
        "INSERT INTO summary (total, label) VALUES (?, ?)",
        &[Value::Float64(10.0), Value::Int64(7)],
    )
    .await
    .unwrap();

    let rows = pool
        .fetch_rows("SELECT total, label FROM summary", &[])
        .await
        .unwrap();
    let mut summaries: Vec<Summary> = Vec::new();
    scan_all(rows, &mut summaries).await.unwrap();
    assert_eq!(
        summaries,
        vec![Summary {
            total: 10.0,
            label: Some("7".to_string()),
        }]
    );
}

#[tokio::test]
async fn test_update_with_null_integer_column() {
    let pool = setup().await;
    let mapper = Mapper::new(Config::for_driver(DbDriver::Sqlite));
    let mut ann = account("ann", Some("a"), Some(3));
    ann.id = ann.insert(&mapper, &pool).await.unwrap();

    let statement = mapper
        .build_update(Account::TABLE, Account::ID_COLUMN, &Account { visits: None, ..ann.clone() })
        .unwrap();
    assert!(statement.kinds.contains(&rowbind::ValueKind::Int64));
    ann.visits = None;
    assert_eq!(ann.update(&mapper, &pool).await.unwrap(), 1);
    assert_eq!(load_all(&pool).await, vec![ann]);
}
