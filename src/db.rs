use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        phone TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        departments TEXT NOT NULL DEFAULT '',
        password_hash TEXT NOT NULL DEFAULT '',
        role TEXT NOT NULL DEFAULT 'User'
    )"#,
    r#"
    CREATE TABLE IF NOT EXISTS attendance_partitions (
        partition_index INTEGER PRIMARY KEY
    )"#,
    r#"
    CREATE TABLE IF NOT EXISTS attendance (
        partition_index INTEGER NOT NULL,
        date TEXT NOT NULL,
        phone TEXT NOT NULL,
        name TEXT NOT NULL DEFAULT '',
        in_time TEXT NOT NULL DEFAULT '',
        out_time TEXT NOT NULL DEFAULT '',
        wfh TEXT NOT NULL DEFAULT 'No',
        leave TEXT NOT NULL DEFAULT 'No',
        departments TEXT NOT NULL DEFAULT '',
        office TEXT NOT NULL DEFAULT '',
        PRIMARY KEY (partition_index, date, phone)
    )"#,
    r#"
    CREATE TABLE IF NOT EXISTS offices (
        name TEXT PRIMARY KEY,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL,
        radius_meters REAL NOT NULL
    )"#,
    r#"
    CREATE TABLE IF NOT EXISTS departments (
        name TEXT PRIMARY KEY
    )"#,
    r#"
    CREATE TABLE IF NOT EXISTS settings (
        setting_key TEXT PRIMARY KEY,
        setting_value TEXT NOT NULL DEFAULT ''
    )"#,
    r#"
    CREATE TABLE IF NOT EXISTS attendance_edits (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        edited_by_phone TEXT NOT NULL,
        edited_by_name TEXT NOT NULL,
        target_phone TEXT NOT NULL,
        date TEXT NOT NULL,
        field TEXT NOT NULL,
        old_value TEXT NOT NULL,
        new_value TEXT NOT NULL,
        reason TEXT NOT NULL
    )"#,
    "INSERT OR IGNORE INTO attendance_partitions (partition_index) VALUES (1)",
];

pub async fn init_db(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let mut pool_options = SqlitePoolOptions::new().max_connections(5);
    if database_url.contains(":memory:") {
        // an in-memory database lives and dies with its single connection
        pool_options = pool_options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }
    let pool = pool_options.connect_with(options).await?;
    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
