//! Runs against a real PostgreSQL when `TABULA_TEST_DATABASE_URL` is set.
//!
//! The database should be disposable; tables are created and dropped.

use sqlx::{Connection, PgConnection};
use tabula::compiler::CompileOptions;
use tabula::migrate::{Executor, Migrator, Outcome, PgDatabase};
use tabula::{MigrateError, Phase, load_tables};

fn database_url() -> Option<String> {
    std::env::var("TABULA_TEST_DATABASE_URL").ok().filter(|u| !u.is_empty())
}

async fn reset(url: &str, tables: &[&str]) {
    let mut conn = PgConnection::connect(url).await.unwrap();
    for table in tables {
        sqlx::query(&format!("DROP TABLE IF EXISTS \"{table}\" CASCADE"))
            .execute(&mut conn)
            .await
            .unwrap();
    }
    conn.close().await.unwrap();
}

async fn table_exists(url: &str, name: &str) -> bool {
    let mut conn = PgConnection::connect(url).await.unwrap();
    let exists: bool = sqlx::query_scalar("SELECT to_regclass($1) IS NOT NULL")
        .bind(format!("public.{name}"))
        .fetch_one(&mut conn)
        .await
        .unwrap();
    conn.close().await.unwrap();
    exists
}

#[tokio::test]
async fn test_apply_and_skip_on_postgres() {
    let Some(url) = database_url() else {
        return;
    };
    reset(
        &url,
        &["tt_members", "tt_accounts", "_tabula_schema_checksum", "_tabula_migration_history"],
    )
    .await;

    let tables = load_tables(
        r#"[
            { "name": "tt_members", "fields": [
                { "id": 1, "name": "account", "type": "linked-record", "relatedTable": "tt_accounts" },
                { "id": 2, "name": "role", "type": "single-select", "options": ["owner", "member"] },
                { "id": 3, "name": "stars", "type": "rating" }
            ] },
            { "name": "tt_accounts", "fields": [
                { "id": 1, "name": "email", "type": "email", "required": true, "unique": true },
                { "id": 2, "name": "settings", "type": "json", "default": "{}" }
            ] }
        ]"#,
    )
    .unwrap();

    let db = PgDatabase::connect(&url).await.unwrap();
    let mut migrator = Migrator::new(db, CompileOptions::default());
    assert!(matches!(migrator.run(&tables).await.unwrap(), Outcome::Applied { .. }));
    assert!(matches!(migrator.run(&tables).await.unwrap(), Outcome::Skipped { .. }));

    let status = migrator.status(&tables).await.unwrap();
    assert!(status.is_up_to_date());
    assert_eq!(status.history_count, 1);
    migrator.into_database().close().await.unwrap();

    assert!(table_exists(&url, "tt_accounts").await);
    assert!(table_exists(&url, "tt_members").await);
}

#[tokio::test]
async fn test_rollback_on_postgres() {
    let Some(url) = database_url() else {
        return;
    };
    reset(&url, &["tt_first", "tt_second"]).await;

    let mut db = PgDatabase::connect(&url).await.unwrap();
    let statements = vec![
        "CREATE TABLE IF NOT EXISTS \"tt_first\" (id SERIAL PRIMARY KEY)".to_string(),
        "CREATE TABLE IF NOT EXISTS \"tt_second\" (".to_string(),
    ];
    // history is never reached, so the bookkeeping tables are not needed
    let err = Executor::new(&mut db).run("rollback-test", &statements).await.unwrap_err();
    assert_eq!(err.phase, Phase::Execute);
    assert_eq!(err.cause.code.as_deref(), Some("42601"));
    db.close().await.unwrap();

    assert!(!table_exists(&url, "tt_first").await);
    assert!(!table_exists(&url, "tt_second").await);
}

#[tokio::test]
async fn test_schema_error_before_connecting() {
    let tables = load_tables(
        r#"[{ "name": "t", "fields": [{ "id": 1, "name": "select", "type": "checkbox" }] }]"#,
    )
    .unwrap();
    let err = tabula::migrate::prepare(&tables, &CompileOptions::default()).unwrap_err();
    assert!(matches!(err, MigrateError::Compile(_)));
}
