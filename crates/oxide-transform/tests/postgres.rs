//! Tests against a live PostgreSQL server.
//!
//! They run only when `DATABASE_URL` is set. Each test works in its own
//! schema, selected through `SearchPath` and dropped afterwards.

use oxide_transform::config::DATABASE_URL_ENV;
use oxide_transform::prelude::*;
use sqlx::{Connection, PgConnection};

async fn provider(schema: &str) -> Option<PostgresProvider> {
    let url = std::env::var(DATABASE_URL_ENV).ok()?;

    let mut admin = PgConnection::connect(&url).await.unwrap();
    sqlx::query(&format!("DROP SCHEMA IF EXISTS \"{schema}\" CASCADE"))
        .execute(&mut admin)
        .await
        .unwrap();
    sqlx::query(&format!("CREATE SCHEMA \"{schema}\""))
        .execute(&mut admin)
        .await
        .unwrap();
    Connection::close(admin).await.unwrap();

    let separator = if url.contains('?') { '&' } else { '?' };
    let provider = PostgresProvider::connect(&format!("{url}{separator}SearchPath={schema}"))
        .await
        .unwrap();
    assert_eq!(provider.default_schema(), schema);
    Some(provider)
}

async fn teardown(mut provider: PostgresProvider) {
    let schema = provider.default_schema().to_string();
    provider
        .execute_non_query(&format!("DROP SCHEMA \"{schema}\" CASCADE"))
        .await
        .unwrap();
    provider.close().await.unwrap();
}

fn text_rows(rows: &[CatalogRow]) -> Vec<Vec<Option<&str>>> {
    rows.iter()
        .map(|row| (0..row.len()).map(|i| row.get(i)).collect())
        .collect()
}

#[tokio::test]
async fn test_change_column_preserves_data() {
    let Some(mut provider) = provider("oxide_transform_change").await else {
        return;
    };

    provider
        .execute_non_query("CREATE TABLE accounts (id INTEGER PRIMARY KEY, \"Balance\" DECIMAL(12, 2))")
        .await
        .unwrap();
    provider
        .execute_non_query("INSERT INTO accounts VALUES (1, 10.0), (2, NULL)")
        .await
        .unwrap();
    // Upstream default substitution.
    provider
        .execute_non_query("UPDATE accounts SET \"Balance\" = 0 WHERE \"Balance\" IS NULL")
        .await
        .unwrap();

    provider
        .change_column(
            "accounts",
            &ColumnSchema::new("Balance", SqlType::Decimal(12, 2)).not_null(),
        )
        .await
        .unwrap();

    let rows = provider
        .execute_query("SELECT id::text, \"Balance\"::text FROM accounts ORDER BY id")
        .await
        .unwrap();
    assert_eq!(
        text_rows(&rows),
        vec![
            vec![Some("1"), Some("10.00")],
            vec![Some("2"), Some("0.00")],
        ]
    );

    let columns = provider.get_columns("accounts").await.unwrap();
    assert!(columns.iter().all(|c| c.name != "temp_Balance"));
    assert!(provider
        .get_column_by_name("accounts", "Balance")
        .await
        .unwrap()
        .unwrap()
        .is_not_null());

    let rejected = provider
        .execute_non_query("INSERT INTO accounts VALUES (3, NULL)")
        .await;
    assert!(matches!(rejected, Err(TransformError::Execution { .. })));

    // Already migrated: rewriting again keeps the data.
    provider
        .change_column(
            "accounts",
            &ColumnSchema::new("Balance", SqlType::Decimal(12, 2)).not_null(),
        )
        .await
        .unwrap();
    assert_eq!(
        provider
            .execute_query("SELECT count(*)::text FROM accounts")
            .await
            .unwrap()[0]
            .get(0),
        Some("2")
    );

    teardown(provider).await;
}

#[tokio::test]
async fn test_table_exists_in_any_case() {
    let Some(mut provider) = provider("oxide_transform_Case").await else {
        return;
    };

    provider
        .add_table(
            "Orders",
            &[ColumnSchema::new("Id", SqlType::BigInt).primary_key().identity()],
        )
        .await
        .unwrap();

    for name in ["orders", "Orders", "ORDERS"] {
        assert!(provider.table_exists(name).await.unwrap(), "{name}");
    }
    let tables = provider.get_tables().await.unwrap();
    assert_eq!(tables.iter().filter(|t| *t == "orders").count(), 1);
    assert!(provider.column_exists("ORDERS", "ID").await.unwrap());
    assert!(!provider.column_exists("missing", "id").await.unwrap());

    // The mixed-case schema is used verbatim by the session too.
    let rows = provider
        .execute_query(
            "SELECT table_schema::text FROM information_schema.tables WHERE table_name = 'orders'",
        )
        .await
        .unwrap();
    assert_eq!(text_rows(&rows), vec![vec![Some("oxide_transform_Case")]]);

    teardown(provider).await;
}

#[tokio::test]
async fn test_drop_missing_table_fails() {
    let Some(mut provider) = provider("oxide_transform_ghost").await else {
        return;
    };

    let result = provider.remove_table("ghost").await;
    assert!(matches!(
        result,
        Err(TransformError::SchemaObjectNotFound {
            kind: ObjectKind::Table,
            ..
        })
    ));

    teardown(provider).await;
}

#[tokio::test]
async fn test_nullability_round_trip_and_boolean_text() {
    let Some(mut provider) = provider("oxide_transform_flags").await else {
        return;
    };

    provider
        .add_table(
            "flags",
            &[
                ColumnSchema::new("id", SqlType::Integer).primary_key(),
                ColumnSchema::new("enabled", SqlType::Boolean).not_null(),
                ColumnSchema::new("note", SqlType::Text),
            ],
        )
        .await
        .unwrap();

    let shape: Vec<(String, bool)> = provider
        .get_columns("flags")
        .await
        .unwrap()
        .into_iter()
        .map(|c| (c.name, c.nullable))
        .collect();
    assert_eq!(
        shape,
        vec![
            ("id".to_string(), false),
            ("enabled".to_string(), false),
            ("note".to_string(), true),
        ]
    );

    provider
        .insert(
            "flags",
            &["id", "enabled", "note"],
            vec![
                SqlValue::Int(1),
                SqlValue::Text("True".to_string()),
                SqlValue::Null,
            ],
        )
        .await
        .unwrap();
    let rows = provider
        .execute_query("SELECT enabled::text FROM flags")
        .await
        .unwrap();
    assert_eq!(rows[0].get(0), Some("true"));

    provider
        .add_index("idx_flags_note", "flags", &["note"], false)
        .await
        .unwrap();
    assert!(provider.index_exists("flags", "IDX_FLAGS_NOTE").await.unwrap());
    provider
        .add_check_constraint("ck_flags_id", "flags", "id > 0")
        .await
        .unwrap();
    assert!(provider.constraint_exists("flags", "ck_flags_id").await.unwrap());

    provider
        .execute_non_query("CREATE VIEW enabled_flags AS SELECT id FROM flags WHERE enabled")
        .await
        .unwrap();
    assert!(!provider.table_exists("enabled_flags").await.unwrap());
    assert_eq!(provider.get_tables().await.unwrap(), vec!["flags".to_string()]);

    provider.remove_all_tables().await.unwrap();
    assert!(provider.get_tables().await.unwrap().is_empty());

    teardown(provider).await;
}

#[tokio::test]
async fn test_change_column_refuses_existing_temp_column() {
    let Some(mut provider) = provider("oxide_transform_collision").await else {
        return;
    };

    provider
        .execute_non_query(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, legacy INTEGER NOT NULL, temp_legacy INTEGER)",
        )
        .await
        .unwrap();
    provider
        .execute_non_query("INSERT INTO t VALUES (1, 100, 7), (2, 200, 8)")
        .await
        .unwrap();

    let result = provider
        .change_column("t", &ColumnSchema::new("legacy", SqlType::BigInt).not_null())
        .await;
    assert!(matches!(
        result,
        Err(TransformError::SchemaObjectExists {
            kind: ObjectKind::Column,
            ..
        })
    ));

    let rows = provider
        .execute_query("SELECT legacy::text, temp_legacy::text FROM t ORDER BY id")
        .await
        .unwrap();
    assert_eq!(
        text_rows(&rows),
        vec![
            vec![Some("100"), Some("7")],
            vec![Some("200"), Some("8")],
        ]
    );

    teardown(provider).await;
}

#[tokio::test]
async fn test_change_missing_column_keeps_temp_column() {
    let Some(mut provider) = provider("oxide_transform_lone_temp").await else {
        return;
    };

    provider
        .execute_non_query("CREATE TABLE t (id INTEGER PRIMARY KEY, temp_note TEXT)")
        .await
        .unwrap();
    provider
        .execute_non_query("INSERT INTO t VALUES (1, 'keep me')")
        .await
        .unwrap();

    provider
        .change_column("t", &ColumnSchema::new("note", SqlType::Text))
        .await
        .unwrap();

    let names: Vec<String> = provider
        .get_columns("t")
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["id".to_string(), "temp_note".to_string()]);

    teardown(provider).await;
}

#[tokio::test]
async fn test_change_primary_key_column() {
    let Some(mut provider) = provider("oxide_transform_pk").await else {
        return;
    };

    provider
        .execute_non_query("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT)")
        .await
        .unwrap();
    provider
        .execute_non_query("INSERT INTO t VALUES (1, 'a'), (2, 'b')")
        .await
        .unwrap();

    provider
        .change_column("t", &ColumnSchema::new("id", SqlType::BigInt).primary_key())
        .await
        .unwrap();

    let rows = provider
        .execute_query(
            "SELECT data_type::text FROM information_schema.columns \
             WHERE table_name = 't' AND column_name = 'id'",
        )
        .await
        .unwrap();
    assert_eq!(rows[0].get(0), Some("bigint"));

    let keys = provider
        .execute_query(
            "SELECT constraint_name::text FROM information_schema.table_constraints \
             WHERE table_name = 't' AND constraint_type = 'PRIMARY KEY'",
        )
        .await
        .unwrap();
    assert_eq!(keys.len(), 1);

    let duplicate = provider
        .execute_non_query("INSERT INTO t VALUES (1, 'c')")
        .await;
    assert!(matches!(duplicate, Err(TransformError::Execution { .. })));

    teardown(provider).await;
}
