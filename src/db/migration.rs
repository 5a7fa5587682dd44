use sqlx::PgConnection;

/// Advisory lock key shared by every process migrating the same database.
pub const MIGRATION_LOCK_KEY: i64 = 0x706f_6c69_6379;

pub async fn lock(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(MIGRATION_LOCK_KEY)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn unlock(conn: &mut PgConnection) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT pg_advisory_unlock($1)")
        .bind(MIGRATION_LOCK_KEY)
        .fetch_one(conn)
        .await
}

pub async fn ensure_version_table(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS "policycraft_version" (
            singleton BOOLEAN PRIMARY KEY DEFAULT TRUE CHECK (singleton),
            version_id TEXT NOT NULL
        )
        "#,
    )
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn version_table_exists(conn: &mut PgConnection) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT to_regclass('policycraft_version') IS NOT NULL")
        .fetch_one(conn)
        .await
}

pub async fn current_version(conn: &mut PgConnection) -> Result<Option<String>, sqlx::Error> {
    if !version_table_exists(&mut *conn).await? {
        return Ok(None);
    }

    sqlx::query_scalar::<_, String>(r#"SELECT version_id FROM "policycraft_version""#)
        .fetch_optional(conn)
        .await
}

/// Moves the version record from `from` to `to`, only if it still reads `from`.
/// Returns false when another writer got there first.
pub async fn swap_version(
    conn: &mut PgConnection,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = match (from, to) {
        (None, None) => return Ok(true),
        (None, Some(to)) => {
            sqlx::query(
                r#"
                INSERT INTO "policycraft_version" (singleton, version_id)
                VALUES (TRUE, $1)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(to)
            .execute(conn)
            .await?
        }
        (Some(from), Some(to)) => {
            sqlx::query(
                r#"
                UPDATE "policycraft_version"
                SET version_id = $2
                WHERE version_id = $1
                "#,
            )
            .bind(from)
            .bind(to)
            .execute(conn)
            .await?
        }
        (Some(from), None) => {
            sqlx::query(r#"DELETE FROM "policycraft_version" WHERE version_id = $1"#)
                .bind(from)
                .execute(conn)
                .await?
        }
    };

    Ok(result.rows_affected() == 1)
}
