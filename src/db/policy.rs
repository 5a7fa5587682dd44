use sqlx::PgConnection;

use crate::models::policy::{CreatePolicyRequest, PatchPolicyRequest, Policy};

pub async fn create_policy(
    conn: &mut PgConnection,
    request: &CreatePolicyRequest,
) -> Result<Policy, sqlx::Error> {
    sqlx::query_as::<_, Policy>(
        r#"
        INSERT INTO "policies" (name, criteria, value)
        VALUES ($1, $2, $3)
        RETURNING id, name, criteria, value, created_at, updated_at
        "#,
    )
    .bind(&request.name)
    .bind(&request.criteria)
    .bind(request.value)
    .fetch_one(conn)
    .await
}

pub async fn get_policy(conn: &mut PgConnection, id: i32) -> Result<Option<Policy>, sqlx::Error> {
    sqlx::query_as::<_, Policy>(
        r#"
        SELECT id, name, criteria, value, created_at, updated_at
        FROM "policies"
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await
}

pub async fn list_policies(conn: &mut PgConnection) -> Result<Vec<Policy>, sqlx::Error> {
    sqlx::query_as::<_, Policy>(
        r#"
        SELECT id, name, criteria, value, created_at, updated_at
        FROM "policies"
        ORDER BY id ASC
        "#,
    )
    .fetch_all(conn)
    .await
}

/// Fields left as `None` keep their stored value. `updated_at` is refreshed by trigger.
pub async fn update_policy(
    conn: &mut PgConnection,
    id: i32,
    request: &PatchPolicyRequest,
) -> Result<Option<Policy>, sqlx::Error> {
    sqlx::query_as::<_, Policy>(
        r#"
        UPDATE "policies"
        SET name = COALESCE($2, name),
            criteria = COALESCE($3, criteria),
            value = COALESCE($4, value)
        WHERE id = $1
        RETURNING id, name, criteria, value, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(&request.name)
    .bind(&request.criteria)
    .bind(request.value)
    .fetch_optional(conn)
    .await
}

pub async fn delete_policy(conn: &mut PgConnection, id: i32) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(r#"DELETE FROM "policies" WHERE id = $1"#)
        .bind(id)
        .execute(conn)
        .await?;

    Ok(row.rows_affected() == 1)
}
