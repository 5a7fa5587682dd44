use sqlx::PgConnection;

pub async fn health_check(conn: &mut PgConnection) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1 as one")
        .fetch_one(conn)
        .await
}
