use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::subscriptions::models::User;

/// Returns the id for `username`, inserting the user when it is not known yet.
pub async fn ensure_user<'c, E>(executor: E, username: &str) -> Result<Uuid, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar(
        r#"
        INSERT INTO users (id, username)
        VALUES ($1, $2)
        ON CONFLICT (username) DO UPDATE SET username = EXCLUDED.username
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .fetch_one(executor)
    .await
}

pub async fn user_by_username<'c, E>(
    executor: E,
    username: &str,
) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, User>("SELECT id, username FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(executor)
        .await
}
