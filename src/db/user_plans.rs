use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, Executor, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::subscriptions::models::{Plan, User, UserPlan};

// key: user-plans-db -> assignment resolution,activation

const USER_PLAN_SELECT: &str = r#"
    SELECT
        up.id,
        up.effective_start_date,
        up.effective_end_date,
        up.created_by,
        up.created_at,
        up.last_modified_by,
        up.last_modified_at,
        u.id AS user_id,
        u.username,
        p.id AS plan_id,
        p.name AS plan_name,
        p.description AS plan_description
    FROM user_plans up
    JOIN users u ON u.id = up.user_id
    JOIN plans p ON p.id = up.plan_id
"#;

/// The assignment whose window contains `now`. Overlapping candidates resolve to the
/// latest start.
pub async fn active_user_plan<'c, E>(
    executor: E,
    username: &str,
    now: DateTime<Utc>,
) -> Result<Option<UserPlan>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let sql = format!(
        r#"{USER_PLAN_SELECT}
        WHERE u.username = $1
          AND (
                (up.effective_start_date <= $2 AND $2 < up.effective_end_date)
             OR (up.effective_end_date IS NULL AND up.effective_start_date < $2)
          )
        ORDER BY up.effective_start_date DESC
        LIMIT 1
        "#
    );
    let row = sqlx::query(&sql)
        .bind(username)
        .bind(now)
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(user_plan_from_row).transpose()
}

pub async fn user_plan_by_id<'c, E>(
    executor: E,
    user_plan_id: Uuid,
) -> Result<Option<UserPlan>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let sql = format!("{USER_PLAN_SELECT} WHERE up.id = $1");
    let row = sqlx::query(&sql)
        .bind(user_plan_id)
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(user_plan_from_row).transpose()
}

pub async fn list_user_plans<'c, E>(
    executor: E,
    username: &str,
) -> Result<Vec<UserPlan>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let sql = format!(
        "{USER_PLAN_SELECT} WHERE u.username = $1 ORDER BY up.effective_start_date DESC"
    );
    let rows = sqlx::query(&sql)
        .bind(username)
        .fetch_all(executor)
        .await?;

    rows.iter().map(user_plan_from_row).collect()
}

/// True when the user has ever been assigned a plan, active or not.
pub async fn user_has_any_plan<'c, E>(executor: E, username: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM user_plans up
        JOIN users u ON u.id = up.user_id
        WHERE u.username = $1
        "#,
    )
    .bind(username)
    .fetch_one(executor)
    .await?;

    Ok(count > 0)
}

pub async fn user_on_plan<'c, E>(
    executor: E,
    username: &str,
    plan_name: &str,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM user_plans up
        JOIN users u ON u.id = up.user_id
        JOIN plans p ON p.id = up.plan_id
        WHERE u.username = $1
          AND p.name = $2
        "#,
    )
    .bind(username)
    .bind(plan_name)
    .fetch_one(executor)
    .await?;

    Ok(count > 0)
}

#[derive(Debug, Clone)]
pub struct NewUserPlan<'a> {
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub effective_start_date: DateTime<Utc>,
    pub effective_end_date: Option<DateTime<Utc>>,
    pub actor: &'a str,
}

/// Inserts the assignment and copies the plan's current defaults into its quotas. Both
/// statements share `tx`; the caller owns commit and rollback.
pub async fn insert_user_plan_with_quotas(
    tx: &mut Transaction<'_, Postgres>,
    input: NewUserPlan<'_>,
) -> Result<(Uuid, u64), sqlx::Error> {
    let user_plan_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO user_plans (
            id,
            user_id,
            plan_id,
            effective_start_date,
            effective_end_date,
            created_by,
            created_at,
            last_modified_by,
            last_modified_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $4, $6, $4)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(input.user_id)
    .bind(input.plan_id)
    .bind(input.effective_start_date)
    .bind(input.effective_end_date)
    .bind(input.actor)
    .fetch_one(&mut *tx)
    .await?;

    let seeded = sqlx::query(
        r#"
        INSERT INTO quotas (
            id,
            resource_type_id,
            user_plan_id,
            quota_value,
            created_by,
            created_at,
            last_modified_by,
            last_modified_at
        )
        SELECT
            gen_random_uuid(),
            d.resource_type_id,
            $1,
            d.quota_value,
            $2,
            $3,
            $2,
            $3
        FROM plan_quota_defaults d
        WHERE d.plan_id = $4
        "#,
    )
    .bind(user_plan_id)
    .bind(input.actor)
    .bind(input.effective_start_date)
    .bind(input.plan_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    Ok((user_plan_id, seeded))
}

fn user_plan_from_row(row: &PgRow) -> Result<UserPlan, sqlx::Error> {
    Ok(UserPlan {
        id: row.try_get("id")?,
        user: User {
            id: row.try_get("user_id")?,
            username: row.try_get("username")?,
        },
        plan: Plan {
            id: row.try_get("plan_id")?,
            name: row.try_get("plan_name")?,
            description: row.try_get("plan_description")?,
        },
        effective_start_date: row.try_get("effective_start_date")?,
        effective_end_date: row.try_get("effective_end_date")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
        last_modified_by: row.try_get("last_modified_by")?,
        last_modified_at: row.try_get("last_modified_at")?,
    })
}
