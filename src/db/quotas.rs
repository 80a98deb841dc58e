use sqlx::{postgres::PgRow, Executor, PgConnection, Postgres, Row};
use uuid::Uuid;

use super::catalog::resource_type_from_row;
use crate::subscriptions::models::Quota;

// key: quota-ledger-db -> overrides per assignment

/// Current quota for the (resource type, assignment) pair and whether a row exists. A
/// missing row reads as `(0.0, false)`.
pub async fn current_quota<'c, E>(
    executor: E,
    resource_type_id: Uuid,
    user_plan_id: Uuid,
) -> Result<(f64, bool), sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let value: Option<f64> = sqlx::query_scalar(
        r#"
        SELECT quota_value
        FROM quotas
        WHERE resource_type_id = $1
          AND user_plan_id = $2
        "#,
    )
    .bind(resource_type_id)
    .bind(user_plan_id)
    .fetch_optional(executor)
    .await?;

    Ok(match value {
        Some(value) => (value, true),
        None => (0.0, false),
    })
}

/// Writes `value` for the pair. `exists` picks the update path; when the update finds no
/// row the conflict-guarded insert runs instead, so the pair never ends up with two rows.
pub async fn upsert_quota(
    conn: &mut PgConnection,
    exists: bool,
    value: f64,
    resource_type_id: Uuid,
    user_plan_id: Uuid,
    actor: &str,
) -> Result<(), sqlx::Error> {
    if exists {
        let updated = sqlx::query(
            r#"
            UPDATE quotas
            SET
                quota_value = $1,
                last_modified_by = $2,
                last_modified_at = NOW()
            WHERE resource_type_id = $3
              AND user_plan_id = $4
            "#,
        )
        .bind(value)
        .bind(actor)
        .bind(resource_type_id)
        .bind(user_plan_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if updated > 0 {
            return Ok(());
        }
    }

    set_quota(&mut *conn, value, resource_type_id, user_plan_id, actor).await?;
    Ok(())
}

/// Single-statement insert-or-update keyed on (user_plan_id, resource_type_id).
pub async fn set_quota<'c, E>(
    executor: E,
    value: f64,
    resource_type_id: Uuid,
    user_plan_id: Uuid,
    actor: &str,
) -> Result<Quota, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let row = sqlx::query(
        r#"
        WITH upserted AS (
            INSERT INTO quotas (
                id,
                resource_type_id,
                user_plan_id,
                quota_value,
                created_by,
                last_modified_by
            ) VALUES ($1, $2, $3, $4, $5, $5)
            ON CONFLICT (user_plan_id, resource_type_id)
            DO UPDATE SET
                quota_value = EXCLUDED.quota_value,
                last_modified_by = EXCLUDED.last_modified_by,
                last_modified_at = NOW()
            RETURNING *
        )
        SELECT
            q.id,
            q.user_plan_id,
            q.quota_value,
            q.created_by,
            q.created_at,
            q.last_modified_by,
            q.last_modified_at,
            rt.id AS rt_id,
            rt.name AS rt_name,
            rt.unit AS rt_unit
        FROM upserted q
        JOIN resource_types rt ON rt.id = q.resource_type_id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(resource_type_id)
    .bind(user_plan_id)
    .bind(value)
    .bind(actor)
    .fetch_one(executor)
    .await?;

    quota_from_row(&row)
}

pub async fn user_plan_quotas<'c, E>(
    executor: E,
    user_plan_id: Uuid,
) -> Result<Vec<Quota>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows = sqlx::query(
        r#"
        SELECT
            q.id,
            q.user_plan_id,
            q.quota_value,
            q.created_by,
            q.created_at,
            q.last_modified_by,
            q.last_modified_at,
            rt.id AS rt_id,
            rt.name AS rt_name,
            rt.unit AS rt_unit
        FROM quotas q
        JOIN resource_types rt ON rt.id = q.resource_type_id
        WHERE q.user_plan_id = $1
        ORDER BY rt.name
        "#,
    )
    .bind(user_plan_id)
    .fetch_all(executor)
    .await?;

    rows.iter().map(quota_from_row).collect()
}

fn quota_from_row(row: &PgRow) -> Result<Quota, sqlx::Error> {
    Ok(Quota {
        id: row.try_get("id")?,
        user_plan_id: row.try_get("user_plan_id")?,
        quota_value: row.try_get("quota_value")?,
        resource_type: resource_type_from_row(row)?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
        last_modified_by: row.try_get("last_modified_by")?,
        last_modified_at: row.try_get("last_modified_at")?,
    })
}
