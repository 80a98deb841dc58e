use sqlx::{Executor, Postgres, Row};
use uuid::Uuid;

use super::catalog::resource_type_from_row;
use crate::subscriptions::models::Usage;

/// Usage rows recorded against an assignment. Rows are written by the metering service.
pub async fn user_plan_usages<'c, E>(
    executor: E,
    user_plan_id: Uuid,
) -> Result<Vec<Usage>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows = sqlx::query(
        r#"
        SELECT
            us.id,
            us.user_plan_id,
            us.usage_value,
            us.created_by,
            us.created_at,
            us.last_modified_by,
            us.last_modified_at,
            rt.id AS rt_id,
            rt.name AS rt_name,
            rt.unit AS rt_unit
        FROM usages us
        JOIN resource_types rt ON rt.id = us.resource_type_id
        WHERE us.user_plan_id = $1
        ORDER BY rt.name
        "#,
    )
    .bind(user_plan_id)
    .fetch_all(executor)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(Usage {
                id: row.try_get("id")?,
                user_plan_id: row.try_get("user_plan_id")?,
                usage_value: row.try_get("usage_value")?,
                resource_type: resource_type_from_row(row)?,
                created_by: row.try_get("created_by")?,
                created_at: row.try_get("created_at")?,
                last_modified_by: row.try_get("last_modified_by")?,
                last_modified_at: row.try_get("last_modified_at")?,
            })
        })
        .collect()
}
