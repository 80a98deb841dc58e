use sqlx::{postgres::PgRow, Executor, Postgres, Row};
use uuid::Uuid;

use crate::subscriptions::models::{Plan, PlanQuotaDefault, ResourceType};

// key: catalog-db -> resource types,plans,plan defaults

pub async fn list_resource_types<'c, E>(executor: E) -> Result<Vec<ResourceType>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, ResourceType>("SELECT id, name, unit FROM resource_types ORDER BY name")
        .fetch_all(executor)
        .await
}

pub async fn resource_type_by_name<'c, E>(
    executor: E,
    name: &str,
) -> Result<Option<ResourceType>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, ResourceType>("SELECT id, name, unit FROM resource_types WHERE name = $1")
        .bind(name)
        .fetch_optional(executor)
        .await
}

pub async fn list_plans<'c, E>(executor: E) -> Result<Vec<Plan>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, Plan>("SELECT id, name, description FROM plans ORDER BY name")
        .fetch_all(executor)
        .await
}

pub async fn plan_by_name<'c, E>(executor: E, name: &str) -> Result<Option<Plan>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as::<_, Plan>("SELECT id, name, description FROM plans WHERE name = $1")
        .bind(name)
        .fetch_optional(executor)
        .await
}

/// Template defaults for a plan, each joined with its resource type.
pub async fn plan_quota_defaults<'c, E>(
    executor: E,
    plan_id: Uuid,
) -> Result<Vec<PlanQuotaDefault>, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows = sqlx::query(
        r#"
        SELECT
            d.id,
            d.plan_id,
            d.quota_value,
            rt.id AS rt_id,
            rt.name AS rt_name,
            rt.unit AS rt_unit
        FROM plan_quota_defaults d
        JOIN resource_types rt ON rt.id = d.resource_type_id
        WHERE d.plan_id = $1
        ORDER BY rt.name
        "#,
    )
    .bind(plan_id)
    .fetch_all(executor)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(PlanQuotaDefault {
                id: row.try_get("id")?,
                plan_id: row.try_get("plan_id")?,
                quota_value: row.try_get("quota_value")?,
                resource_type: resource_type_from_row(row)?,
            })
        })
        .collect()
}

/// Reads the `rt_id`, `rt_name`, `rt_unit` aliases every joined query selects.
pub(crate) fn resource_type_from_row(row: &PgRow) -> Result<ResourceType, sqlx::Error> {
    Ok(ResourceType {
        id: row.try_get("rt_id")?,
        name: row.try_get("rt_name")?,
        unit: row.try_get("rt_unit")?,
    })
}
