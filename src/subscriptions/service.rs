use async_trait::async_trait;
use chrono::{DateTime, Months, Utc};
use sqlx::PgPool;
use tracing::Span;
use uuid::Uuid;

use super::models::{
    Activation, Plan, PlanQuotaDefault, Quota, ResourceType, Usage, UserPlan, UserPlanDetails,
    UserSummary,
};
use crate::db::{self, user_plans::NewUserPlan};
use crate::error::{AppError, AppResult};
use crate::{config, telemetry};

/// Length of the window granted by [`SubscriptionService::activate`].
pub const ACTIVATION_WINDOW_MONTHS: u32 = 12;

/// key: quota-ledger -> read current value,write override
/// Seam between the RPC adapter and storage.
#[async_trait]
pub trait QuotaLedger: Send + Sync {
    /// Current quota for the pair plus whether an override row exists.
    async fn current_quota(
        &self,
        resource_type_id: Uuid,
        subscription_id: Uuid,
    ) -> AppResult<(f64, bool)>;

    async fn upsert_quota(
        &self,
        exists: bool,
        value: f64,
        resource_type_id: Uuid,
        subscription_id: Uuid,
    ) -> AppResult<()>;
}

/// key: subscriptions-service -> assignments,quotas,usage reporting
#[derive(Clone)]
pub struct SubscriptionService {
    pool: PgPool,
    actor: String,
    span: Span,
}

impl SubscriptionService {
    pub fn new(pool: PgPool) -> Self {
        Self::with_span(
            pool,
            config::AUDIT_ACTOR.as_str(),
            telemetry::component_span("subscriptions"),
        )
    }

    pub fn with_span(pool: PgPool, actor: impl Into<String>, span: Span) -> Self {
        Self {
            pool,
            actor: actor.into(),
            span,
        }
    }

    pub async fn list_resource_types(&self) -> AppResult<Vec<ResourceType>> {
        Ok(db::catalog::list_resource_types(&self.pool).await?)
    }

    pub async fn resource_type_by_name(&self, name: &str) -> AppResult<ResourceType> {
        db::catalog::resource_type_by_name(&self.pool, name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("resource type {name}")))
    }

    pub async fn list_plans(&self) -> AppResult<Vec<Plan>> {
        Ok(db::catalog::list_plans(&self.pool).await?)
    }

    pub async fn plan_by_name(&self, name: &str) -> AppResult<Plan> {
        db::catalog::plan_by_name(&self.pool, name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("plan {name}")))
    }

    /// `Ok(None)` means the user has no assignment covering `now`.
    pub async fn active_assignment(
        &self,
        username: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<UserPlan>> {
        let user_plan = db::user_plans::active_user_plan(&self.pool, username, now).await?;
        tracing::debug!(
            parent: &self.span,
            %username,
            user_plan = ?user_plan.as_ref().map(|plan| plan.id),
            "resolved active assignment"
        );
        Ok(user_plan)
    }

    pub async fn assignment(&self, user_plan_id: Uuid) -> AppResult<UserPlan> {
        db::user_plans::user_plan_by_id(&self.pool, user_plan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("subscription {user_plan_id}")))
    }

    /// Every assignment the user has held, latest start first.
    pub async fn list_assignments(&self, username: &str) -> AppResult<Vec<UserPlan>> {
        if db::users::user_by_username(&self.pool, username)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound(format!("user {username}")));
        }
        Ok(db::user_plans::list_user_plans(&self.pool, username).await?)
    }

    pub async fn has_any_assignment(&self, username: &str) -> AppResult<bool> {
        Ok(db::user_plans::user_has_any_plan(&self.pool, username).await?)
    }

    pub async fn is_on_plan(&self, username: &str, plan_name: &str) -> AppResult<bool> {
        Ok(db::user_plans::user_on_plan(&self.pool, username, plan_name).await?)
    }

    /// Creates an assignment starting at `now` and seeds its quotas from the plan defaults
    /// in one transaction.
    pub async fn activate(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Activation> {
        let mut tx = self.pool.begin().await?;
        let result = db::user_plans::insert_user_plan_with_quotas(
            &mut tx,
            self.new_user_plan(user_id, plan_id, now),
        )
        .await;

        match result {
            Ok((user_plan_id, seeded_quotas)) => {
                tx.commit().await?;
                tracing::info!(
                    parent: &self.span,
                    %user_id,
                    %plan_id,
                    %user_plan_id,
                    seeded_quotas,
                    "activated plan"
                );
                Ok(Activation {
                    user_plan_id,
                    seeded_quotas,
                })
            }
            Err(err) => {
                tracing::error!(
                    parent: &self.span,
                    ?err,
                    %user_id,
                    %plan_id,
                    "plan activation failed; rolling back"
                );
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(parent: &self.span, ?rollback_err, "rollback failed");
                }
                Err(err.into())
            }
        }
    }

    /// Activates `plan_name` for `username`, creating the user row when needed.
    pub async fn subscribe(
        &self,
        username: &str,
        plan_name: &str,
        now: DateTime<Utc>,
    ) -> AppResult<UserPlan> {
        let mut tx = self.pool.begin().await?;

        let plan = db::catalog::plan_by_name(&mut *tx, plan_name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("plan {plan_name}")))?;
        let user_id = db::users::ensure_user(&mut *tx, username).await?;
        let (user_plan_id, seeded_quotas) = db::user_plans::insert_user_plan_with_quotas(
            &mut tx,
            self.new_user_plan(user_id, plan.id, now),
        )
        .await?;
        let user_plan = db::user_plans::user_plan_by_id(&mut *tx, user_plan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("subscription {user_plan_id}")))?;

        tx.commit().await?;

        tracing::info!(
            parent: &self.span,
            %username,
            plan = %plan.name,
            %user_plan_id,
            seeded_quotas,
            "subscribed user to plan"
        );
        Ok(user_plan)
    }

    /// Single-statement upsert; no prior existence read.
    pub async fn set_quota(
        &self,
        value: f64,
        resource_type_id: Uuid,
        subscription_id: Uuid,
    ) -> AppResult<Quota> {
        Ok(db::quotas::set_quota(
            &self.pool,
            value,
            resource_type_id,
            subscription_id,
            &self.actor,
        )
        .await?)
    }

    pub async fn list_usages(&self, user_plan_id: Uuid) -> AppResult<Vec<Usage>> {
        Ok(db::usages::user_plan_usages(&self.pool, user_plan_id).await?)
    }

    pub async fn list_quotas(&self, user_plan_id: Uuid) -> AppResult<Vec<Quota>> {
        Ok(db::quotas::user_plan_quotas(&self.pool, user_plan_id).await?)
    }

    pub async fn list_plan_defaults(&self, plan_id: Uuid) -> AppResult<Vec<PlanQuotaDefault>> {
        Ok(db::catalog::plan_quota_defaults(&self.pool, plan_id).await?)
    }

    /// Defaults, quotas and usages for one assignment. Each list is read separately.
    pub async fn assignment_details(&self, user_plan: &UserPlan) -> AppResult<UserPlanDetails> {
        let defaults = self.list_plan_defaults(user_plan.plan.id).await?;
        let quotas = self.list_quotas(user_plan.id).await?;
        let usages = self.list_usages(user_plan.id).await?;
        tracing::debug!(
            parent: &self.span,
            user_plan = %user_plan.id,
            defaults = defaults.len(),
            quotas = quotas.len(),
            usages = usages.len(),
            "collected assignment details"
        );
        Ok(UserPlanDetails {
            defaults,
            quotas,
            usages,
        })
    }

    pub async fn user_summary(&self, username: &str, now: DateTime<Utc>) -> AppResult<UserSummary> {
        let assignment = self
            .active_assignment(username, now)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("active plan for {username}")))?;
        let details = self.assignment_details(&assignment).await?;
        Ok(UserSummary {
            assignment,
            details,
        })
    }

    fn new_user_plan(&self, user_id: Uuid, plan_id: Uuid, now: DateTime<Utc>) -> NewUserPlan<'_> {
        NewUserPlan {
            user_id,
            plan_id,
            effective_start_date: now,
            effective_end_date: Some(now + Months::new(ACTIVATION_WINDOW_MONTHS)),
            actor: &self.actor,
        }
    }
}

#[async_trait]
impl QuotaLedger for SubscriptionService {
    async fn current_quota(
        &self,
        resource_type_id: Uuid,
        subscription_id: Uuid,
    ) -> AppResult<(f64, bool)> {
        Ok(db::quotas::current_quota(&self.pool, resource_type_id, subscription_id).await?)
    }

    async fn upsert_quota(
        &self,
        exists: bool,
        value: f64,
        resource_type_id: Uuid,
        subscription_id: Uuid,
    ) -> AppResult<()> {
        let mut conn = self.pool.acquire().await?;
        db::quotas::upsert_quota(
            &mut conn,
            exists,
            value,
            resource_type_id,
            subscription_id,
            &self.actor,
        )
        .await?;
        Ok(())
    }
}
