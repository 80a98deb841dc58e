use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    Plan, PlanQuotaDefault, ResourceType, SubscriptionService, UserPlan, UserPlanDetails,
    UserSummary,
};
use crate::error::{AppError, AppResult};
use crate::rpc::{QuotaResponse, QuotaRpcHandler};

/// key: subscriptions-api -> rest endpoints
pub async fn list_resource_types(
    Extension(service): Extension<SubscriptionService>,
) -> AppResult<Json<Vec<ResourceType>>> {
    Ok(Json(service.list_resource_types().await?))
}

pub async fn list_plans(
    Extension(service): Extension<SubscriptionService>,
) -> AppResult<Json<Vec<Plan>>> {
    Ok(Json(service.list_plans().await?))
}

pub async fn list_plan_defaults(
    Extension(service): Extension<SubscriptionService>,
    Path(plan_id): Path<Uuid>,
) -> AppResult<Json<Vec<PlanQuotaDefault>>> {
    Ok(Json(service.list_plan_defaults(plan_id).await?))
}

pub async fn user_summary(
    Extension(service): Extension<SubscriptionService>,
    Path(username): Path<String>,
) -> AppResult<Json<UserSummary>> {
    Ok(Json(service.user_summary(&username, Utc::now()).await?))
}

pub async fn subscribe(
    Extension(service): Extension<SubscriptionService>,
    Path(username): Path<String>,
    Json(payload): Json<SubscribeRequest>,
) -> AppResult<Json<UserPlan>> {
    let plan_name = payload.plan_name.trim();
    if plan_name.is_empty() {
        return Err(AppError::Validation("plan_name required".into()));
    }
    if username.trim().is_empty() {
        return Err(AppError::Validation("username required".into()));
    }
    Ok(Json(service.subscribe(&username, plan_name, Utc::now()).await?))
}

pub async fn assignment_history(
    Extension(service): Extension<SubscriptionService>,
    Path(username): Path<String>,
) -> AppResult<Json<AssignmentHistory>> {
    let now = Utc::now();
    let assignments = service.list_assignments(&username).await?;
    let has_any = service.has_any_assignment(&username).await?;
    let assignments = assignments
        .into_iter()
        .map(|assignment| AssignmentHistoryEntry {
            active: assignment.is_active_at(now),
            assignment,
        })
        .collect();
    Ok(Json(AssignmentHistory {
        has_any,
        assignments,
    }))
}

pub async fn is_on_plan(
    Extension(service): Extension<SubscriptionService>,
    Path((username, plan_name)): Path<(String, String)>,
) -> AppResult<Json<OnPlanResponse>> {
    let on_plan = service.is_on_plan(&username, &plan_name).await?;
    Ok(Json(OnPlanResponse { on_plan }))
}

pub async fn assignment_details(
    Extension(service): Extension<SubscriptionService>,
    Path(user_plan_id): Path<Uuid>,
) -> AppResult<Json<UserPlanDetails>> {
    let assignment = service.assignment(user_plan_id).await?;
    Ok(Json(service.assignment_details(&assignment).await?))
}

/// Same payload and reply shape as the bus request; the status mirrors the error kind.
pub async fn set_quota(
    Extension(handler): Extension<Arc<QuotaRpcHandler>>,
    body: Bytes,
) -> (StatusCode, Json<QuotaResponse>) {
    let response = handler.process(&body).await;
    let status = response
        .error
        .as_ref()
        .and_then(|error| StatusCode::from_u16(error.status_code).ok())
        .unwrap_or(StatusCode::OK);
    (status, Json(response))
}

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub plan_name: String,
}

#[derive(Debug, Serialize)]
pub struct AssignmentHistoryEntry {
    #[serde(flatten)]
    pub assignment: UserPlan,
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct AssignmentHistory {
    pub has_any: bool,
    pub assignments: Vec<AssignmentHistoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct OnPlanResponse {
    pub on_plan: bool,
}
