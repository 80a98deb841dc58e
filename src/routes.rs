use axum::{
    routing::{get, post},
    Router,
};

use crate::subscriptions;

pub fn api_routes() -> Router {
    Router::new()
        .route(
            "/api/resource-types",
            get(subscriptions::subscriptions_list_resource_types),
        )
        .route("/api/plans", get(subscriptions::subscriptions_list_plans))
        .route(
            "/api/plans/:plan_id/defaults",
            get(subscriptions::subscriptions_list_plan_defaults),
        )
        .route(
            "/api/users/:username/plan",
            get(subscriptions::subscriptions_user_summary)
                .put(subscriptions::subscriptions_subscribe),
        )
        .route(
            "/api/users/:username/plans",
            get(subscriptions::subscriptions_assignment_history),
        )
        .route(
            "/api/users/:username/plans/:plan_name",
            get(subscriptions::subscriptions_is_on_plan),
        )
        .route(
            "/api/subscriptions/:id/details",
            get(subscriptions::subscriptions_assignment_details),
        )
        .route("/api/quotas", post(subscriptions::subscriptions_set_quota))
}
