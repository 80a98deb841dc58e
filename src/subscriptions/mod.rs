pub mod api;
pub mod models;
pub mod service;

pub use api::{
    assignment_details as subscriptions_assignment_details,
    assignment_history as subscriptions_assignment_history,
    is_on_plan as subscriptions_is_on_plan, list_plan_defaults as subscriptions_list_plan_defaults,
    list_plans as subscriptions_list_plans,
    list_resource_types as subscriptions_list_resource_types,
    set_quota as subscriptions_set_quota, subscribe as subscriptions_subscribe,
    user_summary as subscriptions_user_summary, AssignmentHistory, AssignmentHistoryEntry,
    OnPlanResponse, SubscribeRequest,
};
pub use models::{
    Activation, Plan, PlanQuotaDefault, Quota, ResourceType, Usage, User, UserPlan,
    UserPlanDetails, UserSummary,
};
pub use service::{QuotaLedger, SubscriptionService, ACTIVATION_WINDOW_MONTHS};
