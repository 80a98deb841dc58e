use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// key: subscriptions-models -> catalog,assignments,ledger
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ResourceType {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
}

/// Quota a plan grants for one resource type when it is activated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanQuotaDefault {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub quota_value: f64,
    pub resource_type: ResourceType,
}

/// One time-bounded binding of a user to a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPlan {
    pub id: Uuid,
    pub user: User,
    pub plan: Plan,
    pub effective_start_date: DateTime<Utc>,
    pub effective_end_date: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub last_modified_by: String,
    pub last_modified_at: DateTime<Utc>,
}

impl UserPlan {
    /// Open-ended assignments only count once their start has strictly passed.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        match self.effective_end_date {
            Some(end) => self.effective_start_date <= now && now < end,
            None => self.effective_start_date < now,
        }
    }
}

/// Effective quota for a resource type within one assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quota {
    pub id: Uuid,
    pub user_plan_id: Uuid,
    pub quota_value: f64,
    pub resource_type: ResourceType,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub last_modified_by: String,
    pub last_modified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub id: Uuid,
    pub user_plan_id: Uuid,
    pub usage_value: f64,
    pub resource_type: ResourceType,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub last_modified_by: String,
    pub last_modified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPlanDetails {
    pub defaults: Vec<PlanQuotaDefault>,
    pub quotas: Vec<Quota>,
    pub usages: Vec<Usage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub assignment: UserPlan,
    #[serde(flatten)]
    pub details: UserPlanDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Activation {
    pub user_plan_id: Uuid,
    pub seeded_quotas: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn assignment(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> UserPlan {
        UserPlan {
            id: Uuid::new_v4(),
            user: User {
                id: Uuid::new_v4(),
                username: "alice".into(),
            },
            plan: Plan {
                id: Uuid::new_v4(),
                name: "Basic".into(),
                description: None,
            },
            effective_start_date: start,
            effective_end_date: end,
            created_by: "de".into(),
            created_at: start,
            last_modified_by: "de".into(),
            last_modified_at: start,
        }
    }

    #[test]
    fn bounded_window_is_half_open() {
        let now = Utc::now();
        let plan = assignment(now, Some(now + Duration::days(1)));
        assert!(plan.is_active_at(now));
        assert!(plan.is_active_at(now + Duration::hours(23)));
        assert!(!plan.is_active_at(now + Duration::days(1)));
        assert!(!plan.is_active_at(now - Duration::seconds(1)));
    }

    #[test]
    fn open_ended_window_requires_strictly_later_instant() {
        let now = Utc::now();
        let plan = assignment(now, None);
        assert!(!plan.is_active_at(now));
        assert!(plan.is_active_at(now + Duration::milliseconds(1)));
        assert!(plan.is_active_at(now + Duration::days(3650)));
    }
}
