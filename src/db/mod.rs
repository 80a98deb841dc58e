pub mod catalog;
pub mod quotas;
pub mod usages;
pub mod user_plans;
pub mod users;
