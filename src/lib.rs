pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod rpc;
pub mod subscriptions;
pub mod telemetry;
