pub mod analytics;
pub mod api;
pub mod config;
pub mod dispatch;
pub mod event;
pub mod ingest;
pub mod metadata;
pub mod metrics_middleware;
pub mod prometheus;
pub mod query;
pub mod recording;
pub mod router;
pub mod script;
pub mod server;
pub mod sinks;
pub mod time;
pub mod user_agent;
