pub mod auth;
pub mod metrics;
pub mod payments;
pub mod payments_summary;
