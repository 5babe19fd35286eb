pub mod app;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
