pub mod app;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod pattern;
pub mod permission;
pub mod services;
pub mod store;
pub mod views;

pub use app::{router, AppState};
