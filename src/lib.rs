pub mod app;
pub mod app_state;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod middleware;
pub mod modules;
pub mod payment;
pub mod services;
pub mod session;
pub mod telemetry;
pub mod video;
