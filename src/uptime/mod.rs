//! 可用性追踪模块

pub mod health;
pub mod model;
pub mod tracker;

pub use health::run_health_check;
pub use tracker::{UptimeConfig, UptimeTracker};
