//! 阈值告警模块

pub mod engine;
pub mod model;

pub use engine::{AlertEngine, AlertEngineConfig};
