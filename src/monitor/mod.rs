//! GraphQL 请求监控模块
//!
//! 记录最近的请求日志，派生聚合指标、时间线、错误日志和导出数据

pub mod buffer;
pub mod device;
pub mod export;
pub mod metrics;
pub mod model;
mod service;
pub mod timeline;

pub use service::{Monitor, MonitorConfig};
