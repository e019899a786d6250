//! HTTP API 模块

mod handlers;
pub mod middleware;
mod router;
mod sse;
pub mod types;

pub use middleware::AppState;
pub use router::create_api_router;
