//! API 共享状态与认证中间件

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};

use crate::alert::AlertEngine;
use crate::common::auth;
use crate::monitor::Monitor;
use crate::uptime::UptimeTracker;

use super::types::ErrorResponse;

/// API 共享状态
#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<Monitor>,
    pub alerts: Arc<AlertEngine>,
    pub uptime: Arc<UptimeTracker>,
    /// 配置后所有路由都需要认证
    pub admin_api_key: Option<String>,
    /// SSE 指标推送间隔
    pub stream_interval: Duration,
}

impl AppState {
    pub fn new(monitor: Arc<Monitor>, alerts: Arc<AlertEngine>, uptime: Arc<UptimeTracker>) -> Self {
        Self {
            monitor,
            alerts,
            uptime,
            admin_api_key: None,
            stream_interval: Duration::from_secs(2),
        }
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.admin_api_key = key.filter(|k| !k.is_empty());
        self
    }

    pub fn with_stream_interval(mut self, interval: Duration) -> Self {
        self.stream_interval = interval;
        self
    }
}

/// API Key 认证中间件（未配置密钥时放行）
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.admin_api_key.as_deref() else {
        return next.run(request).await;
    };

    match auth::extract_api_key(&request) {
        Some(key) if auth::constant_time_eq(&key, expected) => next.run(request).await,
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::authentication_error()),
        )
            .into_response(),
    }
}
