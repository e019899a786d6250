//! 监控服务错误类型

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use crate::api::types::ErrorResponse;

/// 监控核心对外暴露的错误
///
/// 持久化失败不在此列：镜像写入的错误只记录日志，从不传给调用方。
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("告警 {id} 不存在")]
    AlertNotFound { id: String },

    #[error("事件 {id} 不存在")]
    IncidentNotFound { id: String },

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Internal(String),
}

impl MonitorError {
    /// 对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AlertNotFound { .. } | Self::IncidentNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 错误类型标识（写入响应体 error.type）
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::AlertNotFound { .. } | Self::IncidentNotFound { .. } => "not_found",
            Self::Validation(_) => "invalid_request_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for MonitorError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::new(self.error_type(), self.to_string());
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<anyhow::Error> for MonitorError {
    fn from(e: anyhow::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let not_found = MonitorError::AlertNotFound {
            id: "high-error-rate-1".to_string(),
        };
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);
        assert!(not_found.to_string().contains("high-error-rate-1"));

        assert_eq!(
            MonitorError::Validation("duration 不能为负数".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            MonitorError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
