//! HTTP 接口的请求与响应类型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alert::model::Alert;
use crate::error::MonitorError;
use crate::monitor::model::{
    DeviceInfo, ErrorLogEntry, HttpMethod, MetricsSnapshot, RequestLogEntry, TimelinePoint,
};
use crate::uptime::model::{Incident, UptimeStatus};

// ============ 错误响应 ============

/// 错误响应
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                error_type: error_type.into(),
                message: message.into(),
            },
        }
    }

    pub fn authentication_error() -> Self {
        Self::new("authentication_error", "Invalid or missing API key")
    }
}

// ============ 请求 ============

/// POST /api/monitoring/requests 请求体
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRequestBody {
    pub method: String,
    pub duration: f64,
    pub status: i64,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub operation_name: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    /// 未提供时使用接收时刻
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl LogRequestBody {
    /// 校验后转换为请求日志；`device` 由请求头推导
    pub fn into_entry(self, device: DeviceInfo) -> Result<RequestLogEntry, MonitorError> {
        let method: HttpMethod = self.method.parse().map_err(MonitorError::Validation)?;
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(MonitorError::Validation(format!(
                "duration 必须是非负数: {}",
                self.duration
            )));
        }
        let status = u16::try_from(self.status)
            .ok()
            .filter(|s| (100..=599).contains(s))
            .ok_or_else(|| MonitorError::Validation(format!("无效的 HTTP 状态码: {}", self.status)))?;

        let mut entry = RequestLogEntry::new(method, self.duration, status).with_device(device);
        entry.query = self.query;
        entry.operation_name = self.operation_name;
        entry.error = self.error;
        if let Some(ts) = self.timestamp {
            entry.timestamp = ts;
        }
        Ok(entry)
    }
}

/// 通用 `limit` 查询参数
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

/// GET /api/monitoring/search 查询参数
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /api/monitoring/export 查询参数
#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
    pub limit: Option<usize>,
}

/// GET /api/alerts 查询参数
#[derive(Debug, Default, Deserialize)]
pub struct AlertsQuery {
    pub action: Option<String>,
    pub limit: Option<usize>,
}

/// POST /api/alerts 请求体
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertActionRequest {
    pub action: String,
    pub alert_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

// ============ 响应 ============

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsResponse {
    pub metrics: MetricsSnapshot,
    pub timeline: Vec<TimelinePoint>,
    pub recent_requests: Vec<RequestLogEntry>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ErrorsResponse {
    pub errors: Vec<ErrorLogEntry>,
    pub count: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<RequestLogEntry>,
    pub total: usize,
    pub query: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonExport {
    pub requests: Vec<RequestLogEntry>,
    pub errors: Vec<ErrorLogEntry>,
    pub exported_at: DateTime<Utc>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    pub alerts: Vec<Alert>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AlertResponse {
    pub alert: Alert,
}

#[derive(Debug, Serialize)]
pub struct IncidentsResponse {
    pub incidents: Vec<Incident>,
    pub count: usize,
}

/// 状态页
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPageResponse {
    pub status: UptimeStatus,
    pub uptime: UptimeWindows,
    /// 当前窗口的请求指标摘要
    pub metrics: MetricsSnapshot,
    pub active_incidents: Vec<Incident>,
    pub timestamp: DateTime<Utc>,
}

/// 各时间窗口的可用率（%）
#[derive(Debug, Serialize)]
pub struct UptimeWindows {
    #[serde(rename = "24h")]
    pub day: f64,
    #[serde(rename = "7d")]
    pub week: f64,
    #[serde(rename = "30d")]
    pub month: f64,
}

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub accepted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(json: serde_json::Value) -> LogRequestBody {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_into_entry_valid() {
        let entry = body(serde_json::json!({
            "method": "post",
            "duration": 42.5,
            "status": 200,
            "operationName": "GetAlumni"
        }))
        .into_entry(DeviceInfo::default())
        .unwrap();
        assert_eq!(entry.method, HttpMethod::Post);
        assert_eq!(entry.operation_name.as_deref(), Some("GetAlumni"));
    }

    #[test]
    fn test_into_entry_rejects_malformed() {
        let cases = [
            serde_json::json!({"method": "POST", "duration": -1.0, "status": 200}),
            serde_json::json!({"method": "POST", "duration": 1.0, "status": 700}),
            serde_json::json!({"method": "POST", "duration": 1.0, "status": -5}),
            serde_json::json!({"method": "TRACE", "duration": 1.0, "status": 200}),
        ];
        for case in cases {
            let err = body(case).into_entry(DeviceInfo::default()).unwrap_err();
            assert!(matches!(err, MonitorError::Validation(_)));
        }
    }

    #[test]
    fn test_uptime_windows_keys() {
        let json = serde_json::to_value(UptimeWindows {
            day: 100.0,
            week: 99.5,
            month: 98.0,
        })
        .unwrap();
        assert_eq!(json["24h"], 100.0);
        assert_eq!(json["30d"], 98.0);
    }
}
