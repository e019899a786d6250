//! 请求日志与派生指标数据模型

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::two_decimals;

/// HTTP 方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            other => Err(format!("不支持的 HTTP 方法: {}", other)),
        }
    }
}

/// 请求来源设备信息（入库时附加）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

/// 一次 GraphQL API 调用的记录
///
/// 写入缓冲区后不可变。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLogEntry {
    pub method: HttpMethod,
    /// 耗时（毫秒，非负）
    pub duration: f64,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub device: DeviceInfo,
}

impl RequestLogEntry {
    pub fn new(method: HttpMethod, duration: f64, status: u16) -> Self {
        Self {
            method,
            duration,
            status,
            query: None,
            operation_name: None,
            error: None,
            timestamp: Utc::now(),
            device: DeviceInfo::default(),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_device(mut self, device: DeviceInfo) -> Self {
        self.device = device;
        self
    }

    /// 状态码 >= 400 或带有错误信息即视为错误
    pub fn is_error(&self) -> bool {
        self.status >= 400 || self.error.is_some()
    }

    pub fn performance_level(&self) -> PerformanceLevel {
        PerformanceLevel::classify(self.duration)
    }
}

/// 请求性能分级（持久化时写入）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceLevel {
    Fast,
    Medium,
    Slow,
}

impl PerformanceLevel {
    pub fn classify(duration_ms: f64) -> Self {
        if duration_ms > 500.0 {
            Self::Slow
        } else if duration_ms > 100.0 {
            Self::Medium
        } else {
            Self::Fast
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Medium => "medium",
            Self::Slow => "slow",
        }
    }
}

/// 窗口内的聚合指标
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub total_requests: usize,
    /// 平均耗时，四舍五入到整数毫秒
    pub average_response_time: f64,
    pub slowest_request: f64,
    pub fastest_request: f64,
    pub error_count: usize,
    /// 错误率百分比，两位小数
    #[serde(with = "two_decimals")]
    pub error_rate: f64,
    /// 窗口请求数 / 固定秒数，截断到两位小数
    #[serde(with = "two_decimals")]
    pub requests_per_second: f64,
}

impl MetricsSnapshot {
    /// 空窗口时的零值快照
    pub fn empty() -> Self {
        Self {
            total_requests: 0,
            average_response_time: 0.0,
            slowest_request: 0.0,
            fastest_request: 0.0,
            error_count: 0,
            error_rate: 0.0,
            requests_per_second: 0.0,
        }
    }
}

/// 时间线中的一个桶
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    /// 桶结束时刻（HH:MM:SS）
    pub time: String,
    pub count: usize,
    /// 桶内平均耗时（整数毫秒），空桶为 0
    pub avg_duration: f64,
}

/// 错误日志条目
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLogEntry {
    pub timestamp: DateTime<Utc>,
    /// 错误信息，缺失时为 `HTTP <status>`
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub status: u16,
}

impl From<&RequestLogEntry> for ErrorLogEntry {
    fn from(entry: &RequestLogEntry) -> Self {
        Self {
            timestamp: entry.timestamp,
            error: entry
                .error
                .clone()
                .unwrap_or_else(|| format!("HTTP {}", entry.status)),
            query: entry.query.clone(),
            status: entry.status,
        }
    }
}

/// 耗时分布统计
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestStatistics {
    pub success_count: usize,
    pub error_count: usize,
    pub avg_duration: f64,
    pub median_duration: f64,
    pub p95_duration: f64,
    pub p99_duration: f64,
}

impl RequestStatistics {
    pub fn empty() -> Self {
        Self {
            success_count: 0,
            error_count: 0,
            avg_duration: 0.0,
            median_duration: 0.0,
            p95_duration: 0.0,
            p99_duration: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse_case_insensitive() {
        assert_eq!("post".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
        assert_eq!("GET".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert!("TRACE".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn test_is_error() {
        assert!(!RequestLogEntry::new(HttpMethod::Post, 10.0, 200).is_error());
        assert!(RequestLogEntry::new(HttpMethod::Post, 10.0, 404).is_error());
        assert!(
            RequestLogEntry::new(HttpMethod::Post, 10.0, 200)
                .with_error("resolver failed")
                .is_error()
        );
    }

    #[test]
    fn test_performance_level_boundaries() {
        assert_eq!(PerformanceLevel::classify(100.0), PerformanceLevel::Fast);
        assert_eq!(PerformanceLevel::classify(100.5), PerformanceLevel::Medium);
        assert_eq!(PerformanceLevel::classify(500.0), PerformanceLevel::Medium);
        assert_eq!(PerformanceLevel::classify(501.0), PerformanceLevel::Slow);
    }

    #[test]
    fn test_entry_deserialize_with_device() {
        let json = r#"{
            "method": "POST",
            "duration": 42.5,
            "status": 200,
            "operationName": "GetAlumni",
            "timestamp": "2026-10-17T08:00:00Z",
            "browser": "Firefox",
            "country": "Indonesia"
        }"#;

        let entry: RequestLogEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.method, HttpMethod::Post);
        assert_eq!(entry.operation_name.as_deref(), Some("GetAlumni"));
        assert_eq!(entry.device.browser.as_deref(), Some("Firefox"));
        assert_eq!(entry.device.country.as_deref(), Some("Indonesia"));
        assert!(entry.query.is_none());
    }

    #[test]
    fn test_snapshot_serializes_rates_as_strings() {
        let json = serde_json::to_value(MetricsSnapshot::empty()).unwrap();
        assert_eq!(json["errorRate"], "0.00");
        assert_eq!(json["requestsPerSecond"], "0.00");
        assert_eq!(json["totalRequests"], 0);
    }

    #[test]
    fn test_error_log_entry_fallback_message() {
        let entry = RequestLogEntry::new(HttpMethod::Post, 5.0, 502);
        let logged = ErrorLogEntry::from(&entry);
        assert_eq!(logged.error, "HTTP 502");
    }
}
