//! 可用性样本与故障事件模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alert::model::Severity;

/// 一次健康检查的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UptimeRecord {
    pub timestamp: DateTime<Utc>,
    pub is_up: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl UptimeRecord {
    pub fn up(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            is_up: true,
            response_time: None,
            status_code: Some(200),
        }
    }

    pub fn down(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            is_up: false,
            response_time: None,
            status_code: Some(500),
        }
    }
}

/// 粗粒度服务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UptimeStatus {
    Operational,
    Degraded,
    Down,
}

impl UptimeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Operational => "operational",
            Self::Degraded => "degraded",
            Self::Down => "down",
        }
    }
}

/// 故障/降级事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: String,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// 持续时间（毫秒）= endTime - startTime
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub resolved: bool,
}

/// 创建事件的参数
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIncident {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub severity: Severity,
    /// 未指定时取创建时刻
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_str_matches_serde() {
        for status in [UptimeStatus::Operational, UptimeStatus::Degraded, UptimeStatus::Down] {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, status.as_str());
        }
    }
}
