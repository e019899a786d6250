//! 告警数据模型

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 告警类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Error,
    Warning,
    Info,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

/// 严重程度（告警与事件共用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// 内置阈值规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertRule {
    /// 错误率（%）超过阈值
    HighErrorRate,
    /// 平均响应时间（ms）超过阈值
    SlowResponse,
    /// 窗口内错误数超过阈值
    HighErrorCount,
}

impl AlertRule {
    pub const ALL: [AlertRule; 3] = [
        AlertRule::HighErrorRate,
        AlertRule::SlowResponse,
        AlertRule::HighErrorCount,
    ];

    /// 规则标识（同时用作告警 ID 前缀）
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighErrorRate => "high-error-rate",
            Self::SlowResponse => "slow-response",
            Self::HighErrorCount => "high-error-count",
        }
    }

    pub fn alert_type(&self) -> AlertType {
        match self {
            Self::HighErrorRate | Self::HighErrorCount => AlertType::Error,
            Self::SlowResponse => AlertType::Warning,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::HighErrorRate | Self::HighErrorCount => Severity::High,
            Self::SlowResponse => Severity::Medium,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::HighErrorRate => "High Error Rate Detected",
            Self::SlowResponse => "Slow Response Times",
            Self::HighErrorCount => "Multiple API Errors",
        }
    }

    /// 渲染告警正文
    pub fn message(&self, current: f64, threshold: f64) -> String {
        match self {
            Self::HighErrorRate => {
                format!("Error rate is {:.2}% - exceeds {}% threshold", current, threshold)
            }
            Self::SlowResponse => format!(
                "Average response time is {}ms - exceeds {}ms threshold",
                current, threshold
            ),
            Self::HighErrorCount => format!(
                "{} errors detected in recent requests - exceeds {} threshold",
                current, threshold
            ),
        }
    }
}

impl fmt::Display for AlertRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 规则比较详情
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertThreshold {
    pub current: f64,
    pub threshold: f64,
}

/// 告警记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    /// 触发该告警的规则（手动创建的告警为空）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<AlertRule>,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<AlertThreshold>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// 未恢复即为活跃告警
    pub fn is_active(&self) -> bool {
        self.resolved_at.is_none()
    }
}

/// 手动创建告警的参数
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAlert {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub threshold: Option<AlertThreshold>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_identity_strings() {
        assert_eq!(AlertRule::HighErrorRate.as_str(), "high-error-rate");
        assert_eq!(AlertRule::SlowResponse.to_string(), "slow-response");
        assert_eq!(
            serde_json::to_string(&AlertRule::HighErrorCount).unwrap(),
            r#""high-error-count""#
        );
    }

    #[test]
    fn test_rule_table() {
        assert_eq!(AlertRule::HighErrorRate.severity(), Severity::High);
        assert_eq!(AlertRule::SlowResponse.severity(), Severity::Medium);
        assert_eq!(AlertRule::HighErrorCount.severity(), Severity::High);
        assert_eq!(AlertRule::SlowResponse.alert_type(), AlertType::Warning);
    }

    #[test]
    fn test_alert_serializes_type_field() {
        let alert = Alert {
            id: "slow-response-1".to_string(),
            rule: Some(AlertRule::SlowResponse),
            alert_type: AlertType::Warning,
            severity: Severity::Medium,
            title: "Slow Response Times".to_string(),
            message: "Average response time is 700ms".to_string(),
            threshold: Some(AlertThreshold {
                current: 700.0,
                threshold: 500.0,
            }),
            created_at: Utc::now(),
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
        };

        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["type"], "warning");
        assert_eq!(json["severity"], "medium");
        assert_eq!(json["rule"], "slow-response");
        assert!(json.get("resolvedAt").is_none());

        let back: Alert = serde_json::from_value(json).unwrap();
        assert_eq!(back, alert);
    }
}
