//! 健康检查：根据当前指标判断服务是否健康并记录样本

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::monitor::Monitor;
use crate::monitor::model::MetricsSnapshot;

use super::model::{UptimeRecord, UptimeStatus};
use super::tracker::UptimeTracker;

/// 错误率上限（%）
const MAX_ERROR_RATE: f64 = 10.0;
/// 平均响应时间上限（ms）
const MAX_AVG_RESPONSE_MS: f64 = 1000.0;

/// 一次健康检查的结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub healthy: bool,
    pub status: UptimeStatus,
    pub metrics: MetricsSnapshot,
    pub record: UptimeRecord,
    pub timestamp: DateTime<Utc>,
}

pub fn is_healthy(metrics: &MetricsSnapshot) -> bool {
    metrics.error_rate < MAX_ERROR_RATE && metrics.average_response_time < MAX_AVG_RESPONSE_MS
}

/// 执行健康检查并把结果写入可用性历史
pub fn run_health_check(monitor: &Monitor, tracker: &UptimeTracker) -> HealthReport {
    let metrics = monitor.metrics();
    let healthy = is_healthy(&metrics);
    let timestamp = Utc::now();
    let record = UptimeRecord {
        timestamp,
        is_up: healthy,
        response_time: Some(metrics.average_response_time),
        status_code: Some(if healthy { 200 } else { 500 }),
    };
    tracker.record(record.clone());
    let status = tracker.status();

    if !healthy {
        tracing::warn!(
            error_rate = metrics.error_rate,
            avg_ms = metrics.average_response_time,
            status = status.as_str(),
            "健康检查未通过"
        );
    }

    HealthReport {
        healthy,
        status,
        metrics,
        record,
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::model::{HttpMethod, RequestLogEntry};

    #[test]
    fn test_healthy_when_idle() {
        let monitor = Monitor::in_memory();
        let tracker = UptimeTracker::in_memory();
        let report = run_health_check(&monitor, &tracker);
        assert!(report.healthy);
        assert_eq!(report.record.status_code, Some(200));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_unhealthy_on_errors() {
        let monitor = Monitor::in_memory();
        let tracker = UptimeTracker::in_memory();
        monitor.log_request(RequestLogEntry::new(HttpMethod::Post, 20.0, 200));
        monitor.log_request(RequestLogEntry::new(HttpMethod::Post, 20.0, 500));

        let report = run_health_check(&monitor, &tracker);
        assert!(!report.healthy);
        assert_eq!(report.record.status_code, Some(500));
        assert_eq!(report.status, UptimeStatus::Down);
    }

    #[test]
    fn test_thresholds_are_strict() {
        let mut metrics = MetricsSnapshot::empty();
        metrics.error_rate = 10.0;
        assert!(!is_healthy(&metrics));
        metrics.error_rate = 9.99;
        metrics.average_response_time = 999.0;
        assert!(is_healthy(&metrics));
    }
}
