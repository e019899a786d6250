//! 可用性追踪：健康检查样本环形缓冲区与故障事件表

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::common::round2;
use crate::error::MonitorError;
use crate::model::config::Config;
use crate::monitor::buffer::RecentBuffer;
use crate::store::{Persistence, StoreOp};

use super::model::{Incident, NewIncident, UptimeRecord, UptimeStatus};

/// 可用性追踪参数
#[derive(Debug, Clone)]
pub struct UptimeConfig {
    pub capacity: usize,
    /// 计算当前状态时参考的最近样本数
    pub status_sample_size: usize,
}

impl Default for UptimeConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for UptimeConfig {
    fn from(config: &Config) -> Self {
        Self {
            capacity: config.uptime_capacity,
            status_sample_size: config.status_sample_size.max(1),
        }
    }
}

/// 可用性追踪器
///
/// 事件的开启与关闭由外部根据 `status()` 的变化决定，这里只负责存储和查询。
pub struct UptimeTracker {
    config: UptimeConfig,
    records: RecentBuffer<UptimeRecord>,
    incidents: Mutex<HashMap<String, Incident>>,
    persistence: Option<Arc<Persistence>>,
}

impl UptimeTracker {
    pub fn new(config: UptimeConfig, persistence: Option<Arc<Persistence>>) -> Self {
        Self {
            records: RecentBuffer::new(config.capacity),
            incidents: Mutex::new(HashMap::new()),
            config,
            persistence,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(UptimeConfig::default(), None)
    }

    fn mirror(&self, op: StoreOp) {
        if let Some(persistence) = &self.persistence {
            persistence.submit(op);
        }
    }

    /// 记录一次健康检查样本
    pub fn record(&self, sample: UptimeRecord) {
        tracing::trace!(is_up = sample.is_up, "记录健康检查样本");
        self.mirror(StoreOp::Uptime(sample.clone()));
        self.records.push(sample);
    }

    /// 最近 `limit` 个样本（最新在前）
    pub fn recent(&self, limit: usize) -> Vec<UptimeRecord> {
        self.records.recent(limit)
    }

    /// 最近 `hours` 小时内的可用率（百分比，两位小数）；无样本时为 100
    ///
    /// 只限定窗口下界，客户端时钟偏快导致的未来时间样本同样计入。
    pub fn uptime_percentage(&self, hours: u32) -> f64 {
        self.uptime_percentage_at(hours, Utc::now())
    }

    pub fn uptime_percentage_at(&self, hours: u32, now: DateTime<Utc>) -> f64 {
        let since = now - Duration::hours(i64::from(hours));
        let window = self
            .records
            .filter(usize::MAX, |r| r.timestamp >= since);
        if window.is_empty() {
            return 100.0;
        }
        let up = window.iter().filter(|r| r.is_up).count();
        round2(up as f64 / window.len() as f64 * 100.0)
    }

    /// 按最近样本的在线比例给出粗粒度状态；无样本时视为正常
    pub fn status(&self) -> UptimeStatus {
        let samples = self.records.recent(self.config.status_sample_size);
        if samples.is_empty() {
            return UptimeStatus::Operational;
        }
        let up = samples.iter().filter(|r| r.is_up).count();
        if up == samples.len() {
            UptimeStatus::Operational
        } else if up * 10 >= samples.len() * 9 {
            UptimeStatus::Degraded
        } else {
            UptimeStatus::Down
        }
    }

    /// 开启事件
    pub fn create_incident(&self, new: NewIncident) -> Incident {
        let incident = Incident {
            id: format!("incident-{}", Uuid::new_v4().simple()),
            start_time: new.start_time.unwrap_or_else(Utc::now),
            end_time: None,
            duration: None,
            title: new.title,
            description: new.description,
            severity: new.severity,
            resolved: false,
        };
        self.incidents
            .lock()
            .insert(incident.id.clone(), incident.clone());

        tracing::warn!(id = %incident.id, severity = incident.severity.as_str(), "开启事件: {}", incident.title);
        self.mirror(StoreOp::Incident(incident.clone()));
        incident
    }

    /// 关闭事件，记录结束时间和持续时长；重复关闭保持首次结果
    pub fn resolve_incident(&self, id: &str) -> Result<Incident, MonitorError> {
        self.resolve_incident_at(id, Utc::now())
    }

    pub fn resolve_incident_at(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Incident, MonitorError> {
        let incident = {
            let mut incidents = self.incidents.lock();
            let incident = incidents
                .get_mut(id)
                .ok_or_else(|| MonitorError::IncidentNotFound { id: id.to_string() })?;
            if !incident.resolved {
                let end = now.max(incident.start_time);
                incident.end_time = Some(end);
                incident.duration = Some((end - incident.start_time).num_milliseconds());
                incident.resolved = true;
            }
            incident.clone()
        };

        tracing::info!(id = %incident.id, duration_ms = ?incident.duration, "事件已关闭");
        self.mirror(StoreOp::Incident(incident.clone()));
        Ok(incident)
    }

    /// 未关闭的事件（按开始时间升序）
    pub fn active_incidents(&self) -> Vec<Incident> {
        let mut active: Vec<Incident> = self
            .incidents
            .lock()
            .values()
            .filter(|i| !i.resolved)
            .cloned()
            .collect();
        active.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
        active
    }

    /// 事件历史（最新在前），存储不可用时回退到内存
    pub async fn incident_history(&self, limit: usize) -> Vec<Incident> {
        if let Some(persistence) = &self.persistence {
            match persistence.incident_history(limit).await {
                Ok(incidents) => return incidents,
                Err(e) => tracing::warn!("读取事件历史失败，回退到内存记录: {}", e),
            }
        }

        let mut incidents: Vec<Incident> = self.incidents.lock().values().cloned().collect();
        incidents.sort_by(|a, b| b.start_time.cmp(&a.start_time).then_with(|| b.id.cmp(&a.id)));
        incidents.truncate(limit);
        incidents
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 清空样本与事件（测试隔离用）
    pub fn reset(&self) {
        self.records.clear();
        self.incidents.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::model::Severity;

    fn new_incident(title: &str) -> NewIncident {
        NewIncident {
            title: title.to_string(),
            description: String::new(),
            severity: Severity::High,
            start_time: None,
        }
    }

    #[test]
    fn test_empty_history_is_optimistic() {
        let tracker = UptimeTracker::in_memory();
        assert_eq!(tracker.uptime_percentage(24), 100.0);
        assert_eq!(tracker.status(), UptimeStatus::Operational);
    }

    #[test]
    fn test_status_thresholds() {
        let tracker = UptimeTracker::in_memory();
        let now = Utc::now();
        for _ in 0..9 {
            tracker.record(UptimeRecord::up(now));
        }
        tracker.record(UptimeRecord::down(now));
        // 恰好 90% 属于降级
        assert_eq!(tracker.status(), UptimeStatus::Degraded);

        tracker.record(UptimeRecord::down(now));
        assert_eq!(tracker.status(), UptimeStatus::Down);

        for _ in 0..10 {
            tracker.record(UptimeRecord::up(now));
        }
        assert_eq!(tracker.status(), UptimeStatus::Operational);
    }

    #[test]
    fn test_uptime_percentage_window() {
        let tracker = UptimeTracker::in_memory();
        let now = Utc::now();
        // 窗口外的故障样本不计入
        tracker.record(UptimeRecord::down(now - Duration::hours(30)));
        tracker.record(UptimeRecord::up(now - Duration::hours(2)));
        tracker.record(UptimeRecord::up(now - Duration::hours(1)));
        tracker.record(UptimeRecord::down(now - Duration::minutes(5)));

        assert_eq!(tracker.uptime_percentage_at(24, now), 66.67);
        assert_eq!(tracker.uptime_percentage_at(48, now), 50.0);
        assert_eq!(tracker.uptime_percentage_at(0, now + Duration::hours(1)), 100.0);
    }

    #[test]
    fn test_future_dated_sample_counted() {
        let tracker = UptimeTracker::in_memory();
        let now = Utc::now();
        tracker.record(UptimeRecord::up(now - Duration::minutes(10)));
        tracker.record(UptimeRecord::down(now + Duration::seconds(30)));

        assert_eq!(tracker.uptime_percentage_at(24, now), 50.0);
    }

    #[test]
    fn test_ring_buffer_capacity() {
        let tracker = UptimeTracker::new(
            UptimeConfig {
                capacity: 3,
                status_sample_size: 10,
            },
            None,
        );
        let now = Utc::now();
        for _ in 0..5 {
            tracker.record(UptimeRecord::down(now));
        }
        tracker.record(UptimeRecord::up(now));
        assert_eq!(tracker.len(), 3);
        assert_eq!(tracker.uptime_percentage_at(1, now), 33.33);
    }

    #[test]
    fn test_incident_lifecycle() {
        let tracker = UptimeTracker::in_memory();
        let start = Utc::now() - Duration::minutes(3);
        let incident = tracker.create_incident(NewIncident {
            start_time: Some(start),
            ..new_incident("API down")
        });
        assert_eq!(tracker.active_incidents().len(), 1);

        let resolved = tracker
            .resolve_incident_at(&incident.id, start + Duration::seconds(90))
            .unwrap();
        assert!(resolved.resolved);
        assert_eq!(resolved.duration, Some(90_000));
        assert!(tracker.active_incidents().is_empty());

        // 重复关闭不改变结束时间
        let again = tracker
            .resolve_incident_at(&incident.id, start + Duration::seconds(300))
            .unwrap();
        assert_eq!(again.end_time, resolved.end_time);
    }

    #[test]
    fn test_resolve_unknown_incident() {
        let tracker = UptimeTracker::in_memory();
        let err = tracker.resolve_incident("incident-missing").unwrap_err();
        assert!(matches!(err, MonitorError::IncidentNotFound { .. }));
    }

    #[tokio::test]
    async fn test_incident_history_from_memory() {
        let tracker = UptimeTracker::in_memory();
        let first = tracker.create_incident(NewIncident {
            start_time: Some(Utc::now() - Duration::hours(1)),
            ..new_incident("first")
        });
        let second = tracker.create_incident(new_incident("second"));
        tracker.resolve_incident(&first.id).unwrap();

        let history = tracker.incident_history(10).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.id);
        assert_eq!(tracker.incident_history(1).await.len(), 1);

        tracker.reset();
        assert!(tracker.incident_history(10).await.is_empty());
    }
}
