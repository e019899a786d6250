//! 阈值告警引擎
//!
//! 内存注册表是"活跃"状态的唯一依据；持久化与 Webhook 通知都是尽力而为。

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::MonitorError;
use crate::model::config::{AlertRulesConfig, Config, RuleConfig};
use crate::monitor::model::MetricsSnapshot;
use crate::store::{Persistence, StoreOp};
use crate::webhook::{AlertEvent, WebhookNotifier};

use super::model::{Alert, AlertRule, AlertThreshold, NewAlert};

/// 告警引擎参数
#[derive(Debug, Clone)]
pub struct AlertEngineConfig {
    pub rules: AlertRulesConfig,
    /// 已恢复告警在注册表中的保留时长
    pub resolved_retention: Duration,
}

impl Default for AlertEngineConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for AlertEngineConfig {
    fn from(config: &Config) -> Self {
        Self {
            rules: config.alert_rules.clone(),
            resolved_retention: Duration::seconds(config.resolved_alert_retention_secs),
        }
    }
}

impl AlertEngineConfig {
    fn rule(&self, rule: AlertRule) -> &RuleConfig {
        match rule {
            AlertRule::HighErrorRate => &self.rules.high_error_rate,
            AlertRule::SlowResponse => &self.rules.slow_response,
            AlertRule::HighErrorCount => &self.rules.high_error_count,
        }
    }
}

/// 规则在当前指标下的取值
fn rule_value(rule: AlertRule, metrics: &MetricsSnapshot) -> f64 {
    match rule {
        AlertRule::HighErrorRate => metrics.error_rate,
        AlertRule::SlowResponse => metrics.average_response_time,
        AlertRule::HighErrorCount => metrics.error_count as f64,
    }
}

/// 一次评估产生的状态变化
#[derive(Debug, Default)]
pub struct Evaluation {
    pub created: Vec<Alert>,
    pub resolved: Vec<Alert>,
}

#[derive(Default)]
struct Registry {
    alerts: HashMap<String, Alert>,
    /// 规则 -> 当前活跃告警 ID
    active_by_rule: HashMap<AlertRule, String>,
}

impl Registry {
    fn resolve(&mut self, id: &str, now: DateTime<Utc>) -> Option<Alert> {
        let alert = self.alerts.get_mut(id)?;
        if alert.resolved_at.is_none() {
            alert.resolved_at = Some(now);
        }
        if let Some(rule) = alert.rule {
            if self.active_by_rule.get(&rule).map(String::as_str) == Some(id) {
                self.active_by_rule.remove(&rule);
            }
        }
        Some(alert.clone())
    }

    fn purge_resolved(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.alerts.len();
        self.alerts
            .retain(|_, a| a.resolved_at.is_none_or(|resolved| resolved > cutoff));
        before - self.alerts.len()
    }
}

/// 告警引擎
pub struct AlertEngine {
    config: AlertEngineConfig,
    registry: Mutex<Registry>,
    persistence: Option<Arc<Persistence>>,
    notifier: Option<Arc<WebhookNotifier>>,
}

impl AlertEngine {
    pub fn new(
        config: AlertEngineConfig,
        persistence: Option<Arc<Persistence>>,
        notifier: Option<Arc<WebhookNotifier>>,
    ) -> Self {
        Self {
            config,
            registry: Mutex::new(Registry::default()),
            persistence,
            notifier,
        }
    }

    /// 使用默认规则、不做持久化和通知
    pub fn in_memory() -> Self {
        Self::new(AlertEngineConfig::default(), None, None)
    }

    fn mirror(&self, alert: &Alert) {
        if let Some(persistence) = &self.persistence {
            persistence.submit(StoreOp::Alert(alert.clone()));
        }
    }

    fn notify(&self, event: AlertEvent) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(event);
        }
    }

    /// 按当前指标评估所有启用的规则
    pub fn evaluate(&self, metrics: &MetricsSnapshot) -> Evaluation {
        self.evaluate_at(metrics, Utc::now())
    }

    /// 在 `now` 时刻评估：越过阈值且无活跃告警时创建，回落到阈值以内时恢复
    pub fn evaluate_at(&self, metrics: &MetricsSnapshot, now: DateTime<Utc>) -> Evaluation {
        let mut outcome = Evaluation::default();
        {
            let mut registry = self.registry.lock();
            registry.purge_resolved(now - self.config.resolved_retention);

            for rule in AlertRule::ALL {
                let rule_config = self.config.rule(rule);
                if !rule_config.enabled {
                    continue;
                }

                let current = rule_value(rule, metrics);
                let triggered = current > rule_config.threshold;
                let active_id = registry.active_by_rule.get(&rule).cloned();

                match (triggered, active_id) {
                    (true, None) => {
                        let alert = Alert {
                            id: format!("{}-{}", rule.as_str(), Uuid::new_v4().simple()),
                            rule: Some(rule),
                            alert_type: rule.alert_type(),
                            severity: rule.severity(),
                            title: rule.title().to_string(),
                            message: rule.message(current, rule_config.threshold),
                            threshold: Some(AlertThreshold {
                                current,
                                threshold: rule_config.threshold,
                            }),
                            created_at: now,
                            acknowledged_at: None,
                            acknowledged_by: None,
                            resolved_at: None,
                        };
                        registry.active_by_rule.insert(rule, alert.id.clone());
                        registry.alerts.insert(alert.id.clone(), alert.clone());
                        outcome.created.push(alert);
                    }
                    (false, Some(id)) => {
                        if let Some(alert) = registry.resolve(&id, now) {
                            outcome.resolved.push(alert);
                        }
                    }
                    _ => {}
                }
            }
        }

        for alert in &outcome.created {
            tracing::warn!(id = %alert.id, severity = alert.severity.as_str(), "触发告警: {}", alert.message);
            self.mirror(alert);
            self.notify(AlertEvent::Triggered(alert.clone()));
        }
        for alert in &outcome.resolved {
            tracing::info!(id = %alert.id, "告警已自动恢复: {}", alert.title);
            self.mirror(alert);
            self.notify(AlertEvent::Resolved(alert.clone()));
        }
        outcome
    }

    /// 手动创建告警（不参与规则去重）
    pub fn create_alert(&self, new: NewAlert) -> Alert {
        let alert = Alert {
            id: format!("{}-{}", new.alert_type.as_str(), Uuid::new_v4().simple()),
            rule: None,
            alert_type: new.alert_type,
            severity: new.severity,
            title: new.title,
            message: new.message,
            threshold: new.threshold,
            created_at: Utc::now(),
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
        };
        self.registry
            .lock()
            .alerts
            .insert(alert.id.clone(), alert.clone());

        tracing::info!(id = %alert.id, "创建告警: {}", alert.title);
        self.mirror(&alert);
        self.notify(AlertEvent::Triggered(alert.clone()));
        alert
    }

    /// 确认告警
    pub fn acknowledge(&self, id: &str, by: Option<String>) -> Result<Alert, MonitorError> {
        let alert = {
            let mut registry = self.registry.lock();
            let alert = registry
                .alerts
                .get_mut(id)
                .ok_or_else(|| MonitorError::AlertNotFound { id: id.to_string() })?;
            alert.acknowledged_at = Some(Utc::now());
            alert.acknowledged_by = by;
            alert.clone()
        };

        tracing::info!(id = %alert.id, by = ?alert.acknowledged_by, "告警已确认");
        self.mirror(&alert);
        Ok(alert)
    }

    /// 恢复告警；记录在保留期结束后从注册表移除
    pub fn resolve(&self, id: &str) -> Result<Alert, MonitorError> {
        self.resolve_at(id, Utc::now())
    }

    fn resolve_at(&self, id: &str, now: DateTime<Utc>) -> Result<Alert, MonitorError> {
        let alert = self
            .registry
            .lock()
            .resolve(id, now)
            .ok_or_else(|| MonitorError::AlertNotFound { id: id.to_string() })?;

        tracing::info!(id = %alert.id, "告警已恢复");
        self.mirror(&alert);
        Ok(alert)
    }

    /// 所有未恢复的告警（按创建时间升序）
    pub fn active_alerts(&self) -> Vec<Alert> {
        let registry = self.registry.lock();
        let mut active: Vec<Alert> = registry
            .alerts
            .values()
            .filter(|a| a.is_active())
            .cloned()
            .collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        active
    }

    pub fn alert(&self, id: &str) -> Option<Alert> {
        self.registry.lock().alerts.get(id).cloned()
    }

    /// 告警历史（最新在前）
    ///
    /// 优先读持久化存储；未启用或读取失败时回退到内存注册表。
    pub async fn history(&self, limit: usize) -> Vec<Alert> {
        if let Some(persistence) = &self.persistence {
            match persistence.alert_history(limit).await {
                Ok(alerts) => return alerts,
                Err(e) => tracing::warn!("读取告警历史失败，回退到内存记录: {}", e),
            }
        }

        let registry = self.registry.lock();
        let mut alerts: Vec<Alert> = registry.alerts.values().cloned().collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        alerts.truncate(limit);
        alerts
    }

    /// 移除恢复时间早于保留期的告警，返回移除数量
    pub fn purge_resolved(&self) -> usize {
        self.purge_resolved_at(Utc::now())
    }

    fn purge_resolved_at(&self, now: DateTime<Utc>) -> usize {
        let removed = self
            .registry
            .lock()
            .purge_resolved(now - self.config.resolved_retention);
        if removed > 0 {
            tracing::debug!(removed, "已移除过期的已恢复告警");
        }
        removed
    }

    /// 清空注册表（测试隔离用）
    pub fn reset(&self) {
        let mut registry = self.registry.lock();
        registry.alerts.clear();
        registry.active_by_rule.clear();
    }
}
