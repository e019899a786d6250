//! Webhook 通知模块
//!
//! 告警触发或恢复时，将 JSON 通知 POST 到配置的 webhook URL。

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::alert::model::Alert;
use crate::common::truncate_with_ellipsis;
use crate::model::config::TlsBackend;

/// 告警状态变化事件
#[derive(Debug, Clone)]
pub enum AlertEvent {
    Triggered(Alert),
    Resolved(Alert),
}

impl AlertEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Triggered(_) => "alert_triggered",
            Self::Resolved(_) => "alert_resolved",
        }
    }

    pub fn alert(&self) -> &Alert {
        match self {
            Self::Triggered(alert) | Self::Resolved(alert) => alert,
        }
    }
}

/// POST 到 webhook URL 的 payload
#[derive(Debug, Serialize)]
struct Payload<'a> {
    event: &'static str,
    alert: &'a Alert,
    timestamp: String,
}

/// Webhook 通知器
///
/// 通过 mpsc channel 异步发送，可从同步代码安全调用。
pub struct WebhookNotifier {
    sender: mpsc::Sender<AlertEvent>,
}

impl WebhookNotifier {
    /// 创建通知器并启动后台消费任务（需在 tokio runtime 内调用）
    pub fn new(url: String, tls_backend: TlsBackend) -> anyhow::Result<Self> {
        let client = build_client(10, tls_backend)?;
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(Self::consume_loop(url, client, rx));
        Ok(Self { sender: tx })
    }

    /// 发送告警通知（非阻塞）
    pub fn notify(&self, event: AlertEvent) {
        if let Err(e) = self.sender.try_send(event) {
            tracing::warn!("Webhook 通知发送失败（channel 已满或已关闭）: {}", e);
        }
    }

    async fn consume_loop(url: String, client: reqwest::Client, mut rx: mpsc::Receiver<AlertEvent>) {
        while let Some(event) = rx.recv().await {
            let alert_id = event.alert().id.clone();
            let body = render_body(&event);
            let request = client
                .post(&url)
                .header("Content-Type", "application/json")
                .body(body);

            match request.send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::info!("Webhook 通知已发送: {} ({})", event.name(), alert_id);
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    tracing::warn!(
                        "Webhook 发送失败: HTTP {} ({}): {}",
                        status,
                        alert_id,
                        truncate_with_ellipsis(&body, 200)
                    );
                }
                Err(e) => {
                    tracing::warn!("Webhook 发送失败: {} ({})", e, alert_id);
                }
            }
        }
        tracing::debug!("Webhook 通知消费循环已退出");
    }
}

/// 按配置的 TLS 实现构建 HTTP Client
fn build_client(timeout_secs: u64, tls_backend: TlsBackend) -> anyhow::Result<reqwest::Client> {
    let builder = reqwest::Client::builder().timeout(Duration::from_secs(timeout_secs));

    let builder = match tls_backend {
        TlsBackend::Rustls => builder.use_rustls_tls(),
        #[cfg(feature = "native-tls")]
        TlsBackend::NativeTls => builder.use_native_tls(),
        #[cfg(not(feature = "native-tls"))]
        TlsBackend::NativeTls => {
            anyhow::bail!("tlsBackend 为 native-tls，但编译时未启用 native-tls feature")
        }
    };

    Ok(builder.build()?)
}

fn render_body(event: &AlertEvent) -> String {
    let payload = Payload {
        event: event.name(),
        alert: event.alert(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    serde_json::to_string(&payload).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::model::{AlertRule, AlertType, Severity};

    fn sample_alert() -> Alert {
        Alert {
            id: "high-error-rate-abc".to_string(),
            rule: Some(AlertRule::HighErrorRate),
            alert_type: AlertType::Error,
            severity: Severity::High,
            title: AlertRule::HighErrorRate.title().to_string(),
            message: AlertRule::HighErrorRate.message(12.5, 5.0),
            threshold: None,
            created_at: chrono::Utc::now(),
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
        }
    }

    #[test]
    fn test_render_body() {
        let body = render_body(&AlertEvent::Triggered(sample_alert()));
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["event"], "alert_triggered");
        assert_eq!(json["alert"]["id"], "high-error-rate-abc");
        assert_eq!(json["alert"]["severity"], "high");
        assert!(json["timestamp"].is_string());

        let body = render_body(&AlertEvent::Resolved(sample_alert()));
        assert!(body.contains(r#""event":"alert_resolved""#));
    }

    #[test]
    fn test_build_client_per_backend() {
        assert!(build_client(10, TlsBackend::Rustls).is_ok());
        // 未启用 feature 时选择 native-tls 直接报错，而不是悄悄退回 rustls
        assert_eq!(
            build_client(10, TlsBackend::NativeTls).is_ok(),
            cfg!(feature = "native-tls")
        );
    }

    #[tokio::test]
    async fn test_notify_does_not_block_when_unreachable() {
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/hook".to_string(), TlsBackend::Rustls)
                .unwrap();
        for _ in 0..100 {
            notifier.notify(AlertEvent::Triggered(sample_alert()));
        }
    }
}
