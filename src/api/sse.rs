//! 指标实时推送（Server-Sent Events）
//!
//! 连接建立后先发送一次 `connected`，之后按固定间隔发送 `metrics_update`，
//! 客户端断开时流被丢弃，推送随之停止。

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use tokio::time::MissedTickBehavior;

use crate::monitor::Monitor;
use crate::monitor::model::MetricsSnapshot;

pub const CONNECTED: &str = "connected";
pub const METRICS_UPDATE: &str = "metrics_update";

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamMessage {
    Connected {
        message: &'static str,
        timestamp: DateTime<Utc>,
    },
    MetricsUpdate {
        data: MetricsSnapshot,
        timestamp: DateTime<Utc>,
    },
}

impl StreamMessage {
    fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => CONNECTED,
            Self::MetricsUpdate { .. } => METRICS_UPDATE,
        }
    }

    fn into_event(self) -> Option<Event> {
        let name = self.name();
        match Event::default().event(name).json_data(&self) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(event = name, "SSE 事件序列化失败: {}", e);
                None
            }
        }
    }
}

/// 消息序列：一次 `connected`，之后每个间隔一次 `metrics_update`
fn messages(monitor: Arc<Monitor>, period: Duration) -> impl Stream<Item = StreamMessage> {
    let connected = stream::once(async {
        StreamMessage::Connected {
            message: "Connected to monitoring service",
            timestamp: Utc::now(),
        }
    });

    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let updates = stream::unfold((monitor, interval), |(monitor, mut interval)| async move {
        interval.tick().await;
        let message = StreamMessage::MetricsUpdate {
            data: monitor.metrics(),
            timestamp: Utc::now(),
        };
        Some((message, (monitor, interval)))
    });

    connected.chain(updates)
}

/// 构造推送流
pub fn metrics_stream(
    monitor: Arc<Monitor>,
    period: Duration,
) -> impl Stream<Item = Result<Event, Infallible>> {
    messages(monitor, period)
        .filter_map(|message| async move { message.into_event() })
        .map(Ok)
}

/// 包装为 SSE 响应
pub fn metrics_sse(
    monitor: Arc<Monitor>,
    period: Duration,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!("SSE 客户端已连接");
    Sse::new(metrics_stream(monitor, period)).keep_alive(KeepAlive::default())
}
