//! 请求监控服务（公开 API）

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

#[cfg(feature = "sensitive-logs")]
use crate::common::truncate_with_ellipsis;
use crate::model::config::Config;
use crate::store::{Persistence, StoreOp};

use super::buffer::RecentBuffer;
use super::export;
use super::metrics::{MetricsCache, compute_metrics, compute_statistics};
use super::model::{
    ErrorLogEntry, MetricsSnapshot, RequestLogEntry, RequestStatistics, TimelinePoint,
};
use super::timeline::compute_timeline;

/// 搜索时扫描的最近请求数
const SEARCH_WINDOW: usize = 100;

/// 监控参数
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub buffer_capacity: usize,
    pub metrics_window: usize,
    pub cache_ttl: Duration,
    pub rate_divisor_secs: u32,
    pub timeline_buckets: usize,
    pub timeline_bucket_ms: i64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for MonitorConfig {
    fn from(config: &Config) -> Self {
        Self {
            buffer_capacity: config.buffer_capacity,
            metrics_window: config.metrics_window,
            cache_ttl: Duration::from_millis(config.metrics_cache_ttl_ms),
            rate_divisor_secs: config.rate_divisor_secs,
            timeline_buckets: config.timeline_buckets,
            timeline_bucket_ms: config.timeline_bucket_ms,
        }
    }
}

/// 进程内请求监控
///
/// 持有最近请求的环形缓冲区和指标缓存；所有查询都不会失败，
/// 没有数据时返回零值。
pub struct Monitor {
    config: MonitorConfig,
    buffer: RecentBuffer<RequestLogEntry>,
    cache: MetricsCache,
    persistence: Option<Arc<Persistence>>,
}

impl Monitor {
    pub fn new(config: MonitorConfig, persistence: Option<Arc<Persistence>>) -> Self {
        Self {
            buffer: RecentBuffer::new(config.buffer_capacity),
            cache: MetricsCache::new(config.cache_ttl),
            config,
            persistence,
        }
    }

    /// 使用默认参数、不做持久化
    pub fn in_memory() -> Self {
        Self::new(MonitorConfig::default(), None)
    }

    /// 记录一次请求（从不失败，持久化为 fire-and-forget）
    pub fn log_request(&self, entry: RequestLogEntry) {
        #[cfg(feature = "sensitive-logs")]
        tracing::debug!(
            method = %entry.method,
            status = entry.status,
            duration_ms = entry.duration,
            query = entry.query.as_deref().map(|q| truncate_with_ellipsis(q, 500)).unwrap_or_default(),
            "记录请求"
        );
        #[cfg(not(feature = "sensitive-logs"))]
        tracing::trace!(
            method = %entry.method,
            status = entry.status,
            duration_ms = entry.duration,
            operation = entry.operation_name.as_deref().unwrap_or("-"),
            "记录请求"
        );

        if let Some(persistence) = &self.persistence {
            persistence.submit(StoreOp::Request(entry.clone()));
        }
        self.buffer.push(entry);
        self.cache.invalidate();
    }

    /// 最近 `limit` 条请求（最新在前）
    pub fn recent(&self, limit: usize) -> Vec<RequestLogEntry> {
        self.buffer.recent(limit)
    }

    /// 窗口内的聚合指标（带 TTL 缓存）
    pub fn metrics(&self) -> MetricsSnapshot {
        self.cache.get_or_compute(|| {
            let window = self.buffer.recent(self.config.metrics_window);
            compute_metrics(&window, self.config.rate_divisor_secs)
        })
    }

    /// 截至当前时刻的时间线（每次重新计算）
    pub fn timeline(&self) -> Vec<TimelinePoint> {
        self.timeline_at(Utc::now())
    }

    /// 截至 `now` 的时间线
    pub fn timeline_at(&self, now: DateTime<Utc>) -> Vec<TimelinePoint> {
        let window = self.buffer.recent(self.config.metrics_window);
        compute_timeline(
            &window,
            now,
            self.config.timeline_buckets,
            self.config.timeline_bucket_ms,
        )
    }

    /// 错误请求（状态码 >= 400 或带错误信息），最新在前
    pub fn error_log(&self, limit: usize) -> Vec<ErrorLogEntry> {
        self.buffer
            .filter(limit, |e| e.is_error())
            .iter()
            .map(ErrorLogEntry::from)
            .collect()
    }

    /// 在最近的请求中按查询文本、操作名、错误信息做不区分大小写的子串匹配
    pub fn search(&self, query: &str) -> Vec<RequestLogEntry> {
        let needle = query.to_lowercase();
        let matches = |field: &Option<String>| {
            field
                .as_deref()
                .is_some_and(|v| v.to_lowercase().contains(&needle))
        };

        self.buffer
            .recent(SEARCH_WINDOW)
            .into_iter()
            .filter(|e| matches(&e.query) || matches(&e.operation_name) || matches(&e.error))
            .collect()
    }

    /// 窗口内的耗时分布
    pub fn statistics(&self) -> RequestStatistics {
        let window = self.buffer.recent(self.config.metrics_window);
        compute_statistics(&window)
    }

    /// 将最近 `limit` 条请求导出为 CSV
    pub fn export_csv(&self, limit: usize) -> String {
        export::to_csv(&self.buffer.recent(limit))
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// 清空内存状态（测试隔离用）
    pub fn reset(&self) {
        self.buffer.clear();
        self.cache.clear();
    }
}
