//! 聚合指标计算与短期缓存

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::common::{ratio_truncate2, round2};

use super::model::{MetricsSnapshot, RequestLogEntry, RequestStatistics};

/// 缓存条目
#[derive(Debug, Clone)]
struct CachedSnapshot {
    snapshot: MetricsSnapshot,
    computed_at: Instant,
    generation: u64,
}

/// 带 TTL 的指标缓存
///
/// 每次写入新请求都会使缓存失效（generation 自增）；计算期间发生的失效
/// 会让这次结果在下一次读取时被丢弃，而不是覆盖更新后的状态。
pub struct MetricsCache {
    ttl: Duration,
    generation: AtomicU64,
    cached: Mutex<Option<CachedSnapshot>>,
}

impl MetricsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            generation: AtomicU64::new(0),
            cached: Mutex::new(None),
        }
    }

    /// 使缓存立即失效
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// 命中未过期且未失效的缓存时直接返回，否则调用 `compute` 重新计算
    pub fn get_or_compute<F>(&self, compute: F) -> MetricsSnapshot
    where
        F: FnOnce() -> MetricsSnapshot,
    {
        let generation = self.generation.load(Ordering::Acquire);
        {
            let cached = self.cached.lock();
            if let Some(entry) = cached.as_ref() {
                if entry.generation == generation && entry.computed_at.elapsed() < self.ttl {
                    return entry.snapshot.clone();
                }
            }
        }

        let snapshot = compute();
        *self.cached.lock() = Some(CachedSnapshot {
            snapshot: snapshot.clone(),
            computed_at: Instant::now(),
            generation,
        });
        snapshot
    }

    pub fn clear(&self) {
        *self.cached.lock() = None;
        self.invalidate();
    }
}

/// 计算窗口内的聚合指标
///
/// `requests_per_second` 固定用 `rate_divisor_secs` 做分母，不考虑窗口实际跨度。
pub fn compute_metrics(window: &[RequestLogEntry], rate_divisor_secs: u32) -> MetricsSnapshot {
    if window.is_empty() {
        return MetricsSnapshot::empty();
    }

    let total = window.len();
    let mut sum = 0.0;
    let mut slowest = f64::MIN;
    let mut fastest = f64::MAX;
    let mut error_count = 0;

    for entry in window {
        sum += entry.duration;
        slowest = slowest.max(entry.duration);
        fastest = fastest.min(entry.duration);
        if entry.is_error() {
            error_count += 1;
        }
    }

    MetricsSnapshot {
        total_requests: total,
        average_response_time: (sum / total as f64).round(),
        slowest_request: slowest,
        fastest_request: fastest,
        error_count,
        error_rate: round2(error_count as f64 / total as f64 * 100.0),
        requests_per_second: ratio_truncate2(total as u64, u64::from(rate_divisor_secs)),
    }
}

/// 计算耗时分布（中位数、P95、P99）
///
/// 百分位下标取 `floor(len * p)`，对升序排列的耗时取值。
pub fn compute_statistics(window: &[RequestLogEntry]) -> RequestStatistics {
    if window.is_empty() {
        return RequestStatistics::empty();
    }

    let mut durations: Vec<f64> = window.iter().map(|e| e.duration).collect();
    durations.sort_by(|a, b| a.total_cmp(b));

    let len = durations.len();
    let error_count = window.iter().filter(|e| e.is_error()).count();
    let percentile = |p: f64| {
        let idx = ((len as f64 * p).floor() as usize).min(len - 1);
        durations[idx]
    };

    RequestStatistics {
        success_count: len - error_count,
        error_count,
        avg_duration: (durations.iter().sum::<f64>() / len as f64).round(),
        median_duration: durations[len / 2],
        p95_duration: percentile(0.95),
        p99_duration: percentile(0.99),
    }
}
