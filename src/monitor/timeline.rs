//! 时间线分桶

use chrono::{DateTime, Duration, Utc};

use super::model::{RequestLogEntry, TimelinePoint};

/// 将截至 `now` 的最近 `buckets × bucket_ms` 毫秒切成等宽的桶（最旧在前）
///
/// 每个桶是左闭右开区间 `[start, end)`，空桶也会保留（count 为 0），
/// 因此返回值长度恒为 `buckets`。
pub fn compute_timeline(
    window: &[RequestLogEntry],
    now: DateTime<Utc>,
    buckets: usize,
    bucket_ms: i64,
) -> Vec<TimelinePoint> {
    let width = Duration::milliseconds(bucket_ms);

    (0..buckets)
        .map(|i| {
            let start = now - width * (buckets - i) as i32;
            let end = start + width;

            let (count, sum) = window
                .iter()
                .filter(|e| e.timestamp >= start && e.timestamp < end)
                .fold((0usize, 0.0f64), |(count, sum), e| (count + 1, sum + e.duration));

            let avg_duration = if count > 0 {
                (sum / count as f64).round()
            } else {
                0.0
            };

            TimelinePoint {
                time: end.format("%H:%M:%S").to_string(),
                count,
                avg_duration,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::model::HttpMethod;
    use chrono::TimeZone;

    fn at(now: DateTime<Utc>, ms_ago: i64, duration: f64) -> RequestLogEntry {
        RequestLogEntry::new(HttpMethod::Post, duration, 200)
            .with_timestamp(now - Duration::milliseconds(ms_ago))
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_window_still_has_all_buckets() {
        let timeline = compute_timeline(&[], fixed_now(), 12, 5000);
        assert_eq!(timeline.len(), 12);
        assert!(timeline.iter().all(|p| p.count == 0 && p.avg_duration == 0.0));
    }

    #[test]
    fn test_bucket_assignment_and_labels() {
        let now = fixed_now();
        let window = vec![
            at(now, 1000, 100.0),  // 最后一个桶
            at(now, 2000, 201.0),  // 最后一个桶
            at(now, 7000, 50.0),   // 倒数第二个桶
            at(now, 59_000, 10.0), // 第一个桶
            at(now, 61_000, 10.0), // 超出范围
        ];

        let timeline = compute_timeline(&window, now, 12, 5000);
        assert_eq!(timeline.len(), 12);
        assert_eq!(timeline[11].count, 2);
        assert_eq!(timeline[11].avg_duration, 151.0);
        assert_eq!(timeline[11].time, "08:00:00");
        assert_eq!(timeline[10].count, 1);
        assert_eq!(timeline[10].avg_duration, 50.0);
        assert_eq!(timeline[10].time, "07:59:55");
        assert_eq!(timeline[0].count, 1);
        assert_eq!(timeline[0].time, "07:59:05");

        let total: usize = timeline.iter().map(|p| p.count).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn test_bucket_boundaries_half_open() {
        let now = fixed_now();
        // 恰好落在两个桶的分界点，只计入后一个桶
        let window = vec![at(now, 5000, 10.0)];
        let timeline = compute_timeline(&window, now, 12, 5000);
        assert_eq!(timeline[11].count, 1);
        assert_eq!(timeline[10].count, 0);
    }
}
