use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 出站 HTTP（Webhook）使用的 TLS 实现
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TlsBackend {
    #[default]
    Rustls,
    /// 需要启用 `native-tls` feature
    NativeTls,
}

/// 单条告警规则配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuleConfig {
    /// 是否启用该规则
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 触发阈值（严格大于时触发，小于等于时恢复）
    pub threshold: f64,
}

impl RuleConfig {
    fn enabled_with(threshold: f64) -> Self {
        Self {
            enabled: true,
            threshold,
        }
    }
}

/// 告警规则集合配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertRulesConfig {
    /// 错误率（百分比）
    #[serde(default = "default_error_rate_rule")]
    pub high_error_rate: RuleConfig,
    /// 平均响应时间（毫秒）
    #[serde(default = "default_slow_response_rule")]
    pub slow_response: RuleConfig,
    /// 窗口内错误数
    #[serde(default = "default_error_count_rule")]
    pub high_error_count: RuleConfig,
}

impl Default for AlertRulesConfig {
    fn default() -> Self {
        Self {
            high_error_rate: default_error_rate_rule(),
            slow_response: default_slow_response_rule(),
            high_error_count: default_error_count_rule(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_error_rate_rule() -> RuleConfig {
    RuleConfig::enabled_with(5.0)
}

fn default_slow_response_rule() -> RuleConfig {
    RuleConfig::enabled_with(500.0)
}

fn default_error_count_rule() -> RuleConfig {
    RuleConfig::enabled_with(10.0)
}

/// graphmon 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Admin API 密钥（可选，配置后所有 /api 路由都需要认证）
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_api_key: Option<String>,

    /// SQLite 数据库路径（可选，未配置时不做持久化镜像）
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,

    /// 内存中保留的最近请求数
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// 指标计算窗口（最近 N 条请求）
    #[serde(default = "default_metrics_window")]
    pub metrics_window: usize,

    /// 指标缓存 TTL（毫秒）
    #[serde(default = "default_metrics_cache_ttl_ms")]
    pub metrics_cache_ttl_ms: u64,

    /// requestsPerSecond 的固定除数（秒）
    #[serde(default = "default_rate_divisor_secs")]
    pub rate_divisor_secs: u32,

    /// 时间线桶数量
    #[serde(default = "default_timeline_buckets")]
    pub timeline_buckets: usize,

    /// 时间线桶宽度（毫秒）
    #[serde(default = "default_timeline_bucket_ms")]
    pub timeline_bucket_ms: i64,

    /// 内存中保留的健康检查样本数（默认约 12 小时 @ 1 次/秒）
    #[serde(default = "default_uptime_capacity")]
    pub uptime_capacity: usize,

    /// 计算当前状态时参考的最近样本数
    #[serde(default = "default_status_sample_size")]
    pub status_sample_size: usize,

    /// 已恢复告警在内存注册表中的保留时间（秒）
    #[serde(default = "default_resolved_alert_retention_secs")]
    pub resolved_alert_retention_secs: i64,

    /// 持久化数据保留天数
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,

    /// 健康检查间隔（秒）
    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,

    /// 告警评估间隔（秒）
    #[serde(default = "default_alert_check_interval_secs")]
    pub alert_check_interval_secs: u64,

    /// 过期数据清理间隔（秒）
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    /// SSE 指标推送间隔（毫秒）
    #[serde(default = "default_stream_interval_ms")]
    pub stream_interval_ms: u64,

    /// 告警规则
    #[serde(default)]
    pub alert_rules: AlertRulesConfig,

    /// 告警 Webhook 通知 URL（可选，告警触发/恢复时发送 HTTP POST 通知）
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    /// Webhook 请求使用的 TLS 实现
    #[serde(default)]
    pub tls_backend: TlsBackend,

    /// 配置文件路径（运行时元数据，不写入 JSON）
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_buffer_capacity() -> usize {
    1000
}

fn default_metrics_window() -> usize {
    100
}

fn default_metrics_cache_ttl_ms() -> u64 {
    2000
}

fn default_rate_divisor_secs() -> u32 {
    10
}

fn default_timeline_buckets() -> usize {
    12
}

fn default_timeline_bucket_ms() -> i64 {
    5000
}

fn default_uptime_capacity() -> usize {
    43_200
}

fn default_status_sample_size() -> usize {
    10
}

fn default_resolved_alert_retention_secs() -> i64 {
    60 * 60
}

fn default_retention_days() -> i64 {
    30
}

fn default_health_check_interval_secs() -> u64 {
    30
}

fn default_alert_check_interval_secs() -> u64 {
    10
}

fn default_cleanup_interval_secs() -> u64 {
    10 * 60
}

fn default_stream_interval_ms() -> u64 {
    2000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            admin_api_key: None,
            db_path: None,
            buffer_capacity: default_buffer_capacity(),
            metrics_window: default_metrics_window(),
            metrics_cache_ttl_ms: default_metrics_cache_ttl_ms(),
            rate_divisor_secs: default_rate_divisor_secs(),
            timeline_buckets: default_timeline_buckets(),
            timeline_bucket_ms: default_timeline_bucket_ms(),
            uptime_capacity: default_uptime_capacity(),
            status_sample_size: default_status_sample_size(),
            resolved_alert_retention_secs: default_resolved_alert_retention_secs(),
            retention_days: default_retention_days(),
            health_check_interval_secs: default_health_check_interval_secs(),
            alert_check_interval_secs: default_alert_check_interval_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            stream_interval_ms: default_stream_interval_ms(),
            alert_rules: AlertRulesConfig::default(),
            webhook_url: None,
            tls_backend: TlsBackend::default(),
            config_path: None,
        }
    }
}

impl Config {
    /// 获取默认配置文件路径
    pub fn default_config_path() -> &'static str {
        "config.json"
    }

    /// 从文件加载配置
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            // 配置文件不存在，返回默认配置
            let mut config = Self::default();
            config.config_path = Some(path.to_path_buf());
            return Ok(config);
        }

        let content = fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&content)?;
        config.config_path = Some(path.to_path_buf());
        config.validate()?;
        Ok(config)
    }

    /// 获取配置文件路径（如果有）
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// 校验容量、窗口等必须为正数的配置项
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.buffer_capacity == 0 {
            anyhow::bail!("bufferCapacity 必须大于 0");
        }
        if self.metrics_window == 0 {
            anyhow::bail!("metricsWindow 必须大于 0");
        }
        if self.rate_divisor_secs == 0 {
            anyhow::bail!("rateDivisorSecs 必须大于 0");
        }
        if self.timeline_buckets == 0 || self.timeline_bucket_ms <= 0 {
            anyhow::bail!("timelineBuckets 与 timelineBucketMs 必须大于 0");
        }
        if self.uptime_capacity == 0 || self.status_sample_size == 0 {
            anyhow::bail!("uptimeCapacity 与 statusSampleSize 必须大于 0");
        }
        if self.health_check_interval_secs == 0
            || self.alert_check_interval_secs == 0
            || self.cleanup_interval_secs == 0
            || self.stream_interval_ms == 0
        {
            anyhow::bail!("后台任务与推送间隔必须大于 0");
        }
        Ok(())
    }
}
