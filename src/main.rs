mod alert;
mod api;
mod common;
mod error;
mod model;
mod monitor;
mod scheduler;
mod store;
mod uptime;
mod webhook;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tower_http::cors::CorsLayer;

use alert::{AlertEngine, AlertEngineConfig};
use api::AppState;
use model::arg::Args;
use model::config::Config;
use monitor::{Monitor, MonitorConfig};
use scheduler::Poller;
use store::Persistence;
use uptime::{UptimeConfig, UptimeTracker, run_health_check};
use webhook::WebhookNotifier;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(args).await {
        tracing::error!("服务启动失败: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config_path = args
        .config
        .unwrap_or_else(|| Config::default_config_path().to_string());
    let mut config = Config::load(&config_path)?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(db_path) = args.db_path {
        config.db_path = Some(db_path);
    }
    config.validate()?;
    match config.config_path() {
        Some(path) if path.exists() => tracing::info!("已加载配置: {}", path.display()),
        _ => tracing::info!("配置文件 {} 不存在，使用默认配置", config_path),
    }

    let persistence = match config.db_path.as_deref() {
        Some(path) => Some(Arc::new(Persistence::open(path)?)),
        None => {
            tracing::info!("未配置 dbPath，仅保留内存数据");
            None
        }
    };

    let notifier = match config.webhook_url.clone() {
        Some(url) if !url.trim().is_empty() => {
            tracing::info!("告警 Webhook 通知已启用");
            Some(Arc::new(WebhookNotifier::new(url, config.tls_backend)?))
        }
        _ => None,
    };

    let monitor = Arc::new(Monitor::new(MonitorConfig::from(&config), persistence.clone()));
    let alerts = Arc::new(AlertEngine::new(
        AlertEngineConfig::from(&config),
        persistence.clone(),
        notifier,
    ));
    let uptime = Arc::new(UptimeTracker::new(
        UptimeConfig::from(&config),
        persistence.clone(),
    ));

    let pollers = start_pollers(&config, &monitor, &alerts, &uptime, persistence);

    let state = AppState::new(monitor, alerts, uptime)
        .with_api_key(config.admin_api_key.clone())
        .with_stream_interval(Duration::from_millis(config.stream_interval_ms));
    if state.admin_api_key.is_none() {
        tracing::warn!("未配置 adminApiKey，API 无需认证即可访问");
    }

    let app = axum::Router::new()
        .nest("/api", api::create_api_router(state))
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("监听地址: http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for poller in pollers {
        let name = poller.name();
        poller.stop().await;
        tracing::debug!("已停止后台任务: {}", name);
    }
    tracing::info!("服务已停止");
    Ok(())
}

/// 启动健康检查、告警评估和数据清理三个后台任务
fn start_pollers(
    config: &Config,
    monitor: &Arc<Monitor>,
    alerts: &Arc<AlertEngine>,
    uptime: &Arc<UptimeTracker>,
    persistence: Option<Arc<Persistence>>,
) -> Vec<Poller> {
    let health = {
        let monitor = monitor.clone();
        let uptime = uptime.clone();
        Poller::spawn(
            "health-check",
            Duration::from_secs(config.health_check_interval_secs),
            move || {
                run_health_check(&monitor, &uptime);
                async {}
            },
        )
    };

    let evaluation = {
        let monitor = monitor.clone();
        let alerts = alerts.clone();
        Poller::spawn(
            "alert-evaluation",
            Duration::from_secs(config.alert_check_interval_secs),
            move || {
                alerts.evaluate(&monitor.metrics());
                async {}
            },
        )
    };

    let cleanup = {
        let alerts = alerts.clone();
        let retention_days = config.retention_days;
        Poller::spawn(
            "cleanup",
            Duration::from_secs(config.cleanup_interval_secs),
            move || {
                alerts.purge_resolved();
                let persistence = persistence.clone();
                async move {
                    if let Some(persistence) = persistence {
                        match persistence.cleanup(retention_days).await {
                            Ok(0) => {}
                            Ok(removed) => tracing::info!(removed, "已清理过期监控数据"),
                            Err(e) => tracing::warn!("清理过期监控数据失败: {}", e),
                        }
                        if let Ok(count) = persistence.request_count().await {
                            tracing::debug!(count, "已持久化的请求日志条数");
                        }
                    }
                }
            },
        )
    };

    vec![health, evaluation, cleanup]
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("无法监听 Ctrl+C 信号: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("收到停止信号，正在关闭...");
}
