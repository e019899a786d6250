//! API 路由

use axum::{
    Router, middleware,
    routing::{get, post},
};

use super::handlers::{
    create_alert, create_incident, events, export, get_alert, get_alerts, get_errors,
    get_incidents, get_metrics, get_requests, get_statistics, get_status_page, health,
    incident_history, log_request, post_alert_action, record_uptime, resolve_incident, search,
};
use super::middleware::{AppState, auth_middleware};

/// 创建 API 路由
///
/// # 端点
/// - `POST /monitoring/requests` - 记录一次 GraphQL 请求
/// - `GET /monitoring/metrics` - 指标、时间线与最近请求
/// - `GET /monitoring/requests` - 最近请求
/// - `GET /monitoring/errors` - 错误日志
/// - `GET /monitoring/search` - 搜索最近请求
/// - `GET /monitoring/statistics` - 耗时分布
/// - `GET /monitoring/export` - 导出 CSV / JSON
/// - `GET /monitoring/events` - SSE 指标推送
/// - `GET /monitoring/health` - 健康检查
/// - `GET|POST /alerts` - 活跃告警/历史；确认/恢复
/// - `POST /alerts/manual` - 手动创建告警
/// - `GET /alerts/{id}` - 查询单个告警
/// - `GET /uptime` - 状态页
/// - `POST /uptime/records` - 记录健康检查样本
/// - `GET|POST /incidents` - 活跃事件；开启事件
/// - `POST /incidents/{id}/resolve` - 关闭事件
/// - `GET /incidents/history` - 事件历史
///
/// # 认证
/// 配置了 `adminApiKey` 时需要 `x-api-key` 或 `Authorization: Bearer` 头
pub fn create_api_router(state: AppState) -> Router {
    let monitoring = Router::new()
        .route("/requests", post(log_request).get(get_requests))
        .route("/metrics", get(get_metrics))
        .route("/errors", get(get_errors))
        .route("/search", get(search))
        .route("/statistics", get(get_statistics))
        .route("/export", get(export))
        .route("/events", get(events))
        .route("/health", get(health));

    Router::new()
        .nest("/monitoring", monitoring)
        .route("/alerts", get(get_alerts).post(post_alert_action))
        .route("/alerts/manual", post(create_alert))
        .route("/alerts/{id}", get(get_alert))
        .route("/uptime", get(get_status_page))
        .route("/uptime/records", post(record_uptime))
        .route("/incidents", get(get_incidents).post(create_incident))
        .route("/incidents/history", get(incident_history))
        .route("/incidents/{id}/resolve", post(resolve_incident))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
