//! API 处理器

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;

use crate::alert::model::NewAlert;
use crate::error::MonitorError;
use crate::monitor::device::device_info_from_headers;
use crate::uptime::model::{NewIncident, UptimeRecord};
use crate::uptime::run_health_check;

use super::middleware::AppState;
use super::sse;
use super::types::{
    AcceptedResponse, AlertActionRequest, AlertResponse, AlertsQuery, AlertsResponse,
    ErrorsResponse, ExportQuery, IncidentsResponse, JsonExport, LimitQuery, LogRequestBody,
    MetricsResponse, SearchQuery, SearchResponse, StatusPageResponse, UptimeWindows,
};

/// 仪表盘最近请求条数
const DASHBOARD_RECENT: usize = 20;
const DEFAULT_REQUESTS_LIMIT: usize = 100;
const DEFAULT_ERRORS_LIMIT: usize = 50;
const DEFAULT_EXPORT_LIMIT: usize = 100;
const DEFAULT_HISTORY_LIMIT: usize = 100;

/// POST /api/monitoring/requests
pub async fn log_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<LogRequestBody>,
) -> Result<impl IntoResponse, MonitorError> {
    let entry = body.into_entry(device_info_from_headers(&headers))?;
    state.monitor.log_request(entry);
    Ok((StatusCode::ACCEPTED, Json(AcceptedResponse { accepted: true })))
}

/// GET /api/monitoring/metrics
pub async fn get_metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(MetricsResponse {
        metrics: state.monitor.metrics(),
        timeline: state.monitor.timeline(),
        recent_requests: state.monitor.recent(DASHBOARD_RECENT),
        timestamp: Utc::now(),
    })
}

/// GET /api/monitoring/requests
pub async fn get_requests(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> impl IntoResponse {
    Json(state.monitor.recent(query.limit.unwrap_or(DEFAULT_REQUESTS_LIMIT)))
}

/// GET /api/monitoring/errors
pub async fn get_errors(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> impl IntoResponse {
    let errors = state
        .monitor
        .error_log(query.limit.unwrap_or(DEFAULT_ERRORS_LIMIT));
    Json(ErrorsResponse {
        count: errors.len(),
        errors,
        timestamp: Utc::now(),
    })
}

/// GET /api/monitoring/search
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    let results = state.monitor.search(&query.q);
    Json(SearchResponse {
        total: results.len(),
        results,
        query: query.q,
    })
}

/// GET /api/monitoring/statistics
pub async fn get_statistics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.monitor.statistics())
}

/// GET /api/monitoring/export
pub async fn export(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, MonitorError> {
    let limit = query.limit.unwrap_or(DEFAULT_EXPORT_LIMIT);
    match query.format.as_deref().unwrap_or("json") {
        "csv" => {
            let disposition = format!(
                "attachment; filename=\"graphql-requests-{}.csv\"",
                Utc::now().timestamp_millis()
            );
            Ok((
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                state.monitor.export_csv(limit),
            )
                .into_response())
        }
        "json" => {
            let requests = state.monitor.recent(limit);
            Ok(Json(JsonExport {
                total: requests.len(),
                requests,
                errors: state.monitor.error_log(limit),
                exported_at: Utc::now(),
            })
            .into_response())
        }
        other => Err(MonitorError::Validation(format!(
            "不支持的导出格式: {}（可选 csv、json）",
            other
        ))),
    }
}

/// GET /api/monitoring/events
pub async fn events(State(state): State<AppState>) -> impl IntoResponse {
    sse::metrics_sse(state.monitor.clone(), state.stream_interval)
}

/// GET /api/monitoring/health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(run_health_check(&state.monitor, &state.uptime))
}

/// GET /api/alerts
pub async fn get_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> impl IntoResponse {
    if query.action.as_deref() == Some("history") {
        let alerts = state
            .alerts
            .history(query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
            .await;
        return Json(AlertsResponse {
            alerts,
            count: None,
        });
    }

    let alerts = state.alerts.active_alerts();
    Json(AlertsResponse {
        count: Some(alerts.len()),
        alerts,
    })
}

/// POST /api/alerts
pub async fn post_alert_action(
    State(state): State<AppState>,
    Json(body): Json<AlertActionRequest>,
) -> Result<impl IntoResponse, MonitorError> {
    let alert = match body.action.as_str() {
        "acknowledge" => state.alerts.acknowledge(&body.alert_id, body.user_id)?,
        "resolve" => state.alerts.resolve(&body.alert_id)?,
        other => {
            return Err(MonitorError::Validation(format!("Invalid action: {}", other)));
        }
    };
    Ok(Json(AlertResponse { alert }))
}

/// POST /api/alerts/manual
pub async fn create_alert(
    State(state): State<AppState>,
    Json(body): Json<NewAlert>,
) -> impl IntoResponse {
    let alert = state.alerts.create_alert(body);
    (StatusCode::CREATED, Json(AlertResponse { alert }))
}

/// GET /api/alerts/{id}
pub async fn get_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, MonitorError> {
    let alert = state
        .alerts
        .alert(&id)
        .ok_or(MonitorError::AlertNotFound { id })?;
    Ok(Json(AlertResponse { alert }))
}

/// GET /api/uptime
pub async fn get_status_page(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = &state.uptime;
    Json(StatusPageResponse {
        status: uptime.status(),
        uptime: UptimeWindows {
            day: uptime.uptime_percentage(24),
            week: uptime.uptime_percentage(24 * 7),
            month: uptime.uptime_percentage(24 * 30),
        },
        metrics: state.monitor.metrics(),
        active_incidents: uptime.active_incidents(),
        timestamp: Utc::now(),
    })
}

/// POST /api/uptime/records
pub async fn record_uptime(
    State(state): State<AppState>,
    Json(record): Json<UptimeRecord>,
) -> impl IntoResponse {
    state.uptime.record(record);
    (StatusCode::ACCEPTED, Json(AcceptedResponse { accepted: true }))
}

/// GET /api/incidents
pub async fn get_incidents(State(state): State<AppState>) -> impl IntoResponse {
    let incidents = state.uptime.active_incidents();
    Json(IncidentsResponse {
        count: incidents.len(),
        incidents,
    })
}

/// POST /api/incidents
pub async fn create_incident(
    State(state): State<AppState>,
    Json(body): Json<NewIncident>,
) -> Result<impl IntoResponse, MonitorError> {
    if body.title.trim().is_empty() {
        return Err(MonitorError::Validation("title 不能为空".to_string()));
    }
    let incident = state.uptime.create_incident(body);
    Ok((StatusCode::CREATED, Json(incident)))
}

/// POST /api/incidents/{id}/resolve
pub async fn resolve_incident(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, MonitorError> {
    Ok(Json(state.uptime.resolve_incident(&id)?))
}

/// GET /api/incidents/history
pub async fn incident_history(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> impl IntoResponse {
    let incidents = state
        .uptime
        .incident_history(query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
        .await;
    Json(IncidentsResponse {
        count: incidents.len(),
        incidents,
    })
}
