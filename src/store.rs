//! 持久化镜像：SQLite 存储和异步批量写入服务
//!
//! 内存中的缓冲区和注册表是权威状态，这里只做尽力而为的镜像：
//! 写入通过有界 channel 交给后台任务，调用方从不等待，失败只记录日志。

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, params};
use tokio::sync::mpsc;

use crate::alert::model::Alert;
use crate::monitor::model::RequestLogEntry;
use crate::uptime::model::{Incident, UptimeRecord};

/// channel 容量
const CHANNEL_CAPACITY: usize = 10_000;
/// 单批最多写入条数
const MAX_BATCH: usize = 500;

/// 一次待持久化的写操作
#[derive(Debug, Clone)]
pub enum StoreOp {
    Request(RequestLogEntry),
    /// 按 id 整行覆盖
    Alert(Alert),
    Uptime(UptimeRecord),
    /// 按 id 整行覆盖
    Incident(Incident),
}

impl StoreOp {
    fn kind(&self) -> &'static str {
        match self {
            Self::Request(_) => "request",
            Self::Alert(_) => "alert",
            Self::Uptime(_) => "uptime",
            Self::Incident(_) => "incident",
        }
    }
}

/// 统一的时间戳格式（固定宽度，字符串比较即时间比较）
fn ts(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 底层 SQLite 存储（同步）
struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS request_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                method TEXT NOT NULL,
                duration_ms REAL NOT NULL,
                status_code INTEGER NOT NULL,
                operation_name TEXT,
                query TEXT,
                error TEXT,
                ip_address TEXT,
                user_agent TEXT,
                browser TEXT,
                os TEXT,
                device TEXT,
                country TEXT,
                city TEXT,
                performance_level TEXT NOT NULL,
                is_error INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_request_created ON request_logs(created_at);
            CREATE TABLE IF NOT EXISTS alerts (
                id TEXT PRIMARY KEY,
                rule TEXT,
                severity TEXT NOT NULL,
                created_at TEXT NOT NULL,
                resolved_at TEXT,
                data TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_alert_created ON alerts(created_at);
            CREATE TABLE IF NOT EXISTS uptime_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                is_up INTEGER NOT NULL,
                response_time REAL,
                status_code INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_uptime_timestamp ON uptime_records(timestamp);
            CREATE TABLE IF NOT EXISTS incidents (
                id TEXT PRIMARY KEY,
                severity TEXT NOT NULL,
                start_time TEXT NOT NULL,
                resolved INTEGER NOT NULL DEFAULT 0,
                data TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_incident_start ON incidents(start_time);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn apply_batch(&self, ops: &[StoreOp]) -> Result<()> {
        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction()?;
        let now = ts(&Utc::now());
        for op in ops {
            match op {
                StoreOp::Request(entry) => {
                    tx.execute(
                        "INSERT INTO request_logs (timestamp, method, duration_ms, status_code, operation_name, query, error, ip_address, user_agent, browser, os, device, country, city, performance_level, is_error, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                        params![
                            ts(&entry.timestamp),
                            entry.method.as_str(),
                            entry.duration,
                            entry.status as i32,
                            entry.operation_name,
                            entry.query,
                            entry.error,
                            entry.device.ip_address,
                            entry.device.user_agent,
                            entry.device.browser,
                            entry.device.os,
                            entry.device.device,
                            entry.device.country,
                            entry.device.city,
                            entry.performance_level().as_str(),
                            entry.is_error() as i32,
                            now,
                        ],
                    )?;
                }
                StoreOp::Alert(alert) => {
                    tx.execute(
                        "INSERT OR REPLACE INTO alerts (id, rule, severity, created_at, resolved_at, data)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                        params![
                            alert.id,
                            alert.rule.map(|r| r.as_str()),
                            alert.severity.as_str(),
                            ts(&alert.created_at),
                            alert.resolved_at.as_ref().map(ts),
                            serde_json::to_string(alert)?,
                        ],
                    )?;
                }
                StoreOp::Uptime(record) => {
                    tx.execute(
                        "INSERT INTO uptime_records (timestamp, is_up, response_time, status_code)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![
                            ts(&record.timestamp),
                            record.is_up as i32,
                            record.response_time,
                            record.status_code.map(|c| c as i32),
                        ],
                    )?;
                }
                StoreOp::Incident(incident) => {
                    tx.execute(
                        "INSERT OR REPLACE INTO incidents (id, severity, start_time, resolved, data)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            incident.id,
                            incident.severity.as_str(),
                            ts(&incident.start_time),
                            incident.resolved as i32,
                            serde_json::to_string(incident)?,
                        ],
                    )?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn alert_history(&self, limit: usize) -> Result<Vec<Alert>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT data FROM alerts ORDER BY created_at DESC LIMIT ?1")?;
        let rows = stmt
            .query_map([limit as i64], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.iter()
            .map(|data| serde_json::from_str(data).map_err(Into::into))
            .collect()
    }

    fn incident_history(&self, limit: usize) -> Result<Vec<Incident>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT data FROM incidents ORDER BY start_time DESC LIMIT ?1")?;
        let rows = stmt
            .query_map([limit as i64], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.iter()
            .map(|data| serde_json::from_str(data).map_err(Into::into))
            .collect()
    }

    fn count(&self, table: &str) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get(0)
        })?;
        Ok(count.max(0) as u64)
    }

    /// 删除早于 `cutoff` 的请求日志与健康检查样本
    fn delete_before(&self, cutoff: &DateTime<Utc>) -> Result<u64> {
        let conn = self.conn.lock();
        let cutoff = ts(cutoff);
        let requests = conn.execute("DELETE FROM request_logs WHERE created_at < ?1", [&cutoff])?;
        let uptime = conn.execute("DELETE FROM uptime_records WHERE timestamp < ?1", [&cutoff])?;
        Ok((requests + uptime) as u64)
    }
}

/// 异步持久化服务（公开 API）
pub struct Persistence {
    sender: mpsc::Sender<StoreOp>,
    store: Arc<SqliteStore>,
}

impl Persistence {
    /// 打开数据库并启动后台写入任务（需要在 Tokio runtime 内调用）
    pub fn open(db_path: &str) -> Result<Self> {
        let store = Arc::new(SqliteStore::new(db_path)?);
        let (sender, mut receiver) = mpsc::channel::<StoreOp>(CHANNEL_CAPACITY);

        let write_store = store.clone();
        tokio::spawn(async move {
            while let Some(first) = receiver.recv().await {
                // 尽量把已到达的写操作合并成一批
                let mut batch = vec![first];
                while let Ok(op) = receiver.try_recv() {
                    batch.push(op);
                    if batch.len() >= MAX_BATCH {
                        break;
                    }
                }
                let store = write_store.clone();
                let count = batch.len();
                let written = tokio::task::spawn_blocking(move || store.apply_batch(&batch)).await;
                match written {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::error!(count, "批量写入监控数据失败: {}", e),
                    Err(e) => tracing::error!(count, "批量写入任务异常退出: {}", e),
                }
            }
            tracing::debug!("持久化写入任务已退出");
        });

        tracing::info!("监控数据持久化已启用: {}", db_path);
        Ok(Self { sender, store })
    }

    /// 非阻塞提交写操作；channel 已满或已关闭时丢弃并告警
    pub fn submit(&self, op: StoreOp) {
        let kind = op.kind();
        if let Err(e) = self.sender.try_send(op) {
            tracing::warn!(kind, "持久化通道不可用，丢弃记录: {}", e);
        }
    }

    /// 告警历史（最新在前）
    pub async fn alert_history(&self, limit: usize) -> Result<Vec<Alert>> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.alert_history(limit)).await?
    }

    /// 事件历史（最新在前）
    pub async fn incident_history(&self, limit: usize) -> Result<Vec<Incident>> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.incident_history(limit)).await?
    }

    /// 已持久化的请求日志条数
    pub async fn request_count(&self) -> Result<u64> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.count("request_logs")).await?
    }

    /// 清理超过保留期的请求日志与健康检查样本，返回删除条数
    pub async fn cleanup(&self, retention_days: i64) -> Result<u64> {
        let store = self.store.clone();
        let cutoff = Utc::now() - Duration::days(retention_days);
        tokio::task::spawn_blocking(move || store.delete_before(&cutoff)).await?
    }
}
