// ==========================================
// 停机申报引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 约束: 缺失或无法解析的配置回退到缺省值, 不阻断启动
// ==========================================

use crate::config::engine_config::EngineConfig;
use crate::db::open_sqlite_connection;
use crate::services::refresh_controller::OverlapPolicy;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
            conn_guard.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS config_kv (
                  scope_id TEXT NOT NULL,
                  key TEXT NOT NULL,
                  value TEXT NOT NULL,
                  PRIMARY KEY (scope_id, key)
                );
                "#,
            )?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入 global 配置（覆盖）
    pub fn set_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        tracing::info!(config_key = key, value, "配置已更新");
        Ok(())
    }

    /// 读取并解析配置; 缺失或格式错误时返回缺省值
    fn parse_or_default<T>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: FromStr + Copy + std::fmt::Debug,
    {
        let raw = match self.get_global_config_value(key)? {
            Some(raw) => raw,
            None => return Ok(default),
        };
        match raw.trim().parse::<T>() {
            Ok(value) => Ok(value),
            Err(_) => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    default = ?default,
                    "配置格式错误，使用缺省值"
                );
                Ok(default)
            }
        }
    }

    /// 加载引擎运行参数
    pub fn load_engine_config(&self) -> Result<EngineConfig, Box<dyn Error>> {
        let defaults = EngineConfig::default();

        let overlap_policy = match self.get_global_config_value(config_keys::OVERLAP_POLICY)? {
            None => defaults.overlap_policy,
            Some(raw) => OverlapPolicy::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(
                    config_key = config_keys::OVERLAP_POLICY,
                    raw_value = %raw,
                    "轮询重叠策略无效，使用 skip"
                );
                defaults.overlap_policy
            }),
        };

        let config = EngineConfig {
            refresh_interval_secs: self
                .parse_or_default(config_keys::REFRESH_INTERVAL_SECS, defaults.refresh_interval_secs)?
                .max(1),
            refresh_fetch_timeout_secs: self
                .parse_or_default(
                    config_keys::REFRESH_FETCH_TIMEOUT_SECS,
                    defaults.refresh_fetch_timeout_secs,
                )?
                .max(1),
            max_duration_minutes: self
                .parse_or_default(config_keys::MAX_DURATION_MINUTES, defaults.max_duration_minutes)?,
            max_hourly_downtime_minutes: self.parse_or_default(
                config_keys::MAX_HOURLY_DOWNTIME_MINUTES,
                defaults.max_hourly_downtime_minutes,
            )?,
            notification_timeout_ms: self.parse_or_default(
                config_keys::NOTIFICATION_TIMEOUT_MS,
                defaults.notification_timeout_ms,
            )?,
            reason_max_len: self
                .parse_or_default(config_keys::REASON_MAX_LEN, defaults.reason_max_len)?,
            overlap_policy,
        };

        tracing::debug!(?config, "引擎配置已加载");
        Ok(config)
    }

    /// 获取所有 global 配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key",
        )?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 轮询
    pub const REFRESH_INTERVAL_SECS: &str = "refresh_interval_secs";
    pub const OVERLAP_POLICY: &str = "refresh_overlap_policy";
    pub const REFRESH_FETCH_TIMEOUT_SECS: &str = "refresh_fetch_timeout_secs";

    // 申报校验
    pub const MAX_DURATION_MINUTES: &str = "max_duration_minutes";
    pub const REASON_MAX_LEN: &str = "reason_max_len";

    // 产量录入
    pub const MAX_HOURLY_DOWNTIME_MINUTES: &str = "max_hourly_downtime_minutes";

    // 维修通知
    pub const NOTIFICATION_TIMEOUT_MS: &str = "notification_timeout_ms";
}
