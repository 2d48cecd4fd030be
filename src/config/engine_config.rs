// ==========================================
// 停机申报引擎 - 引擎运行参数
// ==========================================
// 存储: config_kv 表 (scope_id='global'), 缺省值见 Default
// ==========================================

use crate::engine::state_machine::CreationLimits;
use crate::services::refresh_controller::OverlapPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 工单列表轮询间隔（秒）
    pub refresh_interval_secs: u64,
    /// 单次轮询拉取超时（秒）
    pub refresh_fetch_timeout_secs: u64,
    /// 申报预估停机时长上限（分钟, 一个班次长度以内）
    pub max_duration_minutes: u32,
    /// 单小时停机明细上限（分钟）
    pub max_hourly_downtime_minutes: u32,
    /// 单次维修通知超时（毫秒）
    pub notification_timeout_ms: u64,
    /// 停机原因最大长度（字符）
    pub reason_max_len: usize,
    /// 轮询重叠策略
    pub overlap_policy: OverlapPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 30,
            refresh_fetch_timeout_secs: 60,
            max_duration_minutes: 720,
            max_hourly_downtime_minutes: 60,
            notification_timeout_ms: 5000,
            reason_max_len: 200,
            overlap_policy: OverlapPolicy::Skip,
        }
    }
}

impl EngineConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn refresh_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_fetch_timeout_secs)
    }

    pub fn notification_timeout(&self) -> Duration {
        Duration::from_millis(self.notification_timeout_ms)
    }

    pub fn creation_limits(&self) -> CreationLimits {
        CreationLimits {
            max_duration_minutes: self.max_duration_minutes,
            reason_max_len: self.reason_max_len,
        }
    }
}
