// ==========================================
// 停机申报引擎 - 维修通知事件
// ==========================================
// 职责: 定义维修通知事件与通知通道 trait，实现依赖倒置
// 说明: Engine 层定义 trait，外部维修通知系统实现适配器
// ==========================================

use crate::domain::declaration::DowntimeDeclaration;
use crate::domain::types::ImpactLevel;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ==========================================
// 通知事件类型
// ==========================================

/// 触发维修通知的工单事件
///
/// 取消不发送通知
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    /// 工单创建
    Declared,
    /// 已确认（可能已分配技术员）
    Acknowledged,
    /// 开始维修
    WorkStarted,
    /// 已解决
    Resolved,
}

impl NotificationEvent {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationEvent::Declared => "declared",
            NotificationEvent::Acknowledged => "acknowledged",
            NotificationEvent::WorkStarted => "work_started",
            NotificationEvent::Resolved => "resolved",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            NotificationEvent::Declared => "新停机申报",
            NotificationEvent::Acknowledged => "停机已确认",
            NotificationEvent::WorkStarted => "开始维修",
            NotificationEvent::Resolved => "停机已解决",
        }
    }
}

/// 告警优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPriority {
    Low,
    Normal,
    High,
    Urgent,
}

impl From<ImpactLevel> for AlertPriority {
    fn from(impact: ImpactLevel) -> Self {
        match impact {
            ImpactLevel::Low => AlertPriority::Low,
            ImpactLevel::Medium => AlertPriority::Normal,
            ImpactLevel::High => AlertPriority::High,
            ImpactLevel::Critical => AlertPriority::Urgent,
        }
    }
}

/// 维修告警
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceAlert {
    /// 工单 ID
    pub declaration_id: String,
    /// 工单编号
    pub ticket_number: String,
    /// 事件类型
    pub event: NotificationEvent,
    /// 优先级（由影响等级映射）
    pub priority: AlertPriority,
    /// 摘要
    pub summary: String,
    /// 通知目标（产线）
    pub target: String,
}

impl MaintenanceAlert {
    /// 从工单构建告警；未设置产线时返回 None（无通知目标）
    pub fn from_declaration(event: NotificationEvent, declaration: &DowntimeDeclaration) -> Option<Self> {
        let target = declaration.production_line_id.clone()?;

        let mut summary = format!(
            "[{}] {} 工位={} 原因={}",
            declaration.ticket_number,
            event.label(),
            declaration.workstation_id,
            declaration.reason
        );
        if let Some(technician) = &declaration.assigned_technician {
            summary.push_str(&format!(" 技术员={}", technician));
        }

        Some(Self {
            declaration_id: declaration.declaration_id.clone(),
            ticket_number: declaration.ticket_number.clone(),
            event,
            priority: AlertPriority::from(declaration.impact_level),
            summary,
            target,
        })
    }
}

// ==========================================
// 通知错误
// ==========================================

/// 通知发送失败（次要、非致命）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    #[error("通知通道拒绝: {0}")]
    Rejected(String),

    #[error("通知通道不可达: {0}")]
    Unreachable(String),

    #[error("通知发送超时: {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("缺少通知目标: 工单 {declaration_id} 未设置产线")]
    MissingTarget { declaration_id: String },

    #[error("通知任务异常终止: {0}")]
    TaskAborted(String),
}

// ==========================================
// 通知通道 Trait
// ==========================================

/// 维修通知通道
///
/// Engine 层定义，外部系统实现
/// 只要求成功/失败, 不要求响应内容
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// 发送维修告警
    async fn send(&self, alert: &MaintenanceAlert) -> Result<(), NotificationError>;
}

/// 仅记录日志的通知通道
///
/// 用于未接入维修系统的场景（如本地开发）
#[derive(Debug, Clone, Default)]
pub struct LogOnlyChannel;

#[async_trait]
impl NotificationChannel for LogOnlyChannel {
    async fn send(&self, alert: &MaintenanceAlert) -> Result<(), NotificationError> {
        tracing::info!(
            declaration_id = %alert.declaration_id,
            event = alert.event.as_str(),
            priority = ?alert.priority,
            target = %alert.target,
            "LogOnlyChannel: {}",
            alert.summary
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{DeclarationStatus, DeclarationType};
    use chrono::Utc;

    fn declaration(line: Option<&str>, impact: ImpactLevel) -> DowntimeDeclaration {
        DowntimeDeclaration {
            declaration_id: "D-9".to_string(),
            ticket_number: "DT-20260301-0009".to_string(),
            impact_level: impact,
            declaration_type: DeclarationType::Unplanned,
            workstation_id: "WS-2".to_string(),
            machine_id: None,
            production_line_id: line.map(str::to_string),
            zone_id: None,
            reason: "液压泄漏".to_string(),
            description: None,
            problem_type_id: None,
            duration_minutes: 45,
            estimated_resolution_at: None,
            status: DeclarationStatus::Declared,
            assigned_technician: None,
            resolution_notes: None,
            cancel_reason: None,
            declared_at: Utc::now(),
            acknowledged_at: None,
            started_at: None,
            resolved_at: None,
            cancelled_at: None,
            notify_maintenance: true,
            declared_by: None,
        }
    }

    #[test]
    fn test_alert_from_declaration() {
        let alert = MaintenanceAlert::from_declaration(
            NotificationEvent::Declared,
            &declaration(Some("L1"), ImpactLevel::Critical),
        )
        .unwrap();

        assert_eq!(alert.target, "L1");
        assert_eq!(alert.priority, AlertPriority::Urgent);
        assert!(alert.summary.contains("DT-20260301-0009"));
        assert!(alert.summary.contains("液压泄漏"));
    }

    #[test]
    fn test_alert_without_line_has_no_target() {
        assert!(MaintenanceAlert::from_declaration(
            NotificationEvent::Declared,
            &declaration(None, ImpactLevel::High),
        )
        .is_none());
    }

    #[tokio::test]
    async fn test_log_only_channel_accepts() {
        let alert = MaintenanceAlert::from_declaration(
            NotificationEvent::Resolved,
            &declaration(Some("L2"), ImpactLevel::Low),
        )
        .unwrap();
        assert!(LogOnlyChannel.send(&alert).await.is_ok());
    }
}
