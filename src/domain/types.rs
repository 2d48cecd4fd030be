// ==========================================
// 停机申报引擎 - 领域类型定义
// ==========================================
// 职责: 影响等级、申报类型、工单状态、流转动作、班次
// 序列化格式: snake_case (与远端服务一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 影响等级 (Impact Level)
// ==========================================
// 顺序: Low < Medium < High < Critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    Low,      // 低
    Medium,   // 中
    High,     // 高
    Critical, // 严重
}

impl ImpactLevel {
    pub const ALL: [ImpactLevel; 4] = [
        ImpactLevel::Low,
        ImpactLevel::Medium,
        ImpactLevel::High,
        ImpactLevel::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactLevel::Low => "low",
            ImpactLevel::Medium => "medium",
            ImpactLevel::High => "high",
            ImpactLevel::Critical => "critical",
        }
    }

    /// 从字符串解析（大小写不敏感）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(ImpactLevel::Low),
            "medium" => Some(ImpactLevel::Medium),
            "high" => Some(ImpactLevel::High),
            "critical" => Some(ImpactLevel::Critical),
            _ => None,
        }
    }

    /// 高/严重影响默认通知维修
    pub fn requires_maintenance(&self) -> bool {
        matches!(self, ImpactLevel::High | ImpactLevel::Critical)
    }
}

impl fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 申报类型 (Declaration Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationType {
    Planned,   // 计划停机
    Unplanned, // 非计划停机
    Emergency, // 紧急停机
}

impl DeclarationType {
    pub const ALL: [DeclarationType; 3] = [
        DeclarationType::Planned,
        DeclarationType::Unplanned,
        DeclarationType::Emergency,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeclarationType::Planned => "planned",
            DeclarationType::Unplanned => "unplanned",
            DeclarationType::Emergency => "emergency",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "planned" => Some(DeclarationType::Planned),
            "unplanned" => Some(DeclarationType::Unplanned),
            "emergency" => Some(DeclarationType::Emergency),
            _ => None,
        }
    }
}

impl fmt::Display for DeclarationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 工单状态 (Declaration Status)
// ==========================================
// 主线: Declared → Acknowledged → InProgress → Resolved
// 旁路: 任一非终态 → Cancelled
// 终态: Resolved / Cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationStatus {
    Declared,     // 已申报
    Acknowledged, // 已确认
    InProgress,   // 处理中
    Resolved,     // 已解决
    Cancelled,    // 已取消
}

impl DeclarationStatus {
    pub const ALL: [DeclarationStatus; 5] = [
        DeclarationStatus::Declared,
        DeclarationStatus::Acknowledged,
        DeclarationStatus::InProgress,
        DeclarationStatus::Resolved,
        DeclarationStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeclarationStatus::Declared => "declared",
            DeclarationStatus::Acknowledged => "acknowledged",
            DeclarationStatus::InProgress => "in_progress",
            DeclarationStatus::Resolved => "resolved",
            DeclarationStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "declared" => Some(DeclarationStatus::Declared),
            "acknowledged" => Some(DeclarationStatus::Acknowledged),
            "in_progress" => Some(DeclarationStatus::InProgress),
            "resolved" => Some(DeclarationStatus::Resolved),
            "cancelled" => Some(DeclarationStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DeclarationStatus::Resolved | DeclarationStatus::Cancelled)
    }

    // ===== 流转可用性谓词（仅依赖当前状态）=====

    pub fn can_acknowledge(&self) -> bool {
        *self == DeclarationStatus::Declared
    }

    pub fn can_start_work(&self) -> bool {
        matches!(self, DeclarationStatus::Declared | DeclarationStatus::Acknowledged)
    }

    pub fn can_resolve(&self) -> bool {
        matches!(self, DeclarationStatus::Acknowledged | DeclarationStatus::InProgress)
    }

    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }

    pub fn can_delete(&self) -> bool {
        matches!(self, DeclarationStatus::Declared | DeclarationStatus::Cancelled)
    }
}

impl fmt::Display for DeclarationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 流转动作 (Transition Action)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionAction {
    Acknowledge,
    StartWork,
    Resolve,
    Cancel,
}

impl TransitionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionAction::Acknowledge => "acknowledge",
            TransitionAction::StartWork => "start_work",
            TransitionAction::Resolve => "resolve",
            TransitionAction::Cancel => "cancel",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "acknowledge" => Some(TransitionAction::Acknowledge),
            "start_work" => Some(TransitionAction::StartWork),
            "resolve" => Some(TransitionAction::Resolve),
            "cancel" => Some(TransitionAction::Cancel),
            _ => None,
        }
    }

    /// 动作的目标状态
    pub fn target_status(&self) -> DeclarationStatus {
        match self {
            TransitionAction::Acknowledge => DeclarationStatus::Acknowledged,
            TransitionAction::StartWork => DeclarationStatus::InProgress,
            TransitionAction::Resolve => DeclarationStatus::Resolved,
            TransitionAction::Cancel => DeclarationStatus::Cancelled,
        }
    }

    /// 动作在给定状态下是否合法
    pub fn is_allowed_from(&self, status: DeclarationStatus) -> bool {
        match self {
            TransitionAction::Acknowledge => status.can_acknowledge(),
            TransitionAction::StartWork => status.can_start_work(),
            TransitionAction::Resolve => status.can_resolve(),
            TransitionAction::Cancel => status.can_cancel(),
        }
    }
}

impl fmt::Display for TransitionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 班次 (Shift)
// ==========================================
// 早班 06-14, 中班 14-22, 夜班 22-06
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shift {
    Morning,
    Afternoon,
    Night,
}

impl Shift {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shift::Morning => "morning",
            Shift::Afternoon => "afternoon",
            Shift::Night => "night",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "morning" => Some(Shift::Morning),
            "afternoon" => Some(Shift::Afternoon),
            "night" => Some(Shift::Night),
            _ => None,
        }
    }

    pub fn start_hour(&self) -> u32 {
        match self {
            Shift::Morning => 6,
            Shift::Afternoon => 14,
            Shift::Night => 22,
        }
    }

    /// 班次内的小时（按时间顺序，夜班跨零点）
    pub fn hours(&self) -> Vec<u32> {
        let start = self.start_hour();
        (0..8).map(|offset| (start + offset) % 24).collect()
    }

    pub fn contains_hour(&self, hour: u32) -> bool {
        hour < 24 && self.hours().contains(&hour)
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_predicates() {
        use DeclarationStatus::*;

        assert!(Declared.can_acknowledge());
        assert!(!Acknowledged.can_acknowledge());

        assert!(Declared.can_start_work());
        assert!(Acknowledged.can_start_work());
        assert!(!InProgress.can_start_work());

        assert!(!Declared.can_resolve());
        assert!(Acknowledged.can_resolve());
        assert!(InProgress.can_resolve());

        assert!(InProgress.can_cancel());
        assert!(!Resolved.can_cancel());
        assert!(!Cancelled.can_cancel());

        assert!(Declared.can_delete());
        assert!(Cancelled.can_delete());
        assert!(!InProgress.can_delete());
        assert!(!Resolved.can_delete());
    }

    #[test]
    fn test_terminal_states_allow_nothing() {
        for status in [DeclarationStatus::Resolved, DeclarationStatus::Cancelled] {
            for action in [
                TransitionAction::Acknowledge,
                TransitionAction::StartWork,
                TransitionAction::Resolve,
                TransitionAction::Cancel,
            ] {
                assert!(!action.is_allowed_from(status), "{} from {}", action, status);
            }
        }
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in DeclarationStatus::ALL {
            assert_eq!(DeclarationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DeclarationStatus::parse("IN_PROGRESS"), Some(DeclarationStatus::InProgress));
        assert_eq!(DeclarationStatus::parse("unknown"), None);
    }

    #[test]
    fn test_night_shift_wraps_midnight() {
        let hours = Shift::Night.hours();
        assert_eq!(hours, vec![22, 23, 0, 1, 2, 3, 4, 5]);
        assert!(Shift::Night.contains_hour(3));
        assert!(!Shift::Night.contains_hour(6));
        assert!(!Shift::Morning.contains_hour(24));
    }
}
