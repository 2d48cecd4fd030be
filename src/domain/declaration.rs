// ==========================================
// 停机申报引擎 - 停机申报领域模型
// ==========================================
// 职责: 停机工单实体、创建载荷、流转记录
// 红线: status / assigned_technician / resolution_notes / cancel_reason
//       只能经由命名流转修改
// ==========================================

use crate::domain::types::{DeclarationStatus, DeclarationType, ImpactLevel, TransitionAction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// DowntimeDeclaration - 停机工单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DowntimeDeclaration {
    // ===== 标识 (远端分配, 不可变) =====
    pub declaration_id: String, // 工单ID
    pub ticket_number: String,  // 工单编号 (DT-YYYYMMDD-NNNN)

    // ===== 分类 =====
    pub impact_level: ImpactLevel,
    pub declaration_type: DeclarationType,

    // ===== 位置 =====
    pub workstation_id: String,             // 工位 (必填)
    #[serde(default)]
    pub machine_id: Option<String>,         // 设备 (可选, 必须属于工位)
    #[serde(default)]
    pub production_line_id: Option<String>, // 产线 (通知时必填)
    #[serde(default)]
    pub zone_id: Option<String>,            // 区域/项目 (仅用于级联筛选)

    // ===== 内容 =====
    pub reason: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub problem_type_id: Option<String>, // 问题类型 (可后补)
    pub duration_minutes: u32,           // 预估停机时长 (分钟)
    #[serde(default)]
    pub estimated_resolution_at: Option<DateTime<Utc>>,

    // ===== 工作流 =====
    pub status: DeclarationStatus,
    #[serde(default)]
    pub assigned_technician: Option<String>,
    #[serde(default)]
    pub resolution_notes: Option<String>,
    #[serde(default)]
    pub cancel_reason: Option<String>,

    // ===== 各流转时间戳 =====
    pub declared_at: DateTime<Utc>,
    #[serde(default)]
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,

    // ===== 副作用开关 =====
    pub notify_maintenance: bool,
    #[serde(default)]
    pub declared_by: Option<String>,
}

impl DowntimeDeclaration {
    /// 一次性读取全部流转可用性（同一状态快照）
    pub fn availability(&self) -> TransitionAvailability {
        TransitionAvailability::from_status(self.status)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// 问题类型是否仍待补全
    pub fn needs_problem_type(&self) -> bool {
        self.problem_type_id.is_none() && !self.status.is_terminal()
    }
}

// ==========================================
// TransitionAvailability - 流转可用性
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionAvailability {
    pub status: DeclarationStatus,
    pub can_acknowledge: bool,
    pub can_start_work: bool,
    pub can_resolve: bool,
    pub can_cancel: bool,
    pub can_delete: bool,
}

impl TransitionAvailability {
    pub fn from_status(status: DeclarationStatus) -> Self {
        Self {
            status,
            can_acknowledge: status.can_acknowledge(),
            can_start_work: status.can_start_work(),
            can_resolve: status.can_resolve(),
            can_cancel: status.can_cancel(),
            can_delete: status.can_delete(),
        }
    }
}

// ==========================================
// NewDeclaration - 创建载荷 (操作员输入)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDeclaration {
    pub workstation_id: String,
    #[serde(default)]
    pub machine_id: Option<String>,
    #[serde(default)]
    pub production_line_id: Option<String>,
    #[serde(default)]
    pub zone_id: Option<String>,
    #[serde(default)]
    pub problem_type_id: Option<String>,
    pub reason: String,
    #[serde(default)]
    pub description: Option<String>,
    pub impact_level: ImpactLevel,
    pub declaration_type: DeclarationType,
    pub duration_minutes: u32,
    #[serde(default)]
    pub estimated_resolution_at: Option<DateTime<Utc>>,
    pub notify_maintenance: bool,
    #[serde(default)]
    pub declared_by: Option<String>,
}

// ==========================================
// DeclarationFilter - 列表筛选
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationFilter {
    #[serde(default)]
    pub status: Option<DeclarationStatus>,
    #[serde(default)]
    pub line_id: Option<String>,
}

impl DeclarationFilter {
    pub fn by_status(status: DeclarationStatus) -> Self {
        Self {
            status: Some(status),
            line_id: None,
        }
    }

    pub fn by_line(line_id: impl Into<String>) -> Self {
        Self {
            status: None,
            line_id: Some(line_id.into()),
        }
    }

    pub fn matches(&self, declaration: &DowntimeDeclaration) -> bool {
        if let Some(status) = self.status {
            if declaration.status != status {
                return false;
            }
        }
        if let Some(line_id) = &self.line_id {
            if declaration.production_line_id.as_deref() != Some(line_id.as_str()) {
                return false;
            }
        }
        true
    }
}

// ==========================================
// TransitionRecord - 已校验的流转
// ==========================================
// 由状态机生成, 持久化层按 from_status 做比较交换
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub action: TransitionAction,
    pub from_status: DeclarationStatus,
    pub to_status: DeclarationStatus,
    pub assigned_technician: Option<String>,
    pub resolution_notes: Option<String>,
    pub cancel_reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl TransitionRecord {
    /// 将流转结果写入工单副本（持久化适配器使用）
    pub fn apply_to(&self, declaration: &mut DowntimeDeclaration) {
        declaration.status = self.to_status;
        if self.assigned_technician.is_some() {
            declaration.assigned_technician = self.assigned_technician.clone();
        }
        match self.action {
            TransitionAction::Acknowledge => declaration.acknowledged_at = Some(self.occurred_at),
            TransitionAction::StartWork => declaration.started_at = Some(self.occurred_at),
            TransitionAction::Resolve => {
                declaration.resolution_notes = self.resolution_notes.clone();
                declaration.resolved_at = Some(self.occurred_at);
            }
            TransitionAction::Cancel => {
                declaration.cancel_reason = self.cancel_reason.clone();
                declaration.cancelled_at = Some(self.occurred_at);
            }
        }
    }
}

// ==========================================
// DeclarationHistoryEntry - 流转审计记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclarationHistoryEntry {
    pub history_id: String,
    pub declaration_id: String,
    pub action: String, // create / acknowledge / start_work / resolve / cancel / assign_problem_type
    pub from_status: Option<DeclarationStatus>,
    pub to_status: DeclarationStatus,
    pub actor: Option<String>,
    pub detail: Option<String>,
    pub occurred_at: DateTime<Utc>,
}
