// ==========================================
// 停机申报引擎 - 工单状态机
// ==========================================
// 状态: declared → acknowledged → in_progress → resolved
//       declared / acknowledged / in_progress → cancelled
// 守卫:
// - start_work 需要维修技术员（输入或已分配）
// - resolve 需要非空处理说明
// - acknowledge / cancel 仅校验当前状态
// 红线: 校验失败不产生任何状态变化; 本模块只生成流转记录, 不做持久化
// ==========================================

use crate::domain::declaration::{DowntimeDeclaration, NewDeclaration, TransitionRecord};
use crate::domain::types::{DeclarationStatus, TransitionAction};
use crate::engine::error::{RuleResult, RuleViolation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

// ==========================================
// TransitionCommand - 流转命令
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TransitionCommand {
    Acknowledge { technician: Option<String> },
    StartWork { technician: Option<String> },
    Resolve { notes: Option<String> },
    Cancel { reason: Option<String> },
}

impl TransitionCommand {
    pub fn action(&self) -> TransitionAction {
        match self {
            TransitionCommand::Acknowledge { .. } => TransitionAction::Acknowledge,
            TransitionCommand::StartWork { .. } => TransitionAction::StartWork,
            TransitionCommand::Resolve { .. } => TransitionAction::Resolve,
            TransitionCommand::Cancel { .. } => TransitionAction::Cancel,
        }
    }
}

/// 创建校验上限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreationLimits {
    pub max_duration_minutes: u32,
    pub reason_max_len: usize,
}

impl Default for CreationLimits {
    fn default() -> Self {
        Self {
            max_duration_minutes: 720,
            reason_max_len: 200,
        }
    }
}

/// 去除首尾空白, 空串视为未填写
fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ==========================================
// DeclarationStateMachine
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct DeclarationStateMachine {
    limits: CreationLimits,
}

impl DeclarationStateMachine {
    pub fn new(limits: CreationLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> CreationLimits {
        self.limits
    }

    /// 校验并规范化创建载荷（不含参考数据完整性校验）
    pub fn validate_create(&self, payload: &NewDeclaration) -> RuleResult<NewDeclaration> {
        let workstation_id = normalize(Some(&payload.workstation_id))
            .ok_or(RuleViolation::MissingRequiredField { field: "workstation_id" })?;

        let reason = normalize(Some(&payload.reason))
            .ok_or(RuleViolation::MissingRequiredField { field: "reason" })?;
        if reason.chars().count() > self.limits.reason_max_len {
            return Err(RuleViolation::FieldValue {
                field: "reason",
                message: format!("长度超过上限 {}", self.limits.reason_max_len),
            });
        }

        if payload.duration_minutes == 0 || payload.duration_minutes > self.limits.max_duration_minutes {
            return Err(RuleViolation::FieldValue {
                field: "duration_minutes",
                message: format!(
                    "预估时长必须在 1..={} 分钟之间, 实际={}",
                    self.limits.max_duration_minutes, payload.duration_minutes
                ),
            });
        }

        Ok(NewDeclaration {
            workstation_id,
            machine_id: normalize(payload.machine_id.as_deref()),
            production_line_id: normalize(payload.production_line_id.as_deref()),
            zone_id: normalize(payload.zone_id.as_deref()),
            problem_type_id: normalize(payload.problem_type_id.as_deref()),
            reason,
            description: normalize(payload.description.as_deref()),
            impact_level: payload.impact_level,
            declaration_type: payload.declaration_type,
            duration_minutes: payload.duration_minutes,
            estimated_resolution_at: payload.estimated_resolution_at,
            notify_maintenance: payload.notify_maintenance,
            declared_by: normalize(payload.declared_by.as_deref()),
        })
    }

    /// 根据当前工单快照生成流转记录
    ///
    /// # 返回
    /// - Ok(TransitionRecord): 合法流转, from_status 即读取时的状态
    /// - Err(InvalidTransition): 当前状态不允许该动作
    /// - Err(MissingRequiredField): 缺少必填输入
    #[instrument(skip(self, declaration), fields(declaration_id = %declaration.declaration_id, from = %declaration.status))]
    pub fn plan(
        &self,
        declaration: &DowntimeDeclaration,
        command: &TransitionCommand,
        now: DateTime<Utc>,
    ) -> RuleResult<TransitionRecord> {
        let action = command.action();
        let from = declaration.status;

        if !action.is_allowed_from(from) {
            return Err(RuleViolation::InvalidTransition { action, from });
        }

        let mut record = TransitionRecord {
            action,
            from_status: from,
            to_status: action.target_status(),
            assigned_technician: None,
            resolution_notes: None,
            cancel_reason: None,
            occurred_at: now,
        };

        match command {
            TransitionCommand::Acknowledge { technician } => {
                record.assigned_technician = normalize(technician.as_deref());
            }
            TransitionCommand::StartWork { technician } => {
                let technician = normalize(technician.as_deref())
                    .or_else(|| normalize(declaration.assigned_technician.as_deref()))
                    .ok_or(RuleViolation::MissingRequiredField {
                        field: "assigned_technician",
                    })?;
                record.assigned_technician = Some(technician);
            }
            TransitionCommand::Resolve { notes } => {
                let notes = normalize(notes.as_deref()).ok_or(
                    RuleViolation::MissingRequiredField {
                        field: "resolution_notes",
                    },
                )?;
                record.resolution_notes = Some(notes);
            }
            TransitionCommand::Cancel { reason } => {
                record.cancel_reason = normalize(reason.as_deref());
            }
        }

        Ok(record)
    }

    /// 删除守卫
    pub fn check_delete(&self, declaration: &DowntimeDeclaration) -> RuleResult<()> {
        if declaration.status.can_delete() {
            Ok(())
        } else {
            Err(RuleViolation::InvalidState {
                operation: "delete",
                status: declaration.status,
            })
        }
    }

    /// 问题类型补全守卫（终态工单不可修改）
    pub fn check_problem_type_completion(&self, declaration: &DowntimeDeclaration) -> RuleResult<()> {
        if declaration.status.is_terminal() {
            Err(RuleViolation::InvalidState {
                operation: "assign_problem_type",
                status: declaration.status,
            })
        } else {
            Ok(())
        }
    }
}

/// 当前状态下可执行的动作
pub fn available_actions(status: DeclarationStatus) -> Vec<TransitionAction> {
    [
        TransitionAction::Acknowledge,
        TransitionAction::StartWork,
        TransitionAction::Resolve,
        TransitionAction::Cancel,
    ]
    .into_iter()
    .filter(|a| a.is_allowed_from(status))
    .collect()
}
