// ==========================================
// 停机申报引擎 - 引擎层规则错误
// ==========================================
// 职责: 纯规则校验失败（发生在任何状态修改与外部调用之前）
// ==========================================

use crate::domain::types::{DeclarationStatus, TransitionAction};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleViolation {
    #[error("无效的状态流转: action={action}, from={from}")]
    InvalidTransition {
        action: TransitionAction,
        from: DeclarationStatus,
    },

    #[error("当前状态不允许该操作: operation={operation}, status={status}")]
    InvalidState {
        operation: &'static str,
        status: DeclarationStatus,
    },

    #[error("缺少必填字段: {field}")]
    MissingRequiredField { field: &'static str },

    #[error("字段值错误 (field={field}): {message}")]
    FieldValue { field: &'static str, message: String },
}

pub type RuleResult<T> = Result<T, RuleViolation>;
