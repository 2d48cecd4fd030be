// ==========================================
// 停机申报引擎 - API层错误类型
// ==========================================
// 职责: 统一对外错误, 转换规则错误与仓储错误
// 说明: 通知失败不属于 API 错误, 以 DispatchWarning 单独上报
// ==========================================

use crate::domain::types::{DeclarationStatus, TransitionAction};
use crate::engine::error::RuleViolation;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
/// 所有错误信息必须包含显式原因（字段名或状态）
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误（未产生任何修改）
    // ==========================================
    #[error("无效的状态流转: action={action}, from={from}")]
    InvalidTransition {
        action: TransitionAction,
        from: DeclarationStatus,
    },

    #[error("当前状态不允许该操作: operation={operation}, status={status}")]
    InvalidState {
        operation: String,
        status: DeclarationStatus,
    },

    #[error("缺少必填字段: {field}")]
    MissingRequiredField { field: String },

    #[error("字段值错误 (field={field}): {message}")]
    FieldValueError { field: String, message: String },

    #[error("参考数据不一致 (field={field}): {message}")]
    ReferenceIntegrityViolation { field: String, message: String },

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("并发修改冲突: {0}")]
    ConcurrentModification(String),

    // ==========================================
    // 上游/数据访问错误
    // ==========================================
    #[error("上游服务不可用: {0}")]
    UpstreamUnavailable(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        ApiError::NotFound(format!("{}(id={})不存在", entity, id))
    }

    pub fn reference(field: &str, message: impl Into<String>) -> Self {
        ApiError::ReferenceIntegrityViolation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// 调用方可重试（并发冲突需先重新读取）
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::UpstreamUnavailable(_) | ApiError::ConcurrentModification(_)
        )
    }
}

// ==========================================
// 从 RuleViolation 转换
// ==========================================
impl From<RuleViolation> for ApiError {
    fn from(err: RuleViolation) -> Self {
        match err {
            RuleViolation::InvalidTransition { action, from } => {
                ApiError::InvalidTransition { action, from }
            }
            RuleViolation::InvalidState { operation, status } => ApiError::InvalidState {
                operation: operation.to_string(),
                status,
            },
            RuleViolation::MissingRequiredField { field } => ApiError::MissingRequiredField {
                field: field.to_string(),
            },
            RuleViolation::FieldValue { field, message } => ApiError::FieldValueError {
                field: field.to_string(),
                message,
            },
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::OptimisticLockFailure {
                declaration_id,
                expected,
                actual,
            } => ApiError::ConcurrentModification(format!(
                "工单{}已被其他用户修改（期望状态={}，实际状态={}）",
                declaration_id, expected, actual
            )),
            RepositoryError::NotFound { entity, id } => ApiError::not_found(&entity, &id),

            RepositoryError::Unavailable(msg) => ApiError::UpstreamUnavailable(msg),
            RepositoryError::DatabaseConnectionError(msg) => ApiError::UpstreamUnavailable(msg),
            RepositoryError::LockError(msg) => {
                ApiError::UpstreamUnavailable(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::DatabaseError(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::ReferenceIntegrityViolation {
                    field: "foreign_key".to_string(),
                    message: msg,
                }
            }

            RepositoryError::FieldValueError { field, message } => {
                ApiError::FieldValueError { field, message }
            }

            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
