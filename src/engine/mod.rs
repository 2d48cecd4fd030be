// ==========================================
// 停机申报引擎 - 引擎层
// ==========================================
// 职责: 纯业务规则, 不拼 SQL, 不做 I/O
// 红线: 规则校验失败必须给出字段或状态原因
// ==========================================

pub mod aggregation;
pub mod classifier;
pub mod error;
pub mod events;
pub mod metrics;
pub mod state_machine;

// 重导出核心引擎
pub use aggregation::{downtime_breakdown, shift_totals};
pub use classifier::{classify, classify_new_declaration, Classification};
pub use error::{RuleResult, RuleViolation};
pub use events::{
    AlertPriority, LogOnlyChannel, MaintenanceAlert, NotificationChannel, NotificationError,
    NotificationEvent,
};
pub use metrics::{
    compute_efficiency, resolve_headcount, resolve_target, LineMetrics, MetricsResolver,
};
pub use state_machine::{
    available_actions, CreationLimits, DeclarationStateMachine, TransitionCommand,
};
