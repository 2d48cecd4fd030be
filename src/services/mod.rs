// ==========================================
// 停机申报引擎 - 服务层
// ==========================================
// 职责: 有状态的协作组件（参考数据缓存、通知分发、轮询刷新）
// 红线: 不含业务规则, 规则统一在 engine 层
// ==========================================

pub mod notification;
pub mod reference_catalog;
pub mod refresh_controller;

pub use notification::{
    DispatchTicket, DispatchWarning, NotificationDispatcher, DEFAULT_NOTIFICATION_TIMEOUT_MS,
};
pub use reference_catalog::ReferenceCatalog;
pub use refresh_controller::{OverlapPolicy, RefreshController, RefreshSnapshot, RefreshSource};
