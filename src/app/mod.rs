// ==========================================
// 停机申报引擎 - 应用层
// ==========================================
// 职责: 装配仓储、服务与 API
// ==========================================

pub mod state;

// 重导出
pub use state::EngineContext;
