// ==========================================
// 停机申报引擎 - API层
// ==========================================
// 职责: 面向调用方的用例入口, 组合引擎规则、仓储与服务
// 红线: 校验失败必须在任何写入与外部调用之前返回
// ==========================================

pub mod declaration_api;
pub mod error;
pub mod production_api;

pub use declaration_api::{DeclarationApi, DeclarationListSource, DeclarationOutcome};
pub use error::{ApiError, ApiResult};
pub use production_api::{ProductionApi, DEFAULT_MAX_HOURLY_DOWNTIME_MINUTES};
