// ==========================================
// 停机申报引擎 - 核心库
// ==========================================
// 范围: 停机申报生命周期、维修通知、小时产量指标与班次汇总
// 技术栈: Rust + Tokio + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 纯业务规则
pub mod engine;

// 数据仓储层 - 外部服务接口与 SQLite 实现
pub mod repository;

// 服务层 - 参考数据缓存、通知分发、轮询刷新
pub mod services;

// 配置层 - 引擎运行参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 用例入口
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{DeclarationStatus, DeclarationType, ImpactLevel, Shift, TransitionAction};

// 领域实体
pub use domain::{
    DeclarationFilter, DowntimeDeclaration, DowntimeEntry, HourlyProductionRecord, NewDeclaration,
    ShiftReport, ShiftTotals, TransitionAvailability,
};

// 引擎
pub use engine::{
    classify, compute_efficiency, shift_totals, DeclarationStateMachine, MetricsResolver,
    NotificationChannel,
};

// API
pub use api::{ApiError, ApiResult, DeclarationApi, ProductionApi};

// 应用
pub use app::EngineContext;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "停机申报引擎";
