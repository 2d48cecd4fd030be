// ==========================================
// 停机申报引擎 - 配置层
// ==========================================
// 职责: 引擎运行参数, 支持 config_kv 覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod engine_config;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use engine_config::EngineConfig;
