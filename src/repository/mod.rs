// ==========================================
// 停机申报引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 定义外部服务接口（trait）并提供 SQLite 实现
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod declaration_repo;
pub mod declaration_repo_impl;
pub mod error;
pub mod production_repo;
pub mod production_repo_impl;
pub mod reference_repo;
pub mod reference_repo_impl;

// 重导出核心仓储
pub use declaration_repo::DeclarationRepository;
pub use declaration_repo_impl::SqliteDeclarationRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use production_repo::ProductionRecordRepository;
pub use production_repo_impl::SqliteProductionRepository;
pub use reference_repo::{
    AssignmentFilter, HeadcountFilter, ReferenceDataRepository, WorkstationFilter,
};
pub use reference_repo_impl::SqliteReferenceRepository;
