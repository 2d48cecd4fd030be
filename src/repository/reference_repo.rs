// ==========================================
// 停机申报引擎 - 参考数据 Repository Trait
// ==========================================
// 职责: 只读获取产线/工位/设备/问题类型/零件/分配/人员需求
// 红线: 本引擎不写参考数据
// ==========================================

use crate::domain::reference::{
    HeadcountRequirement, Machine, Part, PartLineAssignment, ProblemType, ProductionLine,
    Workstation,
};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

/// 工位筛选（级联: 产线 / 项目）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkstationFilter {
    pub line_id: Option<String>,
    pub project_id: Option<String>,
}

/// 零件-产线分配筛选
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentFilter {
    pub part_id: Option<String>,
    pub line_id: Option<String>,
    pub active_only: bool,
}

/// 人员需求筛选
///
/// part_id 只做精确匹配；产线级需求（part 为空）需要另外按产线查询
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadcountFilter {
    pub line_id: Option<String>,
    pub part_id: Option<String>,
    pub active_only: bool,
}

// ==========================================
// ReferenceDataRepository Trait
// ==========================================
#[async_trait]
pub trait ReferenceDataRepository: Send + Sync {
    async fn list_lines(&self) -> RepositoryResult<Vec<ProductionLine>>;

    async fn list_workstations(&self, filter: &WorkstationFilter) -> RepositoryResult<Vec<Workstation>>;

    /// workstation_id 为空时返回全部设备
    async fn list_machines(&self, workstation_id: Option<&str>) -> RepositoryResult<Vec<Machine>>;

    async fn list_problem_types(&self) -> RepositoryResult<Vec<ProblemType>>;

    async fn list_parts(&self) -> RepositoryResult<Vec<Part>>;

    async fn list_assignments(&self, filter: &AssignmentFilter) -> RepositoryResult<Vec<PartLineAssignment>>;

    async fn list_headcount_requirements(
        &self,
        filter: &HeadcountFilter,
    ) -> RepositoryResult<Vec<HeadcountRequirement>>;
}
