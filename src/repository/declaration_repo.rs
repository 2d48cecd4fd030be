// ==========================================
// 停机申报引擎 - 停机工单 Repository Trait
// ==========================================
// 职责: 定义工单持久化服务接口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据读写
// 约束: 流转与删除按期望状态做比较交换, 状态已变化时返回乐观锁冲突
// ==========================================

use crate::domain::declaration::{
    DeclarationFilter, DeclarationHistoryEntry, DowntimeDeclaration, NewDeclaration,
    TransitionRecord,
};
use crate::domain::types::DeclarationStatus;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// DeclarationRepository Trait
// ==========================================
// 实现者: SqliteDeclarationRepository（使用 rusqlite）或远端服务客户端
#[async_trait]
pub trait DeclarationRepository: Send + Sync {
    /// 创建工单（分配工单ID与编号，初始状态 declared）
    ///
    /// 写操作不做隐式重试，避免重复建单
    async fn create(&self, payload: &NewDeclaration) -> RepositoryResult<DowntimeDeclaration>;

    /// 按 ID 查询
    async fn get(&self, declaration_id: &str) -> RepositoryResult<Option<DowntimeDeclaration>>;

    /// 按状态/产线筛选（按申报时间倒序）
    async fn list(&self, filter: &DeclarationFilter) -> RepositoryResult<Vec<DowntimeDeclaration>>;

    /// 提交已校验的流转
    ///
    /// # 返回
    /// - Ok: 提交后的工单
    /// - Err(OptimisticLockFailure): 当前状态 != record.from_status
    /// - Err(NotFound): 工单不存在
    async fn transition(
        &self,
        declaration_id: &str,
        record: &TransitionRecord,
    ) -> RepositoryResult<DowntimeDeclaration>;

    /// 补全问题类型（状态不变）
    async fn assign_problem_type(
        &self,
        declaration_id: &str,
        problem_type_id: &str,
        expected_status: DeclarationStatus,
    ) -> RepositoryResult<DowntimeDeclaration>;

    /// 物理删除（按期望状态比较交换）
    async fn delete(
        &self,
        declaration_id: &str,
        expected_status: DeclarationStatus,
    ) -> RepositoryResult<()>;

    /// 流转审计记录（按时间正序）
    async fn history(&self, declaration_id: &str) -> RepositoryResult<Vec<DeclarationHistoryEntry>>;
}
