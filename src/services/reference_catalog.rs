// ==========================================
// 停机申报引擎 - 参考数据目录
// ==========================================
// 职责: 从参考数据服务整体加载快照, 刷新时整体替换
// 约束: 快照不可变; 刷新失败保留旧快照, 由调用方决定是否重试
// - 引用校验前快照缺少记录时强制重新加载一次, 之后仍缺才算不存在
// ==========================================

use crate::domain::reference::ReferenceSnapshot;
use crate::repository::error::RepositoryResult;
use crate::repository::reference_repo::{
    AssignmentFilter, HeadcountFilter, ReferenceDataRepository, WorkstationFilter,
};
use chrono::Utc;
use std::sync::{Arc, RwLock};
use tracing::instrument;

pub struct ReferenceCatalog {
    source: Arc<dyn ReferenceDataRepository>,
    snapshot: RwLock<Arc<ReferenceSnapshot>>,
}

impl ReferenceCatalog {
    pub fn new(source: Arc<dyn ReferenceDataRepository>) -> Self {
        Self {
            source,
            snapshot: RwLock::new(Arc::new(ReferenceSnapshot::default())),
        }
    }

    /// 当前快照（未加载时为空快照）
    pub fn snapshot(&self) -> Arc<ReferenceSnapshot> {
        match self.snapshot.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.snapshot().loaded_at.is_some()
    }

    /// 从参考数据服务重新加载全部数据
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> RepositoryResult<Arc<ReferenceSnapshot>> {
        let all_workstations = WorkstationFilter::default();
        let all_assignments = AssignmentFilter::default();
        let all_requirements = HeadcountFilter::default();

        let (lines, workstations, machines, problem_types, parts, assignments, headcount_requirements) =
            futures::try_join!(
                self.source.list_lines(),
                self.source.list_workstations(&all_workstations),
                self.source.list_machines(None),
                self.source.list_problem_types(),
                self.source.list_parts(),
                self.source.list_assignments(&all_assignments),
                self.source.list_headcount_requirements(&all_requirements),
            )?;

        let fresh = Arc::new(ReferenceSnapshot {
            lines,
            workstations,
            machines,
            problem_types,
            parts,
            assignments,
            headcount_requirements,
            loaded_at: Some(Utc::now()),
        });

        tracing::info!(
            lines = fresh.lines.len(),
            workstations = fresh.workstations.len(),
            machines = fresh.machines.len(),
            parts = fresh.parts.len(),
            "参考数据已刷新"
        );

        match self.snapshot.write() {
            Ok(mut guard) => *guard = Arc::clone(&fresh),
            Err(poisoned) => *poisoned.into_inner() = Arc::clone(&fresh),
        }
        Ok(fresh)
    }

    /// 未加载过时先加载
    pub async fn ensure_loaded(&self) -> RepositoryResult<Arc<ReferenceSnapshot>> {
        if self.is_loaded() {
            Ok(self.snapshot())
        } else {
            self.refresh().await
        }
    }

    /// 返回包含所需记录的快照
    ///
    /// 已加载的快照不满足 `covers` 时重新加载一次; 返回的快照仍可能不满足,
    /// 由调用方按不存在处理
    pub async fn snapshot_covering<F>(&self, covers: F) -> RepositoryResult<Arc<ReferenceSnapshot>>
    where
        F: Fn(&ReferenceSnapshot) -> bool,
    {
        let was_loaded = self.is_loaded();
        let snapshot = self.ensure_loaded().await?;
        if !was_loaded || covers(&snapshot) {
            return Ok(snapshot);
        }
        tracing::debug!("快照缺少引用记录, 重新加载参考数据");
        self.refresh().await
    }
}
