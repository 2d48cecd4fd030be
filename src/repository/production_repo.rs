// ==========================================
// 停机申报引擎 - 小时产量 Repository Trait
// ==========================================
// 职责: 小时产量记录与停机明细的读写接口
// 约束: 记录本身不存停机合计, 停机明细单独读取
// ==========================================

use crate::domain::production::{DowntimeEntry, HourlyProductionRecord, ProductionRecordFilter};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

#[async_trait]
pub trait ProductionRecordRepository: Send + Sync {
    /// 查询班次记录（按小时顺序；downtimes 为空）
    async fn list(&self, filter: &ProductionRecordFilter) -> RepositoryResult<Vec<HourlyProductionRecord>>;

    async fn get(&self, record_id: &str) -> RepositoryResult<Option<HourlyProductionRecord>>;

    /// 按 (date, shift, hour, line, part) 保存；已存在则更新并沿用原 record_id
    async fn save(&self, record: &HourlyProductionRecord) -> RepositoryResult<HourlyProductionRecord>;

    async fn list_downtimes(&self, hourly_record_id: &str) -> RepositoryResult<Vec<DowntimeEntry>>;

    /// 按 entry_id 保存（新增或编辑）
    async fn save_downtime(&self, entry: &DowntimeEntry) -> RepositoryResult<DowntimeEntry>;
}
