// ==========================================
// 停机申报引擎 - 小时产量 API
// ==========================================
// 职责:
// - 产线/零件指标查询（目标、推荐人数）
// - 小时产量录入、停机明细挂载
// - 班次报表（每次读取按最新停机明细重算）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::production::{
    DowntimeEntry, DowntimeEntryInput, HourlyOutputInput, HourlyProductionRecord, HourlyView,
    ProductionRecordFilter, ShiftReport,
};
use crate::engine::aggregation::{downtime_breakdown, shift_totals};
use crate::engine::metrics::{LineMetrics, MetricsResolver};
use crate::repository::production_repo::ProductionRecordRepository;
use crate::services::reference_catalog::ReferenceCatalog;
use chrono::Utc;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

pub const DEFAULT_MAX_HOURLY_DOWNTIME_MINUTES: u32 = 60;

pub struct ProductionApi {
    repo: Arc<dyn ProductionRecordRepository>,
    catalog: Arc<ReferenceCatalog>,
    max_hourly_downtime_minutes: u32,
}

impl ProductionApi {
    pub fn new(
        repo: Arc<dyn ProductionRecordRepository>,
        catalog: Arc<ReferenceCatalog>,
        max_hourly_downtime_minutes: u32,
    ) -> Self {
        Self {
            repo,
            catalog,
            max_hourly_downtime_minutes,
        }
    }

    /// 产线 + 零件的目标与推荐人数（缺数据时为 0, 不报错）
    pub async fn line_metrics(&self, line_id: &str, part_id: &str) -> ApiResult<LineMetrics> {
        let snapshot = self
            .catalog
            .snapshot_covering(|s| s.line(line_id).is_some() && s.part(part_id).is_some())
            .await?;
        Ok(MetricsResolver::new(&snapshot).resolve(line_id, part_id))
    }

    /// 录入小时产量（同一 日期×班次×小时×产线×零件 覆盖更新）
    #[instrument(skip(self, input), fields(line_id = %input.line_id, part_id = %input.part_id, hour = input.hour))]
    pub async fn record_output(&self, input: HourlyOutputInput) -> ApiResult<HourlyProductionRecord> {
        if !input.shift.contains_hour(input.hour) {
            return Err(ApiError::FieldValueError {
                field: "hour".to_string(),
                message: format!("小时 {} 不属于班次 {}", input.hour, input.shift),
            });
        }

        let snapshot = self
            .catalog
            .snapshot_covering(|s| {
                s.line(&input.line_id).is_some() && s.part(&input.part_id).is_some()
            })
            .await?;
        if snapshot.line(&input.line_id).is_none() {
            return Err(ApiError::reference(
                "line_id",
                format!("产线 {} 不存在", input.line_id),
            ));
        }
        if snapshot.part(&input.part_id).is_none() {
            return Err(ApiError::reference(
                "part_id",
                format!("零件 {} 不存在", input.part_id),
            ));
        }

        let resolver = MetricsResolver::new(&snapshot);
        let target = input
            .target
            .unwrap_or_else(|| resolver.resolve_target(&input.line_id, &input.part_id));
        let headcount = input
            .headcount
            .unwrap_or_else(|| resolver.resolve_headcount(&input.line_id, &input.part_id));

        let record = HourlyProductionRecord {
            record_id: Uuid::new_v4().to_string(),
            production_date: input.production_date,
            shift: input.shift,
            hour: input.hour,
            line_id: input.line_id,
            part_id: input.part_id,
            output: input.output,
            target,
            headcount,
            downtimes: Vec::new(),
            updated_at: Utc::now(),
        };

        let mut saved = self.repo.save(&record).await?;
        saved.downtimes = self.repo.list_downtimes(&saved.record_id).await?;
        tracing::info!(
            record_id = %saved.record_id,
            output = saved.output,
            target = saved.target,
            efficiency = saved.efficiency(),
            "小时产量已保存"
        );
        Ok(saved)
    }

    /// 挂载停机明细
    #[instrument(skip(self, input), fields(duration = input.duration_minutes))]
    pub async fn attach_downtime(
        &self,
        hourly_record_id: &str,
        input: DowntimeEntryInput,
    ) -> ApiResult<DowntimeEntry> {
        if input.duration_minutes == 0 || input.duration_minutes > self.max_hourly_downtime_minutes {
            return Err(ApiError::FieldValueError {
                field: "duration_minutes".to_string(),
                message: format!(
                    "停机时长必须在 1..={} 分钟之间, 实际={}",
                    self.max_hourly_downtime_minutes, input.duration_minutes
                ),
            });
        }

        if self.repo.get(hourly_record_id).await?.is_none() {
            return Err(ApiError::not_found("HourlyProductionRecord", hourly_record_id));
        }

        let problem_type_id = input
            .problem_type_id
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        if let Some(problem_type_id) = &problem_type_id {
            let snapshot = self
                .catalog
                .snapshot_covering(|s| s.problem_type(problem_type_id).is_some())
                .await?;
            if snapshot.problem_type(problem_type_id).is_none() {
                return Err(ApiError::reference(
                    "problem_type_id",
                    format!("问题类型 {} 不存在", problem_type_id),
                ));
            }
        }

        let entry = DowntimeEntry {
            entry_id: Uuid::new_v4().to_string(),
            hourly_record_id: hourly_record_id.to_string(),
            duration_minutes: input.duration_minutes,
            problem_type_id,
            declaration_id: input.declaration_id,
            note: input.note,
            recorded_at: Utc::now(),
        };
        Ok(self.repo.save_downtime(&entry).await?)
    }

    /// 班次报表
    #[instrument(skip(self), fields(date = %filter.production_date, shift = %filter.shift, line_id = %filter.line_id))]
    pub async fn shift_report(&self, filter: &ProductionRecordFilter) -> ApiResult<ShiftReport> {
        let mut records = self.repo.list(filter).await?;

        let downtimes = try_join_all(
            records
                .iter()
                .map(|record| self.repo.list_downtimes(&record.record_id)),
        )
        .await?;
        for (record, entries) in records.iter_mut().zip(downtimes) {
            record.downtimes = entries;
        }

        let totals = shift_totals(&records);
        tracing::debug!(
            records = records.len(),
            total_output = totals.total_output,
            efficiency = totals.shift_efficiency,
            "班次报表已汇总"
        );

        Ok(ShiftReport {
            production_date: filter.production_date,
            shift: filter.shift,
            line_id: filter.line_id.clone(),
            hours: records.iter().map(HourlyView::from).collect(),
            totals,
            downtime_breakdown: downtime_breakdown(&records),
        })
    }
}
