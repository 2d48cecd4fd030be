// ==========================================
// 停机申报引擎 - 小时产量领域模型
// ==========================================
// 职责: 小时产量记录、停机明细、班次汇总
// 红线: 停机分钟数每次读取时由明细重算, 不缓存在记录上
// ==========================================

use crate::domain::types::Shift;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// DowntimeEntry - 停机明细
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DowntimeEntry {
    pub entry_id: String,
    pub hourly_record_id: String,
    pub duration_minutes: u32,
    #[serde(default)]
    pub problem_type_id: Option<String>,
    #[serde(default)]
    pub declaration_id: Option<String>, // 关联停机工单 (可选)
    #[serde(default)]
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

// ==========================================
// HourlyProductionRecord - 小时产量记录
// ==========================================
// 唯一键: (date, shift, hour, line_id, part_id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyProductionRecord {
    pub record_id: String,
    pub production_date: NaiveDate,
    pub shift: Shift,
    pub hour: u32,
    pub line_id: String,
    pub part_id: String,
    pub output: u32,
    pub target: u32,
    pub headcount: u32,
    #[serde(default)]
    pub downtimes: Vec<DowntimeEntry>, // 读取时挂载, 不持久化在记录上
    pub updated_at: DateTime<Utc>,
}

impl HourlyProductionRecord {
    /// 效率 = round(output / target * 100), target 为 0 时为 0
    pub fn efficiency(&self) -> u32 {
        crate::engine::metrics::compute_efficiency(self.output, self.target)
    }

    /// 当前挂载停机明细的总分钟数
    pub fn downtime_minutes(&self) -> u32 {
        self.downtimes
            .iter()
            .fold(0u32, |acc, d| acc.saturating_add(d.duration_minutes))
    }
}

// ==========================================
// HourlyOutputInput - 产量录入载荷
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyOutputInput {
    pub production_date: NaiveDate,
    pub shift: Shift,
    pub hour: u32,
    pub line_id: String,
    pub part_id: String,
    pub output: u32,
    #[serde(default)]
    pub target: Option<u32>, // 为空时按指标解析
    #[serde(default)]
    pub headcount: Option<u32>, // 为空时按人员需求解析
}

// ==========================================
// DowntimeEntryInput - 停机明细录入载荷
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DowntimeEntryInput {
    pub duration_minutes: u32,
    #[serde(default)]
    pub problem_type_id: Option<String>,
    #[serde(default)]
    pub declaration_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

// ==========================================
// ProductionRecordFilter - 产量记录筛选
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionRecordFilter {
    pub production_date: NaiveDate,
    pub shift: Shift,
    pub line_id: String,
}

// ==========================================
// ShiftTotals - 班次汇总
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftTotals {
    pub total_output: u64,
    pub total_target: u64,
    pub shift_efficiency: u32,
    pub total_downtime_minutes: u64,
}

/// 按问题类型的停机分钟数 (None 表示未分类)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DowntimeBreakdown {
    pub problem_type_id: Option<String>,
    pub total_minutes: u64,
    pub entry_count: usize,
}

/// 班次报表中的单小时视图
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyView {
    pub record_id: String,
    pub hour: u32,
    pub part_id: String,
    pub output: u32,
    pub target: u32,
    pub headcount: u32,
    pub efficiency: u32,
    pub downtime_minutes: u32,
}

impl From<&HourlyProductionRecord> for HourlyView {
    fn from(record: &HourlyProductionRecord) -> Self {
        Self {
            record_id: record.record_id.clone(),
            hour: record.hour,
            part_id: record.part_id.clone(),
            output: record.output,
            target: record.target,
            headcount: record.headcount,
            efficiency: record.efficiency(),
            downtime_minutes: record.downtime_minutes(),
        }
    }
}

/// 班次报表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftReport {
    pub production_date: NaiveDate,
    pub shift: Shift,
    pub line_id: String,
    pub hours: Vec<HourlyView>,
    pub totals: ShiftTotals,
    pub downtime_breakdown: Vec<DowntimeBreakdown>,
}
