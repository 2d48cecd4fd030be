// ==========================================
// 停机申报引擎 - 班次汇总
// ==========================================
// 职责: 将小时产量记录汇总为班次合计
// 约束: 纯读侧折叠, 每次读取按当前停机明细重算; 空集合返回全 0
// ==========================================

use crate::domain::production::{DowntimeBreakdown, HourlyProductionRecord, ShiftTotals};
use crate::engine::metrics::compute_efficiency_u64;
use std::collections::HashMap;

/// 班次合计
pub fn shift_totals(records: &[HourlyProductionRecord]) -> ShiftTotals {
    let total_output: u64 = records.iter().map(|r| u64::from(r.output)).sum();
    let total_target: u64 = records.iter().map(|r| u64::from(r.target)).sum();
    let total_downtime_minutes: u64 = records
        .iter()
        .map(|r| u64::from(r.downtime_minutes()))
        .sum();

    ShiftTotals {
        total_output,
        total_target,
        shift_efficiency: compute_efficiency_u64(total_output, total_target),
        total_downtime_minutes,
    }
}

/// 按问题类型统计停机分钟数（分钟数降序, 同分按问题类型升序, 未分类排最后）
pub fn downtime_breakdown(records: &[HourlyProductionRecord]) -> Vec<DowntimeBreakdown> {
    let mut buckets: HashMap<Option<String>, (u64, usize)> = HashMap::new();
    for entry in records.iter().flat_map(|r| r.downtimes.iter()) {
        let bucket = buckets.entry(entry.problem_type_id.clone()).or_insert((0, 0));
        bucket.0 += u64::from(entry.duration_minutes);
        bucket.1 += 1;
    }

    let mut rows: Vec<DowntimeBreakdown> = buckets
        .into_iter()
        .map(|(problem_type_id, (total_minutes, entry_count))| DowntimeBreakdown {
            problem_type_id,
            total_minutes,
            entry_count,
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_minutes
            .cmp(&a.total_minutes)
            .then_with(|| match (&a.problem_type_id, &b.problem_type_id) {
                (Some(x), Some(y)) => x.cmp(y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            })
    });
    rows
}
