// ==========================================
// 停机申报引擎 - 产量指标解析
// ==========================================
// 职责: 有效小时目标、推荐人数、效率计算
// 优先级:
// - 目标: 分配覆写 > 零件默认 > 0
// - 人数: 零件专属需求 > 产线级需求 (part 为空) > 0
// 红线: 从不失败, 缺数据时返回 0; target 为 0 时效率为 0
// ==========================================

use crate::domain::reference::{HeadcountRequirement, Part, PartLineAssignment, ReferenceSnapshot};
use serde::{Deserialize, Serialize};

/// 效率 = round(output / target * 100)；target 为 0 时返回 0
pub fn compute_efficiency(output: u32, target: u32) -> u32 {
    compute_efficiency_u64(u64::from(output), u64::from(target))
}

/// 班次汇总用的宽整数版本
pub fn compute_efficiency_u64(output: u64, target: u64) -> u32 {
    if target == 0 {
        return 0;
    }
    let pct = (output as f64 / target as f64 * 100.0).round();
    if pct >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        pct as u32
    }
}

/// 解析有效小时目标
pub fn resolve_target(
    assignments: &[PartLineAssignment],
    parts: &[Part],
    line_id: &str,
    part_id: &str,
) -> u32 {
    let part_default = parts
        .iter()
        .find(|p| p.part_id == part_id)
        .map(|p| p.default_target)
        .unwrap_or(0);

    assignments
        .iter()
        .find(|a| a.is_active && a.line_id == line_id && a.part_id == part_id)
        .and_then(|a| a.target_override)
        .unwrap_or(part_default)
}

/// 选取生效的人员需求: 零件专属优先, 其次产线级
pub fn select_headcount_requirement<'a>(
    requirements: &'a [HeadcountRequirement],
    line_id: &str,
    part_id: &str,
) -> Option<&'a HeadcountRequirement> {
    let active_on_line = || {
        requirements
            .iter()
            .filter(move |r| r.is_active && r.line_id == line_id)
    };

    active_on_line()
        .find(|r| r.part_id.as_deref() == Some(part_id))
        .or_else(|| active_on_line().find(|r| r.part_id.is_none()))
}

/// 解析推荐人数 (操作工 + 技术员 + 质检员)
pub fn resolve_headcount(requirements: &[HeadcountRequirement], line_id: &str, part_id: &str) -> u32 {
    select_headcount_requirement(requirements, line_id, part_id)
        .map(HeadcountRequirement::total)
        .unwrap_or(0)
}

/// 产线+零件选择对应的指标
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineMetrics {
    pub target: u32,
    pub headcount: u32,
}

impl LineMetrics {
    pub fn efficiency_for(&self, output: u32) -> u32 {
        compute_efficiency(output, self.target)
    }
}

// ==========================================
// MetricsResolver - 基于参考数据快照的解析器
// ==========================================
pub struct MetricsResolver<'a> {
    snapshot: &'a ReferenceSnapshot,
}

impl<'a> MetricsResolver<'a> {
    pub fn new(snapshot: &'a ReferenceSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn resolve_target(&self, line_id: &str, part_id: &str) -> u32 {
        resolve_target(
            &self.snapshot.assignments,
            &self.snapshot.parts,
            line_id,
            part_id,
        )
    }

    pub fn resolve_headcount(&self, line_id: &str, part_id: &str) -> u32 {
        resolve_headcount(&self.snapshot.headcount_requirements, line_id, part_id)
    }

    pub fn resolve(&self, line_id: &str, part_id: &str) -> LineMetrics {
        LineMetrics {
            target: self.resolve_target(line_id, part_id),
            headcount: self.resolve_headcount(line_id, part_id),
        }
    }
}
