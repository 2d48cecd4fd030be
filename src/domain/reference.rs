// ==========================================
// 停机申报引擎 - 参考数据领域模型
// ==========================================
// 职责: 产线、工位、设备、问题类型、零件、零件-产线分配、人员需求
// 红线: 本引擎只读, 整体刷新, 不做局部修补
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionLine {
    pub line_id: String,
    pub name: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workstation {
    pub workstation_id: String,
    pub name: String,
    #[serde(default)]
    pub line_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub machine_id: String,
    pub workstation_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemType {
    pub problem_type_id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub part_id: String,
    pub part_number: String,
    pub default_target: u32, // 零件默认小时产量目标
}

// ==========================================
// PartLineAssignment - 零件-产线分配
// ==========================================
// target_override 为空时使用零件默认目标
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartLineAssignment {
    pub assignment_id: String,
    pub part_id: String,
    pub line_id: String,
    #[serde(default)]
    pub target_override: Option<u32>,
    pub is_active: bool,
}

// ==========================================
// HeadcountRequirement - 人员需求
// ==========================================
// part_id 为空表示产线级需求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadcountRequirement {
    pub requirement_id: String,
    pub line_id: String,
    #[serde(default)]
    pub part_id: Option<String>,
    pub operators_required: u32,
    pub technicians_required: u32,
    pub quality_agents_required: u32,
    pub is_active: bool,
}

impl HeadcountRequirement {
    pub fn total(&self) -> u32 {
        self.operators_required
            .saturating_add(self.technicians_required)
            .saturating_add(self.quality_agents_required)
    }
}

// ==========================================
// ReferenceSnapshot - 参考数据快照
// ==========================================
// 一次性整体加载, 刷新时整体替换
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSnapshot {
    pub lines: Vec<ProductionLine>,
    pub workstations: Vec<Workstation>,
    pub machines: Vec<Machine>,
    pub problem_types: Vec<ProblemType>,
    pub parts: Vec<Part>,
    pub assignments: Vec<PartLineAssignment>,
    pub headcount_requirements: Vec<HeadcountRequirement>,
    #[serde(default)]
    pub loaded_at: Option<DateTime<Utc>>,
}

impl ReferenceSnapshot {
    pub fn line(&self, line_id: &str) -> Option<&ProductionLine> {
        self.lines.iter().find(|l| l.line_id == line_id)
    }

    pub fn workstation(&self, workstation_id: &str) -> Option<&Workstation> {
        self.workstations
            .iter()
            .find(|w| w.workstation_id == workstation_id)
    }

    pub fn machine(&self, machine_id: &str) -> Option<&Machine> {
        self.machines.iter().find(|m| m.machine_id == machine_id)
    }

    pub fn problem_type(&self, problem_type_id: &str) -> Option<&ProblemType> {
        self.problem_types
            .iter()
            .find(|p| p.problem_type_id == problem_type_id)
    }

    pub fn part(&self, part_id: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.part_id == part_id)
    }

    /// 工位下的设备
    pub fn machines_of(&self, workstation_id: &str) -> Vec<&Machine> {
        self.machines
            .iter()
            .filter(|m| m.workstation_id == workstation_id)
            .collect()
    }

    /// 级联筛选工位 (产线 / 项目, 均可为空)
    pub fn workstations_filtered(
        &self,
        line_id: Option<&str>,
        project_id: Option<&str>,
    ) -> Vec<&Workstation> {
        self.workstations
            .iter()
            .filter(|w| line_id.map_or(true, |l| w.line_id.as_deref() == Some(l)))
            .filter(|w| project_id.map_or(true, |p| w.project_id.as_deref() == Some(p)))
            .collect()
    }
}
