// ==========================================
// 停机申报引擎 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod declaration;
pub mod production;
pub mod reference;
pub mod types;

// 重导出核心类型
pub use declaration::{
    DeclarationFilter, DeclarationHistoryEntry, DowntimeDeclaration, NewDeclaration,
    TransitionAvailability, TransitionRecord,
};
pub use production::{
    DowntimeBreakdown, DowntimeEntry, DowntimeEntryInput, HourlyOutputInput,
    HourlyProductionRecord, HourlyView, ProductionRecordFilter, ShiftReport, ShiftTotals,
};
pub use reference::{
    HeadcountRequirement, Machine, Part, PartLineAssignment, ProblemType, ProductionLine,
    ReferenceSnapshot, Workstation,
};
pub use types::{DeclarationStatus, DeclarationType, ImpactLevel, Shift, TransitionAction};
