// ==========================================
// 停机申报引擎 - 申报分类器
// ==========================================
// 规则（顺序执行，命中即返回）:
// 1) 类型 = 紧急 → 影响强制为严重, 通知强制开启
// 2) 影响 ∈ {高, 严重} → 通知强制开启, 影响不变
// 3) 其他 → 通知保持当前值
// 约束: 幂等, classify(classify(x)) == classify(x)
// ==========================================

use crate::domain::declaration::NewDeclaration;
use crate::domain::types::{DeclarationType, ImpactLevel};
use serde::{Deserialize, Serialize};

/// 分类结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub impact_level: ImpactLevel,
    pub declaration_type: DeclarationType,
    pub notify_maintenance: bool,
}

impl Classification {
    pub fn new(
        impact_level: ImpactLevel,
        declaration_type: DeclarationType,
        notify_maintenance: bool,
    ) -> Self {
        Self {
            impact_level,
            declaration_type,
            notify_maintenance,
        }
    }

    /// 操作员调整影响等级后重新分类
    pub fn with_impact(self, impact_level: ImpactLevel) -> Self {
        classify(impact_level, self.declaration_type, self.notify_maintenance)
    }

    /// 操作员调整申报类型后重新分类
    pub fn with_type(self, declaration_type: DeclarationType) -> Self {
        classify(self.impact_level, declaration_type, self.notify_maintenance)
    }

    /// 操作员手动切换通知开关；被规则强制的情况下无效
    pub fn with_notify(self, notify_maintenance: bool) -> Self {
        classify(self.impact_level, self.declaration_type, notify_maintenance)
    }

    /// 通知是否由规则强制（界面据此禁用开关）
    pub fn notify_locked(&self) -> bool {
        self.declaration_type == DeclarationType::Emergency
            || self.impact_level.requires_maintenance()
    }
}

/// 分类函数
pub fn classify(
    impact_level: ImpactLevel,
    declaration_type: DeclarationType,
    current_notify: bool,
) -> Classification {
    if declaration_type == DeclarationType::Emergency {
        return Classification::new(ImpactLevel::Critical, declaration_type, true);
    }

    if impact_level.requires_maintenance() {
        return Classification::new(impact_level, declaration_type, true);
    }

    Classification::new(impact_level, declaration_type, current_notify)
}

/// 对创建载荷应用分类规则
pub fn classify_new_declaration(payload: &mut NewDeclaration) -> Classification {
    let result = classify(
        payload.impact_level,
        payload.declaration_type,
        payload.notify_maintenance,
    );
    payload.impact_level = result.impact_level;
    payload.notify_maintenance = result.notify_maintenance;
    result
}
