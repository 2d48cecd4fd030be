// ==========================================
// 停机申报引擎 - 停机申报 API
// ==========================================
// 职责: 申报创建、工单流转、删除、问题类型补全
// 流程: 规则校验 → 分类 → 参考数据校验 → 持久化 → 异步通知
// 红线:
// - 任何校验失败都发生在修改与外部调用之前
// - 通知在持久化成功之后派发, 失败不影响返回结果
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::declaration::{
    DeclarationFilter, DeclarationHistoryEntry, DowntimeDeclaration, NewDeclaration,
    TransitionAvailability,
};
use crate::domain::types::TransitionAction;
use crate::engine::classifier::classify_new_declaration;
use crate::engine::error::RuleViolation;
use crate::engine::events::NotificationEvent;
use crate::engine::state_machine::{DeclarationStateMachine, TransitionCommand};
use crate::repository::declaration_repo::DeclarationRepository;
use crate::services::notification::{DispatchTicket, DispatchWarning, NotificationDispatcher};
use crate::services::reference_catalog::ReferenceCatalog;
use crate::services::refresh_controller::RefreshSource;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;

// ==========================================
// DeclarationOutcome - 主操作结果 + 通知句柄
// ==========================================
#[derive(Debug)]
pub struct DeclarationOutcome {
    /// 已提交的工单
    pub declaration: DowntimeDeclaration,
    /// 通知句柄（未开启通知或取消时为 None）
    pub notification: Option<DispatchTicket>,
}

impl DeclarationOutcome {
    /// 等待通知结束, 返回工单与可能的通知告警
    pub async fn settle(self) -> (DowntimeDeclaration, Option<DispatchWarning>) {
        let warning = match self.notification {
            Some(ticket) => ticket.wait().await,
            None => None,
        };
        (self.declaration, warning)
    }
}

/// 流转动作对应的通知事件（取消不通知）
fn notification_event(action: TransitionAction) -> Option<NotificationEvent> {
    match action {
        TransitionAction::Acknowledge => Some(NotificationEvent::Acknowledged),
        TransitionAction::StartWork => Some(NotificationEvent::WorkStarted),
        TransitionAction::Resolve => Some(NotificationEvent::Resolved),
        TransitionAction::Cancel => None,
    }
}

// ==========================================
// DeclarationApi
// ==========================================
pub struct DeclarationApi {
    repo: Arc<dyn DeclarationRepository>,
    catalog: Arc<ReferenceCatalog>,
    dispatcher: Arc<NotificationDispatcher>,
    state_machine: DeclarationStateMachine,
}

impl DeclarationApi {
    pub fn new(
        repo: Arc<dyn DeclarationRepository>,
        catalog: Arc<ReferenceCatalog>,
        dispatcher: Arc<NotificationDispatcher>,
        state_machine: DeclarationStateMachine,
    ) -> Self {
        Self {
            repo,
            catalog,
            dispatcher,
            state_machine,
        }
    }

    // ==========================================
    // 创建
    // ==========================================

    /// 创建停机申报
    ///
    /// # 返回
    /// - Ok(outcome): 工单已持久化为 declared; 通知在后台发送
    /// - Err(MissingRequiredField / FieldValueError / ReferenceIntegrityViolation): 未写入
    #[instrument(skip(self, payload), fields(workstation_id = %payload.workstation_id))]
    pub async fn create(&self, payload: NewDeclaration) -> ApiResult<DeclarationOutcome> {
        let mut normalized = self.state_machine.validate_create(&payload)?;
        let classification = classify_new_declaration(&mut normalized);

        // 通知目标为产线
        if normalized.notify_maintenance && normalized.production_line_id.is_none() {
            return Err(RuleViolation::MissingRequiredField {
                field: "production_line_id",
            }
            .into());
        }

        self.check_references(&normalized).await?;

        let declaration = self.repo.create(&normalized).await?;
        tracing::info!(
            declaration_id = %declaration.declaration_id,
            ticket_number = %declaration.ticket_number,
            impact = %classification.impact_level,
            declaration_type = %classification.declaration_type,
            notify = classification.notify_maintenance,
            "停机申报已创建"
        );

        let notification = self
            .dispatcher
            .dispatch(NotificationEvent::Declared, &declaration);
        Ok(DeclarationOutcome {
            declaration,
            notification,
        })
    }

    /// 参考数据完整性校验
    async fn check_references(&self, payload: &NewDeclaration) -> ApiResult<()> {
        let snapshot = self
            .catalog
            .snapshot_covering(|s| {
                s.workstation(&payload.workstation_id).is_some()
                    && payload.machine_id.as_deref().map_or(true, |id| s.machine(id).is_some())
                    && payload
                        .production_line_id
                        .as_deref()
                        .map_or(true, |id| s.line(id).is_some())
                    && payload
                        .problem_type_id
                        .as_deref()
                        .map_or(true, |id| s.problem_type(id).is_some())
            })
            .await?;

        let workstation = snapshot.workstation(&payload.workstation_id).ok_or_else(|| {
            ApiError::reference(
                "workstation_id",
                format!("工位 {} 不存在", payload.workstation_id),
            )
        })?;

        if let Some(machine_id) = &payload.machine_id {
            match snapshot.machine(machine_id) {
                None => {
                    return Err(ApiError::reference(
                        "machine_id",
                        format!("设备 {} 不存在", machine_id),
                    ))
                }
                Some(machine) if machine.workstation_id != workstation.workstation_id => {
                    return Err(ApiError::reference(
                        "machine_id",
                        format!(
                            "设备 {} 属于工位 {}, 不属于工位 {}",
                            machine_id, machine.workstation_id, workstation.workstation_id
                        ),
                    ))
                }
                Some(_) => {}
            }
        }

        if let Some(line_id) = &payload.production_line_id {
            if snapshot.line(line_id).is_none() {
                return Err(ApiError::reference(
                    "production_line_id",
                    format!("产线 {} 不存在", line_id),
                ));
            }
            if let Some(ws_line) = &workstation.line_id {
                if ws_line != line_id {
                    return Err(ApiError::reference(
                        "production_line_id",
                        format!(
                            "工位 {} 属于产线 {}, 与申报产线 {} 不一致",
                            workstation.workstation_id, ws_line, line_id
                        ),
                    ));
                }
            }
        }

        if let Some(problem_type_id) = &payload.problem_type_id {
            if snapshot.problem_type(problem_type_id).is_none() {
                return Err(ApiError::reference(
                    "problem_type_id",
                    format!("问题类型 {} 不存在", problem_type_id),
                ));
            }
        }

        Ok(())
    }

    // ==========================================
    // 流转
    // ==========================================

    pub async fn acknowledge(
        &self,
        declaration_id: &str,
        technician: Option<&str>,
    ) -> ApiResult<DeclarationOutcome> {
        self.apply(
            declaration_id,
            TransitionCommand::Acknowledge {
                technician: technician.map(str::to_string),
            },
        )
        .await
    }

    /// 开始维修（未传技术员时沿用确认时分配的技术员）
    pub async fn start_work(
        &self,
        declaration_id: &str,
        technician: Option<&str>,
    ) -> ApiResult<DeclarationOutcome> {
        self.apply(
            declaration_id,
            TransitionCommand::StartWork {
                technician: technician.map(str::to_string),
            },
        )
        .await
    }

    pub async fn resolve(
        &self,
        declaration_id: &str,
        notes: Option<&str>,
    ) -> ApiResult<DeclarationOutcome> {
        self.apply(
            declaration_id,
            TransitionCommand::Resolve {
                notes: notes.map(str::to_string),
            },
        )
        .await
    }

    pub async fn cancel(
        &self,
        declaration_id: &str,
        reason: Option<&str>,
    ) -> ApiResult<DeclarationOutcome> {
        self.apply(
            declaration_id,
            TransitionCommand::Cancel {
                reason: reason.map(str::to_string),
            },
        )
        .await
    }

    /// 执行流转命令
    ///
    /// 守卫检查基于读取到的状态, 持久化层按该状态做比较交换;
    /// 期间被他人修改时返回 ConcurrentModification
    #[instrument(skip(self, command), fields(action = %command.action()))]
    pub async fn apply(
        &self,
        declaration_id: &str,
        command: TransitionCommand,
    ) -> ApiResult<DeclarationOutcome> {
        let current = self.load(declaration_id).await?;
        let record = self.state_machine.plan(&current, &command, Utc::now())?;

        let declaration = self.repo.transition(declaration_id, &record).await?;
        tracing::info!(
            declaration_id,
            from = %record.from_status,
            to = %record.to_status,
            "工单流转已提交"
        );

        let notification = notification_event(record.action)
            .and_then(|event| self.dispatcher.dispatch(event, &declaration));
        Ok(DeclarationOutcome {
            declaration,
            notification,
        })
    }

    // ==========================================
    // 删除 / 补全
    // ==========================================

    /// 物理删除（仅 declared / cancelled）
    #[instrument(skip(self))]
    pub async fn delete(&self, declaration_id: &str) -> ApiResult<()> {
        let current = self.load(declaration_id).await?;
        self.state_machine.check_delete(&current)?;
        self.repo.delete(declaration_id, current.status).await?;
        tracing::info!(declaration_id, status = %current.status, "工单已删除");
        Ok(())
    }

    /// 补全问题类型（状态不变）
    #[instrument(skip(self))]
    pub async fn assign_problem_type(
        &self,
        declaration_id: &str,
        problem_type_id: &str,
    ) -> ApiResult<DowntimeDeclaration> {
        let problem_type_id = problem_type_id.trim();
        if problem_type_id.is_empty() {
            return Err(ApiError::MissingRequiredField {
                field: "problem_type_id".to_string(),
            });
        }

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

        let current = self.load(declaration_id).await?;
        self.state_machine.check_problem_type_completion(&current)?;
        let updated = self
            .repo
            .assign_problem_type(declaration_id, problem_type_id, current.status)
            .await?;
        Ok(updated)
    }

    // ==========================================
    // 查询
    // ==========================================

    pub async fn get(&self, declaration_id: &str) -> ApiResult<DowntimeDeclaration> {
        self.load(declaration_id).await
    }

    pub async fn list(&self, filter: &DeclarationFilter) -> ApiResult<Vec<DowntimeDeclaration>> {
        Ok(self.repo.list(filter).await?)
    }

    /// 当前状态下的全部流转可用性
    pub async fn availability(&self, declaration_id: &str) -> ApiResult<TransitionAvailability> {
        Ok(self.load(declaration_id).await?.availability())
    }

    pub async fn history(&self, declaration_id: &str) -> ApiResult<Vec<DeclarationHistoryEntry>> {
        self.load(declaration_id).await?;
        Ok(self.repo.history(declaration_id).await?)
    }

    async fn load(&self, declaration_id: &str) -> ApiResult<DowntimeDeclaration> {
        self.repo
            .get(declaration_id)
            .await?
            .ok_or_else(|| ApiError::not_found("DowntimeDeclaration", declaration_id))
    }
}

// ==========================================
// DeclarationListSource - 轮询数据源
// ==========================================
pub struct DeclarationListSource {
    api: Arc<DeclarationApi>,
    filter: DeclarationFilter,
}

impl DeclarationListSource {
    pub fn new(api: Arc<DeclarationApi>, filter: DeclarationFilter) -> Self {
        Self { api, filter }
    }
}

#[async_trait]
impl RefreshSource for DeclarationListSource {
    async fn fetch(&self) -> anyhow::Result<Vec<DowntimeDeclaration>> {
        Ok(self.api.list(&self.filter).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_has_no_notification_event() {
        assert_eq!(notification_event(TransitionAction::Cancel), None);
        assert_eq!(
            notification_event(TransitionAction::StartWork),
            Some(NotificationEvent::WorkStarted)
        );
        assert_eq!(
            notification_event(TransitionAction::Resolve),
            Some(NotificationEvent::Resolved)
        );
    }
}
