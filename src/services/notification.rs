// ==========================================
// 停机申报引擎 - 维修通知分发
// ==========================================
// 职责: 在工单持久化成功后异步发送维修告警
// 红线: 通知失败只产生告警, 不回滚工单, 不阻塞主流程
// ==========================================

use crate::domain::declaration::DowntimeDeclaration;
use crate::engine::events::{MaintenanceAlert, NotificationChannel, NotificationError, NotificationEvent};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const DEFAULT_NOTIFICATION_TIMEOUT_MS: u64 = 5000;

/// 通知失败告警（与主操作结果分开上报）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchWarning {
    pub declaration_id: String,
    pub event: NotificationEvent,
    #[serde(serialize_with = "serialize_error")]
    pub error: NotificationError,
}

fn serialize_error<S: serde::Serializer>(error: &NotificationError, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&error.to_string())
}

/// 已派发通知的句柄
///
/// 丢弃句柄不会取消发送
#[derive(Debug)]
pub struct DispatchTicket {
    declaration_id: String,
    event: NotificationEvent,
    handle: JoinHandle<Result<(), NotificationError>>,
}

impl DispatchTicket {
    pub fn declaration_id(&self) -> &str {
        &self.declaration_id
    }

    pub fn event(&self) -> NotificationEvent {
        self.event
    }

    /// 等待发送结束; 失败时返回告警
    pub async fn wait(self) -> Option<DispatchWarning> {
        let result = match self.handle.await {
            Ok(result) => result,
            Err(join_err) => Err(NotificationError::TaskAborted(join_err.to_string())),
        };
        result.err().map(|error| DispatchWarning {
            declaration_id: self.declaration_id,
            event: self.event,
            error,
        })
    }
}

pub struct NotificationDispatcher {
    channel: Arc<dyn NotificationChannel>,
    timeout: Duration,
    warning_sink: Option<mpsc::UnboundedSender<DispatchWarning>>,
}

impl NotificationDispatcher {
    pub fn new(channel: Arc<dyn NotificationChannel>, timeout: Duration) -> Self {
        Self {
            channel,
            timeout,
            warning_sink: None,
        }
    }

    /// 附加告警接收端（例如界面提示队列）
    pub fn with_warning_sink(mut self, sink: mpsc::UnboundedSender<DispatchWarning>) -> Self {
        self.warning_sink = Some(sink);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 派发通知
    ///
    /// # 返回
    /// - None: 工单未开启维修通知
    /// - Some(ticket): 已在后台任务中发送
    pub fn dispatch(
        &self,
        event: NotificationEvent,
        declaration: &DowntimeDeclaration,
    ) -> Option<DispatchTicket> {
        if !declaration.notify_maintenance {
            tracing::debug!(
                declaration_id = %declaration.declaration_id,
                event = event.as_str(),
                "未开启维修通知, 跳过"
            );
            return None;
        }

        let alert = MaintenanceAlert::from_declaration(event, declaration);
        let declaration_id = declaration.declaration_id.clone();
        let channel = Arc::clone(&self.channel);
        let timeout = self.timeout;
        let sink = self.warning_sink.clone();
        let task_declaration_id = declaration_id.clone();

        let handle = tokio::spawn(async move {
            let result = match alert {
                Some(alert) => match tokio::time::timeout(timeout, channel.send(&alert)).await {
                    Ok(sent) => sent,
                    Err(_) => Err(NotificationError::Timeout {
                        timeout_ms: timeout.as_millis() as u64,
                    }),
                },
                None => Err(NotificationError::MissingTarget {
                    declaration_id: task_declaration_id.clone(),
                }),
            };

            match &result {
                Ok(()) => tracing::debug!(
                    declaration_id = %task_declaration_id,
                    event = event.as_str(),
                    "维修通知已发送"
                ),
                Err(e) => {
                    tracing::warn!(
                        declaration_id = %task_declaration_id,
                        event = event.as_str(),
                        error = %e,
                        "维修通知发送失败"
                    );
                    if let Some(sink) = sink {
                        let _ = sink.send(DispatchWarning {
                            declaration_id: task_declaration_id.clone(),
                            event,
                            error: e.clone(),
                        });
                    }
                }
            }
            result
        });

        Some(DispatchTicket {
            declaration_id,
            event,
            handle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{DeclarationStatus, DeclarationType, ImpactLevel};
    use async_trait::async_trait;
    use chrono::Utc;

    struct RejectingChannel;

    #[async_trait]
    impl NotificationChannel for RejectingChannel {
        async fn send(&self, _alert: &MaintenanceAlert) -> Result<(), NotificationError> {
            Err(NotificationError::Rejected("维修系统离线".to_string()))
        }
    }

    struct StalledChannel;

    #[async_trait]
    impl NotificationChannel for StalledChannel {
        async fn send(&self, _alert: &MaintenanceAlert) -> Result<(), NotificationError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    fn declaration(notify: bool, line: Option<&str>) -> DowntimeDeclaration {
        DowntimeDeclaration {
            declaration_id: "D-1".to_string(),
            ticket_number: "DT-20260301-0001".to_string(),
            impact_level: ImpactLevel::High,
            declaration_type: DeclarationType::Unplanned,
            workstation_id: "WS-1".to_string(),
            machine_id: None,
            production_line_id: line.map(str::to_string),
            zone_id: None,
            reason: "主轴卡死".to_string(),
            description: None,
            problem_type_id: None,
            duration_minutes: 30,
            estimated_resolution_at: None,
            status: DeclarationStatus::Declared,
            assigned_technician: None,
            resolution_notes: None,
            cancel_reason: None,
            declared_at: Utc::now(),
            acknowledged_at: None,
            started_at: None,
            resolved_at: None,
            cancelled_at: None,
            notify_maintenance: notify,
            declared_by: None,
        }
    }

    #[tokio::test]
    async fn test_dispatch_skipped_when_notify_disabled() {
        let dispatcher = NotificationDispatcher::new(Arc::new(RejectingChannel), Duration::from_secs(1));
        assert!(dispatcher
            .dispatch(NotificationEvent::Declared, &declaration(false, Some("L1")))
            .is_none());
    }

    #[tokio::test]
    async fn test_dispatch_failure_becomes_warning() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = NotificationDispatcher::new(Arc::new(RejectingChannel), Duration::from_secs(1))
            .with_warning_sink(tx);

        let ticket = dispatcher
            .dispatch(NotificationEvent::Declared, &declaration(true, Some("L1")))
            .expect("notify enabled");
        let warning = ticket.wait().await.expect("warning expected");
        assert_eq!(warning.declaration_id, "D-1");
        assert!(matches!(warning.error, NotificationError::Rejected(_)));

        let queued = rx.recv().await.expect("sink receives warning");
        assert_eq!(queued.event, NotificationEvent::Declared);
    }

    #[tokio::test]
    async fn test_dispatch_without_line_reports_missing_target() {
        let dispatcher = NotificationDispatcher::new(Arc::new(RejectingChannel), Duration::from_secs(1));
        let warning = dispatcher
            .dispatch(NotificationEvent::Resolved, &declaration(true, None))
            .expect("notify enabled")
            .wait()
            .await
            .expect("warning expected");
        assert!(matches!(warning.error, NotificationError::MissingTarget { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_times_out() {
        let dispatcher = NotificationDispatcher::new(Arc::new(StalledChannel), Duration::from_millis(200));
        let warning = dispatcher
            .dispatch(NotificationEvent::WorkStarted, &declaration(true, Some("L2")))
            .expect("notify enabled")
            .wait()
            .await
            .expect("warning expected");
        assert_eq!(warning.error, NotificationError::Timeout { timeout_ms: 200 });
    }
}
