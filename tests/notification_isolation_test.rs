// ==========================================
// 维修通知隔离测试
// ==========================================
// 职责: 验证通知失败/超时不影响主操作结果
// ==========================================


mod notification_isolation_test {
    use super::test_helpers::{
        new_declaration, setup_env, setup_env_with_config, FailingChannel, RecordingChannel,
        StalledChannel,
    };
    use downtime_engine::config::config_keys;
    use downtime_engine::domain::types::DeclarationStatus;
    use downtime_engine::engine::events::{NotificationError, NotificationEvent};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_通道异常时申报仍成功() {
        let env = setup_env(Arc::new(FailingChannel));
        let api = &env.ctx.declaration_api;

        let mut payload = new_declaration();
        payload.notify_maintenance = true;

        let outcome = api.create(payload).await.expect("创建不受通知失败影响");
        let declaration_id = outcome.declaration.declaration_id.clone();
        let (declaration, warning) = outcome.settle().await;

        assert_eq!(declaration.status, DeclarationStatus::Declared);
        let warning = warning.expect("应返回通知告警");
        assert_eq!(warning.declaration_id, declaration_id);
        assert_eq!(warning.event, NotificationEvent::Declared);
        assert!(matches!(warning.error, NotificationError::Unreachable(_)));

        // 工单已持久化
        let stored = api.get(&declaration_id).await.unwrap();
        assert_eq!(stored.status, DeclarationStatus::Declared);

        // 告警同时进入上下文的告警队列
        let queued = env.ctx.take_warnings();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].declaration_id, declaration_id);
        assert!(env.ctx.take_warnings().is_empty());
    }

    #[tokio::test]
    async fn test_流转通知失败不回滚() {
        let env = setup_env(Arc::new(FailingChannel));
        let api = &env.ctx.declaration_api;

        let mut payload = new_declaration();
        payload.notify_maintenance = true;
        let id = api.create(payload).await.unwrap().declaration.declaration_id;

        let (declaration, warning) = api
            .start_work(&id, Some("张工"))
            .await
            .unwrap()
            .settle()
            .await;
        assert_eq!(declaration.status, DeclarationStatus::InProgress);
        assert_eq!(warning.map(|w| w.event), Some(NotificationEvent::WorkStarted));
        assert_eq!(api.get(&id).await.unwrap().status, DeclarationStatus::InProgress);
    }

    #[tokio::test(start_paused = true)]
    async fn test_通知超时成为告警() {
        let env = setup_env_with_config(
            Arc::new(StalledChannel {
                delay: Duration::from_secs(3600),
            }),
            &[(config_keys::NOTIFICATION_TIMEOUT_MS, "250")],
        );
        assert_eq!(env.ctx.config.notification_timeout_ms, 250);

        let mut payload = new_declaration();
        payload.notify_maintenance = true;
        let (declaration, warning) = env
            .ctx
            .declaration_api
            .create(payload)
            .await
            .unwrap()
            .settle()
            .await;

        assert_eq!(declaration.status, DeclarationStatus::Declared);
        assert_eq!(
            warning.map(|w| w.error),
            Some(NotificationError::Timeout { timeout_ms: 250 })
        );
    }

    #[tokio::test]
    async fn test_未开启通知不派发() {
        let channel = Arc::new(RecordingChannel::default());
        let env = setup_env(channel.clone());

        let outcome = env
            .ctx
            .declaration_api
            .create(new_declaration())
            .await
            .unwrap();
        assert!(outcome.notification.is_none());
        assert!(!outcome.declaration.notify_maintenance);
        assert!(channel.alerts().is_empty());
    }
}
