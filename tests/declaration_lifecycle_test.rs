// ==========================================
// 停机申报生命周期集成测试
// ==========================================
// 职责: 验证创建分类、流转守卫、删除规则、问题类型补全
// ==========================================


mod declaration_lifecycle_test {
    use super::test_helpers::{new_declaration, setup_env, RecordingChannel};
    use downtime_engine::api::ApiError;
    use downtime_engine::domain::declaration::DeclarationFilter;
    use downtime_engine::domain::reference::{ProblemType, Workstation};
    use downtime_engine::domain::types::{
        DeclarationStatus, DeclarationType, ImpactLevel, TransitionAction,
    };
    use downtime_engine::engine::events::{AlertPriority, NotificationEvent};
    use std::sync::Arc;

    fn recording_env() -> (super::test_helpers::TestEnv, Arc<RecordingChannel>) {
        let channel = Arc::new(RecordingChannel::default());
        (setup_env(channel.clone()), channel)
    }

    // ==========================================
    // 创建
    // ==========================================

    #[tokio::test]
    async fn test_create_紧急停机强制严重并通知() {
        let (env, channel) = recording_env();
        let api = &env.ctx.declaration_api;

        let mut payload = new_declaration();
        payload.declaration_type = DeclarationType::Emergency;
        payload.impact_level = ImpactLevel::Low;
        payload.notify_maintenance = false;

        let outcome = api.create(payload).await.unwrap();
        assert!(outcome.notification.is_some());
        let (declaration, warning) = outcome.settle().await;

        assert_eq!(declaration.impact_level, ImpactLevel::Critical);
        assert!(declaration.notify_maintenance);
        assert_eq!(declaration.status, DeclarationStatus::Declared);
        assert!(warning.is_none());

        let stored = api.get(&declaration.declaration_id).await.unwrap();
        assert_eq!(stored.impact_level, ImpactLevel::Critical);
        assert!(stored.notify_maintenance);

        let alerts = channel.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].event, NotificationEvent::Declared);
        assert_eq!(alerts[0].priority, AlertPriority::Urgent);
        assert_eq!(alerts[0].target, "L1");
    }

    #[tokio::test]
    async fn test_create_分配工单编号() {
        let (env, _) = recording_env();
        let api = &env.ctx.declaration_api;

        let first = api.create(new_declaration()).await.unwrap().declaration;
        let second = api.create(new_declaration()).await.unwrap().declaration;

        assert_ne!(first.declaration_id, second.declaration_id);
        assert!(first.ticket_number.starts_with("DT-"));
        assert!(first.ticket_number.ends_with("-0001"));
        assert!(second.ticket_number.ends_with("-0002"));
    }

    #[tokio::test]
    async fn test_create_允许问题类型为空() {
        let (env, _) = recording_env();
        let declaration = env
            .ctx
            .declaration_api
            .create(new_declaration())
            .await
            .unwrap()
            .declaration;
        assert!(declaration.problem_type_id.is_none());
        assert!(declaration.needs_problem_type());
    }

    #[tokio::test]
    async fn test_create_高影响需要产线() {
        let (env, _) = recording_env();
        let mut payload = new_declaration();
        payload.impact_level = ImpactLevel::High;
        payload.production_line_id = None;

        let err = env.ctx.declaration_api.create(payload).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::MissingRequiredField { ref field } if field == "production_line_id"
        ));

        let all = env
            .ctx
            .declaration_api
            .list(&DeclarationFilter::default())
            .await
            .unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_create_必填与长度校验() {
        let (env, _) = recording_env();
        let api = &env.ctx.declaration_api;

        let mut blank_reason = new_declaration();
        blank_reason.reason = "   ".to_string();
        assert!(matches!(
            api.create(blank_reason).await.unwrap_err(),
            ApiError::MissingRequiredField { ref field } if field == "reason"
        ));

        let mut too_long = new_declaration();
        too_long.duration_minutes = 721;
        assert!(matches!(
            api.create(too_long).await.unwrap_err(),
            ApiError::FieldValueError { ref field, .. } if field == "duration_minutes"
        ));

        let mut zero = new_declaration();
        zero.duration_minutes = 0;
        assert!(api.create(zero).await.is_err());
    }

    #[tokio::test]
    async fn test_create_设备不属于工位() {
        let (env, _) = recording_env();
        let mut payload = new_declaration();
        payload.machine_id = Some("M-B1-1".to_string());

        let err = env.ctx.declaration_api.create(payload).await.unwrap_err();
        match err {
            ApiError::ReferenceIntegrityViolation { field, message } => {
                assert_eq!(field, "machine_id");
                assert!(message.contains("WS-B1"));
            }
            other => panic!("Expected ReferenceIntegrityViolation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_参考数据不存在() {
        let (env, _) = recording_env();
        let api = &env.ctx.declaration_api;

        let mut unknown_ws = new_declaration();
        unknown_ws.workstation_id = "WS-404".to_string();
        unknown_ws.machine_id = None;
        assert!(matches!(
            api.create(unknown_ws).await.unwrap_err(),
            ApiError::ReferenceIntegrityViolation { ref field, .. } if field == "workstation_id"
        ));

        let mut wrong_line = new_declaration();
        wrong_line.production_line_id = Some("L2".to_string());
        assert!(matches!(
            api.create(wrong_line).await.unwrap_err(),
            ApiError::ReferenceIntegrityViolation { ref field, .. } if field == "production_line_id"
        ));

        let mut unknown_problem = new_declaration();
        unknown_problem.problem_type_id = Some("PT-404".to_string());
        assert!(matches!(
            api.create(unknown_problem).await.unwrap_err(),
            ApiError::ReferenceIntegrityViolation { ref field, .. } if field == "problem_type_id"
        ));
    }

    #[tokio::test]
    async fn test_create_首次加载后新增的参考数据可用() {
        let (env, _) = recording_env();
        let api = &env.ctx.declaration_api;

        // 首次创建加载参考数据快照
        api.create(new_declaration()).await.unwrap();
        assert!(env.ctx.catalog.is_loaded());

        env.ctx
            .reference_repo
            .upsert_workstation(&Workstation {
                workstation_id: "WS-A3".to_string(),
                name: "工位 WS-A3".to_string(),
                line_id: Some("L1".to_string()),
                project_id: Some("PRJ-1".to_string()),
            })
            .unwrap();
        env.ctx
            .reference_repo
            .upsert_problem_type(&ProblemType {
                problem_type_id: "PT-HYD".to_string(),
                name: "液压故障".to_string(),
                category: None,
            })
            .unwrap();

        let mut payload = new_declaration();
        payload.workstation_id = "WS-A3".to_string();
        payload.machine_id = None;
        let created = api.create(payload).await.unwrap().declaration;
        assert_eq!(created.workstation_id, "WS-A3");

        let updated = api
            .assign_problem_type(&created.declaration_id, "PT-HYD")
            .await
            .unwrap();
        assert_eq!(updated.problem_type_id.as_deref(), Some("PT-HYD"));

        // 重新加载后仍不存在才拒绝
        let mut unknown = new_declaration();
        unknown.workstation_id = "WS-404".to_string();
        unknown.machine_id = None;
        assert!(matches!(
            api.create(unknown).await.unwrap_err(),
            ApiError::ReferenceIntegrityViolation { ref field, .. } if field == "workstation_id"
        ));
    }

    // ==========================================
    // 流转
    // ==========================================

    #[tokio::test]
    async fn test_full_lifecycle_resolve_twice_rejected() {
        let (env, channel) = recording_env();
        let api = &env.ctx.declaration_api;

        let mut payload = new_declaration();
        payload.notify_maintenance = true;
        let created = api.create(payload).await.unwrap();
        let id = created.declaration.declaration_id.clone();
        created.settle().await;

        let acked = api.acknowledge(&id, Some("张工")).await.unwrap();
        assert_eq!(acked.declaration.status, DeclarationStatus::Acknowledged);
        assert_eq!(acked.declaration.assigned_technician.as_deref(), Some("张工"));
        assert!(acked.declaration.acknowledged_at.is_some());
        acked.settle().await;

        // 沿用确认时分配的技术员
        let started = api.start_work(&id, None).await.unwrap();
        assert_eq!(started.declaration.status, DeclarationStatus::InProgress);
        assert_eq!(started.declaration.assigned_technician.as_deref(), Some("张工"));
        started.settle().await;

        let resolved = api.resolve(&id, Some("Fixed sensor")).await.unwrap();
        assert_eq!(resolved.declaration.status, DeclarationStatus::Resolved);
        assert_eq!(
            resolved.declaration.resolution_notes.as_deref(),
            Some("Fixed sensor")
        );
        resolved.settle().await;

        let err = api.resolve(&id, Some("again")).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::InvalidTransition {
                action: TransitionAction::Resolve,
                from: DeclarationStatus::Resolved
            }
        ));

        let events: Vec<NotificationEvent> = channel.alerts().iter().map(|a| a.event).collect();
        assert_eq!(
            events,
            vec![
                NotificationEvent::Declared,
                NotificationEvent::Acknowledged,
                NotificationEvent::WorkStarted,
                NotificationEvent::Resolved,
            ]
        );

        let history = api.history(&id).await.unwrap();
        let actions: Vec<&str> = history.iter().map(|h| h.action.as_str()).collect();
        assert_eq!(actions, vec!["create", "acknowledge", "start_work", "resolve"]);
        assert_eq!(history[3].to_status, DeclarationStatus::Resolved);
    }

    #[tokio::test]
    async fn test_start_work_无技术员被拒绝() {
        let (env, _) = recording_env();
        let api = &env.ctx.declaration_api;
        let id = api
            .create(new_declaration())
            .await
            .unwrap()
            .declaration
            .declaration_id;

        let err = api.start_work(&id, None).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::MissingRequiredField { ref field } if field == "assigned_technician"
        ));

        let err = api.start_work(&id, Some("  ")).await.unwrap_err();
        assert!(matches!(err, ApiError::MissingRequiredField { .. }));

        let current = api.get(&id).await.unwrap();
        assert_eq!(current.status, DeclarationStatus::Declared);
        assert!(current.started_at.is_none());
    }

    #[tokio::test]
    async fn test_resolve_空说明与非法起点() {
        let (env, _) = recording_env();
        let api = &env.ctx.declaration_api;
        let id = api
            .create(new_declaration())
            .await
            .unwrap()
            .declaration
            .declaration_id;

        // declared 不能直接解决
        assert!(matches!(
            api.resolve(&id, Some("done")).await.unwrap_err(),
            ApiError::InvalidTransition {
                from: DeclarationStatus::Declared,
                ..
            }
        ));

        api.start_work(&id, Some("李工")).await.unwrap();
        assert!(matches!(
            api.resolve(&id, Some("   ")).await.unwrap_err(),
            ApiError::MissingRequiredField { ref field } if field == "resolution_notes"
        ));
        assert!(matches!(
            api.resolve(&id, None).await.unwrap_err(),
            ApiError::MissingRequiredField { .. }
        ));
        assert_eq!(
            api.get(&id).await.unwrap().status,
            DeclarationStatus::InProgress
        );
    }

    #[tokio::test]
    async fn test_cancel_无通知并可删除() {
        let (env, channel) = recording_env();
        let api = &env.ctx.declaration_api;

        let mut payload = new_declaration();
        payload.notify_maintenance = true;
        let created = api.create(payload).await.unwrap();
        let id = created.declaration.declaration_id.clone();
        created.settle().await;

        api.start_work(&id, Some("王工")).await.unwrap().settle().await;

        let cancelled = api.cancel(&id, Some("误报")).await.unwrap();
        assert!(cancelled.notification.is_none());
        assert_eq!(cancelled.declaration.status, DeclarationStatus::Cancelled);
        assert_eq!(cancelled.declaration.cancel_reason.as_deref(), Some("误报"));

        assert!(matches!(
            api.acknowledge(&id, None).await.unwrap_err(),
            ApiError::InvalidTransition { .. }
        ));

        // Declared + WorkStarted, 取消不通知
        assert_eq!(channel.alerts().len(), 2);

        api.delete(&id).await.unwrap();
        assert!(matches!(
            api.get(&id).await.unwrap_err(),
            ApiError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_delete_仅允许已申报或已取消() {
        let (env, _) = recording_env();
        let api = &env.ctx.declaration_api;

        let declared = api.create(new_declaration()).await.unwrap().declaration;
        api.delete(&declared.declaration_id).await.unwrap();

        let acked = api.create(new_declaration()).await.unwrap().declaration;
        api.acknowledge(&acked.declaration_id, None).await.unwrap();
        let err = api.delete(&acked.declaration_id).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::InvalidState { ref operation, status: DeclarationStatus::Acknowledged }
                if operation == "delete"
        ));
        assert_eq!(
            api.get(&acked.declaration_id).await.unwrap().status,
            DeclarationStatus::Acknowledged
        );

        assert!(matches!(
            api.delete("no-such-id").await.unwrap_err(),
            ApiError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_availability_跟随状态() {
        let (env, _) = recording_env();
        let api = &env.ctx.declaration_api;
        let id = api
            .create(new_declaration())
            .await
            .unwrap()
            .declaration
            .declaration_id;

        let declared = api.availability(&id).await.unwrap();
        assert!(declared.can_acknowledge);
        assert!(declared.can_start_work);
        assert!(!declared.can_resolve);
        assert!(declared.can_cancel);
        assert!(declared.can_delete);

        api.acknowledge(&id, Some("赵工")).await.unwrap();
        let acked = api.availability(&id).await.unwrap();
        assert!(!acked.can_acknowledge);
        assert!(acked.can_start_work);
        assert!(acked.can_resolve);
        assert!(!acked.can_delete);

        api.resolve(&id, Some("更换保险丝")).await.unwrap();
        let resolved = api.availability(&id).await.unwrap();
        assert!(!resolved.can_cancel);
        assert!(!resolved.can_resolve);
        assert!(!resolved.can_delete);
    }

    // ==========================================
    // 问题类型补全 / 查询
    // ==========================================

    #[tokio::test]
    async fn test_assign_problem_type() {
        let (env, _) = recording_env();
        let api = &env.ctx.declaration_api;
        let id = api
            .create(new_declaration())
            .await
            .unwrap()
            .declaration
            .declaration_id;

        assert!(matches!(
            api.assign_problem_type(&id, "PT-404").await.unwrap_err(),
            ApiError::ReferenceIntegrityViolation { .. }
        ));

        let updated = api.assign_problem_type(&id, "PT-MECH").await.unwrap();
        assert_eq!(updated.problem_type_id.as_deref(), Some("PT-MECH"));
        assert_eq!(updated.status, DeclarationStatus::Declared);
        assert_eq!(
            api.get(&id).await.unwrap().problem_type_id.as_deref(),
            Some("PT-MECH")
        );

        api.cancel(&id, None).await.unwrap();
        assert!(matches!(
            api.assign_problem_type(&id, "PT-ELEC").await.unwrap_err(),
            ApiError::InvalidState { status: DeclarationStatus::Cancelled, .. }
        ));
    }

    #[tokio::test]
    async fn test_list_按状态和产线筛选() {
        let (env, _) = recording_env();
        let api = &env.ctx.declaration_api;

        let first = api.create(new_declaration()).await.unwrap().declaration;
        let mut other_line = new_declaration();
        other_line.workstation_id = "WS-B1".to_string();
        other_line.machine_id = Some("M-B1-1".to_string());
        other_line.production_line_id = Some("L2".to_string());
        api.create(other_line).await.unwrap();
        api.acknowledge(&first.declaration_id, None).await.unwrap();

        let on_l1 = api.list(&DeclarationFilter::by_line("L1")).await.unwrap();
        assert_eq!(on_l1.len(), 1);
        assert_eq!(on_l1[0].declaration_id, first.declaration_id);

        let declared = api
            .list(&DeclarationFilter::by_status(DeclarationStatus::Declared))
            .await
            .unwrap();
        assert_eq!(declared.len(), 1);
        assert_eq!(declared[0].production_line_id.as_deref(), Some("L2"));

        let all = api.list(&DeclarationFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
