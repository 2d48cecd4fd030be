// ==========================================
// 小时产量与班次报表集成测试
// ==========================================
// 职责: 验证指标解析、产量录入、停机挂载与班次汇总
// ==========================================


mod production_report_test {
    use super::test_helpers::{setup_env, RecordingChannel, TestEnv};
    use chrono::NaiveDate;
    use downtime_engine::api::ApiError;
    use downtime_engine::domain::production::{
        DowntimeEntryInput, HourlyOutputInput, ProductionRecordFilter,
    };
    use downtime_engine::domain::reference::{Part, PartLineAssignment};
    use downtime_engine::domain::types::Shift;
    use std::sync::Arc;

    fn env() -> TestEnv {
        setup_env(Arc::new(RecordingChannel::default()))
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn output(shift: Shift, hour: u32, part_id: &str, output: u32, target: Option<u32>) -> HourlyOutputInput {
        HourlyOutputInput {
            production_date: date(),
            shift,
            hour,
            line_id: "L1".to_string(),
            part_id: part_id.to_string(),
            output,
            target,
            headcount: None,
        }
    }

    fn downtime(minutes: u32, problem_type_id: Option<&str>) -> DowntimeEntryInput {
        DowntimeEntryInput {
            duration_minutes: minutes,
            problem_type_id: problem_type_id.map(str::to_string),
            declaration_id: None,
            note: None,
        }
    }

    fn filter(shift: Shift) -> ProductionRecordFilter {
        ProductionRecordFilter {
            production_date: date(),
            shift,
            line_id: "L1".to_string(),
        }
    }

    // ==========================================
    // 指标解析
    // ==========================================

    #[tokio::test]
    async fn test_line_metrics_覆写与回退() {
        let env = env();
        let api = &env.ctx.production_api;

        // 专属分配覆写 + 零件专属人员需求
        let p200 = api.line_metrics("L1", "P-200").await.unwrap();
        assert_eq!(p200.target, 120);
        assert_eq!(p200.headcount, 6);

        // 分配无覆写 → 零件默认; 人员回退到产线级
        let p100 = api.line_metrics("L1", "P-100").await.unwrap();
        assert_eq!(p100.target, 100);
        assert_eq!(p100.headcount, 5);

        // 停用分配被忽略; 无人员需求 → 0
        let l2 = api.line_metrics("L2", "P-100").await.unwrap();
        assert_eq!(l2.target, 100);
        assert_eq!(l2.headcount, 0);

        // 无数据 → 0, 不报错
        let unknown = api.line_metrics("L9", "P-999").await.unwrap();
        assert_eq!(unknown.target, 0);
        assert_eq!(unknown.efficiency_for(50), 0);
    }

    // ==========================================
    // 产量录入
    // ==========================================

    #[tokio::test]
    async fn test_record_output_自动解析目标和人数() {
        let env = env();
        let record = env
            .ctx
            .production_api
            .record_output(output(Shift::Morning, 8, "P-200", 96, None))
            .await
            .unwrap();

        assert_eq!(record.target, 120);
        assert_eq!(record.headcount, 6);
        assert_eq!(record.efficiency(), 80);
        assert!(record.downtimes.is_empty());
    }

    #[tokio::test]
    async fn test_record_output_同一小时覆盖更新() {
        let env = env();
        let api = &env.ctx.production_api;

        let first = api
            .record_output(output(Shift::Morning, 6, "P-100", 40, Some(100)))
            .await
            .unwrap();
        let second = api
            .record_output(output(Shift::Morning, 6, "P-100", 70, Some(100)))
            .await
            .unwrap();

        assert_eq!(first.record_id, second.record_id);
        assert_eq!(second.output, 70);

        let report = api.shift_report(&filter(Shift::Morning)).await.unwrap();
        assert_eq!(report.hours.len(), 1);
        assert_eq!(report.totals.total_output, 70);
    }

    #[tokio::test]
    async fn test_record_output_首次加载后新增零件() {
        let env = env();
        let api = &env.ctx.production_api;
        api.record_output(output(Shift::Morning, 6, "P-100", 80, None))
            .await
            .unwrap();

        env.ctx
            .reference_repo
            .upsert_part(&Part {
                part_id: "P-300".to_string(),
                part_number: "PN-P-300".to_string(),
                default_target: 90,
            })
            .unwrap();
        env.ctx
            .reference_repo
            .upsert_assignment(&PartLineAssignment {
                assignment_id: "A-4".to_string(),
                part_id: "P-300".to_string(),
                line_id: "L1".to_string(),
                target_override: Some(75),
                is_active: true,
            })
            .unwrap();

        let record = api
            .record_output(output(Shift::Morning, 7, "P-300", 60, None))
            .await
            .unwrap();
        assert_eq!(record.target, 75);
        assert_eq!(record.efficiency(), 80);
        assert_eq!(api.line_metrics("L1", "P-300").await.unwrap().target, 75);
    }

    #[tokio::test]
    async fn test_record_output_校验() {
        let env = env();
        let api = &env.ctx.production_api;

        // 14 点属于中班
        assert!(matches!(
            api.record_output(output(Shift::Morning, 14, "P-100", 10, None)).await.unwrap_err(),
            ApiError::FieldValueError { ref field, .. } if field == "hour"
        ));

        let mut unknown_line = output(Shift::Morning, 6, "P-100", 10, None);
        unknown_line.line_id = "L9".to_string();
        assert!(matches!(
            api.record_output(unknown_line).await.unwrap_err(),
            ApiError::ReferenceIntegrityViolation { ref field, .. } if field == "line_id"
        ));

        assert!(matches!(
            api.record_output(output(Shift::Morning, 6, "P-999", 10, None)).await.unwrap_err(),
            ApiError::ReferenceIntegrityViolation { ref field, .. } if field == "part_id"
        ));
    }

    // ==========================================
    // 停机挂载
    // ==========================================

    #[tokio::test]
    async fn test_attach_downtime_校验() {
        let env = env();
        let api = &env.ctx.production_api;
        let record = api
            .record_output(output(Shift::Morning, 6, "P-100", 80, Some(100)))
            .await
            .unwrap();

        for minutes in [0, 61] {
            assert!(matches!(
                api.attach_downtime(&record.record_id, downtime(minutes, None)).await.unwrap_err(),
                ApiError::FieldValueError { ref field, .. } if field == "duration_minutes"
            ));
        }

        assert!(matches!(
            api.attach_downtime("missing", downtime(10, None)).await.unwrap_err(),
            ApiError::NotFound(_)
        ));

        assert!(matches!(
            api.attach_downtime(&record.record_id, downtime(10, Some("PT-404"))).await.unwrap_err(),
            ApiError::ReferenceIntegrityViolation { .. }
        ));

        let entry = api
            .attach_downtime(&record.record_id, downtime(60, Some(" PT-ELEC ")))
            .await
            .unwrap();
        assert_eq!(entry.problem_type_id.as_deref(), Some("PT-ELEC"));
        assert_eq!(entry.hourly_record_id, record.record_id);
    }

    // ==========================================
    // 班次报表
    // ==========================================

    #[tokio::test]
    async fn test_shift_report_汇总() {
        let env = env();
        let api = &env.ctx.production_api;

        let first = api
            .record_output(output(Shift::Morning, 6, "P-100", 80, Some(100)))
            .await
            .unwrap();
        api.record_output(output(Shift::Morning, 7, "P-100", 90, Some(100)))
            .await
            .unwrap();
        api.attach_downtime(&first.record_id, downtime(15, Some("PT-MECH")))
            .await
            .unwrap();

        let report = api.shift_report(&filter(Shift::Morning)).await.unwrap();
        assert_eq!(report.totals.total_output, 170);
        assert_eq!(report.totals.total_target, 200);
        assert_eq!(report.totals.shift_efficiency, 85);
        assert_eq!(report.totals.total_downtime_minutes, 15);

        let hours: Vec<(u32, u32, u32)> = report
            .hours
            .iter()
            .map(|h| (h.hour, h.efficiency, h.downtime_minutes))
            .collect();
        assert_eq!(hours, vec![(6, 80, 15), (7, 90, 0)]);

        assert_eq!(report.downtime_breakdown.len(), 1);
        assert_eq!(
            report.downtime_breakdown[0].problem_type_id.as_deref(),
            Some("PT-MECH")
        );
        assert_eq!(report.downtime_breakdown[0].total_minutes, 15);
    }

    #[tokio::test]
    async fn test_shift_report_每次读取重算停机() {
        let env = env();
        let api = &env.ctx.production_api;
        let record = api
            .record_output(output(Shift::Afternoon, 15, "P-100", 50, Some(100)))
            .await
            .unwrap();

        let before = api.shift_report(&filter(Shift::Afternoon)).await.unwrap();
        assert_eq!(before.totals.total_downtime_minutes, 0);

        api.attach_downtime(&record.record_id, downtime(20, Some("PT-ELEC")))
            .await
            .unwrap();
        api.attach_downtime(&record.record_id, downtime(5, None))
            .await
            .unwrap();

        let after = api.shift_report(&filter(Shift::Afternoon)).await.unwrap();
        assert_eq!(after.totals.total_downtime_minutes, 25);
        assert_eq!(after.hours[0].downtime_minutes, 25);
        let breakdown: Vec<(Option<&str>, u64)> = after
            .downtime_breakdown
            .iter()
            .map(|b| (b.problem_type_id.as_deref(), b.total_minutes))
            .collect();
        assert_eq!(breakdown, vec![(Some("PT-ELEC"), 20), (None, 5)]);
    }

    #[tokio::test]
    async fn test_shift_report_空班次() {
        let env = env();
        let report = env
            .ctx
            .production_api
            .shift_report(&filter(Shift::Night))
            .await
            .unwrap();
        assert!(report.hours.is_empty());
        assert_eq!(report.totals.total_output, 0);
        assert_eq!(report.totals.total_target, 0);
        assert_eq!(report.totals.shift_efficiency, 0);
        assert_eq!(report.totals.total_downtime_minutes, 0);
        assert!(report.downtime_breakdown.is_empty());
    }

    #[tokio::test]
    async fn test_shift_report_夜班按班内顺序() {
        let env = env();
        let api = &env.ctx.production_api;
        for hour in [1, 22, 0, 23] {
            api.record_output(output(Shift::Night, hour, "P-100", 60, Some(100)))
                .await
                .unwrap();
        }

        let report = api.shift_report(&filter(Shift::Night)).await.unwrap();
        let hours: Vec<u32> = report.hours.iter().map(|h| h.hour).collect();
        assert_eq!(hours, vec![22, 23, 0, 1]);
        assert_eq!(report.totals.shift_efficiency, 60);
    }
}
