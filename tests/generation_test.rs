// ==========================================
// 课表生成集成测试
// ==========================================
// 职责: 验证生成结果落库、确定性、课型与教室约束、生命周期限制
// ==========================================


#[cfg(test)]
mod generation_test {
    use std::collections::HashSet;

    use campus_timetable::api::{ApiError, CreateTimetableRequest};
    use campus_timetable::domain::types::{DayOfWeek, SessionKind, TimetableStatus};
    use campus_timetable::engine::UnassignedReason;

    use crate::test_helpers::*;

    fn request(department: Option<&str>, semester: i32) -> CreateTimetableRequest {
        CreateTimetableRequest {
            name: "2026 秋季".to_string(),
            department_id: department.map(str::to_string),
            semester,
            academic_year: "2026-2027".to_string(),
        }
    }

    #[tokio::test]
    async fn test_cs2a_scenario_assigns_all_sessions_to_preferred_faculty() {
        let (_tmp, db_path, state) = create_test_state();
        seed_cs2a_scenario(&open(&db_path));

        let api = &state.timetable_api;
        let tt = api.create_timetable(request(Some("CS"), 3), "admin").unwrap();
        let report = api.generate_timetable(&tt.timetable_id, "admin").await.unwrap();

        assert_eq!(report.entries_created, 3);
        assert_eq!(report.unassigned_count, 0);
        assert_eq!(report.entries_discarded, 0);

        let entries = api.list_entries(&tt.timetable_id).unwrap();
        assert_eq!(entries.len(), 3);
        for e in &entries {
            assert_eq!(e.faculty_id, "F9");
            assert_eq!(e.classroom_id, "R70");
            assert_eq!(e.batch_id, "CS-2A");
            assert_eq!(e.kind, SessionKind::Lecture);
            assert!(!e.is_substitution);
        }

        let slots: HashSet<_> = entries.iter().map(|e| (e.day, e.start_time)).collect();
        assert_eq!(slots.len(), 3);
        for (i, a) in entries.iter().enumerate() {
            for b in &entries[i + 1..] {
                if a.day == b.day {
                    assert!(a.end_time <= b.start_time || b.end_time <= a.start_time);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_regeneration_is_deterministic_and_replaces_entries() {
        let (_tmp, db_path, state) = create_test_state();
        seed_cs2a_scenario(&open(&db_path));

        let api = &state.timetable_api;
        let tt = api.create_timetable(request(Some("CS"), 3), "admin").unwrap();

        let first = api.generate_timetable(&tt.timetable_id, "admin").await.unwrap();
        let first_entries = api.list_entries(&tt.timetable_id).unwrap();

        let second = api.generate_timetable(&tt.timetable_id, "admin").await.unwrap();
        let second_entries = api.list_entries(&tt.timetable_id).unwrap();

        assert_eq!(second.entries_discarded, 3);
        assert_eq!(first_entries, second_entries);
        assert_eq!(second.revision, first.revision + 1);

        let reloaded = api.get_timetable(&tt.timetable_id).unwrap();
        let snapshot = reloaded.config_snapshot_json.unwrap();
        assert!(snapshot.contains("working_days"));
    }

    #[tokio::test]
    async fn test_practical_uses_lab_and_theory_prefers_regular_room() {
        let (_tmp, db_path, state) = create_test_state();
        let conn = open(&db_path);
        seed_faculty(&conn, "F1", None);
        seed_classroom(&conn, "LAB40", 40, true);
        seed_classroom(&conn, "R70", 70, false);
        seed_batch(&conn, "ME-1", "ME", 1, 30);
        seed_subject(&conn, "PHY", "ME", 1, (1, 0, 1));
        seed_eligibility(&conn, "F1", "PHY", 7);

        let api = &state.timetable_api;
        let tt = api.create_timetable(request(Some("ME"), 1), "admin").unwrap();
        let report = api.generate_timetable(&tt.timetable_id, "admin").await.unwrap();
        assert_eq!(report.entries_created, 2);

        let entries = api.list_entries(&tt.timetable_id).unwrap();
        let lecture = entries.iter().find(|e| e.kind == SessionKind::Lecture).unwrap();
        let practical = entries.iter().find(|e| e.kind == SessionKind::Practical).unwrap();
        assert_eq!(lecture.classroom_id, "R70");
        assert_eq!(practical.classroom_id, "LAB40");
    }

    #[tokio::test]
    async fn test_unsatisfiable_units_are_reported_not_fatal() {
        let (_tmp, db_path, state) = create_test_state();
        let conn = open(&db_path);
        seed_cs2a_scenario(&conn);
        // 无合格教师
        seed_subject(&conn, "ALG201", "CS", 3, (2, 0, 0));
        // 60 人班级放不进 40 座实验室
        seed_subject(&conn, "NET301", "CS", 3, (0, 0, 1));
        seed_eligibility(&conn, "F4", "NET301", 6);

        let api = &state.timetable_api;
        let tt = api.create_timetable(request(Some("CS"), 3), "admin").unwrap();
        let report = api.generate_timetable(&tt.timetable_id, "admin").await.unwrap();

        assert_eq!(report.entries_created, 3);
        assert_eq!(report.unassigned_count, 3);
        let no_faculty = report
            .unassigned
            .iter()
            .filter(|u| u.reason == UnassignedReason::NoEligibleFaculty)
            .count();
        let no_room = report
            .unassigned
            .iter()
            .filter(|u| u.reason == UnassignedReason::NoCompatibleClassroom)
            .count();
        assert_eq!(no_faculty, 2);
        assert_eq!(no_room, 1);
    }

    #[tokio::test]
    async fn test_working_days_config_controls_generation() {
        let (_tmp, db_path, state) = create_test_state();
        let conn = open(&db_path);
        seed_cs2a_scenario(&conn);
        set_config(&conn, "working_days", "TUE,THU");
        set_config(
            &conn,
            "time_slot_catalog",
            r#"[{"start":"08:00","end":"09:30"}]"#,
        );

        let api = &state.timetable_api;
        let tt = api.create_timetable(request(Some("CS"), 3), "admin").unwrap();
        let report = api.generate_timetable(&tt.timetable_id, "admin").await.unwrap();

        // 两天各一个时间片，只能排下两节
        assert_eq!(report.entries_created, 2);
        assert_eq!(report.unassigned_count, 1);
        assert_eq!(report.unassigned[0].reason, UnassignedReason::NoFreeSlot);

        let entries = api.list_entries(&tt.timetable_id).unwrap();
        let days: Vec<DayOfWeek> = entries.iter().map(|e| e.day).collect();
        assert_eq!(days, vec![DayOfWeek::Tue, DayOfWeek::Thu]);
        assert!(entries.iter().all(|e| e.start_time == t(8, 0) && e.end_time == t(9, 30)));
    }

    #[tokio::test]
    async fn test_generation_respects_lifecycle() {
        let (_tmp, db_path, state) = create_test_state();
        seed_cs2a_scenario(&open(&db_path));

        let api = &state.timetable_api;
        let tt = api.create_timetable(request(Some("CS"), 3), "admin").unwrap();
        api.generate_timetable(&tt.timetable_id, "admin").await.unwrap();

        // 待审批时重新生成会回到草稿
        api.submit_for_approval(&tt.timetable_id, "admin").unwrap();
        api.generate_timetable(&tt.timetable_id, "admin").await.unwrap();
        assert_eq!(
            api.get_timetable(&tt.timetable_id).unwrap().status,
            TimetableStatus::Draft
        );

        api.submit_for_approval(&tt.timetable_id, "admin").unwrap();
        api.approve(&tt.timetable_id, "dean").unwrap();
        let err = api.generate_timetable(&tt.timetable_id, "admin").await.unwrap_err();
        assert!(matches!(err, ApiError::StateError(_)));

        let missing = api.generate_timetable("TT-MISSING", "admin").await.unwrap_err();
        assert!(matches!(missing, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_published_timetable_reserves_shared_resources() {
        let (_tmp, db_path, state) = create_test_state();
        let conn = open(&db_path);
        seed_cs2a_scenario(&conn);
        // 另一学期的班级，同一教师与教室
        seed_batch(&conn, "CS-3A", "CS", 5, 55);
        seed_subject(&conn, "OS301", "CS", 5, (3, 0, 0));
        seed_eligibility(&conn, "F9", "OS301", 10);

        let api = &state.timetable_api;
        let first = api.create_timetable(request(Some("CS"), 3), "admin").unwrap();
        api.generate_timetable(&first.timetable_id, "admin").await.unwrap();
        api.submit_for_approval(&first.timetable_id, "admin").unwrap();
        api.approve(&first.timetable_id, "dean").unwrap();
        api.publish(&first.timetable_id, "dean").unwrap();

        let second = api.create_timetable(request(Some("CS"), 5), "admin").unwrap();
        let report = api.generate_timetable(&second.timetable_id, "admin").await.unwrap();
        assert_eq!(report.entries_created, 3);
        assert!(report.stats.reserved_slots > 0);

        let taken: HashSet<_> = api
            .list_entries(&first.timetable_id)
            .unwrap()
            .into_iter()
            .map(|e| (e.day, e.start_time))
            .collect();
        for e in api.list_entries(&second.timetable_id).unwrap() {
            assert!(!taken.contains(&(e.day, e.start_time)), "{} 与已发布课表冲突", e.time_label());
        }
    }
}
