// ==========================================
// 请假与代课级联集成测试
// ==========================================
// 职责: 请假审批 -> 邀约 -> 拒绝级联 / 接受复检 / 指派 / 撤销
// ==========================================


#[cfg(test)]
mod substitution_test {
    use campus_timetable::api::{ApiError, CreateTimetableRequest, OfferResponse};
    use campus_timetable::app::AppState;
    use campus_timetable::domain::timetable::EntryDraft;
    use campus_timetable::domain::types::{
        ActingRole, DayOfWeek, EntrySource, LeaveStatus, NotificationKind, OfferStatus,
    };

    use crate::test_helpers::*;

    /// 发布一份课表: F 周一 10:00-11:00 讲授 DS101（CS-2A, R70），外加 extras
    ///
    /// DS101 合格教师偏好: F=9, G=8, H=5
    async fn publish_with_monday_lecture(state: &AppState, db_path: &str, extras: Vec<EntryDraft>) -> String {
        let conn = open(db_path);
        seed_faculty(&conn, "F", Some("f@campus.edu"));
        seed_faculty(&conn, "G", Some("g@campus.edu"));
        seed_faculty(&conn, "H", None);
        seed_faculty(&conn, "K", None);
        seed_classroom(&conn, "R70", 70, false);
        seed_classroom(&conn, "R40", 40, false);
        seed_batch(&conn, "CS-2A", "CS", 3, 60);
        seed_batch(&conn, "CS-5B", "CS", 5, 35);
        seed_subject(&conn, "DS101", "CS", 3, (0, 0, 0));
        seed_eligibility(&conn, "F", "DS101", 9);
        seed_eligibility(&conn, "G", "DS101", 8);
        seed_eligibility(&conn, "H", "DS101", 5);

        let api = &state.timetable_api;
        let tt = api
            .create_timetable(
                CreateTimetableRequest {
                    name: "CS 2026 秋".to_string(),
                    department_id: Some("CS".to_string()),
                    semester: 3,
                    academic_year: "2026-2027".to_string(),
                },
                "admin",
            )
            .unwrap();

        let lecture = api
            .add_manual_assignment(
                &tt.timetable_id,
                draft(DayOfWeek::Mon, t(10, 0), t(11, 0), "DS101", "F", "CS-2A", "R70"),
                "admin",
            )
            .await
            .unwrap();
        for extra in extras {
            api.add_manual_assignment(&tt.timetable_id, extra, "admin").await.unwrap();
        }

        api.submit_for_approval(&tt.timetable_id, "admin").unwrap();
        api.approve(&tt.timetable_id, "dean").unwrap();
        api.publish(&tt.timetable_id, "dean").unwrap();
        lecture.entry_id
    }

    #[tokio::test]
    async fn test_leave_on_monday_creates_single_offer_to_top_candidate() {
        let (_tmp, db_path, state, mut outbox) = create_test_state_with_outbox();
        let entry_id = publish_with_monday_lecture(&state, &db_path, Vec::new()).await;
        let api = &state.substitution_api;

        let leave = api
            .submit_leave("F", monday(), monday(), Some("会议".to_string()), "F")
            .unwrap();
        assert_eq!(leave.status, LeaveStatus::Pending);

        let report = api.approve_leave(&leave.leave_id, "hod").await.unwrap();
        assert_eq!(report.offers_created, 1);
        assert_eq!(report.offers_awaiting_assignment, 0);

        let offer = &report.offers[0];
        assert_eq!(offer.entry_id, entry_id);
        assert_eq!(offer.sub_date, monday());
        assert_eq!(offer.substitute_faculty_id.as_deref(), Some("G"));
        assert_eq!(offer.status, OfferStatus::Pending);

        // 默认通知全部排名候选
        let sent = drain(&mut outbox);
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|n| n.kind == NotificationKind::SubstitutionRequest));
        assert_eq!(sent[0].recipient, "g@campus.edu");
        assert_eq!(sent[1].recipient, "H");

        assert_eq!(api.get_leave(&leave.leave_id).unwrap().status, LeaveStatus::Approved);

        // 重复触发不再生成
        let again = api.on_leave_approved(&leave.leave_id, "hod").await.unwrap();
        assert_eq!(again.offers_created, 0);
        assert_eq!(api.list_offers_for_leave(&leave.leave_id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_decline_cascades_to_next_candidate_then_awaits_assignment() {
        let (_tmp, db_path, state, mut outbox) = create_test_state_with_outbox();
        publish_with_monday_lecture(&state, &db_path, Vec::new()).await;
        let api = &state.substitution_api;

        let leave = api.submit_leave("F", monday(), monday(), None, "F").unwrap();
        let report = api.approve_leave(&leave.leave_id, "hod").await.unwrap();
        let first = report.offers[0].clone();
        drain(&mut outbox);

        // 非当前候选不能拒绝
        let err = api.respond_to_offer(&first.offer_id, "H", OfferResponse::Decline).unwrap_err();
        assert!(matches!(err, ApiError::StateError(_)));

        let declined = api.respond_to_offer(&first.offer_id, "G", OfferResponse::Decline).unwrap();
        assert_eq!(declined.offer.status, OfferStatus::Declined);
        let next = declined.next_offer.unwrap();
        assert_eq!(next.status, OfferStatus::Pending);
        assert_eq!(next.substitute_faculty_id.as_deref(), Some("H"));
        assert_eq!(next.declined_faculty_ids, vec!["G".to_string()]);
        assert_eq!(next.previous_offer_id.as_deref(), Some(first.offer_id.as_str()));

        let sent = drain(&mut outbox);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].faculty_id, "H");

        assert_eq!(api.pending_offers_for_faculty("H").unwrap().len(), 1);
        assert!(api.pending_offers_for_faculty("G").unwrap().is_empty());

        let exhausted = api.respond_to_offer(&next.offer_id, "H", OfferResponse::Decline).unwrap();
        assert!(exhausted.next_offer.is_none());
        assert_eq!(exhausted.offer.offer_id, next.offer_id);
        assert_eq!(exhausted.offer.status, OfferStatus::Pending);
        assert!(exhausted.offer.substitute_faculty_id.is_none());
        assert_eq!(
            exhausted.offer.declined_faculty_ids,
            vec!["G".to_string(), "H".to_string()]
        );
        assert!(drain(&mut outbox).is_empty());

        let awaiting = api.offers_awaiting_assignment().unwrap();
        assert_eq!(awaiting.len(), 1);
        assert_eq!(awaiting[0].offer_id, next.offer_id);

        let history = api.list_offers_for_leave(&leave.leave_id).unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_accept_rechecks_conflicts_at_commit() {
        let (_tmp, db_path, state, mut outbox) = create_test_state_with_outbox();
        // G 周一 10:30 另有课
        let extras = vec![draft(DayOfWeek::Mon, t(10, 30), t(11, 30), "DS101", "G", "CS-5B", "R40")];
        let entry_id = publish_with_monday_lecture(&state, &db_path, extras).await;
        let api = &state.substitution_api;

        let leave = api.submit_leave("F", monday(), monday(), None, "F").unwrap();
        let offer = api.approve_leave(&leave.leave_id, "hod").await.unwrap().offers[0].clone();
        assert_eq!(offer.substitute_faculty_id.as_deref(), Some("G"));
        drain(&mut outbox);

        let err = api.respond_to_offer(&offer.offer_id, "G", OfferResponse::Accept).unwrap_err();
        assert!(matches!(err, ApiError::Conflict { .. }));
        assert_eq!(err.conflicts().len(), 1);
        assert_eq!(err.conflicts()[0].faculty_id, "G");

        // 冲突不改变状态
        let unchanged = api.get_offer(&offer.offer_id).unwrap();
        assert_eq!(unchanged.status, OfferStatus::Pending);
        assert_eq!(unchanged.substitute_faculty_id.as_deref(), Some("G"));

        let next = api
            .respond_to_offer(&offer.offer_id, "G", OfferResponse::Decline)
            .unwrap()
            .next_offer
            .unwrap();
        let accepted = api.respond_to_offer(&next.offer_id, "H", OfferResponse::Accept).unwrap();
        assert_eq!(accepted.offer.status, OfferStatus::Accepted);
        assert_eq!(accepted.offer.resolved_by.as_deref(), Some("H"));

        let sub_entry_id = accepted.offer.substitute_entry_id.clone().unwrap();
        let timetable_id = {
            let conn = open(&db_path);
            conn.query_row(
                "SELECT timetable_id FROM timetable_entry WHERE entry_id = ?1",
                [&entry_id],
                |row| row.get::<_, String>(0),
            )
            .unwrap()
        };
        let sub_entry = state
            .timetable_api
            .list_entries(&timetable_id)
            .unwrap()
            .into_iter()
            .find(|e| e.entry_id == sub_entry_id)
            .unwrap();
        assert_eq!(sub_entry.faculty_id, "H");
        assert_eq!(sub_entry.source, EntrySource::Substitution);
        assert!(sub_entry.is_substitution);
        assert_eq!(sub_entry.original_faculty_id.as_deref(), Some("F"));
        assert_eq!(sub_entry.substitution_date, Some(monday()));

        // 请假教师收到接受通知（H 的邀约通知在此之前）
        let sent = drain(&mut outbox);
        let accepted_notice = sent
            .iter()
            .find(|n| n.kind == NotificationKind::SubstitutionAccepted)
            .unwrap();
        assert_eq!(accepted_notice.faculty_id, "F");
        assert_eq!(accepted_notice.recipient, "f@campus.edu");

        let err = api.respond_to_offer(&next.offer_id, "H", OfferResponse::Accept).unwrap_err();
        assert!(matches!(err, ApiError::StateError(_)));
    }

    #[tokio::test]
    async fn test_dated_substitution_counts_in_later_conflict_checks() {
        let (_tmp, db_path, state) = create_test_state();
        // K 同一时段在另一班级上课
        let extras = vec![draft(DayOfWeek::Mon, t(10, 0), t(11, 0), "DS101", "K", "CS-5B", "R40")];
        publish_with_monday_lecture(&state, &db_path, extras).await;
        let api = &state.substitution_api;

        let leave_f = api.submit_leave("F", monday(), monday(), None, "F").unwrap();
        let offer_f = api.approve_leave(&leave_f.leave_id, "hod").await.unwrap().offers[0].clone();
        api.respond_to_offer(&offer_f.offer_id, "G", OfferResponse::Accept).unwrap();

        let leave_k = api.submit_leave("K", monday(), monday(), None, "K").unwrap();
        let offer_k = api.approve_leave(&leave_k.leave_id, "hod").await.unwrap().offers[0].clone();
        assert_eq!(offer_k.substitute_faculty_id.as_deref(), Some("F"));

        let next = api
            .respond_to_offer(&offer_k.offer_id, "F", OfferResponse::Decline)
            .unwrap()
            .next_offer
            .unwrap();
        assert_eq!(next.substitute_faculty_id.as_deref(), Some("G"));

        // G 当天已代 F 的课
        let err = api.respond_to_offer(&next.offer_id, "G", OfferResponse::Accept).unwrap_err();
        assert!(matches!(err, ApiError::Conflict { .. }));
        assert!(err.conflicts().iter().all(|e| e.is_substitution));
    }

    #[tokio::test]
    async fn test_substitute_leave_relays_accepted_duty() {
        let (_tmp, db_path, state) = create_test_state();
        publish_with_monday_lecture(&state, &db_path, Vec::new()).await;
        let api = &state.substitution_api;

        let leave_f = api.submit_leave("F", monday(), monday(), None, "F").unwrap();
        let offer_f = api.approve_leave(&leave_f.leave_id, "hod").await.unwrap().offers[0].clone();
        let accepted = api.respond_to_offer(&offer_f.offer_id, "G", OfferResponse::Accept).unwrap();
        let duty_id = accepted.offer.substitute_entry_id.clone().unwrap();

        // G 当天也请假: 已接下的代课需要再找人
        let leave_g = api.submit_leave("G", monday(), monday(), None, "G").unwrap();
        let report = api.approve_leave(&leave_g.leave_id, "hod").await.unwrap();
        assert_eq!(report.offers_created, 1);
        let relay = report.offers[0].clone();
        assert_eq!(relay.entry_id, duty_id);
        assert_eq!(relay.sub_date, monday());
        assert_eq!(relay.original_faculty_id, "G");
        // F 同样缺席，只剩 H
        assert_eq!(relay.substitute_faculty_id.as_deref(), Some("H"));

        let again = api.on_leave_approved(&leave_g.leave_id, "hod").await.unwrap();
        assert_eq!(again.offers_created, 0);

        let err = api
            .assign_substitute(&relay.offer_id, "F", ActingRole::Admin, "admin")
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));

        let taken = api.respond_to_offer(&relay.offer_id, "H", OfferResponse::Accept).unwrap();
        assert_eq!(taken.offer.status, OfferStatus::Accepted);
        let (faculty, original, date): (String, Option<String>, String) = open(&db_path)
            .query_row(
                "SELECT faculty_id, original_faculty_id, substitution_date FROM timetable_entry WHERE entry_id = ?1",
                [taken.offer.substitute_entry_id.as_deref().unwrap()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(faculty, "H");
        assert_eq!(original.as_deref(), Some("G"));
        assert_eq!(date, "2026-10-19");

        // F 撤销请假: G 的代课与转给 H 的代课一并撤销
        let closure = api.cancel_leave(&leave_f.leave_id, "F").unwrap();
        assert_eq!(closure.offers_cancelled, 1);
        assert_eq!(closure.entries_removed, 2);

        let remaining: i64 = open(&db_path)
            .query_row(
                "SELECT COUNT(*) FROM timetable_entry WHERE is_substitution = 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(remaining, 0);
        assert!(api.list_offers_for_leave(&leave_g.leave_id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_assign_and_cancel_leave() {
        let (_tmp, db_path, state, mut outbox) = create_test_state_with_outbox();
        let entry_id = publish_with_monday_lecture(&state, &db_path, Vec::new()).await;
        let api = &state.substitution_api;

        let leave = api.submit_leave("F", monday(), monday(), None, "F").unwrap();
        let offer = api.approve_leave(&leave.leave_id, "hod").await.unwrap().offers[0].clone();
        drain(&mut outbox);

        let err = api
            .assign_substitute(&offer.offer_id, "F", ActingRole::Admin, "admin")
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));

        let err = api
            .assign_substitute(&offer.offer_id, "NOBODY", ActingRole::Admin, "admin")
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let assigned = api
            .assign_substitute(&offer.offer_id, "H", ActingRole::DepartmentHead, "hod")
            .unwrap();
        assert_eq!(assigned.status, OfferStatus::Assigned);
        assert_eq!(assigned.substitute_faculty_id.as_deref(), Some("H"));
        assert_eq!(assigned.resolved_by.as_deref(), Some("hod"));

        let sent = drain(&mut outbox);
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|n| n.kind == NotificationKind::SubstitutionAssigned));
        let recipients: Vec<&str> = sent.iter().map(|n| n.faculty_id.as_str()).collect();
        assert_eq!(recipients, vec!["H", "F"]);

        let err = api.respond_to_offer(&offer.offer_id, "H", OfferResponse::Decline).unwrap_err();
        assert!(matches!(err, ApiError::StateError(_)));

        let closure = api.cancel_leave(&leave.leave_id, "F").unwrap();
        assert_eq!(closure.leave.status, LeaveStatus::Cancelled);
        assert_eq!(closure.offers_cancelled, 1);
        assert_eq!(closure.entries_removed, 1);

        let offers = api.list_offers_for_leave(&leave.leave_id).unwrap();
        assert!(offers.iter().all(|o| o.status == OfferStatus::Cancelled));

        let remaining: i64 = open(&db_path)
            .query_row(
                "SELECT COUNT(*) FROM timetable_entry WHERE is_substitution = 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(remaining, 0);
        let original: i64 = open(&db_path)
            .query_row(
                "SELECT COUNT(*) FROM timetable_entry WHERE entry_id = ?1",
                [&entry_id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(original, 1);

        let err = api.cancel_leave(&leave.leave_id, "F").unwrap_err();
        assert!(matches!(err, ApiError::InvalidStateTransition { .. }));

        let trail: Vec<String> = state
            .action_log_repo
            .find_by_leave(&leave.leave_id)
            .unwrap()
            .into_iter()
            .map(|l| l.action_type)
            .collect();
        assert_eq!(
            trail,
            vec!["LeaveSubmitted", "LeaveApproved", "OfferAssigned", "LeaveCancelled"]
        );
    }

    #[tokio::test]
    async fn test_leave_validation_and_rejection() {
        let (_tmp, db_path, state) = create_test_state();
        publish_with_monday_lecture(&state, &db_path, Vec::new()).await;
        let api = &state.substitution_api;

        let err = api
            .submit_leave("F", monday().succ_opt().unwrap(), monday(), None, "F")
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));

        let err = api.submit_leave("NOBODY", monday(), monday(), None, "x").unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let leave = api.submit_leave("F", monday(), monday(), None, "F").unwrap();
        let closure = api.reject_leave(&leave.leave_id, "hod").unwrap();
        assert_eq!(closure.leave.status, LeaveStatus::Rejected);
        assert_eq!(closure.leave.reviewed_by.as_deref(), Some("hod"));
        assert_eq!(closure.offers_cancelled, 0);

        let err = api.approve_leave(&leave.leave_id, "hod").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidStateTransition { .. }));
        let err = api.on_leave_approved(&leave.leave_id, "hod").await.unwrap_err();
        assert!(matches!(err, ApiError::StateError(_)));

        // 周二的请假不触及周一的课
        let tuesday = monday().succ_opt().unwrap();
        let leave = api.submit_leave("F", tuesday, tuesday, None, "F").unwrap();
        let report = api.approve_leave(&leave.leave_id, "hod").await.unwrap();
        assert_eq!(report.offers_created, 0);
    }
}
