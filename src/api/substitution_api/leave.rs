use super::*;

impl SubstitutionApi {
    /// 提交请假（PENDING）
    pub fn submit_leave(
        &self,
        faculty_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        reason: Option<String>,
        actor: &str,
    ) -> ApiResult<LeaveRequest> {
        require_non_empty("faculty_id", faculty_id)?;
        require_non_empty("actor", actor)?;
        validate_leave_range(start_date, end_date)?;

        let now = Self::now();
        let leave = LeaveRequest {
            leave_id: uuid::Uuid::new_v4().to_string(),
            faculty_id: faculty_id.to_string(),
            start_date,
            end_date,
            reason: reason.filter(|r| !r.trim().is_empty()),
            status: LeaveStatus::Pending,
            reviewed_by: None,
            created_at: now,
            updated_at: now,
        };

        run_in_transaction(&self.conn, |tx| -> ApiResult<()> {
            Self::require_faculty_tx(tx, faculty_id)?;
            LeaveRequestRepository::insert_tx(tx, &leave)?;

            let log = ActionLog::new(None, ActionType::LeaveSubmitted, actor)
                .with_payload(&leave)
                .with_detail(format!("{} 请假 {} ~ {}", faculty_id, start_date, end_date));
            ActionLogRepository::insert_tx(tx, &log)?;
            Ok(())
        })?;

        info!(leave_id = %leave.leave_id, faculty_id = %faculty_id, "请假已提交");
        Ok(leave)
    }

    /// 审批通过并立即级联生成代课邀约（同一事务）
    pub async fn approve_leave(&self, leave_id: &str, actor: &str) -> ApiResult<LeaveCascadeReport> {
        require_non_empty("leave_id", leave_id)?;
        require_non_empty("actor", actor)?;

        let notify_all = self.notify_all_ranked().await?;

        let _perf = PerfGuard::new("approve_leave").with_subject(leave_id);
        let (report, notifications) = run_in_transaction(
            &self.conn,
            |tx| -> ApiResult<(LeaveCascadeReport, Vec<Notification>)> {
                LeaveRequestRepository::update_status_tx(
                    tx,
                    leave_id,
                    LeaveStatus::Pending,
                    LeaveStatus::Approved,
                    actor,
                )?;
                self.cascade_tx(tx, leave_id, notify_all, actor)
            },
        )?;

        self.dispatch(notifications);
        Ok(report)
    }

    /// 对已通过的请假执行级联（幂等：已有活跃邀约的 (明细, 日期) 跳过）
    pub async fn on_leave_approved(&self, leave_id: &str, actor: &str) -> ApiResult<LeaveCascadeReport> {
        require_non_empty("leave_id", leave_id)?;
        require_non_empty("actor", actor)?;

        let notify_all = self.notify_all_ranked().await?;

        let _perf = PerfGuard::new("on_leave_approved").with_subject(leave_id);
        let (report, notifications) =
            run_in_transaction(&self.conn, |tx| self.cascade_tx(tx, leave_id, notify_all, actor))?;

        self.dispatch(notifications);
        Ok(report)
    }

    /// 驳回待审批请假
    pub fn reject_leave(&self, leave_id: &str, actor: &str) -> ApiResult<LeaveClosure> {
        self.close_leave(leave_id, &[LeaveStatus::Pending], LeaveStatus::Rejected, actor)
    }

    /// 撤销请假；已通过的请假同时取消全部活跃邀约并删除代课明细
    pub fn cancel_leave(&self, leave_id: &str, actor: &str) -> ApiResult<LeaveClosure> {
        self.close_leave(
            leave_id,
            &[LeaveStatus::Pending, LeaveStatus::Approved],
            LeaveStatus::Cancelled,
            actor,
        )
    }

    async fn notify_all_ranked(&self) -> ApiResult<bool> {
        self.config_manager
            .get_notify_all_ranked_candidates()
            .await
            .map_err(|e| ApiError::ConfigError(e.to_string()))
    }

    fn cascade_tx(
        &self,
        tx: &Connection,
        leave_id: &str,
        notify_all: bool,
        actor: &str,
    ) -> ApiResult<(LeaveCascadeReport, Vec<Notification>)> {
        let leave = LeaveRequestRepository::find_by_id_tx(tx, leave_id)?
            .ok_or_else(|| ApiError::NotFound(format!("请假单{}不存在", leave_id)))?;
        if leave.status != LeaveStatus::Approved {
            return Err(ApiError::StateError(format!(
                "请假单{}状态为{}，不能触发代课",
                leave_id, leave.status
            )));
        }

        let mut entries = TimetableEntryRepository::find_published_weekly_for_faculty_tx(tx, &leave.faculty_id)?;
        // 请假教师已接下的代课同样需要转给他人
        entries.extend(TimetableEntryRepository::find_published_dated_for_faculty_tx(
            tx,
            &leave.faculty_id,
            leave.start_date,
            leave.end_date,
        )?);
        let eligibility = ResourceRepository::find_active_eligibility_tx(tx)?;
        let ranker = PreferenceRanker::from_eligibility(&eligibility);
        let already_active =
            SubstitutionOfferRepository::find_active_pairs_by_original_faculty_tx(tx, &leave.faculty_id)?;

        let planned = self.cascade.plan_offers(&leave, &entries, &ranker, &already_active);

        let now = Self::now();
        let mut offers = Vec::with_capacity(planned.len());
        let mut notifications = Vec::new();
        for plan in planned {
            let offer = SubstitutionOffer {
                offer_id: uuid::Uuid::new_v4().to_string(),
                entry_id: plan.entry_id.clone(),
                leave_id: leave.leave_id.clone(),
                original_faculty_id: leave.faculty_id.clone(),
                substitute_faculty_id: plan.substitute_faculty_id.clone(),
                sub_date: plan.sub_date,
                status: OfferStatus::Pending,
                declined_faculty_ids: Vec::new(),
                previous_offer_id: None,
                substitute_entry_id: None,
                resolved_by: None,
                created_at: now,
                updated_at: now,
            };
            SubstitutionOfferRepository::insert_tx(tx, &offer)?;

            let recipients: &[String] = if notify_all {
                &plan.ranked_candidates
            } else {
                &plan.ranked_candidates[..plan.ranked_candidates.len().min(1)]
            };
            if !recipients.is_empty() {
                let entry = Self::load_entry_tx(tx, &plan.entry_id)?;
                for faculty_id in recipients {
                    notifications.push(Self::notification_tx(
                        tx,
                        faculty_id,
                        NotificationKind::SubstitutionRequest,
                        Self::offer_payload(&offer, &entry),
                    )?);
                }
            }

            offers.push(offer);
        }

        let awaiting = offers.iter().filter(|o| o.awaits_manual_assignment()).count();
        let report = LeaveCascadeReport {
            leave_id: leave.leave_id.clone(),
            offers_created: offers.len(),
            offers_awaiting_assignment: awaiting,
            offers,
        };

        let log = ActionLog::new(None, ActionType::LeaveApproved, actor)
            .with_payload(&serde_json::json!({
                "leave_id": leave.leave_id,
                "faculty_id": leave.faculty_id,
                "offers_created": report.offers_created,
                "offers_awaiting_assignment": awaiting,
            }))
            .with_detail(format!(
                "请假{}级联生成{}条代课邀约",
                leave.leave_id, report.offers_created
            ));
        ActionLogRepository::insert_tx(tx, &log)?;

        if awaiting > 0 {
            warn!(leave_id = %leave.leave_id, awaiting, "部分课程无合格代课候选，等待人工指派");
        }
        info!(
            leave_id = %leave.leave_id,
            faculty_id = %leave.faculty_id,
            offers_created = report.offers_created,
            notifications = notifications.len(),
            "代课级联完成"
        );

        Ok((report, notifications))
    }

    fn close_leave(
        &self,
        leave_id: &str,
        allowed_from: &[LeaveStatus],
        target: LeaveStatus,
        actor: &str,
    ) -> ApiResult<LeaveClosure> {
        let _perf = PerfGuard::new("close_leave").with_subject(leave_id);

        require_non_empty("leave_id", leave_id)?;
        require_non_empty("actor", actor)?;

        let closure = run_in_transaction(&self.conn, |tx| -> ApiResult<LeaveClosure> {
            let leave = LeaveRequestRepository::find_by_id_tx(tx, leave_id)?
                .ok_or_else(|| ApiError::NotFound(format!("请假单{}不存在", leave_id)))?;
            if !allowed_from.contains(&leave.status) {
                return Err(ApiError::InvalidStateTransition {
                    from: leave.status.to_string(),
                    to: target.to_string(),
                });
            }

            LeaveRequestRepository::update_status_tx(tx, leave_id, leave.status, target, actor)?;

            let ranker = PreferenceRanker::from_eligibility(&[]);
            let now = Self::now();
            let mut offers_cancelled = 0;
            let mut entries_removed = 0;
            for offer in SubstitutionOfferRepository::find_by_leave_tx(tx, leave_id)?
                .into_iter()
                .filter(|o| o.status.is_active())
            {
                let entry = Self::load_entry_tx(tx, &offer.entry_id)?;
                let ctx = CascadeContext {
                    entry: &entry,
                    substitute_schedule: &[],
                    ranker: &ranker,
                };
                let transition = self.cascade.apply(&offer, OfferEvent::Cancel, &ctx)?;

                if let Some(sub_entry_id) = offer.substitute_entry_id.as_deref() {
                    entries_removed += Self::remove_substitution_entry_tx(tx, sub_entry_id)?;
                }

                let expected = offer.status;
                let cancelled = SubstitutionOffer {
                    status: transition.resulting_status(),
                    substitute_entry_id: None,
                    resolved_by: Some(actor.to_string()),
                    updated_at: now,
                    ..offer
                };
                SubstitutionOfferRepository::update_tx(tx, &cancelled, expected)?;
                offers_cancelled += 1;
            }

            let log = ActionLog::new(None, ActionType::LeaveCancelled, actor)
                .with_payload(&serde_json::json!({
                    "leave_id": leave_id,
                    "from": leave.status.to_db_str(),
                    "to": target.to_db_str(),
                    "offers_cancelled": offers_cancelled,
                    "entries_removed": entries_removed,
                }))
                .with_detail(format!("请假{} {} -> {}", leave_id, leave.status, target));
            ActionLogRepository::insert_tx(tx, &log)?;

            let leave = LeaveRequestRepository::find_by_id_tx(tx, leave_id)?
                .ok_or_else(|| ApiError::NotFound(format!("请假单{}不存在", leave_id)))?;
            Ok(LeaveClosure {
                leave,
                offers_cancelled,
                entries_removed,
            })
        })?;

        info!(
            leave_id = %leave_id,
            status = %target,
            offers_cancelled = closure.offers_cancelled,
            entries_removed = closure.entries_removed,
            "请假已关闭"
        );
        Ok(closure)
    }

    /// 删除代课明细
    ///
    /// 代课人再请假时，该明细上的转代邀约所生成的明细一并删除（邀约随外键级联删除）
    fn remove_substitution_entry_tx(tx: &Connection, entry_id: &str) -> ApiResult<usize> {
        let mut removed = 0;
        let mut queue = vec![entry_id.to_string()];
        while let Some(id) = queue.pop() {
            for relayed in SubstitutionOfferRepository::find_active_by_entry_tx(tx, &id)? {
                warn!(
                    offer_id = %relayed.offer_id,
                    leave_id = %relayed.leave_id,
                    entry_id = %id,
                    "代课明细已撤销，其转代邀约一并移除"
                );
                queue.extend(relayed.substitute_entry_id);
            }
            removed += TimetableEntryRepository::delete_tx(tx, &id)?;
        }
        Ok(removed)
    }
}
