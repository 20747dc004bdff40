use super::*;

impl SubstitutionApi {
    /// 候选教师答复邀约
    ///
    /// - 接受: 复检冲突后生成当日代课明细，通知请假教师
    /// - 拒绝: 有下一候选则原邀约 DECLINED 并新建邀约；否则清空代课人等待人工指派
    ///
    /// # 错误
    /// - Conflict: 接受人在该日期存在冲突课程（状态不变）
    /// - StateError: 邀约非 PENDING，或答复人不是当前候选
    pub fn respond_to_offer(
        &self,
        offer_id: &str,
        faculty_id: &str,
        response: OfferResponse,
    ) -> ApiResult<OfferResponseResult> {
        let _perf = PerfGuard::new("respond_to_offer").with_subject(offer_id);

        require_non_empty("offer_id", offer_id)?;
        require_non_empty("faculty_id", faculty_id)?;

        let (result, notifications) = run_in_transaction(
            &self.conn,
            |tx| -> ApiResult<(OfferResponseResult, Vec<Notification>)> {
                let offer = Self::load_offer_tx(tx, offer_id)?;
                Self::require_faculty_tx(tx, faculty_id)?;
                let entry = Self::load_entry_tx(tx, &offer.entry_id)?;
                let eligibility = ResourceRepository::find_active_eligibility_tx(tx)?;
                let ranker = PreferenceRanker::from_eligibility(&eligibility);
                let schedule =
                    TimetableEntryRepository::find_faculty_schedule_on_date_tx(tx, faculty_id, offer.sub_date)?;
                let ctx = CascadeContext {
                    entry: &entry,
                    substitute_schedule: &schedule,
                    ranker: &ranker,
                };

                let event = match response {
                    OfferResponse::Accept => OfferEvent::Accept { faculty_id },
                    OfferResponse::Decline => OfferEvent::Decline { faculty_id },
                };

                match self.cascade.apply(&offer, event, &ctx)? {
                    OfferTransition::Accepted { substitute_faculty_id } => {
                        let updated = Self::resolve_tx(
                            tx,
                            &offer,
                            &entry,
                            &substitute_faculty_id,
                            OfferStatus::Accepted,
                            faculty_id,
                        )?;
                        Self::log_offer_tx(tx, &entry, &updated, ActionType::OfferAccepted, faculty_id)?;

                        let notification = Self::notification_tx(
                            tx,
                            &updated.original_faculty_id,
                            NotificationKind::SubstitutionAccepted,
                            Self::offer_payload(&updated, &entry),
                        )?;
                        Ok((
                            OfferResponseResult {
                                offer: updated,
                                next_offer: None,
                            },
                            vec![notification],
                        ))
                    }
                    OfferTransition::Reoffered {
                        declined_faculty_id,
                        next_faculty_id,
                    } => {
                        let now = Self::now();
                        let mut declined_ids = offer.declined_faculty_ids.clone();
                        declined_ids.push(declined_faculty_id);

                        // 先关闭原邀约，再插入新邀约（唯一索引只容许一条活跃邀约）
                        let declined = SubstitutionOffer {
                            status: OfferStatus::Declined,
                            declined_faculty_ids: declined_ids.clone(),
                            resolved_by: Some(faculty_id.to_string()),
                            updated_at: now,
                            ..offer.clone()
                        };
                        SubstitutionOfferRepository::update_tx(tx, &declined, OfferStatus::Pending)?;

                        let next = SubstitutionOffer {
                            offer_id: uuid::Uuid::new_v4().to_string(),
                            entry_id: offer.entry_id.clone(),
                            leave_id: offer.leave_id.clone(),
                            original_faculty_id: offer.original_faculty_id.clone(),
                            substitute_faculty_id: Some(next_faculty_id.clone()),
                            sub_date: offer.sub_date,
                            status: OfferStatus::Pending,
                            declined_faculty_ids: declined_ids,
                            previous_offer_id: Some(offer.offer_id.clone()),
                            substitute_entry_id: None,
                            resolved_by: None,
                            created_at: now,
                            updated_at: now,
                        };
                        SubstitutionOfferRepository::insert_tx(tx, &next)?;
                        Self::log_offer_tx(tx, &entry, &declined, ActionType::OfferDeclined, faculty_id)?;

                        let notification = Self::notification_tx(
                            tx,
                            &next_faculty_id,
                            NotificationKind::SubstitutionRequest,
                            Self::offer_payload(&next, &entry),
                        )?;
                        Ok((
                            OfferResponseResult {
                                offer: declined,
                                next_offer: Some(next),
                            },
                            vec![notification],
                        ))
                    }
                    OfferTransition::Exhausted { declined_faculty_id } => {
                        let mut declined_ids = offer.declined_faculty_ids.clone();
                        declined_ids.push(declined_faculty_id);

                        let waiting = SubstitutionOffer {
                            substitute_faculty_id: None,
                            status: OfferStatus::Pending,
                            declined_faculty_ids: declined_ids,
                            updated_at: Self::now(),
                            ..offer.clone()
                        };
                        SubstitutionOfferRepository::update_tx(tx, &waiting, OfferStatus::Pending)?;
                        Self::log_offer_tx(tx, &entry, &waiting, ActionType::OfferDeclined, faculty_id)?;

                        warn!(
                            offer_id = %waiting.offer_id,
                            entry_id = %entry.entry_id,
                            sub_date = %waiting.sub_date,
                            "代课候选已耗尽，等待人工指派"
                        );
                        Ok((
                            OfferResponseResult {
                                offer: waiting,
                                next_offer: None,
                            },
                            Vec::new(),
                        ))
                    }
                    other => Err(ApiError::InternalError(format!(
                        "答复{:?}产生了意外的迁移: {:?}",
                        response, other
                    ))),
                }
            },
        )?;

        self.dispatch(notifications);

        info!(
            offer_id = %offer_id,
            faculty_id = %faculty_id,
            response = ?response,
            status = %result.offer.status,
            next_offer_id = ?result.next_offer.as_ref().map(|o| o.offer_id.as_str()),
            "邀约已答复"
        );
        Ok(result)
    }

    /// 管理员/系主任直接指派代课教师（绕过候选队列，仍需冲突复检）
    pub fn assign_substitute(
        &self,
        offer_id: &str,
        faculty_id: &str,
        role: ActingRole,
        actor: &str,
    ) -> ApiResult<SubstitutionOffer> {
        let _perf = PerfGuard::new("assign_substitute").with_subject(offer_id);

        require_non_empty("offer_id", offer_id)?;
        require_non_empty("faculty_id", faculty_id)?;
        require_non_empty("actor", actor)?;

        let (updated, notifications) = run_in_transaction(
            &self.conn,
            |tx| -> ApiResult<(SubstitutionOffer, Vec<Notification>)> {
                let offer = Self::load_offer_tx(tx, offer_id)?;
                Self::require_faculty_tx(tx, faculty_id)?;
                let entry = Self::load_entry_tx(tx, &offer.entry_id)?;
                let eligibility = ResourceRepository::find_active_eligibility_tx(tx)?;
                let ranker = PreferenceRanker::from_eligibility(&eligibility);
                let schedule =
                    TimetableEntryRepository::find_faculty_schedule_on_date_tx(tx, faculty_id, offer.sub_date)?;
                let ctx = CascadeContext {
                    entry: &entry,
                    substitute_schedule: &schedule,
                    ranker: &ranker,
                };

                let substitute = match self
                    .cascade
                    .apply(&offer, OfferEvent::Assign { faculty_id, role }, &ctx)?
                {
                    OfferTransition::Assigned { substitute_faculty_id, .. } => substitute_faculty_id,
                    other => {
                        return Err(ApiError::InternalError(format!(
                            "指派产生了意外的迁移: {:?}",
                            other
                        )))
                    }
                };

                if !ranker.is_eligible(&entry.subject_id, &substitute) {
                    warn!(
                        offer_id = %offer.offer_id,
                        subject_id = %entry.subject_id,
                        faculty_id = %substitute,
                        "指派的代课教师无该课程授课资格"
                    );
                }

                let updated =
                    Self::resolve_tx(tx, &offer, &entry, &substitute, OfferStatus::Assigned, actor)?;
                Self::log_offer_tx(tx, &entry, &updated, ActionType::OfferAssigned, actor)?;

                let mut notifications = Vec::with_capacity(2);
                for recipient in [substitute.as_str(), updated.original_faculty_id.as_str()] {
                    notifications.push(Self::notification_tx(
                        tx,
                        recipient,
                        NotificationKind::SubstitutionAssigned,
                        Self::offer_payload(&updated, &entry),
                    )?);
                }
                Ok((updated, notifications))
            },
        )?;

        self.dispatch(notifications);

        info!(
            offer_id = %offer_id,
            faculty_id = %faculty_id,
            role = %role,
            actor = %actor,
            "代课已指派"
        );
        Ok(updated)
    }

    /// 绑定代课教师并生成当日代课明细
    fn resolve_tx(
        tx: &Connection,
        offer: &SubstitutionOffer,
        entry: &TimetableEntry,
        substitute_faculty_id: &str,
        status: OfferStatus,
        resolved_by: &str,
    ) -> ApiResult<SubstitutionOffer> {
        let substitution = TimetableEntry {
            entry_id: uuid::Uuid::new_v4().to_string(),
            timetable_id: entry.timetable_id.clone(),
            day: entry.day,
            start_time: entry.start_time,
            end_time: entry.end_time,
            subject_id: entry.subject_id.clone(),
            faculty_id: substitute_faculty_id.to_string(),
            batch_id: entry.batch_id.clone(),
            classroom_id: entry.classroom_id.clone(),
            kind: entry.kind,
            source: EntrySource::Substitution,
            is_substitution: true,
            original_faculty_id: Some(entry.faculty_id.clone()),
            substitution_date: Some(offer.sub_date),
        };
        TimetableEntryRepository::insert_tx(tx, &substitution)?;

        let updated = SubstitutionOffer {
            substitute_faculty_id: Some(substitute_faculty_id.to_string()),
            status,
            substitute_entry_id: Some(substitution.entry_id),
            resolved_by: Some(resolved_by.to_string()),
            updated_at: Self::now(),
            ..offer.clone()
        };
        SubstitutionOfferRepository::update_tx(tx, &updated, OfferStatus::Pending)?;
        Ok(updated)
    }

    fn log_offer_tx(
        tx: &Connection,
        entry: &TimetableEntry,
        offer: &SubstitutionOffer,
        action_type: ActionType,
        actor: &str,
    ) -> ApiResult<()> {
        let log = ActionLog::new(Some(entry.timetable_id.clone()), action_type, actor)
            .with_payload(offer)
            .with_detail(format!(
                "邀约{} {} {} -> {}",
                offer.offer_id,
                offer.sub_date,
                entry.time_label(),
                offer.status
            ));
        ActionLogRepository::insert_tx(tx, &log)?;
        Ok(())
    }
}
