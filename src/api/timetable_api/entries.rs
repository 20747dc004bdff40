use super::*;

impl TimetableApi {
    /// 课表明细（含代课明细）
    pub fn list_entries(&self, timetable_id: &str) -> ApiResult<Vec<TimetableEntry>> {
        Ok(self.entry_repo.find_by_timetable(timetable_id)?)
    }

    /// 人工录入一条周明细
    ///
    /// 与本课表周明细及其他已发布课表冲突时拒绝，错误中带出冲突明细
    pub async fn add_manual_assignment(
        &self,
        timetable_id: &str,
        draft: EntryDraft,
        actor: &str,
    ) -> ApiResult<TimetableEntry> {
        require_non_empty("timetable_id", timetable_id)?;
        require_non_empty("actor", actor)?;

        let catalog = self
            .config_manager
            .get_time_slot_catalog()
            .await
            .map_err(Self::config_error)?;
        validate_entry_draft(&draft, &catalog)?;

        let _perf = PerfGuard::new("add_manual_assignment").with_subject(timetable_id);

        let entry = run_in_transaction(&self.conn, |tx| -> ApiResult<TimetableEntry> {
            let timetable = Self::load_tx(tx, timetable_id)?;
            if !timetable.is_editable() {
                return Err(ApiError::StateError(format!(
                    "课表{}已发布，不可新增周明细",
                    timetable_id
                )));
            }

            validate_entry_resources(tx, &draft)?;

            let eligibility = ResourceRepository::find_active_eligibility_tx(tx)?;
            let ranker = PreferenceRanker::from_eligibility(&eligibility);
            if !ranker.is_eligible(&draft.subject_id, &draft.faculty_id) {
                warn!(
                    subject_id = %draft.subject_id,
                    faculty_id = %draft.faculty_id,
                    "人工录入的教师无该课程授课资格"
                );
            }

            let mut existing = TimetableEntryRepository::find_weekly_by_timetable_tx(tx, timetable_id)?;
            existing.extend(TimetableEntryRepository::find_published_weekly_excluding_tx(tx, timetable_id)?);

            let claim = SlotClaim {
                day: draft.day,
                start: draft.start_time,
                end: draft.end_time,
                faculty_id: &draft.faculty_id,
                batch_id: &draft.batch_id,
                classroom_id: &draft.classroom_id,
            };
            let conflicts: Vec<TimetableEntry> = self
                .detector
                .find_conflicts(&existing, &claim)
                .into_iter()
                .cloned()
                .collect();
            if !conflicts.is_empty() {
                let ids: Vec<&str> = conflicts.iter().map(|e| e.entry_id.as_str()).collect();
                return Err(ApiError::Conflict {
                    message: format!("与已有明细冲突: {}", ids.join(", ")),
                    conflicts,
                });
            }

            let entry = draft
                .clone()
                .into_entry(uuid::Uuid::new_v4().to_string(), timetable_id.to_string());
            TimetableEntryRepository::insert_tx(tx, &entry)?;

            let log = ActionLog::new(Some(timetable_id.to_string()), ActionType::AddManualEntry, actor)
                .with_payload(&entry)
                .with_detail(format!("人工录入 {} {}", entry.subject_id, entry.time_label()));
            ActionLogRepository::insert_tx(tx, &log)?;

            Ok(entry)
        })?;

        info!(
            timetable_id = %timetable_id,
            entry_id = %entry.entry_id,
            slot = %entry.time_label(),
            "人工明细已录入"
        );
        Ok(entry)
    }

    /// 删除一条明细（仅发布前）
    pub fn remove_entry(&self, entry_id: &str, actor: &str) -> ApiResult<()> {
        require_non_empty("entry_id", entry_id)?;
        require_non_empty("actor", actor)?;

        let removed = run_in_transaction(&self.conn, |tx| -> ApiResult<TimetableEntry> {
            let entry = TimetableEntryRepository::find_by_id_tx(tx, entry_id)?
                .ok_or_else(|| ApiError::NotFound(format!("课表明细{}不存在", entry_id)))?;
            let timetable = Self::load_tx(tx, &entry.timetable_id)?;
            if !timetable.is_editable() {
                return Err(ApiError::StateError(format!(
                    "课表{}已发布，明细不可删除",
                    timetable.timetable_id
                )));
            }

            TimetableEntryRepository::delete_tx(tx, entry_id)?;

            let log = ActionLog::new(Some(entry.timetable_id.clone()), ActionType::RemoveEntry, actor)
                .with_payload(&entry)
                .with_detail(format!("删除明细 {}", entry.time_label()));
            ActionLogRepository::insert_tx(tx, &log)?;
            Ok(entry)
        })?;

        info!(timetable_id = %removed.timetable_id, entry_id = %entry_id, "明细已删除");
        Ok(())
    }
}
