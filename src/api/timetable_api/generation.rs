use super::*;

impl TimetableApi {
    /// 自动生成课表
    ///
    /// 先删后插在同一事务内完成；unassigned 非空时照常提交
    ///
    /// # 错误
    /// - NotFound: 课表不存在
    /// - StateError: 课表状态不允许生成（已审批/已发布）
    pub async fn generate_timetable(&self, timetable_id: &str, actor: &str) -> ApiResult<GenerationReport> {
        require_non_empty("timetable_id", timetable_id)?;
        require_non_empty("actor", actor)?;

        let guard = self.generation_locks.acquire(timetable_id).await?;
        let result = self.generate_locked(timetable_id, actor).await;
        drop(guard);
        self.generation_locks.prune(timetable_id);
        result
    }

    async fn generate_locked(&self, timetable_id: &str, actor: &str) -> ApiResult<GenerationReport> {
        // 配置在事务外读取（ConfigManager 与仓储共享连接）
        let catalog = self
            .config_manager
            .get_time_slot_catalog()
            .await
            .map_err(Self::config_error)?;
        let options = self
            .config_manager
            .get_generation_options()
            .await
            .map_err(Self::config_error)?;
        let snapshot = self
            .config_manager
            .get_config_snapshot()
            .map_err(Self::config_error)?;

        // 不跨 await 持有（计数为线程局部）
        let _perf = PerfGuard::new("generate_timetable").with_subject(timetable_id);
        let generator = TimetableGenerator::new(options);

        let report = run_in_transaction(&self.conn, |tx| -> ApiResult<GenerationReport> {
            let timetable = Self::load_tx(tx, timetable_id)?;
            if !timetable.status.allows_generation() {
                return Err(ApiError::StateError(format!(
                    "课表{}状态为{}，不允许重新生成",
                    timetable_id, timetable.status
                )));
            }

            let department = timetable.department_id.as_deref();
            let batches = ResourceRepository::find_batches_tx(tx, department, timetable.semester)?;
            let subjects = ResourceRepository::find_subjects_tx(tx, department, timetable.semester)?;
            let classrooms = ResourceRepository::find_classrooms_tx(tx)?;
            let eligibility = ResourceRepository::find_active_eligibility_tx(tx)?;
            let reserved = TimetableEntryRepository::find_published_weekly_excluding_tx(tx, timetable_id)?;

            let outcome = generator.generate(GenerationInput {
                timetable: &timetable,
                batches: &batches,
                subjects: &subjects,
                eligibility: &eligibility,
                classrooms: &classrooms,
                catalog: &catalog,
                reserved: &reserved,
            });

            let discarded = TimetableEntryRepository::delete_by_timetable_tx(tx, timetable_id)?;
            let created = TimetableEntryRepository::batch_insert_tx(tx, &outcome.entries)?;

            // 待审批课表重新生成后回到草稿
            let revision = TimetableRepository::mark_generated_tx(
                tx,
                timetable_id,
                timetable.revision,
                TimetableStatus::Draft,
                Some(&snapshot),
            )?;

            let report = GenerationReport {
                timetable_id: timetable_id.to_string(),
                revision,
                entries_created: created,
                entries_discarded: discarded,
                unassigned_count: outcome.unassigned_count(),
                unassigned: outcome.unassigned,
                stats: outcome.stats,
            };

            let log = ActionLog::new(Some(timetable_id.to_string()), ActionType::GenerateTimetable, actor)
                .with_payload(&serde_json::json!({
                    "entries_created": report.entries_created,
                    "entries_discarded": report.entries_discarded,
                    "unassigned_count": report.unassigned_count,
                    "batches": batches.len(),
                    "subjects": subjects.len(),
                    "classrooms": classrooms.len(),
                    "reserved": reserved.len(),
                }))
                .with_detail(format!(
                    "生成{}条明细，{}个单元未排",
                    report.entries_created, report.unassigned_count
                ));
            ActionLogRepository::insert_tx(tx, &log)?;

            Ok(report)
        })?;

        if report.unassigned_count > 0 {
            warn!(
                timetable_id = %timetable_id,
                unassigned_count = report.unassigned_count,
                "部分需求单元未排，需人工补排"
            );
        }
        info!(
            timetable_id = %timetable_id,
            entries_created = report.entries_created,
            entries_discarded = report.entries_discarded,
            revision = report.revision,
            "课表生成已提交"
        );

        Ok(report)
    }
}
