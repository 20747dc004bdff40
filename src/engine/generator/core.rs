use super::outcome::{GenerationOutcome, GenerationStats, UnassignedReason, UnassignedUnit};
use crate::domain::catalog::{TimeSlot, TimeSlotCatalog};
use crate::domain::resource::{Batch, Classroom, FacultyEligibility, SessionRequirement, Subject};
use crate::domain::timetable::{Timetable, TimetableEntry};
use crate::domain::types::{DayOfWeek, EntrySource, ResourceKind, SessionKind};
use crate::engine::conflict::{ConflictDetector, SlotClaim};
use crate::engine::preference::{PreferenceRanker, RankedCandidate};
use crate::engine::slot_tracker::SlotAssignmentTracker;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

// ==========================================
// GenerationInput - 生成输入
// ==========================================
// 遍历顺序即输入顺序: 班级、课程、教室均按调用方给出的顺序
#[derive(Debug, Clone, Copy)]
pub struct GenerationInput<'a> {
    pub timetable: &'a Timetable,
    pub batches: &'a [Batch],
    pub subjects: &'a [Subject],
    pub eligibility: &'a [FacultyEligibility],
    pub classrooms: &'a [Classroom],
    pub catalog: &'a TimeSlotCatalog,
    /// 其他已发布课表的周明细（预占用，不输出）
    pub reserved: &'a [TimetableEntry],
}

// ==========================================
// GenerationOptions - 生成参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOptions {
    /// 理论/习题课优先普通教室，实验室兜底
    pub prefer_non_lab_for_theory: bool,
    /// 同一班级同一课程每日上限（0 = 不限）
    pub max_daily_sessions_per_subject: u32,
    /// 逐候选比对占用索引与冲突检测
    pub cross_check: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            prefer_non_lab_for_theory: true,
            max_daily_sessions_per_subject: 0,
            cross_check: false,
        }
    }
}

// ==========================================
// RunState - 单次生成的私有状态
// ==========================================
struct RunState<'a> {
    timetable_id: &'a str,
    tracker: SlotAssignmentTracker,
    entries: Vec<TimetableEntry>,
    daily: HashMap<(&'a str, &'a str, DayOfWeek), u32>,
    stats: GenerationStats,
}

impl<'a> RunState<'a> {
    fn daily_count(&self, batch: &'a Batch, subject: &'a Subject, day: DayOfWeek) -> u32 {
        self.daily
            .get(&(batch.batch_id.as_str(), subject.subject_id.as_str(), day))
            .copied()
            .unwrap_or(0)
    }

    #[allow(clippy::too_many_arguments)]
    fn commit(
        &mut self,
        batch: &'a Batch,
        subject: &'a Subject,
        kind: SessionKind,
        faculty_id: &str,
        classroom: &Classroom,
        day: DayOfWeek,
        slot: &TimeSlot,
    ) {
        let seq = self.entries.len() + 1;
        self.entries.push(TimetableEntry {
            entry_id: format!("{}-G{:04}", self.timetable_id, seq),
            timetable_id: self.timetable_id.to_string(),
            day,
            start_time: slot.start,
            end_time: slot.end,
            subject_id: subject.subject_id.clone(),
            faculty_id: faculty_id.to_string(),
            batch_id: batch.batch_id.clone(),
            classroom_id: classroom.classroom_id.clone(),
            kind,
            source: EntrySource::Generated,
            is_substitution: false,
            original_faculty_id: None,
            substitution_date: None,
        });
        self.tracker
            .occupy(faculty_id, &batch.batch_id, &classroom.classroom_id, day, slot.slot_no);
        *self
            .daily
            .entry((batch.batch_id.as_str(), subject.subject_id.as_str(), day))
            .or_insert(0) += 1;
    }
}

// ==========================================
// TimetableGenerator - 课表生成引擎
// ==========================================
pub struct TimetableGenerator {
    options: GenerationOptions,
    detector: ConflictDetector,
}

impl TimetableGenerator {
    pub fn new(options: GenerationOptions) -> Self {
        Self {
            options,
            detector: ConflictDetector::new(),
        }
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    /// 需求展开: 课程面向班级时，每个课型按周学时各生成一条需求
    pub fn derive_requirements(&self, batches: &[Batch], subjects: &[Subject]) -> Vec<SessionRequirement> {
        Self::requirement_units(batches, subjects)
            .into_iter()
            .map(|(batch, subject, kind, count)| SessionRequirement {
                subject_id: subject.subject_id.clone(),
                batch_id: batch.batch_id.clone(),
                kind,
                count_per_week: count,
            })
            .collect()
    }

    fn requirement_units<'a>(
        batches: &'a [Batch],
        subjects: &'a [Subject],
    ) -> Vec<(&'a Batch, &'a Subject, SessionKind, u32)> {
        let mut units = Vec::new();
        for batch in batches {
            for subject in subjects.iter().filter(|s| s.applies_to(batch)) {
                for kind in SessionKind::ALL {
                    let count = subject.weekly_sessions(kind);
                    if count > 0 {
                        units.push((batch, subject, kind, count));
                    }
                }
            }
        }
        units
    }

    /// 可用教室（按尝试顺序）
    ///
    /// - 实验课: 仅实验室
    /// - 理论/习题课: 开启偏好时普通教室在前、实验室在后；否则按目录顺序
    /// - 均要求容量 >= 班级人数
    pub fn compatible_classrooms<'c>(
        &self,
        classrooms: &'c [Classroom],
        batch: &Batch,
        kind: SessionKind,
    ) -> Vec<&'c Classroom> {
        let fitting = classrooms
            .iter()
            .filter(|c| c.fits(batch) && c.supports(kind));

        if kind.requires_lab() || !self.options.prefer_non_lab_for_theory {
            return fitting.collect();
        }

        let (regular, labs): (Vec<&Classroom>, Vec<&Classroom>) = fitting.partition(|c| !c.is_lab);
        regular.into_iter().chain(labs).collect()
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 生成课表明细
    ///
    /// 对每个需求单元依次遍历 星期 → 时间片 → 候选教师（偏好降序）→ 教室，
    /// 第一个三方资源都空闲的组合即提交，不回溯。
    #[instrument(skip(self, input), fields(
        timetable_id = %input.timetable.timetable_id,
        batches = input.batches.len(),
        subjects = input.subjects.len(),
        classrooms = input.classrooms.len(),
        reserved = input.reserved.len()
    ))]
    pub fn generate(&self, input: GenerationInput<'_>) -> GenerationOutcome {
        let ranker = PreferenceRanker::from_eligibility(input.eligibility);
        let mut run = RunState {
            timetable_id: &input.timetable.timetable_id,
            tracker: SlotAssignmentTracker::new(),
            entries: Vec::new(),
            daily: HashMap::new(),
            stats: GenerationStats::default(),
        };
        let mut unassigned = Vec::new();

        // 1. 预占用其他已发布课表
        for entry in input.reserved.iter().filter(|e| e.is_weekly()) {
            run.stats.reserved_slots += run.tracker.reserve_entry(entry, input.catalog) as u32;
        }

        // 2. 逐需求单元放置
        for (batch, subject, kind, count) in Self::requirement_units(input.batches, input.subjects) {
            let candidates = ranker.rank(&subject.subject_id);
            let rooms = self.compatible_classrooms(input.classrooms, batch, kind);

            for unit_index in 0..count {
                run.stats.requirement_units += 1;

                let reason = if candidates.is_empty() {
                    Some(UnassignedReason::NoEligibleFaculty)
                } else if rooms.is_empty() {
                    Some(UnassignedReason::NoCompatibleClassroom)
                } else if !self.place_unit(&input, &mut run, batch, subject, kind, candidates, &rooms) {
                    Some(UnassignedReason::NoFreeSlot)
                } else {
                    None
                };

                if let Some(reason) = reason {
                    debug!(
                        batch_id = %batch.batch_id,
                        subject_id = %subject.subject_id,
                        kind = %kind,
                        unit_index,
                        reason = %reason,
                        "需求单元未排"
                    );
                    unassigned.push(UnassignedUnit {
                        batch_id: batch.batch_id.clone(),
                        subject_id: subject.subject_id.clone(),
                        kind,
                        unit_index,
                        reason,
                    });
                }
            }
        }

        if run.stats.cross_check_mismatches > 0 {
            warn!(
                mismatches = run.stats.cross_check_mismatches,
                "占用索引与冲突检测结论不一致"
            );
        }

        info!(
            entries_created = run.entries.len(),
            unassigned_count = unassigned.len(),
            requirement_units = run.stats.requirement_units,
            candidates_examined = run.stats.candidates_examined,
            "课表生成完成"
        );

        GenerationOutcome {
            entries: run.entries,
            unassigned,
            stats: run.stats,
        }
    }

    /// 放置一个需求单元；成功返回 true
    #[allow(clippy::too_many_arguments)]
    fn place_unit<'a>(
        &self,
        input: &GenerationInput<'a>,
        run: &mut RunState<'a>,
        batch: &'a Batch,
        subject: &'a Subject,
        kind: SessionKind,
        candidates: &[RankedCandidate],
        rooms: &[&Classroom],
    ) -> bool {
        let cross_check = self.options.cross_check;
        let daily_limit = self.options.max_daily_sessions_per_subject;

        for &day in input.catalog.days() {
            if daily_limit > 0 && run.daily_count(batch, subject, day) >= daily_limit {
                continue;
            }

            for slot in input.catalog.slots() {
                // 班级占用与教师无关，先判定可提前剪枝
                let batch_free = run
                    .tracker
                    .is_free(ResourceKind::Batch, &batch.batch_id, day, slot.slot_no);
                if !batch_free && !cross_check {
                    run.stats.candidates_examined += 1;
                    continue;
                }

                for candidate in candidates {
                    let faculty_free = run.tracker.is_free(
                        ResourceKind::Faculty,
                        &candidate.faculty_id,
                        day,
                        slot.slot_no,
                    );
                    if !faculty_free && !cross_check {
                        run.stats.candidates_examined += 1;
                        continue;
                    }

                    for room in rooms {
                        run.stats.candidates_examined += 1;
                        let tracker_free = batch_free
                            && faculty_free
                            && run.tracker.is_free(
                                ResourceKind::Classroom,
                                &room.classroom_id,
                                day,
                                slot.slot_no,
                            );

                        if cross_check {
                            let claim = SlotClaim {
                                day,
                                start: slot.start,
                                end: slot.end,
                                faculty_id: &candidate.faculty_id,
                                batch_id: &batch.batch_id,
                                classroom_id: &room.classroom_id,
                            };
                            let detector_free = !self.detector.has_conflict(input.reserved, &claim)
                                && !self.detector.has_conflict(&run.entries, &claim);
                            if detector_free != tracker_free {
                                run.stats.cross_check_mismatches += 1;
                                warn!(
                                    day = %day,
                                    slot = %slot.label(),
                                    faculty_id = %candidate.faculty_id,
                                    batch_id = %batch.batch_id,
                                    classroom_id = %room.classroom_id,
                                    tracker_free,
                                    detector_free,
                                    "交叉校验不一致"
                                );
                            }
                        }

                        if tracker_free {
                            run.commit(batch, subject, kind, &candidate.faculty_id, room, day, slot);
                            return true;
                        }
                    }
                }
            }
        }

        false
    }
}

impl Default for TimetableGenerator {
    fn default() -> Self {
        Self::new(GenerationOptions::default())
    }
}
