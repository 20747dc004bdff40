// ==========================================
// 教学排课系统 - 代课级联引擎
// ==========================================
// 职责: 请假通过后规划代课邀约；按事件驱动单条邀约的状态机
// 状态机:
//   PENDING -[接受]-> ACCEPTED
//   PENDING -[指派]-> ASSIGNED
//   PENDING -[拒绝]-> DECLINED + 新 PENDING（下一候选）
//   PENDING -[拒绝, 无候选]-> PENDING（代课人清空，待人工指派）
//   任意活跃状态 -[请假撤销/驳回]-> CANCELLED
// 红线: 接受/指派时必须在提交事务内重新做冲突检测
// 红线: 引擎只产出迁移结果，不落库
// ==========================================

use crate::domain::leave::LeaveRequest;
use crate::domain::substitution::SubstitutionOffer;
use crate::domain::timetable::TimetableEntry;
use crate::domain::types::{ActingRole, DayOfWeek, OfferStatus};
use crate::engine::conflict::{ConflictDetector, SlotClaim};
use crate::engine::preference::PreferenceRanker;
use chrono::{Datelike, NaiveDate};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, instrument};

// ==========================================
// 事件与迁移结果
// ==========================================

/// 作用于单条邀约的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferEvent<'a> {
    Accept { faculty_id: &'a str },
    Decline { faculty_id: &'a str },
    Assign { faculty_id: &'a str, role: ActingRole },
    Cancel,
}

/// 迁移结果（由调用方落库）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferTransition {
    /// 候选人接受
    Accepted { substitute_faculty_id: String },
    /// 管理员指派
    Assigned {
        substitute_faculty_id: String,
        role: ActingRole,
    },
    /// 拒绝后转给下一候选: 原邀约 DECLINED，新建 PENDING
    Reoffered {
        declined_faculty_id: String,
        next_faculty_id: String,
    },
    /// 拒绝后无候选: 原邀约保持 PENDING，代课人清空
    Exhausted { declined_faculty_id: String },
    /// 请假撤销/驳回
    Cancelled,
}

impl OfferTransition {
    /// 迁移后原邀约的状态
    pub fn resulting_status(&self) -> OfferStatus {
        match self {
            OfferTransition::Accepted { .. } => OfferStatus::Accepted,
            OfferTransition::Assigned { .. } => OfferStatus::Assigned,
            OfferTransition::Reoffered { .. } => OfferStatus::Declined,
            OfferTransition::Exhausted { .. } => OfferStatus::Pending,
            OfferTransition::Cancelled => OfferStatus::Cancelled,
        }
    }
}

// ==========================================
// CascadeError - 迁移失败
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CascadeError {
    #[error("邀约{offer_id}当前状态为{status}，不可响应")]
    NotPending { offer_id: String, status: OfferStatus },

    #[error("邀约{offer_id}已结束（{status}）")]
    AlreadyClosed { offer_id: String, status: OfferStatus },

    #[error("教师{faculty_id}不是邀约{offer_id}的当前候选人")]
    NotAddressedCandidate { offer_id: String, faculty_id: String },

    #[error("请假教师{faculty_id}不能为自己代课")]
    OriginalFacultyCannotSubstitute { faculty_id: String },

    #[error("教师{faculty_id}在{date}存在{}条冲突课程", .conflicts.len())]
    ScheduleConflict {
        faculty_id: String,
        date: NaiveDate,
        conflicts: Vec<TimetableEntry>,
    },
}

// ==========================================
// CascadeContext - 迁移所需的外部状态
// ==========================================
pub struct CascadeContext<'a> {
    /// 邀约对应的原课表明细
    pub entry: &'a TimetableEntry,
    /// 事件中教师在邀约日期的已承担课程（周明细 + 当日代课明细）
    pub substitute_schedule: &'a [TimetableEntry],
    pub ranker: &'a PreferenceRanker,
}

// ==========================================
// PlannedOffer - 请假通过后待创建的邀约
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOffer {
    pub entry_id: String,
    pub subject_id: String,
    pub sub_date: NaiveDate,
    pub substitute_faculty_id: Option<String>,
    /// 全部候选（偏好降序，不含请假教师），用于通知
    pub ranked_candidates: Vec<String>,
}

// ==========================================
// SubstitutionCascade - 代课级联引擎
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstitutionCascade {
    detector: ConflictDetector,
}

impl SubstitutionCascade {
    pub fn new() -> Self {
        Self {
            detector: ConflictDetector::new(),
        }
    }

    /// 请假通过: 为每个 (受影响明细, 具体日期) 规划一条邀约
    ///
    /// # 参数
    /// - `entries`: 请假教师在已发布课表中的周明细，以及请假期间其承担的代课明细
    /// - `already_active`: 已存在活跃邀约的 (明细, 日期)，重复触发时跳过
    ///
    /// # 返回
    /// 按日期、开始时间、明细ID排序的邀约计划
    #[instrument(skip(self, entries, ranker, already_active), fields(
        leave_id = %leave.leave_id,
        faculty_id = %leave.faculty_id,
        start_date = %leave.start_date,
        end_date = %leave.end_date
    ))]
    pub fn plan_offers(
        &self,
        leave: &LeaveRequest,
        entries: &[TimetableEntry],
        ranker: &PreferenceRanker,
        already_active: &HashSet<(String, NaiveDate)>,
    ) -> Vec<PlannedOffer> {
        let mut affected: Vec<&TimetableEntry> = entries
            .iter()
            .filter(|e| e.faculty_id == leave.faculty_id)
            .collect();
        affected.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then_with(|| a.entry_id.cmp(&b.entry_id))
        });

        let mut planned = Vec::new();
        for date in leave.dates() {
            let day = DayOfWeek::from(date.weekday());
            let on_date = affected.iter().filter(|e| match e.substitution_date {
                Some(sub_date) => sub_date == date,
                None => e.day == day,
            });
            for entry in on_date {
                if already_active.contains(&(entry.entry_id.clone(), date)) {
                    debug!(entry_id = %entry.entry_id, date = %date, "已存在活跃邀约，跳过");
                    continue;
                }

                // 代课明细的原任课教师当天同样缺席
                let mut excluded = vec![leave.faculty_id.as_str()];
                excluded.extend(entry.original_faculty_id.as_deref());

                let ranked: Vec<String> = ranker
                    .rank_excluding(&entry.subject_id, &excluded)
                    .into_iter()
                    .map(|c| c.faculty_id)
                    .collect();

                planned.push(PlannedOffer {
                    entry_id: entry.entry_id.clone(),
                    subject_id: entry.subject_id.clone(),
                    sub_date: date,
                    substitute_faculty_id: ranked.first().cloned(),
                    ranked_candidates: ranked,
                });
            }
        }

        info!(offers_planned = planned.len(), "代课邀约规划完成");
        planned
    }

    /// 驱动单条邀约的状态机
    pub fn apply(
        &self,
        offer: &SubstitutionOffer,
        event: OfferEvent<'_>,
        ctx: &CascadeContext<'_>,
    ) -> Result<OfferTransition, CascadeError> {
        match event {
            OfferEvent::Cancel => self.cancel(offer),
            OfferEvent::Accept { faculty_id } => {
                self.ensure_pending(offer)?;
                if let Some(addressed) = offer.substitute_faculty_id.as_deref() {
                    if addressed != faculty_id {
                        return Err(CascadeError::NotAddressedCandidate {
                            offer_id: offer.offer_id.clone(),
                            faculty_id: faculty_id.to_string(),
                        });
                    }
                }
                self.ensure_can_cover(offer, faculty_id, ctx)?;
                Ok(OfferTransition::Accepted {
                    substitute_faculty_id: faculty_id.to_string(),
                })
            }
            OfferEvent::Decline { faculty_id } => {
                self.ensure_pending(offer)?;
                if offer.substitute_faculty_id.as_deref() != Some(faculty_id) {
                    return Err(CascadeError::NotAddressedCandidate {
                        offer_id: offer.offer_id.clone(),
                        faculty_id: faculty_id.to_string(),
                    });
                }

                let mut excluded: Vec<&str> =
                    offer.declined_faculty_ids.iter().map(String::as_str).collect();
                excluded.push(faculty_id);
                excluded.push(&offer.original_faculty_id);
                excluded.extend(ctx.entry.original_faculty_id.as_deref());

                match ctx.ranker.next_candidate(&ctx.entry.subject_id, &excluded) {
                    Some(next) => Ok(OfferTransition::Reoffered {
                        declined_faculty_id: faculty_id.to_string(),
                        next_faculty_id: next.faculty_id.clone(),
                    }),
                    None => Ok(OfferTransition::Exhausted {
                        declined_faculty_id: faculty_id.to_string(),
                    }),
                }
            }
            OfferEvent::Assign { faculty_id, role } => {
                self.ensure_pending(offer)?;
                self.ensure_can_cover(offer, faculty_id, ctx)?;
                Ok(OfferTransition::Assigned {
                    substitute_faculty_id: faculty_id.to_string(),
                    role,
                })
            }
        }
    }

    fn cancel(&self, offer: &SubstitutionOffer) -> Result<OfferTransition, CascadeError> {
        if offer.status.is_active() {
            Ok(OfferTransition::Cancelled)
        } else {
            Err(CascadeError::AlreadyClosed {
                offer_id: offer.offer_id.clone(),
                status: offer.status,
            })
        }
    }

    fn ensure_pending(&self, offer: &SubstitutionOffer) -> Result<(), CascadeError> {
        if offer.status == OfferStatus::Pending {
            Ok(())
        } else {
            Err(CascadeError::NotPending {
                offer_id: offer.offer_id.clone(),
                status: offer.status,
            })
        }
    }

    /// 代课人不能是请假教师（或被代课明细的原任课教师），且在该日期不得与已承担课程冲突
    fn ensure_can_cover(
        &self,
        offer: &SubstitutionOffer,
        faculty_id: &str,
        ctx: &CascadeContext<'_>,
    ) -> Result<(), CascadeError> {
        if faculty_id == offer.original_faculty_id
            || ctx.entry.original_faculty_id.as_deref() == Some(faculty_id)
        {
            return Err(CascadeError::OriginalFacultyCannotSubstitute {
                faculty_id: faculty_id.to_string(),
            });
        }

        let claim = SlotClaim::for_substitute(ctx.entry, faculty_id);
        let conflicts: Vec<TimetableEntry> = self
            .detector
            .find_conflicts_on_date(ctx.substitute_schedule, offer.sub_date, &claim)
            .into_iter()
            // 原明细本身（班级/教室相同）不算冲突
            .filter(|e| e.entry_id != ctx.entry.entry_id)
            .cloned()
            .collect();

        if conflicts.is_empty() {
            Ok(())
        } else {
            Err(CascadeError::ScheduleConflict {
                faculty_id: faculty_id.to_string(),
                date: offer.sub_date,
                conflicts,
            })
        }
    }
}
