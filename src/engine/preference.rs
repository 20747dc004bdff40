// ==========================================
// 教学排课系统 - 教师偏好排序引擎
// ==========================================
// 职责: 按课程给出候选教师，偏好分降序
// 规则: 仅有效资格（is_active 且偏好分 1-10）参与排序
//       同分保持输入顺序（稳定排序），无随机
// ==========================================

use crate::domain::resource::FacultyEligibility;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// 候选教师
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub faculty_id: String,
    pub preference_rank: u8,
}

// ==========================================
// PreferenceRanker - 偏好排序引擎
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct PreferenceRanker {
    by_subject: HashMap<String, Vec<RankedCandidate>>,
}

impl PreferenceRanker {
    /// 从资格列表构建索引
    ///
    /// 同一 (教师, 课程) 重复出现时以首条为准。
    pub fn from_eligibility(eligibility: &[FacultyEligibility]) -> Self {
        let mut by_subject: HashMap<String, Vec<RankedCandidate>> = HashMap::new();

        for row in eligibility.iter().filter(|r| r.is_active) {
            if !row.has_valid_rank() {
                warn!(
                    faculty_id = %row.faculty_id,
                    subject_id = %row.subject_id,
                    preference_rank = row.preference_rank,
                    "偏好分越界，忽略该资格"
                );
                continue;
            }
            let candidates = by_subject.entry(row.subject_id.clone()).or_default();
            if candidates.iter().any(|c| c.faculty_id == row.faculty_id) {
                continue;
            }
            candidates.push(RankedCandidate {
                faculty_id: row.faculty_id.clone(),
                preference_rank: row.preference_rank,
            });
        }

        // sort_by 为稳定排序: 同分保持输入顺序
        for candidates in by_subject.values_mut() {
            candidates.sort_by(|a, b| b.preference_rank.cmp(&a.preference_rank));
        }

        Self { by_subject }
    }

    /// 课程的全部候选教师（偏好降序）
    pub fn rank(&self, subject_id: &str) -> &[RankedCandidate] {
        self.by_subject
            .get(subject_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 排除指定教师后的候选
    pub fn rank_excluding(&self, subject_id: &str, excluded: &[&str]) -> Vec<RankedCandidate> {
        self.rank(subject_id)
            .iter()
            .filter(|c| !excluded.contains(&c.faculty_id.as_str()))
            .cloned()
            .collect()
    }

    /// 排除指定教师后的首选
    pub fn next_candidate(&self, subject_id: &str, excluded: &[&str]) -> Option<&RankedCandidate> {
        self.rank(subject_id)
            .iter()
            .find(|c| !excluded.contains(&c.faculty_id.as_str()))
    }

    pub fn is_eligible(&self, subject_id: &str, faculty_id: &str) -> bool {
        self.rank(subject_id).iter().any(|c| c.faculty_id == faculty_id)
    }
}
