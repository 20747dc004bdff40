// ==========================================
// 教学排课系统 - 教学资源领域模型
// ==========================================
// 职责: 教师 / 教室 / 课程 / 班级 / 教师-课程资格
// 说明: 资源的增删改由外部实体服务负责，本系统只读取
// ==========================================

use crate::domain::types::SessionKind;
use serde::{Deserialize, Serialize};

// ==========================================
// Faculty - 教师
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faculty {
    pub faculty_id: String,            // 教师ID
    pub name: String,                  // 姓名
    pub email: Option<String>,         // 通知联系方式
    pub department_id: Option<String>, // 所属院系
    pub is_active: bool,               // 是否在岗
}

// ==========================================
// Classroom - 教室
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classroom {
    pub classroom_id: String, // 教室ID
    pub name: String,         // 名称
    pub capacity: u32,        // 容量（座位数）
    pub is_lab: bool,         // 是否实验室
}

impl Classroom {
    /// 容量是否足够容纳班级
    pub fn fits(&self, batch: &Batch) -> bool {
        self.capacity >= batch.strength
    }

    /// 课型与教室类型是否硬兼容（实验课必须实验室）
    pub fn supports(&self, kind: SessionKind) -> bool {
        !kind.requires_lab() || self.is_lab
    }
}

// ==========================================
// Batch - 班级
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: String,              // 班级ID
    pub name: String,                  // 名称（如 CS-2A）
    pub department_id: Option<String>, // 所属院系
    pub semester: i32,                 // 学期
    pub strength: u32,                 // 人数
}

// ==========================================
// Subject - 课程
// ==========================================
// 周学时配置: 理论 / 习题 / 实验 各自独立展开为排课需求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub subject_id: String,            // 课程ID
    pub code: String,                  // 课程代码（如 DS101）
    pub name: String,                  // 课程名称
    pub department_id: Option<String>, // 开课院系
    pub semester: i32,                 // 开课学期
    pub lecture_hours: u32,            // 理论周学时
    pub tutorial_hours: u32,           // 习题周学时
    pub practical_hours: u32,          // 实验周学时
}

impl Subject {
    /// 某课型的周课次（每课次占用一个时间片）
    pub fn weekly_sessions(&self, kind: SessionKind) -> u32 {
        match kind {
            SessionKind::Lecture => self.lecture_hours,
            SessionKind::Tutorial => self.tutorial_hours,
            SessionKind::Practical => self.practical_hours,
        }
    }

    /// 课程是否面向该班级（院系与学期一致）
    pub fn applies_to(&self, batch: &Batch) -> bool {
        self.semester == batch.semester && self.department_id == batch.department_id
    }
}

// ==========================================
// FacultyEligibility - 教师授课资格
// ==========================================
// preference_rank: 1-10，越大越优先
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacultyEligibility {
    pub faculty_id: String,
    pub subject_id: String,
    pub preference_rank: u8,
    pub is_active: bool,
}

/// 偏好分合法区间
pub const PREFERENCE_RANK_MIN: u8 = 1;
pub const PREFERENCE_RANK_MAX: u8 = 10;

impl FacultyEligibility {
    pub fn has_valid_rank(&self) -> bool {
        (PREFERENCE_RANK_MIN..=PREFERENCE_RANK_MAX).contains(&self.preference_rank)
    }
}

// ==========================================
// SessionRequirement - 排课需求
// ==========================================
// 由课程周学时配置派生，不持久化
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRequirement {
    pub subject_id: String,
    pub batch_id: String,
    pub kind: SessionKind,
    pub count_per_week: u32,
}
