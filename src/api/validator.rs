// ==========================================
// 教学排课系统 - 输入校验
// ==========================================
// 职责: 在任何分配逻辑运行前拒绝缺失/非法输入
// 分两段: 纯字段校验（无 IO）+ 引用实体校验（调用方事务内）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::catalog::TimeSlotCatalog;
use crate::domain::timetable::EntryDraft;
use crate::repository::resource_repo::ResourceRepository;
use chrono::NaiveDate;
use rusqlite::Connection;

/// 必填字符串
pub fn require_non_empty(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::ValidationError(format!("{}不能为空", field)));
    }
    Ok(())
}

/// 人工明细的字段校验
///
/// - 各ID非空
/// - start < end
/// - 星期属于工作日
pub fn validate_entry_draft(draft: &EntryDraft, catalog: &TimeSlotCatalog) -> ApiResult<()> {
    require_non_empty("subject_id", &draft.subject_id)?;
    require_non_empty("faculty_id", &draft.faculty_id)?;
    require_non_empty("batch_id", &draft.batch_id)?;
    require_non_empty("classroom_id", &draft.classroom_id)?;

    if draft.start_time >= draft.end_time {
        return Err(ApiError::ValidationError(format!(
            "开始时间{}必须早于结束时间{}",
            draft.start_time.format("%H:%M"),
            draft.end_time.format("%H:%M")
        )));
    }
    if !catalog.is_working_day(draft.day) {
        return Err(ApiError::ValidationError(format!("{}不是工作日", draft.day)));
    }
    Ok(())
}

/// 引用实体校验
///
/// - 课程/教师/班级/教室存在（NotFound）
/// - 实验课必须使用实验室；教室容量不小于班级人数（ValidationError）
pub fn validate_entry_resources(tx: &Connection, draft: &EntryDraft) -> ApiResult<()> {
    if ResourceRepository::find_subject_tx(tx, &draft.subject_id)?.is_none() {
        return Err(ApiError::NotFound(format!("课程{}不存在", draft.subject_id)));
    }
    if ResourceRepository::find_faculty_tx(tx, &draft.faculty_id)?.is_none() {
        return Err(ApiError::NotFound(format!("教师{}不存在", draft.faculty_id)));
    }
    let batch = ResourceRepository::find_batch_tx(tx, &draft.batch_id)?
        .ok_or_else(|| ApiError::NotFound(format!("班级{}不存在", draft.batch_id)))?;
    let classroom = ResourceRepository::find_classroom_tx(tx, &draft.classroom_id)?
        .ok_or_else(|| ApiError::NotFound(format!("教室{}不存在", draft.classroom_id)))?;

    if !classroom.supports(draft.kind) {
        return Err(ApiError::ValidationError(format!(
            "{}课必须安排在实验室，教室{}不是实验室",
            draft.kind, classroom.classroom_id
        )));
    }
    if !classroom.fits(&batch) {
        return Err(ApiError::ValidationError(format!(
            "教室{}容量{}小于班级{}人数{}",
            classroom.classroom_id, classroom.capacity, batch.batch_id, batch.strength
        )));
    }

    Ok(())
}

/// 请假日期区间
pub fn validate_leave_range(start_date: NaiveDate, end_date: NaiveDate) -> ApiResult<()> {
    if start_date > end_date {
        return Err(ApiError::ValidationError(format!(
            "请假起始日期{}晚于结束日期{}",
            start_date, end_date
        )));
    }
    Ok(())
}
