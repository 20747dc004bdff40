// ==========================================
// 教学排课系统 - 教学资源仓储
// ==========================================
// 资源（教师/教室/课程/班级/任课资格）由实体服务维护
// 本仓储提供按院系+学期的过滤查询，以及导入/种子数据使用的 upsert
// ==========================================

use crate::domain::resource::{Batch, Classroom, Faculty, FacultyEligibility, Subject};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

pub struct ResourceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ResourceRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 生成输入（均按稳定顺序返回）
    // ==========================================

    /// 班级: department_id 为 None 时不按院系过滤
    pub fn find_batches_tx(
        tx: &Connection,
        department_id: Option<&str>,
        semester: i32,
    ) -> RepositoryResult<Vec<Batch>> {
        let mut stmt = tx.prepare(
            r#"SELECT batch_id, name, department_id, semester, strength
               FROM batch
               WHERE (?1 IS NULL OR department_id = ?1) AND semester = ?2
               ORDER BY batch_id"#,
        )?;
        let rows = stmt
            .query_map(params![department_id, semester], Self::map_batch)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn find_subjects_tx(
        tx: &Connection,
        department_id: Option<&str>,
        semester: i32,
    ) -> RepositoryResult<Vec<Subject>> {
        let mut stmt = tx.prepare(
            r#"SELECT subject_id, code, name, department_id, semester,
                      lecture_hours, tutorial_hours, practical_hours
               FROM subject
               WHERE (?1 IS NULL OR department_id = ?1) AND semester = ?2
               ORDER BY code"#,
        )?;
        let rows = stmt
            .query_map(params![department_id, semester], Self::map_subject)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 教室目录（目录顺序 = classroom_id 升序）
    pub fn find_classrooms_tx(tx: &Connection) -> RepositoryResult<Vec<Classroom>> {
        let mut stmt = tx.prepare(
            "SELECT classroom_id, name, capacity, is_lab FROM classroom ORDER BY classroom_id",
        )?;
        let rows = stmt
            .query_map([], Self::map_classroom)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 有效任课资格（资格行与教师均在岗）
    ///
    /// 按录入顺序返回，偏好同分时以此为稳定次序
    pub fn find_active_eligibility_tx(tx: &Connection) -> RepositoryResult<Vec<FacultyEligibility>> {
        let mut stmt = tx.prepare(
            r#"SELECT fs.faculty_id, fs.subject_id, fs.preference_rank, fs.is_active
               FROM faculty_subject fs
               JOIN faculty f ON f.faculty_id = fs.faculty_id
               WHERE fs.is_active = 1 AND f.is_active = 1
               ORDER BY fs.rowid"#,
        )?;
        let rows = stmt
            .query_map([], Self::map_eligibility)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn find_active_eligibility(&self) -> RepositoryResult<Vec<FacultyEligibility>> {
        let conn = self.get_conn()?;
        Self::find_active_eligibility_tx(&conn)
    }

    // ==========================================
    // 按ID查询
    // ==========================================

    pub fn find_faculty_tx(tx: &Connection, faculty_id: &str) -> RepositoryResult<Option<Faculty>> {
        Ok(tx
            .query_row(
                "SELECT faculty_id, name, email, department_id, is_active FROM faculty WHERE faculty_id = ?",
                params![faculty_id],
                Self::map_faculty,
            )
            .optional()?)
    }

    pub fn find_batch_tx(tx: &Connection, batch_id: &str) -> RepositoryResult<Option<Batch>> {
        Ok(tx
            .query_row(
                "SELECT batch_id, name, department_id, semester, strength FROM batch WHERE batch_id = ?",
                params![batch_id],
                Self::map_batch,
            )
            .optional()?)
    }

    pub fn find_subject_tx(tx: &Connection, subject_id: &str) -> RepositoryResult<Option<Subject>> {
        Ok(tx
            .query_row(
                r#"SELECT subject_id, code, name, department_id, semester,
                          lecture_hours, tutorial_hours, practical_hours
                   FROM subject WHERE subject_id = ?"#,
                params![subject_id],
                Self::map_subject,
            )
            .optional()?)
    }

    pub fn find_classroom_tx(tx: &Connection, classroom_id: &str) -> RepositoryResult<Option<Classroom>> {
        Ok(tx
            .query_row(
                "SELECT classroom_id, name, capacity, is_lab FROM classroom WHERE classroom_id = ?",
                params![classroom_id],
                Self::map_classroom,
            )
            .optional()?)
    }

    // ==========================================
    // 写入（导入/种子数据）
    // ==========================================

    pub fn upsert_faculty(&self, faculty: &Faculty) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO faculty (faculty_id, name, email, department_id, is_active)
               VALUES (?1, ?2, ?3, ?4, ?5)
               ON CONFLICT(faculty_id) DO UPDATE SET
                   name = excluded.name, email = excluded.email,
                   department_id = excluded.department_id, is_active = excluded.is_active"#,
            params![
                faculty.faculty_id,
                faculty.name,
                faculty.email,
                faculty.department_id,
                faculty.is_active
            ],
        )?;
        Ok(())
    }

    pub fn upsert_classroom(&self, classroom: &Classroom) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO classroom (classroom_id, name, capacity, is_lab)
               VALUES (?1, ?2, ?3, ?4)
               ON CONFLICT(classroom_id) DO UPDATE SET
                   name = excluded.name, capacity = excluded.capacity, is_lab = excluded.is_lab"#,
            params![
                classroom.classroom_id,
                classroom.name,
                classroom.capacity,
                classroom.is_lab
            ],
        )?;
        Ok(())
    }

    pub fn upsert_subject(&self, subject: &Subject) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO subject (subject_id, code, name, department_id, semester,
                                   lecture_hours, tutorial_hours, practical_hours)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
               ON CONFLICT(subject_id) DO UPDATE SET
                   code = excluded.code, name = excluded.name,
                   department_id = excluded.department_id, semester = excluded.semester,
                   lecture_hours = excluded.lecture_hours,
                   tutorial_hours = excluded.tutorial_hours,
                   practical_hours = excluded.practical_hours"#,
            params![
                subject.subject_id,
                subject.code,
                subject.name,
                subject.department_id,
                subject.semester,
                subject.lecture_hours,
                subject.tutorial_hours,
                subject.practical_hours
            ],
        )?;
        Ok(())
    }

    pub fn upsert_batch(&self, batch: &Batch) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO batch (batch_id, name, department_id, semester, strength)
               VALUES (?1, ?2, ?3, ?4, ?5)
               ON CONFLICT(batch_id) DO UPDATE SET
                   name = excluded.name, department_id = excluded.department_id,
                   semester = excluded.semester, strength = excluded.strength"#,
            params![
                batch.batch_id,
                batch.name,
                batch.department_id,
                batch.semester,
                batch.strength
            ],
        )?;
        Ok(())
    }

    pub fn upsert_eligibility(&self, eligibility: &FacultyEligibility) -> RepositoryResult<()> {
        if !eligibility.has_valid_rank() {
            return Err(RepositoryError::FieldValueError {
                field: "preference_rank".to_string(),
                message: format!("超出范围: {}", eligibility.preference_rank),
            });
        }
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO faculty_subject (faculty_id, subject_id, preference_rank, is_active)
               VALUES (?1, ?2, ?3, ?4)
               ON CONFLICT(faculty_id, subject_id) DO UPDATE SET
                   preference_rank = excluded.preference_rank, is_active = excluded.is_active"#,
            params![
                eligibility.faculty_id,
                eligibility.subject_id,
                eligibility.preference_rank,
                eligibility.is_active
            ],
        )?;
        Ok(())
    }

    // ==========================================
    // 行映射
    // ==========================================

    fn map_faculty(row: &rusqlite::Row) -> rusqlite::Result<Faculty> {
        Ok(Faculty {
            faculty_id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            department_id: row.get(3)?,
            is_active: row.get(4)?,
        })
    }

    fn map_classroom(row: &rusqlite::Row) -> rusqlite::Result<Classroom> {
        Ok(Classroom {
            classroom_id: row.get(0)?,
            name: row.get(1)?,
            capacity: row.get(2)?,
            is_lab: row.get(3)?,
        })
    }

    fn map_batch(row: &rusqlite::Row) -> rusqlite::Result<Batch> {
        Ok(Batch {
            batch_id: row.get(0)?,
            name: row.get(1)?,
            department_id: row.get(2)?,
            semester: row.get(3)?,
            strength: row.get(4)?,
        })
    }

    fn map_subject(row: &rusqlite::Row) -> rusqlite::Result<Subject> {
        Ok(Subject {
            subject_id: row.get(0)?,
            code: row.get(1)?,
            name: row.get(2)?,
            department_id: row.get(3)?,
            semester: row.get(4)?,
            lecture_hours: row.get(5)?,
            tutorial_hours: row.get(6)?,
            practical_hours: row.get(7)?,
        })
    }

    fn map_eligibility(row: &rusqlite::Row) -> rusqlite::Result<FacultyEligibility> {
        Ok(FacultyEligibility {
            faculty_id: row.get(0)?,
            subject_id: row.get(1)?,
            preference_rank: row.get(2)?,
            is_active: row.get(3)?,
        })
    }
}
