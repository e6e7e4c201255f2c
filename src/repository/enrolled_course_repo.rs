// ==========================================
// 学期选课注册系统 - 修读课程数据仓储
// ==========================================
// 唯一: (student_id, course_id, semester_id)
// ONGOING → COMPLETED 只经由 mark_completed_tx（条件 UPDATE）
// ==========================================

use crate::domain::grading::EnrolledCourseRecord;
use crate::domain::types::EnrolledCourseStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_mapping::get_enum;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT enrolled_course_id, student_id, course_id, semester_id,
           status, total_marks, grade, point
    FROM student_enrolled_course
"#;

// ==========================================
// EnrolledCourseRepository - 修读课程仓储
// ==========================================
pub struct EnrolledCourseRepository {
    conn: Arc<Mutex<Connection>>,
}

impl EnrolledCourseRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入修读记录；已存在时忽略
    pub fn insert_ignore_tx(conn: &Connection, record: &EnrolledCourseRecord) -> RepositoryResult<bool> {
        let rows = conn.execute(
            r#"
            INSERT OR IGNORE INTO student_enrolled_course (
                enrolled_course_id, student_id, course_id, semester_id,
                status, total_marks, grade, point
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                record.enrolled_course_id,
                record.student_id,
                record.course_id,
                record.semester_id,
                record.status.to_db_str(),
                record.total_marks,
                record.grade,
                record.point,
            ],
        )?;
        Ok(rows == 1)
    }

    /// 写入总分/等级/绩点并置为 COMPLETED
    ///
    /// # 返回
    /// - `Ok(false)`: 记录不存在或已是 COMPLETED
    pub fn mark_completed_tx(
        conn: &Connection,
        enrolled_course_id: &str,
        total_marks: u32,
        grade: &str,
        point: f64,
    ) -> RepositoryResult<bool> {
        let rows = conn.execute(
            r#"
            UPDATE student_enrolled_course
            SET status = 'COMPLETED', total_marks = ?1, grade = ?2, point = ?3
            WHERE enrolled_course_id = ?4 AND status = 'ONGOING'
            "#,
            params![total_marks, grade, point, enrolled_course_id],
        )?;
        Ok(rows == 1)
    }

    pub fn find_by_id_tx(
        conn: &Connection,
        enrolled_course_id: &str,
    ) -> RepositoryResult<Option<EnrolledCourseRecord>> {
        let sql = format!("{} WHERE enrolled_course_id = ?1", SELECT_COLUMNS);
        let found = conn
            .query_row(&sql, params![enrolled_course_id], Self::map_row)
            .optional()?;
        Ok(found)
    }

    pub fn find_tx(
        conn: &Connection,
        student_id: &str,
        course_id: &str,
        semester_id: &str,
    ) -> RepositoryResult<Option<EnrolledCourseRecord>> {
        let sql = format!(
            "{} WHERE student_id = ?1 AND course_id = ?2 AND semester_id = ?3",
            SELECT_COLUMNS
        );
        let found = conn
            .query_row(&sql, params![student_id, course_id, semester_id], Self::map_row)
            .optional()?;
        Ok(found)
    }

    /// 学生全部 COMPLETED 记录的 (绩点, 学分)
    pub fn list_completed_with_credits_tx(
        conn: &Connection,
        student_id: &str,
    ) -> RepositoryResult<Vec<(f64, i64)>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT COALESCE(ec.point, 0), c.credits
            FROM student_enrolled_course ec
            JOIN course c ON c.course_id = ec.course_id
            WHERE ec.student_id = ?1 AND ec.status = 'COMPLETED'
            "#,
        )?;
        let rows = stmt
            .query_map(params![student_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 列出学生修读记录（可按学期过滤）
    pub fn list_by_student(
        &self,
        student_id: &str,
        semester_id: Option<&str>,
    ) -> RepositoryResult<Vec<EnrolledCourseRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE student_id = ?1 AND (?2 IS NULL OR semester_id = ?2) ORDER BY semester_id, course_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let list = stmt
            .query_map(params![student_id, semester_id], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(list)
    }

    fn map_row(row: &Row) -> SqliteResult<EnrolledCourseRecord> {
        Ok(EnrolledCourseRecord {
            enrolled_course_id: row.get(0)?,
            student_id: row.get(1)?,
            course_id: row.get(2)?,
            semester_id: row.get(3)?,
            status: get_enum(row, 4, EnrolledCourseStatus::parse)?,
            total_marks: row.get(5)?,
            grade: row.get(6)?,
            point: row.get(7)?,
        })
    }
}
