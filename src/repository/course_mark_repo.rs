// ==========================================
// 学期选课注册系统 - 考试成绩数据仓储
// ==========================================
// 唯一: (enrolled_course_id, exam_type)
// ==========================================

use crate::domain::grading::CourseMark;
use crate::domain::types::ExamType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_mapping::get_enum;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT mark_id, student_id, enrolled_course_id, semester_id, exam_type, marks, grade
    FROM student_enrolled_course_mark
"#;

// ==========================================
// CourseMarkRepository - 考试成绩仓储
// ==========================================
pub struct CourseMarkRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CourseMarkRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入成绩行；已存在时忽略
    pub fn insert_ignore_tx(conn: &Connection, mark: &CourseMark) -> RepositoryResult<bool> {
        let rows = conn.execute(
            r#"
            INSERT OR IGNORE INTO student_enrolled_course_mark (
                mark_id, student_id, enrolled_course_id, semester_id, exam_type, marks, grade
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                mark.mark_id,
                mark.student_id,
                mark.enrolled_course_id,
                mark.semester_id,
                mark.exam_type.to_db_str(),
                mark.marks,
                mark.grade,
            ],
        )?;
        Ok(rows == 1)
    }

    /// 写入分数与等级
    pub fn update_marks_tx(
        conn: &Connection,
        enrolled_course_id: &str,
        exam_type: ExamType,
        marks: u32,
        grade: &str,
    ) -> RepositoryResult<bool> {
        let rows = conn.execute(
            r#"
            UPDATE student_enrolled_course_mark
            SET marks = ?1, grade = ?2
            WHERE enrolled_course_id = ?3 AND exam_type = ?4
            "#,
            params![marks, grade, enrolled_course_id, exam_type.to_db_str()],
        )?;
        Ok(rows == 1)
    }

    pub fn find_tx(
        conn: &Connection,
        enrolled_course_id: &str,
        exam_type: ExamType,
    ) -> RepositoryResult<Option<CourseMark>> {
        let sql = format!("{} WHERE enrolled_course_id = ?1 AND exam_type = ?2", SELECT_COLUMNS);
        let found = conn
            .query_row(&sql, params![enrolled_course_id, exam_type.to_db_str()], Self::map_row)
            .optional()?;
        Ok(found)
    }

    /// 列出学生成绩（可按学期过滤）
    pub fn list_by_student(
        &self,
        student_id: &str,
        semester_id: Option<&str>,
    ) -> RepositoryResult<Vec<CourseMark>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE student_id = ?1 AND (?2 IS NULL OR semester_id = ?2) ORDER BY enrolled_course_id, exam_type DESC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let list = stmt
            .query_map(params![student_id, semester_id], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(list)
    }

    fn map_row(row: &Row) -> SqliteResult<CourseMark> {
        Ok(CourseMark {
            mark_id: row.get(0)?,
            student_id: row.get(1)?,
            enrolled_course_id: row.get(2)?,
            semester_id: row.get(3)?,
            exam_type: get_enum(row, 4, ExamType::parse)?,
            marks: row.get(5)?,
            grade: row.get(6)?,
        })
    }
}
