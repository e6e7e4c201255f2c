// ==========================================
// 学期选课注册系统 - 选课记录数据仓储
// ==========================================
// 主键 (registration_id, student_id, offered_course_id)
// ==========================================

use crate::domain::enrollment::Enrollment;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_mapping::{format_datetime, get_datetime};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT registration_id, student_id, offered_course_id, section_id, created_at
    FROM student_semester_registration_course
"#;

// ==========================================
// EnrollmentRepository - 选课记录仓储
// ==========================================
pub struct EnrollmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl EnrollmentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入选课记录（重复时返回 UniqueConstraintViolation）
    pub fn insert_tx(conn: &Connection, enrollment: &Enrollment) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO student_semester_registration_course (
                registration_id, student_id, offered_course_id, section_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                enrollment.registration_id,
                enrollment.student_id,
                enrollment.offered_course_id,
                enrollment.section_id,
                format_datetime(&enrollment.created_at),
            ],
        )?;
        Ok(())
    }

    /// 删除选课记录，返回删除行数
    pub fn delete_tx(
        conn: &Connection,
        registration_id: &str,
        student_id: &str,
        offered_course_id: &str,
    ) -> RepositoryResult<usize> {
        let rows = conn.execute(
            r#"
            DELETE FROM student_semester_registration_course
            WHERE registration_id = ?1 AND student_id = ?2 AND offered_course_id = ?3
            "#,
            params![registration_id, student_id, offered_course_id],
        )?;
        Ok(rows)
    }

    pub fn find_tx(
        conn: &Connection,
        registration_id: &str,
        student_id: &str,
        offered_course_id: &str,
    ) -> RepositoryResult<Option<Enrollment>> {
        let sql = format!(
            "{} WHERE registration_id = ?1 AND student_id = ?2 AND offered_course_id = ?3",
            SELECT_COLUMNS
        );
        let found = conn
            .query_row(
                &sql,
                params![registration_id, student_id, offered_course_id],
                Self::map_row,
            )
            .optional()?;
        Ok(found)
    }

    /// 列出学生在某注册下的选课
    pub fn list_by_student(
        &self,
        registration_id: &str,
        student_id: &str,
    ) -> RepositoryResult<Vec<Enrollment>> {
        let conn = self.get_conn()?;
        Self::list_by_student_tx(&conn, registration_id, student_id)
    }

    pub fn list_by_student_tx(
        conn: &Connection,
        registration_id: &str,
        student_id: &str,
    ) -> RepositoryResult<Vec<Enrollment>> {
        let sql = format!(
            "{} WHERE registration_id = ?1 AND student_id = ?2 ORDER BY created_at, offered_course_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let list = stmt
            .query_map(params![registration_id, student_id], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(list)
    }

    /// 列出确认学生的选课及对应课程（开启新学期用）
    ///
    /// # 返回
    /// (student_id, course_id) 列表
    pub fn list_confirmed_course_pairs_tx(
        conn: &Connection,
        registration_id: &str,
    ) -> RepositoryResult<Vec<(String, String)>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT e.student_id, oc.course_id
            FROM student_semester_registration_course e
            JOIN student_semester_registration sr
              ON sr.student_id = e.student_id AND sr.registration_id = e.registration_id
            JOIN offered_course oc ON oc.offered_course_id = e.offered_course_id
            WHERE e.registration_id = ?1 AND sr.is_confirmed = 1
            ORDER BY e.student_id, oc.course_id
            "#,
        )?;
        let pairs = stmt
            .query_map(params![registration_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(pairs)
    }

    fn map_row(row: &Row) -> SqliteResult<Enrollment> {
        Ok(Enrollment {
            registration_id: row.get(0)?,
            student_id: row.get(1)?,
            offered_course_id: row.get(2)?,
            section_id: row.get(3)?,
            created_at: get_datetime(row, 4)?,
        })
    }
}
