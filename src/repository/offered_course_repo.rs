// ==========================================
// 学期选课注册系统 - 学期开课数据仓储
// ==========================================

use crate::domain::section::OfferedCourse;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// OfferedCourseRepository - 学期开课仓储
// ==========================================
pub struct OfferedCourseRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OfferedCourseRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入开课；(registration_id, course_id, department_id) 已存在时忽略
    ///
    /// # 返回
    /// - `Ok(true)`: 新插入
    /// - `Ok(false)`: 已存在
    pub fn insert_ignore_tx(conn: &Connection, offered: &OfferedCourse) -> RepositoryResult<bool> {
        let rows = conn.execute(
            r#"
            INSERT OR IGNORE INTO offered_course (
                offered_course_id, course_id, registration_id, department_id
            ) VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                offered.offered_course_id,
                offered.course_id,
                offered.registration_id,
                offered.department_id,
            ],
        )?;
        Ok(rows == 1)
    }

    pub fn find_by_id(&self, offered_course_id: &str) -> RepositoryResult<Option<OfferedCourse>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, offered_course_id)
    }

    pub fn find_by_id_tx(
        conn: &Connection,
        offered_course_id: &str,
    ) -> RepositoryResult<Option<OfferedCourse>> {
        let offered = conn
            .query_row(
                r#"SELECT offered_course_id, course_id, registration_id, department_id
                   FROM offered_course WHERE offered_course_id = ?1"#,
                params![offered_course_id],
                Self::map_row,
            )
            .optional()?;
        Ok(offered)
    }

    /// 查询开课及其课程学分
    pub fn find_with_credits_tx(
        conn: &Connection,
        offered_course_id: &str,
    ) -> RepositoryResult<Option<(OfferedCourse, i64)>> {
        let found = conn
            .query_row(
                r#"
                SELECT oc.offered_course_id, oc.course_id, oc.registration_id, oc.department_id,
                       c.credits
                FROM offered_course oc
                JOIN course c ON c.course_id = oc.course_id
                WHERE oc.offered_course_id = ?1
                "#,
                params![offered_course_id],
                |row| Ok((Self::map_row(row)?, row.get::<_, i64>(4)?)),
            )
            .optional()?;
        Ok(found)
    }

    /// 列出注册下的开课（可按院系过滤）
    pub fn list_by_registration(
        &self,
        registration_id: &str,
        department_id: Option<&str>,
    ) -> RepositoryResult<Vec<OfferedCourse>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT offered_course_id, course_id, registration_id, department_id
            FROM offered_course
            WHERE registration_id = ?1 AND (?2 IS NULL OR department_id = ?2)
            ORDER BY department_id, course_id
            "#,
        )?;
        let list = stmt
            .query_map(params![registration_id, department_id], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(list)
    }

    fn map_row(row: &Row) -> SqliteResult<OfferedCourse> {
        Ok(OfferedCourse {
            offered_course_id: row.get(0)?,
            course_id: row.get(1)?,
            registration_id: row.get(2)?,
            department_id: row.get(3)?,
        })
    }
}
