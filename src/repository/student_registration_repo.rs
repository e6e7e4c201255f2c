// ==========================================
// 学期选课注册系统 - 学生学期注册数据仓储
// ==========================================
// 红线: total_credits_taken 只经由 add_credits_tx 原子增减，且不为负
// 红线: is_confirmed 只置位一次
// ==========================================

use crate::domain::enrollment::StudentRegistration;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_mapping::{format_datetime, get_datetime};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT id, student_id, registration_id, total_credits_taken, is_confirmed, created_at
    FROM student_semester_registration
"#;

// ==========================================
// StudentRegistrationRepository - 学生学期注册仓储
// ==========================================
pub struct StudentRegistrationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StudentRegistrationRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作（事务内）
    // ==========================================

    /// 插入学生注册；(student_id, registration_id) 已存在时忽略
    pub fn insert_ignore_tx(conn: &Connection, sr: &StudentRegistration) -> RepositoryResult<bool> {
        let rows = conn.execute(
            r#"
            INSERT OR IGNORE INTO student_semester_registration (
                id, student_id, registration_id, total_credits_taken, is_confirmed, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                sr.id,
                sr.student_id,
                sr.registration_id,
                sr.total_credits_taken,
                sr.is_confirmed as i32,
                format_datetime(&sr.created_at),
            ],
        )?;
        Ok(rows == 1)
    }

    /// 原子增减已选学分
    ///
    /// delta 为负时附带 total_credits_taken + delta >= 0 条件
    ///
    /// # 返回
    /// - `Ok(true)`: 已更新
    /// - `Ok(false)`: 记录不存在或会变为负数
    pub fn add_credits_tx(
        conn: &Connection,
        student_id: &str,
        registration_id: &str,
        delta: i64,
    ) -> RepositoryResult<bool> {
        let rows = conn.execute(
            r#"
            UPDATE student_semester_registration
            SET total_credits_taken = total_credits_taken + ?1
            WHERE student_id = ?2 AND registration_id = ?3
              AND total_credits_taken + ?1 >= 0
            "#,
            params![delta, student_id, registration_id],
        )?;
        Ok(rows == 1)
    }

    /// 确认注册
    ///
    /// # 返回
    /// - `Ok(false)`: 已确认过（或记录不存在）
    pub fn mark_confirmed_tx(
        conn: &Connection,
        student_id: &str,
        registration_id: &str,
    ) -> RepositoryResult<bool> {
        let rows = conn.execute(
            r#"
            UPDATE student_semester_registration
            SET is_confirmed = 1
            WHERE student_id = ?1 AND registration_id = ?2 AND is_confirmed = 0
            "#,
            params![student_id, registration_id],
        )?;
        Ok(rows == 1)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find(
        &self,
        student_id: &str,
        registration_id: &str,
    ) -> RepositoryResult<Option<StudentRegistration>> {
        let conn = self.get_conn()?;
        Self::find_tx(&conn, student_id, registration_id)
    }

    pub fn find_tx(
        conn: &Connection,
        student_id: &str,
        registration_id: &str,
    ) -> RepositoryResult<Option<StudentRegistration>> {
        let sql = format!("{} WHERE student_id = ?1 AND registration_id = ?2", SELECT_COLUMNS);
        let sr = conn
            .query_row(&sql, params![student_id, registration_id], Self::map_row)
            .optional()?;
        Ok(sr)
    }

    /// 列出已确认的学生注册
    pub fn list_confirmed_tx(
        conn: &Connection,
        registration_id: &str,
    ) -> RepositoryResult<Vec<StudentRegistration>> {
        let sql = format!(
            "{} WHERE registration_id = ?1 AND is_confirmed = 1 ORDER BY student_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let list = stmt
            .query_map(params![registration_id], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(list)
    }

    fn map_row(row: &Row) -> SqliteResult<StudentRegistration> {
        Ok(StudentRegistration {
            id: row.get(0)?,
            student_id: row.get(1)?,
            registration_id: row.get(2)?,
            total_credits_taken: row.get(3)?,
            is_confirmed: row.get::<_, i32>(4)? != 0,
            created_at: get_datetime(row, 5)?,
        })
    }
}
