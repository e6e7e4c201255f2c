// ==========================================
// 学期选课注册系统 - 学业状态数据仓储
// ==========================================

use crate::domain::grading::AcademicStanding;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_mapping::{format_datetime, get_datetime};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// AcademicInfoRepository - 学业状态仓储
// ==========================================
pub struct AcademicInfoRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AcademicInfoRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入学业状态（整行覆盖）
    pub fn upsert_tx(conn: &Connection, standing: &AcademicStanding) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO student_academic_info (student_id, cgpa, total_completed_credit, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(student_id) DO UPDATE SET
                cgpa = excluded.cgpa,
                total_completed_credit = excluded.total_completed_credit,
                updated_at = excluded.updated_at
            "#,
            params![
                standing.student_id,
                standing.cgpa,
                standing.total_completed_credit,
                format_datetime(&standing.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn find(&self, student_id: &str) -> RepositoryResult<Option<AcademicStanding>> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(
                r#"SELECT student_id, cgpa, total_completed_credit, updated_at
                   FROM student_academic_info WHERE student_id = ?1"#,
                params![student_id],
                |row| {
                    Ok(AcademicStanding {
                        student_id: row.get(0)?,
                        cgpa: row.get(1)?,
                        total_completed_credit: row.get(2)?,
                        updated_at: get_datetime(row, 3)?,
                    })
                },
            )
            .optional()?;
        Ok(found)
    }
}
