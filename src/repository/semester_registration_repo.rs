// ==========================================
// 学期选课注册系统 - 学期注册数据仓储
// ==========================================
// 红线: 同一时刻至多一条 UPCOMING/ONGOING 记录
//       由 insert_if_no_active_tx 单条语句保证
// 红线: 状态推进一律 compare-and-set
// ==========================================

use crate::domain::registration::SemesterRegistration;
use crate::domain::types::RegistrationStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_mapping::{
    format_date, format_datetime, get_datetime, get_enum, get_opt_date,
};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT registration_id, semester_id, status, min_credit, max_credit,
           start_date, end_date, created_at, updated_at
    FROM semester_registration
"#;

// ==========================================
// SemesterRegistrationRepository - 学期注册仓储
// ==========================================
pub struct SemesterRegistrationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SemesterRegistrationRepository {
    /// 创建新的学期注册仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作（事务内）
    // ==========================================

    /// 仅当不存在活动注册时插入
    ///
    /// # 返回
    /// - `Ok(true)`: 已插入
    /// - `Ok(false)`: 已存在 UPCOMING/ONGOING 记录，未插入
    pub fn insert_if_no_active_tx(
        conn: &Connection,
        reg: &SemesterRegistration,
    ) -> RepositoryResult<bool> {
        let rows = conn.execute(
            r#"
            INSERT INTO semester_registration (
                registration_id, semester_id, status, min_credit, max_credit,
                start_date, end_date, created_at, updated_at
            )
            SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9
            WHERE NOT EXISTS (
                SELECT 1 FROM semester_registration
                WHERE status IN ('UPCOMING', 'ONGOING')
            )
            "#,
            params![
                reg.registration_id,
                reg.semester_id,
                reg.status.to_db_str(),
                reg.min_credit,
                reg.max_credit,
                reg.start_date.as_ref().map(format_date),
                reg.end_date.as_ref().map(format_date),
                format_datetime(&reg.created_at),
                format_datetime(&reg.updated_at),
            ],
        )?;
        Ok(rows == 1)
    }

    /// 状态 compare-and-set
    ///
    /// # 返回
    /// - `Ok(true)`: 当前状态等于 expected，已推进到 target
    /// - `Ok(false)`: 状态已被他人修改（或记录不存在）
    pub fn compare_and_set_status_tx(
        conn: &Connection,
        registration_id: &str,
        expected: RegistrationStatus,
        target: RegistrationStatus,
        now: NaiveDateTime,
    ) -> RepositoryResult<bool> {
        let rows = conn.execute(
            r#"
            UPDATE semester_registration
            SET status = ?1, updated_at = ?2
            WHERE registration_id = ?3 AND status = ?4
            "#,
            params![
                target.to_db_str(),
                format_datetime(&now),
                registration_id,
                expected.to_db_str(),
            ],
        )?;
        Ok(rows == 1)
    }

    /// 更新学分上下限（ENDED 后不可改）
    ///
    /// # 返回
    /// - `Ok(true)`: 已更新
    /// - `Ok(false)`: 记录不存在或已 ENDED
    pub fn update_credit_limits_tx(
        conn: &Connection,
        registration_id: &str,
        min_credit: i64,
        max_credit: i64,
        now: NaiveDateTime,
    ) -> RepositoryResult<bool> {
        let rows = conn.execute(
            r#"
            UPDATE semester_registration
            SET min_credit = ?1, max_credit = ?2, updated_at = ?3
            WHERE registration_id = ?4 AND status IN ('UPCOMING', 'ONGOING')
            "#,
            params![min_credit, max_credit, format_datetime(&now), registration_id],
        )?;
        Ok(rows == 1)
    }

    /// 删除注册（仅 UPCOMING 状态可删）
    pub fn delete_tx(conn: &Connection, registration_id: &str) -> RepositoryResult<bool> {
        let rows = conn.execute(
            "DELETE FROM semester_registration WHERE registration_id = ?1 AND status = 'UPCOMING'",
            params![registration_id],
        )?;
        Ok(rows == 1)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id(&self, registration_id: &str) -> RepositoryResult<Option<SemesterRegistration>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, registration_id)
    }

    pub fn find_by_id_tx(
        conn: &Connection,
        registration_id: &str,
    ) -> RepositoryResult<Option<SemesterRegistration>> {
        let sql = format!("{} WHERE registration_id = ?1", SELECT_COLUMNS);
        let reg = conn
            .query_row(&sql, params![registration_id], Self::map_row)
            .optional()?;
        Ok(reg)
    }

    /// 查询当前活动注册（UPCOMING 或 ONGOING）
    pub fn find_active(&self) -> RepositoryResult<Option<SemesterRegistration>> {
        let conn = self.get_conn()?;
        Self::find_active_tx(&conn)
    }

    pub fn find_active_tx(conn: &Connection) -> RepositoryResult<Option<SemesterRegistration>> {
        let sql = format!(
            "{} WHERE status IN ('UPCOMING', 'ONGOING') ORDER BY created_at DESC LIMIT 1",
            SELECT_COLUMNS
        );
        let reg = conn.query_row(&sql, [], Self::map_row).optional()?;
        Ok(reg)
    }

    /// 按创建时间倒序列出全部注册
    pub fn list_all(&self) -> RepositoryResult<Vec<SemesterRegistration>> {
        let conn = self.get_conn()?;
        let sql = format!("{} ORDER BY created_at DESC, registration_id", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let regs = stmt
            .query_map([], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(regs)
    }

    /// 统计注册下已创建的班级数
    pub fn count_sections_tx(conn: &Connection, registration_id: &str) -> RepositoryResult<i64> {
        let n = conn.query_row(
            "SELECT COUNT(*) FROM offered_course_section WHERE registration_id = ?1",
            params![registration_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    fn map_row(row: &Row) -> SqliteResult<SemesterRegistration> {
        Ok(SemesterRegistration {
            registration_id: row.get(0)?,
            semester_id: row.get(1)?,
            status: get_enum(row, 2, RegistrationStatus::parse)?,
            min_credit: row.get(3)?,
            max_credit: row.get(4)?,
            start_date: get_opt_date(row, 5)?,
            end_date: get_opt_date(row, 6)?,
            created_at: get_datetime(row, 7)?,
            updated_at: get_datetime(row, 8)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> SemesterRegistrationRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO academic_semester (semester_id, title, year, code) VALUES ('S1', 'Autumn', 2026, '03')",
            [],
        )
        .unwrap();
        SemesterRegistrationRepository::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_second_active_registration_is_not_inserted() {
        let repo = setup();
        let conn = repo.get_conn().unwrap();

        let first = SemesterRegistration::new_upcoming("S1".to_string(), 9, 15, None, None);
        let second = SemesterRegistration::new_upcoming("S1".to_string(), 9, 15, None, None);

        assert!(SemesterRegistrationRepository::insert_if_no_active_tx(&conn, &first).unwrap());
        assert!(!SemesterRegistrationRepository::insert_if_no_active_tx(&conn, &second).unwrap());

        let active = SemesterRegistrationRepository::find_active_tx(&conn).unwrap().unwrap();
        assert_eq!(active.registration_id, first.registration_id);
    }

    #[test]
    fn test_compare_and_set_only_matches_expected_status() {
        let repo = setup();
        let reg = SemesterRegistration::new_upcoming("S1".to_string(), 9, 15, None, None);
        let now = chrono::Local::now().naive_local();

        {
            let conn = repo.get_conn().unwrap();
            SemesterRegistrationRepository::insert_if_no_active_tx(&conn, &reg).unwrap();

            use RegistrationStatus::*;
            assert!(!SemesterRegistrationRepository::compare_and_set_status_tx(
                &conn, &reg.registration_id, Ongoing, Ended, now
            )
            .unwrap());
            assert!(SemesterRegistrationRepository::compare_and_set_status_tx(
                &conn, &reg.registration_id, Upcoming, Ongoing, now
            )
            .unwrap());
            assert!(!SemesterRegistrationRepository::compare_and_set_status_tx(
                &conn, &reg.registration_id, Upcoming, Ongoing, now
            )
            .unwrap());
        }

        let found = repo.find_by_id(&reg.registration_id).unwrap().unwrap();
        assert_eq!(found.status, RegistrationStatus::Ongoing);
    }

    #[test]
    fn test_ended_registration_frees_active_slot() {
        let repo = setup();
        let conn = repo.get_conn().unwrap();
        let now = chrono::Local::now().naive_local();

        let first = SemesterRegistration::new_upcoming("S1".to_string(), 0, 20, None, None);
        SemesterRegistrationRepository::insert_if_no_active_tx(&conn, &first).unwrap();
        use RegistrationStatus::*;
        SemesterRegistrationRepository::compare_and_set_status_tx(&conn, &first.registration_id, Upcoming, Ongoing, now).unwrap();
        SemesterRegistrationRepository::compare_and_set_status_tx(&conn, &first.registration_id, Ongoing, Ended, now).unwrap();

        let second = SemesterRegistration::new_upcoming("S1".to_string(), 0, 20, None, None);
        assert!(SemesterRegistrationRepository::insert_if_no_active_tx(&conn, &second).unwrap());
    }
}
