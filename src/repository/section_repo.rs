// ==========================================
// 学期选课注册系统 - 开课班级数据仓储
// ==========================================
// 红线: enrolled_count 只经由条件 UPDATE 修改
//       try_increment: WHERE enrolled_count < max_capacity
//       try_decrement: WHERE enrolled_count > 0
// ==========================================

use crate::domain::section::OfferedCourseSection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// SectionRepository - 开课班级仓储
// ==========================================
pub struct SectionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SectionRepository {
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

    pub fn insert_tx(conn: &Connection, section: &OfferedCourseSection) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO offered_course_section (
                section_id, offered_course_id, registration_id, title,
                max_capacity, enrolled_count
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                section.section_id,
                section.offered_course_id,
                section.registration_id,
                section.title,
                section.max_capacity,
                section.enrolled_count,
            ],
        )?;
        Ok(())
    }

    /// 占用一个座位
    ///
    /// # 返回
    /// - `Ok(true)`: 已占座
    /// - `Ok(false)`: 班级已满或不存在（调用方自行区分）
    pub fn try_increment_enrolled_tx(conn: &Connection, section_id: &str) -> RepositoryResult<bool> {
        let rows = conn.execute(
            r#"
            UPDATE offered_course_section
            SET enrolled_count = enrolled_count + 1
            WHERE section_id = ?1 AND enrolled_count < max_capacity
            "#,
            params![section_id],
        )?;
        Ok(rows == 1)
    }

    /// 释放一个座位
    ///
    /// # 返回
    /// - `Ok(false)`: 计数已为 0 或班级不存在
    pub fn try_decrement_enrolled_tx(conn: &Connection, section_id: &str) -> RepositoryResult<bool> {
        let rows = conn.execute(
            r#"
            UPDATE offered_course_section
            SET enrolled_count = enrolled_count - 1
            WHERE section_id = ?1 AND enrolled_count > 0
            "#,
            params![section_id],
        )?;
        Ok(rows == 1)
    }

    /// 删除无人选课的班级（课表时段级联删除）
    ///
    /// # 返回
    /// - `Ok(false)`: 班级不存在或已有学生
    pub fn delete_if_empty_tx(conn: &Connection, section_id: &str) -> RepositoryResult<bool> {
        let rows = conn.execute(
            "DELETE FROM offered_course_section WHERE section_id = ?1 AND enrolled_count = 0",
            params![section_id],
        )?;
        Ok(rows == 1)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id(&self, section_id: &str) -> RepositoryResult<Option<OfferedCourseSection>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, section_id)
    }

    pub fn find_by_id_tx(
        conn: &Connection,
        section_id: &str,
    ) -> RepositoryResult<Option<OfferedCourseSection>> {
        let section = conn
            .query_row(
                r#"SELECT section_id, offered_course_id, registration_id, title,
                          max_capacity, enrolled_count
                   FROM offered_course_section WHERE section_id = ?1"#,
                params![section_id],
                Self::map_row,
            )
            .optional()?;
        Ok(section)
    }

    /// 列出注册下的班级（可按开课过滤）
    pub fn list_by_registration(
        &self,
        registration_id: &str,
        offered_course_id: Option<&str>,
    ) -> RepositoryResult<Vec<OfferedCourseSection>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT section_id, offered_course_id, registration_id, title,
                   max_capacity, enrolled_count
            FROM offered_course_section
            WHERE registration_id = ?1 AND (?2 IS NULL OR offered_course_id = ?2)
            ORDER BY offered_course_id, title
            "#,
        )?;
        let list = stmt
            .query_map(params![registration_id, offered_course_id], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(list)
    }

    fn map_row(row: &Row) -> SqliteResult<OfferedCourseSection> {
        Ok(OfferedCourseSection {
            section_id: row.get(0)?,
            offered_course_id: row.get(1)?,
            registration_id: row.get(2)?,
            title: row.get(3)?,
            max_capacity: row.get(4)?,
            enrolled_count: row.get(5)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(max_capacity: i64) -> SectionRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO academic_semester (semester_id, title, year, code) VALUES ('S1', 'Autumn', 2026, '03');
            INSERT INTO course (course_id, title, code, credits) VALUES ('C1', 'Algorithms', 'CSE-201', 3);
            INSERT INTO semester_registration (registration_id, semester_id, status, min_credit, max_credit, created_at, updated_at)
                VALUES ('R1', 'S1', 'ONGOING', 0, 20, '2026-01-01 00:00:00', '2026-01-01 00:00:00');
            INSERT INTO offered_course (offered_course_id, course_id, registration_id, department_id)
                VALUES ('OC1', 'C1', 'R1', 'CSE');
            "#,
        )
        .unwrap();
        SectionRepository::insert_tx(
            &conn,
            &OfferedCourseSection {
                section_id: "SEC1".to_string(),
                offered_course_id: "OC1".to_string(),
                registration_id: "R1".to_string(),
                title: "A".to_string(),
                max_capacity,
                enrolled_count: 0,
            },
        )
        .unwrap();
        SectionRepository::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_increment_stops_at_capacity() {
        let repo = setup(2);
        let conn = repo.get_conn().unwrap();

        assert!(SectionRepository::try_increment_enrolled_tx(&conn, "SEC1").unwrap());
        assert!(SectionRepository::try_increment_enrolled_tx(&conn, "SEC1").unwrap());
        assert!(!SectionRepository::try_increment_enrolled_tx(&conn, "SEC1").unwrap());

        let section = SectionRepository::find_by_id_tx(&conn, "SEC1").unwrap().unwrap();
        assert_eq!(section.enrolled_count, 2);
        assert!(section.is_full());
        assert_eq!(section.available_seats(), 0);
    }

    #[test]
    fn test_decrement_stops_at_zero() {
        let repo = setup(1);
        let conn = repo.get_conn().unwrap();

        assert!(!SectionRepository::try_decrement_enrolled_tx(&conn, "SEC1").unwrap());
        assert!(SectionRepository::try_increment_enrolled_tx(&conn, "SEC1").unwrap());
        assert!(SectionRepository::try_decrement_enrolled_tx(&conn, "SEC1").unwrap());
        assert!(!SectionRepository::try_decrement_enrolled_tx(&conn, "SEC1").unwrap());
    }

    #[test]
    fn test_delete_refuses_section_with_students() {
        let repo = setup(3);
        let conn = repo.get_conn().unwrap();

        SectionRepository::try_increment_enrolled_tx(&conn, "SEC1").unwrap();
        assert!(!SectionRepository::delete_if_empty_tx(&conn, "SEC1").unwrap());

        SectionRepository::try_decrement_enrolled_tx(&conn, "SEC1").unwrap();
        assert!(SectionRepository::delete_if_empty_tx(&conn, "SEC1").unwrap());
        assert!(SectionRepository::find_by_id_tx(&conn, "SEC1").unwrap().is_none());
    }

    #[test]
    fn test_missing_section_cannot_be_incremented() {
        let repo = setup(3);
        let conn = repo.get_conn().unwrap();
        assert!(!SectionRepository::try_increment_enrolled_tx(&conn, "NOPE").unwrap());
    }
}
