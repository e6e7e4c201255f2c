// ==========================================
// 学期选课注册系统 - 课表时段数据仓储
// ==========================================
// 按 (room_id, day_of_week) / (faculty_id, day_of_week) 查询，
// 供排课冲突检测使用（跨所有注册，不限当前学期）
// ==========================================

use crate::domain::section::ClassSlot;
use crate::domain::types::{format_clock_time, DayOfWeek};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_mapping::{get_clock_time, get_enum};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT slot_id, section_id, registration_id, day_of_week,
           start_time, end_time, room_id, faculty_id
    FROM class_slot
"#;

// ==========================================
// ClassSlotRepository - 课表时段仓储
// ==========================================
pub struct ClassSlotRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ClassSlotRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert_tx(conn: &Connection, slot: &ClassSlot) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO class_slot (
                slot_id, section_id, registration_id, day_of_week,
                start_time, end_time, room_id, faculty_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                slot.slot_id,
                slot.section_id,
                slot.registration_id,
                slot.day_of_week.to_db_str(),
                format_clock_time(slot.start_time),
                format_clock_time(slot.end_time),
                slot.room_id,
                slot.faculty_id,
            ],
        )?;
        Ok(())
    }

    /// 查询教室某天的全部时段
    pub fn find_by_room_and_day(&self, room_id: &str, day: DayOfWeek) -> RepositoryResult<Vec<ClassSlot>> {
        let conn = self.get_conn()?;
        Self::find_by_room_and_day_tx(&conn, room_id, day)
    }

    pub fn find_by_room_and_day_tx(
        conn: &Connection,
        room_id: &str,
        day: DayOfWeek,
    ) -> RepositoryResult<Vec<ClassSlot>> {
        let sql = format!(
            "{} WHERE room_id = ?1 AND day_of_week = ?2 ORDER BY start_time",
            SELECT_COLUMNS
        );
        Self::query_list(conn, &sql, room_id, day)
    }

    /// 查询教师某天的全部时段
    pub fn find_by_faculty_and_day(
        &self,
        faculty_id: &str,
        day: DayOfWeek,
    ) -> RepositoryResult<Vec<ClassSlot>> {
        let conn = self.get_conn()?;
        Self::find_by_faculty_and_day_tx(&conn, faculty_id, day)
    }

    pub fn find_by_faculty_and_day_tx(
        conn: &Connection,
        faculty_id: &str,
        day: DayOfWeek,
    ) -> RepositoryResult<Vec<ClassSlot>> {
        let sql = format!(
            "{} WHERE faculty_id = ?1 AND day_of_week = ?2 ORDER BY start_time",
            SELECT_COLUMNS
        );
        Self::query_list(conn, &sql, faculty_id, day)
    }

    pub fn find_by_section(&self, section_id: &str) -> RepositoryResult<Vec<ClassSlot>> {
        let conn = self.get_conn()?;
        Self::find_by_section_tx(&conn, section_id)
    }

    pub fn find_by_section_tx(conn: &Connection, section_id: &str) -> RepositoryResult<Vec<ClassSlot>> {
        let sql = format!("{} WHERE section_id = ?1 ORDER BY day_of_week, start_time", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let slots = stmt
            .query_map(params![section_id], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(slots)
    }

    fn query_list(
        conn: &Connection,
        sql: &str,
        id: &str,
        day: DayOfWeek,
    ) -> RepositoryResult<Vec<ClassSlot>> {
        let mut stmt = conn.prepare(sql)?;
        let slots = stmt
            .query_map(params![id, day.to_db_str()], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(slots)
    }

    fn map_row(row: &Row) -> SqliteResult<ClassSlot> {
        Ok(ClassSlot {
            slot_id: row.get(0)?,
            section_id: row.get(1)?,
            registration_id: row.get(2)?,
            day_of_week: get_enum(row, 3, DayOfWeek::parse)?,
            start_time: get_clock_time(row, 4)?,
            end_time: get_clock_time(row, 5)?,
            room_id: row.get(6)?,
            faculty_id: row.get(7)?,
        })
    }
}
