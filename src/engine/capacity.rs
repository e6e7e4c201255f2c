// ==========================================
// 学期选课注册系统 - 班级容量追踪
// ==========================================
// 红线: 0 <= enrolled_count <= max_capacity
// 占座/释放均为单条条件 UPDATE，必须在调用方事务内执行
// ==========================================

use crate::domain::section::OfferedCourseSection;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::SectionRepository;
use rusqlite::Connection;

// ==========================================
// SectionCapacityTracker - 班级容量追踪器
// ==========================================
pub struct SectionCapacityTracker;

impl SectionCapacityTracker {
    /// 原子占座
    ///
    /// # 返回
    /// - `Ok(section)`: 占座后的班级
    /// - `Err(Capacity)`: 已满
    /// - `Err(NotFound)`: 班级不存在
    pub fn try_reserve_seat(conn: &Connection, section_id: &str) -> EngineResult<OfferedCourseSection> {
        let reserved = SectionRepository::try_increment_enrolled_tx(conn, section_id)?;
        let section = SectionRepository::find_by_id_tx(conn, section_id)?
            .ok_or_else(|| EngineError::not_found("OfferedCourseSection", section_id))?;

        if !reserved {
            tracing::warn!(
                section_id = %section_id,
                enrolled_count = section.enrolled_count,
                max_capacity = section.max_capacity,
                "占座失败: 班级已满"
            );
            return Err(EngineError::Capacity {
                section_id: section_id.to_string(),
                max_capacity: section.max_capacity,
            });
        }

        tracing::debug!(
            section_id = %section_id,
            enrolled_count = section.enrolled_count,
            "已占座"
        );
        Ok(section)
    }

    /// 原子释放座位
    ///
    /// 计数已为 0 时报告不变量破坏，不做静默吸收
    pub fn release_seat(conn: &Connection, section_id: &str) -> EngineResult<OfferedCourseSection> {
        let released = SectionRepository::try_decrement_enrolled_tx(conn, section_id)?;
        let section = SectionRepository::find_by_id_tx(conn, section_id)?
            .ok_or_else(|| EngineError::not_found("OfferedCourseSection", section_id))?;

        if !released {
            tracing::error!(section_id = %section_id, "释放座位时 enrolled_count 已为 0");
            return Err(EngineError::InvariantViolation(format!(
                "班级 {} 的已选人数已为 0，无法释放座位",
                section_id
            )));
        }

        tracing::debug!(
            section_id = %section_id,
            enrolled_count = section.enrolled_count,
            "已释放座位"
        );
        Ok(section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(max_capacity: i64) -> Connection {
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
        conn
    }

    #[test]
    fn test_release_on_empty_section_is_invariant_violation() {
        let conn = setup(2);

        let err = SectionCapacityTracker::release_seat(&conn, "SEC1").unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation(_)));

        let section = SectionRepository::find_by_id_tx(&conn, "SEC1").unwrap().unwrap();
        assert_eq!(section.enrolled_count, 0);
    }

    #[test]
    fn test_reserve_until_full_then_release() {
        let conn = setup(1);

        let section = SectionCapacityTracker::try_reserve_seat(&conn, "SEC1").unwrap();
        assert_eq!(section.enrolled_count, 1);

        let err = SectionCapacityTracker::try_reserve_seat(&conn, "SEC1").unwrap_err();
        assert!(matches!(err, EngineError::Capacity { max_capacity: 1, .. }));

        let section = SectionCapacityTracker::release_seat(&conn, "SEC1").unwrap();
        assert_eq!(section.enrolled_count, 0);
    }

    #[test]
    fn test_unknown_section_is_not_found() {
        let conn = setup(1);
        let err = SectionCapacityTracker::try_reserve_seat(&conn, "NOPE").unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }
}
