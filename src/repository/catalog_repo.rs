// ==========================================
// 学期选课注册系统 - 目录数据仓储
// ==========================================
// 学年学期/课程/学生/教室/教师的最小 CRUD
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::catalog::{AcademicSemester, Course, Faculty, Room, Student};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// CatalogRepository - 目录数据仓储
// ==========================================
pub struct CatalogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CatalogRepository {
    /// 创建新的目录数据仓储
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
    // 学年学期
    // ==========================================

    pub fn insert_semester(&self, semester: &AcademicSemester) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO academic_semester (semester_id, title, year, code, is_current)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                semester.semester_id,
                semester.title,
                semester.year,
                semester.code,
                semester.is_current as i32,
            ],
        )?;
        Ok(())
    }

    pub fn find_semester(&self, semester_id: &str) -> RepositoryResult<Option<AcademicSemester>> {
        let conn = self.get_conn()?;
        Self::find_semester_tx(&conn, semester_id)
    }

    pub fn find_semester_tx(
        conn: &Connection,
        semester_id: &str,
    ) -> RepositoryResult<Option<AcademicSemester>> {
        let semester = conn
            .query_row(
                r#"SELECT semester_id, title, year, code, is_current
                   FROM academic_semester WHERE semester_id = ?1"#,
                params![semester_id],
                |row| {
                    Ok(AcademicSemester {
                        semester_id: row.get(0)?,
                        title: row.get(1)?,
                        year: row.get(2)?,
                        code: row.get(3)?,
                        is_current: row.get::<_, i32>(4)? != 0,
                    })
                },
            )
            .optional()?;
        Ok(semester)
    }

    /// 将指定学期设为当前学期（其余学期清除标记）
    pub fn set_current_semester_tx(conn: &Connection, semester_id: &str) -> RepositoryResult<()> {
        conn.execute(
            "UPDATE academic_semester SET is_current = 0 WHERE semester_id <> ?1 AND is_current <> 0",
            params![semester_id],
        )?;
        let rows = conn.execute(
            "UPDATE academic_semester SET is_current = 1 WHERE semester_id = ?1",
            params![semester_id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "AcademicSemester".to_string(),
                id: semester_id.to_string(),
            });
        }
        Ok(())
    }

    // ==========================================
    // 课程
    // ==========================================

    pub fn insert_course(&self, course: &Course) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO course (course_id, title, code, credits) VALUES (?1, ?2, ?3, ?4)",
            params![course.course_id, course.title, course.code, course.credits],
        )?;
        Ok(())
    }

    pub fn find_course_tx(conn: &Connection, course_id: &str) -> RepositoryResult<Option<Course>> {
        let course = conn
            .query_row(
                "SELECT course_id, title, code, credits FROM course WHERE course_id = ?1",
                params![course_id],
                |row| {
                    Ok(Course {
                        course_id: row.get(0)?,
                        title: row.get(1)?,
                        code: row.get(2)?,
                        credits: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(course)
    }

    // ==========================================
    // 学生
    // ==========================================

    pub fn insert_student(&self, student: &Student) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO student (student_id, name) VALUES (?1, ?2)",
            params![student.student_id, student.name],
        )?;
        Ok(())
    }

    pub fn student_exists_tx(conn: &Connection, student_id: &str) -> RepositoryResult<bool> {
        Self::exists(conn, "SELECT 1 FROM student WHERE student_id = ?1", student_id)
    }

    // ==========================================
    // 教室 / 教师
    // ==========================================

    pub fn insert_room(&self, room: &Room) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO room (room_id, room_number, building) VALUES (?1, ?2, ?3)",
            params![room.room_id, room.room_number, room.building],
        )?;
        Ok(())
    }

    pub fn room_exists_tx(conn: &Connection, room_id: &str) -> RepositoryResult<bool> {
        Self::exists(conn, "SELECT 1 FROM room WHERE room_id = ?1", room_id)
    }

    pub fn insert_faculty(&self, faculty: &Faculty) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO faculty (faculty_id, name) VALUES (?1, ?2)",
            params![faculty.faculty_id, faculty.name],
        )?;
        Ok(())
    }

    pub fn faculty_exists_tx(conn: &Connection, faculty_id: &str) -> RepositoryResult<bool> {
        Self::exists(conn, "SELECT 1 FROM faculty WHERE faculty_id = ?1", faculty_id)
    }

    fn exists(conn: &Connection, sql: &str, id: &str) -> RepositoryResult<bool> {
        let found = conn
            .query_row(sql, params![id], |_row| Ok(()))
            .optional()?
            .is_some();
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> CatalogRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        CatalogRepository::new(Arc::new(Mutex::new(conn)))
    }

    fn semester(id: &str, code: &str) -> AcademicSemester {
        AcademicSemester {
            semester_id: id.to_string(),
            title: "Autumn".to_string(),
            year: 2026,
            code: code.to_string(),
            is_current: false,
        }
    }

    #[test]
    fn test_set_current_semester_clears_others() {
        let repo = setup();
        repo.insert_semester(&semester("S1", "01")).unwrap();
        repo.insert_semester(&semester("S2", "02")).unwrap();

        {
            let conn = repo.get_conn().unwrap();
            CatalogRepository::set_current_semester_tx(&conn, "S1").unwrap();
            CatalogRepository::set_current_semester_tx(&conn, "S2").unwrap();
        }

        assert!(!repo.find_semester("S1").unwrap().unwrap().is_current);
        assert!(repo.find_semester("S2").unwrap().unwrap().is_current);
    }

    #[test]
    fn test_duplicate_course_code_is_rejected() {
        let repo = setup();
        let course = Course {
            course_id: "C1".to_string(),
            title: "Algorithms".to_string(),
            code: "CSE-201".to_string(),
            credits: 3,
        };
        repo.insert_course(&course).unwrap();

        let dup = Course {
            course_id: "C2".to_string(),
            ..course
        };
        assert!(matches!(
            repo.insert_course(&dup),
            Err(RepositoryError::UniqueConstraintViolation(_))
        ));
    }
}
