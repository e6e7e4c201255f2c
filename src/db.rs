// ==========================================
// 学期选课注册系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - 统一建表入口，保证测试库与运行库 schema 一致
// - 提供 IMMEDIATE 事务入口，多记录原子操作一律走这里
// ==========================================

use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置（多连接并发写入时等待写锁，而不是立即报 busy）
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let mut conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    crate::perf::install_sqlite_tracing(&mut conn);
    Ok(conn)
}

/// 开启 IMMEDIATE 事务
///
/// BEGIN IMMEDIATE 在事务开始时即获取写锁，
/// 事务内的“先查后写”不会与其他连接的写入交错。
pub fn begin_immediate(conn: &mut Connection) -> rusqlite::Result<Transaction<'_>> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化数据库 schema（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    if let Some(v) = read_schema_version(conn)? {
        if v != CURRENT_SCHEMA_VERSION {
            tracing::warn!(
                db_version = v,
                expected = CURRENT_SCHEMA_VERSION,
                "数据库 schema_version 与代码期望不一致"
            );
        }
    }

    Ok(())
}

// ==========================================
// Schema
// ==========================================
// 约束兜底:
// - offered_course_section: 0 <= enrolled_count <= max_capacity
// - student_semester_registration: total_credits_taken >= 0
// - 选课记录主键 (registration_id, student_id, offered_course_id)：同一学期同一开课只能选一次
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS action_log (
    action_id TEXT PRIMARY KEY,
    action_type TEXT NOT NULL,
    action_ts TEXT NOT NULL,
    actor TEXT NOT NULL,
    registration_id TEXT,
    student_id TEXT,
    payload_json TEXT,
    detail TEXT
);
CREATE INDEX IF NOT EXISTS idx_action_log_registration ON action_log(registration_id);
CREATE INDEX IF NOT EXISTS idx_action_log_student ON action_log(student_id);

-- ===== 目录数据 =====
CREATE TABLE IF NOT EXISTS academic_semester (
    semester_id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    year INTEGER NOT NULL,
    code TEXT NOT NULL,
    is_current INTEGER NOT NULL DEFAULT 0,
    UNIQUE (year, code)
);

CREATE TABLE IF NOT EXISTS course (
    course_id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    code TEXT NOT NULL UNIQUE,
    credits INTEGER NOT NULL CHECK (credits >= 0)
);

CREATE TABLE IF NOT EXISTS student (
    student_id TEXT PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS room (
    room_id TEXT PRIMARY KEY,
    room_number TEXT NOT NULL,
    building TEXT NOT NULL,
    UNIQUE (building, room_number)
);

CREATE TABLE IF NOT EXISTS faculty (
    faculty_id TEXT PRIMARY KEY,
    name TEXT NOT NULL
);

-- ===== 学期注册 =====
CREATE TABLE IF NOT EXISTS semester_registration (
    registration_id TEXT PRIMARY KEY,
    semester_id TEXT NOT NULL REFERENCES academic_semester(semester_id),
    status TEXT NOT NULL CHECK (status IN ('UPCOMING', 'ONGOING', 'ENDED')),
    min_credit INTEGER NOT NULL CHECK (min_credit >= 0),
    max_credit INTEGER NOT NULL CHECK (max_credit >= min_credit),
    start_date TEXT,
    end_date TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_semester_registration_status ON semester_registration(status);

CREATE TABLE IF NOT EXISTS offered_course (
    offered_course_id TEXT PRIMARY KEY,
    course_id TEXT NOT NULL REFERENCES course(course_id),
    registration_id TEXT NOT NULL REFERENCES semester_registration(registration_id) ON DELETE CASCADE,
    department_id TEXT NOT NULL,
    UNIQUE (registration_id, course_id, department_id)
);

CREATE TABLE IF NOT EXISTS offered_course_section (
    section_id TEXT PRIMARY KEY,
    offered_course_id TEXT NOT NULL REFERENCES offered_course(offered_course_id) ON DELETE CASCADE,
    registration_id TEXT NOT NULL REFERENCES semester_registration(registration_id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    max_capacity INTEGER NOT NULL CHECK (max_capacity >= 0),
    enrolled_count INTEGER NOT NULL DEFAULT 0,
    CHECK (enrolled_count >= 0 AND enrolled_count <= max_capacity)
);

CREATE TABLE IF NOT EXISTS class_slot (
    slot_id TEXT PRIMARY KEY,
    section_id TEXT NOT NULL REFERENCES offered_course_section(section_id) ON DELETE CASCADE,
    registration_id TEXT NOT NULL REFERENCES semester_registration(registration_id) ON DELETE CASCADE,
    day_of_week TEXT NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    room_id TEXT NOT NULL REFERENCES room(room_id),
    faculty_id TEXT NOT NULL REFERENCES faculty(faculty_id),
    CHECK (start_time < end_time)
);
CREATE INDEX IF NOT EXISTS idx_class_slot_room_day ON class_slot(room_id, day_of_week);
CREATE INDEX IF NOT EXISTS idx_class_slot_faculty_day ON class_slot(faculty_id, day_of_week);

-- ===== 学生选课 =====
CREATE TABLE IF NOT EXISTS student_semester_registration (
    id TEXT PRIMARY KEY,
    student_id TEXT NOT NULL REFERENCES student(student_id),
    registration_id TEXT NOT NULL REFERENCES semester_registration(registration_id) ON DELETE CASCADE,
    total_credits_taken INTEGER NOT NULL DEFAULT 0 CHECK (total_credits_taken >= 0),
    is_confirmed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    UNIQUE (student_id, registration_id)
);

CREATE TABLE IF NOT EXISTS student_semester_registration_course (
    registration_id TEXT NOT NULL REFERENCES semester_registration(registration_id) ON DELETE CASCADE,
    student_id TEXT NOT NULL REFERENCES student(student_id),
    offered_course_id TEXT NOT NULL REFERENCES offered_course(offered_course_id),
    section_id TEXT NOT NULL REFERENCES offered_course_section(section_id),
    created_at TEXT NOT NULL,
    PRIMARY KEY (registration_id, student_id, offered_course_id)
);
CREATE INDEX IF NOT EXISTS idx_enrollment_section ON student_semester_registration_course(section_id);

-- ===== 成绩 =====
CREATE TABLE IF NOT EXISTS student_enrolled_course (
    enrolled_course_id TEXT PRIMARY KEY,
    student_id TEXT NOT NULL REFERENCES student(student_id),
    course_id TEXT NOT NULL REFERENCES course(course_id),
    semester_id TEXT NOT NULL REFERENCES academic_semester(semester_id),
    status TEXT NOT NULL CHECK (status IN ('ONGOING', 'COMPLETED')),
    total_marks INTEGER,
    grade TEXT,
    point REAL,
    UNIQUE (student_id, course_id, semester_id)
);

CREATE TABLE IF NOT EXISTS student_enrolled_course_mark (
    mark_id TEXT PRIMARY KEY,
    student_id TEXT NOT NULL REFERENCES student(student_id),
    enrolled_course_id TEXT NOT NULL REFERENCES student_enrolled_course(enrolled_course_id) ON DELETE CASCADE,
    semester_id TEXT NOT NULL REFERENCES academic_semester(semester_id),
    exam_type TEXT NOT NULL CHECK (exam_type IN ('MIDTERM', 'FINAL')),
    marks INTEGER CHECK (marks IS NULL OR (marks >= 0 AND marks <= 100)),
    grade TEXT,
    UNIQUE (enrolled_course_id, exam_type)
);

CREATE TABLE IF NOT EXISTS student_academic_info (
    student_id TEXT PRIMARY KEY REFERENCES student(student_id),
    cgpa REAL NOT NULL DEFAULT 0,
    total_completed_credit INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_read_schema_version_without_table() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }
}
