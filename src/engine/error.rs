// ==========================================
// 学期选课注册系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约定: 引擎不吞错、不重试；事务内任何错误都会回滚
// ==========================================

use crate::domain::types::{format_clock_time, DayOfWeek};
use crate::repository::error::RepositoryError;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 排课冲突对象
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleConflictKind {
    Room,
    Faculty,
    RoomAndFaculty,
}

impl fmt::Display for ScheduleConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScheduleConflictKind::Room => "教室",
            ScheduleConflictKind::Faculty => "教师",
            ScheduleConflictKind::RoomAndFaculty => "教室和教师",
        };
        write!(f, "{}", s)
    }
}

fn hm(t: &NaiveTime) -> String {
    format_clock_time(*t)
}

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{entity} 不存在: {id}")]
    NotFound { entity: String, id: String },

    #[error("校验失败: {0}")]
    Validation(String),

    #[error("冲突: {0}")]
    Conflict(String),

    #[error("排课冲突: {kind}在 {day} {}-{} 已被占用", hm(.start), hm(.end))]
    ScheduleConflict {
        kind: ScheduleConflictKind,
        day: DayOfWeek,
        start: NaiveTime,
        end: NaiveTime,
    },

    #[error("班级已满: section_id={section_id}, max_capacity={max_capacity}")]
    Capacity { section_id: String, max_capacity: i64 },

    #[error("不变量被破坏: {0}")]
    InvariantViolation(String),

    #[error("配置读取失败: {0}")]
    Config(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl EngineError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        EngineError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        EngineError::Repository(err.into())
    }
}

/// 事务内的唯一约束冲突转为 Conflict，其余仓储错误原样上抛
pub(crate) fn conflict_on_unique(err: RepositoryError, message: impl Into<String>) -> EngineError {
    match err {
        RepositoryError::UniqueConstraintViolation(_) => EngineError::Conflict(message.into()),
        other => EngineError::Repository(other),
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_conflict_message_names_slot() {
        let err = EngineError::ScheduleConflict {
            kind: ScheduleConflictKind::Room,
            day: DayOfWeek::Monday,
            start: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            end: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
        };
        let msg = err.to_string();
        assert!(msg.contains("教室"));
        assert!(msg.contains("MONDAY 09:30-10:30"));
    }

    #[test]
    fn test_unique_violation_maps_to_conflict() {
        let err = conflict_on_unique(
            RepositoryError::UniqueConstraintViolation("UNIQUE".to_string()),
            "重复选课",
        );
        assert!(matches!(err, EngineError::Conflict(_)));

        let err = conflict_on_unique(RepositoryError::LockError("x".to_string()), "重复选课");
        assert!(matches!(err, EngineError::Repository(_)));
    }
}
