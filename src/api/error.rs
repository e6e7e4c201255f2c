// ==========================================
// 学期选课注册系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，将引擎/仓储错误转换为对外错误分类
// 对外只暴露稳定的 ErrorKind，消息文本可随时调整
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务校验失败: {0}")]
    ValidationError(String),

    #[error("冲突: {0}")]
    Conflict(String),

    #[error("容量不足: {0}")]
    Capacity(String),

    #[error("无效输入: {0}")]
    InvalidInput(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

/// 对外错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    Capacity,
    Internal,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::ValidationError(_) | ApiError::InvalidInput(_) => ErrorKind::Validation,
            ApiError::Conflict(_) => ErrorKind::Conflict,
            ApiError::Capacity(_) => ErrorKind::Capacity,
            ApiError::DatabaseError(_) | ApiError::InternalError(_) => ErrorKind::Internal,
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            EngineError::Validation(msg) => ApiError::ValidationError(msg),
            EngineError::Conflict(msg) => ApiError::Conflict(msg),
            EngineError::ScheduleConflict { .. } => ApiError::Conflict(err.to_string()),
            EngineError::Capacity { .. } => ApiError::Capacity(err.to_string()),
            EngineError::InvariantViolation(msg) => {
                tracing::error!(detail = %msg, "不变量被破坏");
                ApiError::InternalError(msg)
            }
            EngineError::Config(msg) => ApiError::InternalError(format!("配置错误: {}", msg)),
            EngineError::Repository(e) => ApiError::from(e),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::Conflict(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::ValidationError(format!("外键约束违反: {}", msg))
            }
            RepositoryError::CheckConstraintViolation(msg) => {
                ApiError::ValidationError(format!("检查约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg)
            | RepositoryError::DatabaseTransactionError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::InternalError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::ScheduleConflictKind;
    use crate::domain::types::DayOfWeek;
    use chrono::NaiveTime;

    #[test]
    fn test_engine_error_conversion() {
        let api_err: ApiError = EngineError::Capacity {
            section_id: "SEC1".to_string(),
            max_capacity: 30,
        }
        .into();
        assert_eq!(api_err.kind(), ErrorKind::Capacity);
        assert!(api_err.to_string().contains("SEC1"));

        let api_err: ApiError = EngineError::ScheduleConflict {
            kind: ScheduleConflictKind::Room,
            day: DayOfWeek::Monday,
            start: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            end: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
        }
        .into();
        assert_eq!(api_err.kind(), ErrorKind::Conflict);

        let api_err: ApiError = EngineError::not_found("Student", "S1").into();
        assert_eq!(api_err.kind(), ErrorKind::NotFound);

        let api_err: ApiError = EngineError::InvariantViolation("x".to_string()).into();
        assert_eq!(api_err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::NotFound {
            entity: "Course".to_string(),
            id: "C001".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::NotFound(ref msg) => {
                assert!(msg.contains("Course"));
                assert!(msg.contains("C001"));
            }
            _ => panic!("Expected NotFound"),
        }

        let api_err: ApiError = EngineError::Repository(RepositoryError::UniqueConstraintViolation(
            "enrollment".to_string(),
        ))
        .into();
        assert_eq!(api_err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_error_kind_serialization() {
        let json = serde_json::to_string(&ErrorKind::NotFound).unwrap();
        assert_eq!(json, "\"NOT_FOUND\"");
        assert_eq!(ApiError::InvalidInput("x".into()).kind(), ErrorKind::Validation);
    }
}
