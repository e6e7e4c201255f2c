// ==========================================
// 学期选课注册系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 核心: 学期注册状态机、排课冲突检测、容量追踪、选课协议、成绩流水线
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 成绩政策
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// SQL 性能埋点
pub mod perf;

// API 层 - 业务接口
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{DayOfWeek, EnrolledCourseStatus, ExamType, RegistrationStatus, TimeSlot};

// 领域实体
pub use domain::{
    AcademicStanding, ActionLog, ActionType, CourseMark, EnrolledCourseRecord, Enrollment,
    OfferedCourse, OfferedCourseSection, SemesterRegistration, StudentRegistration,
};

// 引擎
pub use engine::{
    EngineError, EnrollmentProtocol, GradingPipeline, RegistrationStateMachine, SectionService,
};

// API
pub use api::{ApiError, EnrollmentApi, ErrorKind, GradingApi, RegistrationApi, SectionApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "学期选课注册系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(!APP_NAME.is_empty());
    }
}
