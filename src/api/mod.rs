// ==========================================
// 学期选课注册系统 - API 层
// ==========================================
// 职责: 对外业务接口（入参校验、错误分类、性能埋点）
// ==========================================

pub mod error;
pub mod enrollment_api;
pub mod grading_api;
pub mod registration_api;
pub mod section_api;
pub mod validator;

// 重导出核心类型
pub use error::{ApiError, ApiResult, ErrorKind};
pub use enrollment_api::EnrollmentApi;
pub use grading_api::GradingApi;
pub use registration_api::RegistrationApi;
pub use section_api::SectionApi;
pub use validator::ClassSlotInput;
