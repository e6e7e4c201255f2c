// ==========================================
// 学期选课注册系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约定: `*_tx(conn, ..)` 关联函数在调用方事务内执行，
//       多记录原子操作由引擎层用 db::begin_immediate 包裹
// ==========================================

pub mod academic_info_repo;
pub mod action_log_repo;
pub mod catalog_repo;
pub mod class_slot_repo;
pub mod course_mark_repo;
pub mod enrolled_course_repo;
pub mod enrollment_repo;
pub mod error;
pub mod offered_course_repo;
pub(crate) mod row_mapping;
pub mod section_repo;
pub mod semester_registration_repo;
pub mod student_registration_repo;

// 重导出核心仓储
pub use academic_info_repo::AcademicInfoRepository;
pub use action_log_repo::ActionLogRepository;
pub use catalog_repo::CatalogRepository;
pub use class_slot_repo::ClassSlotRepository;
pub use course_mark_repo::CourseMarkRepository;
pub use enrolled_course_repo::EnrolledCourseRepository;
pub use enrollment_repo::EnrollmentRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use offered_course_repo::OfferedCourseRepository;
pub use section_repo::SectionRepository;
pub use semester_registration_repo::SemesterRegistrationRepository;
pub use student_registration_repo::StudentRegistrationRepository;
