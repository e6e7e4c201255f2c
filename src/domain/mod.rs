// ==========================================
// 学期选课注册系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、政策值对象
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod catalog;
pub mod enrollment;
pub mod grading;
pub mod registration;
pub mod section;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use catalog::{AcademicSemester, Course, Faculty, Room, Student};
pub use enrollment::{
    Enrollment, EnrollmentOutcome, MyRegistration, NewSemesterSummary, StudentRegistration,
    StudentRegistrationState,
};
pub use grading::{
    AcademicStanding, CourseMark, EnrolledCourseRecord, GradeBand, GradeTable, MarkWeights,
};
pub use registration::SemesterRegistration;
pub use section::{ClassSlot, NewClassSlot, OfferedCourse, OfferedCourseSection, SectionWithSlots};
pub use types::{DayOfWeek, EnrolledCourseStatus, ExamType, RegistrationStatus, TimeSlot};
