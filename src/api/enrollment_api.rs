// ==========================================
// 学期选课注册系统 - 选课 API
// ==========================================
// 职责: 学生开始注册、选课、退课、确认；管理员开启新学期
// ==========================================

use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::validator::require_non_empty;
use crate::domain::enrollment::{
    EnrollmentOutcome, MyRegistration, NewSemesterSummary, StudentRegistration,
};
use crate::engine::EnrollmentProtocol;
use crate::perf::PerfGuard;

// ==========================================
// EnrollmentApi - 选课 API
// ==========================================
pub struct EnrollmentApi {
    protocol: Arc<EnrollmentProtocol>,
}

impl EnrollmentApi {
    pub fn new(protocol: Arc<EnrollmentProtocol>) -> Self {
        Self { protocol }
    }

    /// 学生开始本学期注册（重复调用返回同一条记录）
    pub fn start_registration(&self, student_id: &str, actor: &str) -> ApiResult<StudentRegistration> {
        let _perf = PerfGuard::new("api.start_registration");
        require_non_empty("学生ID", student_id)?;
        require_non_empty("操作人", actor)?;
        Ok(self.protocol.start_registration(student_id, actor)?)
    }

    /// 选课
    ///
    /// # 返回
    /// - Err(ApiError::Capacity): 班级已满
    /// - Err(ApiError::Conflict): 本学期已选过该开课
    pub fn enroll(
        &self,
        student_id: &str,
        offered_course_id: &str,
        section_id: &str,
        actor: &str,
    ) -> ApiResult<EnrollmentOutcome> {
        let _perf = PerfGuard::new("api.enroll");
        require_non_empty("学生ID", student_id)?;
        require_non_empty("开课ID", offered_course_id)?;
        require_non_empty("班级ID", section_id)?;
        require_non_empty("操作人", actor)?;
        Ok(self
            .protocol
            .enroll(student_id, offered_course_id, section_id, actor)?)
    }

    pub fn withdraw(
        &self,
        student_id: &str,
        offered_course_id: &str,
        section_id: &str,
        actor: &str,
    ) -> ApiResult<EnrollmentOutcome> {
        let _perf = PerfGuard::new("api.withdraw");
        require_non_empty("学生ID", student_id)?;
        require_non_empty("开课ID", offered_course_id)?;
        require_non_empty("班级ID", section_id)?;
        require_non_empty("操作人", actor)?;
        Ok(self
            .protocol
            .withdraw(student_id, offered_course_id, section_id, actor)?)
    }

    pub fn confirm_registration(&self, student_id: &str, actor: &str) -> ApiResult<StudentRegistration> {
        let _perf = PerfGuard::new("api.confirm_registration");
        require_non_empty("学生ID", student_id)?;
        require_non_empty("操作人", actor)?;
        Ok(self.protocol.confirm(student_id, actor)?)
    }

    pub fn get_my_registration(&self, student_id: &str) -> ApiResult<MyRegistration> {
        let _perf = PerfGuard::new("api.get_my_registration");
        require_non_empty("学生ID", student_id)?;
        Ok(self.protocol.get_my_registration(student_id)?)
    }

    pub fn start_new_semester(&self, registration_id: &str, actor: &str) -> ApiResult<NewSemesterSummary> {
        let _perf = PerfGuard::new("api.start_new_semester");
        require_non_empty("注册ID", registration_id)?;
        require_non_empty("操作人", actor)?;
        Ok(self.protocol.start_new_semester(registration_id, actor)?)
    }
}
