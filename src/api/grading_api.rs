// ==========================================
// 学期选课注册系统 - 成绩 API
// ==========================================
// 职责: 成绩录入、结课、学业状态查询
// ==========================================

use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::validator::{parse_exam_type, require_non_empty, validate_marks};
use crate::domain::grading::{AcademicStanding, CourseMark, EnrolledCourseRecord};
use crate::engine::GradingPipeline;
use crate::perf::PerfGuard;

// ==========================================
// GradingApi - 成绩 API
// ==========================================
pub struct GradingApi {
    pipeline: Arc<GradingPipeline>,
}

impl GradingApi {
    pub fn new(pipeline: Arc<GradingPipeline>) -> Self {
        Self { pipeline }
    }

    /// 为修读记录补建期中/期末成绩行（幂等）
    pub fn initialize_marks(
        &self,
        student_id: &str,
        enrolled_course_id: &str,
        semester_id: &str,
    ) -> ApiResult<usize> {
        let _perf = PerfGuard::new("api.initialize_marks");
        require_non_empty("学生ID", student_id)?;
        require_non_empty("修读记录ID", enrolled_course_id)?;
        require_non_empty("学年学期ID", semester_id)?;
        Ok(self
            .pipeline
            .initialize_marks(student_id, enrolled_course_id, semester_id)?)
    }

    /// 录入成绩
    ///
    /// # 参数
    /// - exam_type: MIDTERM / FINAL
    /// - marks: 0..=100，越界返回 ValidationError
    pub fn record_mark(
        &self,
        student_id: &str,
        course_id: &str,
        semester_id: &str,
        exam_type: &str,
        marks: i64,
        actor: &str,
    ) -> ApiResult<CourseMark> {
        let _perf = PerfGuard::new("api.record_mark");
        require_non_empty("学生ID", student_id)?;
        require_non_empty("课程ID", course_id)?;
        require_non_empty("学年学期ID", semester_id)?;
        require_non_empty("操作人", actor)?;
        let exam_type = parse_exam_type(exam_type)?;
        let marks = validate_marks(marks)?;

        Ok(self
            .pipeline
            .record_mark(student_id, course_id, semester_id, exam_type, marks, actor)?)
    }

    pub fn finalize_course(
        &self,
        student_id: &str,
        course_id: &str,
        semester_id: &str,
        actor: &str,
    ) -> ApiResult<EnrolledCourseRecord> {
        let _perf = PerfGuard::new("api.finalize_course");
        require_non_empty("学生ID", student_id)?;
        require_non_empty("课程ID", course_id)?;
        require_non_empty("学年学期ID", semester_id)?;
        require_non_empty("操作人", actor)?;
        Ok(self
            .pipeline
            .finalize_course(student_id, course_id, semester_id, actor)?)
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn get_academic_standing(&self, student_id: &str) -> ApiResult<AcademicStanding> {
        let _perf = PerfGuard::new("api.get_academic_standing");
        require_non_empty("学生ID", student_id)?;
        Ok(self.pipeline.get_academic_standing(student_id)?)
    }

    pub fn list_course_marks(
        &self,
        student_id: &str,
        semester_id: Option<&str>,
    ) -> ApiResult<Vec<CourseMark>> {
        let _perf = PerfGuard::new("api.list_course_marks");
        require_non_empty("学生ID", student_id)?;
        Ok(self.pipeline.list_course_marks(student_id, semester_id)?)
    }

    pub fn list_enrolled_courses(
        &self,
        student_id: &str,
        semester_id: Option<&str>,
    ) -> ApiResult<Vec<EnrolledCourseRecord>> {
        let _perf = PerfGuard::new("api.list_enrolled_courses");
        require_non_empty("学生ID", student_id)?;
        Ok(self.pipeline.list_enrolled_courses(student_id, semester_id)?)
    }
}
