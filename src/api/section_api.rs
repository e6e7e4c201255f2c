// ==========================================
// 学期选课注册系统 - 开课与班级 API
// ==========================================
// 职责: 开课、班级创建/删除、课表查询
// ==========================================

use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{parse_day, parse_slot, require_non_empty, ClassSlotInput};
use crate::domain::section::{ClassSlot, OfferedCourse, OfferedCourseSection, SectionWithSlots};
use crate::engine::SectionService;
use crate::perf::PerfGuard;

// ==========================================
// SectionApi - 开课与班级 API
// ==========================================
pub struct SectionApi {
    section_service: Arc<SectionService>,
}

impl SectionApi {
    pub fn new(section_service: Arc<SectionService>) -> Self {
        Self { section_service }
    }

    /// 为院系开设课程（重复开设的课程跳过）
    pub fn offer_courses(
        &self,
        registration_id: &str,
        department_id: &str,
        course_ids: &[String],
        actor: &str,
    ) -> ApiResult<Vec<OfferedCourse>> {
        let _perf = PerfGuard::new("api.offer_courses");
        require_non_empty("注册ID", registration_id)?;
        require_non_empty("院系ID", department_id)?;
        require_non_empty("操作人", actor)?;
        if course_ids.is_empty() {
            return Err(ApiError::InvalidInput("课程列表不能为空".to_string()));
        }
        for course_id in course_ids {
            require_non_empty("课程ID", course_id)?;
        }

        Ok(self
            .section_service
            .offer_courses(registration_id, department_id, course_ids, actor)?)
    }

    pub fn list_offered_courses(
        &self,
        registration_id: &str,
        department_id: Option<&str>,
    ) -> ApiResult<Vec<OfferedCourse>> {
        let _perf = PerfGuard::new("api.list_offered_courses");
        require_non_empty("注册ID", registration_id)?;
        Ok(self
            .section_service
            .list_offered_courses(registration_id, department_id)?)
    }

    /// 创建班级
    ///
    /// # 参数
    /// - slots: 课表时段（字符串形式，先解析再交给冲突检测）
    ///
    /// # 返回
    /// - Err(ApiError::InvalidInput): 时段格式错误
    /// - Err(ApiError::Conflict): 教室/教师时间冲突
    pub fn create_section(
        &self,
        offered_course_id: &str,
        title: &str,
        max_capacity: i64,
        slots: &[ClassSlotInput],
        actor: &str,
    ) -> ApiResult<SectionWithSlots> {
        let _perf = PerfGuard::new("api.create_section");
        require_non_empty("开课ID", offered_course_id)?;
        require_non_empty("班级名称", title)?;
        require_non_empty("操作人", actor)?;
        let parsed = slots.iter().map(parse_slot).collect::<ApiResult<Vec<_>>>()?;

        Ok(self.section_service.create_section(
            offered_course_id,
            title.trim(),
            max_capacity,
            &parsed,
            actor,
        )?)
    }

    pub fn delete_section(&self, section_id: &str, actor: &str) -> ApiResult<()> {
        let _perf = PerfGuard::new("api.delete_section");
        require_non_empty("班级ID", section_id)?;
        require_non_empty("操作人", actor)?;
        Ok(self.section_service.delete_section(section_id, actor)?)
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn get_section(&self, section_id: &str) -> ApiResult<SectionWithSlots> {
        let _perf = PerfGuard::new("api.get_section");
        require_non_empty("班级ID", section_id)?;
        Ok(self.section_service.get_section(section_id)?)
    }

    pub fn list_sections(
        &self,
        registration_id: &str,
        offered_course_id: Option<&str>,
    ) -> ApiResult<Vec<OfferedCourseSection>> {
        let _perf = PerfGuard::new("api.list_sections");
        require_non_empty("注册ID", registration_id)?;
        Ok(self
            .section_service
            .list_sections(registration_id, offered_course_id)?)
    }

    pub fn list_slots_for_room(&self, room_id: &str, day_of_week: &str) -> ApiResult<Vec<ClassSlot>> {
        let _perf = PerfGuard::new("api.list_slots_for_room");
        require_non_empty("教室ID", room_id)?;
        let day = parse_day(day_of_week)?;
        Ok(self.section_service.list_slots_for_room(room_id, day)?)
    }

    pub fn list_slots_for_faculty(
        &self,
        faculty_id: &str,
        day_of_week: &str,
    ) -> ApiResult<Vec<ClassSlot>> {
        let _perf = PerfGuard::new("api.list_slots_for_faculty");
        require_non_empty("教师ID", faculty_id)?;
        let day = parse_day(day_of_week)?;
        Ok(self.section_service.list_slots_for_faculty(faculty_id, day)?)
    }
}
