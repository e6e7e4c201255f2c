// ==========================================
// 学期选课注册系统 - 开课与班级服务
// ==========================================
// 职责: 学期开课、班级创建（含排课冲突检测）/删除、课表查询
// 红线: 任一候选时段冲突则整体拒绝，不落任何部分数据
// ==========================================

use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::section::{
    ClassSlot, NewClassSlot, OfferedCourse, OfferedCourseSection, SectionWithSlots,
};
use crate::domain::types::{DayOfWeek, RegistrationStatus, TimeSlot};
use crate::engine::error::{conflict_on_unique, EngineError, EngineResult};
use crate::engine::schedule_conflict::ConflictDetector;
use crate::engine::with_immediate_tx;
use crate::repository::{
    ActionLogRepository, CatalogRepository, ClassSlotRepository, OfferedCourseRepository,
    SectionRepository, SemesterRegistrationRepository,
};
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ==========================================
// SectionService - 开课与班级服务
// ==========================================
pub struct SectionService {
    conn: Arc<Mutex<Connection>>,
    offered_course_repo: Arc<OfferedCourseRepository>,
    section_repo: Arc<SectionRepository>,
    slot_repo: Arc<ClassSlotRepository>,
    detector: Arc<dyn ConflictDetector>,
}

impl SectionService {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        offered_course_repo: Arc<OfferedCourseRepository>,
        section_repo: Arc<SectionRepository>,
        slot_repo: Arc<ClassSlotRepository>,
        detector: Arc<dyn ConflictDetector>,
    ) -> Self {
        Self {
            conn,
            offered_course_repo,
            section_repo,
            slot_repo,
            detector,
        }
    }

    // ==========================================
    // 学期开课
    // ==========================================

    /// 为注册下的院系开设课程（已开设的跳过）
    ///
    /// # 返回
    /// 该注册+院系下的全部开课
    pub fn offer_courses(
        &self,
        registration_id: &str,
        department_id: &str,
        course_ids: &[String],
        actor: &str,
    ) -> EngineResult<Vec<OfferedCourse>> {
        let created = with_immediate_tx(&self.conn, |tx| {
            let reg = SemesterRegistrationRepository::find_by_id_tx(tx, registration_id)?
                .ok_or_else(|| EngineError::not_found("SemesterRegistration", registration_id))?;
            if reg.status == RegistrationStatus::Ended {
                return Err(EngineError::Validation("已结束的学期注册不可再开课".to_string()));
            }

            let mut created = Vec::new();
            for course_id in course_ids {
                if CatalogRepository::find_course_tx(tx, course_id)?.is_none() {
                    return Err(EngineError::not_found("Course", course_id));
                }
                let offered = OfferedCourse {
                    offered_course_id: Uuid::new_v4().to_string(),
                    course_id: course_id.clone(),
                    registration_id: registration_id.to_string(),
                    department_id: department_id.to_string(),
                };
                if OfferedCourseRepository::insert_ignore_tx(tx, &offered)? {
                    created.push(offered.offered_course_id);
                }
            }

            ActionLogRepository::insert_tx(
                tx,
                &ActionLog::new(ActionType::OfferCourses, actor)
                    .with_registration(registration_id)
                    .with_payload(json!({
                        "department_id": department_id,
                        "course_ids": course_ids,
                        "created": created.len(),
                    })),
            )?;
            Ok(created)
        })?;

        tracing::info!(
            registration_id = %registration_id,
            department_id = %department_id,
            requested = course_ids.len(),
            created = created.len(),
            "学期开课完成"
        );
        Ok(self
            .offered_course_repo
            .list_by_registration(registration_id, Some(department_id))?)
    }

    pub fn list_offered_courses(
        &self,
        registration_id: &str,
        department_id: Option<&str>,
    ) -> EngineResult<Vec<OfferedCourse>> {
        Ok(self
            .offered_course_repo
            .list_by_registration(registration_id, department_id)?)
    }

    // ==========================================
    // 班级
    // ==========================================

    /// 创建班级及其课表
    ///
    /// 每个候选时段先与库内同 (教室, 星期)/(教师, 星期) 的时段比较，
    /// 再与本次请求中排在它前面的候选时段比较；任一冲突即整体拒绝
    pub fn create_section(
        &self,
        offered_course_id: &str,
        title: &str,
        max_capacity: i64,
        slots: &[NewClassSlot],
        actor: &str,
    ) -> EngineResult<SectionWithSlots> {
        if max_capacity < 0 {
            return Err(EngineError::Validation("班级容量不能为负数".to_string()));
        }
        if slots.is_empty() {
            return Err(EngineError::Validation("班级至少需要一个上课时段".to_string()));
        }

        let result = with_immediate_tx(&self.conn, |tx| {
            let offered = OfferedCourseRepository::find_by_id_tx(tx, offered_course_id)?
                .ok_or_else(|| EngineError::not_found("OfferedCourse", offered_course_id))?;
            let reg = SemesterRegistrationRepository::find_by_id_tx(tx, &offered.registration_id)?
                .ok_or_else(|| {
                    EngineError::not_found("SemesterRegistration", &offered.registration_id)
                })?;
            if reg.status == RegistrationStatus::Ended {
                return Err(EngineError::Validation("已结束的学期注册不可再建班级".to_string()));
            }

            for (i, candidate) in slots.iter().enumerate() {
                if !CatalogRepository::room_exists_tx(tx, &candidate.room_id)? {
                    return Err(EngineError::not_found("Room", &candidate.room_id));
                }
                if !CatalogRepository::faculty_exists_tx(tx, &candidate.faculty_id)? {
                    return Err(EngineError::not_found("Faculty", &candidate.faculty_id));
                }

                let day = candidate.slot.day_of_week;
                let mut room_slots: Vec<TimeSlot> =
                    ClassSlotRepository::find_by_room_and_day_tx(tx, &candidate.room_id, day)?
                        .iter()
                        .map(ClassSlot::time_slot)
                        .collect();
                let mut faculty_slots: Vec<TimeSlot> =
                    ClassSlotRepository::find_by_faculty_and_day_tx(tx, &candidate.faculty_id, day)?
                        .iter()
                        .map(ClassSlot::time_slot)
                        .collect();

                for earlier in &slots[..i] {
                    if earlier.room_id == candidate.room_id {
                        room_slots.push(earlier.slot);
                    }
                    if earlier.faculty_id == candidate.faculty_id {
                        faculty_slots.push(earlier.slot);
                    }
                }

                if let Some(kind) = self.detector.check(&room_slots, &faculty_slots, &candidate.slot) {
                    tracing::warn!(
                        offered_course_id = %offered_course_id,
                        room_id = %candidate.room_id,
                        faculty_id = %candidate.faculty_id,
                        slot = %candidate.slot,
                        conflict = %kind,
                        "排课冲突，拒绝创建班级"
                    );
                    return Err(EngineError::ScheduleConflict {
                        kind,
                        day,
                        start: candidate.slot.start_time,
                        end: candidate.slot.end_time,
                    });
                }
            }

            let section = OfferedCourseSection {
                section_id: Uuid::new_v4().to_string(),
                offered_course_id: offered.offered_course_id.clone(),
                registration_id: offered.registration_id.clone(),
                title: title.to_string(),
                max_capacity,
                enrolled_count: 0,
            };
            SectionRepository::insert_tx(tx, &section)
                .map_err(|e| conflict_on_unique(e, "班级已存在"))?;

            let mut persisted = Vec::with_capacity(slots.len());
            for candidate in slots {
                let slot = ClassSlot {
                    slot_id: Uuid::new_v4().to_string(),
                    section_id: section.section_id.clone(),
                    registration_id: section.registration_id.clone(),
                    day_of_week: candidate.slot.day_of_week,
                    start_time: candidate.slot.start_time,
                    end_time: candidate.slot.end_time,
                    room_id: candidate.room_id.clone(),
                    faculty_id: candidate.faculty_id.clone(),
                };
                ClassSlotRepository::insert_tx(tx, &slot)?;
                persisted.push(slot);
            }

            ActionLogRepository::insert_tx(
                tx,
                &ActionLog::new(ActionType::CreateSection, actor)
                    .with_registration(&section.registration_id)
                    .with_payload(json!({
                        "section_id": section.section_id,
                        "offered_course_id": section.offered_course_id,
                        "max_capacity": max_capacity,
                        "slots": persisted.len(),
                    })),
            )?;

            Ok(SectionWithSlots {
                section,
                slots: persisted,
            })
        })?;

        tracing::info!(
            section_id = %result.section.section_id,
            offered_course_id = %offered_course_id,
            max_capacity,
            slots = result.slots.len(),
            "班级已创建"
        );
        Ok(result)
    }

    /// 删除无人选课的班级（课表随之删除）
    pub fn delete_section(&self, section_id: &str, actor: &str) -> EngineResult<()> {
        with_immediate_tx(&self.conn, |tx| {
            let section = SectionRepository::find_by_id_tx(tx, section_id)?
                .ok_or_else(|| EngineError::not_found("OfferedCourseSection", section_id))?;
            if !SectionRepository::delete_if_empty_tx(tx, section_id)? {
                return Err(EngineError::Validation(format!(
                    "班级已有 {} 名学生选课，不可删除",
                    section.enrolled_count
                )));
            }
            ActionLogRepository::insert_tx(
                tx,
                &ActionLog::new(ActionType::DeleteSection, actor)
                    .with_registration(&section.registration_id)
                    .with_payload(json!({ "section_id": section_id }))
                    .with_detail(format!("删除班级 {}", section.title)),
            )?;
            Ok(())
        })?;

        tracing::info!(section_id = %section_id, "班级已删除");
        Ok(())
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn get_section(&self, section_id: &str) -> EngineResult<SectionWithSlots> {
        let section = self
            .section_repo
            .find_by_id(section_id)?
            .ok_or_else(|| EngineError::not_found("OfferedCourseSection", section_id))?;
        let slots = self.slot_repo.find_by_section(section_id)?;
        Ok(SectionWithSlots { section, slots })
    }

    pub fn list_sections(
        &self,
        registration_id: &str,
        offered_course_id: Option<&str>,
    ) -> EngineResult<Vec<OfferedCourseSection>> {
        Ok(self
            .section_repo
            .list_by_registration(registration_id, offered_course_id)?)
    }

    pub fn list_slots_for_room(&self, room_id: &str, day: DayOfWeek) -> EngineResult<Vec<ClassSlot>> {
        Ok(self.slot_repo.find_by_room_and_day(room_id, day)?)
    }

    pub fn list_slots_for_faculty(
        &self,
        faculty_id: &str,
        day: DayOfWeek,
    ) -> EngineResult<Vec<ClassSlot>> {
        Ok(self.slot_repo.find_by_faculty_and_day(faculty_id, day)?)
    }
}
