// ==========================================
// 学期选课注册系统 - 开课/班级/课表领域模型
// ==========================================

use crate::domain::types::{DayOfWeek, TimeSlot};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

// ==========================================
// OfferedCourse - 学期开课
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferedCourse {
    pub offered_course_id: String,
    pub course_id: String,
    pub registration_id: String,
    pub department_id: String,
}

// ==========================================
// OfferedCourseSection - 开课班级
// ==========================================
// 红线: 0 <= enrolled_count <= max_capacity
// enrolled_count 只由选课协议修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferedCourseSection {
    pub section_id: String,
    pub offered_course_id: String,
    pub registration_id: String,
    pub title: String,
    pub max_capacity: i64,
    pub enrolled_count: i64,
}

impl OfferedCourseSection {
    /// 剩余座位
    pub fn available_seats(&self) -> i64 {
        (self.max_capacity - self.enrolled_count).max(0)
    }

    pub fn is_full(&self) -> bool {
        self.enrolled_count >= self.max_capacity
    }
}

// ==========================================
// ClassSlot - 每周固定上课时段
// ==========================================
// 创建后不可修改，仅随班级一起删除
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSlot {
    pub slot_id: String,
    pub section_id: String,
    pub registration_id: String,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room_id: String,
    pub faculty_id: String,
}

impl ClassSlot {
    pub fn time_slot(&self) -> TimeSlot {
        TimeSlot {
            day_of_week: self.day_of_week,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

/// 创建班级时提交的课表时段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewClassSlot {
    pub slot: TimeSlot,
    pub room_id: String,
    pub faculty_id: String,
}

/// 班级及其课表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionWithSlots {
    pub section: OfferedCourseSection,
    pub slots: Vec<ClassSlot>,
}
