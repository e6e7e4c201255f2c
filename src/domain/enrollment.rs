// ==========================================
// 学期选课注册系统 - 学生注册/选课领域模型
// ==========================================

use crate::domain::registration::SemesterRegistration;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// StudentRegistration - 学生学期注册
// ==========================================
// total_credits_taken 只随选课/退课原子增减
// is_confirmed 只置位一次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRegistration {
    pub id: String,
    pub student_id: String,
    pub registration_id: String,
    pub total_credits_taken: i64,
    pub is_confirmed: bool,
    pub created_at: NaiveDateTime,
}

/// 学生注册进度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StudentRegistrationState {
    NotStarted,
    Started,
    Confirmed,
}

impl StudentRegistrationState {
    pub fn of(row: Option<&StudentRegistration>) -> Self {
        match row {
            None => StudentRegistrationState::NotStarted,
            Some(r) if r.is_confirmed => StudentRegistrationState::Confirmed,
            Some(_) => StudentRegistrationState::Started,
        }
    }
}

// ==========================================
// Enrollment - 选课记录
// ==========================================
// 唯一: (registration_id, student_id, offered_course_id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub registration_id: String,
    pub student_id: String,
    pub offered_course_id: String,
    pub section_id: String,
    pub created_at: NaiveDateTime,
}

/// 学生视角的本学期注册情况
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MyRegistration {
    pub registration: SemesterRegistration,
    pub student_registration: Option<StudentRegistration>,
    pub state: StudentRegistrationState,
    pub enrollments: Vec<Enrollment>,
}

/// 选课/退课结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentOutcome {
    pub enrollment: Enrollment,
    pub section_enrolled_count: i64,
    pub total_credits_taken: i64,
}

/// 新学期开启结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewSemesterSummary {
    pub registration_id: String,
    pub semester_id: String,
    pub confirmed_students: usize,
    pub enrolled_course_records: usize,
}
