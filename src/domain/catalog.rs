// ==========================================
// 学期选课注册系统 - 目录数据
// ==========================================
// 纯 CRUD 实体，除唯一性外无其他约束
// ==========================================

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicSemester {
    pub semester_id: String,
    pub title: String,       // Autumn / Summer / Fall
    pub year: i32,
    pub code: String,        // 01 / 02 / 03
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub course_id: String,
    pub title: String,
    pub code: String,
    pub credits: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub student_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub room_id: String,
    pub room_number: String,
    pub building: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faculty {
    pub faculty_id: String,
    pub name: String,
}
