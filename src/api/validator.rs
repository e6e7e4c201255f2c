// ==========================================
// 学期选课注册系统 - 输入校验器
// ==========================================
// 职责: API 入参的格式校验与解析（字符串 → 领域类型）
// 红线: 只做格式校验，不做业务规则判断
// ==========================================

use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::grading::MAX_MARKS;
use crate::domain::section::NewClassSlot;
use crate::domain::types::{DayOfWeek, ExamType, RegistrationStatus, TimeSlot};

/// 课表时段输入（字符串形式）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassSlotInput {
    /// 星期（全称或三字母缩写，大小写不敏感）
    pub day_of_week: String,
    /// HH:MM
    pub start_time: String,
    /// HH:MM
    pub end_time: String,
    pub room_id: String,
    pub faculty_id: String,
}

/// 非空校验
pub fn require_non_empty(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("{}不能为空", field)));
    }
    Ok(())
}

pub fn parse_day(value: &str) -> ApiResult<DayOfWeek> {
    DayOfWeek::parse(value)
        .ok_or_else(|| ApiError::InvalidInput(format!("无效的星期: {}", value)))
}

pub fn parse_exam_type(value: &str) -> ApiResult<ExamType> {
    ExamType::parse(value)
        .ok_or_else(|| ApiError::InvalidInput(format!("无效的考试类型: {}", value)))
}

pub fn parse_registration_status(value: &str) -> ApiResult<RegistrationStatus> {
    RegistrationStatus::parse(value)
        .ok_or_else(|| ApiError::InvalidInput(format!("无效的注册状态: {}", value)))
}

/// 解析课表时段
///
/// # 规则
/// - 时间为 24 小时制 HH:MM
/// - 开始时间必须早于结束时间
pub fn parse_slot(input: &ClassSlotInput) -> ApiResult<NewClassSlot> {
    require_non_empty("教室ID", &input.room_id)?;
    require_non_empty("教师ID", &input.faculty_id)?;
    let day = parse_day(&input.day_of_week)?;
    let slot = TimeSlot::parse(day, &input.start_time, &input.end_time).ok_or_else(|| {
        ApiError::InvalidInput(format!(
            "无效的上课时间: {} {}-{}",
            input.day_of_week, input.start_time, input.end_time
        ))
    })?;
    Ok(NewClassSlot {
        slot,
        room_id: input.room_id.trim().to_string(),
        faculty_id: input.faculty_id.trim().to_string(),
    })
}

/// 分数范围校验（0..=100）
pub fn validate_marks(marks: i64) -> ApiResult<u32> {
    if marks < 0 || marks > i64::from(MAX_MARKS) {
        return Err(ApiError::ValidationError(format!(
            "分数 {} 超出范围 0 - {}",
            marks, MAX_MARKS
        )));
    }
    Ok(marks as u32)
}
