// ==========================================
// 学期选课注册系统 - 领域类型定义
// ==========================================
// 状态枚举统一以 SCREAMING_SNAKE_CASE 持久化（与数据库一致）
// ==========================================

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 学期注册状态 (Registration Status)
// ==========================================
// 只允许前进: UPCOMING → ONGOING → ENDED（终态）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    Upcoming, // 即将开始
    Ongoing,  // 进行中
    Ended,    // 已结束
}

impl RegistrationStatus {
    /// 是否占用“当前注册窗口”
    pub fn is_active(&self) -> bool {
        matches!(self, RegistrationStatus::Upcoming | RegistrationStatus::Ongoing)
    }

    /// 状态迁移是否合法
    pub fn can_transition_to(&self, target: RegistrationStatus) -> bool {
        matches!(
            (self, target),
            (RegistrationStatus::Upcoming, RegistrationStatus::Ongoing)
                | (RegistrationStatus::Ongoing, RegistrationStatus::Ended)
        )
    }

    /// 合法的下一状态
    pub fn next(&self) -> Option<RegistrationStatus> {
        match self {
            RegistrationStatus::Upcoming => Some(RegistrationStatus::Ongoing),
            RegistrationStatus::Ongoing => Some(RegistrationStatus::Ended),
            RegistrationStatus::Ended => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Upcoming => "UPCOMING",
            RegistrationStatus::Ongoing => "ONGOING",
            RegistrationStatus::Ended => "ENDED",
        }
    }

    /// 从字符串解析状态（未知值返回 None）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "UPCOMING" => Some(RegistrationStatus::Upcoming),
            "ONGOING" => Some(RegistrationStatus::Ongoing),
            "ENDED" => Some(RegistrationStatus::Ended),
            _ => None,
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 星期 (Day Of Week)
// ==========================================
// 周六为一周起始
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayOfWeek {
    Saturday,
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl DayOfWeek {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            DayOfWeek::Saturday => "SATURDAY",
            DayOfWeek::Sunday => "SUNDAY",
            DayOfWeek::Monday => "MONDAY",
            DayOfWeek::Tuesday => "TUESDAY",
            DayOfWeek::Wednesday => "WEDNESDAY",
            DayOfWeek::Thursday => "THURSDAY",
            DayOfWeek::Friday => "FRIDAY",
        }
    }

    /// 解析星期（大小写不敏感，支持全称和三字母缩写）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SATURDAY" | "SAT" => Some(DayOfWeek::Saturday),
            "SUNDAY" | "SUN" => Some(DayOfWeek::Sunday),
            "MONDAY" | "MON" => Some(DayOfWeek::Monday),
            "TUESDAY" | "TUE" => Some(DayOfWeek::Tuesday),
            "WEDNESDAY" | "WED" => Some(DayOfWeek::Wednesday),
            "THURSDAY" | "THU" => Some(DayOfWeek::Thursday),
            "FRIDAY" | "FRI" => Some(DayOfWeek::Friday),
            _ => None,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 时间段 (Time Slot)
// ==========================================
// 区间语义: [start_time, end_time)，24 小时制
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl TimeSlot {
    /// 创建时间段，start_time 必须早于 end_time
    pub fn new(day_of_week: DayOfWeek, start_time: NaiveTime, end_time: NaiveTime) -> Option<Self> {
        if start_time >= end_time {
            return None;
        }
        Some(Self {
            day_of_week,
            start_time,
            end_time,
        })
    }

    /// 从 "HH:MM" 字符串构造
    pub fn parse(day_of_week: DayOfWeek, start: &str, end: &str) -> Option<Self> {
        let start_time = parse_clock_time(start)?;
        let end_time = parse_clock_time(end)?;
        Self::new(day_of_week, start_time, end_time)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.day_of_week,
            format_clock_time(self.start_time),
            format_clock_time(self.end_time)
        )
    }
}

/// 解析 "HH:MM"（24 小时制）
pub fn parse_clock_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()
}

/// 格式化为 "HH:MM"（零填充，字典序与时间序一致）
pub fn format_clock_time(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

// ==========================================
// 考试类型 (Exam Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExamType {
    Midterm, // 期中
    Final,   // 期末
}

impl ExamType {
    pub const ALL: [ExamType; 2] = [ExamType::Midterm, ExamType::Final];

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ExamType::Midterm => "MIDTERM",
            ExamType::Final => "FINAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "MIDTERM" => Some(ExamType::Midterm),
            "FINAL" => Some(ExamType::Final),
            _ => None,
        }
    }
}

impl fmt::Display for ExamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 修读课程状态 (Enrolled Course Status)
// ==========================================
// ONGOING → COMPLETED 仅一次（期末成绩入库时）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrolledCourseStatus {
    Ongoing,
    Completed,
}

impl EnrolledCourseStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            EnrolledCourseStatus::Ongoing => "ONGOING",
            EnrolledCourseStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "ONGOING" => Some(EnrolledCourseStatus::Ongoing),
            "COMPLETED" => Some(EnrolledCourseStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for EnrolledCourseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_status_transitions() {
        use RegistrationStatus::*;

        assert!(Upcoming.can_transition_to(Ongoing));
        assert!(Ongoing.can_transition_to(Ended));

        assert!(!Upcoming.can_transition_to(Ended));
        assert!(!Upcoming.can_transition_to(Upcoming));
        assert!(!Ongoing.can_transition_to(Upcoming));
        assert!(!Ongoing.can_transition_to(Ongoing));
        assert!(!Ended.can_transition_to(Upcoming));
        assert!(!Ended.can_transition_to(Ongoing));
        assert!(!Ended.can_transition_to(Ended));

        assert_eq!(Ended.next(), None);
        assert!(Upcoming.is_active() && Ongoing.is_active() && !Ended.is_active());
    }

    #[test]
    fn test_registration_status_serde_matches_db() {
        let json = serde_json::to_string(&RegistrationStatus::Ongoing).unwrap();
        assert_eq!(json, "\"ONGOING\"");
        assert_eq!(RegistrationStatus::parse("ongoing"), Some(RegistrationStatus::Ongoing));
        assert_eq!(RegistrationStatus::parse("closed"), None);
    }

    #[test]
    fn test_day_of_week_parse() {
        assert_eq!(DayOfWeek::parse("mon"), Some(DayOfWeek::Monday));
        assert_eq!(DayOfWeek::parse("Saturday"), Some(DayOfWeek::Saturday));
        assert_eq!(DayOfWeek::parse("someday"), None);
    }

    #[test]
    fn test_time_slot_rejects_empty_or_inverted_interval() {
        assert!(TimeSlot::parse(DayOfWeek::Monday, "09:00", "10:00").is_some());
        assert!(TimeSlot::parse(DayOfWeek::Monday, "10:00", "10:00").is_none());
        assert!(TimeSlot::parse(DayOfWeek::Monday, "11:00", "10:00").is_none());
        assert!(TimeSlot::parse(DayOfWeek::Monday, "9am", "10:00").is_none());
    }

    #[test]
    fn test_clock_time_format_is_zero_padded() {
        let t = parse_clock_time("9:05").unwrap();
        assert_eq!(format_clock_time(t), "09:05");
    }
}
