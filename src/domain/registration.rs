// ==========================================
// 学期选课注册系统 - 学期注册领域模型
// ==========================================

use crate::domain::types::RegistrationStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// SemesterRegistration - 学期注册窗口
// ==========================================
// 红线: 全系统同一时刻至多一条 UPCOMING/ONGOING 记录
// 状态只允许前进，不可重开
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemesterRegistration {
    pub registration_id: String,
    pub semester_id: String,            // 所属学年学期
    pub status: RegistrationStatus,
    pub min_credit: i64,                // 确认注册所需最低学分
    pub max_credit: i64,                // 允许的最高学分
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl SemesterRegistration {
    /// 新建一个 UPCOMING 状态的注册窗口
    pub fn new_upcoming(
        semester_id: String,
        min_credit: i64,
        max_credit: i64,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Self {
        let now = chrono::Local::now().naive_local();
        Self {
            registration_id: uuid::Uuid::new_v4().to_string(),
            semester_id,
            status: RegistrationStatus::Upcoming,
            min_credit,
            max_credit,
            start_date,
            end_date,
            created_at: now,
            updated_at: now,
        }
    }

    /// 学分是否落在 [min_credit, max_credit]
    pub fn credit_within_limits(&self, credits: i64) -> bool {
        credits >= self.min_credit && credits <= self.max_credit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_limits_are_inclusive() {
        let reg = SemesterRegistration::new_upcoming("S1".to_string(), 9, 15, None, None);
        assert_eq!(reg.status, RegistrationStatus::Upcoming);
        assert!(!reg.credit_within_limits(8));
        assert!(reg.credit_within_limits(9));
        assert!(reg.credit_within_limits(15));
        assert!(!reg.credit_within_limits(16));
    }
}
