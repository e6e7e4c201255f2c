// ==========================================
// 学期选课注册系统 - 操作日志领域模型
// ==========================================
// 红线: 所有写操作必须记录（与业务变更同一事务）
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,
    pub action_type: String,
    pub action_ts: NaiveDateTime,
    pub actor: String,
    pub registration_id: Option<String>,
    pub student_id: Option<String>,
    pub payload_json: Option<JsonValue>,
    pub detail: Option<String>,
}

impl ActionLog {
    /// 构造一条当前时间的操作日志
    pub fn new(action_type: ActionType, actor: &str) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type: action_type.to_string(),
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            registration_id: None,
            student_id: None,
            payload_json: None,
            detail: None,
        }
    }

    pub fn with_registration(mut self, registration_id: &str) -> Self {
        self.registration_id = Some(registration_id.to_string());
        self
    }

    pub fn with_student(mut self, student_id: &str) -> Self {
        self.student_id = Some(student_id.to_string());
        self
    }

    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload_json = Some(payload);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    OpenRegistration,
    AdvanceRegistration,
    UpdateCreditLimits,
    DeleteRegistration,
    OfferCourses,
    CreateSection,
    DeleteSection,
    StartRegistration,
    Enroll,
    Withdraw,
    ConfirmRegistration,
    StartNewSemester,
    RecordMark,
    FinalizeCourse,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::OpenRegistration => "OPEN_REGISTRATION",
            ActionType::AdvanceRegistration => "ADVANCE_REGISTRATION",
            ActionType::UpdateCreditLimits => "UPDATE_CREDIT_LIMITS",
            ActionType::DeleteRegistration => "DELETE_REGISTRATION",
            ActionType::OfferCourses => "OFFER_COURSES",
            ActionType::CreateSection => "CREATE_SECTION",
            ActionType::DeleteSection => "DELETE_SECTION",
            ActionType::StartRegistration => "START_REGISTRATION",
            ActionType::Enroll => "ENROLL",
            ActionType::Withdraw => "WITHDRAW",
            ActionType::ConfirmRegistration => "CONFIRM_REGISTRATION",
            ActionType::StartNewSemester => "START_NEW_SEMESTER",
            ActionType::RecordMark => "RECORD_MARK",
            ActionType::FinalizeCourse => "FINALIZE_COURSE",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
