// ==========================================
// 学期选课注册系统 - 学期注册 API
// ==========================================
// 职责: 学期注册的开启/推进/修改/删除与查询，操作日志查询
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{parse_registration_status, require_non_empty};
use crate::domain::action_log::ActionLog;
use crate::domain::registration::SemesterRegistration;
use crate::engine::RegistrationStateMachine;
use crate::perf::PerfGuard;
use crate::repository::ActionLogRepository;

/// 单次查询操作日志的默认上限
const DEFAULT_LOG_LIMIT: i32 = 200;

// ==========================================
// RegistrationApi - 学期注册 API
// ==========================================

/// 学期注册API
///
/// 职责：
/// 1. 管理员开启/推进/删除学期注册
/// 2. 学分上下限调整
/// 3. 注册与操作日志查询
pub struct RegistrationApi {
    state_machine: Arc<RegistrationStateMachine>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl RegistrationApi {
    pub fn new(
        state_machine: Arc<RegistrationStateMachine>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            state_machine,
            action_log_repo,
        }
    }

    /// 开启学期注册
    ///
    /// # 参数
    /// - semester_id: 学年学期ID
    /// - min_credit / max_credit: 学分上下限
    /// - start_date / end_date: 可选的注册起止日期
    /// - actor: 操作人
    ///
    /// # 返回
    /// - Ok(SemesterRegistration): 新建的 UPCOMING 注册
    /// - Err(ApiError::Conflict): 已存在活动注册
    pub fn open_registration(
        &self,
        semester_id: &str,
        min_credit: i64,
        max_credit: i64,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        actor: &str,
    ) -> ApiResult<SemesterRegistration> {
        let _perf = PerfGuard::new("api.open_registration");
        require_non_empty("学年学期ID", semester_id)?;
        require_non_empty("操作人", actor)?;

        Ok(self
            .state_machine
            .open(semester_id, min_credit, max_credit, start_date, end_date, actor)?)
    }

    /// 推进注册状态（目标状态以字符串传入: ONGOING / ENDED）
    pub fn advance_registration(
        &self,
        registration_id: &str,
        target_status: &str,
        actor: &str,
    ) -> ApiResult<SemesterRegistration> {
        let _perf = PerfGuard::new("api.advance_registration");
        require_non_empty("注册ID", registration_id)?;
        require_non_empty("操作人", actor)?;
        let target = parse_registration_status(target_status)?;

        Ok(self.state_machine.advance(registration_id, target, actor)?)
    }

    pub fn update_credit_limits(
        &self,
        registration_id: &str,
        min_credit: i64,
        max_credit: i64,
        actor: &str,
    ) -> ApiResult<SemesterRegistration> {
        let _perf = PerfGuard::new("api.update_credit_limits");
        require_non_empty("注册ID", registration_id)?;
        require_non_empty("操作人", actor)?;

        Ok(self
            .state_machine
            .update_credit_limits(registration_id, min_credit, max_credit, actor)?)
    }

    pub fn delete_registration(&self, registration_id: &str, actor: &str) -> ApiResult<()> {
        let _perf = PerfGuard::new("api.delete_registration");
        require_non_empty("注册ID", registration_id)?;
        require_non_empty("操作人", actor)?;

        Ok(self.state_machine.delete(registration_id, actor)?)
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn get_registration(&self, registration_id: &str) -> ApiResult<SemesterRegistration> {
        let _perf = PerfGuard::new("api.get_registration");
        require_non_empty("注册ID", registration_id)?;
        Ok(self.state_machine.get(registration_id)?)
    }

    pub fn list_registrations(&self) -> ApiResult<Vec<SemesterRegistration>> {
        let _perf = PerfGuard::new("api.list_registrations");
        Ok(self.state_machine.list()?)
    }

    /// 当前 UPCOMING/ONGOING 注册（无则返回 None）
    pub fn current_registration(&self) -> ApiResult<Option<SemesterRegistration>> {
        let _perf = PerfGuard::new("api.current_registration");
        Ok(self.state_machine.current()?)
    }

    /// 注册相关的操作日志（按时间倒序）
    pub fn list_action_logs(&self, registration_id: &str) -> ApiResult<Vec<ActionLog>> {
        let _perf = PerfGuard::new("api.list_action_logs");
        require_non_empty("注册ID", registration_id)?;
        Ok(self.action_log_repo.find_by_registration(registration_id)?)
    }

    /// 学生相关的操作日志
    pub fn list_student_action_logs(
        &self,
        student_id: &str,
        limit: Option<i32>,
    ) -> ApiResult<Vec<ActionLog>> {
        let _perf = PerfGuard::new("api.list_student_action_logs");
        require_non_empty("学生ID", student_id)?;
        let limit = limit.unwrap_or(DEFAULT_LOG_LIMIT);
        if limit <= 0 {
            return Err(ApiError::InvalidInput(format!("无效的查询条数: {}", limit)));
        }
        Ok(self.action_log_repo.find_by_student(student_id, limit)?)
    }
}
