// ==========================================
// 学期选课注册系统 - 学期注册状态机
// ==========================================
// 状态: UPCOMING → ONGOING → ENDED（终态，不可重开）
// 红线: 全系统同一时刻至多一条 UPCOMING/ONGOING 记录（写入时保证）
// ==========================================

use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::registration::SemesterRegistration;
use crate::domain::types::RegistrationStatus;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::with_immediate_tx;
use crate::repository::{ActionLogRepository, CatalogRepository, SemesterRegistrationRepository};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Mutex};

// ==========================================
// RegistrationStateMachine - 学期注册状态机
// ==========================================
pub struct RegistrationStateMachine {
    conn: Arc<Mutex<Connection>>,
    registration_repo: Arc<SemesterRegistrationRepository>,
}

impl RegistrationStateMachine {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        registration_repo: Arc<SemesterRegistrationRepository>,
    ) -> Self {
        Self {
            conn,
            registration_repo,
        }
    }

    /// 开启新的学期注册
    ///
    /// # 参数
    /// - `semester_id`: 学年学期
    /// - `min_credit` / `max_credit`: 确认注册的学分区间（闭区间）
    /// - `actor`: 操作人
    ///
    /// # 返回
    /// - `Ok(registration)`: 新建的 UPCOMING 注册
    /// - `Err(Conflict)`: 已存在 UPCOMING/ONGOING 注册
    pub fn open(
        &self,
        semester_id: &str,
        min_credit: i64,
        max_credit: i64,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        actor: &str,
    ) -> EngineResult<SemesterRegistration> {
        validate_credit_limits(min_credit, max_credit)?;
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if start > end {
                return Err(EngineError::Validation(format!(
                    "开始日期 {} 晚于结束日期 {}",
                    start, end
                )));
            }
        }

        let reg = SemesterRegistration::new_upcoming(
            semester_id.to_string(),
            min_credit,
            max_credit,
            start_date,
            end_date,
        );

        with_immediate_tx(&self.conn, |tx| {
            if CatalogRepository::find_semester_tx(tx, semester_id)?.is_none() {
                return Err(EngineError::not_found("AcademicSemester", semester_id));
            }

            if !SemesterRegistrationRepository::insert_if_no_active_tx(tx, &reg)? {
                tracing::warn!(semester_id = %semester_id, "开启注册被拒绝: 已存在活动注册");
                return Err(EngineError::Conflict(
                    "已存在 UPCOMING 或 ONGOING 状态的学期注册".to_string(),
                ));
            }

            ActionLogRepository::insert_tx(
                tx,
                &ActionLog::new(ActionType::OpenRegistration, actor)
                    .with_registration(&reg.registration_id)
                    .with_payload(json!({
                        "semester_id": semester_id,
                        "min_credit": min_credit,
                        "max_credit": max_credit,
                    })),
            )?;
            Ok(())
        })?;

        tracing::info!(
            registration_id = %reg.registration_id,
            semester_id = %semester_id,
            min_credit,
            max_credit,
            "学期注册已开启"
        );
        Ok(reg)
    }

    /// 推进注册状态
    ///
    /// 只允许 UPCOMING→ONGOING 与 ONGOING→ENDED；其余目标（含回退/原地）一律拒绝
    pub fn advance(
        &self,
        registration_id: &str,
        target: RegistrationStatus,
        actor: &str,
    ) -> EngineResult<SemesterRegistration> {
        let updated = with_immediate_tx(&self.conn, |tx| {
            let current = SemesterRegistrationRepository::find_by_id_tx(tx, registration_id)?
                .ok_or_else(|| EngineError::not_found("SemesterRegistration", registration_id))?;

            if !current.status.can_transition_to(target) {
                tracing::warn!(
                    registration_id = %registration_id,
                    from = %current.status,
                    to = %target,
                    "非法状态迁移"
                );
                return Err(EngineError::Validation(format!(
                    "不允许从 {} 变更为 {}",
                    current.status, target
                )));
            }

            let now = chrono::Local::now().naive_local();
            if !SemesterRegistrationRepository::compare_and_set_status_tx(
                tx,
                registration_id,
                current.status,
                target,
                now,
            )? {
                return Err(EngineError::Conflict(format!(
                    "注册 {} 的状态已被并发修改",
                    registration_id
                )));
            }

            ActionLogRepository::insert_tx(
                tx,
                &ActionLog::new(ActionType::AdvanceRegistration, actor)
                    .with_registration(registration_id)
                    .with_payload(json!({ "from": current.status, "to": target })),
            )?;

            SemesterRegistrationRepository::find_by_id_tx(tx, registration_id)?
                .ok_or_else(|| EngineError::not_found("SemesterRegistration", registration_id))
        })?;

        tracing::info!(
            registration_id = %registration_id,
            status = %updated.status,
            "学期注册状态已推进"
        );
        Ok(updated)
    }

    /// 修改学分上下限（ENDED 后拒绝）
    pub fn update_credit_limits(
        &self,
        registration_id: &str,
        min_credit: i64,
        max_credit: i64,
        actor: &str,
    ) -> EngineResult<SemesterRegistration> {
        validate_credit_limits(min_credit, max_credit)?;

        let updated = with_immediate_tx(&self.conn, |tx| {
            let current = SemesterRegistrationRepository::find_by_id_tx(tx, registration_id)?
                .ok_or_else(|| EngineError::not_found("SemesterRegistration", registration_id))?;
            if current.status == RegistrationStatus::Ended {
                return Err(EngineError::Validation(
                    "已结束的学期注册不可修改学分上下限".to_string(),
                ));
            }

            let now = chrono::Local::now().naive_local();
            SemesterRegistrationRepository::update_credit_limits_tx(
                tx,
                registration_id,
                min_credit,
                max_credit,
                now,
            )?;

            ActionLogRepository::insert_tx(
                tx,
                &ActionLog::new(ActionType::UpdateCreditLimits, actor)
                    .with_registration(registration_id)
                    .with_payload(json!({
                        "old": [current.min_credit, current.max_credit],
                        "new": [min_credit, max_credit],
                    })),
            )?;

            SemesterRegistrationRepository::find_by_id_tx(tx, registration_id)?
                .ok_or_else(|| EngineError::not_found("SemesterRegistration", registration_id))
        })?;

        tracing::info!(registration_id = %registration_id, min_credit, max_credit, "学分上下限已更新");
        Ok(updated)
    }

    /// 删除注册（仅 UPCOMING 且未建班级）
    pub fn delete(&self, registration_id: &str, actor: &str) -> EngineResult<()> {
        with_immediate_tx(&self.conn, |tx| {
            let current = SemesterRegistrationRepository::find_by_id_tx(tx, registration_id)?
                .ok_or_else(|| EngineError::not_found("SemesterRegistration", registration_id))?;
            if current.status != RegistrationStatus::Upcoming {
                return Err(EngineError::Validation(format!(
                    "只能删除 UPCOMING 状态的注册，当前为 {}",
                    current.status
                )));
            }
            if SemesterRegistrationRepository::count_sections_tx(tx, registration_id)? > 0 {
                return Err(EngineError::Validation("注册下已有班级，不可删除".to_string()));
            }

            SemesterRegistrationRepository::delete_tx(tx, registration_id)?;
            ActionLogRepository::insert_tx(
                tx,
                &ActionLog::new(ActionType::DeleteRegistration, actor)
                    .with_registration(registration_id),
            )?;
            Ok(())
        })?;

        tracing::info!(registration_id = %registration_id, "学期注册已删除");
        Ok(())
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn get(&self, registration_id: &str) -> EngineResult<SemesterRegistration> {
        self.registration_repo
            .find_by_id(registration_id)?
            .ok_or_else(|| EngineError::not_found("SemesterRegistration", registration_id))
    }

    pub fn list(&self) -> EngineResult<Vec<SemesterRegistration>> {
        Ok(self.registration_repo.list_all()?)
    }

    /// 当前活动注册（UPCOMING 或 ONGOING）
    pub fn current(&self) -> EngineResult<Option<SemesterRegistration>> {
        Ok(self.registration_repo.find_active()?)
    }
}

fn validate_credit_limits(min_credit: i64, max_credit: i64) -> EngineResult<()> {
    if min_credit < 0 || max_credit < 0 {
        return Err(EngineError::Validation("学分上下限不能为负数".to_string()));
    }
    if min_credit > max_credit {
        return Err(EngineError::Validation(format!(
            "最低学分 {} 大于最高学分 {}",
            min_credit, max_credit
        )));
    }
    Ok(())
}
