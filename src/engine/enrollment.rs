// ==========================================
// 学期选课注册系统 - 选课协议
// ==========================================
// 学生注册进度: NOT_STARTED → STARTED → CONFIRMED
// 红线: enroll / withdraw 为一个原子单元（选课记录 + 座位 + 学分）
// 红线: 同一 (学生, 开课) 在本学期至多一条选课记录
// 红线: total_credits_taken 只经由 enroll / withdraw 变化
// ==========================================

use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::enrollment::{
    Enrollment, EnrollmentOutcome, MyRegistration, NewSemesterSummary, StudentRegistration,
    StudentRegistrationState,
};
use crate::domain::grading::EnrolledCourseRecord;
use crate::domain::registration::SemesterRegistration;
use crate::domain::types::{EnrolledCourseStatus, RegistrationStatus};
use crate::engine::capacity::SectionCapacityTracker;
use crate::engine::error::{conflict_on_unique, EngineError, EngineResult};
use crate::engine::events::{CreditEvent, CreditEventKind, OptionalCreditEventPublisher};
use crate::engine::grading::GradingPipeline;
use crate::engine::with_immediate_tx;
use crate::repository::{
    ActionLogRepository, CatalogRepository, EnrolledCourseRepository, EnrollmentRepository,
    OfferedCourseRepository, SectionRepository, SemesterRegistrationRepository,
    StudentRegistrationRepository,
};
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ==========================================
// EnrollmentProtocol - 选课协议
// ==========================================
pub struct EnrollmentProtocol {
    conn: Arc<Mutex<Connection>>,
    registration_repo: Arc<SemesterRegistrationRepository>,
    student_registration_repo: Arc<StudentRegistrationRepository>,
    enrollment_repo: Arc<EnrollmentRepository>,
    events: OptionalCreditEventPublisher,
}

impl EnrollmentProtocol {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        registration_repo: Arc<SemesterRegistrationRepository>,
        student_registration_repo: Arc<StudentRegistrationRepository>,
        enrollment_repo: Arc<EnrollmentRepository>,
        events: OptionalCreditEventPublisher,
    ) -> Self {
        Self {
            conn,
            registration_repo,
            student_registration_repo,
            enrollment_repo,
            events,
        }
    }

    /// 学生开始本学期注册（幂等）
    ///
    /// # 返回
    /// - `Ok(row)`: 新建或已存在的学生注册
    /// - `Err(NotFound)`: 无活动注册或学生不存在
    /// - `Err(Validation)`: 活动注册尚未开始（UPCOMING）
    pub fn start_registration(&self, student_id: &str, actor: &str) -> EngineResult<StudentRegistration> {
        let (row, created) = with_immediate_tx(&self.conn, |tx| {
            if !CatalogRepository::student_exists_tx(tx, student_id)? {
                return Err(EngineError::not_found("Student", student_id));
            }
            let reg = active_registration(tx)?;
            if reg.status == RegistrationStatus::Upcoming {
                return Err(EngineError::Validation("学期注册尚未开始".to_string()));
            }

            let candidate = StudentRegistration {
                id: Uuid::new_v4().to_string(),
                student_id: student_id.to_string(),
                registration_id: reg.registration_id.clone(),
                total_credits_taken: 0,
                is_confirmed: false,
                created_at: chrono::Local::now().naive_local(),
            };
            let created = StudentRegistrationRepository::insert_ignore_tx(tx, &candidate)?;
            if created {
                ActionLogRepository::insert_tx(
                    tx,
                    &ActionLog::new(ActionType::StartRegistration, actor)
                        .with_registration(&reg.registration_id)
                        .with_student(student_id),
                )?;
            }

            let row = StudentRegistrationRepository::find_tx(tx, student_id, &reg.registration_id)?
                .ok_or_else(|| EngineError::not_found("StudentRegistration", student_id))?;
            Ok((row, created))
        })?;

        if created {
            tracing::info!(
                student_id = %student_id,
                registration_id = %row.registration_id,
                "学生已开始学期注册"
            );
        } else {
            tracing::debug!(student_id = %student_id, "学生注册已存在，直接返回");
        }
        Ok(row)
    }

    /// 选课
    ///
    /// 前置: 学生/注册/开课/班级均存在；班级未满；本学期未选过该开课。
    /// 效果（同一事务）: 插入选课记录、占座、累加学分。
    pub fn enroll(
        &self,
        student_id: &str,
        offered_course_id: &str,
        section_id: &str,
        actor: &str,
    ) -> EngineResult<EnrollmentOutcome> {
        let (outcome, credits) = with_immediate_tx(&self.conn, |tx| {
            let ctx = load_enrollment_context(tx, student_id, offered_course_id, section_id)?;

            if EnrollmentRepository::find_tx(tx, &ctx.registration_id, student_id, offered_course_id)?
                .is_some()
            {
                tracing::warn!(
                    student_id = %student_id,
                    offered_course_id = %offered_course_id,
                    "重复选课被拒绝"
                );
                return Err(EngineError::Conflict(format!(
                    "学生 {} 本学期已选修开课 {}",
                    student_id, offered_course_id
                )));
            }

            let section = SectionCapacityTracker::try_reserve_seat(tx, section_id)?;

            let enrollment = Enrollment {
                registration_id: ctx.registration_id.clone(),
                student_id: student_id.to_string(),
                offered_course_id: offered_course_id.to_string(),
                section_id: section_id.to_string(),
                created_at: chrono::Local::now().naive_local(),
            };
            EnrollmentRepository::insert_tx(tx, &enrollment).map_err(|e| {
                conflict_on_unique(
                    e,
                    format!("学生 {} 本学期已选修开课 {}", student_id, offered_course_id),
                )
            })?;

            if !StudentRegistrationRepository::add_credits_tx(
                tx,
                student_id,
                &ctx.registration_id,
                ctx.credits,
            )? {
                return Err(EngineError::not_found("StudentRegistration", student_id));
            }
            let total = current_credits(tx, student_id, &ctx.registration_id)?;

            ActionLogRepository::insert_tx(
                tx,
                &ActionLog::new(ActionType::Enroll, actor)
                    .with_registration(&ctx.registration_id)
                    .with_student(student_id)
                    .with_payload(json!({
                        "offered_course_id": offered_course_id,
                        "section_id": section_id,
                        "credits": ctx.credits,
                        "total_credits_taken": total,
                    })),
            )?;

            Ok((
                EnrollmentOutcome {
                    enrollment,
                    section_enrolled_count: section.enrolled_count,
                    total_credits_taken: total,
                },
                ctx.credits,
            ))
        })?;

        tracing::info!(
            student_id = %student_id,
            offered_course_id = %offered_course_id,
            section_id = %section_id,
            enrolled_count = outcome.section_enrolled_count,
            total_credits_taken = outcome.total_credits_taken,
            "选课成功"
        );
        self.events.publish(CreditEvent::new(
            CreditEventKind::CreditsChanged,
            student_id,
            &outcome.enrollment.registration_id,
            outcome.total_credits_taken,
            credits,
        ));
        Ok(outcome)
    }

    /// 退课（选课的逆操作）
    pub fn withdraw(
        &self,
        student_id: &str,
        offered_course_id: &str,
        section_id: &str,
        actor: &str,
    ) -> EngineResult<EnrollmentOutcome> {
        let (outcome, credits) = with_immediate_tx(&self.conn, |tx| {
            let ctx = load_enrollment_context(tx, student_id, offered_course_id, section_id)?;

            let enrollment = EnrollmentRepository::find_tx(tx, &ctx.registration_id, student_id, offered_course_id)?
                .filter(|e| e.section_id == section_id)
                .ok_or_else(|| {
                    EngineError::not_found(
                        "Enrollment",
                        &format!("{}/{}/{}", student_id, offered_course_id, section_id),
                    )
                })?;

            EnrollmentRepository::delete_tx(tx, &ctx.registration_id, student_id, offered_course_id)?;
            let section = SectionCapacityTracker::release_seat(tx, section_id)?;

            if !StudentRegistrationRepository::add_credits_tx(
                tx,
                student_id,
                &ctx.registration_id,
                -ctx.credits,
            )? {
                return Err(EngineError::InvariantViolation(format!(
                    "学生 {} 的已选学分不足以扣减 {}",
                    student_id, ctx.credits
                )));
            }
            let total = current_credits(tx, student_id, &ctx.registration_id)?;

            ActionLogRepository::insert_tx(
                tx,
                &ActionLog::new(ActionType::Withdraw, actor)
                    .with_registration(&ctx.registration_id)
                    .with_student(student_id)
                    .with_payload(json!({
                        "offered_course_id": offered_course_id,
                        "section_id": section_id,
                        "credits": ctx.credits,
                        "total_credits_taken": total,
                    })),
            )?;

            Ok((
                EnrollmentOutcome {
                    enrollment,
                    section_enrolled_count: section.enrolled_count,
                    total_credits_taken: total,
                },
                ctx.credits,
            ))
        })?;

        tracing::info!(
            student_id = %student_id,
            offered_course_id = %offered_course_id,
            section_id = %section_id,
            enrolled_count = outcome.section_enrolled_count,
            total_credits_taken = outcome.total_credits_taken,
            "退课成功"
        );
        self.events.publish(CreditEvent::new(
            CreditEventKind::CreditsChanged,
            student_id,
            &outcome.enrollment.registration_id,
            outcome.total_credits_taken,
            -credits,
        ));
        Ok(outcome)
    }

    /// 确认注册
    ///
    /// 已确认时直接返回（幂等）；学分为 0 或不在 [min_credit, max_credit] 时拒绝
    pub fn confirm(&self, student_id: &str, actor: &str) -> EngineResult<StudentRegistration> {
        let (row, newly_confirmed) = with_immediate_tx(&self.conn, |tx| {
            let reg = active_registration(tx)?;
            require_ongoing(&reg)?;

            let row = StudentRegistrationRepository::find_tx(tx, student_id, &reg.registration_id)?
                .ok_or_else(|| EngineError::not_found("StudentRegistration", student_id))?;
            if row.is_confirmed {
                return Ok((row, false));
            }

            if row.total_credits_taken == 0 {
                return Err(EngineError::Validation("尚未选修任何课程".to_string()));
            }
            if !reg.credit_within_limits(row.total_credits_taken) {
                return Err(EngineError::Validation(format!(
                    "已选学分 {} 不在允许范围 {} - {} 之内",
                    row.total_credits_taken, reg.min_credit, reg.max_credit
                )));
            }

            StudentRegistrationRepository::mark_confirmed_tx(tx, student_id, &reg.registration_id)?;
            ActionLogRepository::insert_tx(
                tx,
                &ActionLog::new(ActionType::ConfirmRegistration, actor)
                    .with_registration(&reg.registration_id)
                    .with_student(student_id)
                    .with_payload(json!({ "total_credits_taken": row.total_credits_taken })),
            )?;

            let row = StudentRegistrationRepository::find_tx(tx, student_id, &reg.registration_id)?
                .ok_or_else(|| EngineError::not_found("StudentRegistration", student_id))?;
            Ok((row, true))
        })?;

        if newly_confirmed {
            tracing::info!(
                student_id = %student_id,
                registration_id = %row.registration_id,
                total_credits_taken = row.total_credits_taken,
                "学生注册已确认"
            );
            self.events.publish(CreditEvent::new(
                CreditEventKind::RegistrationConfirmed,
                student_id,
                &row.registration_id,
                row.total_credits_taken,
                0,
            ));
        } else {
            tracing::debug!(student_id = %student_id, "学生注册已确认过，忽略重复确认");
        }
        Ok(row)
    }

    /// 学生视角的当前学期注册
    pub fn get_my_registration(&self, student_id: &str) -> EngineResult<MyRegistration> {
        let registration = self
            .registration_repo
            .find_active()?
            .ok_or_else(|| EngineError::not_found("SemesterRegistration", "active"))?;
        let student_registration = self
            .student_registration_repo
            .find(student_id, &registration.registration_id)?;
        let enrollments = self
            .enrollment_repo
            .list_by_student(&registration.registration_id, student_id)?;

        Ok(MyRegistration {
            state: StudentRegistrationState::of(student_registration.as_ref()),
            registration,
            student_registration,
            enrollments,
        })
    }

    /// 开启新学期
    ///
    /// 前置: 注册已 ENDED。
    /// 效果: 标记当前学年学期；为每个已确认学生的每门选课建立修读记录与期中/期末成绩行。
    /// 可重复调用，已存在的记录不会重复创建。
    pub fn start_new_semester(&self, registration_id: &str, actor: &str) -> EngineResult<NewSemesterSummary> {
        let (summary, billed) = with_immediate_tx(&self.conn, |tx| {
            let reg = SemesterRegistrationRepository::find_by_id_tx(tx, registration_id)?
                .ok_or_else(|| EngineError::not_found("SemesterRegistration", registration_id))?;
            if reg.status != RegistrationStatus::Ended {
                return Err(EngineError::Validation(format!(
                    "学期注册尚未结束（当前 {}），不可开启新学期",
                    reg.status
                )));
            }

            CatalogRepository::set_current_semester_tx(tx, &reg.semester_id)?;

            let confirmed = StudentRegistrationRepository::list_confirmed_tx(tx, registration_id)?;
            let pairs = EnrollmentRepository::list_confirmed_course_pairs_tx(tx, registration_id)?;

            let mut created = 0usize;
            for (student_id, course_id) in &pairs {
                let record = EnrolledCourseRecord {
                    enrolled_course_id: Uuid::new_v4().to_string(),
                    student_id: student_id.clone(),
                    course_id: course_id.clone(),
                    semester_id: reg.semester_id.clone(),
                    status: EnrolledCourseStatus::Ongoing,
                    total_marks: None,
                    grade: None,
                    point: None,
                };
                if EnrolledCourseRepository::insert_ignore_tx(tx, &record)? {
                    created += 1;
                }
                let stored = EnrolledCourseRepository::find_tx(tx, student_id, course_id, &reg.semester_id)?
                    .ok_or_else(|| EngineError::not_found("EnrolledCourseRecord", course_id))?;
                GradingPipeline::initialize_marks_tx(
                    tx,
                    student_id,
                    &stored.enrolled_course_id,
                    &reg.semester_id,
                )?;
            }

            ActionLogRepository::insert_tx(
                tx,
                &ActionLog::new(ActionType::StartNewSemester, actor)
                    .with_registration(registration_id)
                    .with_payload(json!({
                        "semester_id": reg.semester_id,
                        "confirmed_students": confirmed.len(),
                        "enrolled_course_records": created,
                    })),
            )?;

            let summary = NewSemesterSummary {
                registration_id: registration_id.to_string(),
                semester_id: reg.semester_id.clone(),
                confirmed_students: confirmed.len(),
                enrolled_course_records: created,
            };
            Ok((summary, confirmed))
        })?;

        tracing::info!(
            registration_id = %registration_id,
            semester_id = %summary.semester_id,
            confirmed_students = summary.confirmed_students,
            enrolled_course_records = summary.enrolled_course_records,
            "新学期已开启"
        );
        for row in &billed {
            self.events.publish(CreditEvent::new(
                CreditEventKind::TermBilled,
                &row.student_id,
                registration_id,
                row.total_credits_taken,
                0,
            ));
        }
        Ok(summary)
    }
}

// ==========================================
// 事务内辅助
// ==========================================

/// 选课/退课共用的前置校验结果
struct EnrollmentContext {
    registration_id: String,
    credits: i64,
}

fn active_registration(conn: &Connection) -> EngineResult<SemesterRegistration> {
    SemesterRegistrationRepository::find_active_tx(conn)?
        .ok_or_else(|| EngineError::not_found("SemesterRegistration", "active"))
}

fn require_ongoing(reg: &SemesterRegistration) -> EngineResult<()> {
    if reg.status != RegistrationStatus::Ongoing {
        return Err(EngineError::Validation("学期注册尚未开始".to_string()));
    }
    Ok(())
}

fn load_enrollment_context(
    conn: &Connection,
    student_id: &str,
    offered_course_id: &str,
    section_id: &str,
) -> EngineResult<EnrollmentContext> {
    if !CatalogRepository::student_exists_tx(conn, student_id)? {
        return Err(EngineError::not_found("Student", student_id));
    }
    let reg = active_registration(conn)?;
    require_ongoing(&reg)?;

    let student_row = StudentRegistrationRepository::find_tx(conn, student_id, &reg.registration_id)?
        .ok_or_else(|| EngineError::not_found("StudentRegistration", student_id))?;
    if student_row.is_confirmed {
        return Err(EngineError::Validation("注册已确认，不可再选课或退课".to_string()));
    }

    let (offered, credits) = OfferedCourseRepository::find_with_credits_tx(conn, offered_course_id)?
        .ok_or_else(|| EngineError::not_found("OfferedCourse", offered_course_id))?;
    if offered.registration_id != reg.registration_id {
        return Err(EngineError::Validation(format!(
            "开课 {} 不属于当前学期注册",
            offered_course_id
        )));
    }

    let section = SectionRepository::find_by_id_tx(conn, section_id)?
        .ok_or_else(|| EngineError::not_found("OfferedCourseSection", section_id))?;
    if section.offered_course_id != offered_course_id {
        return Err(EngineError::Validation(format!(
            "班级 {} 不属于开课 {}",
            section_id, offered_course_id
        )));
    }

    Ok(EnrollmentContext {
        registration_id: reg.registration_id,
        credits,
    })
}

fn current_credits(conn: &Connection, student_id: &str, registration_id: &str) -> EngineResult<i64> {
    StudentRegistrationRepository::find_tx(conn, student_id, registration_id)?
        .map(|row| row.total_credits_taken)
        .ok_or_else(|| EngineError::not_found("StudentRegistration", student_id))
}
