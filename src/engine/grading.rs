// ==========================================
// 学期选课注册系统 - 成绩流水线
// ==========================================
// 流程: 初始化成绩行 → 录入期中/期末 → 结课（总评 + 等级） → 重算学业状态
// 红线: finalize_course 为一个原子单元（修读记录 + 学业状态）
// 红线: 学业状态每次从全部 COMPLETED 记录重算，不做增量
// ==========================================

use crate::config::GradingPolicyReader;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::grading::{
    compute_cgpa, AcademicStanding, CourseMark, EnrolledCourseRecord, GradeTable, MarkWeights,
    MAX_MARKS,
};
use crate::domain::types::{EnrolledCourseStatus, ExamType};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::with_immediate_tx;
use crate::repository::{
    AcademicInfoRepository, ActionLogRepository, CourseMarkRepository, EnrolledCourseRepository,
};
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ==========================================
// GradingPipeline - 成绩流水线
// ==========================================
pub struct GradingPipeline {
    conn: Arc<Mutex<Connection>>,
    enrolled_course_repo: Arc<EnrolledCourseRepository>,
    course_mark_repo: Arc<CourseMarkRepository>,
    academic_info_repo: Arc<AcademicInfoRepository>,
    policy: Arc<dyn GradingPolicyReader>,
}

impl GradingPipeline {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        enrolled_course_repo: Arc<EnrolledCourseRepository>,
        course_mark_repo: Arc<CourseMarkRepository>,
        academic_info_repo: Arc<AcademicInfoRepository>,
        policy: Arc<dyn GradingPolicyReader>,
    ) -> Self {
        Self {
            conn,
            enrolled_course_repo,
            course_mark_repo,
            academic_info_repo,
            policy,
        }
    }

    // ==========================================
    // 成绩行初始化
    // ==========================================

    /// 为修读记录建立期中/期末两行空成绩（幂等）
    pub fn initialize_marks(
        &self,
        student_id: &str,
        enrolled_course_id: &str,
        semester_id: &str,
    ) -> EngineResult<usize> {
        let created = with_immediate_tx(&self.conn, |tx| {
            if EnrolledCourseRepository::find_by_id_tx(tx, enrolled_course_id)?.is_none() {
                return Err(EngineError::not_found("EnrolledCourseRecord", enrolled_course_id));
            }
            Self::initialize_marks_tx(tx, student_id, enrolled_course_id, semester_id)
        })?;

        if created == 0 {
            tracing::debug!(enrolled_course_id = %enrolled_course_id, "成绩行已存在，跳过初始化");
        }
        Ok(created)
    }

    /// 事务内版本，供开启新学期复用
    ///
    /// # 返回
    /// 本次新建的成绩行数（0..=2）
    pub fn initialize_marks_tx(
        conn: &Connection,
        student_id: &str,
        enrolled_course_id: &str,
        semester_id: &str,
    ) -> EngineResult<usize> {
        let mut created = 0;
        for exam_type in ExamType::ALL {
            let mark = CourseMark {
                mark_id: Uuid::new_v4().to_string(),
                student_id: student_id.to_string(),
                enrolled_course_id: enrolled_course_id.to_string(),
                semester_id: semester_id.to_string(),
                exam_type,
                marks: None,
                grade: None,
            };
            if CourseMarkRepository::insert_ignore_tx(conn, &mark)? {
                created += 1;
            }
        }
        Ok(created)
    }

    // ==========================================
    // 录入成绩
    // ==========================================

    /// 录入单次考试成绩，并按等级表写入该行等级
    ///
    /// # 参数
    /// - `marks`: 原始分数 0..=100
    ///
    /// # 返回
    /// - `Err(NotFound)`: 修读记录或成绩行不存在
    /// - `Err(Validation)`: 分数越界或课程已结课
    pub fn record_mark(
        &self,
        student_id: &str,
        course_id: &str,
        semester_id: &str,
        exam_type: ExamType,
        marks: u32,
        actor: &str,
    ) -> EngineResult<CourseMark> {
        if marks > MAX_MARKS {
            return Err(EngineError::Validation(format!(
                "分数 {} 超出范围 0 - {}",
                marks, MAX_MARKS
            )));
        }
        let table = self.grade_table()?;
        let band = table.lookup(marks).clone();

        let mark = with_immediate_tx(&self.conn, |tx| {
            let record = find_record(tx, student_id, course_id, semester_id)?;
            if record.status == EnrolledCourseStatus::Completed {
                return Err(EngineError::Validation(format!(
                    "课程 {} 已结课，不可再录入成绩",
                    course_id
                )));
            }

            if !CourseMarkRepository::update_marks_tx(
                tx,
                &record.enrolled_course_id,
                exam_type,
                marks,
                &band.grade,
            )? {
                return Err(EngineError::not_found(
                    "CourseMark",
                    &format!("{}/{}", record.enrolled_course_id, exam_type),
                ));
            }

            ActionLogRepository::insert_tx(
                tx,
                &ActionLog::new(ActionType::RecordMark, actor)
                    .with_student(student_id)
                    .with_payload(json!({
                        "course_id": course_id,
                        "semester_id": semester_id,
                        "exam_type": exam_type,
                        "marks": marks,
                        "grade": band.grade,
                    })),
            )?;

            CourseMarkRepository::find_tx(tx, &record.enrolled_course_id, exam_type)?.ok_or_else(
                || EngineError::not_found("CourseMark", &record.enrolled_course_id),
            )
        })?;

        tracing::info!(
            student_id = %student_id,
            course_id = %course_id,
            exam_type = %exam_type,
            marks,
            grade = %band.grade,
            "成绩已录入"
        );
        Ok(mark)
    }

    // ==========================================
    // 结课
    // ==========================================

    /// 结课: 计算总评与等级，置为 COMPLETED，并重算学业状态
    ///
    /// 期中或期末任一缺失、或已结课时拒绝
    pub fn finalize_course(
        &self,
        student_id: &str,
        course_id: &str,
        semester_id: &str,
        actor: &str,
    ) -> EngineResult<EnrolledCourseRecord> {
        // 政策在事务外读取（配置与业务共用同一连接）
        let table = self.grade_table()?;
        let weights = self.mark_weights()?;

        let (record, standing) = with_immediate_tx(&self.conn, |tx| {
            let record = find_record(tx, student_id, course_id, semester_id)?;
            if record.status == EnrolledCourseStatus::Completed {
                return Err(EngineError::Validation(format!(
                    "课程 {} 已结课",
                    course_id
                )));
            }

            let midterm = required_marks(tx, &record.enrolled_course_id, ExamType::Midterm)?;
            let final_marks = required_marks(tx, &record.enrolled_course_id, ExamType::Final)?;

            let total = weights.weighted_total(midterm, final_marks);
            let band = table.lookup(total);

            if !EnrolledCourseRepository::mark_completed_tx(
                tx,
                &record.enrolled_course_id,
                total,
                &band.grade,
                band.point,
            )? {
                return Err(EngineError::Conflict(format!(
                    "课程 {} 已被并发结课",
                    course_id
                )));
            }

            let standing = recompute_standing_tx(tx, student_id)?;

            ActionLogRepository::insert_tx(
                tx,
                &ActionLog::new(ActionType::FinalizeCourse, actor)
                    .with_student(student_id)
                    .with_payload(json!({
                        "course_id": course_id,
                        "semester_id": semester_id,
                        "midterm": midterm,
                        "final": final_marks,
                        "total_marks": total,
                        "grade": band.grade,
                        "point": band.point,
                        "cgpa": standing.cgpa,
                        "total_completed_credit": standing.total_completed_credit,
                    })),
            )?;

            let record = EnrolledCourseRepository::find_by_id_tx(tx, &record.enrolled_course_id)?
                .ok_or_else(|| {
                    EngineError::not_found("EnrolledCourseRecord", &record.enrolled_course_id)
                })?;
            Ok((record, standing))
        })?;

        tracing::info!(
            student_id = %student_id,
            course_id = %course_id,
            total_marks = ?record.total_marks,
            grade = ?record.grade,
            cgpa = standing.cgpa,
            total_completed_credit = standing.total_completed_credit,
            "课程已结课"
        );
        Ok(record)
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 学业状态；尚无结课记录时返回零值
    pub fn get_academic_standing(&self, student_id: &str) -> EngineResult<AcademicStanding> {
        let found = self.academic_info_repo.find(student_id)?;
        Ok(found.unwrap_or_else(|| AcademicStanding {
            student_id: student_id.to_string(),
            cgpa: 0.0,
            total_completed_credit: 0,
            updated_at: chrono::Local::now().naive_local(),
        }))
    }

    pub fn list_course_marks(
        &self,
        student_id: &str,
        semester_id: Option<&str>,
    ) -> EngineResult<Vec<CourseMark>> {
        Ok(self.course_mark_repo.list_by_student(student_id, semester_id)?)
    }

    pub fn list_enrolled_courses(
        &self,
        student_id: &str,
        semester_id: Option<&str>,
    ) -> EngineResult<Vec<EnrolledCourseRecord>> {
        Ok(self
            .enrolled_course_repo
            .list_by_student(student_id, semester_id)?)
    }

    // ==========================================
    // 政策读取
    // ==========================================

    fn grade_table(&self) -> EngineResult<GradeTable> {
        self.policy
            .get_grade_table()
            .map_err(|e| EngineError::Config(e.to_string()))
    }

    fn mark_weights(&self) -> EngineResult<MarkWeights> {
        self.policy
            .get_mark_weights()
            .map_err(|e| EngineError::Config(e.to_string()))
    }
}

fn find_record(
    conn: &Connection,
    student_id: &str,
    course_id: &str,
    semester_id: &str,
) -> EngineResult<EnrolledCourseRecord> {
    EnrolledCourseRepository::find_tx(conn, student_id, course_id, semester_id)?.ok_or_else(|| {
        EngineError::not_found(
            "EnrolledCourseRecord",
            &format!("{}/{}/{}", student_id, course_id, semester_id),
        )
    })
}

fn required_marks(conn: &Connection, enrolled_course_id: &str, exam_type: ExamType) -> EngineResult<u32> {
    CourseMarkRepository::find_tx(conn, enrolled_course_id, exam_type)?
        .and_then(|m| m.marks)
        .ok_or_else(|| EngineError::Validation(format!("{} 成绩尚未录入", exam_type)))
}

/// 从全部 COMPLETED 记录重算学业状态并写回
fn recompute_standing_tx(conn: &Connection, student_id: &str) -> EngineResult<AcademicStanding> {
    let completed = EnrolledCourseRepository::list_completed_with_credits_tx(conn, student_id)?;
    let (cgpa, total_completed_credit) = compute_cgpa(&completed);
    let standing = AcademicStanding {
        student_id: student_id.to_string(),
        cgpa,
        total_completed_credit,
        updated_at: chrono::Local::now().naive_local(),
    };
    AcademicInfoRepository::upsert_tx(conn, &standing)?;
    Ok(standing)
}
