// ==========================================
// 学期选课注册系统 - 应用状态
// ==========================================
// 职责: 连接、仓储、引擎、API 的装配
// 同一数据库文件可被多个 AppState 同时打开，一致性由 IMMEDIATE 事务保证
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{EnrollmentApi, GradingApi, RegistrationApi, SectionApi};
use crate::config::{ConfigManager, GradingPolicyReader};
use crate::engine::{
    CreditEventPublisher, EnrollmentProtocol, GradingPipeline, LinearScanDetector,
    OptionalCreditEventPublisher, RegistrationStateMachine, SectionService,
};
use crate::repository::{
    AcademicInfoRepository, ActionLogRepository, CatalogRepository, ClassSlotRepository,
    CourseMarkRepository, EnrolledCourseRepository, EnrollmentRepository,
    OfferedCourseRepository, SectionRepository, SemesterRegistrationRepository,
    StudentRegistrationRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 学期注册API
    pub registration_api: Arc<RegistrationApi>,

    /// 开课与班级API
    pub section_api: Arc<SectionApi>,

    /// 选课API
    pub enrollment_api: Arc<EnrollmentApi>,

    /// 成绩API
    pub grading_api: Arc<GradingApi>,

    /// 基础目录（学期/课程/学生/教室/教师）
    pub catalog_repo: Arc<CatalogRepository>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例（不接外部事件发布器）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 成功创建
    /// - Err(String): 初始化错误
    pub fn new(db_path: String) -> Result<Self, String> {
        Self::build(db_path, OptionalCreditEventPublisher::none())
    }

    /// 创建AppState并接入学分事件发布器（如计费通知）
    pub fn with_event_publisher(
        db_path: String,
        publisher: Arc<dyn CreditEventPublisher>,
    ) -> Result<Self, String> {
        Self::build(db_path, OptionalCreditEventPublisher::with_publisher(publisher))
    }

    fn build(db_path: String, events: OptionalCreditEventPublisher) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = crate::db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        crate::db::init_schema(&conn).map_err(|e| format!("数据库初始化失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let catalog_repo = Arc::new(CatalogRepository::new(conn.clone()));
        let registration_repo = Arc::new(SemesterRegistrationRepository::new(conn.clone()));
        let offered_course_repo = Arc::new(OfferedCourseRepository::new(conn.clone()));
        let section_repo = Arc::new(SectionRepository::new(conn.clone()));
        let slot_repo = Arc::new(ClassSlotRepository::new(conn.clone()));
        let student_registration_repo = Arc::new(StudentRegistrationRepository::new(conn.clone()));
        let enrollment_repo = Arc::new(EnrollmentRepository::new(conn.clone()));
        let enrolled_course_repo = Arc::new(EnrolledCourseRepository::new(conn.clone()));
        let course_mark_repo = Arc::new(CourseMarkRepository::new(conn.clone()));
        let academic_info_repo = Arc::new(AcademicInfoRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let policy: Arc<dyn GradingPolicyReader> = config_manager.clone();

        let state_machine = Arc::new(RegistrationStateMachine::new(
            conn.clone(),
            registration_repo.clone(),
        ));
        let section_service = Arc::new(SectionService::new(
            conn.clone(),
            offered_course_repo,
            section_repo,
            slot_repo,
            Arc::new(LinearScanDetector),
        ));
        let protocol = Arc::new(EnrollmentProtocol::new(
            conn.clone(),
            registration_repo,
            student_registration_repo,
            enrollment_repo,
            events,
        ));
        let pipeline = Arc::new(GradingPipeline::new(
            conn,
            enrolled_course_repo,
            course_mark_repo,
            academic_info_repo,
            policy,
        ));

        // ==========================================
        // 初始化API层
        // ==========================================
        let registration_api = Arc::new(RegistrationApi::new(state_machine, action_log_repo));
        let section_api = Arc::new(SectionApi::new(section_service));
        let enrollment_api = Arc::new(EnrollmentApi::new(protocol));
        let grading_api = Arc::new(GradingApi::new(pipeline));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            registration_api,
            section_api,
            enrollment_api,
            grading_api,
            catalog_repo,
            config_manager,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 TERM_REGISTRATION_DB_PATH（非空时）
/// - 用户数据目录/term-registration/term_registration.db
/// - 回退: ./term_registration.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("TERM_REGISTRATION_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./term_registration.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("term-registration");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("term_registration.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_initializes_schema() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("state.db").to_string_lossy().to_string();

        let state = AppState::new(db_path.clone()).unwrap();
        assert_eq!(state.get_db_path(), db_path);
        assert!(state.registration_api.current_registration().unwrap().is_none());

        // 再次打开同一文件（建表幂等）
        assert!(AppState::new(db_path).is_ok());
    }
}
