// ==========================================
// 学期选课注册系统 - 主入口
// ==========================================
// 初始化日志与数据库，输出当前注册状态
// ==========================================

use std::process::ExitCode;

use term_registration::app::{get_default_db_path, AppState};
use term_registration::logging;

fn main() -> ExitCode {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", term_registration::APP_NAME);
    tracing::info!("系统版本: {}", term_registration::VERSION);
    tracing::info!("==================================================");

    // 参数优先，其次环境变量/用户数据目录
    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = match AppState::new(db_path) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("无法初始化AppState: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match state.registration_api.current_registration() {
        Ok(Some(reg)) => tracing::info!(
            registration_id = %reg.registration_id,
            semester_id = %reg.semester_id,
            status = %reg.status,
            min_credit = reg.min_credit,
            max_credit = reg.max_credit,
            "当前学期注册"
        ),
        Ok(None) => tracing::info!("当前没有进行中的学期注册"),
        Err(e) => {
            tracing::error!(kind = ?e.kind(), "读取学期注册失败: {}", e);
            return ExitCode::FAILURE;
        }
    }

    match state.config_manager.get_config_snapshot() {
        Ok(snapshot) => tracing::info!(entries = snapshot.len(), "已加载配置"),
        Err(e) => tracing::warn!("读取配置失败: {}", e),
    }

    ExitCode::SUCCESS
}
