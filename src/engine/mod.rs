// ==========================================
// 学期选课注册系统 - 引擎层
// ==========================================
// 职责: 学期注册状态机、排课冲突检测、容量追踪、选课协议、成绩流水线
// 红线: Engine 不拼 SQL，只调用 Repository
// 红线: 多记录写操作一律在 BEGIN IMMEDIATE 事务内完成
// ==========================================

pub mod capacity;
pub mod enrollment;
pub mod error;
pub mod events;
pub mod grading;
pub mod registration;
pub mod schedule_conflict;
pub mod section;

// 重导出核心引擎
pub use capacity::SectionCapacityTracker;
pub use enrollment::EnrollmentProtocol;
pub use error::{EngineError, EngineResult, ScheduleConflictKind};
pub use events::{
    CreditEvent, CreditEventKind, CreditEventPublisher, NoOpCreditEventPublisher,
    OptionalCreditEventPublisher,
};
pub use grading::GradingPipeline;
pub use registration::RegistrationStateMachine;
pub use schedule_conflict::{has_time_conflict, ConflictDetector, LinearScanDetector};
pub use section::SectionService;

use crate::repository::RepositoryError;
use rusqlite::{Connection, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};

/// 获取共享连接
pub(crate) fn lock_conn(conn: &Arc<Mutex<Connection>>) -> EngineResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| RepositoryError::LockError(e.to_string()).into())
}

/// 在 IMMEDIATE 事务内执行 `f`
///
/// `f` 返回 Err 时事务随 drop 回滚，部分写入不可见
pub(crate) fn with_immediate_tx<T>(
    conn: &Arc<Mutex<Connection>>,
    f: impl FnOnce(&Transaction<'_>) -> EngineResult<T>,
) -> EngineResult<T> {
    let mut guard = lock_conn(conn)?;
    let tx = crate::db::begin_immediate(&mut guard)?;
    let out = f(&tx)?;
    tx.commit()?;
    Ok(out)
}
