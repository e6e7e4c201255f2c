// ==========================================
// 学期选课注册系统 - 配置层
// ==========================================
// 职责: 系统配置管理（成绩政策）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod grading_policy;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager, ConfigScope};
pub use grading_policy::{GradingPolicyReader, StaticGradingPolicy};
