// ==========================================
// 学期选课注册系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::grading_policy::GradingPolicyReader;
use crate::db::open_sqlite_connection;
use crate::domain::grading::{GradeBand, GradeTable, MarkWeights};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error + Send + Sync>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error + Send + Sync>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![ConfigScope::Global.scope_id(), key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            r#"INSERT INTO config_kv (scope_id, key, value, updated_at)
               VALUES (?1, ?2, ?3, datetime('now'))
               ON CONFLICT(scope_id, key) DO UPDATE SET
                   value = excluded.value,
                   updated_at = excluded.updated_at"#,
            params![ConfigScope::Global.scope_id(), key, value],
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
        Ok(self.get_global_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 获取所有 global 配置的快照
    pub fn get_config_snapshot(&self) -> Result<HashMap<String, String>, Box<dyn Error + Send + Sync>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![ConfigScope::Global.scope_id()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }
        Ok(config_map)
    }

    fn parse_weight(&self, key: &str, default: u32) -> Result<u32, Box<dyn Error + Send + Sync>> {
        let raw = self.get_config_or_default(key, &default.to_string())?;
        match raw.trim().parse::<u32>() {
            Ok(v) => Ok(v),
            Err(_) => {
                tracing::warn!(config_key = key, raw_value = %raw, "权重配置格式错误，使用默认值");
                Ok(default)
            }
        }
    }
}

// ==========================================
// GradingPolicyReader Trait 实现
// ==========================================
impl GradingPolicyReader for ConfigManager {
    fn get_grade_table(&self) -> Result<GradeTable, Box<dyn Error + Send + Sync>> {
        let raw = match self.get_global_config_value(config_keys::GRADE_TABLE)? {
            Some(v) => v,
            None => return Ok(GradeTable::default()),
        };

        let bands: Vec<GradeBand> = match serde_json::from_str(&raw) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(
                    config_key = config_keys::GRADE_TABLE,
                    error = %e,
                    "等级表配置无法解析，使用默认等级表"
                );
                return Ok(GradeTable::default());
            }
        };

        match GradeTable::new(bands) {
            Ok(table) => Ok(table),
            Err(reason) => {
                tracing::warn!(
                    config_key = config_keys::GRADE_TABLE,
                    reason = %reason,
                    "等级表配置不合法，使用默认等级表"
                );
                Ok(GradeTable::default())
            }
        }
    }

    fn get_mark_weights(&self) -> Result<MarkWeights, Box<dyn Error + Send + Sync>> {
        let defaults = MarkWeights::default();
        let midterm = self.parse_weight(config_keys::MIDTERM_WEIGHT_PCT, defaults.midterm_pct)?;
        let final_pct = self.parse_weight(config_keys::FINAL_WEIGHT_PCT, defaults.final_pct)?;

        match MarkWeights::new(midterm, final_pct) {
            Some(w) => Ok(w),
            None => {
                tracing::warn!(
                    midterm_weight_pct = midterm,
                    final_weight_pct = final_pct,
                    "期中/期末权重无效（须均不超过 100 且之和为 100），使用默认权重"
                );
                Ok(defaults)
            }
        }
    }
}

// ==========================================
// ConfigScope - 配置作用域
// ==========================================
#[derive(Debug, Clone)]
pub enum ConfigScope {
    Global,
}

impl ConfigScope {
    pub fn scope_id(&self) -> &'static str {
        match self {
            ConfigScope::Global => "global",
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    /// 分数等级表（JSON 数组: [{min_marks, grade, point}]）
    pub const GRADE_TABLE: &str = "grade_table";
    /// 期中权重百分比
    pub const MIDTERM_WEIGHT_PCT: &str = "midterm_weight_pct";
    /// 期末权重百分比
    pub const FINAL_WEIGHT_PCT: &str = "final_weight_pct";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_unconfigured() {
        let config = setup();
        assert_eq!(config.get_grade_table().unwrap(), GradeTable::default());
        assert_eq!(config.get_mark_weights().unwrap(), MarkWeights::default());
    }

    #[test]
    fn test_set_and_get_global_value() {
        let config = setup();
        config.set_global_config_value("k", "v1").unwrap();
        config.set_global_config_value("k", "v2").unwrap();
        assert_eq!(config.get_global_config_value("k").unwrap().as_deref(), Some("v2"));
        assert_eq!(config.get_config_snapshot().unwrap().len(), 1);
    }

    #[test]
    fn test_oversized_weight_falls_back_to_defaults() {
        let config = setup();
        config
            .set_global_config_value(config_keys::MIDTERM_WEIGHT_PCT, &(u32::MAX - 99).to_string())
            .unwrap();
        config
            .set_global_config_value(config_keys::FINAL_WEIGHT_PCT, "200")
            .unwrap();

        let weights = config.get_mark_weights().unwrap();
        assert_eq!(weights, MarkWeights::default());
        assert_eq!(weights.weighted_total(70, 80), 76);
    }

    #[test]
    fn test_custom_grade_table_is_used() {
        let config = setup();
        config
            .set_global_config_value(
                config_keys::GRADE_TABLE,
                r#"[{"min_marks":50,"grade":"P","point":1.0},{"min_marks":0,"grade":"F","point":0.0}]"#,
            )
            .unwrap();

        let table = config.get_grade_table().unwrap();
        assert_eq!(table.lookup(50).grade, "P");
        assert_eq!(table.bands().len(), 2);
    }

    #[test]
    fn test_invalid_grade_table_falls_back_to_default() {
        let config = setup();
        config
            .set_global_config_value(
                config_keys::GRADE_TABLE,
                r#"[{"min_marks":50,"grade":"P","point":1.0}]"#,
            )
            .unwrap();
        assert_eq!(config.get_grade_table().unwrap(), GradeTable::default());

        config.set_global_config_value(config_keys::GRADE_TABLE, "not json").unwrap();
        assert_eq!(config.get_grade_table().unwrap(), GradeTable::default());
    }

    #[test]
    fn test_weights_must_sum_to_hundred() {
        let config = setup();
        config.set_global_config_value(config_keys::MIDTERM_WEIGHT_PCT, "30").unwrap();
        config.set_global_config_value(config_keys::FINAL_WEIGHT_PCT, "70").unwrap();
        assert_eq!(config.get_mark_weights().unwrap(), MarkWeights::new(30, 70).unwrap());

        config.set_global_config_value(config_keys::FINAL_WEIGHT_PCT, "60").unwrap();
        assert_eq!(config.get_mark_weights().unwrap(), MarkWeights::default());
    }
}
