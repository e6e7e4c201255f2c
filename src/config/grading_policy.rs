// ==========================================
// 学期选课注册系统 - 成绩政策读取 Trait
// ==========================================
// 职责: 定义成绩流水线所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::grading::{GradeTable, MarkWeights};
use std::error::Error;

// ==========================================
// GradingPolicyReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
pub trait GradingPolicyReader: Send + Sync {
    /// 获取分数等级表
    ///
    /// # 默认值
    /// - 80 A / 75 A- / 70 B+ / 65 B / 60 B- / 55 C+ / 50 C / 45 D+ / 40 D / 0 F
    fn get_grade_table(&self) -> Result<GradeTable, Box<dyn Error + Send + Sync>>;

    /// 获取期中/期末权重
    ///
    /// # 默认值
    /// - 40 / 60
    fn get_mark_weights(&self) -> Result<MarkWeights, Box<dyn Error + Send + Sync>>;
}

/// 固定政策（测试或无配置库时使用）
#[derive(Debug, Clone, Default)]
pub struct StaticGradingPolicy {
    pub grade_table: GradeTable,
    pub weights: MarkWeights,
}

impl GradingPolicyReader for StaticGradingPolicy {
    fn get_grade_table(&self) -> Result<GradeTable, Box<dyn Error + Send + Sync>> {
        Ok(self.grade_table.clone())
    }

    fn get_mark_weights(&self) -> Result<MarkWeights, Box<dyn Error + Send + Sync>> {
        Ok(self.weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_static_policy_defaults() {
        let policy: Arc<dyn GradingPolicyReader> = Arc::new(StaticGradingPolicy::default());

        let weights = policy.get_mark_weights().unwrap();
        assert_eq!(weights.weighted_total(70, 80), 76);

        let table = policy.get_grade_table().unwrap();
        assert_eq!(table.lookup(76).grade, "A-");
        assert_eq!(table.lookup(39).grade, "F");
    }
}
