// ==========================================
// 学期选课注册系统 - 成绩领域模型
// ==========================================
// 分数 → 等级 → 绩点 → 学业状态
// ==========================================

use crate::domain::types::{EnrolledCourseStatus, ExamType};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 单科分数上限
pub const MAX_MARKS: u32 = 100;

// ==========================================
// EnrolledCourseRecord - 学生修读课程记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrolledCourseRecord {
    pub enrolled_course_id: String,
    pub student_id: String,
    pub course_id: String,
    pub semester_id: String,
    pub status: EnrolledCourseStatus,
    pub total_marks: Option<u32>,
    pub grade: Option<String>,
    pub point: Option<f64>,
}

// ==========================================
// CourseMark - 单次考试成绩
// ==========================================
// 每条修读记录固定两行: MIDTERM + FINAL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseMark {
    pub mark_id: String,
    pub student_id: String,
    pub enrolled_course_id: String,
    pub semester_id: String,
    pub exam_type: ExamType,
    pub marks: Option<u32>,
    pub grade: Option<String>,
}

// ==========================================
// AcademicStanding - 学业状态
// ==========================================
// 每次结课时从全部 COMPLETED 记录重算，不做增量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicStanding {
    pub student_id: String,
    pub cgpa: f64,
    pub total_completed_credit: i64,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// GradeBand / GradeTable - 分数等级表
// ==========================================
// 政策表: 按 min_marks 降序，连续覆盖 0..=100
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeBand {
    pub min_marks: u32,
    pub grade: String,
    pub point: f64,
}

impl GradeBand {
    fn new(min_marks: u32, grade: &str, point: f64) -> Self {
        Self {
            min_marks,
            grade: grade.to_string(),
            point,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<GradeBand>", into = "Vec<GradeBand>")]
pub struct GradeTable {
    bands: Vec<GradeBand>,
}

impl GradeTable {
    /// 校验并构造等级表
    ///
    /// # 规则
    /// - 非空
    /// - min_marks 严格降序，且不超过 100
    /// - point 非递增
    /// - 最后一档从 0 开始
    pub fn new(bands: Vec<GradeBand>) -> Result<Self, String> {
        let last = bands.last().ok_or_else(|| "等级表不能为空".to_string())?;
        if last.min_marks != 0 {
            return Err(format!("等级表最后一档必须从 0 分开始，实际为 {}", last.min_marks));
        }

        for band in &bands {
            if band.min_marks > MAX_MARKS {
                return Err(format!("等级 {} 的下限 {} 超过 {}", band.grade, band.min_marks, MAX_MARKS));
            }
            if band.grade.trim().is_empty() {
                return Err("等级名称不能为空".to_string());
            }
            if !band.point.is_finite() || band.point < 0.0 {
                return Err(format!("等级 {} 的绩点无效: {}", band.grade, band.point));
            }
        }

        for pair in bands.windows(2) {
            if pair[0].min_marks <= pair[1].min_marks {
                return Err(format!(
                    "等级表下限必须严格降序: {}({}) 之后是 {}({})",
                    pair[0].grade, pair[0].min_marks, pair[1].grade, pair[1].min_marks
                ));
            }
            if pair[0].point < pair[1].point {
                return Err(format!(
                    "等级表绩点必须非递增: {}({}) 低于 {}({})",
                    pair[0].grade, pair[0].point, pair[1].grade, pair[1].point
                ));
            }
        }

        Ok(Self { bands })
    }

    /// 查找分数所在等级（分数超过 100 时按 100 处理）
    pub fn lookup(&self, marks: u32) -> &GradeBand {
        let marks = marks.min(MAX_MARKS);
        self.bands
            .iter()
            .find(|b| marks >= b.min_marks)
            .unwrap_or_else(|| &self.bands[self.bands.len() - 1])
    }

    pub fn bands(&self) -> &[GradeBand] {
        &self.bands
    }
}

impl TryFrom<Vec<GradeBand>> for GradeTable {
    type Error = String;

    fn try_from(bands: Vec<GradeBand>) -> Result<Self, Self::Error> {
        Self::new(bands)
    }
}

impl From<GradeTable> for Vec<GradeBand> {
    fn from(table: GradeTable) -> Self {
        table.bands
    }
}

impl Default for GradeTable {
    fn default() -> Self {
        Self {
            bands: vec![
                GradeBand::new(80, "A", 4.00),
                GradeBand::new(75, "A-", 3.75),
                GradeBand::new(70, "B+", 3.50),
                GradeBand::new(65, "B", 3.25),
                GradeBand::new(60, "B-", 3.00),
                GradeBand::new(55, "C+", 2.75),
                GradeBand::new(50, "C", 2.50),
                GradeBand::new(45, "D+", 2.25),
                GradeBand::new(40, "D", 2.00),
                GradeBand::new(0, "F", 0.00),
            ],
        }
    }
}

// ==========================================
// MarkWeights - 期中/期末权重
// ==========================================
// 每个加权分量单独向上取整后再求和（整数运算，避免 70*0.4 的浮点误差）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkWeights {
    pub midterm_pct: u32,
    pub final_pct: u32,
}

impl MarkWeights {
    /// 两项权重均不超过 100 且之和为 100
    pub fn new(midterm_pct: u32, final_pct: u32) -> Option<Self> {
        if midterm_pct.checked_add(final_pct) != Some(100) {
            return None;
        }
        Some(Self {
            midterm_pct,
            final_pct,
        })
    }

    /// total = ceil(midterm * w_mid) + ceil(final * w_final)
    pub fn weighted_total(&self, midterm: u32, final_marks: u32) -> u32 {
        ceil_pct(midterm, self.midterm_pct) + ceil_pct(final_marks, self.final_pct)
    }
}

impl Default for MarkWeights {
    fn default() -> Self {
        Self {
            midterm_pct: 40,
            final_pct: 60,
        }
    }
}

fn ceil_pct(marks: u32, pct: u32) -> u32 {
    (marks.min(MAX_MARKS) * pct.min(100) + 99) / 100
}

/// 按学分加权计算 CGPA（保留两位小数；无学分时为 0）
pub fn compute_cgpa(points_and_credits: &[(f64, i64)]) -> (f64, i64) {
    let total_credit: i64 = points_and_credits.iter().map(|(_, c)| *c).sum();
    if total_credit <= 0 {
        return (0.0, total_credit.max(0));
    }
    let weighted: f64 = points_and_credits
        .iter()
        .map(|(p, c)| p * (*c as f64))
        .sum();
    let cgpa = weighted / total_credit as f64;
    ((cgpa * 100.0).round() / 100.0, total_credit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_total_ceils_each_component() {
        let w = MarkWeights::default();
        // 70*0.4 = 28, 80*0.6 = 48
        assert_eq!(w.weighted_total(70, 80), 76);
        // 33*0.4 = 13.2 → 14, 41*0.6 = 24.6 → 25
        assert_eq!(w.weighted_total(33, 41), 39);
        assert_eq!(w.weighted_total(0, 0), 0);
        assert_eq!(w.weighted_total(100, 100), 100);
    }

    #[test]
    fn test_mark_weights_must_sum_to_hundred() {
        assert!(MarkWeights::new(30, 70).is_some());
        assert!(MarkWeights::new(50, 60).is_none());
        assert!(MarkWeights::new(u32::MAX - 99, 200).is_none());
        assert!(MarkWeights::new(u32::MAX, 101).is_none());
    }

    #[test]
    fn test_grade_table_deserialize_is_validated() {
        assert!(serde_json::from_str::<GradeTable>("[]").is_err());
        assert!(serde_json::from_str::<GradeTable>(
            r#"[{"min_marks":40,"grade":"P","point":1.0},{"min_marks":50,"grade":"F","point":0.0}]"#
        )
        .is_err());

        let json = serde_json::to_string(&GradeTable::default()).unwrap();
        assert!(json.starts_with('['));
        let table: GradeTable = serde_json::from_str(&json).unwrap();
        assert_eq!(table, GradeTable::default());
    }

    #[test]
    fn test_default_grade_table_boundaries() {
        let table = GradeTable::default();
        assert_eq!(table.lookup(100).grade, "A");
        assert_eq!(table.lookup(80).grade, "A");
        assert_eq!(table.lookup(79).grade, "A-");
        assert_eq!(table.lookup(76).grade, "A-");
        assert_eq!(table.lookup(76).point, 3.75);
        assert_eq!(table.lookup(40).grade, "D");
        assert_eq!(table.lookup(39).grade, "F");
        assert_eq!(table.lookup(0).point, 0.0);
    }

    #[test]
    fn test_grade_table_lookup_is_monotonic() {
        let table = GradeTable::default();
        let mut prev = table.lookup(0).point;
        for m in 1..=MAX_MARKS {
            let p = table.lookup(m).point;
            assert!(p >= prev, "绩点在 {} 分处下降", m);
            prev = p;
        }
    }

    #[test]
    fn test_grade_table_validation() {
        assert!(GradeTable::new(vec![]).is_err());
        assert!(GradeTable::new(vec![GradeBand::new(50, "P", 1.0)]).is_err());
        assert!(GradeTable::new(vec![
            GradeBand::new(40, "P", 1.0),
            GradeBand::new(60, "A", 4.0),
            GradeBand::new(0, "F", 0.0),
        ])
        .is_err());
        assert!(GradeTable::new(vec![
            GradeBand::new(60, "A", 1.0),
            GradeBand::new(0, "F", 2.0),
        ])
        .is_err());

        let table = GradeTable::new(vec![
            GradeBand::new(50, "P", 1.0),
            GradeBand::new(0, "F", 0.0),
        ])
        .unwrap();
        assert_eq!(table.lookup(50).grade, "P");
        assert_eq!(table.lookup(49).grade, "F");
    }

    #[test]
    fn test_compute_cgpa() {
        let (cgpa, credits) = compute_cgpa(&[(4.0, 3), (3.0, 1)]);
        assert_eq!(credits, 4);
        assert_eq!(cgpa, 3.75);

        assert_eq!(compute_cgpa(&[]), (0.0, 0));
    }
}
