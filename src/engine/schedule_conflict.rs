// ==========================================
// 学期选课注册系统 - 排课冲突检测
// ==========================================
// 区间语义: [start, end) 半开区间，首尾相接不算冲突
// 冲突条件: candidate.start < existing.end && candidate.end > existing.start
// ==========================================
// 职责: 纯函数判定，不读库；候选集合由调用方按 (教室, 星期) / (教师, 星期) 查出
// ==========================================

use crate::domain::types::TimeSlot;
use crate::engine::error::ScheduleConflictKind;

/// 两个时段是否重叠（不同星期永不冲突）
pub fn slots_overlap(existing: &TimeSlot, candidate: &TimeSlot) -> bool {
    existing.day_of_week == candidate.day_of_week
        && candidate.start_time < existing.end_time
        && candidate.end_time > existing.start_time
}

/// 候选时段与已有时段集合是否冲突（线性扫描）
pub fn has_time_conflict(existing: &[TimeSlot], candidate: &TimeSlot) -> bool {
    existing.iter().any(|slot| slots_overlap(slot, candidate))
}

// ==========================================
// ConflictDetector Trait
// ==========================================
// 数据量小时线性扫描即可；需要时可替换为区间树实现
pub trait ConflictDetector: Send + Sync {
    fn overlaps(&self, existing: &[TimeSlot], candidate: &TimeSlot) -> bool;

    /// 同时检查教室与教师两组时段
    ///
    /// # 返回
    /// - None: 无冲突
    /// - Some(kind): 冲突对象
    fn check(
        &self,
        room_slots: &[TimeSlot],
        faculty_slots: &[TimeSlot],
        candidate: &TimeSlot,
    ) -> Option<ScheduleConflictKind> {
        let room = self.overlaps(room_slots, candidate);
        let faculty = self.overlaps(faculty_slots, candidate);
        match (room, faculty) {
            (true, true) => Some(ScheduleConflictKind::RoomAndFaculty),
            (true, false) => Some(ScheduleConflictKind::Room),
            (false, true) => Some(ScheduleConflictKind::Faculty),
            (false, false) => None,
        }
    }
}

/// 线性扫描实现
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearScanDetector;

impl ConflictDetector for LinearScanDetector {
    fn overlaps(&self, existing: &[TimeSlot], candidate: &TimeSlot) -> bool {
        has_time_conflict(existing, candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::DayOfWeek;

    fn slot(day: DayOfWeek, start: &str, end: &str) -> TimeSlot {
        TimeSlot::parse(day, start, end).unwrap()
    }

    #[test]
    fn test_partial_overlap_conflicts() {
        let existing = vec![slot(DayOfWeek::Monday, "09:00", "10:00")];
        assert!(has_time_conflict(&existing, &slot(DayOfWeek::Monday, "09:30", "10:30")));
        assert!(has_time_conflict(&existing, &slot(DayOfWeek::Monday, "08:30", "09:01")));
    }

    #[test]
    fn test_shared_boundary_does_not_conflict() {
        let existing = vec![slot(DayOfWeek::Monday, "09:00", "10:00")];
        assert!(!has_time_conflict(&existing, &slot(DayOfWeek::Monday, "10:00", "11:00")));
        assert!(!has_time_conflict(&existing, &slot(DayOfWeek::Monday, "08:00", "09:00")));
    }

    #[test]
    fn test_containment_conflicts_both_ways() {
        let existing = vec![slot(DayOfWeek::Tuesday, "09:00", "12:00")];
        assert!(has_time_conflict(&existing, &slot(DayOfWeek::Tuesday, "10:00", "11:00")));

        let existing = vec![slot(DayOfWeek::Tuesday, "10:00", "11:00")];
        assert!(has_time_conflict(&existing, &slot(DayOfWeek::Tuesday, "09:00", "12:00")));
    }

    #[test]
    fn test_identical_interval_conflicts() {
        let existing = vec![slot(DayOfWeek::Sunday, "14:00", "15:30")];
        assert!(has_time_conflict(&existing, &slot(DayOfWeek::Sunday, "14:00", "15:30")));
    }

    #[test]
    fn test_different_day_never_conflicts() {
        let existing = vec![slot(DayOfWeek::Monday, "09:00", "10:00")];
        assert!(!has_time_conflict(&existing, &slot(DayOfWeek::Wednesday, "09:00", "10:00")));
    }

    #[test]
    fn test_empty_existing_set() {
        assert!(!has_time_conflict(&[], &slot(DayOfWeek::Friday, "09:00", "10:00")));
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let times = ["08:00", "08:30", "09:00", "09:30", "10:00", "10:30", "11:00"];
        for (i, a_start) in times.iter().enumerate() {
            for a_end in &times[i + 1..] {
                for (j, b_start) in times.iter().enumerate() {
                    for b_end in &times[j + 1..] {
                        let a = slot(DayOfWeek::Monday, a_start, a_end);
                        let b = slot(DayOfWeek::Monday, b_start, b_end);
                        assert_eq!(slots_overlap(&a, &b), slots_overlap(&b, &a));
                    }
                }
            }
        }
    }

    #[test]
    fn test_detector_reports_conflict_kind() {
        let detector = LinearScanDetector;
        let busy = vec![slot(DayOfWeek::Monday, "09:00", "10:00")];
        let candidate = slot(DayOfWeek::Monday, "09:30", "10:30");

        assert_eq!(detector.check(&busy, &[], &candidate), Some(ScheduleConflictKind::Room));
        assert_eq!(detector.check(&[], &busy, &candidate), Some(ScheduleConflictKind::Faculty));
        assert_eq!(
            detector.check(&busy, &busy, &candidate),
            Some(ScheduleConflictKind::RoomAndFaculty)
        );
        assert_eq!(detector.check(&[], &[], &candidate), None);
    }
}
