// ==========================================
// 并发选课测试
// ==========================================
// 职责: 多个 AppState（各自连接）同时对同一班级选课
// 预期: 成功数恰为容量，其余为容量不足，计数不越界
// ==========================================


#[cfg(test)]
mod enrollment_concurrency_test {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use term_registration::api::{ApiError, ErrorKind};
    use term_registration::app::AppState;

    use crate::test_helpers::*;

    /// 准备: ONGOING 注册 + 指定容量的班级 + 全部学生已开始注册
    fn prepare(capacity: i64) -> (tempfile::NamedTempFile, String, String, String) {
        let (tmp, db_path, state) = setup_state();
        let reg_id = open_ongoing_registration(&state, 1, 20);
        let (offered, section) =
            offer_with_section(&state, &reg_id, "C101", capacity, slot("MON", "09:00", "10:00", "R101", "F01"));
        for student in STUDENTS {
            state.enrollment_api.start_registration(student, student).unwrap();
        }
        (tmp, db_path, offered, section)
    }

    fn count_outcomes(results: &[Result<(), ApiError>]) -> (usize, usize) {
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let full = results
            .iter()
            .filter(|r| matches!(r, Err(e) if e.kind() == ErrorKind::Capacity))
            .count();
        (ok, full)
    }

    #[test]
    fn test_concurrent_enroll_threads_respect_capacity() {
        let capacity = 2;
        let (_tmp, db_path, offered, section) = prepare(capacity);
        let barrier = Arc::new(Barrier::new(STUDENTS.len()));

        let handles: Vec<_> = STUDENTS
            .iter()
            .map(|student| {
                let db_path = db_path.clone();
                let offered = offered.clone();
                let section = section.clone();
                let barrier = barrier.clone();
                let student = student.to_string();
                thread::spawn(move || {
                    let state = AppState::new(db_path).unwrap();
                    barrier.wait();
                    state
                        .enrollment_api
                        .enroll(&student, &offered, &section, &student)
                        .map(|_| ())
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let (ok, full) = count_outcomes(&results);
        assert_eq!(ok, capacity as usize);
        assert_eq!(full, STUDENTS.len() - capacity as usize);

        let state = AppState::new(db_path).unwrap();
        let detail = state.section_api.get_section(&section).unwrap();
        assert_eq!(detail.section.enrolled_count, capacity);
    }

    #[test]
    fn test_two_students_last_seat_scenario() {
        let (_tmp, db_path, offered, section) = prepare(1);

        let handles: Vec<_> = ["S1", "S2"]
            .into_iter()
            .map(|student| {
                let db_path = db_path.clone();
                let offered = offered.clone();
                let section = section.clone();
                thread::spawn(move || {
                    let state = AppState::new(db_path).unwrap();
                    state
                        .enrollment_api
                        .enroll(student, &offered, &section, student)
                        .map(|_| ())
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(count_outcomes(&results), (1, 1));

        let state = AppState::new(db_path).unwrap();
        assert_eq!(state.section_api.get_section(&section).unwrap().section.enrolled_count, 1);
    }

    #[test]
    fn test_concurrent_duplicate_enroll_creates_one_row() {
        let (_tmp, db_path, offered, section) = prepare(5);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let db_path = db_path.clone();
                let offered = offered.clone();
                let section = section.clone();
                thread::spawn(move || {
                    let state = AppState::new(db_path).unwrap();
                    state
                        .enrollment_api
                        .enroll("S1", &offered, &section, "S1")
                        .map(|_| ())
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| e.kind() == ErrorKind::Conflict));

        let state = AppState::new(db_path).unwrap();
        let mine = state.enrollment_api.get_my_registration("S1").unwrap();
        assert_eq!(mine.enrollments.len(), 1);
        assert_eq!(mine.student_registration.unwrap().total_credits_taken, 3);
        assert_eq!(state.section_api.get_section(&section).unwrap().section.enrolled_count, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_enroll_spawn_blocking() {
        let capacity = 3;
        let (_tmp, db_path, offered, section) = prepare(capacity);

        let tasks = STUDENTS.iter().map(|student| {
            let db_path = db_path.clone();
            let offered = offered.clone();
            let section = section.clone();
            let student = student.to_string();
            tokio::task::spawn_blocking(move || {
                let state = AppState::new(db_path).unwrap();
                state
                    .enrollment_api
                    .enroll(&student, &offered, &section, &student)
                    .map(|_| ())
            })
        });

        let results: Vec<_> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        let (ok, full) = count_outcomes(&results);
        assert_eq!(ok, capacity as usize);
        assert_eq!(full, STUDENTS.len() - capacity as usize);

        let state = AppState::new(db_path).unwrap();
        assert_eq!(
            state.section_api.get_section(&section).unwrap().section.enrolled_count,
            capacity
        );
    }
}
