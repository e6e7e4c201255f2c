// ==========================================
// 开课与排课冲突测试
// ==========================================
// 职责: 验证教室/教师时间冲突检测与班级生命周期
// ==========================================


#[cfg(test)]
mod section_schedule_test {
    use term_registration::api::{ApiError, ErrorKind};

    use crate::test_helpers::*;

    #[test]
    fn test_room_overlap_is_rejected_and_nothing_persisted() {
        let (_tmp, _path, state) = setup_state();
        let reg_id = open_registration(&state, 9, 15);
        offer_with_section(&state, &reg_id, "C101", 30, slot("MON", "09:00", "10:00", "R101", "F01"));

        let offered = offer_course(&state, &reg_id, "C102");
        let err = state
            .section_api
            .create_section(
                &offered,
                "Section B",
                30,
                &[slot("MONDAY", "09:30", "10:30", "R101", "F02")],
                ACTOR,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.to_string().contains("教室"));

        let sections = state
            .section_api
            .list_sections(&reg_id, Some(&offered))
            .unwrap();
        assert!(sections.is_empty());
        assert_eq!(state.section_api.list_slots_for_room("R101", "MON").unwrap().len(), 1);
    }

    #[test]
    fn test_back_to_back_slots_do_not_conflict() {
        let (_tmp, _path, state) = setup_state();
        let reg_id = open_registration(&state, 9, 15);
        offer_with_section(&state, &reg_id, "C101", 30, slot("MON", "09:00", "10:00", "R101", "F01"));

        let offered = offer_course(&state, &reg_id, "C102");
        let created = state
            .section_api
            .create_section(
                &offered,
                "Section B",
                30,
                &[slot("MON", "10:00", "11:00", "R101", "F01")],
                ACTOR,
            )
            .unwrap();
        assert_eq!(created.slots.len(), 1);
        assert_eq!(created.section.enrolled_count, 0);
    }

    #[test]
    fn test_faculty_overlap_in_another_room_is_rejected() {
        let (_tmp, _path, state) = setup_state();
        let reg_id = open_registration(&state, 9, 15);
        offer_with_section(&state, &reg_id, "C101", 30, slot("TUE", "13:00", "14:30", "R101", "F01"));

        let offered = offer_course(&state, &reg_id, "C102");
        let err = state
            .section_api
            .create_section(
                &offered,
                "Section B",
                30,
                &[slot("TUE", "14:00", "15:00", "R102", "F01")],
                ACTOR,
            )
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        assert!(err.to_string().contains("教师"));

        // 不同星期不冲突
        assert!(state
            .section_api
            .create_section(
                &offered,
                "Section B",
                30,
                &[slot("WED", "14:00", "15:00", "R102", "F01")],
                ACTOR,
            )
            .is_ok());
    }

    #[test]
    fn test_slots_in_same_request_are_checked_against_each_other() {
        let (_tmp, _path, state) = setup_state();
        let reg_id = open_registration(&state, 9, 15);
        let offered = offer_course(&state, &reg_id, "C201");

        let err = state
            .section_api
            .create_section(
                &offered,
                "Section A",
                30,
                &[
                    slot("SUN", "08:00", "09:30", "R101", "F01"),
                    slot("SUN", "09:00", "10:00", "R101", "F02"),
                ],
                ACTOR,
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(state.section_api.list_slots_for_room("R101", "SUN").unwrap().is_empty());
    }

    #[test]
    fn test_create_section_input_validation() {
        let (_tmp, _path, state) = setup_state();
        let reg_id = open_registration(&state, 9, 15);
        let offered = offer_course(&state, &reg_id, "C101");

        let bad_time = state
            .section_api
            .create_section(&offered, "A", 30, &[slot("MON", "11:00", "10:00", "R101", "F01")], ACTOR)
            .unwrap_err();
        assert!(matches!(bad_time, ApiError::InvalidInput(_)));

        let no_slots = state
            .section_api
            .create_section(&offered, "A", 30, &[], ACTOR)
            .unwrap_err();
        assert_eq!(no_slots.kind(), ErrorKind::Validation);

        let missing_room = state
            .section_api
            .create_section(&offered, "A", 30, &[slot("MON", "09:00", "10:00", "R999", "F01")], ACTOR)
            .unwrap_err();
        assert_eq!(missing_room.kind(), ErrorKind::NotFound);

        let negative = state
            .section_api
            .create_section(&offered, "A", -1, &[slot("MON", "09:00", "10:00", "R101", "F01")], ACTOR)
            .unwrap_err();
        assert_eq!(negative.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_offer_courses_skips_duplicates() {
        let (_tmp, _path, state) = setup_state();
        let reg_id = open_registration(&state, 9, 15);

        let ids = vec!["C101".to_string(), "C102".to_string()];
        let first = state
            .section_api
            .offer_courses(&reg_id, DEPARTMENT_ID, &ids, ACTOR)
            .unwrap();
        assert_eq!(first.len(), 2);

        let again = state
            .section_api
            .offer_courses(&reg_id, DEPARTMENT_ID, &ids, ACTOR)
            .unwrap();
        assert_eq!(again.len(), 2);

        let err = state
            .section_api
            .offer_courses(&reg_id, DEPARTMENT_ID, &["NOPE".to_string()], ACTOR)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_delete_section_frees_its_slots() {
        let (_tmp, _path, state) = setup_state();
        let reg_id = open_registration(&state, 9, 15);
        let (_offered, section_id) =
            offer_with_section(&state, &reg_id, "C101", 30, slot("THU", "09:00", "10:00", "R101", "F01"));

        let detail = state.section_api.get_section(&section_id).unwrap();
        assert_eq!(detail.slots.len(), 1);

        state.section_api.delete_section(&section_id, ACTOR).unwrap();
        assert!(state.section_api.list_slots_for_faculty("F01", "THU").unwrap().is_empty());
        assert_eq!(
            state.section_api.get_section(&section_id).unwrap_err().kind(),
            ErrorKind::NotFound
        );

        let logs = state.registration_api.list_action_logs(&reg_id).unwrap();
        let deleted = logs
            .iter()
            .find(|l| l.action_type == "DELETE_SECTION")
            .unwrap();
        assert!(deleted.detail.as_deref().unwrap_or("").starts_with("删除班级"));
    }
}
