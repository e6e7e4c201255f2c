// ==========================================
// 学期注册状态机测试
// ==========================================
// 职责: 验证开启/推进/修改/删除注册的状态约束
// ==========================================


#[cfg(test)]
mod registration_state_machine_test {
    use term_registration::api::{ApiError, ErrorKind};
    use term_registration::domain::types::RegistrationStatus;

    use crate::test_helpers::*;

    #[test]
    fn test_open_creates_upcoming_registration() {
        let (_tmp, _path, state) = setup_state();

        let reg = state
            .registration_api
            .open_registration(SEMESTER_ID, 9, 15, None, None, ACTOR)
            .unwrap();
        assert_eq!(reg.status, RegistrationStatus::Upcoming);
        assert_eq!(reg.min_credit, 9);
        assert_eq!(reg.max_credit, 15);

        let current = state.registration_api.current_registration().unwrap().unwrap();
        assert_eq!(current.registration_id, reg.registration_id);
    }

    #[test]
    fn test_second_open_is_rejected_while_active() {
        let (_tmp, _path, state) = setup_state();
        let reg_id = open_registration(&state, 9, 15);

        let err = state
            .registration_api
            .open_registration(SEMESTER_ID, 9, 15, None, None, ACTOR)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        // ONGOING 仍是活动状态
        state
            .registration_api
            .advance_registration(&reg_id, "ONGOING", ACTOR)
            .unwrap();
        let err = state
            .registration_api
            .open_registration(SEMESTER_ID, 9, 15, None, None, ACTOR)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        // 结束后可以开启新的注册
        state
            .registration_api
            .advance_registration(&reg_id, "ENDED", ACTOR)
            .unwrap();
        assert!(state
            .registration_api
            .open_registration(SEMESTER_ID, 9, 15, None, None, ACTOR)
            .is_ok());
        assert_eq!(state.registration_api.list_registrations().unwrap().len(), 2);
    }

    #[test]
    fn test_advance_only_moves_forward() {
        let (_tmp, _path, state) = setup_state();
        let reg_id = open_registration(&state, 9, 15);

        // 不能跳过 ONGOING
        let err = state
            .registration_api
            .advance_registration(&reg_id, "ENDED", ACTOR)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let reg = state
            .registration_api
            .advance_registration(&reg_id, "ONGOING", ACTOR)
            .unwrap();
        assert_eq!(reg.status, RegistrationStatus::Ongoing);

        // 不能回退或原地
        for target in ["UPCOMING", "ONGOING"] {
            let err = state
                .registration_api
                .advance_registration(&reg_id, target, ACTOR)
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }

        let reg = state
            .registration_api
            .advance_registration(&reg_id, "ENDED", ACTOR)
            .unwrap();
        assert_eq!(reg.status, RegistrationStatus::Ended);

        // ENDED 为终态
        for target in ["UPCOMING", "ONGOING", "ENDED"] {
            assert!(state
                .registration_api
                .advance_registration(&reg_id, target, ACTOR)
                .is_err());
        }
        assert!(state.registration_api.current_registration().unwrap().is_none());
    }

    #[test]
    fn test_invalid_inputs() {
        let (_tmp, _path, state) = setup_state();

        let err = state
            .registration_api
            .open_registration(SEMESTER_ID, 15, 9, None, None, ACTOR)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = state
            .registration_api
            .open_registration("NO-SUCH-SEMESTER", 9, 15, None, None, ACTOR)
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err = state
            .registration_api
            .advance_registration("missing", "ONGOING", ACTOR)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let reg_id = open_registration(&state, 9, 15);
        let err = state
            .registration_api
            .advance_registration(&reg_id, "PAUSED", ACTOR)
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[test]
    fn test_update_credit_limits_until_ended() {
        let (_tmp, _path, state) = setup_state();
        let reg_id = open_ongoing_registration(&state, 9, 15);

        let reg = state
            .registration_api
            .update_credit_limits(&reg_id, 6, 18, ACTOR)
            .unwrap();
        assert_eq!((reg.min_credit, reg.max_credit), (6, 18));

        state
            .registration_api
            .advance_registration(&reg_id, "ENDED", ACTOR)
            .unwrap();
        let err = state
            .registration_api
            .update_credit_limits(&reg_id, 3, 12, ACTOR)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_delete_only_upcoming_without_sections() {
        let (_tmp, _path, state) = setup_state();

        let reg_id = open_registration(&state, 9, 15);
        offer_with_section(&state, &reg_id, "C101", 10, slot("MON", "09:00", "10:00", "R101", "F01"));
        let err = state
            .registration_api
            .delete_registration(&reg_id, ACTOR)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        state
            .registration_api
            .advance_registration(&reg_id, "ONGOING", ACTOR)
            .unwrap();
        state
            .registration_api
            .advance_registration(&reg_id, "ENDED", ACTOR)
            .unwrap();
        assert!(state.registration_api.delete_registration(&reg_id, ACTOR).is_err());

        let empty_id = open_registration(&state, 9, 15);
        state
            .registration_api
            .delete_registration(&empty_id, ACTOR)
            .unwrap();
        assert_eq!(
            state
                .registration_api
                .get_registration(&empty_id)
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_mutations_are_audited() {
        let (_tmp, _path, state) = setup_state();
        let reg_id = open_ongoing_registration(&state, 9, 15);

        let logs = state.registration_api.list_action_logs(&reg_id).unwrap();
        let types: Vec<&str> = logs.iter().map(|l| l.action_type.as_str()).collect();
        assert!(types.contains(&"OPEN_REGISTRATION"));
        assert!(types.contains(&"ADVANCE_REGISTRATION"));
        assert!(logs.iter().all(|l| l.actor == ACTOR));
    }
}
