use super::ActionLogRepository;
use crate::domain::action_log::{ActionLog, ActionType};
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Mutex};

fn setup_test_db() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::configure_sqlite_connection(&conn).unwrap();
    crate::db::init_schema(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}

#[test]
fn test_insert_and_find_by_id() {
    let repo = ActionLogRepository::new(setup_test_db());

    let log = ActionLog::new(ActionType::Enroll, "student-1")
        .with_registration("R1")
        .with_student("ST1")
        .with_payload(json!({ "section_id": "SEC1" }));
    let id = repo.insert(&log).unwrap();
    assert_eq!(id, log.action_id);

    let found = repo.find_by_id(&id).unwrap().unwrap();
    assert_eq!(found.action_type, "ENROLL");
    assert_eq!(found.registration_id.as_deref(), Some("R1"));
    assert_eq!(found.student_id.as_deref(), Some("ST1"));
    assert_eq!(found.payload_json, Some(json!({ "section_id": "SEC1" })));
}

#[test]
fn test_find_by_id_missing_returns_none() {
    let repo = ActionLogRepository::new(setup_test_db());
    assert!(repo.find_by_id("nope").unwrap().is_none());
}

#[test]
fn test_find_by_registration_and_type() {
    let repo = ActionLogRepository::new(setup_test_db());

    repo.insert(&ActionLog::new(ActionType::OpenRegistration, "admin").with_registration("R1"))
        .unwrap();
    repo.insert(&ActionLog::new(ActionType::AdvanceRegistration, "admin").with_registration("R1"))
        .unwrap();
    repo.insert(&ActionLog::new(ActionType::OpenRegistration, "admin").with_registration("R2"))
        .unwrap();

    assert_eq!(repo.find_by_registration("R1").unwrap().len(), 2);
    assert_eq!(repo.count_by_action_type("OPEN_REGISTRATION").unwrap(), 2);
    assert_eq!(repo.find_by_action_type("ADVANCE_REGISTRATION", 10).unwrap().len(), 1);
    assert_eq!(repo.find_recent(2).unwrap().len(), 2);
}

#[test]
fn test_insert_tx_rolls_back_with_transaction() {
    let conn = setup_test_db();
    let repo = ActionLogRepository::new(conn.clone());

    {
        let mut guard = conn.lock().unwrap();
        let tx = crate::db::begin_immediate(&mut guard).unwrap();
        ActionLogRepository::insert_tx(&tx, &ActionLog::new(ActionType::Withdraw, "student-1"))
            .unwrap();
        tx.rollback().unwrap();
    }

    assert!(repo.find_recent(10).unwrap().is_empty());
}
