//! Behavior every [`Storage`] backend must share.
//!
//! Each case takes a `tag` that is folded into user names, so the cases can
//! run against a long-lived database without colliding.

use chrono::{TimeZone, Utc};

use crate::error::TodoError;
use crate::model::Status;
use crate::storage::Storage;

fn name(tag: &str, base: &str) -> String {
    format!("{base}-{tag}")
}

pub fn duplicate_user_name(storage: &dyn Storage, tag: &str) {
    let alice = name(tag, "alice");
    storage.create_user(&alice, "one").unwrap();
    let err = storage.create_user(&alice, "two").unwrap_err();
    assert!(matches!(err, TodoError::DuplicateName { ref name } if *name == alice));
    assert_eq!(
        storage.get_credential_hash_by_name(&alice).unwrap().as_deref(),
        Some("one")
    );
}

pub fn duplicate_list_per_owner(storage: &dyn Storage, tag: &str) {
    let alice = storage.create_user(&name(tag, "alice"), "h").unwrap();
    let bob = storage.create_user(&name(tag, "bob"), "h").unwrap();
    storage.create_list(alice.db_id, "Default").unwrap();

    let err = storage.create_list(alice.db_id, "Default").unwrap_err();
    assert!(matches!(err, TodoError::DuplicateList { .. }));
    storage.create_list(bob.db_id, "Default").unwrap();
}

pub fn default_list_requires_ownership(storage: &dyn Storage, tag: &str) {
    let alice = storage.create_user(&name(tag, "alice"), "h").unwrap();
    let bob = storage.create_user(&name(tag, "bob"), "h").unwrap();
    let list = storage.create_list(alice.db_id, "Default").unwrap();

    let err = storage.set_default_list(bob.db_id, list.db_id).unwrap_err();
    assert!(matches!(err, TodoError::NotFound { entity: "list", .. }));
    let err = storage.set_default_list(-1, list.db_id).unwrap_err();
    assert!(matches!(err, TodoError::NotFound { entity: "user", .. }));

    storage.set_default_list(alice.db_id, list.db_id).unwrap();
    let reloaded = storage.get_user(alice.db_id).unwrap().unwrap();
    assert_eq!(reloaded.default_list_id, Some(list.db_id));
}

pub fn task_owner_matches_list(storage: &dyn Storage, tag: &str) {
    let alice = storage.create_user(&name(tag, "alice"), "h").unwrap();
    let bob = storage.create_user(&name(tag, "bob"), "h").unwrap();
    let list = storage.create_list(alice.db_id, "Default").unwrap();

    let err = storage
        .create_task(list.db_id, bob.db_id, "sneaky", None)
        .unwrap_err();
    assert!(matches!(err, TodoError::NotFound { entity: "list", .. }));
    let err = storage
        .create_task(-1, alice.db_id, "nowhere", None)
        .unwrap_err();
    assert!(matches!(err, TodoError::NotFound { entity: "list", .. }));

    storage
        .create_task(list.db_id, alice.db_id, "mine", None)
        .unwrap();
    let tasks = storage.list_tasks(list.db_id).unwrap();
    assert_eq!(tasks.len(), 1);
    assert!(tasks.iter().all(|t| t.user_id == list.owner_user_id));
}

pub fn task_round_trip(storage: &dyn Storage, tag: &str) {
    let alice = storage.create_user(&name(tag, "alice"), "h").unwrap();
    let list = storage.create_list(alice.db_id, "Default").unwrap();
    let due = Utc.with_ymd_and_hms(2031, 7, 1, 9, 15, 0).unwrap();

    let first = storage
        .create_task(list.db_id, alice.db_id, "draft", None)
        .unwrap();
    storage
        .create_task(list.db_id, alice.db_id, "second", Some(due))
        .unwrap();

    storage.update_task_description(first.db_id, "final").unwrap();
    storage.update_task_status(first.db_id, Status::Done).unwrap();
    storage.update_task_due_date(first.db_id, Some(due)).unwrap();

    let tasks = storage.list_tasks(list.db_id).unwrap();
    let descriptions: Vec<_> = tasks.iter().map(|t| t.description.as_str()).collect();
    assert_eq!(descriptions, ["final", "second"]);
    assert_eq!(tasks[0].status, Status::Done);
    assert_eq!(tasks[0].due_date, Some(due));
    assert_eq!(tasks[0].created, first.created);
    assert_eq!(tasks[1].status, Status::New);
    assert_eq!(tasks[1].due_date, Some(due));

    storage.update_task_due_date(first.db_id, None).unwrap();
    assert_eq!(storage.list_tasks(list.db_id).unwrap()[0].due_date, None);
}

pub fn unknown_task_updates(storage: &dyn Storage) {
    assert!(matches!(
        storage.update_task_description(-1, "x").unwrap_err(),
        TodoError::NotFound { entity: "task", .. }
    ));
    assert!(matches!(
        storage.update_task_status(-1, Status::Done).unwrap_err(),
        TodoError::NotFound { entity: "task", .. }
    ));
    assert!(matches!(
        storage.update_task_due_date(-1, None).unwrap_err(),
        TodoError::NotFound { entity: "task", .. }
    ));
}
