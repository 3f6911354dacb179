mod common;

use chrono::{Duration, TimeZone, Utc};
use common::{CountingStorage, test_db, test_db_with_dir};
use todoika::builder::{TasksListBuilder, UserBuilder};
use todoika::error::ErrorCode;
use todoika::model::{Status, User};
use todoika::storage::{SqliteStorage, Storage};

fn register(storage: &dyn Storage, name: &str) -> User {
    UserBuilder::new(storage).build_new(name, "hash").unwrap()
}

#[test]
fn tasks_keep_insertion_order() {
    let storage = test_db();
    let user = register(&storage, "alice");
    let mut list = TasksListBuilder::new(&storage).build_default(&user).unwrap();

    for description in ["one", "two", "three"] {
        list.add_task(description, None).unwrap();
    }
    let first = list.id_at(0).unwrap();
    list.set_task_status(first, Status::Done).unwrap();

    let reloaded = TasksListBuilder::new(&storage).build_default(&user).unwrap();
    let order: Vec<_> = reloaded
        .filter_tasks_by_status(None)
        .map(|t| t.description.as_str())
        .collect();
    assert_eq!(order, ["one", "two", "three"]);
    assert_eq!(reloaded.task_at(0).unwrap().status, Status::Done);
}

#[test]
fn empty_description_makes_no_storage_call() {
    let storage = CountingStorage::new(test_db());
    let user = register(&storage, "alice");
    let mut list = TasksListBuilder::new(&storage).build_default(&user).unwrap();
    storage.reset();

    for blank in ["", "   ", "\t"] {
        let err = list.add_task(blank, None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);
    }
    assert_eq!(storage.calls(), 0);
    assert!(list.is_empty());
}

#[test]
fn empty_edit_leaves_stored_description() {
    let storage = CountingStorage::new(test_db());
    let user = register(&storage, "alice");
    let mut list = TasksListBuilder::new(&storage).build_default(&user).unwrap();
    let task = list.add_task("Buy milk", None).unwrap();
    storage.reset();

    let err = list.edit_task_description(task.db_id, "  ").unwrap_err();
    assert_eq!(err.code(), ErrorCode::Validation);
    assert_eq!(storage.calls(), 0);

    let stored = storage.list_tasks(list.db_id()).unwrap();
    assert_eq!(stored[0].description, "Buy milk");
}

#[test]
fn status_filter_partitions_tasks() {
    let storage = test_db();
    let user = register(&storage, "alice");
    let mut list = TasksListBuilder::new(&storage).build_default(&user).unwrap();
    for description in ["a", "b", "c", "d"] {
        list.add_task(description, None).unwrap();
    }
    for index in [1, 3] {
        let id = list.id_at(index).unwrap();
        list.set_task_status(id, Status::Done).unwrap();
    }

    let done: Vec<_> = list
        .filter_tasks_by_status(Some(Status::Done))
        .map(|t| t.description.as_str())
        .collect();
    let open: Vec<_> = list
        .filter_tasks_by_status(Some(Status::New))
        .map(|t| t.description.as_str())
        .collect();
    assert_eq!(done, ["b", "d"]);
    assert_eq!(open, ["a", "c"]);
    assert_eq!(list.filter_tasks_by_status(None).count(), 4);

    // Toggling back is allowed.
    let id = list.id_at(1).unwrap();
    list.set_task_status(id, Status::New).unwrap();
    assert_eq!(list.filter_tasks_by_status(Some(Status::Done)).count(), 1);
}

#[test]
fn due_date_survives_reopen() {
    let (storage, dir) = test_db_with_dir();
    let user = register(&storage, "alice");
    let due = Utc.with_ymd_and_hms(2031, 7, 14, 9, 45, 0).unwrap();
    let past = Utc::now() - Duration::days(3);

    let mut list = TasksListBuilder::new(&storage).build_default(&user).unwrap();
    let future_task = list.add_task("Renew passport", Some(due)).unwrap();
    let overdue = list.add_task("Call the bank", None).unwrap();
    list.set_due_date(overdue.db_id, past).unwrap();
    drop(list);
    drop(storage);

    let storage = SqliteStorage::open(&common::db_path(dir.path())).unwrap();
    let user = UserBuilder::new(&storage).build_by_name("alice").unwrap();
    let list = TasksListBuilder::new(&storage).build_default(&user).unwrap();

    assert_eq!(list.task_at(0).unwrap().db_id, future_task.db_id);
    assert_eq!(list.task_at(0).unwrap().due_date, Some(due));
    let stored_past = list.task_at(1).unwrap().due_date.unwrap();
    assert_eq!(stored_past.timestamp(), past.timestamp());
}

#[test]
fn clearing_due_date() {
    let storage = test_db();
    let user = register(&storage, "alice");
    let due = Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap();
    let mut list = TasksListBuilder::new(&storage).build_default(&user).unwrap();
    let task = list.add_task("Dentist", Some(due)).unwrap();

    list.clear_due_date(task.db_id).unwrap();
    assert_eq!(list.task_at(0).unwrap().due_date, None);
    assert_eq!(storage.list_tasks(list.db_id()).unwrap()[0].due_date, None);
}

#[test]
fn foreign_task_ids_are_not_found() {
    let storage = test_db();
    let alice = register(&storage, "alice");
    let bob = register(&storage, "bob");
    let lists = TasksListBuilder::new(&storage);

    let mut alice_list = lists.build_default(&alice).unwrap();
    let mut bob_list = lists.build_default(&bob).unwrap();
    let bobs_task = bob_list.add_task("Bob's task", None).unwrap();

    let err = alice_list
        .set_task_status(bobs_task.db_id, Status::Done)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
    bob_list.reload().unwrap();
    assert_eq!(bob_list.task_at(0).unwrap().status, Status::New);
}

#[test]
fn lists_belong_to_their_owner() {
    let storage = test_db();
    let alice = register(&storage, "alice");
    let bob = register(&storage, "bob");
    let lists = TasksListBuilder::new(&storage);
    let work = lists.create(alice.db_id, "Work").unwrap();

    let err = lists.build(bob.db_id, work.db_id()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);

    let err = storage.set_default_list(bob.db_id, work.db_id()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
    let bob = storage.get_user(bob.db_id).unwrap().unwrap();
    assert_ne!(bob.default_list_id, Some(work.db_id()));
}

#[test]
fn switching_default_list() {
    let storage = test_db();
    let alice = register(&storage, "alice");
    let lists = TasksListBuilder::new(&storage);
    let work = lists.create(alice.db_id, "Work").unwrap();

    storage.set_default_list(alice.db_id, work.db_id()).unwrap();
    let alice = UserBuilder::new(&storage).build_by_name("alice").unwrap();
    let list = lists.build_default(&alice).unwrap();
    assert_eq!(list.description(), "Work");
}
