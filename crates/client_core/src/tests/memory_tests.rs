use super::*;
use shared::error::ErrorCode;

fn owner() -> OwnerId {
    OwnerId::from("user_1")
}

#[tokio::test]
async fn subscription_resolves_with_owner_scoped_snapshot() {
    let backend = InMemoryTodoBackend::new();
    backend.seed(&owner(), "mine", false);
    backend.seed(&OwnerId::from("someone_else"), "theirs", false);

    let mut feed = backend.subscribe_todos(&owner());
    let records = feed.latest().expect("resolved");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].text, "mine");
}

#[tokio::test]
async fn mutations_push_new_snapshots_in_insertion_order() {
    let backend = InMemoryTodoBackend::new();
    let mut feed = backend.subscribe_todos(&owner());
    feed.latest();

    let first = backend.create_todo(&owner(), "first").await.expect("create");
    backend.create_todo(&owner(), "second").await.expect("create");
    backend.toggle_todo(&first).await.expect("toggle");

    let records = feed.take_if_changed().flatten().expect("pushed");
    let texts: Vec<_> = records.iter().map(|record| record.text.as_str()).collect();
    assert_eq!(texts, ["first", "second"]);
    assert!(records[0].is_completed);

    backend.delete_todo(&first).await.expect("delete");
    let records = feed.take_if_changed().flatten().expect("pushed");
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn injected_failure_is_consumed_once_and_logged() {
    let backend = InMemoryTodoBackend::new();
    let record = backend.seed(&owner(), "a", false);
    backend.fail_next(MutationKind::Toggle, ApiException::unavailable("offline"));

    let err = backend.toggle_todo(&record.id).await.expect_err("injected");
    assert_eq!(err.code, ErrorCode::Unavailable);
    assert!(!backend.records_for(&owner())[0].is_completed);

    backend.toggle_todo(&record.id).await.expect("second toggle");
    assert!(backend.records_for(&owner())[0].is_completed);
    assert_eq!(backend.requests().len(), 2);
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let backend = InMemoryTodoBackend::new();
    let err = backend
        .update_todo(&TodoId::from("missing"), "x")
        .await
        .expect_err("not found");
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn latency_delays_mutation() {
    let backend = InMemoryTodoBackend::with_latency(Duration::from_millis(20));
    let started = std::time::Instant::now();
    backend.create_todo(&owner(), "slow").await.expect("create");
    assert!(started.elapsed() >= Duration::from_millis(20));
}

#[tokio::test]
async fn abandoned_feeds_are_pruned_on_next_subscribe() {
    let backend = InMemoryTodoBackend::new();
    let first = backend.subscribe_todos(&owner());
    let second = first.clone();
    assert_eq!(backend.lock().publishers[&owner()].subscriber_count(), 2);
    drop(first);
    drop(second);

    let other = OwnerId::from("someone_else");
    let _feed = backend.subscribe_todos(&other);
    let state = backend.lock();
    assert!(!state.publishers.contains_key(&owner()));
    assert_eq!(state.publishers[&other].subscriber_count(), 1);
}

#[tokio::test]
async fn resubscribing_after_prune_sees_current_records() {
    let backend = InMemoryTodoBackend::new();
    drop(backend.subscribe_todos(&owner()));
    backend.create_todo(&owner(), "kept").await.expect("create");
    drop(backend.subscribe_todos(&OwnerId::from("someone_else")));

    let mut feed = backend.subscribe_todos(&owner());
    let records = feed.latest().expect("resolved");
    assert_eq!(records[0].text, "kept");
}
