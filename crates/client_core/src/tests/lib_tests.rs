use super::*;

#[tokio::test]
async fn missing_backend_rejects_every_mutation() {
    let backend = MissingTodoBackend;
    let owner = OwnerId::from("user");
    let id = TodoId::from("t1");

    assert!(backend.create_todo(&owner, "a").await.is_err());
    assert!(backend.toggle_todo(&id).await.is_err());
    assert!(backend.update_todo(&id, "b").await.is_err());
    let err = backend.delete_todo(&id).await.expect_err("delete fails");
    assert_eq!(err.code, shared::error::ErrorCode::Unavailable);

    let mut feed = backend.subscribe_todos(&owner);
    assert_eq!(feed.latest(), None);
}

#[tokio::test]
async fn execute_mutation_routes_to_matching_entry_point() {
    let backend = InMemoryTodoBackend::new();
    let owner = OwnerId::from("user");
    let record = backend.seed(&owner, "a", false);

    execute_mutation(
        &backend,
        &TodoMutation::Toggle {
            id: record.id.clone(),
        },
    )
    .await
    .expect("toggle");
    execute_mutation(
        &backend,
        &TodoMutation::Update {
            id: record.id.clone(),
            text: "b".into(),
        },
    )
    .await
    .expect("update");

    let stored = backend.records_for(&owner);
    assert_eq!(stored.len(), 1);
    assert!(stored[0].is_completed);
    assert_eq!(stored[0].text, "b");
}

#[test]
fn session_identity_switches_state() {
    let identity = SessionIdentity::new(AuthState::Resolving);
    assert_eq!(identity.auth_state(), AuthState::Resolving);
    assert!(identity.auth_state().owner().is_none());

    identity.sign_in("user_7");
    assert_eq!(
        identity.auth_state().owner(),
        Some(&OwnerId::from("user_7"))
    );

    identity.sign_out();
    assert_eq!(identity.auth_state(), AuthState::SignedOut);
}
