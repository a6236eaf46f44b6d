use super::*;

use client_core::{AuthState, InMemoryTodoBackend};
use shared::{
    domain::OwnerId,
    error::ApiException,
    protocol::{MutationKind, TodoMutation},
};

fn owner() -> OwnerId {
    OwnerId::from("user_1")
}

fn shell_with(backend: &Arc<InMemoryTodoBackend>, auth: AuthState) -> Shell<Vec<u8>> {
    let identity = Arc::new(SessionIdentity::new(auth));
    let controller =
        TodoListController::new(backend.clone(), identity.clone()).expect("controller");
    Shell::new(controller, identity, Vec::new())
}

fn output(shell: &Shell<Vec<u8>>) -> String {
    String::from_utf8_lossy(shell.output()).into_owned()
}

async fn settle(shell: &mut Shell<Vec<u8>>) {
    while let Some(outcome) = shell.controller.next_outcome().await {
        shell
            .handle_update(ControllerUpdate::Outcome(outcome))
            .expect("update");
    }
    shell.controller.poll_feed();
}

#[test]
fn parses_commands_and_arguments() {
    assert_eq!(ShellCommand::parse("   "), Ok(None));
    assert_eq!(ShellCommand::parse("LIST"), Ok(Some(ShellCommand::List)));
    assert_eq!(
        ShellCommand::parse("add  buy milk "),
        Ok(Some(ShellCommand::Add("buy milk".into())))
    );
    assert_eq!(
        ShellCommand::parse("toggle 2"),
        Ok(Some(ShellCommand::Toggle(2)))
    );
    assert_eq!(ShellCommand::parse("y"), Ok(Some(ShellCommand::Confirm)));
}

#[test]
fn draft_keeps_surrounding_whitespace() {
    assert_eq!(
        ShellCommand::parse("draft   buy milk  "),
        Ok(Some(ShellCommand::Draft("  buy milk  ".into())))
    );
    assert_eq!(
        ShellCommand::parse("draft"),
        Ok(Some(ShellCommand::Draft(String::new())))
    );
}

#[test]
fn rejects_bad_input() {
    assert_eq!(
        ShellCommand::parse("frobnicate"),
        Err(ShellError::Unknown("frobnicate".into()))
    );
    assert_eq!(
        ShellCommand::parse("toggle"),
        Err(ShellError::MissingArgument("toggle"))
    );
    assert_eq!(
        ShellCommand::parse("edit 0"),
        Err(ShellError::BadRow("0".into()))
    );
}

#[test]
fn progress_bar_is_clamped() {
    assert_eq!(progress_bar(0.0, 4), "[----]");
    assert_eq!(progress_bar(50.0, 4), "[##--]");
    assert_eq!(progress_bar(100.0, 4), "[####]");
}

#[test]
fn renders_loading_and_signed_out_screens() {
    assert_eq!(render_view(&ScreenView::Loading), "loading...");
    assert!(render_view(&ScreenView::SignedOut).contains("signed out"));
}

#[tokio::test]
async fn renders_rows_with_summary_and_edit_buffer() {
    let backend = Arc::new(InMemoryTodoBackend::new());
    backend.seed(&owner(), "write report", true);
    backend.seed(&owner(), "call mom", false);
    let mut shell = shell_with(&backend, AuthState::SignedIn(owner()));

    shell.handle_line("edit 2").expect("edit");
    shell.handle_line("draft call dad").expect("draft");
    let rendered = render_view(&shell.controller().view());

    assert_eq!(
        rendered,
        "1 of 2 completed (50%)\n\
         [##########----------]\n  \
         1. [x] write report\n  \
         2. [ ] [editing] call dad"
    );
}

#[tokio::test]
async fn empty_list_shows_empty_state() {
    let backend = Arc::new(InMemoryTodoBackend::new());
    let shell = shell_with(&backend, AuthState::SignedIn(owner()));
    let rendered = render_view(&shell.controller().view());
    assert!(rendered.starts_with("0 of 0 completed (0%)"));
    assert!(rendered.ends_with("No todos yet! Add your first todo above."));
}

#[tokio::test]
async fn delete_flow_requires_confirmation() {
    let backend = Arc::new(InMemoryTodoBackend::new());
    backend.seed(&owner(), "a", false);
    let mut shell = shell_with(&backend, AuthState::SignedIn(owner()));

    shell.handle_line("delete 1").expect("delete");
    assert!(output(&shell).contains("Are you sure you want to delete this todo? [yes/no]"));
    shell.handle_line("no").expect("abandon");
    settle(&mut shell).await;
    assert!(backend.requests().is_empty());

    shell.handle_line("delete 1").expect("delete");
    shell.handle_line("yes").expect("confirm");
    settle(&mut shell).await;
    assert!(shell.controller().records().is_empty());
}

#[tokio::test]
async fn failed_save_prints_notification_and_keeps_editing() {
    let backend = Arc::new(InMemoryTodoBackend::new());
    let todo = backend.seed(&owner(), "a", false);
    backend.fail_next(MutationKind::Update, ApiException::unavailable("offline"));
    let mut shell = shell_with(&backend, AuthState::SignedIn(owner()));

    shell.handle_line("edit 1").expect("edit");
    shell.handle_line("draft  b ").expect("draft");
    shell.handle_line("save").expect("save");
    settle(&mut shell).await;

    assert!(output(&shell).contains("Error: Failed to update todo"));
    assert!(shell.controller().edit_session().is_some());
    assert_eq!(
        backend.requests(),
        vec![TodoMutation::Update {
            id: todo.id,
            text: "b".into(),
        }]
    );
}

#[tokio::test]
async fn unknown_row_is_reported_without_dispatch() {
    let backend = Arc::new(InMemoryTodoBackend::new());
    let mut shell = shell_with(&backend, AuthState::SignedIn(owner()));

    assert!(shell.handle_line("toggle 3").expect("handled"));
    assert!(output(&shell).contains("no row 3"));
    assert_eq!(shell.controller().in_flight(), 0);
}

#[tokio::test]
async fn login_switches_owner_and_quit_stops() {
    let backend = Arc::new(InMemoryTodoBackend::new());
    backend.seed(&OwnerId::from("bob"), "bob's task", false);
    let mut shell = shell_with(&backend, AuthState::SignedOut);

    shell.handle_line("login bob").expect("login");
    assert_eq!(shell.controller().records().len(), 1);
    shell.handle_line("logout").expect("logout");
    assert!(output(&shell).contains("signed out"));
    assert!(shell.controller().records().is_empty());

    assert!(!shell.handle_line("quit").expect("quit"));
}

#[tokio::test]
async fn json_mode_prints_serialized_view() {
    let backend = Arc::new(InMemoryTodoBackend::new());
    backend.seed(&owner(), "a", true);
    let mut shell = shell_with(&backend, AuthState::SignedIn(owner())).with_json(true);

    shell.print_view().expect("print");
    let value: serde_json::Value = serde_json::from_str(&output(&shell)).expect("json");
    assert_eq!(value["progress"]["completed"], 1);
    assert_eq!(value["rows"][0]["record"]["text"], "a");
}
