use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use shared::{
    domain::{OwnerId, TodoId},
    error::ApiException,
    protocol::TodoMutation,
};

pub mod controller;
pub mod edit_session;
pub mod events;
pub mod feed;
pub mod memory;
pub mod progress;

pub use controller::{
    ControllerError, ControllerUpdate, DeleteChoice, DeletePrompt, ScreenView, Ticket,
    TodoListController, TodoListView, TodoRow,
};
pub use edit_session::{EditSession, ListState};
pub use events::{MutationOutcome, Notification, NotificationCategory};
pub use feed::{FeedPublisher, Snapshot, TodoFeed};
pub use memory::InMemoryTodoBackend;
pub use progress::{compute_progress, Progress};

/// Reactive data backend owning every todo record.
///
/// Mutations resolve asynchronously; their visible effect arrives through the
/// feed returned by [`TodoBackend::subscribe_todos`], never through the
/// mutation's own return value.
#[async_trait]
pub trait TodoBackend: Send + Sync {
    async fn create_todo(&self, owner_id: &OwnerId, text: &str) -> Result<TodoId, ApiException>;
    async fn toggle_todo(&self, id: &TodoId) -> Result<(), ApiException>;
    async fn update_todo(&self, id: &TodoId, text: &str) -> Result<(), ApiException>;
    async fn delete_todo(&self, id: &TodoId) -> Result<(), ApiException>;
    fn subscribe_todos(&self, owner_id: &OwnerId) -> TodoFeed;
}

/// Routes a mutation request to the matching backend entry point.
pub async fn execute_mutation(
    backend: &dyn TodoBackend,
    mutation: &TodoMutation,
) -> Result<(), ApiException> {
    match mutation {
        TodoMutation::Create { owner_id, text } => {
            backend.create_todo(owner_id, text).await.map(|_| ())
        }
        TodoMutation::Toggle { id } => backend.toggle_todo(id).await,
        TodoMutation::Update { id, text } => backend.update_todo(id, text).await,
        TodoMutation::Delete { id } => backend.delete_todo(id).await,
    }
}

pub struct MissingTodoBackend;

#[async_trait]
impl TodoBackend for MissingTodoBackend {
    async fn create_todo(&self, owner_id: &OwnerId, _text: &str) -> Result<TodoId, ApiException> {
        Err(ApiException::unavailable(format!(
            "todo backend unavailable for owner {owner_id}"
        )))
    }

    async fn toggle_todo(&self, id: &TodoId) -> Result<(), ApiException> {
        Err(ApiException::unavailable(format!(
            "todo backend unavailable for todo {id}"
        )))
    }

    async fn update_todo(&self, id: &TodoId, _text: &str) -> Result<(), ApiException> {
        Err(ApiException::unavailable(format!(
            "todo backend unavailable for todo {id}"
        )))
    }

    async fn delete_todo(&self, id: &TodoId) -> Result<(), ApiException> {
        Err(ApiException::unavailable(format!(
            "todo backend unavailable for todo {id}"
        )))
    }

    fn subscribe_todos(&self, _owner_id: &OwnerId) -> TodoFeed {
        TodoFeed::unresolved()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// The identity provider has not finished restoring its session.
    Resolving,
    SignedOut,
    SignedIn(OwnerId),
}

impl AuthState {
    pub fn owner(&self) -> Option<&OwnerId> {
        match self {
            AuthState::SignedIn(owner) => Some(owner),
            _ => None,
        }
    }
}

pub trait IdentityProvider: Send + Sync {
    fn auth_state(&self) -> AuthState;
}

/// Identity whose state is driven by the embedding shell.
pub struct SessionIdentity {
    state: RwLock<AuthState>,
}

impl SessionIdentity {
    pub fn new(state: AuthState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    pub fn signed_in(owner_id: impl Into<OwnerId>) -> Self {
        Self::new(AuthState::SignedIn(owner_id.into()))
    }

    pub fn set(&self, state: AuthState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub fn sign_in(&self, owner_id: impl Into<OwnerId>) {
        self.set(AuthState::SignedIn(owner_id.into()));
    }

    pub fn sign_out(&self) {
        self.set(AuthState::SignedOut);
    }
}

impl IdentityProvider for SessionIdentity {
    fn auth_state(&self) -> AuthState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
