//! Todo list controller: turns user intents into local state transitions and
//! backend mutations, and derives the render-ready view from pushed snapshots.

use std::{collections::VecDeque, sync::Arc};

use serde::Serialize;
use shared::{
    domain::{OwnerId, TodoId, TodoRecord},
    error::{ApiException, ErrorCode},
    protocol::{MutationKind, TodoMutation},
};
use thiserror::Error;
use tokio::{runtime::Handle, sync::mpsc};
use tracing::{debug, info, warn};

use crate::{
    edit_session::{EditSession, ListState},
    events::{MutationOutcome, Notification},
    execute_mutation,
    feed::{Snapshot, TodoFeed},
    progress::{compute_progress, Progress},
    AuthState, IdentityProvider, TodoBackend,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Ticket(pub u64);

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("todo list controller must be created inside a tokio runtime")]
    NoRuntime,
    #[error("no live todo query is active; sign in first")]
    NotSubscribed,
    #[error("live todo query closed by backend")]
    FeedClosed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePrompt {
    pub id: TodoId,
    pub title: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteChoice {
    Abandon,
    Confirm,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TodoRow {
    pub record: TodoRecord,
    /// Draft text when this row is in edit mode.
    pub draft: Option<String>,
}

impl TodoRow {
    pub fn is_editing(&self) -> bool {
        self.draft.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TodoListView {
    pub rows: Vec<TodoRow>,
    pub progress: Progress,
}

/// Something the controller applied while waiting in [`TodoListController::next_update`].
#[derive(Debug, Clone)]
pub enum ControllerUpdate {
    Outcome(MutationOutcome),
    Snapshot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScreenView {
    Loading,
    SignedOut,
    Todos(TodoListView),
}

struct LiveQuery {
    owner_id: OwnerId,
    feed: TodoFeed,
}

/// Update sent for an edit session and not yet settled.
#[derive(Debug)]
struct PendingCommit {
    generation: u64,
    ticket: Ticket,
    text: String,
}

pub struct TodoListController {
    backend: Arc<dyn TodoBackend>,
    identity: Arc<dyn IdentityProvider>,
    runtime: Handle,
    auth: AuthState,
    query: Option<LiveQuery>,
    records: Snapshot,
    state: ListState,
    pending_delete: Option<DeletePrompt>,
    committing: Option<PendingCommit>,
    outcome_tx: mpsc::UnboundedSender<MutationOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<MutationOutcome>,
    next_ticket: u64,
    in_flight: usize,
    notifications: VecDeque<Notification>,
}

impl TodoListController {
    /// Creates a controller that spawns mutations on the current tokio runtime.
    pub fn new(
        backend: Arc<dyn TodoBackend>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self, ControllerError> {
        let runtime = Handle::try_current().map_err(|_| ControllerError::NoRuntime)?;
        Ok(Self::with_runtime(backend, identity, runtime))
    }

    /// Creates a controller that lives on a non-runtime thread and spawns
    /// mutations onto `runtime`.
    pub fn with_runtime(
        backend: Arc<dyn TodoBackend>,
        identity: Arc<dyn IdentityProvider>,
        runtime: Handle,
    ) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let mut controller = Self {
            backend,
            identity,
            runtime,
            auth: AuthState::Resolving,
            query: None,
            records: None,
            state: ListState::new(),
            pending_delete: None,
            committing: None,
            outcome_tx,
            outcome_rx,
            next_ticket: 1,
            in_flight: 0,
            notifications: VecDeque::new(),
        };
        controller.sync_auth();
        controller
    }

    /// Re-reads the identity provider and (re)subscribes the live query for
    /// the signed-in owner.
    pub fn sync_auth(&mut self) -> &AuthState {
        let auth = self.identity.auth_state();
        if auth == self.auth {
            return &self.auth;
        }

        info!(?auth, "auth state changed");
        match auth.owner() {
            Some(owner_id) => {
                let subscribed = self
                    .query
                    .as_ref()
                    .is_some_and(|query| &query.owner_id == owner_id);
                if !subscribed {
                    self.reset_list_state();
                    let mut feed = self.backend.subscribe_todos(owner_id);
                    // A fresh subscription treats the current snapshot as seen.
                    let snapshot = feed.latest();
                    self.query = Some(LiveQuery {
                        owner_id: owner_id.clone(),
                        feed,
                    });
                    self.apply_snapshot(snapshot);
                }
            }
            None => {
                self.reset_list_state();
                self.query = None;
            }
        }
        self.auth = auth;
        &self.auth
    }

    fn reset_list_state(&mut self) {
        self.records = None;
        self.state.cancel_edit();
        self.pending_delete = None;
        self.committing = None;
    }

    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    /// Applies a pushed snapshot if the live query has produced one since the
    /// last poll.
    pub fn poll_feed(&mut self) -> bool {
        let Some(query) = self.query.as_mut() else {
            return false;
        };
        match query.feed.take_if_changed() {
            Some(snapshot) => {
                self.apply_snapshot(snapshot);
                true
            }
            None => false,
        }
    }

    /// Waits for the next push from the live query and applies it.
    pub async fn wait_for_push(&mut self) -> Result<(), ControllerError> {
        let query = self.query.as_mut().ok_or(ControllerError::NotSubscribed)?;
        let snapshot = query
            .feed
            .changed()
            .await
            .map_err(|_| ControllerError::FeedClosed)?;
        self.apply_snapshot(snapshot);
        Ok(())
    }

    /// Replaces the displayed collection. Order is kept exactly as pushed.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        if let Some(records) = snapshot.as_deref() {
            if self.state.discard_if_missing(records) {
                debug!("edited todo left the list; edit session discarded");
                self.committing = None;
            }
            if let Some(prompt) = &self.pending_delete {
                if !records.iter().any(|record| record.id == prompt.id) {
                    self.pending_delete = None;
                }
            }
        }
        self.records = snapshot;
    }

    pub fn records(&self) -> &[TodoRecord] {
        self.records.as_deref().unwrap_or_default()
    }

    pub fn record(&self, id: &TodoId) -> Option<&TodoRecord> {
        self.records().iter().find(|record| &record.id == id)
    }

    pub fn progress(&self) -> Progress {
        compute_progress(self.records())
    }

    pub fn edit_session(&self) -> Option<&EditSession> {
        self.state.session()
    }

    pub fn pending_delete(&self) -> Option<&DeletePrompt> {
        self.pending_delete.as_ref()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn view(&self) -> ScreenView {
        if self.auth == AuthState::SignedOut {
            return ScreenView::SignedOut;
        }
        let (AuthState::SignedIn(_), Some(records)) = (&self.auth, self.records.as_deref()) else {
            return ScreenView::Loading;
        };

        let rows = records
            .iter()
            .map(|record| TodoRow {
                record: record.clone(),
                draft: self
                    .state
                    .session()
                    .filter(|session| session.target_id() == &record.id)
                    .map(|session| session.draft_text().to_string()),
            })
            .collect();
        ScreenView::Todos(TodoListView {
            rows,
            progress: compute_progress(records),
        })
    }

    /// Adds a todo for the signed-in owner. Blank input is ignored.
    pub fn create_todo(&mut self, text: &str) -> Option<Ticket> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let Some(owner_id) = self.auth.owner().cloned() else {
            warn!("create requested while signed out");
            return None;
        };
        Some(self.dispatch(
            TodoMutation::Create {
                owner_id,
                text: text.to_string(),
            },
            None,
        ))
    }

    /// Flips completion. The row keeps its current state until the backend
    /// pushes the change.
    pub fn toggle_completion(&mut self, id: &TodoId) -> Ticket {
        self.dispatch(TodoMutation::Toggle { id: id.clone() }, None)
    }

    /// Asks for confirmation before deleting; nothing is dispatched yet.
    pub fn request_delete(&mut self, id: &TodoId) -> &DeletePrompt {
        self.pending_delete.insert(DeletePrompt {
            id: id.clone(),
            title: "Delete Todo",
            message: "Are you sure you want to delete this todo?",
        })
    }

    pub fn resolve_delete(&mut self, choice: DeleteChoice) -> Option<Ticket> {
        let prompt = self.pending_delete.take()?;
        match choice {
            DeleteChoice::Abandon => {
                debug!(todo_id = %prompt.id, "delete abandoned");
                None
            }
            DeleteChoice::Confirm => {
                Some(self.dispatch(TodoMutation::Delete { id: prompt.id }, None))
            }
        }
    }

    pub fn begin_edit(&mut self, record: &TodoRecord) -> &EditSession {
        self.committing = None;
        self.state.begin_edit(record)
    }

    /// Starts editing the displayed record with `id`, seeded from its current
    /// text.
    pub fn begin_edit_by_id(&mut self, id: &TodoId) -> bool {
        let Some(record) = self.record(id).cloned() else {
            return false;
        };
        self.begin_edit(&record);
        true
    }

    pub fn update_draft(&mut self, text: impl Into<String>) -> bool {
        self.state.update_draft(text)
    }

    pub fn cancel_edit(&mut self) {
        self.committing = None;
        self.state.cancel_edit();
    }

    /// Sends the trimmed draft. The session stays open until the latest
    /// update sent for it succeeds. Committing the same text again while it
    /// is in flight is ignored; a changed draft is sent and supersedes it.
    pub fn commit_edit(&mut self) -> Option<Ticket> {
        let session = self.state.session()?;
        let generation = session.generation();
        let text = session.draft_text().trim().to_string();
        if let Some(pending) = &self.committing {
            if pending.generation == generation && pending.text == text {
                debug!(generation, "commit already in flight");
                return None;
            }
        }
        let mutation = TodoMutation::Update {
            id: session.target_id().clone(),
            text: text.clone(),
        };
        let ticket = self.dispatch(mutation, Some(generation));
        self.committing = Some(PendingCommit {
            generation,
            ticket,
            text,
        });
        Some(ticket)
    }

    fn dispatch(&mut self, mutation: TodoMutation, edit_generation: Option<u64>) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.in_flight += 1;

        debug!(
            ticket = ticket.0,
            mutation = mutation.kind().as_str(),
            todo_id = mutation.target().map(TodoId::as_str),
            "queued todo mutation"
        );

        let backend = Arc::clone(&self.backend);
        let outcome_tx = self.outcome_tx.clone();
        self.runtime.spawn(async move {
            let request = mutation.clone();
            let task =
                tokio::spawn(async move { execute_mutation(backend.as_ref(), &request).await });
            let result = match task.await {
                Ok(result) => result,
                Err(err) => {
                    warn!(ticket = ticket.0, error = %err, "todo mutation task aborted");
                    Err(ApiException::new(
                        ErrorCode::Internal,
                        format!("todo mutation task aborted: {err}"),
                    ))
                }
            };
            let _ = outcome_tx.send(MutationOutcome {
                ticket,
                mutation,
                edit_generation,
                result,
            });
        });
        ticket
    }

    /// Applies every outcome that has already arrived. Never blocks.
    pub fn poll_outcomes(&mut self) -> Vec<MutationOutcome> {
        let mut applied = Vec::new();
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            self.apply_outcome(&outcome);
            applied.push(outcome);
        }
        applied
    }

    /// Waits for the next outcome and applies it. `None` when nothing is in
    /// flight.
    pub async fn next_outcome(&mut self) -> Option<MutationOutcome> {
        if self.in_flight == 0 {
            return None;
        }
        let outcome = self.outcome_rx.recv().await?;
        self.apply_outcome(&outcome);
        Some(outcome)
    }

    /// Waits for whichever comes first: a mutation outcome or a snapshot push.
    /// `None` when nothing is in flight and no live query is open.
    pub async fn next_update(&mut self) -> Option<ControllerUpdate> {
        let awaiting_outcome = self.in_flight > 0;
        let Self {
            query, outcome_rx, ..
        } = &mut *self;

        let received = tokio::select! {
            Some(outcome) = outcome_rx.recv(), if awaiting_outcome => Received::Outcome(outcome),
            Some(snapshot) = next_snapshot(query) => Received::Snapshot(snapshot),
            else => return None,
        };

        match received {
            Received::Outcome(outcome) => {
                self.apply_outcome(&outcome);
                Some(ControllerUpdate::Outcome(outcome))
            }
            Received::Snapshot(snapshot) => {
                self.apply_snapshot(snapshot);
                Some(ControllerUpdate::Snapshot)
            }
        }
    }

    fn apply_outcome(&mut self, outcome: &MutationOutcome) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let kind = outcome.kind();

        // A newer update for the same session is still in flight.
        let superseded = match (&self.committing, outcome.edit_generation) {
            (Some(pending), Some(generation)) => {
                pending.generation == generation && pending.ticket != outcome.ticket
            }
            _ => false,
        };
        if self
            .committing
            .as_ref()
            .is_some_and(|pending| pending.ticket == outcome.ticket)
        {
            self.committing = None;
        }

        match &outcome.result {
            Ok(()) => {
                debug!(
                    ticket = outcome.ticket.0,
                    mutation = kind.as_str(),
                    "todo mutation completed"
                );
                if let (MutationKind::Update, Some(generation)) = (kind, outcome.edit_generation) {
                    if !superseded {
                        self.state.close_if_current(generation);
                    }
                }
            }
            Err(err) => {
                warn!(
                    ticket = outcome.ticket.0,
                    mutation = kind.as_str(),
                    todo_id = outcome.mutation.target().map(TodoId::as_str),
                    error = %err,
                    "todo mutation failed"
                );
                if let Some(notification) = Notification::for_failure(kind, err) {
                    self.notifications.push_back(notification);
                }
            }
        }
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }
}

enum Received {
    Outcome(MutationOutcome),
    Snapshot(Snapshot),
}

async fn next_snapshot(query: &mut Option<LiveQuery>) -> Option<Snapshot> {
    query.as_mut()?.feed.changed().await.ok()
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
