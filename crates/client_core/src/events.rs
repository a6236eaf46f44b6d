//! Mutation outcomes and the user-facing notifications derived from them.

use shared::{
    error::{ApiException, ErrorCode},
    protocol::{MutationKind, TodoMutation},
};

use crate::controller::Ticket;

/// Result of one dispatched mutation, delivered back to the controller thread.
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    pub ticket: Ticket,
    pub mutation: TodoMutation,
    /// Edit session the mutation was committed from, for updates.
    pub edit_generation: Option<u64>,
    pub result: Result<(), ApiException>,
}

impl MutationOutcome {
    pub fn kind(&self) -> MutationKind {
        self.mutation.kind()
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationCategory {
    Auth,
    Transport,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    title: String,
    message: String,
    detail: String,
    kind: MutationKind,
    category: NotificationCategory,
}

impl Notification {
    /// Builds the notification shown when `kind` fails. Returns `None` for
    /// deletes, whose failures are only logged.
    pub fn for_failure(kind: MutationKind, err: &ApiException) -> Option<Self> {
        let message = match kind {
            MutationKind::Create => "Failed to add todo",
            MutationKind::Toggle => "Failed to toggle todo",
            MutationKind::Update => "Failed to update todo",
            MutationKind::Delete => return None,
        };
        Some(Self {
            title: "Error".to_string(),
            message: message.to_string(),
            detail: err.message.clone(),
            kind,
            category: classify_failure(err),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    pub fn category(&self) -> NotificationCategory {
        self.category
    }

    pub fn requires_reauth(&self) -> bool {
        self.category == NotificationCategory::Auth
    }
}

pub fn classify_failure(err: &ApiException) -> NotificationCategory {
    match err.code {
        ErrorCode::Unauthorized | ErrorCode::Forbidden => return NotificationCategory::Auth,
        ErrorCode::Validation | ErrorCode::NotFound => return NotificationCategory::Validation,
        ErrorCode::Unavailable => return NotificationCategory::Transport,
        ErrorCode::Internal => {}
    }

    let lower = err.message.to_ascii_lowercase();
    if lower.contains("401")
        || lower.contains("403")
        || lower.contains("unauthorized")
        || lower.contains("session expired")
        || lower.contains("invalid token")
    {
        NotificationCategory::Auth
    } else if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection")
        || lower.contains("network")
        || lower.contains("unavailable")
    {
        NotificationCategory::Transport
    } else if lower.contains("invalid") || lower.contains("missing") {
        NotificationCategory::Validation
    } else {
        NotificationCategory::Unknown
    }
}
