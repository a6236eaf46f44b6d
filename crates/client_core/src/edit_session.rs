//! UI-only list state: the single inline edit session and its draft buffer.

use shared::domain::{TodoId, TodoRecord};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    target_id: TodoId,
    draft_text: String,
    generation: u64,
}

impl EditSession {
    pub fn target_id(&self) -> &TodoId {
        &self.target_id
    }

    pub fn draft_text(&self) -> &str {
        &self.draft_text
    }

    /// Distinguishes this session from earlier sessions on the same record.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Holds at most one [`EditSession`].
#[derive(Debug, Default)]
pub struct ListState {
    session: Option<EditSession>,
    next_generation: u64,
}

impl ListState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts editing `record`, discarding any session already open. The
    /// draft is always reseeded from the record's current text.
    pub fn begin_edit(&mut self, record: &TodoRecord) -> &EditSession {
        if let Some(previous) = self.session.take() {
            debug!(
                todo_id = %previous.target_id,
                "discarding unsaved edit session"
            );
        }
        self.next_generation += 1;
        self.session.insert(EditSession {
            target_id: record.id.clone(),
            draft_text: record.text.clone(),
            generation: self.next_generation,
        })
    }

    /// Replaces the draft. Returns `false` when no session is open.
    pub fn update_draft(&mut self, text: impl Into<String>) -> bool {
        match self.session.as_mut() {
            Some(session) => {
                session.draft_text = text.into();
                true
            }
            None => false,
        }
    }

    pub fn cancel_edit(&mut self) -> Option<EditSession> {
        self.session.take()
    }

    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    pub fn is_editing(&self, id: &TodoId) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| &session.target_id == id)
    }

    /// Closes the session only if it is still the one identified by
    /// `generation`.
    pub(crate) fn close_if_current(&mut self, generation: u64) -> bool {
        if self
            .session
            .as_ref()
            .is_some_and(|session| session.generation == generation)
        {
            self.session = None;
            true
        } else {
            false
        }
    }

    /// Drops the session when its record is no longer in `records`.
    pub(crate) fn discard_if_missing(&mut self, records: &[TodoRecord]) -> bool {
        let missing = self
            .session
            .as_ref()
            .is_some_and(|session| !records.iter().any(|record| record.id == session.target_id));
        if missing {
            self.session = None;
        }
        missing
    }
}
