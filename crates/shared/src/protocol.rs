use serde::{Deserialize, Serialize};

use crate::domain::{OwnerId, TodoId};

/// The four mutation entry points exposed by the data backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum TodoMutation {
    Create { owner_id: OwnerId, text: String },
    Toggle { id: TodoId },
    Update { id: TodoId, text: String },
    Delete { id: TodoId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Create,
    Toggle,
    Update,
    Delete,
}

impl MutationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MutationKind::Create => "create",
            MutationKind::Toggle => "toggle",
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
        }
    }
}

impl TodoMutation {
    pub fn kind(&self) -> MutationKind {
        match self {
            TodoMutation::Create { .. } => MutationKind::Create,
            TodoMutation::Toggle { .. } => MutationKind::Toggle,
            TodoMutation::Update { .. } => MutationKind::Update,
            TodoMutation::Delete { .. } => MutationKind::Delete,
        }
    }

    pub fn target(&self) -> Option<&TodoId> {
        match self {
            TodoMutation::Create { .. } => None,
            TodoMutation::Toggle { id }
            | TodoMutation::Update { id, .. }
            | TodoMutation::Delete { id } => Some(id),
        }
    }
}
