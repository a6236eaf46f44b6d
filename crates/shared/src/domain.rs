use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(TodoId);
id_newtype!(OwnerId);

impl TodoId {
    /// Allocates a fresh identifier. Only backends mint ids; the list
    /// controller never does.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// A single task item as stored by the data backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoRecord {
    pub id: TodoId,
    pub text: String,
    pub is_completed: bool,
    pub creation_time: DateTime<Utc>,
    pub owner_id: OwnerId,
}

impl TodoRecord {
    pub fn new(owner_id: OwnerId, text: impl Into<String>) -> Self {
        Self {
            id: TodoId::generate(),
            text: text.into(),
            is_completed: false,
            creation_time: Utc::now(),
            owner_id,
        }
    }
}
