//! Transcript records

use crate::flow::{InputKind, Step};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Ai,
    User,
}

/// One immutable transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Set on AI messages only, copied from the originating step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_kind: Option<InputKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_config: Option<Value>,
}

impl Message {
    /// AI message for `step` with already-interpolated `content`
    #[must_use]
    pub fn ai(id: u64, step: &Step, content: String) -> Self {
        Self {
            id,
            role: Role::Ai,
            content,
            timestamp: Utc::now(),
            input_kind: Some(step.input_kind),
            input_config: step.input_config.clone(),
        }
    }

    #[must_use]
    pub fn user(id: u64, content: String) -> Self {
        Self {
            id,
            role: Role::User,
            content,
            timestamp: Utc::now(),
            input_kind: None,
            input_config: None,
        }
    }

    #[must_use]
    pub fn is_ai(&self) -> bool {
        self.role == Role::Ai
    }
}
