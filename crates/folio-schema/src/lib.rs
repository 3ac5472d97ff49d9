use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Originator {
    User,
    Assistant,
}

/// One turn of a conversation. Never mutated once appended to a transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// Per-session sequence number, strictly increasing in append order
    pub id: u64,
    pub text: String,
    pub originator: Originator,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(id: u64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            originator: Originator::User,
            created_at: Utc::now(),
        }
    }

    pub fn assistant(id: u64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            originator: Originator::Assistant,
            created_at: Utc::now(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.originator == Originator::User
    }
}

/// Read-only view of a conversation handed to whatever renders it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub messages: Vec<ChatMessage>,
    pub awaiting_response: bool,
}

impl SessionSnapshot {
    pub fn empty(session_id: Uuid) -> Self {
        Self {
            session_id,
            messages: Vec::new(),
            awaiting_response: false,
        }
    }

    pub fn last_reply(&self) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|m| !m.is_user())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectProfile {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    pub problem_solution: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub challenges: Vec<String>,
    pub learnings: String,
    #[serde(default)]
    pub future_improvements: Vec<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub live_url: Option<String>,
}

/// Facts about the site owner, used by the contact assistant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnerProfile {
    pub name: String,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub github: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
}
