use crate::error::VotingError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sequential session identifier, starting at 0.
pub type SessionId = u64;

/// Opaque caller identity.
///
/// The registry never interprets the value beyond equality; it only has to be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Wraps a caller identifier.
    ///
    /// # Errors
    /// Returns [`VotingError::InvalidInput`] if `id` is empty or only whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self, VotingError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(VotingError::InvalidInput {
                message: "participant id cannot be empty".into(),
                context: None,
            });
        }
        Ok(Self(id))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = VotingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ParticipantId> for String {
    fn from(id: ParticipantId) -> Self {
        id.0
    }
}

impl AsRef<str> for ParticipantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a session. Only ever moves forward.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
)]
pub enum VotingState {
    #[default]
    NotStarted,
    Ongoing,
    Finished,
}

/// A named option and its running tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub name: String,
    pub vote_count: u64,
}

impl Candidate {
    pub(crate) fn new(name: String) -> Self {
        Self { name, vote_count: 0 }
    }
}

/// Read-only copy of a session, as returned by `get_voting`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingSnapshot {
    pub session_id: SessionId,
    pub creator: ParticipantId,
    /// Unix seconds; votes are refused from this instant on.
    pub end_time: u64,
    pub state: VotingState,
    pub candidates: Vec<Candidate>,
    /// Set once the session is finished.
    pub winner: Option<String>,
    pub voter_count: usize,
}
