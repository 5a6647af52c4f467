use crate::model::{ParticipantId, SessionId, VotingState};
use std::borrow::Cow;

/// Every way a registry request can be refused.
///
/// A returned error always means the targeted session was left untouched.
#[tally_derive::tally_error]
#[derive(strum_macros::IntoStaticStr)]
pub enum VotingError {
    /// Empty candidate list, empty candidate name, oversized input, or an
    /// end time that does not fit in a timestamp.
    #[error("Invalid input{}: {message}", format_context(.context))]
    InvalidInput { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Session {session_id} does not exist")]
    NotFound { session_id: SessionId },

    /// A creator-only action was attempted by someone else.
    #[error("'{caller}' is not the creator of session {session_id}")]
    Unauthorized { session_id: SessionId, caller: ParticipantId },

    #[error("Session {session_id} is {actual}, expected {expected}")]
    InvalidState { session_id: SessionId, expected: VotingState, actual: VotingState },

    #[error("'{voter}' already voted in session {session_id}")]
    AlreadyVoted { session_id: SessionId, voter: ParticipantId },

    #[error("No candidate named '{candidate}' in session {session_id}")]
    CandidateNotFound { session_id: SessionId, candidate: String },

    #[error("Voting in session {session_id} closed at {end_time}")]
    VotingExpired { session_id: SessionId, end_time: u64 },

    #[error("Session {session_id} stays open until {end_time}")]
    StillOngoing { session_id: SessionId, end_time: u64 },

    /// The registry accepts no payments of any kind.
    #[error("Value transfers are not accepted (received {value})")]
    ValueTransferRejected { value: u128 },

    /// The request did not match any known operation shape.
    #[error("Unsupported request{}: {message}", format_context(.context))]
    UnsupportedRequest { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Event bus error{}: {source}", format_context(.context))]
    Events { source: tally_event_bus::EventBusError, context: Option<Cow<'static, str>> },

    #[error("Internal voting error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl VotingError {
    /// Stable variant name, e.g. `"AlreadyVoted"`.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.into()
    }
}

impl From<serde_json::Error> for VotingError {
    fn from(err: serde_json::Error) -> Self {
        Self::UnsupportedRequest { message: err.to_string().into(), context: None }
    }
}
