//! Notifications published on the [`EventBus`](tally_event_bus::EventBus).
//!
//! Each one is published after the mutation it describes has been committed
//! and the session lock released. Calls made from one thread are announced in
//! the order they committed; concurrent calls on the same session may be
//! announced in either order.

use crate::model::{ParticipantId, SessionId};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingCreated {
    pub session_id: SessionId,
    pub creator: ParticipantId,
    pub end_time: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingStarted {
    pub session_id: SessionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCast {
    pub session_id: SessionId,
    pub voter: ParticipantId,
    pub candidate_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingFinished {
    pub session_id: SessionId,
    pub winner_name: String,
}
