//! JSON request boundary.
//!
//! An envelope looks like
//! `{"caller": "alice", "value": 0, "op": "vote", "sessionId": 0, "candidateName": "A"}`.
//! `value` is optional; anything other than zero is refused before the
//! operation is even decoded. Field sets are strict, so a typo or an unknown
//! `op` is an [`VotingError::UnsupportedRequest`] rather than a silent default.

use crate::error::VotingError;
use crate::model::{ParticipantId, SessionId, VotingSnapshot};
use crate::registry::VotingRegistry;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

const CALLER_FIELD: &str = "caller";
const VALUE_FIELD: &str = "value";

/// A decoded request: who is asking, and what for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub caller: ParticipantId,
    pub request: Request,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Request {
    CreateVoting(CreateVoting),
    StartVoting(SessionRef),
    Vote(CastVote),
    FinishVoting(SessionRef),
    GetVoting(SessionRef),
    HasUserVoted(MembershipQuery),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateVoting {
    pub candidate_names: Vec<String>,
    pub duration: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SessionRef {
    pub session_id: SessionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CastVote {
    pub session_id: SessionId,
    pub candidate_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MembershipQuery {
    pub session_id: SessionId,
    pub participant: ParticipantId,
}

/// Successful outcome of a dispatched request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Response {
    SessionId(SessionId),
    Unit,
    Winner(String),
    Voting(VotingSnapshot),
    HasVoted(bool),
}

impl Envelope {
    /// Decodes one JSON envelope.
    ///
    /// # Errors
    /// * [`VotingError::UnsupportedRequest`] for malformed JSON, a missing or
    ///   empty caller, an unknown `op` or unexpected fields.
    /// * [`VotingError::ValueTransferRejected`] for a non-zero `value`.
    pub fn parse(raw: &str) -> Result<Self, VotingError> {
        let Value::Object(mut fields) = serde_json::from_str::<Value>(raw)? else {
            return Err(VotingError::UnsupportedRequest {
                message: "request must be a JSON object".into(),
                context: None,
            });
        };

        check_value(fields.remove(VALUE_FIELD))?;
        let caller = take_caller(&mut fields)?;
        let request = serde_json::from_value(Value::Object(fields))?;
        Ok(Self { caller, request })
    }
}

fn check_value(value: Option<Value>) -> Result<(), VotingError> {
    let Some(value) = value else {
        return Ok(());
    };
    let Some(amount) = value.as_u64().map(u128::from) else {
        return Err(VotingError::UnsupportedRequest {
            message: "value must be an unsigned integer".into(),
            context: Some(value.to_string().into()),
        });
    };
    if amount == 0 { Ok(()) } else { Err(VotingError::ValueTransferRejected { value: amount }) }
}

fn take_caller(fields: &mut Map<String, Value>) -> Result<ParticipantId, VotingError> {
    match fields.remove(CALLER_FIELD) {
        Some(Value::String(caller)) => ParticipantId::new(caller).map_err(|err| {
            VotingError::UnsupportedRequest { message: err.to_string().into(), context: None }
        }),
        _ => Err(VotingError::UnsupportedRequest {
            message: "missing string field `caller`".into(),
            context: None,
        }),
    }
}

impl VotingRegistry {
    /// Runs a decoded request against the registry.
    ///
    /// # Errors
    /// Whatever the underlying operation returns.
    pub fn dispatch(&self, envelope: Envelope) -> Result<Response, VotingError> {
        let Envelope { caller, request } = envelope;
        match request {
            Request::CreateVoting(CreateVoting { candidate_names, duration }) => {
                self.create_voting(&caller, candidate_names, duration).map(Response::SessionId)
            },
            Request::StartVoting(SessionRef { session_id }) => {
                self.start_voting(&caller, session_id).map(|()| Response::Unit)
            },
            Request::Vote(CastVote { session_id, candidate_name }) => {
                self.vote(&caller, session_id, &candidate_name).map(|()| Response::Unit)
            },
            Request::FinishVoting(SessionRef { session_id }) => {
                self.finish_voting(&caller, session_id).map(Response::Winner)
            },
            Request::GetVoting(SessionRef { session_id }) => {
                self.get_voting(session_id).map(Response::Voting)
            },
            Request::HasUserVoted(MembershipQuery { session_id, participant }) => {
                self.has_user_voted(session_id, &participant).map(Response::HasVoted)
            },
        }
    }

    /// Parses and dispatches one raw JSON envelope.
    ///
    /// # Errors
    /// See [`Envelope::parse`] and [`VotingRegistry::dispatch`].
    pub fn handle_json(&self, raw: &str) -> Result<Response, VotingError> {
        let envelope = Envelope::parse(raw).inspect_err(|err| debug!(%err, "Request refused"))?;
        self.dispatch(envelope)
    }
}
