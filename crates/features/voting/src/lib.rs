//! # Voting
//!
//! Registry of independent voting sessions.
//!
//! A creator registers a fixed candidate list and a duration, opens the
//! session, participants cast one vote each until the end time, and the
//! creator then closes it and gets the winner. Sessions move strictly
//! `NotStarted -> Ongoing -> Finished` and are never deleted.
//!
//! * [`VotingRegistry`] owns the sessions and performs every operation.
//! * [`Clock`] supplies time; [`SystemClock`] in production, [`ManualClock`] in tests.
//! * Each committed change is announced on the registry's
//!   [`EventBus`](tally_event_bus::EventBus) with one of the types in [`events`].
//! * [`Envelope`] and [`VotingRegistry::handle_json`] expose the operations as
//!   JSON requests, refusing value transfers and unknown shapes.
//!
//! Ties are resolved in favour of the candidate listed first; with no votes at
//! all the first candidate wins.

mod clock;
mod config;
mod error;
pub mod events;
mod model;
mod registry;
mod request;
mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::VotingConfig;
pub use error::{VotingError, VotingErrorExt};
pub use model::{Candidate, ParticipantId, SessionId, VotingSnapshot, VotingState};
pub use registry::{VotingRegistry, VotingRegistryBuilder};
pub use request::{CastVote, CreateVoting, Envelope, MembershipQuery, Request, Response, SessionRef};

pub type Result<T, E = VotingError> = std::result::Result<T, E>;
