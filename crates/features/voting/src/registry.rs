//! The session registry: id allocation, locking and notification fan-out.
//!
//! The table is a `Vec` indexed by [`SessionId`]. It is only write-locked to
//! append a new session, which keeps ids dense and sequential. Each session
//! sits behind its own lock, so operations on different sessions never wait
//! on each other.

use crate::clock::{Clock, SystemClock};
use crate::config::VotingConfig;
use crate::error::VotingError;
use crate::events::{VoteCast, VotingCreated, VotingFinished, VotingStarted};
use crate::model::{ParticipantId, SessionId, VotingSnapshot};
use crate::session::Session;
use parking_lot::RwLock;
use std::any::type_name;
use std::sync::Arc;
use tally_event_bus::{Event, EventBus};
use tracing::{debug, info, instrument, warn};

#[derive(Debug)]
struct RegistryInner {
    sessions: RwLock<Vec<Arc<RwLock<Session>>>>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    config: VotingConfig,
}

/// Thread-safe handle to the voting registry.
///
/// Cloning is cheap; clones share the same sessions and event bus.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use tally_voting::{ManualClock, ParticipantId, VotingRegistry, VotingState};
///
/// # fn main() -> Result<(), tally_voting::VotingError> {
/// let clock = Arc::new(ManualClock::new(1_000));
/// let registry = VotingRegistry::builder().clock(clock.clone()).build()?;
/// let alice = ParticipantId::new("alice")?;
///
/// let id = registry.create_voting(&alice, vec!["Movie1".into(), "Movie2".into()], 3600)?;
/// registry.start_voting(&alice, id)?;
/// registry.vote(&ParticipantId::new("bob")?, id, "Movie2")?;
///
/// clock.advance(3600);
/// assert_eq!(registry.finish_voting(&alice, id)?, "Movie2");
/// assert_eq!(registry.get_voting(id)?.state, VotingState::Finished);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct VotingRegistry {
    inner: Arc<RegistryInner>,
}

impl VotingRegistry {
    #[must_use = "The registry is not created until you call .build()"]
    pub fn builder() -> VotingRegistryBuilder {
        VotingRegistryBuilder::default()
    }

    /// Registers a new session and returns its id.
    ///
    /// # Errors
    /// Returns [`VotingError::InvalidInput`] if `candidate_names` is empty,
    /// exceeds the configured limits, or `now + duration` overflows.
    #[instrument(skip(self, caller, candidate_names), fields(caller = %caller, candidates = candidate_names.len()))]
    pub fn create_voting(
        &self,
        caller: &ParticipantId,
        candidate_names: Vec<String>,
        duration: u64,
    ) -> Result<SessionId, VotingError> {
        self.validate_candidates(&candidate_names).inspect_err(|err| debug!(%err, "Rejected"))?;

        let now = self.inner.clock.now();
        let end_time = now.checked_add(duration).ok_or_else(|| VotingError::InvalidInput {
            message: format!("duration {duration} overflows the end time").into(),
            context: Some(format!("now = {now}").into()),
        })?;

        let session_id = {
            let mut sessions = self.inner.sessions.write();
            let session_id = sessions.len() as SessionId;
            sessions.push(Arc::new(RwLock::new(Session::new(
                session_id,
                caller.clone(),
                candidate_names,
                end_time,
            ))));
            session_id
        };

        info!(session_id, end_time, "Voting session created");
        self.notify(VotingCreated { session_id, creator: caller.clone(), end_time });
        Ok(session_id)
    }

    /// Opens a session for voting. Creator only.
    ///
    /// # Errors
    /// [`VotingError::NotFound`], [`VotingError::Unauthorized`] or
    /// [`VotingError::InvalidState`], checked in that order.
    #[instrument(skip(self, caller), fields(caller = %caller))]
    pub fn start_voting(&self, caller: &ParticipantId, session_id: SessionId) -> Result<(), VotingError> {
        let session = self.session(session_id)?;
        session.write().start(caller).inspect_err(|err| debug!(%err, "Rejected"))?;

        info!(session_id, "Voting session started");
        self.notify(VotingStarted { session_id });
        Ok(())
    }

    /// Casts `caller`'s single vote for `candidate_name`.
    ///
    /// # Errors
    /// [`VotingError::NotFound`], [`VotingError::InvalidState`],
    /// [`VotingError::VotingExpired`], [`VotingError::AlreadyVoted`],
    /// [`VotingError::InvalidInput`] or [`VotingError::CandidateNotFound`],
    /// checked in that order.
    #[instrument(skip(self, caller), fields(caller = %caller))]
    pub fn vote(
        &self,
        caller: &ParticipantId,
        session_id: SessionId,
        candidate_name: &str,
    ) -> Result<(), VotingError> {
        let session = self.session(session_id)?;
        {
            let mut session = session.write();
            let now = self.inner.clock.now();
            session.cast_vote(caller, candidate_name, now).inspect_err(|err| debug!(%err, "Rejected"))?;
        }

        debug!(session_id, "Vote recorded");
        self.notify(VoteCast {
            session_id,
            voter: caller.clone(),
            candidate_name: candidate_name.to_owned(),
        });
        Ok(())
    }

    /// Closes an expired session and returns the winner's name. Creator only.
    ///
    /// # Errors
    /// [`VotingError::NotFound`], [`VotingError::Unauthorized`],
    /// [`VotingError::InvalidState`] or [`VotingError::StillOngoing`],
    /// checked in that order.
    #[instrument(skip(self, caller), fields(caller = %caller))]
    pub fn finish_voting(
        &self,
        caller: &ParticipantId,
        session_id: SessionId,
    ) -> Result<String, VotingError> {
        let session = self.session(session_id)?;
        let winner = {
            let mut session = session.write();
            let now = self.inner.clock.now();
            session.finish(caller, now).inspect_err(|err| debug!(%err, "Rejected"))?
        };

        info!(session_id, winner = %winner, "Voting session finished");
        self.notify(VotingFinished { session_id, winner_name: winner.clone() });
        Ok(winner)
    }

    /// Point-in-time copy of a session.
    ///
    /// # Errors
    /// Returns [`VotingError::NotFound`] for an unknown id.
    pub fn get_voting(&self, session_id: SessionId) -> Result<VotingSnapshot, VotingError> {
        Ok(self.session(session_id)?.read().snapshot())
    }

    /// Whether `participant` has already voted in the session.
    ///
    /// # Errors
    /// Returns [`VotingError::NotFound`] for an unknown id.
    pub fn has_user_voted(
        &self,
        session_id: SessionId,
        participant: &ParticipantId,
    ) -> Result<bool, VotingError> {
        Ok(self.session(session_id)?.read().has_voted(participant))
    }

    /// Sessions created so far, which is also the next id to be assigned.
    #[must_use]
    pub fn session_count(&self) -> u64 {
        self.inner.sessions.read().len() as u64
    }

    /// Bus carrying [`VotingCreated`], [`VotingStarted`], [`VoteCast`] and [`VotingFinished`].
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    #[must_use]
    pub fn config(&self) -> &VotingConfig {
        &self.inner.config
    }

    fn session(&self, session_id: SessionId) -> Result<Arc<RwLock<Session>>, VotingError> {
        let sessions = self.inner.sessions.read();
        usize::try_from(session_id)
            .ok()
            .and_then(|index| sessions.get(index))
            .cloned()
            .ok_or(VotingError::NotFound { session_id })
    }

    fn validate_candidates(&self, names: &[String]) -> Result<(), VotingError> {
        let VotingConfig { max_candidates, max_candidate_name_len, .. } = self.inner.config;

        if names.is_empty() {
            return Err(VotingError::InvalidInput {
                message: "at least one candidate is required".into(),
                context: None,
            });
        }
        if max_candidates > 0 && names.len() > max_candidates {
            return Err(VotingError::InvalidInput {
                message: format!("{} candidates given, limit is {max_candidates}", names.len()).into(),
                context: None,
            });
        }
        if max_candidate_name_len > 0
            && let Some(name) = names.iter().find(|name| name.len() > max_candidate_name_len)
        {
            return Err(VotingError::InvalidInput {
                message: format!("candidate name longer than {max_candidate_name_len} bytes").into(),
                context: Some(name.chars().take(32).collect::<String>().into()),
            });
        }
        Ok(())
    }

    /// Delivery problems are logged, never returned: the mutation is already committed.
    fn notify<T: Event>(&self, event: T) {
        if let Err(err) = self.inner.events.publish(event) {
            warn!(event = type_name::<T>(), %err, "Failed to publish notification");
        }
    }
}

/// Builder for [`VotingRegistry`].
#[derive(Debug, Default)]
pub struct VotingRegistryBuilder {
    config: VotingConfig,
    clock: Option<Arc<dyn Clock>>,
    events: Option<EventBus>,
}

impl VotingRegistryBuilder {
    #[must_use = "Sets the registry limits and channel capacity"]
    pub fn config(mut self, config: VotingConfig) -> Self {
        self.config = config;
        self
    }

    /// Defaults to [`SystemClock`].
    #[must_use = "Sets the time source"]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Shares an existing bus instead of creating a private one.
    #[must_use = "Sets the event bus notifications are published on"]
    pub fn event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Creates the registry.
    ///
    /// With a non-zero `event_capacity`, the four notification channels are
    /// registered up front with that capacity.
    ///
    /// # Errors
    /// Returns [`VotingError::Events`] if a notification channel cannot be registered.
    pub fn build(self) -> Result<VotingRegistry, VotingError> {
        let events = self.events.unwrap_or_default();
        let capacity = self.config.event_capacity;
        if capacity > 0 {
            drop(events.subscribe_with_capacity::<VotingCreated>(capacity)?);
            drop(events.subscribe_with_capacity::<VotingStarted>(capacity)?);
            drop(events.subscribe_with_capacity::<VoteCast>(capacity)?);
            drop(events.subscribe_with_capacity::<VotingFinished>(capacity)?);
        }

        debug!(config = ?self.config, "Voting registry ready");
        Ok(VotingRegistry {
            inner: Arc::new(RegistryInner {
                sessions: RwLock::new(Vec::new()),
                clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock::new())),
                events,
                config: self.config,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn pid(id: &str) -> ParticipantId {
        ParticipantId::new(id).unwrap()
    }

    fn registry(config: VotingConfig) -> VotingRegistry {
        VotingRegistry::builder().config(config).clock(Arc::new(ManualClock::new(10))).build().unwrap()
    }

    #[test]
    fn ids_are_sequential_from_zero() {
        let reg = registry(VotingConfig::default());
        let alice = pid("alice");
        for expected in 0..4 {
            assert_eq!(reg.session_count(), expected);
            assert_eq!(reg.create_voting(&alice, vec!["x".into()], 5).unwrap(), expected);
        }
    }

    #[test]
    fn candidate_limits_apply_unless_zero() {
        let config =
            VotingConfig { max_candidates: 2, max_candidate_name_len: 3, ..VotingConfig::default() };
        let reg = registry(config);
        let alice = pid("alice");

        let too_many = vec!["a".into(), "b".into(), "c".into()];
        assert!(matches!(
            reg.create_voting(&alice, too_many, 1),
            Err(VotingError::InvalidInput { .. })
        ));
        assert!(matches!(
            reg.create_voting(&alice, vec!["long".into()], 1),
            Err(VotingError::InvalidInput { .. })
        ));
        assert_eq!(reg.session_count(), 0);

        let unlimited = registry(VotingConfig {
            max_candidates: 0,
            max_candidate_name_len: 0,
            ..VotingConfig::default()
        });
        let names = (0..300).map(|i| format!("candidate-{i}-{}", "x".repeat(300))).collect();
        assert_eq!(unlimited.create_voting(&alice, names, 1).unwrap(), 0);
    }

    #[test]
    fn end_time_overflow_is_invalid_input() {
        let reg = registry(VotingConfig::default());
        let err = reg.create_voting(&pid("alice"), vec!["x".into()], u64::MAX).unwrap_err();
        assert!(matches!(err, VotingError::InvalidInput { .. }));
        assert_eq!(reg.session_count(), 0);
    }

    #[test]
    fn unknown_session_is_not_found_everywhere() {
        let reg = registry(VotingConfig::default());
        let bob = pid("bob");

        assert!(matches!(reg.start_voting(&bob, 0), Err(VotingError::NotFound { session_id: 0 })));
        assert!(matches!(reg.vote(&bob, 1, "x"), Err(VotingError::NotFound { session_id: 1 })));
        assert!(matches!(reg.finish_voting(&bob, 2), Err(VotingError::NotFound { .. })));
        assert!(matches!(reg.get_voting(u64::MAX), Err(VotingError::NotFound { .. })));
        assert!(matches!(reg.has_user_voted(9, &bob), Err(VotingError::NotFound { .. })));
    }

    #[test]
    fn capacity_is_preregistered() {
        let bus = EventBus::new();
        let config = VotingConfig { event_capacity: 4, ..VotingConfig::default() };
        let reg = VotingRegistry::builder().config(config).event_bus(bus.clone()).build().unwrap();

        assert_eq!(bus.subscriber_count::<VoteCast>(), 0);
        assert_eq!(reg.config().event_capacity, 4);
        assert_eq!(bus.shutdown(), 4);
    }

    #[test]
    fn clones_share_sessions() {
        let reg = registry(VotingConfig::default());
        let other = reg.clone();
        reg.create_voting(&pid("alice"), vec!["x".into()], 5).unwrap();
        assert_eq!(other.session_count(), 1);
        assert_eq!(other.get_voting(0).unwrap().creator, pid("alice"));
    }
}
