use crate::error::VotingError;
use crate::model::{Candidate, ParticipantId, SessionId, VotingSnapshot, VotingState};
use fxhash::FxHashSet;

/// One voting session and its state machine.
///
/// Every transition validates first and writes last, so a method that
/// returns an error has not touched the session.
#[derive(Debug)]
pub(crate) struct Session {
    id: SessionId,
    creator: ParticipantId,
    end_time: u64,
    state: VotingState,
    candidates: Vec<Candidate>,
    voted_by: FxHashSet<ParticipantId>,
    winner: Option<String>,
}

impl Session {
    /// Callers guarantee `candidate_names` is non-empty.
    pub(crate) fn new(
        id: SessionId,
        creator: ParticipantId,
        candidate_names: Vec<String>,
        end_time: u64,
    ) -> Self {
        Self {
            id,
            creator,
            end_time,
            state: VotingState::NotStarted,
            candidates: candidate_names.into_iter().map(Candidate::new).collect(),
            voted_by: FxHashSet::default(),
            winner: None,
        }
    }

    pub(crate) fn has_voted(&self, participant: &ParticipantId) -> bool {
        self.voted_by.contains(participant)
    }

    /// `NotStarted -> Ongoing`, creator only.
    pub(crate) fn start(&mut self, caller: &ParticipantId) -> Result<(), VotingError> {
        self.ensure_creator(caller)?;
        self.ensure_state(VotingState::NotStarted)?;
        self.state = VotingState::Ongoing;
        Ok(())
    }

    /// Records one vote from `voter` for the first candidate named exactly `candidate`.
    pub(crate) fn cast_vote(
        &mut self,
        voter: &ParticipantId,
        candidate: &str,
        now: u64,
    ) -> Result<(), VotingError> {
        self.ensure_state(VotingState::Ongoing)?;
        if now >= self.end_time {
            return Err(VotingError::VotingExpired { session_id: self.id, end_time: self.end_time });
        }
        if self.voted_by.contains(voter) {
            return Err(VotingError::AlreadyVoted { session_id: self.id, voter: voter.clone() });
        }
        if candidate.is_empty() {
            return Err(VotingError::InvalidInput {
                message: "candidate name cannot be empty".into(),
                context: Some(format!("session {}", self.id).into()),
            });
        }

        let Some(entry) = self.candidates.iter_mut().find(|c| c.name == candidate) else {
            return Err(VotingError::CandidateNotFound {
                session_id: self.id,
                candidate: candidate.to_owned(),
            });
        };

        entry.vote_count = entry.vote_count.saturating_add(1);
        self.voted_by.insert(voter.clone());
        Ok(())
    }

    /// `Ongoing -> Finished`, creator only, once `end_time` has passed.
    ///
    /// Returns the winner's name.
    pub(crate) fn finish(&mut self, caller: &ParticipantId, now: u64) -> Result<String, VotingError> {
        self.ensure_creator(caller)?;
        self.ensure_state(VotingState::Ongoing)?;
        if now < self.end_time {
            return Err(VotingError::StillOngoing { session_id: self.id, end_time: self.end_time });
        }

        let winner = self
            .leader()
            .map(|c| c.name.clone())
            .ok_or_else(|| VotingError::from(format!("session {} has no candidates", self.id)))?;

        self.state = VotingState::Finished;
        self.winner = Some(winner.clone());
        Ok(winner)
    }

    /// First candidate holding the highest count; ties keep the earlier entry.
    fn leader(&self) -> Option<&Candidate> {
        let mut candidates = self.candidates.iter();
        let first = candidates.next()?;
        Some(candidates.fold(first, |best, c| if c.vote_count > best.vote_count { c } else { best }))
    }

    pub(crate) fn snapshot(&self) -> VotingSnapshot {
        VotingSnapshot {
            session_id: self.id,
            creator: self.creator.clone(),
            end_time: self.end_time,
            state: self.state,
            candidates: self.candidates.clone(),
            winner: self.winner.clone(),
            voter_count: self.voted_by.len(),
        }
    }

    fn ensure_creator(&self, caller: &ParticipantId) -> Result<(), VotingError> {
        if *caller == self.creator {
            Ok(())
        } else {
            Err(VotingError::Unauthorized { session_id: self.id, caller: caller.clone() })
        }
    }

    fn ensure_state(&self, expected: VotingState) -> Result<(), VotingError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(VotingError::InvalidState { session_id: self.id, expected, actual: self.state })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: &str) -> ParticipantId {
        ParticipantId::new(id).unwrap()
    }

    fn session(names: &[&str]) -> Session {
        Session::new(3, pid("creator"), names.iter().map(|n| (*n).to_owned()).collect(), 100)
    }

    fn counts(session: &Session) -> Vec<u64> {
        session.candidates.iter().map(|c| c.vote_count).collect()
    }

    #[test]
    fn new_session_is_not_started_with_zero_counts() {
        let s = session(&["a", "b"]);
        let snap = s.snapshot();
        assert_eq!(snap.state, VotingState::NotStarted);
        assert_eq!(snap.end_time, 100);
        assert_eq!(counts(&s), vec![0, 0]);
        assert_eq!(snap.winner, None);
    }

    #[test]
    fn start_checks_creator_before_state() {
        let mut s = session(&["a"]);
        s.state = VotingState::Finished;
        let err = s.start(&pid("mallory")).unwrap_err();
        assert!(matches!(err, VotingError::Unauthorized { session_id: 3, .. }));

        let err = s.start(&pid("creator")).unwrap_err();
        assert!(matches!(
            err,
            VotingError::InvalidState {
                expected: VotingState::NotStarted,
                actual: VotingState::Finished,
                ..
            }
        ));
    }

    #[test]
    fn vote_checks_run_in_order() {
        let mut s = session(&["a"]);
        let voter = pid("v");

        // Not started wins over everything else.
        assert!(matches!(s.cast_vote(&voter, "", 500), Err(VotingError::InvalidState { .. })));

        s.start(&pid("creator")).unwrap();
        assert!(matches!(s.cast_vote(&voter, "", 100), Err(VotingError::VotingExpired { .. })));
        assert!(matches!(s.cast_vote(&voter, "", 99), Err(VotingError::InvalidInput { .. })));
        assert!(matches!(
            s.cast_vote(&voter, "A", 99),
            Err(VotingError::CandidateNotFound { .. })
        ));

        s.cast_vote(&voter, "a", 99).unwrap();
        assert!(matches!(s.cast_vote(&voter, "", 99), Err(VotingError::AlreadyVoted { .. })));
    }

    #[test]
    fn failed_vote_leaves_session_untouched() {
        let mut s = session(&["a", "b"]);
        s.start(&pid("creator")).unwrap();
        let voter = pid("v");

        assert!(s.cast_vote(&voter, "c", 10).is_err());
        assert_eq!(counts(&s), vec![0, 0]);
        assert!(!s.has_voted(&voter));
    }

    #[test]
    fn duplicate_names_credit_the_first_entry() {
        let mut s = session(&["x", "y", "x"]);
        s.start(&pid("creator")).unwrap();
        s.cast_vote(&pid("1"), "x", 0).unwrap();
        s.cast_vote(&pid("2"), "x", 0).unwrap();
        assert_eq!(counts(&s), vec![2, 0, 0]);
    }

    #[test]
    fn finish_requires_expiry_and_runs_once() {
        let mut s = session(&["a", "b"]);
        let creator = pid("creator");
        s.start(&creator).unwrap();
        s.cast_vote(&pid("v"), "b", 50).unwrap();

        assert!(matches!(s.finish(&creator, 99), Err(VotingError::StillOngoing { .. })));
        assert!(matches!(s.finish(&pid("v"), 100), Err(VotingError::Unauthorized { .. })));
        assert_eq!(s.finish(&creator, 100).unwrap(), "b");
        assert!(matches!(s.finish(&creator, 200), Err(VotingError::InvalidState { .. })));
        assert_eq!(s.snapshot().winner.as_deref(), Some("b"));
    }

    #[test]
    fn ties_go_to_the_earliest_leader() {
        let mut s = session(&["a", "b", "c"]);
        let creator = pid("creator");
        s.start(&creator).unwrap();
        for (voter, name) in [("1", "c"), ("2", "b"), ("3", "a"), ("4", "b"), ("5", "c")] {
            s.cast_vote(&pid(voter), name, 0).unwrap();
        }
        assert_eq!(s.finish(&creator, 100).unwrap(), "b");
    }

    #[test]
    fn zero_votes_elect_the_first_candidate() {
        let mut s = session(&["first", "second"]);
        let creator = pid("creator");
        s.start(&creator).unwrap();
        assert_eq!(s.finish(&creator, 100).unwrap(), "first");
    }

    #[test]
    fn finished_session_rejects_votes() {
        let mut s = session(&["a"]);
        let creator = pid("creator");
        s.start(&creator).unwrap();
        s.finish(&creator, 100).unwrap();
        assert!(matches!(
            s.cast_vote(&pid("late"), "a", 0),
            Err(VotingError::InvalidState { actual: VotingState::Finished, .. })
        ));
    }
}
