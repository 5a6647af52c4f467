use serde::Deserialize;

/// Registry settings.
///
/// A limit of `0` disables that check; both limits are off by default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VotingConfig {
    /// Buffer size of each notification channel.
    pub event_capacity: usize,
    /// Maximum number of candidates per session.
    pub max_candidates: usize,
    /// Maximum candidate name length, in bytes.
    pub max_candidate_name_len: usize,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            event_capacity: tally_event_bus::DEFAULT_CAPACITY,
            max_candidates: 0,
            max_candidate_name_len: 0,
        }
    }
}
