//! # Tally CLI
//!
//! Drives a [`VotingRegistry`](tally_voting::VotingRegistry) from JSON-lines
//! requests on stdin and answers on stdout, one line per request:
//!
//! ```text
//! > {"caller":"alice","op":"createVoting","candidateNames":["Movie1","Movie2"],"duration":3600}
//! < {"ok":{"sessionId":0}}
//! > {"caller":"bob","value":5,"op":"vote","sessionId":0,"candidateName":"Movie1"}
//! < {"error":{"kind":"ValueTransferRejected","message":"Value transfers are not accepted (received 5)"}}
//! ```
//!
//! Settings come from `tally.toml` (or `--config`), then `TALLY__*`
//! environment variables, then command line flags.

mod args;
mod config;
mod driver;

pub use crate::args::Args;
pub use crate::config::{AppConfig, ConfigError, ConfigErrorExt, ENV_PREFIX, load_config};
pub use crate::driver::{Summary, serve, spawn_event_logger};
