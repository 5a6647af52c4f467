//! JSON-lines request loop and notification logging.

use serde::Serialize;
use tally_event_bus::{EventBus, EventBusError, EventReceiverExt};
use tally_voting::events::{VoteCast, VotingCreated, VotingFinished, VotingStarted};
use tally_voting::{Response, VotingError, VotingRegistry};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Counters for one [`serve`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub accepted: usize,
    pub rejected: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Reply<'a> {
    Ok(&'a Response),
    Error { kind: &'static str, message: String },
}

impl<'a> Reply<'a> {
    fn new(outcome: &'a Result<Response, VotingError>) -> Self {
        match outcome {
            Ok(response) => Self::Ok(response),
            Err(err) => Self::Error { kind: err.kind(), message: err.to_string() },
        }
    }
}

/// Answers each non-blank input line with exactly one JSON line.
///
/// Successful requests produce `{"ok": ...}`, refused ones
/// `{"error": {"kind": ..., "message": ...}}`. A refused request, including a
/// line that is not UTF-8, never stops the loop.
///
/// # Errors
/// Fails only on I/O errors of `input` or `output`.
pub async fn serve<R, W>(registry: &VotingRegistry, mut input: R, mut output: W) -> anyhow::Result<Summary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut summary = Summary::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let outcome = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => registry.handle_json(line.trim()),
            Err(err) => Err(VotingError::UnsupportedRequest {
                message: "request line is not valid UTF-8".into(),
                context: Some(err.to_string().into()),
            }),
        };
        match &outcome {
            Ok(_) => summary.accepted += 1,
            Err(err) => {
                debug!(kind = err.kind(), %err, "Request rejected");
                summary.rejected += 1;
            },
        }

        let mut reply = serde_json::to_vec(&Reply::new(&outcome))?;
        reply.push(b'\n');
        output.write_all(&reply).await?;
        output.flush().await?;
    }

    Ok(summary)
}

/// Logs every voting notification until the bus is shut down.
///
/// Subscriptions are taken before this returns, so nothing published
/// afterwards is missed.
///
/// # Errors
/// Returns an [`EventBusError`] if a subscription cannot be created.
pub fn spawn_event_logger(bus: &EventBus) -> Result<JoinHandle<usize>, EventBusError> {
    let mut created = bus.subscribe::<VotingCreated>()?;
    let mut started = bus.subscribe::<VotingStarted>()?;
    let mut cast = bus.subscribe::<VoteCast>()?;
    let mut finished = bus.subscribe::<VotingFinished>()?;

    Ok(tokio::spawn(async move {
        let mut logged = 0usize;
        loop {
            tokio::select! {
                Some(e) = EventReceiverExt::recv(&mut created) => {
                    info!(session_id = e.session_id, creator = %e.creator, end_time = e.end_time, "VotingCreated");
                },
                Some(e) = EventReceiverExt::recv(&mut started) => {
                    info!(session_id = e.session_id, "VotingStarted");
                },
                Some(e) = EventReceiverExt::recv(&mut cast) => {
                    info!(session_id = e.session_id, voter = %e.voter, candidate = %e.candidate_name, "VoteCast");
                },
                Some(e) = EventReceiverExt::recv(&mut finished) => {
                    info!(session_id = e.session_id, winner = %e.winner_name, "VotingFinished");
                },
                else => break,
            }
            logged += 1;
        }
        logged
    }))
}
