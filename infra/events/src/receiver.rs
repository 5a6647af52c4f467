use crate::bus::Event;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;

/// Ergonomic receiving for bus subscriptions.
pub trait EventReceiverExt<T> {
    /// Waits for the next event, returning `None` once the channel is closed.
    ///
    /// A receiver that fell behind skips to the oldest message still buffered
    /// instead of surfacing the lag as an error.
    fn recv(&mut self) -> impl Future<Output = Option<Arc<T>>> + Send;

    /// Returns an already buffered event without waiting.
    fn try_next(&mut self) -> Option<Arc<T>>;
}

impl<T: Event> EventReceiverExt<T> for broadcast::Receiver<Arc<T>> {
    async fn recv(&mut self) -> Option<Arc<T>> {
        let mut skipped = 0u64;
        loop {
            match Self::recv(self).await {
                Ok(event) => {
                    if skipped > 0 {
                        warn!(
                            event = std::any::type_name::<T>(),
                            skipped, "Receiver lagged; continuing from the oldest buffered event"
                        );
                    }
                    return Some(event);
                },
                Err(broadcast::error::RecvError::Lagged(n)) => skipped = skipped.saturating_add(n),
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    fn try_next(&mut self) -> Option<Arc<T>> {
        loop {
            match self.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => {},
                Err(_) => return None,
            }
        }
    }
}
