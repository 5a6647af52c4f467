use crate::error::EventBusError;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::any::{Any, TypeId, type_name};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{trace, warn};

/// Buffer size used when a channel is created implicitly.
pub const DEFAULT_CAPACITY: usize = 128;

/// Marker trait for anything that can travel over the [`EventBus`].
pub trait Event: Any + Send + Sync + 'static {}
impl<T: Any + Send + Sync + 'static> Event for T {}

#[derive(Debug)]
struct Channel {
    capacity: usize,
    sender: Box<dyn Any + Send + Sync>,
}

impl Channel {
    fn new<T: Event>(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel::<Arc<T>>(capacity);
        Self { capacity, sender: Box::new(tx) }
    }

    fn sender<T: Event>(&self) -> Result<broadcast::Sender<Arc<T>>, EventBusError> {
        self.sender.downcast_ref::<broadcast::Sender<Arc<T>>>().cloned().ok_or_else(|| {
            EventBusError::TypeMismatch {
                message: type_name::<T>().into(),
                context: Some("Registered sender has a different event type".into()),
            }
        })
    }
}

/// Thread-safe fan-out bus with one broadcast channel per event type.
///
/// Cloning the bus is cheap and every clone shares the same channels.
/// Events are wrapped in [`Arc`] so each subscriber sees the same allocation.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    channels: Arc<RwLock<FxHashMap<TypeId, Channel>>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to events of type `T`.
    ///
    /// # Errors
    /// Returns [`EventBusError::TypeMismatch`] if the channel registry is corrupted.
    ///
    /// # Examples
    /// ```rust
    /// use tally_event_bus::{EventBus, EventReceiverExt};
    ///
    /// #[derive(Debug, PartialEq)]
    /// struct Tick(u64);
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> Result<(), tally_event_bus::EventBusError> {
    /// let bus = EventBus::new();
    /// let mut rx = bus.subscribe::<Tick>()?;
    /// bus.publish(Tick(1))?;
    /// assert_eq!(EventReceiverExt::recv(&mut rx).await.map(|t| t.0), Some(1));
    /// # Ok(())
    /// # }
    /// ```
    pub fn subscribe<T: Event>(&self) -> Result<broadcast::Receiver<Arc<T>>, EventBusError> {
        self.subscribe_with_capacity::<T>(DEFAULT_CAPACITY)
    }

    /// Subscribes to events of type `T`, creating the channel with `capacity` if needed.
    ///
    /// The capacity only applies to the first registration of `T`; later calls
    /// reuse the existing channel and log a warning on mismatch.
    ///
    /// # Errors
    /// Returns [`EventBusError::InvalidCapacity`] if `capacity` is zero.
    pub fn subscribe_with_capacity<T: Event>(
        &self,
        capacity: usize,
    ) -> Result<broadcast::Receiver<Arc<T>>, EventBusError> {
        if capacity == 0 {
            return Err(EventBusError::InvalidCapacity {
                message: "capacity must be >= 1".into(),
                context: Some(type_name::<T>().into()),
            });
        }
        Ok(self.sender::<T>(capacity)?.subscribe())
    }

    /// Publishes an event to every current subscriber of `T`.
    ///
    /// Returns how many subscribers received it. Publishing with nobody
    /// listening is not an error and returns `0`.
    ///
    /// # Errors
    /// Returns [`EventBusError::TypeMismatch`] if the channel registry is corrupted.
    pub fn publish<T: Event>(&self, event: T) -> Result<usize, EventBusError> {
        self.publish_arc(Arc::new(event))
    }

    /// Publishes an already shared event without re-wrapping it.
    ///
    /// # Errors
    /// Returns [`EventBusError::TypeMismatch`] if the channel registry is corrupted.
    pub fn publish_arc<T: Event>(&self, event: Arc<T>) -> Result<usize, EventBusError> {
        let sender = self.sender::<T>(DEFAULT_CAPACITY)?;
        match sender.send(event) {
            Ok(count) => {
                trace!(event = type_name::<T>(), count, "Event dispatched");
                Ok(count)
            },
            Err(_) => {
                trace!(event = type_name::<T>(), "Event dropped: no active subscribers");
                Ok(0)
            },
        }
    }

    /// Number of live receivers for `T`.
    #[must_use]
    pub fn subscriber_count<T: Event>(&self) -> usize {
        self.channels
            .read()
            .get(&TypeId::of::<T>())
            .and_then(|channel| channel.sender::<T>().ok())
            .map_or(0, |tx| tx.receiver_count())
    }

    /// Drops every channel, closing all receivers.
    ///
    /// Returns the number of channels that were closed. Publishing or
    /// subscribing afterwards starts fresh channels.
    #[must_use]
    pub fn shutdown(&self) -> usize {
        let mut channels = self.channels.write();
        let count = channels.len();
        channels.clear();
        count
    }

    fn sender<T: Event>(
        &self,
        capacity: usize,
    ) -> Result<broadcast::Sender<Arc<T>>, EventBusError> {
        let id = TypeId::of::<T>();

        if let Some(channel) = self.channels.read().get(&id) {
            warn_on_capacity_mismatch::<T>(channel.capacity, capacity);
            return channel.sender::<T>();
        }

        let mut channels = self.channels.write();
        let channel = channels.entry(id).or_insert_with(|| {
            trace!(event = type_name::<T>(), capacity, "Initializing event channel");
            Channel::new::<T>(capacity)
        });
        channel.sender::<T>()
    }
}

fn warn_on_capacity_mismatch<T: Event>(existing: usize, requested: usize) {
    if requested != DEFAULT_CAPACITY && existing != requested {
        warn!(
            event = type_name::<T>(),
            existing_capacity = existing,
            requested_capacity = requested,
            "Channel already initialized with a different capacity"
        );
    }
}
