//! # Event Bus
//!
//! A typed, in-process publish/subscribe bus built on `tokio::sync::broadcast`.
//!
//! Each Rust type gets its own channel, looked up by [`TypeId`](std::any::TypeId)
//! in an `FxHashMap` behind a `parking_lot::RwLock`. Publishing is synchronous and
//! never blocks, so it is safe to call from non-async code.
//!
//! # Example
//!
//! ```rust
//! use tally_event_bus::{EventBus, EventBusError, EventReceiverExt};
//!
//! #[derive(Debug)]
//! struct SessionOpened { id: u64 }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), EventBusError> {
//!     let bus = EventBus::new();
//!     let mut rx = bus.subscribe::<SessionOpened>()?;
//!     bus.publish(SessionOpened { id: 42 })?;
//!
//!     let event = EventReceiverExt::recv(&mut rx).await;
//!     assert_eq!(event.map(|e| e.id), Some(42));
//!     Ok(())
//! }
//! ```

mod bus;
mod error;
mod receiver;

pub use bus::{DEFAULT_CAPACITY, Event, EventBus};
pub use error::{EventBusError, EventBusErrorExt};
pub use receiver::EventReceiverExt;
