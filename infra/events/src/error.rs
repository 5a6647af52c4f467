use std::borrow::Cow;

/// Errors raised by [`EventBus`](crate::EventBus) operations.
#[tally_derive::tally_error]
pub enum EventBusError {
    /// The channel registered for a type holds a sender of another type.
    /// Indicates a broken registry invariant rather than a caller mistake.
    #[error("Type mismatch{}: {message}", format_context(.context))]
    TypeMismatch { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Broadcast channels need room for at least one message.
    #[error("Invalid capacity{}: {message}", format_context(.context))]
    InvalidCapacity { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
