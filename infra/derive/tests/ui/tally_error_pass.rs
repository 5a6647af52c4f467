use std::borrow::Cow;
use tally_derive::tally_error;

#[tally_error]
pub enum DemoError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Session {session_id} not found")]
    NotFound { session_id: u64 },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn read_missing() -> Result<Vec<u8>, DemoError> {
    std::fs::read("/definitely/not/here").context("Reading fixture")
}

fn not_found() -> Result<(), DemoError> {
    Err(DemoError::NotFound { session_id: 7 }).context("ignored, no context slot")
}

fn main() {
    let err = read_missing().unwrap_err();
    assert!(err.to_string().starts_with("IO error (Reading fixture): "));

    let err: DemoError = "boom".into();
    assert_eq!(err.to_string(), "Internal error: boom");

    let err = Err::<(), _>(DemoError::from(String::from("late"))).context("step 2").unwrap_err();
    assert_eq!(err.to_string(), "Internal error (step 2): late");

    assert_eq!(not_found().unwrap_err().to_string(), "Session 7 not found");

    let io = std::io::Error::other("disk");
    assert!(matches!(DemoError::from(io), DemoError::Io { context: None, .. }));
}
