use std::{
    any::Any,
    error::Error,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

/// Error payload carried by every error notification.
///
/// Errors coming from a source are forwarded downstream as the same `Arc`, so an
/// observer can downcast to the concrete type the producer emitted.
pub type SharedError = Arc<dyn Error + Send + Sync + 'static>;

/// Failures originating inside `rxcore` itself.
#[derive(Debug, thiserror::Error)]
pub enum ObservableError {
    /// A user supplied closure (producer, projection, predicate, selector, ...)
    /// panicked. The panic is turned into a single error notification.
    #[error("{operator} closure failed: {message}")]
    ProducerFailure {
        operator: &'static str,
        message: String,
    },

    /// Free-form error, mostly useful for `Observable::throw_error` in tests and demos.
    #[error("{0}")]
    Message(String),

    /// `Observable::range` was asked for values past `i64::MAX`.
    #[error("range of {count} values starting at {start} overflows i64")]
    RangeOverflow { start: i64, count: usize },

    /// A tokio backed scheduler was requested outside of a tokio runtime.
    #[error("no tokio runtime available for scheduling")]
    RuntimeUnavailable,
}

impl ObservableError {
    /// Wraps the error into the shared form used by observers.
    pub fn shared(self) -> SharedError {
        Arc::new(self)
    }
}

/// Runs `f`, turning a panic into an `ObservableError::ProducerFailure`.
pub(crate) fn catch_fault<R>(operator: &'static str, f: impl FnOnce() -> R) -> Result<R, SharedError> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let message = panic_message(payload.as_ref());
        tracing::warn!(operator, %message, "closure panicked, emitting error");
        ObservableError::ProducerFailure { operator, message }.shared()
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
