//! Error types shared by observables, subjects and operators.

mod observable_errors;

pub(crate) use observable_errors::catch_fault;
pub use observable_errors::{ObservableError, SharedError};
