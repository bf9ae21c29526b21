use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic};

/// Error kinds for store operations.
///
/// Each kind describes a category of failure so that callers can react
/// precisely. The only kind that is ever recovered locally is
/// [`ErrorKind::DuplicateKey`], which the upsert path retries a bounded
/// number of times before surfacing it.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    /// A uniqueness constraint was violated on insert. Two concurrent
    /// upserts racing on the same match key produce this; the write
    /// reconciler retries it, everything else surfaces it.
    DuplicateKey,
    /// Any other failure reported by the underlying database driver.
    /// Never recovered locally; propagated with the original cause attached.
    BackendError,
    /// The operation is not valid in the current context.
    InvalidOperation,
    /// Error converting between entity and document shapes.
    ObjectMappingError,
    /// The requested resource was not found.
    NotFound,
    /// Internal error (usually indicates a bug).
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::DuplicateKey => write!(f, "Duplicate key"),
            ErrorKind::BackendError => write!(f, "Backend error"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::ObjectMappingError => write!(f, "Object mapping error"),
            ErrorKind::NotFound => write!(f, "Not found"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom error type for the store.
///
/// `StoreError` encapsulates the error message, a [`ErrorKind`], and an
/// optional cause. It supports error chaining and backtraces for debugging.
///
/// # Examples
///
/// ```rust,ignore
/// use docstore::errors::{StoreError, ErrorKind};
///
/// let err = StoreError::new("insert failed", ErrorKind::BackendError);
///
/// let cause = StoreError::new("connection reset", ErrorKind::BackendError);
/// let err = StoreError::new_with_cause("save failed", ErrorKind::BackendError, cause);
/// ```
#[derive(Clone)]
pub struct StoreError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<StoreError>>,
    backtrace: Atomic<Backtrace>,
}

impl StoreError {
    /// Creates a new `StoreError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        StoreError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `StoreError` with a cause error attached.
    ///
    /// This creates an error chain where the cause is preserved for
    /// debugging and for `Error::source`.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: StoreError) -> Self {
        StoreError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&StoreError> {
        self.cause.as_deref()
    }

    /// Returns true if this error is the duplicate-key conflict class
    /// recovered by the bounded upsert retry.
    pub fn is_duplicate_key(&self) -> bool {
        self.error_kind == ErrorKind::DuplicateKey
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for store operations.
///
/// `StoreResult<T>` is shorthand for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::new(&format!("IO error: {}", err), ErrorKind::BackendError)
    }
}

impl From<std::fmt::Error> for StoreError {
    fn from(err: std::fmt::Error) -> Self {
        StoreError::new(
            &format!("Formatting error: {}", err),
            ErrorKind::InternalError,
        )
    }
}

impl From<String> for StoreError {
    fn from(msg: String) -> Self {
        StoreError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for StoreError {
    fn from(msg: &str) -> Self {
        StoreError::new(msg, ErrorKind::InternalError)
    }
}
