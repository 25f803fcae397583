//! Error types for hostview

use crate::host::Runtime;
use crate::session::{self, Severity};
use std::borrow::Cow;
use std::fmt;

/// Numeric exit code reported to the host when an operation fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    pub const NONE: ErrorCode = ErrorCode(0);
    pub const TYPE: ErrorCode = ErrorCode(1);
    pub const RANK: ErrorCode = ErrorCode(2);
    pub const DIMENSION: ErrorCode = ErrorCode(3);
    pub const NUMERICAL: ErrorCode = ErrorCode(4);
    pub const MEMORY: ErrorCode = ErrorCode(5);
    pub const FUNCTION: ErrorCode = ErrorCode(6);
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ErrorCode::NONE => write!(f, "no error"),
            ErrorCode::TYPE => write!(f, "type error"),
            ErrorCode::RANK => write!(f, "rank error"),
            ErrorCode::DIMENSION => write!(f, "dimension error"),
            ErrorCode::NUMERICAL => write!(f, "numerical error"),
            ErrorCode::MEMORY => write!(f, "memory error"),
            ErrorCode::FUNCTION => write!(f, "function error"),
            ErrorCode(other) => write!(f, "error code {}", other),
        }
    }
}

/// Error raised by any view or factory operation.
///
/// There is no local recovery: every error unwinds to the caller of the
/// enclosing operation, which reports it with [`LibraryError::report`].
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    /// A host allocation, clone or conversion call failed
    #[error("{message} ({code})")]
    AllocationFailure {
        message: Cow<'static, str>,
        code: ErrorCode,
    },

    /// Element or pixel kind differs from the kind the view expects
    #[error("{message}")]
    TypeMismatch { message: Cow<'static, str> },

    /// Rank or per-axis length invariant violated
    #[error("{message}")]
    ShapeMismatch {
        message: Cow<'static, str>,
        code: ErrorCode,
    },

    /// Explicit values requested from a pattern array
    #[error("{message}")]
    PatternArrayAccess { message: Cow<'static, str> },

    /// The host asked the current operation to stop
    #[error("aborted by user")]
    UserAbort,

    /// Error raised by library code, optionally without a message
    #[error("{}", message.as_deref().unwrap_or("library function failed"))]
    Custom {
        message: Option<Cow<'static, str>>,
        code: ErrorCode,
    },
}

impl LibraryError {
    /// A message-less failure with the given exit code
    pub fn new(code: ErrorCode) -> Self {
        LibraryError::Custom {
            message: None,
            code,
        }
    }

    /// A failure that reports `message` at the outer boundary
    pub fn with_message(message: impl Into<Cow<'static, str>>, code: ErrorCode) -> Self {
        LibraryError::Custom {
            message: Some(message.into()),
            code,
        }
    }

    pub(crate) fn allocation(message: impl Into<Cow<'static, str>>, code: ErrorCode) -> Self {
        let message = message.into();
        log::debug!("host call failed: {} ({})", message, code);
        LibraryError::AllocationFailure { message, code }
    }

    pub(crate) fn type_mismatch(message: impl Into<Cow<'static, str>>) -> Self {
        LibraryError::TypeMismatch {
            message: message.into(),
        }
    }

    pub(crate) fn rank(message: impl Into<Cow<'static, str>>) -> Self {
        LibraryError::ShapeMismatch {
            message: message.into(),
            code: ErrorCode::RANK,
        }
    }

    pub(crate) fn dimension(message: impl Into<Cow<'static, str>>) -> Self {
        LibraryError::ShapeMismatch {
            message: message.into(),
            code: ErrorCode::DIMENSION,
        }
    }

    pub(crate) fn pattern(message: impl Into<Cow<'static, str>>) -> Self {
        LibraryError::PatternArrayAccess {
            message: message.into(),
        }
    }

    /// Exit code reported to the host for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            LibraryError::AllocationFailure { code, .. } => *code,
            LibraryError::TypeMismatch { .. } => ErrorCode::TYPE,
            LibraryError::ShapeMismatch { code, .. } => *code,
            LibraryError::PatternArrayAccess { .. } => ErrorCode::FUNCTION,
            LibraryError::UserAbort => ErrorCode::FUNCTION,
            LibraryError::Custom { code, .. } => *code,
        }
    }

    /// Human-readable message, if the error carries one
    pub fn message(&self) -> Option<&str> {
        match self {
            LibraryError::AllocationFailure { message, .. }
            | LibraryError::TypeMismatch { message }
            | LibraryError::ShapeMismatch { message, .. }
            | LibraryError::PatternArrayAccess { message } => Some(message),
            LibraryError::UserAbort => None,
            LibraryError::Custom { message, .. } => message.as_deref(),
        }
    }

    /// True for cooperative cancellation, which is never a data error
    pub fn is_abort(&self) -> bool {
        matches!(self, LibraryError::UserAbort)
    }

    /// Send the message, if any, to the host's message channel and return the exit code
    pub fn report(&self, host: &dyn Runtime) -> ErrorCode {
        session::message(host, self.message(), Severity::Error);
        self.code()
    }
}

/// Convenience alias for `Result<T, LibraryError>`.
pub type Result<T> = std::result::Result<T, LibraryError>;

/// Turn a host status into an allocation failure naming the host call
pub(crate) fn host_call<T>(
    result: std::result::Result<T, ErrorCode>,
    call: &'static str,
) -> Result<T> {
    result.map_err(|code| LibraryError::allocation(format!("{}() failed.", call), code))
}
