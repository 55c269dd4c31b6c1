use std::fmt;

/// Machine-readable error codes for callers that branch on failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    TaskNotFound,
    ContextNotFound,
    IdAlreadyExists,
    PositionOutOfRange,
    CorruptLog,
    UnsupportedLogVersion,
    InconsistentLog,
    StorageReadFailed,
    StorageWriteFailed,
    LockContention,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::TaskNotFound => "E2001",
            Self::ContextNotFound => "E2002",
            Self::IdAlreadyExists => "E2003",
            Self::PositionOutOfRange => "E2004",
            Self::CorruptLog => "E3001",
            Self::UnsupportedLogVersion => "E3002",
            Self::InconsistentLog => "E3003",
            Self::StorageReadFailed => "E5001",
            Self::StorageWriteFailed => "E5002",
            Self::LockContention => "E5003",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and UI messages.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::TaskNotFound => "Task not found",
            Self::ContextNotFound => "Context not found",
            Self::IdAlreadyExists => "Identifier already in use",
            Self::PositionOutOfRange => "Position out of range",
            Self::CorruptLog => "Event log could not be decoded",
            Self::UnsupportedLogVersion => "Event log written by a newer version",
            Self::InconsistentLog => "Event log is internally inconsistent",
            Self::StorageReadFailed => "Event log read failed",
            Self::StorageWriteFailed => "Event log write failed",
            Self::LockContention => "Lock contention",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to the user.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::TaskNotFound | Self::ContextNotFound => {
                Some("Refresh the view; the entity may have been deleted.")
            }
            Self::IdAlreadyExists => Some("Generate a fresh identifier with Engine::new_id."),
            Self::PositionOutOfRange => None,
            Self::CorruptLog | Self::InconsistentLog => {
                Some("Open with discard to quarantine the log and start empty.")
            }
            Self::UnsupportedLogVersion => Some("Upgrade clean-things to read this log."),
            Self::StorageReadFailed => Some("Check that the data directory is readable."),
            Self::StorageWriteFailed => Some("Check disk space and write permissions."),
            Self::LockContention => Some("Retry after the other process releases its lock."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
