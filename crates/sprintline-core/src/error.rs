use std::fmt;

/// Machine-readable error codes surfaced by the CLI and JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    BoardNotFound,
    ConfigParseError,
    BoardParseError,
    ItemNotFound,
    IterationNotFound,
    DuplicateId,
    InvalidStateTransition,
    InvertedIteration,
    InvalidRange,
    InvalidEnumValue,
    BoardWriteFailed,
    BoardLocked,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::BoardNotFound => "E1001",
            Self::ConfigParseError => "E1002",
            Self::BoardParseError => "E1003",
            Self::ItemNotFound => "E2001",
            Self::IterationNotFound => "E2002",
            Self::DuplicateId => "E2003",
            Self::InvalidStateTransition => "E2004",
            Self::InvertedIteration => "E2005",
            Self::InvalidRange => "E2006",
            Self::InvalidEnumValue => "E2007",
            Self::BoardWriteFailed => "E5001",
            Self::BoardLocked => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::BoardNotFound => "Board file not found",
            Self::ConfigParseError => "Config file parse error",
            Self::BoardParseError => "Board file parse error",
            Self::ItemNotFound => "Item not found",
            Self::IterationNotFound => "Iteration not found",
            Self::DuplicateId => "Duplicate identifier",
            Self::InvalidStateTransition => "Invalid iteration transition",
            Self::InvertedIteration => "Iteration ends before it starts",
            Self::InvalidRange => "Date range is inverted",
            Self::InvalidEnumValue => "Invalid status/priority/zoom value",
            Self::BoardWriteFailed => "Board file write failed",
            Self::BoardLocked => "Board file is locked by another process",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::BoardNotFound => {
                Some("Create .sprintline/board.json or pass --board <path>.")
            }
            Self::ConfigParseError => Some("Fix syntax in .sprintline/config.toml and retry."),
            Self::BoardParseError => Some("Check the board JSON against the documented schema."),
            Self::ItemNotFound | Self::IterationNotFound => None,
            Self::DuplicateId => Some("Give every item and iteration a distinct id."),
            Self::InvalidStateTransition => {
                Some("Follow valid transitions: planned -> active -> completed.")
            }
            Self::InvertedIteration => Some("Set the iteration end date on or after its start."),
            Self::InvalidRange => Some("Pass the earlier date first."),
            Self::InvalidEnumValue => Some("Use one of the documented values."),
            Self::BoardWriteFailed => Some("Check disk space and write permissions."),
            Self::BoardLocked => Some("Wait for the other spl process to finish, then retry."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
