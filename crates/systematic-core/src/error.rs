use std::time::Duration;

/// A bug discovered while exploring a single iteration (§7 Error kinds).
///
/// `BugKind` values never unwind through user code as exceptions would;
/// they are recorded onto the iteration's outcome and the executing
/// operation is abandoned in place (see `systematic::error::Cancelled`
/// for the propagation mechanism).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BugKind {
    #[error("{message}")]
    Assertion { message: String },

    #[error("deadlock: enabled set is empty with {blocked} operation(s) still blocked")]
    Deadlock { blocked: usize },

    #[error("potential deadlock: no scheduling point observed within {0:?}")]
    PotentialDeadlock(Duration),

    #[error(
        "liveness bug: monitor {monitor} is stuck in hot state {state:?} (temperature {temperature})"
    )]
    Liveness {
        monitor: String,
        state: String,
        temperature: u32,
    },

    #[error("data race on {collection}: concurrent {kind} observed without synchronization")]
    DataRace { collection: String, kind: DataRaceKind },

    #[error("uncontrolled concurrency: an unregistered thread or task made progress")]
    UncontrolledConcurrency,

    #[error("mailbox overflow: actor {actor} exceeded its capacity of {capacity}")]
    MailboxOverflow { actor: String, capacity: usize },

    #[error("unhandled event {event_type} in state {state:?} of machine {machine:?}")]
    UnhandledEvent {
        machine: String,
        state: String,
        event_type: String,
    },

    #[error("replay divergence at step {step}: {detail}")]
    ReplayDivergence { step: u64, detail: String },
}

/// The specific conflicting access pattern behind a `BugKind::DataRace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DataRaceKind {
    ReadWrite,
    WriteWrite,
}

impl std::fmt::Display for DataRaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataRaceKind::ReadWrite => write!(f, "read/write"),
            DataRaceKind::WriteWrite => write!(f, "write/write"),
        }
    }
}

/// A fatal error raised before any iteration runs (§7 Configuration error).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("state machine {machine:?} declares two Start states: {first:?} and {second:?}")]
    DuplicateStartState {
        machine: String,
        first: String,
        second: String,
    },

    #[error("state machine {machine:?} declares no Start state")]
    MissingStartState { machine: String },

    #[error("handler table references an unknown event type: {0}")]
    UnknownEventType(String),

    #[error("WhenAny was called with an empty task set")]
    EmptyWhenAny,
}

/// Top-level error surfaced at the public API boundary (§7 Propagation).
///
/// Bugs found during an iteration are not `EngineError`s: they are
/// structured data on the iteration's `Outcome`. This type is reserved for
/// failures that prevent an iteration from being run at all, or from being
/// replayed.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Trace(#[from] crate::trace::TraceParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assertion_bug_displays_its_message() {
        let bug = BugKind::Assertion {
            message: "Value is 3 instead of 5".into(),
        };
        assert_eq!(bug.to_string(), "Value is 3 instead of 5");
    }

    #[test]
    fn configuration_error_converts_into_engine_error() {
        let err: EngineError = ConfigurationError::EmptyWhenAny.into();
        assert!(matches!(err, EngineError::Configuration(ConfigurationError::EmptyWhenAny)));
    }
}
