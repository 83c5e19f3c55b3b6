use std::fmt;
use std::str::FromStr;

/// Type tag of a scheduling point (§3 Scheduling point).
///
/// Emitted by instrumented user code or by a controlled primitive before
/// any observable shared-state effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SchedulingPointType {
    Default,
    Create,
    Send,
    Receive,
    Yield,
    ContextSwitch,
    AcquireLock,
    ReleaseLock,
    Wait,
    SignalWait,
    Complete,
    Suppress,
    Resume,
}

impl SchedulingPointType {
    pub const fn tag(self) -> &'static str {
        match self {
            SchedulingPointType::Default => "Default",
            SchedulingPointType::Create => "Create",
            SchedulingPointType::Send => "Send",
            SchedulingPointType::Receive => "Receive",
            SchedulingPointType::Yield => "Yield",
            SchedulingPointType::ContextSwitch => "ContextSwitch",
            SchedulingPointType::AcquireLock => "AcquireLock",
            SchedulingPointType::ReleaseLock => "ReleaseLock",
            SchedulingPointType::Wait => "Wait",
            SchedulingPointType::SignalWait => "SignalWait",
            SchedulingPointType::Complete => "Complete",
            SchedulingPointType::Suppress => "Suppress",
            SchedulingPointType::Resume => "Resume",
        }
    }
}

impl fmt::Display for SchedulingPointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Error returned when a trace line names a scheduling point tag this
/// build does not recognize.
#[derive(Debug, thiserror::Error)]
#[error("unknown scheduling point tag: {0}")]
pub struct UnknownSchedulingPointTag(pub String);

impl FromStr for SchedulingPointType {
    type Err = UnknownSchedulingPointTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Default" => SchedulingPointType::Default,
            "Create" => SchedulingPointType::Create,
            "Send" => SchedulingPointType::Send,
            "Receive" => SchedulingPointType::Receive,
            "Yield" => SchedulingPointType::Yield,
            "ContextSwitch" => SchedulingPointType::ContextSwitch,
            "AcquireLock" => SchedulingPointType::AcquireLock,
            "ReleaseLock" => SchedulingPointType::ReleaseLock,
            "Wait" => SchedulingPointType::Wait,
            "SignalWait" => SchedulingPointType::SignalWait,
            "Complete" => SchedulingPointType::Complete,
            "Suppress" => SchedulingPointType::Suppress,
            "Resume" => SchedulingPointType::Resume,
            other => return Err(UnknownSchedulingPointTag(other.to_owned())),
        })
    }
}
