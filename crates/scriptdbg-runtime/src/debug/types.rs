//! Debug data types.

#![allow(missing_docs)]

use std::str::FromStr;
use std::time::Duration;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::value::Value;

use super::FrameId;

/// Whether the traced thread is executing or suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugStatus {
    Running,
    Stopped,
}

/// Policy deciding where the traced thread suspends next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteppingMode {
    /// Stop at the next line anywhere.
    StepInto,
    /// Stop at the next line in the frame or when it returns.
    StepToFrame(FrameId),
    /// Stop when `frame` returns; lines in `caller` also stop.
    StepUntilReturn {
        frame: FrameId,
        caller: Option<FrameId>,
    },
    /// Only breakpoints and exceptions stop.
    Continue,
    /// Never stop again; unwind the debuggee.
    Quitting,
}

impl SteppingMode {
    /// Frame whose line events stop execution.
    #[must_use]
    pub fn stop_frame(self) -> Option<FrameId> {
        match self {
            SteppingMode::StepToFrame(frame) => Some(frame),
            SteppingMode::StepUntilReturn { caller, .. } => caller,
            _ => None,
        }
    }

    /// Frame whose return event is the stepping target.
    #[must_use]
    pub fn return_frame(self) -> Option<FrameId> {
        match self {
            SteppingMode::StepUntilReturn { frame, .. } => Some(frame),
            _ => None,
        }
    }

    #[must_use]
    pub fn stops_at(self, frame: FrameId) -> bool {
        match self {
            SteppingMode::StepInto => true,
            other => other.stop_frame() == Some(frame),
        }
    }

    #[must_use]
    pub fn is_quitting(self) -> bool {
        matches!(self, SteppingMode::Quitting)
    }
}

/// Which exceptions suspend the debuggee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExceptionMode {
    #[default]
    Never,
    Unhandled,
    All,
}

impl ExceptionMode {
    /// Map a client exception filter id (`never`, `always`, `unhandled`).
    #[must_use]
    pub fn from_filter(filter: &str) -> Option<Self> {
        match filter {
            "never" => Some(ExceptionMode::Never),
            "always" | "all" | "raised" => Some(ExceptionMode::All),
            "unhandled" | "userUnhandled" => Some(ExceptionMode::Unhandled),
            _ => None,
        }
    }
}

/// Reason reported with a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugStopReason {
    Entry,
    Step,
    Breakpoint,
    Exception,
    Pause,
}

impl DebugStopReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DebugStopReason::Entry => "entry",
            DebugStopReason::Step => "step",
            DebugStopReason::Breakpoint => "breakpoint",
            DebugStopReason::Exception => "exception",
            DebugStopReason::Pause => "pause",
        }
    }
}

/// Stop notification published by the session bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugStop {
    pub reason: DebugStopReason,
    pub thread_id: u32,
    /// Exception text for exception stops.
    pub description: Option<String>,
    pub breakpoint_id: Option<u32>,
    /// Snapshot generation this stop belongs to.
    pub generation: u64,
}

/// Diagnostic line destined for the client console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugLog {
    pub message: String,
}

impl DebugLog {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Inspection copy of one frame taken at suspension time.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    pub id: FrameId,
    pub name: SmolStr,
    /// Raw file identifier as reported by the runtime.
    pub path: SmolStr,
    /// Canonical form used by the breakpoint registry.
    pub file: SmolStr,
    pub line: u32,
    pub locals: IndexMap<SmolStr, Value>,
    pub globals: IndexMap<SmolStr, Value>,
    /// Source text for synthetic frames.
    pub source: Option<String>,
}

impl FrameSnapshot {
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.path.starts_with('<') && self.path.ends_with('>')
    }
}

/// Frames captured at the moment of suspension.
///
/// `frames` runs from the outermost call to the innermost; exception stops append the frames
/// the failure propagated out of after the current frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionSnapshot {
    pub frames: Vec<FrameSnapshot>,
    pub current: usize,
    pub generation: u64,
}

impl ExecutionSnapshot {
    #[must_use]
    pub fn current_frame(&self) -> Option<&FrameSnapshot> {
        self.frames.get(self.current)
    }

    #[must_use]
    pub fn frame(&self, index: usize) -> Option<&FrameSnapshot> {
        self.frames.get(index)
    }

    /// Caller of the current frame.
    #[must_use]
    pub fn current_caller(&self) -> Option<&FrameSnapshot> {
        self.current
            .checked_sub(1)
            .and_then(|index| self.frames.get(index))
    }
}

/// What happens to a stopped debuggee when its last session goes away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisconnectPolicy {
    /// Resume with stepping mode `continue`.
    #[default]
    Resume,
    /// Stay suspended until a new session resumes it.
    StayStopped,
}

impl FromStr for DisconnectPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "resume" => Ok(DisconnectPolicy::Resume),
            "stay-stopped" | "stay_stopped" | "stay" => Ok(DisconnectPolicy::StayStopped),
            other => Err(format!("unknown disconnect policy '{other}'")),
        }
    }
}

/// How long entry handling waits for a session before running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionWait {
    NoWait,
    Timeout(Duration),
    #[default]
    Forever,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_until_return_stops_in_caller_lines() {
        let mode = SteppingMode::StepUntilReturn {
            frame: FrameId(2),
            caller: Some(FrameId(1)),
        };
        assert!(mode.stops_at(FrameId(1)));
        assert!(!mode.stops_at(FrameId(2)));
        assert_eq!(mode.return_frame(), Some(FrameId(2)));
        assert!(SteppingMode::StepInto.stops_at(FrameId(9)));
        assert!(!SteppingMode::Continue.stops_at(FrameId(9)));
    }

    #[test]
    fn disconnect_policy_parses_known_names() {
        assert_eq!("Resume".parse(), Ok(DisconnectPolicy::Resume));
        assert_eq!("stay-stopped".parse(), Ok(DisconnectPolicy::StayStopped));
        assert!("later".parse::<DisconnectPolicy>().is_err());
    }
}
