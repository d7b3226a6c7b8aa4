//! Connection status state machine
//!
//! One service instance owns one status value. The orchestrator is the only
//! writer; readers may observe it freely at any time, so the value lives in
//! an atomic cell rather than behind a lock.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a communication service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionStatus {
    /// Constructed, never started.
    ReadyToRun = 0,
    /// A relay cycle is in flight.
    Running = 1,
    /// The last cycle exited on a pause; pipes remain open.
    Paused = 2,
    /// Terminal. Once stopped, stays stopped.
    Stopped = 3,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReadyToRun => "ready to run",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

fn from_u8(value: u8) -> ConnectionStatus {
    match value {
        0 => ConnectionStatus::ReadyToRun,
        1 => ConnectionStatus::Running,
        2 => ConnectionStatus::Paused,
        _ => ConnectionStatus::Stopped,
    }
}

/// Single-writer atomic holder for [`ConnectionStatus`].
#[derive(Debug)]
pub(crate) struct StatusCell(AtomicU8);

impl StatusCell {
    pub fn new(status: ConnectionStatus) -> Self {
        Self(AtomicU8::new(status as u8))
    }

    pub fn load(&self) -> ConnectionStatus {
        from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, status: ConnectionStatus) {
        self.0.store(status as u8, Ordering::Release);
    }

    /// Transition `from` -> `to`; returns false if the current state differs.
    pub fn transition(&self, from: ConnectionStatus, to: ConnectionStatus) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_succeeds_from_expected_state() {
        let cell = StatusCell::new(ConnectionStatus::ReadyToRun);
        assert!(cell.transition(ConnectionStatus::ReadyToRun, ConnectionStatus::Running));
        assert_eq!(cell.load(), ConnectionStatus::Running);
    }

    #[test]
    fn test_transition_leaves_state_unchanged_on_mismatch() {
        let cell = StatusCell::new(ConnectionStatus::Stopped);
        assert!(!cell.transition(ConnectionStatus::ReadyToRun, ConnectionStatus::Running));
        assert_eq!(cell.load(), ConnectionStatus::Stopped);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(ConnectionStatus::ReadyToRun.to_string(), "ready to run");
        assert_eq!(ConnectionStatus::Stopped.to_string(), "stopped");
    }
}
