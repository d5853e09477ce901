//! Display lifecycle state

use serde::{Deserialize, Serialize};

/// Visible state of one controller instance.
///
/// `Idle` only before the first show; afterwards exactly one of the other
/// four states is current at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayState {
    /// No show requested yet.
    Idle,
    /// Resolution in flight, loading fallback visible.
    Loading,
    /// Resolved content rendered.
    Loaded,
    /// Resolution failed, error fallback visible.
    Error,
    /// Timeout fired first, timeout fallback visible.
    TimedOut,
}

impl DisplayState {
    /// True while a resolution is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self, DisplayState::Loading)
    }

    /// True once resolved content has been rendered.
    pub fn is_loaded(&self) -> bool {
        matches!(self, DisplayState::Loaded)
    }

    /// True when resolution failed.
    pub fn is_error(&self) -> bool {
        matches!(self, DisplayState::Error)
    }

    /// True when the timeout won the race.
    pub fn is_timed_out(&self) -> bool {
        matches!(self, DisplayState::TimedOut)
    }
}
