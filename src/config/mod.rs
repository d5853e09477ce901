//! Configuration for the loadable system
//!
//! Global fallback defaults, per-show options, and timeout value coercion.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::traits::{LoadableError, ViewDescriptor};

/// Default visual grace period before a replaced fallback is removed.
pub const DEFAULT_TRANSITION_DELAY_MS: u64 = 1000;

/// Timeout input accepted from call sites: a millisecond count or a numeric
/// string that is coerced once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeoutValue {
    /// Milliseconds. Zero means "time out immediately"; negative values arm
    /// no timer.
    Millis(i64),
    /// A string holding a decimal millisecond count.
    Text(String),
}

impl TimeoutValue {
    /// Coerce to a millisecond count.
    ///
    /// Numeric values pass through unchanged. Strings are parsed as decimal
    /// integers; a non-numeric string yields `InvalidTimeout`, which callers
    /// treat as "no timer armed" rather than a failure.
    pub fn normalize(&self) -> Result<i64, LoadableError> {
        match self {
            TimeoutValue::Millis(n) => Ok(*n),
            TimeoutValue::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| LoadableError::InvalidTimeout(s.clone())),
        }
    }
}

impl From<i64> for TimeoutValue {
    fn from(n: i64) -> Self {
        TimeoutValue::Millis(n)
    }
}

impl From<&str> for TimeoutValue {
    fn from(s: &str) -> Self {
        TimeoutValue::Text(s.to_string())
    }
}

impl From<String> for TimeoutValue {
    fn from(s: String) -> Self {
        TimeoutValue::Text(s)
    }
}

/// Process-wide defaults shared by every controller that does not override
/// them. Supplied once at startup and read-only thereafter.
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    /// Default view while a module is loading.
    pub loading_fallback: Option<ViewDescriptor>,
    /// Default view when resolution fails.
    pub error_fallback: Option<ViewDescriptor>,
    /// Default view when the timeout fires first.
    pub timeout_fallback: Option<ViewDescriptor>,
    /// Default element-mode flag.
    pub is_element: bool,
    /// Grace period before a replaced fallback view is removed.
    pub transition_delay: Duration,
}

impl Default for GlobalOptions {
    fn default() -> Self {
        Self {
            loading_fallback: None,
            error_fallback: None,
            timeout_fallback: None,
            is_element: false,
            transition_delay: Duration::from_millis(DEFAULT_TRANSITION_DELAY_MS),
        }
    }
}

impl GlobalOptions {
    /// Create options with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default loading fallback.
    pub fn with_loading_fallback(mut self, view: ViewDescriptor) -> Self {
        self.loading_fallback = Some(view);
        self
    }

    /// Set the default error fallback.
    pub fn with_error_fallback(mut self, view: ViewDescriptor) -> Self {
        self.error_fallback = Some(view);
        self
    }

    /// Set the default timeout fallback.
    pub fn with_timeout_fallback(mut self, view: ViewDescriptor) -> Self {
        self.timeout_fallback = Some(view);
        self
    }

    /// Set the default element-mode flag.
    pub fn with_is_element(mut self, is_element: bool) -> Self {
        self.is_element = is_element;
        self
    }

    /// Override the fallback transition grace period.
    pub fn with_transition_delay(mut self, delay: Duration) -> Self {
        self.transition_delay = delay;
        self
    }
}

/// Per-show options, overriding descriptor and global defaults.
#[derive(Debug, Clone, Default)]
pub struct ShowOptions {
    /// Timeout raced against resolution. `None` means resolution alone
    /// determines the outcome.
    pub timeout: Option<TimeoutValue>,
    /// Call-site element-mode override.
    pub is_element: Option<bool>,
    /// Force element mode regardless of descriptor and global flags.
    pub force_element: bool,
}

impl ShowOptions {
    /// Options with no overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: impl Into<TimeoutValue>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    /// Set the call-site element-mode flag.
    pub fn with_is_element(mut self, is_element: bool) -> Self {
        self.is_element = Some(is_element);
        self
    }

    /// Force element mode.
    pub fn with_force_element(mut self) -> Self {
        self.force_element = true;
        self
    }
}
