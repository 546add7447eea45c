//! Hotkey arming gate
//!
//! Decides whether a recognized gesture may tile. Timestamps are on the
//! listener timeline, like pointer samples.

use std::time::Duration;

use crate::config::ArmingConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmingGate {
    required: bool,
    window: Duration,
    armed_until: Option<Duration>,
}

impl ArmingGate {
    pub fn new(config: &ArmingConfig) -> Self {
        Self {
            required: config.hotkey.is_some(),
            window: config.window,
            armed_until: None,
        }
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Opens the gate for one gesture completing before `now + window`
    pub fn arm(&mut self, now: Duration) {
        self.armed_until = Some(now.saturating_add(self.window));
    }

    /// Returns true if a gesture completing at `now` may tile
    ///
    /// An admitted gesture closes the gate again.
    pub fn admit(&mut self, now: Duration) -> bool {
        if !self.required {
            return true;
        }
        match self.armed_until.take() {
            Some(deadline) if now <= deadline => true,
            Some(_) => {
                tracing::debug!("arming window expired before a gesture completed");
                false
            }
            None => false,
        }
    }

    pub fn reset(&mut self) {
        self.armed_until = None;
    }
}
