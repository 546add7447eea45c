//! Window controller
//!
//! Applies a target rectangle to the foreground window through the
//! [`WindowManager`] capability. The window handle is looked up fresh on
//! every call and never retained.

use std::fmt;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::ControllerConfig;
use crate::domain::core::Rect;
use crate::platform::{PlatformError, WindowId, WindowManager, WindowStyle};

/// Shell windows that are never tiled
const SYSTEM_CLASSES: &[&str] = &[
    "Progman",
    "WorkerW",
    "Shell_TrayWnd",
    "Shell_SecondaryTrayWnd",
    "NotifyIconOverflowWindow",
    "Windows.UI.Core.CoreWindow",
];

/// Why the foreground window cannot be tiled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ineligible {
    NoForegroundWindow,
    /// The window disappeared between lookup and placement
    Vanished,
    Invisible,
    ChildWindow,
    NotResizable,
    Minimized,
    ToolWindow,
    /// Windows without a title are helper surfaces, not documents
    Untitled,
    SystemWindow(String),
    ExcludedClass(String),
    ExcludedTitle(String),
}

impl fmt::Display for Ineligible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ineligible::NoForegroundWindow => write!(f, "no foreground window"),
            Ineligible::Vanished => write!(f, "window no longer exists"),
            Ineligible::Invisible => write!(f, "window is not visible"),
            Ineligible::ChildWindow => write!(f, "window is a child window"),
            Ineligible::NotResizable => write!(f, "window is not resizable"),
            Ineligible::Minimized => write!(f, "window is minimized"),
            Ineligible::ToolWindow => write!(f, "window is a tool window"),
            Ineligible::Untitled => write!(f, "window has no title"),
            Ineligible::SystemWindow(class) => write!(f, "system window '{class}'"),
            Ineligible::ExcludedClass(class) => write!(f, "window class '{class}' is excluded"),
            Ineligible::ExcludedTitle(fragment) => write!(f, "window title matches excluded '{fragment}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("No eligible window to tile: {0}")]
    NoEligibleWindow(Ineligible),
    #[error("OS rejected placement of window {window:?}: {reason}")]
    OsRejected { window: WindowId, reason: String },
}

/// Which windows the controller refuses to touch
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExclusionPolicy {
    /// Lowercased class names
    classes: Vec<String>,
    /// Lowercased title fragments
    titles: Vec<String>,
}

impl ExclusionPolicy {
    pub fn new(classes: &[String], titles: &[String]) -> Self {
        let normalize = |values: &[String]| {
            values
                .iter()
                .map(|value| value.trim().to_lowercase())
                .filter(|value| !value.is_empty())
                .collect()
        };
        Self {
            classes: normalize(classes),
            titles: normalize(titles),
        }
    }

    /// Checks a window's style against the eligibility rules
    pub fn check(&self, style: &WindowStyle) -> Result<(), Ineligible> {
        if SYSTEM_CLASSES
            .iter()
            .any(|class| class.eq_ignore_ascii_case(&style.class_name))
        {
            return Err(Ineligible::SystemWindow(style.class_name.clone()));
        }
        if !style.is_visible {
            return Err(Ineligible::Invisible);
        }
        if style.is_child {
            return Err(Ineligible::ChildWindow);
        }
        if style.is_minimized {
            return Err(Ineligible::Minimized);
        }
        if style.is_tool_window {
            return Err(Ineligible::ToolWindow);
        }
        if !style.is_resizable {
            return Err(Ineligible::NotResizable);
        }
        if style.title.trim().is_empty() {
            return Err(Ineligible::Untitled);
        }

        let class = style.class_name.to_lowercase();
        if self.classes.iter().any(|excluded| *excluded == class) {
            return Err(Ineligible::ExcludedClass(style.class_name.clone()));
        }
        let title = style.title.to_lowercase();
        if let Some(fragment) = self.titles.iter().find(|fragment| title.contains(fragment.as_str())) {
            return Err(Ineligible::ExcludedTitle(fragment.clone()));
        }

        Ok(())
    }
}

/// Moves the foreground window into a target rectangle
#[derive(Debug)]
pub struct WindowController<W: WindowManager> {
    manager: W,
    policy: ExclusionPolicy,
    slow_call_threshold: Duration,
}

impl<W: WindowManager> WindowController<W> {
    pub fn new(manager: W, config: &ControllerConfig) -> Self {
        Self {
            manager,
            policy: ExclusionPolicy::new(&config.excluded_classes, &config.excluded_titles),
            slow_call_threshold: config.slow_call_threshold,
        }
    }

    pub fn manager(&self) -> &W {
        &self.manager
    }

    /// Places the foreground window at `target`
    ///
    /// On success exactly one window changed. On `OsRejected` the window
    /// was put back where it was, so nothing is left partially applied.
    /// Slow calls are logged, never aborted.
    pub fn apply(&self, target: Rect) -> Result<(), ControllerError> {
        let started = Instant::now();
        let result = self.place(target);

        let elapsed = started.elapsed();
        if elapsed > self.slow_call_threshold {
            tracing::warn!(?elapsed, threshold = ?self.slow_call_threshold, "slow window placement");
        }
        result
    }

    /// Rectangle of the foreground window, if there is one
    pub fn foreground_rect(&self) -> Option<Rect> {
        let window = self.manager.get_foreground_window()?;
        self.manager.get_window_rect(window).ok()
    }

    fn place(&self, target: Rect) -> Result<(), ControllerError> {
        let window = self
            .manager
            .get_foreground_window()
            .ok_or(ControllerError::NoEligibleWindow(Ineligible::NoForegroundWindow))?;

        let style = self.manager.get_window_style(window).map_err(vanished)?;
        self.policy.check(&style).map_err(ControllerError::NoEligibleWindow)?;
        let original = self.manager.get_window_rect(window).map_err(vanished)?;

        match self.manager.set_window_rect(window, target) {
            Ok(()) => {
                tracing::debug!(?window, from = ?original, to = ?target, "window placed");
                Ok(())
            }
            Err(PlatformError::InvalidWindow(_)) => Err(ControllerError::NoEligibleWindow(Ineligible::Vanished)),
            Err(error) => {
                self.roll_back(window, original, style.is_maximized);
                Err(ControllerError::OsRejected {
                    window,
                    reason: error.to_string(),
                })
            }
        }
    }

    /// Restores the original geometry and show state after a rejected placement
    fn roll_back(&self, window: WindowId, original: Rect, was_maximized: bool) {
        if was_maximized {
            tracing::debug!(?window, "re-maximizing after rejected placement");
            if let Err(error) = self.manager.maximize_window(window) {
                tracing::warn!(?window, %error, "rollback of rejected placement failed");
            }
            return;
        }

        match self.manager.get_window_rect(window) {
            Ok(current) if current == original => {}
            Ok(current) => {
                tracing::debug!(?window, ?current, ?original, "rolling back partial placement");
                if let Err(error) = self.manager.set_window_rect(window, original) {
                    tracing::warn!(?window, %error, "rollback of rejected placement failed");
                }
            }
            Err(error) => tracing::debug!(?window, %error, "window gone before rollback"),
        }
    }
}

fn vanished(_: PlatformError) -> ControllerError {
    ControllerError::NoEligibleWindow(Ineligible::Vanished)
}
