//! Optional hotkey gate in front of gesture recognition
//!
//! With no hotkey configured every recognized gesture is applied. With one,
//! a gesture only tiles when it completes within `window` after the hotkey
//! was pressed, and each press admits a single gesture.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Modifier keys, valued as the Win32 `MOD_*` flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotkeyModifier {
    Alt = 1,
    Control = 2,
    Shift = 4,
    Windows = 8,
}

impl HotkeyModifier {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "alt" => Some(Self::Alt),
            "ctrl" | "control" => Some(Self::Control),
            "shift" => Some(Self::Shift),
            "win" | "windows" | "super" => Some(Self::Windows),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Alt => "alt",
            Self::Control => "ctrl",
            Self::Shift => "shift",
            Self::Windows => "win",
        }
    }
}

/// Non-modifier key of a hotkey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotkeyKey {
    /// An ASCII letter (stored uppercase) or digit
    Char(char),
    /// F1 through F12
    Function(u8),
    Space,
}

impl HotkeyKey {
    fn parse(token: &str) -> Option<Self> {
        if token == "space" {
            return Some(Self::Space);
        }
        if let Some(number) = token.strip_prefix('f').and_then(|rest| rest.parse::<u8>().ok()) {
            return (1..=12).contains(&number).then_some(Self::Function(number));
        }

        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphanumeric() => Some(Self::Char(c.to_ascii_uppercase())),
            _ => None,
        }
    }

    /// Win32 virtual-key code
    pub fn virtual_key(self) -> u32 {
        match self {
            // VK codes of letters and digits equal their uppercase ASCII value
            Self::Char(c) => u32::from(c),
            Self::Function(number) => 0x70 + u32::from(number) - 1,
            Self::Space => 0x20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HotkeyParseError {
    #[error("Hotkey is empty")]
    Empty,
    #[error("Unknown hotkey key '{0}'")]
    UnknownKey(String),
    #[error("Hotkey '{0}' needs at least one modifier")]
    MissingModifier(String),
    #[error("Hotkey '{0}' has more than one non-modifier key")]
    MultipleKeys(String),
}

/// Global hotkey that arms gesture capture, written like `ctrl+alt+g`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArmHotkey {
    modifiers: Vec<HotkeyModifier>,
    key: HotkeyKey,
}

impl ArmHotkey {
    pub fn parse(text: &str) -> Result<Self, HotkeyParseError> {
        let normalized = text.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(HotkeyParseError::Empty);
        }

        let mut modifiers = Vec::new();
        let mut key = None;
        for token in normalized.split('+').map(str::trim) {
            if let Some(modifier) = HotkeyModifier::parse(token) {
                if !modifiers.contains(&modifier) {
                    modifiers.push(modifier);
                }
                continue;
            }
            let parsed = HotkeyKey::parse(token).ok_or_else(|| HotkeyParseError::UnknownKey(token.to_string()))?;
            if key.replace(parsed).is_some() {
                return Err(HotkeyParseError::MultipleKeys(text.to_string()));
            }
        }

        let key = key.ok_or_else(|| HotkeyParseError::UnknownKey(normalized.clone()))?;
        // A bare key would be swallowed from every application
        if modifiers.is_empty() {
            return Err(HotkeyParseError::MissingModifier(text.to_string()));
        }
        Ok(Self { modifiers, key })
    }

    pub fn key(&self) -> HotkeyKey {
        self.key
    }

    /// Modifiers OR-ed together as Win32 `MOD_*` flags
    pub fn modifier_mask(&self) -> u32 {
        self.modifiers.iter().fold(0, |mask, &modifier| mask | modifier as u32)
    }
}

impl fmt::Display for ArmHotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{}+", modifier.label())?;
        }
        match self.key {
            HotkeyKey::Char(c) => write!(f, "{}", c.to_ascii_lowercase()),
            HotkeyKey::Function(number) => write!(f, "f{number}"),
            HotkeyKey::Space => write!(f, "space"),
        }
    }
}

impl TryFrom<String> for ArmHotkey {
    type Error = HotkeyParseError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Self::parse(&text)
    }
}

impl From<ArmHotkey> for String {
    fn from(hotkey: ArmHotkey) -> Self {
        hotkey.to_string()
    }
}

/// Hotkey gate settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ArmingConfig {
    /// No hotkey means gestures are always live
    pub hotkey: Option<ArmHotkey>,
    /// How long after the hotkey press a gesture may complete
    #[serde(with = "super::tiler::millis")]
    pub window: Duration,
}

impl ArmingConfig {
    pub const DEFAULT_WINDOW: Duration = Duration::from_millis(1000);
    pub const MIN_WINDOW: Duration = Duration::from_millis(100);
    pub const MAX_WINDOW: Duration = Duration::from_secs(30);
}

impl Default for ArmingConfig {
    fn default() -> Self {
        Self {
            hotkey: None,
            window: Self::DEFAULT_WINDOW,
        }
    }
}
