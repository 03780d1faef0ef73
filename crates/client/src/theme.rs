//! Light/dark theme preference.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::storage::Storage;

/// Storage key of the saved preference.
pub const THEME_KEY: &str = "theme";

/// A concrete theme to render with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

/// What the shopper chose. `System` follows the platform setting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThemePreference {
    Light,
    Dark,
    #[default]
    System,
}

impl ThemePreference {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }

    /// The theme to render, given whether the platform prefers dark.
    #[must_use]
    pub const fn resolve(self, system_prefers_dark: bool) -> Theme {
        match self {
            Self::Light => Theme::Light,
            Self::Dark => Theme::Dark,
            Self::System if system_prefers_dark => Theme::Dark,
            Self::System => Theme::Light,
        }
    }
}

impl fmt::Display for ThemePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A saved or requested theme name that is not `light`, `dark` or `system`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown theme: {0}")]
pub struct UnknownTheme(pub String);

impl FromStr for ThemePreference {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "system" => Ok(Self::System),
            other => Err(UnknownTheme(other.to_owned())),
        }
    }
}

/// The theme preference, persisted through `S`.
pub struct ThemeStore<S: Storage> {
    preference: ThemePreference,
    storage: S,
}

impl<S: Storage> ThemeStore<S> {
    /// Restore the saved preference, falling back to `System`.
    pub fn load(storage: S) -> Self {
        let preference = storage
            .get(THEME_KEY)
            .ok()
            .flatten()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default();
        Self {
            preference,
            storage,
        }
    }

    #[must_use]
    pub const fn preference(&self) -> ThemePreference {
        self.preference
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Save an explicit preference.
    pub fn set(&mut self, preference: ThemePreference) {
        self.preference = preference;
        if let Err(e) = self.storage.set(THEME_KEY, preference.as_str()) {
            tracing::warn!(error = %e, "Failed to persist theme");
        }
    }

    /// Switch to the opposite of what is currently shown and remember it.
    pub fn toggle(&mut self, system_prefers_dark: bool) -> Theme {
        let next = match self.preference.resolve(system_prefers_dark) {
            Theme::Light => ThemePreference::Dark,
            Theme::Dark => ThemePreference::Light,
        };
        self.set(next);
        next.resolve(system_prefers_dark)
    }
}
