/*
 *  themes/catalog.rs
 *
 *  LyRing - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Theme catalog and the shared selection both control loops read
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use log::{info, warn};
use serde_json::Value;
use std::sync::RwLock;

use super::{prepare_theme, BreatheTheme, OrbitTheme, PulseTheme, Settings, Theme, ThemeError};

const THEMES: [&str; 3] = ["pulse", "orbit", "breathe"];

/// Theme used when nothing else is selected or the selection is unusable.
pub const DEFAULT_THEME: &str = "pulse";

pub fn available_themes() -> &'static [&'static str] {
    &THEMES
}

/// Builds and configures the named theme from the opaque settings map.
pub fn build_theme(name: &str, settings: &Settings) -> Result<Box<dyn Theme>, ThemeError> {
    let theme: Box<dyn Theme> = match name {
        "pulse" => Box::new(PulseTheme::from_settings(settings)?),
        "orbit" => Box::new(OrbitTheme::from_settings(settings)?),
        "breathe" => Box::new(BreatheTheme::from_settings(settings)?),
        other => return Err(ThemeError::Unknown(other.to_string())),
    };
    Ok(theme)
}

/// Snapshot of the shared selection; `generation` bumps on every change.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeSelection {
    pub name: String,
    pub settings: Settings,
    pub generation: u64,
}

/// Selected theme and its settings, shared by every control loop.
///
/// Loops poll [`ThemeManager::generation`] each tick and rebuild their
/// theme (and sequencer) when it moves.
#[derive(Debug)]
pub struct ThemeManager {
    inner: RwLock<ThemeSelection>,
}

impl ThemeManager {
    pub fn new(name: &str, settings: Settings) -> Self {
        Self {
            inner: RwLock::new(ThemeSelection {
                name: name.to_string(),
                settings,
                generation: 0,
            }),
        }
    }

    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    pub fn snapshot(&self) -> ThemeSelection {
        self.read().clone()
    }

    /// Builds the currently selected theme, returning the generation it belongs to.
    pub fn build_active(&self) -> (u64, Result<Box<dyn Theme>, ThemeError>) {
        let sel = self.snapshot();
        (sel.generation, build_theme(&sel.name, &sel.settings))
    }

    /// Checks that the selection activates; otherwise falls back to
    /// [`DEFAULT_THEME`] with empty settings. Returns the rejection, if any.
    pub fn ensure_valid(&self) -> Option<ThemeError> {
        let sel = self.snapshot();
        let err = build_theme(&sel.name, &sel.settings)
            .and_then(|theme| prepare_theme(theme.as_ref()).map(|_| ()))
            .err()?;
        warn!("Theme '{}' rejected, falling back to '{}': {}", sel.name, DEFAULT_THEME, err);
        let mut sel = self.write();
        sel.name = DEFAULT_THEME.to_string();
        sel.settings = Settings::new();
        sel.generation += 1;
        Some(err)
    }

    pub fn select_theme(&self, name: &str) {
        let mut sel = self.write();
        if sel.name != name {
            info!("Theme selected: {} -> {}", sel.name, name);
            sel.name = name.to_string();
            sel.generation += 1;
        }
    }

    /// Replaces the whole settings map (settings-changed notification).
    pub fn replace_settings(&self, settings: Settings) {
        let mut sel = self.write();
        if sel.settings != settings {
            sel.settings = settings;
            sel.generation += 1;
            info!("Theme settings replaced (generation {})", sel.generation);
        }
    }

    pub fn set_setting(&self, key: &str, value: Value) {
        let mut sel = self.write();
        if sel.settings.get(key) != Some(&value) {
            sel.settings.insert(key.to_string(), value);
            sel.generation += 1;
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, ThemeSelection> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, ThemeSelection> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
