// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use config::{Config, File};
use duration_string::DurationString;
use serde::Deserialize;

use super::error::ConfigError;
use crate::audio::DEFAULT_MAX_VOICES;
use crate::state::ToggleState;

const DEFAULT_WATCH_DEBOUNCE: Duration = Duration::from_millis(250);

/// A YAML representation of the settings file.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Settings {
    /// The output device. The default output device when unset.
    device: Option<String>,

    /// Master volume, 0.0 to 1.0 (default: 1.0).
    volume: Option<f32>,

    /// Start muted (default: false).
    muted: Option<bool>,

    /// Play release sounds (default: true).
    keyup: Option<bool>,

    /// Play mouse button sounds (default: true).
    mouse_sounds: Option<bool>,

    /// Pick a random variant per press (default: true).
    random_sounds: Option<bool>,

    /// Ignore auto-repeat presses of held keys (default: true).
    suppress_repeats: Option<bool>,

    /// Maximum voices playing at once (default: 32).
    max_voices: Option<usize>,

    /// The pack to load at startup.
    pack: Option<PathBuf>,

    /// Reload the pack when its files change (default: false).
    watch: Option<bool>,

    /// How long the watcher waits for changes to settle (default: 250ms).
    watch_debounce: Option<String>,
}

impl Settings {
    /// Parses settings from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Settings, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Settings>()?)
    }

    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    /// The initial toggles described by these settings.
    pub fn toggles(&self) -> ToggleState {
        let defaults = ToggleState::default();
        ToggleState {
            muted: self.muted.unwrap_or(defaults.muted),
            keyup_enabled: self.keyup.unwrap_or(defaults.keyup_enabled),
            mouse_sounds_enabled: self.mouse_sounds.unwrap_or(defaults.mouse_sounds_enabled),
            random_sounds_enabled: self.random_sounds.unwrap_or(defaults.random_sounds_enabled),
            volume: self.volume.unwrap_or(defaults.volume),
        }
    }

    pub fn suppress_repeats(&self) -> bool {
        self.suppress_repeats.unwrap_or(true)
    }

    pub fn max_voices(&self) -> usize {
        self.max_voices.unwrap_or(DEFAULT_MAX_VOICES).max(1)
    }

    pub fn pack(&self) -> Option<&Path> {
        self.pack.as_deref()
    }

    pub fn watch(&self) -> bool {
        self.watch.unwrap_or(false)
    }

    pub fn watch_debounce(&self) -> Result<Duration, ConfigError> {
        match &self.watch_debounce {
            Some(debounce) => Ok(DurationString::from_string(debounce.clone())
                .map_err(|_| ConfigError::InvalidDuration {
                    field: "watch_debounce",
                    value: debounce.clone(),
                })?
                .into()),
            None => Ok(DEFAULT_WATCH_DEBOUNCE),
        }
    }

    /// Overrides the startup pack.
    pub fn with_pack(mut self, pack: PathBuf) -> Settings {
        self.pack = Some(pack);
        self
    }

    /// Overrides the watch setting.
    pub fn with_watch(mut self, watch: bool) -> Settings {
        self.watch = Some(watch);
        self
    }
}
