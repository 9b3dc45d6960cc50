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

//! Runtime toggles shared between the control surface and the input thread.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use tracing::info;

/// A point-in-time copy of the toggles, read once per input event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToggleState {
    pub muted: bool,
    pub keyup_enabled: bool,
    pub mouse_sounds_enabled: bool,
    pub random_sounds_enabled: bool,
    /// Master volume, 0.0 to 1.0.
    pub volume: f32,
}

impl Default for ToggleState {
    fn default() -> Self {
        ToggleState {
            muted: false,
            keyup_enabled: true,
            mouse_sounds_enabled: true,
            random_sounds_enabled: true,
            volume: 1.0,
        }
    }
}

/// The toggle set. Every field is independently atomic, so a writer on one
/// thread never observes or clobbers a concurrent write to another field.
#[derive(Debug)]
pub struct ConfigState {
    muted: AtomicBool,
    keyup_enabled: AtomicBool,
    mouse_sounds_enabled: AtomicBool,
    random_sounds_enabled: AtomicBool,
    /// f32 bits.
    volume: AtomicU32,
}

impl ConfigState {
    /// Creates the toggle set from an initial snapshot.
    pub fn new(initial: ToggleState) -> ConfigState {
        ConfigState {
            muted: AtomicBool::new(initial.muted),
            keyup_enabled: AtomicBool::new(initial.keyup_enabled),
            mouse_sounds_enabled: AtomicBool::new(initial.mouse_sounds_enabled),
            random_sounds_enabled: AtomicBool::new(initial.random_sounds_enabled),
            volume: AtomicU32::new(clamp_volume(initial.volume).to_bits()),
        }
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Release);
        info!(muted, "Mute toggled");
    }

    pub fn set_keyup_enabled(&self, enabled: bool) {
        self.keyup_enabled.store(enabled, Ordering::Release);
        info!(enabled, "Keyup sounds toggled");
    }

    pub fn set_mouse_sounds_enabled(&self, enabled: bool) {
        self.mouse_sounds_enabled.store(enabled, Ordering::Release);
        info!(enabled, "Mouse sounds toggled");
    }

    pub fn set_random_sounds_enabled(&self, enabled: bool) {
        self.random_sounds_enabled.store(enabled, Ordering::Release);
        info!(enabled, "Random sounds toggled");
    }

    /// Sets the master volume. Values outside 0.0..=1.0 are clamped, NaN is treated as 0.
    pub fn set_volume(&self, volume: f32) {
        let volume = clamp_volume(volume);
        self.volume.store(volume.to_bits(), Ordering::Release);
        info!(volume, "Volume changed");
    }

    pub fn muted(&self) -> bool {
        self.muted.load(Ordering::Acquire)
    }

    pub fn keyup_enabled(&self) -> bool {
        self.keyup_enabled.load(Ordering::Acquire)
    }

    pub fn mouse_sounds_enabled(&self) -> bool {
        self.mouse_sounds_enabled.load(Ordering::Acquire)
    }

    pub fn random_sounds_enabled(&self) -> bool {
        self.random_sounds_enabled.load(Ordering::Acquire)
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Acquire))
    }

    /// Reads every field into a snapshot.
    pub fn snapshot(&self) -> ToggleState {
        ToggleState {
            muted: self.muted(),
            keyup_enabled: self.keyup_enabled(),
            mouse_sounds_enabled: self.mouse_sounds_enabled(),
            random_sounds_enabled: self.random_sounds_enabled(),
            volume: self.volume(),
        }
    }
}

impl Default for ConfigState {
    fn default() -> Self {
        ConfigState::new(ToggleState::default())
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}
