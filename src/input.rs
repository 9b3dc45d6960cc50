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

//! Normalizes raw keyboard and mouse events into playback requests.

#[cfg(feature = "listen")]
pub mod listen;

use std::collections::HashSet;
use std::time::SystemTime;

use tracing::trace;

use crate::code::{Code, Device, Phase};
use crate::state::ToggleState;

/// A key as reported by the OS hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawKey {
    Key(Code),
    Unknown(u32),
}

/// A pointer button as reported by the OS hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawButton {
    Left,
    Right,
    Middle,
    Unknown(u8),
}

impl RawButton {
    fn code(self) -> Option<Code> {
        match self {
            RawButton::Left => Some(Code::MouseLeft),
            RawButton::Right => Some(Code::MouseRight),
            RawButton::Middle => Some(Code::MouseMiddle),
            RawButton::Unknown(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawInput {
    KeyPress(RawKey),
    KeyRelease(RawKey),
    ButtonPress(RawButton),
    ButtonRelease(RawButton),
    MouseMove { x: f64, y: f64 },
    Wheel { delta_x: i64, delta_y: i64 },
}

/// An input event from the OS hook.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawEvent {
    pub input: RawInput,
    pub time: SystemTime,
}

impl RawEvent {
    pub fn now(input: RawInput) -> RawEvent {
        RawEvent {
            input,
            time: SystemTime::now(),
        }
    }
}

/// A normalized request to play the sound for one (code, phase).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackRequest {
    pub code: Code,
    pub phase: Phase,
    pub device: Device,
    pub time: SystemTime,
}

impl PlaybackRequest {
    pub fn new(code: Code, phase: Phase) -> PlaybackRequest {
        PlaybackRequest {
            code,
            phase,
            device: code.device(),
            time: SystemTime::now(),
        }
    }
}

/// Turns raw events into playback requests. Only the input thread uses it.
#[derive(Debug, Default)]
pub struct InputRouter {
    /// Ignore presses of keys that are already held.
    suppress_repeats: bool,
    /// Codes currently held down.
    held: HashSet<Code>,
}

impl InputRouter {
    pub fn new(suppress_repeats: bool) -> InputRouter {
        InputRouter {
            suppress_repeats,
            held: HashSet::new(),
        }
    }

    /// Returns the playback request for `event`, or None if it should make no sound.
    pub fn handle(&mut self, event: &RawEvent, toggles: &ToggleState) -> Option<PlaybackRequest> {
        let (code, phase) = match event.input {
            RawInput::KeyPress(RawKey::Key(code)) => (code, Phase::Down),
            RawInput::KeyRelease(RawKey::Key(code)) => (code, Phase::Up),
            RawInput::ButtonPress(button) => (button.code()?, Phase::Down),
            RawInput::ButtonRelease(button) => (button.code()?, Phase::Up),
            RawInput::KeyPress(RawKey::Unknown(raw)) | RawInput::KeyRelease(RawKey::Unknown(raw)) => {
                trace!(raw, "Ignoring unknown key");
                return None;
            }
            RawInput::MouseMove { .. } | RawInput::Wheel { .. } => return None,
        };

        // Held state tracks the hardware, whatever the toggles say.
        let repeat = match phase {
            Phase::Down => !self.held.insert(code),
            Phase::Up => {
                self.held.remove(&code);
                false
            }
        };

        let device = code.device();
        if device == Device::Mouse && !toggles.mouse_sounds_enabled {
            return None;
        }
        if repeat && self.suppress_repeats {
            trace!(code = %code, "Ignoring auto-repeat");
            return None;
        }

        Some(PlaybackRequest {
            code,
            phase,
            device,
            time: event.time,
        })
    }

    /// Number of codes currently held.
    pub fn held_count(&self) -> usize {
        self.held.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: Code) -> RawEvent {
        RawEvent::now(RawInput::KeyPress(RawKey::Key(code)))
    }

    fn release(code: Code) -> RawEvent {
        RawEvent::now(RawInput::KeyRelease(RawKey::Key(code)))
    }

    #[test]
    fn test_keys() {
        let mut router = InputRouter::new(true);
        let toggles = ToggleState::default();

        let request = router.handle(&press(Code::KeyA), &toggles).unwrap();
        assert_eq!(Code::KeyA, request.code);
        assert_eq!(Phase::Down, request.phase);
        assert_eq!(Device::Keyboard, request.device);

        let request = router.handle(&release(Code::KeyA), &toggles).unwrap();
        assert_eq!(Phase::Up, request.phase);
    }

    #[test]
    fn test_request_keeps_event_time() {
        let mut router = InputRouter::new(true);
        let event = press(Code::Space);
        let request = router.handle(&event, &ToggleState::default()).unwrap();
        assert_eq!(event.time, request.time);
    }

    #[test]
    fn test_ignored_events() {
        let mut router = InputRouter::new(true);
        let toggles = ToggleState::default();

        for input in [
            RawInput::KeyPress(RawKey::Unknown(0xfff)),
            RawInput::KeyRelease(RawKey::Unknown(0xfff)),
            RawInput::ButtonPress(RawButton::Unknown(8)),
            RawInput::ButtonRelease(RawButton::Unknown(8)),
            RawInput::MouseMove { x: 10.0, y: 20.0 },
            RawInput::Wheel {
                delta_x: 0,
                delta_y: -1,
            },
        ] {
            assert!(router.handle(&RawEvent::now(input), &toggles).is_none());
        }
    }

    #[test]
    fn test_mouse_buttons() {
        let mut router = InputRouter::new(true);
        let toggles = ToggleState::default();

        for (button, code) in [
            (RawButton::Left, Code::MouseLeft),
            (RawButton::Right, Code::MouseRight),
            (RawButton::Middle, Code::MouseMiddle),
        ] {
            let request = router
                .handle(&RawEvent::now(RawInput::ButtonPress(button)), &toggles)
                .unwrap();
            assert_eq!(code, request.code);
            assert_eq!(Device::Mouse, request.device);
        }
    }

    #[test]
    fn test_mouse_sounds_disabled() {
        let mut router = InputRouter::new(true);
        let toggles = ToggleState {
            mouse_sounds_enabled: false,
            ..Default::default()
        };

        assert!(router
            .handle(&RawEvent::now(RawInput::ButtonPress(RawButton::Left)), &toggles)
            .is_none());
        assert!(router
            .handle(&RawEvent::now(RawInput::ButtonRelease(RawButton::Left)), &toggles)
            .is_none());
        // Keyboard is unaffected.
        assert!(router.handle(&press(Code::KeyA), &toggles).is_some());
    }

    #[test]
    fn test_repeat_suppression() {
        let mut router = InputRouter::new(true);
        let toggles = ToggleState::default();

        assert!(router.handle(&press(Code::KeyA), &toggles).is_some());
        assert!(router.handle(&press(Code::KeyA), &toggles).is_none());
        assert!(router.handle(&press(Code::KeyA), &toggles).is_none());
        // Other keys are independent.
        assert!(router.handle(&press(Code::KeyB), &toggles).is_some());
        assert_eq!(2, router.held_count());

        assert!(router.handle(&release(Code::KeyA), &toggles).is_some());
        assert!(router.handle(&press(Code::KeyA), &toggles).is_some());
    }

    #[test]
    fn test_repeats_allowed() {
        let mut router = InputRouter::new(false);
        let toggles = ToggleState::default();

        assert!(router.handle(&press(Code::KeyA), &toggles).is_some());
        assert!(router.handle(&press(Code::KeyA), &toggles).is_some());
    }

    #[test]
    fn test_release_without_press() {
        let mut router = InputRouter::new(true);
        assert!(router
            .handle(&release(Code::Enter), &ToggleState::default())
            .is_some());
        assert_eq!(0, router.held_count());
    }

    #[test]
    fn test_mouse_toggle_while_button_held() {
        let mut router = InputRouter::new(true);
        let on = ToggleState::default();
        let off = ToggleState {
            mouse_sounds_enabled: false,
            ..Default::default()
        };
        let left_press = RawEvent::now(RawInput::ButtonPress(RawButton::Left));
        let left_release = RawEvent::now(RawInput::ButtonRelease(RawButton::Left));

        assert!(router.handle(&left_press, &on).is_some());
        assert!(router.handle(&left_release, &off).is_none());
        assert_eq!(0, router.held_count());

        // The next real click plays once mouse sounds are back on.
        assert!(router.handle(&left_press, &on).is_some());
    }
}
