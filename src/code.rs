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

//! Semantic input codes, phases and devices.
//!
//! Codes are the names used in pack manifests. They are independent of any
//! platform scan code so that packs are portable between operating systems.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The device class an input code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    Keyboard,
    Mouse,
}

/// Whether an event is a press or a release.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Down,
    Up,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Down => "down",
            Phase::Up => "up",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a known input code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown input code '{0}'")]
pub struct UnknownCode(pub String);

macro_rules! codes {
    ($($variant:ident => $name:literal, $device:ident;)*) => {
        /// A semantic input code, e.g. `KeyA` or `MouseLeft`.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Code {
            $($variant,)*
        }

        impl Code {
            /// Every known code, in catalogue order.
            pub const ALL: &'static [Code] = &[$(Code::$variant,)*];

            /// The manifest name of this code.
            pub fn name(self) -> &'static str {
                match self {
                    $(Code::$variant => $name,)*
                }
            }

            /// The device class this code belongs to.
            pub fn device(self) -> Device {
                match self {
                    $(Code::$variant => Device::$device,)*
                }
            }
        }

        impl FromStr for Code {
            type Err = UnknownCode;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Code::$variant),)*
                    _ => Err(UnknownCode(s.to_string())),
                }
            }
        }
    };
}

codes! {
    Backquote => "Backquote", Keyboard;
    Digit1 => "Digit1", Keyboard;
    Digit2 => "Digit2", Keyboard;
    Digit3 => "Digit3", Keyboard;
    Digit4 => "Digit4", Keyboard;
    Digit5 => "Digit5", Keyboard;
    Digit6 => "Digit6", Keyboard;
    Digit7 => "Digit7", Keyboard;
    Digit8 => "Digit8", Keyboard;
    Digit9 => "Digit9", Keyboard;
    Digit0 => "Digit0", Keyboard;
    Minus => "Minus", Keyboard;
    Equal => "Equal", Keyboard;
    Backspace => "Backspace", Keyboard;
    Tab => "Tab", Keyboard;
    KeyQ => "KeyQ", Keyboard;
    KeyW => "KeyW", Keyboard;
    KeyE => "KeyE", Keyboard;
    KeyR => "KeyR", Keyboard;
    KeyT => "KeyT", Keyboard;
    KeyY => "KeyY", Keyboard;
    KeyU => "KeyU", Keyboard;
    KeyI => "KeyI", Keyboard;
    KeyO => "KeyO", Keyboard;
    KeyP => "KeyP", Keyboard;
    BracketLeft => "BracketLeft", Keyboard;
    BracketRight => "BracketRight", Keyboard;
    Backslash => "Backslash", Keyboard;
    CapsLock => "CapsLock", Keyboard;
    KeyA => "KeyA", Keyboard;
    KeyS => "KeyS", Keyboard;
    KeyD => "KeyD", Keyboard;
    KeyF => "KeyF", Keyboard;
    KeyG => "KeyG", Keyboard;
    KeyH => "KeyH", Keyboard;
    KeyJ => "KeyJ", Keyboard;
    KeyK => "KeyK", Keyboard;
    KeyL => "KeyL", Keyboard;
    Semicolon => "Semicolon", Keyboard;
    Quote => "Quote", Keyboard;
    Enter => "Enter", Keyboard;
    ShiftLeft => "ShiftLeft", Keyboard;
    IntlBackslash => "IntlBackslash", Keyboard;
    KeyZ => "KeyZ", Keyboard;
    KeyX => "KeyX", Keyboard;
    KeyC => "KeyC", Keyboard;
    KeyV => "KeyV", Keyboard;
    KeyB => "KeyB", Keyboard;
    KeyN => "KeyN", Keyboard;
    KeyM => "KeyM", Keyboard;
    Comma => "Comma", Keyboard;
    Period => "Period", Keyboard;
    Slash => "Slash", Keyboard;
    ShiftRight => "ShiftRight", Keyboard;
    ControlLeft => "ControlLeft", Keyboard;
    MetaLeft => "MetaLeft", Keyboard;
    AltLeft => "AltLeft", Keyboard;
    Space => "Space", Keyboard;
    AltRight => "AltRight", Keyboard;
    MetaRight => "MetaRight", Keyboard;
    ControlRight => "ControlRight", Keyboard;
    Fn => "Fn", Keyboard;
    Escape => "Escape", Keyboard;
    F1 => "F1", Keyboard;
    F2 => "F2", Keyboard;
    F3 => "F3", Keyboard;
    F4 => "F4", Keyboard;
    F5 => "F5", Keyboard;
    F6 => "F6", Keyboard;
    F7 => "F7", Keyboard;
    F8 => "F8", Keyboard;
    F9 => "F9", Keyboard;
    F10 => "F10", Keyboard;
    F11 => "F11", Keyboard;
    F12 => "F12", Keyboard;
    PrintScreen => "PrintScreen", Keyboard;
    ScrollLock => "ScrollLock", Keyboard;
    Pause => "Pause", Keyboard;
    Insert => "Insert", Keyboard;
    Delete => "Delete", Keyboard;
    Home => "Home", Keyboard;
    End => "End", Keyboard;
    PageUp => "PageUp", Keyboard;
    PageDown => "PageDown", Keyboard;
    ArrowUp => "ArrowUp", Keyboard;
    ArrowDown => "ArrowDown", Keyboard;
    ArrowLeft => "ArrowLeft", Keyboard;
    ArrowRight => "ArrowRight", Keyboard;
    NumLock => "NumLock", Keyboard;
    NumpadDivide => "NumpadDivide", Keyboard;
    NumpadMultiply => "NumpadMultiply", Keyboard;
    NumpadSubtract => "NumpadSubtract", Keyboard;
    NumpadAdd => "NumpadAdd", Keyboard;
    NumpadEnter => "NumpadEnter", Keyboard;
    NumpadDecimal => "NumpadDecimal", Keyboard;
    Numpad0 => "Numpad0", Keyboard;
    Numpad1 => "Numpad1", Keyboard;
    Numpad2 => "Numpad2", Keyboard;
    Numpad3 => "Numpad3", Keyboard;
    Numpad4 => "Numpad4", Keyboard;
    Numpad5 => "Numpad5", Keyboard;
    Numpad6 => "Numpad6", Keyboard;
    Numpad7 => "Numpad7", Keyboard;
    Numpad8 => "Numpad8", Keyboard;
    Numpad9 => "Numpad9", Keyboard;
    MouseLeft => "MouseLeft", Mouse;
    MouseRight => "MouseRight", Mouse;
    MouseMiddle => "MouseMiddle", Mouse;
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
