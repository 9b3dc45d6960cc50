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

//! The OS input hook, via rdev.

use std::error::Error;
use std::sync::Arc;
use std::thread;

use rdev::{Button, EventType, Key};
use tracing::{debug, info, span, Level};

use super::{RawButton, RawEvent, RawInput, RawKey};
use crate::code::Code;
use crate::keysound::Keysound;

impl From<rdev::Event> for RawEvent {
    fn from(event: rdev::Event) -> Self {
        let input = match event.event_type {
            EventType::KeyPress(key) => RawInput::KeyPress(raw_key(key)),
            EventType::KeyRelease(key) => RawInput::KeyRelease(raw_key(key)),
            EventType::ButtonPress(button) => RawInput::ButtonPress(raw_button(button)),
            EventType::ButtonRelease(button) => RawInput::ButtonRelease(raw_button(button)),
            EventType::MouseMove { x, y } => RawInput::MouseMove { x, y },
            EventType::Wheel { delta_x, delta_y } => RawInput::Wheel { delta_x, delta_y },
        };
        RawEvent {
            input,
            time: event.time,
        }
    }
}

fn raw_button(button: Button) -> RawButton {
    match button {
        Button::Left => RawButton::Left,
        Button::Right => RawButton::Right,
        Button::Middle => RawButton::Middle,
        Button::Unknown(raw) => RawButton::Unknown(raw),
    }
}

fn raw_key(key: Key) -> RawKey {
    let code = match key {
        Key::Alt => Code::AltLeft,
        Key::AltGr => Code::AltRight,
        Key::Backspace => Code::Backspace,
        Key::CapsLock => Code::CapsLock,
        Key::ControlLeft => Code::ControlLeft,
        Key::ControlRight => Code::ControlRight,
        Key::Delete => Code::Delete,
        Key::DownArrow => Code::ArrowDown,
        Key::End => Code::End,
        Key::Escape => Code::Escape,
        Key::F1 => Code::F1,
        Key::F2 => Code::F2,
        Key::F3 => Code::F3,
        Key::F4 => Code::F4,
        Key::F5 => Code::F5,
        Key::F6 => Code::F6,
        Key::F7 => Code::F7,
        Key::F8 => Code::F8,
        Key::F9 => Code::F9,
        Key::F10 => Code::F10,
        Key::F11 => Code::F11,
        Key::F12 => Code::F12,
        Key::Home => Code::Home,
        Key::LeftArrow => Code::ArrowLeft,
        Key::MetaLeft => Code::MetaLeft,
        Key::MetaRight => Code::MetaRight,
        Key::PageDown => Code::PageDown,
        Key::PageUp => Code::PageUp,
        Key::Return => Code::Enter,
        Key::RightArrow => Code::ArrowRight,
        Key::ShiftLeft => Code::ShiftLeft,
        Key::ShiftRight => Code::ShiftRight,
        Key::Space => Code::Space,
        Key::Tab => Code::Tab,
        Key::UpArrow => Code::ArrowUp,
        Key::PrintScreen => Code::PrintScreen,
        Key::ScrollLock => Code::ScrollLock,
        Key::Pause => Code::Pause,
        Key::NumLock => Code::NumLock,
        Key::BackQuote => Code::Backquote,
        Key::Num1 => Code::Digit1,
        Key::Num2 => Code::Digit2,
        Key::Num3 => Code::Digit3,
        Key::Num4 => Code::Digit4,
        Key::Num5 => Code::Digit5,
        Key::Num6 => Code::Digit6,
        Key::Num7 => Code::Digit7,
        Key::Num8 => Code::Digit8,
        Key::Num9 => Code::Digit9,
        Key::Num0 => Code::Digit0,
        Key::Minus => Code::Minus,
        Key::Equal => Code::Equal,
        Key::KeyQ => Code::KeyQ,
        Key::KeyW => Code::KeyW,
        Key::KeyE => Code::KeyE,
        Key::KeyR => Code::KeyR,
        Key::KeyT => Code::KeyT,
        Key::KeyY => Code::KeyY,
        Key::KeyU => Code::KeyU,
        Key::KeyI => Code::KeyI,
        Key::KeyO => Code::KeyO,
        Key::KeyP => Code::KeyP,
        Key::LeftBracket => Code::BracketLeft,
        Key::RightBracket => Code::BracketRight,
        Key::KeyA => Code::KeyA,
        Key::KeyS => Code::KeyS,
        Key::KeyD => Code::KeyD,
        Key::KeyF => Code::KeyF,
        Key::KeyG => Code::KeyG,
        Key::KeyH => Code::KeyH,
        Key::KeyJ => Code::KeyJ,
        Key::KeyK => Code::KeyK,
        Key::KeyL => Code::KeyL,
        Key::SemiColon => Code::Semicolon,
        Key::Quote => Code::Quote,
        Key::BackSlash => Code::Backslash,
        Key::IntlBackslash => Code::IntlBackslash,
        Key::KeyZ => Code::KeyZ,
        Key::KeyX => Code::KeyX,
        Key::KeyC => Code::KeyC,
        Key::KeyV => Code::KeyV,
        Key::KeyB => Code::KeyB,
        Key::KeyN => Code::KeyN,
        Key::KeyM => Code::KeyM,
        Key::Comma => Code::Comma,
        Key::Dot => Code::Period,
        Key::Slash => Code::Slash,
        Key::Insert => Code::Insert,
        Key::KpReturn => Code::NumpadEnter,
        Key::KpMinus => Code::NumpadSubtract,
        Key::KpPlus => Code::NumpadAdd,
        Key::KpMultiply => Code::NumpadMultiply,
        Key::KpDivide => Code::NumpadDivide,
        Key::Kp0 => Code::Numpad0,
        Key::Kp1 => Code::Numpad1,
        Key::Kp2 => Code::Numpad2,
        Key::Kp3 => Code::Numpad3,
        Key::Kp4 => Code::Numpad4,
        Key::Kp5 => Code::Numpad5,
        Key::Kp6 => Code::Numpad6,
        Key::Kp7 => Code::Numpad7,
        Key::Kp8 => Code::Numpad8,
        Key::Kp9 => Code::Numpad9,
        Key::KpDelete => Code::NumpadDecimal,
        Key::Function => Code::Fn,
        Key::Unknown(raw) => return RawKey::Unknown(raw),
    };
    RawKey::Key(code)
}

/// Runs the OS input hook on the calling thread, feeding every event to
/// `keysound`. Events are handled on a separate thread so the hook callback
/// returns immediately. Returns only if the hook fails.
pub fn listen(keysound: Arc<Keysound>) -> Result<(), Box<dyn Error>> {
    let (sender, receiver) = crossbeam_channel::unbounded::<RawEvent>();

    let handler = thread::spawn(move || {
        let span = span!(Level::INFO, "input handler");
        let _enter = span.enter();

        for event in receiver {
            let outcome = keysound.handle_raw(&event);
            debug!(?outcome, "Handled input event");
        }
    });

    info!("Listening for input events");
    let result = rdev::listen(move |event| {
        let _ = sender.send(RawEvent::from(event));
    });

    // rdev keeps the callback (and the sender) alive, so the handler never ends.
    drop(handler);
    result.map_err(|e| format!("input hook failed: {:?}", e).into())
}
