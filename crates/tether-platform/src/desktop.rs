use tether_core::input::{
    CancelReason, InputEvent, Key, KeyCode, KeyEvent, KeyState, ModifierFlags, PointerButton,
    PointerEventKind, Timestamp,
};
use tether_core::{Cursor, SystemClock, Vec2};
use winit::event::{ElementState, MouseButton, TouchPhase as WinitTouchPhase, WindowEvent};
use winit::window::CursorIcon;
use winit::keyboard::{Key as WinitKey, KeyCode as WinitKeyCode, ModifiersState, NamedKey, PhysicalKey};

use crate::common::*;

/// Turns winit window events into core input, in logical coordinates.
pub struct DesktopInput {
    clock: EventClock<SystemClock>,
    cursor: Vec2,
    modifiers: ModifierFlags,
    scale_factor: f64,
}

impl Default for DesktopInput {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl DesktopInput {
    pub fn new(scale_factor: f64) -> Self {
        Self {
            clock: EventClock::new(SystemClock),
            cursor: Vec2::ZERO,
            modifiers: ModifierFlags::empty(),
            scale_factor,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn set_scale_factor(&mut self, scale_factor: f64) {
        self.scale_factor = scale_factor;
    }

    fn logical(&self, x: f64, y: f64) -> Vec2 {
        Vec2::new((x / self.scale_factor) as f32, (y / self.scale_factor) as f32)
    }

    /// `None` for events that carry no input, and for state-only events
    /// (modifiers, scale) which are absorbed here.
    pub fn translate(&mut self, event: &WindowEvent) -> Option<InputEvent> {
        let at = self.now();
        match event {
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.scale_factor = *scale_factor;
                None
            }
            WindowEvent::ModifiersChanged(mods) => {
                self.modifiers = map_modifiers(mods.state());
                None
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = self.logical(position.x, position.y);
                Some(InputEvent::Pointer(pe_mouse(
                    PointerEventKind::Move,
                    self.cursor,
                    self.modifiers,
                    at,
                )))
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = map_button(*button)?;
                let kind = match state {
                    ElementState::Pressed => PointerEventKind::Down(button),
                    ElementState::Released => PointerEventKind::Up(button),
                };
                Some(InputEvent::Pointer(pe_mouse(kind, self.cursor, self.modifiers, at)))
            }
            WindowEvent::Touch(t) => {
                let id = touch_pointer(t.id);
                let kind = match t.phase {
                    WinitTouchPhase::Started => PointerEventKind::Down(PointerButton::Primary),
                    WinitTouchPhase::Moved => PointerEventKind::Move,
                    WinitTouchPhase::Ended => PointerEventKind::Up(PointerButton::Primary),
                    WinitTouchPhase::Cancelled => PointerEventKind::Cancel(CancelReason::Contact(id)),
                };
                let pressure = t.force.map(|f| f.normalized() as f32).unwrap_or(1.0);
                Some(InputEvent::Pointer(pe_touch(
                    id,
                    kind,
                    self.logical(t.location.x, t.location.y),
                    pressure,
                    at,
                )))
            }
            WindowEvent::Focused(false) => Some(InputEvent::Pointer(pe_cancel(CancelReason::FocusLost, at))),
            WindowEvent::KeyboardInput { event, .. } => {
                let Some(key) = map_key(&event.logical_key) else {
                    log::trace!("platform: unmapped key {:?}", event.logical_key);
                    return None;
                };
                let code = match event.physical_key {
                    PhysicalKey::Code(c) => map_key_code(c),
                    PhysicalKey::Unidentified(_) => KeyCode(0),
                };
                Some(InputEvent::Key(KeyEvent {
                    key,
                    code,
                    state: match event.state {
                        ElementState::Pressed => KeyState::Down,
                        ElementState::Released => KeyState::Up,
                    },
                    modifiers: self.modifiers,
                    is_repeat: event.repeat,
                    timestamp: at,
                }))
            }
            _ => None,
        }
    }
}

pub fn map_modifiers(state: ModifiersState) -> ModifierFlags {
    let mut out = ModifierFlags::empty();
    out.set(ModifierFlags::SHIFT, state.shift_key());
    out.set(ModifierFlags::CONTROL, state.control_key());
    out.set(ModifierFlags::ALT, state.alt_key());
    out.set(ModifierFlags::META, state.super_key());
    out
}

/// `None` means hide the pointer. `Inherit` only shows up here when nothing
/// resolved it, so it falls back to the arrow.
pub fn map_cursor(cursor: Cursor) -> Option<CursorIcon> {
    Some(match cursor {
        Cursor::None => return None,
        Cursor::Inherit | Cursor::Default => CursorIcon::Default,
        Cursor::Pointer => CursorIcon::Pointer,
        Cursor::Text => CursorIcon::Text,
        Cursor::Move => CursorIcon::Move,
        Cursor::Grab => CursorIcon::Grab,
        Cursor::Grabbing => CursorIcon::Grabbing,
    })
}

pub fn map_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Primary),
        MouseButton::Right => Some(PointerButton::Secondary),
        MouseButton::Middle => Some(PointerButton::Tertiary),
        _ => None,
    }
}

pub fn map_key(key: &WinitKey) -> Option<Key> {
    match key {
        WinitKey::Character(s) => s.chars().next().map(Key::Character),
        WinitKey::Named(named) => Some(match named {
            NamedKey::Enter => Key::Enter,
            NamedKey::Tab => Key::Tab,
            NamedKey::Backspace => Key::Backspace,
            NamedKey::Delete => Key::Delete,
            NamedKey::Escape => Key::Escape,
            NamedKey::ArrowLeft => Key::ArrowLeft,
            NamedKey::ArrowRight => Key::ArrowRight,
            NamedKey::ArrowUp => Key::ArrowUp,
            NamedKey::ArrowDown => Key::ArrowDown,
            NamedKey::Home => Key::Home,
            NamedKey::End => Key::End,
            NamedKey::PageUp => Key::PageUp,
            NamedKey::PageDown => Key::PageDown,
            NamedKey::Space => Key::Space,
            NamedKey::F1 => Key::F(1),
            NamedKey::F2 => Key::F(2),
            NamedKey::F3 => Key::F(3),
            NamedKey::F4 => Key::F(4),
            NamedKey::F5 => Key::F(5),
            NamedKey::F6 => Key::F(6),
            NamedKey::F7 => Key::F(7),
            NamedKey::F8 => Key::F(8),
            NamedKey::F9 => Key::F(9),
            NamedKey::F10 => Key::F(10),
            NamedKey::F11 => Key::F(11),
            NamedKey::F12 => Key::F(12),
            _ => return None,
        }),
        _ => None,
    }
}

/// Physical keys as USB HID usage ids, so chords bound by code survive
/// keyboard layout changes. Unmapped keys become `KeyCode(0)`.
pub fn map_key_code(code: WinitKeyCode) -> KeyCode {
    use WinitKeyCode as C;
    const LETTERS: [WinitKeyCode; 26] = [
        C::KeyA, C::KeyB, C::KeyC, C::KeyD, C::KeyE, C::KeyF, C::KeyG, C::KeyH, C::KeyI,
        C::KeyJ, C::KeyK, C::KeyL, C::KeyM, C::KeyN, C::KeyO, C::KeyP, C::KeyQ, C::KeyR,
        C::KeyS, C::KeyT, C::KeyU, C::KeyV, C::KeyW, C::KeyX, C::KeyY, C::KeyZ,
    ];
    const DIGITS: [WinitKeyCode; 10] = [
        C::Digit1, C::Digit2, C::Digit3, C::Digit4, C::Digit5, C::Digit6, C::Digit7,
        C::Digit8, C::Digit9, C::Digit0,
    ];
    const FUNCTION: [WinitKeyCode; 12] = [
        C::F1, C::F2, C::F3, C::F4, C::F5, C::F6, C::F7, C::F8, C::F9, C::F10, C::F11, C::F12,
    ];

    if let Some(i) = LETTERS.iter().position(|c| *c == code) {
        return KeyCode(0x04 + i as u16);
    }
    if let Some(i) = DIGITS.iter().position(|c| *c == code) {
        return KeyCode(0x1E + i as u16);
    }
    if let Some(i) = FUNCTION.iter().position(|c| *c == code) {
        return KeyCode(0x3A + i as u16);
    }
    KeyCode(match code {
        C::Enter => 0x28,
        C::Escape => 0x29,
        C::Backspace => 0x2A,
        C::Tab => 0x2B,
        C::Space => 0x2C,
        C::Minus => 0x2D,
        C::Equal => 0x2E,
        C::BracketLeft => 0x2F,
        C::BracketRight => 0x30,
        C::Backslash => 0x31,
        C::Semicolon => 0x33,
        C::Quote => 0x34,
        C::Backquote => 0x35,
        C::Comma => 0x36,
        C::Period => 0x37,
        C::Slash => 0x38,
        C::Home => 0x4A,
        C::PageUp => 0x4B,
        C::Delete => 0x4C,
        C::End => 0x4D,
        C::PageDown => 0x4E,
        C::ArrowRight => 0x4F,
        C::ArrowLeft => 0x50,
        C::ArrowDown => 0x51,
        C::ArrowUp => 0x52,
        _ => 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_and_character_keys() {
        assert_eq!(map_key(&WinitKey::Named(NamedKey::ArrowLeft)), Some(Key::ArrowLeft));
        assert_eq!(map_key(&WinitKey::Named(NamedKey::F5)), Some(Key::F(5)));
        assert_eq!(map_key(&WinitKey::Character("K".into())), Some(Key::Character('K')));
        assert_eq!(map_key(&WinitKey::Named(NamedKey::CapsLock)), None);
    }

    #[test]
    fn key_codes_follow_hid_usage() {
        assert_eq!(map_key_code(WinitKeyCode::KeyA), KeyCode(0x04));
        assert_eq!(map_key_code(WinitKeyCode::KeyK), KeyCode(0x0E));
        assert_eq!(map_key_code(WinitKeyCode::Digit0), KeyCode(0x27));
        assert_eq!(map_key_code(WinitKeyCode::F12), KeyCode(0x45));
        assert_eq!(map_key_code(WinitKeyCode::ArrowUp), KeyCode(0x52));
        assert_eq!(map_key_code(WinitKeyCode::NumLock), KeyCode(0));
    }

    #[test]
    fn cursors() {
        assert_eq!(map_cursor(Cursor::Pointer), Some(CursorIcon::Pointer));
        assert_eq!(map_cursor(Cursor::Inherit), Some(CursorIcon::Default));
        assert_eq!(map_cursor(Cursor::None), None);
    }

    #[test]
    fn modifiers() {
        let flags = map_modifiers(ModifiersState::SHIFT | ModifiersState::SUPER);
        assert_eq!(flags, ModifierFlags::SHIFT | ModifierFlags::META);
    }

    #[test]
    fn focus_loss_cancels_everything() {
        let mut input = DesktopInput::new(2.0);
        let Some(InputEvent::Pointer(pe)) = input.translate(&WindowEvent::Focused(false)) else {
            panic!("expected a pointer event");
        };
        assert_eq!(pe.event, PointerEventKind::Cancel(CancelReason::FocusLost));
        assert!(input.translate(&WindowEvent::Focused(true)).is_none());
    }
}
