use std::time::Duration;

use bitflags::bitflags;

use crate::Vec2;
use crate::view::ViewTag;

/// Time since the host's epoch. Platform layers convert their native event
/// times into this before handing events to the core.
pub type Timestamp = Duration;

/// Platform identity of a physical contact (finger, pen, mouse button
/// sequence). Used only to correlate down/move/up of the same contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointerId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PointerKind {
    Mouse,
    Touch,
    Pen,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PointerButton {
    Primary,   // Left mouse, touch
    Secondary, // Right mouse
    Tertiary,  // Middle mouse
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEventKind {
    Down(PointerButton),
    Up(PointerButton),
    Move,
    Cancel(CancelReason),
}

/// Raw pointer input in root coordinates.
#[derive(Clone, Debug)]
pub struct PointerEvent {
    pub id: PointerId,
    pub kind: PointerKind,
    pub event: PointerEventKind,
    pub position: Vec2,
    pub pressure: f32,
    pub modifiers: ModifierFlags,
    pub timestamp: Timestamp,
}

/// Why the platform is cancelling contacts, and which ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CancelReason {
    /// The window lost key/focus status. Cancels every active contact.
    FocusLost,
    /// A system gesture or the OS took over. Cancels every active contact.
    System,
    /// The platform cancelled one contact.
    Contact(PointerId),
    /// The root view went away. Cancels the contacts that began under it.
    Root(ViewTag),
}

bitflags! {
    /// Modifier keys held during an input event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ModifierFlags: u8 {
        const SHIFT       = 0b0000_0001;
        const CONTROL     = 0b0000_0010;
        const ALT         = 0b0000_0100;
        /// Cmd on Mac, Win key on Windows.
        const META        = 0b0000_1000;
        const CAPS_LOCK   = 0b0001_0000;
        const FUNCTION    = 0b0010_0000;
        const NUMERIC_PAD = 0b0100_0000;
    }
}

impl Default for ModifierFlags {
    fn default() -> Self {
        Self::empty()
    }
}

impl ModifierFlags {
    /// The device-independent subset that participates in chord matching.
    pub const CHORD_MASK: ModifierFlags = ModifierFlags::SHIFT
        .union(ModifierFlags::CONTROL)
        .union(ModifierFlags::ALT)
        .union(ModifierFlags::META);

    pub fn for_chord(self) -> ModifierFlags {
        self & Self::CHORD_MASK
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Key {
    Character(char),
    Enter,
    Tab,
    Backspace,
    Delete,
    Escape,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Home,
    End,
    PageUp,
    PageDown,
    Space,
    F(u8), // F1-F20
}

impl Key {
    /// Normalized input string: characters are lower-cased, named keys get a
    /// fixed lowercase name.
    pub fn input(&self) -> String {
        match self {
            Key::Character(c) => c.to_lowercase().collect(),
            Key::Enter => "enter".into(),
            Key::Tab => "tab".into(),
            Key::Backspace => "backspace".into(),
            Key::Delete => "delete".into(),
            Key::Escape => "escape".into(),
            Key::ArrowLeft => "left".into(),
            Key::ArrowRight => "right".into(),
            Key::ArrowUp => "up".into(),
            Key::ArrowDown => "down".into(),
            Key::Home => "home".into(),
            Key::End => "end".into(),
            Key::PageUp => "pageup".into(),
            Key::PageDown => "pagedown".into(),
            Key::Space => " ".into(),
            Key::F(n) => format!("f{n}"),
        }
    }
}

/// Device-independent key code, as reported by the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyCode(pub u16);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KeyState {
    Down,
    Up,
}

#[derive(Clone, Debug)]
pub struct KeyEvent {
    pub key: Key,
    pub code: KeyCode,
    pub state: KeyState,
    pub modifiers: ModifierFlags,
    pub is_repeat: bool,
    pub timestamp: Timestamp,
}

impl KeyEvent {
    pub fn down(key: Key, code: KeyCode, modifiers: ModifierFlags) -> Self {
        Self {
            key,
            code,
            state: KeyState::Down,
            modifiers,
            is_repeat: false,
            timestamp: Duration::ZERO,
        }
    }

    pub fn up(key: Key, code: KeyCode, modifiers: ModifierFlags) -> Self {
        Self {
            state: KeyState::Up,
            ..Self::down(key, code, modifiers)
        }
    }
}

#[derive(Clone, Debug)]
pub enum InputEvent {
    Pointer(PointerEvent),
    Key(KeyEvent),
}
