//! Keyboard shortcuts.
//!
//! Two mechanisms share the raw key stream:
//!
//! - **Observers** see every key event, down and up, matched or not.
//! - **Commands** are bound to a [`KeyChord`]. At most one binding exists per
//!   chord; registering the same chord again replaces the previous binding.
//!   A command fires on key-down (not on auto-repeat) and may call
//!   [`KeyCommand::prevent_default`] to tell the platform to skip its own
//!   handling of the key.
//!
//! ```rust
//! use tether_core::keys::{KeyChord, KeyCommandRegistry};
//! use tether_core::input::{Key, KeyCode, KeyEvent, ModifierFlags};
//!
//! let keys = KeyCommandRegistry::new();
//! keys.register_command(KeyChord::input("k", ModifierFlags::META), |cmd| cmd.prevent_default());
//!
//! let out = keys.dispatch(&KeyEvent::down(Key::Character('K'), KeyCode(40), ModifierFlags::META));
//! assert!(out.command_fired && out.default_prevented);
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::input::{Key, KeyCode, KeyEvent, KeyState, ModifierFlags, Timestamp};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChordKey {
    /// Normalized (lower-cased) input string.
    Input(String),
    /// Device-independent key code.
    Code(KeyCode),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub key: ChordKey,
    pub modifiers: ModifierFlags,
}

impl KeyChord {
    pub fn input(input: &str, modifiers: ModifierFlags) -> Self {
        Self {
            key: ChordKey::Input(input.to_lowercase()),
            modifiers: modifiers.for_chord(),
        }
    }

    pub fn code(code: KeyCode, modifiers: ModifierFlags) -> Self {
        Self {
            key: ChordKey::Code(code),
            modifiers: modifiers.for_chord(),
        }
    }
}

/// One key event as seen by commands and observers.
#[derive(Debug)]
pub struct KeyCommand {
    pub input: String,
    pub key: Key,
    pub code: KeyCode,
    pub is_down: bool,
    pub is_repeat: bool,
    pub modifiers: ModifierFlags,
    pub timestamp: Timestamp,
    default_prevented: Cell<bool>,
}

impl KeyCommand {
    pub fn from_event(event: &KeyEvent) -> Self {
        Self {
            input: event.key.input(),
            key: event.key.clone(),
            code: event.code,
            is_down: event.state == KeyState::Down,
            is_repeat: event.is_repeat,
            modifiers: event.modifiers,
            timestamp: event.timestamp,
            default_prevented: Cell::new(false),
        }
    }

    pub fn matches_input(&self, input: &str) -> bool {
        self.input == input.to_lowercase()
    }

    pub fn matches_input_with(&self, input: &str, modifiers: ModifierFlags) -> bool {
        self.matches_input(input) && self.modifiers.for_chord() == modifiers.for_chord()
    }

    pub fn matches_key_code(&self, code: KeyCode) -> bool {
        self.code == code
    }

    pub fn matches_key_code_with(&self, code: KeyCode, modifiers: ModifierFlags) -> bool {
        self.matches_key_code(code) && self.modifiers.for_chord() == modifiers.for_chord()
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

/// Result of routing one key event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyDispatch {
    pub command_fired: bool,
    /// The platform should suppress its default handling of the key.
    pub default_prevented: bool,
}

slotmap::new_key_type! {
    pub struct KeyObserverId;
}

type KeyFn = Rc<dyn Fn(&KeyCommand)>;

struct Binding {
    order: u64,
    action: KeyFn,
}

#[derive(Default)]
struct Inner {
    commands: HashMap<KeyChord, Binding>,
    observers: SlotMap<KeyObserverId, KeyFn>,
    observer_order: Vec<KeyObserverId>,
    next_order: u64,
}

/// Cloneable handle; actions may register or unregister while being
/// dispatched.
#[derive(Clone, Default)]
pub struct KeyCommandRegistry(Rc<RefCell<Inner>>);

impl KeyCommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `chord`. Returns `true` if an existing binding was replaced.
    pub fn register_command(&self, chord: KeyChord, action: impl Fn(&KeyCommand) + 'static) -> bool {
        let mut inner = self.0.borrow_mut();
        inner.next_order += 1;
        let order = inner.next_order;
        let replaced = inner
            .commands
            .insert(
                chord.clone(),
                Binding {
                    order,
                    action: Rc::new(action),
                },
            )
            .is_some();
        if replaced {
            log::debug!("keys: {chord:?} re-registered; previous binding replaced");
        }
        replaced
    }

    pub fn unregister_command(&self, chord: &KeyChord) -> bool {
        self.0.borrow_mut().commands.remove(chord).is_some()
    }

    pub fn is_registered(&self, chord: &KeyChord) -> bool {
        self.0.borrow().commands.contains_key(chord)
    }

    pub fn command_count(&self) -> usize {
        self.0.borrow().commands.len()
    }

    pub fn add_observer(&self, observer: impl Fn(&KeyCommand) + 'static) -> KeyObserverId {
        let mut inner = self.0.borrow_mut();
        let id = inner.observers.insert(Rc::new(observer));
        inner.observer_order.push(id);
        id
    }

    pub fn remove_observer(&self, id: KeyObserverId) -> bool {
        let mut inner = self.0.borrow_mut();
        let removed = inner.observers.remove(id).is_some();
        if removed {
            inner.observer_order.retain(|o| *o != id);
        } else {
            log::debug!("keys: removal of unknown observer {id:?} ignored");
        }
        removed
    }

    /// Routes one key event: at most one matching command fires, then every
    /// observer sees the event.
    pub fn dispatch(&self, event: &KeyEvent) -> KeyDispatch {
        let command = KeyCommand::from_event(event);

        let (action, observers) = {
            let inner = self.0.borrow();
            let action = if command.is_down && !command.is_repeat {
                Self::lookup(&inner, &command)
            } else {
                None
            };
            let observers: SmallVec<[KeyFn; 4]> = inner
                .observer_order
                .iter()
                .filter_map(|id| inner.observers.get(*id).cloned())
                .collect();
            (action, observers)
        };

        let command_fired = action.is_some();
        if let Some(action) = action {
            log::trace!("keys: command for {:?} fired", command.input);
            action(&command);
        }
        for observer in observers {
            observer(&command);
        }

        KeyDispatch {
            command_fired,
            default_prevented: command.is_default_prevented(),
        }
    }

    pub fn clear(&self) {
        let mut inner = self.0.borrow_mut();
        inner.commands.clear();
        inner.observers.clear();
        inner.observer_order.clear();
    }

    /// The input chord and the key-code chord can both match; the more
    /// recently registered one wins.
    fn lookup(inner: &Inner, command: &KeyCommand) -> Option<KeyFn> {
        let modifiers = command.modifiers.for_chord();
        let by_input = inner.commands.get(&KeyChord {
            key: ChordKey::Input(command.input.clone()),
            modifiers,
        });
        let by_code = inner.commands.get(&KeyChord {
            key: ChordKey::Code(command.code),
            modifiers,
        });
        [by_input, by_code]
            .into_iter()
            .flatten()
            .max_by_key(|b| b.order)
            .map(|b| b.action.clone())
    }
}

impl std::fmt::Debug for KeyCommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.0.borrow();
        f.debug_struct("KeyCommandRegistry")
            .field("commands", &inner.commands.len())
            .field("observers", &inner.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const K: KeyCode = KeyCode(40);

    fn k_down(mods: ModifierFlags) -> KeyEvent {
        KeyEvent::down(Key::Character('k'), K, mods)
    }

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Box<dyn Fn(&KeyCommand)>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let make = {
            let log = log.clone();
            move |name: &'static str| -> Box<dyn Fn(&KeyCommand)> {
                let log = log.clone();
                Box::new(move |_: &KeyCommand| log.borrow_mut().push(name))
            }
        };
        (log, make)
    }

    #[test]
    fn last_registration_wins() {
        let keys = KeyCommandRegistry::new();
        let (log, make) = recorder();
        let chord = KeyChord::input("K", ModifierFlags::META);
        assert!(!keys.register_command(chord.clone(), make("first")));
        assert!(keys.register_command(chord.clone(), make("second")));
        assert_eq!(keys.command_count(), 1);

        keys.dispatch(&k_down(ModifierFlags::META));
        assert_eq!(*log.borrow(), vec!["second"]);
    }

    #[test]
    fn observers_always_fire() {
        let keys = KeyCommandRegistry::new();
        let (log, make) = recorder();
        keys.register_command(KeyChord::input("k", ModifierFlags::META), make("command"));
        keys.add_observer(make("observer"));

        keys.dispatch(&k_down(ModifierFlags::META));
        keys.dispatch(&k_down(ModifierFlags::empty()));
        keys.dispatch(&KeyEvent::up(Key::Character('k'), K, ModifierFlags::META));
        assert_eq!(*log.borrow(), vec!["command", "observer", "observer", "observer"]);
    }

    #[test]
    fn observers_can_match_chords_themselves() {
        let keys = KeyCommandRegistry::new();
        let hits = Rc::new(RefCell::new(Vec::new()));
        keys.add_observer({
            let hits = hits.clone();
            move |cmd: &KeyCommand| {
                hits.borrow_mut().push((
                    cmd.matches_input_with("K", ModifierFlags::SHIFT),
                    cmd.matches_key_code_with(K, ModifierFlags::SHIFT),
                ))
            }
        });
        keys.dispatch(&k_down(ModifierFlags::SHIFT | ModifierFlags::CAPS_LOCK));
        keys.dispatch(&k_down(ModifierFlags::META));
        assert_eq!(*hits.borrow(), vec![(true, true), (false, false)]);
    }

    #[test]
    fn modifiers_must_match_exactly_but_lock_keys_are_ignored() {
        let keys = KeyCommandRegistry::new();
        keys.register_command(KeyChord::input("k", ModifierFlags::META), |_| {});

        assert!(!keys.dispatch(&k_down(ModifierFlags::META | ModifierFlags::SHIFT)).command_fired);
        assert!(keys.dispatch(&k_down(ModifierFlags::META | ModifierFlags::CAPS_LOCK)).command_fired);
    }

    #[test]
    fn prevent_default_is_reported_per_event() {
        let keys = KeyCommandRegistry::new();
        keys.register_command(KeyChord::input("k", ModifierFlags::CONTROL), |cmd| cmd.prevent_default());

        let hit = keys.dispatch(&k_down(ModifierFlags::CONTROL));
        assert_eq!(
            hit,
            KeyDispatch {
                command_fired: true,
                default_prevented: true
            }
        );
        let miss = keys.dispatch(&k_down(ModifierFlags::empty()));
        assert_eq!(miss, KeyDispatch::default());
    }

    #[test]
    fn repeats_and_key_up_do_not_fire_commands() {
        let keys = KeyCommandRegistry::new();
        keys.register_command(KeyChord::input("k", ModifierFlags::empty()), |_| {});
        let mut repeat = k_down(ModifierFlags::empty());
        repeat.is_repeat = true;
        assert!(!keys.dispatch(&repeat).command_fired);
        assert!(!keys.dispatch(&KeyEvent::up(Key::Character('k'), K, ModifierFlags::empty())).command_fired);
    }

    #[test]
    fn newer_code_chord_overrides_input_chord() {
        let keys = KeyCommandRegistry::new();
        let (log, make) = recorder();
        keys.register_command(KeyChord::input("k", ModifierFlags::empty()), make("input"));
        keys.register_command(KeyChord::code(K, ModifierFlags::empty()), make("code"));
        keys.dispatch(&k_down(ModifierFlags::empty()));
        assert_eq!(*log.borrow(), vec!["code"]);
    }

    #[test]
    fn query_and_unregister() {
        let keys = KeyCommandRegistry::new();
        let chord = KeyChord::input("Enter", ModifierFlags::SHIFT);
        assert!(!keys.is_registered(&chord));
        keys.register_command(chord.clone(), |_| {});
        assert!(keys.is_registered(&KeyChord::input("enter", ModifierFlags::SHIFT)));
        assert!(keys.unregister_command(&chord));
        assert!(!keys.unregister_command(&chord));
        assert!(!keys.is_registered(&chord));
    }

    #[test]
    fn action_may_rebind_during_dispatch() {
        let keys = KeyCommandRegistry::new();
        let chord = KeyChord::input("k", ModifierFlags::empty());
        keys.register_command(chord.clone(), {
            let keys = keys.clone();
            let chord = chord.clone();
            move |_| {
                keys.unregister_command(&chord);
            }
        });
        assert!(keys.dispatch(&k_down(ModifierFlags::empty())).command_fired);
        assert!(!keys.is_registered(&chord));
    }

    #[test]
    fn removed_observer_stops_receiving() {
        let keys = KeyCommandRegistry::new();
        let (log, make) = recorder();
        let id = keys.add_observer(make("observer"));
        keys.dispatch(&k_down(ModifierFlags::empty()));
        assert!(keys.remove_observer(id));
        assert!(!keys.remove_observer(id));
        keys.dispatch(&k_down(ModifierFlags::empty()));
        assert_eq!(log.borrow().len(), 1);
    }
}
