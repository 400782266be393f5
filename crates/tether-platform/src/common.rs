use tether_core::input::{
    CancelReason, ModifierFlags, PointerButton, PointerEvent, PointerEventKind, PointerId,
    PointerKind, Timestamp,
};
use tether_core::{Clock, Epoch, Vec2};

/// The mouse is a single contact; touch contacts are numbered after it.
pub const MOUSE_POINTER: PointerId = PointerId(0);

/// Platform touch ids shift up by one. The top id saturates, so it shares a
/// pointer with `u64::MAX - 1`.
pub fn touch_pointer(platform_id: u64) -> PointerId {
    PointerId(platform_id.saturating_add(1))
}

pub fn pe_mouse(event: PointerEventKind, pos: Vec2, mods: ModifierFlags, at: Timestamp) -> PointerEvent {
    PointerEvent {
        id: MOUSE_POINTER,
        kind: PointerKind::Mouse,
        event,
        position: pos,
        pressure: 1.0,
        modifiers: mods,
        timestamp: at,
    }
}

pub fn pe_touch(
    id: PointerId,
    event: PointerEventKind,
    pos: Vec2,
    pressure: f32,
    at: Timestamp,
) -> PointerEvent {
    PointerEvent {
        id,
        kind: PointerKind::Touch,
        event,
        position: pos,
        pressure,
        modifiers: ModifierFlags::empty(),
        timestamp: at,
    }
}

pub fn pe_down_primary(kind: PointerKind, id: PointerId, pos: Vec2, at: Timestamp) -> PointerEvent {
    PointerEvent {
        id,
        kind,
        event: PointerEventKind::Down(PointerButton::Primary),
        position: pos,
        pressure: 1.0,
        modifiers: ModifierFlags::empty(),
        timestamp: at,
    }
}

pub fn pe_up_primary(kind: PointerKind, id: PointerId, pos: Vec2, at: Timestamp) -> PointerEvent {
    PointerEvent {
        event: PointerEventKind::Up(PointerButton::Primary),
        ..pe_down_primary(kind, id, pos, at)
    }
}

/// Pointer id and position are irrelevant for cancellation; the reason
/// selects the contacts.
pub fn pe_cancel(reason: CancelReason, at: Timestamp) -> PointerEvent {
    PointerEvent {
        id: MOUSE_POINTER,
        kind: PointerKind::Touch,
        event: PointerEventKind::Cancel(reason),
        position: Vec2::ZERO,
        pressure: 0.0,
        modifiers: ModifierFlags::empty(),
        timestamp: at,
    }
}

/// Converts native event times into host timestamps.
pub struct EventClock<C: Clock> {
    clock: C,
    epoch: Epoch,
}

impl<C: Clock> EventClock<C> {
    pub fn new(clock: C) -> Self {
        let epoch = Epoch::starting_now(&clock);
        Self { clock, epoch }
    }

    pub fn now(&self) -> Timestamp {
        self.epoch.now(&self.clock)
    }

    pub fn at(&self, instant: web_time::Instant) -> Timestamp {
        self.epoch.timestamp(instant)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tether_core::TestClock;

    use super::*;

    #[test]
    fn touch_ids_never_collide_with_mouse() {
        assert_ne!(touch_pointer(0), MOUSE_POINTER);
        assert_ne!(touch_pointer(u64::MAX), MOUSE_POINTER);
        assert_ne!(touch_pointer(u64::MAX), touch_pointer(0));
        assert_eq!(touch_pointer(u64::MAX), PointerId(u64::MAX));
        assert_eq!(touch_pointer(4), PointerId(5));
    }

    #[test]
    fn event_clock_counts_from_creation() {
        let clock = TestClock::new();
        let events = EventClock::new(clock.clone());
        clock.advance(Duration::from_millis(33));
        assert_eq!(events.now(), Duration::from_millis(33));
        assert_eq!(events.at(clock.now()), Duration::from_millis(33));
    }

    #[test]
    fn up_mirrors_down() {
        let down = pe_down_primary(PointerKind::Pen, PointerId(3), Vec2::new(1.0, 2.0), Duration::ZERO);
        let up = pe_up_primary(PointerKind::Pen, PointerId(3), Vec2::new(1.0, 2.0), Duration::ZERO);
        assert_eq!(up.id, down.id);
        assert_eq!(up.event, PointerEventKind::Up(PointerButton::Primary));
    }
}
