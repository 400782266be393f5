//! Frame-paced observer ticking.
//!
//! One clock source drives every observer. The platform calls
//! [`FrameScheduler::tick`] from its vsync/timer callback; the scheduler
//! throttles to the nominal interval, skips paused observers, and reports
//! through the clock listener when nobody needs ticks anymore so the platform
//! can stop its timer.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::input::Timestamp;

/// Reference cadence, ~60 Hz.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_micros(16_600);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FrameTick {
    pub timestamp: Timestamp,
    /// Time since the previous delivered tick, never below the nominal interval.
    pub delta: Duration,
}

slotmap::new_key_type! {
    pub struct ObserverId;
}

/// Something that wants a callback every frame.
pub trait FrameObserver {
    fn did_update_frame(&mut self, tick: &FrameTick);
}

type TickFn = Box<dyn FnMut(&FrameTick)>;

struct Observer {
    /// `None` while the callback is running.
    callback: Option<TickFn>,
    paused: bool,
    on_pause_changed: Option<Rc<dyn Fn(bool)>>,
}

struct Inner {
    observers: SlotMap<ObserverId, Observer>,
    /// Registration order; ticks are delivered in this order.
    order: Vec<ObserverId>,
    interval: Duration,
    running: bool,
    last_tick: Option<Timestamp>,
    /// Set when the clock resumes, so the next delta does not include the
    /// suspended time.
    resumed: bool,
    delivered: u64,
    on_clock_state: Option<Rc<dyn Fn(bool)>>,
}

/// Cloneable handle; clones share the same observers and clock.
#[derive(Clone)]
pub struct FrameScheduler(Rc<RefCell<Inner>>);

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_INTERVAL)
    }
}

impl FrameScheduler {
    pub fn new(interval: Duration) -> Self {
        Self(Rc::new(RefCell::new(Inner {
            observers: SlotMap::with_key(),
            order: Vec::new(),
            interval,
            running: false,
            last_tick: None,
            resumed: true,
            delivered: 0,
            on_clock_state: None,
        })))
    }

    pub fn interval(&self) -> Duration {
        self.0.borrow().interval
    }

    /// Whether the clock source should currently be firing.
    pub fn is_running(&self) -> bool {
        self.0.borrow().running
    }

    pub fn observer_count(&self) -> usize {
        self.0.borrow().observers.len()
    }

    /// Number of ticks delivered so far.
    pub fn delivered_ticks(&self) -> u64 {
        self.0.borrow().delivered
    }

    /// Called with `true` when the clock should start and `false` when it
    /// can stop.
    pub fn set_clock_listener(&self, f: impl Fn(bool) + 'static) {
        self.0.borrow_mut().on_clock_state = Some(Rc::new(f));
    }

    pub fn register(&self, callback: impl FnMut(&FrameTick) + 'static) -> ObserverId {
        let id = {
            let mut inner = self.0.borrow_mut();
            let id = inner.observers.insert(Observer {
                callback: Some(Box::new(callback)),
                paused: false,
                on_pause_changed: None,
            });
            inner.order.push(id);
            id
        };
        log::trace!("frame: registered observer {id:?}");
        self.refresh_clock();
        id
    }

    pub fn register_observer<T: FrameObserver + 'static>(
        &self,
        observer: Rc<RefCell<T>>,
    ) -> ObserverId {
        self.register(move |tick| observer.borrow_mut().did_update_frame(tick))
    }

    /// Unregistering an unknown observer is a no-op.
    pub fn unregister(&self, id: ObserverId) -> bool {
        let removed = {
            let mut inner = self.0.borrow_mut();
            let removed = inner.observers.remove(id).is_some();
            if removed {
                inner.order.retain(|o| *o != id);
            }
            removed
        };
        if removed {
            self.refresh_clock();
        } else {
            log::debug!("frame: unregister of unknown observer {id:?} ignored");
        }
        removed
    }

    /// Paused observers stay registered but receive no ticks.
    pub fn set_paused(&self, id: ObserverId, paused: bool) -> bool {
        let notify = {
            let mut inner = self.0.borrow_mut();
            let Some(obs) = inner.observers.get_mut(id) else {
                log::debug!("frame: set_paused on unknown observer {id:?} ignored");
                return false;
            };
            if obs.paused == paused {
                return true;
            }
            obs.paused = paused;
            obs.on_pause_changed.clone()
        };
        if let Some(f) = notify {
            f(paused);
        }
        self.refresh_clock();
        true
    }

    pub fn is_paused(&self, id: ObserverId) -> Option<bool> {
        self.0.borrow().observers.get(id).map(|o| o.paused)
    }

    /// Called whenever the observer's paused state changes.
    pub fn set_pause_callback(&self, id: ObserverId, f: impl Fn(bool) + 'static) -> bool {
        match self.0.borrow_mut().observers.get_mut(id) {
            Some(obs) => {
                obs.on_pause_changed = Some(Rc::new(f));
                true
            }
            None => false,
        }
    }

    /// Drives one clock pulse. Returns the delivered tick, or `None` when the
    /// clock is suspended or the pulse came earlier than the nominal interval
    /// (it is coalesced into the next one).
    ///
    /// Only observers that were registered and unpaused when the tick began
    /// receive it. Registering or unpausing during delivery takes effect on
    /// the next tick; unregistering or pausing before an observer's turn
    /// skips it.
    pub fn tick(&self, now: Timestamp) -> Option<FrameTick> {
        let tick = {
            let mut inner = self.0.borrow_mut();
            if !inner.running {
                return None;
            }
            if let Some(last) = inner.last_tick {
                if now < last + inner.interval {
                    log::trace!("frame: pulse at {now:?} coalesced");
                    return None;
                }
            }
            let delta = match inner.last_tick {
                Some(last) if !inner.resumed => now - last,
                _ => inner.interval,
            };
            inner.last_tick = Some(now);
            inner.resumed = false;
            inner.delivered += 1;
            FrameTick {
                timestamp: now,
                delta,
            }
        };

        let snapshot: SmallVec<[ObserverId; 8]> = {
            let inner = self.0.borrow();
            inner
                .order
                .iter()
                .copied()
                .filter(|id| inner.observers.get(*id).is_some_and(|o| !o.paused))
                .collect()
        };
        for id in snapshot {
            let callback = {
                let mut inner = self.0.borrow_mut();
                match inner.observers.get_mut(id) {
                    Some(obs) if !obs.paused => obs.callback.take(),
                    _ => None,
                }
            };
            let Some(mut callback) = callback else {
                continue;
            };
            callback(&tick);
            // the observer may have unregistered itself meanwhile
            if let Some(obs) = self.0.borrow_mut().observers.get_mut(id) {
                if obs.callback.is_none() {
                    obs.callback = Some(callback);
                }
            }
        }
        Some(tick)
    }

    /// Drops every observer and stops the clock.
    pub fn clear(&self) {
        {
            let mut inner = self.0.borrow_mut();
            inner.observers.clear();
            inner.order.clear();
        }
        self.refresh_clock();
    }

    fn refresh_clock(&self) {
        let changed = {
            let mut inner = self.0.borrow_mut();
            let wanted = inner.observers.values().any(|o| !o.paused);
            if wanted == inner.running {
                None
            } else {
                inner.running = wanted;
                if wanted {
                    inner.resumed = true;
                }
                Some((wanted, inner.on_clock_state.clone()))
            }
        };
        if let Some((running, listener)) = changed {
            log::debug!("frame: clock {}", if running { "resumed" } else { "suspended" });
            if let Some(f) = listener {
                f(running);
            }
        }
    }
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.0.borrow();
        f.debug_struct("FrameScheduler")
            .field("interval", &inner.interval)
            .field("running", &inner.running)
            .field("observers", &inner.observers.len())
            .field("delivered", &inner.delivered)
            .finish()
    }
}
