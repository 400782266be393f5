//! # Tether core
//!
//! The native half of a UI whose logic runs in a remote runtime. The remote
//! side describes views; an external layout engine resolves geometry and
//! pushes it here as tree mutations. This crate owns what has to stay native:
//!
//! - [`ViewTree`]: the view hierarchy, z-order, clipping and hit testing.
//! - [`TouchTracker`]: raw pointer input turned into touch lifecycles with
//!   stable identifiers and a captured target.
//! - [`FrameScheduler`]: one frame clock ticking every interested observer,
//!   with per-observer pause and automatic clock suspension.
//! - [`KeyCommandRegistry`]: keyboard chords with last-write-wins bindings
//!   and passive observers.
//!
//! A [`Host`] owns one of each plus the outbound queue to the remote
//! runtime. Everything runs on one control thread; only the
//! [`DeliveryReceiver`] crosses threads.
//!
//! ```rust
//! use std::time::Duration;
//! use tether_core::*;
//!
//! let root = ViewTag(1);
//! let (mut host, outbound) = Host::new(root, HostConfig::default());
//! host.apply_all([
//!     ViewCommand::Create { tag: root, kind: ViewKind::View },
//!     ViewCommand::SetFrame { tag: root, frame: Rect::new(0.0, 0.0, 320.0, 480.0) },
//! ])
//! .unwrap();
//!
//! host.handle_pointer(&PointerEvent {
//!     id: PointerId(0),
//!     kind: PointerKind::Touch,
//!     event: PointerEventKind::Down(PointerButton::Primary),
//!     position: Vec2::new(10.0, 10.0),
//!     pressure: 1.0,
//!     modifiers: ModifierFlags::empty(),
//!     timestamp: Duration::from_millis(5),
//! });
//! host.tick(Duration::from_millis(16));
//!
//! let Some(OutboundEvent::Touches(batch)) = outbound.try_recv() else { panic!() };
//! assert_eq!(batch.events[0].target, root);
//! ```

pub mod clock;
pub mod config;
pub mod delivery;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod host;
pub mod hover;
pub mod input;
pub mod keys;
pub mod prelude;
pub mod touch;
pub mod tree;
pub mod view;


pub use error::{Error, Result};
pub use geometry::*;
pub use prelude::*;
