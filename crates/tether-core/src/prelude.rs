pub use crate::clock::{Clock, Epoch, SystemClock, TestClock};
pub use crate::config::HostConfig;
pub use crate::delivery::{DeliveryReceiver, DeliverySender, delivery_queue};
pub use crate::frame::{DEFAULT_FRAME_INTERVAL, FrameObserver, FrameScheduler, FrameTick, ObserverId};
pub use crate::geometry::{EdgeInsets, Rect, Size, Transform, Vec2};
pub use crate::host::{Host, OutboundEvent, ViewCommand};
pub use crate::hover::{HoverEvent, HoverTracker};
pub use crate::input::*;
pub use crate::keys::{ChordKey, KeyChord, KeyCommand, KeyCommandRegistry, KeyDispatch, KeyObserverId};
pub use crate::touch::{TouchBatch, TouchEvent, TouchId, TouchPhase, TouchRecord, TouchTracker};
pub use crate::tree::ViewTree;
pub use crate::view::{Cursor, PointerEvents, ViewKind, ViewNode, ViewTag};
