//! The owned context tying the components together.
//!
//! A [`Host`] lives on the control thread for as long as the hosting
//! application keeps a UI alive. Everything the components share (the tree,
//! the frame clock, the key registry, the outbound queue) hangs off it and
//! is handed out by reference, so there is no process-wide state to
//! initialize lazily or forget to reset.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use crate::config::HostConfig;
use crate::delivery::{DeliveryReceiver, DeliverySender, delivery_queue};
use crate::error::Result;
use crate::frame::{FrameScheduler, FrameTick, ObserverId};
use crate::hover::{HoverEvent, HoverTracker};
use crate::input::{
    CancelReason, InputEvent, KeyEvent, PointerEvent, PointerEventKind, PointerKind, Timestamp,
};
use crate::keys::{KeyCommandRegistry, KeyDispatch};
use crate::touch::{TouchBatch, TouchTracker};
use crate::tree::ViewTree;
use crate::view::{Cursor, PointerEvents, ViewKind, ViewTag};
use crate::{EdgeInsets, Rect, Transform};

/// What the remote runtime receives, in the order things happened. Both
/// kinds leave on frame ticks.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "lowercase"))]
pub enum OutboundEvent {
    Touches(TouchBatch),
    Hover {
        timestamp: Timestamp,
        changes: Vec<HoverEvent>,
        /// Resolved pointer image for the new hover path.
        cursor: Cursor,
    },
}

/// A tree mutation as marshalled by the external layout engine.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ViewCommand {
    Create { tag: ViewTag, kind: ViewKind },
    Insert { tag: ViewTag, parent: ViewTag, index: usize },
    Remove(ViewTag),
    Detach(ViewTag),
    SetFrame { tag: ViewTag, frame: Rect },
    SetTransform { tag: ViewTag, transform: Transform },
    SetZIndex { tag: ViewTag, z: i32 },
    SetClip { tag: ViewTag, clips: bool },
    SetHidden { tag: ViewTag, hidden: bool },
    SetPointerEvents { tag: ViewTag, mode: PointerEvents },
    SetHitSlop { tag: ViewTag, insets: EdgeInsets },
    SetCursor { tag: ViewTag, cursor: Cursor },
}

pub struct Host {
    config: HostConfig,
    tree: ViewTree,
    frames: FrameScheduler,
    touches: Rc<RefCell<TouchTracker>>,
    hover: HoverTracker,
    keys: KeyCommandRegistry,
    outbound: Rc<DeliverySender<OutboundEvent>>,
    /// Items sealed earlier in the current frame, oldest first. Touch events
    /// still in the tracker are newer than all of them.
    outbox: Rc<RefCell<Vec<OutboundEvent>>>,
    flush: ObserverId,
    cursor: Cursor,
    torn_down: bool,
}

impl Host {
    /// Creates the context and the consumer end of its outbound queue. The
    /// root view itself is created by the layout engine like any other.
    pub fn new(root: ViewTag, config: HostConfig) -> (Self, DeliveryReceiver<OutboundEvent>) {
        let (tx, rx) = delivery_queue(config.delivery_backlog_warning);
        let outbound = Rc::new(tx);
        let frames = FrameScheduler::new(config.frame_interval);
        let touches = Rc::new(RefCell::new(
            TouchTracker::new(root).with_stationary_epsilon(config.stationary_epsilon),
        ));

        let outbox: Rc<RefCell<Vec<OutboundEvent>>> = Rc::default();

        let flush = frames.register({
            let touches = touches.clone();
            let outbound = outbound.clone();
            let outbox = outbox.clone();
            move |_tick| {
                let sealed = std::mem::take(&mut *outbox.borrow_mut());
                for item in sealed {
                    outbound.push(item);
                }
                if let Some(batch) = touches.borrow_mut().flush() {
                    log::trace!(
                        "host: batch {} with {} event(s)",
                        batch.sequence,
                        batch.events.len()
                    );
                    outbound.push(OutboundEvent::Touches(batch));
                }
            }
        });
        // nothing to flush yet; keeps the clock asleep until input arrives
        frames.set_paused(flush, true);

        let host = Self {
            config,
            tree: ViewTree::new(),
            frames,
            touches,
            hover: HoverTracker::new(),
            keys: KeyCommandRegistry::new(),
            outbound,
            outbox,
            flush,
            cursor: Cursor::Default,
            torn_down: false,
        };
        (host, rx)
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn root(&self) -> ViewTag {
        self.touches.borrow().root()
    }

    /// Points new contacts and hover at another root. Live touches keep
    /// reporting against the root they began under.
    pub fn set_root(&mut self, root: ViewTag, time: Timestamp) {
        self.touches.borrow_mut().set_root(root);
        let changes = self.hover.clear();
        self.queue_hover(time, changes);
    }

    pub fn tree(&self) -> &ViewTree {
        &self.tree
    }

    pub fn frames(&self) -> &FrameScheduler {
        &self.frames
    }

    pub fn keys(&self) -> &KeyCommandRegistry {
        &self.keys
    }

    pub fn touches(&self) -> Ref<'_, TouchTracker> {
        self.touches.borrow()
    }

    pub fn hovered(&self) -> Option<ViewTag> {
        self.hover.target()
    }

    /// Pointer image for the current hover path, resolved against the tree
    /// as it is now.
    pub fn cursor(&self) -> Cursor {
        self.hover.cursor(&self.tree)
    }

    /// Outbound items not yet taken by the consumer.
    pub fn backlog(&self) -> usize {
        self.outbound.backlog()
    }

    pub fn apply(&mut self, command: ViewCommand) -> Result<()> {
        let tree = &mut self.tree;
        match command {
            ViewCommand::Create { tag, kind } => tree.create(tag, kind)?,
            ViewCommand::Insert { tag, parent, index } => tree.insert(tag, parent, index)?,
            ViewCommand::Remove(tag) => {
                tree.remove(tag);
                self.hover.retain_existing(tree);
            }
            ViewCommand::Detach(tag) => {
                tree.detach(tag);
            }
            ViewCommand::SetFrame { tag, frame } => {
                tree.set_frame(tag, frame);
            }
            ViewCommand::SetTransform { tag, transform } => {
                tree.set_transform(tag, transform);
            }
            ViewCommand::SetZIndex { tag, z } => {
                tree.set_z_index(tag, z);
            }
            ViewCommand::SetClip { tag, clips } => {
                tree.set_clips_to_bounds(tag, clips);
            }
            ViewCommand::SetHidden { tag, hidden } => {
                tree.set_hidden(tag, hidden);
            }
            ViewCommand::SetPointerEvents { tag, mode } => {
                tree.set_pointer_events(tag, mode);
            }
            ViewCommand::SetHitSlop { tag, insets } => {
                tree.set_hit_slop(tag, insets);
            }
            ViewCommand::SetCursor { tag, cursor } => {
                tree.set_cursor(tag, cursor);
            }
        }
        Ok(())
    }

    /// Applies commands in order, stopping at the first failure. Commands
    /// before the failing one stay applied.
    pub fn apply_all(&mut self, commands: impl IntoIterator<Item = ViewCommand>) -> Result<()> {
        for command in commands {
            self.apply(command)?;
        }
        Ok(())
    }

    /// Routes any input. Returns `true` if the platform should suppress its
    /// default handling (only key commands ever ask for that).
    pub fn handle_input(&mut self, event: &InputEvent) -> bool {
        match event {
            InputEvent::Pointer(p) => {
                self.handle_pointer(p);
                false
            }
            InputEvent::Key(k) => self.handle_key(k).default_prevented,
        }
    }

    pub fn handle_pointer(&mut self, event: &PointerEvent) {
        let (id, point, time) = (event.id, event.position, event.timestamp);
        let in_contact = self.touches.borrow().touch(id).is_some();
        match event.event {
            PointerEventKind::Move if !in_contact => {
                if self.config.hover_tracking && event.kind != PointerKind::Touch {
                    let root = self.root();
                    let changes = self.hover.update(&self.tree, root, point);
                    self.queue_hover(time, changes);
                }
            }
            PointerEventKind::Down(_) => {
                self.touches
                    .borrow_mut()
                    .on_pointer_down(&self.tree, id, event.kind, point, time);
            }
            PointerEventKind::Move => {
                self.touches
                    .borrow_mut()
                    .on_pointer_move(&self.tree, id, point, time);
            }
            PointerEventKind::Up(_) => {
                self.touches
                    .borrow_mut()
                    .on_pointer_up(&self.tree, id, point, time);
            }
            PointerEventKind::Cancel(reason) => {
                self.touches.borrow_mut().on_pointer_cancelled(reason, time);
                if matches!(reason, CancelReason::FocusLost | CancelReason::System) {
                    let changes = self.hover.clear();
                    self.queue_hover(time, changes);
                }
            }
        }
        self.wake_flush();
    }

    pub fn handle_key(&self, event: &KeyEvent) -> KeyDispatch {
        self.keys.dispatch(event)
    }

    /// Forwards a clock pulse to the frame scheduler. Everything queued since
    /// the last delivered tick goes out on this one: touch updates as one
    /// batch, split only where a hover change came between them.
    pub fn tick(&self, now: Timestamp) -> Option<FrameTick> {
        let tick = self.frames.tick(now);
        if !self.has_pending() {
            self.frames.set_paused(self.flush, true);
        }
        tick
    }

    /// Flushes whatever is still queued, drops every frame observer and key
    /// binding and closes the outbound queue.
    pub fn teardown(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        let sealed = std::mem::take(&mut *self.outbox.borrow_mut());
        for item in sealed {
            self.outbound.push(item);
        }
        if let Some(batch) = self.touches.borrow_mut().flush() {
            self.outbound.push(OutboundEvent::Touches(batch));
        }
        self.frames.clear();
        self.keys.clear();
        self.outbound.close();
        log::debug!("host: torn down ({} item(s) ever delivered)", self.outbound.pushed());
    }

    fn has_pending(&self) -> bool {
        self.touches.borrow().has_pending() || !self.outbox.borrow().is_empty()
    }

    fn wake_flush(&self) {
        if self.has_pending() {
            self.frames.set_paused(self.flush, false);
        }
    }

    /// Queues a hover change behind any touch updates reported before it.
    fn queue_hover(&mut self, timestamp: Timestamp, changes: Vec<HoverEvent>) {
        let cursor = self.hover.cursor(&self.tree);
        if changes.is_empty() && cursor == self.cursor {
            return;
        }
        self.cursor = cursor;
        {
            let mut outbox = self.outbox.borrow_mut();
            if let Some(batch) = self.touches.borrow_mut().flush() {
                outbox.push(OutboundEvent::Touches(batch));
            }
            outbox.push(OutboundEvent::Hover {
                timestamp,
                changes,
                cursor,
            });
        }
        self.wake_flush();
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("config", &self.config)
            .field("nodes", &self.tree.len())
            .field("frames", &self.frames)
            .field("keys", &self.keys)
            .finish()
    }
}
