//! Multi-contact touch lifecycles.
//!
//! Each physical contact gets one [`TouchRecord`] from pointer-down until
//! pointer-up or cancellation. The target is captured at pointer-down and
//! never changes afterwards, even when the pointer leaves it or the view is
//! removed from the tree; records hold the target's tag, never the node.
//!
//! Updates are queued in arrival order and handed out as one [`TouchBatch`]
//! per frame via [`TouchTracker::flush`].

use std::collections::HashMap;
use std::fmt;

use crate::input::{CancelReason, PointerId, PointerKind, Timestamp};
use crate::tree::ViewTree;
use crate::view::ViewTag;
use crate::{Transform, Vec2};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TouchId(pub u64);

impl fmt::Display for TouchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "touch {}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TouchPhase {
    Began,
    Moved,
    Stationary,
    Ended,
    Cancelled,
}

impl TouchPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, TouchPhase::Ended | TouchPhase::Cancelled)
    }
}

#[derive(Clone, Debug)]
pub struct TouchRecord {
    pub id: TouchId,
    pub pointer: PointerId,
    pub kind: PointerKind,
    pub phase: TouchPhase,
    pub root: ViewTag,
    /// `None` when pointer-down hit nothing; such touches are tracked but
    /// never dispatched.
    pub target: Option<ViewTag>,
    /// Location in the target's space (root space when there is no target).
    pub location: Vec2,
    pub root_location: Vec2,
    pub timestamp: Timestamp,
    /// Last known root-to-target mapping, reused once the target is gone.
    root_to_target: Transform,
}

/// One dispatchable touch update.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TouchEvent {
    pub identifier: TouchId,
    pub phase: TouchPhase,
    pub location: Vec2,
    pub root_location: Vec2,
    pub timestamp: Timestamp,
    pub target: ViewTag,
}

/// Touch updates gathered over one frame, oldest first.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TouchBatch {
    pub sequence: u64,
    pub events: Vec<TouchEvent>,
}

#[derive(Debug)]
pub struct TouchTracker {
    root: ViewTag,
    active: HashMap<PointerId, TouchRecord>,
    next_id: u64,
    pending: Vec<TouchEvent>,
    batches: u64,
    stationary_epsilon: f32,
}

impl TouchTracker {
    pub fn new(root: ViewTag) -> Self {
        Self {
            root,
            active: HashMap::new(),
            next_id: 1,
            pending: Vec::new(),
            batches: 0,
            stationary_epsilon: 0.0,
        }
    }

    /// Moves shorter than this are reported as [`TouchPhase::Stationary`].
    pub fn with_stationary_epsilon(mut self, epsilon: f32) -> Self {
        self.stationary_epsilon = epsilon.max(0.0);
        self
    }

    pub fn root(&self) -> ViewTag {
        self.root
    }

    /// New contacts hit-test from `root`; live touches keep the root they
    /// began under.
    pub fn set_root(&mut self, root: ViewTag) {
        self.root = root;
    }

    pub fn on_pointer_down(
        &mut self,
        tree: &ViewTree,
        pointer: PointerId,
        kind: PointerKind,
        point: Vec2,
        time: Timestamp,
    ) -> TouchRecord {
        if self.active.contains_key(&pointer) {
            log::warn!("touch: pointer {pointer:?} went down twice; cancelling the stale contact");
            self.cancel_where(time, |r| r.pointer == pointer);
        }

        let id = self.allocate_id();
        let root = self.root;
        let target = tree.hit_test(point, root);
        let root_to_target = target
            .and_then(|t| tree.root_to_local(root, t).ok())
            .unwrap_or_default();

        let record = TouchRecord {
            id,
            pointer,
            kind,
            phase: TouchPhase::Began,
            root,
            target,
            location: root_to_target.apply_to_point(point),
            root_location: point,
            timestamp: time,
            root_to_target,
        };
        match target {
            Some(t) => log::trace!("touch: {id} began on {t}"),
            None => log::trace!("touch: {id} began over nothing"),
        }
        self.enqueue(&record);
        self.active.insert(pointer, record.clone());
        record
    }

    pub fn on_pointer_move(
        &mut self,
        tree: &ViewTree,
        pointer: PointerId,
        point: Vec2,
        time: Timestamp,
    ) -> Option<&TouchRecord> {
        let Some(mut record) = self.active.remove(&pointer) else {
            log::warn!("touch: move for unknown pointer {pointer:?} ignored");
            return None;
        };
        let moved = record.root_location.distance(point) > self.stationary_epsilon;
        record.phase = if moved {
            TouchPhase::Moved
        } else {
            TouchPhase::Stationary
        };
        Self::relocate(tree, &mut record, point, time);
        self.enqueue(&record);
        self.active.insert(pointer, record);
        self.active.get(&pointer)
    }

    /// Ends the contact. The returned record is final.
    pub fn on_pointer_up(
        &mut self,
        tree: &ViewTree,
        pointer: PointerId,
        point: Vec2,
        time: Timestamp,
    ) -> Option<TouchRecord> {
        let Some(mut record) = self.active.remove(&pointer) else {
            log::warn!("touch: up for unknown pointer {pointer:?} ignored");
            return None;
        };
        record.phase = TouchPhase::Ended;
        Self::relocate(tree, &mut record, point, time);
        self.enqueue(&record);
        log::trace!("touch: {} ended", record.id);
        Some(record)
    }

    /// Force-cancels the contacts selected by `reason`, in identifier order.
    /// Returns the cancelled identifiers.
    pub fn on_pointer_cancelled(&mut self, reason: CancelReason, time: Timestamp) -> Vec<TouchId> {
        let ids = match reason {
            CancelReason::FocusLost | CancelReason::System => self.cancel_where(time, |_| true),
            CancelReason::Contact(p) => self.cancel_where(time, |r| r.pointer == p),
            CancelReason::Root(root) => self.cancel_where(time, |r| r.root == root),
        };
        if !ids.is_empty() {
            log::debug!("touch: cancelled {} contact(s) ({reason:?})", ids.len());
        }
        ids
    }

    /// Takes every update queued since the last flush. `None` if nothing
    /// happened.
    pub fn flush(&mut self) -> Option<TouchBatch> {
        if self.pending.is_empty() {
            return None;
        }
        self.batches += 1;
        Some(TouchBatch {
            sequence: self.batches,
            events: std::mem::take(&mut self.pending),
        })
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn touch(&self, pointer: PointerId) -> Option<&TouchRecord> {
        self.active.get(&pointer)
    }

    /// Active touches ordered by identifier.
    pub fn active_touches(&self) -> Vec<&TouchRecord> {
        let mut all: Vec<_> = self.active.values().collect();
        all.sort_by_key(|r| r.id);
        all
    }

    fn cancel_where(&mut self, time: Timestamp, pred: impl Fn(&TouchRecord) -> bool) -> Vec<TouchId> {
        let mut victims: Vec<PointerId> = self
            .active
            .values()
            .filter(|r| pred(*r))
            .map(|r| r.pointer)
            .collect();
        victims.sort_by_key(|p| self.active[p].id);

        let mut ids = Vec::with_capacity(victims.len());
        for pointer in victims {
            if let Some(mut record) = self.active.remove(&pointer) {
                record.phase = TouchPhase::Cancelled;
                record.timestamp = time;
                self.enqueue(&record);
                ids.push(record.id);
            }
        }
        ids
    }

    fn relocate(tree: &ViewTree, record: &mut TouchRecord, point: Vec2, time: Timestamp) {
        if let Some(target) = record.target {
            // a removed or detached target keeps reporting against its last geometry
            if let Ok(t) = tree.root_to_local(record.root, target) {
                record.root_to_target = t;
            }
        }
        record.location = record.root_to_target.apply_to_point(point);
        record.root_location = point;
        record.timestamp = time;
    }

    fn enqueue(&mut self, record: &TouchRecord) {
        if let Some(target) = record.target {
            self.pending.push(TouchEvent {
                identifier: record.id,
                phase: record.phase,
                location: record.location,
                root_location: record.root_location,
                timestamp: record.timestamp,
                target,
            });
        }
    }

    /// `next_id == 0` means the last identifier, `u64::MAX`, has been issued.
    fn allocate_id(&mut self) -> TouchId {
        loop {
            let id = match self.next_id {
                0 => {
                    if cfg!(debug_assertions) {
                        panic!("touch identifier space exhausted");
                    }
                    log::error!("touch: identifier space exhausted; wrapping around");
                    1
                }
                id => id,
            };
            self.next_id = id.wrapping_add(1);
            if !self.active.values().any(|r| r.id.0 == id) {
                return TouchId(id);
            }
        }
    }
}
