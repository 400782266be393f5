//! The native view hierarchy.
//!
//! Views are owned by the tree and addressed by the [`ViewTag`] the external
//! layout engine assigns. The tag table is the only way in, so nothing outside
//! the tree ever holds a node directly: a touch that captured a view keeps its
//! tag, and looks it up again (or finds it gone) on every update.

use std::collections::HashMap;

use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::view::{Cursor, NodeKey, PointerEvents, ViewKind, ViewNode, ViewTag};
use crate::{EdgeInsets, Rect, Transform, Vec2};

#[derive(Debug, Default)]
pub struct ViewTree {
    nodes: SlotMap<NodeKey, ViewNode>,
    tags: HashMap<ViewTag, NodeKey>,
}

impl ViewTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an unparented view.
    pub fn create(&mut self, tag: ViewTag, kind: ViewKind) -> Result<()> {
        if self.tags.contains_key(&tag) {
            return Err(Error::DuplicateNode(tag));
        }
        let key = self.nodes.insert(ViewNode::new(tag, kind));
        self.tags.insert(tag, key);
        log::trace!("tree: created {tag}");
        Ok(())
    }

    /// Inserts `tag` as a child of `parent` at `index` (clamped to the child
    /// count). A view that already has a parent is detached from it first;
    /// inserting under the same parent reorders it.
    pub fn insert(&mut self, tag: ViewTag, parent: ViewTag, index: usize) -> Result<()> {
        let key = self.key(tag).ok_or(Error::UnknownNode(tag))?;
        let parent_key = self.key(parent).ok_or(Error::UnknownNode(parent))?;

        // parent must not be the node itself or one of its descendants
        let mut cursor = Some(parent_key);
        while let Some(k) = cursor {
            if k == key {
                return Err(Error::CycleDetected { node: tag, parent });
            }
            cursor = self.nodes[k].parent;
        }

        self.unlink(key);

        let siblings = &mut self.nodes[parent_key].children;
        let index = index.min(siblings.len());
        siblings.insert(index, key);
        self.nodes[key].parent = Some(parent_key);
        self.resort(parent_key);
        Ok(())
    }

    /// Detaches `tag` from its parent, keeping it (and its subtree) alive for
    /// re-insertion. Returns `false` if the view is unknown or already
    /// unparented.
    pub fn detach(&mut self, tag: ViewTag) -> bool {
        match self.key(tag) {
            Some(key) => self.unlink(key),
            None => {
                log::debug!("tree: detach of unknown view {tag} ignored");
                false
            }
        }
    }

    /// Detaches `tag` and destroys it together with its subtree. Removing an
    /// unknown view is a no-op. Returns the number of views destroyed.
    pub fn remove(&mut self, tag: ViewTag) -> usize {
        let Some(key) = self.key(tag) else {
            log::debug!("tree: remove of unknown view {tag} ignored");
            return 0;
        };
        self.unlink(key);

        let mut stack: SmallVec<[NodeKey; 16]> = SmallVec::new();
        stack.push(key);
        let mut removed = 0;
        while let Some(k) = stack.pop() {
            if let Some(node) = self.nodes.remove(k) {
                self.tags.remove(&node.tag);
                stack.extend(node.children);
                removed += 1;
            }
        }
        log::trace!("tree: removed {tag} ({removed} views)");
        removed
    }

    pub fn set_z_index(&mut self, tag: ViewTag, z: i32) -> bool {
        let Some(key) = self.key(tag) else {
            return self.missing(tag, "set_z_index");
        };
        if self.nodes[key].z_index == z {
            return true;
        }
        self.nodes[key].z_index = z;
        if let Some(parent) = self.nodes[key].parent {
            self.resort(parent);
        }
        true
    }

    pub fn set_frame(&mut self, tag: ViewTag, frame: Rect) -> bool {
        self.update(tag, "set_frame", |n| n.frame = frame)
    }

    pub fn set_transform(&mut self, tag: ViewTag, transform: Transform) -> bool {
        self.update(tag, "set_transform", |n| n.transform = transform)
    }

    pub fn set_clips_to_bounds(&mut self, tag: ViewTag, clips: bool) -> bool {
        self.update(tag, "set_clips_to_bounds", |n| n.clips_to_bounds = clips)
    }

    pub fn set_hidden(&mut self, tag: ViewTag, hidden: bool) -> bool {
        self.update(tag, "set_hidden", |n| n.hidden = hidden)
    }

    pub fn set_pointer_events(&mut self, tag: ViewTag, mode: PointerEvents) -> bool {
        self.update(tag, "set_pointer_events", |n| n.pointer_events = mode)
    }

    pub fn set_hit_slop(&mut self, tag: ViewTag, insets: EdgeInsets) -> bool {
        self.update(tag, "set_hit_slop", |n| n.hit_slop = insets)
    }

    pub fn set_cursor(&mut self, tag: ViewTag, cursor: Cursor) -> bool {
        self.update(tag, "set_cursor", |n| n.cursor = cursor)
    }

    pub fn contains(&self, tag: ViewTag) -> bool {
        self.tags.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, tag: ViewTag) -> Option<&ViewNode> {
        self.key(tag).map(|k| &self.nodes[k])
    }

    pub fn parent(&self, tag: ViewTag) -> Option<ViewTag> {
        let node = self.node(tag)?;
        node.parent.map(|p| self.nodes[p].tag)
    }

    /// Children in layout order.
    pub fn children(&self, tag: ViewTag) -> Vec<ViewTag> {
        self.node(tag)
            .map(|n| n.children.iter().map(|k| self.nodes[*k].tag).collect())
            .unwrap_or_default()
    }

    /// Children bottom-most first: ascending z-index, ties in layout order.
    pub fn z_sorted_children(&self, tag: ViewTag) -> Vec<ViewTag> {
        self.node(tag)
            .map(|n| n.draw_order.iter().map(|k| self.nodes[*k].tag).collect())
            .unwrap_or_default()
    }

    /// Returns the top-most view under `point`, which is given in `root`'s
    /// local space. `None` is a normal outcome (dead space, or everything
    /// under the point opted out of hit testing).
    pub fn hit_test(&self, point: Vec2, root: ViewTag) -> Option<ViewTag> {
        let key = self.key(root)?;
        self.hit_node(key, point).map(|k| self.nodes[k].tag)
    }

    fn hit_node(&self, key: NodeKey, p: Vec2) -> Option<NodeKey> {
        let node = &self.nodes[key];
        if node.hidden || node.pointer_events == PointerEvents::None {
            return None;
        }
        if node.clips_to_bounds && !node.bounds().contains(p) {
            return None;
        }

        if node.pointer_events.allows_children() {
            for &child_key in node.draw_order.iter().rev() {
                let Some(to_child) = self.nodes[child_key].local_from_parent() else {
                    continue;
                };
                if let Some(hit) = self.hit_node(child_key, to_child.apply_to_point(p)) {
                    return Some(hit);
                }
            }
        }

        if node.pointer_events.allows_self() && node.hit_bounds().contains(p) {
            Some(key)
        } else {
            None
        }
    }

    /// Transform from `root`'s local space into `target`'s local space.
    pub fn root_to_local(&self, root: ViewTag, target: ViewTag) -> Result<Transform> {
        let root_key = self.key(root).ok_or(Error::UnknownNode(root))?;
        let mut key = self.key(target).ok_or(Error::UnknownNode(target))?;

        // walking up from the target, each step is prepended on the left
        let mut out = Transform::identity();
        while key != root_key {
            let node = &self.nodes[key];
            let step = node.local_from_parent().ok_or(Error::NotInvertible(node.tag))?;
            out = out.combine(&step);
            key = node.parent.ok_or(Error::NotDescendant {
                node: target,
                root,
            })?;
        }
        Ok(out)
    }

    /// Maps a point in `root`'s local space into `target`'s local space.
    pub fn convert_point(&self, point: Vec2, root: ViewTag, target: ViewTag) -> Result<Vec2> {
        Ok(self.root_to_local(root, target)?.apply_to_point(point))
    }

    /// Bounding box of `target` in `root`'s local space.
    pub fn global_frame(&self, target: ViewTag, root: ViewTag) -> Result<Rect> {
        let root_key = self.key(root).ok_or(Error::UnknownNode(root))?;
        let mut key = self.key(target).ok_or(Error::UnknownNode(target))?;
        let bounds = self.nodes[key].bounds();

        let mut out = Transform::identity();
        while key != root_key {
            let node = &self.nodes[key];
            out = node.parent_from_local().combine(&out);
            key = node.parent.ok_or(Error::NotDescendant {
                node: target,
                root,
            })?;
        }
        Ok(out.apply_to_rect(bounds))
    }

    /// Tags from `root` down to `target`, both included.
    pub fn path_from(&self, root: ViewTag, target: ViewTag) -> Option<Vec<ViewTag>> {
        let root_key = self.key(root)?;
        let mut key = self.key(target)?;
        let mut path = vec![self.nodes[key].tag];
        while key != root_key {
            key = self.nodes[key].parent?;
            path.push(self.nodes[key].tag);
        }
        path.reverse();
        Some(path)
    }

    fn key(&self, tag: ViewTag) -> Option<NodeKey> {
        self.tags.get(&tag).copied()
    }

    fn update(&mut self, tag: ViewTag, op: &str, f: impl FnOnce(&mut ViewNode)) -> bool {
        match self.key(tag) {
            Some(key) => {
                f(&mut self.nodes[key]);
                true
            }
            None => self.missing(tag, op),
        }
    }

    fn missing(&self, tag: ViewTag, op: &str) -> bool {
        log::debug!("tree: {op} on unknown view {tag} ignored");
        false
    }

    /// Removes `key` from its parent's child lists.
    fn unlink(&mut self, key: NodeKey) -> bool {
        let Some(parent) = self.nodes[key].parent.take() else {
            return false;
        };
        let p = &mut self.nodes[parent];
        p.children.retain(|k| *k != key);
        p.draw_order.retain(|k| *k != key);
        true
    }

    fn resort(&mut self, parent: NodeKey) {
        let mut order = self.nodes[parent].children.clone();
        // stable: equal z keeps layout order, so later children stay on top
        order.sort_by_key(|k| self.nodes[*k].z_index);
        self.nodes[parent].draw_order = order;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(n: u64) -> ViewTag {
        ViewTag(n)
    }

    /// Root 0 (400x400) with the given children appended in order.
    fn tree_with(children: &[(u64, Rect)]) -> ViewTree {
        let mut t = ViewTree::new();
        t.create(tag(0), ViewKind::View).unwrap();
        t.set_frame(tag(0), Rect::new(0.0, 0.0, 400.0, 400.0));
        for (i, (id, frame)) in children.iter().enumerate() {
            t.create(tag(*id), ViewKind::View).unwrap();
            t.set_frame(tag(*id), *frame);
            t.insert(tag(*id), tag(0), i).unwrap();
        }
        t
    }

    #[test]
    fn later_sibling_wins_on_equal_z() {
        let t = tree_with(&[
            (1, Rect::new(0.0, 0.0, 100.0, 100.0)),
            (2, Rect::new(50.0, 50.0, 100.0, 100.0)),
        ]);
        assert_eq!(t.hit_test(Vec2::new(75.0, 75.0), tag(0)), Some(tag(2)));
        assert_eq!(t.hit_test(Vec2::new(10.0, 10.0), tag(0)), Some(tag(1)));
    }

    #[test]
    fn higher_z_wins_over_insertion_order() {
        let mut t = tree_with(&[
            (1, Rect::new(0.0, 0.0, 100.0, 100.0)),
            (2, Rect::new(0.0, 0.0, 100.0, 100.0)),
        ]);
        t.set_z_index(tag(1), 5);
        assert_eq!(t.hit_test(Vec2::new(5.0, 5.0), tag(0)), Some(tag(1)));
        assert_eq!(t.z_sorted_children(tag(0)), vec![tag(2), tag(1)]);
        assert_eq!(t.children(tag(0)), vec![tag(1), tag(2)]);
    }

    #[test]
    fn dead_space_falls_back_to_root_and_outside_is_none() {
        let t = tree_with(&[(1, Rect::new(0.0, 0.0, 10.0, 10.0))]);
        assert_eq!(t.hit_test(Vec2::new(200.0, 200.0), tag(0)), Some(tag(0)));
        assert_eq!(t.hit_test(Vec2::new(500.0, 10.0), tag(0)), None);
    }

    #[test]
    fn clipping_parent_hides_overflowing_child() {
        let mut t = tree_with(&[(1, Rect::new(0.0, 0.0, 100.0, 100.0))]);
        t.create(tag(2), ViewKind::View).unwrap();
        t.set_frame(tag(2), Rect::new(0.0, 0.0, 200.0, 50.0));
        t.insert(tag(2), tag(1), 0).unwrap();
        t.set_z_index(tag(2), 1);

        // unclipped: the overflowing part is hittable
        assert_eq!(t.hit_test(Vec2::new(150.0, 10.0), tag(0)), Some(tag(2)));

        t.set_clips_to_bounds(tag(1), true);
        assert_eq!(t.hit_test(Vec2::new(10.0, 10.0), tag(0)), Some(tag(2)));
        assert_eq!(t.hit_test(Vec2::new(150.0, 10.0), tag(0)), Some(tag(0)));
        // inside the clip, unaffected
        assert_eq!(t.hit_test(Vec2::new(50.0, 80.0), tag(0)), Some(tag(1)));
    }

    #[test]
    fn point_is_mapped_through_child_transform() {
        let mut t = tree_with(&[(1, Rect::new(100.0, 100.0, 100.0, 20.0))]);
        // a quarter turn about the centre turns the 100x20 bar upright
        t.set_transform(tag(1), Transform::rotate(std::f32::consts::FRAC_PI_2));
        assert_eq!(t.hit_test(Vec2::new(150.0, 70.0), tag(0)), Some(tag(1)));
        assert_eq!(t.hit_test(Vec2::new(105.0, 110.0), tag(0)), Some(tag(0)));
    }

    #[test]
    fn singular_transform_is_never_hit() {
        let mut t = tree_with(&[(1, Rect::new(0.0, 0.0, 100.0, 100.0))]);
        t.set_transform(tag(1), Transform::scale(0.0, 0.0));
        assert_eq!(t.hit_test(Vec2::new(50.0, 50.0), tag(0)), Some(tag(0)));
        assert_eq!(
            t.convert_point(Vec2::new(1.0, 1.0), tag(0), tag(1)),
            Err(Error::NotInvertible(tag(1)))
        );
    }

    #[test]
    fn pointer_event_modes() {
        let mut t = tree_with(&[(1, Rect::new(0.0, 0.0, 100.0, 100.0))]);
        t.create(tag(2), ViewKind::View).unwrap();
        t.set_frame(tag(2), Rect::new(0.0, 0.0, 50.0, 50.0));
        t.insert(tag(2), tag(1), 0).unwrap();
        let p_child = Vec2::new(10.0, 10.0);
        let p_parent = Vec2::new(80.0, 80.0);

        t.set_pointer_events(tag(1), PointerEvents::BoxNone);
        assert_eq!(t.hit_test(p_child, tag(0)), Some(tag(2)));
        assert_eq!(t.hit_test(p_parent, tag(0)), Some(tag(0)));

        t.set_pointer_events(tag(1), PointerEvents::BoxOnly);
        assert_eq!(t.hit_test(p_child, tag(0)), Some(tag(1)));

        t.set_pointer_events(tag(1), PointerEvents::None);
        assert_eq!(t.hit_test(p_child, tag(0)), Some(tag(0)));
    }

    #[test]
    fn hidden_subtree_is_skipped() {
        let mut t = tree_with(&[(1, Rect::new(0.0, 0.0, 100.0, 100.0))]);
        t.set_hidden(tag(1), true);
        assert_eq!(t.hit_test(Vec2::new(10.0, 10.0), tag(0)), Some(tag(0)));
    }

    #[test]
    fn hit_slop_grows_own_target_only() {
        let mut t = tree_with(&[(1, Rect::new(100.0, 100.0, 20.0, 20.0))]);
        t.set_hit_slop(tag(1), EdgeInsets::uniform(-10.0));
        assert_eq!(t.hit_test(Vec2::new(95.0, 95.0), tag(0)), Some(tag(1)));
        assert_eq!(t.hit_test(Vec2::new(85.0, 85.0), tag(0)), Some(tag(0)));
    }

    #[test]
    fn reinsert_moves_between_parents() {
        let mut t = tree_with(&[
            (1, Rect::new(0.0, 0.0, 10.0, 10.0)),
            (2, Rect::new(0.0, 0.0, 10.0, 10.0)),
        ]);
        t.create(tag(3), ViewKind::View).unwrap();
        t.insert(tag(3), tag(1), 0).unwrap();
        t.insert(tag(3), tag(2), 0).unwrap();
        assert!(t.children(tag(1)).is_empty());
        assert_eq!(t.children(tag(2)), vec![tag(3)]);
        assert_eq!(t.parent(tag(3)), Some(tag(2)));
    }

    #[test]
    fn reorder_within_same_parent() {
        let mut t = tree_with(&[
            (1, Rect::new(0.0, 0.0, 10.0, 10.0)),
            (2, Rect::new(0.0, 0.0, 10.0, 10.0)),
            (3, Rect::new(0.0, 0.0, 10.0, 10.0)),
        ]);
        t.insert(tag(3), tag(0), 0).unwrap();
        assert_eq!(t.children(tag(0)), vec![tag(3), tag(1), tag(2)]);
        assert_eq!(t.hit_test(Vec2::new(1.0, 1.0), tag(0)), Some(tag(2)));
    }

    #[test]
    fn cycles_and_unknown_nodes_are_rejected() {
        let mut t = tree_with(&[(1, Rect::default())]);
        assert_eq!(
            t.insert(tag(0), tag(1), 0),
            Err(Error::CycleDetected {
                node: tag(0),
                parent: tag(1)
            })
        );
        assert_eq!(t.insert(tag(9), tag(0), 0), Err(Error::UnknownNode(tag(9))));
        assert_eq!(t.create(tag(1), ViewKind::Text), Err(Error::DuplicateNode(tag(1))));
    }

    #[test]
    fn remove_is_recursive_and_idempotent() {
        let mut t = tree_with(&[(1, Rect::default())]);
        t.create(tag(2), ViewKind::View).unwrap();
        t.insert(tag(2), tag(1), 0).unwrap();
        assert_eq!(t.remove(tag(1)), 2);
        assert!(!t.contains(tag(2)));
        assert!(t.children(tag(0)).is_empty());
        assert_eq!(t.remove(tag(1)), 0);
        assert!(!t.set_frame(tag(1), Rect::default()));
    }

    #[test]
    fn detach_keeps_subtree_alive() {
        let mut t = tree_with(&[(1, Rect::default())]);
        t.create(tag(2), ViewKind::View).unwrap();
        t.insert(tag(2), tag(1), 0).unwrap();
        assert!(t.detach(tag(1)));
        assert!(!t.detach(tag(1)));
        assert_eq!(t.parent(tag(2)), Some(tag(1)));
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn conversions_follow_the_ancestor_chain() {
        let mut t = tree_with(&[(1, Rect::new(10.0, 20.0, 100.0, 100.0))]);
        t.create(tag(2), ViewKind::View).unwrap();
        t.set_frame(tag(2), Rect::new(5.0, 5.0, 30.0, 30.0));
        t.insert(tag(2), tag(1), 0).unwrap();

        let local = t.convert_point(Vec2::new(20.0, 30.0), tag(0), tag(2)).unwrap();
        assert_eq!(local, Vec2::new(5.0, 5.0));
        assert_eq!(
            t.global_frame(tag(2), tag(0)).unwrap(),
            Rect::new(15.0, 25.0, 30.0, 30.0)
        );
        assert_eq!(t.path_from(tag(0), tag(2)), Some(vec![tag(0), tag(1), tag(2)]));

        t.create(tag(7), ViewKind::View).unwrap();
        assert_eq!(
            t.convert_point(Vec2::ZERO, tag(0), tag(7)),
            Err(Error::NotDescendant {
                node: tag(7),
                root: tag(0)
            })
        );
    }
}
