//! Hover enter/leave tracking for pointers that are not in contact.
//!
//! The tracker remembers the root-to-target path of the last hover position.
//! When the path changes it emits leaves for the nodes no longer on it
//! (deepest first) and enters for the new ones (shallowest first). Ancestors
//! shared by both paths get nothing.

use smallvec::SmallVec;

use crate::Vec2;
use crate::tree::ViewTree;
use crate::view::{Cursor, ViewTag};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum HoverEvent {
    Enter(ViewTag),
    Leave(ViewTag),
}

#[derive(Debug, Default)]
pub struct HoverTracker {
    path: SmallVec<[ViewTag; 8]>,
}

impl HoverTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deepest hovered view, if any.
    pub fn target(&self) -> Option<ViewTag> {
        self.path.last().copied()
    }

    pub fn path(&self) -> &[ViewTag] {
        &self.path
    }

    /// Hit-tests `point` under `root` and diffs against the previous path.
    pub fn update(&mut self, tree: &ViewTree, root: ViewTag, point: Vec2) -> Vec<HoverEvent> {
        let path = tree
            .hit_test(point, root)
            .and_then(|hit| tree.path_from(root, hit))
            .unwrap_or_default();
        self.update_path(&path)
    }

    /// Replaces the hovered path (root first) and returns the transitions.
    pub fn update_path(&mut self, next: &[ViewTag]) -> Vec<HoverEvent> {
        let common = self
            .path
            .iter()
            .zip(next)
            .take_while(|(a, b)| a == b)
            .count();

        let mut out = Vec::new();
        out.extend(self.path[common..].iter().rev().map(|t| HoverEvent::Leave(*t)));
        out.extend(next[common..].iter().map(|t| HoverEvent::Enter(*t)));

        self.path.clear();
        self.path.extend_from_slice(next);
        out
    }

    /// Cursor of the nearest view on the hovered path, starting from the
    /// target, that sets one. `Default` when nothing does.
    pub fn cursor(&self, tree: &ViewTree) -> Cursor {
        self.path
            .iter()
            .rev()
            .filter_map(|t| tree.node(*t))
            .map(|n| n.cursor)
            .find(|c| *c != Cursor::Inherit)
            .unwrap_or(Cursor::Default)
    }

    /// Pointer left the window: leave everything.
    pub fn clear(&mut self) -> Vec<HoverEvent> {
        self.update_path(&[])
    }

    /// Drops views that no longer exist without emitting leaves for them.
    pub(crate) fn retain_existing(&mut self, tree: &ViewTree) {
        if let Some(gone) = self.path.iter().position(|t| !tree.contains(*t)) {
            self.path.truncate(gone);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Rect;
    use crate::view::ViewKind;

    fn t(n: u64) -> ViewTag {
        ViewTag(n)
    }

    #[test]
    fn sibling_switch_leaves_then_enters() {
        let mut hover = HoverTracker::new();
        assert_eq!(
            hover.update_path(&[t(1), t(2), t(3)]),
            vec![
                HoverEvent::Enter(t(1)),
                HoverEvent::Enter(t(2)),
                HoverEvent::Enter(t(3))
            ]
        );
        assert_eq!(
            hover.update_path(&[t(1), t(4)]),
            vec![
                HoverEvent::Leave(t(3)),
                HoverEvent::Leave(t(2)),
                HoverEvent::Enter(t(4))
            ]
        );
        assert_eq!(hover.target(), Some(t(4)));
    }

    #[test]
    fn same_path_is_quiet() {
        let mut hover = HoverTracker::new();
        hover.update_path(&[t(1), t(2)]);
        assert!(hover.update_path(&[t(1), t(2)]).is_empty());
    }

    #[test]
    fn clear_leaves_deepest_first() {
        let mut hover = HoverTracker::new();
        hover.update_path(&[t(1), t(2)]);
        assert_eq!(
            hover.clear(),
            vec![HoverEvent::Leave(t(2)), HoverEvent::Leave(t(1))]
        );
        assert_eq!(hover.target(), None);
    }

    #[test]
    fn follows_hit_testing() {
        let mut tree = ViewTree::new();
        tree.create(t(1), ViewKind::View).unwrap();
        tree.set_frame(t(1), Rect::new(0.0, 0.0, 100.0, 100.0));
        tree.create(t(2), ViewKind::View).unwrap();
        tree.set_frame(t(2), Rect::new(0.0, 0.0, 50.0, 50.0));
        tree.insert(t(2), t(1), 0).unwrap();

        let mut hover = HoverTracker::new();
        assert_eq!(
            hover.update(&tree, t(1), Vec2::new(10.0, 10.0)),
            vec![HoverEvent::Enter(t(1)), HoverEvent::Enter(t(2))]
        );
        assert_eq!(
            hover.update(&tree, t(1), Vec2::new(80.0, 80.0)),
            vec![HoverEvent::Leave(t(2))]
        );
        assert_eq!(
            hover.update(&tree, t(1), Vec2::new(180.0, 80.0)),
            vec![HoverEvent::Leave(t(1))]
        );
    }

    #[test]
    fn cursor_comes_from_nearest_provider() {
        let mut tree = ViewTree::new();
        for n in 1..=3 {
            tree.create(t(n), ViewKind::View).unwrap();
        }
        tree.insert(t(2), t(1), 0).unwrap();
        tree.insert(t(3), t(2), 0).unwrap();

        let mut hover = HoverTracker::new();
        assert_eq!(hover.cursor(&tree), Cursor::Default);

        hover.update_path(&[t(1), t(2), t(3)]);
        assert_eq!(hover.cursor(&tree), Cursor::Default);

        tree.set_cursor(t(1), Cursor::Grab);
        assert_eq!(hover.cursor(&tree), Cursor::Grab);
        tree.set_cursor(t(3), Cursor::Text);
        assert_eq!(hover.cursor(&tree), Cursor::Text);
        tree.set_cursor(t(3), Cursor::None);
        assert_eq!(hover.cursor(&tree), Cursor::None);
    }

    #[test]
    fn removed_views_drop_out_silently() {
        let mut tree = ViewTree::new();
        tree.create(t(1), ViewKind::View).unwrap();
        let mut hover = HoverTracker::new();
        hover.update_path(&[t(1), t(2)]);
        hover.retain_existing(&tree);
        assert_eq!(hover.path(), &[t(1)]);
    }
}
