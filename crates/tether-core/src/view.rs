use std::fmt;

use smallvec::SmallVec;

use crate::{EdgeInsets, Rect, Transform, Vec2};

/// Identifier the external layout engine assigns to a view. Stable for the
/// lifetime of the view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ViewTag(pub u64);

impl fmt::Display for ViewTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

slotmap::new_key_type! {
    /// Internal handle into the tree's node storage.
    pub(crate) struct NodeKey;
}

/// Control-specific capability attached to a node. Hit testing only looks at
/// the common geometry; the kind is carried for hosts and tooling.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ViewKind {
    #[default]
    View,
    Text,
    TextInput,
    Image,
    ScrollView,
    Switch,
    Slider,
    Picker,
    Custom(String),
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewKind::View => write!(f, "View"),
            ViewKind::Text => write!(f, "Text"),
            ViewKind::TextInput => write!(f, "TextInput"),
            ViewKind::Image => write!(f, "Image"),
            ViewKind::ScrollView => write!(f, "ScrollView"),
            ViewKind::Switch => write!(f, "Switch"),
            ViewKind::Slider => write!(f, "Slider"),
            ViewKind::Picker => write!(f, "Picker"),
            ViewKind::Custom(name) => write!(f, "{name}"),
        }
    }
}

/// Which parts of a subtree may become a hit-test target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PointerEvents {
    /// The view and its children can be targets.
    #[default]
    Auto,
    /// Neither the view nor any descendant can be a target.
    None,
    /// Only descendants can be targets.
    BoxNone,
    /// Only the view itself can be a target.
    BoxOnly,
}

impl PointerEvents {
    pub fn allows_self(self) -> bool {
        matches!(self, PointerEvents::Auto | PointerEvents::BoxOnly)
    }

    pub fn allows_children(self) -> bool {
        matches!(self, PointerEvents::Auto | PointerEvents::BoxNone)
    }
}

/// Pointer image a view asks for while hovered. `Inherit` defers to the
/// nearest ancestor that sets one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Cursor {
    #[default]
    Inherit,
    /// Hide the pointer.
    None,
    Default,
    Pointer,
    Text,
    Move,
    Grab,
    Grabbing,
}

#[derive(Clone, Debug)]
pub struct ViewNode {
    pub tag: ViewTag,
    pub kind: ViewKind,
    /// Frame in the parent's coordinate space.
    pub frame: Rect,
    /// Applied about the centre of the frame.
    pub transform: Transform,
    pub z_index: i32,
    pub clips_to_bounds: bool,
    pub hidden: bool,
    pub pointer_events: PointerEvents,
    /// Insets applied to the bounds when the view itself is tested.
    pub hit_slop: EdgeInsets,
    pub cursor: Cursor,
    pub(crate) parent: Option<NodeKey>,
    /// Child sequence as ordered by the layout engine.
    pub(crate) children: SmallVec<[NodeKey; 4]>,
    /// `children` stably sorted by z-index, bottom first.
    pub(crate) draw_order: SmallVec<[NodeKey; 4]>,
}

impl ViewNode {
    pub(crate) fn new(tag: ViewTag, kind: ViewKind) -> Self {
        Self {
            tag,
            kind,
            frame: Rect::default(),
            transform: Transform::identity(),
            z_index: 0,
            clips_to_bounds: false,
            hidden: false,
            pointer_events: PointerEvents::Auto,
            hit_slop: EdgeInsets::ZERO,
            cursor: Cursor::Inherit,
            parent: None,
            children: SmallVec::new(),
            draw_order: SmallVec::new(),
        }
    }

    /// The view's own rectangle in its local space.
    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.frame.size())
    }

    /// Rectangle the view itself matches against.
    pub fn hit_bounds(&self) -> Rect {
        self.bounds().inset(self.hit_slop)
    }

    /// Maps local points into the parent's space.
    pub fn parent_from_local(&self) -> Transform {
        if self.transform.is_identity() {
            return Transform::translate(self.frame.x, self.frame.y);
        }
        let c = Vec2::new(self.frame.w * 0.5, self.frame.h * 0.5);
        Transform::translate(self.frame.x + c.x, self.frame.y + c.y)
            .combine(&self.transform)
            .combine(&Transform::translate(-c.x, -c.y))
    }

    /// Maps parent-space points into local space; `None` if the transform is
    /// singular.
    pub fn local_from_parent(&self) -> Option<Transform> {
        self.parent_from_local().invert()
    }
}
