#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Vec2) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

/// Axis-aligned rectangle. `x`/`y` is the top-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_size(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    pub fn size(&self) -> Size {
        Size {
            width: self.w,
            height: self.h,
        }
    }

    /// Half-open containment: the left/top edges are inside, the right/bottom
    /// edges belong to the neighbour.
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x < self.x + self.w && p.y >= self.y && p.y < self.y + self.h
    }

    /// Shrinks the rect by positive insets, grows it by negative ones.
    pub fn inset(&self, insets: EdgeInsets) -> Rect {
        Rect {
            x: self.x + insets.left,
            y: self.y + insets.top,
            w: (self.w - insets.left - insets.right).max(0.0),
            h: (self.h - insets.top - insets.bottom).max(0.0),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeInsets {
    pub top: f32,
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
}

impl EdgeInsets {
    pub const ZERO: EdgeInsets = EdgeInsets::uniform(0.0);

    pub const fn uniform(v: f32) -> Self {
        Self {
            top: v,
            left: v,
            bottom: v,
            right: v,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

/// 2D projective transform stored as a row-major 3x3 matrix acting on column
/// vectors `[x, y, 1]`. Affine transforms keep the last row at `[0, 0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    pub m: [[f32; 3]; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub const fn identity() -> Self {
        Self {
            m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    pub const fn translate(x: f32, y: f32) -> Self {
        Self {
            m: [[1.0, 0.0, x], [0.0, 1.0, y], [0.0, 0.0, 1.0]],
        }
    }

    pub const fn scale(sx: f32, sy: f32) -> Self {
        Self {
            m: [[sx, 0.0, 0.0], [0.0, sy, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Rotation in radians, clockwise in a y-down coordinate space.
    pub fn rotate(radians: f32) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self {
            m: [[cos, -sin, 0.0], [sin, cos, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Perspective foreshortening along x and y (the projective row).
    pub const fn perspective(px: f32, py: f32) -> Self {
        Self {
            m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [px, py, 1.0]],
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    pub fn apply_to_point(&self, p: Vec2) -> Vec2 {
        let m = &self.m;
        let x = m[0][0] * p.x + m[0][1] * p.y + m[0][2];
        let y = m[1][0] * p.x + m[1][1] * p.y + m[1][2];
        let w = m[2][0] * p.x + m[2][1] * p.y + m[2][2];
        if w == 1.0 || w == 0.0 {
            Vec2 { x, y }
        } else {
            Vec2 { x: x / w, y: y / w }
        }
    }

    /// Bounding box of the transformed corners.
    pub fn apply_to_rect(&self, r: Rect) -> Rect {
        let corners = [
            self.apply_to_point(Vec2::new(r.x, r.y)),
            self.apply_to_point(Vec2::new(r.x + r.w, r.y)),
            self.apply_to_point(Vec2::new(r.x, r.y + r.h)),
            self.apply_to_point(Vec2::new(r.x + r.w, r.y + r.h)),
        ];
        let (mut x0, mut y0) = (f32::INFINITY, f32::INFINITY);
        let (mut x1, mut y1) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for c in corners {
            x0 = x0.min(c.x);
            y0 = y0.min(c.y);
            x1 = x1.max(c.x);
            y1 = y1.max(c.y);
        }
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// `self * other`: the result applies `other` first, then `self`.
    pub fn combine(&self, other: &Transform) -> Transform {
        let a = &self.m;
        let b = &other.m;
        let mut m = [[0.0f32; 3]; 3];
        for (r, row) in m.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = a[r][0] * b[0][c] + a[r][1] * b[1][c] + a[r][2] * b[2][c];
            }
        }
        Transform { m }
    }

    /// Inverse via the adjugate. `None` for singular matrices (e.g. a zero scale).
    pub fn invert(&self) -> Option<Transform> {
        let m = &self.m;
        let c00 = m[1][1] * m[2][2] - m[1][2] * m[2][1];
        let c01 = m[1][2] * m[2][0] - m[1][0] * m[2][2];
        let c02 = m[1][0] * m[2][1] - m[1][1] * m[2][0];
        let det = m[0][0] * c00 + m[0][1] * c01 + m[0][2] * c02;
        if det.abs() <= f32::EPSILON * 1e-3 || !det.is_finite() {
            return None;
        }
        let inv_det = 1.0 / det;
        let adj = [
            [
                c00,
                m[0][2] * m[2][1] - m[0][1] * m[2][2],
                m[0][1] * m[1][2] - m[0][2] * m[1][1],
            ],
            [
                c01,
                m[0][0] * m[2][2] - m[0][2] * m[2][0],
                m[0][2] * m[1][0] - m[0][0] * m[1][2],
            ],
            [
                c02,
                m[0][1] * m[2][0] - m[0][0] * m[2][1],
                m[0][0] * m[1][1] - m[0][1] * m[1][0],
            ],
        ];
        let mut out = [[0.0f32; 3]; 3];
        for r in 0..3 {
            for c in 0..3 {
                out[r][c] = adj[r][c] * inv_det;
            }
        }
        Some(Transform { m: out })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3
    }

    #[test]
    fn rect_contains_is_half_open() {
        let r = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(r.contains(Vec2::new(0.0, 0.0)));
        assert!(r.contains(Vec2::new(99.9, 99.9)));
        assert!(!r.contains(Vec2::new(100.0, 50.0)));
        assert!(!r.contains(Vec2::new(-0.1, 50.0)));
    }

    #[test]
    fn negative_insets_grow_the_rect() {
        let r = Rect::new(10.0, 10.0, 20.0, 20.0).inset(EdgeInsets::uniform(-5.0));
        assert_eq!(r, Rect::new(5.0, 5.0, 30.0, 30.0));
    }

    #[test]
    fn inverse_round_trips_affine_and_perspective() {
        let t = Transform::translate(12.0, -4.0)
            .combine(&Transform::rotate(0.7))
            .combine(&Transform::scale(2.0, 0.5))
            .combine(&Transform::perspective(0.001, 0.002));
        let inv = t.invert().expect("invertible");
        let p = Vec2::new(31.0, 17.0);
        assert!(close(inv.apply_to_point(t.apply_to_point(p)), p));
    }

    #[test]
    fn zero_scale_is_not_invertible() {
        assert!(Transform::scale(0.0, 1.0).invert().is_none());
    }

    #[test]
    fn combine_applies_right_hand_side_first() {
        let t = Transform::translate(10.0, 0.0).combine(&Transform::scale(2.0, 2.0));
        assert!(close(t.apply_to_point(Vec2::new(1.0, 1.0)), Vec2::new(12.0, 2.0)));
    }
}
