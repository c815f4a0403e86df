use serde::{Deserialize, Serialize};

use crate::{
    geometry::{
        line::Line,
        octagon::IntOctagon,
        point::{FloatPoint, IntPoint},
        shape::{AccessTileShape, TileShape},
        simplex::Simplex,
    },
    math::{self, COORDINATE_LIMIT},
};

/// Axis parallel box with integer corners, closed on all sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntBox {
    pub ll: IntPoint,
    pub ur: IntPoint,
}

impl IntBox {
    pub const EMPTY: IntBox = IntBox {
        ll: IntPoint::new(COORDINATE_LIMIT, COORDINATE_LIMIT),
        ur: IntPoint::new(-COORDINATE_LIMIT, -COORDINATE_LIMIT),
    };

    pub fn new(llx: i64, lly: i64, urx: i64, ury: i64) -> Self {
        Self {
            ll: IntPoint::new(llx, lly),
            ur: IntPoint::new(urx, ury),
        }
    }

    pub fn around(p: IntPoint) -> Self {
        Self { ll: p, ur: p }
    }

    pub fn bounding_float(points: impl IntoIterator<Item = FloatPoint>) -> Self {
        points.into_iter().fold(IntBox::EMPTY, |acc, p| {
            acc.union(&IntBox::new(
                math::floor_to_i64(p.x()),
                math::floor_to_i64(p.y()),
                math::ceil_to_i64(p.x()),
                math::ceil_to_i64(p.y()),
            ))
        })
    }

    pub fn union(&self, other: &IntBox) -> IntBox {
        if self.is_empty() {
            return *other;
        }

        if other.is_empty() {
            return *self;
        }

        IntBox::new(
            self.ll.x.min(other.ll.x),
            self.ll.y.min(other.ll.y),
            self.ur.x.max(other.ur.x),
            self.ur.y.max(other.ur.y),
        )
    }

    pub fn intersection(&self, other: &IntBox) -> IntBox {
        IntBox::new(
            self.ll.x.max(other.ll.x),
            self.ll.y.max(other.ll.y),
            self.ur.x.min(other.ur.x),
            self.ur.y.min(other.ur.y),
        )
    }

    pub fn overlaps(&self, other: &IntBox) -> bool {
        !self.intersection(other).is_empty()
    }

    pub fn contains_box(&self, other: &IntBox) -> bool {
        other.is_empty()
            || (self.ll.x <= other.ll.x
                && self.ll.y <= other.ll.y
                && self.ur.x >= other.ur.x
                && self.ur.y >= other.ur.y)
    }

    pub fn contains_int(&self, p: IntPoint) -> bool {
        self.ll.x <= p.x && p.x <= self.ur.x && self.ll.y <= p.y && p.y <= self.ur.y
    }

    pub fn width(&self) -> i64 {
        self.ur.x - self.ll.x
    }

    pub fn height(&self) -> i64 {
        self.ur.y - self.ll.y
    }

    pub fn max_width(&self) -> i64 {
        self.width().max(self.height())
    }

    pub fn min_width(&self) -> i64 {
        self.width().min(self.height())
    }

    pub fn to_octagon(&self) -> IntOctagon {
        if self.is_empty() {
            return IntOctagon::EMPTY;
        }

        IntOctagon::new(
            self.ll.x,
            self.ll.y,
            self.ur.x,
            self.ur.y,
            self.ll.x - self.ur.y,
            self.ur.x - self.ll.y,
            self.ll.x + self.ll.y,
            self.ur.x + self.ur.y,
        )
    }
}

impl AccessTileShape for IntBox {
    fn is_empty(&self) -> bool {
        self.ll.x > self.ur.x || self.ll.y > self.ur.y
    }

    fn border_lines(&self) -> Vec<Line> {
        if self.is_empty() {
            return vec![];
        }

        let IntBox { ll, ur } = *self;
        vec![
            Line::new(ll, IntPoint::new(ll.x + 1, ll.y)),
            Line::new(IntPoint::new(ur.x, ll.y), IntPoint::new(ur.x, ll.y + 1)),
            Line::new(ur, IntPoint::new(ur.x - 1, ur.y)),
            Line::new(IntPoint::new(ll.x, ur.y), IntPoint::new(ll.x, ur.y - 1)),
        ]
    }

    fn corners_approx(&self) -> Vec<FloatPoint> {
        if self.is_empty() {
            return vec![];
        }

        vec![
            self.ll.to_float(),
            IntPoint::new(self.ur.x, self.ll.y).to_float(),
            self.ur.to_float(),
            IntPoint::new(self.ll.x, self.ur.y).to_float(),
        ]
    }

    fn bounding_box(&self) -> IntBox {
        *self
    }

    fn bounding_octagon(&self) -> IntOctagon {
        self.to_octagon()
    }

    fn to_simplex(&self) -> Simplex {
        Simplex::new(self.border_lines())
    }

    fn enlarge(&self, offset: f64) -> TileShape {
        if self.is_empty() || offset <= 0.0 {
            return TileShape::Box(*self);
        }

        let offset = math::ceil_to_i64(offset);
        TileShape::Box(IntBox::new(
            self.ll.x - offset,
            self.ll.y - offset,
            self.ur.x + offset,
            self.ur.y + offset,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_box_is_neutral_for_union() {
        let b = IntBox::new(0, 0, 10, 20);
        assert_eq!(IntBox::EMPTY.union(&b), b);
        assert!(IntBox::EMPTY.is_empty());
    }

    #[test]
    fn touching_boxes_overlap() {
        let a = IntBox::new(0, 0, 10, 10);
        let b = IntBox::new(10, 5, 20, 20);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&IntBox::new(11, 0, 20, 10)));
    }
}
