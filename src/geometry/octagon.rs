use serde::{Deserialize, Serialize};

use crate::{
    geometry::{
        int_box::IntBox,
        line::Line,
        point::{FloatPoint, IntPoint},
        shape::{AccessTileShape, TileShape},
        simplex::Simplex,
    },
    math::{self, COORDINATE_LIMIT, SQRT2},
};

/// Octagon whose borders are horizontal, vertical or diagonal. `ulx`/`lrx`
/// bound `x - y` from below/above and `llx`/`urx` bound `x + y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntOctagon {
    pub lx: i64,
    pub ly: i64,
    pub rx: i64,
    pub uy: i64,
    pub ulx: i64,
    pub lrx: i64,
    pub llx: i64,
    pub urx: i64,
}

impl IntOctagon {
    pub const EMPTY: IntOctagon = IntOctagon {
        lx: COORDINATE_LIMIT,
        ly: COORDINATE_LIMIT,
        rx: -COORDINATE_LIMIT,
        uy: -COORDINATE_LIMIT,
        ulx: COORDINATE_LIMIT,
        lrx: -COORDINATE_LIMIT,
        llx: COORDINATE_LIMIT,
        urx: -COORDINATE_LIMIT,
    };

    #[allow(clippy::too_many_arguments)]
    pub fn new(lx: i64, ly: i64, rx: i64, uy: i64, ulx: i64, lrx: i64, llx: i64, urx: i64) -> Self {
        Self {
            lx,
            ly,
            rx,
            uy,
            ulx,
            lrx,
            llx,
            urx,
        }
        .normalize()
    }

    pub fn around(p: IntPoint) -> Self {
        IntBox::around(p).to_octagon()
    }

    pub fn bounding_float(points: impl IntoIterator<Item = FloatPoint>) -> Self {
        let mut bounds = [f64::MAX, f64::MAX, f64::MIN, f64::MIN, f64::MAX, f64::MIN, f64::MAX, f64::MIN];
        let mut found = false;

        for p in points {
            found = true;
            let (x, y) = (p.x(), p.y());
            bounds[0] = bounds[0].min(x);
            bounds[1] = bounds[1].min(y);
            bounds[2] = bounds[2].max(x);
            bounds[3] = bounds[3].max(y);
            bounds[4] = bounds[4].min(x - y);
            bounds[5] = bounds[5].max(x - y);
            bounds[6] = bounds[6].min(x + y);
            bounds[7] = bounds[7].max(x + y);
        }

        if !found {
            return IntOctagon::EMPTY;
        }

        IntOctagon::new(
            math::floor_to_i64(bounds[0]),
            math::floor_to_i64(bounds[1]),
            math::ceil_to_i64(bounds[2]),
            math::ceil_to_i64(bounds[3]),
            math::floor_to_i64(bounds[4]),
            math::ceil_to_i64(bounds[5]),
            math::floor_to_i64(bounds[6]),
            math::ceil_to_i64(bounds[7]),
        )
    }

    /// Tightens every bound against the others.
    fn normalize(self) -> Self {
        let mut o = self;

        for _ in 0..2 {
            o.lx = o.lx.max(o.ulx + o.ly).max(o.llx - o.uy);
            o.rx = o.rx.min(o.lrx + o.uy).min(o.urx - o.ly);
            o.ly = o.ly.max(o.lx - o.lrx).max(o.llx - o.rx);
            o.uy = o.uy.min(o.rx - o.ulx).min(o.urx - o.lx);
            o.ulx = o.ulx.max(o.lx - o.uy);
            o.lrx = o.lrx.min(o.rx - o.ly);
            o.llx = o.llx.max(o.lx + o.ly);
            o.urx = o.urx.min(o.rx + o.uy);
        }

        o
    }

    pub fn union(&self, other: &IntOctagon) -> IntOctagon {
        if self.is_empty() {
            return *other;
        }

        if other.is_empty() {
            return *self;
        }

        IntOctagon::new(
            self.lx.min(other.lx),
            self.ly.min(other.ly),
            self.rx.max(other.rx),
            self.uy.max(other.uy),
            self.ulx.min(other.ulx),
            self.lrx.max(other.lrx),
            self.llx.min(other.llx),
            self.urx.max(other.urx),
        )
    }

    pub fn intersection(&self, other: &IntOctagon) -> IntOctagon {
        IntOctagon::new(
            self.lx.max(other.lx),
            self.ly.max(other.ly),
            self.rx.min(other.rx),
            self.uy.min(other.uy),
            self.ulx.max(other.ulx),
            self.lrx.min(other.lrx),
            self.llx.max(other.llx),
            self.urx.min(other.urx),
        )
    }

    pub fn contains_int(&self, p: IntPoint) -> bool {
        let (x, y) = (p.x, p.y);
        self.lx <= x
            && x <= self.rx
            && self.ly <= y
            && y <= self.uy
            && self.ulx <= x - y
            && x - y <= self.lrx
            && self.llx <= x + y
            && x + y <= self.urx
    }

    pub fn contains_float(&self, p: FloatPoint) -> bool {
        let (x, y) = (p.x(), p.y());
        self.lx as f64 <= x
            && x <= self.rx as f64
            && self.ly as f64 <= y
            && y <= self.uy as f64
            && self.ulx as f64 <= x - y
            && x - y <= self.lrx as f64
            && self.llx as f64 <= x + y
            && x + y <= self.urx as f64
    }

    pub fn to_box(&self) -> IntBox {
        if self.is_empty() {
            return IntBox::EMPTY;
        }

        IntBox::new(self.lx, self.ly, self.rx, self.uy)
    }
}

impl AccessTileShape for IntOctagon {
    fn is_empty(&self) -> bool {
        self.lx > self.rx || self.ly > self.uy || self.ulx > self.lrx || self.llx > self.urx
    }

    fn border_lines(&self) -> Vec<Line> {
        if self.is_empty() {
            return vec![];
        }

        let p = IntPoint::new;
        vec![
            Line::new(p(0, self.ly), p(1, self.ly)),
            Line::new(p(self.lrx, 0), p(self.lrx + 1, 1)),
            Line::new(p(self.rx, 0), p(self.rx, 1)),
            Line::new(p(self.urx, 0), p(self.urx - 1, 1)),
            Line::new(p(0, self.uy), p(-1, self.uy)),
            Line::new(p(self.ulx, 0), p(self.ulx - 1, -1)),
            Line::new(p(self.lx, 0), p(self.lx, -1)),
            Line::new(p(self.llx, 0), p(self.llx + 1, -1)),
        ]
    }

    fn corners_approx(&self) -> Vec<FloatPoint> {
        if self.is_empty() {
            return vec![];
        }

        let p = |x: i64, y: i64| IntPoint::new(x, y).to_float();
        vec![
            p(self.llx - self.ly, self.ly),
            p(self.lrx + self.ly, self.ly),
            p(self.rx, self.rx - self.lrx),
            p(self.rx, self.urx - self.rx),
            p(self.urx - self.uy, self.uy),
            p(self.ulx + self.uy, self.uy),
            p(self.lx, self.lx - self.ulx),
            p(self.lx, self.llx - self.lx),
        ]
    }

    fn bounding_box(&self) -> IntBox {
        self.to_box()
    }

    fn bounding_octagon(&self) -> IntOctagon {
        *self
    }

    fn to_simplex(&self) -> Simplex {
        Simplex::new(self.border_lines())
    }

    fn enlarge(&self, offset: f64) -> TileShape {
        if self.is_empty() || offset <= 0.0 {
            return TileShape::Octagon(*self);
        }

        let ortho = math::ceil_to_i64(offset);
        let diag = math::ceil_to_i64(offset * SQRT2);
        TileShape::Octagon(IntOctagon::new(
            self.lx - ortho,
            self.ly - ortho,
            self.rx + ortho,
            self.uy + ortho,
            self.ulx - diag,
            self.lrx + diag,
            self.llx - diag,
            self.urx + diag,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_octagon_keeps_corners() {
        let octagon = IntBox::new(0, 0, 10, 20).to_octagon();
        assert!(octagon.contains_int(IntPoint::new(0, 0)));
        assert!(octagon.contains_int(IntPoint::new(10, 20)));
        assert!(!octagon.contains_int(IntPoint::new(11, 20)));
        assert_eq!(octagon.to_box(), IntBox::new(0, 0, 10, 20));
    }

    #[test]
    fn diagonal_bounds_cut_corners() {
        let octagon = IntOctagon::new(0, 0, 10, 10, -5, 5, 5, 15);
        assert!(!octagon.contains_int(IntPoint::new(0, 0)));
        assert!(octagon.contains_int(IntPoint::new(5, 5)));
        assert_eq!(octagon.corners_approx().len(), 8);
    }

    #[test]
    fn disjoint_octagons_have_empty_intersection() {
        let a = IntOctagon::around(IntPoint::new(0, 0));
        let b = IntOctagon::around(IntPoint::new(3, 3));
        assert!(a.intersection(&b).is_empty());
        assert!(!a.union(&b).is_empty());
    }
}
