use crate::{
    geometry::{AccessTileShape, FloatPoint, IntBox, IntOctagon, TileShape},
    math,
};

/// Octagon with float bounds that only grows until it is reset.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FloatOctagon {
    lx: f64,
    ly: f64,
    rx: f64,
    uy: f64,
    ulx: f64,
    lrx: f64,
    llx: f64,
    urx: f64,
}

impl FloatOctagon {
    const EMPTY: FloatOctagon = FloatOctagon {
        lx: f64::MAX,
        ly: f64::MAX,
        rx: f64::MIN,
        uy: f64::MIN,
        ulx: f64::MAX,
        lrx: f64::MIN,
        llx: f64::MAX,
        urx: f64::MIN,
    };

    fn is_empty(&self) -> bool {
        self.lx > self.rx
    }

    fn join(&mut self, p: FloatPoint) {
        let (x, y) = (p.x(), p.y());
        self.lx = self.lx.min(x);
        self.ly = self.ly.min(y);
        self.rx = self.rx.max(x);
        self.uy = self.uy.max(y);
        self.ulx = self.ulx.min(x - y);
        self.lrx = self.lrx.max(x - y);
        self.llx = self.llx.min(x + y);
        self.urx = self.urx.max(x + y);
    }

    fn round_outward(&self) -> IntOctagon {
        if self.is_empty() {
            return IntOctagon::EMPTY;
        }

        IntOctagon::new(
            math::floor_to_i64(self.lx),
            math::floor_to_i64(self.ly),
            math::ceil_to_i64(self.rx),
            math::ceil_to_i64(self.uy),
            math::floor_to_i64(self.ulx),
            math::ceil_to_i64(self.lrx),
            math::floor_to_i64(self.llx),
            math::ceil_to_i64(self.urx),
        )
    }
}

/// Region per layer where the board was modified since the optimizer last
/// looked at it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangedArea {
    areas: Vec<FloatOctagon>,
}

impl ChangedArea {
    pub fn new(layer_count: usize) -> Self {
        Self {
            areas: vec![FloatOctagon::EMPTY; layer_count.max(1)],
        }
    }

    pub fn layer_count(&self) -> usize {
        self.areas.len()
    }

    pub fn join(&mut self, p: FloatPoint, layer: usize) {
        match self.areas.get_mut(layer) {
            Some(area) => area.join(p),
            None => log::warn!("changed area layer {} out of range", layer),
        }
    }

    pub fn join_shape(&mut self, shape: &TileShape, layer: usize) {
        for corner in shape.corners_approx() {
            self.join(corner, layer);
        }
    }

    /// Changed region of `layer` rounded outward to the integer grid.
    pub fn area(&self, layer: usize) -> IntOctagon {
        self.areas
            .get(layer)
            .map_or(IntOctagon::EMPTY, |area| area.round_outward())
    }

    pub fn is_empty(&self, layer: usize) -> bool {
        self.areas.get(layer).map_or(true, |area| area.is_empty())
    }

    pub fn is_all_empty(&self) -> bool {
        self.areas.iter().all(|area| area.is_empty())
    }

    pub fn set_empty(&mut self, layer: usize) {
        if let Some(area) = self.areas.get_mut(layer) {
            *area = FloatOctagon::EMPTY;
        }
    }

    /// Box around the changed regions of all layers.
    pub fn surrounding_box(&self) -> IntBox {
        (0..self.areas.len()).fold(IntBox::EMPTY, |bbox, layer| {
            bbox.union(&self.area(layer).to_box())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::IntPoint;

    #[test]
    fn joined_points_are_rounded_outward() {
        let mut area = ChangedArea::new(2);
        assert!(area.is_all_empty());
        area.join((0.5, 0.5).into(), 1);
        area.join((10.2, 3.0).into(), 1);
        assert!(area.is_empty(0));
        let octagon = area.area(1);
        assert!(octagon.contains_int(IntPoint::new(1, 1)));
        assert!(!octagon.contains_int(IntPoint::new(0, 0)));
        assert!(octagon.contains_int(IntPoint::new(11, 3)));
        assert_eq!(area.surrounding_box(), IntBox::new(0, 0, 11, 3));
        area.set_empty(1);
        assert!(area.is_all_empty());
    }
}
