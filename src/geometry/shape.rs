use enum_dispatch::enum_dispatch;
use geo::{Coord, Geometry, Intersects, LineString, Polygon};
use rstar::AABB;

use crate::geometry::{
    int_box::IntBox,
    line::{Line, Side},
    octagon::IntOctagon,
    point::{FloatPoint, IntPoint, Point},
    simplex::Simplex,
};

#[enum_dispatch]
pub trait AccessTileShape {
    fn is_empty(&self) -> bool;
    /// Counterclockwise, with the shape on the left of every line.
    fn border_lines(&self) -> Vec<Line>;
    fn corners_approx(&self) -> Vec<FloatPoint>;
    fn bounding_box(&self) -> IntBox;
    fn bounding_octagon(&self) -> IntOctagon;
    fn to_simplex(&self) -> Simplex;
    fn enlarge(&self, offset: f64) -> TileShape;

    fn contains(&self, p: &Point) -> bool {
        !self.is_empty()
            && self
                .border_lines()
                .iter()
                .all(|line| line.side_of(p) != Side::Right)
    }

    fn contains_int(&self, p: IntPoint) -> bool {
        self.contains(&Point::Int(p))
    }

    fn contains_inside(&self, p: &Point) -> bool {
        !self.is_empty()
            && self
                .border_lines()
                .iter()
                .all(|line| line.side_of(p) == Side::Left)
    }

    fn contains_float(&self, p: FloatPoint) -> bool {
        !self.is_empty()
            && self
                .border_lines()
                .iter()
                .all(|line| line.signed_distance(p) >= -1.0e-9)
    }

    fn is_outside(&self, p: &Point) -> bool {
        !self.contains(p)
    }
}

#[enum_dispatch(AccessTileShape)]
#[derive(Debug, Clone, PartialEq)]
pub enum TileShape {
    Box(IntBox),
    Octagon(IntOctagon),
    Simplex(Simplex),
}

impl TileShape {
    pub fn border_line_count(&self) -> usize {
        self.border_lines().len()
    }

    pub fn center_approx(&self) -> FloatPoint {
        let corners = self.corners_approx();
        let n = corners.len().max(1) as f64;
        let (x, y) = corners
            .iter()
            .fold((0.0, 0.0), |(x, y), p| (x + p.x(), y + p.y()));
        (x / n, y / n).into()
    }

    pub fn is_contained_in(&self, b: &IntBox) -> bool {
        b.contains_box(&self.bounding_box())
    }

    pub fn intersection(&self, other: &TileShape) -> TileShape {
        match (self, other) {
            (TileShape::Box(b1), TileShape::Box(b2)) => TileShape::Box(b1.intersection(b2)),
            (TileShape::Simplex(..), _) | (_, TileShape::Simplex(..)) => {
                TileShape::Simplex(self.to_simplex().intersection(&other.to_simplex()))
            }
            _ => TileShape::Octagon(self.bounding_octagon().intersection(&other.bounding_octagon())),
        }
    }

    /// Closed intersection test: shapes that only touch do intersect.
    pub fn intersects(&self, other: &TileShape) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }

        if !self.bounding_box().overlaps(&other.bounding_box()) {
            return false;
        }

        match (self, other) {
            (TileShape::Box(..), TileShape::Box(..)) => true,
            (TileShape::Simplex(..), _) | (_, TileShape::Simplex(..)) => {
                self.to_geometry().intersects(&other.to_geometry())
            }
            _ => !self
                .bounding_octagon()
                .intersection(&other.bounding_octagon())
                .is_empty(),
        }
    }

    pub fn to_geometry(&self) -> Geometry {
        let corners = self.corners_approx();

        match corners.len() {
            0 => Geometry::GeometryCollection(Default::default()),
            1 => Geometry::Point(corners[0]),
            2 => Geometry::Line(geo::Line::new(corners[0], corners[1])),
            _ => Geometry::Polygon(Polygon::new(
                LineString::from(corners.iter().map(|p| Coord::from(*p)).collect::<Vec<_>>()),
                vec![],
            )),
        }
    }

    pub fn envelope_3d(&self, layer: usize) -> AABB<[f64; 3]> {
        let bbox = self.bounding_box();
        AABB::from_corners(
            [bbox.ll.x as f64, bbox.ll.y as f64, layer as f64],
            [bbox.ur.x as f64, bbox.ur.y as f64, layer as f64],
        )
    }

    /// Same kind as the conservative tree shape of the given variant.
    pub fn to_variant(&self, variant: ShapeVariant) -> TileShape {
        match variant {
            ShapeVariant::Exact => self.clone(),
            ShapeVariant::Octagon => TileShape::Octagon(self.bounding_octagon()),
            ShapeVariant::Box => TileShape::Box(self.bounding_box()),
        }
    }
}

/// Which conservative approximation a search tree stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ShapeVariant {
    Exact,
    Octagon,
    Box,
}
