use geo::point;
use serde::{Deserialize, Serialize};

use crate::{
    geometry::{
        direction::Direction,
        point::{FloatPoint, IntPoint, IntVector, Point},
    },
    math::{self, Signum},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
    Collinear,
}

impl Side {
    fn of(signum: Signum) -> Side {
        match signum {
            Signum::Positive => Side::Left,
            Signum::Negative => Side::Right,
            Signum::Zero => Side::Collinear,
        }
    }

    pub fn negate(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
            Side::Collinear => Side::Collinear,
        }
    }
}

/// Infinite directed line through two distinct integer points. The region to
/// its left is the positive side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Line {
    pub a: IntPoint,
    pub b: IntPoint,
}

impl Line {
    pub fn new(a: IntPoint, b: IntPoint) -> Self {
        debug_assert!(a != b);
        Self { a, b }
    }

    pub fn from_direction(a: IntPoint, direction: Direction) -> Self {
        Self {
            a,
            b: a.translate_by(direction.vector()),
        }
    }

    pub fn vector(&self) -> IntVector {
        self.b.difference_by(self.a)
    }

    pub fn direction(&self) -> Direction {
        Direction::new(self.vector()).unwrap_or(Direction::RIGHT)
    }

    pub fn opposite(&self) -> Line {
        Line {
            a: self.b,
            b: self.a,
        }
    }

    pub fn side_of_int(&self, p: IntPoint) -> Side {
        Side::of(Signum::of_i128(self.vector().cross(p.difference_by(self.a))))
    }

    pub fn side_of(&self, p: &Point) -> Side {
        let (x, y, z) = p.homogeneous();
        let v = self.vector();
        let dx = x - self.a.x as i128 * z;
        let dy = y - self.a.y as i128 * z;
        Side::of(Signum::of_i128(v.x as i128 * dy - v.y as i128 * dx))
    }

    pub fn side_of_float(&self, p: FloatPoint) -> Side {
        Side::of(Signum::of_f64(self.signed_distance(p)))
    }

    /// Positive on the left of the line.
    pub fn signed_distance(&self, p: FloatPoint) -> f64 {
        let v = self.vector();
        let dx = p.x() - self.a.x as f64;
        let dy = p.y() - self.a.y as f64;
        (v.x as f64 * dy - v.y as f64 * dx) / v.length()
    }

    pub fn is_parallel(&self, other: &Line) -> bool {
        self.vector().cross(other.vector()) == 0
    }

    pub fn is_equal_or_opposite(&self, other: &Line) -> bool {
        self.is_parallel(other) && self.side_of_int(other.a) == Side::Collinear
    }

    pub fn is_orthogonal(&self) -> bool {
        self.direction().is_orthogonal()
    }

    pub fn is_diagonal(&self) -> bool {
        self.direction().is_diagonal()
    }

    pub fn is_multiple_of_45_degree(&self) -> bool {
        self.direction().is_multiple_of_45_degree()
    }

    /// Moves the line to its left by `dist` (to its right for negative
    /// values). Only one coordinate of both points is shifted, so the
    /// direction is kept exactly and the result is rounded to the grid.
    pub fn translate(&self, dist: f64) -> Line {
        let v = self.vector();
        let length = v.length();

        let shift = if v.x.abs() <= v.y.abs() {
            IntVector::new(math::round_to_i64(-dist * length / v.y as f64), 0)
        } else {
            IntVector::new(0, math::round_to_i64(dist * length / v.x as f64))
        };

        Line {
            a: self.a.translate_by(shift),
            b: self.b.translate_by(shift),
        }
    }

    /// Line through `p` perpendicular to this one.
    pub fn perpendicular(&self, p: IntPoint) -> Line {
        Line::from_direction(p, self.direction().turn_45_degree(2))
    }

    pub fn intersection(&self, other: &Line) -> Option<Point> {
        let d1 = self.vector();
        let d2 = other.vector();
        let det = d1.cross(d2);

        if det == 0 {
            return None;
        }

        let num = other.a.difference_by(self.a).cross(d2);
        Point::from_homogeneous(
            self.a.x as i128 * det + d1.x as i128 * num,
            self.a.y as i128 * det + d1.y as i128 * num,
            det,
        )
    }

    pub fn intersection_approx(&self, other: &Line) -> Option<FloatPoint> {
        let d1 = self.vector();
        let d2 = other.vector();
        let det = d1.cross(d2) as f64;

        if det == 0.0 {
            return None;
        }

        let t = other.a.difference_by(self.a).cross(d2) as f64 / det;
        Some(point! {
            x: self.a.x as f64 + d1.x as f64 * t,
            y: self.a.y as f64 + d1.y as f64 * t,
        })
    }

    /// Orthogonal projection of `p` onto the line.
    pub fn projection_approx(&self, p: FloatPoint) -> FloatPoint {
        let v = self.vector();
        let (vx, vy) = (v.x as f64, v.y as f64);
        let t = ((p.x() - self.a.x as f64) * vx + (p.y() - self.a.y as f64) * vy)
            / (vx * vx + vy * vy);
        point! {x: self.a.x as f64 + vx * t, y: self.a.y as f64 + vy * t}
    }
}
