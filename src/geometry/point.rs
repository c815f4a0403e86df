use std::ops::{Add, Neg, Sub};

use geo::{point, EuclideanDistance};
use serde::{Deserialize, Serialize};

use crate::math::{self, gcd};

pub type FloatPoint = geo::Point;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IntPoint {
    pub x: i64,
    pub y: i64,
}

impl IntPoint {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    pub fn round(p: FloatPoint) -> Self {
        Self::new(math::round_to_i64(p.x()), math::round_to_i64(p.y()))
    }

    pub fn to_float(self) -> FloatPoint {
        point! {x: self.x as f64, y: self.y as f64}
    }

    pub fn difference_by(self, other: IntPoint) -> IntVector {
        IntVector::new(self.x - other.x, self.y - other.y)
    }

    pub fn translate_by(self, vector: IntVector) -> IntPoint {
        IntPoint::new(self.x + vector.x, self.y + vector.y)
    }

    pub fn distance(self, other: IntPoint) -> f64 {
        self.to_float().euclidean_distance(&other.to_float())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntVector {
    pub x: i64,
    pub y: i64,
}

impl IntVector {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    pub fn is_zero(self) -> bool {
        self.x == 0 && self.y == 0
    }

    pub fn cross(self, other: IntVector) -> i128 {
        self.x as i128 * other.y as i128 - self.y as i128 * other.x as i128
    }

    pub fn dot(self, other: IntVector) -> i128 {
        self.x as i128 * other.x as i128 + self.y as i128 * other.y as i128
    }

    pub fn length(self) -> f64 {
        (self.x as f64).hypot(self.y as f64)
    }
}

impl Add for IntVector {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for IntVector {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl Neg for IntVector {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// Exact point in homogeneous coordinates, kept reduced with a positive
/// denominator so that structural equality is geometric equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RationalPoint {
    x: i128,
    y: i128,
    z: i128,
}

impl RationalPoint {
    pub fn to_float(&self) -> FloatPoint {
        point! {x: self.x as f64 / self.z as f64, y: self.y as f64 / self.z as f64}
    }
}

/// A corner of a polyline: integral whenever the intersection happens to
/// land on the grid, rational otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Point {
    Int(IntPoint),
    Rational(RationalPoint),
}

impl Point {
    pub fn from_homogeneous(x: i128, y: i128, z: i128) -> Option<Point> {
        if z == 0 {
            return None;
        }

        let sign = if z < 0 { -1 } else { 1 };
        let divisor = gcd(gcd(x, y), z);
        let (x, y, z) = (sign * x / divisor, sign * y / divisor, sign * z / divisor);

        if z == 1 {
            if let (Ok(x), Ok(y)) = (i64::try_from(x), i64::try_from(y)) {
                return Some(Point::Int(IntPoint::new(x, y)));
            }
        }

        Some(Point::Rational(RationalPoint { x, y, z }))
    }

    pub fn homogeneous(&self) -> (i128, i128, i128) {
        match self {
            Point::Int(p) => (p.x as i128, p.y as i128, 1),
            Point::Rational(p) => (p.x, p.y, p.z),
        }
    }

    pub fn to_float(&self) -> FloatPoint {
        match self {
            Point::Int(p) => p.to_float(),
            Point::Rational(p) => p.to_float(),
        }
    }

    pub fn as_int(&self) -> Option<IntPoint> {
        match self {
            Point::Int(p) => Some(*p),
            Point::Rational(..) => None,
        }
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Point::Int(..))
    }

    pub fn round(&self) -> IntPoint {
        match self {
            Point::Int(p) => *p,
            Point::Rational(p) => IntPoint::round(p.to_float()),
        }
    }
}

impl From<IntPoint> for Point {
    fn from(p: IntPoint) -> Self {
        Point::Int(p)
    }
}

impl PartialEq<IntPoint> for Point {
    fn eq(&self, other: &IntPoint) -> bool {
        matches!(self, Point::Int(p) if p == other)
    }
}

pub fn float_distance_square(p: FloatPoint, q: FloatPoint) -> f64 {
    let dx = p.x() - q.x();
    let dy = p.y() - q.y();
    dx * dx + dy * dy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn homogeneous_point_reduces_to_int() {
        assert_eq!(
            Point::from_homogeneous(10, -20, -5),
            Some(Point::Int(IntPoint::new(-2, 4)))
        );
    }

    #[test]
    fn rational_points_compare_after_reduction() {
        let p = Point::from_homogeneous(1, 3, 2);
        let q = Point::from_homogeneous(-2, -6, -4);
        assert_eq!(p, q);
        assert!(!p.map(|p| p.is_int()).unwrap_or(true));
    }

    #[test]
    fn zero_denominator_has_no_point() {
        assert_eq!(Point::from_homogeneous(1, 1, 0), None);
    }
}
