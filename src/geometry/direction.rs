use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{
    geometry::point::{IntPoint, IntVector},
    math::{gcd, Signum},
};

/// A direction is an integer vector reduced by the gcd of its coordinates,
/// so that two parallel vectors of the same orientation compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Direction {
    x: i64,
    y: i64,
}

impl Direction {
    pub const RIGHT: Direction = Direction { x: 1, y: 0 };
    pub const UP: Direction = Direction { x: 0, y: 1 };
    pub const LEFT: Direction = Direction { x: -1, y: 0 };
    pub const DOWN: Direction = Direction { x: 0, y: -1 };

    pub fn new(vector: IntVector) -> Option<Direction> {
        if vector.is_zero() {
            return None;
        }

        let divisor = gcd(vector.x as i128, vector.y as i128) as i64;

        Some(Direction {
            x: vector.x / divisor,
            y: vector.y / divisor,
        })
    }

    pub fn between(from: IntPoint, to: IntPoint) -> Option<Direction> {
        Self::new(to.difference_by(from))
    }

    pub fn vector(&self) -> IntVector {
        IntVector::new(self.x, self.y)
    }

    pub fn opposite(&self) -> Direction {
        Direction {
            x: -self.x,
            y: -self.y,
        }
    }

    /// Turns counterclockwise by `n` times 45 degrees.
    pub fn turn_45_degree(&self, n: u32) -> Direction {
        let mut result = *self;

        for _ in 0..n % 8 {
            let turned = IntVector::new(result.x - result.y, result.x + result.y);
            result = Direction::new(turned).unwrap_or(result);
        }

        result
    }

    /// Sign of the scalar product.
    pub fn projection(&self, other: &Direction) -> Signum {
        Signum::of_i128(self.vector().dot(other.vector()))
    }

    /// Positive if `other` turns to the left of `self`.
    pub fn turn_side(&self, other: &Direction) -> Signum {
        Signum::of_i128(self.vector().cross(other.vector()))
    }

    pub fn is_orthogonal(&self) -> bool {
        self.x == 0 || self.y == 0
    }

    pub fn is_diagonal(&self) -> bool {
        self.x.abs() == self.y.abs()
    }

    pub fn is_multiple_of_45_degree(&self) -> bool {
        self.is_orthogonal() || self.is_diagonal()
    }

    pub fn cos_angle(&self, other: &Direction) -> f64 {
        let v = self.vector();
        let w = other.vector();
        v.dot(w) as f64 / (v.length() * w.length())
    }

    /// Direction of the sum of both vectors; for 45 degree multiples this is
    /// the exact bisector.
    pub fn sum(&self, other: &Direction) -> Option<Direction> {
        Direction::new(self.vector() + other.vector())
    }

    /// Approximate bisector for arbitrary directions.
    pub fn middle_approx(&self, other: &Direction) -> Option<Direction> {
        const SCALE: f64 = 1.0e4;
        let v = self.vector();
        let w = other.vector();
        let (lv, lw) = (v.length(), w.length());
        let x = v.x as f64 / lv + w.x as f64 / lw;
        let y = v.y as f64 / lv + w.y as f64 / lw;
        Direction::new(IntVector::new(
            (x * SCALE).round() as i64,
            (y * SCALE).round() as i64,
        ))
    }

    /// Compares by counterclockwise angle measured from the positive x axis.
    pub fn compare_angle(&self, other: &Direction) -> Ordering {
        let half = |d: &Direction| if d.y > 0 || (d.y == 0 && d.x > 0) { 0 } else { 1 };

        half(self)
            .cmp(&half(other))
            .then_with(|| 0.cmp(&self.vector().cross(other.vector())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduces_by_gcd() {
        let direction = Direction::new(IntVector::new(-300, 600));
        assert_eq!(direction, Direction::new(IntVector::new(-1, 2)));
    }

    #[test]
    fn turns_orthogonal_directions_through_diagonals() {
        let diagonal = Direction::RIGHT.turn_45_degree(1);
        assert!(diagonal.is_diagonal());
        assert_eq!(Direction::RIGHT.turn_45_degree(2), Direction::UP);
        assert_eq!(Direction::RIGHT.turn_45_degree(4), Direction::LEFT);
        assert_eq!(Direction::UP.turn_45_degree(6), Direction::RIGHT);
    }

    #[test]
    fn orders_counterclockwise() {
        let mut directions = vec![
            Direction::DOWN,
            Direction::LEFT,
            Direction::RIGHT,
            Direction::UP,
        ];
        directions.sort_by(|a, b| a.compare_angle(b));
        assert_eq!(
            directions,
            vec![
                Direction::RIGHT,
                Direction::UP,
                Direction::LEFT,
                Direction::DOWN
            ]
        );
    }
}
