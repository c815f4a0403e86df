use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

pub const SQRT2: f64 = std::f64::consts::SQRT_2;

/// Coordinates beyond this bound are not expected on a board.
pub const COORDINATE_LIMIT: i64 = 1 << 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signum {
    Negative,
    Zero,
    Positive,
}

impl Signum {
    pub fn of_i128(value: i128) -> Self {
        match value.cmp(&0) {
            Ordering::Less => Signum::Negative,
            Ordering::Equal => Signum::Zero,
            Ordering::Greater => Signum::Positive,
        }
    }

    pub fn of_f64(value: f64) -> Self {
        if value > 0.0 {
            Signum::Positive
        } else if value < 0.0 {
            Signum::Negative
        } else {
            Signum::Zero
        }
    }

    pub fn negate(self) -> Self {
        match self {
            Signum::Negative => Signum::Positive,
            Signum::Zero => Signum::Zero,
            Signum::Positive => Signum::Negative,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Signum::Negative => -1.0,
            Signum::Zero => 0.0,
            Signum::Positive => 1.0,
        }
    }
}

pub fn gcd(a: i128, b: i128) -> i128 {
    let (mut a, mut b) = (a.abs(), b.abs());

    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }

    a
}

pub fn round_to_i64(value: f64) -> i64 {
    value.round().clamp(-(COORDINATE_LIMIT as f64), COORDINATE_LIMIT as f64) as i64
}

pub fn floor_to_i64(value: f64) -> i64 {
    value.floor().clamp(-(COORDINATE_LIMIT as f64), COORDINATE_LIMIT as f64) as i64
}

pub fn ceil_to_i64(value: f64) -> i64 {
    value.ceil().clamp(-(COORDINATE_LIMIT as f64), COORDINATE_LIMIT as f64) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gcd_ignores_signs() {
        assert_eq!(gcd(-12, 18), 6);
        assert_eq!(gcd(0, -7), 7);
        assert_eq!(gcd(0, 0), 0);
    }

    #[test]
    fn signum_of_values() {
        assert_eq!(Signum::of_i128(-3), Signum::Negative);
        assert_eq!(Signum::of_f64(0.0), Signum::Zero);
        assert_eq!(Signum::Positive.negate(), Signum::Negative);
    }
}
