use geo::point;

use crate::geometry::{
    int_box::IntBox,
    line::{Line, Side},
    octagon::IntOctagon,
    point::{float_distance_square, FloatPoint, IntPoint},
    shape::{AccessTileShape, TileShape},
};

const CLIP_LIMIT: f64 = 1.0e12;
const CLIP_TOLERANCE: f64 = 1.0e-6;
const MIN_EDGE_LENGTH_SQUARE: f64 = 1.0e-12;

/// General convex polygon: the intersection of the half planes to the left
/// of its border lines. The lines are kept sorted counterclockwise without
/// redundant ones, and the corners are computed once on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Simplex {
    lines: Vec<Line>,
    corners: Vec<FloatPoint>,
}

impl Simplex {
    pub fn new(lines: impl IntoIterator<Item = Line>) -> Simplex {
        let mut lines: Vec<Line> = lines.into_iter().collect();

        if lines.is_empty() {
            return Simplex::empty();
        }

        lines.sort_by(|l1, l2| l1.direction().compare_angle(&l2.direction()));
        lines.dedup_by(|later, kept| {
            if later.direction() != kept.direction() {
                return false;
            }

            if kept.side_of_int(later.a) == Side::Left {
                *kept = *later;
            }

            true
        });

        Self::clip(lines)
    }

    /// Convex polygon through the given corners, in either orientation.
    pub fn from_corners(corners: &[IntPoint]) -> Simplex {
        let n = corners.len();

        if n < 3 {
            return Simplex::empty();
        }

        let doubled_area: i128 = (0..n)
            .map(|i| {
                let (p, q) = (corners[i], corners[(i + 1) % n]);
                p.x as i128 * q.y as i128 - q.x as i128 * p.y as i128
            })
            .sum();

        let ordered: Vec<IntPoint> = if doubled_area < 0 {
            corners.iter().rev().copied().collect()
        } else {
            corners.to_vec()
        };

        Simplex::new(
            (0..n)
                .map(|i| (ordered[i], ordered[(i + 1) % n]))
                .filter(|(p, q)| p != q)
                .map(|(p, q)| Line::new(p, q)),
        )
    }

    pub fn empty() -> Simplex {
        Simplex {
            lines: vec![],
            corners: vec![],
        }
    }

    fn clip(lines: Vec<Line>) -> Simplex {
        let mut polygon: Vec<(FloatPoint, Option<usize>)> = vec![
            (point! {x: -CLIP_LIMIT, y: -CLIP_LIMIT}, None),
            (point! {x: CLIP_LIMIT, y: -CLIP_LIMIT}, None),
            (point! {x: CLIP_LIMIT, y: CLIP_LIMIT}, None),
            (point! {x: -CLIP_LIMIT, y: CLIP_LIMIT}, None),
        ];

        for (i, line) in lines.iter().enumerate() {
            let n = polygon.len();
            let mut clipped = Vec::with_capacity(n + 1);

            for k in 0..n {
                let (p, label) = polygon[k];
                let (q, _) = polygon[(k + 1) % n];
                let dp = line.signed_distance(p);
                let dq = line.signed_distance(q);
                let p_inside = dp >= -CLIP_TOLERANCE;
                let q_inside = dq >= -CLIP_TOLERANCE;

                if p_inside {
                    clipped.push((p, label));

                    if !q_inside {
                        clipped.push((interpolate(p, q, dp, dq), Some(i)));
                    }
                } else if q_inside {
                    clipped.push((interpolate(p, q, dp, dq), label));
                }
            }

            polygon = clipped;

            if polygon.is_empty() {
                return Simplex::empty();
            }
        }

        let n = polygon.len();
        let mut polygon: Vec<(FloatPoint, Option<usize>)> = (0..n)
            .map(|k| {
                let (p, label) = polygon[k];
                let p = match (polygon[(k + n - 1) % n].1, label) {
                    (Some(i), Some(j)) if i != j => lines[i].intersection_approx(&lines[j]).unwrap_or(p),
                    _ => p,
                };
                (snap(p), label)
            })
            .collect();

        polygon.dedup_by(|later, kept| {
            if float_distance_square(later.0, kept.0) < MIN_EDGE_LENGTH_SQUARE {
                kept.1 = later.1;
                true
            } else {
                false
            }
        });

        while polygon.len() > 1
            && float_distance_square(polygon[0].0, polygon[polygon.len() - 1].0)
                < MIN_EDGE_LENGTH_SQUARE
        {
            polygon.pop();
        }

        let corners: Vec<FloatPoint> = polygon.iter().map(|(p, _)| *p).collect();
        let mut kept: Vec<Line> = polygon.iter().filter_map(|(_, label)| *label).map(|i| lines[i]).collect();
        kept.dedup();

        if kept.len() < 2 {
            kept = lines;
        }

        Simplex {
            lines: kept,
            corners,
        }
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn intersection(&self, other: &Simplex) -> Simplex {
        Simplex::new(self.lines.iter().chain(other.lines.iter()).copied())
    }
}

fn snap(p: FloatPoint) -> FloatPoint {
    let snap_coordinate = |c: f64| {
        if (c - c.round()).abs() < 1.0e-7 {
            c.round()
        } else {
            c
        }
    };
    point! {x: snap_coordinate(p.x()), y: snap_coordinate(p.y())}
}

fn interpolate(p: FloatPoint, q: FloatPoint, dp: f64, dq: f64) -> FloatPoint {
    let t = dp / (dp - dq);
    point! {x: p.x() + (q.x() - p.x()) * t, y: p.y() + (q.y() - p.y()) * t}
}

impl AccessTileShape for Simplex {
    fn is_empty(&self) -> bool {
        self.corners.is_empty()
    }

    fn border_lines(&self) -> Vec<Line> {
        self.lines.clone()
    }

    fn corners_approx(&self) -> Vec<FloatPoint> {
        self.corners.clone()
    }

    fn bounding_box(&self) -> IntBox {
        IntBox::bounding_float(self.corners.iter().copied())
    }

    fn bounding_octagon(&self) -> IntOctagon {
        IntOctagon::bounding_float(self.corners.iter().copied())
    }

    fn to_simplex(&self) -> Simplex {
        self.clone()
    }

    fn enlarge(&self, offset: f64) -> TileShape {
        if self.is_empty() || offset <= 0.0 {
            return TileShape::Simplex(self.clone());
        }

        TileShape::Simplex(Simplex::new(self.lines.iter().map(|line| line.translate(-offset))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i64, y: i64) -> IntPoint {
        IntPoint::new(x, y)
    }

    #[test]
    fn triangle_from_clockwise_corners() {
        let triangle = Simplex::from_corners(&[p(0, 0), p(0, 10), p(10, 0)]);
        assert_eq!(triangle.border_lines().len(), 3);
        assert_eq!(triangle.corners_approx().len(), 3);
        assert!(triangle.contains_int(p(2, 2)));
        assert!(!triangle.contains_int(p(8, 8)));
    }

    #[test]
    fn redundant_lines_are_dropped() {
        let square = IntBox::new(0, 0, 10, 10);
        let mut lines = square.border_lines();
        lines.push(Line::new(p(20, 0), p(20, 1)));
        lines.push(Line::new(p(0, 2), p(1, 2)));
        let simplex = Simplex::new(lines);
        assert_eq!(simplex.border_lines().len(), 4);
        assert_eq!(simplex.bounding_box(), IntBox::new(0, 2, 10, 10));
    }

    #[test]
    fn disjoint_half_planes_are_empty() {
        let simplex = Simplex::new([
            Line::new(p(0, 0), p(1, 0)),
            Line::new(p(0, -5), p(-1, -5)),
        ]);
        assert!(simplex.is_empty());
    }

    #[test]
    fn enlarge_moves_borders_outwards() {
        let simplex = IntBox::new(0, 0, 10, 10).to_simplex();
        let enlarged = simplex.enlarge(5.0);
        assert_eq!(enlarged.bounding_box(), IntBox::new(-5, -5, 15, 15));
    }
}
