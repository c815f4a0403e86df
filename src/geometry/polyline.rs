use geo::EuclideanDistance;

use crate::geometry::{
    direction::Direction,
    int_box::IntBox,
    line::{Line, Side},
    octagon::IntOctagon,
    point::{FloatPoint, IntPoint, Point},
    shape::{AccessTileShape, TileShape},
    simplex::Simplex,
};

/// A trace centerline given as a sequence of infinite lines. Corner `i` is
/// the intersection of lines `i` and `i + 1`, so the first and last line
/// only cut off the ends and every line in between carries one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    lines: Vec<Line>,
    corners: Vec<Point>,
}

impl Polyline {
    pub fn new(lines: impl IntoIterator<Item = Line>) -> Polyline {
        let lines = normalize(lines.into_iter().collect());
        let corners = lines
            .windows(2)
            .map(|pair| {
                pair[0]
                    .intersection(&pair[1])
                    .unwrap_or_else(|| unreachable!())
            })
            .collect();

        Polyline { lines, corners }
    }

    pub fn empty() -> Polyline {
        Polyline {
            lines: vec![],
            corners: vec![],
        }
    }

    /// Polyline through the given points. A single point gives a polyline
    /// with two equal corners.
    pub fn from_corners(points: &[IntPoint]) -> Polyline {
        let mut points = points.to_vec();
        points.dedup();

        match points.len() {
            0 => Polyline::empty(),
            1 => {
                let p = points[0];
                Polyline::new([
                    Line::from_direction(p, Direction::RIGHT),
                    Line::from_direction(p, Direction::UP),
                    Line::from_direction(p, Direction::RIGHT),
                ])
            }
            n => {
                let start_dir = Direction::between(points[0], points[1]).unwrap_or_else(|| unreachable!());
                let end_dir =
                    Direction::between(points[n - 2], points[n - 1]).unwrap_or_else(|| unreachable!());

                let mut lines = Vec::with_capacity(n + 1);
                lines.push(Line::from_direction(points[0], start_dir.turn_45_degree(2)));
                lines.extend(points.windows(2).map(|pair| Line::new(pair[0], pair[1])));
                lines.push(Line::from_direction(points[n - 1], end_dir.turn_45_degree(2)));
                Polyline::new(lines)
            }
        }
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// # Panics
    ///
    /// If `index` is out of range. See [`Polyline::get_line`].
    pub fn line(&self, index: usize) -> Line {
        self.lines[index]
    }

    pub fn get_line(&self, index: usize) -> Option<Line> {
        let line = self.lines.get(index).copied();

        if line.is_none() {
            log::warn!("line {} of a polyline with {} lines requested", index, self.lines.len());
        }

        line
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn corner_count(&self) -> usize {
        self.lines.len().saturating_sub(1)
    }

    pub fn segment_count(&self) -> usize {
        self.lines.len().saturating_sub(2)
    }

    pub fn corners(&self) -> &[Point] {
        &self.corners
    }

    /// # Panics
    ///
    /// If `index` is out of range. See [`Polyline::get_corner`].
    pub fn corner(&self, index: usize) -> Point {
        self.corners[index]
    }

    pub fn get_corner(&self, index: usize) -> Option<Point> {
        let corner = self.corners.get(index).copied();

        if corner.is_none() {
            log::warn!(
                "corner {} of a polyline with {} corners requested",
                index,
                self.corners.len()
            );
        }

        corner
    }

    pub fn corner_approx(&self, index: usize) -> FloatPoint {
        self.corners[index].to_float()
    }

    /// # Panics
    ///
    /// If the polyline is empty. See [`Polyline::ends`].
    pub fn first_corner(&self) -> Point {
        self.corners[0]
    }

    /// # Panics
    ///
    /// If the polyline is empty. See [`Polyline::ends`].
    pub fn last_corner(&self) -> Point {
        self.corners[self.corners.len() - 1]
    }

    /// First and last corner, or `None` for an empty polyline.
    pub fn ends(&self) -> Option<(Point, Point)> {
        match (self.corners.first(), self.corners.last()) {
            (Some(&first), Some(&last)) => Some((first, last)),
            _ => {
                log::warn!("ends of an empty polyline requested");
                None
            }
        }
    }

    /// True if all corners coincide.
    pub fn is_point(&self) -> bool {
        self.corners.windows(2).all(|pair| pair[0] == pair[1])
    }

    /// Same corners in reverse order.
    pub fn reverse(&self) -> Polyline {
        Polyline::new(self.lines.iter().rev().map(|line| line.opposite()))
    }

    pub fn length_approx(&self) -> f64 {
        self.corners
            .windows(2)
            .map(|pair| pair[0].to_float().euclidean_distance(&pair[1].to_float()))
            .sum()
    }

    /// Index of the first corner equal to `p`.
    pub fn find_corner(&self, p: IntPoint) -> Option<usize> {
        self.corners.iter().position(|corner| *corner == p)
    }

    /// Convex shape of segment `index` (body line `index + 1`) widened by
    /// `half_width` on both sides and cut off at its neighbour lines.
    pub fn offset_shape(&self, half_width: f64, index: usize) -> Option<TileShape> {
        if index >= self.segment_count() {
            log::debug!("segment {} out of range for {} segments", index, self.segment_count());
            return None;
        }

        let k = index + 1;
        let prev = self.lines[k - 1];
        let curr = self.lines[k];
        let next = self.lines[k + 1];

        let back = if prev.vector().cross(curr.vector()) > 0 {
            prev.translate(-half_width)
        } else {
            prev.translate(half_width).opposite()
        };

        let front = if curr.vector().cross(next.vector()) > 0 {
            next.translate(-half_width)
        } else {
            next.translate(half_width).opposite()
        };

        let bounds = IntOctagon::bounding_float([self.corner_approx(k - 1), self.corner_approx(k)])
            .enlarge(half_width);

        let mut lines = vec![
            curr.translate(-half_width),
            front,
            curr.translate(half_width).opposite(),
            back,
        ];
        lines.extend(bounds.border_lines());

        Some(TileShape::Simplex(Simplex::new(lines)))
    }

    pub fn offset_shapes(&self, half_width: f64) -> Vec<TileShape> {
        self.offset_shapes_range(half_width, 0, self.segment_count())
    }

    /// Offset shapes of the segments `from..to`.
    pub fn offset_shapes_range(&self, half_width: f64, from: usize, to: usize) -> Vec<TileShape> {
        (from..to.min(self.segment_count()))
            .filter_map(|index| self.offset_shape(half_width, index))
            .collect()
    }

    pub fn bounding_box(&self) -> IntBox {
        IntBox::bounding_float(self.corners.iter().map(|corner| corner.to_float()))
    }

    pub fn bounding_octagon(&self) -> IntOctagon {
        IntOctagon::bounding_float(self.corners.iter().map(|corner| corner.to_float()))
    }

    /// Appends `other`, which has to start where this polyline ends.
    pub fn combine(&self, other: &Polyline) -> Option<Polyline> {
        if self.is_empty() || other.is_empty() || self.last_corner() != other.first_corner() {
            return None;
        }

        let lines = self.lines[..self.lines.len() - 1]
            .iter()
            .chain(other.lines[1..].iter())
            .copied();
        let joined = Polyline::new(lines);

        (!joined.is_empty()).then_some(joined)
    }

    /// Cuts body line `line_no` with `end_line`. The cut point has to lie
    /// strictly inside the segment of that line.
    pub fn split(&self, line_no: usize, end_line: &Line) -> Option<(Polyline, Polyline)> {
        if line_no == 0 || line_no + 1 >= self.lines.len() {
            return None;
        }

        let line = self.lines[line_no];

        if line.is_parallel(end_line) {
            return None;
        }

        let side_before = end_line.side_of(&self.corners[line_no - 1]);
        let side_after = end_line.side_of(&self.corners[line_no]);

        if side_before == Side::Collinear
            || side_after == Side::Collinear
            || side_before == side_after
        {
            return None;
        }

        let first = Polyline::new(
            self.lines[..=line_no]
                .iter()
                .copied()
                .chain(std::iter::once(*end_line)),
        );
        let second = Polyline::new(
            std::iter::once(*end_line).chain(self.lines[line_no..].iter().copied()),
        );

        if first.is_empty() || second.is_empty() || first.is_point() || second.is_point() {
            return None;
        }

        Some((first, second))
    }

    /// Splits at an inner corner, which becomes the last corner of the first
    /// piece and the first corner of the second.
    pub fn split_at_corner(&self, corner_no: usize) -> Option<(Polyline, Polyline)> {
        if corner_no == 0 || corner_no + 1 >= self.corner_count() {
            return None;
        }

        let first = Polyline::new(self.lines[..=corner_no + 1].iter().copied());
        let second = Polyline::new(self.lines[corner_no..].iter().copied());

        if first.is_empty() || second.is_empty() || first.is_point() || second.is_point() {
            return None;
        }

        Some((first, second))
    }

    /// Replaces the lines `from..=to` with `replacement`.
    pub fn replace_lines(&self, from: usize, to: usize, replacement: &[Line]) -> Polyline {
        Polyline::new(
            self.lines[..from]
                .iter()
                .chain(replacement.iter())
                .chain(self.lines[to + 1..].iter())
                .copied(),
        )
    }
}

fn normalize(mut lines: Vec<Line>) -> Vec<Line> {
    loop {
        lines.dedup_by(|later, kept| kept.is_parallel(later));

        if lines.len() < 3 {
            return vec![];
        }

        let n = lines.len();

        if let Some(i) = (1..n.saturating_sub(3)).find(|&i| lines[i].is_equal_or_opposite(&lines[i + 2])) {
            lines.drain(i + 1..=i + 2);
            continue;
        }

        let zero_length = (2..n.saturating_sub(2)).find(|&k| {
            match (lines[k - 1].intersection(&lines[k]), lines[k].intersection(&lines[k + 1])) {
                (Some(p), Some(q)) => p == q,
                _ => false,
            }
        });

        if let Some(k) = zero_length {
            lines.remove(k);
            continue;
        }

        break;
    }

    for k in 1..lines.len() - 1 {
        let (Some(p), Some(q)) = (
            lines[k - 1].intersection_approx(&lines[k]),
            lines[k].intersection_approx(&lines[k + 1]),
        ) else {
            continue;
        };

        let v = lines[k].vector();
        let dot = v.x as f64 * (q.x() - p.x()) + v.y as f64 * (q.y() - p.y());

        if dot < 0.0 {
            lines[k] = lines[k].opposite();
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i64, y: i64) -> IntPoint {
        IntPoint::new(x, y)
    }

    fn corners(points: &[(i64, i64)]) -> Vec<Point> {
        points.iter().map(|&(x, y)| Point::Int(p(x, y))).collect()
    }

    #[test]
    fn corner_and_segment_counts_follow_line_count() {
        let polyline = Polyline::from_corners(&[p(0, 0), p(0, 1000), p(1000, 1000), p(1000, 2000)]);
        assert_eq!(polyline.line_count(), 5);
        assert_eq!(polyline.corner_count(), polyline.line_count() - 1);
        assert_eq!(polyline.segment_count(), polyline.line_count() - 2);
        assert_eq!(polyline.first_corner(), p(0, 0));
        assert_eq!(polyline.last_corner(), p(1000, 2000));
    }

    #[test]
    fn out_of_range_access_gives_none() {
        let polyline = Polyline::from_corners(&[p(0, 0), p(0, 1000)]);
        assert_eq!(polyline.get_corner(1), Some(Point::Int(p(0, 1000))));
        assert_eq!(polyline.get_corner(2), None);
        assert_eq!(polyline.get_line(1), Some(polyline.line(1)));
        assert_eq!(polyline.get_line(3), None);
        assert_eq!(
            polyline.ends(),
            Some((Point::Int(p(0, 0)), Point::Int(p(0, 1000))))
        );

        let empty = Polyline::empty();
        assert_eq!(empty.get_corner(0), None);
        assert_eq!(empty.get_line(0), None);
        assert_eq!(empty.ends(), None);
    }

    #[test]
    fn collinear_corners_are_merged() {
        let polyline = Polyline::from_corners(&[p(0, 0), p(500, 0), p(1000, 0), p(1000, 700)]);
        assert_eq!(polyline.corner_count(), 3);
        assert_eq!(polyline.corner(1), p(1000, 0));
    }

    #[test]
    fn single_point_polyline() {
        let polyline = Polyline::from_corners(&[p(7, 7), p(7, 7)]);
        assert_eq!(polyline.corner_count(), 2);
        assert!(polyline.is_point());
    }

    #[test]
    fn combine_joins_at_common_corner() {
        let a = Polyline::from_corners(&[p(0, 0), p(1000, 0)]);
        let b = Polyline::from_corners(&[p(1000, 0), p(1000, 1000)]);
        let joined = a.combine(&b).unwrap();
        assert_eq!(joined.corners().to_vec(), corners(&[(0, 0), (1000, 0), (1000, 1000)]));
        assert!(b.combine(&a).is_none());
    }

    #[test]
    fn combine_skips_collinear_line() {
        let a = Polyline::from_corners(&[p(0, 0), p(1000, 0)]);
        let b = Polyline::from_corners(&[p(1000, 0), p(2000, 0)]);
        let joined = a.combine(&b).unwrap();
        assert_eq!(joined.segment_count(), a.segment_count() + b.segment_count() - 1);
        assert_eq!(joined.last_corner(), p(2000, 0));
    }

    #[test]
    fn split_inside_segment() {
        let polyline = Polyline::from_corners(&[p(0, 0), p(1000, 0), p(1000, 1000)]);
        let cut = Line::new(p(400, 0), p(400, 1));
        let (first, second) = polyline.split(1, &cut).unwrap();
        assert_eq!(first.last_corner(), p(400, 0));
        assert_eq!(second.first_corner(), p(400, 0));
        assert_eq!(second.last_corner(), p(1000, 1000));
        assert!(polyline.split(1, &Line::new(p(1000, 0), p(1000, 1))).is_none());
    }

    #[test]
    fn split_at_inner_corner() {
        let polyline = Polyline::from_corners(&[p(0, 0), p(1000, 0), p(1000, 1000)]);
        let (first, second) = polyline.split_at_corner(1).unwrap();
        assert_eq!(first.corners().to_vec(), corners(&[(0, 0), (1000, 0)]));
        assert_eq!(second.corners().to_vec(), corners(&[(1000, 0), (1000, 1000)]));
        assert!(polyline.split_at_corner(0).is_none());
    }

    #[test]
    fn overlapping_return_is_removed() {
        let polyline = Polyline::from_corners(&[
            p(0, 0),
            p(0, 100),
            p(500, 100),
            p(300, 100),
            p(300, 600),
        ]);
        assert_eq!(
            polyline.corners().to_vec(),
            corners(&[(0, 0), (0, 100), (300, 100), (300, 600)])
        );
    }

    #[test]
    fn offset_shape_of_straight_segment() {
        let polyline = Polyline::from_corners(&[p(0, 0), p(1000, 0)]);
        let shape = polyline.offset_shape(50.0, 0).unwrap();
        assert_eq!(shape.bounding_box(), IntBox::new(-50, -50, 1050, 50));
        assert!(shape.contains_int(p(500, 50)));
        assert!(!shape.contains_int(p(500, 51)));
        assert!(polyline.offset_shape(50.0, 1).is_none());
    }

    #[test]
    fn reverse_keeps_corners() {
        let polyline = Polyline::from_corners(&[p(0, 0), p(1000, 0), p(1000, 1000)]);
        let reversed = polyline.reverse();
        assert_eq!(reversed.first_corner(), p(1000, 1000));
        assert_eq!(reversed.last_corner(), p(0, 0));
        assert_eq!(reversed.reverse(), polyline);
    }
}
