use crate::{
    geometry::{Direction, FloatPoint, IntPoint, Line, Polyline, Side},
    math::{ceil_to_i64, floor_to_i64, Signum, SQRT2},
};

use super::{CornerSmoothing, PullTight, TightenPolyline, MAX_TIGHTEN_PASSES};

/// Tightening with horizontal, vertical and diagonal lines only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FortyFiveDegree;

impl TightenPolyline for FortyFiveDegree {
    fn tighten(&self, pull: &mut PullTight<'_>, polyline: Polyline) -> Polyline {
        pull.repeat_passes(polyline, |pull, polyline| {
            let polyline = self.reduce_corners(pull, polyline);
            let polyline = self.smoothen_corners(pull, polyline);
            pull.reposition_lines(polyline)
        })
    }

    fn corner_smoothing(&self) -> Option<CornerSmoothing> {
        Some(CornerSmoothing {
            skip_short_segment: false,
            acute_needs_orthogonal: true,
        })
    }
}

fn collinear(a: IntPoint, b: IntPoint, c: IntPoint) -> bool {
    b.difference_by(a).cross(c.difference_by(a)) == 0
}

/// Signed distance `dist` pointing from `line` towards `p`.
fn towards(line: &Line, p: FloatPoint, dist: f64) -> f64 {
    match line.side_of_float(p) {
        Side::Right => -dist,
        _ => dist,
    }
}

impl FortyFiveDegree {
    /// Removes corners by moving a segment parallel onto the corner before
    /// or after it. Only works on polylines with all corners on the grid.
    fn reduce_corners(&self, pull: &mut PullTight<'_>, polyline: Polyline) -> Polyline {
        if polyline.line_count() <= 4 {
            return polyline;
        }

        let Some(corners) = polyline
            .corners()
            .iter()
            .map(|corner| corner.as_int())
            .collect::<Option<Vec<IntPoint>>>()
        else {
            return polyline;
        };

        let mut c = [corners[0], corners[1], corners[2], corners[3]];
        let mut in_clip = c.map(|corner| pull.in_clip_int(corner));
        let mut new_corners = vec![c[0]];
        let mut changed = false;
        let mut corner_no = 3;

        while corner_no < corners.len() {
            c[3] = corners[corner_no];

            // Corners in the middle of a straight stretch.
            if c[1] == c[2] || (corner_no + 1 < corners.len() && collinear(c[1], c[2], c[3])) {
                corner_no += 1;
                c[2] = c[3];
                in_clip[2] = in_clip[3];

                if corner_no < corners.len() {
                    c[3] = corners[corner_no];
                }

                changed = true;
            }

            in_clip[3] = pull.in_clip_int(c[3]);

            let mut new_corner = c[1];
            let mut removed = false;

            if in_clip[1] && in_clip[2] && in_clip[3] {
                new_corner = c[1].translate_by(c[3].difference_by(c[2]));

                if c[3] == c[2] {
                    removed = true;
                } else if collinear(c[0], c[1], new_corner) {
                    removed = pull.check_straight(new_corner, c[1]) && pull.check_straight(new_corner, c[3]);
                }
            }

            if !removed && in_clip[0] && in_clip[1] && in_clip[2] {
                new_corner = c[2].translate_by(c[0].difference_by(c[1]));

                if c[0] == c[1] {
                    removed = true;
                } else if collinear(c[2], c[3], new_corner) {
                    removed = pull.check_straight(new_corner, c[0]) && pull.check_straight(new_corner, c[2]);
                }
            }

            if removed {
                changed = true;
                c[1] = new_corner;
                in_clip[1] = pull.in_clip_int(new_corner);
                pull.mark_changed(new_corner.to_float());
                pull.mark_changed(c[2].to_float());
            } else {
                new_corners.push(c[1]);
                c[0] = c[1];
                c[1] = c[2];
                in_clip[0] = in_clip[1];
                in_clip[1] = in_clip[2];
            }

            c[2] = c[3];
            in_clip[2] = in_clip[3];
            corner_no += 1;
        }

        if !changed {
            return polyline;
        }

        new_corners.push(c[1]);
        new_corners.push(c[2]);
        Polyline::from_corners(&new_corners)
    }

    /// Cuts right and acute corners with a diagonal or axis parallel line.
    fn smoothen_corners(&self, pull: &mut PullTight<'_>, polyline: Polyline) -> Polyline {
        let mut result = polyline;

        for _ in 0..MAX_TIGHTEN_PASSES {
            if result.line_count() < 4 {
                break;
            }

            let mut lines = result.lines().to_vec();
            let mut changed = false;
            let mut i = 1;

            while i + 2 < lines.len() {
                let d1 = lines[i].direction();
                let d2 = lines[i + 1].direction();

                if d1.is_multiple_of_45_degree()
                    && d2.is_multiple_of_45_degree()
                    && d1.projection(&d2) != Signum::Positive
                {
                    let new_line = self
                        .smoothen_corner(pull, &lines, i)
                        .or_else(|| self.smoothen_sharp_corner(pull, &lines, i));

                    if let Some(new_line) = new_line {
                        changed = true;
                        lines.insert(i + 1, new_line);
                        i += 1;
                    }
                }

                i += 1;
            }

            if !changed {
                break;
            }

            result = Polyline::new(lines);
        }

        result
    }

    /// Cuts the corner between `lines[no]` and `lines[no + 1]` as far as
    /// clearance allows.
    fn smoothen_corner(&self, pull: &mut PullTight<'_>, lines: &[Line], no: usize) -> Option<Line> {
        let prev_corner = lines[no].intersection_approx(&lines[no - 1])?;
        let curr_corner = lines[no].intersection_approx(&lines[no + 1])?;
        let next_corner = lines[no + 1].intersection_approx(&lines[no + 2])?;

        let direction = lines[no].direction().sum(&lines[no + 1].direction())?;
        let translate_line = Line::from_direction(IntPoint::round(curr_corner), direction);
        let prev_dist = translate_line.signed_distance(prev_corner).abs();
        let next_dist = translate_line.signed_distance(next_corner).abs();

        if prev_dist == 0.0 || next_dist == 0.0 {
            return None;
        }

        let (nearest, max_dist) = if prev_dist <= next_dist {
            (prev_corner, prev_dist)
        } else {
            (next_corner, next_dist)
        };

        if max_dist < 1.0 {
            return None;
        }

        let mut max_dist = towards(&translate_line, next_corner, (max_dist - 1.0).max(1.0));
        let nearest_side = translate_line.side_of_float(nearest);
        let sign = Signum::of_f64(max_dist).as_f64();
        let mut translate_dist = max_dist;
        let mut delta = max_dist;
        let mut result = None;

        while delta.abs() > pull.min_translate_dist() {
            let new_line = translate_line.translate(translate_dist);
            let new_side = new_line.side_of_float(nearest);

            if new_side != nearest_side && new_side != Side::Collinear {
                // Moved past the nearest corner by rounding.
                max_dist -= sign * 0.5;
                translate_dist -= sign * 0.5;
                delta -= sign * 0.5;
                continue;
            }

            let check = Polyline::new([lines[no], new_line, lines[no + 1]]);
            let check_ok = check.line_count() == 3 && pull.check_segment(&check, 0);
            delta /= 2.0;

            if check_ok {
                result = Some(new_line);

                if translate_dist == max_dist {
                    break;
                }

                translate_dist += delta;
            } else {
                translate_dist -= delta;
            }
        }

        let result = result?;

        for corner in [
            lines[no].intersection_approx(&result),
            lines[no + 1].intersection_approx(&result),
        ]
        .into_iter()
        .flatten()
        {
            pull.mark_changed(corner);
        }

        pull.mark_changed(curr_corner);
        Some(result)
    }

    /// Cuts the corner so little that the new line stays inside the trace
    /// and needs no clearance check.
    fn smoothen_sharp_corner(&self, pull: &mut PullTight<'_>, lines: &[Line], no: usize) -> Option<Line> {
        let curr_corner = lines[no].intersection_approx(&lines[no + 1])?;

        if curr_corner.x() != curr_corner.x().trunc() {
            if let Some(line) = self.smoothen_non_integer_corner(lines, no) {
                return Some(line);
            }
        }

        let prev_corner = lines[no].intersection_approx(&lines[no - 1])?;
        let next_corner = lines[no + 1].intersection_approx(&lines[no + 2])?;

        let direction = lines[no].direction().sum(&lines[no + 1].direction())?;
        let translate_line = Line::from_direction(IntPoint::round(curr_corner), direction);
        let translate_dist = ((SQRT2 - 1.0) * pull.half_width())
            .min(translate_line.signed_distance(prev_corner).abs())
            .min(translate_line.signed_distance(next_corner).abs());

        if translate_dist < 0.99 {
            return None;
        }

        let translate_dist = towards(&translate_line, next_corner, (translate_dist - 1.0).max(1.0));
        pull.mark_changed(curr_corner);
        Some(translate_line.translate(translate_dist))
    }

    /// Two diagonal lines crossing between grid points are joined by a
    /// short axis parallel line through the next grid point.
    fn smoothen_non_integer_corner(&self, lines: &[Line], no: usize) -> Option<Line> {
        let prev_line = lines[no];
        let next_line = lines[no + 1];

        if prev_line.is_equal_or_opposite(&next_line) || !(prev_line.is_diagonal() && next_line.is_diagonal()) {
            return None;
        }

        let curr = prev_line.intersection_approx(&next_line)?;
        let prev = prev_line.intersection_approx(&lines[no - 1])?;
        let next = next_line.intersection_approx(&lines[no + 2])?;

        let ceil = || IntPoint::new(ceil_to_i64(curr.x()), ceil_to_i64(curr.y()));
        let floor = || IntPoint::new(floor_to_i64(curr.x()), floor_to_i64(curr.y()));
        let vertical = if prev.y() < next.y() {
            Direction::UP
        } else {
            Direction::DOWN
        };
        let horizontal = if prev.x() < next.x() {
            Direction::RIGHT
        } else {
            Direction::LEFT
        };

        let (a, direction) = if prev.x() > curr.x() && next.x() > curr.x() {
            (ceil(), vertical)
        } else if prev.x() < curr.x() && next.x() < curr.x() {
            (floor(), vertical)
        } else if prev.y() > curr.y() && next.y() > curr.y() {
            (ceil(), horizontal)
        } else if prev.y() < curr.y() && next.y() < curr.y() {
            (floor(), horizontal)
        } else {
            return None;
        };

        Some(Line::from_direction(a, direction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        board::{Board, FixedState},
        geometry::{IntBox, Point},
        rules::{AngleRestriction, BoardRules},
        settings::OptimizerSettings,
    };

    fn p(x: i64, y: i64) -> IntPoint {
        IntPoint::new(x, y)
    }

    fn board() -> Board {
        Board::new(BoardRules::new(1, 100), IntBox::new(-10_000, -10_000, 10_000, 10_000))
    }

    fn settings() -> OptimizerSettings {
        OptimizerSettings {
            angle_restriction: AngleRestriction::FortyFiveDegree,
            ..OptimizerSettings::default()
        }
    }

    #[test]
    fn detour_is_shortened_and_stays_45_degree() {
        let mut board = board();
        let index = board
            .insert_trace_through(
                &[p(0, 0), p(0, 1000), p(2000, 1000), p(2000, 0)],
                0,
                50,
                vec![1],
                1,
                FixedState::Unfixed,
            )
            .unwrap();
        let before = board.trace(index).unwrap().length();

        let mut pull = PullTight::new(&mut board, &settings());
        assert!(pull.pull_tight_trace(index));

        let trace = board.trace(index).unwrap();
        assert!(trace.length() < before);
        assert_eq!(trace.first_corner(), Point::Int(p(0, 0)));
        assert_eq!(trace.last_corner(), Point::Int(p(2000, 0)));

        let polyline = trace.polyline();
        assert!(polyline.lines()[1..polyline.line_count() - 1]
            .iter()
            .all(|line| line.is_multiple_of_45_degree()));
    }

    #[test]
    fn non_integer_corner_gets_axis_parallel_cut() {
        // Two diagonals crossing at (0.5, 0.5).
        let lines = [
            Line::new(p(-1000, 0), p(-1000, 1)),
            Line::new(p(-1000, -1000), p(0, 0)),
            Line::new(p(0, 1), p(1000, -999)),
            Line::new(p(1000, 0), p(1000, 1)),
        ];

        let line = FortyFiveDegree
            .smoothen_non_integer_corner(&lines, 1)
            .unwrap();
        assert_eq!(line, Line::from_direction(p(0, 0), Direction::RIGHT));
    }
}
