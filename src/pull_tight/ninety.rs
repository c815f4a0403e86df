use crate::geometry::Polyline;

use super::{CornerSmoothing, PullTight, TightenPolyline};

/// Tightening with horizontal and vertical lines only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NinetyDegree;

impl TightenPolyline for NinetyDegree {
    fn tighten(&self, pull: &mut PullTight<'_>, polyline: Polyline) -> Polyline {
        pull.repeat_passes(polyline, |pull, polyline| {
            let polyline = self.try_skip_second_corner(pull, polyline);
            let polyline = self.try_skip_corners(pull, polyline);
            pull.reposition_lines(polyline)
        })
    }

    fn corner_smoothing(&self) -> Option<CornerSmoothing> {
        None
    }
}

impl NinetyDegree {
    /// Replaces the first two corners by one, continuing the trace along
    /// its start line.
    fn try_skip_second_corner(&self, pull: &mut PullTight<'_>, polyline: Polyline) -> Polyline {
        let lines = polyline.lines();

        if lines.len() < 5 {
            return polyline;
        }

        let check = Polyline::new([lines[1], lines[0], lines[3], lines[4]]);

        if check.line_count() != 4
            || !pull.in_clip(check.corner_approx(1))
            || !(pull.check_segment(&check, 0) && pull.check_segment(&check, 1))
        {
            return polyline;
        }

        pull.mark_changed(polyline.corner_approx(1));
        pull.mark_changed(polyline.corner_approx(2));

        let new_lines: Vec<_> = [lines[1], lines[0]]
            .into_iter()
            .chain(lines[3..].iter().copied())
            .collect();
        Polyline::new(new_lines)
    }

    /// Replaces pairs of corners by one corner where the two lines around
    /// them can be joined directly.
    fn try_skip_corners(&self, pull: &mut PullTight<'_>, polyline: Polyline) -> Polyline {
        let lines = polyline.lines();
        let n = lines.len();

        if n < 5 {
            return polyline;
        }

        let mut new_lines = vec![lines[0], lines[1]];
        let mut changed = false;
        let mut second_last_corner_skipped = false;
        let mut i = 5;

        while i <= n {
            let last = new_lines.len() - 1;
            let mut skip = false;

            if pull.in_clip(polyline.corner_approx(i - 3)) {
                // At the end the line before the last one concludes.
                let closing = if i < n { lines[i] } else { lines[i - 2] };
                let check = Polyline::new([new_lines[last - 1], new_lines[last], lines[i - 1], closing]);

                skip = check.line_count() == 4
                    && pull.in_clip(check.corner_approx(1))
                    && pull.check_segment(&check, 0)
                    && pull.check_segment(&check, 1);
            }

            if skip {
                second_last_corner_skipped |= i == n;

                for corner in [
                    new_lines[last].intersection_approx(&lines[i - 1]),
                    lines[i - 2].intersection_approx(&lines[i - 3]),
                ]
                .into_iter()
                .flatten()
                {
                    pull.mark_changed(corner);
                }

                changed = true;
                i += 1;
            } else {
                new_lines.push(lines[i - 3]);
            }

            i += 1;
        }

        if !changed {
            return polyline;
        }

        if second_last_corner_skipped {
            new_lines.push(lines[n - 1]);
            new_lines.push(lines[n - 2]);
        } else {
            new_lines.extend_from_slice(&lines[n - 3..]);
        }

        Polyline::new(new_lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        board::{Board, FixedState},
        geometry::{IntBox, IntPoint, Point},
        rules::{AngleRestriction, BoardRules},
        settings::OptimizerSettings,
    };

    fn p(x: i64, y: i64) -> IntPoint {
        IntPoint::new(x, y)
    }

    #[test]
    fn staircase_loses_a_corner() {
        let mut board = Board::new(BoardRules::new(1, 100), IntBox::new(-10_000, -10_000, 10_000, 10_000));
        let index = board
            .insert_trace_through(
                &[p(0, 0), p(0, 1000), p(1000, 1000), p(1000, 2000)],
                0,
                50,
                vec![1],
                1,
                FixedState::Unfixed,
            )
            .unwrap();

        let settings = OptimizerSettings {
            angle_restriction: AngleRestriction::NinetyDegree,
            ..OptimizerSettings::default()
        };
        let mut pull = PullTight::new(&mut board, &settings);
        assert!(pull.pull_tight_trace(index));

        let trace = board.trace(index).unwrap();
        assert!(trace.corner_count() < 4);
        assert_eq!(trace.first_corner(), Point::Int(p(0, 0)));
        assert_eq!(trace.last_corner(), Point::Int(p(1000, 2000)));

        let polyline = trace.polyline();
        assert!(polyline.lines()[1..polyline.line_count() - 1]
            .iter()
            .all(|line| line.is_orthogonal()));
    }
}
