use crate::{
    geometry::{point::float_distance_square, IntPoint, Line, Polyline, Side},
    math::Signum,
};

use super::{float_distance, CornerSmoothing, PullTight, TightenPolyline};

/// Squared length below which a first segment ending off the grid is
/// looked past when smoothing joints.
pub(super) const SKIP_LENGTH: f64 = 10.0;
/// Corners flatter than this are not cut any further.
const MAX_COS_ANGLE: f64 = 0.999;
/// Squared distance a recomputed corner may move by rounding.
const CHECK_DIST_SQUARE: f64 = 100.0;
const EPSILON: f64 = 0.001;

/// Tightening with lines of arbitrary direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnyAngle;

impl TightenPolyline for AnyAngle {
    fn tighten(&self, pull: &mut PullTight<'_>, polyline: Polyline) -> Polyline {
        pull.repeat_passes(polyline, |pull, polyline| {
            let polyline = pull.skip_segments_of_length_0(polyline);
            let polyline = self.reduce_lines(pull, polyline);
            let polyline = self.skip_lines(pull, polyline);
            let polyline = self.reduce_corners(pull, polyline);
            let polyline = self.reposition_lines(pull, polyline);
            self.smoothen_corners(pull, polyline)
        })
    }

    fn reposition_line(&self, pull: &mut PullTight<'_>, lines: &[Line], line_no: usize) -> Option<Line> {
        let start = line_no.checked_sub(2)?;

        if lines.len() < start + 5 {
            return None;
        }

        if pull.has_clip() {
            for i in 1..3 {
                let corner = lines[start + i].intersection_approx(&lines[start + i + 1])?;

                if !pull.in_clip(corner) {
                    return None;
                }
            }
        }

        let translate_line = lines[line_no];
        let mut prev_corner = lines[start].intersection_approx(&lines[start + 1])?;
        let mut next_corner = lines[start + 3].intersection_approx(&lines[start + 4])?;

        // Lines through a corner lying on the translated line are moved
        // along with it.
        let mut prev_dist = translate_line.signed_distance(prev_corner);
        let mut skipped_before = 0;

        while prev_dist.abs() < EPSILON {
            skipped_before += 1;
            let no = start.checked_sub(skipped_before)?;
            prev_corner = lines[no].intersection_approx(&lines[no + 1])?;
            prev_dist = translate_line.signed_distance(prev_corner);
        }

        let mut next_dist = translate_line.signed_distance(next_corner);
        let mut skipped_after = 0;

        while next_dist.abs() < EPSILON {
            skipped_after += 1;
            let no = start + 3 + skipped_after;

            if no + 2 >= lines.len() {
                return None;
            }

            next_corner = lines[no].intersection_approx(&lines[no + 1])?;
            next_dist = translate_line.signed_distance(next_corner);
        }

        if Signum::of_f64(prev_dist) != Signum::of_f64(next_dist) {
            return None;
        }

        let (nearest, mut max_dist) = if prev_dist.abs() < next_dist.abs() {
            (prev_corner, prev_dist)
        } else {
            (next_corner, next_dist)
        };

        let mut check_lines = lines.to_vec();
        let nearest_side = translate_line.side_of_float(nearest);
        let sign = Signum::of_f64(max_dist).as_f64();
        let mut translate_dist = max_dist;
        let mut delta = max_dist;
        let mut result = None;
        let mut first_time = true;

        while first_time || delta.abs() > pull.min_translate_dist() {
            let mut new_line = translate_line.translate(translate_dist);

            if first_time && translate_dist.abs() < 1.0 {
                if new_line == translate_line {
                    let rounded = IntPoint::round(nearest);

                    if float_distance(nearest, rounded.to_float()) < translate_dist.abs() {
                        new_line = Line::from_direction(rounded, translate_line.direction());
                    }

                    first_time = false;
                }

                if new_line == translate_line {
                    return None;
                }
            }

            let new_side = new_line.side_of_float(nearest);

            if new_side != nearest_side && new_side != Side::Collinear {
                max_dist -= sign * 0.5;
                translate_dist -= sign * 0.5;
                delta -= sign * 0.5;
                continue;
            }

            first_time = false;
            check_lines[line_no] = new_line;

            let mut prev_translated = new_line;
            let prev_line_no = start + 1 - skipped_before;

            for i in 0..skipped_before {
                let corner = prev_translated.intersection_approx(&check_lines[prev_line_no])?;
                let line = lines[start + 1 - i];
                prev_translated = line.translate(line.signed_distance(corner));
                check_lines[start + 1 - i] = prev_translated;
            }

            let mut next_translated = new_line;
            let next_line_no = start + 3 + skipped_after;

            for i in 0..skipped_after {
                let corner = next_translated.intersection_approx(&check_lines[next_line_no])?;
                let line = lines[start + 3 + i];
                next_translated = line.translate(line.signed_distance(corner));
                check_lines[start + 3 + i] = next_translated;
            }

            let check = Polyline::new(check_lines.iter().copied());
            let check_ok = check.line_count() == check_lines.len() && pull.check_segment(&check, start + 1);
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
            check_lines[start].intersection_approx(&check_lines[start + 1]),
            check_lines[start + 3].intersection_approx(&check_lines[start + 4]),
        ]
        .into_iter()
        .flatten()
        {
            pull.mark_changed(corner);
        }

        Some(result)
    }

    fn corner_smoothing(&self) -> Option<CornerSmoothing> {
        Some(CornerSmoothing {
            skip_short_segment: true,
            acute_needs_orthogonal: false,
        })
    }
}

impl AnyAngle {
    fn reposition_lines(&self, pull: &mut PullTight<'_>, polyline: Polyline) -> Polyline {
        if polyline.line_count() < 5 {
            return polyline;
        }

        let mut lines = polyline.lines().to_vec();
        let mut changed = false;

        for i in 0..lines.len() - 4 {
            let Some(new_line) = TightenPolyline::reposition_line(self, pull, &lines, i + 2) else {
                continue;
            };

            changed = true;
            lines[i + 2] = new_line;

            // Corners can only be computed again after parallel lines are
            // merged.
            if new_line.is_parallel(&lines[i + 1]) || new_line.is_parallel(&lines[i + 3]) {
                break;
            }
        }

        if !changed {
            return polyline;
        }

        Polyline::new(lines)
    }

    /// Replaces two consecutive lines by one through grid points near the
    /// corners before and after them.
    fn reduce_corners(&self, pull: &mut PullTight<'_>, polyline: Polyline) -> Polyline {
        let lines = polyline.lines();

        if lines.len() < 4 {
            return polyline;
        }

        let last_index = lines.len() - 4;
        let mut new_lines = vec![lines[0], lines[1]];
        let mut changed = false;

        for i in 0..=last_index {
            let last = new_lines.len() - 1;
            let reduced = new_lines[last - 1]
                .intersection_approx(&new_lines[last])
                .and_then(|new_a| {
                    let new_b = polyline.corner_approx(i + 2);

                    if !(pull.in_clip(new_a) && pull.in_clip(new_b) && pull.in_clip(polyline.corner_approx(last))) {
                        return None;
                    }

                    self.reduce_corner(pull, &polyline, &new_lines, i)
                        .map(|lines| (lines, new_a, new_b))
                });

            match reduced {
                Some((curr_lines, new_a, new_b)) => {
                    changed = true;
                    new_lines[last] = curr_lines[1];

                    if last == 1 {
                        new_lines[0] = curr_lines[0];
                    }

                    if i == last_index {
                        new_lines.push(curr_lines[2]);
                    }

                    pull.mark_changed(new_a);
                    pull.mark_changed(new_b);
                }
                None => {
                    new_lines.push(lines[i + 2]);

                    if i == last_index {
                        new_lines.push(lines[i + 3]);
                    }
                }
            }

            let n = new_lines.len();

            if new_lines[n - 1].is_parallel(&new_lines[n - 2]) {
                new_lines.pop();
            }
        }

        if !changed {
            return polyline;
        }

        Polyline::new(new_lines)
    }

    fn reduce_corner(
        &self,
        pull: &PullTight<'_>,
        polyline: &Polyline,
        new_lines: &[Line],
        i: usize,
    ) -> Option<[Line; 3]> {
        let lines = polyline.lines();
        let last_index = lines.len() - 4;
        let last = new_lines.len() - 1;

        let new_a = new_lines[last - 1].intersection_approx(&new_lines[last])?;
        let new_b = polyline.corner_approx(i + 2);
        let skip_corner = new_lines[last].intersection_approx(&lines[i + 2])?;
        let (a, b) = (IntPoint::round(new_a), IntPoint::round(new_b));

        if a == b {
            return None;
        }

        let middle = Line::new(a, b);

        // End corners must not move.
        let first = if last == 1 {
            let corner = polyline.first_corner().as_int()?;
            Line::from_direction(corner, middle.direction().turn_45_degree(2))
        } else {
            new_lines[last - 1]
        };

        let end = if i == last_index {
            let corner = polyline.last_corner().as_int()?;
            Line::from_direction(corner, middle.direction().turn_45_degree(2))
        } else {
            lines[i + 3]
        };

        // Nearly parallel lines give unstable intersections.
        if float_distance_square(first.intersection_approx(&middle)?, new_a) > CHECK_DIST_SQUARE
            || float_distance_square(middle.intersection_approx(&end)?, new_b) > CHECK_DIST_SQUARE
        {
            return None;
        }

        // A trace may continue at an end off the grid, which must stay on
        // the same side of it for splitting.
        if i == 1 && !polyline.first_corner().is_int() {
            let new_corner = first.intersection(&middle)?;

            if new_lines[0].side_of(&new_corner) != new_lines[0].side_of(&polyline.corner(1)) {
                return None;
            }
        }

        if i + 1 == last_index && !polyline.last_corner().is_int() {
            let new_corner = middle.intersection(&end)?;
            let end_line = lines[lines.len() - 1];
            let old_corner = polyline.corner(polyline.corner_count() - 2);

            if end_line.side_of(&new_corner) != end_line.side_of(&old_corner) {
                return None;
            }
        }

        let candidate = Polyline::new([first, middle, end]);

        if candidate.line_count() != 3 {
            return None;
        }

        let length_before = float_distance(skip_corner, new_a) + float_distance(skip_corner, new_b);

        // Rounding twice may lengthen by up to this much.
        if candidate.length_approx() + 1.5 >= length_before {
            return None;
        }

        pull.check_segment(&candidate, 0).then_some([first, middle, end])
    }

    /// Moves a line parallel past a neighbouring corner, removing the line
    /// in between.
    fn reduce_lines(&self, pull: &mut PullTight<'_>, polyline: Polyline) -> Polyline {
        if polyline.line_count() < 6 {
            return polyline;
        }

        let mut lines = polyline.lines().to_vec();
        let mut changed = false;
        let mut i = 2;

        while i + 2 < lines.len() {
            match self.reduce_line(pull, &lines, i) {
                Some(reduced) => {
                    lines = reduced;
                    changed = true;
                }
                None => i += 1,
            }
        }

        if !changed {
            return polyline;
        }

        Polyline::new(lines)
    }

    fn reduce_line(&self, pull: &mut PullTight<'_>, lines: &[Line], i: usize) -> Option<Vec<Line>> {
        let prev_corner = lines[i - 2].intersection_approx(&lines[i - 1])?;
        let next_corner = lines[i + 1].intersection_approx(&lines[i + 2])?;

        if !(pull.in_clip(prev_corner) && pull.in_clip(next_corner)) {
            return None;
        }

        let translate_line = lines[i];
        let prev_dist = translate_line.signed_distance(prev_corner);
        let next_dist = translate_line.signed_distance(next_corner);

        if Signum::of_f64(prev_dist) != Signum::of_f64(next_dist) {
            return None;
        }

        let mut translate_dist = if prev_dist.abs() < next_dist.abs() {
            prev_dist
        } else {
            next_dist
        };

        if translate_dist == 0.0 {
            return None;
        }

        let line_side = translate_line.side_of_float(prev_corner);
        let sign = Signum::of_f64(translate_dist).as_f64();
        let mut new_line = translate_line.translate(translate_dist);
        let mut prev_side = new_line.side_of_float(prev_corner);
        let mut next_side = new_line.side_of_float(next_corner);

        // Make sure the nearest corner is crossed.
        while prev_side == line_side && next_side == line_side {
            translate_dist += sign * 0.5;
            new_line = translate_line.translate(translate_dist);
            prev_side = new_line.side_of_float(prev_corner);
            next_side = new_line.side_of_float(next_corner);
        }

        let crossed_before = usize::from(prev_side != line_side);
        let crossed_after = usize::from(next_side != line_side);

        if crossed_before > 0 {
            if i < 3 {
                return None;
            }

            let prev_prev_corner = lines[i - 3].intersection_approx(&lines[i - 2])?;

            if new_line.side_of_float(prev_prev_corner) != line_side {
                return None;
            }
        }

        if crossed_after > 0 {
            if i + 3 >= lines.len() {
                return None;
            }

            let next_next_corner = lines[i + 2].intersection_approx(&lines[i + 3])?;

            if new_line.side_of_float(next_next_corner) != line_side {
                return None;
            }
        }

        let keep_before = i - crossed_before;
        let reduced: Vec<Line> = lines[..keep_before]
            .iter()
            .copied()
            .chain(std::iter::once(new_line))
            .chain(lines[i + 1 + crossed_after..].iter().copied())
            .collect();

        let check = Polyline::new(reduced.iter().copied());

        if check.line_count() != reduced.len() || !pull.check_segment(&check, keep_before - 1) {
            return None;
        }

        pull.mark_changed(prev_corner);
        pull.mark_changed(next_corner);
        Some(reduced)
    }

    /// Removes one or two lines when the lines around them can be joined
    /// directly.
    fn skip_lines(&self, pull: &mut PullTight<'_>, polyline: Polyline) -> Polyline {
        let n = polyline.line_count();

        for i in 1..n.saturating_sub(3) {
            for from_behind in [true, false] {
                let (mut curr_line, corner1, corner2) = if from_behind {
                    (polyline.line(i + 2), polyline.corner_approx(i), polyline.corner_approx(i - 1))
                } else {
                    (polyline.line(i), polyline.corner_approx(i + 1), polyline.corner_approx(i + 2))
                };

                if !(pull.in_clip(corner1) && pull.in_clip(corner2)) {
                    continue;
                }

                let mut side1 = curr_line.side_of_float(corner1);
                let mut side2 = curr_line.side_of_float(corner2);
                let shape_no = if from_behind { i } else { i - 1 };

                if side1 != side2 {
                    let reduced = polyline.replace_lines(i + 1, i + 1, &[]);

                    if reduced.line_count() == n - 1 && pull.check_segment(&reduced, shape_no) {
                        pull.mark_changed(corner1);
                        pull.mark_changed(corner2);
                        return reduced;
                    }
                }

                if i + 4 >= n {
                    break;
                }

                let corner3 = if from_behind {
                    polyline.corner_approx(i + 1)
                } else {
                    polyline.corner_approx(i + 3)
                };

                if !pull.in_clip(corner3) {
                    continue;
                }

                if from_behind {
                    curr_line = polyline.line(i + 3);
                    side1 = curr_line.side_of_float(corner1);
                    side2 = curr_line.side_of_float(corner2);
                } else {
                    side1 = curr_line.side_of_float(corner3);
                }

                if side1 != side2 {
                    let reduced = polyline.replace_lines(i + 1, i + 2, &[]);

                    if reduced.line_count() == n - 2 && pull.check_segment(&reduced, shape_no) {
                        pull.mark_changed(corner1);
                        pull.mark_changed(corner2);
                        pull.mark_changed(corner3);
                        return reduced;
                    }
                }
            }
        }

        polyline
    }

    /// Cuts off corners with a line in the middle direction of the lines
    /// meeting there.
    fn smoothen_corners(&self, pull: &mut PullTight<'_>, polyline: Polyline) -> Polyline {
        if polyline.line_count() < 4 {
            return polyline;
        }

        let mut lines = polyline.lines().to_vec();
        let mut changed = false;
        let mut i = 0;

        while i + 3 < lines.len() {
            if let Some(new_line) = self.smoothen_corner(pull, &lines, i) {
                changed = true;
                lines.insert(i + 2, new_line);
                i += 1;
            }

            i += 1;
        }

        if !changed {
            return polyline;
        }

        Polyline::new(lines)
    }

    fn smoothen_corner(&self, pull: &mut PullTight<'_>, lines: &[Line], start: usize) -> Option<Line> {
        if lines.len() < start + 4 {
            return None;
        }

        let curr_corner = lines[start + 1].intersection_approx(&lines[start + 2])?;

        if !pull.in_clip(curr_corner) {
            return None;
        }

        let prev_direction = lines[start + 1].direction();
        let next_direction = lines[start + 2].direction();

        if prev_direction.cos_angle(&next_direction) > MAX_COS_ANGLE {
            return None;
        }

        let prev_corner = lines[start].intersection_approx(&lines[start + 1])?;
        let next_corner = lines[start + 2].intersection_approx(&lines[start + 3])?;
        let middle = prev_direction.middle_approx(&next_direction)?;
        let translate_line = Line::from_direction(IntPoint::round(curr_corner), middle);

        let prev_dist = translate_line.signed_distance(prev_corner);
        let next_dist = translate_line.signed_distance(next_corner);
        let (nearest, mut max_dist) = if prev_dist.abs() < next_dist.abs() {
            (prev_corner, prev_dist)
        } else {
            (next_corner, next_dist)
        };

        if max_dist.abs() < 1.0 {
            return None;
        }

        let mut check_lines = lines.to_vec();
        check_lines.insert(start + 2, translate_line);

        let nearest_side = translate_line.side_of_float(nearest);
        let sign = Signum::of_f64(max_dist).as_f64();
        let mut translate_dist = max_dist;
        let mut delta = max_dist;
        let mut result = None;

        while delta.abs() > pull.min_translate_dist() {
            let new_line = translate_line.translate(translate_dist);
            let new_side = new_line.side_of_float(nearest);

            if new_side != nearest_side && new_side != Side::Collinear {
                max_dist -= sign * 0.5;
                translate_dist -= sign * 0.5;
                delta -= sign * 0.5;
                continue;
            }

            check_lines[start + 2] = new_line;
            let check = Polyline::new(check_lines.iter().copied());
            let check_ok = check.line_count() == check_lines.len() && pull.check_segment(&check, start + 1);
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
        pull.mark_changed(prev_corner);
        pull.mark_changed(next_corner);
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        board::{item::ObstacleArea, Board, FixedState, Item},
        geometry::{IntBox, Point},
        rules::{AngleRestriction, BoardRules},
        settings::OptimizerSettings,
    };

    fn p(x: i64, y: i64) -> IntPoint {
        IntPoint::new(x, y)
    }

    fn zig_zag(board: &mut Board) -> crate::board::ItemIndex {
        board
            .insert_trace_through(
                &[p(0, 0), p(0, 1000), p(1000, 1000), p(1000, 2000)],
                0,
                50,
                vec![1],
                1,
                FixedState::Unfixed,
            )
            .unwrap()
    }

    fn settings() -> OptimizerSettings {
        OptimizerSettings {
            angle_restriction: AngleRestriction::AnyAngle,
            ..OptimizerSettings::default()
        }
    }

    #[test]
    fn free_zig_zag_becomes_straight() {
        let mut board = Board::new(BoardRules::new(1, 100), IntBox::new(-10_000, -10_000, 10_000, 10_000));
        let index = zig_zag(&mut board);
        let before = board.trace(index).unwrap().length();

        let mut pull = PullTight::new(&mut board, &settings());
        assert!(pull.pull_tight_trace(index));

        let traces = board.trace_indices();
        assert_eq!(traces.len(), 1);
        let trace = board.trace(traces[0]).unwrap();
        assert!(trace.length() < before);
        assert_eq!(
            trace.polyline().corners(),
            &[Point::Int(p(0, 0)), Point::Int(p(1000, 2000))]
        );
        assert!(board.search_tree().is_consistent());
    }

    #[test]
    fn zig_zag_detours_around_obstacles_on_the_shortcut() {
        let mut board = Board::new(BoardRules::new(1, 100), IntBox::new(-10_000, -10_000, 10_000, 10_000));

        for (x, y) in [(250, 500), (750, 1500)] {
            board.add_item(Item::ObstacleArea(ObstacleArea::new(
                vec![p(x - 50, y - 50), p(x + 50, y - 50), p(x + 50, y + 50), p(x - 50, y + 50)],
                0,
                vec![],
                1,
            )));
        }

        let index = zig_zag(&mut board);
        let before = board.trace(index).unwrap().length();

        let mut pull = PullTight::new(&mut board, &settings());
        assert!(pull.pull_tight_trace(index));

        let traces = board.trace_indices();
        assert_eq!(traces.len(), 1);
        let trace = board.trace(traces[0]).unwrap();
        assert!(trace.length() < before);
        assert!(trace.polyline().corner_count() > 2);
        assert_eq!(trace.first_corner(), Point::Int(p(0, 0)));
        assert_eq!(trace.last_corner(), Point::Int(p(1000, 2000)));
        assert!(board.clearance_violations(traces[0]).is_empty());
    }

    #[test]
    fn blocked_zig_zag_gets_no_longer() {
        let mut board = Board::new(BoardRules::new(1, 100), IntBox::new(-10_000, -10_000, 10_000, 10_000));

        for (llx, lly, urx, ury) in [(200, 200, 800, 800), (200, 1200, 800, 1800)] {
            board.add_item(Item::ObstacleArea(ObstacleArea::new(
                vec![p(llx, lly), p(urx, lly), p(urx, ury), p(llx, ury)],
                0,
                vec![],
                1,
            )));
        }

        let index = zig_zag(&mut board);
        let before = board.trace(index).unwrap().polyline().clone();
        let length = board.trace(index).unwrap().length();

        let mut pull = PullTight::new(&mut board, &settings());
        let changed = pull.pull_tight_trace(index);

        let trace = board.trace(index).unwrap();
        assert_eq!(changed, *trace.polyline() != before);
        assert!(trace.length() <= length);
        assert!(trace.polyline().corner_count() > 2);
        assert_eq!(trace.first_corner(), before.first_corner());
        assert_eq!(trace.last_corner(), before.last_corner());
        assert!(board.clearance_violations(index).is_empty());
    }
}
