//! Shortening and smoothing of the traces inside the changed area of a
//! board without introducing clearance violations.
//!
//! The optimizer borrows the board mutably for its whole run. Every trace it
//! looks at is tightened with the strategy of the active angle restriction
//! and written back through [`Board::change`], so split and combine
//! invariants are maintained by the board itself.

mod any_angle;
mod forty_five;
mod ninety;
mod via;

pub use any_angle::AnyAngle;
pub use forty_five::FortyFiveDegree;
pub use ninety::NinetyDegree;
pub use via::TraceCostFactor;

use std::collections::BTreeSet;

use enum_dispatch::enum_dispatch;

use crate::{
    board::{AccessItem, Board, BoardError, Item, ItemIndex},
    geometry::{
        point::float_distance_square, AccessTileShape, FloatPoint, IntOctagon, IntPoint, Line,
        Polyline, Side, TileShape,
    },
    math::{Signum, SQRT2},
    rules::AngleRestriction,
    settings::OptimizerSettings,
    stoppable::{StopCondition, StopFlag, Stoppable, TimeLimit},
};

/// Lower bound of the binary search resolution.
const MIN_TRANSLATE_DIST: f64 = 100.0;
const MIN_CORNER_DIST_SQUARE: f64 = 0.9;
/// Upper bound for the passes over one polyline and for repeated smoothing
/// of one trace.
const MAX_TIGHTEN_PASSES: usize = 64;
const OPT_VIA_MAX_ITERATIONS: usize = 10;

pub(crate) fn float_distance(p: FloatPoint, q: FloatPoint) -> f64 {
    float_distance_square(p, q).sqrt()
}

/// One way of pulling polylines tight, chosen by the angle restriction.
#[enum_dispatch]
pub trait TightenPolyline {
    /// Runs the passes of this strategy until the polyline stops changing.
    fn tighten(&self, pull: &mut PullTight<'_>, polyline: Polyline) -> Polyline;

    /// Moves line `line_no` of `lines` parallel towards its nearer
    /// neighbouring corner, as far as clearance allows.
    fn reposition_line(&self, pull: &mut PullTight<'_>, lines: &[Line], line_no: usize) -> Option<Line> {
        pull.reposition_line(lines, line_no)
    }

    /// How acute joints with other traces are cut off, if at all.
    fn corner_smoothing(&self) -> Option<CornerSmoothing>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CornerSmoothing {
    /// Look past a very short first segment whose end is off the grid.
    pub skip_short_segment: bool,
    /// Only cut acute joints if the other trace runs axis parallel.
    pub acute_needs_orthogonal: bool,
}

#[enum_dispatch(TightenPolyline)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullTightStrategy {
    NinetyDegree(NinetyDegree),
    FortyFiveDegree(FortyFiveDegree),
    AnyAngle(AnyAngle),
}

impl From<AngleRestriction> for PullTightStrategy {
    fn from(restriction: AngleRestriction) -> Self {
        match restriction {
            AngleRestriction::NinetyDegree => PullTightStrategy::NinetyDegree(NinetyDegree),
            AngleRestriction::FortyFiveDegree => PullTightStrategy::FortyFiveDegree(FortyFiveDegree),
            AngleRestriction::AnyAngle => PullTightStrategy::AnyAngle(AnyAngle),
        }
    }
}

/// Properties of the trace currently being tightened.
#[derive(Debug, Clone, Default)]
struct TraceContext {
    layer: usize,
    /// Including the clearance compensation of the search tree.
    half_width: f64,
    nets: Vec<usize>,
    clearance_class: usize,
    /// Pins at the trace ends, which the trace may overlap.
    contact_pins: BTreeSet<ItemIndex>,
}

#[derive(Debug, Clone, Copy)]
enum Joint {
    Acute,
    Bend,
}

#[derive(Debug, Clone, Copy)]
struct ContactJoint {
    kind: Joint,
    other_line: Line,
    other_prev_line: Line,
    other_corner: FloatPoint,
}

pub struct PullTight<'a> {
    board: &'a mut Board,
    strategy: PullTightStrategy,
    only_nets: Vec<usize>,
    clip: Option<IntOctagon>,
    min_translate_dist: f64,
    stop: StopCondition,
    keep_point: Option<(IntPoint, usize)>,
    context: TraceContext,
}

impl<'a> PullTight<'a> {
    pub fn new(board: &'a mut Board, settings: &OptimizerSettings) -> Self {
        let mut stop = StopCondition::never();

        if settings.time_limit_ms > 0 {
            stop = stop.with_time_limit(TimeLimit::new(settings.time_limit_ms));
        }

        Self {
            board,
            strategy: settings.angle_restriction.into(),
            only_nets: settings.only_nets.clone(),
            clip: None,
            min_translate_dist: (settings.min_translate_dist as f64).max(MIN_TRANSLATE_DIST),
            stop,
            keep_point: None,
            context: TraceContext::default(),
        }
    }

    /// Restricts the changes to corners inside `clip`.
    pub fn with_clip(mut self, clip: IntOctagon) -> Self {
        self.clip = Some(clip);
        self
    }

    pub fn with_stop_flag(mut self, flag: StopFlag) -> Self {
        self.stop = self.stop.with_flag(flag);
        self
    }

    /// Traces passing through `point` on `layer` are split there after
    /// being changed, so the point stays a trace corner.
    pub fn with_keep_point(mut self, point: IntPoint, layer: usize) -> Self {
        self.keep_point = Some((point, layer));
        self
    }

    pub fn board(&self) -> &Board {
        self.board
    }

    pub fn strategy(&self) -> PullTightStrategy {
        self.strategy
    }

    /// Optimizes everything overlapping the changed area of the board until
    /// nothing changes any more. Via locations are optimized too if
    /// `trace_costs` are given. Returns true if the board was changed.
    pub fn opt_changed_area(&mut self, trace_costs: Option<&[TraceCostFactor]>) -> bool {
        if self.board.changed_area().is_none() {
            return false;
        }

        let mut result = false;
        let mut something_changed = true;

        while something_changed {
            something_changed = false;

            for layer in 0..self.board.layer_count() {
                let Some(region) = self.take_changed_region(layer) else {
                    continue;
                };

                let mut visited = BTreeSet::new();

                'scan: loop {
                    let generation = self.board.generation();

                    for index in self.board.search_tree().overlapping_objects(&region, Some(layer)) {
                        if !visited.insert(index) {
                            continue;
                        }

                        if self.is_stop_requested() {
                            log::debug!("pull tight stopped");
                            return result || something_changed;
                        }

                        if self.opt_item(index, trace_costs) {
                            something_changed = true;
                        }

                        if let Err(BoardError::Modified(_)) = self.board.check_generation(generation) {
                            // Items of the snapshot may be gone or split.
                            continue 'scan;
                        }
                    }

                    break;
                }
            }

            result |= something_changed;
        }

        result
    }

    fn opt_item(&mut self, index: ItemIndex, trace_costs: Option<&[TraceCostFactor]>) -> bool {
        match self.board.item(index) {
            Some(Item::Trace(..)) => {
                if self.pull_tight_trace(index) {
                    self.split_traces_at_keep_point();
                    true
                } else {
                    self.smoothen_selected_trace(index)
                }
            }
            Some(Item::Via(..)) => trace_costs.map_or(false, |costs| {
                self.opt_via_location(index, costs, OPT_VIA_MAX_ITERATIONS)
            }),
            _ => false,
        }
    }

    fn take_changed_region(&mut self, layer: usize) -> Option<TileShape> {
        let area = self.board.changed_area_mut()?;

        if area.is_empty(layer) {
            return None;
        }

        let region = area.area(layer);
        area.set_empty(layer);

        let offset = 1.5
            * (self.board.rules().clearance_matrix().max_value_on_layer(layer)
                + 2 * self.board.max_trace_half_width()) as f64;
        Some(TileShape::Octagon(region).enlarge(offset))
    }

    fn is_selected(&self, nets: &[usize]) -> bool {
        self.only_nets.is_empty() || nets.iter().any(|net| self.only_nets.contains(net))
    }

    /// Pulls the trace at `index` tight. Returns true if it was changed.
    pub fn pull_tight_trace(&mut self, index: ItemIndex) -> bool {
        let Some(trace) = self.board.trace(index) else {
            return false;
        };

        if trace.is_shove_fixed()
            || !self.is_selected(trace.nets())
            || !self.board.rules().is_pull_tight(trace.nets())
        {
            return false;
        }

        let polyline = trace.polyline().clone();
        let layer = trace.layer();
        let half_width = trace.half_width();
        let nets = trace.nets().to_vec();
        let clearance_class = trace.clearance_class();
        let contact_pins = self.board.touching_pins_at_end_corners(index);

        let tightened = self.pull_tight_polyline(
            &polyline,
            layer,
            half_width,
            &nets,
            clearance_class,
            contact_pins,
        );

        if tightened == polyline || tightened.line_count() < 3 {
            return false;
        }

        log::trace!(
            "trace {:?} tightened from {} to {} corners",
            index,
            polyline.corner_count(),
            tightened.corner_count()
        );
        self.board.change(index, tightened)
    }

    /// Tightens a polyline that is not on the board (yet). `contact_pins`
    /// may be overlapped; every other item is an obstacle by the usual net
    /// rules.
    pub fn pull_tight_polyline(
        &mut self,
        polyline: &Polyline,
        layer: usize,
        half_width: i64,
        nets: &[usize],
        clearance_class: usize,
        contact_pins: BTreeSet<ItemIndex>,
    ) -> Polyline {
        if polyline.line_count() < 3 {
            return polyline.clone();
        }

        let half_width = self
            .board
            .compensated_half_width(half_width, clearance_class, layer);
        self.context = TraceContext {
            layer,
            half_width: half_width as f64,
            nets: nets.to_vec(),
            clearance_class,
            contact_pins,
        };

        let strategy = self.strategy;
        strategy.tighten(self, polyline.clone())
    }

    /// Runs `pass` until the polyline stops changing or a stop is requested.
    pub(crate) fn repeat_passes(
        &mut self,
        polyline: Polyline,
        pass: impl Fn(&mut Self, Polyline) -> Polyline,
    ) -> Polyline {
        let mut current = polyline;

        for _ in 0..MAX_TIGHTEN_PASSES {
            if self.is_stop_requested() {
                break;
            }

            let next = pass(self, current.clone());

            if next == current || next.line_count() < 3 {
                break;
            }

            current = next;
        }

        current
    }

    pub(crate) fn is_stop_requested(&self) -> bool {
        self.stop.is_stop_requested()
    }

    pub(crate) fn min_translate_dist(&self) -> f64 {
        self.min_translate_dist
    }

    pub(crate) fn half_width(&self) -> f64 {
        self.context.half_width
    }

    pub(crate) fn has_clip(&self) -> bool {
        self.clip.is_some()
    }

    pub(crate) fn in_clip(&self, p: FloatPoint) -> bool {
        self.clip.as_ref().map_or(true, |clip| clip.contains_float(p))
    }

    pub(crate) fn in_clip_int(&self, p: IntPoint) -> bool {
        self.clip.as_ref().map_or(true, |clip| clip.contains_int(p))
    }

    pub(crate) fn mark_changed(&mut self, p: FloatPoint) {
        let layer = self.context.layer;

        if let Some(area) = self.board.changed_area_mut() {
            area.join(p, layer);
        }
    }

    /// Clearance check of segment `index` of `polyline` as part of the
    /// current trace.
    pub(crate) fn check_segment(&self, polyline: &Polyline, index: usize) -> bool {
        polyline
            .offset_shape(self.context.half_width, index)
            .is_some_and(|shape| {
                self.board.check_trace_shape(
                    &shape,
                    self.context.layer,
                    &self.context.nets,
                    self.context.clearance_class,
                    &self.context.contact_pins,
                )
            })
    }

    /// Clearance check of the straight connection of two grid points.
    /// Coinciding points need no check.
    pub(crate) fn check_straight(&self, from: IntPoint, to: IntPoint) -> bool {
        if from == to {
            return true;
        }

        let polyline = Polyline::from_corners(&[from, to]);
        polyline.line_count() != 3 || self.check_segment(&polyline, 0)
    }

    /// Tries to shorten the polyline by moving one of its lines parallel.
    pub(crate) fn reposition_lines(&mut self, polyline: Polyline) -> Polyline {
        let lines = polyline.lines();

        if lines.len() < 5 {
            return polyline;
        }

        for i in 2..lines.len() - 2 {
            let Some(new_line) = self.reposition_line(lines, i) else {
                continue;
            };

            let mut new_lines = lines.to_vec();
            new_lines[i] = new_line;
            let result = self.skip_segments_of_length_0(Polyline::new(new_lines));

            if result.line_count() >= 3 {
                return result;
            }
        }

        polyline
    }

    /// Binary search for the farthest parallel shift of `lines[no]`
    /// towards its nearer neighbouring corner.
    pub(crate) fn reposition_line(&mut self, lines: &[Line], no: usize) -> Option<Line> {
        if no < 2 || no + 3 > lines.len() {
            return None;
        }

        if let Some(clip) = &self.clip {
            for i in [no - 1, no] {
                let corner = lines[i].intersection(&lines[i + 1])?;

                if clip.is_outside(&corner) {
                    return None;
                }
            }
        }

        let translate_line = lines[no];
        let prev_corner = lines[no - 2].intersection(&lines[no - 1])?;
        let next_corner = lines[no + 1].intersection(&lines[no + 2])?;
        let prev_dist = translate_line.signed_distance(prev_corner.to_float());
        let next_dist = translate_line.signed_distance(next_corner.to_float());

        if Signum::of_f64(prev_dist) != Signum::of_f64(next_dist) {
            return None;
        }

        let (nearest, mut max_dist) = if prev_dist.abs() < next_dist.abs() {
            (prev_corner, prev_dist)
        } else {
            (next_corner, next_dist)
        };

        if max_dist == 0.0 {
            return None;
        }

        let nearest_side = translate_line.side_of(&nearest);
        let sign = Signum::of_f64(max_dist).as_f64();
        let mut translate_dist = max_dist;
        let mut delta = max_dist;
        let mut check_lines = [lines[no - 1], translate_line, lines[no + 1]];
        let mut result = None;
        let mut first_time = true;

        while first_time || delta.abs() > self.min_translate_dist {
            check_lines[1] = match (first_time, nearest.as_int()) {
                (true, Some(p)) => Line::from_direction(p, translate_line.direction()),
                _ => translate_line.translate(translate_dist),
            };

            if check_lines[1] == translate_line {
                break;
            }

            let new_side = check_lines[1].side_of(&nearest);

            if new_side != nearest_side && new_side != Side::Collinear {
                // Moved past the corner by rounding.
                max_dist -= sign * 0.5;
                translate_dist -= sign * 0.5;
                delta -= sign * 0.5;

                if max_dist * sign <= 0.0 {
                    break;
                }

                continue;
            }

            let check = Polyline::new(check_lines);
            let check_ok = check.line_count() == 3 && self.check_segment(&check, 0);
            delta /= 2.0;

            if check_ok {
                result = Some(check_lines[1]);

                if first_time {
                    break;
                }

                translate_dist += delta;
            } else {
                translate_dist -= delta;
            }

            first_time = false;
        }

        let new_line = result?;

        for corner in [
            lines[no - 1].intersection_approx(&new_line),
            lines[no + 1].intersection_approx(&new_line),
            lines[no - 1].intersection_approx(&lines[no]),
            lines[no].intersection_approx(&lines[no + 1]),
        ]
        .into_iter()
        .flatten()
        {
            self.mark_changed(corner);
        }

        Some(new_line)
    }

    /// Removes segments whose corners (nearly) coincide, if that does not
    /// create a clearance violation.
    pub(crate) fn skip_segments_of_length_0(&self, polyline: Polyline) -> Polyline {
        let mut current = polyline;
        let mut i = 1;

        while i + 1 < current.line_count() {
            let n = current.line_count();
            let try_skip = if i == 1 || i == n - 2 {
                // End corners may only vanish when they coincide exactly.
                current.corner(i - 1) == current.corner(i)
            } else {
                float_distance_square(current.corner_approx(i - 1), current.corner_approx(i))
                    < MIN_CORNER_DIST_SQUARE
            };

            if try_skip {
                let reduced = current.replace_lines(i, i, &[]);
                let mut ok = reduced.line_count() == n - 1;

                if ok && !current.line(i).is_multiple_of_45_degree() {
                    if i > 1 {
                        ok = self.check_segment(&reduced, i - 2);
                    }

                    if ok && i < n - 2 {
                        ok = self.check_segment(&reduced, i - 1);
                    }
                }

                if ok {
                    current = reduced;
                    continue;
                }
            }

            i += 1;
        }

        current
    }

    fn split_traces_at_keep_point(&mut self) -> bool {
        let Some((point, layer)) = self.keep_point else {
            return false;
        };

        for index in self.board.pick_items(point, Some(layer)) {
            if self.board.trace(index).is_some() && self.board.split_at_point(index, point).is_some() {
                return true;
            }
        }

        false
    }

    fn smoothen_selected_trace(&mut self, index: ItemIndex) -> bool {
        match self.board.trace(index) {
            Some(trace) if self.is_selected(trace.nets()) => self.smoothen_end_corners_at_trace(index),
            _ => false,
        }
    }

    /// Cuts off acute joints between the ends of the trace and the traces
    /// continuing it. Returns true if something was changed.
    pub fn smoothen_end_corners_at_trace(&mut self, index: ItemIndex) -> bool {
        let Some(trace) = self.board.trace(index) else {
            return false;
        };

        if trace.is_shove_fixed() {
            return false;
        }

        self.context = TraceContext {
            layer: trace.layer(),
            half_width: trace.half_width() as f64,
            nets: trace.nets().to_vec(),
            clearance_class: trace.clearance_class(),
            contact_pins: BTreeSet::new(),
        };

        let mut result = false;
        let mut current = Some(index);

        for _ in 0..MAX_TIGHTEN_PASSES {
            let Some(index) = current else {
                break;
            };

            let Some(trace) = self.board.trace(index).cloned() else {
                break;
            };

            let Some(smoothened) = self.smoothen_end_corners_once(index, trace.polyline()) else {
                break;
            };

            result = true;
            self.board.remove_item(index);
            current = self.board.insert_trace_without_cleaning(
                smoothened.clone(),
                trace.layer(),
                trace.half_width(),
                trace.nets().to_vec(),
                trace.clearance_class(),
                trace.fixed_state(),
            );

            let first_cut = smoothened.line(1);
            let last_cut = smoothened.line(smoothened.line_count() - 2);

            for &net in trace.nets() {
                self.board
                    .split_traces_along(&smoothened.first_corner(), Some(&first_cut), trace.layer(), net);
                self.board
                    .split_traces_along(&smoothened.last_corner(), Some(&last_cut), trace.layer(), net);
                self.board.normalize_traces(net);

                if self.split_traces_at_keep_point() {
                    return true;
                }
            }
        }

        result
    }

    fn smoothen_end_corners_once(&mut self, index: ItemIndex, polyline: &Polyline) -> Option<Polyline> {
        let strategy = self.strategy;
        let smoothing = strategy.corner_smoothing()?;

        let start_contacts = self.board.start_contacts(index);
        let smoothened = match self.smoothen_start_corner(polyline, &start_contacts, smoothing) {
            Some(smoothened) => {
                self.mark_changed(smoothened.corner_approx(0));
                smoothened
            }
            None => {
                let end_contacts = self.board.end_contacts(index);
                let smoothened = self
                    .smoothen_start_corner(&polyline.reverse(), &end_contacts, smoothing)?
                    .reverse();

                if smoothened.line_count() < 3 {
                    return None;
                }

                self.mark_changed(smoothened.corner_approx(smoothened.corner_count() - 1));
                smoothened
            }
        };

        self.context.contact_pins = self.board.touching_pins_at_end_corners(index);
        let smoothened = self.skip_segments_of_length_0(smoothened);
        (smoothened.line_count() >= 3).then_some(smoothened)
    }

    /// Replaces the start of `polyline` by a cut off corner if it forms an
    /// acute angle or a bend with the single other trace at its start.
    fn smoothen_start_corner(
        &mut self,
        polyline: &Polyline,
        contacts: &BTreeSet<ItemIndex>,
        smoothing: CornerSmoothing,
    ) -> Option<Polyline> {
        if polyline.line_count() < 3 {
            return None;
        }

        let end_corner = polyline.first_corner();

        if let Some(clip) = &self.clip {
            if clip.is_outside(&end_corner) {
                return None;
            }
        }

        let mut prev_end_corner = polyline.corner(1);
        let mut start_line_no = 1;

        if smoothing.skip_short_segment
            && !end_corner.is_int()
            && float_distance_square(end_corner.to_float(), prev_end_corner.to_float())
                < any_angle::SKIP_LENGTH
        {
            if polyline.corner_count() < 3 {
                return None;
            }

            prev_end_corner = polyline.corner(2);
            start_line_no = 2;
        }

        if start_line_no + 1 >= polyline.line_count() {
            return None;
        }

        let line_direction = polyline.line(start_line_no).direction();
        let prev_line_direction = polyline.line(start_line_no + 1).direction();
        let mut found = None;

        for &contact in contacts {
            let Some(Item::Trace(other)) = self.board.item(contact) else {
                return None;
            };

            if other.is_shove_fixed() {
                return None;
            }

            let other_polyline = other.polyline();
            let (other_corner, other_line, other_prev_line) = if other_polyline.first_corner() == end_corner {
                (
                    other_polyline.corner_approx(1),
                    other_polyline.line(1),
                    other_polyline.line(2),
                )
            } else {
                let k = other_polyline.corner_count() - 2;
                (
                    other_polyline.corner_approx(k),
                    other_polyline.line(k + 1).opposite(),
                    other_polyline.line(k),
                )
            };

            let other_direction = other_line.direction();
            let prev_side = other_line.side_of(&prev_end_corner);

            let kind = match line_direction.projection(&other_direction) {
                Signum::Positive
                    if prev_side != Side::Collinear
                        && (!smoothing.acute_needs_orthogonal || other_direction.is_orthogonal()) =>
                {
                    Some(Joint::Acute)
                }
                Signum::Zero
                    if polyline.corner_count() > 2
                        && prev_line_direction.projection(&other_direction) == Signum::Positive =>
                {
                    Some(Joint::Bend)
                }
                _ => None,
            };

            if let Some(kind) = kind {
                found = Some(ContactJoint {
                    kind,
                    other_line,
                    other_prev_line,
                    other_corner,
                });
            }
        }

        let joint = found?;
        let tail = &polyline.lines()[start_line_no..];

        let lines: Vec<Line> = match joint.kind {
            Joint::Acute => {
                let translate_line = Line::from_direction(
                    end_corner.round(),
                    joint.other_line.direction().turn_45_degree(2),
                );
                let prev_dist = translate_line.signed_distance(prev_end_corner.to_float());
                let dist = ((SQRT2 - 1.0) * self.context.half_width)
                    .min(prev_dist.abs())
                    .min(translate_line.signed_distance(joint.other_corner).abs());

                if dist < 0.99 {
                    return None;
                }

                let dist = (dist - 1.0).max(1.0) * Signum::of_f64(prev_dist).as_f64();
                let add_line = translate_line.translate(dist);

                [joint.other_line, add_line]
                    .into_iter()
                    .chain(tail.iter().copied())
                    .collect()
            }
            Joint::Bend => {
                let check_lines: Vec<Line> = [joint.other_prev_line, joint.other_line]
                    .into_iter()
                    .chain(tail.iter().copied())
                    .collect();
                let strategy = self.strategy;
                let new_line = strategy.reposition_line(self, &check_lines, 2)?;

                [joint.other_line, new_line]
                    .into_iter()
                    .chain(tail[1..].iter().copied())
                    .collect()
            }
        };

        let smoothened = Polyline::new(lines);
        (smoothened.line_count() >= 3 && !smoothened.is_point()).then_some(smoothened)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        board::FixedState,
        geometry::{IntBox, Point},
        rules::BoardRules,
    };

    fn p(x: i64, y: i64) -> IntPoint {
        IntPoint::new(x, y)
    }

    fn board() -> Board {
        Board::new(BoardRules::new(1, 100), IntBox::new(-10_000, -10_000, 10_000, 10_000))
    }

    fn settings(angle_restriction: AngleRestriction) -> OptimizerSettings {
        OptimizerSettings {
            angle_restriction,
            ..OptimizerSettings::default()
        }
    }

    #[test]
    fn strategy_follows_angle_restriction() {
        let mut board = board();
        let pull = PullTight::new(&mut board, &settings(AngleRestriction::NinetyDegree));
        assert_eq!(pull.strategy(), PullTightStrategy::NinetyDegree(NinetyDegree));
        assert!(pull.strategy().corner_smoothing().is_none());
    }

    #[test]
    fn fixed_trace_is_not_pulled_tight() {
        let mut board = board();
        let index = board
            .insert_trace_through(
                &[p(0, 0), p(0, 1000), p(1000, 1000), p(1000, 2000)],
                0,
                50,
                vec![1],
                1,
                FixedState::ShoveFixed,
            )
            .unwrap();

        let mut pull = PullTight::new(&mut board, &settings(AngleRestriction::AnyAngle));
        assert!(!pull.pull_tight_trace(index));
    }

    #[test]
    fn net_filter_skips_other_nets() {
        let mut board = board();
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
            only_nets: vec![2],
            ..settings(AngleRestriction::AnyAngle)
        };
        let mut pull = PullTight::new(&mut board, &settings);
        assert!(!pull.pull_tight_trace(index));
        assert_eq!(board.trace(index).unwrap().corner_count(), 4);
    }

    #[test]
    fn changed_area_is_rescanned_after_traces_merge() {
        let mut board = board();
        board.start_marking_changed_area();

        let mut insert = |corners: &[IntPoint]| {
            board
                .insert_trace_without_cleaning(
                    Polyline::from_corners(corners),
                    0,
                    50,
                    vec![1],
                    1,
                    FixedState::Unfixed,
                )
                .unwrap()
        };
        insert(&[p(0, 0), p(0, 1000), p(1000, 1000)]);
        insert(&[p(1000, 1000), p(1000, 2000), p(2000, 2000)]);

        let mut pull = PullTight::new(&mut board, &settings(AngleRestriction::AnyAngle));
        assert!(pull.opt_changed_area(None));

        let traces = board.trace_indices();
        assert_eq!(traces.len(), 1);

        let trace = board.trace(traces[0]).unwrap();
        assert_eq!(trace.corner_count(), 2);
        let ends = [trace.first_corner(), trace.last_corner()];
        assert!(ends.contains(&Point::Int(p(0, 0))));
        assert!(ends.contains(&Point::Int(p(2000, 2000))));
        assert!(board.search_tree().is_consistent());
    }
}
