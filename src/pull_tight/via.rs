use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    board::{item::Via, AccessItem, Item, ItemIndex},
    geometry::{IntPoint, IntVector, Polyline},
    math::{self, SQRT2},
};

use super::PullTight;

/// Relative cost of trace length on one layer, separately for the two axis
/// directions. Layers without an entry cost 1 in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceCostFactor {
    pub horizontal: f64,
    pub vertical: f64,
}

impl Default for TraceCostFactor {
    fn default() -> Self {
        Self {
            horizontal: 1.0,
            vertical: 1.0,
        }
    }
}

impl TraceCostFactor {
    fn cost(&self, from: IntPoint, to: IntPoint) -> f64 {
        let dx = self.horizontal * (to.x - from.x) as f64;
        let dy = self.vertical * (to.y - from.y) as f64;
        dx.hypot(dy)
    }
}

/// A trace ending at the via center.
#[derive(Debug, Clone)]
struct ViaTrace {
    index: ItemIndex,
    corners: Vec<IntPoint>,
    at_start: bool,
    layer: usize,
    half_width: i64,
    nets: Vec<usize>,
    clearance_class: usize,
}

impl ViaTrace {
    fn neighbour(&self) -> IntPoint {
        if self.at_start {
            self.corners[1]
        } else {
            self.corners[self.corners.len() - 2]
        }
    }

    fn moved_to(&self, center: IntPoint) -> Polyline {
        let mut corners = self.corners.clone();

        if self.at_start {
            corners[0] = center;
        } else {
            let last = corners.len() - 1;
            corners[last] = center;
        }

        Polyline::from_corners(&corners)
    }
}

impl PullTight<'_> {
    /// Moves a via connecting exactly two traces to where the weighted
    /// length of the traces is smaller, in steps of the minimal translate
    /// distance. Returns true if the via was moved.
    pub fn opt_via_location(
        &mut self,
        index: ItemIndex,
        costs: &[TraceCostFactor],
        max_iterations: usize,
    ) -> bool {
        let mut moved = false;

        for _ in 0..max_iterations {
            if self.is_stop_requested() || !self.move_via_once(index, costs) {
                break;
            }

            moved = true;
        }

        moved
    }

    fn via_traces(&self, index: ItemIndex) -> Option<(Via, [ViaTrace; 2])> {
        let Some(Item::Via(via)) = self.board.item(index) else {
            return None;
        };

        if via.is_shove_fixed() {
            return None;
        }

        let contacts = self.board.normal_contacts(index);

        if contacts.len() != 2 {
            return None;
        }

        let traces = contacts
            .into_iter()
            .map(|contact| self.via_trace(contact, via.center()))
            .collect::<Option<Vec<_>>>()?;

        Some((via.clone(), traces.try_into().ok()?))
    }

    fn via_trace(&self, index: ItemIndex, center: IntPoint) -> Option<ViaTrace> {
        let trace = self.board.trace(index)?;

        if trace.is_shove_fixed() {
            return None;
        }

        let corners = trace
            .polyline()
            .corners()
            .iter()
            .map(|corner| corner.as_int())
            .collect::<Option<Vec<IntPoint>>>()?;

        let at_start = if corners.first() == Some(&center) {
            true
        } else if corners.last() == Some(&center) {
            false
        } else {
            return None;
        };

        Some(ViaTrace {
            index,
            corners,
            at_start,
            layer: trace.layer(),
            half_width: trace.half_width(),
            nets: trace.nets().to_vec(),
            clearance_class: trace.clearance_class(),
        })
    }

    fn move_via_once(&mut self, index: ItemIndex, costs: &[TraceCostFactor]) -> bool {
        let Some((via, traces)) = self.via_traces(index) else {
            return false;
        };

        let cost_at = |center: IntPoint| -> f64 {
            traces
                .iter()
                .map(|trace| {
                    costs
                        .get(trace.layer)
                        .copied()
                        .unwrap_or_default()
                        .cost(center, trace.neighbour())
                })
                .sum()
        };

        let center = via.center();
        let step = self.min_translate_dist.round() as i64;
        let diagonal = math::round_to_i64(self.min_translate_dist / SQRT2);
        let offsets = [
            IntVector::new(step, 0),
            IntVector::new(diagonal, diagonal),
            IntVector::new(0, step),
            IntVector::new(-diagonal, diagonal),
            IntVector::new(-step, 0),
            IntVector::new(-diagonal, -diagonal),
            IntVector::new(0, -step),
            IntVector::new(diagonal, -diagonal),
        ];

        let mut best_cost = cost_at(center);
        let mut best = None;

        for offset in offsets {
            let new_center = center.translate_by(offset);
            let new_cost = cost_at(new_center);

            if new_cost >= best_cost {
                continue;
            }

            if let Some(polylines) = self.check_via_move(index, &via, &traces, new_center) {
                best_cost = new_cost;
                best = Some((new_center, polylines));
            }
        }

        let Some((new_center, polylines)) = best else {
            return false;
        };

        if let Err(err) = self.board.move_drill_item(index, new_center) {
            log::warn!("via {:?} not moved: {}", index, err);
            return false;
        }

        for (trace, polyline) in traces.iter().zip(polylines) {
            self.board.change(trace.index, polyline);
        }

        log::trace!("via {:?} moved from {:?} to {:?}", index, center, new_center);
        true
    }

    /// The changed trace polylines if the via and its traces fit at
    /// `new_center`.
    fn check_via_move(
        &self,
        index: ItemIndex,
        via: &Via,
        traces: &[ViaTrace; 2],
        new_center: IntPoint,
    ) -> Option<[Polyline; 2]> {
        if traces.iter().any(|trace| trace.neighbour() == new_center) {
            return None;
        }

        let mut ignore = BTreeSet::from([index]);

        for trace in traces {
            ignore.insert(trace.index);
            ignore.extend(self.board.touching_pins_at_end_corners(trace.index));
        }

        let mut moved = via.clone();
        moved.set_center(new_center);
        let moved = Item::Via(moved);

        for shape_index in 0..moved.tile_shape_count() {
            let shape = self.board.tree_shape(&moved, shape_index)?;

            if !self.board.check_trace_shape(
                &shape,
                moved.shape_layer(shape_index),
                moved.nets(),
                moved.clearance_class(),
                &ignore,
            ) {
                return None;
            }
        }

        let polylines = traces.clone().map(|trace| trace.moved_to(new_center));

        for (trace, polyline) in traces.iter().zip(&polylines) {
            if polyline.corner_count() < 2
                || !self.board.check_polyline_trace(
                    polyline,
                    trace.layer,
                    trace.half_width,
                    &trace.nets,
                    trace.clearance_class,
                    &ignore,
                )
            {
                return None;
            }
        }

        Some(polylines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        board::{Board, FixedState},
        geometry::{IntBox, Point},
        rules::BoardRules,
        settings::OptimizerSettings,
    };

    fn p(x: i64, y: i64) -> IntPoint {
        IntPoint::new(x, y)
    }

    #[test]
    fn via_moves_towards_the_shorter_connection() {
        let mut board = Board::new(BoardRules::new(2, 100), IntBox::new(-10_000, -10_000, 10_000, 10_000));
        let first = board
            .insert_trace_through(&[p(0, 0), p(1000, 0)], 0, 50, vec![1], 1, FixedState::Unfixed)
            .unwrap();
        let second = board
            .insert_trace_through(&[p(1000, 0), p(1000, 1000)], 1, 50, vec![1], 1, FixedState::Unfixed)
            .unwrap();
        let via = board.add_item(Item::Via(Via::new(
            p(1000, 0),
            0,
            1,
            100,
            vec![1],
            1,
            FixedState::Unfixed,
        )));

        let costs = [TraceCostFactor::default(); 2];
        let mut pull = PullTight::new(&mut board, &OptimizerSettings::default());
        assert!(pull.opt_via_location(via, &costs, 10));

        let Some(Item::Via(moved)) = board.item(via) else {
            panic!("via is gone");
        };
        let center = moved.center();
        assert!(center.x < 1000 && center.y > 0);
        assert_eq!(board.trace(first).unwrap().last_corner(), Point::Int(center));
        assert_eq!(board.trace(second).unwrap().first_corner(), Point::Int(center));
    }

    #[test]
    fn fixed_via_stays() {
        let mut board = Board::new(BoardRules::new(2, 100), IntBox::new(-10_000, -10_000, 10_000, 10_000));
        board.insert_trace_through(&[p(0, 0), p(1000, 0)], 0, 50, vec![1], 1, FixedState::Unfixed);
        board.insert_trace_through(&[p(1000, 0), p(1000, 1000)], 1, 50, vec![1], 1, FixedState::Unfixed);
        let via = board.add_item(Item::Via(Via::new(
            p(1000, 0),
            0,
            1,
            100,
            vec![1],
            1,
            FixedState::ShoveFixed,
        )));

        let mut pull = PullTight::new(&mut board, &OptimizerSettings::default());
        assert!(!pull.opt_via_location(via, &[], 10));
    }
}
