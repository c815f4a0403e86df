//! Making room for a new trace shape by pushing aside the unfixed traces and
//! vias in its way.
//!
//! Shoving happens in two phases. Planning walks the obstacles of a shape
//! recursively and records where every pushed item would go without
//! touching the board; the shapes of the planned positions are reserved so
//! that later pushes can not run into them. Only a plan that succeeded as a
//! whole is applied to the board.

use std::collections::BTreeSet;

use geo::{ConvexHull, MultiPoint};
use itertools::Itertools;
use thiserror::Error;

use crate::{
    board::{item::Via, AccessItem, Board, FixedState, Item, ItemIndex},
    geometry::{AccessTileShape, FloatPoint, IntOctagon, IntPoint, Polyline, TileShape},
    settings::OptimizerSettings,
    stoppable::{Stoppable, TimeLimit},
};

/// Number of via radii a via is moved at most to get out of the way.
const MAX_VIA_STEPS: usize = 16;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShoveError {
    #[error("item {item:?} on layer {layer} can not be shoved")]
    Blocked { item: ItemIndex, layer: usize },
    #[error("recursion budget exhausted at item {item:?} on layer {layer}")]
    BudgetExhausted { item: ItemIndex, layer: usize },
    #[error("shoved shape runs into the inserted shape on layer {0}")]
    SelfCollision(usize),
    #[error("shape leaves the board on layer {0}")]
    OutsideBoard(usize),
    #[error("time limit exceeded")]
    TimeLimitExceeded,
    #[error("trace polyline is degenerate")]
    Degenerate,
    #[error("board changed while shoving, item {0:?} is stale")]
    Inconsistent(ItemIndex),
}

impl ShoveError {
    /// Board item and layer that made the shove fail, if known.
    pub fn obstacle(&self) -> Option<(ItemIndex, usize)> {
        match *self {
            ShoveError::Blocked { item, layer } | ShoveError::BudgetExhausted { item, layer } => {
                Some((item, layer))
            }
            _ => None,
        }
    }
}

/// Remaining recursion depths of a shove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShoveBudget {
    pub recursion_depth: usize,
    pub via_recursion_depth: usize,
    pub spring_over_depth: usize,
}

impl From<&OptimizerSettings> for ShoveBudget {
    fn from(settings: &OptimizerSettings) -> Self {
        Self {
            recursion_depth: settings.max_shove_recursion_depth,
            via_recursion_depth: settings.max_via_recursion_depth,
            spring_over_depth: settings.max_spring_over_recursion_depth,
        }
    }
}

impl ShoveBudget {
    fn enter_trace(self) -> Option<Self> {
        Some(Self {
            recursion_depth: self.recursion_depth.checked_sub(1)?,
            ..self
        })
    }

    fn enter_via(self) -> Option<Self> {
        Some(Self {
            via_recursion_depth: self.via_recursion_depth.checked_sub(1)?,
            ..self
        })
    }

    fn spring_over(self) -> Option<Self> {
        Some(Self {
            spring_over_depth: self.spring_over_depth.checked_sub(1)?,
            ..self
        })
    }
}

/// Where the shoving shape comes from. Obstacles are pushed around the
/// shape on the side facing away from this point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FromSide {
    pub point: FloatPoint,
}

impl FromSide {
    pub fn new(point: FloatPoint) -> Self {
        Self { point }
    }

    /// The start of segment `index` of a polyline being inserted.
    pub fn of_segment(polyline: &Polyline, index: usize) -> Self {
        Self::new(polyline.corner_approx(index))
    }
}

#[derive(Debug, Clone)]
struct Reserved {
    shape: TileShape,
    layer: usize,
    nets: Vec<usize>,
    clearance_class: usize,
    /// `None` for the shapes being inserted.
    owner: Option<ItemIndex>,
}

#[derive(Debug, Clone)]
enum Displacement {
    Trace { old: Polyline, new: Polyline },
    Via { old: IntPoint, new: IntPoint },
}

#[derive(Debug, Clone, Default)]
struct Plan {
    reserved: Vec<Reserved>,
    moves: Vec<(ItemIndex, Displacement)>,
}

#[derive(Debug, Clone, Copy)]
struct Snapshot {
    reserved: usize,
    moves: usize,
}

impl Plan {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            reserved: self.reserved.len(),
            moves: self.moves.len(),
        }
    }

    fn rollback(&mut self, snapshot: Snapshot) {
        self.reserved.truncate(snapshot.reserved);
        self.moves.truncate(snapshot.moves);
    }

    fn is_moved(&self, index: ItemIndex) -> bool {
        self.moves.iter().any(|(moved, _)| *moved == index)
    }
}

/// A shape to be made room for, with the properties of its owner.
#[derive(Debug, Clone, Copy)]
struct Pusher<'s> {
    shape: &'s TileShape,
    layer: usize,
    nets: &'s [usize],
    clearance_class: usize,
    owner: Option<ItemIndex>,
}

fn is_net_obstacle(nets: &[usize], other_nets: &[usize]) -> bool {
    nets.is_empty() || !other_nets.iter().any(|net| nets.contains(net))
}

fn round(p: FloatPoint) -> IntPoint {
    IntPoint::round(p)
}

fn chain_length(chain: &[IntPoint]) -> f64 {
    chain.iter().tuple_windows().map(|(a, b)| a.distance(*b)).sum()
}

pub struct Shove<'a> {
    board: &'a mut Board,
    budget: ShoveBudget,
    time_limit: Option<TimeLimit>,
    plan: Plan,
}

impl<'a> Shove<'a> {
    pub fn new(board: &'a mut Board, settings: &OptimizerSettings) -> Self {
        Self {
            board,
            budget: settings.into(),
            time_limit: (settings.time_limit_ms > 0).then(|| TimeLimit::new(settings.time_limit_ms)),
            plan: Plan::default(),
        }
    }

    pub fn with_budget(mut self, budget: ShoveBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn board(&self) -> &Board {
        self.board
    }

    /// True if `shape` could be inserted by shoving its obstacles aside.
    /// The board is left unchanged; on failure the blocking item is
    /// recorded on the board.
    pub fn check(
        &mut self,
        shape: &TileShape,
        from_side: Option<FromSide>,
        layer: usize,
        nets: &[usize],
        clearance_class: usize,
    ) -> bool {
        self.start();
        let pusher = Pusher {
            shape,
            layer,
            nets,
            clearance_class,
            owner: None,
        };
        let result = self.push(pusher, from_side, self.budget);
        self.plan = Plan::default();
        self.record(result).is_ok()
    }

    /// Shoves the obstacles of `shape` aside. The shape itself is not
    /// added to the board.
    pub fn insert(
        &mut self,
        shape: &TileShape,
        from_side: Option<FromSide>,
        layer: usize,
        nets: &[usize],
        clearance_class: usize,
    ) -> Result<(), ShoveError> {
        self.start();
        let pusher = Pusher {
            shape,
            layer,
            nets,
            clearance_class,
            owner: None,
        };
        let result = self.push(pusher, from_side, self.budget);
        self.record(result)?;
        self.board.start_marking_changed_area();
        self.apply()
    }

    /// True if a trace along `polyline` could be inserted by shoving.
    pub fn check_trace(
        &mut self,
        polyline: &Polyline,
        layer: usize,
        half_width: i64,
        nets: &[usize],
        clearance_class: usize,
    ) -> bool {
        let result = self.plan_trace(polyline, layer, half_width, nets, clearance_class);
        self.plan = Plan::default();
        self.record(result).is_ok()
    }

    /// Shoves everything in the way of the trace aside and inserts it.
    /// Returns the index of the new trace.
    pub fn insert_trace(
        &mut self,
        polyline: Polyline,
        layer: usize,
        half_width: i64,
        nets: Vec<usize>,
        clearance_class: usize,
    ) -> Result<ItemIndex, ShoveError> {
        let result = self.plan_trace(&polyline, layer, half_width, &nets, clearance_class);
        self.record(result)?;
        self.board.start_marking_changed_area();
        self.apply()?;

        self.board
            .insert_trace(polyline, layer, half_width, nets, clearance_class, FixedState::Unfixed)
            .ok_or(ShoveError::Degenerate)
    }

    fn plan_trace(
        &mut self,
        polyline: &Polyline,
        layer: usize,
        half_width: i64,
        nets: &[usize],
        clearance_class: usize,
    ) -> Result<(), ShoveError> {
        self.start();

        if polyline.segment_count() == 0 {
            return Err(ShoveError::Degenerate);
        }

        let half_width = self
            .board
            .compensated_half_width(half_width, clearance_class, layer) as f64;

        for index in 0..polyline.segment_count() {
            let shape = polyline
                .offset_shape(half_width, index)
                .ok_or(ShoveError::Degenerate)?;
            let pusher = Pusher {
                shape: &shape,
                layer,
                nets,
                clearance_class,
                owner: None,
            };
            self.push(pusher, Some(FromSide::of_segment(polyline, index)), self.budget)?;
        }

        Ok(())
    }

    fn record(&mut self, result: Result<(), ShoveError>) -> Result<(), ShoveError> {
        if let Err(ref err) = result {
            log::debug!("shove failed: {}", err);

            if let Some((item, layer)) = err.obstacle() {
                self.board.set_shove_failing_obstacle(Some(item), Some(layer));
            }
        }

        result
    }

    /// Every public operation gets a fresh plan and the full time limit.
    fn start(&mut self) {
        self.plan = Plan::default();

        if let Some(limit) = self.time_limit.as_mut() {
            limit.restart();
        }
    }

    fn is_stop_requested(&self) -> bool {
        self.time_limit
            .as_ref()
            .is_some_and(|limit| limit.is_stop_requested())
    }

    fn clearance(&self, class1: usize, class2: usize, layer: usize) -> i64 {
        self.board.rules().clearance_matrix().value(class1, class2, layer)
    }

    /// Clearance test between two shapes the way the search tree does it.
    fn shapes_conflict(&self, a: &TileShape, a_class: usize, b: &TileShape, b_class: usize, layer: usize) -> bool {
        if self.board.is_clearance_compensation_used() {
            return a.intersects(b);
        }

        let half = self.clearance(a_class, b_class, layer) / 2;

        if half == 0 {
            a.intersects(b)
        } else {
            let half = half as f64;
            a.enlarge(half).intersects(&b.enlarge(half))
        }
    }

    /// Reserves the shape of `pusher` and shoves everything it runs into.
    fn push(&mut self, pusher: Pusher<'_>, from_side: Option<FromSide>, budget: ShoveBudget) -> Result<(), ShoveError> {
        if self.is_stop_requested() {
            return Err(ShoveError::TimeLimitExceeded);
        }

        if !pusher.shape.is_contained_in(&self.board.bounding_box()) {
            return Err(ShoveError::OutsideBoard(pusher.layer));
        }

        let collision = self.plan.reserved.iter().find(|reserved| {
            reserved.layer == pusher.layer
                && reserved.owner != pusher.owner
                && is_net_obstacle(pusher.nets, &reserved.nets)
                && self.shapes_conflict(
                    pusher.shape,
                    pusher.clearance_class,
                    &reserved.shape,
                    reserved.clearance_class,
                    pusher.layer,
                )
        });

        if let Some(reserved) = collision {
            return Err(match reserved.owner {
                Some(item) => ShoveError::Blocked {
                    item,
                    layer: pusher.layer,
                },
                None => ShoveError::SelfCollision(pusher.layer),
            });
        }

        self.plan.reserved.push(Reserved {
            shape: pusher.shape.clone(),
            layer: pusher.layer,
            nets: pusher.nets.to_vec(),
            clearance_class: pusher.clearance_class,
            owner: pusher.owner,
        });

        let obstacles: BTreeSet<ItemIndex> = self
            .board
            .search_tree()
            .overlapping_entries_with_clearance(
                self.board.rules().clearance_matrix(),
                pusher.shape,
                Some(pusher.layer),
                &[],
                pusher.clearance_class,
            )
            .into_iter()
            .map(|entry| entry.item)
            .filter(|&item| Some(item) != pusher.owner)
            .filter(|&item| {
                self.board
                    .item(item)
                    .is_some_and(|item| item.is_trace_obstacle(pusher.nets))
            })
            .collect();

        let from_side = from_side.or_else(|| {
            pusher
                .owner
                .is_some()
                .then(|| FromSide::new(pusher.shape.center_approx()))
        });

        for obstacle in obstacles {
            // Moved items are represented by their reserved shapes.
            if self.plan.is_moved(obstacle) {
                continue;
            }

            self.displace(obstacle, &pusher, from_side, budget)?;
        }

        Ok(())
    }

    fn displace(
        &mut self,
        obstacle: ItemIndex,
        pusher: &Pusher<'_>,
        from_side: Option<FromSide>,
        budget: ShoveBudget,
    ) -> Result<(), ShoveError> {
        let blocked = ShoveError::Blocked {
            item: obstacle,
            layer: pusher.layer,
        };
        let exhausted = ShoveError::BudgetExhausted {
            item: obstacle,
            layer: pusher.layer,
        };

        let Some(item) = self.board.item(obstacle) else {
            return Err(ShoveError::Inconsistent(obstacle));
        };

        if item.is_shove_fixed() {
            return Err(blocked);
        }

        match item {
            Item::Trace(..) => {
                let budget = budget.enter_trace().ok_or(exhausted)?;
                self.displace_trace(obstacle, pusher, from_side, budget, vec![])
            }
            Item::Via(via) => {
                let via = via.clone();
                let budget = budget.enter_via().ok_or(exhausted)?;
                self.displace_via(obstacle, via, pusher, from_side, budget)
            }
            _ => Err(blocked),
        }
    }

    /// Distance a pushed item of `class` with `half_width` has to keep from
    /// the bounding octagon of the pusher. Without compensation both shapes
    /// are enlarged by half the clearance, and the corners of an enlarged
    /// shape reach further than that, hence twice the clearance.
    fn detour_margin(&self, half_width: i64, pusher: &Pusher<'_>, class: usize) -> i64 {
        let layer = pusher.layer;
        let compensated = self.board.compensated_half_width(half_width, class, layer);

        if self.board.is_clearance_compensation_used() {
            compensated + 2
        } else {
            compensated + 2 * self.clearance(pusher.clearance_class, class, layer) + 2
        }
    }

    /// Reroutes the part of a trace running through the pusher around it,
    /// along the convex hull of the enlarged pusher and `extra_corners`.
    fn displace_trace(
        &mut self,
        index: ItemIndex,
        pusher: &Pusher<'_>,
        from_side: Option<FromSide>,
        budget: ShoveBudget,
        extra_corners: Vec<IntPoint>,
    ) -> Result<(), ShoveError> {
        let blocked = ShoveError::Blocked {
            item: index,
            layer: pusher.layer,
        };

        let Some(trace) = self.board.trace(index).cloned() else {
            return Err(ShoveError::Inconsistent(index));
        };

        let Some(corners) = trace
            .polyline()
            .corners()
            .iter()
            .map(|corner| corner.as_int())
            .collect::<Option<Vec<IntPoint>>>()
        else {
            log::debug!("trace {:?} with rational corners is not shoved", index);
            return Err(blocked);
        };

        let margin = self.detour_margin(trace.half_width(), pusher, trace.clearance_class());
        let region = pusher.shape.bounding_octagon().enlarge(margin as f64).bounding_octagon();

        let half_width = self
            .board
            .compensated_half_width(trace.half_width(), trace.clearance_class(), trace.layer())
            as f64;
        let polyline = trace.polyline();
        let conflicting: Vec<usize> = (0..polyline.segment_count())
            .filter(|&k| {
                polyline.offset_shape(half_width, k).is_some_and(|shape| {
                    self.shapes_conflict(
                        &shape,
                        trace.clearance_class(),
                        pusher.shape,
                        pusher.clearance_class,
                        pusher.layer,
                    )
                })
            })
            .collect();

        let (Some(&first), Some(&last)) = (conflicting.first(), conflicting.last()) else {
            return Ok(());
        };

        // Segment k runs from corner k to corner k + 1.
        let outside = |corner: &IntPoint| !region.contains_int(*corner);
        let Some(p) = (0..=first).rev().find(|&i| outside(&corners[i])) else {
            return Err(blocked);
        };
        let Some(q) = (last + 1..corners.len()).find(|&i| outside(&corners[i])) else {
            return Err(blocked);
        };

        let mut hull_points: Vec<FloatPoint> = region.corners_approx();
        hull_points.extend(extra_corners.iter().map(|corner| corner.to_float()));
        hull_points.push(corners[p].to_float());
        hull_points.push(corners[q].to_float());

        let Some(chains) = Self::hull_chains(hull_points, corners[p], corners[q]) else {
            return Err(blocked);
        };

        for chain in self.order_chains(chains, from_side) {
            let new_corners: Vec<IntPoint> = corners[..p]
                .iter()
                .chain(chain.iter())
                .chain(corners[q + 1..].iter())
                .copied()
                .collect();
            let new_polyline = Polyline::from_corners(&new_corners);

            if new_polyline.segment_count() == 0 || new_polyline.first_corner() != polyline.first_corner() {
                continue;
            }

            let snapshot = self.plan.snapshot();
            self.plan.moves.push((
                index,
                Displacement::Trace {
                    old: polyline.clone(),
                    new: new_polyline.clone(),
                },
            ));

            let result = (0..new_polyline.segment_count()).try_for_each(|k| {
                let shape = new_polyline.offset_shape(half_width, k).ok_or(ShoveError::Degenerate)?;
                let pushed = Pusher {
                    shape: &shape,
                    layer: trace.layer(),
                    nets: trace.nets(),
                    clearance_class: trace.clearance_class(),
                    owner: Some(index),
                };
                self.push(pushed, Some(FromSide::new(pusher.shape.center_approx())), budget)
            });

            match result {
                Ok(()) => {
                    log::trace!("trace {:?} shoved around {:?}", index, region);
                    return Ok(());
                }
                Err(ShoveError::Blocked { item, layer }) if item != index => {
                    self.plan.rollback(snapshot);

                    let Some(budget) = budget.spring_over() else {
                        continue;
                    };

                    // Spring over the blocking item by routing around it too.
                    let mut extra_corners = extra_corners.clone();
                    extra_corners.extend(self.spring_over_corners(item, layer, margin));

                    if self
                        .displace_trace(index, pusher, from_side, budget, extra_corners)
                        .is_ok()
                    {
                        return Ok(());
                    }

                    return Err(ShoveError::Blocked { item, layer });
                }
                Err(ShoveError::TimeLimitExceeded) => return Err(ShoveError::TimeLimitExceeded),
                Err(err) => {
                    log::trace!("detour of trace {:?} failed: {}", index, err);
                    self.plan.rollback(snapshot);
                }
            }
        }

        Err(blocked)
    }

    /// The two ways from `p` to `q` along the convex hull of `points`.
    fn hull_chains(points: Vec<FloatPoint>, p: IntPoint, q: IntPoint) -> Option<[Vec<IntPoint>; 2]> {
        let hull = MultiPoint::from(points).convex_hull();
        let mut ring: Vec<IntPoint> = hull.exterior().points().map(round).collect();
        ring.pop();
        ring.dedup();

        let n = ring.len();
        let ip = ring.iter().position(|&corner| corner == p)?;
        let iq = ring.iter().position(|&corner| corner == q)?;

        if ip == iq {
            return None;
        }

        let forward = (0..n)
            .map(|i| ring[(ip + i) % n])
            .take((iq + n - ip) % n + 1)
            .collect();
        let backward = (0..n)
            .map(|i| ring[(ip + n - i) % n])
            .take((ip + n - iq) % n + 1)
            .collect();

        Some([forward, backward])
    }

    /// Chains facing away from the pusher's origin first, the shorter one
    /// first if there is no origin.
    fn order_chains(&self, chains: [Vec<IntPoint>; 2], from_side: Option<FromSide>) -> [Vec<IntPoint>; 2] {
        let [a, b] = chains;

        let a_first = match from_side {
            Some(from) => {
                let distance = |chain: &[IntPoint]| -> f64 {
                    let inner = &chain[1..chain.len() - 1];

                    if inner.is_empty() {
                        return 0.0;
                    }

                    inner
                        .iter()
                        .map(|corner| {
                            let v = corner.to_float() - from.point;
                            v.x().hypot(v.y())
                        })
                        .sum::<f64>()
                        / inner.len() as f64
                };
                distance(&a) >= distance(&b)
            }
            None => chain_length(&a) <= chain_length(&b),
        };

        if a_first {
            [a, b]
        } else {
            [b, a]
        }
    }

    /// Corners of the enlarged bounding octagon of `item` on `layer`.
    fn spring_over_corners(&self, item: ItemIndex, layer: usize, margin: i64) -> Vec<IntPoint> {
        let Some(obstacle) = self.board.item(item) else {
            return vec![];
        };

        let octagon = (0..obstacle.tile_shape_count())
            .filter(|&i| obstacle.shape_layer(i) == layer)
            .filter_map(|i| self.board.tree_shape(obstacle, i))
            .map(|shape| shape.bounding_octagon())
            .fold(IntOctagon::EMPTY, |acc, octagon| acc.union(&octagon));

        if octagon.is_empty() {
            return vec![];
        }

        octagon
            .enlarge(margin as f64)
            .corners_approx()
            .into_iter()
            .map(round)
            .collect()
    }

    /// Moves a via away from the pusher until its pads clear it, then
    /// shoves the pads on all layers and drags the traces ending at the via
    /// along.
    fn displace_via(
        &mut self,
        index: ItemIndex,
        via: Via,
        pusher: &Pusher<'_>,
        from_side: Option<FromSide>,
        budget: ShoveBudget,
    ) -> Result<(), ShoveError> {
        let blocked = ShoveError::Blocked {
            item: index,
            layer: pusher.layer,
        };

        let center = via.center();
        let away = |from: FloatPoint| {
            let v = center.to_float() - from;
            let length = v.x().hypot(v.y());
            (length >= 1.0).then(|| (v.x() / length, v.y() / length))
        };
        let (dx, dy) = away(pusher.shape.center_approx())
            .or_else(|| from_side.and_then(|from| away(from.point)))
            .unwrap_or((0.0, 1.0));

        let step = (via.radius() + self.clearance(pusher.clearance_class, via.clearance_class(), pusher.layer) / 2)
            .max(1) as f64;

        let new_center = (1..=MAX_VIA_STEPS)
            .map(|i| {
                let distance = step * i as f64;
                IntPoint::new(
                    center.x + (dx * distance).round() as i64,
                    center.y + (dy * distance).round() as i64,
                )
            })
            .find(|&candidate| {
                let mut moved = via.clone();
                moved.set_center(candidate);
                let moved = Item::Via(moved);

                (0..moved.tile_shape_count())
                    .filter(|&i| moved.shape_layer(i) == pusher.layer)
                    .filter_map(|i| self.board.tree_shape(&moved, i))
                    .all(|shape| {
                        !self.shapes_conflict(
                            &shape,
                            moved.clearance_class(),
                            pusher.shape,
                            pusher.clearance_class,
                            pusher.layer,
                        )
                    })
            })
            .ok_or(blocked)?;

        let snapshot = self.plan.snapshot();
        let result = self.move_via(index, &via, new_center, pusher, budget);

        if result.is_err() {
            self.plan.rollback(snapshot);
        } else {
            log::trace!("via {:?} shoved from {:?} to {:?}", index, center, new_center);
        }

        result
    }

    fn move_via(
        &mut self,
        index: ItemIndex,
        via: &Via,
        new_center: IntPoint,
        pusher: &Pusher<'_>,
        budget: ShoveBudget,
    ) -> Result<(), ShoveError> {
        let from_side = Some(FromSide::new(pusher.shape.center_approx()));

        self.plan.moves.push((
            index,
            Displacement::Via {
                old: via.center(),
                new: new_center,
            },
        ));

        let mut moved = via.clone();
        moved.set_center(new_center);
        let moved = Item::Via(moved);

        for i in 0..moved.tile_shape_count() {
            let shape = self.board.tree_shape(&moved, i).ok_or(ShoveError::Degenerate)?;
            let pushed = Pusher {
                shape: &shape,
                layer: moved.shape_layer(i),
                nets: moved.nets(),
                clearance_class: moved.clearance_class(),
                owner: Some(index),
            };
            self.push(pushed, from_side, budget)?;
        }

        for contact in self.board.normal_contacts(index) {
            let blocked = ShoveError::Blocked {
                item: contact,
                layer: pusher.layer,
            };

            let Some(trace) = self.board.trace(contact).cloned() else {
                return Err(blocked);
            };

            if trace.is_shove_fixed() || self.plan.is_moved(contact) {
                return Err(blocked);
            }

            let Some(mut corners) = trace
                .polyline()
                .corners()
                .iter()
                .map(|corner| corner.as_int())
                .collect::<Option<Vec<IntPoint>>>()
            else {
                return Err(blocked);
            };

            let last = corners.len() - 1;

            if corners[0] == via.center() {
                corners[0] = new_center;
            } else if corners[last] == via.center() {
                corners[last] = new_center;
            } else {
                return Err(blocked);
            }

            let new_polyline = Polyline::from_corners(&corners);

            if new_polyline.segment_count() == 0 {
                return Err(blocked);
            }

            self.plan.moves.push((
                contact,
                Displacement::Trace {
                    old: trace.polyline().clone(),
                    new: new_polyline.clone(),
                },
            ));

            let half_width = self
                .board
                .compensated_half_width(trace.half_width(), trace.clearance_class(), trace.layer())
                as f64;

            for k in 0..new_polyline.segment_count() {
                let shape = new_polyline.offset_shape(half_width, k).ok_or(ShoveError::Degenerate)?;
                let pushed = Pusher {
                    shape: &shape,
                    layer: trace.layer(),
                    nets: trace.nets(),
                    clearance_class: trace.clearance_class(),
                    owner: Some(contact),
                };
                self.push(pushed, from_side, budget)?;
            }
        }

        Ok(())
    }

    /// Writes the plan to the board. Nothing is changed if any planned item
    /// no longer looks like it did when the plan was made.
    fn apply(&mut self) -> Result<(), ShoveError> {
        let moves = std::mem::take(&mut self.plan.moves);
        self.plan = Plan::default();

        for (index, displacement) in &moves {
            let is_current = match (displacement, self.board.item(*index)) {
                (Displacement::Trace { old, .. }, Some(Item::Trace(trace))) => trace.polyline() == old,
                (Displacement::Via { old, .. }, Some(Item::Via(via))) => via.center() == *old,
                _ => false,
            };

            if !is_current {
                return Err(ShoveError::Inconsistent(*index));
            }
        }

        for (index, displacement) in &moves {
            if let Displacement::Via { new, .. } = displacement {
                self.board
                    .move_drill_item(*index, *new)
                    .map_err(|_| ShoveError::Inconsistent(*index))?;
            }
        }

        let mut changed = vec![];

        for (index, displacement) in moves {
            if let Displacement::Trace { new, .. } = displacement {
                if self.board.replace_polyline(index, new) {
                    changed.push(index);
                }
            }
        }

        for index in changed {
            let Some(layer) = self.board.trace(index).map(|trace| trace.layer()) else {
                continue;
            };

            let clip = self.board.changed_area().map(|area| area.area(layer));
            self.board.normalize(index, clip.as_ref());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        board::{item::ObstacleArea, Board},
        geometry::{IntBox, Point},
        rules::BoardRules,
    };

    fn p(x: i64, y: i64) -> IntPoint {
        IntPoint::new(x, y)
    }

    fn board() -> Board {
        Board::new(BoardRules::new(1, 100), IntBox::new(-10_000, -10_000, 10_000, 10_000))
    }

    fn foreign_trace(board: &mut Board, fixed_state: FixedState) -> ItemIndex {
        board
            .insert_trace_through(&[p(-2000, 0), p(2000, 0)], 0, 50, vec![2], 1, fixed_state)
            .unwrap()
    }

    fn crossing() -> Polyline {
        Polyline::from_corners(&[p(0, -300), p(0, 300)])
    }

    #[test]
    fn crossing_trace_is_shoved_around() {
        let mut board = board();
        let foreign = foreign_trace(&mut board, FixedState::Unfixed);

        let mut shove = Shove::new(&mut board, &OptimizerSettings::default());
        let inserted = shove.insert_trace(crossing(), 0, 50, vec![1], 1).unwrap();

        let trace = board.trace(foreign).unwrap();
        assert_eq!(trace.first_corner(), Point::Int(p(-2000, 0)));
        assert_eq!(trace.last_corner(), Point::Int(p(2000, 0)));
        assert!(trace.corner_count() > 2);
        // Pushed away from the start of the inserted segment.
        assert!(trace
            .polyline()
            .corners()
            .iter()
            .all(|corner| corner.to_float().y() >= 0.0));

        assert!(board.clearance_violations(inserted).is_empty());
        assert!(board.clearance_violations(foreign).is_empty());
        assert!(board.search_tree().is_consistent());
    }

    #[test]
    fn check_leaves_the_board_alone() {
        let mut board = board();
        let foreign = foreign_trace(&mut board, FixedState::Unfixed);
        let generation = board.generation();

        let mut shove = Shove::new(&mut board, &OptimizerSettings::default());
        assert!(shove.check_trace(&crossing(), 0, 50, &[1], 1));

        assert_eq!(board.generation(), generation);
        assert_eq!(board.trace(foreign).unwrap().corner_count(), 2);
    }

    #[test]
    fn fixed_trace_blocks_and_is_recorded() {
        let mut board = board();
        let foreign = foreign_trace(&mut board, FixedState::ShoveFixed);
        let item_count = board.item_count();

        let mut shove = Shove::new(&mut board, &OptimizerSettings::default());
        let err = shove.insert_trace(crossing(), 0, 50, vec![1], 1).unwrap_err();

        assert_eq!(err, ShoveError::Blocked { item: foreign, layer: 0 });
        assert_eq!(board.shove_failing_obstacle(), Some(foreign));
        assert_eq!(board.shove_failing_layer(), Some(0));
        assert_eq!(board.item_count(), item_count);
    }

    #[test]
    fn exhausted_budget_fails() {
        let mut board = board();
        let foreign = foreign_trace(&mut board, FixedState::Unfixed);

        let settings = OptimizerSettings {
            max_shove_recursion_depth: 0,
            ..OptimizerSettings::default()
        };
        let mut shove = Shove::new(&mut board, &settings);
        let err = shove.insert_trace(crossing(), 0, 50, vec![1], 1).unwrap_err();

        assert_eq!(err, ShoveError::BudgetExhausted { item: foreign, layer: 0 });
        assert_eq!(board.trace(foreign).unwrap().corner_count(), 2);
    }

    #[test]
    fn obstacle_area_can_not_be_shoved() {
        let mut board = board();
        let area = board.add_item(Item::ObstacleArea(ObstacleArea::new(
            vec![p(-200, -200), p(200, -200), p(200, 200), p(-200, 200)],
            0,
            vec![],
            1,
        )));

        let shape = crossing().offset_shape(50.0, 0).unwrap();
        let mut shove = Shove::new(&mut board, &OptimizerSettings::default());
        assert!(!shove.check(&shape, None, 0, &[1], 1));
        assert_eq!(board.shove_failing_obstacle(), Some(area));
    }

    #[test]
    fn via_is_moved_out_of_the_way() {
        let mut board = board();
        let via = board.add_item(Item::Via(Via::new(
            p(0, 120),
            0,
            0,
            100,
            vec![2],
            1,
            FixedState::Unfixed,
        )));

        let polyline = Polyline::from_corners(&[p(-1000, 0), p(1000, 0)]);
        let mut shove = Shove::new(&mut board, &OptimizerSettings::default());
        let inserted = shove.insert_trace(polyline.clone(), 0, 50, vec![1], 1).unwrap();

        let Some(Item::Via(moved)) = board.item(via) else {
            panic!("via is gone");
        };
        assert_eq!(moved.center().x, 0);
        assert!(moved.center().y > 250);
        assert!(board.clearance_violations(inserted).is_empty());

        let mut board = self::board();
        board.add_item(Item::Via(Via::new(p(0, 120), 0, 0, 100, vec![2], 1, FixedState::Unfixed)));
        let settings = OptimizerSettings {
            max_via_recursion_depth: 0,
            ..OptimizerSettings::default()
        };
        let mut shove = Shove::new(&mut board, &settings);
        assert!(!shove.check_trace(&polyline, 0, 50, &[1], 1));
    }

    #[test]
    fn time_limit_counts_from_each_call() {
        let mut board = board();
        let settings = OptimizerSettings {
            time_limit_ms: 50,
            ..OptimizerSettings::default()
        };
        let mut shove = Shove::new(&mut board, &settings);

        std::thread::sleep(std::time::Duration::from_millis(100));
        assert!(shove.check_trace(&crossing(), 0, 50, &[1], 1));

        std::thread::sleep(std::time::Duration::from_millis(100));
        let inserted = shove.insert_trace(crossing(), 0, 50, vec![1], 1);
        assert!(inserted.is_ok());
    }

    #[test]
    fn shoving_a_shape_marks_the_changed_area() {
        let mut board = board();
        let foreign = foreign_trace(&mut board, FixedState::Unfixed);
        board.stop_marking_changed_area();
        assert!(board.changed_area().is_none());

        let shape = crossing().offset_shape(50.0, 0).unwrap();
        let from_side = Some(FromSide::of_segment(&crossing(), 0));
        let mut shove = Shove::new(&mut board, &OptimizerSettings::default());
        assert!(shove.insert(&shape, from_side, 0, &[1], 1).is_ok());

        assert!(board.trace(foreign).unwrap().corner_count() > 2);
        let area = board.changed_area().unwrap();
        assert!(!area.is_empty(0));
    }
}
