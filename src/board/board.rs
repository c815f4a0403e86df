use std::collections::BTreeSet;

use contracts::debug_ensures;
use petgraph::stable_graph::StableUnGraph;
use thiserror::Error;

use crate::{
    board::{
        changed_area::ChangedArea,
        description::DescriptionError,
        item::{AccessItem, Item, ItemIndex, PolylineTrace},
    },
    geometry::{AccessTileShape, IntBox, IntPoint, Point, Polyline, ShapeVariant, TileShape},
    rules::BoardRules,
    search_tree::{IncompleteRoom, SearchTreeManager, ShapeSearchTree},
};

#[derive(Error, Debug)]
pub enum BoardError {
    #[error("item {0:?} is not on the board")]
    ItemNotFound(ItemIndex),
    #[error("item {0:?} is not a trace")]
    NotATrace(ItemIndex),
    #[error("layer {0} is out of range")]
    LayerOutOfRange(usize),
    #[error("board was modified, generation {0} is stale")]
    Modified(u64),
    #[error(transparent)]
    Description(#[from] DescriptionError),
}

/// Items of a printed circuit board together with their rules and search
/// trees.
///
/// Items live in a stable graph so that their indices survive removals of
/// other items. Every mutation bumps the generation, which scans over the
/// board compare against to notice concurrent modification.
#[derive(Debug, Clone)]
pub struct Board {
    pub(super) graph: StableUnGraph<Item, (), usize>,
    pub(super) rules: BoardRules,
    pub(super) search_trees: SearchTreeManager,
    changed_area: Option<ChangedArea>,
    bounding_box: IntBox,
    pub(super) generation: u64,
    max_trace_half_width: i64,
    shove_failing_obstacle: Option<ItemIndex>,
    shove_failing_layer: Option<usize>,
}

impl Board {
    pub fn new(rules: BoardRules, bounding_box: IntBox) -> Self {
        Self {
            graph: StableUnGraph::default(),
            rules,
            search_trees: SearchTreeManager::new(),
            changed_area: None,
            bounding_box,
            generation: 0,
            max_trace_half_width: 0,
            shove_failing_obstacle: None,
            shove_failing_layer: None,
        }
    }

    pub fn rules(&self) -> &BoardRules {
        &self.rules
    }

    /// Replaces the rules and rebuilds all search trees.
    pub fn set_rules(&mut self, rules: BoardRules) {
        self.rules = rules;
        let compensated = self.search_trees.is_clearance_compensation_used();
        let autoroute_trees = self.search_trees.autoroute_tree_kinds();
        self.search_trees = SearchTreeManager::new();

        let indices: Vec<ItemIndex> = self.graph.node_indices().collect();

        for index in indices {
            self.search_trees
                .insert(self.rules.clearance_matrix(), index, &self.graph[index]);
        }

        if compensated {
            self.set_clearance_compensation_used(true);
        }

        for (variant, compensated_class) in autoroute_trees {
            self.add_autoroute_tree(variant, compensated_class);
        }

        self.generation += 1;
    }

    pub fn layer_count(&self) -> usize {
        self.rules.layer_count()
    }

    pub fn bounding_box(&self) -> IntBox {
        self.bounding_box
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Fails if the board changed after `generation` was read.
    pub fn check_generation(&self, generation: u64) -> Result<(), BoardError> {
        if generation == self.generation {
            Ok(())
        } else {
            Err(BoardError::Modified(generation))
        }
    }

    pub fn search_tree(&self) -> &ShapeSearchTree {
        self.search_trees.default_tree()
    }

    pub fn search_tree_manager(&self) -> &SearchTreeManager {
        &self.search_trees
    }

    /// Adds a box or octagon tree over all items, kept in sync with the
    /// default tree from now on.
    pub fn add_autoroute_tree(&mut self, variant: ShapeVariant, compensated_class: Option<usize>) {
        let matrix = self.rules.clearance_matrix();
        let items = self
            .graph
            .node_indices()
            .map(|index| (index, &self.graph[index]));
        self.search_trees
            .add_autoroute_tree(matrix, variant, compensated_class, items);
    }

    pub fn autoroute_tree(
        &self,
        variant: ShapeVariant,
        compensated_class: Option<usize>,
    ) -> Option<&ShapeSearchTree> {
        self.search_trees.autoroute_tree(variant, compensated_class)
    }

    pub fn clear_autoroute_trees(&mut self) {
        self.search_trees.clear_autoroute_trees();
    }

    /// Completes `room` in the autoroute tree of the given kind against
    /// every item a trace of `net` may not overlap, except `ignore`.
    pub fn complete_room(
        &self,
        variant: ShapeVariant,
        compensated_class: Option<usize>,
        room: &IncompleteRoom,
        net: usize,
        ignore: Option<ItemIndex>,
    ) -> Vec<IncompleteRoom> {
        let Some(tree) = self.autoroute_tree(variant, compensated_class) else {
            log::warn!("no {:?} tree to complete rooms in", variant);
            return vec![];
        };

        tree.complete_shape(room, &self.bounding_box, |entry| {
            Some(entry.item) != ignore
                && self
                    .item(entry.item)
                    .is_some_and(|item| item.is_trace_obstacle(&[net]))
        })
    }

    pub fn is_clearance_compensation_used(&self) -> bool {
        self.search_trees.is_clearance_compensation_used()
    }

    pub fn set_clearance_compensation_used(&mut self, value: bool) -> bool {
        let matrix = self.rules.clearance_matrix();
        let items = self
            .graph
            .node_indices()
            .map(|index| (index, &self.graph[index]));
        self.search_trees
            .set_clearance_compensation_used(matrix, value, items)
    }

    pub fn item(&self, index: ItemIndex) -> Option<&Item> {
        self.graph.node_weight(index)
    }

    pub fn trace(&self, index: ItemIndex) -> Option<&PolylineTrace> {
        self.item(index).and_then(|item| item.as_trace())
    }

    pub fn try_trace(&self, index: ItemIndex) -> Result<&PolylineTrace, BoardError> {
        match self.item(index) {
            Some(Item::Trace(trace)) => Ok(trace),
            Some(..) => Err(BoardError::NotATrace(index)),
            None => Err(BoardError::ItemNotFound(index)),
        }
    }

    pub fn contains(&self, index: ItemIndex) -> bool {
        self.graph.contains_node(index)
    }

    pub fn item_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Indices of all items in ascending order.
    pub fn item_indices(&self) -> Vec<ItemIndex> {
        let mut indices: Vec<ItemIndex> = self.graph.node_indices().collect();
        indices.sort_unstable();
        indices
    }

    pub fn items(&self) -> impl Iterator<Item = (ItemIndex, &Item)> + '_ {
        self.item_indices()
            .into_iter()
            .map(|index| (index, &self.graph[index]))
    }

    /// Trace indices in ascending order.
    pub fn trace_indices(&self) -> Vec<ItemIndex> {
        self.item_indices()
            .into_iter()
            .filter(|&index| self.trace(index).is_some())
            .collect()
    }

    pub fn traces_of_net(&self, net: usize) -> Vec<ItemIndex> {
        self.trace_indices()
            .into_iter()
            .filter(|&index| self.graph[index].contains_net(net))
            .collect()
    }

    pub fn max_trace_half_width(&self) -> i64 {
        self.max_trace_half_width
    }

    #[debug_ensures(self.graph.node_count() == old(self.graph.node_count() + 1))]
    pub fn add_item(&mut self, item: Item) -> ItemIndex {
        if let Item::Trace(ref trace) = item {
            self.max_trace_half_width = self.max_trace_half_width.max(trace.half_width());
        }

        self.join_changed_area_with_item(&item);
        let index = self.graph.add_node(item);
        self.search_trees
            .insert(self.rules.clearance_matrix(), index, &self.graph[index]);
        self.generation += 1;
        index
    }

    pub fn remove_item(&mut self, index: ItemIndex) -> Option<Item> {
        let item = self.graph.remove_node(index)?;
        self.search_trees.remove(index);
        self.join_changed_area_with_item(&item);
        self.generation += 1;
        Some(item)
    }

    /// Moves a via or pin to a new center.
    pub fn move_drill_item(&mut self, index: ItemIndex, center: IntPoint) -> Result<(), BoardError> {
        let old = self
            .graph
            .node_weight(index)
            .cloned()
            .ok_or(BoardError::ItemNotFound(index))?;
        let mut item = old.clone();

        match item {
            Item::Via(ref mut via) => via.set_center(center),
            Item::Pin(ref mut pin) => pin.set_center(center),
            _ => {
                log::warn!("{} {:?} can not be moved", item.kind_name(), index);
                return Ok(());
            }
        }

        self.search_trees.remove(index);
        self.join_changed_area_with_item(&old);
        self.join_changed_area_with_item(&item);
        self.graph[index] = item;
        self.search_trees
            .insert(self.rules.clearance_matrix(), index, &self.graph[index]);
        self.generation += 1;
        Ok(())
    }

    pub fn changed_area(&self) -> Option<&ChangedArea> {
        self.changed_area.as_ref()
    }

    pub fn changed_area_mut(&mut self) -> Option<&mut ChangedArea> {
        self.changed_area.as_mut()
    }

    pub fn start_marking_changed_area(&mut self) {
        if self.changed_area.is_none() {
            self.changed_area = Some(ChangedArea::new(self.layer_count()));
        }
    }

    pub fn stop_marking_changed_area(&mut self) -> Option<ChangedArea> {
        self.changed_area.take()
    }

    pub fn join_changed_area(&mut self, p: &Point, layer: usize) {
        if let Some(area) = self.changed_area.as_mut() {
            area.join(p.to_float(), layer);
        }
    }

    /// Marks the whole board as changed on every layer.
    pub fn mark_all_changed_area(&mut self) {
        self.start_marking_changed_area();
        let bbox = self.bounding_box;

        for layer in 0..self.layer_count() {
            for corner in [bbox.ll, bbox.ur] {
                self.join_changed_area(&Point::Int(corner), layer);
            }
        }
    }

    pub(crate) fn join_changed_area_with_item(&mut self, item: &Item) {
        let Some(area) = self.changed_area.as_mut() else {
            return;
        };

        for index in 0..item.tile_shape_count() {
            if let Some(shape) = item.tile_shape(index) {
                area.join_shape(&shape, item.shape_layer(index));
            }
        }
    }

    pub fn shove_failing_obstacle(&self) -> Option<ItemIndex> {
        self.shove_failing_obstacle
    }

    pub fn shove_failing_layer(&self) -> Option<usize> {
        self.shove_failing_layer
    }

    pub fn set_shove_failing_obstacle(&mut self, obstacle: Option<ItemIndex>, layer: Option<usize>) {
        self.shove_failing_obstacle = obstacle;
        self.shove_failing_layer = layer;
    }

    /// Half width a trace query shape of `class` has to use on `layer`.
    pub fn compensated_half_width(&self, half_width: i64, class: usize, layer: usize) -> i64 {
        self.search_tree()
            .trace_half_width(self.rules.clearance_matrix(), half_width, class, layer)
    }

    /// Items whose shape contains `point` on `layer` (on any layer for
    /// `None`).
    pub fn pick_items(&self, point: impl Into<Point>, layer: Option<usize>) -> BTreeSet<ItemIndex> {
        let point = point.into();
        let query = TileShape::Box(IntBox::around(point.round())).enlarge(1.0);
        self.search_tree()
            .overlapping_objects(&query, layer)
            .into_iter()
            .filter(|&index| {
                let item = &self.graph[index];
                (0..item.tile_shape_count()).any(|shape_index| {
                    layer.map_or(true, |layer| item.shape_layer(shape_index) == layer)
                        && item
                            .tile_shape(shape_index)
                            .is_some_and(|shape| shape.contains(&point))
                })
            })
            .collect()
    }

    /// True if a trace shape of the given nets and class can be placed
    /// without violating clearance. `ignore` are items the trace is allowed
    /// to touch, usually the pins at its ends.
    pub fn check_trace_shape(
        &self,
        shape: &TileShape,
        layer: usize,
        nets: &[usize],
        clearance_class: usize,
        ignore: &BTreeSet<ItemIndex>,
    ) -> bool {
        if !shape.is_contained_in(&self.bounding_box) {
            return false;
        }

        self.search_tree()
            .overlapping_entries_with_clearance(
                self.rules.clearance_matrix(),
                shape,
                Some(layer),
                &[],
                clearance_class,
            )
            .into_iter()
            .filter(|entry| !ignore.contains(&entry.item))
            .all(|entry| !self.graph[entry.item].is_trace_obstacle(nets))
    }

    /// Clearance check of every segment of a polyline used as a trace.
    #[allow(clippy::too_many_arguments)]
    pub fn check_polyline_trace(
        &self,
        polyline: &Polyline,
        layer: usize,
        half_width: i64,
        nets: &[usize],
        clearance_class: usize,
        ignore: &BTreeSet<ItemIndex>,
    ) -> bool {
        if polyline.is_empty() {
            return false;
        }

        let half_width = self.compensated_half_width(half_width, clearance_class, layer) as f64;

        (0..polyline.segment_count()).all(|index| {
            polyline
                .offset_shape(half_width, index)
                .is_some_and(|shape| self.check_trace_shape(&shape, layer, nets, clearance_class, ignore))
        })
    }

    /// Shape `shape_index` of `item` as the search tree stores it, that is
    /// enlarged by the clearance compensation if that is used.
    pub fn tree_shape(&self, item: &Item, shape_index: usize) -> Option<TileShape> {
        let offset = self.search_tree().clearance_compensation_value(
            self.rules.clearance_matrix(),
            item.clearance_class(),
            item.shape_layer(shape_index),
        );

        if offset > 0 {
            item.offset_tile_shape(shape_index, offset as f64)
        } else {
            item.tile_shape(shape_index)
        }
    }

    /// Items that violate the clearance to the item at `index`.
    pub fn clearance_violations(&self, index: ItemIndex) -> BTreeSet<ItemIndex> {
        let Some(item) = self.item(index) else {
            return BTreeSet::new();
        };

        let mut violations = BTreeSet::new();

        for shape_index in 0..item.tile_shape_count() {
            let Some(shape) = item.tile_shape(shape_index) else {
                continue;
            };

            let layer = item.shape_layer(shape_index);
            let shape = self.tree_shape(item, shape_index).unwrap_or(shape);

            for entry in self.search_tree().overlapping_entries_with_clearance(
                self.rules.clearance_matrix(),
                &shape,
                Some(layer),
                &[],
                item.clearance_class(),
            ) {
                if entry.item == index {
                    continue;
                }

                let other = &self.graph[entry.item];

                if item.is_obstacle(other) && other.is_obstacle(item) {
                    violations.insert(entry.item);
                }
            }
        }

        violations
    }

    /// Same-net items connected at `point` on `layer`: traces ending there,
    /// drill items centered there and conduction areas containing it.
    pub fn normal_contacts_at(
        &self,
        point: &Point,
        layer: usize,
        nets: &[usize],
        exclude: Option<ItemIndex>,
        ignore_areas: bool,
    ) -> BTreeSet<ItemIndex> {
        let query = TileShape::Box(IntBox::around(point.round())).enlarge(1.0);

        self.search_tree()
            .overlapping_objects(&query, Some(layer))
            .into_iter()
            .filter(|&index| Some(index) != exclude)
            .filter(|&index| {
                let item = &self.graph[index];

                if !item.shares_net(nets) {
                    return false;
                }

                match item {
                    Item::Trace(trace) => {
                        trace.layer() == layer
                            && (trace.first_corner() == *point || trace.last_corner() == *point)
                    }
                    Item::Via(..) | Item::Pin(..) => {
                        item.is_on_layer(layer)
                            && item
                                .drill_center()
                                .is_some_and(|center| *point == center)
                    }
                    Item::ConductionArea(area) => {
                        !ignore_areas && area.layer() == layer && area.contains(point)
                    }
                    _ => false,
                }
            })
            .collect()
    }

    pub fn start_contacts(&self, index: ItemIndex) -> BTreeSet<ItemIndex> {
        self.end_contacts_at(index, true, false)
    }

    pub fn end_contacts(&self, index: ItemIndex) -> BTreeSet<ItemIndex> {
        self.end_contacts_at(index, false, false)
    }

    pub(crate) fn end_contacts_at(
        &self,
        index: ItemIndex,
        at_start: bool,
        ignore_areas: bool,
    ) -> BTreeSet<ItemIndex> {
        let Some(trace) = self.trace(index) else {
            return BTreeSet::new();
        };

        let corner = if at_start {
            trace.first_corner()
        } else {
            trace.last_corner()
        };

        self.normal_contacts_at(&corner, trace.layer(), trace.nets(), Some(index), ignore_areas)
    }

    /// Same-net pins whose pad contains an end corner of the trace.
    pub fn touching_pins_at_end_corners(&self, index: ItemIndex) -> BTreeSet<ItemIndex> {
        let Some(trace) = self.trace(index) else {
            return BTreeSet::new();
        };

        [trace.first_corner(), trace.last_corner()]
            .iter()
            .flat_map(|corner| self.pick_items(*corner, Some(trace.layer())))
            .filter(|&pin| {
                let item = &self.graph[pin];
                matches!(item, Item::Pin(..)) && item.shares_net(trace.nets())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::item::{FixedState, Via};

    fn board() -> Board {
        Board::new(BoardRules::new(2, 100), IntBox::new(-10_000, -10_000, 10_000, 10_000))
    }

    #[test]
    fn removal_marks_changed_area_and_generation() {
        let mut board = board();
        let via = board.add_item(Item::Via(Via::new(
            IntPoint::new(0, 0),
            0,
            1,
            100,
            vec![1],
            1,
            FixedState::Unfixed,
        )));
        assert_eq!(board.search_tree().entry_count(via), 2);

        board.start_marking_changed_area();
        let generation = board.generation();
        assert!(board.remove_item(via).is_some());
        assert!(matches!(
            board.check_generation(generation),
            Err(BoardError::Modified(g)) if g == generation
        ));
        assert_eq!(board.search_tree().entry_count(via), 0);

        let area = board.changed_area().unwrap();
        assert!(!area.is_empty(0));
        assert!(!area.is_empty(1));
    }

    #[test]
    fn trace_shape_must_stay_on_board() {
        let board = board();
        let outside = TileShape::Box(IntBox::new(9_000, 0, 11_000, 100));
        assert!(!board.check_trace_shape(&outside, 0, &[1], 1, &BTreeSet::new()));
        let inside = TileShape::Box(IntBox::new(0, 0, 100, 100));
        assert!(board.check_trace_shape(&inside, 0, &[1], 1, &BTreeSet::new()));
    }
}
