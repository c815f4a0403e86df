use std::collections::{BTreeSet, HashMap};

use contracts::{debug_ensures, debug_invariant};
use rstar::{primitives::GeomWithData, RTree, RTreeObject, AABB};

use crate::{
    board::item::{AccessItem, Item, ItemIndex, PolylineTrace},
    geometry::{AccessTileShape, IntBox, IntOctagon, ShapeVariant, TileShape},
    rules::ClearanceMatrix,
    search_tree::room::{IncompleteRoom, RoomShape},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox {
    pub aabb: AABB<[f64; 3]>,
}

impl Bbox {
    pub fn new(aabb: AABB<[f64; 3]>) -> Bbox {
        Self { aabb }
    }
}

impl RTreeObject for Bbox {
    type Envelope = AABB<[f64; 3]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub type LeafId = usize;
pub type BboxedLeaf = GeomWithData<Bbox, LeafId>;

/// One stored shape of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TreeEntry {
    pub item: ItemIndex,
    pub shape_index: usize,
}

#[derive(Debug, Clone)]
struct Leaf {
    entry: TreeEntry,
    layer: usize,
    clearance_class: usize,
    nets: Vec<usize>,
    shape: TileShape,
    bbox: Bbox,
}

/// Spatial index over the tile shapes of board items. The third axis of
/// the R-tree envelopes is the layer.
///
/// With clearance compensation, stored shapes are enlarged by the
/// compensation value of their item's class, so that a clearance check
/// reduces to a plain overlap test against a likewise enlarged query.
#[derive(Debug, Clone)]
pub struct ShapeSearchTree {
    variant: ShapeVariant,
    compensated_class: Option<usize>,
    rtree: RTree<BboxedLeaf>,
    leaves: HashMap<LeafId, Leaf>,
    item_leaves: HashMap<ItemIndex, Vec<LeafId>>,
    next_leaf: LeafId,
}

#[debug_invariant(self.rtree.size() == self.leaves.len())]
impl ShapeSearchTree {
    pub fn new(variant: ShapeVariant, compensated_class: Option<usize>) -> Self {
        Self {
            variant,
            compensated_class,
            rtree: RTree::new(),
            leaves: HashMap::new(),
            item_leaves: HashMap::new(),
            next_leaf: 0,
        }
    }

    pub fn variant(&self) -> ShapeVariant {
        self.variant
    }

    pub fn compensated_class(&self) -> Option<usize> {
        self.compensated_class
    }

    pub fn is_clearance_compensation_used(&self) -> bool {
        self.compensated_class.is_some()
    }

    pub fn size(&self) -> usize {
        self.rtree.size()
    }

    pub fn contains(&self, item: ItemIndex) -> bool {
        self.item_leaves.contains_key(&item)
    }

    pub fn entry_count(&self, item: ItemIndex) -> usize {
        self.item_leaves.get(&item).map_or(0, |leaves| leaves.len())
    }

    /// Enlargement of the stored shapes of `class` on `layer`.
    pub fn clearance_compensation_value(
        &self,
        matrix: &ClearanceMatrix,
        class: usize,
        layer: usize,
    ) -> i64 {
        let Some(compensated_class) = self.compensated_class else {
            return 0;
        };

        if class == 0 {
            return 0;
        }

        (matrix.value(class, compensated_class, layer)
            - matrix.compensation(compensated_class, layer))
        .max(0)
    }

    /// Half width a trace query shape has to use in this tree.
    pub fn trace_half_width(
        &self,
        matrix: &ClearanceMatrix,
        half_width: i64,
        class: usize,
        layer: usize,
    ) -> i64 {
        half_width + self.clearance_compensation_value(matrix, class, layer)
    }

    fn stored_shape(
        &self,
        matrix: &ClearanceMatrix,
        item: &impl AccessItem,
        shape_index: usize,
    ) -> Option<TileShape> {
        let layer = item.shape_layer(shape_index);
        let offset = self.clearance_compensation_value(matrix, item.clearance_class(), layer);
        let shape = if offset > 0 {
            item.offset_tile_shape(shape_index, offset as f64)
        } else {
            item.tile_shape(shape_index)
        }?;

        if shape.is_empty() {
            log::debug!("empty tree shape {} skipped", shape_index);
        }

        Some(shape.to_variant(self.variant))
    }

    fn add_leaf(
        &mut self,
        matrix: &ClearanceMatrix,
        entry: TreeEntry,
        item: &impl AccessItem,
    ) -> Option<LeafId> {
        let shape = self.stored_shape(matrix, item, entry.shape_index)?;
        let layer = item.shape_layer(entry.shape_index);
        let bbox = Bbox::new(shape.envelope_3d(layer));
        let id = self.next_leaf;
        self.next_leaf += 1;

        self.rtree.insert(BboxedLeaf::new(bbox, id));
        self.leaves.insert(
            id,
            Leaf {
                entry,
                layer,
                clearance_class: item.clearance_class(),
                nets: item.nets().to_vec(),
                shape,
                bbox,
            },
        );
        Some(id)
    }

    fn remove_leaf(&mut self, id: LeafId) {
        if let Some(leaf) = self.leaves.remove(&id) {
            self.rtree.remove(&BboxedLeaf::new(leaf.bbox, id));
        }
    }

    pub fn insert(&mut self, matrix: &ClearanceMatrix, index: ItemIndex, item: &Item) {
        if self.contains(index) {
            log::warn!("item {:?} is in the search tree already", index);
            return;
        }

        let ids = (0..item.tile_shape_count())
            .filter_map(|shape_index| {
                self.add_leaf(
                    matrix,
                    TreeEntry {
                        item: index,
                        shape_index,
                    },
                    item,
                )
            })
            .collect();
        self.item_leaves.insert(index, ids);
    }

    #[debug_ensures(self.entry_count(index) == 0)]
    pub fn remove(&mut self, index: ItemIndex) {
        for id in self.item_leaves.remove(&index).unwrap_or_default() {
            self.remove_leaf(id);
        }
    }

    /// Relabels `head` and `tail` as the first and last shapes of `trace`
    /// and computes fresh leaves only for the shapes in between.
    fn rebuild(
        &mut self,
        matrix: &ClearanceMatrix,
        index: ItemIndex,
        trace: &PolylineTrace,
        head: Vec<LeafId>,
        tail: Vec<LeafId>,
    ) -> bool {
        let shape_count = trace.tile_shape_count();

        if head.len() + tail.len() > shape_count {
            log::debug!(
                "{} kept leaves do not fit into {} shapes",
                head.len() + tail.len(),
                shape_count
            );
            return false;
        }

        let middle_end = shape_count - tail.len();
        let mut ids = Vec::with_capacity(shape_count);

        for (shape_index, id) in head.into_iter().enumerate() {
            self.relabel(id, index, shape_index);
            ids.push(id);
        }

        for shape_index in ids.len()..middle_end {
            let entry = TreeEntry {
                item: index,
                shape_index,
            };

            if let Some(id) = self.add_leaf(matrix, entry, trace) {
                ids.push(id);
            }
        }

        for (offset, id) in tail.into_iter().enumerate() {
            self.relabel(id, index, middle_end + offset);
            ids.push(id);
        }

        self.item_leaves.insert(index, ids);
        true
    }

    fn relabel(&mut self, id: LeafId, index: ItemIndex, shape_index: usize) {
        if let Some(leaf) = self.leaves.get_mut(&id) {
            leaf.entry = TreeEntry {
                item: index,
                shape_index,
            };
        }
    }

    fn reinsert_trace(&mut self, matrix: &ClearanceMatrix, index: ItemIndex, trace: &PolylineTrace) {
        self.remove(index);
        self.insert(matrix, index, &Item::Trace(trace.clone()));
    }

    /// `from` has been joined in front of `to`, whose polyline is now
    /// `joined`. The leaves of `from` move over to `to`, except the one
    /// touching the joint. With `change_order`, `from` was joined
    /// reversed.
    pub fn merge_entries_in_front(
        &mut self,
        matrix: &ClearanceMatrix,
        from: ItemIndex,
        to: ItemIndex,
        joined: &PolylineTrace,
        change_order: bool,
    ) {
        let (Some(mut from_leaves), Some(to_leaves)) =
            (self.item_leaves.remove(&from), self.item_leaves.remove(&to))
        else {
            log::warn!("merge of {:?} into {:?} without tree entries", from, to);
            self.remove(from);
            self.reinsert_trace(matrix, to, joined);
            return;
        };

        if from_leaves.is_empty() || to_leaves.is_empty() {
            self.discard(from_leaves.into_iter().chain(to_leaves));
            self.reinsert_trace(matrix, to, joined);
            return;
        }

        let joint = if change_order {
            from_leaves.remove(0)
        } else {
            from_leaves.pop().unwrap_or_else(|| unreachable!())
        };

        if change_order {
            from_leaves.reverse();
        }

        self.remove_leaf(joint);
        self.remove_leaf(to_leaves[0]);

        if !self.rebuild(matrix, to, joined, from_leaves.clone(), to_leaves[1..].to_vec()) {
            self.discard(from_leaves.into_iter().chain(to_leaves[1..].iter().copied()));
            self.reinsert_trace(matrix, to, joined);
        }
    }

    /// `from` has been appended at the end of `to`, whose polyline is now
    /// `joined`.
    pub fn merge_entries_at_end(
        &mut self,
        matrix: &ClearanceMatrix,
        from: ItemIndex,
        to: ItemIndex,
        joined: &PolylineTrace,
        change_order: bool,
    ) {
        let (Some(mut from_leaves), Some(mut to_leaves)) =
            (self.item_leaves.remove(&from), self.item_leaves.remove(&to))
        else {
            log::warn!("merge of {:?} into {:?} without tree entries", from, to);
            self.remove(from);
            self.reinsert_trace(matrix, to, joined);
            return;
        };

        if from_leaves.is_empty() || to_leaves.is_empty() {
            self.discard(from_leaves.into_iter().chain(to_leaves));
            self.reinsert_trace(matrix, to, joined);
            return;
        }

        let joint = if change_order {
            from_leaves.pop().unwrap_or_else(|| unreachable!())
        } else {
            from_leaves.remove(0)
        };

        if change_order {
            from_leaves.reverse();
        }

        self.remove_leaf(joint);
        let to_joint = to_leaves.pop().unwrap_or_else(|| unreachable!());
        self.remove_leaf(to_joint);

        if !self.rebuild(matrix, to, joined, to_leaves.clone(), from_leaves.clone()) {
            self.discard(to_leaves.into_iter().chain(from_leaves));
            self.reinsert_trace(matrix, to, joined);
        }
    }

    /// Replaces the leaves of a trace whose polyline changed to the one of
    /// `trace`, keeping the first `keep_at_start` and the last
    /// `keep_at_end` leaves.
    pub fn change_entries(
        &mut self,
        matrix: &ClearanceMatrix,
        index: ItemIndex,
        trace: &PolylineTrace,
        keep_at_start: usize,
        keep_at_end: usize,
    ) {
        let old = self.item_leaves.remove(&index).unwrap_or_default();
        let new_count = trace.tile_shape_count();

        if keep_at_start + keep_at_end > old.len().min(new_count) {
            self.discard(old);
            self.reinsert_trace(matrix, index, trace);
            return;
        }

        let head = old[..keep_at_start].to_vec();
        let tail = old[old.len() - keep_at_end..].to_vec();
        self.discard(old[keep_at_start..old.len() - keep_at_end].iter().copied());

        if !self.rebuild(matrix, index, trace, head.clone(), tail.clone()) {
            self.discard(head.into_iter().chain(tail));
            self.reinsert_trace(matrix, index, trace);
        }
    }

    fn discard(&mut self, ids: impl IntoIterator<Item = LeafId>) {
        for id in ids {
            self.remove_leaf(id);
        }
    }

    fn query_envelope(shape: &TileShape, layer: Option<usize>, enlargement: f64) -> AABB<[f64; 3]> {
        let bbox = shape.bounding_box();
        let (from_layer, to_layer) = match layer {
            Some(layer) => (layer as f64, layer as f64),
            None => (0.0, f64::MAX),
        };
        AABB::from_corners(
            [
                bbox.ll.x as f64 - enlargement,
                bbox.ll.y as f64 - enlargement,
                from_layer,
            ],
            [
                bbox.ur.x as f64 + enlargement,
                bbox.ur.y as f64 + enlargement,
                to_layer,
            ],
        )
    }

    fn candidates<'a>(
        &'a self,
        envelope: &AABB<[f64; 3]>,
    ) -> impl Iterator<Item = &'a Leaf> + 'a {
        self.rtree
            .locate_in_envelope_intersecting(envelope)
            .filter_map(|wrapper| self.leaves.get(&wrapper.data))
    }

    /// Entries whose stored shape intersects `shape` on `layer`, or on any
    /// layer if `layer` is `None`. Sorted by item index and shape index.
    pub fn overlapping_entries(&self, shape: &TileShape, layer: Option<usize>) -> Vec<TreeEntry> {
        if shape.is_empty() {
            log::debug!("overlap query with an empty shape");
            return vec![];
        }

        let envelope = Self::query_envelope(shape, layer, 0.0);
        let mut entries: Vec<TreeEntry> = self
            .candidates(&envelope)
            .filter(|leaf| leaf.shape.intersects(shape))
            .map(|leaf| leaf.entry)
            .collect();
        entries.sort_unstable();
        entries.dedup();
        entries
    }

    pub fn overlapping_objects(&self, shape: &TileShape, layer: Option<usize>) -> BTreeSet<ItemIndex> {
        self.overlapping_entries(shape, layer)
            .into_iter()
            .map(|entry| entry.item)
            .collect()
    }

    /// Entries closer to `shape` than the clearance between their class
    /// and `clearance_class` requires. Items containing one of
    /// `ignore_nets` are skipped.
    pub fn overlapping_entries_with_clearance(
        &self,
        matrix: &ClearanceMatrix,
        shape: &TileShape,
        layer: Option<usize>,
        ignore_nets: &[usize],
        clearance_class: usize,
    ) -> Vec<TreeEntry> {
        if shape.is_empty() {
            log::debug!("clearance query with an empty shape");
            return vec![];
        }

        let max_clearance = match layer {
            Some(layer) => matrix.max_value(clearance_class, layer),
            None => (0..matrix.layer_count())
                .map(|layer| matrix.max_value(clearance_class, layer))
                .max()
                .unwrap_or(0),
        };
        let enlargement = if self.is_clearance_compensation_used() {
            0.0
        } else {
            max_clearance as f64
        };

        let envelope = Self::query_envelope(shape, layer, enlargement);
        let mut entries: Vec<TreeEntry> = self
            .candidates(&envelope)
            .filter(|leaf| !leaf.nets.iter().any(|net| ignore_nets.contains(net)))
            .filter(|leaf| {
                if self.is_clearance_compensation_used() {
                    return leaf.shape.intersects(shape);
                }

                let half = matrix.value(clearance_class, leaf.clearance_class, leaf.layer) / 2;

                if half == 0 {
                    leaf.shape.intersects(shape)
                } else {
                    let half = half as f64;
                    shape.enlarge(half).intersects(&leaf.shape.enlarge(half))
                }
            })
            .map(|leaf| leaf.entry)
            .collect();
        entries.sort_unstable();
        entries.dedup();
        entries
    }

    pub fn overlapping_objects_with_clearance(
        &self,
        matrix: &ClearanceMatrix,
        shape: &TileShape,
        layer: Option<usize>,
        ignore_nets: &[usize],
        clearance_class: usize,
        out: &mut BTreeSet<ItemIndex>,
    ) {
        out.extend(
            self.overlapping_entries_with_clearance(matrix, shape, layer, ignore_nets, clearance_class)
                .into_iter()
                .map(|entry| entry.item),
        );
    }

    /// Stored shape of an entry.
    pub fn entry_shape(&self, entry: TreeEntry) -> Option<&TileShape> {
        let ids = self.item_leaves.get(&entry.item)?;
        ids.iter()
            .filter_map(|id| self.leaves.get(id))
            .find(|leaf| leaf.entry.shape_index == entry.shape_index)
            .map(|leaf| &leaf.shape)
    }

    /// Restrains `room` against every entry on its layer for which
    /// `is_obstacle` holds, so that the resulting rooms overlap none of
    /// them. Rooms start from `bounding_box` if they carry no shape. Only
    /// box and octagon trees complete rooms.
    pub fn complete_shape(
        &self,
        room: &IncompleteRoom,
        bounding_box: &IntBox,
        is_obstacle: impl Fn(TreeEntry) -> bool,
    ) -> Vec<IncompleteRoom> {
        match self.variant {
            ShapeVariant::Box => self.complete::<IntBox>(room, bounding_box, is_obstacle),
            ShapeVariant::Octagon => self.complete::<IntOctagon>(room, bounding_box, is_obstacle),
            ShapeVariant::Exact => {
                log::warn!("rooms can not be completed in an exact shape tree");
                vec![]
            }
        }
    }

    fn complete<S: RoomShape>(
        &self,
        room: &IncompleteRoom,
        bounding_box: &IntBox,
        is_obstacle: impl Fn(TreeEntry) -> bool,
    ) -> Vec<IncompleteRoom> {
        let contained = S::from_tile(&room.contained_shape);
        let board_shape = S::from_tile(&TileShape::Box(*bounding_box));
        let start = room
            .shape
            .as_ref()
            .map_or(board_shape, |shape| S::from_tile(shape).intersection(&board_shape));

        let envelope = Self::query_envelope(&start.to_tile(), Some(room.layer), 0.0);
        let mut leaves: Vec<&Leaf> = self
            .candidates(&envelope)
            .filter(|leaf| leaf.layer == room.layer)
            .collect();
        leaves.sort_unstable_by_key(|leaf| leaf.entry);

        let mut rooms = vec![(start, contained)];
        let mut bounds = start;

        for leaf in leaves {
            let obstacle = S::from_tile(&leaf.shape);

            if !bounds.overlaps_inside(&obstacle) || !is_obstacle(leaf.entry) {
                continue;
            }

            let mut restrained = Vec::with_capacity(rooms.len());
            bounds = S::EMPTY;

            for (shape, contained) in rooms {
                if shape.overlaps_inside(&obstacle) {
                    restrained.extend(S::restrain(&shape, &contained, &obstacle));
                } else {
                    restrained.push((shape, contained));
                }
            }

            for (shape, _) in &restrained {
                bounds = bounds.union(shape);
            }

            rooms = restrained;
        }

        rooms
            .into_iter()
            .filter(|(shape, contained)| !(S::drops_degenerate_rooms() && contained.contains_shape(shape)))
            .map(|(shape, contained)| IncompleteRoom {
                shape: Some(shape.to_tile()),
                layer: room.layer,
                contained_shape: contained.to_tile(),
            })
            .collect()
    }

    /// Leaves of every item carry consecutive shape indices starting at 0.
    pub fn is_consistent(&self) -> bool {
        self.item_leaves.iter().all(|(item, ids)| {
            ids.iter().enumerate().all(|(shape_index, id)| {
                self.leaves.get(id).is_some_and(|leaf| {
                    leaf.entry
                        == TreeEntry {
                            item: *item,
                            shape_index,
                        }
                })
            })
        })
    }
}
