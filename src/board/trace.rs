//! Topology maintenance of polyline traces: splitting at crossings,
//! combining at unbranched joints and removing redundant cycles.

use std::collections::BTreeSet;

use crate::{
    board::{
        board::{Board, BoardError},
        item::{AccessItem, FixedState, Item, ItemIndex, PolylineTrace},
    },
    geometry::{AccessTileShape, IntBox, IntOctagon, IntPoint, Line, Point, Polyline, Side},
};

const MAX_NORMALIZATION_DEPTH: usize = 16;

/// True if `p` lies on the segment of body line `line_no`, end corners
/// included.
fn segment_contains(polyline: &Polyline, line_no: usize, p: &Point) -> bool {
    if polyline.line(line_no).side_of(p) != Side::Collinear {
        return false;
    }

    let a = polyline.corner_approx(line_no - 1);
    let b = polyline.corner_approx(line_no);
    let p = p.to_float();
    let (vx, vy) = (b.x() - a.x(), b.y() - a.y());
    let length_square = vx * vx + vy * vy;

    if length_square == 0.0 {
        return (p.x() - a.x()).abs() < 1e-6 && (p.y() - a.y()).abs() < 1e-6;
    }

    let t = ((p.x() - a.x()) * vx + (p.y() - a.y()) * vy) / length_square;
    (-1e-9..=1.0 + 1e-9).contains(&t)
}

/// Lines cutting the segment `target_no` of `target` where the segment
/// `cutter_no` of `cutter` meets it.
fn crossing_lines(target: &Polyline, target_no: usize, cutter: &Polyline, cutter_no: usize) -> Vec<Line> {
    let target_line = target.line(target_no);
    let cutter_line = cutter.line(cutter_no);

    if target_line.is_parallel(&cutter_line) {
        if !target_line.is_equal_or_opposite(&cutter_line) {
            return vec![];
        }

        return [(cutter_no - 1, cutter_no - 1), (cutter_no + 1, cutter_no)]
            .into_iter()
            .filter(|&(_, corner_no)| segment_contains(target, target_no, &cutter.corner(corner_no)))
            .map(|(line_no, _)| cutter.line(line_no))
            .collect();
    }

    match target_line.intersection(&cutter_line) {
        Some(p)
            if segment_contains(target, target_no, &p) && segment_contains(cutter, cutter_no, &p) =>
        {
            vec![cutter_line]
        }
        _ => vec![],
    }
}

impl Board {
    /// Inserts a trace without splitting or combining it. Degenerate
    /// polylines and closed traces below user fixed are rejected.
    pub fn insert_trace_without_cleaning(
        &mut self,
        polyline: Polyline,
        layer: usize,
        half_width: i64,
        nets: Vec<usize>,
        clearance_class: usize,
        fixed_state: FixedState,
    ) -> Option<ItemIndex> {
        if polyline.corner_count() < 2 {
            log::debug!("trace with {} corners not inserted", polyline.corner_count());
            return None;
        }

        if polyline.first_corner() == polyline.last_corner() && fixed_state < FixedState::UserFixed {
            log::debug!("closed trace at {:?} not inserted", polyline.first_corner());
            return None;
        }

        let trace = PolylineTrace::new(polyline, layer, half_width, nets, clearance_class, fixed_state);
        Some(self.add_item(Item::Trace(trace)))
    }

    /// Inserts a trace and normalizes it within the changed area. Returns
    /// the index of the inserted trace if it is still on the board
    /// afterwards.
    pub fn insert_trace(
        &mut self,
        polyline: Polyline,
        layer: usize,
        half_width: i64,
        nets: Vec<usize>,
        clearance_class: usize,
        fixed_state: FixedState,
    ) -> Option<ItemIndex> {
        let index = self.insert_trace_without_cleaning(
            polyline,
            layer,
            half_width,
            nets,
            clearance_class,
            fixed_state,
        )?;
        let clip = self.changed_area().map(|area| area.area(layer));
        self.normalize(index, clip.as_ref());
        self.contains(index).then_some(index)
    }

    /// Inserts a trace through the given points.
    pub fn insert_trace_through(
        &mut self,
        corners: &[IntPoint],
        layer: usize,
        half_width: i64,
        nets: Vec<usize>,
        clearance_class: usize,
        fixed_state: FixedState,
    ) -> Option<ItemIndex> {
        if corners.iter().any(|&p| !self.bounding_box().contains_int(p)) {
            log::warn!("trace corner outside of the board");
        }

        self.insert_trace(
            Polyline::from_corners(corners),
            layer,
            half_width,
            nets,
            clearance_class,
            fixed_state,
        )
    }

    /// Replaces the trace by two pieces cut at `end_line` crossing its body
    /// line `line_no`.
    pub fn split_at(
        &mut self,
        index: ItemIndex,
        line_no: usize,
        end_line: &Line,
    ) -> Option<(ItemIndex, ItemIndex)> {
        let trace = self.trace(index)?.clone();
        let (first, second) = trace.polyline().split(line_no, end_line)?;

        if self.split_inside_drill_pad_prohibited(&trace, line_no, end_line) {
            return None;
        }

        self.remove_item(index);
        let first = self.add_item(Item::Trace(PolylineTrace::new(
            first,
            trace.layer(),
            trace.half_width(),
            trace.nets().to_vec(),
            trace.clearance_class(),
            trace.fixed_state(),
        )));
        let second = self.add_item(Item::Trace(PolylineTrace::new(
            second,
            trace.layer(),
            trace.half_width(),
            trace.nets().to_vec(),
            trace.clearance_class(),
            trace.fixed_state(),
        )));
        Some((first, second))
    }

    /// Splits the trace at `point` lying on one of its segments.
    pub fn split_at_point(&mut self, index: ItemIndex, point: IntPoint) -> Option<(ItemIndex, ItemIndex)> {
        self.split_at_point_along(index, &Point::Int(point), None)
    }

    /// Splits the trace at `point` with `cut`, a line through that point.
    /// Without a cut line the point has to be on the grid and the trace is
    /// cut perpendicular to the segment containing it.
    pub(crate) fn split_at_point_along(
        &mut self,
        index: ItemIndex,
        point: &Point,
        cut: Option<&Line>,
    ) -> Option<(ItemIndex, ItemIndex)> {
        let polyline = self.trace(index)?.polyline().clone();

        for line_no in 1..polyline.line_count().saturating_sub(1) {
            if !segment_contains(&polyline, line_no, point) {
                continue;
            }

            let line = polyline.line(line_no);
            let split_line = match (cut, point.as_int()) {
                (Some(cut), _) if !cut.is_parallel(&line) => *cut,
                (_, Some(p)) => line.perpendicular(p),
                _ => continue,
            };

            if let Some(pieces) = self.split_at(index, line_no, &split_line) {
                return Some(pieces);
            }
        }

        None
    }

    /// Splits the traces of `net` passing through `point` on `layer`.
    pub fn split_traces(&mut self, point: IntPoint, layer: usize, net: usize) -> bool {
        self.split_traces_along(&Point::Int(point), None, layer, net)
    }

    pub(crate) fn split_traces_along(
        &mut self,
        point: &Point,
        cut: Option<&Line>,
        layer: usize,
        net: usize,
    ) -> bool {
        let picked = self.pick_items(*point, Some(layer));
        let mut split = false;

        for index in picked {
            if self.trace(index).is_some_and(|trace| trace.contains_net(net)) {
                split |= self.split_at_point_along(index, point, cut).is_some();
            }
        }

        split
    }

    /// Splitting where another trace crosses inside the pad of a same-net
    /// pin is not allowed, except at the pin center or at the end of that
    /// other trace.
    fn split_inside_drill_pad_prohibited(
        &self,
        trace: &PolylineTrace,
        line_no: usize,
        end_line: &Line,
    ) -> bool {
        let Some(intersection) = trace.polyline().line(line_no).intersection(end_line) else {
            return false;
        };

        let mut pad_found = false;

        for index in self.pick_items(intersection, Some(trace.layer())) {
            let item = &self.graph[index];

            if !item.shares_net(trace.nets()) {
                continue;
            }

            match item {
                Item::Pin(pin) => {
                    if intersection == pin.center() {
                        return false;
                    }

                    pad_found = true;
                }
                Item::Trace(other) if other != trace => {
                    if other.first_corner() == intersection || other.last_corner() == intersection {
                        return false;
                    }
                }
                _ => (),
            }
        }

        pad_found
    }

    /// Splits the trace and the same-net traces crossing it, within `clip`
    /// if given. Drill items centered on a segment split it as well. Returns
    /// the pieces of the trace still on the board.
    pub fn split(&mut self, index: ItemIndex, clip: Option<&IntOctagon>) -> Vec<ItemIndex> {
        let Some(trace) = self.trace(index).cloned() else {
            return vec![];
        };

        let layer = trace.layer();
        let polyline = trace.polyline().clone();
        let ignore_areas = self.rules.ignore_cycles_with_areas(trace.nets());
        let mut result = vec![];
        let mut own_split = false;

        'segments: for i in 0..polyline.segment_count() {
            if let Some(clip) = clip {
                let bbox = IntBox::bounding_float([polyline.corner_approx(i), polyline.corner_approx(i + 1)]);

                if clip.intersection(&bbox.to_octagon()).is_empty() {
                    continue;
                }
            }

            let Some(shape) = trace.tile_shape(i) else {
                continue;
            };

            let mut entries = self.search_tree().overlapping_entries(&shape, Some(layer));
            let mut generation = self.generation();
            let mut k = 0;

            loop {
                if !self.contains(index) {
                    return result;
                }

                if let Err(BoardError::Modified(_)) = self.check_generation(generation) {
                    entries = self.search_tree().overlapping_entries(&shape, Some(layer));
                    generation = self.generation();
                    k = 0;
                }

                let Some(&entry) = entries.get(k) else {
                    break;
                };
                k += 1;

                if entry.item == index {
                    continue;
                }

                let Some(found) = self.item(entry.item).cloned() else {
                    continue;
                };

                if !found.shares_net(trace.nets()) {
                    continue;
                }

                match &found {
                    Item::Trace(found_trace) => {
                        let found_line_no = entry.shape_index + 1;
                        let found_lines = crossing_lines(found_trace.polyline(), found_line_no, &polyline, i + 1);

                        if found_lines.is_empty() {
                            continue;
                        }

                        let mut split_pieces = vec![];
                        let mut found_split = false;

                        for line in &found_lines {
                            if let Some((first, second)) = self.split_at(entry.item, found_line_no, line) {
                                found_split = true;
                                split_pieces.extend([first, second]);
                                break;
                            }
                        }

                        if !found_split {
                            split_pieces.push(entry.item);
                        }

                        for line in crossing_lines(&polyline, i + 1, found_trace.polyline(), found_line_no) {
                            if let Some((first, second)) = self.split_at(index, i + 1, &line) {
                                own_split = true;
                                result.extend(self.split(first, clip));
                                result.extend(self.split(second, clip));
                                break;
                            }
                        }

                        if found_split || own_split {
                            for piece in split_pieces.iter().chain(result.clone().iter()) {
                                self.remove_if_cycle(*piece);
                            }
                        }

                        if own_split {
                            break 'segments;
                        }
                    }
                    Item::Via(..) | Item::Pin(..) => {
                        let center = found.drill_center().unwrap_or_else(|| unreachable!());

                        if !segment_contains(&polyline, i + 1, &Point::Int(center)) {
                            continue;
                        }

                        let split_line = polyline.line(i + 1).perpendicular(center);

                        if let Some((first, second)) = self.split_at(index, i + 1, &split_line) {
                            own_split = true;
                            result.extend(self.split(first, clip));
                            result.extend(self.split(second, clip));
                            break 'segments;
                        }
                    }
                    Item::ConductionArea(..) if !trace.is_user_fixed() => {
                        if !ignore_areas
                            && self.start_contacts(index).contains(&entry.item)
                            && self.end_contacts(index).contains(&entry.item)
                        {
                            log::debug!("trace {:?} closes a cycle over a conduction area", index);
                            self.remove_item(index);
                            return vec![];
                        }
                    }
                    _ => (),
                }
            }
        }

        if !own_split {
            result.push(index);
        }

        result.retain(|&piece| self.contains(piece));
        result
    }

    fn is_combinable(this: &PolylineTrace, other: &PolylineTrace) -> bool {
        other.layer() == this.layer()
            && other.nets_equal(this)
            && other.half_width() == this.half_width()
            && other.clearance_class() == this.clearance_class()
            && other.fixed_state() == this.fixed_state()
    }

    /// The single trace continuing this one at its start or end, if any.
    fn combine_partner(&self, index: ItemIndex, at_start: bool) -> Option<(ItemIndex, bool)> {
        let this = self.trace(index)?;
        let corner = if at_start {
            this.first_corner()
        } else {
            this.last_corner()
        };

        let contacts: Vec<ItemIndex> = self
            .normal_contacts_at(&corner, this.layer(), this.nets(), Some(index), false)
            .into_iter()
            .filter(|&contact| !self.graph[contact].is_conduction_area())
            .collect();

        let [other_index] = contacts[..] else {
            return None;
        };

        let other = self.trace(other_index)?;

        if !Self::is_combinable(this, other) {
            return None;
        }

        // Whether the other trace has to be traversed backwards.
        let (straight_end, reversed_end) = if at_start {
            (other.last_corner(), other.first_corner())
        } else {
            (other.first_corner(), other.last_corner())
        };

        if corner == straight_end {
            Some((other_index, false))
        } else if corner == reversed_end {
            Some((other_index, true))
        } else {
            None
        }
    }

    fn oriented_lines(trace: &PolylineTrace, reverse: bool) -> Vec<Line> {
        if reverse {
            trace
                .polyline()
                .lines()
                .iter()
                .rev()
                .map(|line| line.opposite())
                .collect()
        } else {
            trace.polyline().lines().to_vec()
        }
    }

    fn combine_at(&mut self, index: ItemIndex, at_start: bool) -> bool {
        let Some((other_index, reverse)) = self.combine_partner(index, at_start) else {
            return false;
        };

        let this = self.graph[index]
            .as_trace()
            .cloned()
            .unwrap_or_else(|| unreachable!());
        let other = self.graph[other_index]
            .as_trace()
            .cloned()
            .unwrap_or_else(|| unreachable!());
        let joint = if at_start {
            this.first_corner()
        } else {
            this.last_corner()
        };

        let other_lines = Self::oriented_lines(&other, reverse);
        let this_lines = this.polyline().lines();

        let (front, back) = if at_start {
            (&other_lines[..], this_lines)
        } else {
            (this_lines, &other_lines[..])
        };

        let skip_line = front[front.len() - 2].is_equal_or_opposite(&back[1]);
        let kept_front = front.len() - 1 - usize::from(skip_line);
        let expected_line_count = front.len() + back.len() - 2 - usize::from(skip_line);
        let joined = Polyline::new(front[..kept_front].iter().chain(back[1..].iter()).copied());

        let mut joined_trace = this.clone();
        joined_trace.set_polyline(joined.clone());

        let matrix = self.rules.clearance_matrix();

        if joined.line_count() != expected_line_count {
            self.search_trees.remove(index);
            self.graph[index] = Item::Trace(joined_trace);
            self.search_trees.insert(matrix, index, &self.graph[index]);
        } else {
            if at_start {
                self.search_trees
                    .merge_entries_in_front(matrix, other_index, index, &joined_trace, reverse);
            } else {
                self.search_trees
                    .merge_entries_at_end(matrix, other_index, index, &joined_trace, reverse);
            }

            self.graph[index] = Item::Trace(joined_trace);
        }

        self.generation += 1;

        if joined.line_count() < 3 {
            self.remove_item(index);
        }

        self.remove_item(other_index);
        self.join_changed_area(&joint, this.layer());
        true
    }

    /// Absorbs the single same-kind trace continuing this one at its start
    /// into it.
    pub fn combine_at_start(&mut self, index: ItemIndex) -> bool {
        self.combine_at(index, true)
    }

    pub fn combine_at_end(&mut self, index: ItemIndex) -> bool {
        self.combine_at(index, false)
    }

    /// Combines at both ends until nothing is left to combine.
    pub fn combine(&mut self, index: ItemIndex) -> bool {
        let mut combined = false;

        while self.contains(index) && (self.combine_at_start(index) || self.combine_at_end(index)) {
            combined = true;
        }

        combined
    }

    /// Splits the trace at crossings and combines the pieces at unbranched
    /// joints. Returns true if anything changed.
    pub fn normalize(&mut self, index: ItemIndex, clip: Option<&IntOctagon>) -> bool {
        self.normalize_recursively(index, clip, 0)
    }

    fn normalize_recursively(&mut self, index: ItemIndex, clip: Option<&IntOctagon>, depth: usize) -> bool {
        if depth > MAX_NORMALIZATION_DEPTH {
            log::warn!("normalization of trace {:?} does not converge", index);
            return false;
        }

        if !self.contains(index) {
            return false;
        }

        let pieces = self.split(index, clip);
        let mut result = pieces.len() != 1;

        for piece in pieces {
            let Some(before) = self
                .trace(piece)
                .map(|trace| (trace.corner_count(), trace.first_corner(), trace.last_corner()))
            else {
                continue;
            };

            let combined = self.combine(piece);

            let Some(after) = self
                .trace(piece)
                .map(|trace| (trace.corner_count(), trace.first_corner(), trace.last_corner()))
            else {
                result = true;
                continue;
            };

            if after.0 == 2 && after.1 == after.2 {
                self.remove_item(piece);
                result = true;
            } else if combined {
                if after != before {
                    self.normalize_recursively(piece, clip, depth + 1);
                }

                result = true;
            }
        }

        result
    }

    /// Gives the trace a new polyline. Tree entries of the unchanged start
    /// and end are kept, and the trace is normalized afterwards.
    pub fn change(&mut self, index: ItemIndex, polyline: Polyline) -> bool {
        let Some(layer) = self.trace(index).map(|trace| trace.layer()) else {
            return false;
        };

        if !self.replace_polyline(index, polyline) {
            return false;
        }

        let clip = self.changed_area().map(|area| area.area(layer));
        self.normalize(index, clip.as_ref());
        true
    }

    /// Like [`Board::change`], but leaves splitting and combining to the
    /// caller.
    pub(crate) fn replace_polyline(&mut self, index: ItemIndex, polyline: Polyline) -> bool {
        let Some(old) = self.trace(index).cloned() else {
            return false;
        };

        if polyline.line_count() < 3 {
            log::debug!("trace {:?} can not change to a degenerate polyline", index);
            return false;
        }

        let old_lines = old.polyline().lines();
        let new_lines = polyline.lines();
        let common_len = old_lines.len().min(new_lines.len());

        let first_diff = (0..common_len)
            .find(|&i| old_lines[i] != new_lines[i])
            .unwrap_or(common_len);

        if first_diff == common_len && old_lines.len() == new_lines.len() {
            return false;
        }

        let common_suffix = (1..=common_len)
            .take_while(|&i| old_lines[old_lines.len() - i] == new_lines[new_lines.len() - i])
            .count();

        let keep_at_start = first_diff.saturating_sub(2);
        let keep_at_end = common_suffix.saturating_sub(2);

        let mut new_trace = old.clone();
        new_trace.set_polyline(polyline);

        for trace in [&old, &new_trace] {
            let polyline = trace.polyline();

            for corner in &polyline.corners()[keep_at_start.min(polyline.corner_count())..] {
                self.join_changed_area(corner, trace.layer());
            }
        }

        let matrix = self.rules.clearance_matrix();
        self.search_trees
            .change_entries(matrix, index, &new_trace, keep_at_start, keep_at_end);
        self.graph[index] = Item::Trace(new_trace);
        self.generation += 1;
        true
    }

    /// Items connected to `index` at their connection points.
    pub fn normal_contacts(&self, index: ItemIndex) -> BTreeSet<ItemIndex> {
        let Some(item) = self.item(index) else {
            return BTreeSet::new();
        };

        match item {
            Item::Trace(..) => {
                let mut contacts = self.start_contacts(index);
                contacts.extend(self.end_contacts(index));
                contacts
            }
            Item::Via(..) | Item::Pin(..) => {
                let center = Point::Int(item.drill_center().unwrap_or_else(|| unreachable!()));
                (0..item.tile_shape_count())
                    .map(|shape_index| item.shape_layer(shape_index))
                    .flat_map(|layer| self.normal_contacts_at(&center, layer, item.nets(), Some(index), false))
                    .collect()
            }
            Item::ConductionArea(area) => {
                let Some(bbox) = (0..area.tile_shape_count())
                    .filter_map(|i| area.tile_shape(i))
                    .map(|shape| shape.bounding_box())
                    .reduce(|a, b| a.union(&b))
                else {
                    return BTreeSet::new();
                };

                self.search_tree()
                    .overlapping_objects(&crate::geometry::TileShape::Box(bbox), Some(area.layer()))
                    .into_iter()
                    .filter(|&other| other != index)
                    .filter(|&other| {
                        let other_item = &self.graph[other];

                        if !other_item.shares_net(area.nets()) {
                            return false;
                        }

                        match other_item {
                            Item::Trace(trace) => {
                                trace.layer() == area.layer()
                                    && (area.contains(&trace.first_corner())
                                        || area.contains(&trace.last_corner()))
                            }
                            Item::Via(..) | Item::Pin(..) => {
                                other_item.is_on_layer(area.layer())
                                    && other_item
                                        .drill_center()
                                        .is_some_and(|center| area.contains(&Point::Int(center)))
                            }
                            _ => false,
                        }
                    })
                    .collect()
            }
            _ => BTreeSet::new(),
        }
    }

    /// True if the trace can be removed without disconnecting anything:
    /// it is closed, it overlaps another trace at both ends, or its end is
    /// reachable from its start through other items.
    pub fn is_cycle(&self, index: ItemIndex) -> bool {
        let Some(trace) = self.trace(index) else {
            return false;
        };

        if trace.is_closed() {
            return true;
        }

        let start_contacts = self.start_contacts(index);
        let end_contacts = self.end_contacts(index);

        if let Some(&shared) = start_contacts.intersection(&end_contacts).next() {
            // Stubs ending on a pin, via or area twice are allowed.
            return self.trace(shared).is_some();
        }

        let ignore_areas = self.rules.ignore_cycles_with_areas(trace.nets());
        let mut visited = start_contacts.clone();

        start_contacts
            .iter()
            .any(|&contact| self.is_cycle_recursively(&mut visited, contact, index, index, ignore_areas))
    }

    fn is_cycle_recursively(
        &self,
        visited: &mut BTreeSet<ItemIndex>,
        item: ItemIndex,
        search: ItemIndex,
        came_from: ItemIndex,
        ignore_areas: bool,
    ) -> bool {
        if ignore_areas && self.item(item).is_some_and(|item| item.is_conduction_area()) {
            return false;
        }

        for contact in self.normal_contacts(item) {
            if contact == came_from {
                continue;
            }

            if contact == search {
                return true;
            }

            if visited.insert(contact)
                && self.is_cycle_recursively(visited, contact, search, item, ignore_areas)
            {
                return true;
            }
        }

        false
    }

    /// Removes the trace if it is a cycle and not user fixed.
    pub fn remove_if_cycle(&mut self, index: ItemIndex) -> bool {
        let Some(trace) = self.trace(index) else {
            return false;
        };

        if trace.is_user_fixed() || !self.is_cycle(index) {
            return false;
        }

        log::debug!("removing cycle trace {:?}", index);
        self.remove_item(index);
        true
    }

    /// Combines all traces of `net`. Returns true if anything was combined.
    pub fn combine_traces(&mut self, net: usize) -> bool {
        let mut result = false;

        for index in self.traces_of_net(net) {
            if self.contains(index) {
                result |= self.combine(index);
            }
        }

        result
    }

    /// Normalizes all traces of `net`, restarting until nothing changes.
    pub fn normalize_traces(&mut self, net: usize) -> bool {
        let mut result = false;

        'restart: loop {
            for index in self.traces_of_net(net) {
                if self.contains(index) && (self.normalize(index, None) || self.remove_if_cycle(index)) {
                    result = true;
                    continue 'restart;
                }
            }

            return result;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{board::item::Via, rules::BoardRules};

    fn board() -> Board {
        Board::new(BoardRules::new(1, 100), IntBox::new(-10_000, -10_000, 10_000, 10_000))
    }

    fn p(x: i64, y: i64) -> IntPoint {
        IntPoint::new(x, y)
    }

    #[test]
    fn closed_unfixed_trace_is_rejected() {
        let mut board = board();
        let closed = [p(0, 0), p(500, 0), p(500, 500), p(0, 500), p(0, 0)];
        assert!(board
            .insert_trace_through(&closed, 0, 50, vec![1], 1, FixedState::Unfixed)
            .is_none());
        assert_eq!(board.item_count(), 0);
        assert!(board
            .insert_trace_through(&closed, 0, 50, vec![1], 1, FixedState::UserFixed)
            .is_some());
    }

    #[test]
    fn trace_is_split_at_via_center() {
        let mut board = board();
        board.add_item(Item::Via(Via::new(p(500, 0), 0, 0, 100, vec![1], 1, FixedState::Unfixed)));
        board.insert_trace_through(&[p(0, 0), p(1000, 0)], 0, 50, vec![1], 1, FixedState::Unfixed);

        let traces = board.trace_indices();
        assert_eq!(traces.len(), 2);
        let mut ends: Vec<(Point, Point)> = traces
            .iter()
            .map(|&t| {
                let trace = board.trace(t).unwrap();
                (trace.first_corner(), trace.last_corner())
            })
            .collect();
        ends.sort_by_key(|(a, _)| a.round());
        assert_eq!(ends[0], (Point::Int(p(0, 0)), Point::Int(p(500, 0))));
        assert_eq!(ends[1], (Point::Int(p(500, 0)), Point::Int(p(1000, 0))));
    }

    #[test]
    fn touching_traces_are_combined() {
        let mut board = board();
        let a = board
            .insert_trace_without_cleaning(
                Polyline::from_corners(&[p(0, 0), p(1000, 0)]),
                0,
                50,
                vec![1],
                1,
                FixedState::Unfixed,
            )
            .unwrap();
        let b = board
            .insert_trace_without_cleaning(
                Polyline::from_corners(&[p(1000, 0), p(1000, 1000), p(2000, 1000)]),
                0,
                50,
                vec![1],
                1,
                FixedState::Unfixed,
            )
            .unwrap();

        assert!(board.combine(a));
        assert!(!board.contains(b));
        let trace = board.trace(a).unwrap();
        assert_eq!(trace.corner_count(), 4);
        assert_eq!(board.search_tree().entry_count(a), 3);
        assert!(board.search_tree().is_consistent());
    }

    #[test]
    fn parallel_overlap_is_not_a_crossing() {
        let polyline = Polyline::from_corners(&[p(0, 0), p(1000, 0)]);
        let other = Polyline::from_corners(&[p(0, 100), p(1000, 100)]);
        assert!(crossing_lines(&polyline, 1, &other, 1).is_empty());

        let crossing = Polyline::from_corners(&[p(500, -500), p(500, 500)]);
        assert_eq!(crossing_lines(&polyline, 1, &crossing, 1), vec![crossing.line(1)]);
    }
}
