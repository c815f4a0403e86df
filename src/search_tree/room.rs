//! Completion of free space rooms against the obstacles of a box or
//! octagon tree.
//!
//! A room starts out as the board bounding box (or a given start shape)
//! and is cut back along an obstacle border for every obstacle it
//! overlaps. The part of the room that has to stay free of cuts is its
//! contained shape. If no border keeps the whole contained shape, the
//! room is divided and every piece keeps the part of the contained shape
//! that falls into it.

use crate::geometry::{AccessTileShape, IntBox, IntOctagon, TileShape};

/// A room on one layer whose shape may still overlap obstacles.
#[derive(Debug, Clone, PartialEq)]
pub struct IncompleteRoom {
    /// Shape to start from. The board bounding box is used if `None`.
    pub shape: Option<TileShape>,
    pub layer: usize,
    pub contained_shape: TileShape,
}

impl IncompleteRoom {
    pub fn new(contained_shape: TileShape, layer: usize) -> Self {
        Self {
            shape: None,
            layer,
            contained_shape,
        }
    }

    pub fn with_shape(mut self, shape: TileShape) -> Self {
        self.shape = Some(shape);
        self
    }
}

/// Box or octagon shape of a room. The trees storing the corresponding
/// shape variant complete rooms of this kind.
pub(crate) trait RoomShape: Copy + PartialEq {
    const EMPTY: Self;

    fn from_tile(shape: &TileShape) -> Self;
    fn to_tile(self) -> TileShape;
    fn dimension(&self) -> i32;
    fn intersection(&self, other: &Self) -> Self;
    fn union(&self, other: &Self) -> Self;
    fn contains_shape(&self, other: &Self) -> bool;

    /// True if the interiors intersect.
    fn overlaps_inside(&self, other: &Self) -> bool {
        self.intersection(other).dimension() == 2
    }

    /// Pieces of `room` outside the interior of `obstacle`, each with the
    /// part of `contained` it has to keep.
    fn restrain(room: &Self, contained: &Self, obstacle: &Self) -> Vec<(Self, Self)>;

    /// Rooms equal to their contained shape would be completed forever.
    fn drops_degenerate_rooms() -> bool {
        false
    }
}

impl RoomShape for IntBox {
    const EMPTY: Self = IntBox::EMPTY;

    fn from_tile(shape: &TileShape) -> Self {
        shape.bounding_box()
    }

    fn to_tile(self) -> TileShape {
        TileShape::Box(self)
    }

    fn dimension(&self) -> i32 {
        if self.is_empty() {
            -1
        } else if self.ll == self.ur {
            0
        } else if self.ll.x == self.ur.x || self.ll.y == self.ur.y {
            1
        } else {
            2
        }
    }

    fn intersection(&self, other: &Self) -> Self {
        IntBox::intersection(self, other)
    }

    fn union(&self, other: &Self) -> Self {
        IntBox::union(self, other)
    }

    fn contains_shape(&self, other: &Self) -> bool {
        self.contains_box(other)
    }

    fn restrain(room: &Self, contained: &Self, obstacle: &Self) -> Vec<(Self, Self)> {
        if contained.is_empty() {
            return vec![];
        }

        let crosses_x = |x: i64| room.ll.x < x && x < room.ur.x;
        let crosses_y = |y: i64| room.ll.y < y && y < room.ur.y;
        let overlaps_x = room.ur.x > obstacle.ll.x && room.ll.x < obstacle.ur.x;
        let overlaps_y = room.ur.y > obstacle.ll.y && room.ll.y < obstacle.ur.y;

        // Obstacle border, distance of the contained shape from it and the
        // room beyond it.
        let cuts = [
            (
                crosses_x(obstacle.ur.x) && overlaps_y,
                contained.ll.x - obstacle.ur.x,
                IntBox::new(obstacle.ur.x, room.ll.y, room.ur.x, room.ur.y),
            ),
            (
                crosses_x(obstacle.ll.x) && overlaps_y,
                obstacle.ll.x - contained.ur.x,
                IntBox::new(room.ll.x, room.ll.y, obstacle.ll.x, room.ur.y),
            ),
            (
                crosses_y(obstacle.ll.y) && overlaps_x,
                obstacle.ll.y - contained.ur.y,
                IntBox::new(room.ll.x, room.ll.y, room.ur.x, obstacle.ll.y),
            ),
            (
                crosses_y(obstacle.ur.y) && overlaps_x,
                contained.ll.y - obstacle.ur.y,
                IntBox::new(room.ll.x, obstacle.ur.y, room.ur.x, room.ur.y),
            ),
        ];

        let mut best: Option<(i64, IntBox)> = None;

        for (crosses, distance, restrained) in cuts {
            if crosses && distance > best.map_or(0, |(d, _)| d) {
                best = Some((distance, restrained));
            }
        }

        if let Some((_, restrained)) = best {
            return vec![(restrained, *contained)];
        }

        // The contained shape overlaps the obstacle, so it is divided at
        // an obstacle border inside the room.
        let is = contained.intersection(obstacle);

        if is.is_empty() {
            log::debug!("contained shape {:?} misses obstacle {:?}", contained, obstacle);
            return vec![];
        }

        let divided = if is.ll.x > room.ll.x && is.ll.x == obstacle.ll.x && is.ll.x < room.ur.x {
            Some((
                IntBox::new(room.ll.x, room.ll.y, is.ll.x, room.ur.y),
                IntBox::new(is.ll.x, room.ll.y, room.ur.x, room.ur.y),
            ))
        } else if is.ur.x > room.ll.x && is.ur.x == obstacle.ur.x && is.ur.x < room.ur.x {
            Some((
                IntBox::new(is.ur.x, room.ll.y, room.ur.x, room.ur.y),
                IntBox::new(room.ll.x, room.ll.y, is.ur.x, room.ur.y),
            ))
        } else if is.ll.y > room.ll.y && is.ll.y == obstacle.ll.y && is.ll.y < room.ur.y {
            Some((
                IntBox::new(room.ll.x, room.ll.y, room.ur.x, is.ll.y),
                IntBox::new(room.ll.x, is.ll.y, room.ur.x, room.ur.y),
            ))
        } else if is.ur.y > room.ll.y && is.ur.y == obstacle.ur.y && is.ur.y < room.ur.y {
            Some((
                IntBox::new(room.ll.x, is.ur.y, room.ur.x, room.ur.y),
                IntBox::new(room.ll.x, room.ll.y, room.ur.x, is.ur.y),
            ))
        } else {
            None
        };

        let Some((free, rest)) = divided else {
            return vec![];
        };

        let free_contained = contained.intersection(&free);

        if free_contained.dimension() <= 0 {
            return vec![];
        }

        let mut result = vec![(free, free_contained)];
        result.extend(Self::restrain(&rest, &contained.intersection(&rest), obstacle));
        result
    }
}

/// Bound of border line `no` of an octagon. Borders are numbered
/// counterclockwise starting with the lower one.
fn octagon_bound(o: &IntOctagon, no: usize) -> i64 {
    match no {
        0 => o.ly,
        1 => o.lrx,
        2 => o.rx,
        3 => o.urx,
        4 => o.uy,
        5 => o.ulx,
        6 => o.lx,
        _ => o.llx,
    }
}

/// Negative if `(x, y)` lies strictly inside of border line `no`.
fn octagon_border_excess(o: &IntOctagon, x: i64, y: i64, no: usize) -> i64 {
    match no {
        0 => o.ly - y,
        1 => x - y - o.lrx,
        2 => x - o.rx,
        3 => x + y - o.urx,
        4 => y - o.uy,
        5 => o.ulx + y - x,
        6 => o.lx - x,
        _ => o.llx - x - y,
    }
}

fn octagon_corner(octagon: &IntOctagon, no: usize) -> (i64, i64) {
    let o = octagon;

    match no {
        0 => (o.llx - o.ly, o.ly),
        1 => (o.lrx + o.ly, o.ly),
        2 => (o.rx, o.rx - o.lrx),
        3 => (o.rx, o.urx - o.rx),
        4 => (o.urx - o.uy, o.uy),
        5 => (o.ulx + o.uy, o.uy),
        6 => (o.lx, o.lx - o.ulx),
        _ => (o.lx, o.llx - o.lx),
    }
}

/// True if border segment `no` of `obstacle` runs through the interior of
/// `room`.
fn obstacle_segment_touches_inside(obstacle: &IntOctagon, no: usize, room: &IntOctagon) -> bool {
    let (x, y) = octagon_corner(obstacle, no);

    if (0..5).any(|j| octagon_border_excess(room, x, y, (no + j) % 8) >= 0) {
        return false;
    }

    let (x, y) = octagon_corner(obstacle, (no + 1) % 8);
    (0..3).all(|j| octagon_border_excess(room, x, y, (no + 5 + j) % 8) < 0)
}

/// How far `contained` lies outside of border `no` of `obstacle`. Diagonal
/// borders are weighted with 0.5 instead of 1/sqrt(2) so that orthogonal
/// cuts win ties.
fn signed_line_distance(obstacle: &IntOctagon, no: usize, contained: &IntOctagon) -> f64 {
    match no {
        0 => (obstacle.ly - contained.uy) as f64,
        1 => 0.5 * (contained.ulx - obstacle.lrx) as f64,
        2 => (contained.lx - obstacle.rx) as f64,
        3 => 0.5 * (contained.llx - obstacle.urx) as f64,
        4 => (contained.ly - obstacle.uy) as f64,
        5 => 0.5 * (obstacle.ulx - contained.lrx) as f64,
        6 => (obstacle.lx - contained.rx) as f64,
        _ => 0.5 * (obstacle.llx - contained.urx) as f64,
    }
}

/// `room` cut back to the outside of border `no` of `obstacle`.
fn outside_of_border(obstacle: &IntOctagon, no: usize, room: &IntOctagon) -> IntOctagon {
    let mut o = *room;

    match no {
        0 => o.uy = obstacle.ly,
        1 => o.ulx = obstacle.lrx,
        2 => o.lx = obstacle.rx,
        3 => o.llx = obstacle.urx,
        4 => o.ly = obstacle.uy,
        5 => o.lrx = obstacle.ulx,
        6 => o.rx = obstacle.lx,
        _ => o.urx = obstacle.llx,
    }

    IntOctagon::new(o.lx, o.ly, o.rx, o.uy, o.ulx, o.lrx, o.llx, o.urx)
}

/// `room` cut back to the inside of border `no` of `obstacle`.
fn inside_of_border(obstacle: &IntOctagon, no: usize, room: &IntOctagon) -> IntOctagon {
    let mut o = *room;

    match no {
        0 => o.ly = obstacle.ly,
        1 => o.lrx = obstacle.lrx,
        2 => o.rx = obstacle.rx,
        3 => o.urx = obstacle.urx,
        4 => o.uy = obstacle.uy,
        5 => o.ulx = obstacle.ulx,
        6 => o.lx = obstacle.lx,
        _ => o.llx = obstacle.llx,
    }

    IntOctagon::new(o.lx, o.ly, o.rx, o.uy, o.ulx, o.lrx, o.llx, o.urx)
}

impl RoomShape for IntOctagon {
    const EMPTY: Self = IntOctagon::EMPTY;

    fn from_tile(shape: &TileShape) -> Self {
        shape.bounding_octagon()
    }

    fn to_tile(self) -> TileShape {
        TileShape::Octagon(self)
    }

    fn dimension(&self) -> i32 {
        if self.is_empty() {
            -1
        } else if self.rx > self.lx && self.uy > self.ly && self.lrx > self.ulx && self.urx > self.llx {
            2
        } else if self.rx == self.lx && self.uy == self.ly {
            0
        } else {
            1
        }
    }

    fn intersection(&self, other: &Self) -> Self {
        IntOctagon::intersection(self, other)
    }

    fn union(&self, other: &Self) -> Self {
        IntOctagon::union(self, other)
    }

    fn contains_shape(&self, other: &Self) -> bool {
        other.is_empty()
            || (self.lx <= other.lx
                && self.ly <= other.ly
                && self.rx >= other.rx
                && self.uy >= other.uy
                && self.ulx <= other.ulx
                && self.lrx >= other.lrx
                && self.llx <= other.llx
                && self.urx >= other.urx)
    }

    fn restrain(room: &Self, contained: &Self, obstacle: &Self) -> Vec<(Self, Self)> {
        if contained.is_empty() {
            return vec![];
        }

        let mut best: Option<(f64, usize)> = None;

        for no in 0..8 {
            let distance = signed_line_distance(obstacle, no, contained);

            if distance > best.map_or(-1.0, |(d, _)| d)
                && obstacle_segment_touches_inside(obstacle, no, room)
            {
                best = Some((distance, no));
            }
        }

        if let Some((_, no)) = best.filter(|&(distance, _)| distance >= 0.0) {
            return vec![(outside_of_border(obstacle, no, room), *contained)];
        }

        if contained.dimension() < 1 {
            return vec![];
        }

        // No border keeps all of the contained shape outside, so a border
        // running through it divides the room.
        let Some(no) = (0..8).find(|&no| {
            let bound = octagon_bound(obstacle, no);
            let (lo, hi) = match no {
                0 | 4 => (contained.ly, contained.uy),
                2 | 6 => (contained.lx, contained.rx),
                1 | 5 => (contained.ulx, contained.lrx),
                _ => (contained.llx, contained.urx),
            };
            obstacle_segment_touches_inside(obstacle, no, room) && lo < bound && bound < hi
        }) else {
            return vec![];
        };

        let mut result = vec![];
        let outside = outside_of_border(obstacle, no, room);

        if outside.dimension() == 2 {
            let outside_contained = contained.intersection(&outside);

            if outside_contained.dimension() > 0 {
                result.push((outside, outside_contained));
            }
        }

        let rest = inside_of_border(obstacle, no, room);

        if rest.dimension() >= 2 {
            let rest_contained = contained.intersection(&rest);

            if rest_contained.dimension() >= 0 {
                result.extend(Self::restrain(&rest, &rest_contained, obstacle));
            }
        }

        result
    }

    fn drops_degenerate_rooms() -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_room_is_cut_at_the_farthest_border() {
        let room = IntBox::new(0, 0, 1000, 1000);
        let contained = IntBox::new(100, 100, 200, 200);
        let obstacle = IntBox::new(500, 400, 700, 600);

        let restrained = IntBox::restrain(&room, &contained, &obstacle);
        assert_eq!(restrained, vec![(IntBox::new(0, 0, 500, 1000), contained)]);
    }

    #[test]
    fn box_room_is_divided_around_an_overlapped_obstacle() {
        let room = IntBox::new(0, 0, 1000, 1000);
        let contained = IntBox::new(0, 400, 1000, 600);
        let obstacle = IntBox::new(400, 0, 600, 500);

        let restrained = IntBox::restrain(&room, &contained, &obstacle);
        assert_eq!(restrained.len(), 3);

        for (shape, kept) in &restrained {
            assert!(!shape.overlaps_inside(&obstacle));
            assert!(shape.contains_shape(kept));
        }
    }

    #[test]
    fn octagon_room_is_cut_along_a_border_of_the_obstacle() {
        let room = IntBox::new(0, 0, 1000, 1000).to_octagon();
        let contained = IntBox::new(100, 100, 200, 200).to_octagon();
        let obstacle = IntBox::new(500, 400, 700, 600).to_octagon();

        let restrained = IntOctagon::restrain(&room, &contained, &obstacle);
        assert_eq!(restrained.len(), 1);

        let (shape, kept) = restrained[0];
        assert_eq!(kept, contained);
        assert!(shape.contains_shape(&contained));
        assert!(!shape.overlaps_inside(&obstacle));
    }
}
