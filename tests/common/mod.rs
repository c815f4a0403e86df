#![allow(dead_code)]

use copperline::{
    board::{item::ObstacleArea, AccessItem, Board, FixedState, Item, ItemIndex},
    geometry::{IntBox, IntPoint, Point},
    rules::BoardRules,
};

pub const HALF_WIDTH: i64 = 50;
pub const CLEARANCE: i64 = 100;

pub fn p(x: i64, y: i64) -> IntPoint {
    IntPoint::new(x, y)
}

pub fn board(layer_count: usize) -> Board {
    Board::new(
        BoardRules::new(layer_count, CLEARANCE),
        IntBox::new(-10_000, -10_000, 10_000, 10_000),
    )
}

pub fn add_trace(board: &mut Board, corners: &[IntPoint], net: usize) -> ItemIndex {
    board
        .insert_trace_through(corners, 0, HALF_WIDTH, vec![net], 1, FixedState::Unfixed)
        .unwrap()
}

pub fn add_obstacle(board: &mut Board, ll: IntPoint, ur: IntPoint) -> ItemIndex {
    board.add_item(Item::ObstacleArea(ObstacleArea::new(
        vec![ll, p(ur.x, ll.y), ur, p(ll.x, ur.y)],
        0,
        vec![],
        1,
    )))
}

pub fn corners(board: &Board, index: ItemIndex) -> Vec<Point> {
    board.trace(index).unwrap().polyline().corners().to_vec()
}

pub fn trace_ends(board: &Board, index: ItemIndex) -> (Point, Point) {
    let trace = board.trace(index).unwrap();
    (trace.first_corner(), trace.last_corner())
}

/// No item overlaps another one closer than the clearance rules allow.
pub fn assert_no_clearance_violations(board: &Board) {
    for index in board.item_indices() {
        assert!(
            board.clearance_violations(index).is_empty(),
            "{} {:?} violates clearance",
            board.item(index).unwrap().kind_name(),
            index,
        );
    }
}

/// The search tree holds one entry per shape of every item.
pub fn assert_tree_matches_items(board: &Board) {
    assert!(board.search_tree().is_consistent());

    for (index, item) in board.items() {
        assert_eq!(
            board.search_tree().entry_count(index),
            item.tile_shape_count(),
            "{:?} has stale tree entries",
            index,
        );
    }
}
