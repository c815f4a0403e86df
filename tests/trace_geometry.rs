use std::collections::BTreeSet;

use copperline::{
    board::{
        item::{ConductionArea, Pin, Via},
        AccessItem, Board, FixedState, Item, ItemIndex,
    },
    geometry::{AccessTileShape, IntBox, IntPoint, Point, Polyline},
    rules::{BoardRules, NetClass},
    search_tree::TreeEntry,
};

mod common;

use common::{
    add_trace, assert_tree_matches_items, board, corners, p, trace_ends, CLEARANCE, HALF_WIDTH,
};

fn insert_uncleaned(board: &mut Board, corners: &[IntPoint], net: usize) -> ItemIndex {
    board
        .insert_trace_without_cleaning(
            Polyline::from_corners(corners),
            0,
            HALF_WIDTH,
            vec![net],
            1,
            FixedState::Unfixed,
        )
        .unwrap()
}

/// The stored leaves of a trace cover the same area as its tree shapes.
fn assert_leaves_match_trace(board: &Board, index: ItemIndex) {
    let item = board.item(index).unwrap();

    for shape_index in 0..item.tile_shape_count() {
        let stored = board
            .search_tree()
            .entry_shape(TreeEntry {
                item: index,
                shape_index,
            })
            .unwrap();
        assert_eq!(
            stored.bounding_box(),
            board.tree_shape(item, shape_index).unwrap().bounding_box(),
            "shape {} of {:?}",
            shape_index,
            index,
        );
    }
}

fn area_loop(board: &mut Board, net: usize) -> ItemIndex {
    board.add_item(Item::ConductionArea(ConductionArea::new(
        vec![p(0, 0), p(1000, 0), p(1000, 1000), p(0, 1000)],
        0,
        vec![net],
        1,
        false,
    )));
    insert_uncleaned(board, &[p(500, 500), p(2000, 500), p(2000, 800), p(800, 800)], net)
}

#[test]
fn normalizing_twice_changes_nothing() {
    let mut board = board(1);
    add_trace(&mut board, &[p(0, 0), p(2000, 0)], 1);
    add_trace(&mut board, &[p(1000, -1000), p(1000, 1000)], 1);

    // The crossing splits both traces at (1000, 0).
    assert_eq!(board.trace_indices().len(), 4);
    assert!(!board.normalize_traces(1));
    assert_eq!(board.trace_indices().len(), 4);
    assert_tree_matches_items(&board);
}

#[test]
fn combining_gives_the_same_corners_from_either_side() {
    let first = [p(0, 0), p(1000, 0)];
    let second = [p(1000, 0), p(1000, 1000), p(2000, 1000)];

    let combined_from = |from_first: bool| {
        let mut board = board(1);
        let mut insert = |corners: &[IntPoint]| {
            board
                .insert_trace_without_cleaning(
                    Polyline::from_corners(corners),
                    0,
                    HALF_WIDTH,
                    vec![1],
                    1,
                    FixedState::Unfixed,
                )
                .unwrap()
        };
        let a = insert(&first);
        let b = insert(&second);

        let kept = if from_first { a } else { b };
        assert!(board.combine(kept));
        assert_eq!(board.trace_indices(), vec![kept]);
        assert_eq!(board.search_tree().entry_count(kept), 3);
        corners(&board, kept)
    };

    assert_eq!(combined_from(true), combined_from(false));
}

#[test]
fn combining_collinear_traces_skips_a_line() {
    let mut board = board(1);
    let a = board
        .insert_trace_without_cleaning(
            Polyline::from_corners(&[p(0, 0), p(1000, 0)]),
            0,
            HALF_WIDTH,
            vec![1],
            1,
            FixedState::Unfixed,
        )
        .unwrap();
    board
        .insert_trace_without_cleaning(
            Polyline::from_corners(&[p(1000, 0), p(2000, 0)]),
            0,
            HALF_WIDTH,
            vec![1],
            1,
            FixedState::Unfixed,
        )
        .unwrap();

    assert!(board.combine(a));
    // One segment from each trace, minus the joint line that was skipped.
    assert_eq!(board.search_tree().entry_count(a), 1);
    assert_eq!(trace_ends(&board, a), (Point::Int(p(0, 0)), Point::Int(p(2000, 0))));
}

#[test]
fn trace_over_pin_pad_off_center_stays_whole() {
    let mut board = board(1);
    board.add_item(Item::Pin(Pin::new(p(500, 100), 0, 0, 200, 200, vec![1], 1)));
    add_trace(&mut board, &[p(0, 0), p(1000, 0)], 1);

    assert_eq!(board.trace_indices().len(), 1);
}

#[test]
fn trace_through_via_center_is_split() {
    let mut board = board(1);
    let via = board.add_item(Item::Via(Via::new(
        p(500, 0),
        0,
        0,
        100,
        vec![1],
        1,
        FixedState::Unfixed,
    )));
    add_trace(&mut board, &[p(0, 0), p(1000, 0)], 1);

    assert_eq!(board.trace_indices().len(), 2);
    assert_eq!(board.normal_contacts(via).len(), 2);
    assert_tree_matches_items(&board);
}

#[test]
fn redundant_trace_between_connected_items_is_a_cycle() {
    let mut board = board(1);
    add_trace(&mut board, &[p(0, 0), p(1000, 0), p(1000, 1000)], 1);
    let detour = board
        .insert_trace_without_cleaning(
            Polyline::from_corners(&[p(0, 0), p(0, 1000), p(1000, 1000)]),
            0,
            HALF_WIDTH,
            vec![1],
            1,
            FixedState::Unfixed,
        )
        .unwrap();

    assert!(board.is_cycle(detour));
    assert!(board.remove_if_cycle(detour));
    assert!(!board.contains(detour));
    assert_eq!(board.trace_indices().len(), 1);
}

#[test]
fn change_keeps_the_index() {
    let mut board = board(1);
    let index = add_trace(&mut board, &[p(0, 0), p(1000, 0), p(1000, 1000)], 1);
    let generation = board.generation();

    assert!(board.change(index, Polyline::from_corners(&[p(0, 0), p(1000, 1000)])));
    assert!(board.generation() > generation);
    assert_eq!(corners(&board, index), vec![Point::Int(p(0, 0)), Point::Int(p(1000, 1000))]);
    assert_tree_matches_items(&board);
}

#[test]
fn combining_a_reversed_trace_in_front() {
    let mut board = board(1);
    let a = insert_uncleaned(&mut board, &[p(0, 0), p(0, 1000), p(1000, 1000)], 1);
    let b = insert_uncleaned(&mut board, &[p(0, 0), p(-1000, 0), p(-1000, -1000)], 1);

    assert!(board.combine_at_start(a));
    assert!(!board.contains(b));
    assert_eq!(
        corners(&board, a),
        [p(-1000, -1000), p(-1000, 0), p(0, 0), p(0, 1000), p(1000, 1000)]
            .map(Point::Int)
            .to_vec()
    );
    assert_eq!(board.search_tree().entry_count(a), 4);
    assert_leaves_match_trace(&board, a);
    assert_tree_matches_items(&board);
}

#[test]
fn combining_a_reversed_trace_at_the_end() {
    let mut board = board(1);
    let a = insert_uncleaned(&mut board, &[p(0, 0), p(1000, 0)], 1);
    let b = insert_uncleaned(&mut board, &[p(2000, 1000), p(1000, 1000), p(1000, 0)], 1);

    assert!(board.combine_at_end(a));
    assert!(!board.contains(b));
    assert_eq!(
        corners(&board, a),
        [p(0, 0), p(1000, 0), p(1000, 1000), p(2000, 1000)]
            .map(Point::Int)
            .to_vec()
    );
    assert_eq!(board.search_tree().entry_count(a), 3);
    assert_leaves_match_trace(&board, a);
    assert_tree_matches_items(&board);
}

#[test]
fn trace_looping_through_a_conduction_area_is_removed() {
    let mut board = board(1);
    let index = area_loop(&mut board, 1);

    board.normalize(index, None);

    assert!(!board.contains(index));
    assert!(board.trace_indices().is_empty());
    assert_tree_matches_items(&board);
}

#[test]
fn net_class_can_keep_loops_through_conduction_areas() {
    let mut rules = BoardRules::new(1, CLEARANCE);
    let keep = rules.add_net_class(NetClass::new("keep").with_ignore_cycles_with_areas(true));
    let net = rules.nets_mut().add("GND", keep);
    let mut board = Board::new(rules, IntBox::new(-10_000, -10_000, 10_000, 10_000));
    let index = area_loop(&mut board, net);

    board.normalize(index, None);

    assert!(board.contains(index));
    assert!(!board.remove_if_cycle(index));
    assert_eq!(board.trace_indices(), vec![index]);
}

#[test]
fn compensated_tree_gives_the_same_clearance_answers() {
    let mut board = board(1);
    add_trace(&mut board, &[p(0, 0), p(2000, 0)], 1);

    let near = Polyline::from_corners(&[p(0, 180), p(2000, 180)]);
    let far = Polyline::from_corners(&[p(0, 300), p(2000, 300)]);
    let check = |board: &Board, polyline: &Polyline| {
        board.check_polyline_trace(polyline, 0, HALF_WIDTH, &[2], 1, &BTreeSet::new())
    };

    assert!(!check(&board, &near));
    assert!(check(&board, &far));

    assert!(board.set_clearance_compensation_used(true));
    assert!(board.is_clearance_compensation_used());
    assert_tree_matches_items(&board);

    assert!(!check(&board, &near));
    assert!(check(&board, &far));
}

#[test]
fn trace_crossing_two_traces_splits_all_of_them() {
    let mut board = board(1);
    insert_uncleaned(&mut board, &[p(1000, 0), p(1000, 1000)], 1);
    insert_uncleaned(&mut board, &[p(2000, 0), p(2000, 1000)], 1);
    let crossing = insert_uncleaned(&mut board, &[p(0, 500), p(3000, 500)], 1);

    let pieces = board.split(crossing, None);

    assert_eq!(pieces.len(), 3);
    let traces = board.trace_indices();
    assert_eq!(traces.len(), 7);

    for joint in [p(1000, 500), p(2000, 500)] {
        let ending_there = traces
            .iter()
            .filter(|&&index| {
                let (start, end) = trace_ends(&board, index);
                start == Point::Int(joint) || end == Point::Int(joint)
            })
            .count();
        assert_eq!(ending_there, 4, "traces ending at {:?}", joint);
    }
    assert_tree_matches_items(&board);
}
