use copperline::{
    board::{FixedState, Item},
    geometry::{Point, Polyline},
    pull_tight::PullTight,
    rules::AngleRestriction,
    settings::OptimizerSettings,
    shove::{Shove, ShoveError},
};

mod common;

use common::{add_trace, assert_no_clearance_violations, assert_tree_matches_items, board, p, trace_ends, HALF_WIDTH};

#[test]
fn shoved_trace_can_be_pulled_tight_again() {
    let mut board = board(1);
    let foreign = add_trace(&mut board, &[p(-3000, 0), p(3000, 0)], 2);

    let settings = OptimizerSettings {
        angle_restriction: AngleRestriction::AnyAngle,
        ..OptimizerSettings::default()
    };
    let inserted = Shove::new(&mut board, &settings)
        .insert_trace(
            Polyline::from_corners(&[p(0, -300), p(0, 300)]),
            0,
            HALF_WIDTH,
            vec![1],
            1,
        )
        .unwrap();
    assert!(board.contains(inserted));

    let shoved_length = board.trace(foreign).unwrap().length();
    assert!(shoved_length > 6000.0);

    // The shove marked the changed area for the optimizer.
    assert!(board.changed_area().is_some());
    PullTight::new(&mut board, &settings).opt_changed_area(None);

    let trace = board.trace(foreign).unwrap();
    assert!(trace.length() <= shoved_length);
    assert_eq!(
        trace_ends(&board, foreign),
        (Point::Int(p(-3000, 0)), Point::Int(p(3000, 0)))
    );
    assert_no_clearance_violations(&board);
    assert_tree_matches_items(&board);
}

#[test]
fn user_fixed_trace_is_reported_as_failing_obstacle() {
    let mut board = board(1);
    let fixed = board
        .insert_trace_through(&[p(-3000, 0), p(3000, 0)], 0, HALF_WIDTH, vec![2], 1, FixedState::UserFixed)
        .unwrap();

    let mut shove = Shove::new(&mut board, &OptimizerSettings::default());
    let polyline = Polyline::from_corners(&[p(0, -300), p(0, 300)]);
    assert!(!shove.check_trace(&polyline, 0, HALF_WIDTH, &[1], 1));

    assert_eq!(board.shove_failing_obstacle(), Some(fixed));
    assert_eq!(board.shove_failing_layer(), Some(0));
    assert!(matches!(board.item(fixed), Some(Item::Trace(..))));
}

#[test]
fn same_net_trace_is_no_obstacle() {
    let mut board = board(1);
    add_trace(&mut board, &[p(100, -300), p(100, 300)], 1);

    let mut shove = Shove::new(&mut board, &OptimizerSettings::default());
    let result = shove.insert_trace(
        Polyline::from_corners(&[p(0, -300), p(0, 300)]),
        0,
        HALF_WIDTH,
        vec![1],
        1,
    );

    assert!(result.is_ok());
    assert_eq!(board.shove_failing_obstacle(), None);
}

#[test]
fn trace_leaving_the_board_fails() {
    let mut board = board(1);
    let mut shove = Shove::new(&mut board, &OptimizerSettings::default());
    let result = shove.insert_trace(
        Polyline::from_corners(&[p(0, 0), p(20_000, 0)]),
        0,
        HALF_WIDTH,
        vec![1],
        1,
    );

    assert_eq!(result, Err(ShoveError::OutsideBoard(0)));
    assert_eq!(board.item_count(), 0);
}
