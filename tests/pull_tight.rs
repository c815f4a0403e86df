use copperline::{
    board::Board,
    geometry::{IntPoint, Point},
    pull_tight::PullTight,
    rules::AngleRestriction,
    settings::OptimizerSettings,
    stoppable::StopFlag,
};

mod common;

use common::{
    add_obstacle, add_trace, assert_no_clearance_violations, assert_tree_matches_items, board,
    corners, p, trace_ends,
};

const ZIG_ZAG: [IntPoint; 4] = [
    IntPoint::new(0, 0),
    IntPoint::new(0, 1000),
    IntPoint::new(1000, 1000),
    IntPoint::new(1000, 2000),
];

fn settings(angle_restriction: AngleRestriction) -> OptimizerSettings {
    OptimizerSettings {
        angle_restriction,
        ..OptimizerSettings::default()
    }
}

#[test]
fn any_angle_zig_zag_gets_shorter() {
    let mut board = board(1);
    let index = add_trace(&mut board, &ZIG_ZAG, 1);
    let before = board.trace(index).unwrap().length();

    assert!(PullTight::new(&mut board, &settings(AngleRestriction::AnyAngle)).pull_tight_trace(index));

    let traces = board.trace_indices();
    assert_eq!(traces.len(), 1);
    assert!(board.trace(traces[0]).unwrap().length() < before);
    assert_eq!(corners(&board, traces[0]), vec![Point::Int(p(0, 0)), Point::Int(p(1000, 2000))]);
    assert_tree_matches_items(&board);
}

#[test]
fn any_angle_zig_zag_keeps_clear_of_obstacles_on_the_shortcut() {
    let mut board = board(1);
    add_obstacle(&mut board, p(200, 450), p(300, 550));
    add_obstacle(&mut board, p(700, 1450), p(800, 1550));
    let index = add_trace(&mut board, &ZIG_ZAG, 1);
    let before = board.trace(index).unwrap().length();

    assert!(PullTight::new(&mut board, &settings(AngleRestriction::AnyAngle)).pull_tight_trace(index));

    let traces = board.trace_indices();
    assert_eq!(traces.len(), 1);
    let after = corners(&board, traces[0]);
    assert!(after.len() > 2);
    assert!(board.trace(traces[0]).unwrap().length() < before);
    assert_eq!(trace_ends(&board, traces[0]), (Point::Int(p(0, 0)), Point::Int(p(1000, 2000))));
    assert_no_clearance_violations(&board);
    assert_tree_matches_items(&board);
}

#[test]
fn forty_five_degree_zig_zag_respects_obstacles() {
    let mut board = board(1);
    let index = add_trace(&mut board, &ZIG_ZAG, 1);
    add_obstacle(&mut board, p(200, 200), p(800, 800));
    add_obstacle(&mut board, p(200, 1200), p(800, 1800));
    let before = corners(&board, index);

    PullTight::new(&mut board, &settings(AngleRestriction::FortyFiveDegree)).pull_tight_trace(index);

    let traces = board.trace_indices();
    assert_eq!(traces.len(), 1);
    let after = corners(&board, traces[0]);
    assert_eq!(after.first(), before.first());
    assert_eq!(after.last(), before.last());
    assert_no_clearance_violations(&board);
}

#[test]
fn changed_area_is_optimized_without_violations() {
    for angle_restriction in [
        AngleRestriction::NinetyDegree,
        AngleRestriction::FortyFiveDegree,
        AngleRestriction::AnyAngle,
    ] {
        let mut board = board(1);
        add_trace(&mut board, &[p(0, 0), p(0, 3000), p(3000, 3000), p(3000, 0)], 1);
        add_trace(&mut board, &[p(-2000, 5000), p(5000, 5000)], 2);
        add_obstacle(&mut board, p(1000, 3500), p(2000, 4000));
        let length = |board: &Board| -> f64 {
            board.trace_indices().iter().map(|&i| board.trace(i).unwrap().length()).sum()
        };
        let before = length(&board);

        board.mark_all_changed_area();
        PullTight::new(&mut board, &settings(angle_restriction)).opt_changed_area(None);

        assert!(length(&board) <= before, "{:?} made traces longer", angle_restriction);
        assert_no_clearance_violations(&board);
        assert_tree_matches_items(&board);
    }
}

#[test]
fn requested_stop_leaves_the_board_alone() {
    let mut board = board(1);
    let index = add_trace(&mut board, &ZIG_ZAG, 1);
    let before = corners(&board, index);
    board.mark_all_changed_area();

    let flag = StopFlag::new();
    flag.request_stop();
    let mut pull = PullTight::new(&mut board, &settings(AngleRestriction::AnyAngle)).with_stop_flag(flag);

    assert!(!pull.opt_changed_area(None));
    assert_eq!(corners(&board, index), before);
}
