use copperline::{
    board::Board,
    pull_tight::PullTight,
    rules::BoardRules,
    settings::OptimizerSettings,
};

mod common;

use common::{add_trace, board, p};

#[test]
fn optimized_board_survives_json_round_trip() {
    let mut board = board(2);
    add_trace(&mut board, &[p(0, 0), p(0, 1000), p(1000, 1000), p(1000, 2000)], 1);

    board.mark_all_changed_area();
    PullTight::new(&mut board, &OptimizerSettings::default()).opt_changed_area(None);

    let mut json = vec![];
    board.to_json_writer(&mut json).unwrap();
    let loaded = Board::from_json_reader(json.as_slice()).unwrap();

    assert_eq!(loaded.item_count(), board.item_count());
    assert_eq!(loaded.layer_count(), 2);

    for (original, reloaded) in board.trace_indices().into_iter().zip(loaded.trace_indices()) {
        assert_eq!(
            board.trace(original).unwrap().polyline().corners(),
            loaded.trace(reloaded).unwrap().polyline().corners()
        );
    }
}

#[test]
fn settings_file_fills_in_defaults() {
    let settings =
        OptimizerSettings::from_json_str(r#"{ "min_translate_dist": 250, "only_nets": [3] }"#).unwrap();

    assert_eq!(settings.min_translate_dist, 250);
    assert_eq!(settings.only_nets, vec![3]);
    assert_eq!(settings.max_shove_recursion_depth, 20);
    assert_eq!(settings.angle_restriction, OptimizerSettings::default().angle_restriction);
}

#[test]
fn rules_serialize_with_the_board() {
    let json = serde_json::to_string(&BoardRules::new(4, 150)).unwrap();
    let rules: BoardRules = serde_json::from_str(&json).unwrap();

    assert_eq!(rules.layer_count(), 4);
    assert_eq!(rules.clearance_matrix().value(1, 1, 3), 150);
}
