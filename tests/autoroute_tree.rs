use copperline::{
    board::{AccessItem, Board, FixedState},
    geometry::{AccessTileShape, IntBox, IntPoint, Polyline, ShapeVariant, TileShape},
    search_tree::{IncompleteRoom, TreeEntry},
};

mod common;

use common::{add_obstacle, add_trace, board, p, HALF_WIDTH};

/// Every shape of every item is stored in the tree of `variant` as the
/// corresponding bounding shape of its tile shape.
fn assert_tree_follows_items(board: &Board, variant: ShapeVariant) {
    let tree = board.autoroute_tree(variant, None).unwrap();
    assert!(tree.is_consistent());

    for (index, item) in board.items() {
        assert_eq!(tree.entry_count(index), item.tile_shape_count());

        for shape_index in 0..item.tile_shape_count() {
            let stored = tree.entry_shape(TreeEntry {
                item: index,
                shape_index,
            });
            let expected = board.tree_shape(item, shape_index).unwrap().to_variant(variant);
            assert_eq!(stored, Some(&expected), "{:?} shape {}", index, shape_index);
        }
    }
}

#[test]
fn box_and_octagon_trees_follow_insert_merge_and_remove() {
    let mut board = board(1);
    add_obstacle(&mut board, p(3000, 3000), p(4000, 4000));
    board.add_autoroute_tree(ShapeVariant::Box, None);
    board.add_autoroute_tree(ShapeVariant::Octagon, None);

    let insert = |board: &mut Board, corners: &[IntPoint]| {
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
    let a = insert(&mut board, &[p(0, 0), p(0, 1000), p(1000, 1000)]);
    let b = insert(&mut board, &[p(0, 0), p(-1000, 0), p(-1000, -1000)]);

    for variant in [ShapeVariant::Box, ShapeVariant::Octagon] {
        assert_tree_follows_items(&board, variant);
    }

    assert!(board.combine_at_start(a));
    assert!(!board.contains(b));

    for variant in [ShapeVariant::Box, ShapeVariant::Octagon] {
        assert_tree_follows_items(&board, variant);
    }

    board.remove_item(a);

    for variant in [ShapeVariant::Box, ShapeVariant::Octagon] {
        let tree = board.autoroute_tree(variant, None).unwrap();
        assert_eq!(tree.entry_count(a), 0);
        assert_eq!(tree.size(), 1);
    }
}

#[test]
fn box_room_ends_at_the_nearest_obstacle_border() {
    let mut board = board(1);
    add_obstacle(&mut board, p(1000, -500), p(2000, 500));
    board.add_autoroute_tree(ShapeVariant::Box, None);

    let contained = TileShape::Box(IntBox::new(-100, -100, 100, 100));
    let rooms = board.complete_room(
        ShapeVariant::Box,
        None,
        &IncompleteRoom::new(contained.clone(), 0),
        1,
        None,
    );

    assert_eq!(
        rooms,
        vec![IncompleteRoom {
            shape: Some(TileShape::Box(IntBox::new(-10_000, -10_000, 1000, 10_000))),
            layer: 0,
            contained_shape: contained,
        }]
    );
}

#[test]
fn same_net_traces_do_not_restrain_a_room() {
    let mut board = board(1);
    add_obstacle(&mut board, p(1000, -500), p(2000, 500));
    add_trace(&mut board, &[p(-3000, 0), p(-500, 0)], 1);
    board.add_autoroute_tree(ShapeVariant::Box, None);

    let room = IncompleteRoom::new(TileShape::Box(IntBox::new(-100, -100, 100, 100)), 0);
    let own_net = board.complete_room(ShapeVariant::Box, None, &room, 1, None);
    let foreign_net = board.complete_room(ShapeVariant::Box, None, &room, 2, None);

    assert_eq!(own_net.len(), 1);
    assert_eq!(
        own_net[0].shape,
        Some(TileShape::Box(IntBox::new(-10_000, -10_000, 1000, 10_000)))
    );

    assert_eq!(foreign_net.len(), 1);
    let shape = foreign_net[0].shape.as_ref().unwrap().bounding_box();
    assert!(shape.ll.x > -3000 && shape.ll.x < -100);
    assert_eq!(shape.ur.x, 1000);
}

#[test]
fn octagon_room_is_cut_along_the_obstacle() {
    let mut board = board(1);
    add_obstacle(&mut board, p(1000, -500), p(2000, 500));
    board.add_autoroute_tree(ShapeVariant::Octagon, None);

    let contained = IntBox::new(-100, -100, 100, 100).to_octagon();
    let rooms = board.complete_room(
        ShapeVariant::Octagon,
        None,
        &IncompleteRoom::new(TileShape::Octagon(contained), 0),
        1,
        None,
    );

    assert_eq!(rooms.len(), 1);
    let Some(TileShape::Octagon(shape)) = rooms[0].shape else {
        panic!("octagon room expected, got {:?}", rooms[0].shape);
    };
    assert_eq!(shape.rx, 1000);
    assert_eq!(shape.lx, -10_000);
    assert_eq!(rooms[0].contained_shape, TileShape::Octagon(contained));
}

#[test]
fn rooms_need_a_box_or_octagon_tree() {
    let mut board = board(1);
    add_obstacle(&mut board, p(1000, -500), p(2000, 500));
    let room = IncompleteRoom::new(TileShape::Box(IntBox::new(-100, -100, 100, 100)), 0);

    assert!(board.complete_room(ShapeVariant::Box, None, &room, 1, None).is_empty());
    assert!(board
        .search_tree()
        .complete_shape(&room, &board.bounding_box(), |_| true)
        .is_empty());
}
