use crate::{
    board::item::{Item, ItemIndex, PolylineTrace},
    geometry::ShapeVariant,
    rules::ClearanceMatrix,
    search_tree::tree::ShapeSearchTree,
};

/// Keeps the default tree and any number of additional trees in sync with
/// the items on the board.
#[derive(Debug, Clone)]
pub struct SearchTreeManager {
    default_tree: ShapeSearchTree,
    autoroute_trees: Vec<ShapeSearchTree>,
}

impl SearchTreeManager {
    pub fn new() -> Self {
        Self {
            default_tree: ShapeSearchTree::new(ShapeVariant::Exact, None),
            autoroute_trees: vec![],
        }
    }

    pub fn default_tree(&self) -> &ShapeSearchTree {
        &self.default_tree
    }

    pub fn autoroute_tree(
        &self,
        variant: ShapeVariant,
        compensated_class: Option<usize>,
    ) -> Option<&ShapeSearchTree> {
        self.autoroute_trees.iter().find(|tree| {
            tree.variant() == variant && tree.compensated_class() == compensated_class
        })
    }

    fn trees_mut(&mut self) -> impl Iterator<Item = &mut ShapeSearchTree> {
        std::iter::once(&mut self.default_tree).chain(self.autoroute_trees.iter_mut())
    }

    /// Adds a tree holding all given items unless an equal one exists.
    pub fn add_autoroute_tree<'a>(
        &mut self,
        matrix: &ClearanceMatrix,
        variant: ShapeVariant,
        compensated_class: Option<usize>,
        items: impl IntoIterator<Item = (ItemIndex, &'a Item)>,
    ) {
        if self.autoroute_tree(variant, compensated_class).is_some() {
            return;
        }

        let mut tree = ShapeSearchTree::new(variant, compensated_class);

        for (index, item) in items {
            tree.insert(matrix, index, item);
        }

        self.autoroute_trees.push(tree);
    }

    /// Variants and compensated classes of the additional trees.
    pub fn autoroute_tree_kinds(&self) -> Vec<(ShapeVariant, Option<usize>)> {
        self.autoroute_trees
            .iter()
            .map(|tree| (tree.variant(), tree.compensated_class()))
            .collect()
    }

    pub fn clear_autoroute_trees(&mut self) {
        self.autoroute_trees.clear();
    }

    pub fn is_clearance_compensation_used(&self) -> bool {
        self.default_tree.is_clearance_compensation_used()
    }

    /// Switches compensation of the default tree and rebuilds it. Only
    /// possible while the rules have a single non-null clearance class.
    pub fn set_clearance_compensation_used<'a>(
        &mut self,
        matrix: &ClearanceMatrix,
        value: bool,
        items: impl IntoIterator<Item = (ItemIndex, &'a Item)>,
    ) -> bool {
        if value == self.is_clearance_compensation_used() {
            return true;
        }

        if value && matrix.class_count() != 2 {
            log::warn!(
                "clearance compensation needs 2 clearance classes, there are {}",
                matrix.class_count()
            );
            return false;
        }

        self.default_tree = ShapeSearchTree::new(ShapeVariant::Exact, value.then_some(1));

        for (index, item) in items {
            self.default_tree.insert(matrix, index, item);
        }

        true
    }

    pub fn insert(&mut self, matrix: &ClearanceMatrix, index: ItemIndex, item: &Item) {
        for tree in self.trees_mut() {
            tree.insert(matrix, index, item);
        }
    }

    pub fn remove(&mut self, index: ItemIndex) {
        for tree in self.trees_mut() {
            tree.remove(index);
        }
    }

    pub fn merge_entries_in_front(
        &mut self,
        matrix: &ClearanceMatrix,
        from: ItemIndex,
        to: ItemIndex,
        joined: &PolylineTrace,
        change_order: bool,
    ) {
        for tree in self.trees_mut() {
            tree.merge_entries_in_front(matrix, from, to, joined, change_order);
        }
    }

    pub fn merge_entries_at_end(
        &mut self,
        matrix: &ClearanceMatrix,
        from: ItemIndex,
        to: ItemIndex,
        joined: &PolylineTrace,
        change_order: bool,
    ) {
        for tree in self.trees_mut() {
            tree.merge_entries_at_end(matrix, from, to, joined, change_order);
        }
    }

    pub fn change_entries(
        &mut self,
        matrix: &ClearanceMatrix,
        index: ItemIndex,
        trace: &PolylineTrace,
        keep_at_start: usize,
        keep_at_end: usize,
    ) {
        for tree in self.trees_mut() {
            tree.change_entries(matrix, index, trace, keep_at_start, keep_at_end);
        }
    }
}

impl Default for SearchTreeManager {
    fn default() -> Self {
        Self::new()
    }
}
