pub mod board;
pub mod geometry;
pub mod math;
pub mod pull_tight;
pub mod rules;
pub mod search_tree;
pub mod settings;
pub mod shove;
pub mod stoppable;
