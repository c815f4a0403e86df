//! Spatial indexing of board item shapes.

mod manager;
mod room;
mod tree;

pub use manager::SearchTreeManager;
pub use room::IncompleteRoom;
pub use tree::{Bbox, BboxedLeaf, LeafId, ShapeSearchTree, TreeEntry};
