//! The board: an arena of routing items, their design rules and the search
//! trees indexing their shapes.

mod board;
pub mod changed_area;
pub mod description;
pub mod item;
mod trace;

pub use board::*;
pub use changed_area::ChangedArea;
pub use description::{BoardDescription, DescriptionError, ItemDescription, TracePath};
pub use item::{AccessItem, FixedState, Item, ItemIndex, PolylineTrace};
