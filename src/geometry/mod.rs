//! Exact integer and rational plane geometry: points, directions, infinite
//! lines, polylines made of lines and the convex tile shapes that items are
//! stored as.

pub mod direction;
pub mod int_box;
pub mod line;
pub mod octagon;
pub mod point;
pub mod polyline;
pub mod shape;
pub mod simplex;

pub use direction::Direction;
pub use int_box::IntBox;
pub use line::{Line, Side};
pub use octagon::IntOctagon;
pub use point::{FloatPoint, IntPoint, IntVector, Point};
pub use polyline::Polyline;
pub use shape::{AccessTileShape, ShapeVariant, TileShape};
pub use simplex::Simplex;
