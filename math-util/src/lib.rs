//! Numeric and geometric building blocks shared by the solver crates: an exact fixed-point `Unit` and axis-aligned
//! rectangles, points and segments built on it.
pub mod geometry;
pub mod unit;

pub use geometry::{bounding_box, centroid, segment_intersects_rect, segments_intersect, Point, Rect, Segment};
pub use unit::{FixedType, Unit};
