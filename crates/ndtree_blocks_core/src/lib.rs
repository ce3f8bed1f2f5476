//! The core data types for addressing nodes of sparse n-dimensional trees:
//! - `PointN`: an N-dimensional integer point, most importantly `Point2i` and `Point3i`
//! - `MortonCode`: a bit-interleaved encoding of a point
//! - `NdtreeIndex`: a `(height, position)` address of a single tree node

pub mod error;
pub mod index;
pub mod morton;
pub mod point;
pub mod tree_math;

pub use error::NdtreeError;
pub use index::{Height, LinearIndex, NdtreeIndex, QuadtreeIndex, OctreeIndex};
pub use morton::{MortonCode, MortonPoint};
pub use point::{Point, Point2i, Point3i, PointN, SmallZero};

pub use num;

pub mod prelude {
    pub use super::{
        Height, LinearIndex, MortonCode, MortonPoint, NdtreeError, NdtreeIndex, OctreeIndex,
        Point, Point2i, Point3i, PointN, QuadtreeIndex, SmallZero,
    };
}
