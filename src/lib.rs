//! Sparse, multi-resolution trees over 2D and 3D integer lattices, i.e. quadtrees and octrees that store a payload on every
//! node, from the root down to the individual lattice cells.
//!
//! This library is organized into two crates:
//! - **core**: lattice points, Morton codes and tree node indices
//! - **storage**: the chunked tree that stores node payloads, allocating several levels at a time
//!
//! ```
//! use ndtree_blocks::prelude::*;
//!
//! let mut tree = ChunkedQuadtree::<u8, 2>::new(ChunkedNdtreeConfig::new(8));
//!
//! let cell = QuadtreeIndex::new(0, PointN([200, 13]));
//! *tree.get_or_allocate_node_data(&cell) = 1;
//! *tree.get_or_allocate_node_data(&cell.ancestor(4)) = 2;
//!
//! assert_eq!(tree.get_node_data(&cell), Some(&1));
//! assert_eq!(tree.get_node_data(&cell.ancestor(4)), Some(&2));
//! assert_eq!(tree.get_node_data(&cell.ancestor(1)), Some(&0));
//! ```

pub use ndtree_blocks_core as core;
pub use ndtree_blocks_storage as storage;

pub mod prelude {
    pub use super::core::prelude::*;
    pub use super::storage::prelude::*;
}
