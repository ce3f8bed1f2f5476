//! Addresses of nodes in a perfect `2^D`-ary tree.
//!
//! An `NdtreeIndex` names exactly one node of the full, uncompressed tree: its `height` above the leaves (0 is the finest
//! level) and its `position` on the lattice of that height. A node at height `h` with position `p` covers the leaves whose
//! positions lie in `[p * 2^h, (p + 1) * 2^h)`.
//!
//! The Morton code of an index is the Morton code of its minimum leaf descendant, so codes at all heights share a single
//! coordinate frame and the bits that select a node among its siblings at any level can be read straight out of the code.
//!
//! ```
//! use ndtree_blocks_core::prelude::*;
//!
//! let leaf = OctreeIndex::new(0, PointN([5, 2, 7]));
//! let grandparent = leaf.ancestor(2);
//! assert_eq!(grandparent, OctreeIndex::new(2, PointN([1, 0, 1])));
//!
//! // The leaf's offset below its grandparent, two levels of three bits each.
//! let code = leaf.to_morton();
//! assert_eq!(NdtreeIndex::<[i32; 3]>::compute_relative_child_index(code, 2, 0), 0b110_101);
//! ```

use crate::{MortonCode, MortonPoint, NdtreeError, Point, PointN};

use serde::{Deserialize, Serialize};

/// Height of a node above the leaf level.
pub type Height = u32;

/// A flat index into some contiguous array of nodes, e.g. the siblings of a node or the payload slots of a chunk.
pub type LinearIndex = usize;

/// A `(height, position)` node address.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct NdtreeIndex<N> {
    pub height: Height,
    pub position: PointN<N>,
}

/// A 2D `NdtreeIndex`.
pub type QuadtreeIndex = NdtreeIndex<[i32; 2]>;

/// A 3D `NdtreeIndex`.
pub type OctreeIndex = NdtreeIndex<[i32; 3]>;

impl<N> NdtreeIndex<N>
where
    PointN<N>: MortonPoint,
{
    /// The number of children of any node.
    pub const NUM_CHILDREN: usize = 1 << <PointN<N> as Point>::DIM;

    #[inline]
    pub fn new(height: Height, position: PointN<N>) -> Self {
        Self { height, position }
    }

    /// The index of the single node at `max_height`.
    #[inline]
    pub fn root(max_height: Height) -> Self {
        Self::new(max_height, PointN::fill(0))
    }

    #[inline]
    pub fn to_morton(&self) -> MortonCode {
        let code: MortonCode = self.position.into();

        code.shift_up(PointN::<N>::dim(), self.height)
    }

    /// The inverse of `to_morton`, given the height the code was generated at.
    #[inline]
    pub fn from_morton(code: MortonCode, height: Height) -> Self {
        Self::new(
            height,
            PointN::from(code.shift_down(PointN::<N>::dim(), height)),
        )
    }

    /// The position of the descendant at `child_height` relative to its ancestor at `parent_height`, in
    /// `[0, 2^(D * (parent_height - child_height)))`, where `code` is the Morton code of the descendant (or any node below
    /// it).
    #[inline]
    pub fn compute_relative_child_index(
        code: MortonCode,
        parent_height: Height,
        child_height: Height,
    ) -> LinearIndex {
        code.extract_span(PointN::<N>::dim(), parent_height, child_height)
    }

    /// This node's position among the children of its parent.
    #[inline]
    pub fn relative_child_index(&self) -> LinearIndex {
        Self::compute_relative_child_index(self.to_morton(), self.height + 1, self.height)
    }

    #[inline]
    pub fn parent(&self) -> Self {
        self.ancestor(self.height + 1)
    }

    /// The ancestor at `height`, which must be at least `self.height`.
    #[inline]
    pub fn ancestor(&self, height: Height) -> Self {
        debug_assert!(height >= self.height);

        Self::new(height, self.position >> (height - self.height) as i32)
    }

    /// The child at `relative_child_index` in `[0, 2^D)`. Must not be called on a leaf.
    #[inline]
    pub fn child(&self, relative_child_index: LinearIndex) -> Self {
        debug_assert!(relative_child_index < Self::NUM_CHILDREN);

        self.descendant(1, relative_child_index)
    }

    /// The descendant `span` levels below this node at `relative_index` in `[0, 2^(D * span))`, where the relative index is
    /// Morton-ordered like the result of `compute_relative_child_index`.
    #[inline]
    pub fn descendant(&self, span: Height, relative_index: LinearIndex) -> Self {
        debug_assert!(span <= self.height);

        // A relative index is the Morton code of the descendant's offset from the minimum descendant at that height.
        let offset = PointN::from(MortonCode(relative_index as u64));

        Self::new(self.height - span, (self.position << span as i32) + offset)
    }

    /// Iterates over all children in order of their relative index.
    pub fn children(&self) -> impl Iterator<Item = Self> + '_ {
        (0..Self::NUM_CHILDREN).map(move |i| self.child(i))
    }

    #[inline]
    pub fn is_valid_for(&self, max_height: Height) -> bool {
        self.validate(max_height).is_ok()
    }

    /// Checks that this node exists in a tree of `max_height`.
    pub fn validate(&self, max_height: Height) -> Result<(), NdtreeError> {
        if self.height > max_height {
            return Err(NdtreeError::HeightOutOfRange {
                height: self.height,
                max_height,
            });
        }

        let cells_per_axis = 1u64
            .checked_shl(max_height - self.height)
            .unwrap_or(u64::MAX);
        if !self
            .position
            .all_components(|c| c >= 0 && (c as u64) < cells_per_axis)
        {
            return Err(NdtreeError::PositionOutOfRange {
                position: (0..<PointN<N> as Point>::DIM)
                    .map(|axis| self.position.at(axis))
                    .collect(),
                height: self.height,
                cells_per_axis,
            });
        }

        Ok(())
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
