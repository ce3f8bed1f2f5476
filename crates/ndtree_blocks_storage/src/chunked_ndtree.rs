//! A sparse `2^D`-ary tree that stores a payload for every node, allocating storage in chunks of several levels at a time.
//!
//! The tree behaves like a perfect tree of height `max_height` where every node starts out with `T::default()`. Only the
//! chunks on the paths to written nodes are ever allocated, and `prune` drops the chunks whose payloads have all gone back
//! to being empty.
//!
//! # Example
//!
//! ```
//! use ndtree_blocks_core::prelude::*;
//! use ndtree_blocks_storage::prelude::*;
//!
//! // Chunks of 2 levels each, 3 chunks deep.
//! let mut tree = ChunkedOctree::<f32, 2>::new(ChunkedNdtreeConfig::new(6));
//!
//! let leaf = OctreeIndex::new(0, PointN([33, 7, 60]));
//! assert!(!tree.has_node(&leaf));
//! assert_eq!(tree.get_node_data(&leaf), None);
//!
//! *tree.get_or_allocate_node_data(&leaf) = 0.5;
//! assert!(tree.has_node(&leaf.parent()));
//! assert_eq!(tree.get_node_data(&leaf), Some(&0.5));
//!
//! // Once the only written value is reset, pruning reclaims every chunk below the root chunk.
//! tree.reset_node(&leaf);
//! tree.prune();
//! assert!(!tree.has_node(&leaf));
//! assert_eq!(tree.iter_chunks_preorder().count(), 1);
//! ```
//!
//! # Storage
//!
//! Each `NdtreeChunk` represents the `CHUNK_HEIGHT` levels below its top node, so the root chunk holds heights
//! `[max_height - CHUNK_HEIGHT, max_height)` and the payload of the root node itself is kept by the tree. Resolving an
//! index takes one hop per chunk boundary, reading the child index of every hop straight out of the index's Morton code.

mod chunk;
mod config;
mod traversal;

pub use chunk::*;
pub use config::*;
pub use traversal::*;

use crate::IsEmpty;

use ndtree_blocks_core::{
    tree_math, Height, LinearIndex, MortonCode, MortonPoint, NdtreeError, NdtreeIndex, Point, PointN,
};

use std::marker::PhantomData;
#[cfg(feature = "tracing")]
use tracing::{debug, trace};

/// A sparse tree over `PointN<N>` positions with a `T` payload on every node. `CHUNK_HEIGHT` levels are allocated at a
/// time.
#[derive(Clone, Debug)]
pub struct ChunkedNdtree<N, T, const CHUNK_HEIGHT: Height> {
    max_height: Height,
    root_data: T,
    root_chunk: NdtreeChunk<N, T, CHUNK_HEIGHT>,
}

/// A 2D `ChunkedNdtree`.
pub type ChunkedQuadtree<T, const CHUNK_HEIGHT: Height> = ChunkedNdtree<[i32; 2], T, CHUNK_HEIGHT>;

/// A 3D `ChunkedNdtree`.
pub type ChunkedOctree<T, const CHUNK_HEIGHT: Height> = ChunkedNdtree<[i32; 3], T, CHUNK_HEIGHT>;

impl<N, T, const CHUNK_HEIGHT: Height> ChunkedNdtree<N, T, CHUNK_HEIGHT>
where
    PointN<N>: MortonPoint,
    T: Default,
{
    /// Creates an empty tree.
    ///
    /// # Panics
    ///
    /// If `config` is not valid for this dimension and `CHUNK_HEIGHT`. See `ChunkedNdtreeConfig::validate`.
    pub fn new(config: ChunkedNdtreeConfig) -> Self {
        if let Err(e) = config.validate::<N>(CHUNK_HEIGHT) {
            panic!("Invalid tree config {:?}: {}", config, e);
        }

        Self::new_unchecked(config.max_height)
    }

    /// Creates an empty tree, or returns why `config` is not valid for this dimension and `CHUNK_HEIGHT`.
    pub fn try_new(config: ChunkedNdtreeConfig) -> Result<Self, NdtreeError> {
        config.validate::<N>(CHUNK_HEIGHT)?;

        Ok(Self::new_unchecked(config.max_height))
    }

    fn new_unchecked(max_height: Height) -> Self {
        #[cfg(feature = "tracing")]
        debug!(
            max_height,
            chunk_height = CHUNK_HEIGHT,
            num_inner_nodes = NdtreeChunk::<N, T, CHUNK_HEIGHT>::NUM_INNER_NODES,
            num_children = NdtreeChunk::<N, T, CHUNK_HEIGHT>::NUM_CHILDREN,
            "Creating chunked ndtree"
        );

        Self {
            max_height,
            root_data: T::default(),
            root_chunk: NdtreeChunk::new(),
        }
    }

    /// Allocates every chunk on the path to `index`. Payloads are left as they are, so newly allocated nodes hold
    /// `T::default()`.
    pub fn allocate_node(&mut self, index: &NdtreeIndex<N>) {
        self.debug_check_index(index);

        if index.height < self.max_height {
            self.allocate_chunk_and_slot(index);
        }
    }

    /// Sets the payload of `index` back to `T::default()` if the node is allocated.
    ///
    /// This only resets the payload of the node itself. Its descendants keep their payloads and their chunks stay
    /// allocated.
    pub fn reset_node(&mut self, index: &NdtreeIndex<N>) {
        if let Some(data) = self.get_node_data_mut(index, false) {
            *data = T::default();
        }
    }

    /// Mutable access to the payload of `index`. If the node isn't allocated, it is allocated first when `auto_allocate` is
    /// set, otherwise `None` is returned.
    pub fn get_node_data_mut(&mut self, index: &NdtreeIndex<N>, auto_allocate: bool) -> Option<&mut T> {
        if auto_allocate {
            return Some(self.get_or_allocate_node_data(index));
        }

        self.debug_check_index(index);

        if index.height == self.max_height {
            return Some(&mut self.root_data);
        }

        let (chunk, slot) = self.find_chunk_and_slot_mut(index)?;

        Some(chunk.data_mut(slot))
    }

    /// Mutable access to the payload of `index`, allocating the node first if necessary.
    pub fn get_or_allocate_node_data(&mut self, index: &NdtreeIndex<N>) -> &mut T {
        self.debug_check_index(index);

        if index.height == self.max_height {
            return &mut self.root_data;
        }

        let (chunk, slot) = self.allocate_chunk_and_slot(index);

        chunk.data_mut(slot)
    }

    /// Drops every chunk below the root chunk and resets all remaining payloads.
    pub fn clear(&mut self) {
        self.root_data = T::default();
        self.root_chunk.clear();
    }

    fn allocate_chunk_and_slot(
        &mut self,
        index: &NdtreeIndex<N>,
    ) -> (&mut NdtreeChunk<N, T, CHUNK_HEIGHT>, LinearIndex) {
        let mut descent = ChunkDescent::<N, CHUNK_HEIGHT>::new(index, self.max_height);
        let mut chunk = &mut self.root_chunk;
        while let Some(child_index) = descent.next() {
            #[cfg(feature = "tracing")]
            if !chunk.has_child(child_index) {
                trace!(
                    child_index,
                    top_height = descent.parent_height,
                    "Allocating chunk"
                );
            }
            chunk = chunk.get_or_allocate_child(child_index);
        }

        (chunk, descent.slot::<T>())
    }
}

impl<N, T, const CHUNK_HEIGHT: Height> ChunkedNdtree<N, T, CHUNK_HEIGHT>
where
    PointN<N>: MortonPoint,
{
    /// The height of the root node.
    #[inline]
    pub fn max_height(&self) -> Height {
        self.max_height
    }

    /// The configuration this tree was built from.
    #[inline]
    pub fn config(&self) -> ChunkedNdtreeConfig {
        ChunkedNdtreeConfig::new(self.max_height)
    }

    /// The payload of the root node, which is always allocated.
    #[inline]
    pub fn root_data(&self) -> &T {
        &self.root_data
    }

    #[inline]
    pub fn root_data_mut(&mut self) -> &mut T {
        &mut self.root_data
    }

    /// The chunk holding the `CHUNK_HEIGHT` levels below the root node.
    #[inline]
    pub fn root_chunk(&self) -> &NdtreeChunk<N, T, CHUNK_HEIGHT> {
        &self.root_chunk
    }

    #[inline]
    pub fn root_chunk_mut(&mut self) -> &mut NdtreeChunk<N, T, CHUNK_HEIGHT> {
        &mut self.root_chunk
    }

    /// Returns `true` iff the chunk storing `index` is allocated.
    pub fn has_node(&self, index: &NdtreeIndex<N>) -> bool {
        self.debug_check_index(index);

        index.height == self.max_height || self.find_chunk_and_slot(index).is_some()
    }

    /// The payload of `index`, or `None` if the node isn't allocated.
    pub fn get_node_data(&self, index: &NdtreeIndex<N>) -> Option<&T> {
        self.debug_check_index(index);

        if index.height == self.max_height {
            return Some(&self.root_data);
        }

        let (chunk, slot) = self.find_chunk_and_slot(index)?;

        Some(chunk.data(slot))
    }

    /// The number of payload slots in all allocated chunks. This counts every slot, empty or not.
    pub fn size(&self) -> usize {
        self.iter_chunks_preorder().count() * NdtreeChunk::<N, T, CHUNK_HEIGHT>::NUM_INNER_NODES
    }

    /// The number of bytes used by all allocated chunks, excluding the tree's own fields.
    pub fn memory_usage(&self) -> usize {
        self.iter_chunks_preorder().map(NdtreeChunk::memory_usage).sum()
    }

    /// Iterates over all allocated chunks, each before its children.
    pub fn iter_chunks_preorder(&self) -> ChunkPreorderIter<'_, N, T, CHUNK_HEIGHT> {
        ChunkPreorderIter::new(&self.root_chunk)
    }

    /// Iterates over all allocated chunks, each after its children.
    pub fn iter_chunks_postorder(&self) -> ChunkPostorderIter<'_, N, T, CHUNK_HEIGHT> {
        ChunkPostorderIter::new(&self.root_chunk)
    }

    /// Visits all allocated chunks in preorder. See `VisitStatus` for how the traversal can be cut short.
    pub fn visit_chunks_in_preorder(
        &self,
        mut visitor: impl FnMut(&NdtreeChunk<N, T, CHUNK_HEIGHT>) -> VisitStatus,
    ) -> VisitStatus {
        self.root_chunk
            .visit_self_and_descendants_in_preorder(&mut visitor)
    }

    /// Visits all allocated chunks in postorder with mutable access.
    pub fn visit_chunks_in_postorder_mut(
        &mut self,
        mut visitor: impl FnMut(&mut NdtreeChunk<N, T, CHUNK_HEIGHT>),
    ) {
        self.root_chunk
            .visit_self_and_descendants_in_postorder_mut(&mut visitor)
    }

    /// Visits every allocated node along with its index: the root node first, then the nodes of every chunk in preorder.
    /// Within a chunk, nodes are visited level by level from the top, each level in Morton order.
    pub fn for_each_node(&self, mut visitor: impl FnMut(&NdtreeIndex<N>, &T)) {
        let root = NdtreeIndex::root(self.max_height);
        visitor(&root, &self.root_data);

        let dim = <PointN<N> as Point>::DIM as u32;
        let mut stack = vec![(&self.root_chunk, root)];
        while let Some((chunk, top)) = stack.pop() {
            let mut slots = chunk.data_slice().iter();
            for span in 1..=CHUNK_HEIGHT {
                for relative_index in 0..tree_math::num_nodes_at_span(dim, span) {
                    if let Some(data) = slots.next() {
                        visitor(&top.descendant(span, relative_index), data);
                    }
                }
            }

            if let Some(children) = chunk.children() {
                for (child_index, child) in children.iter().enumerate().rev() {
                    if let Some(child) = child.as_deref() {
                        stack.push((child, top.descendant(CHUNK_HEIGHT, child_index)));
                    }
                }
            }
        }
    }

    fn find_chunk_and_slot(
        &self,
        index: &NdtreeIndex<N>,
    ) -> Option<(&NdtreeChunk<N, T, CHUNK_HEIGHT>, LinearIndex)> {
        let mut descent = ChunkDescent::<N, CHUNK_HEIGHT>::new(index, self.max_height);
        let mut chunk = &self.root_chunk;
        for child_index in &mut descent {
            chunk = chunk.get_child(child_index)?;
        }

        Some((chunk, descent.slot::<T>()))
    }

    fn find_chunk_and_slot_mut(
        &mut self,
        index: &NdtreeIndex<N>,
    ) -> Option<(&mut NdtreeChunk<N, T, CHUNK_HEIGHT>, LinearIndex)> {
        let mut descent = ChunkDescent::<N, CHUNK_HEIGHT>::new(index, self.max_height);
        let mut chunk = &mut self.root_chunk;
        for child_index in &mut descent {
            chunk = chunk.get_child_mut(child_index)?;
        }

        Some((chunk, descent.slot::<T>()))
    }

    #[inline]
    fn debug_check_index(&self, index: &NdtreeIndex<N>) {
        debug_assert!(
            index.is_valid_for(self.max_height),
            "Node at height {} with position {:?} is not in a tree with max height {}",
            index.height,
            index.position,
            self.max_height
        );
    }
}

impl<N, T, const CHUNK_HEIGHT: Height> ChunkedNdtree<N, T, CHUNK_HEIGHT>
where
    PointN<N>: MortonPoint,
    T: IsEmpty,
{
    /// Returns `true` iff the root payload and every payload of the root chunk are empty, and no chunk below the root chunk
    /// is allocated. A children array without any children doesn't count.
    pub fn is_empty(&self) -> bool {
        let has_children = self
            .root_chunk
            .children()
            .map_or(false, |children| children.iter().any(Option::is_some));

        self.root_data.is_empty()
            && !has_children
            && self.root_chunk.data_slice().iter().all(IsEmpty::is_empty)
    }

    /// Drops every chunk whose subtree holds only empty payloads. The payloads of all other nodes are kept, and so are
    /// the chunks on the path to them.
    pub fn prune(&mut self) {
        #[cfg(feature = "tracing")]
        let chunks_before = self.iter_chunks_preorder().count();

        // Postorder, so each child has already collapsed as far as it can by the time its parent checks it.
        self.visit_chunks_in_postorder_mut(|chunk| {
            let mut has_non_empty_child = false;
            if let Some(children) = chunk.children_mut() {
                for child in children.iter_mut() {
                    match child.as_deref().map(IsEmpty::is_empty) {
                        Some(true) => *child = None,
                        Some(false) => has_non_empty_child = true,
                        None => (),
                    }
                }
            }
            if !has_non_empty_child {
                chunk.delete_children_array();
            }
        });

        #[cfg(feature = "tracing")]
        debug!(
            chunks_before,
            chunks_after = self.iter_chunks_preorder().count(),
            "Pruned chunked ndtree"
        );
    }
}

/// The chunk boundaries crossed on the way from the root chunk to the chunk storing some index. Yields the child index of
/// every hop, after which `slot` is the index's slot in the final chunk.
struct ChunkDescent<N, const CHUNK_HEIGHT: Height> {
    code: MortonCode,
    target_height: Height,
    /// The height of the top of the current chunk.
    parent_height: Height,
    marker: PhantomData<N>,
}

impl<N, const CHUNK_HEIGHT: Height> ChunkDescent<N, CHUNK_HEIGHT>
where
    PointN<N>: MortonPoint,
{
    fn new(index: &NdtreeIndex<N>, max_height: Height) -> Self {
        debug_assert!(index.height < max_height);

        Self {
            code: index.to_morton(),
            target_height: index.height,
            parent_height: max_height,
            marker: PhantomData,
        }
    }

    fn slot<T>(&self) -> LinearIndex {
        let span = self.parent_height - self.target_height;
        let relative_index = NdtreeIndex::<N>::compute_relative_child_index(
            self.code,
            self.parent_height,
            self.target_height,
        );

        NdtreeChunk::<N, T, CHUNK_HEIGHT>::slot_index(span, relative_index)
    }
}

impl<N, const CHUNK_HEIGHT: Height> Iterator for ChunkDescent<N, CHUNK_HEIGHT>
where
    PointN<N>: MortonPoint,
{
    type Item = LinearIndex;

    fn next(&mut self) -> Option<LinearIndex> {
        let child_height = self.parent_height - CHUNK_HEIGHT;
        if self.target_height >= child_height {
            return None;
        }

        let child_index =
            NdtreeIndex::<N>::compute_relative_child_index(self.code, self.parent_height, child_height);
        self.parent_height = child_height;

        Some(child_index)
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝

#[cfg(test)]
mod tests {
    use super::*;

    use ndtree_blocks_core::{OctreeIndex, QuadtreeIndex};
    use utilities::test::{random_index, random_indices};

    use pretty_assertions::assert_eq;
    use rand::Rng;
    use std::collections::HashMap;
    use std::ptr;

    const MAX_HEIGHT: Height = 6;

    fn octree<const CHUNK_HEIGHT: Height>() -> ChunkedOctree<f32, CHUNK_HEIGHT> {
        ChunkedOctree::new(ChunkedNdtreeConfig::new(MAX_HEIGHT))
    }

    #[test]
    fn allocated_nodes_are_present() {
        let mut rng = rand::thread_rng();
        let mut tree = octree::<2>();
        let indices: Vec<OctreeIndex> = random_indices(&mut rng, MAX_HEIGHT, 200);

        for index in indices.iter() {
            tree.allocate_node(index);
            assert!(tree.has_node(index));
        }
        for index in indices.iter() {
            assert!(tree.has_node(index));
            assert_eq!(tree.get_node_data(index), Some(&0.0));
        }
    }

    #[test]
    fn allocating_a_node_allocates_its_ancestors() {
        let mut tree = octree::<3>();
        let leaf = OctreeIndex::new(0, PointN([9, 40, 63]));

        tree.allocate_node(&leaf);
        for height in 0..=MAX_HEIGHT {
            assert!(tree.has_node(&leaf.ancestor(height)));
        }
        assert!(!tree.has_node(&OctreeIndex::new(0, PointN([9, 40, 0]))));
        assert_eq!(tree.iter_chunks_preorder().count(), 2);
    }

    #[test]
    fn root_node_is_always_allocated() {
        let mut tree = octree::<2>();
        let root = OctreeIndex::root(MAX_HEIGHT);

        assert!(tree.has_node(&root));
        assert_eq!(tree.get_node_data(&root), Some(&0.0));

        *tree.get_or_allocate_node_data(&root) = 2.0;
        assert_eq!(tree.root_data(), &2.0);
        assert!(!tree.is_empty());

        tree.prune();
        assert_eq!(tree.get_node_data(&root), Some(&2.0));

        tree.reset_node(&root);
        assert!(tree.is_empty());
        assert!(tree.has_node(&root));
    }

    #[test]
    fn reset_keeps_node_allocated() {
        let mut rng = rand::thread_rng();
        let mut tree = octree::<2>();

        for _ in 0..100 {
            let height = rng.gen_range(0..MAX_HEIGHT);
            let index: OctreeIndex = random_index(&mut rng, MAX_HEIGHT, height);
            *tree.get_or_allocate_node_data(&index) = rng.gen_range(1.0..10.0);

            tree.reset_node(&index);
            assert!(tree.has_node(&index));
            assert_eq!(tree.get_node_data(&index), Some(&0.0));
        }
    }

    #[test]
    fn reset_does_not_touch_descendants() {
        let mut tree = octree::<2>();
        let leaf = OctreeIndex::new(0, PointN([17, 2, 30]));
        let ancestors = [leaf.parent(), leaf.ancestor(2), leaf.ancestor(3)];

        *tree.get_or_allocate_node_data(&leaf) = 1.0;
        for ancestor in ancestors.iter() {
            *tree.get_node_data_mut(ancestor, false).unwrap() = 3.0;
        }
        let chunks_before = tree.iter_chunks_preorder().count();

        for ancestor in ancestors.iter() {
            tree.reset_node(ancestor);
            assert_eq!(tree.get_node_data(ancestor), Some(&0.0));
        }

        assert_eq!(tree.get_node_data(&leaf), Some(&1.0));
        assert_eq!(tree.iter_chunks_preorder().count(), chunks_before);
    }

    #[test]
    fn reset_does_not_allocate() {
        let mut tree = octree::<2>();
        let leaf = OctreeIndex::new(0, PointN([1, 2, 3]));

        tree.reset_node(&leaf);
        assert!(!tree.has_node(&leaf));
        assert_eq!(tree.get_node_data_mut(&leaf, false), None);
        assert_eq!(tree.iter_chunks_preorder().count(), 1);
    }

    #[test]
    fn prune_is_idempotent() {
        let mut rng = rand::thread_rng();
        let mut tree = octree::<2>();

        for index in random_indices::<[i32; 3], _>(&mut rng, MAX_HEIGHT, 300) {
            // About half of the writes leave the node empty.
            let value = if rng.gen() { rng.gen_range(1.0..10.0) } else { 0.0 };
            *tree.get_or_allocate_node_data(&index) = value;
        }

        tree.prune();
        let size = tree.size();
        let memory_usage = tree.memory_usage();

        tree.prune();
        assert_eq!(tree.size(), size);
        assert_eq!(tree.memory_usage(), memory_usage);
    }

    #[test]
    fn pruned_region_has_no_nodes() {
        let mut rng = rand::thread_rng();
        let mut tree = octree::<2>();
        let kept_leaf = OctreeIndex::new(0, PointN([0, 0, 0]));
        let dropped_leaf = OctreeIndex::new(0, PointN([63, 63, 63]));
        // Top of the first chunk below the root chunk on the path to `dropped_leaf`.
        let region_top = dropped_leaf.ancestor(MAX_HEIGHT - 2);

        *tree.get_or_allocate_node_data(&kept_leaf) = 1.0;
        *tree.get_or_allocate_node_data(&dropped_leaf) = 1.0;
        tree.reset_node(&dropped_leaf);
        tree.prune();

        for _ in 0..1000 {
            let span = rng.gen_range(1..=region_top.height);
            let relative_index = rng.gen_range(0..tree_math::num_nodes_at_span(3, span));
            let index = region_top.descendant(span, relative_index);

            assert!(!tree.has_node(&index), "{:?} is still allocated", index);
            assert_eq!(tree.get_node_data(&index), None);
        }

        assert!(tree.has_node(&region_top));
        assert!(tree.has_node(&kept_leaf.ancestor(2)));
        assert_eq!(tree.get_node_data(&kept_leaf), Some(&1.0));
    }

    #[test]
    fn is_empty_ignores_children_array_without_children() {
        let mut tree = octree::<2>();
        tree.root_chunk_mut().allocate_children_array();
        assert!(tree.is_empty());

        tree.allocate_node(&OctreeIndex::new(0, PointN([1, 2, 3])));
        assert!(!tree.is_empty());
        tree.prune();
        assert!(tree.is_empty());

        *tree.get_or_allocate_node_data(&OctreeIndex::new(5, PointN([1, 0, 1]))) = 1.0;
        assert!(!tree.is_empty());
    }

    #[test]
    fn tree_preorder_visitor_matches_iterator() {
        type Chunk = NdtreeChunk<[i32; 3], f32, 2>;

        let mut rng = rand::thread_rng();
        let mut tree = octree::<2>();
        for index in random_indices::<[i32; 3], _>(&mut rng, MAX_HEIGHT, 50) {
            tree.allocate_node(&index);
        }
        tree.allocate_node(&OctreeIndex::new(0, PointN([5, 6, 7])));

        let expected: Vec<*const Chunk> = tree.iter_chunks_preorder().map(|c| c as *const Chunk).collect();
        let mut visited = Vec::new();
        let status = tree.visit_chunks_in_preorder(|c| {
            visited.push(c as *const Chunk);
            VisitStatus::Continue
        });
        assert_eq!(status, VisitStatus::Continue);
        assert_eq!(visited, expected);

        let mut num_visited = 0;
        let status = tree.visit_chunks_in_preorder(|_| {
            num_visited += 1;
            VisitStatus::ExitEarly
        });
        assert_eq!(status, VisitStatus::ExitEarly);
        assert_eq!(num_visited, 1);

        // Stopping at the root chunk skips all of its descendants.
        let mut num_visited = 0;
        tree.visit_chunks_in_preorder(|_| {
            num_visited += 1;
            VisitStatus::Stop
        });
        assert_eq!(num_visited, 1);
    }

    #[test]
    fn prune_collapses_empty_subtrees() {
        let mut tree = octree::<2>();
        let leaf = OctreeIndex::new(0, PointN([63, 0, 5]));
        let sibling_leaf = OctreeIndex::new(0, PointN([62, 0, 5]));

        tree.allocate_node(&leaf);
        tree.allocate_node(&sibling_leaf);
        assert_eq!(tree.iter_chunks_preorder().count(), 3);

        tree.prune();
        assert!(!tree.has_node(&leaf));
        assert!(!tree.has_node(&sibling_leaf));
        assert!(!tree.root_chunk().has_children_array());
        assert!(tree.is_empty());

        // Nodes in the root chunk are never deallocated.
        assert!(tree.has_node(&leaf.ancestor(MAX_HEIGHT - 2)));

        tree.allocate_node(&leaf);
        assert!(tree.has_node(&leaf));
        assert_eq!(tree.get_node_data(&leaf), Some(&0.0));
    }

    #[test]
    fn prune_keeps_chunks_with_non_empty_payloads() {
        let mut tree = octree::<2>();
        let leaf = OctreeIndex::new(0, PointN([63, 0, 5]));
        let middle = leaf.ancestor(2);

        *tree.get_or_allocate_node_data(&leaf) = 1.0;
        *tree.get_or_allocate_node_data(&middle) = 2.0;
        tree.prune();
        assert_eq!(tree.iter_chunks_preorder().count(), 3);

        // The middle chunk holds a value of its own, so it survives losing its only child.
        tree.reset_node(&leaf);
        tree.prune();
        assert_eq!(tree.iter_chunks_preorder().count(), 2);
        assert!(!tree.has_node(&leaf));
        assert_eq!(tree.get_node_data(&middle), Some(&2.0));
    }

    #[test]
    fn size_counts_slots_of_all_chunks() {
        let mut rng = rand::thread_rng();
        let mut tree = octree::<3>();
        assert_eq!(tree.size(), NdtreeChunk::<[i32; 3], f32, 3>::NUM_INNER_NODES);

        for index in random_indices::<[i32; 3], _>(&mut rng, MAX_HEIGHT, 50) {
            tree.allocate_node(&index);
        }

        assert_eq!(
            tree.size(),
            tree.iter_chunks_preorder().count() * NdtreeChunk::<[i32; 3], f32, 3>::NUM_INNER_NODES
        );
        assert_eq!(
            tree.iter_chunks_preorder().count(),
            tree.iter_chunks_postorder().count()
        );
    }

    #[test]
    fn pruned_empty_tree_uses_one_bare_chunk() {
        let mut rng = rand::thread_rng();
        let mut tree = octree::<2>();

        let indices: Vec<OctreeIndex> = random_indices(&mut rng, MAX_HEIGHT, 100);
        for index in indices.iter() {
            *tree.get_or_allocate_node_data(index) = 1.0;
        }
        for index in indices.iter() {
            tree.reset_node(index);
        }
        tree.prune();

        assert_eq!(
            tree.memory_usage(),
            NdtreeChunk::<[i32; 3], f32, 2>::new().memory_usage()
        );
    }

    #[test]
    fn clear_drops_all_chunks() {
        let mut rng = rand::thread_rng();
        let mut tree = octree::<2>();
        for index in random_indices::<[i32; 3], _>(&mut rng, MAX_HEIGHT, 50) {
            *tree.get_or_allocate_node_data(&index) = 1.0;
        }

        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.iter_chunks_preorder().count(), 1);
    }

    /// Walks one tree level per step, reading the child index at every level from the position bits.
    fn naive_find_chunk_and_slot<'a>(
        tree: &'a ChunkedOctree<f32, 1>,
        index: &OctreeIndex,
    ) -> Option<(&'a NdtreeChunk<[i32; 3], f32, 1>, LinearIndex)> {
        let mut chunk = tree.root_chunk();
        let mut height = tree.max_height();
        loop {
            let next = index.ancestor(height - 1);
            let p = next.position;
            let child_index = ((p.x() & 1) | (p.y() & 1) << 1 | (p.z() & 1) << 2) as LinearIndex;
            if next.height == index.height {
                return Some((chunk, child_index));
            }
            chunk = chunk.get_child(child_index)?;
            height -= 1;
        }
    }

    #[test]
    fn unit_chunk_height_matches_naive_descent() {
        let mut rng = rand::thread_rng();
        let mut tree = octree::<1>();

        for index in random_indices::<[i32; 3], _>(&mut rng, MAX_HEIGHT, 100) {
            *tree.get_or_allocate_node_data(&index) = 1.0;
        }

        for _ in 0..1000 {
            let height = rng.gen_range(0..MAX_HEIGHT);
            let index: OctreeIndex = random_index(&mut rng, MAX_HEIGHT, height);
            let resolved = tree.find_chunk_and_slot(&index);
            let expected = naive_find_chunk_and_slot(&tree, &index);

            let same = match (resolved, expected) {
                (Some((c1, s1)), Some((c2, s2))) => ptr::eq(c1, c2) && s1 == s2,
                (None, None) => true,
                _ => false,
            };
            assert!(same, "Resolution mismatch for {:?}", index);
        }
    }

    fn round_trip_after_prune<N, const CHUNK_HEIGHT: Height>(max_height: Height)
    where
        PointN<N>: MortonPoint,
        NdtreeIndex<N>: std::hash::Hash + Eq,
    {
        let mut rng = rand::thread_rng();
        let mut tree =
            ChunkedNdtree::<N, f32, CHUNK_HEIGHT>::new(ChunkedNdtreeConfig::new(max_height));

        let mut written = HashMap::new();
        for index in random_indices::<N, _>(&mut rng, max_height, 300) {
            let value = rng.gen_range(1.0..100.0);
            *tree.get_or_allocate_node_data(&index) = value;
            written.insert(index, value);
        }

        tree.prune();

        for (index, value) in written.iter() {
            assert_eq!(tree.get_node_data(index), Some(value));
        }
        for index in random_indices::<N, _>(&mut rng, max_height, 300) {
            if !written.contains_key(&index) {
                assert_eq!(tree.get_node_data(&index).copied().unwrap_or_default(), 0.0);
            }
        }
    }

    #[test]
    fn octree_round_trip_after_prune() {
        round_trip_after_prune::<[i32; 3], 2>(MAX_HEIGHT);
        round_trip_after_prune::<[i32; 3], 3>(MAX_HEIGHT);
    }

    #[test]
    fn quadtree_round_trip_after_prune() {
        round_trip_after_prune::<[i32; 2], 3>(9);
        round_trip_after_prune::<[i32; 2], 1>(8);
    }

    #[test]
    fn for_each_node_reports_written_values() {
        let mut rng = rand::thread_rng();
        let mut tree = ChunkedQuadtree::<u32, 2>::new(ChunkedNdtreeConfig::new(8));

        let mut expected = HashMap::new();
        for (i, index) in random_indices::<[i32; 2], _>(&mut rng, 8, 100)
            .into_iter()
            .enumerate()
        {
            *tree.get_or_allocate_node_data(&index) = i as u32 + 1;
            expected.insert(index, i as u32 + 1);
        }

        let mut visited = HashMap::new();
        let mut num_visited = 0;
        tree.for_each_node(|index, value| {
            num_visited += 1;
            if *value != 0 {
                visited.insert(*index, *value);
            }
        });

        assert_eq!(visited, expected);
        assert_eq!(num_visited, tree.size() + 1);
    }

    #[test]
    fn for_each_node_starts_at_root() {
        let tree = ChunkedQuadtree::<u8, 1>::new(ChunkedNdtreeConfig::new(3));

        let mut indices = Vec::new();
        tree.for_each_node(|index, _| indices.push(*index));

        assert_eq!(
            indices,
            vec![
                QuadtreeIndex::root(3),
                QuadtreeIndex::new(2, PointN([0, 0])),
                QuadtreeIndex::new(2, PointN([1, 0])),
                QuadtreeIndex::new(2, PointN([0, 1])),
                QuadtreeIndex::new(2, PointN([1, 1])),
            ]
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(ChunkedOctree::<f32, 4>::try_new(ChunkedNdtreeConfig::new(6)).is_err());
        assert!(ChunkedOctree::<f32, 2>::try_new(ChunkedNdtreeConfig::new(24)).is_err());
        assert!(ChunkedQuadtree::<f32, 4>::try_new(ChunkedNdtreeConfig::new(28)).is_ok());
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "is not in a tree with max height")]
    fn out_of_range_index_is_caught_in_debug_builds() {
        let tree = octree::<2>();

        tree.has_node(&OctreeIndex::new(0, PointN([64, 0, 0])));
    }

    #[test]
    #[should_panic]
    fn new_panics_on_invalid_config() {
        ChunkedOctree::<f32, 4>::new(ChunkedNdtreeConfig::new(6));
    }
}
