use crate::IsEmpty;

use ndtree_blocks_core::{tree_math, Height, LinearIndex, MortonPoint, Point, PointN};

use std::marker::PhantomData;
use std::mem;

/// The unit of storage in a `ChunkedNdtree`.
///
/// A chunk stands for one tree node, its "top", and stores the payloads of the `CHUNK_HEIGHT` levels of descendants below it.
/// The slots are packed level by level, nearest level first, and each level is in Morton order. The nodes of the deepest
/// level are the tops of the child chunks, so child `i` is the chunk below the node in slot `i` of that level.
///
/// The children array is either absent as a whole or present as a whole. Entries of a present array may still be empty.
#[derive(Clone, Debug)]
pub struct NdtreeChunk<N, T, const CHUNK_HEIGHT: Height> {
    data: Box<[T]>,
    children: Option<Box<[Option<Box<Self>>]>>,
    marker: PhantomData<N>,
}

impl<N, T, const CHUNK_HEIGHT: Height> NdtreeChunk<N, T, CHUNK_HEIGHT>
where
    PointN<N>: MortonPoint,
{
    const DIM: u32 = <PointN<N> as Point>::DIM as u32;

    /// The number of child chunks, one per node of the deepest level.
    pub const NUM_CHILDREN: usize = tree_math::num_nodes_at_span(Self::DIM, CHUNK_HEIGHT);

    /// The number of payload slots, one per node of every level.
    pub const NUM_INNER_NODES: usize = tree_math::num_nodes_in_spans(Self::DIM, 1, CHUNK_HEIGHT);

    /// Where the slots for the level `span` levels below the top begin.
    #[inline]
    pub fn level_offset(span: Height) -> LinearIndex {
        debug_assert!(span >= 1 && span <= CHUNK_HEIGHT);

        tree_math::num_nodes_above_span(Self::DIM, span)
    }

    /// The slot of the node `span` levels below the top at Morton offset `relative_index` within its level.
    #[inline]
    pub fn slot_index(span: Height, relative_index: LinearIndex) -> LinearIndex {
        debug_assert!(relative_index < tree_math::num_nodes_at_span(Self::DIM, span));

        Self::level_offset(span) + relative_index
    }

    #[inline]
    pub fn data(&self, slot: LinearIndex) -> &T {
        &self.data[slot]
    }

    #[inline]
    pub fn data_mut(&mut self, slot: LinearIndex) -> &mut T {
        &mut self.data[slot]
    }

    /// All payload slots, in slot order.
    #[inline]
    pub fn data_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn has_children_array(&self) -> bool {
        self.children.is_some()
    }

    /// Allocates an array of empty child handles, unless one is already present.
    pub fn allocate_children_array(&mut self) {
        self.children.get_or_insert_with(Self::new_children_array);
    }

    /// Drops the children array along with every chunk it owns.
    #[inline]
    pub fn delete_children_array(&mut self) {
        self.children = None;
    }

    /// The whole children array, if present.
    #[inline]
    pub fn children(&self) -> Option<&[Option<Box<Self>>]> {
        self.children.as_deref()
    }

    #[inline]
    pub fn children_mut(&mut self) -> Option<&mut [Option<Box<Self>>]> {
        self.children.as_deref_mut()
    }

    #[inline]
    pub fn has_child(&self, child_index: LinearIndex) -> bool {
        self.get_child(child_index).is_some()
    }

    #[inline]
    pub fn get_child(&self, child_index: LinearIndex) -> Option<&Self> {
        debug_assert!(child_index < Self::NUM_CHILDREN);

        self.children.as_ref()?[child_index].as_deref()
    }

    #[inline]
    pub fn get_child_mut(&mut self, child_index: LinearIndex) -> Option<&mut Self> {
        debug_assert!(child_index < Self::NUM_CHILDREN);

        self.children.as_mut()?[child_index].as_deref_mut()
    }

    /// Drops the child at `child_index` and its entire subtree. Returns `true` iff there was a child to drop.
    pub fn delete_child(&mut self, child_index: LinearIndex) -> bool {
        debug_assert!(child_index < Self::NUM_CHILDREN);

        match self.children.as_mut() {
            Some(children) => children[child_index].take().is_some(),
            None => false,
        }
    }

    fn new_children_array() -> Box<[Option<Box<Self>>]> {
        (0..Self::NUM_CHILDREN).map(|_| None).collect()
    }

    /// The memory owned directly by this chunk: the chunk itself, its payload slots and its children array (if present).
    /// The child chunks are not included.
    pub fn memory_usage(&self) -> usize {
        let children_array_usage = if self.has_children_array() {
            Self::NUM_CHILDREN * mem::size_of::<Option<Box<Self>>>()
        } else {
            0
        };

        mem::size_of::<Self>() + Self::NUM_INNER_NODES * mem::size_of::<T>() + children_array_usage
    }
}

impl<N, T, const CHUNK_HEIGHT: Height> NdtreeChunk<N, T, CHUNK_HEIGHT>
where
    PointN<N>: MortonPoint,
    T: Default,
{
    /// A chunk with all slots set to `T::default()` and no children array.
    pub fn new() -> Self {
        Self {
            data: (0..Self::NUM_INNER_NODES).map(|_| T::default()).collect(),
            children: None,
            marker: PhantomData,
        }
    }

    /// Allocates a fresh child chunk at `child_index`, allocating the children array first if needed. Any chunk previously
    /// at `child_index` is dropped.
    pub fn allocate_child(&mut self, child_index: LinearIndex) -> &mut Self {
        debug_assert!(child_index < Self::NUM_CHILDREN);

        let children = self.children.get_or_insert_with(Self::new_children_array);

        children[child_index].insert(Box::new(Self::new()))
    }

    /// The child at `child_index`, allocating it (and the children array) first if it's absent.
    pub fn get_or_allocate_child(&mut self, child_index: LinearIndex) -> &mut Self {
        debug_assert!(child_index < Self::NUM_CHILDREN);

        let children = self.children.get_or_insert_with(Self::new_children_array);

        children[child_index].get_or_insert_with(|| Box::new(Self::new()))
    }

    /// Sets every slot back to `T::default()` and drops all children.
    pub fn clear(&mut self) {
        for slot in self.data.iter_mut() {
            *slot = T::default();
        }
        self.delete_children_array();
    }
}

impl<N, T, const CHUNK_HEIGHT: Height> Default for NdtreeChunk<N, T, CHUNK_HEIGHT>
where
    PointN<N>: MortonPoint,
    T: Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<N, T, const CHUNK_HEIGHT: Height> IsEmpty for NdtreeChunk<N, T, CHUNK_HEIGHT>
where
    T: IsEmpty,
{
    /// A chunk is empty when it has no children array and every slot is empty. After a bottom-up prune, a chunk with a
    /// children array always has at least one non-empty descendant, so this is equivalent to the whole subtree being empty.
    fn is_empty(&self) -> bool {
        self.children.is_none() && self.data.iter().all(IsEmpty::is_empty)
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
