//! Depth-first traversals over the chunks of a `ChunkedNdtree`.
//!
//! The iterators are lazy and borrow the tree, so they can't observe structural mutation. Mutable traversal goes through
//! `visit_chunks_in_postorder_mut`, because a mutable postorder iterator would hand out a parent while its children were
//! still borrowed.

use super::NdtreeChunk;

use ndtree_blocks_core::{Height, MortonPoint, PointN};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VisitStatus {
    /// Continue traversing this branch.
    Continue,
    /// Stop traversing this branch.
    Stop,
    /// Stop traversing the entire tree. No further chunks will be visited.
    ExitEarly,
}

/// Yields every chunk before any of its children. Children are yielded in order of their child index.
pub struct ChunkPreorderIter<'a, N, T, const CHUNK_HEIGHT: Height> {
    stack: Vec<&'a NdtreeChunk<N, T, CHUNK_HEIGHT>>,
}

impl<'a, N, T, const CHUNK_HEIGHT: Height> ChunkPreorderIter<'a, N, T, CHUNK_HEIGHT> {
    pub fn new(root: &'a NdtreeChunk<N, T, CHUNK_HEIGHT>) -> Self {
        Self { stack: vec![root] }
    }
}

impl<'a, N, T, const CHUNK_HEIGHT: Height> Iterator for ChunkPreorderIter<'a, N, T, CHUNK_HEIGHT>
where
    PointN<N>: MortonPoint,
{
    type Item = &'a NdtreeChunk<N, T, CHUNK_HEIGHT>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.stack.pop()?;
        if let Some(children) = chunk.children() {
            // Reversed so the lowest child index is popped first.
            self.stack
                .extend(children.iter().rev().filter_map(|child| child.as_deref()));
        }

        Some(chunk)
    }
}

/// Yields every chunk after all of its children. Children are yielded in order of their child index.
pub struct ChunkPostorderIter<'a, N, T, const CHUNK_HEIGHT: Height> {
    // Each entry is a chunk and the child index to resume its scan from.
    stack: Vec<(&'a NdtreeChunk<N, T, CHUNK_HEIGHT>, usize)>,
}

impl<'a, N, T, const CHUNK_HEIGHT: Height> ChunkPostorderIter<'a, N, T, CHUNK_HEIGHT> {
    pub fn new(root: &'a NdtreeChunk<N, T, CHUNK_HEIGHT>) -> Self {
        Self {
            stack: vec![(root, 0)],
        }
    }
}

impl<'a, N, T, const CHUNK_HEIGHT: Height> Iterator for ChunkPostorderIter<'a, N, T, CHUNK_HEIGHT>
where
    PointN<N>: MortonPoint,
{
    type Item = &'a NdtreeChunk<N, T, CHUNK_HEIGHT>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (chunk, resume_from) = self.stack.last_mut()?;
            let chunk: &'a NdtreeChunk<N, T, CHUNK_HEIGHT> = *chunk;

            let next_child = chunk.children().and_then(|children| {
                children[*resume_from..]
                    .iter()
                    .enumerate()
                    .find_map(|(offset, child)| child.as_deref().map(|c| (offset, c)))
            });

            match next_child {
                Some((offset, child)) => {
                    *resume_from += offset + 1;
                    self.stack.push((child, 0));
                }
                None => {
                    self.stack.pop();
                    return Some(chunk);
                }
            }
        }
    }
}

impl<N, T, const CHUNK_HEIGHT: Height> NdtreeChunk<N, T, CHUNK_HEIGHT>
where
    PointN<N>: MortonPoint,
{
    /// Visit this chunk and all of its descendants. This is a pre-order traversal.
    pub fn visit_self_and_descendants_in_preorder(
        &self,
        visitor: &mut impl FnMut(&Self) -> VisitStatus,
    ) -> VisitStatus {
        let status = visitor(self);
        if status != VisitStatus::Continue {
            return status;
        }

        if let Some(children) = self.children() {
            for child in children.iter().filter_map(|child| child.as_deref()) {
                if child.visit_self_and_descendants_in_preorder(visitor) == VisitStatus::ExitEarly {
                    return VisitStatus::ExitEarly;
                }
            }
        }

        VisitStatus::Continue
    }

    /// Visit this chunk and all of its descendants, children first, with mutable access. A chunk is only visited after
    /// `visitor` has already returned for each of its children, so `visitor` may restructure the children of the chunk it is
    /// given.
    pub fn visit_self_and_descendants_in_postorder_mut(&mut self, visitor: &mut impl FnMut(&mut Self)) {
        if let Some(children) = self.children_mut() {
            for child in children.iter_mut().filter_map(|child| child.as_deref_mut()) {
                child.visit_self_and_descendants_in_postorder_mut(visitor);
            }
        }

        visitor(self)
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
