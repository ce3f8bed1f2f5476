use ndtree_blocks_core::{Height, MortonPoint, NdtreeError, Point, PointN};

use serde::{Deserialize, Serialize};

/// The shape of a `ChunkedNdtree`. The chunk height is part of the tree's type, so only the height of the tree is configured
/// at runtime.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ChunkedNdtreeConfig {
    /// Height of the root node. The leaves are at height 0.
    pub max_height: Height,
}

impl ChunkedNdtreeConfig {
    pub fn new(max_height: Height) -> Self {
        Self { max_height }
    }

    /// Checks that a tree of this shape can be built from chunks of `chunk_height` levels in `D` dimensions:
    /// - `max_height` must be a positive multiple of `chunk_height`
    /// - every node index must fit in a Morton code, and every leaf position in an `i32`
    pub fn validate<N>(&self, chunk_height: Height) -> Result<(), NdtreeError>
    where
        PointN<N>: MortonPoint,
    {
        let Self { max_height } = *self;

        if chunk_height == 0 || max_height == 0 || max_height % chunk_height != 0 {
            return Err(NdtreeError::InvalidChunkHeight {
                chunk_height,
                max_height,
            });
        }

        let max_encodable_height = <PointN<N> as MortonPoint>::BITS_PER_COMPONENT.min(i32::BITS - 1);
        if max_height > max_encodable_height {
            return Err(NdtreeError::MortonCodeOverflow {
                dim: <PointN<N> as Point>::DIM as u32,
                max_height,
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
