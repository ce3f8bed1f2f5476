use crate::Height;

use thiserror::Error;

/// Reasons a tree shape or a node index is rejected. Hot-path tree operations never return these; validate once at the
/// boundary and address nodes freely afterwards.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum NdtreeError {
    #[error("height {height} exceeds the max height {max_height}")]
    HeightOutOfRange { height: Height, max_height: Height },

    #[error("position {position:?} at height {height} is outside [0, {cells_per_axis}) on some axis")]
    PositionOutOfRange {
        position: Vec<i32>,
        height: Height,
        cells_per_axis: u64,
    },

    #[error("max height {max_height} is not a positive multiple of the chunk height {chunk_height}")]
    InvalidChunkHeight {
        chunk_height: Height,
        max_height: Height,
    },

    #[error("a {dim}-dimensional tree with max height {max_height} does not fit in a 64-bit Morton code")]
    MortonCodeOverflow { dim: u32, max_height: Height },
}
