//! Sparse storage for per-node payloads of `2^D`-ary trees, addressed by `NdtreeIndex`.
//!
//! The core storage type is the `ChunkedNdtree`, which groups several consecutive tree levels into one allocation unit, the
//! `NdtreeChunk`. Chunks are allocated lazily on write and reclaimed by `ChunkedNdtree::prune` once every payload below them
//! is empty (as defined by the `IsEmpty` trait).
//!
//! For the common cases there are the `ChunkedQuadtree` and `ChunkedOctree` aliases.

pub mod chunked_ndtree;

pub use chunked_ndtree::*;

/// Used in many generic algorithms to check if a payload is considered empty. The `Default` value of a payload type is
/// expected to be empty.
pub trait IsEmpty {
    fn is_empty(&self) -> bool;
}

impl IsEmpty for bool {
    fn is_empty(&self) -> bool {
        !*self
    }
}

macro_rules! impl_is_empty_for_zeroable {
    ($($t:ty => $zero:expr),* $(,)?) => {
        $(
            impl IsEmpty for $t {
                #[inline]
                fn is_empty(&self) -> bool {
                    *self == $zero
                }
            }
        )*
    };
}

impl_is_empty_for_zeroable!(
    u8 => 0, u16 => 0, u32 => 0, u64 => 0, usize => 0,
    i8 => 0, i16 => 0, i32 => 0, i64 => 0, isize => 0,
    f32 => 0.0, f64 => 0.0,
);

impl<T, const K: usize> IsEmpty for [T; K]
where
    T: IsEmpty,
{
    fn is_empty(&self) -> bool {
        self.iter().all(IsEmpty::is_empty)
    }
}

pub mod prelude {
    pub use super::{
        ChunkedNdtree, ChunkedNdtreeConfig, ChunkedOctree, ChunkedQuadtree, IsEmpty, NdtreeChunk,
        VisitStatus,
    };
}
