use crate::{LinearIndex, Point, Point2i, Point3i, PointN};

use morton_encoding::{morton_decode, morton_encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of a `MortonCode` in bits. Bounds the height of any tree whose nodes are addressed by Morton codes.
pub const MORTON_CODE_BITS: u32 = u64::BITS;

/// A Morton-encoded `Point2i` or `Point3i`. Components must be non-negative; the encoding interleaves the low 32 bits (2D)
/// or the low 21 bits (3D) of each component, with X being the least significant bit of every group.
///
/// <https://en.wikipedia.org/wiki/Z-order_curve>
#[derive(Clone, Copy, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct MortonCode(pub u64);

impl fmt::Debug for MortonCode {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{} = {:b}", self.0, self.0)
    }
}

impl MortonCode {
    /// Shifts the code up by `levels` tree levels of a `dim`-dimensional tree, i.e. by `dim * levels` bits.
    #[inline]
    pub fn shift_up(self, dim: u32, levels: u32) -> Self {
        Self(self.0.checked_shl(dim * levels).unwrap_or(0))
    }

    /// Shifts the code down by `levels` tree levels of a `dim`-dimensional tree, i.e. by `dim * levels` bits.
    #[inline]
    pub fn shift_down(self, dim: u32, levels: u32) -> Self {
        Self(self.0.checked_shr(dim * levels).unwrap_or(0))
    }

    /// Extracts the `dim * (parent_height - child_height)` bits that sit between the two heights. The most significant
    /// level of the span lands in the most significant bits of the result, so the results of two adjacent spans can be
    /// concatenated into the result for their union.
    #[inline]
    pub fn extract_span(self, dim: u32, parent_height: u32, child_height: u32) -> LinearIndex {
        debug_assert!(child_height <= parent_height);

        let num_bits = dim * (parent_height - child_height);
        let mask = if num_bits >= MORTON_CODE_BITS {
            u64::MAX
        } else {
            (1 << num_bits) - 1
        };

        (self.shift_down(dim, child_height).0 & mask) as LinearIndex
    }
}

/// A point that can be converted to and from a `MortonCode`.
pub trait MortonPoint: Point<Scalar = i32> + fmt::Debug + Into<MortonCode> + From<MortonCode> {
    /// The number of bits used per component. Bounds the extent of the lattice that can be encoded.
    const BITS_PER_COMPONENT: u32;

    /// The dimensionality of the point as used in Morton arithmetic.
    #[inline]
    fn dim() -> u32 {
        Self::DIM as u32
    }
}

// ██████╗ ██████╗
// ╚════██╗██╔══██╗
//  █████╔╝██║  ██║
// ██╔═══╝ ██║  ██║
// ███████╗██████╔╝
// ╚══════╝╚═════╝

impl MortonPoint for Point2i {
    const BITS_PER_COMPONENT: u32 = MORTON_CODE_BITS / 2;
}

impl From<Point2i> for MortonCode {
    #[inline]
    fn from(p: Point2i) -> Self {
        debug_assert!(p.all_components(|c| c >= 0), "{:?} is not encodable", p);

        Self(morton_encode([p.y() as u32, p.x() as u32]))
    }
}

impl From<MortonCode> for Point2i {
    #[inline]
    fn from(m: MortonCode) -> Self {
        let yx: [u32; 2] = morton_decode(m.0);

        PointN([yx[1] as i32, yx[0] as i32])
    }
}

// ██████╗ ██████╗
// ╚════██╗██╔══██╗
//  █████╔╝██║  ██║
//  ╚═══██╗██║  ██║
// ██████╔╝██████╔╝
// ╚═════╝ ╚═════╝

impl MortonPoint for Point3i {
    const BITS_PER_COMPONENT: u32 = MORTON_CODE_BITS / 3;
}

impl From<Point3i> for MortonCode {
    #[inline]
    fn from(p: Point3i) -> Self {
        debug_assert!(
            p.all_components(|c| c >= 0 && (c as u64) < (1 << Point3i::BITS_PER_COMPONENT)),
            "{:?} is not encodable",
            p
        );

        let code: u128 = morton_encode([p.z() as u32, p.y() as u32, p.x() as u32]);

        Self(code as u64)
    }
}

impl From<MortonCode> for Point3i {
    #[inline]
    fn from(m: MortonCode) -> Self {
        let zyx: [u32; 3] = morton_decode(m.0 as u128);

        PointN([zyx[2] as i32, zyx[1] as i32, zyx[0] as i32])
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
