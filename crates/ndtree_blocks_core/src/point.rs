use core::ops::{Add, AddAssign, Shl, Shr, Sub, SubAssign};
use num::Zero;
use serde::{Deserialize, Serialize};

/// An N-dimensional integer point (where N=2 or N=3), which is just a primitive array `[i32; D]`.
/// It is most convenient to construct points of any dimension as:
///
/// ```
/// use ndtree_blocks_core::PointN;
///
/// let p2 = PointN([1, 2]); // 2D
/// let p3 = PointN([1, 2, 3]); // 3D
/// ```
///
/// Points support component-wise addition and subtraction, as well as bit shifts by a scalar, which is how node positions
/// move between tree heights.
///
/// ```
/// use ndtree_blocks_core::PointN;
///
/// let p = PointN([4, 6]);
///
/// assert_eq!(p + PointN([1, 1]), PointN([5, 7]));
/// assert_eq!(p >> 1, PointN([2, 3]));
/// assert_eq!(p << 1, PointN([8, 12]));
/// ```
#[derive(Copy, Clone, Debug, Deserialize, Default, Eq, Hash, PartialEq, Serialize)]
pub struct PointN<N>(pub N);

/// A 2-dimensional point with scalar type `i32`.
pub type Point2i = PointN<[i32; 2]>;
/// A 3-dimensional point with scalar type `i32`.
pub type Point3i = PointN<[i32; 3]>;

/// The operations on a point that tree indexing needs.
pub trait Point:
    Copy
    + Eq
    + Add<Output = Self>
    + Sub<Output = Self>
    + Shl<i32, Output = Self>
    + Shr<i32, Output = Self>
    + Sized
{
    type Scalar: Copy;

    /// Number of components.
    const DIM: usize;

    /// A point with every component equal to `value`.
    fn fill(value: Self::Scalar) -> Self;

    /// Returns the component specified by index. I.e. X = 0, Y = 1, Z = 2.
    fn at(&self, component_index: usize) -> Self::Scalar;

    /// Returns the point after applying `f` component-wise.
    fn map_components(&self, f: impl Fn(Self::Scalar) -> Self::Scalar) -> Self;

    /// Returns `true` iff `f` holds for every component.
    fn all_components(&self, f: impl Fn(Self::Scalar) -> bool) -> bool;
}

// `Zero` trait doesn't allow associated constants for zero because of bignums.
pub trait SmallZero: Copy {
    const ZERO: Self;
}

impl<N> Zero for PointN<N>
where
    Self: Point + SmallZero,
{
    fn zero() -> Self {
        Self::ZERO
    }

    fn is_zero(&self) -> bool {
        *self == Self::zero()
    }
}

impl<N> AddAssign for PointN<N>
where
    N: Copy,
    PointN<N>: Add<Output = Self>,
{
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<N> SubAssign for PointN<N>
where
    N: Copy,
    PointN<N>: Sub<Output = Self>,
{
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

macro_rules! impl_integer_point {
    ($dim:literal) => {
        impl Point for PointN<[i32; $dim]> {
            type Scalar = i32;

            const DIM: usize = $dim;

            #[inline]
            fn fill(value: i32) -> Self {
                PointN([value; $dim])
            }

            #[inline]
            fn at(&self, component_index: usize) -> i32 {
                self.0[component_index]
            }

            #[inline]
            fn map_components(&self, f: impl Fn(i32) -> i32) -> Self {
                let mut out = self.0;
                for c in out.iter_mut() {
                    *c = f(*c);
                }

                PointN(out)
            }

            #[inline]
            fn all_components(&self, f: impl Fn(i32) -> bool) -> bool {
                self.0.iter().all(|&c| f(c))
            }
        }

        impl SmallZero for PointN<[i32; $dim]> {
            const ZERO: Self = PointN([0; $dim]);
        }

        impl Add for PointN<[i32; $dim]> {
            type Output = Self;

            #[inline]
            fn add(self, rhs: Self) -> Self {
                let mut out = self.0;
                for (c, r) in out.iter_mut().zip(rhs.0.iter()) {
                    *c += r;
                }

                PointN(out)
            }
        }

        impl Sub for PointN<[i32; $dim]> {
            type Output = Self;

            #[inline]
            fn sub(self, rhs: Self) -> Self {
                let mut out = self.0;
                for (c, r) in out.iter_mut().zip(rhs.0.iter()) {
                    *c -= r;
                }

                PointN(out)
            }
        }

        impl Shl<i32> for PointN<[i32; $dim]> {
            type Output = Self;

            #[inline]
            fn shl(self, rhs: i32) -> Self {
                self.map_components(|c| c << rhs)
            }
        }

        impl Shr<i32> for PointN<[i32; $dim]> {
            type Output = Self;

            #[inline]
            fn shr(self, rhs: i32) -> Self {
                self.map_components(|c| c >> rhs)
            }
        }
    };
}

impl_integer_point!(2);
impl_integer_point!(3);

impl Point2i {
    #[inline]
    pub fn x(&self) -> i32 {
        self.0[0]
    }

    #[inline]
    pub fn y(&self) -> i32 {
        self.0[1]
    }
}

impl Point3i {
    #[inline]
    pub fn x(&self) -> i32 {
        self.0[0]
    }

    #[inline]
    pub fn y(&self) -> i32 {
        self.0[1]
    }

    #[inline]
    pub fn z(&self) -> i32 {
        self.0[2]
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
