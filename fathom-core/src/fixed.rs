//! Fixed-point number types
//!
//! Two binary fixed-point formats are used by the level pipeline:
//!
//! - [`Q8_8`]: signed 8.8 in an `i16`, for per-electrode scale factors
//!   (`0x0100` = 1.0).
//! - [`Q24_8`]: signed 24.8 in an `i32`, for heights and percentages.
//!
//! Every reduction is an arithmetic right shift, so results truncate toward
//! negative infinity: `-1 × 0.5` is `-1`, not `0`. Level values computed on
//! the device must match those computed by the host tooling bit for bit, so
//! do not replace the shifts with division.

use core::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Number of fractional bits in both formats
pub const FRAC_BITS: u32 = 8;

/// Signed 8.8 fixed-point value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[derive(Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Q8_8(i16);

impl Q8_8 {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(1 << FRAC_BITS);

    /// Wrap a raw 8.8 bit pattern
    pub const fn from_bits(bits: i16) -> Self {
        Self(bits)
    }

    pub const fn to_bits(self) -> i16 {
        self.0
    }

    /// Multiply an integer by this factor, dropping the fractional bits
    ///
    /// The product is formed in 64 bits, so any `i32` count times any 8.8
    /// factor is exact before the shift. The shifted result fits in `i32`
    /// whenever `value` is within ±2^23, which covers every difference of a
    /// `u16` reading and an `i16` offset.
    pub const fn apply(self, value: i32) -> i32 {
        ((value as i64 * self.0 as i64) >> FRAC_BITS) as i32
    }
}

/// Signed 24.8 fixed-point value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[derive(Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Q24_8(i32);

impl Q24_8 {
    pub const ZERO: Self = Self(0);

    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    pub const fn to_bits(self) -> i32 {
        self.0
    }

    /// Convert a whole number
    pub const fn from_int(value: i32) -> Self {
        Self(value << FRAC_BITS)
    }

    /// Integer part, rounded toward negative infinity
    pub const fn whole(self) -> i32 {
        self.0 >> FRAC_BITS
    }

    /// Value in hundredths, for logging without floats
    pub const fn hundredths(self) -> i32 {
        ((self.0 as i64 * 100) >> FRAC_BITS) as i32
    }

    /// Halve, truncating toward negative infinity
    pub const fn half(self) -> Self {
        Self(self.0 >> 1)
    }

    /// Quarter, truncating toward negative infinity
    pub const fn quarter(self) -> Self {
        Self(self.0 >> 2)
    }

    /// Multiply by an integer
    pub const fn mul_int(self, factor: i32) -> Self {
        Self(self.0 * factor)
    }
}

impl Add for Q24_8 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Q24_8 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}
