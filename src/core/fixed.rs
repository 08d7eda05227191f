//! Q16.16 Fixed-Point Arithmetic
//!
//! Deterministic fixed-point math for the grid simulation.
//! All operations use integer arithmetic only - no floats in gameplay logic.
//!
//! ## Format: Q16.16
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Bit Layout: Q16.16 (32-bit signed integer)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  [S][IIIIIIIIIIIIIIII][FFFFFFFFFFFFFFFF]                    │
//! │   │  └──── 16 bits ────┘└──── 16 bits ────┘                 │
//! │   └─ Sign bit                                               │
//! │                                                             │
//! │  Range: -32768.0 to +32767.99998 (approx)                   │
//! │  Precision: 1/65536 ≈ 0.000015 cells                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Units
//!
//! Positions are measured in **cells** (1.0 = one cell stride), never in
//! pixels. A 100-cell grid keeps every squared distance well inside range.

/// Q16.16 fixed-point number stored as i32.
/// 16 bits integer, 16 bits fractional.
pub type Fixed = i32;

/// Number of fractional bits (16)
pub const FIXED_SCALE: i32 = 16;

/// 1.0 in fixed-point (65536)
pub const FIXED_ONE: Fixed = 1 << FIXED_SCALE; // 65536

/// 0.5 in fixed-point (32768)
pub const FIXED_HALF: Fixed = FIXED_ONE >> 1; // 32768

/// Mask selecting the fractional bits.
pub const FIXED_FRAC_MASK: Fixed = FIXED_ONE - 1;

// =============================================================================
// ANGLE CONSTANTS (radians, as integer literals)
// =============================================================================

/// π = round(3.14159265 * 65536) = 205887
pub const FIXED_PI: Fixed = 205887;

/// π/2 = 102944
pub const FIXED_HALF_PI: Fixed = 102944;

/// π/4 = 51472
pub const FIXED_QUARTER_PI: Fixed = 51472;

/// Correction term for the atan approximation: 0.273 * 65536 = 17891
const ATAN_CORRECTION: Fixed = 17891;

// =============================================================================
// CORE OPERATIONS (All deterministic, wrapping semantics)
// =============================================================================

/// Convert a compile-time float to fixed-point.
///
/// # Warning
/// Only use at compile-time or initialization. NEVER in tick loop.
///
/// # Example
/// ```
/// use grid_snake::core::fixed::{to_fixed, FIXED_ONE};
/// const MY_VALUE: i32 = to_fixed(2.5);
/// assert_eq!(MY_VALUE, FIXED_ONE * 2 + FIXED_ONE / 2);
/// ```
#[inline]
pub const fn to_fixed(f: f64) -> Fixed {
    (f * (FIXED_ONE as f64)) as Fixed
}

/// Convert an integer cell count to fixed-point.
#[inline]
pub const fn from_int(i: i32) -> Fixed {
    i << FIXED_SCALE
}

/// Convert fixed-point to float for display/rendering.
///
/// # Warning
/// Only use for visual output. NEVER use result in game logic.
#[inline]
pub fn to_float(f: Fixed) -> f32 {
    f as f32 / FIXED_ONE as f32
}

/// Exact ratio `num / den` as fixed-point, computed in i64.
///
/// Returns 0 when `den` is zero.
#[inline]
pub fn fixed_ratio(num: i64, den: i64) -> Fixed {
    if den == 0 {
        return 0;
    }
    ((num << FIXED_SCALE) / den) as Fixed
}

/// Multiply two fixed-point numbers.
///
/// Uses i64 intermediate to prevent overflow, then truncates.
#[inline]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    let wide = (a as i64) * (b as i64);
    (wide >> FIXED_SCALE) as Fixed
}

/// Divide two fixed-point numbers.
///
/// Pre-shifts numerator to maintain precision.
/// Returns 0 on divide-by-zero.
#[inline]
pub fn fixed_div(a: Fixed, b: Fixed) -> Fixed {
    if b == 0 {
        return 0; // Deterministic: don't panic
    }
    let wide = (a as i64) << FIXED_SCALE;
    (wide / b as i64) as Fixed
}

/// Square root by digit-by-digit integer root of `x << 16`.
///
/// Exact floor result for every non-negative input; non-positive inputs
/// return 0.
#[inline]
pub fn fixed_sqrt(x: Fixed) -> Fixed {
    if x <= 0 {
        return 0;
    }

    // sqrt(x / 2^16) * 2^16 == sqrt(x * 2^16)
    let mut rem = (x as u64) << FIXED_SCALE;
    let mut root: u64 = 0;
    let mut bit: u64 = 1 << 62;
    while bit > rem {
        bit >>= 2;
    }

    while bit != 0 {
        if rem >= root + bit {
            rem -= root + bit;
            root = (root >> 1) + bit;
        } else {
            root >>= 1;
        }
        bit >>= 2;
    }

    root as Fixed
}

/// Absolute value of a fixed-point number.
#[inline]
pub fn fixed_abs(x: Fixed) -> Fixed {
    if x < 0 { x.wrapping_neg() } else { x }
}

// =============================================================================
// CELL ROUNDING
// =============================================================================

/// Largest whole cell index `<= x`.
///
/// Arithmetic shift rounds toward negative infinity, so `-0.25` maps to `-1`.
#[inline]
pub fn fixed_floor(x: Fixed) -> i32 {
    x >> FIXED_SCALE
}

/// Smallest whole cell index `>= x`.
#[inline]
pub fn fixed_ceil(x: Fixed) -> i32 {
    x.wrapping_add(FIXED_FRAC_MASK) >> FIXED_SCALE
}

/// Nearest whole cell index (halves round up).
#[inline]
pub fn fixed_round(x: Fixed) -> i32 {
    x.wrapping_add(FIXED_HALF) >> FIXED_SCALE
}

/// True when `x` has no fractional part.
#[inline]
pub fn is_whole(x: Fixed) -> bool {
    x & FIXED_FRAC_MASK == 0
}

// =============================================================================
// ANGLES
// =============================================================================

/// Four-quadrant arctangent, in fixed-point radians within `(-π, π]`.
///
/// Uses the `z·π/4 + 0.273·z·(1 - z)` approximation on the reduced octant
/// (max error ≈ 0.004 rad). `atan2(0, 0)` is 0.
pub fn fixed_atan2(y: Fixed, x: Fixed) -> Fixed {
    if x == 0 && y == 0 {
        return 0;
    }

    let ax = fixed_abs(x);
    let ay = fixed_abs(y);

    let (z, steep) = if ax >= ay {
        (fixed_div(ay, ax), false)
    } else {
        (fixed_div(ax, ay), true)
    };

    let mut angle = fixed_mul(FIXED_QUARTER_PI, z)
        .wrapping_add(fixed_mul(fixed_mul(ATAN_CORRECTION, z), FIXED_ONE - z));

    if steep {
        angle = FIXED_HALF_PI - angle;
    }
    if x < 0 {
        angle = FIXED_PI - angle;
    }
    if y < 0 {
        angle = -angle;
    }
    angle
}

// =============================================================================
// TESTS
// =============================================================================
