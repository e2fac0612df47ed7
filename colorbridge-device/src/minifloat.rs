//! Unsigned 8-bit minifloat used for loop periods
//!
//! Layout `eeee mmmm`. Exponent 0 is subnormal and maps straight to the
//! mantissa (0..=15); otherwise the value is `(16 + m) << (e - 1)`. Codes
//! are strictly increasing, so the encoder is a nearest-neighbor search.

/// Largest representable value, `31 << 14`
pub const MAX: u32 = 507_904;

/// Decode a code into its integer value
pub const fn decode(code: u8) -> u32 {
    let exponent = (code >> 4) as u32;
    let mantissa = (code & 0x0F) as u32;
    if exponent == 0 {
        mantissa
    } else {
        (16 + mantissa) << (exponent - 1)
    }
}

/// Encode `value`, rounding to the nearest code
///
/// Ties go to the smaller code. Negative and NaN inputs encode as 0, values
/// past [`MAX`] saturate.
pub fn encode(value: f64) -> u8 {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    if value >= MAX as f64 {
        return u8::MAX;
    }
    // First code whose value is >= `value`
    let upper = (0..=u8::MAX)
        .find(|&c| decode(c) as f64 >= value)
        .unwrap_or(u8::MAX);
    if upper == 0 {
        return 0;
    }
    let lower = upper - 1;
    let below = value - decode(lower) as f64;
    let above = decode(upper) as f64 - value;
    if above < below {
        upper
    } else {
        lower
    }
}
