//! 3-byte decimal floating point.
//!
//! Each value is stored as a 5-significant-digit decimal mantissa and a
//! signed power-of-ten exponent, packed MSB first:
//!
//! ```text
//!  23   22..19     18    17..0
//! ┌────┬─────────┬─────┬──────────────────┐
//! │ Es │ Exp (4) │ Ms  │ Mantissa (18)     │
//! └────┴─────────┴─────┴──────────────────┘
//! ```
//!
//! `Es`/`Ms` flag a negative exponent/mantissa. Negative fields are stored as
//! the two's complement of their magnitude truncated to the field width, so
//! the exponent covers -16..=15 and the mantissa 5 significant digits
//! (`10000..=99999` once normalized).

use crate::error::{FrameError, Result};

/// Bytes per encoded value.
pub const ENCODED_VALUE_SIZE: usize = 3;

/// Largest representable decimal exponent.
pub const MAX_EXPONENT: i32 = 15;

/// Smallest representable decimal exponent.
pub const MIN_EXPONENT: i32 = -16;

const EXPONENT_SIGN: u32 = 1 << 23;
const EXPONENT_SHIFT: u32 = 19;
const EXPONENT_MASK: u32 = 0xF;
const EXPONENT_RANGE: i32 = 1 << 4;
const MANTISSA_SIGN: u32 = 1 << 18;
const MANTISSA_MASK: u32 = 0x3_FFFF;
const MANTISSA_RANGE: i64 = 1 << 18;

// Five significant digits: one before the decimal point, four after.
const SIGNIFICAND_SCALE: f64 = 10_000.0;
const SIGNIFICAND_LIMIT: u32 = 100_000;

/// Encode a value into its 3-byte representation.
///
/// NaN encodes like zero. Magnitudes below `10^-16` flush to zero.
/// Infinities and magnitudes that round to `10^16` or above fail with
/// [`FrameError::ValueOutOfRange`].
pub fn encode_float(value: f64) -> Result<[u8; ENCODED_VALUE_SIZE]> {
    if value.is_nan() || value == 0.0 {
        return Ok([0; ENCODED_VALUE_SIZE]);
    }
    if value.is_infinite() {
        return Err(FrameError::ValueOutOfRange(value));
    }

    let magnitude = value.abs();
    let estimate = magnitude.log10().floor() as i32;
    if estimate > MAX_EXPONENT + 1 {
        return Err(FrameError::ValueOutOfRange(value));
    }
    if estimate < MIN_EXPONENT - 1 {
        return Ok([0; ENCODED_VALUE_SIZE]);
    }

    let (exponent, mantissa) = normalize(magnitude, estimate);
    if exponent > MAX_EXPONENT {
        return Err(FrameError::ValueOutOfRange(value));
    }
    if exponent < MIN_EXPONENT {
        return Ok([0; ENCODED_VALUE_SIZE]);
    }

    let mut bits = ((exponent as u32) & EXPONENT_MASK) << EXPONENT_SHIFT;
    if exponent < 0 {
        bits |= EXPONENT_SIGN;
    }
    if value < 0.0 {
        bits |= MANTISSA_SIGN | (mantissa.wrapping_neg() & MANTISSA_MASK);
    } else {
        bits |= mantissa & MANTISSA_MASK;
    }

    let [_, hi, mid, lo] = bits.to_be_bytes();
    Ok([hi, mid, lo])
}

/// Decode a 3-byte representation.
///
/// The mantissa is renormalized to a single leading digit before the
/// exponent is applied, so ground-built values need not be normalized.
pub fn decode_float(bytes: [u8; ENCODED_VALUE_SIZE]) -> f64 {
    let bits = u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]);

    let raw_exponent = ((bits >> EXPONENT_SHIFT) & EXPONENT_MASK) as i32;
    let exponent = if bits & EXPONENT_SIGN != 0 {
        raw_exponent - EXPONENT_RANGE
    } else {
        raw_exponent
    };

    let raw_mantissa = i64::from(bits & MANTISSA_MASK);
    let mantissa = if bits & MANTISSA_SIGN != 0 {
        raw_mantissa - MANTISSA_RANGE
    } else {
        raw_mantissa
    };

    if mantissa == 0 {
        return 0.0;
    }

    let digits = decimal_digits(mantissa.unsigned_abs()) as i32;
    scale(mantissa as f64, exponent - (digits - 1))
}

/// Encode a sequence of values, appending 3 bytes per value.
pub fn encode_floats(values: &[f64], dst: &mut Vec<u8>) -> Result<()> {
    dst.reserve(values.len() * ENCODED_VALUE_SIZE);
    for value in values {
        dst.extend_from_slice(&encode_float(*value)?);
    }
    Ok(())
}

/// Decode consecutive 3-byte groups. A trailing partial group is ignored.
pub fn decode_floats(bytes: &[u8]) -> Vec<f64> {
    bytes
        .chunks_exact(ENCODED_VALUE_SIZE)
        .map(|chunk| decode_float([chunk[0], chunk[1], chunk[2]]))
        .collect()
}

fn normalize(magnitude: f64, estimate: i32) -> (i32, u32) {
    let mut exponent = estimate;
    let mut leading = scale(magnitude, -exponent);

    // log10 can land one off near exact powers of ten.
    if leading >= 10.0 {
        exponent += 1;
        leading = scale(magnitude, -exponent);
    } else if leading < 1.0 {
        exponent -= 1;
        leading = scale(magnitude, -exponent);
    }

    let mut mantissa = (leading * SIGNIFICAND_SCALE).round() as u32;
    if mantissa >= SIGNIFICAND_LIMIT {
        exponent += 1;
        mantissa /= 10;
    }
    (exponent, mantissa)
}

/// `value * 10^power`, dividing for negative powers so exact decimals stay exact.
fn scale(value: f64, power: i32) -> f64 {
    if power >= 0 {
        value * 10f64.powi(power)
    } else {
        value / 10f64.powi(-power)
    }
}

fn decimal_digits(mut value: u64) -> u32 {
    let mut digits = 1;
    while value >= 10 {
        value /= 10;
        digits += 1;
    }
    digits
}
