//! Binary-coded decimal helpers.
//!
//! All DS3231 time and alarm registers hold two decimal digits per byte:
//! the tens digit in the high nibble and the ones digit in the low nibble.

/// BCD conversion error.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BcdError {
    /// Value does not fit in two decimal digits
    OutOfRange(u8),
    /// A nibble holds 10-15
    Malformed(u8),
}

/// Packs `value` (0-99) into a BCD byte.
///
/// # Errors
///
/// Returns [`BcdError::OutOfRange`] if `value` is greater than 99.
pub fn encode(value: u8) -> Result<u8, BcdError> {
    if value > 99 {
        return Err(BcdError::OutOfRange(value));
    }
    Ok(((value / 10) << 4) | (value % 10))
}

/// Unpacks a BCD byte into 0-99.
///
/// # Errors
///
/// Returns [`BcdError::Malformed`] if either nibble is not a decimal digit.
pub fn decode(byte: u8) -> Result<u8, BcdError> {
    let tens = byte >> 4;
    let ones = byte & 0x0F;
    if tens > 9 || ones > 9 {
        return Err(BcdError::Malformed(byte));
    }
    Ok(tens * 10 + ones)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_packs_digits() {
        assert_eq!(encode(0), Ok(0x00));
        assert_eq!(encode(9), Ok(0x09));
        assert_eq!(encode(10), Ok(0x10));
        assert_eq!(encode(45), Ok(0x45));
        assert_eq!(encode(99), Ok(0x99));
    }

    #[test]
    fn test_encode_rejects_three_digits() {
        assert_eq!(encode(100), Err(BcdError::OutOfRange(100)));
        assert_eq!(encode(255), Err(BcdError::OutOfRange(255)));
    }

    #[test]
    fn test_decode_rejects_non_decimal_nibbles() {
        assert_eq!(decode(0x0A), Err(BcdError::Malformed(0x0A)));
        assert_eq!(decode(0xA0), Err(BcdError::Malformed(0xA0)));
        assert_eq!(decode(0xFF), Err(BcdError::Malformed(0xFF)));
    }

    #[test]
    fn test_round_trip_all_values() {
        for n in 0..=99 {
            assert_eq!(decode(encode(n).unwrap()), Ok(n));
        }
    }
}
