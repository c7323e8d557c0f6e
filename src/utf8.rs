//! Utility module for encoding decoded code points as UTF-8 bytes
//!
//! Escape sequences such as `\UHHHHHHHH` can express code points far beyond the
//! Unicode range, up to `0x7FFFFFFF`. These are encoded using the original
//! (pre RFC 3629) UTF-8 scheme with up to 6 bytes, so the result is not
//! necessarily valid UTF-8 in the Rust sense. Surrogate code points are encoded
//! like any other code point.

/// Maximum number of bytes needed to encode one code point
pub(crate) const MAX_BYTES_PER_CODE_POINT: usize = 6;

/// Largest code point which can be encoded
pub(crate) const MAX_CODE_POINT: u32 = 0x7FFF_FFFF;

/// Bit mask which matches the value bits of a continuation byte
const CONT_MASK_VAL: u32 = 0b0011_1111;
const CONT_PREFIX: u8 = 0b1000_0000;

/// Leading byte prefix for an encoding of the given length (index = length)
const START_PREFIX: [u8; MAX_BYTES_PER_CODE_POINT + 1] = [
    0,
    0b0000_0000,
    0b1100_0000,
    0b1110_0000,
    0b1111_0000,
    0b1111_1000,
    0b1111_1100,
];

/// Number of bytes needed to encode the code point, `None` if it is out of range
pub(crate) fn encoded_len(code_point: u32) -> Option<usize> {
    match code_point {
        0..=0x7F => Some(1),
        0x80..=0x7FF => Some(2),
        0x800..=0xFFFF => Some(3),
        0x1_0000..=0x1F_FFFF => Some(4),
        0x20_0000..=0x3FF_FFFF => Some(5),
        0x400_0000..=MAX_CODE_POINT => Some(6),
        _ => None,
    }
}

/// Encodes the code point into `buf` and returns the encoded bytes
///
/// Returns `None` if the code point is larger than [`MAX_CODE_POINT`].
pub(crate) fn encode_code_point(
    code_point: u32,
    buf: &mut [u8; MAX_BYTES_PER_CODE_POINT],
) -> Option<&[u8]> {
    let len = encoded_len(code_point)?;
    if len == 1 {
        buf[0] = code_point as u8;
        return Some(&buf[..1]);
    }

    // Fill continuation bytes from the back, 6 value bits each
    let mut remaining = code_point;
    for i in (1..len).rev() {
        buf[i] = CONT_PREFIX | (remaining & CONT_MASK_VAL) as u8;
        remaining >>= 6;
    }
    buf[0] = START_PREFIX[len] | remaining as u8;
    Some(&buf[..len])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(code_point: u32) -> Option<Vec<u8>> {
        let mut buf = [0; MAX_BYTES_PER_CODE_POINT];
        encode_code_point(code_point, &mut buf).map(<[u8]>::to_vec)
    }

    #[test]
    fn matches_std_for_unicode_range() {
        for c in [
            '\0',
            'A',
            '\u{7F}',
            '\u{80}',
            '§',
            '\u{7FF}',
            '\u{800}',
            'ಀ',
            '\u{FFFF}',
            '\u{10000}',
            '𝄆',
            '\u{10FFFF}',
        ] {
            let mut std_buf = [0; 4];
            let expected = c.encode_utf8(&mut std_buf).as_bytes().to_vec();
            assert_eq!(Some(expected), encode(c as u32), "encoding of {c:?}");
        }
    }

    #[test]
    fn surrogates_are_encoded_as_3_bytes() {
        assert_eq!(Some(vec![0xED, 0xA0, 0x80]), encode(0xD800));
        assert_eq!(Some(vec![0xED, 0xBF, 0xBF]), encode(0xDFFF));
    }

    #[test]
    fn extended_range() {
        assert_eq!(Some(vec![0xF7, 0xBF, 0xBF, 0xBF]), encode(0x1F_FFFF));
        assert_eq!(Some(vec![0xF8, 0x88, 0x80, 0x80, 0x80]), encode(0x20_0000));
        assert_eq!(Some(vec![0xFB, 0xBF, 0xBF, 0xBF, 0xBF]), encode(0x3FF_FFFF));
        assert_eq!(
            Some(vec![0xFC, 0x84, 0x80, 0x80, 0x80, 0x80]),
            encode(0x400_0000)
        );
        assert_eq!(
            Some(vec![0xFD, 0xBF, 0xBF, 0xBF, 0xBF, 0xBF]),
            encode(MAX_CODE_POINT)
        );
    }

    #[test]
    fn out_of_range() {
        assert_eq!(None, encode(0x8000_0000));
        assert_eq!(None, encode(u32::MAX));
        assert_eq!(None, encoded_len(0x8000_0000));
    }
}
