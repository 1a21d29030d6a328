/// Hex-encoded Bristlemouth payload decoding
use crate::error::DecodeError;

/// Returned by [`decode_hex`] when the payload is not valid hex.
pub const INVALID_HEX: &str = "Invalid hex data";

/// Decode a hex string into text.
///
/// ASCII whitespace is ignored anywhere in the input, including inside a
/// byte pair (`"6 d"` reads as `0x6d`). Bytes that are not valid
/// UTF-8 are dropped rather than replaced, and surrounding whitespace is
/// trimmed from the result.
pub fn try_decode_hex(hex_string: &str) -> Result<String, DecodeError> {
    let digits: String = hex_string
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = hex::decode(digits).map_err(|_| DecodeError::InvalidHex)?;

    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    Ok(text.trim().to_string())
}

/// Best-effort decode: invalid input yields the [`INVALID_HEX`] sentinel.
pub fn decode_hex(hex_string: &str) -> String {
    try_decode_hex(hex_string).unwrap_or_else(|_| INVALID_HEX.to_string())
}

/// Leading run of printable ASCII (0x20..=0x7E), or `None` if the text
/// does not start with one.
pub fn printable_prefix(text: &str) -> Option<&str> {
    let end = text
        .bytes()
        .position(|b| !(0x20..=0x7E).contains(&b))
        .unwrap_or(text.len());
    if end == 0 {
        None
    } else {
        Some(&text[..end])
    }
}
