//! Base64 framing for audio payloads embedded in JSON messages.
//!
//! Encoding is the standard alphabet with `=` padding and no line wrapping.
//! Decoding is lenient: transport whitespace and other non-alphabet bytes
//! are skipped, and the first padding character terminates the payload.

use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

/// Accepts payloads whose final symbol carries spare bits and whose padding
/// was stripped by [`decode`] before delegation.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode raw bytes as padded standard base64.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode base64 text into raw bytes.
///
/// Total function: characters outside the standard alphabet are skipped,
/// decoding stops at the first `=`, and a dangling trailing symbol that
/// carries fewer than 8 bits is dropped.
pub fn decode(text: &str) -> Vec<u8> {
    let mut cleaned = Vec::with_capacity(text.len());
    for &byte in text.as_bytes() {
        if byte == b'=' {
            break;
        }
        if is_standard_alphabet(byte) {
            cleaned.push(byte);
        }
    }
    // A lone trailing symbol holds only 6 bits and decodes to nothing.
    if cleaned.len() % 4 == 1 {
        cleaned.pop();
    }
    LENIENT.decode(&cleaned).unwrap_or_default()
}

fn is_standard_alphabet(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'+' || byte == b'/'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_padded_standard_base64() {
        assert_eq!(encode(b""), "");
        assert_eq!(encode(b"f"), "Zg==");
        assert_eq!(encode(b"fo"), "Zm8=");
        assert_eq!(encode(b"foo"), "Zm9v");
        assert_eq!(encode(&[0xfb, 0xff, 0xfe]), "+//+");
    }

    #[test]
    fn decode_inverts_encode() {
        let cases: &[&[u8]] = &[
            b"",
            b"a",
            b"ab",
            b"abc",
            b"abcd",
            &[0x00, 0xff, 0x10, 0x80, 0x7f],
            &[0u8; 33],
        ];
        for &bytes in cases {
            assert_eq!(decode(&encode(bytes)), bytes);
        }
    }

    #[test]
    fn encode_inverts_decode_for_valid_padded_input() {
        for text in ["", "Zg==", "Zm8=", "Zm9v", "AAA=", "QUJDRA=="] {
            assert_eq!(encode(&decode(text)), text);
        }
    }

    #[test]
    fn decode_skips_non_alphabet_noise() {
        assert_eq!(decode("Zm 9v\r\n"), b"foo");
        assert_eq!(decode("\tZ\ng=="), b"f");
    }

    #[test]
    fn decode_stops_at_first_padding() {
        // Everything after `=` is ignored, including further alphabet chars.
        assert_eq!(decode("Zm8=Zm9v"), b"fo");
    }

    #[test]
    fn decode_drops_dangling_symbol() {
        // Five symbols: the fifth carries 6 bits, not enough for a byte.
        assert_eq!(decode("Zm9vZ"), b"foo");
    }

    #[test]
    fn decode_tolerates_nonzero_trailing_bits() {
        // 'B' leaves 0001 in the spare bits; a strict decoder rejects this.
        assert_eq!(decode("AB=="), vec![0x00]);
    }
}
