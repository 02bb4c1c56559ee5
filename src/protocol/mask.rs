//! Client-to-server payload masking (RFC 6455 Section 5.3).
//!
//! Masking is an involution: applying the same key twice restores the input.

/// Byte-by-byte XOR: `data[i] ^= mask[i % 4]`.
#[inline]
pub fn apply_mask(data: &mut [u8], mask: [u8; 4]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= mask[i % 4];
    }
}

/// Same result as [`apply_mask`], four bytes at a time.
///
/// Used on the encode path where payloads can be large.
#[inline]
pub fn apply_mask_fast(data: &mut [u8], mask: [u8; 4]) {
    let mask_u32 = u32::from_ne_bytes(mask);
    let mut chunks = data.chunks_exact_mut(4);

    for chunk in &mut chunks {
        let word = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) ^ mask_u32;
        chunk.copy_from_slice(&word.to_ne_bytes());
    }

    // Full chunks keep the tail aligned to mask[0].
    for (byte, key) in chunks.into_remainder().iter_mut().zip(mask) {
        *byte ^= key;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masking_reversible() {
        let mask = [0x12, 0x34, 0x56, 0x78];
        let original = b"Hello, WebSocket!".to_vec();
        let mut data = original.clone();

        apply_mask(&mut data, mask);
        assert_ne!(data, original);

        apply_mask(&mut data, mask);
        assert_eq!(data, original);
    }

    #[test]
    fn test_masking_example_from_rfc() {
        let mask = [0x37, 0xfa, 0x21, 0x3d];
        let mut data = b"Hello".to_vec();

        apply_mask(&mut data, mask);
        assert_eq!(data, vec![0x7f, 0x9f, 0x4d, 0x51, 0x58]);
    }

    #[test]
    fn test_masking_empty() {
        let mut data: Vec<u8> = vec![];
        apply_mask_fast(&mut data, [0x12, 0x34, 0x56, 0x78]);
        assert!(data.is_empty());
    }

    #[test]
    fn test_masking_fast_equivalent() {
        let mask = [0xde, 0xad, 0xbe, 0xef];
        for len in [0, 1, 3, 4, 5, 7, 8, 63, 64, 65, 1000] {
            let original: Vec<u8> = (0..len).map(|i| (i * 7 % 256) as u8).collect();
            let mut slow = original.clone();
            let mut fast = original.clone();

            apply_mask(&mut slow, mask);
            apply_mask_fast(&mut fast, mask);
            assert_eq!(slow, fast, "mismatch at len {}", len);
        }
    }

    #[test]
    fn test_zero_mask_is_identity() {
        let original = b"identity".to_vec();
        let mut data = original.clone();
        apply_mask_fast(&mut data, [0, 0, 0, 0]);
        assert_eq!(data, original);
    }
}
