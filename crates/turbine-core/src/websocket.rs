//! WebSocket payload masking (RFC 6455 §5.3)
//!
//! Masking and unmasking are the same operation: XOR with the 4-byte key,
//! cycling from the first payload byte.

/// Masked copy of `payload`
pub fn mask(key: [u8; 4], payload: &[u8]) -> Vec<u8> {
    payload
        .iter()
        .enumerate()
        .map(|(i, byte)| byte ^ key[i % 4])
        .collect()
}

/// Mask `payload` in place
pub fn mask_in_place(key: [u8; 4], payload: &mut [u8]) {
    mask_from(key, 0, payload);
}

/// Mask a fragment that starts `offset` bytes into the frame payload, so a
/// payload can be processed in pieces as it arrives.
pub fn mask_from(key: [u8; 4], offset: usize, payload: &mut [u8]) {
    let start = offset % 4;
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= key[(start + i) % 4];
    }
}
