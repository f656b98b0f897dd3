//! Payload masking
//!
//! Masking keys only need to be unpredictable enough that a peer cannot
//! steer the bytes an intermediary sees. `rand`'s thread-local generator,
//! seeded from the OS once per thread, is sufficient; keys are not secret.

/// Generate a fresh 32-bit masking key
pub fn random_mask_key() -> [u8; 4] {
    rand::random()
}

/// XOR `key` cyclically into `payload`. Applying it twice restores the input.
pub fn apply_mask(payload: &mut [u8], key: [u8; 4]) {
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte ^= key[i & 3];
    }
}
