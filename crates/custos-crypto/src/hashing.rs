/// A BLAKE3 digest (32 bytes).
pub type Hash = [u8; 32];

/// Hash arbitrary data with BLAKE3.
pub fn hash(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Derive a 32-byte key from key material, domain-separated by `context`.
pub fn derive_key(context: &str, material: &[u8]) -> Hash {
    blake3::derive_key(context, material)
}
