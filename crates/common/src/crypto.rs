/// Lowercase hex digest of the blake3 hash of `data`.
pub fn blake3_hex(data: &[u8]) -> String {
    hex::encode(blake3::hash(data).as_bytes())
}
