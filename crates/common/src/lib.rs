mod client;
mod crypto;

pub use client::ModuleClient;
pub use crypto::blake3_hex;

pub fn get_current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}
