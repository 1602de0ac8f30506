mod comfy;
mod r2;

pub use comfy::ComfyClient;
pub use r2::R2Client;
