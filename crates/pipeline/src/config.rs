use crate::workflow::{Dimensions, SamplerConfig};

pub const DEFAULT_SUBMIT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_MAX_WAIT_MS: u64 = 120_000;
pub const DEFAULT_PROBE_CANDIDATES: u32 = 5;
pub const DEFAULT_INTER_REQUEST_DELAY_MS: u64 = 2_000;

/// Tunables for one orchestrator instance. Callers mostly take the
/// defaults; tests shrink the timing knobs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub dimensions: Dimensions,
    pub sampler: SamplerConfig,

    /// Hard bound on the submission request itself, enforced around
    /// every submit attempt.
    pub submit_timeout_ms: u64,
    /// Fixed interval between completion probes. No backoff.
    pub poll_interval_ms: u64,
    /// Hard bound on the whole completion wait.
    pub max_wait_ms: u64,
    /// How many numbered candidate filenames each probe cycle checks.
    pub probe_candidates: u32,
    /// Pause between sequential embedding-set generations.
    pub inter_request_delay_ms: u64,
    /// Extra submission attempts after the first. Zero means the pipeline
    /// never retries on its own; a caller wanting another try starts a
    /// fresh job.
    pub retry_count: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dimensions: Dimensions::default(),
            sampler: SamplerConfig::default(),
            submit_timeout_ms: DEFAULT_SUBMIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_wait_ms: DEFAULT_MAX_WAIT_MS,
            probe_candidates: DEFAULT_PROBE_CANDIDATES,
            inter_request_delay_ms: DEFAULT_INTER_REQUEST_DELAY_MS,
            retry_count: 0,
        }
    }
}
