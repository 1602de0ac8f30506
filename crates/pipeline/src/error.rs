/// Stage-tagged failure taxonomy for the generation pipeline.
///
/// Every stage returns one of these instead of bubbling an untyped error
/// across the subsystem boundary, so callers can tell "the backend never
/// accepted the job" apart from "the backend accepted it but never produced
/// output" apart from "output produced but storage failed".
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The generation backend failed the connectivity probe.
    #[error("generation backend is unreachable: {0}")]
    Configuration(String),

    /// The backend rejected the workflow, or never returned a job id.
    #[error("workflow submission failed: {0}")]
    Submission(String),

    /// No output appeared within the polling bound.
    #[error("generation timed out after {waited_ms}ms (job {job_id})")]
    Timeout { job_id: String, waited_ms: u64 },

    /// Uploading the finished image to asset storage failed.
    #[error("asset publish failed: {0}")]
    Publish(String),
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Configuration(_) => "configuration",
            PipelineError::Submission(_) => "submission",
            PipelineError::Timeout { .. } => "completion",
            PipelineError::Publish(_) => "publish",
        }
    }
}
