use std::time::Duration;

use serde::{Deserialize, Serialize};

use persona_common::get_current_timestamp;

use crate::backend::GenerationBackend;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::workflow::WorkflowGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Submitted,
    Polling,
    Completed,
    Failed,
    TimedOut,
}

/// One submitted generation. Lives for a single orchestrator invocation;
/// Completed, Failed, and TimedOut are terminal and a fresh call always
/// starts a new job rather than resuming one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationJob {
    pub job_id: Option<String>,
    pub save_prefix: String,
    pub submitted_at: u64,
    pub status: JobStatus,
    pub result_ref: Option<String>,
    pub error: Option<String>,
}

impl GenerationJob {
    fn new(save_prefix: &str) -> Self {
        Self {
            job_id: None,
            save_prefix: save_prefix.to_string(),
            submitted_at: get_current_timestamp(),
            status: JobStatus::Submitted,
            result_ref: None,
            error: None,
        }
    }

    fn accept(&mut self, job_id: String) {
        self.job_id = Some(job_id);
        self.status = JobStatus::Submitted;
    }

    fn mark_failed(&mut self, error: String) {
        self.status = JobStatus::Failed;
        self.error = Some(error);
    }

    fn mark_completed(&mut self, result_ref: String) {
        self.status = JobStatus::Completed;
        self.result_ref = Some(result_ref);
    }

    pub fn is_failed(&self) -> bool {
        self.status == JobStatus::Failed
    }
}

/// The deterministic candidate set a completion probe cycles through.
/// The backend writes `{prefix}_{counter}_.png` and exposes no job-id to
/// asset lookup, so the request-scoped prefix is the only handle we have.
pub fn candidate_filenames(save_prefix: &str, count: u32) -> Vec<String> {
    (1..=count)
        .map(|i| format!("{save_prefix}_{i:05}_.png"))
        .collect()
}

/// Submit a workflow. The returned job is either accepted (with the
/// backend's id) or already Failed, carrying the raw diagnostics.
pub async fn submit<B: GenerationBackend>(backend: &B, graph: &WorkflowGraph) -> GenerationJob {
    let mut job = GenerationJob::new(graph.save_prefix());

    match backend.submit_graph(graph).await {
        Ok(job_id) if !job_id.trim().is_empty() => {
            tracing::info!(
                "[job::submit] workflow accepted, job_id={job_id}, prefix={}",
                job.save_prefix
            );
            job.accept(job_id);
        }
        Ok(_) => job.mark_failed("backend returned an empty job identifier".to_string()),
        Err(e) => job.mark_failed(format!("{e:#}")),
    }

    job
}

/// Poll for the job's output under a hard wall-clock bound.
///
/// Probes the candidate filename set on a fixed interval; transient probe
/// errors are swallowed and retried until the bound expires. Never
/// resubmits on its own.
pub async fn await_completion<B: GenerationBackend>(
    backend: &B,
    job: &mut GenerationJob,
    config: &PipelineConfig,
) -> Result<String, PipelineError> {
    job.status = JobStatus::Polling;
    let started = tokio::time::Instant::now();
    let candidates = candidate_filenames(&job.save_prefix, config.probe_candidates);

    loop {
        for candidate in &candidates {
            match backend.output_exists(candidate).await {
                Ok(true) => {
                    job.mark_completed(candidate.clone());
                    tracing::info!(
                        "[job::await_completion] output ready: {candidate} ({}ms)",
                        started.elapsed().as_millis()
                    );
                    return Ok(candidate.clone());
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::debug!(
                        "[job::await_completion] transient probe error for {candidate}: {e:#}"
                    );
                }
            }
        }

        let waited_ms = started.elapsed().as_millis() as u64;
        if waited_ms >= config.max_wait_ms {
            job.status = JobStatus::TimedOut;
            return Err(PipelineError::Timeout {
                job_id: job.job_id.clone().unwrap_or_default(),
                waited_ms,
            });
        }
        tokio::time::sleep(Duration::from_millis(config.poll_interval_ms)).await;
    }
}
