use anyhow::Result;

use crate::workflow::WorkflowGraph;

/// Seam to the external image-synthesis backend.
///
/// The production implementation lives in `persona-clients`; tests drive the
/// pipeline against in-memory stubs.
#[async_trait::async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Queue a workflow for execution and return the backend's job id.
    async fn submit_graph(&self, graph: &WorkflowGraph) -> Result<String>;

    /// Lightweight existence check for a finished output file.
    async fn output_exists(&self, filename: &str) -> Result<bool>;

    /// Download the bytes of a finished output file.
    async fn fetch_output(&self, filename: &str) -> Result<Vec<u8>>;

    /// Side-effect-free connectivity probe.
    async fn healthy(&self) -> bool;
}

/// Seam to durable asset storage.
#[async_trait::async_trait]
pub trait AssetStore: Send + Sync {
    /// Upload a single object and return its public URL.
    async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<String>;
}
