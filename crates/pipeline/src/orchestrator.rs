use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::{AssetStore, GenerationBackend};
use crate::character::CharacterSpec;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::job;
use crate::prompt::PromptSpec;
use crate::publish::{slug, AssetPublisher, AssetRole, GeneratedAsset};
use crate::seed::{fresh_seed, CharacterSeed, VariationKind};
use crate::workflow::build_generation_graph;

/// Outcome of a multi-image embedding-set run: partial failures are
/// collected, not fatal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSetResult {
    pub assets: Vec<GeneratedAsset>,
    pub failed: usize,
    pub failures: Vec<String>,
}

/// Coordinates seed derivation, prompt composition, graph construction,
/// submit/poll, and publishing. Invocations share no mutable state, so
/// callers may run them concurrently.
pub struct GenerationOrchestrator<B: GenerationBackend, S: AssetStore> {
    backend: B,
    publisher: AssetPublisher<S>,
    config: PipelineConfig,
}

impl<B: GenerationBackend, S: AssetStore> GenerationOrchestrator<B, S> {
    /// Probe backend connectivity once at construction; an unreachable
    /// backend is a configuration error, not a per-job failure.
    pub async fn new(
        backend: B,
        store: S,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        if !backend.healthy().await {
            return Err(PipelineError::Configuration(
                "generation backend did not answer the connectivity probe".to_string(),
            ));
        }
        Ok(Self {
            backend,
            publisher: AssetPublisher::new(store),
            config,
        })
    }

    /// Reproducible portrait: the character's identity seed, published
    /// under role=avatar.
    pub async fn generate_avatar(
        &self,
        spec: &CharacterSpec,
    ) -> Result<GeneratedAsset, PipelineError> {
        let seed = CharacterSeed::derive(&spec.name, &spec.description).base();
        tracing::info!(
            "[GenerationOrchestrator::generate_avatar] character={}, seed={seed}",
            spec.name
        );
        self.run_generation(spec, seed, AssetRole::Avatar, None, None)
            .await
    }

    /// `count` sequential independent generations with fresh random seeds
    /// (diversity, not reproducibility) and a fixed inter-request delay to
    /// bound backend load. Deliberately not parallel.
    pub async fn generate_embedding_set(
        &self,
        spec: &CharacterSpec,
        count: usize,
    ) -> EmbeddingSetResult {
        let mut assets = Vec::new();
        let mut failures = Vec::new();

        for i in 0..count {
            let seed = fresh_seed();
            let name_suffix = format!("emb{i}");
            match self
                .run_generation(spec, seed, AssetRole::Embeddings, None, Some(&name_suffix))
                .await
            {
                Ok(asset) => assets.push(asset),
                Err(e) => {
                    tracing::warn!(
                        "[GenerationOrchestrator::generate_embedding_set] image {i} failed at {}: {e}",
                        e.stage()
                    );
                    failures.push(format!("image {i} [{}]: {e}", e.stage()));
                }
            }

            if i + 1 < count && self.config.inter_request_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.inter_request_delay_ms))
                    .await;
            }
        }

        EmbeddingSetResult {
            failed: failures.len(),
            assets,
            failures,
        }
    }

    /// Identity-preserving secondary image: kind-derived seed plus a
    /// kind-specific prompt suffix, published under role=variations.
    pub async fn generate_variation(
        &self,
        base_seed: u32,
        kind: VariationKind,
        spec: &CharacterSpec,
    ) -> Result<GeneratedAsset, PipelineError> {
        let seed = CharacterSeed::from_base(base_seed).variation(kind);
        tracing::info!(
            "[GenerationOrchestrator::generate_variation] character={}, kind={}, seed={seed}",
            spec.name,
            kind.as_str()
        );
        self.run_generation(
            spec,
            seed,
            AssetRole::Variations,
            kind.prompt_suffix(),
            Some(kind.as_str()),
        )
        .await
    }

    /// One full compose → build → submit → poll → publish pass. Each stage
    /// failure short-circuits with its stage tag attached.
    async fn run_generation(
        &self,
        spec: &CharacterSpec,
        seed: u32,
        role: AssetRole,
        positive_suffix: Option<&str>,
        name_suffix: Option<&str>,
    ) -> Result<GeneratedAsset, PipelineError> {
        let mut prompt = PromptSpec::from_character(spec);
        if let Some(suffix) = positive_suffix {
            prompt = prompt.with_positive_suffix(suffix);
        }

        // Request-scoped token: completion probes key off this prefix, so
        // concurrent generations of the same character cannot race.
        let token = uuid::Uuid::new_v4().simple().to_string();
        let save_prefix = match name_suffix {
            Some(suffix) => format!("{}_{}_{}", slug(&spec.name), suffix, &token[..8]),
            None => format!("{}_{}", slug(&spec.name), &token[..8]),
        };

        let graph = build_generation_graph(
            &prompt,
            self.config.dimensions,
            &self.config.sampler,
            seed,
            &save_prefix,
        );

        let submit_bound = Duration::from_millis(self.config.submit_timeout_ms);
        let mut attempt = 0;
        let mut job = loop {
            let submitted =
                tokio::time::timeout(submit_bound, job::submit(&self.backend, &graph)).await;

            let diagnostics = match submitted {
                Ok(job) if !job.is_failed() => break job,
                Ok(job) => job.error.unwrap_or_else(|| "submission failed".to_string()),
                Err(_) => format!(
                    "no submission response within {}ms",
                    self.config.submit_timeout_ms
                ),
            };
            if attempt >= self.config.retry_count {
                return Err(PipelineError::Submission(diagnostics));
            }
            attempt += 1;
            tracing::warn!(
                "[GenerationOrchestrator::run_generation] resubmitting (attempt {attempt} of {})",
                self.config.retry_count
            );
        };

        let result_ref = job::await_completion(&self.backend, &mut job, &self.config).await?;

        let data = self
            .backend
            .fetch_output(&result_ref)
            .await
            .map_err(|e| PipelineError::Publish(format!("output fetch failed: {e:#}")))?;

        self.publisher
            .publish(
                data,
                &result_ref,
                &spec.owner_id,
                spec.owner_kind,
                &spec.name,
                role,
                seed,
            )
            .await
    }
}
