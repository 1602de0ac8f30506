use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use persona_pipeline::{
    AssetRole, AssetStore, CharacterSeed, CharacterSpec, GenerationBackend,
    GenerationOrchestrator, PipelineConfig, TagCategory, VariationKind, WorkflowGraph,
};

#[derive(Default)]
struct BackendState {
    submitted: Vec<(String, serde_json::Value)>,
    available: HashSet<String>,
}

/// In-memory stand-in for the synthesis backend. When `serve_outputs` is
/// set, every accepted workflow's first candidate file becomes available
/// immediately; otherwise no probe ever succeeds.
#[derive(Clone)]
struct StubBackend {
    state: Arc<Mutex<BackendState>>,
    serve_outputs: bool,
    fail_submission: bool,
    reachable: bool,
    submit_delay_ms: u64,
}

impl StubBackend {
    fn serving() -> Self {
        Self {
            state: Arc::new(Mutex::new(BackendState::default())),
            serve_outputs: true,
            fail_submission: false,
            reachable: true,
            submit_delay_ms: 0,
        }
    }

    fn silent() -> Self {
        Self {
            serve_outputs: false,
            ..Self::serving()
        }
    }

    fn rejecting() -> Self {
        Self {
            fail_submission: true,
            ..Self::serving()
        }
    }

    fn submitted_positive_prompts(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .submitted
            .iter()
            .flat_map(|(_, graph)| {
                graph
                    .as_object()
                    .unwrap()
                    .values()
                    .filter(|node| node["class_type"] == "CLIPTextEncode")
                    .map(|node| node["inputs"]["text"].as_str().unwrap().to_string())
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl GenerationBackend for StubBackend {
    async fn submit_graph(&self, graph: &WorkflowGraph) -> Result<String> {
        if self.submit_delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.submit_delay_ms)).await;
        }
        if self.fail_submission {
            bail!("400 Bad Request: invalid checkpoint");
        }
        let mut state = self.state.lock().unwrap();
        state
            .submitted
            .push((graph.save_prefix().to_string(), graph.to_json()));
        if self.serve_outputs {
            state
                .available
                .insert(format!("{}_00001_.png", graph.save_prefix()));
        }
        Ok(format!("job-{}", state.submitted.len()))
    }

    async fn output_exists(&self, filename: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().available.contains(filename))
    }

    async fn fetch_output(&self, _filename: &str) -> Result<Vec<u8>> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn healthy(&self) -> bool {
        self.reachable
    }
}

/// Records uploads; keys containing a fail marker error out (placeholder
/// objects excluded) to simulate storage failures.
#[derive(Clone, Default)]
struct StubStore {
    uploads: Arc<Mutex<Vec<String>>>,
    fail_markers: Vec<&'static str>,
}

#[async_trait::async_trait]
impl AssetStore for StubStore {
    async fn put_object(&self, key: &str, _data: Vec<u8>, _content_type: &str) -> Result<String> {
        if !key.ends_with(".keep") && self.fail_markers.iter().any(|m| key.contains(m)) {
            bail!("503 Service Unavailable");
        }
        self.uploads.lock().unwrap().push(key.to_string());
        Ok(format!("https://assets.test/{key}"))
    }
}

fn fast_config() -> PipelineConfig {
    PipelineConfig {
        poll_interval_ms: 5,
        max_wait_ms: 200,
        inter_request_delay_ms: 1,
        ..PipelineConfig::default()
    }
}

fn aria() -> CharacterSpec {
    let mut spec = CharacterSpec::new("Aria", "silver-haired sorceress", "fantasy", "owner-1");
    spec.tags
        .insert(TagCategory::ContentRating, vec!["mature".to_string()]);
    spec
}

async fn orchestrator(
    backend: StubBackend,
    store: StubStore,
) -> GenerationOrchestrator<StubBackend, StubStore> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    GenerationOrchestrator::new(backend, store, fast_config())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_avatar_generation_end_to_end() {
    let backend = StubBackend::serving();
    let store = StubStore::default();
    let orch = orchestrator(backend.clone(), store.clone()).await;

    let asset = orch.generate_avatar(&aria()).await.unwrap();

    assert_eq!(asset.role, AssetRole::Avatar);
    assert_eq!(
        asset.seed_used,
        CharacterSeed::derive("Aria", "silver-haired sorceress").base()
    );
    assert!(asset.owner_path.starts_with("owner-1/characters/aria/avatar/"));
    assert!(asset.published_url.contains(&asset.owner_path));

    let prompts = backend.submitted_positive_prompts();
    assert!(prompts.iter().any(|p| p.contains("fantasy art")));
    assert!(prompts.iter().any(|p| p.contains("silver-haired sorceress")));
}

#[tokio::test]
async fn test_identical_specs_share_seed_but_not_filenames() {
    let backend = StubBackend::serving();
    let orch = orchestrator(backend, StubStore::default()).await;

    let first = orch.generate_avatar(&aria()).await.unwrap();
    let second = orch.generate_avatar(&aria()).await.unwrap();

    assert_eq!(first.seed_used, second.seed_used);
    assert_ne!(first.published_url, second.published_url);
    assert_ne!(first.source_ref, second.source_ref);
}

#[tokio::test]
async fn test_unreachable_backend_is_a_configuration_error() {
    let backend = StubBackend {
        reachable: false,
        ..StubBackend::serving()
    };
    let err = GenerationOrchestrator::new(backend, StubStore::default(), fast_config())
        .await
        .err()
        .unwrap();
    assert_eq!(err.stage(), "configuration");
}

#[tokio::test]
async fn test_submission_rejection_is_stage_tagged() {
    let orch = orchestrator(StubBackend::rejecting(), StubStore::default()).await;

    let err = orch.generate_avatar(&aria()).await.err().unwrap();
    assert_eq!(err.stage(), "submission");
    assert!(err.to_string().contains("400 Bad Request"));
}

#[tokio::test]
async fn test_configured_submission_bound_fires() {
    let backend = StubBackend {
        submit_delay_ms: 500,
        ..StubBackend::serving()
    };
    let config = PipelineConfig {
        submit_timeout_ms: 20,
        ..fast_config()
    };
    let orch = GenerationOrchestrator::new(backend, StubStore::default(), config)
        .await
        .unwrap();

    let err = orch.generate_avatar(&aria()).await.err().unwrap();
    assert_eq!(err.stage(), "submission");
    assert!(err.to_string().contains("no submission response within 20ms"));
}

#[tokio::test]
async fn test_silent_backend_times_out() {
    let orch = orchestrator(StubBackend::silent(), StubStore::default()).await;

    let err = orch.generate_avatar(&aria()).await.err().unwrap();
    assert_eq!(err.stage(), "completion");
    match err {
        persona_pipeline::PipelineError::Timeout { waited_ms, .. } => {
            assert!(waited_ms >= 200);
        }
        other => panic!("expected timeout, got {other}"),
    }
}

#[tokio::test]
async fn test_embedding_set_collects_partial_failures() {
    let backend = StubBackend::serving();
    let store = StubStore {
        fail_markers: vec!["_emb1_", "_emb3_"],
        ..StubStore::default()
    };
    let orch = orchestrator(backend, store.clone()).await;

    let result = orch.generate_embedding_set(&aria(), 5).await;

    assert_eq!(result.assets.len(), 3);
    assert_eq!(result.failed, 2);
    assert_eq!(result.failures.len(), 2);
    assert!(result.failures.iter().all(|f| f.contains("[publish]")));
    for asset in &result.assets {
        assert_eq!(asset.role, AssetRole::Embeddings);
        assert!(asset.owner_path.contains("/embeddings/"));
    }
}

#[tokio::test]
async fn test_variation_derives_seed_and_prompt_suffix() {
    let backend = StubBackend::serving();
    let orch = orchestrator(backend.clone(), StubStore::default()).await;

    let base_seed = CharacterSeed::derive("Aria", "silver-haired sorceress").base();
    let asset = orch
        .generate_variation(base_seed, VariationKind::Face, &aria())
        .await
        .unwrap();

    assert_eq!(
        asset.seed_used,
        CharacterSeed::from_base(base_seed).variation(VariationKind::Face)
    );
    assert_eq!(asset.role, AssetRole::Variations);
    assert!(asset.owner_path.contains("/variations/"));
    assert!(asset.source_ref.contains("_face_"));

    let prompts = backend.submitted_positive_prompts();
    assert!(prompts
        .iter()
        .any(|p| p.contains("close-up portrait, same face")));
}
