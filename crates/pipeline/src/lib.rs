mod backend;
mod character;
mod config;
mod error;
mod job;
mod model;
mod orchestrator;
mod prompt;
mod publish;
mod seed;
mod workflow;

pub use backend::{AssetStore, GenerationBackend};
pub use character::{CharacterSpec, OwnerKind, PersonalityTraits, TagCategory};
pub use config::{PipelineConfig, DEFAULT_SUBMIT_TIMEOUT_MS};
pub use error::PipelineError;
pub use job::{candidate_filenames, GenerationJob, JobStatus};
pub use model::{select_model, ArtStyle, LoraAdapter, ModelSelection};
pub use orchestrator::{EmbeddingSetResult, GenerationOrchestrator};
pub use prompt::{compose, PromptSpec, EXPLICIT_MARKER};
pub use publish::{slug, AssetPublisher, AssetRole, GeneratedAsset};
pub use seed::{fresh_seed, CharacterSeed, VariationKind, MAX_SEED};
pub use workflow::{
    build_generation_graph, Dimensions, NodeInput, NodeRef, SamplerConfig, WorkflowGraph,
    WorkflowNode,
};
