use std::collections::BTreeMap;

use anyhow::{bail, Result};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Serialize, Serializer};

use crate::prompt::PromptSpec;

/// Reference to an earlier node's output slot. Serializes to the backend's
/// `["<node id>", <slot>]` wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRef {
    pub node: u32,
    pub output: u32,
}

impl Serialize for NodeRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.node.to_string())?;
        tuple.serialize_element(&self.output)?;
        tuple.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NodeInput {
    Ref(NodeRef),
    Text(String),
    Int(i64),
    Float(f64),
}

impl From<NodeRef> for NodeInput {
    fn from(r: NodeRef) -> Self {
        NodeInput::Ref(r)
    }
}

impl From<&str> for NodeInput {
    fn from(s: &str) -> Self {
        NodeInput::Text(s.to_string())
    }
}

impl From<String> for NodeInput {
    fn from(s: String) -> Self {
        NodeInput::Text(s)
    }
}

impl From<u32> for NodeInput {
    fn from(n: u32) -> Self {
        NodeInput::Int(n as i64)
    }
}

impl From<f64> for NodeInput {
    fn from(n: f64) -> Self {
        NodeInput::Float(n)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowNode {
    pub class_type: String,
    pub inputs: BTreeMap<String, NodeInput>,
}

/// One fixed-shape generation DAG, keyed by monotonically allocated ids.
///
/// serde_json renders the integer keys as strings, which is exactly the
/// backend's expected wire format.
#[derive(Debug, Clone)]
pub struct WorkflowGraph {
    nodes: BTreeMap<u32, WorkflowNode>,
    save_prefix: String,
}

impl WorkflowGraph {
    pub fn nodes(&self) -> &BTreeMap<u32, WorkflowNode> {
        &self.nodes
    }

    /// Filename prefix the terminal save node writes under.
    pub fn save_prefix(&self) -> &str {
        &self.save_prefix
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.nodes).expect("workflow nodes always serialize")
    }

    /// Check the construction invariants: every reference points to an
    /// earlier node, and there is exactly one terminal save node.
    pub fn validate(&self) -> Result<()> {
        let mut save_nodes = 0;
        for (id, node) in &self.nodes {
            if node.class_type == "SaveImage" {
                save_nodes += 1;
            }
            for (input_name, input) in &node.inputs {
                if let NodeInput::Ref(r) = input {
                    if r.node >= *id {
                        bail!(
                            "node {id} input '{input_name}' references node {} (not earlier)",
                            r.node
                        );
                    }
                    if !self.nodes.contains_key(&r.node) {
                        bail!("node {id} input '{input_name}' references missing node {}", r.node);
                    }
                }
            }
        }
        if save_nodes != 1 {
            bail!("expected exactly one save node, found {save_nodes}");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Default for Dimensions {
    fn default() -> Self {
        // Portrait aspect, the platform's avatar default.
        Self { width: 832, height: 1216 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
    pub steps: u32,
    pub cfg_scale: f64,
    pub sampler_name: String,
    pub scheduler: String,
    pub denoise: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            steps: 30,
            cfg_scale: 4.5,
            sampler_name: "euler_ancestral".to_string(),
            scheduler: "normal".to_string(),
            denoise: 1.0,
        }
    }
}

/// Sequential id allocator; makes the no-forward-reference invariant hold
/// by construction.
struct GraphAssembler {
    next_id: u32,
    nodes: BTreeMap<u32, WorkflowNode>,
}

impl GraphAssembler {
    fn new() -> Self {
        Self { next_id: 1, nodes: BTreeMap::new() }
    }

    fn add(&mut self, class_type: &str, inputs: Vec<(&str, NodeInput)>) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(
            id,
            WorkflowNode {
                class_type: class_type.to_string(),
                inputs: inputs
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
            },
        );
        id
    }
}

/// Assemble the generation DAG: checkpoint load, chained adapters, prompt
/// encodes, latent init, sampler, decode, and a single terminal save node.
pub fn build_generation_graph(
    prompt: &PromptSpec,
    dimensions: Dimensions,
    sampler: &SamplerConfig,
    seed: u32,
    save_prefix: &str,
) -> WorkflowGraph {
    let mut graph = GraphAssembler::new();

    let checkpoint = graph.add(
        "CheckpointLoaderSimple",
        vec![("ckpt_name", prompt.checkpoint.as_str().into())],
    );

    // Thread the model/encoder references through each adapter in turn.
    let mut model_ref = NodeRef { node: checkpoint, output: 0 };
    let mut clip_ref = NodeRef { node: checkpoint, output: 1 };
    let vae_ref = NodeRef { node: checkpoint, output: 2 };

    for adapter in &prompt.adapters {
        let lora = graph.add(
            "LoraLoader",
            vec![
                ("lora_name", format!("{}.safetensors", adapter.name).into()),
                ("strength_model", (adapter.strength as f64).into()),
                ("strength_clip", (adapter.strength as f64).into()),
                ("model", model_ref.into()),
                ("clip", clip_ref.into()),
            ],
        );
        model_ref = NodeRef { node: lora, output: 0 };
        clip_ref = NodeRef { node: lora, output: 1 };
    }

    let positive = graph.add(
        "CLIPTextEncode",
        vec![
            ("text", prompt.positive.as_str().into()),
            ("clip", clip_ref.into()),
        ],
    );
    let negative = graph.add(
        "CLIPTextEncode",
        vec![
            ("text", prompt.negative.as_str().into()),
            ("clip", clip_ref.into()),
        ],
    );

    let latent = graph.add(
        "EmptyLatentImage",
        vec![
            ("width", dimensions.width.into()),
            ("height", dimensions.height.into()),
            ("batch_size", 1u32.into()),
        ],
    );

    let ksampler = graph.add(
        "KSampler",
        vec![
            ("seed", seed.into()),
            ("steps", sampler.steps.into()),
            ("cfg", sampler.cfg_scale.into()),
            ("sampler_name", sampler.sampler_name.as_str().into()),
            ("scheduler", sampler.scheduler.as_str().into()),
            ("denoise", sampler.denoise.into()),
            ("model", model_ref.into()),
            ("positive", NodeRef { node: positive, output: 0 }.into()),
            ("negative", NodeRef { node: negative, output: 0 }.into()),
            ("latent_image", NodeRef { node: latent, output: 0 }.into()),
        ],
    );

    let decode = graph.add(
        "VAEDecode",
        vec![
            ("samples", NodeRef { node: ksampler, output: 0 }.into()),
            ("vae", vae_ref.into()),
        ],
    );

    graph.add(
        "SaveImage",
        vec![
            ("filename_prefix", save_prefix.into()),
            ("images", NodeRef { node: decode, output: 0 }.into()),
        ],
    );

    WorkflowGraph {
        nodes: graph.nodes,
        save_prefix: save_prefix.to_string(),
    }
}
