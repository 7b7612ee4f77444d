use serde::{Deserialize, Serialize};

/// Lifecycle status reported by the model catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    /// Generally available
    #[default]
    Active,
    /// Early preview, expect breakage
    Alpha,
    /// Feature complete but still stabilising
    Beta,
    /// Scheduled for removal
    Deprecated,
}

impl ModelStatus {
    /// Score penalty applied for lifecycle risk.
    pub fn risk_penalty(&self) -> f64 {
        match self {
            ModelStatus::Active => 0.0,
            ModelStatus::Beta => 0.05,
            ModelStatus::Alpha => 0.1,
            ModelStatus::Deprecated => 0.3,
        }
    }
}

/// Capability flags of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Capabilities {
    /// Extended reasoning / thinking support
    pub reasoning: bool,
    /// Function/tool calling support
    pub tool_calling: bool,
    /// File and image attachment support
    pub attachments: bool,
}

/// Per-unit pricing in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ModelCost {
    /// Input (prompt) cost per million tokens
    pub input: f64,
    /// Output (completion) cost per million tokens
    pub output: f64,
}

impl ModelCost {
    /// Cost of a call with the given token counts.
    pub fn calculate(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (self.input * input_tokens as f64 / 1_000_000.0)
            + (self.output * output_tokens as f64 / 1_000_000.0)
    }
}

/// A backend model endpoint from the catalog.
///
/// The identifier has the form `provider/model`; the provider is the first
/// segment. Models are immutable for the duration of one evaluation.
///
/// # Examples
///
/// ```
/// use agent_router::catalog::Model;
///
/// let model = Model::new("openai/gpt-5", "GPT-5");
/// assert_eq!(model.provider(), "openai");
/// assert!(model.is_free());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Full identifier, e.g. "anthropic/claude-sonnet-4"
    pub id: String,
    /// Human-readable model name
    pub name: String,
    #[serde(default)]
    pub status: ModelStatus,
    /// Maximum context window in tokens
    #[serde(default)]
    pub context_limit: u32,
    /// Maximum output tokens
    #[serde(default)]
    pub output_limit: u32,
    #[serde(default)]
    pub capabilities: Capabilities,
    /// Pricing; absent means free tier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<ModelCost>,
    /// Provider-imposed daily request cap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_request_limit: Option<u32>,
}

impl Model {
    /// Create an active, free model with no declared capabilities.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: ModelStatus::Active,
            context_limit: 0,
            output_limit: 0,
            capabilities: Capabilities::default(),
            cost: None,
            daily_request_limit: None,
        }
    }

    /// Provider namespace (first segment of the identifier).
    pub fn provider(&self) -> &str {
        self.id.split('/').next().unwrap_or(&self.id)
    }

    /// Model identifier within the provider namespace.
    pub fn model_name(&self) -> &str {
        self.id
            .split_once('/')
            .map(|(_, rest)| rest)
            .unwrap_or(&self.id)
    }

    /// Combined input + output price per million tokens. Missing costs count as zero.
    pub fn unit_cost(&self) -> f64 {
        self.cost
            .map(|c| c.input.max(0.0) + c.output.max(0.0))
            .unwrap_or(0.0)
    }

    /// True when the model has no cost or a zero cost.
    pub fn is_free(&self) -> bool {
        self.unit_cost() <= 0.0
    }
}
