//! Model kinds and the request mode each one serves.

use serde::{Deserialize, Serialize};

/// Network architectures the accelerator can run.
///
/// The wire names are matched exactly (case-sensitive, no trimming). Note the
/// SqueezeNet spelling: `squezzenet` is the name deployments already use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    #[serde(rename = "googlenet")]
    GoogleNet,
    #[serde(rename = "alexnet")]
    AlexNet,
    #[serde(rename = "squezzenet")]
    SqueezeNet,
    #[serde(rename = "tiny_yolo")]
    TinyYolo,
}

impl ModelKind {
    /// All model kinds for iteration.
    pub const ALL: [ModelKind; 4] = [
        ModelKind::GoogleNet,
        ModelKind::AlexNet,
        ModelKind::SqueezeNet,
        ModelKind::TinyYolo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::GoogleNet => "googlenet",
            ModelKind::AlexNet => "alexnet",
            ModelKind::SqueezeNet => "squezzenet",
            ModelKind::TinyYolo => "tiny_yolo",
        }
    }

    /// Exact lookup by wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// The request mode this model serves. Every kind maps to exactly one mode.
    pub fn mode(&self) -> RequestMode {
        match self {
            ModelKind::GoogleNet | ModelKind::AlexNet | ModelKind::SqueezeNet => {
                RequestMode::Classification
            }
            ModelKind::TinyYolo => RequestMode::Detection,
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which category of request a deployed instance answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestMode {
    /// Ranked category/probability pairs.
    Classification,
    /// Category/probability/bounding-box tuples.
    Detection,
}

impl RequestMode {
    /// Name of the single operation registered for this mode.
    pub fn operation_name(&self) -> &'static str {
        match self {
            RequestMode::Classification => "classify_object",
            RequestMode::Detection => "detect_object",
        }
    }
}

impl std::fmt::Display for RequestMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestMode::Classification => write!(f, "classification"),
            RequestMode::Detection => write!(f, "detection"),
        }
    }
}
