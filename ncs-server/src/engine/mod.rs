//! Inference engine abstraction layer.
//!
//! The gateway consumes the accelerator through [`VisionEngine`] and builds it
//! once through an [`EngineFactory`].

mod remote;

pub use remote::{RemoteEngine, RemoteEngineFactory};

use std::path::PathBuf;

use async_trait::async_trait;
use ncs_common::{BoundingBox, ModelKind};
use serde::{Deserialize, Serialize};

use crate::config::LogLevel;
use crate::error::EngineConstructionError;
use crate::image::PixelBuffer;

/// Everything needed to bind a device and load a graph onto it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineParams {
    pub device_index: u32,
    #[serde(serialize_with = "serialize_log_level")]
    pub log_level: LogLevel,
    pub model_kind: ModelKind,
    pub graph_file_path: PathBuf,
    pub category_file_path: PathBuf,
    pub network_dimension: u32,
    pub channel_means: [f32; 3],
}

fn serialize_log_level<S: serde::Serializer>(
    level: &LogLevel,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(level.ordinal())
}

/// One ranked category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationItem {
    pub category: String,
    pub probability: f32,
}

/// Classification output, ordered by descending probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub items: Vec<ClassificationItem>,
    pub time_taken_ms: f32,
}

/// One detected object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionItem {
    pub category: String,
    pub probability: f32,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub items: Vec<DetectionItem>,
    pub time_taken_ms: f32,
}

/// A constructed engine bound to one device and one graph.
///
/// `None` means the engine produced no result (device busy, input the model
/// could not use). Callers must not issue concurrent calls.
#[async_trait]
pub trait VisionEngine: Send + Sync {
    /// Backend identifier for logs (e.g., "remote").
    fn engine_type(&self) -> &'static str;

    async fn classify(&self, image: &PixelBuffer, top_n: u32) -> Option<ClassificationResult>;

    async fn detect(&self, image: &PixelBuffer) -> Option<DetectionResult>;
}

/// Builds the engine. Hardware binding and model loading happen here.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    async fn construct(
        &self,
        params: &EngineParams,
    ) -> Result<Box<dyn VisionEngine>, EngineConstructionError>;
}
