//! Fakes and fixtures shared by unit and integration tests.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use config::{Config, File, FileFormat};
use ncs_common::BoundingBox;
use tempfile::TempDir;

use crate::config::{ConfigParams, PARAMS_TABLE};
use crate::engine::{
    ClassificationItem, ClassificationResult, DetectionItem, DetectionResult, EngineFactory,
    EngineParams, VisionEngine,
};
use crate::error::{EngineConstructionError, ImageLoadError};
use crate::image::{ImageLoader, PixelBuffer};

/// Graph and category files in a scratch directory, removed on drop.
pub struct ParamFiles {
    pub dir: TempDir,
    pub graph: PathBuf,
    pub categories: PathBuf,
}

impl ParamFiles {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create scratch dir");
        let graph = dir.path().join("graph");
        let categories = dir.path().join("categories.txt");
        std::fs::write(&graph, b"graph").expect("Failed to write graph file");
        std::fs::write(&categories, "background\ncat\ncar\n")
            .expect("Failed to write category file");
        Self {
            dir,
            graph,
            categories,
        }
    }
}

impl Default for ParamFiles {
    fn default() -> Self {
        Self::new()
    }
}

/// Valid params for `cnn_type` pointing at `files`, with `extra` TOML lines
/// appended to the params table.
pub fn params_for(files: &ParamFiles, cnn_type: &str, extra: &str) -> ConfigParams {
    let toml = format!(
        r#"
        [{PARAMS_TABLE}]
        device_index = 0
        log_level = 1
        cnn_type = "{cnn_type}"
        graph_file_path = "{}"
        category_file_path = "{}"
        network_dimension = 224
        channel1_mean = 104.0
        channel2_mean = 117.0
        channel3_mean = 123.0
        {extra}
        "#,
        files.graph.display(),
        files.categories.display()
    );
    let config = Config::builder()
        .add_source(File::from_str(&toml, FileFormat::Toml))
        .build()
        .expect("Failed to parse test params");
    ConfigParams::new(config, PARAMS_TABLE)
}

pub fn classification_result(items: &[(&str, f32)], time_taken_ms: f32) -> ClassificationResult {
    ClassificationResult {
        items: items
            .iter()
            .map(|(category, probability)| ClassificationItem {
                category: category.to_string(),
                probability: *probability,
            })
            .collect(),
        time_taken_ms,
    }
}

pub fn detection_result(items: &[(&str, f32, BoundingBox)], time_taken_ms: f32) -> DetectionResult {
    DetectionResult {
        items: items
            .iter()
            .map(|(category, probability, bbox)| DetectionItem {
                category: category.to_string(),
                probability: *probability,
                bbox: *bbox,
            })
            .collect(),
        time_taken_ms,
    }
}

#[derive(Default)]
struct FakeEngineState {
    classification: Option<ClassificationResult>,
    detection: Option<DetectionResult>,
    classify_calls: Vec<u32>,
    detect_calls: usize,
}

/// Engine returning canned results. Without a canned result it returns no result.
#[derive(Clone, Default)]
pub struct FakeEngine {
    state: Arc<Mutex<FakeEngineState>>,
}

impl FakeEngine {
    pub fn with_classification(self, result: ClassificationResult) -> Self {
        self.state.lock().unwrap().classification = Some(result);
        self
    }

    pub fn with_detection(self, result: DetectionResult) -> Self {
        self.state.lock().unwrap().detection = Some(result);
        self
    }

    /// `top_n` of every classify call, in order.
    pub fn classify_calls(&self) -> Vec<u32> {
        self.state.lock().unwrap().classify_calls.clone()
    }

    pub fn detect_calls(&self) -> usize {
        self.state.lock().unwrap().detect_calls
    }
}

#[async_trait]
impl VisionEngine for FakeEngine {
    fn engine_type(&self) -> &'static str {
        "fake"
    }

    async fn classify(&self, _image: &PixelBuffer, top_n: u32) -> Option<ClassificationResult> {
        let mut state = self.state.lock().unwrap();
        state.classify_calls.push(top_n);
        state.classification.clone()
    }

    async fn detect(&self, _image: &PixelBuffer) -> Option<DetectionResult> {
        let mut state = self.state.lock().unwrap();
        state.detect_calls += 1;
        state.detection.clone()
    }
}

/// Factory handing out a [`FakeEngine`], or failing every construction.
pub struct FakeFactory {
    engine: FakeEngine,
    failure: Option<String>,
    construct_calls: AtomicUsize,
    last_params: Mutex<Option<EngineParams>>,
}

impl FakeFactory {
    pub fn new(engine: FakeEngine) -> Self {
        Self {
            engine,
            failure: None,
            construct_calls: AtomicUsize::new(0),
            last_params: Mutex::new(None),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            ..Self::new(FakeEngine::default())
        }
    }

    pub fn construct_calls(&self) -> usize {
        self.construct_calls.load(Ordering::SeqCst)
    }

    pub fn last_params(&self) -> Option<EngineParams> {
        self.last_params.lock().unwrap().clone()
    }
}

#[async_trait]
impl EngineFactory for FakeFactory {
    async fn construct(
        &self,
        params: &EngineParams,
    ) -> Result<Box<dyn VisionEngine>, EngineConstructionError> {
        self.construct_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_params.lock().unwrap() = Some(params.clone());
        match &self.failure {
            Some(reason) => Err(EngineConstructionError::Rejected(reason.clone())),
            None => Ok(Box::new(self.engine.clone())),
        }
    }
}

/// Loader that returns a 1x1 image for every path except the unreadable ones.
#[derive(Default)]
pub struct FakeImageLoader {
    unreadable: HashSet<String>,
}

impl FakeImageLoader {
    pub fn with_unreadable(mut self, path: &str) -> Self {
        self.unreadable.insert(path.to_string());
        self
    }
}

impl ImageLoader for FakeImageLoader {
    fn load(&self, path: &str) -> Result<PixelBuffer, ImageLoadError> {
        if self.unreadable.contains(path) {
            return Err(ImageLoadError::Unreadable {
                path: path.to_string(),
                reason: "No such file or directory".to_string(),
            });
        }
        Ok(PixelBuffer {
            width: 1,
            height: 1,
            data: vec![0, 0, 0],
        })
    }
}
