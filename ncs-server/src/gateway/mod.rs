//! Inference gateway: owns the single engine and serves the one operation the
//! configured model supports.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ncs_common::{
    ClassifyObjectRequest, ClassifyObjectResponse, DetectObjectRequest, DetectObjectResponse,
    Object, ObjectInBox, RequestMode,
};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::{self, Configuration, ParamSource};
use crate::engine::{EngineFactory, VisionEngine};
use crate::error::{EngineConstructionError, RequestFailure, Result, StartupError};
use crate::image::{ImageLoader, PixelBuffer};

/// Lifecycle of a gateway. `Serving` lasts until shutdown; request failures
/// never leave it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayState {
    Uninitialized,
    Initializing,
    Serving,
    Failed,
}

pub struct InferenceGateway {
    config: Configuration,
    image_loader: Arc<dyn ImageLoader>,
    // Locked for the whole engine call: one call in flight at a time.
    engine: Option<Mutex<Box<dyn VisionEngine>>>,
    state: GatewayState,
    serving_since: Option<DateTime<Utc>>,
}

impl InferenceGateway {
    pub fn new(config: Configuration, image_loader: Arc<dyn ImageLoader>) -> Self {
        Self {
            config,
            image_loader,
            engine: None,
            state: GatewayState::Uninitialized,
            serving_since: None,
        }
    }

    /// Construct the engine and start serving. Only valid once.
    pub async fn initialize(
        &mut self,
        factory: &dyn EngineFactory,
    ) -> std::result::Result<(), EngineConstructionError> {
        if self.state != GatewayState::Uninitialized {
            return Err(EngineConstructionError::AlreadyInitialized);
        }

        tracing::debug!("Gateway initializing");
        self.state = GatewayState::Initializing;

        match factory.construct(&self.config.engine_params()).await {
            Ok(engine) => {
                tracing::info!(
                    "Engine {} ready for {} on device {}, serving {}",
                    engine.engine_type(),
                    self.config.model_kind(),
                    self.config.device_index(),
                    self.operation()
                );
                self.engine = Some(Mutex::new(engine));
                self.state = GatewayState::Serving;
                self.serving_since = Some(Utc::now());
                Ok(())
            }
            Err(e) => {
                tracing::error!("Engine construction failed: {}", e);
                self.state = GatewayState::Failed;
                Err(e)
            }
        }
    }

    pub fn state(&self) -> GatewayState {
        self.state
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn mode(&self) -> RequestMode {
        self.config.mode()
    }

    /// Name of the one operation this gateway registers.
    pub fn operation(&self) -> &'static str {
        self.mode().operation_name()
    }

    pub fn serving_since(&self) -> Option<DateTime<Utc>> {
        self.serving_since
    }

    /// Classify the image at `request.image_path`, keeping the engine's ranking.
    pub async fn handle_classify(
        &self,
        request: &ClassifyObjectRequest,
    ) -> Result<ClassifyObjectResponse> {
        let engine = self.engine_for(RequestMode::Classification)?;
        let image = self.load_image(&request.image_path).await?;

        let result = {
            let engine = engine.lock().await;
            engine.classify(&image, self.config.top_n()).await
        }
        .ok_or(RequestFailure::NoResult {
            operation: RequestMode::Classification.operation_name(),
        })?;

        let objects = result
            .items
            .into_iter()
            .map(|item| Object {
                object_name: item.category,
                probability: item.probability,
            })
            .collect();

        Ok(ClassifyObjectResponse {
            objects,
            inference_time_ms: result.time_taken_ms,
        })
    }

    /// Detect objects in the image at `request.image_path`. Boxes are passed
    /// through unchanged.
    pub async fn handle_detect(
        &self,
        request: &DetectObjectRequest,
    ) -> Result<DetectObjectResponse> {
        let engine = self.engine_for(RequestMode::Detection)?;
        let image = self.load_image(&request.image_path).await?;

        let result = {
            let engine = engine.lock().await;
            engine.detect(&image).await
        }
        .ok_or(RequestFailure::NoResult {
            operation: RequestMode::Detection.operation_name(),
        })?;

        let objects = result
            .items
            .into_iter()
            .map(|item| ObjectInBox {
                object: Object {
                    object_name: item.category,
                    probability: item.probability,
                },
                bounding_box: item.bbox,
            })
            .collect();

        Ok(DetectObjectResponse {
            objects,
            inference_time_ms: result.time_taken_ms,
        })
    }

    fn engine_for(&self, mode: RequestMode) -> Result<&Mutex<Box<dyn VisionEngine>>> {
        let engine = match (&self.engine, self.state) {
            (Some(engine), GatewayState::Serving) => engine,
            _ => return Err(RequestFailure::NotServing),
        };
        if mode != self.mode() {
            return Err(RequestFailure::OperationNotRegistered(mode.operation_name()));
        }
        Ok(engine)
    }

    async fn load_image(&self, path: &str) -> Result<PixelBuffer> {
        let loader = Arc::clone(&self.image_loader);
        let owned_path = path.to_string();
        let image = tokio::task::spawn_blocking(move || loader.load(&owned_path))
            .await
            .map_err(|e| {
                tracing::error!("Image loading task for {} failed: {}", path, e);
                RequestFailure::Internal(format!("image loading task failed: {}", e))
            })?;

        image.map_err(|e| {
            tracing::warn!("Failed to load image {}: {}", path, e);
            RequestFailure::from(e)
        })
    }
}

/// Validate `params`, then build and initialize a gateway.
///
/// The factory is never called when validation fails.
pub async fn start(
    params: &impl ParamSource,
    factory: &dyn EngineFactory,
    image_loader: Arc<dyn ImageLoader>,
) -> std::result::Result<InferenceGateway, StartupError> {
    let config = config::validate(params)?;
    let mut gateway = InferenceGateway::new(config, image_loader);
    gateway.initialize(factory).await?;
    Ok(gateway)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{
        classification_result, detection_result, params_for, FakeEngine, FakeFactory,
        FakeImageLoader, ParamFiles,
    };
    use crate::error::ImageLoadError;
    use ncs_common::BoundingBox;

    struct PanickingLoader;

    impl ImageLoader for PanickingLoader {
        fn load(&self, path: &str) -> std::result::Result<PixelBuffer, ImageLoadError> {
            panic!("decoder crashed on {}", path);
        }
    }

    #[tokio::test]
    async fn test_panicking_loader_is_internal_failure() {
        let files = ParamFiles::new();
        let engine = FakeEngine::default();
        let factory = FakeFactory::new(engine.clone());
        let gateway = start(
            &params_for(&files, "tiny_yolo", ""),
            &factory,
            Arc::new(PanickingLoader),
        )
        .await
        .unwrap();

        let result = gateway
            .handle_detect(&DetectObjectRequest {
                image_path: "/images/street.jpg".to_string(),
            })
            .await;
        assert!(matches!(result, Err(RequestFailure::Internal(_))));
        assert_eq!(gateway.state(), GatewayState::Serving);
        assert_eq!(engine.detect_calls(), 0);
    }

    #[tokio::test]
    async fn test_classify_preserves_order_and_timing() {
        let files = ParamFiles::new();
        let engine = FakeEngine::default().with_classification(classification_result(
            &[("tabby cat", 0.6), ("tiger cat", 0.25), ("lynx", 0.1)],
            87.25,
        ));
        let factory = FakeFactory::new(engine.clone());
        let gateway = start(
            &params_for(&files, "googlenet", "top_n = 3"),
            &factory,
            Arc::new(FakeImageLoader::default()),
        )
        .await
        .unwrap();

        let response = gateway
            .handle_classify(&ClassifyObjectRequest {
                image_path: "/images/cat.jpg".to_string(),
            })
            .await
            .unwrap();

        let names: Vec<_> = response.objects.iter().map(|o| o.object_name.as_str()).collect();
        assert_eq!(names, vec!["tabby cat", "tiger cat", "lynx"]);
        assert_eq!(response.objects[0].probability, 0.6);
        assert_eq!(response.inference_time_ms, 87.25);
        assert_eq!(engine.classify_calls(), vec![3]);
    }

    #[tokio::test]
    async fn test_missing_graph_never_constructs_engine() {
        let files = ParamFiles::new();
        std::fs::remove_file(&files.graph).unwrap();
        let factory = FakeFactory::new(FakeEngine::default());

        let err = start(
            &params_for(&files, "googlenet", ""),
            &factory,
            Arc::new(FakeImageLoader::default()),
        )
        .await
        .err()
        .unwrap();

        assert!(matches!(err, StartupError::Configuration(ref e) if e.field == "graph_file_path"));
        assert_eq!(factory.construct_calls(), 0);
    }

    #[tokio::test]
    async fn test_engine_construction_failure_marks_failed() {
        let files = ParamFiles::new();
        let config = config::validate(&params_for(&files, "tiny_yolo", "")).unwrap();
        let mut gateway = InferenceGateway::new(config, Arc::new(FakeImageLoader::default()));
        let factory = FakeFactory::failing("no device found");

        let err = gateway.initialize(&factory).await.unwrap_err();
        assert!(matches!(err, EngineConstructionError::Rejected(_)));
        assert_eq!(gateway.state(), GatewayState::Failed);
        assert!(matches!(
            gateway
                .handle_detect(&DetectObjectRequest {
                    image_path: "/images/street.jpg".to_string(),
                })
                .await,
            Err(RequestFailure::NotServing)
        ));
    }

    #[tokio::test]
    async fn test_initialize_only_once() {
        let files = ParamFiles::new();
        let factory = FakeFactory::new(FakeEngine::default());
        let mut gateway = start(
            &params_for(&files, "tiny_yolo", ""),
            &factory,
            Arc::new(FakeImageLoader::default()),
        )
        .await
        .unwrap();

        assert!(matches!(
            gateway.initialize(&factory).await,
            Err(EngineConstructionError::AlreadyInitialized)
        ));
        assert_eq!(gateway.state(), GatewayState::Serving);
        assert_eq!(factory.construct_calls(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_image_keeps_serving() {
        let files = ParamFiles::new();
        let engine = FakeEngine::default().with_detection(detection_result(
            &[(
                "car",
                0.9,
                BoundingBox {
                    x: -4,
                    y: 12,
                    width: 100,
                    height: 50,
                },
            )],
            120.0,
        ));
        let factory = FakeFactory::new(engine.clone());
        let loader = FakeImageLoader::default().with_unreadable("/images/missing.jpg");
        let gateway = start(&params_for(&files, "tiny_yolo", ""), &factory, Arc::new(loader))
            .await
            .unwrap();

        let failed = gateway
            .handle_detect(&DetectObjectRequest {
                image_path: "/images/missing.jpg".to_string(),
            })
            .await;
        assert!(matches!(failed, Err(RequestFailure::ImageLoad(_))));
        assert_eq!(gateway.state(), GatewayState::Serving);
        assert_eq!(engine.detect_calls(), 0);

        let response = gateway
            .handle_detect(&DetectObjectRequest {
                image_path: "/images/street.jpg".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(response.objects.len(), 1);
        assert_eq!(response.objects[0].object.object_name, "car");
        assert_eq!(
            response.objects[0].bounding_box,
            BoundingBox {
                x: -4,
                y: 12,
                width: 100,
                height: 50,
            }
        );
        assert_eq!(response.inference_time_ms, 120.0);
    }

    #[tokio::test]
    async fn test_no_result_is_request_failure() {
        let files = ParamFiles::new();
        let factory = FakeFactory::new(FakeEngine::default());
        let gateway = start(
            &params_for(&files, "alexnet", ""),
            &factory,
            Arc::new(FakeImageLoader::default()),
        )
        .await
        .unwrap();

        let request = ClassifyObjectRequest {
            image_path: "/images/cat.jpg".to_string(),
        };
        assert!(matches!(
            gateway.handle_classify(&request).await,
            Err(RequestFailure::NoResult {
                operation: "classify_object"
            })
        ));
        assert_eq!(gateway.state(), GatewayState::Serving);
    }

    #[tokio::test]
    async fn test_only_configured_operation_is_served() {
        let files = ParamFiles::new();
        let factory = FakeFactory::new(FakeEngine::default());
        let gateway = start(
            &params_for(&files, "tiny_yolo", ""),
            &factory,
            Arc::new(FakeImageLoader::default()),
        )
        .await
        .unwrap();

        assert_eq!(gateway.operation(), "detect_object");
        let result = gateway
            .handle_classify(&ClassifyObjectRequest {
                image_path: "/images/cat.jpg".to_string(),
            })
            .await;
        assert!(matches!(
            result,
            Err(RequestFailure::OperationNotRegistered("classify_object"))
        ));
    }

    #[tokio::test]
    async fn test_engine_receives_constructed_params() {
        let files = ParamFiles::new();
        let factory = FakeFactory::new(FakeEngine::default());
        let gateway = start(
            &params_for(&files, "squezzenet", "top_n = 5"),
            &factory,
            Arc::new(FakeImageLoader::default()),
        )
        .await
        .unwrap();

        let constructed = factory.last_params().unwrap();
        assert_eq!(constructed, gateway.config().engine_params());
        assert_eq!(constructed.channel_means, [104.0, 117.0, 123.0]);
        assert!(gateway.serving_since().is_some());
    }
}
