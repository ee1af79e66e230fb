//! Engine backed by an inference daemon that owns the accelerator.
//!
//! Construction loads the graph on the daemon; each call afterwards ships the
//! raw BGR pixels to that graph.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{
    ClassificationResult, DetectionResult, EngineFactory, EngineParams, VisionEngine,
};
use crate::error::EngineConstructionError;
use crate::image::PixelBuffer;

/// Builds [`RemoteEngine`]s against one daemon.
pub struct RemoteEngineFactory {
    http_client: Client,
    base_url: String,
}

impl RemoteEngineFactory {
    pub fn new(base_url: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// A graph loaded on the daemon.
pub struct RemoteEngine {
    http_client: Client,
    base_url: String,
    graph_id: String,
}

// ============================================================================
// Daemon API types
// ============================================================================

#[derive(Debug, Deserialize)]
struct LoadGraphResponse {
    graph_id: String,
}

// ============================================================================
// EngineFactory implementation
// ============================================================================

#[async_trait]
impl EngineFactory for RemoteEngineFactory {
    async fn construct(
        &self,
        params: &EngineParams,
    ) -> Result<Box<dyn VisionEngine>, EngineConstructionError> {
        let url = format!("{}/graphs", self.base_url);

        tracing::debug!(
            "Loading {} graph on device {} via {}",
            params.model_kind,
            params.device_index,
            url
        );

        let response = self
            .http_client
            .post(&url)
            .json(params)
            .send()
            .await
            .map_err(|e| EngineConstructionError::Communication(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineConstructionError::Rejected(format!("{}: {}", status, body)));
        }

        let loaded: LoadGraphResponse = response
            .json()
            .await
            .map_err(|e| EngineConstructionError::Communication(e.to_string()))?;

        tracing::info!("Graph {} loaded on device {}", loaded.graph_id, params.device_index);

        Ok(Box::new(RemoteEngine {
            http_client: self.http_client.clone(),
            base_url: self.base_url.clone(),
            graph_id: loaded.graph_id,
        }))
    }
}

// ============================================================================
// VisionEngine implementation
// ============================================================================

impl RemoteEngine {
    async fn infer<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        image: &PixelBuffer,
        query: &[(&str, u32)],
    ) -> Option<T> {
        let url = format!("{}/graphs/{}/{}", self.base_url, self.graph_id, operation);

        let response = match self
            .http_client
            .post(&url)
            .query(&[("width", image.width), ("height", image.height)])
            .query(query)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.data.clone())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("{} request to engine failed: {}", operation, e);
                return None;
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Engine returned {} for {}: {}", status, operation, body);
            return None;
        }

        match response.json().await {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::warn!("Malformed {} result from engine: {}", operation, e);
                None
            }
        }
    }
}

#[async_trait]
impl VisionEngine for RemoteEngine {
    fn engine_type(&self) -> &'static str {
        "remote"
    }

    async fn classify(&self, image: &PixelBuffer, top_n: u32) -> Option<ClassificationResult> {
        self.infer("classify", image, &[("top_n", top_n)]).await
    }

    async fn detect(&self, image: &PixelBuffer) -> Option<DetectionResult> {
        self.infer("detect", image, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use ncs_common::ModelKind;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn params() -> EngineParams {
        EngineParams {
            device_index: 1,
            log_level: LogLevel::Warnings,
            model_kind: ModelKind::GoogleNet,
            graph_file_path: "/opt/ncs/graph".into(),
            category_file_path: "/opt/ncs/categories.txt".into(),
            network_dimension: 224,
            channel_means: [104.0, 117.0, 123.0],
        }
    }

    fn image() -> PixelBuffer {
        PixelBuffer {
            width: 2,
            height: 1,
            data: vec![1, 2, 3, 4, 5, 6],
        }
    }

    async fn loaded_engine(server: &MockServer) -> Box<dyn VisionEngine> {
        Mock::given(method("POST"))
            .and(path("/graphs"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"graph_id": "g1"})))
            .mount(server)
            .await;

        RemoteEngineFactory::new(&server.uri())
            .construct(&params())
            .await
            .unwrap()
    }

    #[test]
    fn test_factory_url_normalization() {
        let factory = RemoteEngineFactory::new("http://localhost:9300/");
        assert_eq!(factory.base_url, "http://localhost:9300");
    }

    #[tokio::test]
    async fn test_construct_sends_all_params() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphs"))
            .and(body_partial_json(json!({
                "device_index": 1,
                "log_level": 2,
                "model_kind": "googlenet",
                "graph_file_path": "/opt/ncs/graph",
                "category_file_path": "/opt/ncs/categories.txt",
                "network_dimension": 224,
                "channel_means": [104.0, 117.0, 123.0]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"graph_id": "g1"})))
            .expect(1)
            .mount(&server)
            .await;

        let engine = RemoteEngineFactory::new(&server.uri())
            .construct(&params())
            .await
            .unwrap();
        assert_eq!(engine.engine_type(), "remote");
    }

    #[tokio::test]
    async fn test_construct_rejected_by_daemon() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphs"))
            .respond_with(ResponseTemplate::new(503).set_body_string("no device"))
            .mount(&server)
            .await;

        let err = RemoteEngineFactory::new(&server.uri())
            .construct(&params())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, EngineConstructionError::Rejected(msg) if msg.contains("no device")));
    }

    #[tokio::test]
    async fn test_classify_parses_result() {
        let server = MockServer::start().await;
        let engine = loaded_engine(&server).await;

        Mock::given(method("POST"))
            .and(path("/graphs/g1/classify"))
            .and(query_param("top_n", "3"))
            .and(query_param("width", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"category": "tabby cat", "probability": 0.7},
                    {"category": "tiger cat", "probability": 0.2}
                ],
                "time_taken_ms": 41.5
            })))
            .mount(&server)
            .await;

        let result = engine.classify(&image(), 3).await.unwrap();
        assert_eq!(result.items.len(), 2);
        assert_eq!(result.items[0].category, "tabby cat");
        assert_eq!(result.time_taken_ms, 41.5);
    }

    #[tokio::test]
    async fn test_detect_failure_is_no_result() {
        let server = MockServer::start().await;
        let engine = loaded_engine(&server).await;

        Mock::given(method("POST"))
            .and(path("/graphs/g1/detect"))
            .respond_with(ResponseTemplate::new(500).set_body_string("device busy"))
            .mount(&server)
            .await;

        assert!(engine.detect(&image()).await.is_none());
    }
}
