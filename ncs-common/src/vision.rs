//! Request and response messages for the two registered operations.

use serde::{Deserialize, Serialize};

/// Request body for `classify_object`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifyObjectRequest {
    /// Path of the image file on the server's filesystem.
    pub image_path: String,
}

/// Request body for `detect_object`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectObjectRequest {
    pub image_path: String,
}

/// A recognized category and its probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub object_name: String,
    /// Probability in `[0, 1]`.
    pub probability: f32,
}

/// Axis-aligned box in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// A detected object and where it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectInBox {
    pub object: Object,
    pub bounding_box: BoundingBox,
}

/// Response body for `classify_object`. Objects keep the engine's ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifyObjectResponse {
    pub objects: Vec<Object>,
    pub inference_time_ms: f32,
}

/// Response body for `detect_object`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectObjectResponse {
    pub objects: Vec<ObjectInBox>,
    pub inference_time_ms: f32,
}
