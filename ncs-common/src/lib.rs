//! NCS Common Types
//!
//! Shared types used by the image server and its clients.

pub mod model;
pub mod vision;

pub use model::{ModelKind, RequestMode};
pub use vision::{
    BoundingBox, ClassifyObjectRequest, ClassifyObjectResponse, DetectObjectRequest,
    DetectObjectResponse, Object, ObjectInBox,
};
