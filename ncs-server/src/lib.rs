//! NCS image server - validates vision parameters, builds one inference
//! engine and serves either `classify_object` or `detect_object` against it.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod image;
pub mod logging;
pub mod state;
pub mod test_util;

pub use config::{Configuration, Settings};
pub use error::{ConfigurationError, EngineConstructionError, RequestFailure, StartupError};
pub use gateway::{GatewayState, InferenceGateway};
pub use state::AppState;
