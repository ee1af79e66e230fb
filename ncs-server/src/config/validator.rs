//! Validation of the raw vision parameters into an immutable [`Configuration`].

use std::path::{Path, PathBuf};

use ncs_common::{ModelKind, RequestMode};

use super::ParamSource;
use crate::engine::EngineParams;
use crate::error::ConfigurationError;

const DEFAULT_DEVICE_INDEX: i64 = 0;
const DEFAULT_LOG_LEVEL: i64 = LogLevel::Errors as i64;
const DEFAULT_NETWORK_DIMENSION: i64 = 0;
const DEFAULT_TOP_N: i64 = 3;
const MEAN_PARAMS: [&str; 3] = ["channel1_mean", "channel2_mean", "channel3_mean"];

/// Accelerator driver verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Nothing = 0,
    Errors = 1,
    Warnings = 2,
    Verbose = 3,
}

impl LogLevel {
    pub fn from_ordinal(value: i64) -> Option<Self> {
        match value {
            0 => Some(LogLevel::Nothing),
            1 => Some(LogLevel::Errors),
            2 => Some(LogLevel::Warnings),
            3 => Some(LogLevel::Verbose),
            _ => None,
        }
    }

    pub fn ordinal(&self) -> u8 {
        *self as u8
    }
}

/// Fields that only exist for one request mode.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskConfig {
    Classification { top_n: u32, channel_means: [f32; 3] },
    Detection,
}

/// Validated, immutable vision configuration.
///
/// Only [`validate`] builds one, so the task variant always matches the
/// model kind's mode.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    device_index: u32,
    log_level: LogLevel,
    model_kind: ModelKind,
    graph_file_path: PathBuf,
    category_file_path: PathBuf,
    network_dimension: u32,
    task: TaskConfig,
}

impl Configuration {
    pub fn device_index(&self) -> u32 {
        self.device_index
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn model_kind(&self) -> ModelKind {
        self.model_kind
    }

    pub fn mode(&self) -> RequestMode {
        self.model_kind.mode()
    }

    pub fn graph_file_path(&self) -> &Path {
        &self.graph_file_path
    }

    pub fn category_file_path(&self) -> &Path {
        &self.category_file_path
    }

    pub fn network_dimension(&self) -> u32 {
        self.network_dimension
    }

    pub fn task(&self) -> &TaskConfig {
        &self.task
    }

    /// Number of ranked results to request; `0` in detection mode.
    pub fn top_n(&self) -> u32 {
        match self.task {
            TaskConfig::Classification { top_n, .. } => top_n,
            TaskConfig::Detection => 0,
        }
    }

    /// Per-channel means; all zero in detection mode.
    pub fn channel_means(&self) -> [f32; 3] {
        match self.task {
            TaskConfig::Classification { channel_means, .. } => channel_means,
            TaskConfig::Detection => [0.0; 3],
        }
    }

    /// Arguments for constructing the engine.
    pub fn engine_params(&self) -> EngineParams {
        EngineParams {
            device_index: self.device_index,
            log_level: self.log_level,
            model_kind: self.model_kind,
            graph_file_path: self.graph_file_path.clone(),
            category_file_path: self.category_file_path.clone(),
            network_dimension: self.network_dimension,
            channel_means: self.channel_means(),
        }
    }
}

/// Validate every vision parameter, in a fixed order, failing on the first
/// rejected field.
///
/// Absent parameters fall back to their defaults and the default is checked
/// like an explicit value. `top_n` and the channel means are only read for
/// classification models.
pub fn validate(params: &impl ParamSource) -> Result<Configuration, ConfigurationError> {
    tracing::debug!("Validating vision parameters");

    let device_index = int_param(params, "device_index", DEFAULT_DEVICE_INDEX);
    let device_index = non_negative("device_index", device_index)?;
    tracing::info!("use device_index = {}", device_index);

    let raw_log_level = int_param(params, "log_level", DEFAULT_LOG_LEVEL);
    let log_level = LogLevel::from_ordinal(raw_log_level).ok_or_else(|| {
        reject(
            "log_level",
            raw_log_level,
            "must be between 0 (nothing) and 3 (verbose)",
        )
    })?;
    tracing::info!("use log_level = {:?}", log_level);

    let cnn_type = string_param(params, "cnn_type");
    let model_kind = ModelKind::from_name(&cnn_type).ok_or_else(|| {
        reject(
            "cnn_type",
            &cnn_type,
            "must be one of googlenet, alexnet, squezzenet, tiny_yolo",
        )
    })?;
    tracing::info!("use cnn_type = {}", model_kind);

    let graph_file_path = existing_file(params, "graph_file_path")?;
    let category_file_path = existing_file(params, "category_file_path")?;

    let network_dimension = int_param(params, "network_dimension", DEFAULT_NETWORK_DIMENSION);
    let network_dimension = non_negative("network_dimension", network_dimension)?;
    tracing::info!("use network_dimension = {}", network_dimension);

    let task = match model_kind.mode() {
        RequestMode::Classification => {
            let mut channel_means = [0.0f32; 3];
            for (mean, name) in channel_means.iter_mut().zip(MEAN_PARAMS) {
                *mean = channel_mean(params, name)?;
            }

            let raw_top_n = int_param(params, "top_n", DEFAULT_TOP_N);
            if raw_top_n < 1 {
                return Err(reject("top_n", raw_top_n, "must be at least 1"));
            }
            let top_n = u32::try_from(raw_top_n)
                .map_err(|_| reject("top_n", raw_top_n, "out of range"))?;
            tracing::info!("use top_n = {}", top_n);

            TaskConfig::Classification {
                top_n,
                channel_means,
            }
        }
        RequestMode::Detection => TaskConfig::Detection,
    };

    Ok(Configuration {
        device_index,
        log_level,
        model_kind,
        graph_file_path,
        category_file_path,
        network_dimension,
        task,
    })
}

fn reject(field: &'static str, value: impl ToString, reason: &'static str) -> ConfigurationError {
    let error = ConfigurationError {
        field,
        value: value.to_string(),
        reason,
    };
    tracing::error!("{}", error);
    error
}

fn int_param(params: &impl ParamSource, name: &str, default: i64) -> i64 {
    params.get_int(name).unwrap_or_else(|| {
        tracing::warn!("param {} not set, use default {}", name, default);
        default
    })
}

fn string_param(params: &impl ParamSource, name: &str) -> String {
    params.get_string(name).unwrap_or_else(|| {
        tracing::warn!("param {} not set, use default \"\"", name);
        String::new()
    })
}

fn non_negative(field: &'static str, value: i64) -> Result<u32, ConfigurationError> {
    if value < 0 {
        return Err(reject(field, value, "must be >= 0"));
    }
    u32::try_from(value).map_err(|_| reject(field, value, "out of range"))
}

// Existence is checked now; the engine may still fail to open the file later.
fn existing_file(
    params: &impl ParamSource,
    field: &'static str,
) -> Result<PathBuf, ConfigurationError> {
    let path = PathBuf::from(string_param(params, field));
    if !path.exists() {
        return Err(reject(field, path.display(), "file does not exist"));
    }
    tracing::info!("use {} = {}", field, path.display());
    Ok(path)
}

fn channel_mean(params: &impl ParamSource, field: &'static str) -> Result<f32, ConfigurationError> {
    let value = params
        .get_float(field)
        .ok_or_else(|| reject(field, "<unset>", "required for classification models"))?;
    let mean = value as f32;
    if !mean.is_finite() {
        return Err(reject(field, value, "must be a finite number"));
    }
    tracing::info!("use {} = {}", field, mean);
    Ok(mean)
}
