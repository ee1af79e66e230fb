//! Raw parameter lookup.

use config::{Config, ConfigError, Value, ValueKind};

/// Table holding the vision parameters in the configuration tree.
pub const PARAMS_TABLE: &str = "params";

/// Untyped key/value source with typed accessors.
///
/// `None` means "not set". No schema is enforced here; validation is the
/// caller's job.
pub trait ParamSource {
    fn get_int(&self, name: &str) -> Option<i64>;
    fn get_float(&self, name: &str) -> Option<f64>;
    fn get_string(&self, name: &str) -> Option<String>;
}

/// [`ParamSource`] over one table of a loaded configuration tree.
#[derive(Debug, Clone)]
pub struct ConfigParams {
    config: Config,
    table: String,
}

impl ConfigParams {
    pub fn new(config: Config, table: impl Into<String>) -> Self {
        Self {
            config,
            table: table.into(),
        }
    }

    pub fn into_inner(self) -> Config {
        self.config
    }

    /// Raw value for `name`, or `None` when the key is absent.
    fn lookup(&self, name: &str) -> Option<ValueKind> {
        let key = format!("{}.{}", self.table, name);
        match self.config.get::<Value>(&key) {
            Ok(value) => Some(value.kind),
            Err(ConfigError::NotFound(_)) => None,
            Err(e) => {
                tracing::warn!("param {} cannot be read: {}", name, e);
                None
            }
        }
    }
}

// A value of the wrong type counts as unset, like a typed parameter-server lookup.
fn wrong_type(name: &str, expected: &str, kind: &ValueKind) {
    tracing::warn!("param {} is not {}: {:?}", name, expected, kind);
}

impl ParamSource for ConfigParams {
    fn get_int(&self, name: &str) -> Option<i64> {
        let parsed = match self.lookup(name)? {
            ValueKind::I64(value) => Some(value),
            ValueKind::I128(value) => i64::try_from(value).ok(),
            ValueKind::U64(value) => i64::try_from(value).ok(),
            ValueKind::String(ref value) => value.parse::<i64>().ok(),
            ref other => {
                wrong_type(name, "an integer", other);
                return None;
            }
        };
        if parsed.is_none() {
            tracing::warn!("param {} is not a valid integer", name);
        }
        parsed
    }

    fn get_float(&self, name: &str) -> Option<f64> {
        let parsed = match self.lookup(name)? {
            ValueKind::Float(value) => Some(value),
            ValueKind::I64(value) => Some(value as f64),
            ValueKind::I128(value) => Some(value as f64),
            ValueKind::U64(value) => Some(value as f64),
            ValueKind::U128(value) => Some(value as f64),
            ValueKind::String(ref value) => value.parse::<f64>().ok(),
            ref other => {
                wrong_type(name, "a number", other);
                return None;
            }
        };
        if parsed.is_none() {
            tracing::warn!("param {} is not a valid number", name);
        }
        parsed
    }

    fn get_string(&self, name: &str) -> Option<String> {
        match self.lookup(name)? {
            ValueKind::String(value) => Some(value),
            other => {
                wrong_type(name, "a string", &other);
                None
            }
        }
    }
}
