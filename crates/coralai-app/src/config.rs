//! Run configuration: world layout, organism wiring and the step schedule.

use std::path::Path;

use coralai_core::{ChannelKey, WorldConfig, WorldError};
use coralai_organism::{OrganismConfig, OrganismError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One brush stroke applied after allocation, before the first step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Brush {
    pub key: ChannelKey,
    pub x: usize,
    pub y: usize,
    pub radius: usize,
    pub value: f32,
}

/// Step schedule and seeding of a headless run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    pub steps: u64,
    /// Emit a summary every this many steps.
    pub log_interval: u64,
    /// Perturb the organism weights every this many steps; `None` disables perturbation.
    pub perturb_interval: Option<u64>,
    pub perturb_strength: f32,
    /// Zero the whole buffer before these steps.
    pub clear_at: Vec<u64>,
    pub brushes: Vec<Brush>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            steps: 200,
            log_interval: 20,
            perturb_interval: None,
            perturb_strength: 0.05,
            clear_at: Vec::new(),
            brushes: vec![Brush {
                key: ChannelKey::id("energy"),
                x: 64,
                y: 64,
                radius: 12,
                value: 1.0,
            }],
        }
    }
}

/// Complete configuration of a headless session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub world: WorldConfig,
    pub organism: OrganismConfig,
    pub run: RunConfig,
}

/// Errors produced while loading or patching an [`AppConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    InvalidPatch(String),
    #[error("unknown config path: {0}")]
    UnknownPath(String),
    /// A field holds a value of the wrong type; `path` names the field.
    #[error("{message} at {path}")]
    InvalidValue { path: String, message: String },
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error(transparent)]
    World(#[from] WorldError),
    #[error(transparent)]
    Organism(#[from] OrganismError),
    /// Indicates an invalid run schedule value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

impl ConfigError {
    fn serialization(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }

    fn invalid_value(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
        Self::InvalidValue {
            path: err.path().to_string(),
            message: err.into_inner().to_string(),
        }
    }
}

/// A `path=value` override, e.g. `organism.rng_seed=7` or `world.width=64`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigOverride {
    pub path: String,
    pub value: Value,
}

impl std::str::FromStr for ConfigOverride {
    type Err = ConfigError;

    /// The value is parsed as JSON, falling back to a raw string.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (path, value) = raw.split_once('=').ok_or_else(|| {
            ConfigError::InvalidPatch(format!("override `{raw}` must look like path=value"))
        })?;
        let value = serde_json::from_str(value.trim())
            .unwrap_or_else(|_| Value::String(value.trim().to_string()));
        Ok(Self {
            path: path.trim().to_string(),
            value,
        })
    }
}

impl ConfigOverride {
    /// Write this override into the serialized form of a config.
    ///
    /// Every segment of the path must already exist. Tables merge key by key; anything else
    /// is replaced.
    fn apply(&self, root: &mut Value) -> Result<(), ConfigError> {
        let segments: Vec<&str> = self.path.split('.').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Err(ConfigError::InvalidPatch("empty config path".into()));
        }
        let mut slot = root;
        for (depth, segment) in segments.iter().enumerate() {
            let fields = slot.as_object_mut().ok_or_else(|| {
                ConfigError::InvalidPatch(format!(
                    "`{}` is not a table",
                    segments[..depth].join(".")
                ))
            })?;
            slot = fields
                .get_mut(*segment)
                .ok_or_else(|| ConfigError::UnknownPath(segments[..=depth].join(".")))?;
        }
        overlay(slot, &self.value, &segments.join("."))
    }
}

fn overlay(slot: &mut Value, value: &Value, path: &str) -> Result<(), ConfigError> {
    match (slot, value) {
        (Value::Object(fields), Value::Object(updates)) => {
            for (key, update) in updates {
                let nested = format!("{path}.{key}");
                let field = fields
                    .get_mut(key)
                    .ok_or_else(|| ConfigError::UnknownPath(nested.clone()))?;
                overlay(field, update, &nested)?;
            }
            Ok(())
        }
        (Value::Object(_), _) => Err(ConfigError::InvalidPatch(format!(
            "`{path}` is a table and cannot be replaced by a single value"
        ))),
        (slot, value) => {
            *slot = value.clone();
            Ok(())
        }
    }
}

impl AppConfig {
    /// Read a JSON config file; absent fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut de = serde_json::Deserializer::from_str(&raw);
        serde_path_to_error::deserialize(&mut de).map_err(ConfigError::invalid_value)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.world.validate()?;
        self.organism.validate()?;
        if self.run.log_interval == 0 {
            return Err(ConfigError::InvalidConfig("log_interval must be positive"));
        }
        if self.run.perturb_interval == Some(0) {
            return Err(ConfigError::InvalidConfig("perturb_interval must be positive"));
        }
        if !self.run.perturb_strength.is_finite() || self.run.perturb_strength < 0.0 {
            return Err(ConfigError::InvalidConfig(
                "perturb_strength must be finite and non-negative",
            ));
        }
        if self.run.brushes.iter().any(|brush| !brush.value.is_finite()) {
            return Err(ConfigError::InvalidConfig("brush values must be finite"));
        }
        Ok(())
    }

    /// Apply dotted-path overrides in order, returning the patched and re-validated config.
    pub fn with_overrides(&self, overrides: &[ConfigOverride]) -> Result<Self, ConfigError> {
        if overrides.is_empty() {
            return Ok(self.clone());
        }
        let mut value = serde_json::to_value(self).map_err(ConfigError::serialization)?;
        for item in overrides {
            item.apply(&mut value)?;
        }
        let patched: Self =
            serde_path_to_error::deserialize(value).map_err(ConfigError::invalid_value)?;
        patched.validate()?;
        Ok(patched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> ConfigOverride {
        raw.parse().expect("override")
    }

    #[test]
    fn overrides_patch_nested_fields() {
        let config = AppConfig::default();
        let patched = config
            .with_overrides(&[
                parse("organism.rng_seed=7"),
                parse("run.steps=12"),
                parse("world.width=32"),
            ])
            .expect("patch");
        assert_eq!(patched.organism.rng_seed, Some(7));
        assert_eq!(patched.run.steps, 12);
        assert_eq!(patched.world.width, 32);
        assert_eq!(patched.world.height, config.world.height);
    }

    #[test]
    fn unknown_paths_and_bad_types_are_rejected() {
        let config = AppConfig::default();
        assert!(matches!(
            config.with_overrides(&[parse("run.speed=2")]),
            Err(ConfigError::UnknownPath(path)) if path == "run.speed"
        ));
        assert!(matches!(
            config.with_overrides(&[parse("run.steps=many")]),
            Err(ConfigError::InvalidValue { path, .. }) if path == "run.steps"
        ));
        assert!(matches!(
            config.with_overrides(&[parse("run=3")]),
            Err(ConfigError::InvalidPatch(_))
        ));
        assert!(matches!(
            config.with_overrides(&[parse("run.log_interval=0")]),
            Err(ConfigError::InvalidConfig(_))
        ));
    }

    #[test]
    fn type_errors_name_the_failing_field() {
        let err = AppConfig::default()
            .with_overrides(&[parse(r#"organism.n_actuators="seven""#)])
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("organism.n_actuators"), "{message}");
        assert!(message.contains("seven"), "{message}");
    }

    #[test]
    fn table_overrides_merge_and_later_overrides_win() {
        let patched = AppConfig::default()
            .with_overrides(&[
                parse(r#"world={"width": 20, "height": 10}"#),
                parse("world.width=24"),
                parse("run.perturb_interval=5"),
            ])
            .expect("patch");
        assert_eq!((patched.world.width, patched.world.height), (24, 10));
        assert_eq!(patched.world.channels.len(), 4);
        assert_eq!(patched.run.perturb_interval, Some(5));
        assert!(matches!(
            AppConfig::default().with_overrides(&[parse(r#"world={"depth": 2}"#)]),
            Err(ConfigError::UnknownPath(path)) if path == "world.depth"
        ));
        assert!(matches!(
            AppConfig::default().with_overrides(&[parse("run.steps.inner=2")]),
            Err(ConfigError::InvalidPatch(_))
        ));
    }

    #[test]
    fn override_values_fall_back_to_strings() {
        let item = parse("organism.energy=energy");
        assert_eq!(item.value, Value::String("energy".into()));
        assert!("no-equals".parse::<ConfigOverride>().is_err());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"run": {"steps": 3}, "world": {"width": 16, "height": 16}}"#)
                .expect("json");
        assert_eq!(config.run.steps, 3);
        assert_eq!(config.run.log_interval, 20);
        assert_eq!(config.world.channels.len(), 4);
        assert_eq!(config.organism.n_actuators, 7);
        assert!(config.validate().is_ok());
    }
}
