use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::client::InitOptions;
use crate::error::{TrackerError, TrackerResult};

/// Where the analytics intent is read from inside an action's metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorShape {
    /// `metadata.<key>` is an object with `eventName`, `type`, `props`,
    /// `timeEvent` and `increment` fields.
    #[default]
    Nested,
    /// `metadata.<key>` is a truthy flag (optionally an object of properties);
    /// the action type is the event name and increments live in
    /// `metadata.<key>Increment`.
    Flag,
}

/// Tracker settings. Loaded from environment variables with the prefix
/// `MIXTRACK__` and an optional TOML file. Formatters and identity selectors
/// are code and are supplied to the middleware builder directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerSettings {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub event_prefix: String,
    #[serde(default = "default_metadata_key")]
    pub metadata_key: String,
    #[serde(default)]
    pub shape: DescriptorShape,
    /// Passthrough options for the collaborator's `init` call.
    #[serde(default)]
    pub init: InitOptions,
}

fn default_metadata_key() -> String {
    "analytics".to_string()
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            token: String::new(),
            event_prefix: String::new(),
            metadata_key: default_metadata_key(),
            shape: DescriptorShape::default(),
            init: InitOptions::new(),
        }
    }
}

impl TrackerSettings {
    /// Load settings from an optional TOML file, overridden by the environment.
    pub fn load_from(path: Option<&Path>) -> TrackerResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("MIXTRACK")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn validate(&self) -> TrackerResult<()> {
        if self.token.is_empty() {
            return Err(TrackerError::Config("token must not be empty".into()));
        }
        if self.metadata_key.is_empty() {
            return Err(TrackerError::Config("metadata_key must not be empty".into()));
        }
        Ok(())
    }
}
