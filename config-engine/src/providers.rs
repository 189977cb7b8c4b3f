// Layered configuration sources: defaults, YAML file, environment.
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::settings::OperatorConfig;

/// Environment variable prefix; nested keys are separated by `__`, e.g.
/// `ACCOUNT_OPERATOR_AUTHORIZATION__API_URL`.
pub const ENV_PREFIX: &str = "ACCOUNT_OPERATOR_";

impl OperatorConfig {
    /// Load defaults, then `path` if given, then the environment, and
    /// validate the result.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(OperatorConfig::default()));

        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::SourceNotFound(path.display().to_string()));
            }
            debug!(path = %path.display(), "Loading configuration file");
            figment = figment.merge(Yaml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::extract(&figment)
    }

    /// Defaults overlaid with an inline YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(OperatorConfig::default())).merge(Yaml::string(yaml));
        Self::extract(&figment)
    }

    fn extract(figment: &Figment) -> Result<Self> {
        let config: OperatorConfig = figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
