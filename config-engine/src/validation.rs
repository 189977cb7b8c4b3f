// Configuration validation
use crate::error::{ConfigError, Result};
use crate::settings::OperatorConfig;

impl OperatorConfig {
    pub fn validate(&self) -> Result<()> {
        let hierarchy = &self.hierarchy;
        if hierarchy.owner_label.trim().is_empty() || hierarchy.owner_namespace_label.trim().is_empty() {
            return Err(ConfigError::ValidationError("ownership label names must not be empty".to_string()));
        }
        if hierarchy.root_namespace.trim().is_empty() {
            return Err(ConfigError::ValidationError("hierarchy.root_namespace must not be empty".to_string()));
        }
        if hierarchy.max_depth == 0 {
            return Err(ConfigError::ValidationError("hierarchy.max_depth must be at least 1".to_string()));
        }
        if hierarchy.multicluster.enabled && hierarchy.multicluster.root_cluster.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "hierarchy.multicluster.root_cluster is required when multicluster is enabled".to_string(),
            ));
        }

        let api_url = &self.authorization.api_url;
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "authorization.api_url must be an http(s) URL, got '{api_url}'"
            )));
        }
        for (field, value) in [
            ("object_type", &self.authorization.object_type),
            ("user_type", &self.authorization.user_type),
            ("parent_relation", &self.authorization.parent_relation),
            ("owner_relation", &self.authorization.owner_relation),
        ] {
            if value.is_empty() || value.contains([':', '#', ' ']) {
                return Err(ConfigError::ValidationError(format!(
                    "authorization.{field} '{value}' is not a valid identifier"
                )));
            }
        }
        Ok(())
    }
}
