//! Extensions: inherited templates for per-account child resources.
//!
//! [`ExtensionCollector`] gathers them along the hierarchy,
//! [`TemplateRenderer`] renders their templates, [`ExtensionReconciler`]
//! converges the resulting objects and [`ExtensionReadinessGate`] waits for
//! them to report ready.

pub mod collector;
pub mod readiness;
pub mod reconciler;
pub mod template;

pub use collector::ExtensionCollector;
pub use readiness::ExtensionReadinessGate;
pub use reconciler::ExtensionReconciler;
pub use template::{TemplateError, TemplateRenderer};

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::core::DynamicObject;
use resource_store::{gvk_from_api_version, ObjectKey, ResourceStore};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::api::{Account, Extension};
use crate::error::Result;

/// Where an Extension's object lives, plus its rendered metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionTarget {
    pub key: ObjectKey,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

impl ExtensionTarget {
    /// Merge the rendered labels and annotations into `object`
    pub fn apply_metadata(&self, object: &mut DynamicObject) {
        if !self.labels.is_empty() {
            object
                .metadata
                .labels
                .get_or_insert_with(BTreeMap::new)
                .extend(self.labels.clone());
        }
        if !self.annotations.is_empty() {
            object
                .metadata
                .annotations
                .get_or_insert_with(BTreeMap::new)
                .extend(self.annotations.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TargetIdentity {
    Resolved(ExtensionTarget),
    /// Namespaced target while the account's namespace is not resolved yet
    AwaitingNamespace,
}

/// Compute the identity of the object `extension` produces for `account`
pub async fn resolve_target(
    renderer: &TemplateRenderer,
    store: &dyn ResourceStore,
    extension: &Extension,
    account: &Account,
    context: &Value,
) -> Result<TargetIdentity> {
    let kind = gvk_from_api_version(&extension.api_version, &extension.kind);

    let metadata = match &extension.metadata {
        Some(template) => {
            let rendered = renderer.render_metadata(template, context)?;
            serde_json::from_value::<ObjectMeta>(rendered).map_err(|e| TemplateError::Write {
                path: "metadata".to_string(),
                message: e.to_string(),
            })?
        }
        None => ObjectMeta::default(),
    };
    let name = metadata
        .name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| extension.kind.to_lowercase());

    let namespace = if store.is_namespaced(&kind).await? {
        match account.resolved_namespace() {
            Some(namespace) => Some(namespace),
            None => return Ok(TargetIdentity::AwaitingNamespace),
        }
    } else {
        None
    };

    Ok(TargetIdentity::Resolved(ExtensionTarget {
        key: ObjectKey::new(kind, namespace, name),
        labels: metadata.labels.unwrap_or_default(),
        annotations: metadata.annotations.unwrap_or_default(),
    }))
}
