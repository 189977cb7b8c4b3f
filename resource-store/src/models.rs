use kube::core::{DynamicObject, GroupVersionKind, ObjectMeta, TypeMeta};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical cluster an object lives in (multi-cluster mode only)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterContext(String);

impl ClusterContext {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build a kind from an `apiVersion` string (`group/version` or `version`)
pub fn gvk_from_api_version(api_version: &str, kind: &str) -> GroupVersionKind {
    match api_version.split_once('/') {
        Some((group, version)) => GroupVersionKind::gvk(group, version, kind),
        None => GroupVersionKind::gvk("", api_version, kind),
    }
}

pub fn api_version_of(gvk: &GroupVersionKind) -> String {
    if gvk.group.is_empty() {
        gvk.version.clone()
    } else {
        format!("{}/{}", gvk.group, gvk.version)
    }
}

/// Full identity of a stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKey {
    pub kind: GroupVersionKind,
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectKey {
    pub fn new(kind: GroupVersionKind, namespace: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.map(str::to_string),
            name: name.into(),
        }
    }

    pub fn cluster_scoped(kind: GroupVersionKind, name: impl Into<String>) -> Self {
        Self::new(kind, None, name)
    }

    /// Identity of an existing object, if it carries type information
    pub fn of(object: &DynamicObject) -> Option<Self> {
        let types = object.types.as_ref()?;
        let name = object.metadata.name.clone()?;
        Some(Self {
            kind: gvk_from_api_version(&types.api_version, &types.kind),
            namespace: object.metadata.namespace.clone(),
            name,
        })
    }

    pub fn api_version(&self) -> String {
        api_version_of(&self.kind)
    }

    /// Empty object carrying only this identity
    pub fn new_object(&self) -> DynamicObject {
        DynamicObject {
            types: Some(TypeMeta {
                api_version: self.api_version(),
                kind: self.kind.kind.clone(),
            }),
            metadata: ObjectMeta {
                name: Some(self.name.clone()),
                namespace: self.namespace.clone(),
                ..ObjectMeta::default()
            },
            data: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} {}/{}", self.kind.kind, ns, self.name),
            None => write!(f, "{} {}", self.kind.kind, self.name),
        }
    }
}

/// Selection for list calls; selectors use the usual `k=v,k2!=v2` syntax
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub namespace: Option<String>,
    pub label_selector: Option<String>,
    pub field_selector: Option<String>,
}

impl ListOptions {
    pub fn in_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Self::default()
        }
    }

    pub fn labels(mut self, selector: impl Into<String>) -> Self {
        self.label_selector = Some(selector.into());
        self
    }

    pub fn fields(mut self, selector: impl Into<String>) -> Self {
        self.field_selector = Some(selector.into());
        self
    }
}

/// What a create-or-update call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    Created,
    Updated,
    Unchanged,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gvk_from_api_version() {
        let core = gvk_from_api_version("v1", "ConfigMap");
        assert_eq!(core.group, "");
        assert_eq!(core.version, "v1");
        assert_eq!(api_version_of(&core), "v1");

        let grouped = gvk_from_api_version("core.platform-mesh.io/v1alpha1", "Account");
        assert_eq!(grouped.group, "core.platform-mesh.io");
        assert_eq!(api_version_of(&grouped), "core.platform-mesh.io/v1alpha1");
    }

    #[test]
    fn test_new_object_roundtrips_identity() {
        let key = ObjectKey::new(gvk_from_api_version("v1", "ConfigMap"), Some("team-1"), "settings");
        let object = key.new_object();
        assert_eq!(ObjectKey::of(&object), Some(key));
    }
}
