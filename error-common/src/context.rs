use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identity of the object a failure happened on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub kind: Option<String>,
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub cluster: Option<String>,
    pub subroutine: Option<String>,
    pub additional: BTreeMap<String, String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_object(kind: impl Into<String>, namespace: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            namespace: namespace.map(str::to_string),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = Some(cluster.into());
        self
    }

    pub fn with_subroutine(mut self, subroutine: impl Into<String>) -> Self {
        self.subroutine = Some(subroutine.into());
        self
    }

    pub fn add_context<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.additional.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind.as_deref().unwrap_or("object");
        let name = self.name.as_deref().unwrap_or("<unknown>");
        match self.namespace.as_deref() {
            Some(ns) => write!(f, "{kind} {ns}/{name}")?,
            None => write!(f, "{kind} {name}")?,
        }
        if let Some(cluster) = &self.cluster {
            write!(f, " in cluster {cluster}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let ctx = ErrorContext::for_object("Account", Some("org-a"), "team-1").with_cluster("1x9k");
        assert_eq!(ctx.to_string(), "Account org-a/team-1 in cluster 1x9k");

        let ctx = ErrorContext::for_object("Store", None, "orgs");
        assert_eq!(ctx.to_string(), "Store orgs");
    }
}
