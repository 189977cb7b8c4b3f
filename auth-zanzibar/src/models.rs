use serde::{Deserialize, Serialize};
use std::fmt;

/// A relationship tuple: `user` has `relation` to `object`.
///
/// Objects and users are `type:id` strings, e.g. `account:team-1` or
/// `user:alice@example.com`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TupleKey {
    pub user: String,
    pub relation: String,
    pub object: String,
}

impl TupleKey {
    pub fn new(object: impl Into<String>, relation: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            relation: relation.into(),
            object: object.into(),
        }
    }
}

impl fmt::Display for TupleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}@{}", self.object, self.relation, self.user)
    }
}

/// `type:id` reference with the id normalized for the engine
pub fn object_ref(object_type: &str, id: &str) -> String {
    format!("{}:{}", object_type, normalize_identifier(id))
}

/// Replace separators the engine reserves (`:`, `#`, whitespace) in an id.
///
/// Service-account style identities such as
/// `system:serviceaccount:org-a:deployer` become
/// `system.serviceaccount.org-a.deployer`.
pub fn normalize_identifier(id: &str) -> String {
    id.trim()
        .chars()
        .map(|c| if c == ':' || c == '#' || c.is_whitespace() { '.' } else { c })
        .collect()
}

/// A store known to the authorization engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreInfo {
    pub id: String,
    pub name: String,
}

/// Batch of tuple writes and deletes sent in one engine call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRequest {
    pub writes: Vec<TupleKey>,
    pub deletes: Vec<TupleKey>,
}

impl WriteRequest {
    pub fn write(tuple: TupleKey) -> Self {
        Self {
            writes: vec![tuple],
            deletes: Vec::new(),
        }
    }

    pub fn delete(tuple: TupleKey) -> Self {
        Self {
            writes: Vec::new(),
            deletes: vec![tuple],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.deletes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_service_account() {
        assert_eq!(
            normalize_identifier("system:serviceaccount:org-a:deployer"),
            "system.serviceaccount.org-a.deployer"
        );
    }

    #[test]
    fn test_normalize_keeps_email() {
        assert_eq!(normalize_identifier("bob@example.com"), "bob@example.com");
    }

    #[test]
    fn test_object_ref() {
        assert_eq!(object_ref("user", "bob"), "user:bob");
        assert_eq!(object_ref("account", "team 1"), "account:team.1");
    }

    #[test]
    fn test_tuple_display() {
        let tuple = TupleKey::new("account:team-1", "parent", "account:org-a");
        assert_eq!(tuple.to_string(), "account:team-1#parent@account:org-a");
    }
}
