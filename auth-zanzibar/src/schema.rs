//! Authorization model in the engine's JSON wire shape (schema 1.2)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ZanzibarError;

pub const SCHEMA_VERSION: &str = "1.2";

/// A complete authorization model as written to a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationModel {
    pub schema_version: String,
    pub type_definitions: Vec<TypeDefinition>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub conditions: BTreeMap<String, ConditionDefinition>,
}

impl AuthorizationModel {
    pub fn new() -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            type_definitions: Vec::new(),
            conditions: BTreeMap::new(),
        }
    }

    pub fn type_definition(&self, name: &str) -> Option<&TypeDefinition> {
        self.type_definitions.iter().find(|t| t.type_name == name)
    }

    pub fn to_json(&self) -> Result<String, ZanzibarError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for AuthorizationModel {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDefinition {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relations: BTreeMap<String, Userset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TypeMetadata>,
}

impl TypeDefinition {
    pub fn relation_metadata(&self, relation: &str) -> Option<&RelationMetadata> {
        self.metadata.as_ref().and_then(|m| m.relations.get(relation))
    }
}

/// Module and source-file attribution plus direct type restrictions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeMetadata {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relations: BTreeMap<String, RelationMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_info: Option<SourceInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationMetadata {
    #[serde(default)]
    pub directly_related_user_types: Vec<RelationReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_info: Option<SourceInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub file: String,
}

/// `user`, `user:*`, `group#member` or `user with condition`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationReference {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wildcard: Option<Wildcard>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub condition: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wildcard {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectUserset {}

/// Relation rewrite expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Userset {
    #[serde(rename = "this")]
    This(DirectUserset),
    #[serde(rename = "computedUserset")]
    ComputedUserset(ObjectRelation),
    #[serde(rename = "tupleToUserset")]
    TupleToUserset(TupleToUserset),
    #[serde(rename = "union")]
    Union(Usersets),
    #[serde(rename = "intersection")]
    Intersection(Usersets),
    #[serde(rename = "difference")]
    Difference(Difference),
}

impl Userset {
    pub fn direct() -> Self {
        Userset::This(DirectUserset {})
    }

    pub fn computed(relation: impl Into<String>) -> Self {
        Userset::ComputedUserset(ObjectRelation::relation(relation))
    }

    pub fn tuple_to_userset(tupleset: impl Into<String>, computed: impl Into<String>) -> Self {
        Userset::TupleToUserset(TupleToUserset {
            tupleset: ObjectRelation::relation(tupleset),
            computed_userset: ObjectRelation::relation(computed),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRelation {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub object: String,
    pub relation: String,
}

impl ObjectRelation {
    pub fn relation(relation: impl Into<String>) -> Self {
        Self {
            object: String::new(),
            relation: relation.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TupleToUserset {
    pub tupleset: ObjectRelation,
    #[serde(rename = "computedUserset")]
    pub computed_userset: ObjectRelation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usersets {
    pub child: Vec<Userset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Difference {
    pub base: Box<Userset>,
    pub subtract: Box<Userset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionDefinition {
    pub name: String,
    pub expression: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, ConditionParamTypeRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ConditionMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionParamTypeRef {
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generic_types: Vec<ConditionParamTypeRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionMetadata {
    pub module: String,
    pub source_info: SourceInfo,
}
