//! The subset of the Auspice v2 JSON layout that datasets ship trees in.
//!
//! Unknown fields are carried through untouched so the output tree can be
//! written back with everything the dataset author put in it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuspiceTree {
    pub tree: AuspiceNode,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuspiceNode {
    pub name: String,
    #[serde(default)]
    pub branch_attrs: BranchAttrs,
    #[serde(default)]
    pub node_attrs: NodeAttrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<AuspiceNode>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchAttrs {
    #[serde(default)]
    pub mutations: BranchMutations,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchMutations {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nuc: Vec<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttrValue<T> {
    pub value: T,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clade_membership: Option<AttrValue<String>>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl AuspiceNode {
    pub fn clade(&self) -> Option<&str> {
        self.node_attrs
            .clade_membership
            .as_ref()
            .map(|c| c.value.as_str())
    }
}

impl AuspiceTree {
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
