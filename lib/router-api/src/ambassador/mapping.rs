use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Emissary Mapping - routes requests matching a prefix (and optional
/// method/query constraints) on a host to an upstream service.
///
/// Emissary orders Mappings by `precedence` first and by the number of
/// constraints second, so one Mapping exists per routing rule.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "getambassador.io",
    version = "v2",
    kind = "Mapping",
    plural = "mappings",
    namespaced,
    derive = "Default",
    derive = "PartialEq",
)]
pub struct MappingSpec {
    /// Ambassador installations this Mapping is visible to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ambassador_id: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// URL prefix, or a regex when `prefix_regex` is set
    pub prefix: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix_regex: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Exact query parameter constraints
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query_parameters: BTreeMap<String, String>,

    /// Upstream as "<service>:<port>"
    pub service: String,

    /// Skip the external auth service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bypass_auth: Option<bool>,

    /// Prefix rewrite; an empty string keeps the original path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<String>,

    /// Higher precedence Mappings are evaluated first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precedence: Option<i32>,
}
