use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Emissary TLSContext - TLS termination settings for a set of hosts
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "getambassador.io",
    version = "v2",
    kind = "TLSContext",
    plural = "tlscontexts",
    namespaced,
    derive = "Default",
    derive = "PartialEq",
)]
pub struct TLSContextSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ambassador_id: Vec<String>,

    /// Secret holding certificate and key
    pub secret: String,

    #[serde(default)]
    pub hosts: Vec<String>,

    /// Look up the secret in the namespace of the TLSContext
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_namespacing: Option<bool>,
}
