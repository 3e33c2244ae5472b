use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Emissary Host - registers a hostname with the gateway and binds
/// its TLS settings
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "getambassador.io",
    version = "v2",
    kind = "Host",
    plural = "hosts",
    namespaced,
    derive = "Default",
    derive = "PartialEq",
)]
pub struct HostSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ambassador_id: Vec<String>,

    pub hostname: String,

    #[serde(rename = "tlsSecret", skip_serializing_if = "Option::is_none")]
    pub tls_secret: Option<LocalObjectRef>,

    #[serde(rename = "tlsContext", skip_serializing_if = "Option::is_none")]
    pub tls_context: Option<LocalObjectRef>,
}

/// Reference to an object in the namespace of the Host
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LocalObjectRef {
    pub name: String,
}
