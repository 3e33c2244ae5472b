use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Emissary TCPMapping - forwards raw TCP connections arriving on a
/// listener port to an upstream service
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "getambassador.io",
    version = "v2",
    kind = "TCPMapping",
    plural = "tcpmappings",
    namespaced,
    derive = "Default",
    derive = "PartialEq",
)]
pub struct TCPMappingSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ambassador_id: Vec<String>,

    /// Listener port on the gateway
    pub port: u16,

    /// Upstream as "<service>:<port>"
    pub service: String,
}
