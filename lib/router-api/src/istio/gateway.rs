use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Istio Gateway - describes a load balancer at the edge of the mesh
/// receiving incoming HTTP/TCP connections
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "networking.istio.io",
    version = "v1beta1",
    kind = "Gateway",
    plural = "gateways",
    namespaced,
    derive = "Default",
    derive = "PartialEq",
)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySpec {
    /// Labels selecting the gateway workload (e.g. istio: ingressgateway)
    #[serde(default)]
    pub selector: BTreeMap<String, String>,

    /// Listeners of the gateway
    #[serde(default)]
    pub servers: Vec<Server>,
}

/// A single listener of a Gateway
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub port: ServerPort,

    /// Hosts exposed by this listener
    #[serde(default)]
    pub hosts: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<ServerTlsSettings>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServerPort {
    pub number: u16,

    /// HTTP, HTTPS, GRPC, HTTP2, MONGO, TCP or TLS
    pub protocol: String,

    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServerTlsSettings {
    /// Redirect all plain HTTP traffic to HTTPS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub https_redirect: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<ServerTlsMode>,

    /// Secret holding the server certificate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_name: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerTlsMode {
    Passthrough,
    Simple,
    Mutual,
    AutoPassthrough,
    IstioMutual,
}
