use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ingress configuration shared by all members of a GerritNetwork
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GerritClusterIngressConfig {
    /// Whether routing objects should be created at all
    #[serde(default)]
    pub enabled: bool,

    /// Hostname clients use to reach the cluster (e.g., gerrit.example.com)
    #[serde(default)]
    pub host: String,

    /// Annotations added to the ingress object
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,

    /// TLS configuration
    #[serde(default)]
    pub tls: GerritIngressTlsConfig,

    /// SSH exposure
    #[serde(default)]
    pub ssh: GerritIngressSshConfig,

    /// Emissary/Ambassador specific settings
    #[serde(default)]
    pub ambassador: GerritIngressAmbassadorConfig,
}

/// TLS termination at the edge
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GerritIngressTlsConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Name of the secret holding certificate and key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GerritIngressSshConfig {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GerritIngressAmbassadorConfig {
    /// Ambassador ids the created objects are bound to
    #[serde(default)]
    pub id: Vec<String>,

    /// Whether the operator manages the Host object itself
    #[serde(default)]
    pub create_host: bool,
}
