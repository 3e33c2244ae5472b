use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ingress_config::GerritClusterIngressConfig;

/// GerritNetwork describes the network-relevant members of a Gerrit cluster
/// and how they are exposed to clients outside of Kubernetes.
///
/// It is written by the cluster reconciler and consumed by the network
/// controller, which turns it into ingress, mesh or API-gateway objects.
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "gerritoperator.google.com",
    version = "v1alpha2",
    kind = "GerritNetwork",
    plural = "gerritnetworks",
    shortname = "gn",
    namespaced,
    derive = "Default",
    status = "GerritNetworkStatus",
    printcolumn = r#"{"name":"Ready","type":"boolean","jsonPath":".status.ready"}"#,
    printcolumn = r#"{"name":"Composition","type":"string","jsonPath":".status.composition"}"#,
)]
#[serde(rename_all = "camelCase")]
pub struct GerritNetworkSpec {
    /// Ingress settings shared by all members
    #[serde(default)]
    pub ingress: GerritClusterIngressConfig,

    /// Receiver accepting pushes on behalf of the primary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<NetworkMember>,

    /// Primary Gerrit (write-capable)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_gerrit: Option<NetworkMemberWithSsh>,

    /// Gerrit replica (read-only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gerrit_replica: Option<NetworkMemberWithSsh>,
}

/// A routable member of the cluster
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkMember {
    /// Name of the member; also the name of its Kubernetes Service
    pub name: String,

    /// Port of the HTTP service
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

/// A routable member that may also serve Git over SSH
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkMemberWithSsh {
    /// Name of the member; also the name of its Kubernetes Service
    pub name: String,

    /// Port of the HTTP service
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Port of the SSH service, 0 if SSH is not exposed
    #[serde(default)]
    pub ssh_port: u16,
}

/// Status of a GerritNetwork
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GerritNetworkStatus {
    /// Whether all routing objects were applied
    #[serde(default)]
    pub ready: bool,

    /// Composition of the cluster, e.g. "PrimaryAndReplica"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composition: Option<String>,

    /// Gateway technology the routes were compiled for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,

    /// Names of the objects managed in the last pass
    #[serde(default)]
    pub managed_objects: Vec<String>,

    /// Last update time (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<String>,

    /// Conditions describing the status
    #[serde(default)]
    pub conditions: Vec<NetworkCondition>,
}

/// Condition for GerritNetwork status
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkCondition {
    /// Type of condition
    #[serde(rename = "type")]
    pub condition_type: String,

    /// Status: "True", "False", "Unknown"
    pub status: String,

    /// Machine-readable reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last transition time (RFC 3339)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

fn default_http_port() -> u16 {
    8080
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIMARY_REPLICA: &str = r#"
apiVersion: gerritoperator.google.com/v1alpha2
kind: GerritNetwork
metadata:
  name: gerrit
  namespace: gerrit-operator
spec:
  ingress:
    enabled: true
    host: example.com
    tls:
      enabled: true
      secret: tls-secret
  primaryGerrit:
    name: gerrit-primary
    sshPort: 29418
  gerritReplica:
    name: gerrit-replica
    httpPort: 48080
"#;

    #[test]
    fn test_deserialize_with_defaults() {
        let network: GerritNetwork = serde_yaml::from_str(PRIMARY_REPLICA).unwrap();
        let primary = network.spec.primary_gerrit.as_ref().unwrap();
        assert_eq!(primary.http_port, 8080);
        assert_eq!(primary.ssh_port, 29418);

        let replica = network.spec.gerrit_replica.as_ref().unwrap();
        assert_eq!(replica.http_port, 48080);
        assert_eq!(replica.ssh_port, 0);

        assert!(network.spec.receiver.is_none());
        assert!(network.spec.ingress.tls.enabled);
        assert!(!network.spec.ingress.ssh.enabled);
    }
}
