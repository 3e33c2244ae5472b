//! Backend-agnostic description of a cluster's routable members

use crate::composition::Composition;
use crate::{CoreError, Result};
use gerrit_router_api::v1alpha2::{self, GerritNetwork};
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A routable backend endpoint
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NetworkMember {
    pub name: String,
    pub http_port: u16,
}

/// A member that may additionally serve Git over SSH
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NetworkMemberWithSsh {
    pub name: String,
    pub http_port: u16,
    /// `None` if SSH is not exposed for this member
    pub ssh_port: Option<u16>,
}

impl NetworkMemberWithSsh {
    /// The HTTP endpoint of this member
    pub fn http(&self) -> NetworkMember {
        NetworkMember {
            name: self.name.clone(),
            http_port: self.http_port,
        }
    }
}

/// Role a member plays in the cluster
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Receiver,
    Replica,
    Primary,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Receiver => "receiver",
            Role::Replica => "replica",
            Role::Primary => "primary",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a rule sends its traffic
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Destination {
    pub role: Role,
    pub member: NetworkMember,
}

impl Destination {
    pub fn new(role: Role, member: NetworkMember) -> Self {
        Self { role, member }
    }

    /// Name of the member's Kubernetes Service
    pub fn service_name(&self) -> &str {
        &self.member.name
    }

    pub fn port(&self) -> u16 {
        self.member.http_port
    }

    /// Cluster-local DNS name of the member's Service
    pub fn hostname(&self, namespace: &str) -> String {
        service_hostname(&self.member.name, namespace)
    }

    /// "<service>:<port>"
    pub fn upstream(&self) -> String {
        format!("{}:{}", self.member.name, self.member.http_port)
    }
}

pub fn service_hostname(service: &str, namespace: &str) -> String {
    format!("{}.{}.svc.cluster.local", service, namespace)
}

/// Gateway technology the routes are compiled for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum BackendKind {
    /// Path-based ingress controller (ingress-nginx)
    Ingress,
    /// Service mesh gateway (Istio)
    Mesh,
    /// API gateway (Emissary/Ambassador)
    Gateway,
    /// No routing objects are managed
    #[default]
    None,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Ingress => "INGRESS",
            BackendKind::Mesh => "ISTIO",
            BackendKind::Gateway => "AMBASSADOR",
            BackendKind::None => "NONE",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INGRESS" => Ok(BackendKind::Ingress),
            "ISTIO" | "MESH" => Ok(BackendKind::Mesh),
            "AMBASSADOR" | "GATEWAY" => Ok(BackendKind::Gateway),
            "NONE" | "" => Ok(BackendKind::None),
            _ => Err(CoreError::UnknownBackend(s.to_string())),
        }
    }
}

/// Identity of the resource owning the emitted objects
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterRef {
    pub name: String,
    pub namespace: String,
    pub uid: Option<String>,
}

/// Ingress settings shared by all members
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct IngressSettings {
    pub host: String,
    pub tls_enabled: bool,
    pub tls_secret_name: Option<String>,
    pub ssh_enabled: bool,
    pub backend_kind: BackendKind,
    /// Ambassador ids for the API gateway backend
    pub backend_specific_ids: Vec<String>,
    /// Whether the API gateway adapter registers the host itself
    pub create_host: bool,
    /// User annotations for the ingress object
    pub annotations: BTreeMap<String, String>,
}

/// The resolved set of cluster members and their ingress attributes.
///
/// Construction validates the composition: at most one primary, at most one
/// replica, never a primary together with a receiver, and at least one member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topology {
    cluster: ClusterRef,
    primary: Option<NetworkMemberWithSsh>,
    replica: Option<NetworkMemberWithSsh>,
    receiver: Option<NetworkMember>,
    ingress: IngressSettings,
    composition: Composition,
}

impl Topology {
    pub fn new(
        cluster: ClusterRef,
        primary: Option<NetworkMemberWithSsh>,
        replica: Option<NetworkMemberWithSsh>,
        receiver: Option<NetworkMember>,
        ingress: IngressSettings,
    ) -> Result<Self> {
        let composition =
            Composition::from_presence(primary.is_some(), replica.is_some(), receiver.is_some())
                .ok_or_else(|| {
                    CoreError::invariant(describe_illegal(
                        primary.is_some(),
                        replica.is_some(),
                        receiver.is_some(),
                    ))
                })?;

        let http_ports = primary
            .iter()
            .chain(replica.iter())
            .map(|m| (&m.name, m.http_port))
            .chain(receiver.iter().map(|m| (&m.name, m.http_port)));
        for (name, port) in http_ports {
            if port == 0 {
                return Err(CoreError::invariant(format!(
                    "member {} has no HTTP port",
                    name
                )));
            }
        }

        if ingress.backend_kind != BackendKind::None {
            if ingress.host.is_empty() {
                return Err(CoreError::invariant("ingress host is not set"));
            }
            if ingress.tls_enabled && ingress.tls_secret_name.is_none() {
                return Err(CoreError::invariant(
                    "TLS is enabled but no TLS secret is configured",
                ));
            }
        }

        Ok(Self {
            cluster,
            primary,
            replica,
            receiver,
            ingress,
            composition,
        })
    }

    /// Build the topology of a GerritNetwork for the given backend.
    ///
    /// A network whose ingress is disabled resolves to `BackendKind::None`.
    pub fn from_network(network: &GerritNetwork, backend_kind: BackendKind) -> Result<Self> {
        let spec = &network.spec;
        let cluster = ClusterRef {
            name: network.name_any(),
            namespace: network.namespace().unwrap_or_else(|| "default".to_string()),
            uid: network.uid(),
        };

        let backend_kind = if spec.ingress.enabled {
            backend_kind
        } else {
            BackendKind::None
        };

        let ingress = IngressSettings {
            host: spec.ingress.host.clone(),
            tls_enabled: spec.ingress.tls.enabled,
            tls_secret_name: spec
                .ingress
                .tls
                .secret
                .clone()
                .filter(|secret| !secret.is_empty()),
            ssh_enabled: spec.ingress.ssh.enabled,
            backend_kind,
            backend_specific_ids: spec.ingress.ambassador.id.clone(),
            create_host: spec.ingress.ambassador.create_host,
            annotations: spec.ingress.annotations.clone(),
        };

        Self::new(
            cluster,
            spec.primary_gerrit.as_ref().map(member_with_ssh),
            spec.gerrit_replica.as_ref().map(member_with_ssh),
            spec.receiver.as_ref().map(member),
            ingress,
        )
    }

    pub fn cluster(&self) -> &ClusterRef {
        &self.cluster
    }

    pub fn namespace(&self) -> &str {
        &self.cluster.namespace
    }

    pub fn primary(&self) -> Option<&NetworkMemberWithSsh> {
        self.primary.as_ref()
    }

    pub fn replica(&self) -> Option<&NetworkMemberWithSsh> {
        self.replica.as_ref()
    }

    pub fn receiver(&self) -> Option<&NetworkMember> {
        self.receiver.as_ref()
    }

    pub fn ingress(&self) -> &IngressSettings {
        &self.ingress
    }

    pub fn composition(&self) -> Composition {
        self.composition
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    pub fn has_replica(&self) -> bool {
        self.replica.is_some()
    }

    pub fn has_receiver(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn has_gerrits(&self) -> bool {
        self.has_primary() || self.has_replica()
    }

    /// Gerrit members (primary first) with their roles
    pub fn gerrits(&self) -> impl Iterator<Item = (Role, &NetworkMemberWithSsh)> {
        self.primary
            .iter()
            .map(|m| (Role::Primary, m))
            .chain(self.replica.iter().map(|m| (Role::Replica, m)))
    }

    /// Gerrit member playing `role`, if any
    pub fn gerrit(&self, role: Role) -> Option<&NetworkMemberWithSsh> {
        match role {
            Role::Primary => self.primary.as_ref(),
            Role::Replica => self.replica.as_ref(),
            Role::Receiver => None,
        }
    }

    /// Name of an object owned by this cluster: `<cluster>-<suffix>`
    pub fn dependent_name(&self, suffix: &str) -> String {
        format!("{}-{}", self.cluster.name, suffix)
    }
}

fn member(member: &v1alpha2::NetworkMember) -> NetworkMember {
    NetworkMember {
        name: member.name.clone(),
        http_port: member.http_port,
    }
}

fn member_with_ssh(member: &v1alpha2::NetworkMemberWithSsh) -> NetworkMemberWithSsh {
    NetworkMemberWithSsh {
        name: member.name.clone(),
        http_port: member.http_port,
        ssh_port: Some(member.ssh_port).filter(|port| *port > 0),
    }
}

fn describe_illegal(has_primary: bool, has_replica: bool, has_receiver: bool) -> String {
    if has_primary && has_receiver {
        "a receiver cannot be combined with a primary Gerrit".to_string()
    } else if !has_primary && !has_replica && !has_receiver {
        "no receiver or Gerrit in the cluster".to_string()
    } else {
        format!(
            "unsupported composition (primary: {}, replica: {}, receiver: {})",
            has_primary, has_replica, has_receiver
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster() -> ClusterRef {
        ClusterRef {
            name: "gerrit".to_string(),
            namespace: "gerrit-operator".to_string(),
            uid: None,
        }
    }

    fn gerrit(name: &str) -> NetworkMemberWithSsh {
        NetworkMemberWithSsh {
            name: name.to_string(),
            http_port: 8080,
            ssh_port: None,
        }
    }

    fn ingress(kind: BackendKind) -> IngressSettings {
        IngressSettings {
            host: "example.com".to_string(),
            backend_kind: kind,
            ..Default::default()
        }
    }

    #[test]
    fn test_primary_with_receiver_is_rejected() {
        let receiver = NetworkMember {
            name: "receiver".to_string(),
            http_port: 8080,
        };
        let result = Topology::new(
            cluster(),
            Some(gerrit("gerrit")),
            None,
            Some(receiver),
            ingress(BackendKind::Ingress),
        );
        assert!(matches!(result, Err(CoreError::InvariantViolation(_))));
    }

    #[test]
    fn test_empty_topology_is_rejected() {
        let result = Topology::new(cluster(), None, None, None, ingress(BackendKind::Mesh));
        assert!(matches!(result, Err(CoreError::InvariantViolation(_))));
    }

    #[test]
    fn test_tls_without_secret_is_rejected() {
        let mut settings = ingress(BackendKind::Ingress);
        settings.tls_enabled = true;
        let result = Topology::new(cluster(), Some(gerrit("gerrit")), None, None, settings);
        assert!(matches!(result, Err(CoreError::InvariantViolation(_))));
    }

    #[test]
    fn test_missing_host_only_matters_with_a_backend() {
        let mut settings = ingress(BackendKind::None);
        settings.host.clear();
        assert!(Topology::new(cluster(), Some(gerrit("gerrit")), None, None, settings.clone()).is_ok());

        settings.backend_kind = BackendKind::Gateway;
        assert!(Topology::new(cluster(), Some(gerrit("gerrit")), None, None, settings).is_err());
    }

    #[test]
    fn test_backend_kind_from_str() {
        assert_eq!("ingress".parse::<BackendKind>().unwrap(), BackendKind::Ingress);
        assert_eq!("ISTIO".parse::<BackendKind>().unwrap(), BackendKind::Mesh);
        assert_eq!("mesh".parse::<BackendKind>().unwrap(), BackendKind::Mesh);
        assert_eq!("Ambassador".parse::<BackendKind>().unwrap(), BackendKind::Gateway);
        assert_eq!("NONE".parse::<BackendKind>().unwrap(), BackendKind::None);
        assert!("traefik".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_gerrits_lists_primary_first() {
        let topology = Topology::new(
            cluster(),
            Some(gerrit("gerrit")),
            Some(gerrit("gerrit-replica")),
            None,
            ingress(BackendKind::Mesh),
        )
        .unwrap();
        let roles: Vec<Role> = topology.gerrits().map(|(role, _)| role).collect();
        assert_eq!(roles, vec![Role::Primary, Role::Replica]);
        assert_eq!(topology.dependent_name("gerrit-ingress"), "gerrit-gerrit-ingress");
    }

    #[test]
    fn test_destination_addresses() {
        let destination = Destination::new(Role::Replica, gerrit("gerrit-replica").http());
        assert_eq!(
            destination.hostname("gerrit-operator"),
            "gerrit-replica.gerrit-operator.svc.cluster.local"
        );
        assert_eq!(destination.upstream(), "gerrit-replica:8080");
    }
}
