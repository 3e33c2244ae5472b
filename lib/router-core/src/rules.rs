//! Derivation of the ordered routing rules that split Git smart HTTP traffic
//!
//! A fetch/clone issues `GET /<repo>/info/refs?service=git-upload-pack`
//! followed by `POST /<repo>/git-upload-pack`; a push issues the same pair
//! with `git-receive-pack`. Reads and writes therefore share the
//! `info/refs` path and differ only in the `service` query parameter.

use crate::topology::{Destination, NetworkMemberWithSsh, Role, Topology};
use std::fmt;
use tracing::debug;

/// Path of the fetch/clone data exchange
pub const UPLOAD_PACK_PATTERN: &str = "^/(.*)/git-upload-pack$";
/// Path of the push data exchange
pub const RECEIVE_PACK_PATTERN: &str = "^/(.*)/git-receive-pack$";
/// Path of the ref advertisement shared by fetch and push
pub const INFO_REFS_PATTERN: &str = "^/(.*)/info/refs$";
/// Projects REST API used by the replication plugin
pub const PROJECTS_PREFIX: &str = "/a/projects";
/// Query parameter naming the Git service on `info/refs`
pub const SERVICE_PARAM: &str = "service";

pub const UPLOAD_PACK_SERVICE: &str = "git-upload-pack";
pub const RECEIVE_PACK_SERVICE: &str = "git-receive-pack";

/// How a rule matches the request path
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathMatch {
    Prefix(String),
    /// Regular expression anchored at both ends
    Regex(String),
}

impl PathMatch {
    pub fn pattern(&self) -> &str {
        match self {
            PathMatch::Prefix(prefix) => prefix,
            PathMatch::Regex(regex) => regex,
        }
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, PathMatch::Regex(_))
    }
}

/// Exact match on one query parameter
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryMatch {
    pub key: String,
    pub value: String,
}

/// Conjunction of optional constraints. No constraints matches every request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Matcher {
    pub path: Option<PathMatch>,
    /// HTTP method, compared case-insensitively
    pub method: Option<String>,
    pub query: Option<QueryMatch>,
}

impl Matcher {
    pub fn catch_all() -> Self {
        Self::default()
    }

    pub fn prefix(prefix: &str) -> Self {
        Self {
            path: Some(PathMatch::Prefix(prefix.to_string())),
            ..Default::default()
        }
    }

    pub fn regex(pattern: &str) -> Self {
        Self {
            path: Some(PathMatch::Regex(pattern.to_string())),
            ..Default::default()
        }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = Some(method.to_string());
        self
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query = Some(QueryMatch {
            key: key.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn is_catch_all(&self) -> bool {
        self.path.is_none() && self.method.is_none() && self.query.is_none()
    }
}

/// Stable identity of a rule; adapters key their objects on it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleId {
    /// `POST .../git-receive-pack` to the receiver
    ReceiverReceivePack,
    /// `GET .../info/refs?service=git-receive-pack` to the receiver
    ReceiverInfoRefs,
    /// `/a/projects...` to the receiver
    ReceiverProjects,
    /// `POST .../git-upload-pack` to the replica
    ReplicaUploadPack,
    /// `GET .../info/refs?service=git-upload-pack` to the replica
    ReplicaInfoRefs,
    /// Remaining traffic to the primary while reads go to the replica
    PrimaryDefault,
    /// All remaining traffic to the only Gerrit
    SingleDefault,
}

impl RuleId {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::ReceiverReceivePack => "receiver-receive-pack",
            RuleId::ReceiverInfoRefs => "receiver-info-refs",
            RuleId::ReceiverProjects => "receiver-projects",
            RuleId::ReplicaUploadPack => "replica-upload-pack",
            RuleId::ReplicaInfoRefs => "replica-info-refs",
            RuleId::PrimaryDefault => "primary-default",
            RuleId::SingleDefault => "single-default",
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP routing rule
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutingRule {
    pub id: RuleId,
    pub matcher: Matcher,
    pub destination: Destination,
    /// Evaluation priority; lower is more specific and evaluated first
    pub order: u32,
}

impl RoutingRule {
    pub fn name(&self) -> &'static str {
        self.id.as_str()
    }
}

/// An SSH route, keyed on the TCP port the connection arrives at
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TcpRoute {
    pub port: u16,
    pub destination: Destination,
}

impl TcpRoute {
    /// "ssh-primary" or "ssh-replica"
    pub fn name(&self) -> String {
        format!("ssh-{}", self.destination.role)
    }
}

/// All routes of a topology
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteSet {
    pub http: Vec<RoutingRule>,
    pub tcp: Vec<TcpRoute>,
}

impl RouteSet {
    /// HTTP rules sorted by `order`
    pub fn ordered_http(&self) -> Vec<&RoutingRule> {
        let mut rules: Vec<&RoutingRule> = self.http.iter().collect();
        rules.sort_by_key(|rule| rule.order);
        rules
    }

    pub fn rule(&self, id: RuleId) -> Option<&RoutingRule> {
        self.http.iter().find(|rule| rule.id == id)
    }

    pub fn tcp_route(&self, role: Role) -> Option<&TcpRoute> {
        self.tcp.iter().find(|route| route.destination.role == role)
    }

    /// Whether unmatched HTTP requests still reach a Gerrit
    pub fn has_catch_all(&self) -> bool {
        self.http.iter().any(|rule| rule.matcher.is_catch_all())
    }
}

/// Derive the routes for a topology.
///
/// Receiver rules come first since their paths overlap with read traffic,
/// then the replica's read rules, then the catch-all.
pub fn derive_routes(topology: &Topology) -> RouteSet {
    let mut rules: Vec<(RuleId, Matcher, Destination)> = Vec::new();

    if let Some(receiver) = topology.receiver() {
        let destination = Destination::new(Role::Receiver, receiver.clone());
        rules.push((
            RuleId::ReceiverReceivePack,
            Matcher::regex(RECEIVE_PACK_PATTERN).with_method("POST"),
            destination.clone(),
        ));
        rules.push((
            RuleId::ReceiverInfoRefs,
            Matcher::regex(INFO_REFS_PATTERN)
                .with_method("GET")
                .with_query(SERVICE_PARAM, RECEIVE_PACK_SERVICE),
            destination.clone(),
        ));
        rules.push((
            RuleId::ReceiverProjects,
            Matcher::prefix(PROJECTS_PREFIX),
            destination,
        ));
    }

    match (topology.primary(), topology.replica()) {
        (Some(primary), Some(replica)) => {
            let replica = Destination::new(Role::Replica, replica.http());
            rules.push((
                RuleId::ReplicaUploadPack,
                Matcher::regex(UPLOAD_PACK_PATTERN).with_method("POST"),
                replica.clone(),
            ));
            rules.push((
                RuleId::ReplicaInfoRefs,
                Matcher::regex(INFO_REFS_PATTERN)
                    .with_method("GET")
                    .with_query(SERVICE_PARAM, UPLOAD_PACK_SERVICE),
                replica,
            ));
            rules.push((
                RuleId::PrimaryDefault,
                Matcher::catch_all(),
                Destination::new(Role::Primary, primary.http()),
            ));
        }
        (Some(primary), None) => rules.push((
            RuleId::SingleDefault,
            Matcher::catch_all(),
            Destination::new(Role::Primary, primary.http()),
        )),
        (None, Some(replica)) => rules.push((
            RuleId::SingleDefault,
            Matcher::catch_all(),
            Destination::new(Role::Replica, replica.http()),
        )),
        // Receiver only: unmatched paths have no Git server to go to
        (None, None) => {}
    }

    let http = rules
        .into_iter()
        .enumerate()
        .map(|(order, (id, matcher, destination))| RoutingRule {
            id,
            matcher,
            destination,
            order: order as u32,
        })
        .collect::<Vec<_>>();

    let tcp = if topology.ingress().ssh_enabled {
        topology
            .gerrits()
            .filter_map(|(role, member)| tcp_route(role, member))
            .collect()
    } else {
        Vec::new()
    };

    debug!(
        "Derived {} HTTP and {} TCP routes for {} ({})",
        http.len(),
        tcp.len(),
        topology.cluster().name,
        topology.composition()
    );

    RouteSet { http, tcp }
}

fn tcp_route(role: Role, member: &NetworkMemberWithSsh) -> Option<TcpRoute> {
    let port = member.ssh_port?;
    Some(TcpRoute {
        port,
        destination: Destination::new(
            role,
            crate::topology::NetworkMember {
                name: member.name.clone(),
                http_port: port,
            },
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{
        BackendKind, ClusterRef, IngressSettings, NetworkMember, NetworkMemberWithSsh,
    };

    fn gerrit(name: &str, ssh_port: Option<u16>) -> NetworkMemberWithSsh {
        NetworkMemberWithSsh {
            name: name.to_string(),
            http_port: 8080,
            ssh_port,
        }
    }

    fn receiver() -> NetworkMember {
        NetworkMember {
            name: "receiver".to_string(),
            http_port: 8080,
        }
    }

    fn topology(
        primary: Option<NetworkMemberWithSsh>,
        replica: Option<NetworkMemberWithSsh>,
        receiver: Option<NetworkMember>,
        ssh_enabled: bool,
    ) -> Topology {
        Topology::new(
            ClusterRef {
                name: "gerrit".to_string(),
                namespace: "default".to_string(),
                uid: None,
            },
            primary,
            replica,
            receiver,
            IngressSettings {
                host: "example.com".to_string(),
                ssh_enabled,
                backend_kind: BackendKind::Mesh,
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn ids(routes: &RouteSet) -> Vec<RuleId> {
        routes.ordered_http().iter().map(|rule| rule.id).collect()
    }

    #[test]
    fn test_primary_only_has_single_catch_all() {
        let routes = derive_routes(&topology(Some(gerrit("gerrit", None)), None, None, false));
        assert_eq!(ids(&routes), vec![RuleId::SingleDefault]);
        let rule = &routes.http[0];
        assert!(rule.matcher.is_catch_all());
        assert_eq!(rule.destination.role, Role::Primary);
        assert_eq!(rule.destination.service_name(), "gerrit");
        assert!(routes.tcp.is_empty());
    }

    #[test]
    fn test_primary_and_replica_split() {
        let routes = derive_routes(&topology(
            Some(gerrit("gerrit", None)),
            Some(gerrit("gerrit-replica", None)),
            None,
            false,
        ));
        assert_eq!(
            ids(&routes),
            vec![
                RuleId::ReplicaUploadPack,
                RuleId::ReplicaInfoRefs,
                RuleId::PrimaryDefault
            ]
        );

        let upload = routes.rule(RuleId::ReplicaUploadPack).unwrap();
        assert_eq!(upload.destination.service_name(), "gerrit-replica");
        assert_eq!(upload.matcher.method.as_deref(), Some("POST"));

        let info_refs = routes.rule(RuleId::ReplicaInfoRefs).unwrap();
        let query = info_refs.matcher.query.as_ref().unwrap();
        assert_eq!(query.key, "service");
        assert_eq!(query.value, "git-upload-pack");

        let primary = routes.rule(RuleId::PrimaryDefault).unwrap();
        assert_eq!(primary.destination.service_name(), "gerrit");
    }

    #[test]
    fn test_replica_and_receiver() {
        let routes = derive_routes(&topology(
            None,
            Some(gerrit("gerrit-replica", None)),
            Some(receiver()),
            false,
        ));
        assert_eq!(
            ids(&routes),
            vec![
                RuleId::ReceiverReceivePack,
                RuleId::ReceiverInfoRefs,
                RuleId::ReceiverProjects,
                RuleId::SingleDefault
            ]
        );
        let catch_all = routes.rule(RuleId::SingleDefault).unwrap();
        assert_eq!(catch_all.destination.role, Role::Replica);
        assert!(routes
            .http
            .iter()
            .all(|rule| rule.destination.role != Role::Primary));
    }

    #[test]
    fn test_receiver_only_has_no_catch_all() {
        let routes = derive_routes(&topology(None, None, Some(receiver()), true));
        assert_eq!(routes.http.len(), 3);
        assert!(!routes.has_catch_all());
        assert!(routes.tcp.is_empty());
    }

    #[test]
    fn test_receiver_rules_come_first() {
        let routes = derive_routes(&topology(
            None,
            Some(gerrit("gerrit-replica", None)),
            Some(receiver()),
            false,
        ));
        let ordered = routes.ordered_http();
        let last_receiver = ordered
            .iter()
            .rposition(|rule| rule.destination.role == Role::Receiver)
            .unwrap();
        let first_other = ordered
            .iter()
            .position(|rule| rule.destination.role != Role::Receiver)
            .unwrap();
        assert!(last_receiver < first_other);
    }

    #[test]
    fn test_ssh_routes_keyed_on_port() {
        let routes = derive_routes(&topology(Some(gerrit("gerrit", Some(29418))), None, None, true));
        assert_eq!(routes.tcp.len(), 1);
        let route = routes.tcp_route(Role::Primary).unwrap();
        assert_eq!(route.port, 29418);
        assert_eq!(route.destination.port(), 29418);
        assert_eq!(route.name(), "ssh-primary");
        // SSH routes do not change the HTTP rules
        assert_eq!(ids(&routes), vec![RuleId::SingleDefault]);
    }

    #[test]
    fn test_ssh_disabled_or_without_port() {
        let disabled = derive_routes(&topology(Some(gerrit("gerrit", Some(29418))), None, None, false));
        assert!(disabled.tcp.is_empty());

        let routes = derive_routes(&topology(
            Some(gerrit("gerrit", Some(29418))),
            Some(gerrit("gerrit-replica", None)),
            None,
            true,
        ));
        assert_eq!(routes.tcp.len(), 1);
        assert!(routes.tcp_route(Role::Replica).is_none());
    }

    #[test]
    fn test_orders_are_unique_and_dense() {
        let routes = derive_routes(&topology(
            Some(gerrit("gerrit", None)),
            Some(gerrit("gerrit-replica", None)),
            None,
            false,
        ));
        let orders: Vec<u32> = routes.ordered_http().iter().map(|rule| rule.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }
}
