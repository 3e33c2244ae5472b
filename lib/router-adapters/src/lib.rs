//! Compiles a cluster topology into the routing objects of a gateway
//!
//! This library provides:
//! - Adapters for ingress-nginx, Istio and Emissary/Ambassador
//! - Precondition gates deciding which objects exist for a topology
//! - The object graph handed to the reconciler

pub mod backend;
pub mod gates;
pub mod gateway;
pub mod ingress;
pub mod mesh;
pub mod object_graph;

pub use backend::{Backend, RenderContext, Slot};
pub use gates::Gate;
pub use gateway::GatewayBackend;
pub use gerrit_router_core::{CoreError, Result};
pub use ingress::IngressBackend;
pub use mesh::MeshBackend;
pub use object_graph::{ManagedObject, ObjectGraph, ObjectKind};

use gerrit_router_core::{derive_routes, BackendKind, OperatorInfo, RouteSet, Topology};
use tracing::debug;

/// The closed set of supported gateway technologies
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendAdapter {
    Ingress(IngressBackend),
    Mesh(MeshBackend),
    Gateway(GatewayBackend),
}

impl BackendAdapter {
    /// Adapter for a backend kind; `None` manages no objects
    pub fn for_kind(kind: BackendKind) -> Option<Self> {
        match kind {
            BackendKind::Ingress => Some(BackendAdapter::Ingress(IngressBackend)),
            BackendKind::Mesh => Some(BackendAdapter::Mesh(MeshBackend)),
            BackendKind::Gateway => Some(BackendAdapter::Gateway(GatewayBackend)),
            BackendKind::None => None,
        }
    }

    pub fn all() -> [Self; 3] {
        [
            BackendAdapter::Ingress(IngressBackend),
            BackendAdapter::Mesh(MeshBackend),
            BackendAdapter::Gateway(GatewayBackend),
        ]
    }

    pub fn compile(
        &self,
        topology: &Topology,
        routes: &RouteSet,
        operator: &OperatorInfo,
    ) -> Result<ObjectGraph> {
        match self {
            BackendAdapter::Ingress(backend) => backend.compile(topology, routes, operator),
            BackendAdapter::Mesh(backend) => backend.compile(topology, routes, operator),
            BackendAdapter::Gateway(backend) => backend.compile(topology, routes, operator),
        }
    }

    pub fn retire(&self, topology: &Topology, graph: &mut ObjectGraph) {
        match self {
            BackendAdapter::Ingress(backend) => backend.retire(topology, graph),
            BackendAdapter::Mesh(backend) => backend.retire(topology, graph),
            BackendAdapter::Gateway(backend) => backend.retire(topology, graph),
        }
    }
}

/// Derive the routes of a topology and compile them for its backend.
///
/// Objects of the other backends are listed as absent. A topology without
/// a backend yields no present objects and every known object as absent.
pub fn resolve(topology: &Topology, operator: &OperatorInfo) -> Result<ObjectGraph> {
    let kind = topology.ingress().backend_kind;
    let selected = BackendAdapter::for_kind(kind);

    let mut graph = match selected {
        Some(adapter) => {
            let routes = derive_routes(topology);
            adapter.compile(topology, &routes, operator)?
        }
        None => {
            debug!("No backend configured for {}", topology.cluster().name);
            ObjectGraph::new()
        }
    };

    for adapter in BackendAdapter::all() {
        if Some(adapter) != selected {
            adapter.retire(topology, &mut graph);
        }
    }

    debug!(
        "Resolved {} objects ({} absent) for {} on {}",
        graph.len(),
        graph.absent().count(),
        topology.cluster().name,
        kind
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gerrit_router_core::{ClusterRef, IngressSettings, NetworkMemberWithSsh};

    fn topology(kind: BackendKind) -> Topology {
        Topology::new(
            ClusterRef {
                name: "gerrit".to_string(),
                namespace: "default".to_string(),
                uid: Some("abc".to_string()),
            },
            Some(NetworkMemberWithSsh {
                name: "gerrit".to_string(),
                http_port: 8080,
                ssh_port: None,
            }),
            Some(NetworkMemberWithSsh {
                name: "gerrit-replica".to_string(),
                http_port: 8080,
                ssh_port: None,
            }),
            None,
            IngressSettings {
                host: "example.com".to_string(),
                backend_kind: kind,
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_no_backend_retires_every_object() {
        let graph = resolve(&topology(BackendKind::None), &OperatorInfo::default()).unwrap();
        assert!(graph.is_empty());
        assert_eq!(graph.absent().count(), 16);
        assert!(graph.is_absent("gerrit-gerrit-ingress"));
        assert!(graph.is_absent("gerrit-gerrit-http-virtual-service"));
        assert!(graph.is_absent("gerrit-gerrit-mapping-primary"));
    }

    #[test]
    fn test_other_backends_are_retired() {
        let operator = OperatorInfo::default();
        let mesh = resolve(&topology(BackendKind::Mesh), &operator).unwrap();
        assert!(mesh.contains("gerrit-gerrit-istio-gateway"));
        assert!(mesh.is_absent("gerrit-gerrit-ingress"));
        assert!(mesh.is_absent("gerrit-gerrit-mapping-primary"));
        assert!(mesh.absent().all(|(_, kind)| !matches!(
            kind,
            ObjectKind::IstioGateway | ObjectKind::VirtualService | ObjectKind::DestinationRule
        )));

        let ingress = resolve(&topology(BackendKind::Ingress), &operator).unwrap();
        assert!(!ingress.is_absent("gerrit-gerrit-ingress"));
        assert!(ingress.is_absent("gerrit-gerrit-istio-gateway"));
    }

    #[test]
    fn test_resolve_dispatches_by_kind() {
        let operator = OperatorInfo::default();
        let ingress = resolve(&topology(BackendKind::Ingress), &operator).unwrap();
        assert!(ingress.objects().all(|o| o.kind == ObjectKind::Ingress));

        let mesh = resolve(&topology(BackendKind::Mesh), &operator).unwrap();
        assert_eq!(mesh.len(), 4);

        let gateway = resolve(&topology(BackendKind::Gateway), &operator).unwrap();
        assert!(gateway.objects().all(|o| o.kind == ObjectKind::Mapping));
        assert_eq!(gateway.len(), 3);
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let operator = OperatorInfo::default();
        for kind in [BackendKind::Ingress, BackendKind::Mesh, BackendKind::Gateway] {
            let topology = topology(kind);
            let first = resolve(&topology, &operator).unwrap();
            let second = resolve(&topology, &operator).unwrap();
            assert_eq!(first, second);
            let bodies: Vec<String> = first.objects().map(|o| o.body.to_string()).collect();
            let again: Vec<String> = second.objects().map(|o| o.body.to_string()).collect();
            assert_eq!(bodies, again);
        }
    }
}
