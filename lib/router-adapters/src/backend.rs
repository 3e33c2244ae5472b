//! The contract every gateway adapter implements

use crate::gates::Gate;
use crate::object_graph::{ManagedObject, ObjectGraph, ObjectKind};
use gerrit_router_api::GerritNetwork;
use gerrit_router_core::labels::labels;
use gerrit_router_core::{
    CoreError, OperatorInfo, Result, Role, RouteSet, RoutingRule, RuleId, TcpRoute, Topology,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::Resource;
use std::fmt;
use tracing::debug;

/// One object a backend may emit: its name suffix, kind and precondition
#[derive(Clone, Debug)]
pub struct Slot<C> {
    pub component: C,
    pub suffix: &'static str,
    pub kind: ObjectKind,
    pub gate: Gate,
}

impl<C> Slot<C> {
    pub fn new(component: C, suffix: &'static str, kind: ObjectKind, gate: Gate) -> Self {
        Self {
            component,
            suffix,
            kind,
            gate,
        }
    }
}

/// Everything an adapter needs to render an object
pub struct RenderContext<'a> {
    pub topology: &'a Topology,
    pub routes: &'a RouteSet,
    pub operator: &'a OperatorInfo,
}

impl<'a> RenderContext<'a> {
    pub fn namespace(&self) -> &'a str {
        self.topology.namespace()
    }

    pub fn host(&self) -> &'a str {
        &self.topology.ingress().host
    }

    pub fn name(&self, suffix: &str) -> String {
        self.topology.dependent_name(suffix)
    }

    /// Metadata shared by all emitted objects
    pub fn metadata(&self, name: &str, created_by: &str) -> ObjectMeta {
        let cluster = self.topology.cluster();
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(cluster.namespace.clone()),
            labels: Some(labels(self.operator, &cluster.name, name, created_by)),
            owner_references: self.owner_reference().map(|owner| vec![owner]),
            ..Default::default()
        }
    }

    fn owner_reference(&self) -> Option<OwnerReference> {
        let cluster = self.topology.cluster();
        let uid = cluster.uid.clone()?;
        Some(OwnerReference {
            api_version: GerritNetwork::api_version(&()).to_string(),
            kind: GerritNetwork::kind(&()).to_string(),
            name: cluster.name.clone(),
            uid,
            controller: Some(true),
            block_owner_deletion: Some(true),
        })
    }

    /// The rule an open gate relies on
    pub fn rule(&self, id: RuleId) -> Result<&'a RoutingRule> {
        self.routes
            .rule(id)
            .ok_or_else(|| CoreError::MissingRule(id.to_string()))
    }

    pub fn tcp_route(&self, role: Role) -> Result<&'a TcpRoute> {
        self.routes
            .tcp_route(role)
            .ok_or_else(|| CoreError::MissingRule(format!("ssh-{}", role)))
    }
}

/// A gateway technology the route set can be compiled for.
///
/// Implementors declare their full catalogue of slots up front; `compile`
/// renders the slots whose gate is open and lists the others as absent, so
/// objects that stop being wanted get cleaned up.
pub trait Backend {
    type Component: Copy + fmt::Debug;

    /// Value of the `created-by` label
    fn name(&self) -> &'static str;

    fn catalogue(&self) -> Vec<Slot<Self::Component>>;

    /// Render one object of the catalogue as a complete manifest
    fn render(
        &self,
        component: Self::Component,
        metadata: ObjectMeta,
        ctx: &RenderContext<'_>,
    ) -> Result<serde_json::Value>;

    fn compile(
        &self,
        topology: &Topology,
        routes: &RouteSet,
        operator: &OperatorInfo,
    ) -> Result<ObjectGraph> {
        let ctx = RenderContext {
            topology,
            routes,
            operator,
        };
        let mut graph = ObjectGraph::new();

        for slot in self.catalogue() {
            let name = ctx.name(slot.suffix);
            if !slot.gate.admits(topology) {
                debug!("{} {} gated off by {:?}", slot.kind, name, slot.gate);
                graph.mark_absent(name, slot.kind);
                continue;
            }

            let metadata = ctx.metadata(&name, self.name());
            let body = self.render(slot.component, metadata, &ctx)?;
            debug!("Rendered {} {}", slot.kind, name);
            graph.insert(ManagedObject {
                kind: slot.kind,
                name,
                body,
            });
        }

        Ok(graph)
    }

    /// List every object of the catalogue as absent. Used for the backends
    /// that are not selected, so their objects from earlier passes go away.
    fn retire(&self, topology: &Topology, graph: &mut ObjectGraph) {
        for slot in self.catalogue() {
            graph.mark_absent(topology.dependent_name(slot.suffix), slot.kind);
        }
    }
}
