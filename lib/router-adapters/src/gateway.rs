//! Emissary/Ambassador API gateway objects
//!
//! Each routing rule becomes its own Mapping. Emissary orders Mappings by
//! `precedence` first, so rule order is carried over explicitly.

use crate::backend::{Backend, RenderContext, Slot};
use crate::gates::Gate;
use crate::object_graph::ObjectKind;
use gerrit_router_api::ambassador::{
    Host, HostSpec, LocalObjectRef, Mapping, MappingSpec, TCPMapping, TCPMappingSpec, TLSContext,
    TLSContextSpec,
};
use gerrit_router_core::{PathMatch, Result, Role, RuleId};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

pub const TLS_CONTEXT_SUFFIX: &str = "gerrit-tls-context";
pub const HOST_SUFFIX: &str = "gerrit-ambassador-host";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatewayComponent {
    Mapping(RuleId),
    TlsContext,
    Host,
    TcpMapping(Role),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GatewayBackend;

/// Name suffix and gate of the Mapping rendered for each rule
const MAPPINGS: [(RuleId, &str, Gate); 7] = [
    (RuleId::SingleDefault, "gerrit-mapping", Gate::SingleGerrit),
    (RuleId::PrimaryDefault, "gerrit-mapping-primary", Gate::Split),
    (
        RuleId::ReplicaUploadPack,
        "gerrit-mapping-post-replica",
        Gate::Split,
    ),
    (
        RuleId::ReplicaInfoRefs,
        "gerrit-mapping-get-replica",
        Gate::Split,
    ),
    (
        RuleId::ReceiverReceivePack,
        "gerrit-mapping-receiver-post",
        Gate::Receiver,
    ),
    (
        RuleId::ReceiverInfoRefs,
        "gerrit-mapping-receiver-get",
        Gate::Receiver,
    ),
    (
        RuleId::ReceiverProjects,
        "gerrit-mapping-receiver-projects",
        Gate::Receiver,
    ),
];

impl Backend for GatewayBackend {
    type Component = GatewayComponent;

    fn name(&self) -> &'static str {
        "gateway-adapter"
    }

    fn catalogue(&self) -> Vec<Slot<GatewayComponent>> {
        let mut slots: Vec<Slot<GatewayComponent>> = MAPPINGS
            .iter()
            .map(|(id, suffix, gate)| {
                Slot::new(GatewayComponent::Mapping(*id), *suffix, ObjectKind::Mapping, *gate)
            })
            .collect();

        slots.push(Slot::new(
            GatewayComponent::TlsContext,
            TLS_CONTEXT_SUFFIX,
            ObjectKind::TlsContext,
            Gate::TlsEnabled,
        ));
        slots.push(Slot::new(
            GatewayComponent::Host,
            HOST_SUFFIX,
            ObjectKind::AmbassadorHost,
            Gate::ManagedHost,
        ));
        slots.push(Slot::new(
            GatewayComponent::TcpMapping(Role::Primary),
            "gerrit-tcp-mapping-primary",
            ObjectKind::TcpMapping,
            Gate::Ssh(Role::Primary),
        ));
        slots.push(Slot::new(
            GatewayComponent::TcpMapping(Role::Replica),
            "gerrit-tcp-mapping-replica",
            ObjectKind::TcpMapping,
            Gate::Ssh(Role::Replica),
        ));
        slots
    }

    fn render(
        &self,
        component: GatewayComponent,
        metadata: ObjectMeta,
        ctx: &RenderContext<'_>,
    ) -> Result<serde_json::Value> {
        let value = match component {
            GatewayComponent::Mapping(id) => serde_json::to_value(Mapping {
                metadata,
                spec: mapping_spec(ctx, id)?,
            })?,
            GatewayComponent::TlsContext => serde_json::to_value(TLSContext {
                metadata,
                spec: tls_context_spec(ctx),
            })?,
            GatewayComponent::Host => serde_json::to_value(Host {
                metadata,
                spec: host_spec(ctx),
            })?,
            GatewayComponent::TcpMapping(role) => {
                let route = ctx.tcp_route(role)?;
                serde_json::to_value(TCPMapping {
                    metadata,
                    spec: TCPMappingSpec {
                        ambassador_id: ambassador_ids(ctx),
                        port: route.port,
                        service: route.destination.upstream(),
                    },
                })?
            }
        };
        Ok(value)
    }
}

fn ambassador_ids(ctx: &RenderContext<'_>) -> Vec<String> {
    ctx.topology.ingress().backend_specific_ids.clone()
}

fn mapping_spec(ctx: &RenderContext<'_>, id: RuleId) -> Result<MappingSpec> {
    let rule = ctx.rule(id)?;
    let matcher = &rule.matcher;

    let (prefix, prefix_regex) = match &matcher.path {
        Some(PathMatch::Regex(pattern)) => (pattern.clone(), Some(true)),
        Some(PathMatch::Prefix(prefix)) => (prefix.clone(), None),
        None => ("/".to_string(), None),
    };

    // Higher precedence is tried first; the catch-all keeps the default
    let precedence = if matcher.is_catch_all() {
        None
    } else {
        Some(ctx.routes.http.len() as i32 - rule.order as i32)
    };

    Ok(MappingSpec {
        ambassador_id: ambassador_ids(ctx),
        host: Some(ctx.host().to_string()),
        prefix,
        prefix_regex,
        method: matcher.method.as_ref().map(|m| m.to_ascii_uppercase()),
        query_parameters: matcher
            .query
            .iter()
            .map(|query| (query.key.clone(), query.value.clone()))
            .collect(),
        service: rule.destination.upstream(),
        bypass_auth: Some(true),
        // Keep the matched prefix instead of rewriting it to "/"
        rewrite: Some(String::new()),
        precedence,
    })
}

fn tls_context_spec(ctx: &RenderContext<'_>) -> TLSContextSpec {
    TLSContextSpec {
        ambassador_id: ambassador_ids(ctx),
        secret: ctx
            .topology
            .ingress()
            .tls_secret_name
            .clone()
            .unwrap_or_default(),
        hosts: vec![ctx.host().to_string()],
        secret_namespacing: Some(true),
    }
}

fn host_spec(ctx: &RenderContext<'_>) -> HostSpec {
    let settings = ctx.topology.ingress();
    HostSpec {
        ambassador_id: ambassador_ids(ctx),
        hostname: ctx.host().to_string(),
        tls_secret: settings
            .tls_secret_name
            .clone()
            .map(|name| LocalObjectRef { name }),
        tls_context: Some(LocalObjectRef {
            name: ctx.name(TLS_CONTEXT_SUFFIX),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ObjectGraph;
    use gerrit_router_core::{
        derive_routes, BackendKind, ClusterRef, IngressSettings, NetworkMember,
        NetworkMemberWithSsh, OperatorInfo, Topology,
    };

    fn settings(tls: bool, create_host: bool, ssh: bool) -> IngressSettings {
        IngressSettings {
            host: "example.com".to_string(),
            tls_enabled: tls,
            tls_secret_name: tls.then(|| "tls-secret".to_string()),
            ssh_enabled: ssh,
            backend_kind: BackendKind::Gateway,
            backend_specific_ids: vec!["my-id-1".to_string(), "my-id-2".to_string()],
            create_host,
            ..Default::default()
        }
    }

    fn topology(
        primary: bool,
        replica: bool,
        receiver: bool,
        ingress: IngressSettings,
    ) -> Topology {
        let gerrit = |name: &str| NetworkMemberWithSsh {
            name: name.to_string(),
            http_port: 8080,
            ssh_port: Some(29418),
        };
        Topology::new(
            ClusterRef {
                name: "gerrit".to_string(),
                namespace: "gerrit-operator".to_string(),
                uid: None,
            },
            primary.then(|| gerrit("gerrit")),
            replica.then(|| gerrit("gerrit-replica")),
            receiver.then(|| NetworkMember {
                name: "receiver".to_string(),
                http_port: 8080,
            }),
            ingress,
        )
        .unwrap()
    }

    fn compile(topology: &Topology) -> ObjectGraph {
        let routes = derive_routes(topology);
        GatewayBackend
            .compile(topology, &routes, &OperatorInfo::default())
            .unwrap()
    }

    fn mapping(graph: &ObjectGraph, name: &str) -> Mapping {
        serde_json::from_value(graph.get(name).unwrap().body.clone()).unwrap()
    }

    #[test]
    fn test_primary_only_single_mapping() {
        let graph = compile(&topology(true, false, false, settings(false, false, false)));
        assert_eq!(graph.names(), vec!["gerrit-gerrit-mapping".to_string()]);

        let mapping = mapping(&graph, "gerrit-gerrit-mapping");
        assert_eq!(mapping.spec.prefix, "/");
        assert_eq!(mapping.spec.service, "gerrit:8080");
        assert_eq!(mapping.spec.host.as_deref(), Some("example.com"));
        assert_eq!(mapping.spec.ambassador_id, vec!["my-id-1", "my-id-2"]);
        assert_eq!(mapping.spec.bypass_auth, Some(true));
        assert_eq!(mapping.spec.rewrite.as_deref(), Some(""));
        assert_eq!(mapping.spec.precedence, None);

        for absent in [
            "gerrit-gerrit-mapping-primary",
            "gerrit-gerrit-mapping-post-replica",
            "gerrit-gerrit-mapping-get-replica",
            "gerrit-gerrit-mapping-receiver-post",
            "gerrit-gerrit-tls-context",
            "gerrit-gerrit-ambassador-host",
            "gerrit-gerrit-tcp-mapping-primary",
        ] {
            assert!(graph.is_absent(absent), "{} should be absent", absent);
        }
    }

    #[test]
    fn test_split_mappings() {
        let graph = compile(&topology(true, true, false, settings(false, false, false)));
        assert_eq!(
            graph.names(),
            vec![
                "gerrit-gerrit-mapping-get-replica".to_string(),
                "gerrit-gerrit-mapping-post-replica".to_string(),
                "gerrit-gerrit-mapping-primary".to_string(),
            ]
        );
        assert!(graph.is_absent("gerrit-gerrit-mapping"));

        let post = mapping(&graph, "gerrit-gerrit-mapping-post-replica");
        assert_eq!(post.spec.prefix, "^/(.*)/git-upload-pack$");
        assert_eq!(post.spec.prefix_regex, Some(true));
        assert_eq!(post.spec.method.as_deref(), Some("POST"));
        assert_eq!(post.spec.service, "gerrit-replica:8080");

        let get = mapping(&graph, "gerrit-gerrit-mapping-get-replica");
        assert_eq!(get.spec.method.as_deref(), Some("GET"));
        assert_eq!(get.spec.query_parameters["service"], "git-upload-pack");

        let primary = mapping(&graph, "gerrit-gerrit-mapping-primary");
        assert_eq!(primary.spec.service, "gerrit:8080");

        // Earlier rules win
        assert!(post.spec.precedence > get.spec.precedence);
        assert!(get.spec.precedence.unwrap() > 0);
    }

    #[test]
    fn test_replica_and_receiver_mappings() {
        let graph = compile(&topology(false, true, true, settings(false, false, false)));
        assert_eq!(graph.len(), 4);
        assert!(graph.contains("gerrit-gerrit-mapping"));
        assert!(graph.is_absent("gerrit-gerrit-mapping-primary"));

        let catch_all = mapping(&graph, "gerrit-gerrit-mapping");
        assert_eq!(catch_all.spec.service, "gerrit-replica:8080");

        let post = mapping(&graph, "gerrit-gerrit-mapping-receiver-post");
        assert_eq!(post.spec.prefix, "^/(.*)/git-receive-pack$");
        assert_eq!(post.spec.method.as_deref(), Some("POST"));
        assert_eq!(post.spec.service, "receiver:8080");

        let get = mapping(&graph, "gerrit-gerrit-mapping-receiver-get");
        assert_eq!(get.spec.query_parameters["service"], "git-receive-pack");

        let projects = mapping(&graph, "gerrit-gerrit-mapping-receiver-projects");
        assert_eq!(projects.spec.prefix, "/a/projects");
        assert_eq!(projects.spec.prefix_regex, None);
    }

    #[test]
    fn test_tls_context_and_host() {
        let without_host = compile(&topology(true, false, false, settings(true, false, false)));
        assert!(without_host.contains("gerrit-gerrit-tls-context"));
        assert!(without_host.is_absent("gerrit-gerrit-ambassador-host"));

        let graph = compile(&topology(true, false, false, settings(true, true, false)));
        let context: TLSContext =
            serde_json::from_value(graph.get("gerrit-gerrit-tls-context").unwrap().body.clone())
                .unwrap();
        assert_eq!(context.spec.secret, "tls-secret");
        assert_eq!(context.spec.hosts, vec!["example.com"]);
        assert_eq!(context.spec.secret_namespacing, Some(true));

        let host: Host =
            serde_json::from_value(graph.get("gerrit-gerrit-ambassador-host").unwrap().body.clone())
                .unwrap();
        assert_eq!(host.spec.hostname, "example.com");
        assert_eq!(host.spec.tls_secret.unwrap().name, "tls-secret");
        assert_eq!(host.spec.tls_context.unwrap().name, "gerrit-gerrit-tls-context");
    }

    #[test]
    fn test_tcp_mappings() {
        let graph = compile(&topology(true, true, false, settings(false, false, true)));
        let primary: TCPMapping = serde_json::from_value(
            graph
                .get("gerrit-gerrit-tcp-mapping-primary")
                .unwrap()
                .body
                .clone(),
        )
        .unwrap();
        assert_eq!(primary.spec.port, 29418);
        assert_eq!(primary.spec.service, "gerrit:29418");
        assert!(graph.contains("gerrit-gerrit-tcp-mapping-replica"));
    }

    #[test]
    fn test_body_carries_type_meta() {
        let graph = compile(&topology(true, false, false, settings(false, false, false)));
        let body = &graph.get("gerrit-gerrit-mapping").unwrap().body;
        assert_eq!(body["apiVersion"], "getambassador.io/v2");
        assert_eq!(body["kind"], "Mapping");
        assert_eq!(body["metadata"]["namespace"], "gerrit-operator");
    }

    #[test]
    fn test_precedence_follows_rule_order() {
        let topology = topology(false, true, true, settings(false, false, false));
        let mut routes = derive_routes(&topology);
        routes.http.rotate_left(2);

        let graph = GatewayBackend
            .compile(&topology, &routes, &OperatorInfo::default())
            .unwrap();
        let precedence = |name: &str| mapping(&graph, name).spec.precedence;
        assert_eq!(precedence("gerrit-gerrit-mapping-receiver-post"), Some(4));
        assert_eq!(precedence("gerrit-gerrit-mapping-receiver-get"), Some(3));
        assert_eq!(precedence("gerrit-gerrit-mapping-receiver-projects"), Some(2));
        assert_eq!(precedence("gerrit-gerrit-mapping"), None);
    }
}
