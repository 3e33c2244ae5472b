//! Istio ingress gateway, virtual service and per-member traffic policies
//!
//! Istio evaluates the `http` routes of a VirtualService in order and the
//! first match wins, so rules are emitted sorted by `order`.

use crate::backend::{Backend, RenderContext, Slot};
use crate::gates::Gate;
use crate::object_graph::ObjectKind;
use gerrit_router_api::istio::{
    self, ConsistentHashLb, DestinationRule, DestinationRuleSpec, Gateway, GatewaySpec,
    HttpCookie, HttpMatchRequest, HttpRoute, HttpRouteDestination, L4MatchAttributes,
    LoadBalancerSettings, PortSelector, RouteDestination, Server, ServerPort, ServerTlsMode,
    ServerTlsSettings, SimpleLb, StringMatch, TrafficPolicy, VirtualService, VirtualServiceSpec,
};
use gerrit_router_core::rules::TcpRoute;
use gerrit_router_core::topology::service_hostname;
use gerrit_router_core::{Matcher, PathMatch, Result, Role, RoutingRule};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

pub const GATEWAY_SUFFIX: &str = "gerrit-istio-gateway";
pub const VIRTUAL_SERVICE_SUFFIX: &str = "gerrit-http-virtual-service";
pub const PRIMARY_DESTINATION_RULE_SUFFIX: &str = "gerrit-primary-destination-rule";
pub const REPLICA_DESTINATION_RULE_SUFFIX: &str = "gerrit-replica-destination-rule";

pub const SESSION_COOKIE_NAME: &str = "Gerrit_Session";
pub const SESSION_COOKIE_TTL: &str = "60s";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshComponent {
    Gateway,
    VirtualService,
    DestinationRule(Role),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshBackend;

impl Backend for MeshBackend {
    type Component = MeshComponent;

    fn name(&self) -> &'static str {
        "mesh-adapter"
    }

    fn catalogue(&self) -> Vec<Slot<MeshComponent>> {
        vec![
            Slot::new(
                MeshComponent::Gateway,
                GATEWAY_SUFFIX,
                ObjectKind::IstioGateway,
                Gate::Always,
            ),
            Slot::new(
                MeshComponent::VirtualService,
                VIRTUAL_SERVICE_SUFFIX,
                ObjectKind::VirtualService,
                Gate::Always,
            ),
            Slot::new(
                MeshComponent::DestinationRule(Role::Primary),
                PRIMARY_DESTINATION_RULE_SUFFIX,
                ObjectKind::DestinationRule,
                Gate::Member(Role::Primary),
            ),
            Slot::new(
                MeshComponent::DestinationRule(Role::Replica),
                REPLICA_DESTINATION_RULE_SUFFIX,
                ObjectKind::DestinationRule,
                Gate::Member(Role::Replica),
            ),
        ]
    }

    fn render(
        &self,
        component: MeshComponent,
        metadata: ObjectMeta,
        ctx: &RenderContext<'_>,
    ) -> Result<serde_json::Value> {
        let value = match component {
            MeshComponent::Gateway => serde_json::to_value(Gateway {
                metadata,
                spec: gateway_spec(ctx),
            })?,
            MeshComponent::VirtualService => serde_json::to_value(VirtualService {
                metadata,
                spec: virtual_service_spec(ctx),
            })?,
            MeshComponent::DestinationRule(role) => serde_json::to_value(DestinationRule {
                metadata,
                spec: destination_rule_spec(ctx, role),
            })?,
        };
        Ok(value)
    }
}

fn gateway_spec(ctx: &RenderContext<'_>) -> GatewaySpec {
    let settings = ctx.topology.ingress();
    let hosts = vec![settings.host.clone()];

    let mut servers = vec![Server {
        port: ServerPort {
            number: 80,
            protocol: "HTTP".to_string(),
            name: "http".to_string(),
        },
        hosts: hosts.clone(),
        tls: Some(ServerTlsSettings {
            https_redirect: Some(settings.tls_enabled),
            ..Default::default()
        }),
    }];

    if settings.tls_enabled {
        servers.push(Server {
            port: ServerPort {
                number: 443,
                protocol: "HTTPS".to_string(),
                name: "https".to_string(),
            },
            hosts: hosts.clone(),
            tls: Some(ServerTlsSettings {
                mode: Some(ServerTlsMode::Simple),
                credential_name: settings.tls_secret_name.clone(),
                ..Default::default()
            }),
        });
    }

    servers.extend(ctx.routes.tcp.iter().map(|route| Server {
        port: ServerPort {
            number: route.port,
            protocol: "TCP".to_string(),
            name: route.name(),
        },
        hosts: hosts.clone(),
        tls: None,
    }));

    let mut selector = BTreeMap::new();
    selector.insert("istio".to_string(), "ingressgateway".to_string());

    GatewaySpec { selector, servers }
}

fn virtual_service_spec(ctx: &RenderContext<'_>) -> VirtualServiceSpec {
    let namespace = ctx.namespace();
    VirtualServiceSpec {
        hosts: vec![ctx.host().to_string()],
        gateways: vec![format!("{}/{}", namespace, ctx.name(GATEWAY_SUFFIX))],
        http: ctx
            .routes
            .ordered_http()
            .into_iter()
            .map(|rule| http_route(rule, namespace))
            .collect(),
        tcp: ctx
            .routes
            .tcp
            .iter()
            .map(|route| tcp_route(route, namespace))
            .collect(),
    }
}

fn http_route(rule: &RoutingRule, namespace: &str) -> HttpRoute {
    HttpRoute {
        name: Some(rule.name().to_string()),
        r#match: http_match(&rule.matcher).into_iter().collect(),
        route: vec![HttpRouteDestination {
            destination: destination(&rule.destination.hostname(namespace), rule.destination.port()),
            weight: None,
        }],
    }
}

/// `None` for the catch-all: a route without match conditions matches everything
fn http_match(matcher: &Matcher) -> Option<HttpMatchRequest> {
    if matcher.is_catch_all() {
        return None;
    }

    let uri = matcher.path.as_ref().map(|path| match path {
        PathMatch::Prefix(prefix) => StringMatch::prefix(prefix.as_str()),
        PathMatch::Regex(pattern) => StringMatch::regex(pattern.as_str()),
    });
    let method = matcher
        .method
        .as_ref()
        .map(|method| StringMatch::exact(method.to_ascii_uppercase()));
    let query_params = matcher
        .query
        .iter()
        .map(|query| (query.key.clone(), StringMatch::exact(query.value.as_str())))
        .collect();

    Some(HttpMatchRequest {
        uri,
        method,
        query_params,
        ignore_uri_case: None,
    })
}

fn tcp_route(route: &TcpRoute, namespace: &str) -> istio::TcpRoute {
    istio::TcpRoute {
        r#match: vec![L4MatchAttributes {
            port: Some(route.port),
        }],
        route: vec![RouteDestination {
            destination: destination(&route.destination.hostname(namespace), route.port),
            weight: None,
        }],
    }
}

fn destination(host: &str, port: u16) -> istio::Destination {
    istio::Destination {
        host: host.to_string(),
        port: Some(PortSelector { number: port }),
        subset: None,
    }
}

/// The primary keeps sessions sticky; the replica balances by open connections
fn destination_rule_spec(ctx: &RenderContext<'_>, role: Role) -> DestinationRuleSpec {
    let host = ctx
        .topology
        .gerrit(role)
        .map(|member| service_hostname(&member.name, ctx.namespace()))
        .unwrap_or_default();

    let load_balancer = match role {
        Role::Replica => LoadBalancerSettings {
            simple: Some(SimpleLb::LeastConn),
            ..Default::default()
        },
        Role::Primary | Role::Receiver => LoadBalancerSettings {
            consistent_hash: Some(ConsistentHashLb {
                http_cookie: Some(HttpCookie {
                    name: SESSION_COOKIE_NAME.to_string(),
                    path: None,
                    ttl: SESSION_COOKIE_TTL.to_string(),
                }),
                ..Default::default()
            }),
            ..Default::default()
        },
    };

    DestinationRuleSpec {
        host,
        traffic_policy: Some(TrafficPolicy {
            load_balancer: Some(load_balancer),
        }),
    }
}
