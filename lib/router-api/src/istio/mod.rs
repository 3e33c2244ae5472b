/// Bindings to the Istio networking CRDs
///
/// Only the fields needed to expose a Gerrit cluster through the Istio
/// ingress gateway are modelled; unknown fields are left to the defaults
/// of the Istio control plane.

pub mod destination_rule;
pub mod gateway;
pub mod virtual_service;

pub use destination_rule::{
    ConsistentHashLb, DestinationRule, DestinationRuleSpec, HttpCookie, LoadBalancerSettings,
    SimpleLb, TrafficPolicy,
};
pub use gateway::{Gateway, GatewaySpec, Server, ServerPort, ServerTlsMode, ServerTlsSettings};
pub use virtual_service::{
    Destination, HttpMatchRequest, HttpRoute, HttpRouteDestination, L4MatchAttributes,
    PortSelector, RouteDestination, StringMatch, TcpRoute, VirtualService, VirtualServiceSpec,
};
