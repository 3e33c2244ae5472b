//! Topology resolution and routing rule derivation for Gerrit clusters
//!
//! This library provides:
//! - Classification of a cluster's composition (primary, replica, receiver)
//! - Derivation of ordered Git smart HTTP routing rules and SSH routes
//! - Evaluation of those rules against requests
//! - Common labels for emitted objects

pub mod composition;
pub mod error;
pub mod labels;
pub mod matching;
pub mod rules;
pub mod topology;

pub use composition::Composition;
pub use error::{CoreError, Result};
pub use labels::OperatorInfo;
pub use matching::{HttpRequest, RouteTable};
pub use rules::{derive_routes, Matcher, PathMatch, RouteSet, RoutingRule, RuleId, TcpRoute};
pub use topology::{
    BackendKind, ClusterRef, Destination, IngressSettings, NetworkMember, NetworkMemberWithSsh,
    Role, Topology,
};
