//! Gerrit router API types and CRDs for Kubernetes integration
//!
//! This library defines:
//! - GerritNetwork: the network-relevant members of a Gerrit cluster
//! - Bindings to the Istio networking CRDs (Gateway, VirtualService, DestinationRule)
//! - Bindings to the Emissary CRDs (Mapping, TCPMapping, TLSContext, Host)

pub mod ambassador;
pub mod istio;
pub mod v1alpha2;

pub use v1alpha2::{GerritNetwork, GerritNetworkSpec, GerritNetworkStatus};
