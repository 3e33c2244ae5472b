//! Bindings to the Emissary (Ambassador) getambassador.io/v2 CRDs

pub mod host;
pub mod mapping;
pub mod tcp_mapping;
pub mod tls_context;

pub use host::{Host, HostSpec, LocalObjectRef};
pub use mapping::{Mapping, MappingSpec};
pub use tcp_mapping::{TCPMapping, TCPMappingSpec};
pub use tls_context::{TLSContext, TLSContextSpec};
