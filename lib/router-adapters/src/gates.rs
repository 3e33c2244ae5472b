//! Predicates deciding whether an object slot should exist

use gerrit_router_core::{Role, Topology};

/// Precondition attached to every object slot of a backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Gate {
    Always,
    /// Exactly one Gerrit takes all Gerrit traffic, no read split
    SingleGerrit,
    /// Reads are split between primary and replica
    Split,
    Receiver,
    /// The member playing this role is present
    Member(Role),
    TlsEnabled,
    /// TLS is enabled and the adapter registers the host itself
    ManagedHost,
    /// SSH is enabled and the member exposes an SSH port
    Ssh(Role),
}

impl Gate {
    pub fn admits(&self, topology: &Topology) -> bool {
        let ingress = topology.ingress();
        match self {
            Gate::Always => true,
            Gate::SingleGerrit => topology.composition().is_single_gerrit(),
            Gate::Split => topology.composition().is_split(),
            Gate::Receiver => topology.has_receiver(),
            Gate::Member(Role::Receiver) => topology.has_receiver(),
            Gate::Member(role) => topology.gerrit(*role).is_some(),
            Gate::TlsEnabled => ingress.tls_enabled,
            Gate::ManagedHost => ingress.tls_enabled && ingress.create_host,
            Gate::Ssh(role) => {
                ingress.ssh_enabled
                    && topology
                        .gerrit(*role)
                        .and_then(|member| member.ssh_port)
                        .is_some()
            }
        }
    }
}
