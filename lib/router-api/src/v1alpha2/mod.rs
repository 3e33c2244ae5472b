/// API version v1alpha2 for the Gerrit network resource

pub mod gerrit_network;
pub mod ingress_config;

pub use gerrit_network::{
    GerritNetwork, GerritNetworkSpec, GerritNetworkStatus, NetworkCondition, NetworkMember,
    NetworkMemberWithSsh,
};
pub use ingress_config::{
    GerritClusterIngressConfig, GerritIngressAmbassadorConfig, GerritIngressSshConfig,
    GerritIngressTlsConfig,
};

