use gerrit_router_core::CoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReconcileError>;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Routing error: {0}")]
    Core(#[from] CoreError),

    #[error("Kubernetes API error: {0}")]
    KubeApi(#[from] kube::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReconcileError {
    /// Topology errors do not heal by retrying; the resource must change
    pub fn is_invalid_topology(&self) -> bool {
        matches!(self, Self::Core(CoreError::InvariantViolation(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_topology_classification() {
        let err = ReconcileError::from(CoreError::invariant("no members"));
        assert!(err.is_invalid_topology());
        assert_eq!(err.to_string(), "Routing error: Invalid topology: no members");

        let err = ReconcileError::from(CoreError::MissingRule("primary-default".to_string()));
        assert!(!err.is_invalid_topology());
    }
}
