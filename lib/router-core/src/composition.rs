//! Classification of which members a cluster is composed of

use std::fmt;

/// The legal combinations of primary, replica and receiver
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Composition {
    /// Only a receiver; there is no Git object server behind HTTP
    ReceiverOnly,
    /// A replica serving reads and a receiver accepting pushes
    ReplicaAndReceiver,
    /// A single primary handles everything
    PrimaryOnly,
    /// A single replica handles everything
    ReplicaOnly,
    /// Reads are split off to the replica, everything else goes to the primary
    PrimaryAndReplica,
}

impl Composition {
    /// Classify from presence flags. Returns `None` for compositions that
    /// admission rejects (primary with receiver, or no member at all).
    pub fn from_presence(has_primary: bool, has_replica: bool, has_receiver: bool) -> Option<Self> {
        match (has_primary, has_replica, has_receiver) {
            (false, false, true) => Some(Composition::ReceiverOnly),
            (false, true, true) => Some(Composition::ReplicaAndReceiver),
            (true, false, false) => Some(Composition::PrimaryOnly),
            (false, true, false) => Some(Composition::ReplicaOnly),
            (true, true, false) => Some(Composition::PrimaryAndReplica),
            (true, _, true) | (false, false, false) => None,
        }
    }

    /// Exactly one Gerrit serves all Git-over-HTTP traffic
    pub fn is_single_gerrit(&self) -> bool {
        matches!(
            self,
            Composition::PrimaryOnly | Composition::ReplicaOnly | Composition::ReplicaAndReceiver
        )
    }

    /// Read traffic must be split off from the primary
    pub fn is_split(&self) -> bool {
        matches!(self, Composition::PrimaryAndReplica)
    }

    pub fn has_receiver(&self) -> bool {
        matches!(
            self,
            Composition::ReceiverOnly | Composition::ReplicaAndReceiver
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Composition::ReceiverOnly => "ReceiverOnly",
            Composition::ReplicaAndReceiver => "ReplicaAndReceiver",
            Composition::PrimaryOnly => "PrimaryOnly",
            Composition::ReplicaOnly => "ReplicaOnly",
            Composition::PrimaryAndReplica => "PrimaryAndReplica",
        }
    }
}

impl fmt::Display for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
