//! The set of objects a backend wants to exist, and those it wants gone

use gerrit_router_api::{ambassador, istio};
use k8s_openapi::api::networking::v1::Ingress;
use kube::core::ApiResource;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Kind of a routing object emitted by an adapter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ObjectKind {
    Ingress,
    IstioGateway,
    VirtualService,
    DestinationRule,
    Mapping,
    TcpMapping,
    TlsContext,
    AmbassadorHost,
}

impl ObjectKind {
    /// Group, version, kind and plural of the object's API
    pub fn api_resource(&self) -> ApiResource {
        match self {
            ObjectKind::Ingress => ApiResource::erase::<Ingress>(&()),
            ObjectKind::IstioGateway => ApiResource::erase::<istio::Gateway>(&()),
            ObjectKind::VirtualService => ApiResource::erase::<istio::VirtualService>(&()),
            ObjectKind::DestinationRule => ApiResource::erase::<istio::DestinationRule>(&()),
            ObjectKind::Mapping => ApiResource::erase::<ambassador::Mapping>(&()),
            ObjectKind::TcpMapping => ApiResource::erase::<ambassador::TCPMapping>(&()),
            ObjectKind::TlsContext => ApiResource::erase::<ambassador::TLSContext>(&()),
            ObjectKind::AmbassadorHost => ApiResource::erase::<ambassador::Host>(&()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Ingress => "Ingress",
            ObjectKind::IstioGateway => "Gateway",
            ObjectKind::VirtualService => "VirtualService",
            ObjectKind::DestinationRule => "DestinationRule",
            ObjectKind::Mapping => "Mapping",
            ObjectKind::TcpMapping => "TCPMapping",
            ObjectKind::TlsContext => "TLSContext",
            ObjectKind::AmbassadorHost => "Host",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully rendered object, ready to be applied
#[derive(Clone, Debug, PartialEq)]
pub struct ManagedObject {
    pub kind: ObjectKind,
    pub name: String,
    /// Complete manifest including apiVersion, kind and metadata
    pub body: serde_json::Value,
}

/// Output of a backend: present objects keyed by name, plus the names of
/// gated-off objects that must not exist.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectGraph {
    present: BTreeMap<String, ManagedObject>,
    absent: BTreeMap<String, ObjectKind>,
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, object: ManagedObject) {
        self.absent.remove(&object.name);
        self.present.insert(object.name.clone(), object);
    }

    pub fn mark_absent(&mut self, name: String, kind: ObjectKind) {
        if !self.present.contains_key(&name) {
            self.absent.insert(name, kind);
        }
    }

    pub fn get(&self, name: &str) -> Option<&ManagedObject> {
        self.present.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.present.contains_key(name)
    }

    pub fn is_absent(&self, name: &str) -> bool {
        self.absent.contains_key(name)
    }

    /// Present objects in name order
    pub fn objects(&self) -> impl Iterator<Item = &ManagedObject> {
        self.present.values()
    }

    /// Gated-off objects in name order
    pub fn absent(&self) -> impl Iterator<Item = (&str, ObjectKind)> {
        self.absent.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    pub fn names(&self) -> Vec<String> {
        self.present.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.present.len()
    }

    pub fn is_empty(&self) -> bool {
        self.present.is_empty()
    }
}
