//! Recommended Kubernetes labels for emitted objects

use std::collections::BTreeMap;

pub const APP_NAME: &str = "gerrit";

/// Identity written into the `managed-by` and `version` labels
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperatorInfo {
    pub name: String,
    pub version: String,
}

impl Default for OperatorInfo {
    fn default() -> Self {
        Self {
            name: "gerrit-operator".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Labels that identify the objects of one component of a cluster
pub fn selector_labels(
    operator: &OperatorInfo,
    instance: &str,
    component: &str,
) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("app.kubernetes.io/name".to_string(), APP_NAME.to_string());
    labels.insert("app.kubernetes.io/instance".to_string(), instance.to_string());
    labels.insert(
        "app.kubernetes.io/component".to_string(),
        component.to_string(),
    );
    labels.insert("app.kubernetes.io/part-of".to_string(), instance.to_string());
    labels.insert(
        "app.kubernetes.io/managed-by".to_string(),
        operator.name.clone(),
    );
    labels
}

/// Full label set: selector labels plus version and creator
pub fn labels(
    operator: &OperatorInfo,
    instance: &str,
    component: &str,
    created_by: &str,
) -> BTreeMap<String, String> {
    let mut labels = selector_labels(operator, instance, component);
    labels.insert(
        "app.kubernetes.io/version".to_string(),
        operator.version.clone(),
    );
    labels.insert(
        "app.kubernetes.io/created-by".to_string(),
        created_by.to_string(),
    );
    labels
}
