//! Reconciles GerritNetwork resources into gateway routing objects

use crate::config::ControllerConfig;
use crate::error::{ReconcileError, Result};
use crate::metrics::ControllerMetrics;
use chrono::Utc;
use futures::StreamExt;
use gerrit_router_adapters::{resolve, ManagedObject, ObjectGraph, ObjectKind};
use gerrit_router_api::v1alpha2::NetworkCondition;
use gerrit_router_api::{GerritNetwork, GerritNetworkStatus};
use gerrit_router_core::{OperatorInfo, Topology};
use kube::api::{DeleteParams, DynamicObject, Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use kube_runtime::{controller::Action, watcher, Controller};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const FIELD_MANAGER: &str = "gerrit-router-controller";
pub const READY_CONDITION: &str = "Ready";

pub struct ContextData {
    pub client: Client,
    pub config: ControllerConfig,
    pub metrics: Arc<ControllerMetrics>,
    pub operator: OperatorInfo,
}

pub type Context = Arc<ContextData>;

impl ContextData {
    pub fn new(client: Client, config: ControllerConfig, metrics: Arc<ControllerMetrics>) -> Self {
        Self {
            client,
            config,
            metrics,
            operator: OperatorInfo::default(),
        }
    }
}

pub async fn run(ctx: ContextData) -> anyhow::Result<()> {
    let networks: Api<GerritNetwork> = match &ctx.config.watch_namespace {
        Some(namespace) => Api::namespaced(ctx.client.clone(), namespace),
        None => Api::all(ctx.client.clone()),
    };

    info!(
        "Starting GerritNetwork reconciliation for backend {} in {}",
        ctx.config.backend_kind,
        ctx.config.watch_namespace.as_deref().unwrap_or("all namespaces")
    );

    let mut stream = Controller::new(networks, watcher::Config::default())
        .run(reconcile, error_policy, Arc::new(ctx))
        .boxed();

    while let Some(item) = stream.next().await {
        match item {
            Ok((object, _)) => debug!("Reconciled GerritNetwork {}", object.name),
            Err(e) => error!("Error in reconciliation stream: {}", e),
        }
    }

    Ok(())
}

pub async fn reconcile(network: Arc<GerritNetwork>, ctx: Context) -> Result<Action> {
    let _timer = ctx.metrics.reconcile_duration_seconds.start_timer();
    let namespace = network.namespace().unwrap_or_else(|| "default".to_string());
    let name = network.name_any();

    info!("Reconciling GerritNetwork {}/{}", namespace, name);

    let networks: Api<GerritNetwork> = Api::namespaced(ctx.client.clone(), &namespace);
    let previous = network.status.clone().unwrap_or_default();

    let topology = match Topology::from_network(&network, ctx.config.backend_kind) {
        Ok(topology) => topology,
        Err(err) => {
            let err = ReconcileError::from(err);
            if !err.is_invalid_topology() {
                return Err(err);
            }
            warn!("GerritNetwork {}/{} is invalid: {}", namespace, name, err);
            let status = invalid_status(&previous, &err.to_string(), &now());
            patch_status(&networks, &name, &status).await?;
            ctx.metrics.record_reconcile("invalid");
            return Ok(Action::await_change());
        }
    };

    let graph = resolve(&topology, &ctx.operator)?;

    for object in graph.objects() {
        apply_object(&ctx, &namespace, object).await?;
    }
    for (object_name, kind) in graph.absent() {
        delete_object(&ctx, &namespace, object_name, kind).await?;
    }

    let status = ready_status(&previous, &topology, &graph, &now());
    patch_status(&networks, &name, &status).await?;
    ctx.metrics.record_reconcile("success");

    Ok(Action::requeue(ctx.config.requeue))
}

pub fn error_policy(network: Arc<GerritNetwork>, error: &ReconcileError, ctx: Context) -> Action {
    warn!("Failed to reconcile GerritNetwork {}: {}", network.name_any(), error);
    ctx.metrics.record_reconcile("error");
    Action::requeue(ctx.config.error_requeue)
}

async fn apply_object(ctx: &ContextData, namespace: &str, object: &ManagedObject) -> Result<()> {
    let api: Api<DynamicObject> =
        Api::namespaced_with(ctx.client.clone(), namespace, &object.kind.api_resource());
    api.patch(
        &object.name,
        &PatchParams::apply(FIELD_MANAGER).force(),
        &Patch::Apply(&object.body),
    )
    .await?;
    debug!("Applied {} {}/{}", object.kind, namespace, object.name);
    ctx.metrics.record_applied(object.kind.as_str());
    Ok(())
}

async fn delete_object(
    ctx: &ContextData,
    namespace: &str,
    name: &str,
    kind: ObjectKind,
) -> Result<()> {
    let api: Api<DynamicObject> =
        Api::namespaced_with(ctx.client.clone(), namespace, &kind.api_resource());
    match api.delete(name, &DeleteParams::default()).await {
        Ok(_) => {
            info!("Deleted {} {}/{}", kind, namespace, name);
            ctx.metrics.record_deleted(kind.as_str());
            Ok(())
        }
        // Never created, or its CRD is not installed
        Err(kube::Error::Api(response)) if response.code == 404 => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn patch_status(
    networks: &Api<GerritNetwork>,
    name: &str,
    status: &GerritNetworkStatus,
) -> Result<()> {
    let status_patch = serde_json::json!({ "status": serde_json::to_value(status)? });
    networks
        .patch_status(
            name,
            &PatchParams::apply(FIELD_MANAGER),
            &Patch::Merge(&status_patch),
        )
        .await?;
    Ok(())
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn ready_status(
    previous: &GerritNetworkStatus,
    topology: &Topology,
    graph: &ObjectGraph,
    now: &str,
) -> GerritNetworkStatus {
    let message = format!("{} routing objects applied", graph.len());
    GerritNetworkStatus {
        ready: true,
        composition: Some(topology.composition().to_string()),
        backend: Some(topology.ingress().backend_kind.to_string()),
        managed_objects: graph.names(),
        last_update_time: Some(now.to_string()),
        conditions: vec![ready_condition(
            &previous.conditions,
            true,
            "RoutesApplied",
            message,
            now,
        )],
    }
}

fn invalid_status(previous: &GerritNetworkStatus, message: &str, now: &str) -> GerritNetworkStatus {
    GerritNetworkStatus {
        ready: false,
        composition: None,
        backend: None,
        managed_objects: previous.managed_objects.clone(),
        last_update_time: Some(now.to_string()),
        conditions: vec![ready_condition(
            &previous.conditions,
            false,
            "InvalidTopology",
            message.to_string(),
            now,
        )],
    }
}

/// The transition time only moves when the condition flips
fn ready_condition(
    previous: &[NetworkCondition],
    ready: bool,
    reason: &str,
    message: String,
    now: &str,
) -> NetworkCondition {
    let status = if ready { "True" } else { "False" };
    let last_transition_time = previous
        .iter()
        .find(|c| c.condition_type == READY_CONDITION && c.status == status)
        .and_then(|c| c.last_transition_time.clone())
        .unwrap_or_else(|| now.to_string());

    NetworkCondition {
        condition_type: READY_CONDITION.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message),
        last_transition_time: Some(last_transition_time),
    }
}
