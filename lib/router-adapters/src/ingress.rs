//! Path-based ingress for the ingress-nginx controller
//!
//! An Ingress cannot match on method or query parameters. Methods are
//! dropped: the Git paths are only ever requested with the expected method.
//! Rules that need the `service` query parameter are expressed as a
//! configuration snippet that rewrites the upstream instead. SSH cannot be
//! exposed through an Ingress at all, so TCP routes are ignored.

use crate::backend::{Backend, RenderContext, Slot};
use crate::gates::Gate;
use crate::object_graph::ObjectKind;
use gerrit_router_core::{PathMatch, Result, RoutingRule};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend as K8sIngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

pub const INGRESS_SUFFIX: &str = "gerrit-ingress";
pub const SESSION_COOKIE_NAME: &str = "Gerrit_Session";

const SNIPPET_ANNOTATION: &str = "nginx.ingress.kubernetes.io/configuration-snippet";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngressComponent {
    Ingress,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngressBackend;

impl Backend for IngressBackend {
    type Component = IngressComponent;

    fn name(&self) -> &'static str {
        "ingress-adapter"
    }

    fn catalogue(&self) -> Vec<Slot<IngressComponent>> {
        vec![Slot::new(
            IngressComponent::Ingress,
            INGRESS_SUFFIX,
            ObjectKind::Ingress,
            Gate::Always,
        )]
    }

    fn render(
        &self,
        component: IngressComponent,
        mut metadata: ObjectMeta,
        ctx: &RenderContext<'_>,
    ) -> Result<serde_json::Value> {
        match component {
            IngressComponent::Ingress => {
                metadata.annotations = Some(annotations(ctx));
                let ingress = Ingress {
                    metadata,
                    spec: Some(spec(ctx)),
                    ..Default::default()
                };
                Ok(serde_json::to_value(&ingress)?)
            }
        }
    }
}

fn spec(ctx: &RenderContext<'_>) -> IngressSpec {
    let paths = ctx
        .routes
        .ordered_http()
        .into_iter()
        .filter(|rule| rule.matcher.query.is_none())
        .map(ingress_path)
        .collect();

    let settings = ctx.topology.ingress();
    let tls = settings.tls_enabled.then(|| {
        vec![IngressTLS {
            hosts: Some(vec![settings.host.clone()]),
            secret_name: settings.tls_secret_name.clone(),
        }]
    });

    IngressSpec {
        rules: Some(vec![IngressRule {
            host: Some(settings.host.clone()),
            http: Some(HTTPIngressRuleValue { paths }),
        }]),
        tls,
        ..Default::default()
    }
}

fn ingress_path(rule: &RoutingRule) -> HTTPIngressPath {
    let (path, path_type) = match &rule.matcher.path {
        Some(PathMatch::Regex(pattern)) => (pattern.clone(), "ImplementationSpecific"),
        Some(PathMatch::Prefix(prefix)) => (prefix.clone(), "Prefix"),
        None => ("/".to_string(), "Prefix"),
    };

    HTTPIngressPath {
        path: Some(path),
        path_type: path_type.to_string(),
        backend: K8sIngressBackend {
            service: Some(IngressServiceBackend {
                name: rule.destination.service_name().to_string(),
                port: Some(ServiceBackendPort {
                    number: Some(i32::from(rule.destination.port())),
                    ..Default::default()
                }),
            }),
            ..Default::default()
        },
    }
}

fn annotations(ctx: &RenderContext<'_>) -> BTreeMap<String, String> {
    let mut annotations = ctx.topology.ingress().annotations.clone();

    let fixed = [
        ("nginx.ingress.kubernetes.io/use-regex", "true"),
        ("kubernetes.io/ingress.class", "nginx"),
        ("nginx.ingress.kubernetes.io/affinity", "cookie"),
        ("nginx.ingress.kubernetes.io/session-cookie-name", SESSION_COOKIE_NAME),
        ("nginx.ingress.kubernetes.io/session-cookie-path", "/"),
        ("nginx.ingress.kubernetes.io/session-cookie-max-age", "60"),
        ("nginx.ingress.kubernetes.io/session-cookie-expires", "60"),
    ];
    for (key, value) in fixed {
        annotations.insert(key.to_string(), value.to_string());
    }

    let snippet = configuration_snippet(ctx);
    if snippet.is_empty() {
        annotations.remove(SNIPPET_ANNOTATION);
    } else {
        annotations.insert(SNIPPET_ANNOTATION.to_string(), snippet);
    }

    annotations
}

/// Reroute requests by their `service` query parameter. ingress-nginx names
/// upstreams `<namespace>-<service>-<port>`.
fn configuration_snippet(ctx: &RenderContext<'_>) -> String {
    ctx.routes
        .ordered_http()
        .into_iter()
        .filter_map(|rule| {
            let query = rule.matcher.query.as_ref()?;
            let service = rule.destination.service_name();
            Some(format!(
                "if ($args ~ {}={}){{\n  set $proxy_upstream_name \"{}-{}-{}\";\n  set $proxy_host $proxy_upstream_name;\n  set $service_name \"{}\";\n}}",
                query.key,
                query.value,
                ctx.namespace(),
                service,
                rule.destination.port(),
                service
            ))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
