//! Renders the routing objects of a GerritNetwork manifest without a cluster

use anyhow::{bail, Context, Result};
use gerrit_router_adapters::{resolve, ObjectGraph};
use gerrit_router_api::GerritNetwork;
use gerrit_router_core::{derive_routes, BackendKind, HttpRequest, OperatorInfo, RouteTable, Topology};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const INGRESS_TYPE_VAR: &str = "GERRIT_ROUTER_INGRESS_TYPE";

const USAGE: &str = "\
gerrit-router-render - Print the routing objects of a GerritNetwork

USAGE:
    gerrit-router-render <MANIFEST> [OPTIONS]

OPTIONS:
    --backend <KIND>      INGRESS, ISTIO or AMBASSADOR [default: $GERRIT_ROUTER_INGRESS_TYPE or INGRESS]
    --probe <REQUEST>     Show where \"METHOD /path?query\" is routed; repeatable
    -h, --help            Print help information";

#[derive(Debug, PartialEq, Eq)]
struct Args {
    manifest: PathBuf,
    backend: BackendKind,
    probes: Vec<HttpRequest>,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Render(Args),
    Help,
}

impl Args {
    fn parse<I>(args: I, default_backend: Option<String>) -> Result<Command>
    where
        I: IntoIterator<Item = String>,
    {
        let mut manifest = None;
        let mut backend = match default_backend.filter(|kind| !kind.trim().is_empty()) {
            Some(kind) => kind.parse()?,
            None => BackendKind::Ingress,
        };
        let mut probes = Vec::new();

        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--backend" => {
                    let kind = iter.next().context("--backend needs a value")?;
                    backend = kind.parse()?;
                }
                "--probe" => {
                    let line = iter.next().context("--probe needs a value")?;
                    let request = HttpRequest::parse(&line)
                        .with_context(|| format!("Malformed probe: {}", line))?;
                    probes.push(request);
                }
                "--help" | "-h" => return Ok(Command::Help),
                other if other.starts_with('-') => bail!("Unknown argument: {}", other),
                path => {
                    if manifest.is_some() {
                        bail!("Only one manifest may be given");
                    }
                    manifest = Some(PathBuf::from(path));
                }
            }
        }

        Ok(Command::Render(Args {
            manifest: manifest.context("Missing manifest path")?,
            backend,
            probes,
        }))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::parse(std::env::args().skip(1), std::env::var(INGRESS_TYPE_VAR).ok()) {
        Ok(Command::Render(args)) => args,
        Ok(Command::Help) => {
            println!("{}", USAGE);
            return Ok(());
        }
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            std::process::exit(1);
        }
    };

    let manifest = std::fs::read_to_string(&args.manifest)
        .with_context(|| format!("Failed to read {}", args.manifest.display()))?;
    let network: GerritNetwork = serde_yaml::from_str(&manifest)
        .with_context(|| format!("Failed to parse {}", args.manifest.display()))?;
    let topology = Topology::from_network(&network, args.backend)?;
    debug!("Rendering {} for {}", topology.composition(), args.backend);

    let graph = resolve(&topology, &OperatorInfo::default())?;
    print!("{}", render_graph(&graph)?);

    for request in &args.probes {
        println!("{}", probe(&topology, request)?);
    }

    Ok(())
}

/// Present objects as a multi-document YAML stream, gated-out names as comments
fn render_graph(graph: &ObjectGraph) -> Result<String> {
    let mut documents = Vec::new();
    for object in graph.objects() {
        documents.push(serde_yaml::to_string(&object.body)?);
    }
    let mut out = documents.join("---\n");
    for (name, kind) in graph.absent() {
        out.push_str(&format!("# absent: {} {}\n", kind, name));
    }
    Ok(out)
}

fn probe(topology: &Topology, request: &HttpRequest) -> Result<String> {
    let routes = derive_routes(topology);
    let table = RouteTable::new(&routes)?;
    let target = match &request.query {
        Some(query) => format!("{}?{}", request.path, query),
        None => request.path.clone(),
    };
    Ok(match table.resolve(request) {
        Some(rule) => format!(
            "# {} {} -> {} ({}) via {}",
            request.method,
            target,
            rule.destination.role,
            rule.destination.upstream(),
            rule.id
        ),
        None => format!("# {} {} -> no route", request.method, target),
    })
}
