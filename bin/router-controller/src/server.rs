//! Metrics and health endpoints

use crate::metrics::ControllerMetrics;
use anyhow::Result;
use http_body_util::Full;
use hyper::{
    body::Bytes,
    header::{HeaderValue, CONTENT_TYPE},
    server::conn::http1,
    service::service_fn,
    Method, Request, Response, StatusCode,
};
use hyper_util::rt::tokio::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

pub async fn serve(addr: SocketAddr, metrics: Arc<ControllerMetrics>) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Serving metrics on {}", addr);

    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| handle_request(req, metrics.clone()));

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!("Error serving connection from {}: {}", peer_addr, e);
            }
        });
    }
}

async fn handle_request<B>(
    req: Request<B>,
    metrics: Arc<ControllerMetrics>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path();

    if path == "/metrics" && req.method() == Method::GET {
        let text = metrics.gather().unwrap_or_else(|e| {
            warn!("Failed to gather metrics: {}", e);
            "Failed to gather metrics\n".to_string()
        });
        let mut response = Response::new(Full::new(Bytes::from(text)));
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; version=0.0.4"),
        );
        return Ok(response);
    }

    if path == "/healthz" {
        return Ok(Response::new(Full::new(Bytes::from("OK\n"))));
    }

    let mut response = Response::new(Full::new(Bytes::from("Not Found\n")));
    *response.status_mut() = StatusCode::NOT_FOUND;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn get(path: &str, metrics: Arc<ControllerMetrics>) -> (StatusCode, String) {
        let req = Request::builder().uri(path).body(()).unwrap();
        let response = handle_request(req, metrics).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_healthz() {
        let metrics = Arc::new(ControllerMetrics::new().unwrap());
        let (status, body) = get("/healthz", metrics).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK\n");
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let metrics = Arc::new(ControllerMetrics::new().unwrap());
        metrics.record_reconcile("success");
        let (status, body) = get("/metrics", metrics).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("gerrit_router_reconciliations_total"));
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let metrics = Arc::new(ControllerMetrics::new().unwrap());
        let (status, _) = get("/nope", metrics).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
