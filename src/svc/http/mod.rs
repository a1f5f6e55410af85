//! # HTTP module
//!
//! This module expose the operator's health and metrics endpoints over HTTP

use std::time::Instant;

use hyper::{
    header::{self, HeaderValue},
    Body, Method, Request, Response, StatusCode,
};
#[cfg(feature = "metrics")]
use once_cell::sync::Lazy;
#[cfg(feature = "metrics")]
use prometheus::{opts, register_counter_vec, CounterVec};
use tracing::{info, warn};

#[cfg(feature = "metrics")]
pub mod metrics;
pub mod server;

// -----------------------------------------------------------------------------
// Telemetry

#[cfg(feature = "metrics")]
static SERVER_REQUEST: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        opts!(
            "kubernetes_operator_server_request",
            "number of request handled by the server",
        ),
        &["method", "path", "status"]
    )
    .expect("metrics 'kubernetes_operator_server_request' to not be already registered")
});

#[cfg(feature = "metrics")]
static SERVER_REQUEST_DURATION: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        opts!(
            "kubernetes_operator_server_request_duration",
            "duration of request handled by the server",
        ),
        &["method", "path", "status", "unit"]
    )
    .expect("metrics 'kubernetes_operator_server_request_duration' to not be already registered")
});

// -----------------------------------------------------------------------------
// Error enum

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[cfg(feature = "metrics")]
    #[error("{0}")]
    Metrics(metrics::Error),
}

// -----------------------------------------------------------------------------
// Helper methods

#[cfg_attr(feature = "trace", tracing::instrument)]
/// dispatch the request to its handler, failures are answered as a json
/// document with an internal server error status
pub async fn router(req: Request<Body>) -> Result<Response<Body>, hyper::Error> {
    let begin = Instant::now();

    let result = match (req.method(), req.uri().path()) {
        (&Method::GET, "/healthz") | (&Method::GET, "/livez") | (&Method::GET, "/readyz") => {
            healthz(&req).await
        }
        #[cfg(feature = "metrics")]
        (&Method::GET, "/metrics") => metrics::handler(&req).await.map_err(Error::Metrics),
        _ => not_found(&req).await,
    };

    let res = result.unwrap_or_else(|err| {
        warn!(
            path = req.uri().path(),
            error = err.to_string(),
            "Could not handle request",
        );

        internal_server_error(&err)
    });

    let duration = Instant::now().duration_since(begin).as_micros() as u64;
    let status = res.status().as_u16();

    info!(
        method = req.method().as_str(),
        path = req.uri().path(),
        status = status,
        duration = duration,
        "Receive request"
    );

    #[cfg(feature = "metrics")]
    {
        let status = status.to_string();

        SERVER_REQUEST
            .with_label_values(&[req.method().as_str(), req.uri().path(), &status])
            .inc();

        SERVER_REQUEST_DURATION
            .with_label_values(&[req.method().as_str(), req.uri().path(), &status, "us"])
            .inc_by(duration as f64);
    }

    Ok(res)
}

/// returns a json document describing the error
fn internal_server_error(err: &Error) -> Response<Body> {
    let mut res = Response::default();
    let message = serde_json::json!({ "error": err.to_string() }).to_string();

    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );

    *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    *res.body_mut() = Body::from(message);
    res
}

#[cfg_attr(feature = "trace", tracing::instrument)]
pub async fn healthz(_req: &Request<Body>) -> Result<Response<Body>, Error> {
    let mut res = Response::default();

    *res.status_mut() = StatusCode::NO_CONTENT;

    Ok(res)
}

#[cfg_attr(feature = "trace", tracing::instrument)]
pub async fn not_found(_req: &Request<Body>) -> Result<Response<Body>, Error> {
    let mut res = Response::default();

    *res.status_mut() = StatusCode::NOT_FOUND;

    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(path: &str) -> Request<Body> {
        Request::get(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_probes_answer_no_content() {
        for path in ["/healthz", "/livez", "/readyz"] {
            let res = router(get(path)).await.unwrap();

            assert_eq!(res.status(), StatusCode::NO_CONTENT);
        }
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let res = router(get("/unknown")).await.unwrap();

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_probe_only_answers_get() {
        let req = Request::post("/healthz").body(Body::empty()).unwrap();
        let res = router(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[cfg(feature = "metrics")]
    #[tokio::test]
    async fn metrics_are_exposed() {
        router(get("/healthz")).await.unwrap();

        let res = router(get("/metrics")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = hyper::body::to_bytes(res.into_body()).await.unwrap();
        let body = String::from_utf8_lossy(&body);
        assert!(body.contains("kubernetes_operator_server_request"));
    }
}
