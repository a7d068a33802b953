use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

const TARGET: &str = "topzonal::http::response";
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Clone, Debug)]
pub struct RequestContext {
    pub request_id: String,
}

/// Tag each request with a fresh id, echoed back in `x-request-id`.
pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext {
        request_id: Uuid::new_v4().to_string(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&ctx.request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response.extensions_mut().insert(ctx);
    response
}

struct FailedRequest {
    status: StatusCode,
    method: Method,
    path: String,
    elapsed_ms: u128,
    request_id: String,
    report: Option<ErrorReport>,
}

impl FailedRequest {
    fn emit(self) {
        let (source, chain) = match self.report {
            Some(report) => (report.source, report.messages),
            None => ("unknown", Vec::new()),
        };
        let detail = chain
            .first()
            .map(String::as_str)
            .unwrap_or("no diagnostic available");

        if self.status.is_server_error() {
            error!(
                target: TARGET,
                status = self.status.as_u16(),
                method = %self.method,
                path = %self.path,
                elapsed_ms = self.elapsed_ms,
                source,
                detail,
                chain = ?chain,
                request_id = %self.request_id,
                "request failed",
            );
        } else {
            warn!(
                target: TARGET,
                status = self.status.as_u16(),
                method = %self.method,
                path = %self.path,
                elapsed_ms = self.elapsed_ms,
                source,
                detail,
                chain = ?chain,
                request_id = %self.request_id,
                "client request error",
            );
        }
    }
}

/// Log 4xx/5xx responses together with the `ErrorReport` a handler attached.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();
    let start = Instant::now();

    let mut response = next.run(request).await;
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        FailedRequest {
            status,
            method,
            path,
            elapsed_ms: start.elapsed().as_millis(),
            request_id,
            report: response.extensions_mut().remove::<ErrorReport>(),
        }
        .emit();
    }

    response
}
