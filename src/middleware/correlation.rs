//! Correlation middleware: request-scoped logging context.
//!
//! Every request gets a correlation id (reusing an inbound `X-Request-ID`
//! header when present), bound together with method, path, and client ip into
//! a fresh context scope for the duration of the handler. The id is echoed on
//! the response so callers can correlate client-observed behavior with server
//! logs. The scope is torn down on every exit path — success, handler error,
//! or cancellation — so a later request can never observe this one's fields.

use crate::pipeline::{LogPipeline, context};
use crate::utils::{extract_client_ip, extract_user_agent};
use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{HeaderName, HeaderValue},
};
use serde_json::{Map, Value};
use std::{
    future::{Ready, ready},
    pin::Pin,
    time::Instant,
};
use uuid::Uuid;

/// Correlation middleware factory
pub struct CorrelationMiddleware {
    pipeline: LogPipeline,
}

impl CorrelationMiddleware {
    pub fn new(pipeline: LogPipeline) -> Self {
        Self { pipeline }
    }
}

impl<S, B> Transform<S, ServiceRequest> for CorrelationMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = CorrelationService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CorrelationService {
            service,
            pipeline: self.pipeline.clone(),
        }))
    }
}

/// The actual correlation middleware service
pub struct CorrelationService<S> {
    service: S,
    pipeline: LogPipeline,
}

impl<S, B> Service<ServiceRequest> for CorrelationService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();

        // Extract or generate the correlation id
        let request_id = req
            .headers()
            .get("X-Request-ID")
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut bound_fields = Map::new();
        bound_fields.insert("request_id".into(), Value::String(request_id.clone()));
        bound_fields.insert("method".into(), Value::String(req.method().to_string()));
        bound_fields.insert("path".into(), Value::String(req.path().to_string()));
        bound_fields.insert(
            "client_ip".into(),
            Value::String(extract_client_ip(req.request())),
        );

        let user_agent = extract_user_agent(req.request());
        let query = req.query_string().to_string();

        // Store the correlation id in request extensions for handlers
        req.extensions_mut().insert(request_id.clone());

        let log = self.pipeline.logger("http.request");
        let fut = self.service.call(req);

        Box::pin(context::scope(async move {
            context::bind(bound_fields);

            let mut started = log.info("request_started");
            if let Some(user_agent) = user_agent {
                started = started.field("user_agent", user_agent);
            }
            if !query.is_empty() {
                started = started.field("query", query);
            }
            started.emit();

            match fut.await {
                Ok(mut res) => {
                    // Handler errors surface as error responses rather than
                    // service errors; the original fault rides along inside.
                    if let Some(err) = res.response().error() {
                        log.error("request_failed")
                            .field("status_code", res.status().as_u16())
                            .field("duration_ms", elapsed_ms(start_time))
                            .field("error", err.to_string())
                            .emit();
                    } else {
                        log.info("request_completed")
                            .field("status_code", res.status().as_u16())
                            .field("duration_ms", elapsed_ms(start_time))
                            .emit();
                    }

                    // Echo the correlation id on every exit path
                    res.headers_mut().insert(
                        HeaderName::from_static("x-request-id"),
                        HeaderValue::from_str(&request_id)
                            .unwrap_or_else(|_| HeaderValue::from_static("invalid")),
                    );

                    Ok(res)
                }
                Err(err) => {
                    log.error("request_failed")
                        .field("status_code", err.as_response_error().status_code().as_u16())
                        .field("duration_ms", elapsed_ms(start_time))
                        .field("error", err.to_string())
                        .emit();

                    // Wrap so the error response built further out still
                    // carries the correlation id.
                    Err(CorrelatedError {
                        request_id,
                        inner: err,
                    }
                    .into())
                }
            }
        }))
    }
}

/// Elapsed time in milliseconds, rounded to two decimals as logged.
fn elapsed_ms(start: Instant) -> f64 {
    (start.elapsed().as_secs_f64() * 1000.0 * 100.0).round() / 100.0
}

/// Error wrapper attaching the correlation id to the error response.
///
/// Errors propagated from services beneath this middleware turn into a
/// response outside our scope; without the wrapper that response would miss
/// the `X-Request-ID` header.
#[derive(Debug)]
struct CorrelatedError {
    request_id: String,
    inner: Error,
}

impl std::fmt::Display for CorrelatedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.inner, f)
    }
}

impl actix_web::ResponseError for CorrelatedError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        self.inner.as_response_error().status_code()
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        let mut res = self.inner.as_response_error().error_response();
        if let Ok(value) = HeaderValue::from_str(&self.request_id) {
            res.headers_mut()
                .insert(HeaderName::from_static("x-request-id"), value);
        }
        res
    }
}
