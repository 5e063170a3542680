//! Data-plane proxy handler
//!
//! Every request that is not control plane lands here. The first path
//! segment names the destination service; the rest of the path and the
//! query are forwarded. The message runs the matcher and fault pipeline
//! on the request leg, survivors go upstream, and the reply runs the
//! same chain as a `response`-typed message before it leaves.
//!
//! Each message carries a cancellation token bound to the configured
//! processing deadline; expiry cancels whatever leg is in flight and the
//! message ends with 499. A client disconnect additionally cancels by
//! dropping the handler future, taking any in-flight upstream call with
//! it.

use application::ports::UpstreamRequest;
use application::{CancelToken, FaultOutcome, ProxyError, apply_rule};
use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::Response;
use domain::{MessageType, ProxyMessage, ServiceName};
use tracing::{debug, instrument};

use crate::error::ApiError;
use crate::state::AppState;

/// Headers each hop owns; never copied onto the egress response
const EGRESS_SKIPPED: &[&str] = &[
    "connection",
    "content-length",
    "keep-alive",
    "transfer-encoding",
];

/// Proxy one message through both pipeline legs
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn proxy_message(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let (dest, path_and_query) = split_destination(&parts.uri).ok_or_else(|| {
        ApiError::BadRequest("request path must name a destination service".to_string())
    })?;
    let dest = ServiceName::new(dest).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let bytes = to_bytes(body, state.max_body_bytes)
        .await
        .map_err(|e| ApiError::BadRequest(format!("unreadable request body: {e}")))?;
    let ingress = ProxyMessage::new(
        state.service_name.clone(),
        dest,
        MessageType::Request,
        header_pairs(&parts.headers),
        String::from_utf8_lossy(&bytes).into_owned(),
    );

    // The deadline owns the token: on expiry the in-flight leg observes
    // the cancellation and the message ends with 499
    let cancel = CancelToken::new();
    let deadline = tokio::time::sleep(state.request_timeout);
    let legs = run_legs(&state, &parts.method, path_and_query, ingress, &cancel);
    tokio::pin!(deadline);
    tokio::pin!(legs);

    tokio::select! {
        result = &mut legs => result,
        () = &mut deadline => {
            debug!(timeout = ?state.request_timeout, "processing deadline expired");
            cancel.cancel();
            legs.await
        }
    }
}

/// Run the request leg, the upstream call and the reply leg
async fn run_legs(
    state: &AppState,
    method: &Method,
    path_and_query: String,
    ingress: ProxyMessage,
    cancel: &CancelToken,
) -> Result<Response, ApiError> {
    let tracking_header = state.matcher.tracking_header().to_string();
    let tracking_value = ingress.header(&tracking_header).map(str::to_string);
    let dest = ingress.dest.clone();
    let mut sampler = state.samplers.sampler();

    // Request leg
    let rule = state.matcher.select(&state.registry, &ingress);
    let survivor = match apply_rule(&rule, ingress, &mut sampler, cancel).await? {
        FaultOutcome::Abort { status } => {
            debug!(status, "request leg aborted");
            return Ok(abort_response(status, &tracking_header, tracking_value.as_deref()));
        },
        FaultOutcome::Forward(message) => message,
    };

    let source = survivor.source.clone();
    let forward = state.upstream.forward(UpstreamRequest {
        message: survivor,
        method: method.to_string(),
        path_and_query,
    });
    // Cancelling here drops the in-flight upstream request with the
    // forward future, so no socket outlives its message
    let upstream_response = tokio::select! {
        result = forward => result.map_err(ProxyError::from)?,
        () = cancel.cancelled() => return Err(ApiError::Cancelled),
    };
    let egress_status = upstream_response.status;
    let egress_headers = upstream_response.headers.clone();

    // Reply leg; the experiment id gates it even when the upstream does
    // not echo the tracking header
    let mut reply = ProxyMessage::new(
        source,
        dest,
        MessageType::Response,
        upstream_response.headers,
        upstream_response.body,
    );
    if reply.header(&tracking_header).is_none() {
        if let Some(value) = &tracking_value {
            reply.push_header(tracking_header.clone(), value.clone());
        }
    }

    let rule = state.matcher.select(&state.registry, &reply);
    match apply_rule(&rule, reply, &mut sampler, cancel).await? {
        FaultOutcome::Abort { status } => {
            debug!(status, "reply leg aborted");
            Ok(abort_response(status, &tracking_header, tracking_value.as_deref()))
        },
        FaultOutcome::Forward(reply) => {
            Ok(egress_response(egress_status, &egress_headers, reply.body))
        },
    }
}

/// Split `/dest/rest?query` into the destination service and the
/// path-and-query to forward
fn split_destination(uri: &Uri) -> Option<(String, String)> {
    let mut segments = uri.path().trim_start_matches('/').splitn(2, '/');
    let dest = segments.next().filter(|s| !s.is_empty())?.to_string();
    let mut forward = format!("/{}", segments.next().unwrap_or(""));
    if let Some(query) = uri.query() {
        forward.push('?');
        forward.push_str(query);
    }
    Some((dest, forward))
}

/// Flatten a header map into ordered string pairs
fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

/// The synthesized response for an aborted message: the rule's status,
/// an empty body and the correlation header
fn abort_response(status: u16, tracking_header: &str, tracking_value: Option<&str>) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() =
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if let (Some(value), Ok(name)) = (tracking_value, tracking_header.parse::<HeaderName>()) {
        if let Ok(value) = HeaderValue::from_str(value) {
            response.headers_mut().insert(name, value);
        }
    }
    response
}

/// The egress response for a forwarded message: upstream status and
/// headers, possibly mangled body
fn egress_response(status: u16, headers: &[(String, String)], body: String) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() =
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    for (name, value) in headers {
        if EGRESS_SKIPPED.iter().any(|h| name.eq_ignore_ascii_case(h)) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (name.parse::<HeaderName>(), HeaderValue::from_str(value)) {
            response.headers_mut().append(name, value);
        }
    }
    response
}
