//! Pre-handler admission filter.
//!
//! The router mounts one filter per guarded route group via
//! `axum::middleware::from_fn_with_state`, parameterized by the shared
//! controller and the group's route class. Admitted requests pass through
//! unchanged; rejected ones short-circuit into a 429 response with the
//! JSON body the Kazwab admin console and public site expect.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::debug;

use crate::admission::{Admission, AdmissionController, RouteClass};

/// State handed to the admission filter: the shared controller plus the
/// route class of the routes it guards.
#[derive(Clone)]
pub struct AdmissionGate {
    controller: Arc<AdmissionController>,
    class: RouteClass,
}

impl AdmissionGate {
    /// Create a gate for one route class.
    pub fn new(controller: Arc<AdmissionController>, class: RouteClass) -> Self {
        Self { controller, class }
    }
}

/// The admission filter, for `axum::middleware::from_fn_with_state`.
///
/// The client key is the connection's peer address, so the router must be
/// served with `into_make_service_with_connect_info::<SocketAddr>()`.
/// Resolving keys through trusted proxy headers is the router's concern and
/// happens before this filter sees the request.
pub async fn enforce(
    State(gate): State<AdmissionGate>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let key = addr.ip().to_string();
    let admission = gate.controller.check_and_increment(&key, gate.class).await;

    if admission.admitted {
        return next.run(request).await;
    }

    debug!(
        key = %key,
        scope = %gate.class,
        retry_after_secs = admission.retry_after_secs(),
        "Request rejected by rate limit"
    );
    rejection(gate.class, &admission)
}

/// Build the 429 response for a rejected request.
fn rejection(class: RouteClass, admission: &Admission) -> Response {
    (
        StatusCode::TOO_MANY_REQUESTS,
        [(
            header::RETRY_AFTER,
            admission.retry_after_secs().to_string(),
        )],
        Json(json!({
            "success": false,
            "message": limit_message(class),
        })),
    )
        .into_response()
}

/// User-visible message per route class.
fn limit_message(class: RouteClass) -> &'static str {
    match class {
        RouteClass::General => "Too many requests, please try again later.",
        RouteClass::Auth => "Too many login attempts, please try again later.",
        RouteClass::Upload => "Upload limit reached, please try again later.",
        RouteClass::Contact => "Too many contact messages, please try again later.",
        RouteClass::Newsletter => "Too many subscription requests, please try again later.",
        RouteClass::Search => "Too many search requests, please slow down.",
    }
}
