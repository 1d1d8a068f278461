//! HTTP API for the waitlist.

use crate::node::NodeState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use waitlist_core::{
    referral_link, Error, SignupOutcome, SignupRequest, WaitlistAnalytics, WaitlistEntry,
};

type AppState = Arc<NodeState>;

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    // CORS layer for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(health))
        .route("/api/v1/health", get(health))
        .route("/ready", get(ready))
        // Waitlist
        .route("/api/v1/waitlist", get(list_waitlist).post(join_waitlist))
        .route("/api/v1/waitlist/:uid", get(get_entry))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (status, Json(ErrorBody { error: error.into() })).into_response()
}

/// Run blocking store work off the async runtime.
async fn blocking<T, F>(state: &AppState, work: F) -> Result<T, Response>
where
    F: FnOnce(&NodeState) -> waitlist_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    match tokio::task::spawn_blocking(move || work(&state)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(Error::Validation(message))) => Err(error_response(StatusCode::BAD_REQUEST, message)),
        Ok(Err(e)) => {
            tracing::error!("Waitlist request failed: {}", e);
            Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
        Err(e) => {
            tracing::error!("Waitlist task panicked: {}", e);
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
            ))
        }
    }
}

// --- Health endpoints ---

async fn health() -> &'static str {
    "OK"
}

async fn ready() -> &'static str {
    "OK"
}

// --- Waitlist endpoints ---

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinRequest {
    uid: Option<String>,
    name: Option<String>,
    email: Option<String>,
    photo_url: Option<String>,
    tier: Option<String>,
    referred_by: Option<String>,
}

impl From<JoinRequest> for SignupRequest {
    fn from(req: JoinRequest) -> Self {
        SignupRequest {
            external_id: req.uid.unwrap_or_default(),
            display_name: req.name.unwrap_or_default(),
            contact_email: req.email.unwrap_or_default(),
            photo_url: req.photo_url,
            tier: req.tier,
            referred_by: req.referred_by,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JoinResponse {
    success: bool,
    message: String,
    position: u32,
    referral_code: String,
    referral_link: String,
    already_on_waitlist: bool,
}

async fn join_waitlist(
    State(state): State<AppState>,
    Json(req): Json<JoinRequest>,
) -> Response {
    let request = SignupRequest::from(req);
    let outcome = match blocking(&state, move |s| s.service.signup(request)).await {
        Ok(outcome) => outcome,
        Err(response) => return response,
    };

    let placement = outcome.placement();
    let (message, already_on_waitlist) = match outcome {
        SignupOutcome::Joined { .. } => ("Successfully joined the waitlist!", false),
        SignupOutcome::AlreadyOnWaitlist(_) => ("You're already on the waitlist!", true),
    };

    Json(JoinResponse {
        success: true,
        message: message.to_string(),
        position: placement.position,
        referral_link: referral_link(&state.config.site_url, &placement.referral_code),
        referral_code: placement.referral_code,
        already_on_waitlist,
    })
    .into_response()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    success: bool,
    count: usize,
    users: Vec<WaitlistEntry>,
    analytics: WaitlistAnalytics,
}

async fn list_waitlist(State(state): State<AppState>) -> Response {
    match blocking(&state, |s| s.service.list_ranked()).await {
        Ok(listing) => Json(ListResponse {
            success: true,
            count: listing.entries.len(),
            users: listing.entries,
            analytics: listing.analytics,
        })
        .into_response(),
        Err(response) => response,
    }
}

async fn get_entry(State(state): State<AppState>, Path(uid): Path<String>) -> Response {
    match blocking(&state, move |s| s.service.lookup(&uid)).await {
        Ok(Some(entry)) => Json(entry).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Not on the waitlist"),
        Err(response) => response,
    }
}
