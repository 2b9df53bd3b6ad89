//! HTTP surface of the simulated balance authority.
//!
//! Endpoint-for-endpoint mirror of the production backend:
//! `GET /healthz`, `GET /users/me`, `POST /casino/bet`,
//! `POST /casino/result`. Accounts are identified by bearer token.

use crate::Simulator;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parcade_types::api::{BetAccepted, BetRequest, ErrorBody, Healthz, ResultAck, ResultReport};
use std::sync::Arc;
use tracing::debug;

/// Router factory over a shared [`Simulator`].
pub struct Api {
    simulator: Arc<Simulator>,
}

impl Api {
    pub fn new(simulator: Arc<Simulator>) -> Self {
        Self { simulator }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/healthz", get(healthz))
            .route("/users/me", get(me))
            .route("/casino/bet", post(bet))
            .route("/casino/result", post(result))
            .with_state(Arc::clone(&self.simulator))
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody {
            detail: "missing or malformed bearer token".to_string(),
        }),
    )
        .into_response()
}

/// Apply configured latency, then roll for an injected failure.
async fn inject_faults(simulator: &Simulator) -> Option<Response> {
    let config = simulator.config();
    if !config.latency.is_zero() {
        tokio::time::sleep(config.latency).await;
    }
    if config.fail_rate > 0.0 && rand::random::<f64>() < config.fail_rate {
        debug!("injecting request failure");
        return Some(
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    detail: "injected failure".to_string(),
                }),
            )
                .into_response(),
        );
    }
    None
}

async fn healthz() -> Response {
    Json(Healthz { ok: true }).into_response()
}

async fn me(State(simulator): State<Arc<Simulator>>, headers: HeaderMap) -> Response {
    if let Some(response) = inject_faults(&simulator).await {
        return response;
    }
    let Some(token) = bearer(&headers) else {
        return unauthorized();
    };
    if !simulator.check_balance_quota(&token) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorBody {
                detail: "balance fetch quota exceeded".to_string(),
            }),
        )
            .into_response();
    }
    Json(simulator.balance_of(&token)).into_response()
}

async fn bet(
    State(simulator): State<Arc<Simulator>>,
    headers: HeaderMap,
    Json(request): Json<BetRequest>,
) -> Response {
    if let Some(response) = inject_faults(&simulator).await {
        return response;
    }
    let Some(token) = bearer(&headers) else {
        return unauthorized();
    };
    if request.amount == 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                detail: "stake must be positive".to_string(),
            }),
        )
            .into_response();
    }
    match simulator.debit(&token, request.amount) {
        Ok(balance) => {
            debug!(token, game = %request.game, amount = request.amount, "debit accepted");
            Json(BetAccepted {
                current_balance: Some(balance),
            })
            .into_response()
        }
        Err(err) => (
            StatusCode::PAYMENT_REQUIRED,
            Json(ErrorBody {
                detail: err.to_string(),
            }),
        )
            .into_response(),
    }
}

async fn result(
    State(simulator): State<Arc<Simulator>>,
    headers: HeaderMap,
    Json(report): Json<ResultReport>,
) -> Response {
    if let Some(response) = inject_faults(&simulator).await {
        return response;
    }
    let Some(token) = bearer(&headers) else {
        return unauthorized();
    };
    simulator.apply_result(&token, report);
    Json(ResultAck { ack: true }).into_response()
}
