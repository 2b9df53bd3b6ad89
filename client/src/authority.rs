//! Balance authority abstraction and its HTTP implementation.
//!
//! [`BalanceAuthority`] is the seam between the session layer and whatever
//! holds the money: the production REST backend ([`HttpAuthority`]), the
//! local simulator, or a test mock. All calls are async with bounded
//! per-endpoint deadlines; a call that outlives its deadline is treated as
//! failed and abandoned (the response, if any, is discarded).

use crate::{Error, Result};
use async_trait::async_trait;
use parcade_types::api::{
    BalanceSnapshot, BetAccepted, BetRequest, ErrorBody, Healthz, ResultAck, ResultReport,
};
use parcade_types::{GameKind, Parc};
use reqwest::{Client as HttpClient, Method, RequestBuilder, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;
use url::Url;

/// Deadline for debit and result-report calls.
const BET_TIMEOUT: Duration = Duration::from_secs(5);
/// Deadline for balance fetches.
const BALANCE_TIMEOUT: Duration = Duration::from_secs(5);
/// Deadline for the liveness probe.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

/// The remote holder of account balances.
///
/// Implementations must apply a debit exactly once per call: the session
/// layer never resends a debit or a result report, so duplicate application
/// is the implementation's bug, not something the caller defends against.
#[async_trait]
pub trait BalanceAuthority: Send + Sync {
    /// Debit `amount` for one round of `game`. An `Err` means the round
    /// must not start.
    async fn debit(&self, amount: Parc, game: GameKind) -> Result<BetAccepted>;

    /// Report a settled round. Called at most once per round.
    async fn report_result(&self, report: ResultReport) -> Result<ResultAck>;

    /// Fetch the authoritative balances.
    async fn balance(&self) -> Result<BalanceSnapshot>;

    /// Liveness probe. Any failure counts as unhealthy.
    async fn healthy(&self) -> bool;
}

#[async_trait]
impl<A: BalanceAuthority + ?Sized> BalanceAuthority for Arc<A> {
    async fn debit(&self, amount: Parc, game: GameKind) -> Result<BetAccepted> {
        (**self).debit(amount, game).await
    }

    async fn report_result(&self, report: ResultReport) -> Result<ResultAck> {
        (**self).report_result(report).await
    }

    async fn balance(&self) -> Result<BalanceSnapshot> {
        (**self).balance().await
    }

    async fn healthy(&self) -> bool {
        (**self).healthy().await
    }
}

/// Retry policy for transient HTTP failures.
///
/// Only idempotent requests are ever retried: debits and result reports go
/// out exactly once regardless of this policy, because a retried POST could
/// double-apply money movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per request (including the first attempt).
    pub max_attempts: usize,
    /// Initial backoff delay after the first retryable failure.
    pub initial_backoff: Duration,
    /// Maximum backoff delay between attempts.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
        }
    }
}

/// REST client for the portal backend.
#[derive(Clone)]
pub struct HttpAuthority {
    base_url: Url,
    token: Option<String>,
    http_client: HttpClient,
    retry_policy: RetryPolicy,
}

impl HttpAuthority {
    /// Create a client for the authority at `base_url`. `token` is the
    /// bearer credential of the authenticated user; `None` leaves requests
    /// anonymous (useful against permissive local backends).
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        match base_url.scheme() {
            "http" | "https" => {}
            scheme => return Err(Error::InvalidScheme(scheme.to_string())),
        }

        let http_client = HttpClient::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            base_url,
            token,
            http_client,
            retry_policy: RetryPolicy::default(),
        })
    }

    /// Returns a new client with the provided retry policy.
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    fn request(&self, method: Method, path: &str, deadline: Duration) -> Result<RequestBuilder> {
        let url = self.base_url.join(path)?;
        let mut builder = self
            .http_client
            .request(method, url)
            .timeout(deadline)
            // The backend sits behind caches that must not serve stale
            // balances.
            .header("Cache-Control", "no-store");
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    /// Send a GET, retrying transient failures per the policy.
    async fn get_with_retry(&self, path: &str, deadline: Duration) -> Result<reqwest::Response> {
        let max_attempts = self.retry_policy.max_attempts.max(1);
        let mut backoff = self.retry_policy.initial_backoff;
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let result = self.request(Method::GET, path, deadline)?.send().await;
            match result {
                Ok(response) => {
                    if !is_retryable_status(response.status()) || attempt >= max_attempts {
                        return Ok(response);
                    }
                }
                Err(err) => {
                    if attempt >= max_attempts || !is_retryable_error(&err) {
                        return Err(wrap_reqwest(err));
                    }
                }
            }

            if backoff > Duration::ZERO {
                sleep(backoff).await;
                backoff = std::cmp::min(backoff.saturating_mul(2), self.retry_policy.max_backoff);
            }
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::BAD_GATEWAY
        || status == StatusCode::SERVICE_UNAVAILABLE
        || status == StatusCode::GATEWAY_TIMEOUT
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

fn wrap_reqwest(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout
    } else {
        Error::Reqwest(err)
    }
}

/// Map a non-success response to the error taxonomy, consuming the body.
async fn reject(response: reqwest::Response) -> Error {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Error::Unauthorized(status);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Error::RateLimited;
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::BAD_REQUEST || status == StatusCode::PAYMENT_REQUIRED {
        // The authority reports rejected debits with a JSON detail body.
        if let Ok(parsed) = serde_json::from_str::<ErrorBody>(&body) {
            return Error::InsufficientBalance {
                detail: parsed.detail,
            };
        }
    }
    Error::FailedWithBody { status, body }
}

/// Parse a 2xx body that is allowed to be empty.
fn parse_lenient<T: Default + serde::de::DeserializeOwned>(body: &str) -> Result<T> {
    if body.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(body).map_err(|_| Error::UnexpectedResponse)
}

#[async_trait]
impl BalanceAuthority for HttpAuthority {
    async fn debit(&self, amount: Parc, game: GameKind) -> Result<BetAccepted> {
        let request = BetRequest { amount, game };
        debug!(%game, amount, "requesting debit");
        let response = self
            .request(Method::POST, "casino/bet", BET_TIMEOUT)?
            .json(&request)
            .send()
            .await
            .map_err(wrap_reqwest)?;
        if !response.status().is_success() {
            return Err(reject(response).await);
        }
        let body = response.text().await.map_err(wrap_reqwest)?;
        parse_lenient(&body)
    }

    async fn report_result(&self, report: ResultReport) -> Result<ResultAck> {
        debug!(game = %report.game, won = report.won, "reporting result");
        let response = self
            .request(Method::POST, "casino/result", BET_TIMEOUT)?
            .json(&report)
            .send()
            .await
            .map_err(wrap_reqwest)?;
        if !response.status().is_success() {
            return Err(reject(response).await);
        }
        let body = response.text().await.map_err(wrap_reqwest)?;
        if body.trim().is_empty() {
            return Ok(ResultAck { ack: true });
        }
        serde_json::from_str(&body).map_err(|_| Error::UnexpectedResponse)
    }

    async fn balance(&self) -> Result<BalanceSnapshot> {
        let response = self.get_with_retry("users/me", BALANCE_TIMEOUT).await?;
        if !response.status().is_success() {
            return Err(reject(response).await);
        }
        response
            .json::<BalanceSnapshot>()
            .await
            .map_err(|_| Error::UnexpectedResponse)
    }

    async fn healthy(&self) -> bool {
        let response = match self.get_with_retry("healthz", HEALTH_TIMEOUT).await {
            Ok(response) => response,
            Err(_) => return false,
        };
        if !response.status().is_success() {
            return false;
        }
        matches!(response.json::<Healthz>().await, Ok(Healthz { ok: true }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_http_schemes() {
        assert!(matches!(
            HttpAuthority::new("ftp://example.com", None),
            Err(Error::InvalidScheme(_))
        ));
        assert!(HttpAuthority::new("http://localhost:8080", None).is_ok());
    }

    #[test]
    fn test_parse_lenient_accepts_empty_and_json() {
        let empty: BetAccepted = parse_lenient("").unwrap();
        assert_eq!(empty.current_balance, None);

        let parsed: BetAccepted = parse_lenient(r#"{"current_balance":90}"#).unwrap();
        assert_eq!(parsed.current_balance, Some(90));

        assert!(matches!(
            parse_lenient::<BetAccepted>("not json"),
            Err(Error::UnexpectedResponse)
        ));
    }

    #[test]
    fn test_retryable_status_classification() {
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable_status(StatusCode::OK));
    }
}
