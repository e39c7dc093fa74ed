//! Remote API access
//!
//! - [`Transport`]: one raw request/response exchange (HTTP in production,
//!   scripted in tests)
//! - [`RetryingClient`]: fixed-delay retries, result-code classification and
//!   typed decoding of the `{"response": ...}` envelope
//! - [`GameApi`]: one typed method per remote operation, bound to a token

pub mod http;
pub mod ops;
pub mod schema;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::error::{ApiError, AttemptFailure, TransportError};
use schema::Envelope;

pub use http::ReqwestTransport;
pub use ops::GameApi;

pub const MAX_RETRIES: u32 = 3;
pub const RETRY_DELAY: Duration = Duration::from_millis(3000);

/// Remote operations consumed by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetPlanets,
    GetPlanet,
    GetPlayerInfo,
    RepresentClan,
    JoinPlanet,
    JoinZone,
    JoinBossZone,
    LeaveGame,
    ReportScore,
    ReportBossDamage,
}

impl Operation {
    pub fn path(self) -> &'static str {
        match self {
            Operation::GetPlanets => "ITerritoryControlMinigameService/GetPlanets/v0001",
            Operation::GetPlanet => "ITerritoryControlMinigameService/GetPlanet/v0001",
            Operation::GetPlayerInfo => "ITerritoryControlMinigameService/GetPlayerInfo/v0001",
            Operation::RepresentClan => "ITerritoryControlMinigameService/RepresentClan/v0001",
            Operation::JoinPlanet => "ITerritoryControlMinigameService/JoinPlanet/v0001",
            Operation::JoinZone => "ITerritoryControlMinigameService/JoinZone/v0001",
            Operation::JoinBossZone => "ITerritoryControlMinigameService/JoinBossZone/v0001",
            Operation::LeaveGame => "IMiniGameService/LeaveGame/v0001",
            Operation::ReportScore => "ITerritoryControlMinigameService/ReportScore/v0001",
            Operation::ReportBossDamage => "ITerritoryControlMinigameService/ReportBossDamage/v0001",
        }
    }

    /// Read-only lookups are GET, everything touching the session is POST
    pub fn default_method(self) -> Method {
        match self {
            Operation::GetPlanets | Operation::GetPlanet => Method::Get,
            _ => Method::Post,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Steam result code delivered in the `x-eresult` header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EResult(pub i32);

impl EResult {
    pub const OK: EResult = EResult(1);
    pub const FAIL: EResult = EResult(2);
    pub const BUSY: EResult = EResult(10);
    pub const INVALID_STATE: EResult = EResult(11);
    pub const ACCESS_DENIED: EResult = EResult(15);
    pub const RATE_LIMIT_EXCEEDED: EResult = EResult(84);
    pub const TIME_NOT_SYNCED: EResult = EResult(93);

    pub fn name(self) -> &'static str {
        match self {
            EResult::OK => "OK",
            EResult::FAIL => "Fail",
            EResult::BUSY => "Busy",
            EResult::INVALID_STATE => "InvalidState",
            EResult::ACCESS_DENIED => "AccessDenied",
            EResult::RATE_LIMIT_EXCEEDED => "RateLimitExceeded",
            EResult::TIME_NOT_SYNCED => "TimeNotSynced",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for EResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

/// One request as handed to the transport
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub operation: Operation,
    pub method: Method,
    pub params: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Raw outcome of one exchange, before any classification
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    pub eresult: Option<EResult>,
    pub error_message: Option<String>,
    pub body: String,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError>;
}

/// Per-call knobs of [`RetryingClient::call`]
#[derive(Debug, Clone)]
pub struct CallOptions {
    /// Overrides the operation's default method
    pub method: Option<Method>,
    /// Total number of attempts; 0 behaves like 1
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Suppress the per-attempt `Sending ...` line
    pub silent: bool,
    /// Result codes accepted in addition to `OK`
    pub tolerated: Vec<EResult>,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            method: None,
            max_retries: MAX_RETRIES,
            retry_delay: RETRY_DELAY,
            silent: false,
            tolerated: Vec::new(),
        }
    }
}

impl CallOptions {
    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn single_attempt(mut self) -> Self {
        self.max_retries = 1;
        self
    }

    pub fn tolerate(mut self, result: EResult) -> Self {
        self.tolerated.push(result);
        self
    }
}

/// Issues remote operations, retrying failed attempts with a fixed delay
#[derive(Clone)]
pub struct RetryingClient {
    transport: Arc<dyn Transport>,
}

impl RetryingClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn call<T: DeserializeOwned>(
        &self,
        operation: Operation,
        params: Vec<(String, String)>,
        options: &CallOptions,
    ) -> Result<T, ApiError> {
        let request = ApiRequest {
            operation,
            method: options.method.unwrap_or(operation.default_method()),
            params,
        };
        let max_attempts = options.max_retries.max(1);
        let mut attempts = 0;

        loop {
            if !options.silent {
                info!("Sending {}...", operation);
            }

            attempts += 1;
            let failure = match self.transport.send(&request).await {
                Ok(raw) => match classify(raw, &options.tolerated) {
                    Ok(value) => return Ok(value),
                    Err(failure) => failure,
                },
                Err(err) => AttemptFailure::Transport(err),
            };

            warn!("{} failed: {}", operation, failure);

            if attempts >= max_attempts {
                return Err(ApiError::RequestExhausted {
                    operation,
                    attempts,
                    last_failure: failure,
                });
            }

            info!(
                "Retrying {} in {} seconds...",
                operation,
                options.retry_delay.as_secs_f64()
            );
            tokio::time::sleep(options.retry_delay).await;
        }
    }
}

fn classify<T: DeserializeOwned>(raw: RawResponse, tolerated: &[EResult]) -> Result<T, AttemptFailure> {
    if raw.status == 401 || raw.status == 403 {
        return Err(AttemptFailure::Unauthorized(raw.status));
    }

    if let Some(result) = raw.eresult {
        if result != EResult::OK && !tolerated.contains(&result) {
            return Err(AttemptFailure::Rejected {
                result,
                message: raw.error_message,
            });
        }
    }

    serde_json::from_str::<Envelope<T>>(&raw.body)
        .map(|envelope| envelope.response)
        .map_err(|err| AttemptFailure::Malformed(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed list of outcomes and counts attempts
    struct ScriptedTransport {
        outcomes: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
        attempts: Mutex<u32>,
    }

    impl ScriptedTransport {
        fn new(outcomes: Vec<Result<RawResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into()),
                attempts: Mutex::new(0),
            })
        }

        fn attempts(&self) -> u32 {
            *self.attempts.lock().unwrap()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, _request: &ApiRequest) -> Result<RawResponse, TransportError> {
            *self.attempts.lock().unwrap() += 1;
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError("connection reset".into())))
        }
    }

    fn ok(body: &str) -> Result<RawResponse, TransportError> {
        Ok(RawResponse {
            status: 200,
            eresult: Some(EResult::OK),
            error_message: None,
            body: body.to_string(),
        })
    }

    fn options(max_retries: u32) -> CallOptions {
        CallOptions {
            max_retries,
            retry_delay: Duration::from_millis(0),
            silent: true,
            ..CallOptions::default()
        }
    }

    #[derive(Debug, serde::Deserialize)]
    struct Sample {
        a: u32,
    }

    #[tokio::test]
    async fn test_retries_after_one_failure() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError("timeout".into())),
            ok(r#"{"response":{"a":1}}"#),
        ]);
        let client = RetryingClient::new(transport.clone());

        let sample: Sample = client
            .call(Operation::GetPlayerInfo, vec![], &options(2))
            .await
            .unwrap();

        assert_eq!(sample.a, 1);
        assert_eq!(transport.attempts(), 2);
    }

    #[tokio::test]
    async fn test_exhausts_after_single_attempt() {
        let transport = ScriptedTransport::new(vec![]);
        let client = RetryingClient::new(transport.clone());

        let err = client
            .call::<Sample>(Operation::GetPlayerInfo, vec![], &options(1))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::RequestExhausted { attempts: 1, .. }));
        assert_eq!(
            err.to_string(),
            "Failed to send ITerritoryControlMinigameService/GetPlayerInfo/v0001 after 1 attempts"
        );
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test]
    async fn test_busy_result_code_is_retried() {
        let busy = Ok(RawResponse {
            status: 200,
            eresult: Some(EResult::BUSY),
            error_message: None,
            body: String::new(),
        });
        let transport = ScriptedTransport::new(vec![busy, ok(r#"{"response":{"a":7}}"#)]);
        let client = RetryingClient::new(transport.clone());

        let sample: Sample = client
            .call(Operation::GetPlanets, vec![], &options(2))
            .await
            .unwrap();

        assert_eq!(sample.a, 7);
        assert_eq!(transport.attempts(), 2);
    }

    #[tokio::test]
    async fn test_malformed_body_counts_as_failure() {
        let transport = ScriptedTransport::new(vec![ok("{}"), ok("<html>")]);
        let client = RetryingClient::new(transport.clone());

        let err = client
            .call::<Sample>(Operation::GetPlanet, vec![], &options(2))
            .await
            .unwrap_err();

        match err {
            ApiError::RequestExhausted { attempts, last_failure, .. } => {
                assert_eq!(attempts, 2);
                assert!(matches!(last_failure, AttemptFailure::Malformed(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_tolerated_result_code_passes() {
        let invalid_state = Ok(RawResponse {
            status: 200,
            eresult: Some(EResult::INVALID_STATE),
            error_message: Some("Invalid state".into()),
            body: r#"{"response":{"a":3}}"#.into(),
        });
        let transport = ScriptedTransport::new(vec![invalid_state]);
        let client = RetryingClient::new(transport.clone());

        let sample: Sample = client
            .call(
                Operation::LeaveGame,
                vec![],
                &options(1).tolerate(EResult::INVALID_STATE),
            )
            .await
            .unwrap();

        assert_eq!(sample.a, 3);
    }

    #[tokio::test]
    async fn test_unauthorized_is_fatal() {
        let denied = Ok(RawResponse {
            status: 401,
            eresult: None,
            error_message: None,
            body: "<html>Unauthorized</html>".into(),
        });
        let transport = ScriptedTransport::new(vec![denied]);
        let client = RetryingClient::new(transport);

        let err = client
            .call::<Sample>(Operation::GetPlayerInfo, vec![], &options(1))
            .await
            .unwrap_err();

        assert!(err.is_fatal());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_between_attempts_only() {
        let transport = ScriptedTransport::new(vec![]);
        let client = RetryingClient::new(transport.clone());
        let options = CallOptions {
            retry_delay: Duration::from_secs(3),
            ..options(3)
        };

        let started = tokio::time::Instant::now();
        let err = client
            .call::<Sample>(Operation::JoinZone, vec![], &options)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::RequestExhausted { attempts: 3, .. }));
        // two delays between three attempts, none after the last
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_delay_after_success() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError("timeout".into())),
            ok(r#"{"response":{"a":2}}"#),
        ]);
        let client = RetryingClient::new(transport.clone());
        let options = CallOptions {
            retry_delay: Duration::from_secs(3),
            ..options(3)
        };

        let started = tokio::time::Instant::now();
        let sample: Sample = client.call(Operation::JoinZone, vec![], &options).await.unwrap();

        assert_eq!(sample.a, 2);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!(transport.attempts(), 2);
    }

    #[test]
    fn test_operation_methods() {
        assert_eq!(Operation::GetPlanets.default_method(), Method::Get);
        assert_eq!(Operation::GetPlanet.default_method(), Method::Get);
        assert_eq!(Operation::JoinZone.default_method(), Method::Post);
        assert_eq!(Operation::LeaveGame.path(), "IMiniGameService/LeaveGame/v0001");
    }
}
