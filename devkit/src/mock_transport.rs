/*!
Mock transport for running game sessions without the Steam API

Records every request and answers from scripted replies, so round and
reconciliation logic can be exercised offline and asserted on afterwards.
*/

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use salien_core::api::{ApiRequest, EResult, Operation, RawResponse, Transport};
use salien_core::TransportError;
use serde_json::Value;
use tracing::debug;

/// What the mock hands back for one attempt
#[derive(Debug, Clone)]
pub enum Reply {
    Response(RawResponse),
    Failure(String),
}

impl Reply {
    /// HTTP 200, `x-eresult: 1`, body wrapped in the `response` envelope
    pub fn ok(body: Value) -> Self {
        Reply::Response(RawResponse {
            status: 200,
            eresult: Some(EResult::OK),
            error_message: None,
            body: serde_json::json!({ "response": body }).to_string(),
        })
    }

    pub fn eresult(result: EResult, message: Option<&str>) -> Self {
        Reply::Response(RawResponse {
            status: 200,
            eresult: Some(result),
            error_message: message.map(str::to_string),
            body: serde_json::json!({ "response": {} }).to_string(),
        })
    }

    pub fn status(status: u16) -> Self {
        Reply::Response(RawResponse {
            status,
            eresult: None,
            error_message: None,
            body: String::new(),
        })
    }
}

#[derive(Debug, Clone)]
struct Rule {
    operation: Operation,
    param: Option<(String, String)>,
    reply: Reply,
    once: bool,
}

impl Rule {
    fn matches(&self, request: &ApiRequest) -> bool {
        self.operation == request.operation
            && self
                .param
                .as_ref()
                .map_or(true, |(key, value)| request.param(key) == Some(value.as_str()))
    }
}

/// Scripted [`Transport`]: one-shot replies are consumed first, then the most
/// recent sticky reply for the operation answers every further attempt.
#[derive(Default)]
pub struct MockTransport {
    rules: Mutex<Vec<Rule>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn push(&self, operation: Operation, param: Option<(&str, &str)>, reply: Reply, once: bool) {
        self.rules.lock().push(Rule {
            operation,
            param: param.map(|(k, v)| (k.to_string(), v.to_string())),
            reply,
            once,
        });
    }

    /// Answer every call of `operation` with `body`
    pub fn respond(&self, operation: Operation, body: Value) {
        self.push(operation, None, Reply::ok(body), false);
    }

    /// Answer the next call of `operation` with `body`
    pub fn respond_once(&self, operation: Operation, body: Value) {
        self.push(operation, None, Reply::ok(body), true);
    }

    /// Answer calls of `operation` whose `key` parameter equals `value`
    pub fn respond_where(&self, operation: Operation, key: &str, value: &str, body: Value) {
        self.push(operation, Some((key, value)), Reply::ok(body), false);
    }

    pub fn reply(&self, operation: Operation, reply: Reply) {
        self.push(operation, None, reply, false);
    }

    pub fn reply_once(&self, operation: Operation, reply: Reply) {
        self.push(operation, None, reply, true);
    }

    /// Fail the next attempt of `operation` at the transport level
    pub fn fail_once(&self, operation: Operation, message: &str) {
        self.push(operation, None, Reply::Failure(message.to_string()), true);
    }

    /// Fail every attempt of `operation` at the transport level
    pub fn fail(&self, operation: Operation, message: &str) {
        self.push(operation, None, Reply::Failure(message.to_string()), false);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    pub fn requests_for(&self, operation: Operation) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.operation == operation)
            .cloned()
            .collect()
    }

    pub fn count(&self, operation: Operation) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.operation == operation)
            .count()
    }

    /// Operations in the order they were sent
    pub fn operations(&self) -> Vec<Operation> {
        self.requests.lock().iter().map(|request| request.operation).collect()
    }

    /// Forget recorded requests, keep the script
    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }

    fn next_reply(&self, request: &ApiRequest) -> Option<Reply> {
        let mut rules = self.rules.lock();

        if let Some(index) = rules.iter().position(|rule| rule.once && rule.matches(request)) {
            return Some(rules.remove(index).reply);
        }

        rules
            .iter()
            .rev()
            .find(|rule| !rule.once && rule.matches(request))
            .map(|rule| rule.reply.clone())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        self.requests.lock().push(request.clone());
        debug!("[MOCK] {} {:?}", request.operation, request.params);

        match self.next_reply(request) {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Failure(message)) => Err(TransportError(message)),
            None => Err(TransportError(format!("no reply scripted for {}", request.operation))),
        }
    }
}
