/*!
Test harness for game sessions

Wires a [`GameApi`], [`RoundController`] or [`Session`] over a
[`MockTransport`] with short timings, and offers assertions on the calls that
were made.
*/

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use salien_core::api::Operation;
use salien_core::{GameApi, RetryPolicy, RoundController, RoundTimings, Session, SessionConfig};
use serde_json::Value;

use crate::fixtures;
use crate::mock_transport::MockTransport;

pub const TEST_TOKEN: &str = "0123456789abcdef0123456789abcdef";

/// Timings short enough for real-time tests; paused-clock tests do not care
pub fn fast_timings() -> RoundTimings {
    RoundTimings {
        round_window: Duration::from_secs(2),
        prefetch_lead: Duration::from_millis(500),
        restart_delay: Duration::from_millis(10),
        boss_tick: Duration::from_millis(10),
    }
}

pub fn fast_config() -> SessionConfig {
    let mut config = SessionConfig::new(TEST_TOKEN);
    config.name = "test".to_string();
    config.timings = fast_timings();
    config.retry = RetryPolicy {
        max_retries: 2,
        retry_delay: Duration::from_millis(1),
    };
    config
}

pub struct TestHarness {
    pub transport: Arc<MockTransport>,
    pub config: SessionConfig,
}

impl TestHarness {
    pub fn new() -> Self {
        tracing_subscriber::fmt().with_test_writer().try_init().ok();

        Self {
            transport: MockTransport::shared(),
            config: fast_config(),
        }
    }

    pub fn with_config(mut self, edit: impl FnOnce(&mut SessionConfig)) -> Self {
        edit(&mut self.config);
        self
    }

    pub fn api(&self) -> GameApi {
        GameApi::new(self.transport.clone(), self.config.token.clone())
            .with_options(self.config.call_options())
    }

    pub fn controller(&self) -> RoundController {
        RoundController::new(self.api(), Arc::new(self.config.clone()))
    }

    pub fn session(&self) -> Session {
        Session::new(Arc::new(self.config.clone()), self.transport.clone())
    }

    /// Script GetPlanets and one GetPlanet reply per planet
    pub fn script_planets(&self, planets: &[(&str, Vec<Value>)]) {
        let summaries = planets
            .iter()
            .map(|(id, _)| fixtures::planet_summary(id, &format!("Planet {}", id), 0.5, 1000))
            .collect();
        self.transport
            .respond(Operation::GetPlanets, fixtures::planets(summaries));

        for (id, zones) in planets {
            self.transport.respond_where(
                Operation::GetPlanet,
                "id",
                id,
                fixtures::planet_detail(id, zones.clone()),
            );
        }
    }

    /// Script GetPlayerInfo replies in order; the last one stays
    pub fn script_player_info(&self, replies: Vec<Value>) {
        let mut replies = replies;
        if let Some(last) = replies.pop() {
            for reply in replies {
                self.transport.respond_once(Operation::GetPlayerInfo, reply);
            }
            self.transport.respond(Operation::GetPlayerInfo, last);
        }
    }

    pub fn count(&self, operation: Operation) -> usize {
        self.transport.count(operation)
    }

    pub fn assert_called(&self, operation: Operation, times: usize) -> Result<()> {
        let actual = self.transport.count(operation);
        if actual != times {
            bail!(
                "expected {} calls to {}, got {} ({:?})",
                times,
                operation,
                actual,
                self.transport.operations()
            );
        }
        Ok(())
    }

    pub fn assert_not_called(&self, operation: Operation) -> Result<()> {
        self.assert_called(operation, 0)
    }

    /// Some call of `operation` carried `key=value`
    pub fn assert_param(&self, operation: Operation, key: &str, value: &str) -> Result<()> {
        let requests = self.transport.requests_for(operation);
        if requests.iter().any(|request| request.param(key) == Some(value)) {
            return Ok(());
        }

        let seen: Vec<Option<&str>> = requests.iter().map(|request| request.param(key)).collect();
        bail!("no {} call with {}={} (saw {:?})", operation, key, value, seen);
    }

    /// `first` was sent before `second`
    pub fn assert_order(&self, first: Operation, second: Operation) -> Result<()> {
        let operations = self.transport.operations();
        let first_at = operations.iter().position(|op| *op == first);
        let second_at = operations.iter().rposition(|op| *op == second);

        match (first_at, second_at) {
            (Some(a), Some(b)) if a < b => Ok(()),
            _ => bail!("expected {} before {} in {:?}", first, second, operations),
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
