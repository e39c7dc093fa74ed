/*!
# Salien DevKit - offline test tooling

- `mock_transport`: scripted transport recording every request
- `fixtures`: JSON builders for planets, zones, player info, scores and bosses
- `harness`: sessions and controllers wired over the mock with fast timings
*/

pub mod fixtures;
pub mod harness;
pub mod mock_transport;

pub use harness::{fast_config, TestHarness};
pub use mock_transport::{MockTransport, Reply};
