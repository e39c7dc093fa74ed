/*!
# salien-core

Game logic of the Saliens minigame client:
- `api`: retrying client, HTTP transport and typed remote operations
- `ranking` / `selector`: choose the best zone and planet from a scan
- `reconciler`: drive the remote session onto the desired planet
- `round` / `session`: round state machine and restart supervisor
*/

pub mod api;
pub mod error;
pub mod models;
pub mod ranking;
pub mod reconciler;
pub mod round;
pub mod scanner;
pub mod score;
pub mod selector;
pub mod session;

pub use api::{CallOptions, EResult, GameApi, Operation, ReqwestTransport, RetryingClient, Transport};
pub use error::{ApiError, AttemptFailure, Result, SalienError, TransportError};
pub use models::{CycleState, KnownPlanets, PlanetSnapshot, SelectedTarget, SessionBelief, Zone};
pub use reconciler::{ReconcileError, Reconciler};
pub use round::{BossTactics, RestartReason, RoundController, RoundOutcome, RoundTimings};
pub use session::{RetryPolicy, Session, SessionConfig, SessionStats};
