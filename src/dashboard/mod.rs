//! Dashboard lifecycle: upload, fetch, render, notify.

pub mod engine;
pub mod snapshot;
pub mod state;

pub use engine::{Dashboard, EngineOptions};
pub use snapshot::{MalformedPolicy, Snapshot};
pub use state::{transition, DashboardState, Effect, Event, Phase, ResponseOrdering};
