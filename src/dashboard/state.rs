//! Pure dashboard state machine.
//!
//! `transition(state, event) -> (state, effects)`. The machine never performs
//! I/O itself; the engine executes the returned effects and feeds completions
//! back in as events, one at a time.
//!
//! ```text
//!   Idle --submit file--> Uploading --ok--> Fetching --ok--> (render) Idle
//!   Idle --refresh------> Fetching
//!   any async step --err--> Error --> Idle
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::snapshot::Snapshot;
use crate::api::UploadReceipt;
use crate::error::{DashboardError, FailureKind};
use crate::notify::Severity;

pub type RequestId = u64;

pub const NO_FILE_MESSAGE: &str = "Please select a file first.";
pub const UPLOAD_FAILED_MESSAGE: &str = "An error occurred while processing the file.";
pub const FETCH_FAILED_MESSAGE: &str = "Failed to load anomalies.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    Uploading,
    Fetching,
    /// Momentary: entered on failure and left in the same transition.
    Error,
}

/// How overlapping fetch responses are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOrdering {
    /// A response older than the snapshot on screen is discarded.
    #[default]
    LatestWins,
    /// Responses are applied in arrival order.
    Arrival,
}

#[derive(Debug)]
pub enum Event {
    /// User picked (or dropped) a file. `None` means nothing was selected.
    SubmitFile(Option<PathBuf>),
    /// Initial load or an explicit refresh.
    Refresh,
    UploadFinished {
        request: RequestId,
        result: Result<UploadReceipt, DashboardError>,
    },
    FetchFinished {
        request: RequestId,
        result: Result<Snapshot, DashboardError>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    StartUpload { request: RequestId, path: PathBuf },
    StartFetch { request: RequestId },
    Notify { message: String, severity: Severity },
    Render(Arc<Snapshot>),
    Entered(Phase),
    LoadingChanged(bool),
}

#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    ordering: ResponseOrdering,
    uploads_in_flight: usize,
    fetches_in_flight: usize,
    next_request: RequestId,
    snapshot: Option<Arc<Snapshot>>,
    last_failure: Option<FailureKind>,
}

impl DashboardState {
    pub fn new(ordering: ResponseOrdering) -> Self {
        Self {
            ordering,
            ..Self::default()
        }
    }

    /// State right after launch: the implicit initial load is already issued.
    pub fn startup(ordering: ResponseOrdering) -> (Self, Vec<Effect>) {
        transition(&Self::new(ordering), Event::Refresh)
    }

    pub fn phase(&self) -> Phase {
        if self.uploads_in_flight > 0 {
            Phase::Uploading
        } else if self.fetches_in_flight > 0 {
            Phase::Fetching
        } else {
            Phase::Idle
        }
    }

    /// True exactly while an upload or fetch is outstanding.
    pub fn is_loading(&self) -> bool {
        self.in_flight() > 0
    }

    pub fn in_flight(&self) -> usize {
        self.uploads_in_flight + self.fetches_in_flight
    }

    /// The snapshot currently on screen.
    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        self.snapshot.as_ref()
    }

    /// Failure that ended the most recent action, cleared when a new action starts.
    pub fn last_failure(&self) -> Option<FailureKind> {
        self.last_failure
    }

    fn issue_request(&mut self) -> RequestId {
        self.next_request += 1;
        self.next_request
    }

    fn start_fetch(&mut self, effects: &mut Vec<Effect>) {
        let request = self.issue_request();
        self.fetches_in_flight += 1;
        effects.push(Effect::StartFetch { request });
    }

    fn fail(&mut self, kind: FailureKind, message: String, effects: &mut Vec<Effect>) {
        self.last_failure = Some(kind);
        effects.push(Effect::Notify {
            message,
            severity: Severity::Danger,
        });
        effects.push(Effect::Entered(Phase::Error));
    }

    fn is_stale(&self, request: RequestId) -> bool {
        match (self.ordering, &self.snapshot) {
            (ResponseOrdering::LatestWins, Some(current)) => request < current.request,
            _ => false,
        }
    }
}

/// Apply one event. All resulting effects belong to a single atomic step.
pub fn transition(state: &DashboardState, event: Event) -> (DashboardState, Vec<Effect>) {
    let mut next = state.clone();
    let mut effects = Vec::new();
    let phase_before = state.phase();
    let loading_before = state.is_loading();

    match event {
        Event::SubmitFile(path) => {
            next.last_failure = None;
            match path.filter(|p| !p.as_os_str().is_empty()) {
                Some(path) => {
                    let request = next.issue_request();
                    next.uploads_in_flight += 1;
                    effects.push(Effect::StartUpload { request, path });
                }
                None => next.fail(
                    FailureKind::Validation,
                    NO_FILE_MESSAGE.to_string(),
                    &mut effects,
                ),
            }
        }

        Event::Refresh => {
            next.last_failure = None;
            next.start_fetch(&mut effects);
        }

        Event::UploadFinished { request, result } => {
            next.uploads_in_flight = next.uploads_in_flight.saturating_sub(1);
            match result {
                Ok(receipt) => {
                    effects.push(Effect::Notify {
                        message: upload_success_message(&receipt),
                        severity: Severity::Success,
                    });
                    next.start_fetch(&mut effects);
                }
                Err(err) => {
                    debug!(request, error = %err, "upload failed");
                    let message = match &err {
                        DashboardError::Transport(_) => UPLOAD_FAILED_MESSAGE.to_string(),
                        other => other.to_string(),
                    };
                    next.fail(err.kind(), message, &mut effects);
                }
            }
        }

        Event::FetchFinished { request, result } => {
            next.fetches_in_flight = next.fetches_in_flight.saturating_sub(1);
            match result {
                Ok(snapshot) if next.is_stale(request) => {
                    debug!(
                        request,
                        shown = snapshot.request,
                        "discarding response older than the snapshot on screen"
                    );
                }
                Ok(snapshot) => {
                    let rejected = snapshot.rejected;
                    let snapshot = Arc::new(snapshot);
                    next.snapshot = Some(Arc::clone(&snapshot));
                    effects.push(Effect::Render(snapshot));
                    if rejected > 0 {
                        effects.push(Effect::Notify {
                            message: skipped_records_message(rejected),
                            severity: Severity::Danger,
                        });
                    }
                }
                Err(err) if next.is_stale(request) => {
                    debug!(request, error = %err, "ignoring failure of a superseded fetch");
                }
                Err(err) => {
                    debug!(request, error = %err, "fetch failed");
                    let message = match &err {
                        DashboardError::Data(detail) => {
                            format!("Failed to load anomalies: {}", detail)
                        }
                        _ => FETCH_FAILED_MESSAGE.to_string(),
                    };
                    next.fail(err.kind(), message, &mut effects);
                }
            }
        }
    }

    let phase_after = next.phase();
    let failed = effects.contains(&Effect::Entered(Phase::Error));
    if phase_after != phase_before || failed {
        effects.push(Effect::Entered(phase_after));
    }
    if next.is_loading() != loading_before {
        effects.push(Effect::LoadingChanged(next.is_loading()));
    }

    (next, effects)
}

fn upload_success_message(receipt: &UploadReceipt) -> String {
    match receipt.anomalies_count {
        Some(count) => format!("File processed successfully. Found {} anomalies.", count),
        None => "File processed successfully.".to_string(),
    }
}

fn skipped_records_message(rejected: usize) -> String {
    match rejected {
        1 => "Skipped 1 malformed anomaly record.".to_string(),
        n => format!("Skipped {} malformed anomaly records.", n),
    }
}
