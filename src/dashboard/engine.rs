use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::snapshot::{MalformedPolicy, Snapshot};
use super::state::{transition, DashboardState, Effect, Event, Phase, ResponseOrdering};
use crate::api::AnomalyApi;
use crate::notify::{Notifier, Severity};
use crate::render::{render_snapshot, RenderSink, TableOptions};

pub const RENDER_FAILED_MESSAGE: &str = "Failed to render dashboard";

/// Engine settings that do not belong to the pure state machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    pub ordering: ResponseOrdering,
    pub malformed: MalformedPolicy,
    pub table: TableOptions,
}

/// Owns the dashboard state and executes the machine's effects.
///
/// Round trips run as tokio tasks; their completions come back through a
/// channel and are applied one event at a time, so no handler ever sees a
/// half-applied transition.
pub struct Dashboard {
    api: Arc<dyn AnomalyApi>,
    sink: Box<dyn RenderSink>,
    notifier: Notifier,
    options: EngineOptions,
    state: DashboardState,
    loading: bool,
    completions_tx: mpsc::UnboundedSender<Event>,
    completions_rx: mpsc::UnboundedReceiver<Event>,
}

impl Dashboard {
    pub fn new(
        api: Arc<dyn AnomalyApi>,
        sink: Box<dyn RenderSink>,
        notifier: Notifier,
        options: EngineOptions,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            api,
            sink,
            notifier,
            options,
            state: DashboardState::new(options.ordering),
            loading: false,
            completions_tx,
            completions_rx,
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Loading indicator as last applied.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Issue the implicit initial load.
    pub fn boot(&mut self) {
        info!("loading anomalies");
        self.dispatch(Event::Refresh);
    }

    pub fn refresh(&mut self) {
        self.dispatch(Event::Refresh);
    }

    pub fn submit_file(&mut self, path: Option<PathBuf>) {
        self.dispatch(Event::SubmitFile(path));
    }

    /// Apply one event and execute its effects.
    pub fn dispatch(&mut self, event: Event) {
        let (next, effects) = transition(&self.state, event);
        self.state = next;
        for effect in effects {
            self.execute(effect);
        }
    }

    /// Apply completions until nothing is in flight.
    pub async fn settle(&mut self) {
        while self.state.in_flight() > 0 {
            match self.completions_rx.recv().await {
                Some(event) => self.dispatch(event),
                None => break,
            }
        }
    }

    /// Refresh every `period` until `shutdown` resolves.
    pub async fn watch<F>(&mut self, period: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick fires immediately; the boot load already covers it.
        ticker.tick().await;
        tokio::pin!(shutdown);

        info!(period_secs = period.as_secs_f64(), "watching for new anomalies");
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("watch stopped");
                    break;
                }
                _ = ticker.tick() => self.refresh(),
                Some(event) = self.completions_rx.recv() => self.dispatch(event),
            }
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::StartUpload { request, path } => {
                let api = Arc::clone(&self.api);
                let tx = self.completions_tx.clone();
                tokio::spawn(async move {
                    let result = api.upload(&path).await;
                    let _ = tx.send(Event::UploadFinished { request, result });
                });
            }
            Effect::StartFetch { request } => {
                let api = Arc::clone(&self.api);
                let tx = self.completions_tx.clone();
                let policy = self.options.malformed;
                tokio::spawn(async move {
                    let result = api
                        .fetch_anomalies()
                        .await
                        .and_then(|raw| Snapshot::build(request, raw, policy));
                    let _ = tx.send(Event::FetchFinished { request, result });
                });
            }
            Effect::Notify { message, severity } => {
                self.notifier.notify(message, severity);
            }
            Effect::Render(snapshot) => {
                if snapshot.rejected > 0 {
                    warn!(rejected = snapshot.rejected, "some anomaly records were rejected");
                }
                debug!(
                    request = snapshot.request,
                    total = snapshot.view.total_count,
                    "rendering snapshot"
                );
                if let Err(e) = render_snapshot(self.sink.as_mut(), &snapshot, self.options.table) {
                    error!("failed to render dashboard: {}", e);
                    self.notifier
                        .notify(format!("{}: {}", RENDER_FAILED_MESSAGE, e), Severity::Danger);
                }
            }
            Effect::Entered(Phase::Error) => {
                warn!(kind = ?self.state.last_failure(), "action failed");
            }
            Effect::Entered(phase) => {
                debug!(?phase, "dashboard phase");
            }
            Effect::LoadingChanged(loading) => {
                self.loading = loading;
                debug!(loading, "loading indicator");
            }
        }
    }
}
