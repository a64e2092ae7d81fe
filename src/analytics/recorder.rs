use std::fmt::Display;
use std::sync::Arc;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::event::{normalize_session, session_log_prefix, AnalyticsDelta, ClientId};
use super::fallback::SimulatedFallback;
use super::metrics::{hour_label, summarize, DataSource, ReportView};
use super::state::{AnalyticsState, Retention};
use super::store::SnapshotStore;
use super::time::{Clock, Moment, SystemClock};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderConfig {
    pub data_source: DataSource,
    pub retention: Retention,
    /// Bounded retries for a failing save. Always at least one attempt.
    pub save_attempts: u32,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            data_source: DataSource::Real,
            retention: Retention::default(),
            save_attempts: 2,
        }
    }
}

/// In-memory state plus whether it is ahead of the backing store.
#[derive(Debug, Default)]
struct Ledger {
    state: AnalyticsState,
    /// Set when every save attempt of a call failed. While set, the next call
    /// skips the reload so the unsaved increments are written, not overwritten.
    unsaved: bool,
}

/// The single owner of analytics state.
///
/// Every public operation runs reload -> reduce -> save under one lock, so two
/// concurrent requests can never lose an increment. None of them fail: persistence
/// problems are logged and the call carries on with the in-memory state.
pub struct EventStore {
    ledger: Mutex<Ledger>,
    backing: Option<Box<dyn SnapshotStore>>,
    clock: Arc<dyn Clock>,
    fallback: SimulatedFallback,
    config: RecorderConfig,
}

impl std::fmt::Debug for EventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStore")
            .field("backing", &self.backing.as_ref().map(|b| b.describe()))
            .field("config", &self.config)
            .finish()
    }
}

impl EventStore {
    /// In-memory only, system clock, real data.
    pub fn new() -> Self {
        Self::with_parts(None, Arc::new(SystemClock), RecorderConfig::default())
    }

    pub fn with_parts(
        backing: Option<Box<dyn SnapshotStore>>,
        clock: Arc<dyn Clock>,
        config: RecorderConfig,
    ) -> Self {
        Self {
            ledger: Mutex::new(Ledger::default()),
            backing,
            clock,
            fallback: SimulatedFallback::default(),
            config,
        }
    }

    /// Accounts one question. `client_ip` is the raw address; it is anonymized here.
    /// The question length is counted in UTF-16 code units, as browsers report it.
    pub fn record_request(
        &self,
        client_ip: Option<&str>,
        question: &str,
        session_id: Option<&str>,
    ) {
        let client = ClientId::anonymize(client_ip);
        let question_length = question.encode_utf16().count();
        let session = normalize_session(session_id);
        let now = Moment::observe(self.clock.as_ref());

        let mut ledger = self.ledger.lock();
        self.reload(&mut ledger);
        self.roll_day(&mut ledger.state, now);

        let state = &mut ledger.state;
        state.reduce(
            AnalyticsDelta::Request {
                client: client.clone(),
                question_length,
                session: session.clone(),
                at: now,
            },
            &self.config.retention,
        );

        let bucket = state.hourly_requests.get(&now.hour).copied().unwrap_or(0);
        info!(
            total = state.counters.total_requests,
            today = state.counters.today_requests,
            hour = %hour_label(now.hour),
            hour_count = bucket,
            client = %client,
            question_length,
            session = session.as_deref().map(session_log_prefix),
            "request recorded"
        );

        self.persist(&mut ledger);
    }

    /// Accounts one failed request. Client and session maps are untouched.
    pub fn record_error(&self, error: &dyn Display, client_ip: Option<&str>) {
        let client = ClientId::anonymize(client_ip);
        let now = Moment::observe(self.clock.as_ref());

        let mut ledger = self.ledger.lock();
        self.reload(&mut ledger);
        self.roll_day(&mut ledger.state, now);
        ledger.state.reduce(AnalyticsDelta::Error { at: now }, &self.config.retention);

        warn!(
            errors = ledger.state.counters.errors,
            client = %client,
            error = %error,
            "request error recorded"
        );

        self.persist(&mut ledger);
    }

    /// Read-only copy of the current state, after the daily-reset check.
    pub fn snapshot(&self) -> AnalyticsState {
        let now = Moment::observe(self.clock.as_ref());

        let mut ledger = self.ledger.lock();
        self.reload(&mut ledger);
        if self.roll_day(&mut ledger.state, now) {
            self.persist(&mut ledger);
        }
        ledger.state.clone()
    }

    /// The dashboard view, shaped by the configured data source.
    pub fn report(&self) -> ReportView {
        match self.config.data_source {
            DataSource::Real => summarize(&self.snapshot()),
            DataSource::Blended => {
                let real = summarize(&self.snapshot());
                self.fallback.blend(real, &mut rand::thread_rng())
            }
            DataSource::Simulated => {
                let now = Moment::observe(self.clock.as_ref());
                self.fallback.synthesize(now.hour, &mut rand::thread_rng())
            }
        }
    }

    fn reload(&self, ledger: &mut Ledger) {
        let Some(backing) = &self.backing else { return };
        if ledger.unsaved {
            debug!(store = %backing.describe(), "skipping reload; in-memory state not yet saved");
            return;
        }
        match backing.load() {
            Ok(Some(loaded)) => ledger.state = loaded,
            // Nothing saved yet; the in-memory state is authoritative until the first save.
            Ok(None) => {}
            Err(e) => warn!(
                store = %backing.describe(),
                error = %e,
                "snapshot load failed; using in-memory state"
            ),
        }
    }

    fn roll_day(&self, state: &mut AnalyticsState, now: Moment) -> bool {
        let previous = state.counters.last_reset_day;
        let rolled = state.reduce(AnalyticsDelta::DayObserved(now.day), &self.config.retention);
        if rolled {
            if let Some(previous) = previous {
                info!(from = %previous, to = %now.day, "daily counters reset");
            }
        }
        rolled
    }

    fn persist(&self, ledger: &mut Ledger) {
        let Some(backing) = &self.backing else { return };
        let attempts = self.config.save_attempts.max(1);
        for attempt in 1..=attempts {
            match backing.save(&ledger.state) {
                Ok(()) => {
                    ledger.unsaved = false;
                    return;
                }
                Err(e) if attempt < attempts => {
                    warn!(
                        store = %backing.describe(),
                        attempt,
                        error = %e,
                        "snapshot save failed; retrying"
                    );
                }
                Err(e) => {
                    warn!(
                        store = %backing.describe(),
                        attempt,
                        error = %e,
                        "snapshot save failed; continuing in memory"
                    );
                }
            }
        }
        ledger.unsaved = true;
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}
