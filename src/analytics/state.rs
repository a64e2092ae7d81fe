use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;
use super::event::{session_log_prefix, AnalyticsDelta, ClientId};
use super::time::Moment;

pub const HOURS_PER_DAY: usize = 24;

/// Process-wide counters.
///
/// `today_requests <= total_requests` holds at all times: both are bumped together
/// and only `today_requests` is ever cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalCounters {
    pub total_requests: u64,
    pub today_requests: u64,
    pub errors: u64,
    /// `None` until the first call observes a day. A stale or missing marker
    /// triggers the daily reset.
    pub last_reset_day: Option<NaiveDate>,
    pub epoch_start: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSummary {
    pub request_count: u64,
    pub last_seen_at: DateTime<Utc>,
    #[serde(default)]
    pub question_lengths: VecDeque<usize>,
    /// Serialized as a sorted list; duplicates collapse on load.
    #[serde(default)]
    pub associated_sessions: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub started_at: DateTime<Utc>,
    pub question_count: u64,
    pub owner_client_id: ClientId,
    pub last_activity_at: DateTime<Utc>,
}

/// Bounds on per-client and per-session bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retention {
    pub max_clients: usize,
    pub max_sessions: usize,
    pub max_question_lengths: usize,
}

impl Default for Retention {
    fn default() -> Self {
        Self {
            max_clients: 10_000,
            max_sessions: 10_000,
            max_question_lengths: 200,
        }
    }
}

/// Everything the event store owns. This is also the persisted snapshot format:
/// field names are stable and every section defaults when missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsState {
    pub counters: GlobalCounters,
    /// Sparse hour-of-day -> count for the current day only.
    pub hourly_requests: BTreeMap<u8, u64>,
    pub clients: HashMap<ClientId, ClientSummary>,
    pub sessions: HashMap<String, SessionSummary>,
}

impl AnalyticsState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the stored day marker differs from `today`.
    pub fn is_stale(&self, today: NaiveDate) -> bool {
        self.counters.last_reset_day != Some(today)
    }

    /// Full 0..24 histogram, missing hours reported as zero.
    pub fn hourly_distribution(&self) -> [u64; HOURS_PER_DAY] {
        let mut dist = [0u64; HOURS_PER_DAY];
        for (&hour, &count) in &self.hourly_requests {
            if let Some(slot) = dist.get_mut(hour as usize) {
                *slot = count;
            }
        }
        dist
    }

    /// Pure reduction: State + Delta -> Mutated State.
    /// Returns true if anything changed.
    pub fn reduce(&mut self, delta: AnalyticsDelta, retention: &Retention) -> bool {
        match delta {
            AnalyticsDelta::DayObserved(today) => {
                if !self.is_stale(today) {
                    return false;
                }
                // STALE -> CURRENT_DAY. Totals, errors and the client/session maps survive.
                self.counters.today_requests = 0;
                self.hourly_requests.clear();
                self.counters.last_reset_day = Some(today);
                true
            }
            AnalyticsDelta::Error { at } => {
                self.mark_epoch(at);
                self.counters.errors += 1;
                true
            }
            AnalyticsDelta::Request { client, question_length, session, at } => {
                self.apply_request(client, question_length, session, at, retention);
                true
            }
        }
    }

    /// The first accounted event of any kind starts the epoch.
    fn mark_epoch(&mut self, at: Moment) {
        if self.counters.epoch_start.is_none() {
            self.counters.epoch_start = Some(at.at);
        }
    }

    fn apply_request(
        &mut self,
        client: ClientId,
        question_length: usize,
        session: Option<String>,
        at: Moment,
        retention: &Retention,
    ) {
        self.mark_epoch(at);
        self.counters.total_requests += 1;
        self.counters.today_requests += 1;
        *self.hourly_requests.entry(at.hour).or_insert(0) += 1;

        let is_new_client = !self.clients.contains_key(&client);
        let summary = self.clients.entry(client.clone()).or_insert_with(|| ClientSummary {
            request_count: 0,
            last_seen_at: at.at,
            question_lengths: VecDeque::new(),
            associated_sessions: BTreeSet::new(),
        });
        summary.request_count += 1;
        summary.last_seen_at = at.at;
        summary.question_lengths.push_back(question_length);
        while summary.question_lengths.len() > retention.max_question_lengths {
            summary.question_lengths.pop_front();
        }
        if let Some(id) = &session {
            summary.associated_sessions.insert(id.clone());
        }

        let mut new_session = None;
        if let Some(id) = session {
            if !self.sessions.contains_key(&id) {
                new_session = Some(id.clone());
            }
            let entry = self.sessions.entry(id.clone()).or_insert_with(|| SessionSummary {
                started_at: at.at,
                question_count: 0,
                owner_client_id: client.clone(),
                last_activity_at: at.at,
            });
            entry.question_count += 1;
            entry.last_activity_at = at.at;
        }

        if is_new_client {
            self.evict_clients(retention.max_clients, &client);
        }
        if let Some(id) = new_session {
            self.evict_sessions(retention.max_sessions, &id);
        }
    }

    /// Drops least-recently-seen clients until within `max`. Never drops `keep`.
    fn evict_clients(&mut self, max: usize, keep: &ClientId) {
        while self.clients.len() > max.max(1) {
            let oldest = self
                .clients
                .iter()
                .filter(|(id, _)| *id != keep)
                .min_by(|a, b| {
                    a.1.last_seen_at
                        .cmp(&b.1.last_seen_at)
                        .then_with(|| a.0.cmp(b.0))
                })
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    debug!(client = %id, "evicting idle client summary");
                    self.clients.remove(&id);
                }
                None => break,
            }
        }
    }

    /// Drops sessions with the oldest activity until within `max`. Never drops `keep`.
    fn evict_sessions(&mut self, max: usize, keep: &str) {
        while self.sessions.len() > max.max(1) {
            let oldest = self
                .sessions
                .iter()
                .filter(|(id, _)| id.as_str() != keep)
                .min_by(|a, b| {
                    a.1.last_activity_at
                        .cmp(&b.1.last_activity_at)
                        .then_with(|| a.0.cmp(b.0))
                })
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    debug!(session = %session_log_prefix(&id), "evicting idle session summary");
                    self.sessions.remove(&id);
                }
                None => break,
            }
        }
    }
}
