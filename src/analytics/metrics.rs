use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use super::state::{AnalyticsState, HOURS_PER_DAY};

/// Where the figures in a report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Measured counters only.
    #[default]
    Real,
    /// Synthetic filler only. Nothing in the report was measured.
    Simulated,
    /// Measured counters, with synthetic filler added to the hourly distribution.
    Blended,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Real => "real",
            DataSource::Simulated => "simulated",
            DataSource::Blended => "blended",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "real" => Ok(DataSource::Real),
            "simulated" => Ok(DataSource::Simulated),
            "blended" => Ok(DataSource::Blended),
            other => Err(format!("unknown data source '{}'", other)),
        }
    }
}

/// Read-only statistics served to the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportView {
    pub data_source: DataSource,
    pub total_requests: u64,
    pub today_requests: u64,
    pub active_clients: usize,
    pub active_sessions: usize,
    pub average_turns_per_session: f64,
    pub error_count: u64,
    pub busiest_hour: u8,
    pub hourly_distribution: [u64; HOURS_PER_DAY],
    pub success_rate: String,
    pub epoch_start: Option<DateTime<Utc>>,
}

impl ReportView {
    /// Dashboard label for the busiest hour, e.g. `14:00-15:00`.
    pub fn busiest_hour_label(&self) -> String {
        hour_label(self.busiest_hour)
    }
}

pub fn hour_label(hour: u8) -> String {
    format!("{}:00-{}:00", hour, u32::from(hour) + 1)
}

/// Pure function: State -> ReportView. Deterministic, no side effects.
pub fn summarize(state: &AnalyticsState) -> ReportView {
    let hourly_distribution = state.hourly_distribution();
    let counters = &state.counters;

    ReportView {
        data_source: DataSource::Real,
        total_requests: counters.total_requests,
        today_requests: counters.today_requests,
        active_clients: state.clients.len(),
        active_sessions: state.sessions.len(),
        average_turns_per_session: average_turns(state.sessions.values().map(|s| s.question_count)),
        error_count: counters.errors,
        busiest_hour: busiest_hour(&hourly_distribution),
        hourly_distribution,
        success_rate: success_rate(counters.total_requests, counters.errors),
        epoch_start: counters.epoch_start,
    }
}

/// Mean turns per session, or 0.0 with no sessions.
pub fn average_turns(question_counts: impl Iterator<Item = u64>) -> f64 {
    let (sessions, turns) = question_counts.fold((0u64, 0u64), |(n, sum), c| (n + 1, sum + c));
    if sessions == 0 {
        return 0.0;
    }
    turns as f64 / sessions as f64
}

/// Hour with the highest count. Ties go to the lowest hour; an all-zero histogram yields 0.
pub fn busiest_hour(distribution: &[u64; HOURS_PER_DAY]) -> u8 {
    let mut best = 0usize;
    for (hour, &count) in distribution.iter().enumerate() {
        if count > distribution[best] {
            best = hour;
        }
    }
    best as u8
}

/// `(total - errors) / total` as a one-decimal percentage, `100%` with no requests.
/// More errors than requests clamps to `0.0%`.
pub fn success_rate(total_requests: u64, errors: u64) -> String {
    if total_requests == 0 {
        return "100%".to_string();
    }
    let succeeded = total_requests.saturating_sub(errors);
    format!("{:.1}%", succeeded as f64 / total_requests as f64 * 100.0)
}
