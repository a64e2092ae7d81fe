use chrono::{TimeZone, Utc};
use copilot_ask::analytics::metrics::{average_turns, busiest_hour, hour_label, success_rate};
use copilot_ask::analytics::{summarize, AnalyticsState, ClientId, DataSource, SessionSummary};

fn session(questions: u64) -> SessionSummary {
    let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    SessionSummary {
        started_at: at,
        question_count: questions,
        owner_client_id: ClientId::anonymize(Some("203.0.113.42")),
        last_activity_at: at,
    }
}

#[test]
fn test_average_turns_per_session() {
    let mut state = AnalyticsState::new();
    state.sessions.insert("s1".into(), session(3));
    state.sessions.insert("s2".into(), session(1));

    let report = summarize(&state);
    assert_eq!(report.active_sessions, 2);
    assert_eq!(report.average_turns_per_session, 2.0);
}

#[test]
fn test_average_turns_without_sessions() {
    assert_eq!(average_turns(std::iter::empty()), 0.0);
    assert_eq!(summarize(&AnalyticsState::new()).average_turns_per_session, 0.0);
}

#[test]
fn test_success_rate_formatting() {
    assert_eq!(success_rate(20, 1), "95.0%");
    assert_eq!(success_rate(0, 0), "100%");
    assert_eq!(success_rate(0, 3), "100%", "No requests means nothing failed");
    assert_eq!(success_rate(3, 1), "66.7%");
    assert_eq!(success_rate(2, 5), "0.0%", "Errors beyond requests clamp to zero");
}

#[test]
fn test_busiest_hour_tie_goes_to_lowest() {
    let mut state = AnalyticsState::new();
    state.hourly_requests.insert(14, 5);
    state.hourly_requests.insert(9, 5);

    let report = summarize(&state);
    assert_eq!(report.busiest_hour, 9);
    assert_eq!(report.busiest_hour_label(), "9:00-10:00");
}

#[test]
fn test_busiest_hour_defaults_to_zero() {
    assert_eq!(busiest_hour(&[0; 24]), 0);
    assert_eq!(hour_label(23), "23:00-24:00");
}

#[test]
fn test_distribution_fills_missing_hours() {
    let mut state = AnalyticsState::new();
    state.counters.total_requests = 20;
    state.counters.today_requests = 7;
    state.counters.errors = 1;
    state.hourly_requests.insert(3, 2);
    state.hourly_requests.insert(22, 5);

    let report = summarize(&state);
    assert_eq!(report.data_source, DataSource::Real);
    assert_eq!(report.hourly_distribution.len(), 24);
    assert_eq!(report.hourly_distribution[3], 2);
    assert_eq!(report.hourly_distribution[22], 5);
    assert_eq!(report.hourly_distribution.iter().sum::<u64>(), 7);
    assert_eq!(report.busiest_hour, 22);
    assert_eq!(report.success_rate, "95.0%");
    assert_eq!(report.error_count, 1);
}

#[test]
fn test_summarize_is_pure() {
    let mut state = AnalyticsState::new();
    state.counters.total_requests = 4;
    state.hourly_requests.insert(11, 4);
    state.sessions.insert("s".into(), session(4));

    let before = state.clone();
    assert_eq!(summarize(&state), summarize(&state));
    assert_eq!(state, before);
}
