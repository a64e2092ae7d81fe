//! Synthetic filler for dashboards with no real data behind them.
//!
//! Every report produced here is tagged with its [`DataSource`], so synthetic
//! figures are never presented as measured ones.

use rand::Rng;
use super::metrics::{self, DataSource, ReportView};
use super::state::HOURS_PER_DAY;

/// Uniform range per bucket: `[low, low + span)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketRange {
    pub low: u64,
    pub span: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedFallback {
    /// 09:00-17:59
    pub business: BucketRange,
    /// 19:00-23:59
    pub evening: BucketRange,
    pub off_hours: BucketRange,
}

impl Default for SimulatedFallback {
    fn default() -> Self {
        Self {
            business: BucketRange { low: 5, span: 15 },
            evening: BucketRange { low: 2, span: 10 },
            off_hours: BucketRange { low: 0, span: 3 },
        }
    }
}

impl SimulatedFallback {
    pub fn range_for(&self, hour: usize) -> BucketRange {
        match hour {
            9..=17 => self.business,
            19..=23 => self.evening,
            _ => self.off_hours,
        }
    }

    /// Filler histogram with no live bump.
    pub fn filler<R: Rng + ?Sized>(&self, rng: &mut R) -> [u64; HOURS_PER_DAY] {
        let mut hist = [0u64; HOURS_PER_DAY];
        for (hour, slot) in hist.iter_mut().enumerate() {
            let range = self.range_for(hour);
            *slot = range.low + if range.span > 0 { rng.gen_range(0..range.span) } else { 0 };
        }
        hist
    }

    /// Synthetic histogram with the current hour bumped by one for "live" activity.
    pub fn generate<R: Rng + ?Sized>(&self, current_hour: u8, rng: &mut R) -> [u64; HOURS_PER_DAY] {
        let mut hist = self.filler(rng);
        if let Some(slot) = hist.get_mut(current_hour as usize) {
            *slot += 1;
        }
        hist
    }

    /// Fully synthetic report. Totals and the busiest hour derive from the
    /// synthetic histogram; the remaining fields are drawn independently.
    pub fn synthesize<R: Rng + ?Sized>(&self, current_hour: u8, rng: &mut R) -> ReportView {
        let hourly_distribution = self.generate(current_hour, rng);
        let histogram_total: u64 = hourly_distribution.iter().sum();

        let total_requests = histogram_total + rng.gen_range(0..50);
        let today_requests = histogram_total * 3 / 10;
        let error_count = rng.gen_range(0..5);
        let average_turns = rng.gen_range(1.5..4.5_f64);

        ReportView {
            data_source: DataSource::Simulated,
            total_requests,
            today_requests,
            active_clients: rng.gen_range(5..25),
            active_sessions: rng.gen_range(3..18),
            average_turns_per_session: (average_turns * 10.0).round() / 10.0,
            error_count,
            busiest_hour: metrics::busiest_hour(&hourly_distribution),
            hourly_distribution,
            success_rate: metrics::success_rate(total_requests, error_count),
            epoch_start: None,
        }
    }

    /// Adds filler onto a measured report's hourly distribution. Every other
    /// field stays measured.
    pub fn blend<R: Rng + ?Sized>(&self, mut real: ReportView, rng: &mut R) -> ReportView {
        let filler = self.filler(rng);
        for (slot, extra) in real.hourly_distribution.iter_mut().zip(filler) {
            *slot += extra;
        }
        real.busiest_hour = metrics::busiest_hour(&real.hourly_distribution);
        real.data_source = DataSource::Blended;
        real
    }
}
