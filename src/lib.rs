pub mod analytics;
pub mod config;
pub mod driver;

// Re-export the pieces hosts wire together
pub use analytics::recorder::EventStore;
pub use analytics::metrics::ReportView;
pub use config::AnalyticsConfig;
