//! Request analytics for the ask endpoint.
//!
//! # PRIVACY INVARIANT
//! Analytics must **NEVER** hold user content or full network addresses.
//! Only anonymized client ids, caller-supplied session ids, question lengths,
//! timestamps and counts are stored.
//!
//! # DAY INVARIANT
//! Every call that touches the store first observes the local calendar day.
//! A stale day clears `today_requests` and the hourly histogram, and nothing else.

pub mod event;
pub mod fallback;
pub mod metrics;
pub mod recorder;
pub mod state;
pub mod store;
pub mod time;

pub use event::{resolve_client_address, ClientId};
pub use fallback::SimulatedFallback;
pub use metrics::{summarize, DataSource, ReportView};
pub use recorder::{EventStore, RecorderConfig};
pub use state::{AnalyticsState, ClientSummary, GlobalCounters, Retention, SessionSummary};
pub use store::{FileSnapshotStore, MemorySnapshotStore, PersistenceError, SnapshotStore};
pub use time::{Clock, ManualClock, SystemClock};
