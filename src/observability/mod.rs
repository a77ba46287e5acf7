//! Observability for the entry store
//!
//! - Structured logging through `tracing`
//! - Typed lifecycle and mutation events
//! - Lock-free counters
//!
//! Observability is read-only: nothing here influences store behavior.
//!
//! ```ignore
//! use xdbm::observability::{Event, Logger, ObservationScope};
//!
//! Logger::info(Event::EntryAdded.as_str(), &[("id", "2")]);
//!
//! let scope = ObservationScope::new(Event::IndexRebuild);
//! // ... do work ...
//! scope.complete();
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::ObservationScope;
