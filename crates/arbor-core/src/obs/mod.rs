//! Observability: in-process counters behind a metrics sink boundary.
//!
//! The core performs no logging of its own. Decode, encode, schema load and
//! validation calls emit `MetricsEvent`s that a caller can redirect with
//! [`with_metrics_sink`].

pub(crate) mod metrics;
pub(crate) mod sink;

pub use metrics::{EntityCounters, EntitySummary, EventOps, EventReport, EventState};
pub use sink::{MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink};
