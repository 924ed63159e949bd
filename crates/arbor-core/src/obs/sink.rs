//! Metrics sink boundary.
//!
//! Codec and schema logic never touch `obs::metrics` directly: all
//! instrumentation flows through `MetricsEvent` and `MetricsSink`.
use crate::obs::metrics::{self, EventState};
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = RefCell::new(None);
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent<'a> {
    Decode {
        entity: &'a str,
        tokens: u64,
        data_errors: u64,
        failed: bool,
    },
    Encode {
        entity: &'a str,
        tokens: u64,
    },
    SchemaLoad {
        sources: u64,
        failed: bool,
    },
    Validate {
        entity: &'a str,
        issues: u64,
    },
    UnknownFieldSkipped {
        entity: &'a str,
        key: &'a str,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent<'_>);
}

/// GlobalMetricsSink
/// Default process-local sink that writes into the thread's metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

fn entity_entry<'m>(m: &'m mut EventState, entity: &str) -> &'m mut metrics::EntityCounters {
    m.entities.entry(entity.to_string()).or_default()
}

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent<'_>) {
        match event {
            MetricsEvent::Decode {
                entity,
                tokens,
                data_errors,
                failed,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.decode_calls = m.ops.decode_calls.saturating_add(1);
                    m.ops.tokens_decoded = m.ops.tokens_decoded.saturating_add(tokens);
                    m.ops.data_errors = m.ops.data_errors.saturating_add(data_errors);
                    if failed {
                        m.ops.decode_failures = m.ops.decode_failures.saturating_add(1);
                    }

                    let entry = entity_entry(m, entity);
                    entry.decode_calls = entry.decode_calls.saturating_add(1);
                    entry.data_errors = entry.data_errors.saturating_add(data_errors);
                });
            }

            MetricsEvent::Encode { entity, tokens } => {
                metrics::with_state_mut(|m| {
                    m.ops.encode_calls = m.ops.encode_calls.saturating_add(1);
                    m.ops.tokens_encoded = m.ops.tokens_encoded.saturating_add(tokens);

                    let entry = entity_entry(m, entity);
                    entry.encode_calls = entry.encode_calls.saturating_add(1);
                });
            }

            MetricsEvent::SchemaLoad { sources, failed } => {
                metrics::with_state_mut(|m| {
                    m.ops.schema_loads = m.ops.schema_loads.saturating_add(1);
                    m.ops.schema_sources = m.ops.schema_sources.saturating_add(sources);
                    if failed {
                        m.ops.schema_load_failures = m.ops.schema_load_failures.saturating_add(1);
                    }
                });
            }

            MetricsEvent::Validate { entity, issues } => {
                metrics::with_state_mut(|m| {
                    m.ops.validate_calls = m.ops.validate_calls.saturating_add(1);
                    m.ops.validation_issues = m.ops.validation_issues.saturating_add(issues);

                    let entry = entity_entry(m, entity);
                    entry.validate_calls = entry.validate_calls.saturating_add(1);
                    entry.validation_issues = entry.validation_issues.saturating_add(issues);
                });
            }

            MetricsEvent::UnknownFieldSkipped { entity, .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.unknown_fields_skipped = m.ops.unknown_fields_skipped.saturating_add(1);

                    let entry = entity_entry(m, entity);
                    entry.unknown_fields_skipped = entry.unknown_fields_skipped.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent<'_>) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // Preconditions:
        // - `ptr` was produced from a valid `&dyn MetricsSink` in `with_metrics_sink`.
        // - `with_metrics_sink` always restores the previous pointer before returning,
        //   including unwind paths via `Guard::drop`.
        // - `record` is synchronous and never stores `ptr` beyond this call.
        //
        // Aliasing:
        // - Only a shared reference is materialized, matching the shared borrow
        //   used to install the override.
        unsafe { (&*ptr).record(event) };
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the current metrics state.
///
/// `window_start_ms` filters by window start (`EventState::window_start_ms`),
/// not by per-event timestamps.
#[must_use]
pub fn metrics_report(window_start_ms: Option<u64>) -> metrics::EventReport {
    metrics::report_window_start(window_start_ms)
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
pub fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<*const dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // - `sink_ptr` is installed only for this dynamic scope.
    // - `Guard` restores the previous slot on all exits, including panic.
    // - `record` only dereferences synchronously and never persists `sink_ptr`.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| {
        let mut slot = cell.borrow_mut();
        slot.replace(sink_ptr)
    });
    let _guard = Guard(prev);

    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink<'a> {
        calls: &'a AtomicUsize,
    }

    impl MetricsSink for CountingSink<'_> {
        fn record(&self, _: MetricsEvent<'_>) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    const fn skipped() -> MetricsEvent<'static> {
        MetricsEvent::UnknownFieldSkipped {
            entity: "app::root",
            key: "bogus",
        }
    }

    #[test]
    fn with_metrics_sink_routes_and_restores_nested_overrides() {
        SINK_OVERRIDE.with(|cell| {
            *cell.borrow_mut() = None;
        });

        let outer_calls = AtomicUsize::new(0);
        let inner_calls = AtomicUsize::new(0);
        let outer = CountingSink {
            calls: &outer_calls,
        };
        let inner = CountingSink {
            calls: &inner_calls,
        };

        record(skipped());
        assert_eq!(outer_calls.load(Ordering::SeqCst), 0);

        with_metrics_sink(&outer, || {
            record(skipped());
            with_metrics_sink(&inner, || record(skipped()));
            record(skipped());
        });

        assert_eq!(outer_calls.load(Ordering::SeqCst), 2);
        assert_eq!(inner_calls.load(Ordering::SeqCst), 1);
        SINK_OVERRIDE.with(|cell| assert!(cell.borrow().is_none()));
    }

    #[test]
    fn with_metrics_sink_restores_override_on_panic() {
        SINK_OVERRIDE.with(|cell| {
            *cell.borrow_mut() = None;
        });

        let calls = AtomicUsize::new(0);
        let sink = CountingSink { calls: &calls };

        let panicked = catch_unwind(AssertUnwindSafe(|| {
            with_metrics_sink(&sink, || {
                record(skipped());
                panic!("intentional panic for guard test");
            });
        }))
        .is_err();
        assert!(panicked);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        SINK_OVERRIDE.with(|cell| assert!(cell.borrow().is_none()));
    }

    #[test]
    fn global_sink_accumulates_counters() {
        metrics_reset_all();

        record(MetricsEvent::Decode {
            entity: "app::root",
            tokens: 12,
            data_errors: 2,
            failed: false,
        });
        record(MetricsEvent::Decode {
            entity: "app::root",
            tokens: 3,
            data_errors: 0,
            failed: true,
        });
        record(skipped());

        let counters = metrics_report(None).counters.unwrap();
        assert_eq!(counters.ops.decode_calls, 2);
        assert_eq!(counters.ops.decode_failures, 1);
        assert_eq!(counters.ops.tokens_decoded, 15);
        assert_eq!(counters.ops.unknown_fields_skipped, 1);

        let root = &counters.entities["app::root"];
        assert_eq!(root.data_errors, 2);
        assert_eq!(root.unknown_fields_skipped, 1);
    }

    #[test]
    fn metrics_report_window_start_after_window_returns_empty() {
        metrics_reset_all();
        let window_start = metrics::with_state(|m| m.window_start_ms);
        record(skipped());

        let report = metrics_report(Some(window_start.saturating_add(1)));
        assert!(report.counters.is_none());
        assert!(report.entity_counters.is_empty());
    }
}
