use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{cell::RefCell, cmp::Ordering, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters for codec, schema and validation calls.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub entities: BTreeMap<String, EntityCounters>,
    pub window_start_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            entities: BTreeMap::new(),
            window_start_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Decoding
    pub decode_calls: u64,
    pub decode_failures: u64,
    pub tokens_decoded: u64,
    pub data_errors: u64,
    pub unknown_fields_skipped: u64,

    // Encoding
    pub encode_calls: u64,
    pub tokens_encoded: u64,

    // Schema loading
    pub schema_loads: u64,
    pub schema_load_failures: u64,
    pub schema_sources: u64,

    // Validation
    pub validate_calls: u64,
    pub validation_issues: u64,
}

///
/// EntityCounters
/// Counters keyed by the qualified name of the root entity involved.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntityCounters {
    pub decode_calls: u64,
    pub data_errors: u64,
    pub unknown_fields_skipped: u64,
    pub encode_calls: u64,
    pub validate_calls: u64,
    pub validation_issues: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

#[expect(clippy::cast_sign_loss)]
fn now_millis() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters and restart the window.
pub fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    /// Ephemeral runtime counters since `window_start_ms`.
    pub counters: Option<EventState>,
    /// Per-entity counters and averages.
    pub entity_counters: Vec<EntitySummary>,
}

///
/// EntitySummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntitySummary {
    pub path: String,
    pub decode_calls: u64,
    pub encode_calls: u64,
    pub validate_calls: u64,
    pub data_errors: u64,
    pub unknown_fields_skipped: u64,
    pub avg_data_errors_per_decode: f64,
    pub avg_issues_per_validate: f64,
}

#[expect(clippy::cast_precision_loss)]
fn average(total: u64, calls: u64) -> f64 {
    if calls > 0 {
        total as f64 / calls as f64
    } else {
        0.0
    }
}

/// Build a report from in-memory counters. A window start later than the
/// current window yields an empty report.
#[must_use]
pub fn report_window_start(window_start_ms: Option<u64>) -> EventReport {
    let snap = with_state(Clone::clone);
    if window_start_ms.is_some_and(|start| start > snap.window_start_ms) {
        return EventReport::default();
    }

    let mut entity_counters: Vec<EntitySummary> = snap
        .entities
        .iter()
        .map(|(path, c)| EntitySummary {
            path: path.clone(),
            decode_calls: c.decode_calls,
            encode_calls: c.encode_calls,
            validate_calls: c.validate_calls,
            data_errors: c.data_errors,
            unknown_fields_skipped: c.unknown_fields_skipped,
            avg_data_errors_per_decode: average(c.data_errors, c.decode_calls),
            avg_issues_per_validate: average(c.validation_issues, c.validate_calls),
        })
        .collect();

    entity_counters.sort_by(|a, b| {
        match b
            .avg_data_errors_per_decode
            .partial_cmp(&a.avg_data_errors_per_decode)
            .unwrap_or(Ordering::Equal)
        {
            Ordering::Equal => match b.decode_calls.cmp(&a.decode_calls) {
                Ordering::Equal => a.path.cmp(&b.path),
                other => other,
            },
            other => other,
        }
    });

    EventReport {
        counters: Some(snap),
        entity_counters,
    }
}

///
/// TESTS
///

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn reset_all_clears_state() {
        with_state_mut(|m| {
            m.ops.decode_calls = 3;
            m.ops.tokens_encoded = 2;
            m.entities.insert(
                "app::root".to_string(),
                EntityCounters {
                    decode_calls: 1,
                    ..Default::default()
                },
            );
        });

        reset_all();

        with_state(|m| {
            assert_eq!(m.ops.decode_calls, 0);
            assert_eq!(m.ops.tokens_encoded, 0);
            assert!(m.entities.is_empty());
        });
    }

    #[test]
    fn report_sorts_entities_by_average_errors() {
        reset_all();
        with_state_mut(|m| {
            m.entities.insert(
                "alpha".to_string(),
                EntityCounters {
                    decode_calls: 2,
                    data_errors: 6,
                    ..Default::default()
                },
            );
            m.entities.insert(
                "beta".to_string(),
                EntityCounters {
                    decode_calls: 1,
                    data_errors: 5,
                    ..Default::default()
                },
            );
            m.entities.insert(
                "gamma".to_string(),
                EntityCounters {
                    decode_calls: 2,
                    data_errors: 6,
                    ..Default::default()
                },
            );
        });

        let report = report_window_start(None);
        let paths: Vec<_> = report
            .entity_counters
            .iter()
            .map(|e| e.path.as_str())
            .collect();

        // avg errors per decode desc, then decode calls desc, then path asc
        assert_eq!(paths, ["beta", "alpha", "gamma"]);
        assert_eq!(report.entity_counters[0].avg_data_errors_per_decode, 5.0);
        assert_eq!(report.entity_counters[1].avg_data_errors_per_decode, 3.0);
    }
}
