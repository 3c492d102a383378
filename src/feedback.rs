//! Feedback memory
//!
//! Closes the learning loop: callers rate an analysis, the engine adjusts
//! its confidence for that exact query key the next time around. Without
//! recorded feedback, effective confidence never moves.
//!
//! The cumulative delta for a key is recomputed from its counters on every
//! update and hard-bounded to [delta_floor, delta_ceiling]. Negative
//! feedback carries an extra fixed penalty so one bad rating outweighs one
//! good one.

use crate::config::EngineConfig;
use crate::db;
use crate::error::EngineResult;
use crate::types::FeedbackSignal;
use rusqlite::Connection;

/// Fixed penalty applied on top of the counters for a negative signal.
const NEGATIVE_BIAS: f64 = 0.15;

/// Record one signal for a query key and return the new cumulative delta.
pub fn record(
    conn: &Connection,
    config: &EngineConfig,
    normalized_query: &str,
    domain_id: &str,
    subdomain_id: &str,
    signal: FeedbackSignal,
) -> EngineResult<f64> {
    let mut row = db::get_feedback(conn, normalized_query, domain_id, subdomain_id)?
        .unwrap_or_default();

    match signal {
        FeedbackSignal::Positive => {
            row.positive_count += 1;
            row.cumulative_delta = (config.positive_feedback_step * row.positive_count as f64
                - config.negative_feedback_step * row.negative_count as f64)
                .min(config.delta_ceiling);
        }
        FeedbackSignal::Negative => {
            row.negative_count += 1;
            row.cumulative_delta = (config.positive_feedback_step * row.positive_count as f64
                - config.negative_feedback_step * row.negative_count as f64
                - NEGATIVE_BIAS)
                .max(config.delta_floor);
        }
    }

    db::upsert_feedback(conn, normalized_query, domain_id, subdomain_id, &row)?;
    tracing::debug!(
        query = normalized_query,
        domain = domain_id,
        subdomain = subdomain_id,
        signal = signal.name(),
        delta = row.cumulative_delta,
        "feedback recorded"
    );
    Ok(row.cumulative_delta)
}

/// Current delta for a query key; zero when nothing has been recorded.
pub fn lookup(
    conn: &Connection,
    normalized_query: &str,
    domain_id: &str,
    subdomain_id: &str,
) -> EngineResult<f64> {
    Ok(db::get_feedback(conn, normalized_query, domain_id, subdomain_id)?
        .map(|row| row.cumulative_delta)
        .unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db_in_memory;

    fn setup() -> (Connection, EngineConfig) {
        (init_db_in_memory().unwrap(), EngineConfig::default())
    }

    const KEY: (&str, &str, &str) = ("my phone was hacked", "cyber_law", "hacking");

    #[test]
    fn test_lookup_without_feedback_is_zero() {
        let (conn, _) = setup();
        assert_eq!(lookup(&conn, KEY.0, KEY.1, KEY.2).unwrap(), 0.0);
    }

    #[test]
    fn test_positive_steps_up() {
        let (conn, config) = setup();
        let d1 = record(&conn, &config, KEY.0, KEY.1, KEY.2, FeedbackSignal::Positive).unwrap();
        assert!((d1 - 0.10).abs() < 1e-9);
        let d2 = record(&conn, &config, KEY.0, KEY.1, KEY.2, FeedbackSignal::Positive).unwrap();
        assert!((d2 - 0.20).abs() < 1e-9);
        assert_eq!(lookup(&conn, KEY.0, KEY.1, KEY.2).unwrap(), d2);
    }

    #[test]
    fn test_positive_saturates_at_ceiling() {
        let (conn, config) = setup();
        let mut last = 0.0;
        for _ in 0..6 {
            last = record(&conn, &config, KEY.0, KEY.1, KEY.2, FeedbackSignal::Positive).unwrap();
        }
        assert!((last - config.delta_ceiling).abs() < 1e-9, "delta was {}", last);
    }

    #[test]
    fn test_negative_saturates_at_floor() {
        let (conn, config) = setup();
        let d1 = record(&conn, &config, KEY.0, KEY.1, KEY.2, FeedbackSignal::Negative).unwrap();
        assert!((d1 - config.delta_floor).abs() < 1e-9, "delta was {}", d1);
        // Further negatives stay pinned to the floor.
        let d2 = record(&conn, &config, KEY.0, KEY.1, KEY.2, FeedbackSignal::Negative).unwrap();
        assert!((d2 - config.delta_floor).abs() < 1e-9);
    }

    #[test]
    fn test_mixed_signals_balance() {
        let (conn, config) = setup();
        for _ in 0..3 {
            record(&conn, &config, KEY.0, KEY.1, KEY.2, FeedbackSignal::Positive).unwrap();
        }
        // 3 positives then 1 negative: 0.30 - 0.05 - 0.15 = 0.10.
        let d = record(&conn, &config, KEY.0, KEY.1, KEY.2, FeedbackSignal::Negative).unwrap();
        assert!((d - 0.10).abs() < 1e-9, "delta was {}", d);
    }

    #[test]
    fn test_delta_always_within_bounds() {
        let (conn, config) = setup();
        for i in 0..20 {
            let signal = if i % 3 == 0 {
                FeedbackSignal::Negative
            } else {
                FeedbackSignal::Positive
            };
            let d = record(&conn, &config, KEY.0, KEY.1, KEY.2, signal).unwrap();
            assert!(
                d >= config.delta_floor && d <= config.delta_ceiling,
                "delta {} out of bounds",
                d
            );
        }
    }

    #[test]
    fn test_keys_are_independent() {
        let (conn, config) = setup();
        record(&conn, &config, KEY.0, KEY.1, KEY.2, FeedbackSignal::Positive).unwrap();
        assert_eq!(lookup(&conn, "other query", KEY.1, KEY.2).unwrap(), 0.0);
        assert_eq!(lookup(&conn, KEY.0, "family_law", KEY.2).unwrap(), 0.0);
    }
}
