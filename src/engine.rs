//! Analysis orchestrator
//!
//! The `Engine` owns the corpus, taxonomy, classifier model, and the
//! persistent store, and composes them into the two public operations:
//! `analyze` and `submit_feedback`. Construction loads everything once;
//! after that the corpus, taxonomy, and model are shared read-only, while
//! store writes serialize through one connection lock.
//!
//! An analyze call never fails for a well-formed request: a query with no
//! signal ends up in `other.general` at low confidence, and a failed event
//! append downgrades to `persisted = false` instead of erroring.

use crate::classifier::DomainClassifier;
use crate::config::EngineConfig;
use crate::constitutional;
use crate::corpus::Corpus;
use crate::db;
use crate::error::{EngineError, EngineResult};
use crate::feedback;
use crate::normalize::normalize;
use crate::retrieval;
use crate::session::SessionRegistry;
use crate::taxonomy::Taxonomy;
use crate::types::*;
use chrono::Utc;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;
use uuid::Uuid;

pub struct Engine {
    corpus: Corpus,
    taxonomy: Taxonomy,
    classifier: DomainClassifier,
    config: EngineConfig,
    conn: Mutex<Connection>,
    sessions: Mutex<SessionRegistry>,
}

impl Engine {
    /// Assemble an engine from already-loaded parts and an open store.
    pub fn new(
        corpus: Corpus,
        taxonomy: Taxonomy,
        config: EngineConfig,
        conn: Connection,
    ) -> Self {
        let classifier = DomainClassifier::new(&config);
        if classifier.is_degraded() {
            tracing::info!("running in taxonomy-only classification mode");
        }
        Self {
            corpus,
            taxonomy,
            classifier,
            config,
            conn: Mutex::new(conn),
            sessions: Mutex::new(SessionRegistry::default()),
        }
    }

    /// Built-in corpus and taxonomy with a store at `path`.
    pub fn open(path: &Path, config: EngineConfig) -> EngineResult<Self> {
        let conn = db::init_db(path)?;
        Ok(Self::new(Corpus::builtin()?, Taxonomy::builtin(), config, conn))
    }

    /// Built-in corpus and taxonomy with an ephemeral in-memory store.
    pub fn open_in_memory(config: EngineConfig) -> EngineResult<Self> {
        let conn = db::init_db_in_memory()?;
        Ok(Self::new(Corpus::builtin()?, Taxonomy::builtin(), config, conn))
    }

    fn lock_conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Analyze one query within a session.
    pub fn analyze(&self, session_id: &str, raw_query: &str) -> EngineResult<AnalysisResult> {
        if session_id.trim().is_empty() {
            return Err(EngineError::EmptySession);
        }
        let normalized_query = normalize(raw_query);
        if normalized_query.is_empty() {
            return Err(EngineError::EmptyQuery);
        }

        let started = Instant::now();
        let expired = |started: &Instant| {
            self.config
                .deadline
                .map(|d| started.elapsed() >= d)
                .unwrap_or(false)
        };

        let domain = self
            .classifier
            .classify(&self.taxonomy, &self.config, &normalized_query);
        let subdomain = self.classifier.classify_subdomain(
            &self.taxonomy,
            &domain.domain_id,
            &normalized_query,
            domain.forced_subdomain.as_ref(),
        );
        tracing::debug!(
            domain = %domain.domain_id,
            subdomain = %subdomain.subdomain_id,
            confidence = domain.base_confidence,
            "query classified"
        );

        let mut partial = false;
        let mut sections_degraded = false;
        let mut articles_degraded = false;

        let sections = if expired(&started) {
            partial = true;
            sections_degraded = true;
            SectionLists::default()
        } else {
            retrieval::retrieve(
                &self.corpus,
                &self.taxonomy,
                &domain.domain_id,
                &subdomain.subdomain_id,
                &normalized_query,
            )
        };

        let constitutional = if expired(&started) {
            partial = true;
            articles_degraded = true;
            Vec::new()
        } else {
            constitutional::rank(&self.corpus, &domain.domain_id, &normalized_query)
        };

        let conn = self.lock_conn();
        let delta = feedback::lookup(
            &conn,
            &normalized_query,
            &domain.domain_id,
            &subdomain.subdomain_id,
        )
        .unwrap_or_else(|e| {
            tracing::warn!("feedback lookup failed, using zero delta: {}", e);
            0.0
        });
        let effective_confidence = (domain.base_confidence + delta).clamp(0.0, 1.0);

        let event = QueryEvent {
            event_id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            kind: QueryEventKind::Analysis,
            timestamp: Utc::now(),
            raw_query: raw_query.to_string(),
            normalized_query: normalized_query.clone(),
            domain_id: domain.domain_id.clone(),
            subdomain_id: subdomain.subdomain_id.clone(),
            base_confidence: domain.base_confidence,
            effective_confidence,
            retrieved_section_ids: sections.identities(),
            retrieved_article_numbers: constitutional.iter().map(|a| a.number.clone()).collect(),
        };

        let persisted = match db::append_event(&conn, &event) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("event append failed, result not persisted: {}", e);
                false
            }
        };
        drop(conn);

        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .record_event(session_id, &event.event_id);

        Ok(AnalysisResult {
            event_id: event.event_id,
            timestamp: event.timestamp,
            raw_query: raw_query.to_string(),
            normalized_query,
            domain_display: self.taxonomy.display(&domain.domain_id),
            domain_confidence: domain.base_confidence,
            subdomain_display: self
                .taxonomy
                .subdomain_display(&domain.domain_id, &subdomain.subdomain_id),
            domain_id: domain.domain_id,
            subdomain_id: subdomain.subdomain_id,
            subdomain_confidence: subdomain.confidence,
            sections,
            constitutional,
            alternatives: domain.alternatives,
            base_confidence: domain.base_confidence,
            effective_confidence,
            partial,
            persisted,
            sections_degraded,
            articles_degraded,
        })
    }

    /// Apply a feedback signal to a previously returned event. Repeating
    /// the same (event, signal) pair leaves the state unchanged.
    pub fn submit_feedback(
        &self,
        session_id: &str,
        event_id: &str,
        signal: FeedbackSignal,
    ) -> EngineResult<FeedbackOutcome> {
        if session_id.trim().is_empty() {
            return Err(EngineError::EmptySession);
        }

        let conn = self.lock_conn();
        let event = db::get_event(&conn, event_id)?
            .ok_or_else(|| EngineError::UnknownEvent(event_id.to_string()))?;

        let newly_applied = db::mark_feedback_applied(&conn, event_id, signal.name())?;
        if newly_applied {
            feedback::record(
                &conn,
                &self.config,
                &event.normalized_query,
                &event.domain_id,
                &event.subdomain_id,
                signal,
            )?;
        }

        let delta = feedback::lookup(
            &conn,
            &event.normalized_query,
            &event.domain_id,
            &event.subdomain_id,
        )?;
        let new_effective_confidence = (event.base_confidence + delta).clamp(0.0, 1.0);

        // The original event stays untouched; the application is logged as
        // its own record.
        let feedback_event = QueryEvent {
            event_id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            kind: QueryEventKind::Feedback,
            timestamp: Utc::now(),
            raw_query: event.raw_query.clone(),
            normalized_query: event.normalized_query.clone(),
            domain_id: event.domain_id.clone(),
            subdomain_id: event.subdomain_id.clone(),
            base_confidence: event.base_confidence,
            effective_confidence: new_effective_confidence,
            retrieved_section_ids: Vec::new(),
            retrieved_article_numbers: Vec::new(),
        };
        db::append_event(&conn, &feedback_event)?;

        Ok(FeedbackOutcome {
            event_id: event_id.to_string(),
            new_effective_confidence,
        })
    }

    /// Feedback against the session's most recent analysis.
    pub fn submit_feedback_last(
        &self,
        session_id: &str,
        signal: FeedbackSignal,
    ) -> EngineResult<FeedbackOutcome> {
        let last = self
            .sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last_event_id(session_id)
            .ok_or_else(|| EngineError::UnknownEvent(format!("no events in session {}", session_id)))?;
        self.submit_feedback(session_id, &last, signal)
    }

    /// Events newest first, optionally scoped to one session.
    pub fn history(
        &self,
        session_id: Option<&str>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> EngineResult<Vec<QueryEvent>> {
        db::list_events(&self.lock_conn(), session_id, limit, offset)
    }

    /// Substring search over raw queries and domain display names.
    pub fn search_history(&self, needle: &str) -> EngineResult<Vec<QueryEvent>> {
        let domain_ids = self.taxonomy.domain_ids_matching_display(needle);
        db::search_events(&self.lock_conn(), needle, &domain_ids)
    }

    pub fn stats(&self) -> EngineResult<EngineStats> {
        Ok(EngineStats {
            bns_section_count: self.corpus.section_count(CodeBook::Bns),
            ipc_section_count: self.corpus.section_count(CodeBook::Ipc),
            crpc_section_count: self.corpus.section_count(CodeBook::Crpc),
            article_count: self.corpus.article_count(),
            total_events: db::count_events(&self.lock_conn())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Engine {
        Engine::open_in_memory(EngineConfig::default()).unwrap()
    }

    // =========================================================================
    // end-to-end scenarios
    // =========================================================================

    #[test]
    fn test_kidnapping_scenario() {
        let engine = setup();
        let result = engine.analyze("s1", "My child was kidnapped for ransom").unwrap();

        assert_eq!(result.domain_id, "criminal_law");
        assert_eq!(result.subdomain_id, "kidnapping_abduction");
        assert!(!result.sections.bns.is_empty());
        assert!(result
            .sections
            .bns
            .iter()
            .any(|s| s.keywords.iter().any(|k| k.contains("kidnap"))));
        assert!(result.sections.ipc.iter().any(|s| s.number == "364A"));
        assert!(result.sections.crpc.iter().any(|s| s.number == "154"));

        let a21 = result
            .constitutional
            .iter()
            .find(|a| a.number == "21")
            .expect("article 21 expected");
        assert!(a21.percent >= 30);
        assert!(result.persisted);
    }

    #[test]
    fn test_airport_drug_priority_scenario() {
        let engine = setup();
        let result = engine.analyze("s1", "Caught with drugs at airport").unwrap();
        assert_eq!(result.domain_id, "criminal_law");
        assert_eq!(result.subdomain_id, "drug_crime");
        assert!(result.domain_confidence >= 0.85);
    }

    #[test]
    fn test_unknown_query_scenario() {
        let engine = setup();
        let result = engine.analyze("s1", "zzz qqq").unwrap();
        assert_eq!(result.domain_id, "other");
        assert_eq!(result.subdomain_id, "general");
        assert_eq!(result.effective_confidence, 0.15);
        assert!(result.sections.is_empty());
        assert!(result.constitutional.is_empty());
    }

    #[test]
    fn test_feedback_monotonicity_scenario() {
        let engine = setup();
        let query = "my phone was hacked";

        let r0 = engine.analyze("s1", query).unwrap();
        let c0 = r0.effective_confidence;

        engine
            .submit_feedback("s1", &r0.event_id, FeedbackSignal::Positive)
            .unwrap();
        let r1 = engine.analyze("s1", query).unwrap();
        let c1 = r1.effective_confidence;

        engine
            .submit_feedback("s1", &r1.event_id, FeedbackSignal::Positive)
            .unwrap();
        let c2 = engine.analyze("s1", query).unwrap().effective_confidence;

        assert!(c0 <= c1, "c0={} c1={}", c0, c1);
        assert!(c1 <= c2, "c1={} c2={}", c1, c2);
        assert!(c2 <= (c0 + 0.30) + 1e-9, "c2={} exceeds c0+0.30", c2);
    }

    #[test]
    fn test_negative_feedback_lowers_confidence() {
        let engine = setup();
        let r0 = engine.analyze("s1", "my landlord kept my security deposit").unwrap();
        let outcome = engine
            .submit_feedback("s1", &r0.event_id, FeedbackSignal::Negative)
            .unwrap();
        assert!(outcome.new_effective_confidence <= r0.effective_confidence);

        let r1 = engine.analyze("s1", "my landlord kept my security deposit").unwrap();
        assert!(r1.effective_confidence <= r0.effective_confidence);
        assert!(r1.effective_confidence >= (r0.base_confidence - 0.20).clamp(0.0, 1.0) - 1e-9);
    }

    // =========================================================================
    // invariants
    // =========================================================================

    #[test]
    fn test_subdomain_never_null_and_confidence_bounded() {
        let engine = setup();
        for query in [
            "my bike was stolen yesterday",
            "divorce from my husband",
            "random words entirely unrelated",
            "article 21 violation by the state",
            "refund for a defective phone",
        ] {
            let result = engine.analyze("s1", query).unwrap();
            assert!(!result.subdomain_id.is_empty(), "query: {}", query);
            assert!(
                (0.0..=1.0).contains(&result.effective_confidence),
                "query: {}",
                query
            );
            assert!((0.0..=1.0).contains(&result.base_confidence));
        }
    }

    #[test]
    fn test_no_duplicate_sections_in_result() {
        let engine = setup();
        let result = engine
            .analyze("s1", "theft robbery stolen police fir arrest")
            .unwrap();
        for list in [&result.sections.bns, &result.sections.ipc, &result.sections.crpc] {
            let mut seen = std::collections::HashSet::new();
            for section in list.iter() {
                assert!(seen.insert(section.number.clone()));
            }
        }
    }

    #[test]
    fn test_constitutional_sorted() {
        let engine = setup();
        let result = engine.analyze("s1", "police arrested me without telling grounds").unwrap();
        for pair in result.constitutional.windows(2) {
            assert!(pair[0].percent >= pair[1].percent);
        }
    }

    #[test]
    fn test_renormalized_query_identical_output() {
        let engine = setup();
        let a = engine.analyze("s1", "My phone was hacked").unwrap();
        let b = engine.analyze("s1", "  my PHONE was   hacked!! ").unwrap();

        assert_eq!(a.domain_id, b.domain_id);
        assert_eq!(a.subdomain_id, b.subdomain_id);
        assert_eq!(a.base_confidence, b.base_confidence);
        let ids = |r: &AnalysisResult| r.sections.identities();
        assert_eq!(ids(&a), ids(&b));
        let arts = |r: &AnalysisResult| {
            r.constitutional.iter().map(|x| x.number.clone()).collect::<Vec<_>>()
        };
        assert_eq!(arts(&a), arts(&b));
    }

    #[test]
    fn test_feedback_idempotent_per_event_and_signal() {
        let engine = setup();
        let r = engine.analyze("s1", "my phone was hacked").unwrap();

        let first = engine
            .submit_feedback("s1", &r.event_id, FeedbackSignal::Positive)
            .unwrap();
        let second = engine
            .submit_feedback("s1", &r.event_id, FeedbackSignal::Positive)
            .unwrap();
        assert_eq!(
            first.new_effective_confidence,
            second.new_effective_confidence
        );

        // A later analysis sees exactly one positive worth of delta.
        let after = engine.analyze("s1", "my phone was hacked").unwrap();
        assert!((after.effective_confidence - (r.base_confidence + 0.10).clamp(0.0, 1.0)).abs() < 1e-9);
    }

    #[test]
    fn test_feedback_saturates() {
        let engine = setup();
        let mut last = 0.0;
        for _ in 0..6 {
            let r = engine.analyze("s1", "my phone was hacked").unwrap();
            last = engine
                .submit_feedback("s1", &r.event_id, FeedbackSignal::Positive)
                .unwrap()
                .new_effective_confidence;
        }
        let base = engine.analyze("s1", "my phone was hacked").unwrap().base_confidence;
        assert!((last - (base + 0.30).clamp(0.0, 1.0)).abs() < 1e-9, "last={}", last);
    }

    // =========================================================================
    // error paths
    // =========================================================================

    #[test]
    fn test_unknown_event_rejected() {
        let engine = setup();
        let err = engine
            .submit_feedback("s1", "no-such-event", FeedbackSignal::Positive)
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownEvent(_)));
    }

    #[test]
    fn test_invalid_signal_rejected_at_parse() {
        let err = FeedbackSignal::parse("meh").unwrap_err();
        assert!(matches!(err, EngineError::InvalidFeedback(_)));
    }

    #[test]
    fn test_empty_query_rejected() {
        let engine = setup();
        assert!(matches!(
            engine.analyze("s1", "???"),
            Err(EngineError::EmptyQuery)
        ));
        assert!(matches!(
            engine.analyze("", "valid query"),
            Err(EngineError::EmptySession)
        ));
    }

    // =========================================================================
    // history, sessions, stats
    // =========================================================================

    #[test]
    fn test_history_and_search() {
        let engine = setup();
        engine.analyze("s1", "my bike was stolen").unwrap();
        engine.analyze("s2", "divorce from my husband").unwrap();

        let all = engine.history(None, None, None).unwrap();
        assert_eq!(all.len(), 2);

        let s1 = engine.history(Some("s1"), None, None).unwrap();
        assert_eq!(s1.len(), 1);
        assert_eq!(s1[0].raw_query, "my bike was stolen");

        let by_text = engine.search_history("bike").unwrap();
        assert_eq!(by_text.len(), 1);

        // Display-name search: "Family" matches the family_law display.
        let by_display = engine.search_history("Family").unwrap();
        assert!(by_display.iter().any(|e| e.domain_id == "family_law"));
    }

    #[test]
    fn test_feedback_last_targets_most_recent_analysis() {
        let engine = setup();
        engine.analyze("s1", "my bike was stolen").unwrap();
        let last = engine.analyze("s1", "my phone was hacked").unwrap();

        let outcome = engine
            .submit_feedback_last("s1", FeedbackSignal::Positive)
            .unwrap();
        assert_eq!(outcome.event_id, last.event_id);

        let err = engine
            .submit_feedback_last("s9", FeedbackSignal::Positive)
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownEvent(_)));
    }

    #[test]
    fn test_feedback_appends_its_own_event() {
        let engine = setup();
        let r = engine.analyze("s1", "my phone was hacked").unwrap();
        engine
            .submit_feedback("s1", &r.event_id, FeedbackSignal::Positive)
            .unwrap();

        let events = engine.history(Some("s1"), None, None).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().any(|e| e.kind == QueryEventKind::Feedback));
        // The original analysis row is untouched.
        let original = events
            .iter()
            .find(|e| e.event_id == r.event_id)
            .unwrap();
        assert_eq!(original.effective_confidence, r.effective_confidence);
    }

    #[test]
    fn test_stats_reflect_corpus_and_log() {
        let engine = setup();
        let before = engine.stats().unwrap();
        assert!(before.bns_section_count > 0);
        assert!(before.ipc_section_count > 0);
        assert!(before.crpc_section_count > 0);
        assert!(before.article_count > 0);
        assert_eq!(before.total_events, 0);

        engine.analyze("s1", "my bike was stolen").unwrap();
        assert_eq!(engine.stats().unwrap().total_events, 1);
    }

    #[test]
    fn test_deadline_yields_partial_result() {
        let engine = Engine::open_in_memory(EngineConfig {
            deadline: Some(std::time::Duration::ZERO),
            ..Default::default()
        })
        .unwrap();

        let result = engine.analyze("s1", "my bike was stolen").unwrap();
        assert!(result.partial);
        assert!(result.sections.is_empty());
        assert!(result.constitutional.is_empty());
        // Classification and the event append still happen.
        assert_eq!(result.domain_id, "criminal_law");
        assert!(result.persisted);
        assert_eq!(engine.stats().unwrap().total_events, 1);
    }

    #[test]
    fn test_taxonomy_only_engine_end_to_end() {
        let engine = Engine::open_in_memory(EngineConfig {
            enable_classifier: false,
            ..Default::default()
        })
        .unwrap();

        let result = engine.analyze("s1", "My child was kidnapped for ransom").unwrap();
        assert_eq!(result.domain_id, "criminal_law");
        assert_eq!(result.subdomain_id, "kidnapping_abduction");
        assert!(result.sections.ipc.iter().any(|s| s.number == "364A"));
    }
}
