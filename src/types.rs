//! Core types for the legal query analysis engine
//!
//! Records are plain serde structs; variant kinds (codebooks, feedback
//! signals, event kinds) are tagged enums. Corpus entities are read-only
//! after load; query events are append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three statutory codebooks the engine retrieves from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CodeBook {
    /// Bharatiya Nyaya Sanhita, 2023
    Bns,
    /// Indian Penal Code, 1860
    Ipc,
    /// Code of Criminal Procedure, 1973
    Crpc,
}

impl CodeBook {
    pub const ALL: [CodeBook; 3] = [CodeBook::Bns, CodeBook::Ipc, CodeBook::Crpc];

    pub fn name(&self) -> &'static str {
        match self {
            CodeBook::Bns => "BNS",
            CodeBook::Ipc => "IPC",
            CodeBook::Crpc => "CrPC",
        }
    }
}

/// A statutory section. Identity is (code, number); numbering is sparse and
/// supports alphanumeric suffixes ("41A", "364A").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub code: CodeBook,
    pub number: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub linked_domains: Vec<String>,
    #[serde(default)]
    pub linked_subdomains: Vec<String>,
}

impl Section {
    /// Stable identity string, used in the event log ("ipc:364A").
    pub fn identity(&self) -> String {
        format!("{}:{}", self.code.name().to_lowercase(), self.number)
    }
}

/// A numbered article of the Constitution of India.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstitutionalArticle {
    pub number: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub fundamental_rights_flag: bool,
    #[serde(default)]
    pub domain_hints: Vec<String>,
}

/// Caller feedback on an analysis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackSignal {
    Positive,
    Negative,
}

impl FeedbackSignal {
    pub fn name(&self) -> &'static str {
        match self {
            FeedbackSignal::Positive => "positive",
            FeedbackSignal::Negative => "negative",
        }
    }

    /// Parse the wire form. Anything other than "positive"/"negative" is
    /// rejected with `InvalidFeedback`.
    pub fn parse(raw: &str) -> crate::error::EngineResult<Self> {
        match raw {
            "positive" => Ok(FeedbackSignal::Positive),
            "negative" => Ok(FeedbackSignal::Negative),
            other => Err(crate::error::EngineError::InvalidFeedback(other.to_string())),
        }
    }
}

/// What produced a query-log entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueryEventKind {
    /// A full analyze() call.
    Analysis,
    /// A feedback application against an earlier analysis event.
    Feedback,
}

impl QueryEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            QueryEventKind::Analysis => "analysis",
            QueryEventKind::Feedback => "feedback",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "analysis" => Some(QueryEventKind::Analysis),
            "feedback" => Some(QueryEventKind::Feedback),
            _ => None,
        }
    }
}

/// One append-only record in the query log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryEvent {
    pub event_id: String,
    pub session_id: String,
    pub kind: QueryEventKind,
    pub timestamp: DateTime<Utc>,
    pub raw_query: String,
    pub normalized_query: String,
    pub domain_id: String,
    pub subdomain_id: String,
    pub base_confidence: f64,
    pub effective_confidence: f64,
    pub retrieved_section_ids: Vec<String>,
    pub retrieved_article_numbers: Vec<String>,
}

/// Domain classification output: winner plus up to two runners-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainClassification {
    pub domain_id: String,
    pub base_confidence: f64,
    pub alternatives: Vec<DomainAlternative>,
    /// Set when a priority rule fired and pinned the subdomain as well.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forced_subdomain: Option<ForcedSubdomain>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainAlternative {
    pub domain_id: String,
    pub confidence: f64,
}

/// Subdomain pinned by a priority rule, bypassing subdomain scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForcedSubdomain {
    pub subdomain_id: String,
    pub confidence: f64,
}

/// Subdomain classification output. The subdomain id is never empty: when
/// scoring produces nothing, the domain's reserved `general` subdomain is
/// emitted instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubdomainClassification {
    pub subdomain_id: String,
    pub confidence: f64,
    pub alternatives: Vec<DomainAlternative>,
}

/// The three per-codebook retrieval lists, ranked, deduplicated, uncapped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionLists {
    pub bns: Vec<Section>,
    pub ipc: Vec<Section>,
    pub crpc: Vec<Section>,
}

impl SectionLists {
    pub fn identities(&self) -> Vec<String> {
        self.bns
            .iter()
            .chain(self.ipc.iter())
            .chain(self.crpc.iter())
            .map(Section::identity)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.bns.is_empty() && self.ipc.is_empty() && self.crpc.is_empty()
    }
}

/// A constitutional article scored against a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedArticle {
    pub number: String,
    pub title: String,
    /// Integer relevance in [0, 100], non-increasing down the list.
    pub percent: u8,
    pub matched_keywords: Vec<String>,
}

/// The full response of a single analyze() call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub raw_query: String,
    pub normalized_query: String,
    pub domain_id: String,
    pub domain_display: String,
    pub domain_confidence: f64,
    pub subdomain_id: String,
    pub subdomain_display: String,
    pub subdomain_confidence: f64,
    pub sections: SectionLists,
    pub constitutional: Vec<RankedArticle>,
    pub alternatives: Vec<DomainAlternative>,
    pub base_confidence: f64,
    /// Base confidence shifted by the feedback delta for this query key,
    /// clamped to [0, 1].
    pub effective_confidence: f64,
    /// True when a deadline expired and later stages were skipped.
    pub partial: bool,
    /// False when the event append failed; the analysis itself is still valid.
    pub persisted: bool,
    pub sections_degraded: bool,
    pub articles_degraded: bool,
}

/// Result of applying one feedback signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackOutcome {
    pub event_id: String,
    pub new_effective_confidence: f64,
}

/// Corpus and log counters for the stats reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub bns_section_count: usize,
    pub ipc_section_count: usize,
    pub crpc_section_count: usize,
    pub article_count: usize,
    pub total_events: usize,
}
