//! nyaya - Legal Query Analysis Engine
//!
//! Analyzes natural-language legal queries in the Indian law context:
//! classifies them into a domain and subdomain with calibrated confidence,
//! retrieves the relevant statutory sections across BNS 2023, IPC 1860, and
//! CrPC 1973, ranks constitutional articles, and adapts its confidence over
//! time through per-query feedback.
//!
//! This is informational analysis, not legal advice.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use nyaya::{Engine, EngineConfig, FeedbackSignal};
//!
//! let engine = Engine::open(&db_path, EngineConfig::default())?;
//!
//! // Analyze
//! let result = engine.analyze("session-1", "My child was kidnapped for ransom")?;
//! println!("{} / {} ({:.0}%)", result.domain_display, result.subdomain_display,
//!          result.effective_confidence * 100.0);
//!
//! // Close the learning loop
//! engine.submit_feedback("session-1", &result.event_id, FeedbackSignal::Positive)?;
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 caller (CLI / service)               │
//! └───────────────────────┬──────────────────────────────┘
//! ┌───────────────────────▼──────────────────────────────┐
//! │                       Engine                         │
//! │  analyze()          -> classify, retrieve, rank      │
//! │  submit_feedback()  -> bounded confidence learning   │
//! │  history()/stats()  -> query log readers             │
//! ├──────────┬───────────┬───────────┬───────────────────┤
//! │  corpus  │ taxonomy  │ classifier│  sqlite store     │
//! │ (BNS/IPC │ (domains, │ (NB +     │ (events,          │
//! │  /CrPC + │  patterns,│  TF-IDF   │  feedback         │
//! │ articles)│  rules)   │  cosine)  │  records)         │
//! └──────────┴───────────┴───────────┴───────────────────┘
//! ```

pub mod classifier;
pub mod config;
pub mod constitutional;
pub mod corpus;
pub mod db;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod normalize;
pub mod retrieval;
pub mod session;
pub mod taxonomy;
pub mod types;

// Engine surface
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, EngineResult};

// Corpus and taxonomy
pub use corpus::{compare_statute_numbers, Corpus};
pub use taxonomy::{Taxonomy, GENERAL_SUBDOMAIN, OTHER_DOMAIN};

// Classifier
pub use classifier::{ClassifierModel, DomainClassifier};

// Data model
pub use types::*;
