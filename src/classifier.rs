//! Hybrid domain classification
//!
//! Two-stage classifier over the taxonomy:
//!
//! 1. Domain: a multinomial Naive Bayes model over TF-IDF-weighted tokens,
//!    blended with cosine similarity against per-domain training centroids
//!    and the taxonomy keyword score. Priority rules bypass all of it.
//! 2. Subdomain: taxonomy scoring restricted to the winning domain's
//!    children, with the reserved `general` subdomain as the guaranteed
//!    non-empty fallback.
//!
//! The model is trained deterministically at engine construction from the
//! embedded training table; a failed build (or `enable_classifier = false`)
//! degrades to taxonomy-only scoring. Degradation is a supported mode, not
//! an error path.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::normalize::tokens;
use crate::taxonomy::{Taxonomy, GENERAL_SUBDOMAIN, OTHER_DOMAIN};
use crate::types::{
    DomainAlternative, DomainClassification, ForcedSubdomain, SubdomainClassification,
};
use ndarray::Array1;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};

/// Confidence emitted when no subdomain scores and `general` is used.
const GENERAL_FALLBACK_CONFIDENCE: f64 = 0.20;

/// Confidence emitted for the `other` fallback domain.
const UNKNOWN_FALLBACK_CONFIDENCE: f64 = 0.15;

/// Floor applied on top of a priority rule's own floor.
const PRIORITY_MIN_CONFIDENCE: f64 = 0.85;

/// Labelled training queries, one tuple per domain. The model's class
/// universe is exactly the domain ids listed here; `other` is deliberately
/// absent and reachable only through the unknown fallback.
const TRAINING: &[(&str, &[&str])] = &[
    (
        "criminal_law",
        &[
            "someone stole my phone in the market",
            "my brother was murdered last night",
            "i was attacked and beaten by goons",
            "my daughter was kidnapped for ransom",
            "police refused to register my fir",
            "caught with drugs at the airport",
            "he threatened to kill me",
            "my house was robbed while we were away",
            "a man snatched my gold chain",
            "i was molested in the bus",
            "they are blackmailing me for money",
            "my neighbour assaulted me with a knife",
        ],
    ),
    (
        "cyber_law",
        &[
            "my phone was hacked",
            "someone hacked my bank account",
            "i lost money in an online scam",
            "fake profile created in my name on facebook",
            "i shared my otp and money was debited",
            "phishing email stole my password",
            "someone is stalking me online",
            "my instagram account was hacked",
            "upi fraud took my savings",
            "ransomware locked my computer files",
        ],
    ),
    (
        "family_law",
        &[
            "i want to divorce my husband",
            "my wife filed for alimony",
            "how to get custody of my children",
            "my inlaws harass me for dowry",
            "mutual consent divorce procedure",
            "my spouse abandoned me",
            "domestic violence complaint against husband",
            "annulment of my marriage",
            "interim maintenance for my wife",
            "my husband beats me",
        ],
    ),
    (
        "property_law",
        &[
            "my landlord refuses to return security deposit",
            "tenant is not vacating my flat",
            "neighbour encroached on my land",
            "builder delayed possession of my flat",
            "forged documents used to sell my plot",
            "rent agreement dispute with landlord",
            "illegal possession of my ancestral property",
            "boundary dispute with neighbour",
            "mutation of property records",
            "landlord increased rent without notice",
        ],
    ),
    (
        "employment_law",
        &[
            "i was fired without notice",
            "my employer has not paid my salary",
            "wrongful termination from my job",
            "company denied my gratuity",
            "boss is harassing me at work",
            "unpaid overtime wages",
            "forced to resign by my manager",
            "notice period dispute with employer",
            "provident fund not deposited by company",
            "terminated while on maternity leave",
        ],
    ),
    (
        "consumer_law",
        &[
            "shop refused to refund a defective product",
            "my new phone is defective and company ignores me",
            "ecommerce order never delivered",
            "overcharged above mrp at the store",
            "warranty claim rejected by the brand",
            "received wrong product from online order",
            "service center delayed repair for months",
            "airline lost my baggage and refuses compensation",
            "deficiency in service by the hospital",
            "consumer complaint against the shopkeeper",
        ],
    ),
    (
        "motor_vehicle_law",
        &[
            "i met with a road accident",
            "hit and run case my father injured",
            "drunk driver hit my car",
            "traffic police issued wrong challan",
            "insurance company rejected accident claim",
            "rash driving accident compensation",
            "my bike was hit by a truck",
            "driving license suspended after accident",
            "third party insurance claim",
            "pedestrian injured in a collision",
        ],
    ),
];

/// Trained model state: vocabulary, IDF weights, per-domain Naive Bayes
/// token statistics, and per-domain TF-IDF centroids. Read-only after
/// training.
pub struct ClassifierModel {
    domains: Vec<String>,
    vocab: HashMap<String, usize>,
    idf: Array1<f32>,
    /// Per-domain log prior.
    log_priors: Vec<f64>,
    /// Per-domain smoothed log likelihood per vocabulary token.
    log_likelihoods: Vec<Vec<f64>>,
    /// Per-domain L2-normalized TF-IDF centroid.
    centroids: Vec<Array1<f32>>,
    /// SHA-256 of the training corpus this model was built from.
    pub training_corpus_digest: String,
}

impl ClassifierModel {
    /// Train from the embedded corpus. Deterministic: same corpus, same
    /// model, same digest.
    pub fn train() -> EngineResult<Self> {
        Self::train_from(TRAINING)
    }

    fn train_from(corpus: &[(&str, &[&str])]) -> EngineResult<Self> {
        if corpus.is_empty() {
            return Err(EngineError::ClassifierLoad("empty training corpus".into()));
        }

        let mut digest = Sha256::new();
        let mut vocab: HashMap<String, usize> = HashMap::new();
        let mut documents: Vec<(usize, Vec<String>)> = Vec::new();

        for (class_idx, (domain, examples)) in corpus.iter().enumerate() {
            digest.update(domain.as_bytes());
            for example in *examples {
                digest.update(example.as_bytes());
                let toks: Vec<String> = tokens(example).iter().map(|t| t.to_string()).collect();
                for tok in &toks {
                    let next = vocab.len();
                    vocab.entry(tok.clone()).or_insert(next);
                }
                documents.push((class_idx, toks));
            }
        }

        let vocab_size = vocab.len();
        let doc_count = documents.len();
        if vocab_size == 0 || doc_count == 0 {
            return Err(EngineError::ClassifierLoad("no usable training tokens".into()));
        }

        // Document frequency -> smoothed IDF.
        let mut df = vec![0usize; vocab_size];
        for (_, toks) in &documents {
            let mut seen = vec![false; vocab_size];
            for tok in toks {
                let idx = vocab[tok];
                if !seen[idx] {
                    seen[idx] = true;
                    df[idx] += 1;
                }
            }
        }
        let idf = Array1::from_iter(
            df.iter()
                .map(|&d| (((1 + doc_count) as f32) / ((1 + d) as f32)).ln() + 1.0),
        );

        // Naive Bayes token counts and TF-IDF centroids, per class.
        let class_count = corpus.len();
        let mut token_counts = vec![vec![0u32; vocab_size]; class_count];
        let mut doc_counts = vec![0usize; class_count];
        let mut centroid_sums = vec![Array1::<f32>::zeros(vocab_size); class_count];

        for (class_idx, toks) in &documents {
            doc_counts[*class_idx] += 1;
            let mut tf = Array1::<f32>::zeros(vocab_size);
            for tok in toks {
                let idx = vocab[tok];
                token_counts[*class_idx][idx] += 1;
                tf[idx] += 1.0;
            }
            let weighted = l2_normalize(&tf * &idf);
            centroid_sums[*class_idx] = &centroid_sums[*class_idx] + &weighted;
        }

        let log_priors: Vec<f64> = doc_counts
            .iter()
            .map(|&n| ((n.max(1)) as f64 / doc_count as f64).ln())
            .collect();

        let log_likelihoods: Vec<Vec<f64>> = token_counts
            .iter()
            .map(|counts| {
                let total: u32 = counts.iter().sum();
                counts
                    .iter()
                    .map(|&c| {
                        ((c as f64 + 1.0) / (total as f64 + vocab_size as f64)).ln()
                    })
                    .collect()
            })
            .collect();

        let centroids = centroid_sums.into_iter().map(|s| l2_normalize(s)).collect();

        Ok(Self {
            domains: corpus.iter().map(|(d, _)| d.to_string()).collect(),
            vocab,
            idf,
            log_priors,
            log_likelihoods,
            centroids,
            training_corpus_digest: hex::encode(digest.finalize()),
        })
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    fn query_vector(&self, normalized_query: &str) -> (Array1<f32>, usize) {
        let mut tf = Array1::<f32>::zeros(self.vocab.len());
        let mut known = 0usize;
        for tok in tokens(normalized_query) {
            if let Some(&idx) = self.vocab.get(tok) {
                tf[idx] += 1.0;
                known += 1;
            }
        }
        (l2_normalize(&tf * &self.idf), known)
    }

    /// Probability distribution over the trained domains. A query with no
    /// vocabulary overlap carries no evidence and yields all zeros, which
    /// feeds the unknown-query fallback downstream.
    pub fn predict_proba(&self, normalized_query: &str) -> Vec<(String, f64)> {
        // Ordered map: the accumulation below must run in a fixed order so
        // the emitted probabilities are bit-identical across calls.
        let mut counts: BTreeMap<usize, u32> = BTreeMap::new();
        let mut known = 0u32;
        for tok in tokens(normalized_query) {
            if let Some(&idx) = self.vocab.get(tok) {
                *counts.entry(idx).or_insert(0) += 1;
                known += 1;
            }
        }
        if known == 0 {
            return self.domains.iter().map(|d| (d.clone(), 0.0)).collect();
        }

        let scores: Vec<f64> = (0..self.domains.len())
            .map(|class_idx| {
                let mut score = self.log_priors[class_idx];
                for (&token_idx, &count) in &counts {
                    score += count as f64 * self.log_likelihoods[class_idx][token_idx];
                }
                score
            })
            .collect();

        // Softmax over log scores.
        let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
        let total: f64 = exps.iter().sum();

        self.domains
            .iter()
            .zip(exps)
            .map(|(d, e)| (d.clone(), e / total))
            .collect()
    }

    /// Cosine similarity of the query's TF-IDF vector against each domain
    /// centroid.
    pub fn similarity_scores(&self, normalized_query: &str) -> Vec<(String, f64)> {
        let (vector, known) = self.query_vector(normalized_query);
        self.domains
            .iter()
            .enumerate()
            .map(|(idx, d)| {
                let sim = if known == 0 {
                    0.0
                } else {
                    vector.dot(&self.centroids[idx]) as f64
                };
                (d.clone(), sim)
            })
            .collect()
    }
}

fn l2_normalize(v: Array1<f32>) -> Array1<f32> {
    let norm = v.dot(&v).sqrt();
    if norm > 0.0 {
        v / norm
    } else {
        v
    }
}

/// Two-stage classifier. Holds the optional model; without it every query
/// runs on taxonomy scores alone.
pub struct DomainClassifier {
    model: Option<ClassifierModel>,
}

impl DomainClassifier {
    /// Build the classifier per configuration. A model that fails to train
    /// logs and degrades rather than propagating.
    pub fn new(config: &EngineConfig) -> Self {
        let model = if config.enable_classifier {
            match ClassifierModel::train() {
                Ok(model) => {
                    tracing::debug!(
                        digest = %model.training_corpus_digest,
                        domains = model.domains.len(),
                        "classifier model trained"
                    );
                    Some(model)
                }
                Err(e) => {
                    tracing::warn!("classifier unavailable, taxonomy-only mode: {}", e);
                    None
                }
            }
        } else {
            None
        };
        Self { model }
    }

    pub fn is_degraded(&self) -> bool {
        self.model.is_none()
    }

    /// Classify the query into a domain (stage one).
    pub fn classify(
        &self,
        taxonomy: &Taxonomy,
        config: &EngineConfig,
        normalized_query: &str,
    ) -> DomainClassification {
        // Priority rules win outright and pin the subdomain too.
        if let Some(rule) = taxonomy.priority_match(normalized_query) {
            let confidence = rule.confidence_floor.max(PRIORITY_MIN_CONFIDENCE);
            return DomainClassification {
                domain_id: rule.domain_id.clone(),
                base_confidence: confidence.min(1.0),
                alternatives: Vec::new(),
                forced_subdomain: Some(ForcedSubdomain {
                    subdomain_id: rule.subdomain_id.clone(),
                    confidence: rule.confidence_floor.min(1.0),
                }),
            };
        }

        let taxonomy_scores = taxonomy.score_domain(normalized_query);
        let max_taxonomy = taxonomy_scores
            .iter()
            .map(|(_, s)| s.score)
            .fold(0.0_f64, f64::max);

        let ml: HashMap<String, f64> = match &self.model {
            Some(model) => model.predict_proba(normalized_query).into_iter().collect(),
            None => HashMap::new(),
        };
        let sim: HashMap<String, f64> = match &self.model {
            Some(model) => model.similarity_scores(normalized_query).into_iter().collect(),
            None => HashMap::new(),
        };

        let mut combined: Vec<(String, f64)> = taxonomy_scores
            .iter()
            .map(|(domain_id, tax)| {
                let tax_norm = if max_taxonomy > 0.0 {
                    tax.score / max_taxonomy
                } else {
                    0.0
                };
                let score = if self.model.is_some() {
                    config.ml_weight * ml.get(domain_id).copied().unwrap_or(0.0)
                        + config.similarity_weight * sim.get(domain_id).copied().unwrap_or(0.0)
                        + config.taxonomy_weight * tax_norm
                } else {
                    tax_norm
                };
                (domain_id.clone(), score)
            })
            .collect();

        let best = combined
            .iter()
            .map(|(_, s)| *s)
            .fold(0.0_f64, f64::max);

        // No classifier evidence and no taxonomy signal: unknown query.
        if best < config.unknown_threshold && max_taxonomy == 0.0 {
            return DomainClassification {
                domain_id: OTHER_DOMAIN.to_string(),
                base_confidence: UNKNOWN_FALLBACK_CONFIDENCE,
                alternatives: Vec::new(),
                forced_subdomain: None,
            };
        }

        // Stable sort keeps taxonomy order on exact ties.
        combined.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        let (winner, winner_score) = combined[0].clone();
        let alternatives = combined
            .iter()
            .skip(1)
            .take(2)
            .filter(|(_, s)| *s > 0.0)
            .map(|(d, s)| DomainAlternative {
                domain_id: d.clone(),
                confidence: s.min(1.0),
            })
            .collect();

        DomainClassification {
            domain_id: winner,
            base_confidence: winner_score.min(1.0),
            alternatives,
            forced_subdomain: None,
        }
    }

    /// Classify the subdomain within a domain (stage two). Never returns
    /// an empty subdomain: scoring silence falls back to `general`.
    pub fn classify_subdomain(
        &self,
        taxonomy: &Taxonomy,
        domain_id: &str,
        normalized_query: &str,
        forced: Option<&ForcedSubdomain>,
    ) -> SubdomainClassification {
        if let Some(forced) = forced {
            return SubdomainClassification {
                subdomain_id: forced.subdomain_id.clone(),
                confidence: forced.confidence,
                alternatives: Vec::new(),
            };
        }

        let mut scores = taxonomy.score_subdomain(domain_id, normalized_query);
        let max_score = scores.iter().map(|(_, s)| s.score).fold(0.0_f64, f64::max);

        if max_score == 0.0 {
            return SubdomainClassification {
                subdomain_id: GENERAL_SUBDOMAIN.to_string(),
                confidence: GENERAL_FALLBACK_CONFIDENCE,
                alternatives: Vec::new(),
            };
        }

        scores.sort_by(|a, b| {
            b.1.score
                .partial_cmp(&a.1.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.1.pattern_hits.cmp(&a.1.pattern_hits))
                .then(b.1.keyword_hits.cmp(&a.1.keyword_hits))
        });

        let normalize_score = |s: f64| s / (max_score + 1.0);
        let alternatives = scores
            .iter()
            .skip(1)
            .take(2)
            .filter(|(_, s)| s.score > 0.0)
            .map(|(id, s)| DomainAlternative {
                domain_id: id.clone(),
                confidence: normalize_score(s.score),
            })
            .collect();

        SubdomainClassification {
            subdomain_id: scores[0].0.clone(),
            confidence: normalize_score(scores[0].1.score),
            alternatives,
        }
    }
}
