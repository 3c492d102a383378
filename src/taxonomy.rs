//! Legal domain taxonomy
//!
//! Domain -> subdomain tree with positive keywords, negative keywords,
//! multi-word patterns, and priority rules. Priority rules run before any
//! scoring and short-circuit classification; the first matching rule in
//! taxonomy order wins.
//!
//! Scoring: +3 per matched pattern, +1 per matched keyword, -2 per matched
//! negative keyword, clamped at zero. Ties break on pattern count, then
//! keyword count, then taxonomy order.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The reserved subdomain present in every domain. Guarantees classification
/// output is never empty.
pub const GENERAL_SUBDOMAIN: &str = "general";

/// The fallback domain for queries with no signal at all.
pub const OTHER_DOMAIN: &str = "other";

/// A phrase that overrides classification with a fixed target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityRule {
    pub phrase: String,
    pub domain_id: String,
    pub subdomain_id: String,
    pub confidence_floor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subdomain {
    pub id: String,
    pub display: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    pub id: String,
    pub display: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub negative_keywords: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub priority_rules: Vec<PriorityRule>,
    pub subdomains: Vec<Subdomain>,
}

/// Keyword/pattern score for one domain or subdomain, with the raw hit
/// counts kept for tie-breaking.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaxonomyScore {
    pub score: f64,
    pub pattern_hits: usize,
    pub keyword_hits: usize,
}

/// The full domain tree, ordered. Read-only after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Taxonomy {
    domains: Vec<Domain>,
}

/// True when `phrase` occurs in `normalized` on token boundaries.
fn contains_phrase(normalized: &str, phrase: &str) -> bool {
    let padded = format!(" {} ", normalized);
    padded.contains(&format!(" {} ", phrase))
}

impl Taxonomy {
    pub fn new(domains: Vec<Domain>) -> EngineResult<Self> {
        for domain in &domains {
            if !domain.subdomains.iter().any(|s| s.id == GENERAL_SUBDOMAIN) {
                return Err(EngineError::CorpusLoad(format!(
                    "domain {} is missing the reserved general subdomain",
                    domain.id
                )));
            }
        }
        Ok(Self { domains })
    }

    /// Parse a taxonomy description from JSON.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let domains: Vec<Domain> = serde_json::from_str(json)
            .map_err(|e| EngineError::CorpusLoad(format!("taxonomy: {}", e)))?;
        Self::new(domains)
    }

    pub fn domains(&self) -> &[Domain] {
        &self.domains
    }

    pub fn domain(&self, id: &str) -> Option<&Domain> {
        self.domains.iter().find(|d| d.id == id)
    }

    pub fn display(&self, domain_id: &str) -> String {
        self.domain(domain_id)
            .map(|d| d.display.clone())
            .unwrap_or_else(|| domain_id.to_string())
    }

    pub fn subdomain_display(&self, domain_id: &str, subdomain_id: &str) -> String {
        self.domain(domain_id)
            .and_then(|d| d.subdomains.iter().find(|s| s.id == subdomain_id))
            .map(|s| s.display.clone())
            .unwrap_or_else(|| subdomain_id.to_string())
    }

    /// Domain ids whose display name contains `needle` (case-insensitive).
    /// Used by history search to match on display names.
    pub fn domain_ids_matching_display(&self, needle: &str) -> Vec<String> {
        let needle = needle.to_lowercase();
        self.domains
            .iter()
            .filter(|d| d.display.to_lowercase().contains(&needle))
            .map(|d| d.id.clone())
            .collect()
    }

    /// First priority rule whose phrase occurs in the query, in taxonomy
    /// order. Evaluated before all scoring.
    pub fn priority_match(&self, normalized_query: &str) -> Option<&PriorityRule> {
        self.domains
            .iter()
            .flat_map(|d| d.priority_rules.iter())
            .find(|rule| contains_phrase(normalized_query, &rule.phrase))
    }

    fn score_terms(
        tokens: &HashSet<&str>,
        normalized_query: &str,
        keywords: &[String],
        patterns: &[String],
        negatives: &[String],
    ) -> TaxonomyScore {
        let keyword_hits = keywords
            .iter()
            .filter(|k| tokens.contains(k.as_str()))
            .count();
        let pattern_hits = patterns
            .iter()
            .filter(|p| contains_phrase(normalized_query, p))
            .count();
        let negative_hits = negatives
            .iter()
            .filter(|k| tokens.contains(k.as_str()))
            .count();

        let raw = 3.0 * pattern_hits as f64 + keyword_hits as f64 - 2.0 * negative_hits as f64;
        TaxonomyScore {
            score: raw.max(0.0),
            pattern_hits,
            keyword_hits,
        }
    }

    /// Score every domain against the query, in taxonomy order.
    pub fn score_domain(&self, normalized_query: &str) -> Vec<(String, TaxonomyScore)> {
        let tokens: HashSet<&str> = normalized_query.split_whitespace().collect();
        self.domains
            .iter()
            .map(|d| {
                let score = Self::score_terms(
                    &tokens,
                    normalized_query,
                    &d.keywords,
                    &d.patterns,
                    &d.negative_keywords,
                );
                (d.id.clone(), score)
            })
            .collect()
    }

    /// Score the subdomains of one domain against the query.
    pub fn score_subdomain(
        &self,
        domain_id: &str,
        normalized_query: &str,
    ) -> Vec<(String, TaxonomyScore)> {
        let tokens: HashSet<&str> = normalized_query.split_whitespace().collect();
        self.domain(domain_id)
            .map(|d| {
                d.subdomains
                    .iter()
                    .map(|s| {
                        let score = Self::score_terms(
                            &tokens,
                            normalized_query,
                            &s.keywords,
                            &s.patterns,
                            &[],
                        );
                        (s.id.clone(), score)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Keywords and patterns of (domain, subdomain) that occur in the query.
    /// Drives the keyword-expansion step of section retrieval.
    pub fn matching_terms(
        &self,
        domain_id: &str,
        subdomain_id: &str,
        normalized_query: &str,
    ) -> Vec<String> {
        let tokens: HashSet<&str> = normalized_query.split_whitespace().collect();
        let mut terms: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        let Some(domain) = self.domain(domain_id) else {
            return terms;
        };
        let subdomain = domain.subdomains.iter().find(|s| s.id == subdomain_id);

        let keyword_sources = domain
            .keywords
            .iter()
            .chain(subdomain.into_iter().flat_map(|s| s.keywords.iter()));
        for keyword in keyword_sources {
            if tokens.contains(keyword.as_str()) && seen.insert(keyword.clone()) {
                terms.push(keyword.clone());
            }
        }

        let pattern_sources = domain
            .patterns
            .iter()
            .chain(subdomain.into_iter().flat_map(|s| s.patterns.iter()));
        for pattern in pattern_sources {
            if contains_phrase(normalized_query, pattern) && seen.insert(pattern.clone()) {
                terms.push(pattern.clone());
            }
        }

        terms
    }

    /// The built-in Indian-law taxonomy.
    pub fn builtin() -> Self {
        let domains = vec![
            Domain {
                id: "criminal_law".into(),
                display: "Criminal Law".into(),
                keywords: words(&[
                    "police", "fir", "crime", "criminal", "arrest", "arrested", "bail", "jail",
                    "custody", "murder", "murdered", "killed", "kill", "homicide", "theft",
                    "stolen", "steal", "stole", "robbery", "robbed", "burglary", "snatching",
                    "assault", "attacked", "attack", "hurt", "injured", "beaten", "threat",
                    "threatened", "kidnapped", "kidnapping", "abduction", "abducted", "ransom",
                    "hostage", "drugs", "narcotics", "smuggling", "rape", "molestation",
                    "modesty", "extortion", "blackmail", "blackmailed", "weapon", "gun",
                    "knife", "violence",
                ]),
                negative_keywords: words(&["refund", "warranty", "salary", "divorce"]),
                patterns: phrases(&[
                    "kidnapped for ransom",
                    "attempt to murder",
                    "first information report",
                    "caught with drugs",
                    "grievous hurt",
                ]),
                priority_rules: vec![PriorityRule {
                    phrase: "drugs at airport".into(),
                    domain_id: "criminal_law".into(),
                    subdomain_id: "drug_crime".into(),
                    confidence_floor: 0.90,
                }],
                subdomains: vec![
                    general(),
                    Subdomain {
                        id: "theft".into(),
                        display: "Theft & Robbery".into(),
                        keywords: words(&[
                            "theft", "stolen", "steal", "stole", "robbery", "robbed", "burglary",
                            "snatching", "snatched", "pickpocket", "dacoity",
                        ]),
                        patterns: phrases(&["chain snatching", "house breaking"]),
                    },
                    Subdomain {
                        id: "murder".into(),
                        display: "Murder & Homicide".into(),
                        keywords: words(&[
                            "murder", "murdered", "killed", "kill", "homicide", "death", "stabbed",
                        ]),
                        patterns: phrases(&["attempt to murder", "culpable homicide"]),
                    },
                    Subdomain {
                        id: "assault".into(),
                        display: "Assault & Hurt".into(),
                        keywords: words(&[
                            "assault", "attacked", "attack", "hurt", "injured", "injury", "beaten",
                            "slapped", "fight",
                        ]),
                        patterns: phrases(&["grievous hurt", "criminal force"]),
                    },
                    Subdomain {
                        id: "kidnapping_abduction".into(),
                        display: "Kidnapping & Abduction".into(),
                        keywords: words(&[
                            "kidnapped", "kidnapping", "abduction", "abducted", "ransom",
                            "missing", "hostage",
                        ]),
                        patterns: phrases(&["kidnapped for ransom", "missing child"]),
                    },
                    Subdomain {
                        id: "drug_crime".into(),
                        display: "Drug Offences".into(),
                        keywords: words(&[
                            "drugs", "narcotics", "ganja", "heroin", "cocaine", "smuggling",
                            "possession", "peddling",
                        ]),
                        patterns: phrases(&["drug possession", "drug trafficking"]),
                    },
                    Subdomain {
                        id: "sexual_offence".into(),
                        display: "Sexual Offences".into(),
                        keywords: words(&[
                            "rape", "molestation", "modesty", "stalking", "voyeurism", "obscene",
                        ]),
                        patterns: phrases(&["sexual assault", "outraging modesty"]),
                    },
                    Subdomain {
                        id: "extortion_blackmail".into(),
                        display: "Extortion & Blackmail".into(),
                        keywords: words(&[
                            "extortion", "blackmail", "blackmailed", "threat", "threatening",
                        ]),
                        patterns: phrases(&["demanding money"]),
                    },
                ],
            },
            Domain {
                id: "cyber_law".into(),
                display: "Cyber Law".into(),
                keywords: words(&[
                    "hacked", "hacking", "hacker", "online", "internet", "cyber", "phishing",
                    "otp", "upi", "password", "account", "facebook", "instagram", "whatsapp",
                    "email", "website", "malware", "ransomware", "scam", "scammer", "fraudster",
                    "data", "computer", "phone",
                ]),
                negative_keywords: Vec::new(),
                patterns: phrases(&[
                    "online fraud",
                    "identity theft",
                    "bank account hacked",
                    "phone was hacked",
                    "social media",
                ]),
                priority_rules: Vec::new(),
                subdomains: vec![
                    general(),
                    Subdomain {
                        id: "hacking".into(),
                        display: "Hacking & Unauthorized Access".into(),
                        keywords: words(&[
                            "hacked", "hacking", "hacker", "password", "account", "malware",
                            "ransomware", "breach",
                        ]),
                        patterns: phrases(&["unauthorized access", "phone was hacked"]),
                    },
                    Subdomain {
                        id: "online_fraud".into(),
                        display: "Online Fraud".into(),
                        keywords: words(&[
                            "fraud", "scam", "phishing", "otp", "upi", "payment", "money",
                        ]),
                        patterns: phrases(&["online fraud", "fake website", "upi fraud"]),
                    },
                    Subdomain {
                        id: "identity_theft".into(),
                        display: "Identity Theft".into(),
                        keywords: words(&["identity", "impersonation", "fake", "profile"]),
                        patterns: phrases(&["identity theft", "fake profile"]),
                    },
                    Subdomain {
                        id: "cyber_stalking".into(),
                        display: "Cyber Stalking & Harassment".into(),
                        keywords: words(&["stalking", "stalker", "trolling", "obscene"]),
                        patterns: phrases(&["cyber stalking", "online harassment"]),
                    },
                ],
            },
            Domain {
                id: "family_law".into(),
                display: "Family Law".into(),
                keywords: words(&[
                    "divorce", "marriage", "married", "husband", "wife", "spouse", "alimony",
                    "maintenance", "custody", "dowry", "family", "matrimonial", "separation",
                    "adoption", "inlaws",
                ]),
                negative_keywords: Vec::new(),
                patterns: phrases(&[
                    "domestic violence",
                    "dowry harassment",
                    "child custody",
                    "mutual consent divorce",
                ]),
                priority_rules: Vec::new(),
                subdomains: vec![
                    general(),
                    Subdomain {
                        id: "divorce".into(),
                        display: "Divorce & Separation".into(),
                        keywords: words(&["divorce", "separation", "talaq", "annulment"]),
                        patterns: phrases(&["mutual consent divorce", "contested divorce"]),
                    },
                    Subdomain {
                        id: "maintenance_alimony".into(),
                        display: "Maintenance & Alimony".into(),
                        keywords: words(&["maintenance", "alimony", "support", "expenses"]),
                        patterns: phrases(&["interim maintenance"]),
                    },
                    Subdomain {
                        id: "child_custody".into(),
                        display: "Child Custody".into(),
                        keywords: words(&["custody", "child", "children", "guardian", "visitation"]),
                        patterns: phrases(&["child custody"]),
                    },
                    Subdomain {
                        id: "domestic_violence".into(),
                        display: "Domestic Violence".into(),
                        keywords: words(&["violence", "abuse", "cruelty", "beaten", "dowry"]),
                        patterns: phrases(&["domestic violence", "dowry harassment"]),
                    },
                ],
            },
            Domain {
                id: "property_law".into(),
                display: "Property Law".into(),
                keywords: words(&[
                    "property", "land", "house", "flat", "apartment", "rent", "tenant",
                    "landlord", "lease", "eviction", "possession", "registry", "mutation",
                    "encroachment", "builder", "plot", "deed", "title",
                ]),
                negative_keywords: words(&["warranty", "defective"]),
                patterns: phrases(&[
                    "security deposit",
                    "rent agreement",
                    "illegal possession",
                    "property dispute",
                ]),
                priority_rules: Vec::new(),
                subdomains: vec![
                    general(),
                    Subdomain {
                        id: "tenant_landlord".into(),
                        display: "Tenant & Landlord".into(),
                        keywords: words(&[
                            "rent", "tenant", "landlord", "eviction", "deposit", "lease",
                        ]),
                        patterns: phrases(&["security deposit", "rent agreement"]),
                    },
                    Subdomain {
                        id: "land_dispute".into(),
                        display: "Land Disputes".into(),
                        keywords: words(&[
                            "land", "plot", "boundary", "encroachment", "survey", "mutation",
                        ]),
                        patterns: phrases(&["land grabbing", "boundary dispute"]),
                    },
                    Subdomain {
                        id: "property_fraud".into(),
                        display: "Property Fraud".into(),
                        keywords: words(&["registry", "forged", "fraud", "documents", "deed"]),
                        patterns: phrases(&["fake registry", "forged documents"]),
                    },
                ],
            },
            Domain {
                id: "employment_law".into(),
                display: "Employment Law".into(),
                keywords: words(&[
                    "job", "salary", "wages", "employer", "employee", "office", "workplace",
                    "termination", "terminated", "fired", "dismissed", "resignation", "notice",
                    "gratuity", "bonus", "overtime", "labour", "boss", "colleague",
                ]),
                negative_keywords: Vec::new(),
                patterns: phrases(&[
                    "wrongful termination",
                    "notice period",
                    "provident fund",
                    "unpaid salary",
                ]),
                priority_rules: vec![
                    PriorityRule {
                        phrase: "workplace sexual harassment".into(),
                        domain_id: "employment_law".into(),
                        subdomain_id: "workplace_harassment".into(),
                        confidence_floor: 0.88,
                    },
                    PriorityRule {
                        phrase: "sexual harassment at workplace".into(),
                        domain_id: "employment_law".into(),
                        subdomain_id: "workplace_harassment".into(),
                        confidence_floor: 0.88,
                    },
                    PriorityRule {
                        phrase: "sexual harassment at work".into(),
                        domain_id: "employment_law".into(),
                        subdomain_id: "workplace_harassment".into(),
                        confidence_floor: 0.88,
                    },
                ],
                subdomains: vec![
                    general(),
                    Subdomain {
                        id: "wrongful_termination".into(),
                        display: "Wrongful Termination".into(),
                        keywords: words(&[
                            "fired", "terminated", "termination", "dismissed", "removed", "layoff",
                        ]),
                        patterns: phrases(&["wrongful termination", "terminated without notice"]),
                    },
                    Subdomain {
                        id: "wages_dues".into(),
                        display: "Wages & Dues".into(),
                        keywords: words(&[
                            "salary", "wages", "unpaid", "gratuity", "bonus", "overtime", "dues",
                        ]),
                        patterns: phrases(&["unpaid salary", "full and final settlement"]),
                    },
                    Subdomain {
                        id: "workplace_harassment".into(),
                        display: "Workplace Harassment".into(),
                        keywords: words(&["harassment", "harassed", "boss", "colleague", "hostile"]),
                        patterns: phrases(&[
                            "workplace harassment",
                            "internal complaints committee",
                        ]),
                    },
                ],
            },
            Domain {
                id: "consumer_law".into(),
                display: "Consumer Law".into(),
                keywords: words(&[
                    "consumer", "refund", "warranty", "guarantee", "defective", "product",
                    "service", "delivery", "shop", "shopkeeper", "overcharged", "mrp", "bill",
                    "replacement", "brand", "ecommerce",
                ]),
                negative_keywords: words(&["salary", "tenant", "landlord"]),
                patterns: phrases(&[
                    "defective product",
                    "consumer court",
                    "refused refund",
                    "deficiency in service",
                ]),
                priority_rules: Vec::new(),
                subdomains: vec![
                    general(),
                    Subdomain {
                        id: "defective_goods".into(),
                        display: "Defective Goods".into(),
                        keywords: words(&[
                            "defective", "broken", "damaged", "product", "replacement", "warranty",
                        ]),
                        patterns: phrases(&["defective product"]),
                    },
                    Subdomain {
                        id: "service_deficiency".into(),
                        display: "Service Deficiency".into(),
                        keywords: words(&["service", "deficiency", "delay", "negligence"]),
                        patterns: phrases(&["deficiency in service"]),
                    },
                    Subdomain {
                        id: "online_shopping".into(),
                        display: "Online Shopping".into(),
                        keywords: words(&["online", "delivery", "order", "ecommerce"]),
                        patterns: phrases(&["not delivered", "wrong product"]),
                    },
                ],
            },
            Domain {
                id: "motor_vehicle_law".into(),
                display: "Motor Vehicle Law".into(),
                keywords: words(&[
                    "accident", "vehicle", "car", "bike", "scooter", "truck", "driving",
                    "driver", "license", "licence", "challan", "traffic", "insurance", "helmet",
                    "rash", "collision", "road",
                ]),
                negative_keywords: Vec::new(),
                patterns: phrases(&[
                    "hit and run",
                    "drunk driving",
                    "road accident",
                    "third party insurance",
                ]),
                priority_rules: Vec::new(),
                subdomains: vec![
                    general(),
                    Subdomain {
                        id: "accident".into(),
                        display: "Road Accidents".into(),
                        keywords: words(&["accident", "collision", "injured", "compensation"]),
                        patterns: phrases(&["road accident", "accident claim"]),
                    },
                    Subdomain {
                        id: "hit_and_run".into(),
                        display: "Hit & Run".into(),
                        keywords: words(&["fled", "absconded"]),
                        patterns: phrases(&["hit and run"]),
                    },
                    Subdomain {
                        id: "drunk_driving".into(),
                        display: "Drunk Driving".into(),
                        keywords: words(&["drunk", "alcohol", "intoxicated"]),
                        patterns: phrases(&["drunk driving", "drink and drive"]),
                    },
                ],
            },
            Domain {
                id: OTHER_DOMAIN.into(),
                display: "Other".into(),
                keywords: Vec::new(),
                negative_keywords: Vec::new(),
                patterns: Vec::new(),
                priority_rules: Vec::new(),
                subdomains: vec![general()],
            },
        ];

        // The built-in tree always satisfies the general-subdomain invariant.
        Self::new(domains).expect("built-in taxonomy is well-formed")
    }
}

fn general() -> Subdomain {
    Subdomain {
        id: GENERAL_SUBDOMAIN.into(),
        display: "General".into(),
        keywords: Vec::new(),
        patterns: Vec::new(),
    }
}

fn words(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn phrases(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // scoring tests
    // =========================================================================

    fn best<'a>(scores: &'a [(String, TaxonomyScore)]) -> &'a (String, TaxonomyScore) {
        scores
            .iter()
            .max_by(|a, b| {
                a.1.score
                    .partial_cmp(&b.1.score)
                    .unwrap()
                    .then(a.1.pattern_hits.cmp(&b.1.pattern_hits))
                    .then(a.1.keyword_hits.cmp(&b.1.keyword_hits))
            })
            .unwrap()
    }

    #[test]
    fn test_kidnapping_scores_criminal() {
        let tax = Taxonomy::builtin();
        let scores = tax.score_domain("my child was kidnapped for ransom");
        let top = best(&scores);
        assert_eq!(top.0, "criminal_law");
        // pattern "kidnapped for ransom" (+3) plus keywords kidnapped, ransom.
        assert!(top.1.score >= 5.0, "score was {}", top.1.score);
        assert_eq!(top.1.pattern_hits, 1);
    }

    #[test]
    fn test_pattern_weighs_three() {
        let tax = Taxonomy::builtin();
        let with_pattern = tax.score_domain("hit and run on the highway");
        let motor = with_pattern
            .iter()
            .find(|(id, _)| id == "motor_vehicle_law")
            .unwrap();
        assert_eq!(motor.1.pattern_hits, 1);
        assert!(motor.1.score >= 3.0);
    }

    #[test]
    fn test_negative_keyword_subtracts() {
        let tax = Taxonomy::builtin();
        let scores = tax.score_domain("refund for stolen goods");
        let criminal = scores.iter().find(|(id, _)| id == "criminal_law").unwrap();
        // stolen (+1) and refund (-2), clamped at zero.
        assert_eq!(criminal.1.score, 0.0);
    }

    #[test]
    fn test_scores_clamped_at_zero() {
        let tax = Taxonomy::builtin();
        for (_, s) in tax.score_domain("refund warranty salary divorce") {
            assert!(s.score >= 0.0);
        }
    }

    #[test]
    fn test_no_signal_scores_all_zero() {
        let tax = Taxonomy::builtin();
        assert!(tax.score_domain("zzz qqq").iter().all(|(_, s)| s.score == 0.0));
    }

    #[test]
    fn test_subdomain_scoring() {
        let tax = Taxonomy::builtin();
        let scores = tax.score_subdomain("criminal_law", "my child was kidnapped for ransom");
        let top = best(&scores);
        assert_eq!(top.0, "kidnapping_abduction");
    }

    #[test]
    fn test_phrase_matching_is_token_bounded() {
        // "rent" must not match inside "current".
        let tax = Taxonomy::builtin();
        let scores = tax.score_domain("the current situation is unclear");
        let property = scores.iter().find(|(id, _)| id == "property_law").unwrap();
        assert_eq!(property.1.score, 0.0);
    }

    // =========================================================================
    // priority rule tests
    // =========================================================================

    #[test]
    fn test_airport_drug_rule_fires() {
        let tax = Taxonomy::builtin();
        let rule = tax.priority_match("caught with drugs at airport").unwrap();
        assert_eq!(rule.domain_id, "criminal_law");
        assert_eq!(rule.subdomain_id, "drug_crime");
        assert!(rule.confidence_floor >= 0.90);
    }

    #[test]
    fn test_workplace_harassment_rule_is_deterministic() {
        let tax = Taxonomy::builtin();
        for query in [
            "workplace sexual harassment complaint",
            "facing sexual harassment at workplace",
            "sexual harassment at work by my manager",
        ] {
            let rule = tax.priority_match(query).unwrap();
            assert_eq!(rule.domain_id, "employment_law");
            assert_eq!(rule.subdomain_id, "workplace_harassment");
        }
    }

    #[test]
    fn test_no_rule_for_plain_query() {
        let tax = Taxonomy::builtin();
        assert!(tax.priority_match("my landlord kept my deposit").is_none());
    }

    // =========================================================================
    // structure tests
    // =========================================================================

    #[test]
    fn test_every_domain_has_general() {
        let tax = Taxonomy::builtin();
        for domain in tax.domains() {
            assert!(
                domain.subdomains.iter().any(|s| s.id == GENERAL_SUBDOMAIN),
                "domain {} lacks general",
                domain.id
            );
        }
    }

    #[test]
    fn test_missing_general_rejected() {
        let json = r#"[{"id":"x","display":"X","subdomains":[{"id":"y","display":"Y"}]}]"#;
        assert!(Taxonomy::from_json(json).is_err());
    }

    #[test]
    fn test_matching_terms_for_retrieval() {
        let tax = Taxonomy::builtin();
        let terms =
            tax.matching_terms("criminal_law", "kidnapping_abduction", "my child was kidnapped for ransom");
        assert!(terms.contains(&"kidnapped".to_string()));
        assert!(terms.contains(&"ransom".to_string()));
        assert!(terms.contains(&"kidnapped for ransom".to_string()));
        assert!(!terms.contains(&"murder".to_string()));
    }

    #[test]
    fn test_display_lookups() {
        let tax = Taxonomy::builtin();
        assert_eq!(tax.display("criminal_law"), "Criminal Law");
        assert_eq!(tax.subdomain_display("criminal_law", "drug_crime"), "Drug Offences");
        // Unknown ids fall through to the id itself.
        assert_eq!(tax.display("nope"), "nope");
    }

    #[test]
    fn test_display_search() {
        let tax = Taxonomy::builtin();
        let ids = tax.domain_ids_matching_display("cyber");
        assert_eq!(ids, vec!["cyber_law".to_string()]);
    }
}
