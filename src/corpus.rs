//! Corpus store
//!
//! Immutable access to the BNS/IPC/CrPC section tables and the
//! constitutional article table. Everything is indexed once at load:
//! identity lookups and keyword/subdomain queries are map hits afterwards,
//! and nothing here can fail once construction succeeds.

use crate::error::{EngineError, EngineResult};
use crate::normalize::normalize;
use crate::types::{CodeBook, ConstitutionalArticle, Section};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Compare statute numbers with a numeric prefix and an alphanumeric
/// suffix: "7" < "41" < "41A" < "41B" < "100" < "100A". Articles use the
/// same shape ("21A", "300A").
pub fn compare_statute_numbers(a: &str, b: &str) -> Ordering {
    let (na, sa) = split_number(a);
    let (nb, sb) = split_number(b);
    na.cmp(&nb).then_with(|| sa.cmp(sb))
}

fn split_number(number: &str) -> (u64, &str) {
    let digits_end = number
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(number.len());
    let prefix = number[..digits_end].parse::<u64>().unwrap_or(0);
    (prefix, &number[digits_end..])
}

/// Read-only corpus with precomputed inverted indices.
#[derive(Debug)]
pub struct Corpus {
    sections: HashMap<(CodeBook, String), Section>,
    /// (code, normalized keyword) -> section numbers carrying it.
    by_keyword: HashMap<(CodeBook, String), Vec<String>>,
    /// (code, subdomain id) -> section numbers linked to it.
    by_subdomain: HashMap<(CodeBook, String), Vec<String>>,
    articles: Vec<ConstitutionalArticle>,
}

impl Corpus {
    /// Build a corpus from the four JSON tables. Fails with `CorpusLoad` on
    /// malformed rows; after a successful return the corpus never fails.
    pub fn from_json(
        bns: &str,
        ipc: &str,
        crpc: &str,
        articles: &str,
    ) -> EngineResult<Self> {
        let mut corpus = Corpus {
            sections: HashMap::new(),
            by_keyword: HashMap::new(),
            by_subdomain: HashMap::new(),
            articles: Vec::new(),
        };

        corpus.load_section_table(bns, CodeBook::Bns)?;
        corpus.load_section_table(ipc, CodeBook::Ipc)?;
        corpus.load_section_table(crpc, CodeBook::Crpc)?;
        corpus.load_article_table(articles)?;

        Ok(corpus)
    }

    /// The corpus compiled into the crate.
    pub fn builtin() -> EngineResult<Self> {
        Self::from_json(
            include_str!("../data/sections_bns.json"),
            include_str!("../data/sections_ipc.json"),
            include_str!("../data/sections_crpc.json"),
            include_str!("../data/articles.json"),
        )
    }

    fn load_section_table(&mut self, json: &str, expected: CodeBook) -> EngineResult<()> {
        let rows: Vec<Section> = serde_json::from_str(json).map_err(|e| {
            EngineError::CorpusLoad(format!("{} section table: {}", expected.name(), e))
        })?;

        for mut section in rows {
            if section.code != expected {
                return Err(EngineError::CorpusLoad(format!(
                    "section {} declares code {} inside the {} table",
                    section.number,
                    section.code.name(),
                    expected.name()
                )));
            }
            if section.number.trim().is_empty() {
                return Err(EngineError::CorpusLoad(format!(
                    "{} section with empty number (title: {:?})",
                    expected.name(),
                    section.title
                )));
            }

            // Keywords are matched against normalized queries, so they are
            // normalized once here.
            section.keywords = section.keywords.iter().map(|k| normalize(k)).collect();

            let key = (section.code, section.number.clone());
            if self.sections.contains_key(&key) {
                return Err(EngineError::CorpusLoad(format!(
                    "duplicate section identity {} {}",
                    expected.name(),
                    section.number
                )));
            }

            for keyword in &section.keywords {
                self.by_keyword
                    .entry((section.code, keyword.clone()))
                    .or_default()
                    .push(section.number.clone());
            }
            for subdomain in &section.linked_subdomains {
                self.by_subdomain
                    .entry((section.code, subdomain.clone()))
                    .or_default()
                    .push(section.number.clone());
            }

            self.sections.insert(key, section);
        }

        Ok(())
    }

    fn load_article_table(&mut self, json: &str) -> EngineResult<()> {
        let mut rows: Vec<ConstitutionalArticle> = serde_json::from_str(json)
            .map_err(|e| EngineError::CorpusLoad(format!("article table: {}", e)))?;

        let mut seen = HashSet::new();
        for article in &mut rows {
            if article.number.trim().is_empty() {
                return Err(EngineError::CorpusLoad(format!(
                    "article with empty number (title: {:?})",
                    article.title
                )));
            }
            if !seen.insert(article.number.clone()) {
                return Err(EngineError::CorpusLoad(format!(
                    "duplicate article number {}",
                    article.number
                )));
            }
            article.keywords = article.keywords.iter().map(|k| normalize(k)).collect();
        }

        rows.sort_by(|a, b| compare_statute_numbers(&a.number, &b.number));
        self.articles = rows;
        Ok(())
    }

    /// Identity lookup.
    pub fn get_section(&self, code: CodeBook, number: &str) -> Option<&Section> {
        self.sections.get(&(code, number.to_string()))
    }

    /// All sections of one code carrying a (normalized) keyword.
    pub fn sections_by_keyword(&self, code: CodeBook, keyword: &str) -> Vec<&Section> {
        self.by_keyword
            .get(&(code, keyword.to_string()))
            .map(|numbers| {
                numbers
                    .iter()
                    .filter_map(|n| self.sections.get(&(code, n.clone())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All sections of one code linked to a subdomain.
    pub fn sections_by_subdomain(&self, code: CodeBook, subdomain_id: &str) -> Vec<&Section> {
        self.by_subdomain
            .get(&(code, subdomain_id.to_string()))
            .map(|numbers| {
                numbers
                    .iter()
                    .filter_map(|n| self.sections.get(&(code, n.clone())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Articles in statute-number order.
    pub fn all_articles(&self) -> &[ConstitutionalArticle] {
        &self.articles
    }

    pub fn section_count(&self, code: CodeBook) -> usize {
        self.sections.keys().filter(|(c, _)| *c == code).count()
    }

    pub fn article_count(&self) -> usize {
        self.articles.len()
    }
}
