//! TF-IDF text vectorizer for project descriptions

use crate::error::{Result, SuccessError};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Text vectorizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TfidfConfig {
    /// Vocabulary cap, most frequent terms win
    pub max_features: usize,
    /// Inclusive n-gram length range
    pub ngram_range: (usize, usize),
    /// Minimum number of documents a term must appear in
    pub min_df: usize,
    /// Maximum fraction of documents a term may appear in
    pub max_df: f64,
    /// Replace raw term counts with 1 + ln(count)
    pub sublinear_tf: bool,
    /// Shortest token kept, in characters
    pub min_token_chars: usize,
}

impl Default for TfidfConfig {
    fn default() -> Self {
        Self {
            max_features: 3000,
            ngram_range: (1, 3),
            min_df: 1,
            max_df: 0.95,
            sublinear_tf: true,
            min_token_chars: 2,
        }
    }
}

impl TfidfConfig {
    pub fn with_max_features(mut self, n: usize) -> Self {
        self.max_features = n;
        self
    }

    pub fn with_ngram_range(mut self, min: usize, max: usize) -> Self {
        self.ngram_range = (min.max(1), max.max(min.max(1)));
        self
    }
}

/// Fitted TF-IDF vectorizer with smooth IDF and L2-normalized rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    config: TfidfConfig,
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    pub fn new(config: TfidfConfig) -> Self {
        Self {
            config,
            vocabulary: BTreeMap::new(),
            idf: Vec::new(),
        }
    }

    /// Learn the vocabulary and IDF weights. An empty vocabulary is allowed.
    pub fn fit(&mut self, documents: &[&str]) -> Result<()> {
        if documents.is_empty() {
            return Err(SuccessError::Input("cannot fit vectorizer on zero documents".to_string()));
        }
        let n_docs = documents.len();
        let max_doc_count = self.config.max_df * n_docs as f64;

        let mut term_freq: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        for doc in documents {
            let ngrams = self.ngrams(&self.tokenize(doc));
            let unique: HashSet<&String> = ngrams.iter().collect();
            for term in unique {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            for term in ngrams {
                *term_freq.entry(term).or_insert(0) += 1;
            }
        }

        let mut kept: Vec<(String, usize)> = term_freq
            .into_iter()
            .filter(|(term, _)| {
                let df = doc_freq.get(term).copied().unwrap_or(0);
                df >= self.config.min_df && df as f64 <= max_doc_count
            })
            .collect();
        kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        kept.truncate(self.config.max_features);

        let mut terms: Vec<String> = kept.into_iter().map(|(term, _)| term).collect();
        terms.sort();

        let n = n_docs as f64;
        self.idf = terms
            .iter()
            .map(|t| {
                let df = doc_freq.get(t).copied().unwrap_or(0) as f64;
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        self.vocabulary = terms.into_iter().enumerate().map(|(i, t)| (t, i)).collect();
        Ok(())
    }

    pub fn transform(&self, documents: &[&str]) -> Array2<f64> {
        let n_features = self.vocabulary.len();
        let mut matrix = Array2::zeros((documents.len(), n_features));
        if n_features == 0 {
            return matrix;
        }

        for (row, doc) in documents.iter().enumerate() {
            let mut counts: HashMap<usize, f64> = HashMap::new();
            for term in self.ngrams(&self.tokenize(doc)) {
                if let Some(&idx) = self.vocabulary.get(&term) {
                    *counts.entry(idx).or_insert(0.0) += 1.0;
                }
            }
            for (idx, count) in counts {
                let tf = if self.config.sublinear_tf { 1.0 + count.ln() } else { count };
                matrix[[row, idx]] = tf * self.idf[idx];
            }

            let norm = matrix.row(row).iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                matrix.row_mut(row).mapv_inplace(|v| v / norm);
            }
        }
        matrix
    }

    pub fn n_features(&self) -> usize {
        self.vocabulary.len()
    }

    /// Vocabulary terms in column order
    pub fn feature_names(&self) -> Vec<&str> {
        let mut names = vec![""; self.vocabulary.len()];
        for (term, &idx) in &self.vocabulary {
            names[idx] = term.as_str();
        }
        names
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|s| s.chars().count() >= self.config.min_token_chars)
            .map(str::to_string)
            .collect()
    }

    fn ngrams(&self, tokens: &[String]) -> Vec<String> {
        let (min_n, max_n) = self.config.ngram_range;
        let mut out = Vec::new();
        for n in min_n.max(1)..=max_n {
            if tokens.len() < n {
                break;
            }
            for window in tokens.windows(n) {
                out.push(window.join(" "));
            }
        }
        out
    }
}
