//! TF-IDF vectorization and pairwise cosine similarity.
//!
//! The vocabulary and document frequencies are fitted on exactly the
//! documents passed to one call, so scores are comparable within a grouping
//! but not across groupings.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::analyzer::TextAnalyzer;

/// Term index → weight. Ordered so iteration (and float summation) is stable.
pub type SparseVector = BTreeMap<usize, f64>;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    pub labels: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl SimilarityMatrix {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.values.get(i)?.get(j).copied()
    }

    /// Mean of the entries above the diagonal; `None` below two documents.
    pub fn mean_off_diagonal(&self) -> Option<f64> {
        let n = self.len();
        if n < 2 {
            return None;
        }
        let mut sum = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                sum += self.values[i][j];
            }
        }
        Some(sum / ((n * (n - 1) / 2) as f64))
    }
}

pub struct TfIdfVectorizer {
    analyzer: TextAnalyzer,
}

impl TfIdfVectorizer {
    pub fn new(analyzer: TextAnalyzer) -> Self {
        Self { analyzer }
    }

    /// Fits a vocabulary on `docs` and returns one L2-normalized vector per
    /// document. Weights are raw counts × `ln((1 + n) / (1 + df)) + 1`.
    pub fn fit_transform(&self, docs: &[&str]) -> Vec<SparseVector> {
        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let counts: Vec<HashMap<usize, usize>> = docs
            .iter()
            .map(|doc| {
                let mut tf = HashMap::new();
                for term in self.analyzer.terms(doc) {
                    let next_id = vocabulary.len();
                    let id = *vocabulary.entry(term).or_insert(next_id);
                    *tf.entry(id).or_insert(0usize) += 1;
                }
                tf
            })
            .collect();

        let mut df = vec![0usize; vocabulary.len()];
        for tf in &counts {
            for &id in tf.keys() {
                df[id] += 1;
            }
        }

        let n = docs.len() as f64;
        let idf: Vec<f64> = df
            .iter()
            .map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
            .collect();

        counts
            .into_iter()
            .map(|tf| {
                let mut vector: SparseVector = tf
                    .into_iter()
                    .map(|(id, count)| (id, count as f64 * idf[id]))
                    .collect();
                l2_normalize(&mut vector);
                vector
            })
            .collect()
    }

    /// Pairwise cosine similarity of `docs`. `labels` name the rows and must
    /// be as long as `docs`.
    pub fn similarity(&self, labels: Vec<String>, docs: &[&str]) -> SimilarityMatrix {
        debug_assert_eq!(labels.len(), docs.len(), "one label per document");
        let vectors = self.fit_transform(docs);
        let n = vectors.len();
        let mut values = vec![vec![0.0; n]; n];
        for i in 0..n {
            values[i][i] = 1.0;
            for j in (i + 1)..n {
                let score = cosine_similarity(&vectors[i], &vectors[j]).clamp(0.0, 1.0);
                values[i][j] = score;
                values[j][i] = score;
            }
        }
        SimilarityMatrix { labels, values }
    }
}

impl Default for TfIdfVectorizer {
    fn default() -> Self {
        Self::new(TextAnalyzer::default())
    }
}

fn l2_norm(v: &SparseVector) -> f64 {
    v.values().map(|x| x * x).sum::<f64>().sqrt()
}

fn l2_normalize(v: &mut SparseVector) {
    let norm = l2_norm(v);
    if norm > 0.0 {
        for x in v.values_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity of two sparse vectors, or 0.0 if either has zero norm.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(id, x)| large.get(id).map(|y| x * y))
        .sum();
    let denom = l2_norm(a) * l2_norm(b);
    if denom < 1e-12 {
        return 0.0;
    }
    dot / denom
}
