use std::collections::BTreeMap;

use serde::Serialize;

use crate::data_models::{BatchResult, CallFailure, CallSummary, ExtractedDocument, KeywordBatch};
use crate::extractor::NO_LINK;
use crate::similarity::{SimilarityMatrix, TfIdfVectorizer};

/// Merge-intersection of two sorted, deduplicated lists.
pub fn intersect_sorted<T>(list1: &[T], list2: &[T], out: &mut Vec<T>)
where
    T: Ord + Clone,
{
    let (mut i, mut j) = (0usize, 0usize);
    while i < list1.len() && j < list2.len() {
        match list1[i].cmp(&list2[j]) {
            std::cmp::Ordering::Equal => {
                out.push(list1[i].clone());
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
        }
    }
}

/// Elements of sorted `list1` that are absent from sorted `list2`.
pub fn subtract_sorted<T>(list1: &[T], list2: &[T], out: &mut Vec<T>)
where
    T: Ord + Clone,
{
    let mut j = 0usize;
    for item in list1 {
        while j < list2.len() && list2[j] < *item {
            j += 1;
        }
        if j >= list2.len() || list2[j] != *item {
            out.push(item.clone());
        }
    }
}

fn sorted_link_set<'a>(links: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut set: Vec<String> = links
        .into_iter()
        .filter(|l| *l != NO_LINK && !l.is_empty())
        .map(str::to_string)
        .collect();
    set.sort();
    set.dedup();
    set
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkOverlap {
    pub shared: Vec<String>,
    pub ai_only: Vec<String>,
    pub organic_only: Vec<String>,
}

impl LinkOverlap {
    pub fn ai_total(&self) -> usize {
        self.shared.len() + self.ai_only.len()
    }

    pub fn organic_total(&self) -> usize {
        self.shared.len() + self.organic_only.len()
    }
}

/// Compares AI-overview reference links with organic links as sets. The
/// placeholder link is not a real link and is left out of both sides. Every
/// list in the result is sorted.
pub fn link_overlap<'a>(
    ai_links: impl IntoIterator<Item = &'a str>,
    organic_links: impl IntoIterator<Item = &'a str>,
) -> LinkOverlap {
    let ai = sorted_link_set(ai_links);
    let organic = sorted_link_set(organic_links);

    let mut overlap = LinkOverlap::default();
    intersect_sorted(&ai, &organic, &mut overlap.shared);
    subtract_sorted(&ai, &organic, &mut overlap.ai_only);
    subtract_sorted(&organic, &ai, &mut overlap.organic_only);
    overlap
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LinkOccurrence {
    pub link: String,
    pub count: usize,
    /// Seen in more than one place.
    pub shared: bool,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct OccurrenceReport {
    pub links: Vec<LinkOccurrence>,
    pub shared_count: usize,
    pub distinct_count: usize,
    pub shared_pct: f64,
    pub distinct_pct: f64,
}

/// Counts each link, then splits them into shared (count > 1) and distinct
/// (count == 1). Percentages are of unique links; rows are sorted by link.
pub fn occurrence_report<'a>(links: impl IntoIterator<Item = &'a str>) -> OccurrenceReport {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for link in links.into_iter().filter(|l| *l != NO_LINK && !l.is_empty()) {
        *counts.entry(link).or_insert(0) += 1;
    }

    let links: Vec<LinkOccurrence> = counts
        .into_iter()
        .map(|(link, count)| LinkOccurrence {
            link: link.to_string(),
            count,
            shared: count > 1,
        })
        .collect();

    let shared_count = links.iter().filter(|l| l.shared).count();
    let distinct_count = links.len() - shared_count;
    let pct = |part: usize| {
        if links.is_empty() {
            0.0
        } else {
            part as f64 * 100.0 / links.len() as f64
        }
    };

    OccurrenceReport {
        shared_pct: pct(shared_count),
        distinct_pct: pct(distinct_count),
        shared_count,
        distinct_count,
        links,
    }
}

/// Everything the presentation layer needs for one keyword, as plain values.
#[derive(Serialize, Debug, Clone)]
pub struct KeywordReport {
    pub keyword: String,
    pub summary: CallSummary,
    pub documents: Vec<ExtractedDocument>,
    /// `None` when no call produced a document.
    pub similarity: Option<SimilarityMatrix>,
    pub mean_similarity: Option<f64>,
    pub link_overlap: LinkOverlap,
    pub organic_occurrences: OccurrenceReport,
    pub reference_occurrences: OccurrenceReport,
    pub no_result_indices: Vec<usize>,
    pub failures: Vec<CallFailure>,
}

pub struct Aggregator {
    vectorizer: TfIdfVectorizer,
}

impl Aggregator {
    pub fn new(vectorizer: TfIdfVectorizer) -> Self {
        Self { vectorizer }
    }

    pub fn similarity(&self, documents: &[ExtractedDocument]) -> Option<SimilarityMatrix> {
        if documents.is_empty() {
            return None;
        }
        let labels = documents
            .iter()
            .map(|d| format!("call {} ({})", d.call_index, d.source_location))
            .collect();
        let texts: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();
        Some(self.vectorizer.similarity(labels, &texts))
    }

    pub fn report(&self, batch: &KeywordBatch) -> KeywordReport {
        let similarity = self.similarity(&batch.documents);
        let mean_similarity = similarity.as_ref().and_then(|m| m.mean_off_diagonal());
        KeywordReport {
            keyword: batch.keyword.clone(),
            summary: batch.summary(),
            documents: batch.documents.clone(),
            mean_similarity,
            similarity,
            link_overlap: link_overlap(batch.reference_links(), batch.organic_links()),
            organic_occurrences: occurrence_report(batch.organic_links()),
            reference_occurrences: occurrence_report(batch.reference_links()),
            no_result_indices: batch.no_result_indices.iter().copied().collect(),
            failures: batch.failures.clone(),
        }
    }

    pub fn report_all(&self, result: &BatchResult) -> Vec<KeywordReport> {
        result.keywords.iter().map(|k| self.report(k)).collect()
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(TfIdfVectorizer::default())
    }
}
