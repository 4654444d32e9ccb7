//! Exporting results through a narrow "store artifact" capability.
//!
//! Nothing in the driver or the aggregator touches the filesystem directly;
//! they hand named byte blobs to an [`ArtifactStore`].

use std::collections::BTreeMap;
use std::fs;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::aggregator::{KeywordReport, OccurrenceReport};
use crate::data_models::KeywordBatch;

pub trait ArtifactStore: Send {
    /// Stores `bytes` under `name`. Names use `/` as a separator.
    fn store(&mut self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Flushes anything buffered. Stores that write eagerly have nothing to do.
    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// Keeps artifacts in memory, keyed by name.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub artifacts: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.artifacts.get(name).map(Vec::as_slice)
    }
}

impl ArtifactStore for MemoryStore {
    fn store(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.artifacts.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// Writes each artifact as a file below `root`, creating directories as needed.
#[derive(Debug)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create output directory {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactStore for DirectoryStore {
    fn store(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Bundles every artifact into one deflated zip archive.
pub struct ZipArchiveStore<W: Write + Seek> {
    writer: ZipWriter<W>,
    options: SimpleFileOptions,
}

impl<W: Write + Seek> ZipArchiveStore<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: ZipWriter::new(inner),
            options: SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated),
        }
    }

    /// Writes the central directory and returns the underlying writer.
    pub fn finish(self) -> Result<W> {
        self.writer.finish().context("Failed to finish zip archive")
    }
}

impl ZipArchiveStore<fs::File> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = fs::File::create(path)
            .with_context(|| format!("Failed to create archive {}", path.display()))?;
        Ok(Self::new(file))
    }
}

impl<W: Write + Seek + Send> ArtifactStore for ZipArchiveStore<W> {
    fn store(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.writer
            .start_file(name, self.options)
            .with_context(|| format!("Failed to add {name} to zip archive"))?;
        self.writer
            .write_all(bytes)
            .with_context(|| format!("Failed to write {name} to zip archive"))
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.finish().map(|_| ())
    }
}

/// Lowercase ASCII alphanumerics, everything else collapsed to `_`.
pub fn slug(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Artifact name for the raw JSON of one call.
pub fn raw_response_name(keyword: &str, call_index: usize, location: &str) -> String {
    format!("raw/{}_{}_{}.json", slug(keyword), call_index, slug(location))
}

/// Rows of named columns, serialized as CSV.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.headers.len(), "row width mismatch");
        self.rows.push(row);
    }

    /// Rows as column-name → value maps.
    pub fn records(&self) -> Vec<BTreeMap<&str, &str>> {
        self.rows
            .iter()
            .map(|row| {
                self.headers
                    .iter()
                    .map(String::as_str)
                    .zip(row.iter().map(String::as_str))
                    .collect()
            })
            .collect()
    }

    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {}", e))
    }
}

pub fn organic_table(batch: &KeywordBatch) -> Table {
    let mut table = Table::new(&["call", "location", "position", "title", "link", "snippet"]);
    for rec in &batch.organic_results {
        table.push(vec![
            rec.call_index.to_string(),
            rec.location.clone(),
            rec.position.to_string(),
            rec.result.title.clone(),
            rec.result.link.clone(),
            rec.result.snippet.clone(),
        ]);
    }
    table
}

pub fn documents_table(report: &KeywordReport) -> Table {
    let mut table = Table::new(&["call", "location", "text", "references"]);
    for doc in &report.documents {
        let refs = doc
            .references
            .iter()
            .map(|r| format!("{} <{}>", r.title, r.link))
            .collect::<Vec<String>>()
            .join("; ");
        table.push(vec![
            doc.call_index.to_string(),
            doc.source_location.clone(),
            doc.text.clone(),
            refs,
        ]);
    }
    table
}

pub fn similarity_table(report: &KeywordReport) -> Option<Table> {
    let matrix = report.similarity.as_ref()?;
    let mut headers = vec![String::new()];
    headers.extend(matrix.labels.iter().cloned());
    let mut table = Table {
        headers,
        rows: Vec::new(),
    };
    for (label, row) in matrix.labels.iter().zip(&matrix.values) {
        let mut cells = vec![label.clone()];
        cells.extend(row.iter().map(|v| format!("{v:.4}")));
        table.push(cells);
    }
    Some(table)
}

pub fn overlap_table(report: &KeywordReport) -> Table {
    let mut table = Table::new(&["link", "category"]);
    let overlap = &report.link_overlap;
    for (links, category) in [
        (&overlap.shared, "shared"),
        (&overlap.ai_only, "ai_only"),
        (&overlap.organic_only, "organic_only"),
    ] {
        for link in links {
            table.push(vec![link.clone(), category.to_string()]);
        }
    }
    table
}

pub fn occurrence_table(report: &OccurrenceReport) -> Table {
    let mut table = Table::new(&["link", "count", "category"]);
    for occ in &report.links {
        let category = if occ.shared { "shared" } else { "distinct" };
        table.push(vec![occ.link.clone(), occ.count.to_string(), category.into()]);
    }
    table
}

pub fn calls_table(batch: &KeywordBatch) -> Table {
    let mut table = Table::new(&[
        "call",
        "location",
        "outcome",
        "error_kind",
        "detail",
        "raw_html_file",
    ]);
    for call in &batch.calls {
        let failure = batch.failures.iter().find(|f| f.call_index == call.call_index);
        table.push(vec![
            call.call_index.to_string(),
            call.location.clone(),
            format!("{:?}", call.outcome),
            failure.map(|f| f.kind.to_string()).unwrap_or_default(),
            failure.map(|f| f.detail.clone()).unwrap_or_default(),
            call.raw_html_file.clone().unwrap_or_default(),
        ]);
    }
    table
}

/// Writes the CSV set for every keyword. `batches` and `reports` are
/// matched by keyword position.
pub fn export_reports(
    store: &mut dyn ArtifactStore,
    batches: &[KeywordBatch],
    reports: &[KeywordReport],
) -> Result<usize> {
    let mut written = 0;
    for (batch, report) in batches.iter().zip(reports) {
        let prefix = slug(&report.keyword);
        let mut tables = vec![
            ("organic", organic_table(batch)),
            ("documents", documents_table(report)),
            ("overlap", overlap_table(report)),
            ("organic_occurrences", occurrence_table(&report.organic_occurrences)),
            ("reference_occurrences", occurrence_table(&report.reference_occurrences)),
            ("calls", calls_table(batch)),
        ];
        if let Some(table) = similarity_table(report) {
            tables.push(("similarity", table));
        }
        for (name, table) in tables {
            let artifact = format!("{prefix}/{name}.csv");
            store.store(&artifact, &table.to_csv()?)?;
            written += 1;
        }
    }
    log::info!("exported {written} tables");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_collapses_separators() {
        assert_eq!(slug("Austin, Texas, United States"), "austin_texas_united_states");
        assert_eq!(slug("  best coffee!! "), "best_coffee");
        assert_eq!(slug("???"), "untitled");
    }

    #[test]
    fn raw_response_name_is_stable() {
        assert_eq!(
            raw_response_name("best coffee", 2, "Paris, France"),
            "raw/best_coffee_2_paris_france.json"
        );
    }

    #[test]
    fn csv_quotes_fields() {
        let mut table = Table::new(&["title", "link"]);
        table.push(vec!["a, \"quoted\" title".into(), "https://x".into()]);
        let csv = String::from_utf8(table.to_csv().unwrap()).unwrap();
        assert_eq!(csv, "title,link\n\"a, \"\"quoted\"\" title\",https://x\n");
    }

    #[test]
    fn records_map_headers_to_values() {
        let mut table = Table::new(&["a", "b"]);
        table.push(vec!["1".into(), "2".into()]);
        let records = table.records();
        assert_eq!(records[0].get("b"), Some(&"2"));
    }

    #[test]
    fn memory_store_keeps_bytes() {
        let mut store = MemoryStore::new();
        store.store("x/y.json", b"{}").unwrap();
        assert_eq!(store.get("x/y.json"), Some(&b"{}"[..]));
    }
}
