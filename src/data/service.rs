//! Service layer for seeding the sample store from offline datasets.
//!
//! The offline training tool exports CSVs with the feature columns by name and
//! the measured peak under `peak_mem_mb`; the store's own format uses
//! `label_mb`. Columns are located by header name, so order does not matter.

use std::path::Path;
use std::time::Instant;

use tracing::info;

use crate::common::error::{MemError, MemResult};
use crate::common::time;

use super::domain::{FeatureVector, LabeledSample, SampleRepo, CSV_HEADER};
use super::repo_fs::{parse_count, parse_real};

const LABEL_COLUMNS: [&str; 3] = ["label_mb", "label_peak_mb", "peak_mem_mb"];

/// Outcome of a bulk import.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: u64,
    pub skipped: u64,
}

struct ColumnMap {
    features: [usize; 8],
    producer: Option<usize>,
    label: usize,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> MemResult<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let mut features = [0usize; 8];
        for (slot, name) in features.iter_mut().zip(CSV_HEADER.iter()) {
            *slot = find(*name)
                .ok_or_else(|| MemError::invalid(format!("missing column {name}")))?;
        }
        let label = LABEL_COLUMNS
            .iter()
            .find_map(|name| find(*name))
            .ok_or_else(|| {
                MemError::invalid("missing label column (label_mb, label_peak_mb or peak_mem_mb)")
            })?;
        Ok(Self {
            features,
            producer: find("producer"),
            label,
        })
    }

    fn parse(&self, record: &csv::StringRecord) -> Option<LabeledSample> {
        let real = |i: usize| record.get(self.features[i]).and_then(parse_real);
        let count = |i: usize| record.get(self.features[i]).and_then(parse_count);
        let features = FeatureVector {
            size_mb: real(0)?,
            pages: count(1)?,
            image_page_ratio: real(2)?,
            dpi_estimate: count(3)?,
            avg_image_size_kb: real(4)?,
            fonts_embedded_pct: real(5)?,
            xref_error_count: count(6)?,
            ocr_required: count(7)?,
            producer: self
                .producer
                .and_then(|i| record.get(i))
                .unwrap_or_default()
                .to_string(),
        };
        features.validate().ok()?;
        let label_mb = record.get(self.label).and_then(parse_real)?;
        let sample = LabeledSample::new(features, label_mb);
        sample.is_valid().then_some(sample)
    }
}

/// Append every well-formed row of an offline CSV to `repo`.
///
/// Missing required columns fail the whole import; bad rows are counted and skipped.
pub fn import_csv(repo: &dyn SampleRepo, path: &Path) -> MemResult<ImportReport> {
    let start = Instant::now();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let columns = ColumnMap::from_headers(reader.headers()?)?;

    let mut report = ImportReport::default();
    for record in reader.records() {
        match record.ok().and_then(|r| columns.parse(&r)) {
            Some(sample) => {
                repo.append(&sample)?;
                report.imported += 1;
            }
            None => report.skipped += 1,
        }
    }

    info!(
        ev = "sample_import",
        path = %path.display(),
        imported = report.imported,
        skipped = report.skipped,
        dur_ms = time::elapsed_ms(start)
    );
    Ok(report)
}
