//! Filesystem-backed sample store: one CSV row per labeled sample.
//!
//! Rows are appended with a single write under a mutex and fsynced before the
//! append is acknowledged. Reads skip anything malformed row by row.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::common::config::AppCfg;
use crate::common::error::{MemError, MemResult};

use super::domain::{FeatureVector, LabeledSample, SampleRepo, CSV_HEADER};

/// Append-only CSV sample log.
pub struct FsSampleRepo {
    path: PathBuf,
    write_lock: Mutex<()>,
    valid: AtomicU64,
}

impl FsSampleRepo {
    /// Open (or create) the log at `path` and recount its valid rows.
    pub fn open(path: impl Into<PathBuf>) -> MemResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let existing = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        if existing == 0 {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&path)?;
            file.write_all(&encode_record(&CSV_HEADER)?)?;
            file.sync_all()?;
        } else {
            ensure_trailing_newline(&path)?;
        }

        let valid = read_samples(&path)?.len() as u64;
        info!(ev = "sample_store_open", path = %path.display(), samples = valid);
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
            valid: AtomicU64::new(valid),
        })
    }

    pub fn from_config(cfg: &AppCfg) -> MemResult<Self> {
        Self::open(&cfg.samples_csv)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SampleRepo for FsSampleRepo {
    fn append(&self, sample: &LabeledSample) -> MemResult<u64> {
        sample.features.validate()?;
        if sample.label_mb.is_nan() || sample.label_mb.is_infinite() {
            return Err(MemError::invalid("label must be finite"));
        }
        let row = encode_sample(sample)?;

        let _guard = self.write_lock.lock();
        let mut file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        let prev_len = file.metadata()?.len();
        let mut bytes = Vec::with_capacity(row.len() + 1);
        if prev_len > 0 && !ends_with_newline(&mut file)? {
            bytes.push(b'\n');
        }
        bytes.extend_from_slice(&row);

        // A row is either fully on disk and synced, or not there at all.
        if let Err(e) = file.write_all(&bytes).and_then(|()| file.sync_data()) {
            if let Err(rollback) = file.set_len(prev_len).and_then(|()| file.sync_data()) {
                warn!(ev = "sample_append_rollback_failed", error = %rollback);
            }
            warn!(ev = "sample_append_failed", error = %e);
            return Err(e.into());
        }

        let count = if sample.is_valid() {
            self.valid.fetch_add(1, Ordering::SeqCst) + 1
        } else {
            self.valid.load(Ordering::SeqCst)
        };
        debug!(ev = "sample_append", label_mb = sample.label_mb, samples = count);
        Ok(count)
    }

    fn count(&self) -> u64 {
        self.valid.load(Ordering::SeqCst)
    }

    fn load_all(&self) -> MemResult<Vec<LabeledSample>> {
        read_samples(&self.path)
    }
}

fn encode_record(fields: &[&str]) -> MemResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(fields)?;
    writer
        .into_inner()
        .map_err(|e| MemError::internal(format!("csv buffer: {e}")))
}

fn encode_sample(sample: &LabeledSample) -> MemResult<Vec<u8>> {
    let f = &sample.features;
    let fields = [
        f.size_mb.to_string(),
        f.pages.to_string(),
        f.image_page_ratio.to_string(),
        f.dpi_estimate.to_string(),
        f.avg_image_size_kb.to_string(),
        f.fonts_embedded_pct.to_string(),
        f.xref_error_count.to_string(),
        f.ocr_required.to_string(),
        f.producer.clone(),
        sample.label_mb.to_string(),
    ];
    let refs: Vec<&str> = fields.iter().map(String::as_str).collect();
    encode_record(&refs)
}

/// A crash can leave a half-written last row; terminate it so the next
/// append starts on a fresh line instead of merging into it.
fn ensure_trailing_newline(path: &Path) -> MemResult<()> {
    let mut file = OpenOptions::new().read(true).append(true).open(path)?;
    if !ends_with_newline(&mut file)? {
        warn!(ev = "sample_store_repair", path = %path.display());
        file.write_all(b"\n")?;
        file.sync_data()?;
    }
    Ok(())
}

/// Caller guarantees the file is non-empty.
fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

pub(crate) fn read_samples(path: &Path) -> MemResult<Vec<LabeledSample>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut samples = Vec::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        match record.ok().and_then(|r| parse_record(&r)) {
            Some(sample) if sample.is_valid() => samples.push(sample),
            Some(_) => {}
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!(ev = "sample_rows_skipped", skipped, path = %path.display());
    }
    Ok(samples)
}

pub(crate) fn parse_record(record: &csv::StringRecord) -> Option<LabeledSample> {
    if record.len() != CSV_HEADER.len() {
        return None;
    }
    let features = FeatureVector {
        size_mb: parse_real(record.get(0)?)?,
        pages: parse_count(record.get(1)?)?,
        image_page_ratio: parse_real(record.get(2)?)?,
        dpi_estimate: parse_count(record.get(3)?)?,
        avg_image_size_kb: parse_real(record.get(4)?)?,
        fonts_embedded_pct: parse_real(record.get(5)?)?,
        xref_error_count: parse_count(record.get(6)?)?,
        ocr_required: parse_count(record.get(7)?)?,
        producer: record.get(8)?.to_string(),
    };
    features.validate().ok()?;
    let label_mb: f64 = record.get(9)?.parse().ok()?;
    if !label_mb.is_finite() {
        return None;
    }
    Some(LabeledSample::new(features, label_mb))
}

pub(crate) fn parse_real(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integral columns; tolerate `3.0` written by other tools.
pub(crate) fn parse_count(raw: &str) -> Option<u32> {
    if let Ok(v) = raw.parse::<u32>() {
        return Some(v);
    }
    let v = parse_real(raw)?;
    if v >= 0.0 && v.fract() == 0.0 && v <= f64::from(u32::MAX) {
        Some(v as u32)
    } else {
        None
    }
}
