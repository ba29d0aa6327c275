//! Feature vectors, labeled samples and the sample store contract.

use serde::{Deserialize, Serialize};

use crate::common::error::{MemError, MemResult};

/// Number of numeric dimensions fed to the local model.
pub const FEATURE_DIMS: usize = 8;

/// Reserved value meaning "unknown" for labels and predictions.
pub const SENTINEL_MB: f64 = -1.0;

/// Column order of the persisted sample log.
pub const CSV_HEADER: [&str; 10] = [
    "size_mb",
    "pages",
    "image_page_ratio",
    "dpi_estimate",
    "avg_image_size_kb",
    "fonts_embedded_pct",
    "xref_error_count",
    "ocr_required",
    "producer",
    "label_mb",
];

/// Fixed-shape description of a source document.
///
/// Field names match the wire format of the remote predictor. `producer` is
/// carried for logging only and never reaches the numeric vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub size_mb: f64,
    pub pages: u32,
    pub image_page_ratio: f64,
    pub dpi_estimate: u32,
    pub avg_image_size_kb: f64,
    pub fonts_embedded_pct: f64,
    pub xref_error_count: u32,
    pub ocr_required: u32,
    #[serde(default)]
    pub producer: String,
}

impl FeatureVector {
    /// Numeric view in the fixed column order.
    pub fn to_array(&self) -> [f64; FEATURE_DIMS] {
        [
            self.size_mb,
            f64::from(self.pages),
            self.image_page_ratio,
            f64::from(self.dpi_estimate),
            self.avg_image_size_kb,
            self.fonts_embedded_pct,
            f64::from(self.xref_error_count),
            f64::from(self.ocr_required),
        ]
    }

    /// Basic shape checks applied before anything touches the model or the store.
    pub fn validate(&self) -> MemResult<()> {
        let reals = [
            ("size_mb", self.size_mb),
            ("image_page_ratio", self.image_page_ratio),
            ("avg_image_size_kb", self.avg_image_size_kb),
            ("fonts_embedded_pct", self.fonts_embedded_pct),
        ];
        for (name, value) in reals {
            if !value.is_finite() {
                return Err(MemError::invalid(format!("{name} must be finite")));
            }
            if value < 0.0 {
                return Err(MemError::invalid(format!("{name} must be >= 0")));
            }
        }
        if self.image_page_ratio > 1.0 {
            return Err(MemError::invalid("image_page_ratio must be <= 1"));
        }
        if self.fonts_embedded_pct > 1.0 {
            return Err(MemError::invalid("fonts_embedded_pct must be <= 1"));
        }
        if self.ocr_required > 1 {
            return Err(MemError::invalid("ocr_required must be 0 or 1"));
        }
        Ok(())
    }
}

/// A feature vector paired with its measured peak memory.
#[derive(Clone, Debug, PartialEq)]
pub struct LabeledSample {
    pub features: FeatureVector,
    pub label_mb: f64,
}

impl LabeledSample {
    pub fn new(features: FeatureVector, label_mb: f64) -> Self {
        Self { features, label_mb }
    }

    /// Negative labels (the sentinel included) never count and never train.
    pub fn is_valid(&self) -> bool {
        is_valid_label(self.label_mb)
    }
}

pub fn is_valid_label(label_mb: f64) -> bool {
    label_mb.is_finite() && label_mb >= 0.0
}

/// Durable, append-only log of labeled samples.
pub trait SampleRepo: Send + Sync {
    /// Append one row durably; returns the number of valid samples afterwards.
    fn append(&self, sample: &LabeledSample) -> MemResult<u64>;
    /// Number of valid samples currently stored.
    fn count(&self) -> u64;
    /// Every well-formed, valid sample in append order.
    fn load_all(&self) -> MemResult<Vec<LabeledSample>>;
}
