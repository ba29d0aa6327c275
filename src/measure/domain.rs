//! Types for measuring the peak resource usage of a unit of work.

/// Source of instantaneous usage readings, in bytes.
pub trait UsageProbe: Send + Sync {
    fn used_bytes(&self) -> u64;
}

/// Result of a measured run.
#[derive(Clone, Debug, PartialEq)]
pub struct Measurement<T> {
    pub value: T,
    /// Highest probe reading during the run, in MiB.
    pub peak_mb: f64,
    /// Number of probe readings taken, including the one at t=0.
    pub samples: u64,
}

pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}
