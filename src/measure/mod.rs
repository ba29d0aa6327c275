//! Measurement domain: peak memory of a representative workload, used as the
//! training label.

pub mod domain;
pub mod probe;
pub mod service;

pub use domain::{Measurement, UsageProbe};
pub use probe::ProcessRssProbe;
pub use service::measure;
