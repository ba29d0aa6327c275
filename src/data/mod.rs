//! Data domain: feature vectors, labeled samples and their durable log.

pub mod domain;
pub mod repo_fs;
pub mod service;

pub use domain::{FeatureVector, LabeledSample, SampleRepo, FEATURE_DIMS, SENTINEL_MB};
pub use repo_fs::FsSampleRepo;
