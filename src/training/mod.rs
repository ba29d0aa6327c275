//! Training domain: the local linear model, its trainer and its persisted form.

pub mod domain;
pub mod repo_fs;
pub mod service;

pub use domain::{Model, ModelFile, ModelRepo, TrainConfig, Trainer};
pub use repo_fs::FsModelRepo;
pub use service::GradientDescent;
