// lib.rs - memory-peak routing with online learning
pub mod common;
pub mod data;
pub mod inference;
pub mod measure;
pub mod training;

pub use common::{AppCfg, MemError, MemResult};
pub use data::{FeatureVector, LabeledSample, SENTINEL_MB};
pub use inference::{Decision, Orchestrator, ProcessOutcome, RouteDecision};
