//! Inference domain: routing, the remote fallback and the prediction orchestrator.

pub mod domain;
pub mod metrics;
pub mod remote;
pub mod service;
pub mod workers;

pub use domain::{
    decide, Decision, ModelSnapshot, PredictionSource, ProcessOutcome, RemotePredictor,
    RouteDecision, TrainOutcome,
};
pub use remote::HttpRemotePredictor;
pub use service::{Orchestrator, Parts, Settings};
