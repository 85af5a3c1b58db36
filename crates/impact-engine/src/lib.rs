//! Environmental impact engine for cloud resource usage
//!
//! This crate provides the core functionality for:
//! - Loading regional, hardware and model reference tables
//! - Per-service energy estimation
//! - Carbon, water and embodied-carbon composition
//! - Region and resource-class comparison
//! - Configuration and observability

pub mod calculator;
pub mod comparison;
pub mod composition;
pub mod config;
pub mod cost;
pub mod equivalents;
pub mod error;
pub mod models;
pub mod observability;
pub mod reference;

pub use calculator::{CalculatorRegistry, EnergyCalculator, EnergyEstimate};
pub use comparison::{
    CandidateFailure, ComparisonDimension, ComparisonEntry, ComparisonSet, ComparisonSummary,
    Comparator, EntryDelta, RankingMetric,
};
pub use composition::ImpactEngine;
pub use config::EngineConfig;
pub use error::{ImpactError, Result};
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
pub use reference::{Lookup, LookupPolicy, ReferenceStore, TableContents, TableKind, TableSources};
