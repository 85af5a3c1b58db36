//! Region and resource-class comparison
//!
//! A comparison evaluates one base record once per candidate, varying a
//! single dimension, then ranks the results. Candidates are evaluated in
//! parallel; the final order depends only on the ranking, never on
//! evaluation order.


use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::composition::ImpactEngine;
use crate::error::{ImpactError, Result};
use crate::models::{ImpactResult, UsageRecord};
use crate::observability::{EngineMetrics, StructuredLogger};

/// The dimension a comparison varies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComparisonDimension {
    Region,
    ResourceClass,
}

impl ComparisonDimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonDimension::Region => "region",
            ComparisonDimension::ResourceClass => "resource-class",
        }
    }

    fn apply(&self, base: &UsageRecord, key: &str) -> UsageRecord {
        match self {
            ComparisonDimension::Region => base.with_region(key),
            ComparisonDimension::ResourceClass => base.with_resource_id(key),
        }
    }

    /// Whether an error belongs to one candidate rather than the whole comparison
    fn isolates(&self, err: &ImpactError) -> bool {
        match self {
            ComparisonDimension::Region => matches!(err, ImpactError::DataIntegrity { .. }),
            ComparisonDimension::ResourceClass => err.is_candidate_specific(),
        }
    }
}

impl fmt::Display for ComparisonDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric a comparison is ranked by, ascending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RankingMetric {
    /// Operational carbon
    #[default]
    Carbon,
    /// Operational plus amortized embodied carbon
    TotalCarbon,
    Water,
    Energy,
    Cost,
    Score,
}

impl RankingMetric {
    pub const ALL: [RankingMetric; 6] = [
        RankingMetric::Carbon,
        RankingMetric::TotalCarbon,
        RankingMetric::Water,
        RankingMetric::Energy,
        RankingMetric::Cost,
        RankingMetric::Score,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RankingMetric::Carbon => "carbon",
            RankingMetric::TotalCarbon => "total-carbon",
            RankingMetric::Water => "water",
            RankingMetric::Energy => "energy",
            RankingMetric::Cost => "cost",
            RankingMetric::Score => "score",
        }
    }

    /// Value of the metric for a result; only cost can be absent
    pub fn value(&self, result: &ImpactResult) -> Option<f64> {
        match self {
            RankingMetric::Carbon => Some(result.carbon_gco2e),
            RankingMetric::TotalCarbon => Some(result.total_gco2e),
            RankingMetric::Water => Some(result.water_liters),
            RankingMetric::Energy => Some(result.energy_wh),
            RankingMetric::Cost => result.cost_usd,
            RankingMetric::Score => Some(result.impact_score),
        }
    }
}

impl fmt::Display for RankingMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankingMetric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        RankingMetric::ALL
            .into_iter()
            .find(|m| m.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown ranking metric '{}', expected one of: carbon, total-carbon, water, energy, cost, score",
                    s
                )
            })
    }
}

/// One evaluated candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    /// Region code or resource class that was varied
    pub key: String,
    pub record: UsageRecord,
    pub result: ImpactResult,
}

/// A candidate that could not be evaluated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateFailure {
    pub key: String,
    pub kind: String,
    pub error: String,
}

/// Spread between the best and worst candidate on the ranked metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub metric: RankingMetric,
    pub best: String,
    pub worst: String,
    pub best_value: Option<f64>,
    pub worst_value: Option<f64>,
    /// `worst_value - best_value`, when both are present
    pub savings: Option<f64>,
    /// Savings as a percentage of the worst value; 0 when the worst value is 0
    pub savings_percent: Option<f64>,
}

/// Difference of one candidate from a baseline candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryDelta {
    pub key: String,
    pub carbon_delta_gco2e: f64,
    pub carbon_delta_percent: f64,
    pub water_delta_liters: f64,
    pub water_delta_percent: f64,
    pub energy_delta_wh: f64,
    pub energy_delta_percent: f64,
}

fn percent_of(delta: f64, base: f64) -> f64 {
    if base == 0.0 {
        0.0
    } else {
        delta / base * 100.0
    }
}

/// Ranked comparison results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSet {
    pub dimension: ComparisonDimension,
    pub metric: RankingMetric,
    /// Fingerprint of the reference data the results came from
    pub digest: String,
    /// Evaluated candidates, best first
    pub entries: Vec<ComparisonEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<CandidateFailure>,
}

/// Ascending by metric (absent last), then water, then key
fn rank(metric: RankingMetric, a: &ComparisonEntry, b: &ComparisonEntry) -> Ordering {
    let by_metric = match (metric.value(&a.result), metric.value(&b.result)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_metric
        .then_with(|| a.result.water_liters.total_cmp(&b.result.water_liters))
        .then_with(|| a.key.cmp(&b.key))
}

impl ComparisonSet {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn best(&self) -> Option<&ComparisonEntry> {
        self.entries.first()
    }

    pub fn worst(&self) -> Option<&ComparisonEntry> {
        self.entries.last()
    }

    pub fn get(&self, key: &str) -> Option<&ComparisonEntry> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    pub fn summary(&self) -> Option<ComparisonSummary> {
        let best = self.best()?;
        let worst = self.worst()?;
        let best_value = self.metric.value(&best.result);
        let worst_value = self.metric.value(&worst.result);

        let savings = match (best_value, worst_value) {
            (Some(b), Some(w)) => Some(w - b),
            _ => None,
        };
        let savings_percent = match (savings, worst_value) {
            (Some(s), Some(w)) => Some(percent_of(s, w)),
            _ => None,
        };

        Some(ComparisonSummary {
            metric: self.metric,
            best: best.key.clone(),
            worst: worst.key.clone(),
            best_value,
            worst_value,
            savings,
            savings_percent,
        })
    }

    /// Per-candidate differences from `baseline`, in ranked order
    pub fn deltas_from(&self, baseline: &str) -> Option<Vec<EntryDelta>> {
        let base = &self.get(baseline)?.result;
        let deltas = self
            .entries
            .iter()
            .map(|entry| {
                let r = &entry.result;
                let carbon = r.carbon_gco2e - base.carbon_gco2e;
                let water = r.water_liters - base.water_liters;
                let energy = r.energy_wh - base.energy_wh;
                EntryDelta {
                    key: entry.key.clone(),
                    carbon_delta_gco2e: carbon,
                    carbon_delta_percent: percent_of(carbon, base.carbon_gco2e),
                    water_delta_liters: water,
                    water_delta_percent: percent_of(water, base.water_liters),
                    energy_delta_wh: energy,
                    energy_delta_percent: percent_of(energy, base.energy_wh),
                }
            })
            .collect();
        Some(deltas)
    }

    /// Candidates strictly better than `current` on the ranked metric, best first
    pub fn improvements_over(&self, current: &str) -> Option<Vec<&ComparisonEntry>> {
        let current_value = self.metric.value(&self.get(current)?.result);
        let better = self
            .entries
            .iter()
            .filter(|entry| entry.key != current)
            .filter(|entry| match (self.metric.value(&entry.result), current_value) {
                (Some(v), Some(c)) => v < c,
                (Some(_), None) => true,
                (None, _) => false,
            })
            .collect();
        Some(better)
    }
}

/// Runs comparisons over one engine
#[derive(Clone)]
pub struct Comparator {
    engine: ImpactEngine,
    metrics: EngineMetrics,
    logger: StructuredLogger,
}

impl Comparator {
    pub fn new(engine: ImpactEngine) -> Self {
        Self {
            engine,
            metrics: EngineMetrics::new(),
            logger: StructuredLogger::new("comparator"),
        }
    }

    pub fn engine(&self) -> &ImpactEngine {
        &self.engine
    }

    /// Compare regions ranked by operational carbon
    pub fn compare_regions<S: AsRef<str>>(&self, base: &UsageRecord, regions: &[S]) -> Result<ComparisonSet> {
        self.compare_regions_by(base, regions, RankingMetric::Carbon)
    }

    pub fn compare_regions_by<S: AsRef<str>>(
        &self,
        base: &UsageRecord,
        regions: &[S],
        metric: RankingMetric,
    ) -> Result<ComparisonSet> {
        self.compare(ComparisonDimension::Region, base, regions, metric)
    }

    /// Compare resource classes (instance types, storage classes or models)
    /// ranked by operational carbon
    pub fn compare_resource_classes<S: AsRef<str>>(
        &self,
        base: &UsageRecord,
        classes: &[S],
    ) -> Result<ComparisonSet> {
        self.compare_resource_classes_by(base, classes, RankingMetric::Carbon)
    }

    pub fn compare_resource_classes_by<S: AsRef<str>>(
        &self,
        base: &UsageRecord,
        classes: &[S],
        metric: RankingMetric,
    ) -> Result<ComparisonSet> {
        self.compare(ComparisonDimension::ResourceClass, base, classes, metric)
    }

    /// Rank every region the store knows
    pub fn rank_all_regions(&self, base: &UsageRecord, metric: RankingMetric) -> Result<ComparisonSet> {
        let regions = self.engine.store().region_codes();
        self.compare_regions_by(base, &regions, metric)
    }

    fn compare<S: AsRef<str>>(
        &self,
        dimension: ComparisonDimension,
        base: &UsageRecord,
        candidates: &[S],
        metric: RankingMetric,
    ) -> Result<ComparisonSet> {
        let mut seen = HashSet::new();
        let keys: Vec<String> = candidates
            .iter()
            .map(|c| c.as_ref().trim().to_string())
            .filter(|key| !key.is_empty() && seen.insert(key.clone()))
            .collect();

        let outcomes: Vec<(String, UsageRecord, Result<ImpactResult>)> = keys
            .into_par_iter()
            .map(|key| {
                let record = dimension.apply(base, &key);
                let outcome = self.engine.evaluate(&record);
                (key, record, outcome)
            })
            .collect();

        let mut entries = Vec::with_capacity(outcomes.len());
        let mut failed = Vec::new();
        for (key, record, outcome) in outcomes {
            match outcome {
                Ok(result) => entries.push(ComparisonEntry {
                    key,
                    record,
                    result,
                }),
                Err(err) if dimension.isolates(&err) => failed.push((key, err)),
                Err(err) => return Err(err),
            }
        }

        failed.sort_by(|a, b| a.0.cmp(&b.0));
        if entries.is_empty() && !failed.is_empty() {
            return Err(failed.remove(0).1);
        }

        entries.sort_by(|a, b| rank(metric, a, b));
        let failures: Vec<CandidateFailure> = failed
            .into_iter()
            .map(|(key, err)| CandidateFailure {
                key,
                kind: err.kind().to_string(),
                error: err.to_string(),
            })
            .collect();

        self.metrics.inc_comparisons(dimension.as_str());
        self.logger.log_comparison(
            dimension.as_str(),
            metric.as_str(),
            entries.len(),
            failures.len(),
            entries.first().map(|e| e.key.as_str()),
        );

        Ok(ComparisonSet {
            dimension,
            metric,
            digest: self.engine.store().digest().to_string(),
            entries,
            failures,
        })
    }
}
