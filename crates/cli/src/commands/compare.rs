//! Region and resource-class comparisons

use anyhow::{bail, Result};
use colored::Colorize;
use impact_engine::{
    Comparator, ComparisonSet, ComparisonSummary, EntryDelta, ImpactEngine, RankingMetric, ServiceType,
};
use serde::Serialize;
use tabled::Tabled;

use super::UsageArgs;
use crate::output::{
    color_delta, format_cost, format_energy, format_grams, format_liters, print_heading, print_info,
    print_json, print_table, print_warning, OutputFormat,
};

/// Arguments of `compare regions`
pub struct RegionRequest<'a> {
    pub service: ServiceType,
    pub resource: &'a str,
    pub regions: &'a [String],
    pub metric: RankingMetric,
    pub baseline: Option<&'a str>,
    pub usage: &'a UsageArgs,
}

/// Row for a ranked candidate
#[derive(Tabled)]
struct RankRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Candidate")]
    key: String,
    #[tabled(rename = "Energy")]
    energy: String,
    #[tabled(rename = "Carbon")]
    carbon: String,
    #[tabled(rename = "Total CO2e")]
    total: String,
    #[tabled(rename = "Water")]
    water: String,
    #[tabled(rename = "Stress")]
    stress: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Score")]
    score: String,
}

/// Row for a candidate compared to the baseline
#[derive(Tabled)]
struct DeltaRow {
    #[tabled(rename = "Candidate")]
    key: String,
    #[tabled(rename = "Carbon")]
    carbon: String,
    #[tabled(rename = "Carbon %")]
    carbon_percent: String,
    #[tabled(rename = "Water %")]
    water_percent: String,
}

#[derive(Serialize)]
struct ComparisonReport<'a> {
    comparison: &'a ComparisonSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ComparisonSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    baseline: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deltas: Option<Vec<EntryDelta>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    improvements: Option<Vec<&'a str>>,
}

/// Rank regions for one resource
pub fn regions(engine: ImpactEngine, request: RegionRequest<'_>, format: OutputFormat) -> Result<()> {
    let origin = request
        .baseline
        .unwrap_or_else(|| engine.store().default_region())
        .to_string();
    let base = request.usage.record(request.service, request.resource, &origin);
    let comparator = Comparator::new(engine);

    let set = if request.regions.is_empty() {
        comparator.rank_all_regions(&base, request.metric)?
    } else {
        let mut candidates = request.regions.to_vec();
        if let Some(baseline) = request.baseline {
            if !candidates.iter().any(|c| c.trim() == baseline) {
                candidates.push(baseline.to_string());
            }
        }
        comparator.compare_regions_by(&base, &candidates, request.metric)?
    };

    report(&set, request.baseline, format)
}

/// Rank resource classes within one region
pub fn classes(
    engine: ImpactEngine,
    service: ServiceType,
    region: &str,
    classes: &[String],
    metric: RankingMetric,
    usage: &UsageArgs,
    format: OutputFormat,
) -> Result<()> {
    let Some(first) = classes.iter().find(|c| !c.trim().is_empty()) else {
        bail!("at least one resource class is required");
    };
    let base = usage.record(service, first.trim(), region);
    let set = Comparator::new(engine).compare_resource_classes_by(&base, classes, metric)?;

    report(&set, None, format)
}

fn report(set: &ComparisonSet, baseline: Option<&str>, format: OutputFormat) -> Result<()> {
    let deltas = baseline.and_then(|b| set.deltas_from(b));
    let improvements: Option<Vec<&str>> = baseline
        .and_then(|b| set.improvements_over(b))
        .map(|better| better.into_iter().map(|e| e.key.as_str()).collect());

    match format {
        OutputFormat::Json => print_json(&ComparisonReport {
            comparison: set,
            summary: set.summary(),
            baseline,
            deltas,
            improvements,
        }),
        OutputFormat::Table => {
            print_ranking(set);
            if let (Some(baseline), Some(deltas)) = (baseline, deltas) {
                print_deltas(baseline, &deltas, improvements.unwrap_or_default());
            }
            Ok(())
        }
    }
}

fn print_ranking(set: &ComparisonSet) {
    print_heading(&format!(
        "Comparison by {} (ranked on {})",
        set.dimension.as_str(),
        set.metric
    ));

    let rows: Vec<RankRow> = set
        .entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let r = &entry.result;
            let key = if r.resolution.region_fallback {
                format!("{} (as {})", entry.key, r.resolution.region)
            } else {
                entry.key.clone()
            };
            RankRow {
                rank: i + 1,
                key,
                energy: format_energy(r.energy_wh),
                carbon: format_grams(r.carbon_gco2e),
                total: format_grams(r.total_gco2e),
                water: format_liters(r.water_liters),
                stress: r.water_stress.to_string(),
                cost: format_cost(r.cost_usd),
                score: format!("{:.1}", r.impact_score),
            }
        })
        .collect();
    print_table(rows);

    if let Some(summary) = set.summary() {
        println!();
        println!("Best:                   {}", summary.best.green().bold());
        println!("Worst:                  {}", summary.worst.red());
        if let (Some(savings), Some(percent)) = (summary.savings, summary.savings_percent) {
            println!(
                "{}   {:.4} ({:.1}%)",
                "Potential savings:".bold(),
                savings,
                percent
            );
        }
    }

    for failure in &set.failures {
        print_warning(&format!("{} skipped: {}", failure.key, failure.error));
    }
    if !set.digest.is_empty() {
        println!("Reference data: {}", set.digest.dimmed());
    }
}

fn print_deltas(baseline: &str, deltas: &[EntryDelta], improvements: Vec<&str>) {
    println!();
    print_heading(&format!("Compared to {}", baseline));
    let rows: Vec<DeltaRow> = deltas
        .iter()
        .filter(|d| d.key != baseline)
        .map(|d| DeltaRow {
            key: d.key.clone(),
            carbon: format_grams(d.carbon_delta_gco2e),
            carbon_percent: color_delta(d.carbon_delta_percent),
            water_percent: color_delta(d.water_delta_percent),
        })
        .collect();
    print_table(rows);

    if improvements.is_empty() {
        print_info(&format!("{} is already the best candidate", baseline));
    } else {
        print_info(&format!("Better than {}: {}", baseline, improvements.join(", ")));
    }
}
