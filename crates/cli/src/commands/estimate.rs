//! Single-record impact estimate

use anyhow::Result;
use colored::Colorize;
use impact_engine::{ImpactEngine, ImpactResult, ServiceType};
use serde::Serialize;

use super::UsageArgs;
use crate::output::{
    color_stress, format_cost, format_energy, format_grams, format_liters, print_heading, print_json,
    print_warning, OutputFormat,
};

#[derive(Serialize)]
struct EstimateReport<'a> {
    reference_digest: &'a str,
    #[serde(flatten)]
    result: &'a ImpactResult,
}

/// Evaluate one usage record and print the result
pub fn run(
    engine: &ImpactEngine,
    service: ServiceType,
    resource: &str,
    region: &str,
    usage: &UsageArgs,
    format: OutputFormat,
) -> Result<()> {
    let record = usage.record(service, resource, region);
    let result = engine.evaluate(&record)?;

    match format {
        OutputFormat::Json => print_json(&EstimateReport {
            reference_digest: engine.store().digest(),
            result: &result,
        })?,
        OutputFormat::Table => print_result(&result),
    }
    Ok(())
}

fn print_result(result: &ImpactResult) {
    print_heading("Impact Estimate");
    println!("Service:                {}", result.service_type.to_string().cyan());
    println!("Resource:               {}", result.resource_id.cyan());
    println!("Region:                 {}", result.resolution.region.cyan());
    println!();

    println!("Energy (IT):            {}", format_energy(result.energy_wh));
    println!("Energy (facility):      {}", format_energy(result.facility_energy_wh));
    println!("Operational carbon:     {}", format_grams(result.carbon_gco2e));
    if result.amortized_embodied_gco2e > 0.0 {
        println!("Embodied carbon:        {}", format_grams(result.amortized_embodied_gco2e));
    }
    println!(
        "{}      {}",
        "Total carbon:".bold(),
        format_grams(result.total_gco2e).bold()
    );
    println!("Water:                  {}", format_liters(result.water_liters));
    println!("Water stress:           {}", color_stress(result.water_stress));
    println!("Cost:                   {}", format_cost(result.cost_usd));
    println!("Impact score:           {:.1} / 100", result.impact_score);
    println!();

    let eq = &result.equivalents;
    println!("{}", "Equivalent to".bold());
    println!("{}", "-".repeat(50));
    println!("Miles driven:           {:.4}", eq.miles_driven);
    println!("Smartphone charges:     {:.2}", eq.smartphone_charges);
    println!("Tree-months to absorb:  {:.4}", eq.tree_months);
    println!("Laptop hours:           {:.2}", eq.laptop_hours);
    println!("Shower minutes:         {:.2}", eq.shower_minutes);

    let resolution = &result.resolution;
    if resolution.region_fallback {
        println!();
        print_warning(&format!(
            "Region '{}' is unknown; factors from '{}' were used",
            resolution.requested_region, resolution.region
        ));
    }
    if !resolution.defaulted_region_fields.is_empty() {
        let fields: Vec<String> = resolution
            .defaulted_region_fields
            .iter()
            .map(|f| f.to_string())
            .collect();
        print_warning(&format!(
            "Borrowed from the default region: {}",
            fields.join(", ")
        ));
    }
}
