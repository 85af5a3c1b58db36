//! Reference data listings

use anyhow::Result;
use impact_engine::{ModelEnergyProfile, ReferenceStore, RegionFactors, ServiceType};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{color_stress, print_heading, print_json, print_table, OutputFormat};

/// Row for the regions table
#[derive(Tabled)]
struct RegionRow {
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "gCO2e/kWh")]
    carbon_intensity: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "PUE")]
    pue: String,
    #[tabled(rename = "L/kWh")]
    water_usage: String,
    #[tabled(rename = "Water Stress")]
    water_stress: String,
}

/// Row for the models table
#[derive(Tabled)]
struct ModelRow {
    #[tabled(rename = "Model")]
    model_id: String,
    #[tabled(rename = "Input Wh/token")]
    input: String,
    #[tabled(rename = "Output Wh/token")]
    output: String,
    #[tabled(rename = "Embodied g/inference")]
    embodied: String,
}

#[derive(Serialize)]
struct RegionList<'a> {
    default_region: &'a str,
    digest: &'a str,
    regions: Vec<&'a RegionFactors>,
}

#[derive(Serialize)]
struct ModelList<'a> {
    models: Vec<&'a ModelEnergyProfile>,
}

#[derive(Serialize)]
struct ClassList<'a> {
    service_type: ServiceType,
    classes: Vec<&'a str>,
}

pub fn regions(store: &ReferenceStore, format: OutputFormat) -> Result<()> {
    let regions: Vec<&RegionFactors> = store.regions().collect();

    match format {
        OutputFormat::Json => print_json(&RegionList {
            default_region: store.default_region(),
            digest: store.digest(),
            regions,
        }),
        OutputFormat::Table => {
            print_heading(&format!("Regions (default {})", store.default_region()));
            let rows: Vec<RegionRow> = regions
                .into_iter()
                .map(|r| RegionRow {
                    region: if r.defaulted_fields.is_empty() {
                        r.region.clone()
                    } else {
                        format!("{}*", r.region)
                    },
                    carbon_intensity: format!("{:.1}", r.carbon_intensity_gco2e_kwh),
                    category: r.category.clone().unwrap_or_else(|| "-".to_string()),
                    pue: format!("{:.2}", r.pue),
                    water_usage: format!("{:.2}", r.water_usage_liters_per_kwh),
                    water_stress: color_stress(r.water_stress),
                })
                .collect();
            print_table(rows);
            Ok(())
        }
    }
}

pub fn models(store: &ReferenceStore, format: OutputFormat) -> Result<()> {
    let models: Vec<&ModelEnergyProfile> = store.models().collect();

    match format {
        OutputFormat::Json => print_json(&ModelList { models }),
        OutputFormat::Table => {
            print_heading("AI Models");
            let rows: Vec<ModelRow> = models
                .into_iter()
                .map(|m| ModelRow {
                    model_id: m.model_id.clone(),
                    input: format!("{:e}", m.input_energy_wh_per_token),
                    output: format!("{:e}", m.output_energy_wh_per_token),
                    embodied: match &m.training {
                        Some(t) if t.expected_inferences > 0.0 => {
                            format!("{:.6}", t.total_emissions_gco2e / t.expected_inferences)
                        }
                        _ => "-".to_string(),
                    },
                })
                .collect();
            print_table(rows);
            Ok(())
        }
    }
}

pub fn classes(store: &ReferenceStore, service: ServiceType, format: OutputFormat) -> Result<()> {
    let classes = store.resource_classes(service);

    match format {
        OutputFormat::Json => print_json(&ClassList {
            service_type: service,
            classes,
        }),
        OutputFormat::Table => {
            print_heading(&format!("Resource classes for {}", service));
            for class in &classes {
                println!("  {}", class);
            }
            if classes.is_empty() {
                println!("  (none)");
            }
            Ok(())
        }
    }
}
