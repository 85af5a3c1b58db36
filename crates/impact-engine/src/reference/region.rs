//! Regional factor assembly
//!
//! The carbon-intensity table defines the set of known regions. PUE, water
//! usage and water stress are joined onto it by region code; a known region
//! missing from one of those tables borrows that factor from the default
//! region and records which field was borrowed.

use std::collections::BTreeMap;
use tracing::warn;

use super::table::Table;
use crate::error::{ImpactError, Result};
use crate::models::{RegionFactors, RegionField, WaterStress};

fn index_numbers(table: &Table, value_column: &str) -> Result<BTreeMap<String, f64>> {
    let region_col = table.column("region")?;
    let value_col = table.column(value_column)?;
    let mut index = BTreeMap::new();
    for row in table.rows() {
        let region = table.text(row, region_col)?;
        let value = table.number(row, value_col)?;
        table.insert_unique(&mut index, row, region, value)?;
    }
    Ok(index)
}

fn index_stress(table: &Table) -> Result<BTreeMap<String, WaterStress>> {
    let region_col = table.column("region")?;
    let level_col = table.column("water_stress_level")?;
    let mut index = BTreeMap::new();
    for row in table.rows() {
        let region = table.text(row, region_col)?;
        let raw = table.text(row, level_col)?;
        let level = WaterStress::parse(raw).ok_or_else(|| {
            ImpactError::load(
                table.name(),
                row.line,
                format!("unrecognized water stress level '{}'", raw),
            )
        })?;
        table.insert_unique(&mut index, row, region, level)?;
    }
    Ok(index)
}

fn warn_orphans<V>(table: &str, index: &BTreeMap<String, V>, known: &BTreeMap<String, RegionFactors>) {
    for region in index.keys().filter(|r| !known.contains_key(*r)) {
        warn!(
            event = "reference_row_ignored",
            table = %table,
            region = %region,
            "Region has no carbon intensity row, ignoring"
        );
    }
}

/// Join the four regional tables into one index keyed by region code
pub(crate) fn build_region_index(
    carbon: &Table,
    pue: &Table,
    water_usage: &Table,
    water_stress: &Table,
    default_region: &str,
) -> Result<BTreeMap<String, RegionFactors>> {
    let region_col = carbon.column("region")?;
    let intensity_col = carbon.column("carbon_intensity_gco2e_kwh")?;
    let category_col = carbon.optional_column("category");

    let mut intensities = BTreeMap::new();
    for row in carbon.rows() {
        let region = carbon.text(row, region_col)?;
        let intensity = carbon.number(row, intensity_col)?;
        let category = carbon.optional_text(row, category_col).map(str::to_string);
        carbon.insert_unique(&mut intensities, row, region, (intensity, category))?;
    }

    let pue_index = index_numbers(pue, "pue")?;
    let water_index = index_numbers(water_usage, "water_usage_liters_per_kwh")?;
    let stress_index = index_stress(water_stress)?;

    if !intensities.contains_key(default_region) {
        return Err(ImpactError::load(
            carbon.name(),
            0,
            format!("default region '{}' has no carbon intensity row", default_region),
        ));
    }
    let default_pue = *pue_index.get(default_region).ok_or_else(|| {
        ImpactError::load(pue.name(), 0, format!("default region '{}' has no PUE row", default_region))
    })?;
    let default_water = *water_index.get(default_region).ok_or_else(|| {
        ImpactError::load(
            water_usage.name(),
            0,
            format!("default region '{}' has no water usage row", default_region),
        )
    })?;
    let default_stress = *stress_index.get(default_region).ok_or_else(|| {
        ImpactError::load(
            water_stress.name(),
            0,
            format!("default region '{}' has no water stress row", default_region),
        )
    })?;

    let mut regions = BTreeMap::new();
    for (region, (intensity, category)) in intensities {
        let mut defaulted_fields = Vec::new();

        let pue_value = pue_index.get(&region).copied().unwrap_or_else(|| {
            defaulted_fields.push(RegionField::Pue);
            default_pue
        });
        let water_value = water_index.get(&region).copied().unwrap_or_else(|| {
            defaulted_fields.push(RegionField::WaterUsage);
            default_water
        });
        let stress_value = stress_index.get(&region).copied().unwrap_or_else(|| {
            defaulted_fields.push(RegionField::WaterStress);
            default_stress
        });

        if !defaulted_fields.is_empty() {
            warn!(
                event = "region_factor_defaulted",
                region = %region,
                default_region = %default_region,
                fields = ?defaulted_fields,
                "Region is missing factors, using default region values"
            );
        }

        regions.insert(
            region.clone(),
            RegionFactors {
                region,
                carbon_intensity_gco2e_kwh: intensity,
                category,
                pue: pue_value,
                water_usage_liters_per_kwh: water_value,
                water_stress: stress_value,
                defaulted_fields,
            },
        );
    }

    warn_orphans(pue.name(), &pue_index, &regions);
    warn_orphans(water_usage.name(), &water_index, &regions);
    warn_orphans(water_stress.name(), &stress_index, &regions);

    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(
        carbon: &str,
        pue: &str,
        water: &str,
        stress: &str,
        default_region: &str,
    ) -> Result<BTreeMap<String, RegionFactors>> {
        let carbon = Table::parse("region_carbon_intensity.csv", carbon)?;
        let pue = Table::parse("region_pue.csv", pue)?;
        let water = Table::parse("region_water_usage.csv", water)?;
        let stress = Table::parse("region_water_stress.csv", stress)?;
        build_region_index(&carbon, &pue, &water, &stress, default_region)
    }

    #[test]
    fn test_join_complete_regions() {
        let regions = build(
            "region,carbon_intensity_gco2e_kwh,category\nus-east-1,379.0,mixed\neu-north-1,8.0,low-carbon\n",
            "region,pue\nus-east-1,1.20\neu-north-1,1.12\n",
            "region,water_usage_liters_per_kwh\nus-east-1,1.8\neu-north-1,0.3\n",
            "region,water_stress_level\nus-east-1,Medium\neu-north-1,Low\n",
            "us-east-1",
        )
        .unwrap();

        let north = &regions["eu-north-1"];
        assert_eq!(north.carbon_intensity_gco2e_kwh, 8.0);
        assert_eq!(north.pue, 1.12);
        assert_eq!(north.water_usage_liters_per_kwh, 0.3);
        assert_eq!(north.water_stress, WaterStress::Low);
        assert_eq!(north.category.as_deref(), Some("low-carbon"));
        assert!(north.defaulted_fields.is_empty());
    }

    #[test]
    fn test_missing_factor_borrows_default() {
        let regions = build(
            "region,carbon_intensity_gco2e_kwh\nus-east-1,379.0\nsa-east-1,142.9\n",
            "region,pue\nus-east-1,1.20\n",
            "region,water_usage_liters_per_kwh\nus-east-1,1.8\nsa-east-1,1.9\n",
            "region,water_stress_level\nus-east-1,Medium\nsa-east-1,1.1\n",
            "us-east-1",
        )
        .unwrap();

        let sa = &regions["sa-east-1"];
        assert_eq!(sa.pue, 1.20);
        assert_eq!(sa.defaulted_fields, vec![RegionField::Pue]);
        assert_eq!(sa.water_stress, WaterStress::Low);
        assert!(sa.category.is_none());
    }

    #[test]
    fn test_default_region_must_exist() {
        let err = build(
            "region,carbon_intensity_gco2e_kwh\neu-west-1,316.0\n",
            "region,pue\neu-west-1,1.19\n",
            "region,water_usage_liters_per_kwh\neu-west-1,1.7\n",
            "region,water_stress_level\neu-west-1,Low\n",
            "us-east-1",
        )
        .unwrap_err();
        assert!(matches!(err, ImpactError::DataLoad { .. }));
    }

    #[test]
    fn test_duplicate_region_rejected() {
        let err = build(
            "region,carbon_intensity_gco2e_kwh\nus-east-1,379.0\nus-east-1,380.0\n",
            "region,pue\nus-east-1,1.20\n",
            "region,water_usage_liters_per_kwh\nus-east-1,1.8\n",
            "region,water_stress_level\nus-east-1,Medium\n",
            "us-east-1",
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_bad_stress_level_rejected() {
        let err = build(
            "region,carbon_intensity_gco2e_kwh\nus-east-1,379.0\n",
            "region,pue\nus-east-1,1.20\n",
            "region,water_usage_liters_per_kwh\nus-east-1,1.8\n",
            "region,water_stress_level\nus-east-1,Parched\n",
            "us-east-1",
        )
        .unwrap_err();
        assert!(err.to_string().contains("water stress"));
    }
}
