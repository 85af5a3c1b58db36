//! Everyday equivalents and the combined impact score

use crate::config::ScoringConfig;
use crate::models::{Equivalents, WaterStress};

/// Grams CO2e per mile driven by an average passenger car
pub const GCO2E_PER_MILE: f64 = 404.0;
/// Grams CO2e per full smartphone charge
pub const GCO2E_PER_SMARTPHONE_CHARGE: f64 = 2.3;
/// Grams CO2e absorbed by one tree in a month
pub const GCO2E_PER_TREE_MONTH: f64 = 500.0;
/// Grams CO2e per hour of laptop use
pub const GCO2E_PER_LAPTOP_HOUR: f64 = 50.0;
/// Liters per minute of showering
pub const LITERS_PER_SHOWER_MINUTE: f64 = 9.5;

impl Equivalents {
    pub fn from_impact(total_gco2e: f64, water_liters: f64) -> Self {
        Self {
            miles_driven: total_gco2e / GCO2E_PER_MILE,
            smartphone_charges: total_gco2e / GCO2E_PER_SMARTPHONE_CHARGE,
            tree_months: total_gco2e / GCO2E_PER_TREE_MONTH,
            laptop_hours: total_gco2e / GCO2E_PER_LAPTOP_HOUR,
            shower_minutes: water_liters / LITERS_PER_SHOWER_MINUTE,
        }
    }
}

fn capped_share(value: f64, reference: f64) -> f64 {
    (100.0 * value / reference).min(100.0)
}

/// Weighted 0-100 score of operational carbon, embodied carbon and stress-weighted water
pub fn impact_score(
    scoring: &ScoringConfig,
    carbon_gco2e: f64,
    embodied_gco2e: f64,
    water_liters: f64,
    stress: WaterStress,
) -> f64 {
    scoring.carbon_weight * capped_share(carbon_gco2e, scoring.carbon_reference_gco2e)
        + scoring.embodied_weight * capped_share(embodied_gco2e, scoring.embodied_reference_gco2e)
        + scoring.water_weight
            * capped_share(water_liters * stress.multiplier(), scoring.water_reference_liters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_equivalents() {
        let eq = Equivalents::from_impact(808.0, 19.0);
        assert_relative_eq!(eq.miles_driven, 2.0, epsilon = 1e-9);
        assert_relative_eq!(eq.tree_months, 1.616, epsilon = 1e-9);
        assert_relative_eq!(eq.laptop_hours, 16.16, epsilon = 1e-9);
        assert_relative_eq!(eq.shower_minutes, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_score_components() {
        let scoring = ScoringConfig::default();
        // 10% of each reference
        let score = impact_score(&scoring, 1000.0, 1000.0, 100.0, WaterStress::Low);
        assert_relative_eq!(score, 0.5 * 10.0 + 0.3 * 10.0 + 0.2 * 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_water_stress_raises_score() {
        let scoring = ScoringConfig::default();
        let low = impact_score(&scoring, 0.0, 0.0, 100.0, WaterStress::Low);
        let very_high = impact_score(&scoring, 0.0, 0.0, 100.0, WaterStress::VeryHigh);
        assert_relative_eq!(very_high, 3.0 * low, epsilon = 1e-9);
    }

    #[test]
    fn test_components_capped() {
        let scoring = ScoringConfig::default();
        let score = impact_score(&scoring, 1e9, 1e9, 1e9, WaterStress::VeryHigh);
        assert_relative_eq!(score, 100.0, epsilon = 1e-9);
    }
}
