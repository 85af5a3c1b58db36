//! Model energy profiles joined with training footprints

use std::collections::BTreeMap;
use tracing::warn;

use super::table::Table;
use crate::error::Result;
use crate::models::{ModelEnergyProfile, TrainingFootprint};

pub(crate) fn build_model_index(
    energy: &Table,
    training: &Table,
) -> Result<BTreeMap<String, ModelEnergyProfile>> {
    let id_col = training.column("model_id")?;
    let emissions_col = training.column("total_emissions_gco2e")?;
    let inferences_col = training.column("expected_inferences")?;

    let mut footprints = BTreeMap::new();
    for row in training.rows() {
        let model_id = training.text(row, id_col)?;
        let footprint = TrainingFootprint {
            total_emissions_gco2e: training.number(row, emissions_col)?,
            expected_inferences: training.number(row, inferences_col)?,
        };
        training.insert_unique(&mut footprints, row, model_id, footprint)?;
    }

    let id_col = energy.column("model_id")?;
    let input_col = energy.column("input_energy_wh_per_token")?;
    let output_col = energy.column("output_energy_wh_per_token")?;

    let mut models = BTreeMap::new();
    for row in energy.rows() {
        let model_id = energy.text(row, id_col)?;
        let profile = ModelEnergyProfile {
            model_id: model_id.to_string(),
            input_energy_wh_per_token: energy.number(row, input_col)?,
            output_energy_wh_per_token: energy.number(row, output_col)?,
            training: footprints.remove(model_id),
        };
        energy.insert_unique(&mut models, row, model_id, profile)?;
    }

    for model_id in footprints.keys() {
        warn!(
            event = "reference_row_ignored",
            table = %training.name(),
            model_id = %model_id,
            "Training footprint has no energy profile, ignoring"
        );
    }

    Ok(models)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENERGY: &str = "model_id,input_energy_wh_per_token,output_energy_wh_per_token\n\
        anthropic.claude-3-haiku,0.00003,0.00009\n\
        amazon.titan-text-lite,0.00002,0.00006\n";

    #[test]
    fn test_training_linked_when_present() {
        let energy = Table::parse("model_energy_consumption.csv", ENERGY).unwrap();
        let training = Table::parse(
            "model_training_footprint.csv",
            "model_id,total_emissions_gco2e,expected_inferences\n\
             anthropic.claude-3-haiku,50000000000,10000000000\n\
             retired-model,1000,10\n",
        )
        .unwrap();

        let models = build_model_index(&energy, &training).unwrap();
        assert_eq!(models.len(), 2);

        let haiku = &models["anthropic.claude-3-haiku"];
        assert_eq!(haiku.input_energy_wh_per_token, 0.00003);
        let footprint = haiku.training.as_ref().unwrap();
        assert_eq!(footprint.expected_inferences, 1e10);

        assert!(models["amazon.titan-text-lite"].training.is_none());
        assert!(!models.contains_key("retired-model"));
    }

    #[test]
    fn test_missing_training_column() {
        let energy = Table::parse("model_energy_consumption.csv", ENERGY).unwrap();
        let training = Table::parse(
            "model_training_footprint.csv",
            "model_id,total_emissions_gco2e\nx,1\n",
        )
        .unwrap();
        assert!(build_model_index(&energy, &training).is_err());
    }

    #[test]
    fn test_duplicate_model_rejected() {
        let energy = Table::parse(
            "model_energy_consumption.csv",
            "model_id,input_energy_wh_per_token,output_energy_wh_per_token\na,1,1\na,2,2\n",
        )
        .unwrap();
        let training = Table::parse(
            "model_training_footprint.csv",
            "model_id,total_emissions_gco2e,expected_inferences\n",
        )
        .unwrap();
        assert!(build_model_index(&energy, &training).is_err());
    }
}
