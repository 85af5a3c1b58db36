//! Per-class hardware coefficients for compute, storage and database services

use std::collections::BTreeMap;

use super::table::Table;
use crate::error::Result;
use crate::models::ResourceCoefficients;

pub(crate) fn build_compute_index(table: &Table) -> Result<BTreeMap<String, ResourceCoefficients>> {
    let class_col = table.column("instance_type")?;
    let energy_col = table.column("per_vcpu_hour_wh")?;
    let vcpus_col = table.optional_column("vcpus");

    let mut index = BTreeMap::new();
    for row in table.rows() {
        let class = table.text(row, class_col)?;
        let coefficients = ResourceCoefficients::Compute {
            per_vcpu_hour_wh: table.number(row, energy_col)?,
            vcpus: table.optional_number(row, vcpus_col)?,
        };
        table.insert_unique(&mut index, row, class, coefficients)?;
    }
    Ok(index)
}

pub(crate) fn build_storage_index(table: &Table) -> Result<BTreeMap<String, ResourceCoefficients>> {
    let class_col = table.column("storage_class")?;
    let gb_col = table.column("per_gb_wh")?;
    let request_col = table.column("per_request_wh")?;

    let mut index = BTreeMap::new();
    for row in table.rows() {
        let class = table.text(row, class_col)?;
        let coefficients = ResourceCoefficients::ObjectStorage {
            per_gb_wh: table.number(row, gb_col)?,
            per_request_wh: table.number(row, request_col)?,
        };
        table.insert_unique(&mut index, row, class, coefficients)?;
    }
    Ok(index)
}

pub(crate) fn build_database_index(table: &Table) -> Result<BTreeMap<String, ResourceCoefficients>> {
    let class_col = table.column("instance_class")?;
    let energy_col = table.column("per_vcpu_hour_wh")?;
    let gb_col = table.column("per_gb_wh")?;
    let vcpus_col = table.optional_column("vcpus");

    let mut index = BTreeMap::new();
    for row in table.rows() {
        let class = table.text(row, class_col)?;
        let coefficients = ResourceCoefficients::Relational {
            per_vcpu_hour_wh: table.number(row, energy_col)?,
            per_gb_wh: table.number(row, gb_col)?,
            vcpus: table.optional_number(row, vcpus_col)?,
        };
        table.insert_unique(&mut index, row, class, coefficients)?;
    }
    Ok(index)
}
