//! Cost estimation from the optional pricing table

use crate::calculator::EnergyEstimate;
use crate::error::{ImpactError, Result};
use crate::models::{dimensions, UsageRecord};
use crate::reference::PriceBook;

/// Dollar cost of a record, `None` when nothing prices its class
///
/// The `vcpu_hours` dimension is priced from the vCPU-hours the calculator
/// derived, so `hours` records are billed like their `vcpu_hours` form.
pub fn estimate_cost(
    prices: &PriceBook,
    record: &UsageRecord,
    estimate: &EnergyEstimate,
) -> Result<Option<f64>> {
    let resource_class = estimate.resource_class.as_str();
    let rates = prices.rates_for(record.service_type(), resource_class);
    if rates.is_empty() {
        return Ok(None);
    }

    let mut total = 0.0;
    for (dimension, usd_per_unit) in rates {
        if !usd_per_unit.is_finite() || usd_per_unit < 0.0 {
            return Err(ImpactError::integrity(
                format!("{}/{}", record.service_type(), resource_class),
                dimension,
                usd_per_unit,
                "price must be a non-negative number",
            ));
        }
        let quantity = match estimate.vcpu_hours {
            Some(billed) if dimension == dimensions::VCPU_HOURS => billed,
            _ => record.quantity(dimension),
        };
        total += quantity * usd_per_unit;
    }
    Ok(Some(total))
}
