//! Compute energy: vCPU-hours times a per-instance coefficient

use super::{checked_coefficient, EnergyCalculator, EnergyEstimate};
use crate::config::UtilizationPoint;
use crate::error::{ImpactError, Result};
use crate::models::{dimensions, ResourceCoefficients, ServiceType, UsageRecord};
use crate::reference::ReferenceStore;

/// Piecewise-linear utilization adjustment
///
/// With no breakpoints every utilization maps to 1.0. Utilization outside
/// the breakpoint range clamps to the nearest end point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UtilizationCurve {
    points: Vec<UtilizationPoint>,
}

impl UtilizationCurve {
    pub fn new(mut points: Vec<UtilizationPoint>) -> Self {
        points.sort_by(|a, b| a.utilization.total_cmp(&b.utilization));
        Self { points }
    }

    pub fn multiplier_at(&self, utilization: f64) -> f64 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 1.0,
        };
        if utilization <= first.utilization {
            return first.multiplier;
        }
        if utilization >= last.utilization {
            return last.multiplier;
        }

        for pair in self.points.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if utilization <= hi.utilization {
                let span = hi.utilization - lo.utilization;
                if span <= 0.0 {
                    return hi.multiplier;
                }
                let t = (utilization - lo.utilization) / span;
                return lo.multiplier + t * (hi.multiplier - lo.multiplier);
            }
        }
        last.multiplier
    }

    /// Adjustment for a record; 1.0 when the record carries no utilization
    pub fn adjustment(&self, record: &UsageRecord) -> f64 {
        if !record.has(dimensions::UTILIZATION) {
            return 1.0;
        }
        self.multiplier_at(record.quantity(dimensions::UTILIZATION))
    }
}

/// vCPU-hours of a record: explicit `vcpu_hours`, else `hours` times the
/// class vCPU count times the instance `count`
pub(crate) fn vcpu_hours(record: &UsageRecord, class: &str, vcpus: Option<f64>) -> Result<f64> {
    if record.has(dimensions::VCPU_HOURS) {
        return Ok(record.quantity(dimensions::VCPU_HOURS));
    }
    let vcpus = checked_coefficient(class, "vcpus", vcpus.unwrap_or(1.0))?;
    let count = record.quantity_or(dimensions::COUNT, 1.0);
    Ok(record.quantity(dimensions::HOURS) * vcpus * count)
}

pub struct ComputeCalculator {
    curve: UtilizationCurve,
}

impl ComputeCalculator {
    pub fn new(curve: UtilizationCurve) -> Self {
        Self { curve }
    }
}

impl EnergyCalculator for ComputeCalculator {
    fn service_type(&self) -> ServiceType {
        ServiceType::Compute
    }

    fn estimate_energy(&self, record: &UsageRecord, store: &ReferenceStore) -> Result<EnergyEstimate> {
        let class = record.resource_id();
        let coefficients = store.lookup_resource_class(ServiceType::Compute, class)?;
        let (per_vcpu_hour_wh, vcpus) = match coefficients {
            ResourceCoefficients::Compute {
                per_vcpu_hour_wh,
                vcpus,
            } => (*per_vcpu_hour_wh, *vcpus),
            _ => {
                return Err(ImpactError::UnknownResourceClass {
                    service: ServiceType::Compute.to_string(),
                    class: class.to_string(),
                })
            }
        };

        let per_vcpu_hour_wh = checked_coefficient(class, "per_vcpu_hour_wh", per_vcpu_hour_wh)?;
        let vcpu_hours = vcpu_hours(record, class, vcpus)?;
        let energy_wh = vcpu_hours * per_vcpu_hour_wh * self.curve.adjustment(record);

        Ok(EnergyEstimate {
            energy_wh,
            resource_class: class.to_string(),
            embodied_gco2e: 0.0,
            vcpu_hours: Some(vcpu_hours),
        })
    }
}
