//! Unit prices per service, resource class and usage dimension

use std::collections::BTreeMap;

use super::table::Table;
use crate::error::{ImpactError, Result};
use crate::models::ServiceType;

/// Class id that prices a dimension for every class of a service
pub const ANY_CLASS: &str = "*";

type PriceKey = (ServiceType, String, String);

/// Indexed pricing table
#[derive(Debug, Clone, Default)]
pub struct PriceBook {
    rates: BTreeMap<PriceKey, f64>,
}

impl PriceBook {
    pub(crate) fn from_table(table: &Table) -> Result<Self> {
        let service_col = table.column("service_type")?;
        let class_col = table.column("class_id")?;
        let dimension_col = table.column("dimension")?;
        let price_col = table.column("usd_per_unit")?;

        let mut rates = BTreeMap::new();
        for row in table.rows() {
            let raw_service = table.text(row, service_col)?;
            let service: ServiceType = raw_service.parse().map_err(|_| {
                ImpactError::load(
                    table.name(),
                    row.line,
                    format!("unknown service type '{}'", raw_service),
                )
            })?;
            let key = (
                service,
                table.text(row, class_col)?.to_string(),
                table.text(row, dimension_col)?.to_string(),
            );
            let price = table.number(row, price_col)?;

            if rates.insert(key.clone(), price).is_some() {
                return Err(ImpactError::load(
                    table.name(),
                    row.line,
                    format!("duplicate price for {} {} {}", key.0, key.1, key.2),
                ));
            }
        }

        Ok(Self { rates })
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Prices that apply to one class, class-specific rows overriding `*` rows
    pub fn rates_for(&self, service: ServiceType, class_id: &str) -> BTreeMap<&str, f64> {
        let mut rates = BTreeMap::new();
        for ((svc, class, dimension), price) in &self.rates {
            if *svc == service && class == ANY_CLASS {
                rates.insert(dimension.as_str(), *price);
            }
        }
        for ((svc, class, dimension), price) in &self.rates {
            if *svc == service && class == class_id {
                rates.insert(dimension.as_str(), *price);
            }
        }
        rates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(content: &str) -> Result<PriceBook> {
        let table = Table::parse("pricing.csv", content)?;
        PriceBook::from_table(&table)
    }

    #[test]
    fn test_class_rows_override_wildcard() {
        let prices = book(
            "service_type,class_id,dimension,usd_per_unit\n\
             s3,*,storage_gb,0.023\n\
             s3,*,get_requests,0.0000004\n\
             object-storage,GLACIER,storage_gb,0.004\n",
        )
        .unwrap();

        let glacier = prices.rates_for(ServiceType::ObjectStorage, "GLACIER");
        assert_eq!(glacier["storage_gb"], 0.004);
        assert_eq!(glacier["get_requests"], 0.0000004);

        let standard = prices.rates_for(ServiceType::ObjectStorage, "STANDARD");
        assert_eq!(standard["storage_gb"], 0.023);

        assert!(prices.rates_for(ServiceType::Compute, "m5.large").is_empty());
    }

    #[test]
    fn test_unknown_service_rejected() {
        let err = book("service_type,class_id,dimension,usd_per_unit\nlambda,*,invocations,0.2\n")
            .unwrap_err();
        assert!(matches!(err, ImpactError::DataLoad { line: 2, .. }));
    }

    #[test]
    fn test_duplicate_price_rejected() {
        let err = book(
            "service_type,class_id,dimension,usd_per_unit\n\
             ec2,m5.large,vcpu_hours,0.048\n\
             compute,m5.large,vcpu_hours,0.05\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }
}
