//! End-to-end tests against the shipped reference dataset

use approx::assert_relative_eq;
use impact_engine::{
    dimensions, Comparator, EngineConfig, ImpactEngine, ImpactError, RankingMetric,
    ReferenceStore, ServiceType, TableSources, UsageRecord, WaterStress,
};
use std::path::PathBuf;
use std::sync::Arc;

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data")
}

async fn engine() -> ImpactEngine {
    let config = EngineConfig {
        data_dir: data_dir(),
        ..EngineConfig::default()
    };
    let store = ReferenceStore::load_from_config(&config)
        .await
        .expect("shipped data should load");
    ImpactEngine::from_config(Arc::new(store), &config)
}

#[tokio::test]
async fn test_shipped_data_loads() {
    let store = ReferenceStore::load(&TableSources::from_dir(data_dir()), "us-east-1")
        .await
        .unwrap();

    assert_eq!(store.region_codes().len(), 15);
    assert!(store.region_codes().contains(&"eu-north-1"));
    assert!(!store.prices().is_empty());
    for region in store.regions() {
        assert!(region.defaulted_fields.is_empty(), "{} is incomplete", region.region);
        assert!(region.pue >= 1.0);
    }
    assert!(!store.resource_classes(ServiceType::Compute).is_empty());
    assert!(!store.resource_classes(ServiceType::ModelInference).is_empty());
}

#[tokio::test]
async fn test_numeric_stress_scores_in_shipped_data() {
    let engine = engine().await;
    let store = engine.store();
    assert_eq!(store.lookup_region("ap-southeast-2").value.water_stress, WaterStress::Medium);
    assert_eq!(store.lookup_region("ap-northeast-1").value.water_stress, WaterStress::High);
    assert_eq!(store.lookup_region("ap-south-1").value.water_stress, WaterStress::VeryHigh);
}

#[tokio::test]
async fn test_compute_estimate() {
    let engine = engine().await;
    let record = UsageRecord::new(ServiceType::Compute, "m5.large", "us-east-1")
        .with_usage(dimensions::HOURS, 730.0);

    let result = engine.evaluate(&record).unwrap();

    // 730 h x 2 vCPU x 20 Wh
    assert_relative_eq!(result.energy_wh, 29_200.0, epsilon = 1e-9);
    assert_relative_eq!(result.carbon_gco2e, 29.2 * 1.2 * 379.1, epsilon = 1e-6);
    assert_relative_eq!(result.water_liters, 29.2 * 1.2 * 1.8, epsilon = 1e-9);
    assert_eq!(result.amortized_embodied_gco2e, 0.0);
}

#[tokio::test]
async fn test_compute_cost_uses_vcpu_hours() {
    let engine = engine().await;
    let record = UsageRecord::new(ServiceType::Compute, "m5.large", "us-east-1")
        .with_usage(dimensions::VCPU_HOURS, 100.0);
    let result = engine.evaluate(&record).unwrap();
    assert_relative_eq!(result.cost_usd.unwrap(), 4.8, epsilon = 1e-9);
}

#[tokio::test]
async fn test_compute_cost_from_hours_matches_vcpu_hours() {
    let engine = engine().await;
    let by_hours = UsageRecord::new(ServiceType::Compute, "m5.large", "us-east-1")
        .with_usage(dimensions::HOURS, 730.0);
    let by_vcpu_hours = UsageRecord::new(ServiceType::Compute, "m5.large", "us-east-1")
        .with_usage(dimensions::VCPU_HOURS, 1460.0);

    let hours_cost = engine.evaluate(&by_hours).unwrap().cost_usd.unwrap();
    let vcpu_cost = engine.evaluate(&by_vcpu_hours).unwrap().cost_usd.unwrap();
    // 730 h x 2 vCPU x $0.048
    assert_relative_eq!(hours_cost, 70.08, epsilon = 1e-9);
    assert_relative_eq!(hours_cost, vcpu_cost, epsilon = 1e-9);

    let fleet = by_hours.with_usage(dimensions::COUNT, 3.0);
    let result = engine.evaluate(&fleet).unwrap();
    assert_relative_eq!(result.energy_wh, 3.0 * 29_200.0, epsilon = 1e-9);
    assert_relative_eq!(result.cost_usd.unwrap(), 3.0 * 70.08, epsilon = 1e-9);
}

#[tokio::test]
async fn test_bedrock_model_with_alias_service() {
    let engine = engine().await;
    let service: ServiceType = "bedrock".parse().unwrap();
    let record = UsageRecord::new(service, "anthropic.claude-3-haiku-20240307-v1:0", "us-west-2")
        .with_usage(dimensions::INPUT_TOKENS, 1000.0)
        .with_usage(dimensions::OUTPUT_TOKENS, 500.0);

    let result = engine.evaluate(&record).unwrap();
    assert_relative_eq!(result.energy_wh, 1500.0 * 0.000125, epsilon = 1e-12);
    assert_relative_eq!(result.amortized_embodied_gco2e, 0.013, epsilon = 1e-12);
    assert!(result.total_gco2e > result.carbon_gco2e);
    assert!(result.cost_usd.is_some());
}

#[tokio::test]
async fn test_model_without_training_has_no_embodied_term() {
    let engine = engine().await;
    let record = UsageRecord::new(ServiceType::ModelInference, "mixtral-8x7b", "us-east-1")
        .with_usage(dimensions::INPUT_TOKENS, 10_000.0);
    let result = engine.evaluate(&record).unwrap();
    assert_eq!(result.amortized_embodied_gco2e, 0.0);
    assert_eq!(result.total_gco2e, result.carbon_gco2e);
}

#[tokio::test]
async fn test_unknown_model_is_rejected() {
    let engine = engine().await;
    let record = UsageRecord::new(ServiceType::ModelInference, "gpt-17", "us-east-1")
        .with_usage(dimensions::INPUT_TOKENS, 10.0);
    assert!(matches!(
        engine.evaluate(&record),
        Err(ImpactError::UnknownModel(_))
    ));
}

#[tokio::test]
async fn test_database_includes_storage_term() {
    let engine = engine().await;
    let base = UsageRecord::new(ServiceType::RelationalStorage, "db.m5.large", "eu-west-1")
        .with_usage(dimensions::VCPU_HOURS, 10.0);
    let with_storage = base.clone().with_usage(dimensions::STORAGE_GB, 500.0);

    let compute_only = engine.evaluate(&base).unwrap();
    let combined = engine.evaluate(&with_storage).unwrap();
    assert_relative_eq!(
        combined.energy_wh - compute_only.energy_wh,
        500.0 * 0.0004,
        epsilon = 1e-9
    );
}

#[tokio::test]
async fn test_lowest_carbon_region_is_eu_north() {
    let engine = engine().await;
    let comparator = Comparator::new(engine);
    let record = UsageRecord::new(ServiceType::Compute, "c5.xlarge", "us-east-1")
        .with_usage(dimensions::HOURS, 24.0);

    let set = comparator
        .rank_all_regions(&record, RankingMetric::Carbon)
        .unwrap();
    assert_eq!(set.len(), 15);
    assert_eq!(set.best().unwrap().key, "eu-north-1");
    assert_eq!(set.worst().unwrap().key, "ap-south-1");

    let current = set.get("us-east-1").unwrap().result.carbon_gco2e;
    let better = set.improvements_over("us-east-1").unwrap();
    assert!(!better.is_empty());
    assert!(better.iter().all(|e| e.result.carbon_gco2e < current));
}

#[tokio::test]
async fn test_storage_class_comparison() {
    let engine = engine().await;
    let comparator = Comparator::new(engine);
    let record = UsageRecord::new(ServiceType::ObjectStorage, "STANDARD", "us-east-1")
        .with_usage(dimensions::STORAGE_GB, 10_000.0)
        .with_usage(dimensions::GET_REQUESTS, 1000.0);

    let set = comparator
        .compare_resource_classes(&record, &["STANDARD", "GLACIER", "DEEP_ARCHIVE", "TAPE"])
        .unwrap();
    assert_eq!(set.len(), 3);
    assert_eq!(set.best().unwrap().key, "DEEP_ARCHIVE");
    assert_eq!(set.failures.len(), 1);
    assert_eq!(set.failures[0].key, "TAPE");
}

#[tokio::test]
async fn test_parallel_evaluation_from_threads() {
    let engine = engine().await;
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = engine.clone();
            std::thread::spawn(move || {
                let record = UsageRecord::new(ServiceType::Compute, "t2.micro", "us-west-2")
                    .with_usage(dimensions::VCPU_HOURS, 10.0 * (i + 1) as f64);
                engine.evaluate(&record).unwrap().energy_wh
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_relative_eq!(handle.join().unwrap(), 25.0 * (i + 1) as f64, epsilon = 1e-9);
    }
}

#[tokio::test]
async fn test_result_serializes_with_resolution() {
    let engine = engine().await;
    let record = UsageRecord::new(ServiceType::ObjectStorage, "GLACIER", "nowhere-9")
        .with_usage(dimensions::STORAGE_GB, 100.0);
    let result = engine.evaluate(&record).unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["service_type"], "object-storage");
    assert_eq!(json["resolution"]["requested_region"], "nowhere-9");
    assert_eq!(json["resolution"]["region"], "us-east-1");
    assert_eq!(json["resolution"]["region_fallback"], true);
    assert!(json["resolution"].get("defaulted_region_fields").is_none());
    assert!(json["cost_usd"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_digest_is_stable_across_loads() {
    let first = ReferenceStore::load(&TableSources::from_dir(data_dir()), "us-east-1")
        .await
        .unwrap();
    let second = ReferenceStore::load(&TableSources::from_dir(data_dir()), "eu-west-1")
        .await
        .unwrap();
    assert_eq!(first.digest(), second.digest());
    assert_eq!(first.digest().len(), 64);
}
