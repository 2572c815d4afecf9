/// Prometheusメトリクス定義。
use prometheus::{
    Histogram, IntCounter, IntCounterVec, Registry, register_histogram_with_registry,
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
};

/// メトリクスコレクター。
#[derive(Clone)]
pub struct Metrics {
    // カウンター
    pub classifications: IntCounterVec,
    pub validation_failures: IntCounter,
    pub articles_created: IntCounter,
    pub registrations: IntCounterVec,
    pub logins: IntCounterVec,
    pub health_probes: IntCounterVec,

    // ヒストグラム
    pub classification_duration: Histogram,
}

impl Metrics {
    /// # Errors
    /// Fails when a metric with the same name is already registered in `registry`.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        Ok(Self {
            classifications: register_int_counter_vec_with_registry!(
                "news_check_classifications_total",
                "Classifications performed, by resulting label",
                &["label"],
                registry
            )?,
            validation_failures: register_int_counter_with_registry!(
                "news_check_validation_failures_total",
                "Requests rejected because of invalid input",
                registry
            )?,
            articles_created: register_int_counter_with_registry!(
                "news_check_articles_created_total",
                "Articles persisted",
                registry
            )?,
            registrations: register_int_counter_vec_with_registry!(
                "news_check_registrations_total",
                "Account registrations, by outcome",
                &["outcome"],
                registry
            )?,
            logins: register_int_counter_vec_with_registry!(
                "news_check_logins_total",
                "Login attempts, by outcome",
                &["outcome"],
                registry
            )?,
            health_probes: register_int_counter_vec_with_registry!(
                "news_check_health_probes_total",
                "Liveness and readiness probes served, by probe and outcome",
                &["probe", "outcome"],
                registry
            )?,
            classification_duration: register_histogram_with_registry!(
                "news_check_classification_duration_seconds",
                "Time spent scoring a single text",
                vec![0.000_05, 0.000_1, 0.000_25, 0.000_5, 0.001, 0.002_5, 0.005, 0.01, 0.05],
                registry
            )?,
        })
    }
}
