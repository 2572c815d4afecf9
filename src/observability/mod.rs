pub mod metrics;
pub mod tracing;

use std::time::Duration;

use anyhow::Result;
use prometheus::{Encoder, Registry, TextEncoder};

use self::metrics::Metrics;
use crate::classification::Label;

/// Prometheus メトリクスを保持する。トレーシングの初期化は [`tracing::init`] が別に行う。
#[derive(Clone)]
pub struct Telemetry {
    registry: Registry,
    metrics: Metrics,
}

impl Telemetry {
    /// 専用レジストリにメトリクスを登録する。インスタンスごとに独立しているのでテストで何度作ってもよい。
    ///
    /// # Errors
    /// メトリクスの登録に失敗した場合はエラーを返す。
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let metrics = Metrics::new(&registry)?;
        Ok(Self { registry, metrics })
    }

    pub fn record_classification(&self, label: Label, elapsed: Duration) {
        self.metrics
            .classifications
            .with_label_values(&[label.as_str()])
            .inc();
        self.metrics
            .classification_duration
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_validation_failure(&self) {
        self.metrics.validation_failures.inc();
    }

    pub fn record_article_created(&self) {
        self.metrics.articles_created.inc();
    }

    pub fn record_registration(&self, success: bool) {
        self.metrics
            .registrations
            .with_label_values(&[outcome(success)])
            .inc();
    }

    pub fn record_login(&self, success: bool) {
        self.metrics
            .logins
            .with_label_values(&[outcome(success)])
            .inc();
    }

    pub fn record_ready_probe(&self, ready: bool) {
        self.metrics
            .health_probes
            .with_label_values(&["ready", outcome(ready)])
            .inc();
    }

    pub fn record_live_probe(&self) {
        self.metrics
            .health_probes
            .with_label_values(&["live", outcome(true)])
            .inc();
    }

    /// Prometheus テキスト形式でレンダリングする。
    pub fn render_prometheus(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(error) = encoder.encode(&metric_families, &mut buffer) {
            ::tracing::warn!(error = %error, "failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

fn outcome(success: bool) -> &'static str {
    if success { "success" } else { "failure" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_metrics_include_recorded_values() {
        let telemetry = Telemetry::new().expect("telemetry");
        telemetry.record_classification(Label::Fake, Duration::from_millis(2));
        telemetry.record_classification(Label::Fake, Duration::from_millis(3));
        telemetry.record_login(false);

        let rendered = telemetry.render_prometheus();

        assert!(rendered.contains(r#"news_check_classifications_total{label="fake"} 2"#));
        assert!(rendered.contains(r#"news_check_logins_total{outcome="failure"} 1"#));
        assert!(rendered.contains("news_check_classification_duration_seconds_count 2"));
    }

    #[test]
    fn health_probes_are_counted_by_outcome() {
        let telemetry = Telemetry::new().expect("telemetry");
        telemetry.record_live_probe();
        telemetry.record_ready_probe(true);
        telemetry.record_ready_probe(false);
        telemetry.record_ready_probe(false);

        let probes = &telemetry.metrics.health_probes;
        assert_eq!(probes.with_label_values(&["live", "success"]).get(), 1);
        assert_eq!(probes.with_label_values(&["ready", "success"]).get(), 1);
        assert_eq!(probes.with_label_values(&["ready", "failure"]).get(), 2);
        assert!(
            telemetry
                .render_prometheus()
                .contains("news_check_health_probes_total")
        );
    }

    #[test]
    fn instances_do_not_share_registries() {
        let first = Telemetry::new().expect("telemetry");
        let second = Telemetry::new().expect("telemetry");
        first.record_article_created();

        assert!(first.render_prometheus().contains("news_check_articles_created_total 1"));
        assert!(second.render_prometheus().contains("news_check_articles_created_total 0"));
    }
}
