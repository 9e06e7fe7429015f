//! Prometheus text encoding of tag samples

use crate::types::{MetricName, MetricSample, TAG_LABEL};
use prometheus::proto::{self, MetricFamily, MetricType};
use prometheus::{Encoder, TextEncoder};

/// Content type of the text exposition format
pub fn content_type() -> String {
    TextEncoder::new().format_type().to_string()
}

/// Group samples into one family per metric name
///
/// Families follow the fixed metric order and keep samples in the order
/// they were collected. Names without samples produce no family.
/// Duplicate tags are kept as separate series.
pub fn encode_samples(namespace: &str, samples: &[MetricSample]) -> Vec<MetricFamily> {
    MetricName::ALL
        .iter()
        .filter_map(|name| {
            let mut family = MetricFamily::default();
            family.set_name(qualified_name(namespace, *name));
            family.set_help(name.help().to_string());
            family.set_field_type(if name.is_counter() {
                MetricType::COUNTER
            } else {
                MetricType::GAUGE
            });

            let metrics: Vec<proto::Metric> = samples
                .iter()
                .filter(|s| s.name == *name)
                .map(to_metric)
                .collect();
            if metrics.is_empty() {
                return None;
            }

            family.set_metric(metrics.into());
            Some(family)
        })
        .collect()
}

/// Encode tag samples followed by any extra families (exporter self-metrics)
pub fn render(
    namespace: &str,
    samples: &[MetricSample],
    extra: Vec<MetricFamily>,
) -> prometheus::Result<String> {
    let mut families = encode_samples(namespace, samples);
    families.extend(extra);

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

fn qualified_name(namespace: &str, name: MetricName) -> String {
    if namespace.is_empty() {
        name.as_str().to_string()
    } else {
        format!("{}_{}", namespace, name.as_str())
    }
}

fn to_metric(sample: &MetricSample) -> proto::Metric {
    let mut label = proto::LabelPair::default();
    label.set_name(TAG_LABEL.to_string());
    label.set_value(sample.tag.clone());

    let mut metric = proto::Metric::default();
    metric.set_label(vec![label].into());

    if sample.name.is_counter() {
        let mut counter = proto::Counter::default();
        counter.set_value(sample.value);
        metric.set_counter(counter);
    } else {
        let mut gauge = proto::Gauge::default();
        gauge.set_value(sample.value);
        metric.set_gauge(gauge);
    }

    metric
}
