//! Per-scrape collection of Mandrill tag statistics
//!
//! `TagCollector` is invoked once per `/metrics` request. It asks the
//! statistics source for fresh data and maps every record onto the fixed
//! metric set. Nothing is retained between calls.

use crate::metrics::exporter::ExporterMetrics;
use crate::types::{MetricName, MetricSample, TagStatistic};
use crate::upstream::TagStatisticsSource;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Maps upstream tag statistics to metric samples on demand
#[derive(Clone)]
pub struct TagCollector {
    source: Arc<dyn TagStatisticsSource>,
    metrics: Option<ExporterMetrics>,
}

impl TagCollector {
    /// Create a collector over the given statistics source
    pub fn new(source: Arc<dyn TagStatisticsSource>) -> Self {
        Self {
            source,
            metrics: None,
        }
    }

    /// Count upstream failures in the exporter's own metrics
    pub fn with_metrics(mut self, metrics: ExporterMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Fetch and map the current statistics
    ///
    /// Upstream failures are logged and yield an empty sample set, so a
    /// scrape always produces a valid body.
    pub async fn collect(&self) -> Vec<MetricSample> {
        match self.source.fetch_tag_statistics().await {
            Ok(stats) => {
                warn_on_duplicate_tags(&stats);
                let samples = samples_from(&stats);
                debug!(
                    tags = stats.len(),
                    samples = samples.len(),
                    "Collected tag statistics"
                );
                samples
            }
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "Failed to fetch tag statistics");
                if let Some(metrics) = &self.metrics {
                    metrics.record_upstream_error(&e);
                }
                Vec::new()
            }
        }
    }
}

/// Map records to samples, 11 per record, in upstream order
pub fn samples_from(stats: &[TagStatistic]) -> Vec<MetricSample> {
    stats
        .iter()
        .flat_map(|stat| {
            MetricName::ALL.iter().map(move |name| MetricSample {
                name: *name,
                value: name.value_of(stat),
                tag: stat.tag.clone(),
            })
        })
        .collect()
}

/// Duplicate tags are exported unmerged; only make them visible in the logs
fn warn_on_duplicate_tags(stats: &[TagStatistic]) {
    let mut seen = HashSet::with_capacity(stats.len());
    for stat in stats {
        if !seen.insert(stat.tag.as_str()) {
            warn!(tag = %stat.tag, "Mandrill returned a duplicate tag");
        }
    }
}
