//! Common types used throughout the exporter

use serde::{Deserialize, Serialize};

/// Per-tag delivery statistics as reported by Mandrill
///
/// Every numeric field defaults to zero when the provider omits it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagStatistic {
    pub tag: String,
    pub sent: u64,
    pub hard_bounces: u64,
    pub soft_bounces: u64,
    pub rejects: u64,
    pub complaints: u64,
    pub unsubs: u64,
    pub opens: u64,
    pub clicks: u64,
    pub unique_opens: u64,
    pub unique_clicks: u64,
    /// Provider-defined score, passed through unchanged
    pub reputation: i64,
}

/// The fixed set of metrics exported for every tag, in exposition order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricName {
    SentTotal,
    HardBounces,
    SoftBounces,
    Rejects,
    Complaints,
    Unsubs,
    Opens,
    Clicks,
    UniqueOpens,
    UniqueClicks,
    Reputation,
}

impl MetricName {
    /// All metrics in the order they are emitted for a tag
    pub const ALL: [MetricName; 11] = [
        MetricName::SentTotal,
        MetricName::HardBounces,
        MetricName::SoftBounces,
        MetricName::Rejects,
        MetricName::Complaints,
        MetricName::Unsubs,
        MetricName::Opens,
        MetricName::Clicks,
        MetricName::UniqueOpens,
        MetricName::UniqueClicks,
        MetricName::Reputation,
    ];

    /// Metric name without the namespace prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::SentTotal => "sent_total",
            MetricName::HardBounces => "hard_bounces",
            MetricName::SoftBounces => "soft_bounces",
            MetricName::Rejects => "rejects",
            MetricName::Complaints => "complaints",
            MetricName::Unsubs => "unsubs",
            MetricName::Opens => "opens",
            MetricName::Clicks => "clicks",
            MetricName::UniqueOpens => "unique_opens",
            MetricName::UniqueClicks => "unique_clicks",
            MetricName::Reputation => "reputation",
        }
    }

    /// HELP text for the exposition format
    pub fn help(&self) -> &'static str {
        match self {
            MetricName::SentTotal => "Total number of sent mails.",
            MetricName::HardBounces => "Number of mails bounced hard",
            MetricName::SoftBounces => "Number of mails bounced soft",
            MetricName::Rejects => "Number of mails rejected",
            MetricName::Complaints => "Number of complaints",
            MetricName::Unsubs => "Number of unsubscribes",
            MetricName::Opens => "Number of mails opened",
            MetricName::Clicks => "Number of clicks inside mails",
            MetricName::UniqueOpens => "Unique number of mails opened",
            MetricName::UniqueClicks => "Unique number of clicks",
            MetricName::Reputation => "Mandrill reputation",
        }
    }

    /// Whether the value only ever grows
    ///
    /// Reputation is a score, every other field is a running count.
    pub fn is_counter(&self) -> bool {
        !matches!(self, MetricName::Reputation)
    }

    /// Read the field this metric is sourced from
    pub fn value_of(&self, stat: &TagStatistic) -> f64 {
        match self {
            MetricName::SentTotal => stat.sent as f64,
            MetricName::HardBounces => stat.hard_bounces as f64,
            MetricName::SoftBounces => stat.soft_bounces as f64,
            MetricName::Rejects => stat.rejects as f64,
            MetricName::Complaints => stat.complaints as f64,
            MetricName::Unsubs => stat.unsubs as f64,
            MetricName::Opens => stat.opens as f64,
            MetricName::Clicks => stat.clicks as f64,
            MetricName::UniqueOpens => stat.unique_opens as f64,
            MetricName::UniqueClicks => stat.unique_clicks as f64,
            MetricName::Reputation => stat.reputation as f64,
        }
    }
}

impl std::fmt::Display for MetricName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation for one tag
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub name: MetricName,
    pub value: f64,
    /// Value of the single `tag` label
    pub tag: String,
}

/// Name of the only label carried by tag samples
pub const TAG_LABEL: &str = "tag";
