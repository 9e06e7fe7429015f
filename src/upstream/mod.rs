//! Mandrill API access
//!
//! This module fetches the per-tag statistics that feed every scrape.

pub mod client;

pub use client::{parse_tag_statistics, MandrillClient, TagStatisticsSource};
