use tracing::warn;

use crate::cloud::{CloudApi, Credentials, TrafficDetail};
use crate::error::GuardError;
use crate::regions::region_name;

pub const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Outcome of the traffic query.
///
/// A failed query is kept apart from a genuine zero so that it never drives
/// a firewall change.
#[derive(Debug, Clone, PartialEq)]
pub enum TrafficReading {
    Measured(u64),
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UsageSnapshot {
    pub traffic_bytes: u64,
    /// Traffic in GB, rounded to two decimals.
    pub traffic_gb: f64,
    pub usage_percentage: f64,
    pub region_name: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Usage {
    Measured(UsageSnapshot),
    Unknown { reason: String },
}

impl Usage {
    pub fn snapshot(&self) -> Option<&UsageSnapshot> {
        match self {
            Usage::Measured(snapshot) => Some(snapshot),
            Usage::Unknown { .. } => None,
        }
    }
}

pub async fn read_traffic(cloud: &dyn CloudApi, credentials: &Credentials) -> TrafficReading {
    match cloud.list_cdt_traffic(credentials).await {
        Ok(details) => TrafficReading::Measured(total_traffic_bytes(&details)),
        Err(err) => {
            warn!(error = %err, "traffic query failed, usage unknown");
            TrafficReading::Unknown(err.to_string())
        }
    }
}

/// Sum of all line items; missing or negative values count as zero.
pub fn total_traffic_bytes(details: &[TrafficDetail]) -> u64 {
    let total: f64 = details
        .iter()
        .filter_map(|detail| detail.traffic)
        .filter(|bytes| bytes.is_finite() && *bytes > 0.0)
        .sum();
    total as u64
}

pub fn usage_percentage(traffic_bytes: u64, max_traffic_gb: f64) -> Result<f64, GuardError> {
    if !max_traffic_gb.is_finite() || max_traffic_gb <= 0.0 {
        return Err(GuardError::Configuration(format!(
            "maxTraffic must be greater than zero, got {max_traffic_gb}"
        )));
    }
    let traffic_gb = traffic_bytes as f64 / BYTES_PER_GB;
    Ok(round2(traffic_gb / max_traffic_gb * 100.0))
}

/// Turns a traffic reading into usage against the quota.
///
/// The quota is checked even when the reading is unknown.
pub fn evaluate(
    reading: &TrafficReading,
    max_traffic_gb: f64,
    region_id: &str,
) -> Result<Usage, GuardError> {
    match reading {
        TrafficReading::Measured(bytes) => {
            let usage_percentage = usage_percentage(*bytes, max_traffic_gb)?;
            Ok(Usage::Measured(UsageSnapshot {
                traffic_bytes: *bytes,
                traffic_gb: round2(*bytes as f64 / BYTES_PER_GB),
                usage_percentage,
                region_name: region_name(region_id),
            }))
        }
        TrafficReading::Unknown(reason) => {
            usage_percentage(0, max_traffic_gb)?;
            Ok(Usage::Unknown {
                reason: reason.clone(),
            })
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
