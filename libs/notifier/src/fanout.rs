use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{info, warn};

use crate::channels::{self, Notifier};
use crate::{Notice, NotificationSettings, SettingsError};

/// Result of one channel's delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOutcome {
    Delivered,
    Failed(String),
}

impl ChannelOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, ChannelOutcome::Delivered)
    }
}

// Delivered channels serialize as `true`, failed ones as their error text.
impl Serialize for ChannelOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ChannelOutcome::Delivered => serializer.serialize_bool(true),
            ChannelOutcome::Failed(reason) => serializer.serialize_str(reason),
        }
    }
}

/// Per-channel outcomes of a single fanout, in delivery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanoutReport {
    outcomes: Vec<(&'static str, ChannelOutcome)>,
}

impl FanoutReport {
    pub fn outcomes(&self) -> &[(&'static str, ChannelOutcome)] {
        &self.outcomes
    }

    pub fn outcome(&self, channel: &str) -> Option<&ChannelOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| *name == channel)
            .map(|(_, outcome)| outcome)
    }

    /// True when every attempted channel delivered (vacuously true for none).
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|(_, outcome)| outcome.is_delivered())
    }

    pub fn failed_channels(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| !outcome.is_delivered())
            .count()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Serialize for FanoutReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.outcomes.len()))?;
        for (name, outcome) in &self.outcomes {
            map.serialize_entry(name, outcome)?;
        }
        map.end()
    }
}

impl fmt::Display for FanoutReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_success() {
            write!(f, "成功")
        } else {
            write!(f, "发送失败: {}", self.to_json())
        }
    }
}

/// Sends a notice to every configured channel, one after another.
pub struct NotificationFanout {
    channels: Vec<Box<dyn Notifier>>,
}

impl NotificationFanout {
    pub fn new(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels }
    }

    pub fn from_settings(settings: &NotificationSettings) -> Result<Self, SettingsError> {
        Ok(Self::new(channels::from_settings(settings)?))
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    pub async fn notify(&self, notice: &Notice) -> FanoutReport {
        let mut report = FanoutReport::default();

        for channel in &self.channels {
            let outcome = match channel.send(notice).await {
                Ok(()) => ChannelOutcome::Delivered,
                Err(err) => {
                    warn!(channel = channel.name(), error = %err, "notification delivery failed");
                    ChannelOutcome::Failed(err.to_string())
                }
            };
            report.outcomes.push((channel.name(), outcome));
        }

        if report.is_success() {
            info!(channels = report.outcomes.len(), "notification delivered");
        } else {
            warn!(
                failed = report.failed_channels(),
                outcomes = %report.to_json(),
                "notification partially failed"
            );
        }

        report
    }
}
