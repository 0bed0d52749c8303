//! Multi-channel notification delivery.
//!
//! A [`Notice`] is handed to a [`NotificationFanout`], which attempts every
//! configured channel in turn and records a per-channel [`ChannelOutcome`].
//! A failing channel never prevents the remaining channels from being tried.

pub mod channels;
mod error;
mod fanout;
mod notice;
mod settings;

pub use channels::Notifier;
pub use error::{NotificationError, SettingsError};
pub use fanout::{ChannelOutcome, FanoutReport, NotificationFanout};
pub use notice::Notice;
pub use settings::NotificationSettings;

/// Title used when the configuration does not provide one.
pub const DEFAULT_TITLE: &str = "CDT流量统计";
