//! Traffic guard for Alibaba Cloud CDT.
//!
//! Each run reads an account's internet egress traffic, compares it with the
//! configured quota and toggles the instance's allow-all ingress rule when
//! usage crosses 95%. A separate digest run reports usage without mutating.

pub mod cloud;
pub mod config;
pub mod error;
pub mod firewall;
pub mod gate;
pub mod regions;
pub mod report;
pub mod runlog;
pub mod runner;
pub mod usage;

#[cfg(test)]
mod testing;

pub use cloud::{AliyunClient, CloudApi, CloudError};
pub use config::{Account, GuardConfig};
pub use error::GuardError;
pub use runlog::RunLog;
pub use runner::{DigestSummary, Guard};
