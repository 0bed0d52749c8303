//! Alibaba Cloud RPC surface used by the guard.
//!
//! [`CloudApi`] is the seam between the guard logic and the provider. The
//! production implementation is [`AliyunClient`], which signs every request
//! with ACS3-HMAC-SHA256 and talks to the CDT and ECS endpoints.

mod client;
mod error;
mod signer;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use client::AliyunClient;
pub use error::CloudError;
pub use signer::{sign_request, RequestSignature, SIGNATURE_ALGORITHM};

pub const CDT_API_VERSION: &str = "2021-08-13";
pub const ECS_API_VERSION: &str = "2014-05-26";
pub const DEFAULT_CDT_ENDPOINT: &str = "https://cdt.aliyuncs.com";
pub const DEFAULT_ECS_ENDPOINT: &str = "https://ecs.{region}.aliyuncs.com";
pub const DEFAULT_CLOUD_TIMEOUT_SECS: u64 = 30;

/// Source CIDR of the rule that exposes the instance publicly.
pub const PUBLIC_CIDR: &str = "0.0.0.0/0";

/// Access key pair of one account.
#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub access_key_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"***")
            .finish()
    }
}

/// Endpoint overrides, mostly for private gateways and tests.
///
/// `ecs` may contain a `{region}` placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudEndpoints {
    #[serde(default = "default_cdt_endpoint")]
    pub cdt: String,
    #[serde(default = "default_ecs_endpoint")]
    pub ecs: String,
}

impl Default for CloudEndpoints {
    fn default() -> Self {
        Self {
            cdt: default_cdt_endpoint(),
            ecs: default_ecs_endpoint(),
        }
    }
}

impl CloudEndpoints {
    pub fn ecs_for(&self, region_id: &str) -> String {
        self.ecs.replace("{region}", region_id)
    }
}

fn default_cdt_endpoint() -> String {
    DEFAULT_CDT_ENDPOINT.to_string()
}

fn default_ecs_endpoint() -> String {
    DEFAULT_ECS_ENDPOINT.to_string()
}

/// One line item of `ListCdtInternetTraffic`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrafficDetail {
    #[serde(rename = "Traffic", default)]
    pub traffic: Option<f64>,
    #[serde(rename = "BusinessRegionId", default)]
    pub business_region_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Instance {
    pub instance_id: String,
    pub expired_time: Option<String>,
    pub eip_address: Option<String>,
    pub public_ip_addresses: Vec<String>,
}

impl Instance {
    /// Elastic IP first, then the first classic public address.
    pub fn public_ip(&self) -> Option<&str> {
        self.eip_address
            .as_deref()
            .filter(|ip| !ip.is_empty())
            .or_else(|| {
                self.public_ip_addresses
                    .iter()
                    .map(String::as_str)
                    .find(|ip| !ip.is_empty())
            })
    }
}

/// One ingress/egress entry of a security group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SecurityGroupPermission {
    pub ip_protocol: String,
    pub source_cidr_ip: String,
    pub policy: String,
    pub nic_type: String,
    pub direction: String,
}

#[async_trait]
pub trait CloudApi: Send + Sync {
    /// Current-period CDT internet traffic line items.
    async fn list_cdt_traffic(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<TrafficDetail>, CloudError>;

    /// Every instance visible in the region.
    async fn describe_instances(
        &self,
        credentials: &Credentials,
        region_id: &str,
    ) -> Result<Vec<Instance>, CloudError>;

    async fn describe_instance(
        &self,
        credentials: &Credentials,
        region_id: &str,
        instance_id: &str,
    ) -> Result<Option<Instance>, CloudError>;

    /// First security group attached to the instance.
    async fn security_group_id(
        &self,
        credentials: &Credentials,
        region_id: &str,
        instance_id: &str,
    ) -> Result<String, CloudError>;

    async fn security_group_permissions(
        &self,
        credentials: &Credentials,
        region_id: &str,
        security_group_id: &str,
    ) -> Result<Vec<SecurityGroupPermission>, CloudError>;

    /// Removes the allow-all rule for [`PUBLIC_CIDR`].
    async fn revoke_public_ingress(
        &self,
        credentials: &Credentials,
        region_id: &str,
        security_group_id: &str,
    ) -> Result<(), CloudError>;

    /// Restores the allow-all rule for [`PUBLIC_CIDR`].
    async fn authorize_public_ingress(
        &self,
        credentials: &Credentials,
        region_id: &str,
        security_group_id: &str,
    ) -> Result<(), CloudError>;
}
