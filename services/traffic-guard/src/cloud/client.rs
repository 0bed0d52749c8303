use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;
use uuid::Uuid;

use super::{
    sign_request, CloudApi, CloudEndpoints, CloudError, Credentials, Instance,
    SecurityGroupPermission, TrafficDetail, CDT_API_VERSION, DEFAULT_CLOUD_TIMEOUT_SECS,
    ECS_API_VERSION, PUBLIC_CIDR,
};

const DESCRIBE_INSTANCES_PAGE_SIZE: usize = 100;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ApiErrorBody {
    code: String,
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ListTrafficResponse {
    traffic_details: Vec<TrafficDetail>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DescribeInstancesResponse {
    instances: InstanceList,
    total_count: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct InstanceList {
    instance: Vec<InstanceItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct InstanceItem {
    instance_id: String,
    expired_time: Option<String>,
    eip_address: EipAddress,
    public_ip_address: PublicIpAddress,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct EipAddress {
    ip_address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct PublicIpAddress {
    ip_address: Vec<String>,
}

impl From<InstanceItem> for Instance {
    fn from(item: InstanceItem) -> Self {
        Instance {
            instance_id: item.instance_id,
            expired_time: item.expired_time.filter(|t| !t.is_empty()),
            eip_address: item.eip_address.ip_address,
            public_ip_addresses: item.public_ip_address.ip_address,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct InstanceAttributeResponse {
    security_group_ids: SecurityGroupIds,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct SecurityGroupIds {
    security_group_id: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct SecurityGroupAttributeResponse {
    permissions: PermissionList,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct PermissionList {
    permission: Vec<SecurityGroupPermission>,
}

/// Signed RPC client for the CDT and ECS APIs.
pub struct AliyunClient {
    http_client: Client,
    endpoints: CloudEndpoints,
}

impl AliyunClient {
    pub fn new(endpoints: CloudEndpoints) -> Result<Self, CloudError> {
        Self::with_timeout(endpoints, DEFAULT_CLOUD_TIMEOUT_SECS)
    }

    pub fn with_timeout(endpoints: CloudEndpoints, timeout_secs: u64) -> Result<Self, CloudError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(CloudError::Client)?;

        Ok(Self {
            http_client,
            endpoints,
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        credentials: &Credentials,
        endpoint: &str,
        action: &'static str,
        version: &'static str,
        params: BTreeMap<String, String>,
    ) -> Result<T, CloudError> {
        let base = Url::parse(endpoint)
            .map_err(|_| CloudError::InvalidEndpoint(endpoint.to_string()))?;
        let host = match (base.host_str(), base.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(CloudError::InvalidEndpoint(endpoint.to_string())),
        };

        let date = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let nonce = Uuid::new_v4().to_string();
        let signature = sign_request(
            credentials,
            "POST",
            &host,
            action,
            version,
            &params,
            &date,
            &nonce,
        );

        let mut url = format!("{}/", endpoint.trim_end_matches('/'));
        if !signature.canonical_query.is_empty() {
            url.push('?');
            url.push_str(&signature.canonical_query);
        }

        debug!(action, %host, "calling cloud api");

        let mut request = self.http_client.post(&url);
        for (name, value) in &signature.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|source| CloudError::Transport { action, source })?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| CloudError::Transport { action, source })?;

        if !status.is_success() {
            let error: ApiErrorBody = serde_json::from_str(&body).unwrap_or_default();
            return Err(CloudError::Api {
                action,
                status: status.as_u16(),
                code: if error.code.is_empty() {
                    status.to_string()
                } else {
                    error.code
                },
                message: if error.message.is_empty() {
                    body
                } else {
                    error.message
                },
            });
        }

        serde_json::from_str(&body).map_err(|e| CloudError::InvalidResponse {
            action,
            reason: e.to_string(),
        })
    }

    fn public_rule_params(region_id: &str, security_group_id: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("RegionId".to_string(), region_id.to_string()),
            ("SecurityGroupId".to_string(), security_group_id.to_string()),
            ("IpProtocol".to_string(), "all".to_string()),
            ("PortRange".to_string(), "-1/-1".to_string()),
            ("SourceCidrIp".to_string(), PUBLIC_CIDR.to_string()),
            ("NicType".to_string(), "intranet".to_string()),
        ])
    }
}

#[async_trait]
impl CloudApi for AliyunClient {
    #[instrument(skip_all)]
    async fn list_cdt_traffic(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<TrafficDetail>, CloudError> {
        let response: ListTrafficResponse = self
            .call(
                credentials,
                &self.endpoints.cdt,
                "ListCdtInternetTraffic",
                CDT_API_VERSION,
                BTreeMap::new(),
            )
            .await?;
        Ok(response.traffic_details)
    }

    #[instrument(skip(self, credentials))]
    async fn describe_instances(
        &self,
        credentials: &Credentials,
        region_id: &str,
    ) -> Result<Vec<Instance>, CloudError> {
        let endpoint = self.endpoints.ecs_for(region_id);
        let mut instances = Vec::new();
        let mut page = 1usize;

        loop {
            let params = BTreeMap::from([
                ("RegionId".to_string(), region_id.to_string()),
                ("PageNumber".to_string(), page.to_string()),
                (
                    "PageSize".to_string(),
                    DESCRIBE_INSTANCES_PAGE_SIZE.to_string(),
                ),
            ]);
            let response: DescribeInstancesResponse = self
                .call(
                    credentials,
                    &endpoint,
                    "DescribeInstances",
                    ECS_API_VERSION,
                    params,
                )
                .await?;

            let fetched = response.instances.instance.len();
            instances.extend(response.instances.instance.into_iter().map(Instance::from));

            if fetched == 0 || instances.len() >= response.total_count {
                break;
            }
            page += 1;
        }

        debug!(count = instances.len(), "listed instances");
        Ok(instances)
    }

    #[instrument(skip(self, credentials))]
    async fn describe_instance(
        &self,
        credentials: &Credentials,
        region_id: &str,
        instance_id: &str,
    ) -> Result<Option<Instance>, CloudError> {
        let ids = serde_json::to_string(&[instance_id]).map_err(|e| {
            CloudError::InvalidResponse {
                action: "DescribeInstances",
                reason: e.to_string(),
            }
        })?;
        let params = BTreeMap::from([
            ("RegionId".to_string(), region_id.to_string()),
            ("InstanceIds".to_string(), ids),
        ]);
        let response: DescribeInstancesResponse = self
            .call(
                credentials,
                &self.endpoints.ecs_for(region_id),
                "DescribeInstances",
                ECS_API_VERSION,
                params,
            )
            .await?;

        Ok(response
            .instances
            .instance
            .into_iter()
            .next()
            .map(Instance::from))
    }

    #[instrument(skip(self, credentials))]
    async fn security_group_id(
        &self,
        credentials: &Credentials,
        region_id: &str,
        instance_id: &str,
    ) -> Result<String, CloudError> {
        let params = BTreeMap::from([
            ("RegionId".to_string(), region_id.to_string()),
            ("InstanceId".to_string(), instance_id.to_string()),
        ]);
        let response: InstanceAttributeResponse = self
            .call(
                credentials,
                &self.endpoints.ecs_for(region_id),
                "DescribeInstanceAttribute",
                ECS_API_VERSION,
                params,
            )
            .await?;

        response
            .security_group_ids
            .security_group_id
            .into_iter()
            .next()
            .ok_or_else(|| CloudError::InvalidResponse {
                action: "DescribeInstanceAttribute",
                reason: format!("instance {instance_id} has no security group"),
            })
    }

    #[instrument(skip(self, credentials))]
    async fn security_group_permissions(
        &self,
        credentials: &Credentials,
        region_id: &str,
        security_group_id: &str,
    ) -> Result<Vec<SecurityGroupPermission>, CloudError> {
        let params = BTreeMap::from([
            ("RegionId".to_string(), region_id.to_string()),
            ("SecurityGroupId".to_string(), security_group_id.to_string()),
        ]);
        let response: SecurityGroupAttributeResponse = self
            .call(
                credentials,
                &self.endpoints.ecs_for(region_id),
                "DescribeSecurityGroupAttribute",
                ECS_API_VERSION,
                params,
            )
            .await?;
        Ok(response.permissions.permission)
    }

    #[instrument(skip(self, credentials))]
    async fn revoke_public_ingress(
        &self,
        credentials: &Credentials,
        region_id: &str,
        security_group_id: &str,
    ) -> Result<(), CloudError> {
        let _: serde_json::Value = self
            .call(
                credentials,
                &self.endpoints.ecs_for(region_id),
                "RevokeSecurityGroup",
                ECS_API_VERSION,
                Self::public_rule_params(region_id, security_group_id),
            )
            .await?;
        info!("revoked public ingress rule");
        Ok(())
    }

    #[instrument(skip(self, credentials))]
    async fn authorize_public_ingress(
        &self,
        credentials: &Credentials,
        region_id: &str,
        security_group_id: &str,
    ) -> Result<(), CloudError> {
        let _: serde_json::Value = self
            .call(
                credentials,
                &self.endpoints.ecs_for(region_id),
                "AuthorizeSecurityGroup",
                ECS_API_VERSION,
                Self::public_rule_params(region_id, security_group_id),
            )
            .await?;
        info!("authorized public ingress rule");
        Ok(())
    }
}
