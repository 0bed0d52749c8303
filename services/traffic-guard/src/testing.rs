//! In-memory doubles for the cloud API and notification channels.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cdt_notifier::{Notice, NotificationError, NotificationFanout, Notifier};

use crate::cloud::{
    CloudApi, CloudError, Credentials, Instance, SecurityGroupPermission, TrafficDetail,
    PUBLIC_CIDR,
};
use crate::config::Account;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Revoke,
    Authorize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InstancesMode {
    Listed,
    BadCredentials,
    Unavailable,
}

pub struct FakeCloud {
    traffic: Option<Vec<u64>>,
    instances: Vec<Instance>,
    instances_mode: InstancesMode,
    security_group: Option<String>,
    permissions: Mutex<Option<Vec<SecurityGroupPermission>>>,
    fail_mutations: bool,
    mutations: Mutex<Vec<Mutation>>,
}

impl FakeCloud {
    pub const INSTANCE_ID: &'static str = "i-j6c1";

    /// One visible instance with the public rule present and no traffic.
    pub fn new() -> Self {
        Self {
            traffic: Some(Vec::new()),
            instances: vec![Instance {
                instance_id: Self::INSTANCE_ID.to_string(),
                expired_time: Some("2099-12-31T16:00Z".to_string()),
                eip_address: Some("47.242.1.10".to_string()),
                public_ip_addresses: Vec::new(),
            }],
            instances_mode: InstancesMode::Listed,
            security_group: Some("sg-j6c2".to_string()),
            permissions: Mutex::new(Some(vec![public_rule()])),
            fail_mutations: false,
            mutations: Mutex::new(Vec::new()),
        }
    }

    pub fn credentials() -> Credentials {
        Credentials {
            access_key_id: "LTAI5tTest".to_string(),
            access_key_secret: "secret".to_string(),
        }
    }

    pub fn with_traffic(mut self, items: Vec<u64>) -> Self {
        self.traffic = Some(items);
        self
    }

    /// Traffic worth `percentage` of `max_gb`.
    pub fn with_usage(self, percentage: f64, max_gb: f64) -> Self {
        let bytes = (max_gb * percentage / 100.0 * crate::usage::BYTES_PER_GB) as u64;
        self.with_traffic(vec![bytes])
    }

    pub fn failing_traffic(mut self) -> Self {
        self.traffic = None;
        self
    }

    pub fn without_instances(mut self) -> Self {
        self.instances.clear();
        self
    }

    pub fn with_bad_credentials(mut self) -> Self {
        self.instances_mode = InstancesMode::BadCredentials;
        self
    }

    pub fn with_unavailable_ecs(mut self) -> Self {
        self.instances_mode = InstancesMode::Unavailable;
        self
    }

    pub fn with_rule_disabled(self) -> Self {
        *self.permissions.lock().unwrap() = Some(Vec::new());
        self
    }

    pub fn failing_rule_query(self) -> Self {
        *self.permissions.lock().unwrap() = None;
        self
    }

    pub fn without_security_group(mut self) -> Self {
        self.security_group = None;
        self
    }

    pub fn failing_mutations(mut self) -> Self {
        self.fail_mutations = true;
        self
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.mutations.lock().unwrap().clone()
    }

    fn api_error(action: &'static str, status: u16, code: &str) -> CloudError {
        CloudError::Api {
            action,
            status,
            code: code.to_string(),
            message: "simulated".to_string(),
        }
    }

    fn mutate(&self, mutation: Mutation) -> Result<(), CloudError> {
        let action = match mutation {
            Mutation::Revoke => "RevokeSecurityGroup",
            Mutation::Authorize => "AuthorizeSecurityGroup",
        };
        if self.fail_mutations {
            return Err(Self::api_error(action, 500, "InternalError"));
        }
        self.mutations.lock().unwrap().push(mutation);
        if let Some(rules) = self.permissions.lock().unwrap().as_mut() {
            match mutation {
                Mutation::Revoke => rules.retain(|r| r.source_cidr_ip != PUBLIC_CIDR),
                Mutation::Authorize => rules.push(public_rule()),
            }
        }
        Ok(())
    }
}

pub fn public_rule() -> SecurityGroupPermission {
    SecurityGroupPermission {
        ip_protocol: "ALL".to_string(),
        source_cidr_ip: PUBLIC_CIDR.to_string(),
        policy: "Accept".to_string(),
        nic_type: "intranet".to_string(),
        direction: "ingress".to_string(),
    }
}

#[async_trait]
impl CloudApi for FakeCloud {
    async fn list_cdt_traffic(&self, _: &Credentials) -> Result<Vec<TrafficDetail>, CloudError> {
        match &self.traffic {
            Some(items) => Ok(items
                .iter()
                .map(|bytes| TrafficDetail {
                    traffic: Some(*bytes as f64),
                    business_region_id: None,
                })
                .collect()),
            None => Err(Self::api_error("ListCdtInternetTraffic", 503, "ServiceUnavailable")),
        }
    }

    async fn describe_instances(
        &self,
        _: &Credentials,
        _: &str,
    ) -> Result<Vec<Instance>, CloudError> {
        match self.instances_mode {
            InstancesMode::Listed => Ok(self.instances.clone()),
            InstancesMode::BadCredentials => Err(Self::api_error(
                "DescribeInstances",
                404,
                "InvalidAccessKeyId.NotFound",
            )),
            InstancesMode::Unavailable => {
                Err(Self::api_error("DescribeInstances", 503, "ServiceUnavailable"))
            }
        }
    }

    async fn describe_instance(
        &self,
        _: &Credentials,
        _: &str,
        instance_id: &str,
    ) -> Result<Option<Instance>, CloudError> {
        Ok(self
            .instances
            .iter()
            .find(|i| i.instance_id == instance_id)
            .cloned())
    }

    async fn security_group_id(
        &self,
        _: &Credentials,
        _: &str,
        _: &str,
    ) -> Result<String, CloudError> {
        self.security_group.clone().ok_or(CloudError::InvalidResponse {
            action: "DescribeInstanceAttribute",
            reason: "no security group".to_string(),
        })
    }

    async fn security_group_permissions(
        &self,
        _: &Credentials,
        _: &str,
        _: &str,
    ) -> Result<Vec<SecurityGroupPermission>, CloudError> {
        self.permissions.lock().unwrap().clone().ok_or_else(|| {
            Self::api_error("DescribeSecurityGroupAttribute", 500, "InternalError")
        })
    }

    async fn revoke_public_ingress(&self, _: &Credentials, _: &str, _: &str) -> Result<(), CloudError> {
        self.mutate(Mutation::Revoke)
    }

    async fn authorize_public_ingress(
        &self,
        _: &Credentials,
        _: &str,
        _: &str,
    ) -> Result<(), CloudError> {
        self.mutate(Mutation::Authorize)
    }
}

/// Channel that records every notice it receives.
pub struct RecordingChannel {
    name: &'static str,
    fail: bool,
    sent: Arc<Mutex<Vec<Notice>>>,
}

#[async_trait]
impl Notifier for RecordingChannel {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn send(&self, notice: &Notice) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push(notice.clone());
        if self.fail {
            Err(NotificationError::HttpStatus(500))
        } else {
            Ok(())
        }
    }
}

/// Fanout over a single recording channel plus a handle to its inbox.
pub fn recording_fanout(fail: bool) -> (NotificationFanout, Arc<Mutex<Vec<Notice>>>) {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let channel = RecordingChannel {
        name: "bark",
        fail,
        sent: Arc::clone(&sent),
    };
    (NotificationFanout::new(vec![Box::new(channel)]), sent)
}

pub fn account(max_traffic: f64) -> Account {
    Account {
        account_name: Some("hk-1".to_string()),
        access_key_id: "LTAI5tTest".to_string(),
        access_key_secret: "secret".to_string(),
        region_id: "cn-hongkong".to_string(),
        instance_id: FakeCloud::INSTANCE_ID.to_string(),
        max_traffic,
        enable_notification: true,
        only_notify_on_toggle: false,
    }
}
