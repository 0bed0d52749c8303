use cdt_guard::GB;
use serde_json::{json, Value};
use wiremock::matchers::{header, method};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Alibaba Cloud RPC endpoint backed by wiremock, routed on `x-acs-action`.
pub struct CloudStub {
    server: MockServer,
}

impl CloudStub {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    async fn respond(&self, action: &str, status: u16, body: Value) {
        Mock::given(method("POST"))
            .and(header("x-acs-action", action))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    pub async fn traffic_gb(&self, gb: &[u64]) {
        let details: Vec<_> = gb
            .iter()
            .map(|g| json!({ "Traffic": g * GB, "BusinessRegionId": "cn-hongkong" }))
            .collect();
        self.respond("ListCdtInternetTraffic", 200, json!({ "TrafficDetails": details }))
            .await;
    }

    pub async fn traffic_unavailable(&self) {
        self.respond(
            "ListCdtInternetTraffic",
            503,
            json!({ "Code": "ServiceUnavailable", "Message": "busy" }),
        )
        .await;
    }

    /// Instances visible in the region, each with an EIP and expiry.
    pub async fn instances(&self, ids: &[&str]) {
        let items: Vec<_> = ids
            .iter()
            .map(|id| {
                json!({
                    "InstanceId": id,
                    "ExpiredTime": "2099-12-31T16:00Z",
                    "EipAddress": { "IpAddress": "47.242.1.10" },
                    "PublicIpAddress": { "IpAddress": [] }
                })
            })
            .collect();
        self.respond(
            "DescribeInstances",
            200,
            json!({ "TotalCount": items.len(), "Instances": { "Instance": items } }),
        )
        .await;
    }

    pub async fn rejected_key(&self) {
        self.respond(
            "DescribeInstances",
            404,
            json!({
                "Code": "InvalidAccessKeyId.NotFound",
                "Message": "Specified access key is not found."
            }),
        )
        .await;
    }

    pub async fn security_group(&self, id: &str) {
        self.respond(
            "DescribeInstanceAttribute",
            200,
            json!({ "SecurityGroupIds": { "SecurityGroupId": [id] } }),
        )
        .await;
    }

    pub async fn public_rule(&self, enabled: bool) {
        let permissions = if enabled {
            vec![json!({
                "IpProtocol": "ALL",
                "SourceCidrIp": "0.0.0.0/0",
                "Policy": "Accept",
                "NicType": "intranet",
                "Direction": "ingress"
            })]
        } else {
            Vec::new()
        };
        self.respond(
            "DescribeSecurityGroupAttribute",
            200,
            json!({ "Permissions": { "Permission": permissions } }),
        )
        .await;
    }

    /// Healthy account: visible instance, security group and rule state.
    pub async fn healthy(&self, instance_id: &str, rule_enabled: bool) {
        self.instances(&[instance_id]).await;
        self.security_group("sg-e2e").await;
        self.public_rule(rule_enabled).await;
    }

    pub async fn expect_mutation(&self, action: &str, times: u64) {
        Mock::given(method("POST"))
            .and(header("x-acs-action", action))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "RequestId": "e2e" })))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    pub async fn mutations(&self, action: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| action_of(request) == Some(action))
            .count()
    }
}

fn action_of(request: &Request) -> Option<&str> {
    request
        .headers
        .get("x-acs-action")
        .and_then(|value| value.to_str().ok())
}

/// Notification endpoint that accepts everything and keeps the requests.
pub struct ChannelStub {
    server: MockServer,
}

impl ChannelStub {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Self { server }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Bark messages, decoded from the last path segment.
    pub async fn bark_messages(&self) -> Vec<String> {
        self.requests()
            .await
            .iter()
            .filter_map(|request| {
                let segment = request.url.path_segments()?.last()?.to_string();
                urlencoding::decode(&segment).ok().map(|m| m.into_owned())
            })
            .collect()
    }

    /// Query pairs of every webhook call.
    pub async fn webhook_calls(&self) -> Vec<Vec<(String, String)>> {
        self.requests()
            .await
            .iter()
            .map(|request| request.url.query_pairs().into_owned().collect())
            .collect()
    }

    async fn requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }
}

pub fn query_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}
