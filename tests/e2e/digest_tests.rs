use anyhow::Result;
use cdt_guard::{account_json, config_json, init_test_tracing, webhook_notification, GuardFixture};
use serde_json::json;

use super::{query_value, ChannelStub, CloudStub};

const INSTANCE: &str = "i-j6ce2e";

#[tokio::test]
async fn test_digest_reports_usage_without_mutating() -> Result<()> {
    init_test_tracing();
    let cloud = CloudStub::start().await;
    let webhook = ChannelStub::start().await;
    cloud.traffic_gb(&[100]).await;
    cloud.healthy(INSTANCE, true).await;
    cloud.expect_mutation("RevokeSecurityGroup", 0).await;
    cloud.expect_mutation("AuthorizeSecurityGroup", 0).await;

    let fixture = GuardFixture::new(&config_json(
        vec![account_json("hk-1", INSTANCE, 200.0)],
        &cloud.uri(),
        webhook_notification(&webhook.uri()),
    ))?;
    let summary = fixture.run_digest().await?;
    assert_eq!(summary.sent, 1);

    let calls = webhook.webhook_calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(query_value(&calls[0], "token"), Some("e2e"));
    assert_eq!(query_value(&calls[0], "id"), Some("7"));
    assert_eq!(
        query_value(&calls[0], "title"),
        Some("已使用100.0GB - CDT流量统计")
    );

    let content = query_value(&calls[0], "content").unwrap_or_default();
    assert!(content.starts_with("hk-1（47.242.1.10）\n■■■■■■■■■■□□□□□□□□□□ 50.0%\n"));
    assert!(content.contains("已使用流量: 100.0GB / 200GB"));
    assert!(content.contains("实例地区: 中国香港"));
    assert!(content.contains("到期时间: 2099-12-31 16:00:00"));
    Ok(())
}

#[tokio::test]
async fn test_digest_skips_disabled_rule_and_opted_out_accounts() -> Result<()> {
    init_test_tracing();
    let cloud = CloudStub::start().await;
    let webhook = ChannelStub::start().await;
    cloud.traffic_gb(&[198]).await;
    cloud.healthy(INSTANCE, false).await;

    let mut opted_out = account_json("quiet", INSTANCE, 200.0);
    opted_out["onlyNotifyOnToggle"] = json!(true);

    let fixture = GuardFixture::new(&config_json(
        vec![account_json("hk-1", INSTANCE, 200.0), opted_out],
        &cloud.uri(),
        webhook_notification(&webhook.uri()),
    ))?;
    let summary = fixture.run_digest().await?;

    assert_eq!(summary.sent, 0);
    assert_eq!(summary.skipped, 2);
    assert!(webhook.webhook_calls().await.is_empty());
    Ok(())
}
