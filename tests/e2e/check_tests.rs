use anyhow::Result;
use cdt_guard::{account_json, bark_notification, config_json, init_test_tracing, GuardFixture};

use super::{ChannelStub, CloudStub};

const INSTANCE: &str = "i-j6ce2e";

#[tokio::test]
async fn test_over_quota_account_is_cut_off_and_alerted() -> Result<()> {
    init_test_tracing();
    let cloud = CloudStub::start().await;
    let bark = ChannelStub::start().await;
    cloud.traffic_gb(&[120, 72]).await;
    cloud.healthy(INSTANCE, true).await;
    cloud.expect_mutation("RevokeSecurityGroup", 1).await;
    cloud.expect_mutation("AuthorizeSecurityGroup", 0).await;

    let fixture = GuardFixture::new(&config_json(
        vec![account_json("hk-1", INSTANCE, 200.0)],
        &cloud.uri(),
        bark_notification(&bark.uri()),
    ))?;
    fixture.run_check().await?;

    let log = fixture.read_log()?;
    let record = &log["日志"][0];
    assert_eq!(record["服务器"], "hk-1");
    assert_eq!(record["总流量"], "200GB");
    assert_eq!(record["已使用流量"], "192.0GB");
    assert_eq!(record["使用百分比"], "96.0%");
    assert_eq!(record["使用率达到95%"], "是");
    assert_eq!(record["安全组状态"], "已禁用 0.0.0.0/0 访问规则");
    assert_eq!(record["通知发送"], "成功");

    let messages = bark.bark_messages().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("使用百分比: 96.0%"));
    assert!(messages[0].contains("实例IP: 47.242.1.10"));
    Ok(())
}

#[tokio::test]
async fn test_healthy_account_needs_no_action() -> Result<()> {
    init_test_tracing();
    let cloud = CloudStub::start().await;
    let bark = ChannelStub::start().await;
    cloud.traffic_gb(&[20]).await;
    cloud.healthy(INSTANCE, true).await;
    cloud.expect_mutation("RevokeSecurityGroup", 0).await;
    cloud.expect_mutation("AuthorizeSecurityGroup", 0).await;

    let fixture = GuardFixture::new(&config_json(
        vec![account_json("hk-1", INSTANCE, 200.0)],
        &cloud.uri(),
        bark_notification(&bark.uri()),
    ))?;
    let log = fixture.run_check().await?;

    let record = log.account_records().next().expect("account record");
    assert_eq!(record.usage_percentage, "10.0%");
    assert_eq!(record.firewall_status, "规则已启用，无需操作");
    assert_eq!(record.notification, "不需要");
    assert!(bark.bark_messages().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_recovered_usage_restores_rule() -> Result<()> {
    init_test_tracing();
    let cloud = CloudStub::start().await;
    let bark = ChannelStub::start().await;
    cloud.traffic_gb(&[0]).await;
    cloud.healthy(INSTANCE, false).await;
    cloud.expect_mutation("AuthorizeSecurityGroup", 1).await;

    let fixture = GuardFixture::new(&config_json(
        vec![account_json("hk-1", INSTANCE, 200.0)],
        &cloud.uri(),
        bark_notification(&bark.uri()),
    ))?;
    let log = fixture.run_check().await?;

    let record = log.account_records().next().expect("account record");
    assert_eq!(record.firewall_status, "已恢复 0.0.0.0/0 访问规则");
    assert_eq!(bark.bark_messages().await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_traffic_outage_does_not_reopen_firewall() -> Result<()> {
    init_test_tracing();
    let cloud = CloudStub::start().await;
    let bark = ChannelStub::start().await;
    cloud.traffic_unavailable().await;
    cloud.healthy(INSTANCE, false).await;
    cloud.expect_mutation("AuthorizeSecurityGroup", 0).await;

    let fixture = GuardFixture::new(&config_json(
        vec![account_json("hk-1", INSTANCE, 200.0)],
        &cloud.uri(),
        bark_notification(&bark.uri()),
    ))?;
    let log = fixture.run_check().await?;

    let record = log.account_records().next().expect("account record");
    assert_eq!(record.firewall_status, "流量查询失败，未执行操作");
    assert!(bark.bark_messages().await.is_empty());
    assert_eq!(cloud.mutations("AuthorizeSecurityGroup").await, 0);
    Ok(())
}

#[tokio::test]
async fn test_rejected_key_is_logged_and_reported() -> Result<()> {
    init_test_tracing();
    let cloud = CloudStub::start().await;
    let bark = ChannelStub::start().await;
    cloud.traffic_gb(&[199]).await;
    cloud.rejected_key().await;
    cloud.expect_mutation("RevokeSecurityGroup", 0).await;

    let fixture = GuardFixture::new(&config_json(
        vec![account_json("hk-1", INSTANCE, 200.0)],
        &cloud.uri(),
        bark_notification(&bark.uri()),
    ))?;
    fixture.run_check().await?;

    let log = fixture.read_log()?;
    assert_eq!(log["日志"][0]["服务器"], "hk-1");
    assert_eq!(log["日志"][0]["实例ID"], INSTANCE);
    assert!(log["日志"][0]["错误信息"]
        .as_str()
        .unwrap_or_default()
        .contains("InvalidAccessKeyId.NotFound"));

    let messages = bark.bark_messages().await;
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("⚠️ 错误通知\n服务器: hk-1\n"));
    Ok(())
}

#[tokio::test]
async fn test_missing_instance_does_not_block_other_accounts() -> Result<()> {
    init_test_tracing();
    let cloud = CloudStub::start().await;
    let bark = ChannelStub::start().await;
    cloud.traffic_gb(&[50]).await;
    cloud.healthy(INSTANCE, true).await;

    let fixture = GuardFixture::new(&config_json(
        vec![
            account_json("gone", "i-missing", 200.0),
            account_json("hk-1", INSTANCE, 200.0),
        ],
        &cloud.uri(),
        bark_notification(&bark.uri()),
    ))?;
    let log = fixture.run_check().await?;

    let errors: Vec<_> = log.error_records().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].server, "gone");
    assert!(errors[0].error.contains("i-missing"));

    let record = log.account_records().next().expect("account record");
    assert_eq!(record.server, "hk-1");
    assert_eq!(record.usage_percentage, "25.0%");
    Ok(())
}
