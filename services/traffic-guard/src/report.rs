//! Notification templates shared by the check, digest and error paths.

use cdt_notifier::Notice;
use chrono::{DateTime, NaiveDateTime};

use crate::runlog::{AccountRecord, ErrorRecord};
use crate::usage::UsageSnapshot;

pub const BAR_CELLS: usize = 20;
const BAR_FILLED: char = '■';
const BAR_EMPTY: char = '□';

/// Values shown in the daily digest of one account.
#[derive(Debug, Clone)]
pub struct DigestView<'a> {
    pub server: &'a str,
    pub public_ip: &'a str,
    pub instance_id: &'a str,
    pub expires_at: &'a str,
    pub max_traffic: f64,
    pub usage: &'a UsageSnapshot,
}

pub enum Report<'a> {
    /// Firewall rule toggled.
    Alert(&'a AccountRecord),
    Digest(DigestView<'a>),
    Error(&'a ErrorRecord),
}

enum Line {
    Text(String),
    Field(&'static str, String),
}

impl Report<'_> {
    fn lines(&self) -> Vec<Line> {
        match self {
            Report::Alert(record) => vec![
                Line::Field("服务器", record.server.clone()),
                Line::Field("实例ID", record.instance_id.clone()),
                Line::Field("实例IP", record.public_ip.clone()),
                Line::Field("到期时间", record.expires_at.clone()),
                Line::Field("CDT总流量", record.total_traffic.clone()),
                Line::Field("已使用流量", record.used_traffic.clone()),
                Line::Field("使用百分比", record.usage_percentage.clone()),
                Line::Field("地区", record.region.clone()),
                Line::Field("安全组状态", record.firewall_status.clone()),
            ],
            Report::Digest(view) => vec![
                Line::Text(format!("{}（{}）", view.server, view.public_ip)),
                Line::Text(format!(
                    "{} {}%",
                    render_bar(view.usage.usage_percentage),
                    format_decimal(view.usage.usage_percentage)
                )),
                Line::Field(
                    "已使用流量",
                    format!(
                        "{}GB / {}GB",
                        format_decimal(view.usage.traffic_gb),
                        format_quota(view.max_traffic)
                    ),
                ),
                Line::Field("实例地区", view.usage.region_name.to_string()),
                Line::Field("到期时间", format_expiry(view.expires_at)),
                Line::Field("实例ID", view.instance_id.to_string()),
                Line::Field("安全组状态", "启用".to_string()),
            ],
            Report::Error(record) => {
                let mut lines = vec![
                    Line::Text("⚠️ 错误通知".to_string()),
                    Line::Field("服务器", record.server.clone()),
                    Line::Field("错误信息", record.error.clone()),
                ];
                if !record.instance_id.is_empty() {
                    lines.push(Line::Field("实例ID", record.instance_id.clone()));
                }
                lines
            }
        }
    }

    pub fn body(&self) -> String {
        self.lines()
            .into_iter()
            .map(|line| match line {
                Line::Text(text) => format!("{text}\n"),
                Line::Field(label, value) => format!("{label}: {value}\n"),
            })
            .collect()
    }

    /// The digest carries its usage in the headline as well.
    pub fn notice(&self, title: &str) -> Notice {
        let notice = Notice::new(title, self.body());
        match self {
            Report::Digest(view) => notice.with_headline(format!(
                "已使用{}GB - {}",
                format_decimal(view.usage.traffic_gb),
                title
            )),
            _ => notice,
        }
    }
}

/// Number of filled cells for `percentage`.
///
/// Tiny non-zero usage shows one cell and the bar is never full below 100%.
pub fn filled_cells(percentage: f64) -> usize {
    if percentage.is_nan() || percentage <= 0.0 {
        return 0;
    }
    if percentage < 1.0 {
        return 1;
    }

    let whole = percentage.round_ties_even();
    let cells = (0.5 + BAR_CELLS as f64 * whole / 100.0)
        .round_ties_even()
        .clamp(0.0, BAR_CELLS as f64) as usize;

    if percentage > 95.0 && percentage < 100.0 {
        cells.min(BAR_CELLS - 1)
    } else {
        cells
    }
}

pub fn render_bar(percentage: f64) -> String {
    let filled = filled_cells(percentage);
    std::iter::repeat(BAR_FILLED)
        .take(filled)
        .chain(std::iter::repeat(BAR_EMPTY).take(BAR_CELLS - filled))
        .collect()
}

/// Decimal with at least one fractional digit: `96.0`, `12.34`.
pub fn format_decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Quota as configured: `200`, `180.5`.
pub fn format_quota(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

/// Instance expiry as `%Y-%m-%d %H:%M:%S`, raw text when unparseable.
pub fn format_expiry(raw: &str) -> String {
    const OUTPUT: &str = "%Y-%m-%d %H:%M:%S";

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.format(OUTPUT).to_string();
    }
    // ECS reports minute precision, e.g. 2024-05-01T16:00Z
    for pattern in ["%Y-%m-%dT%H:%MZ", "%Y-%m-%dT%H:%M:%SZ"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, pattern) {
            return parsed.format(OUTPUT).to_string();
        }
    }
    raw.to_string()
}
