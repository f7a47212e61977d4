use std::fmt::Write;

use chrono::NaiveDate;

use crate::health::AdoptionTier;
use crate::models::{AnalyticsData, DailyBucket};

fn tier_marker(rate: i64) -> &'static str {
    marker(AdoptionTier::from_rate(rate))
}

fn error_marker(error_rate: i64) -> &'static str {
    marker(AdoptionTier::from_error_rate(error_rate))
}

fn marker(tier: AdoptionTier) -> &'static str {
    match tier {
        AdoptionTier::Healthy => "ok",
        AdoptionTier::Warning => "watch",
        AdoptionTier::Critical => "attention",
    }
}

fn daily_totals(buckets: &[DailyBucket]) -> Vec<(NaiveDate, i64)> {
    buckets
        .iter()
        .map(|bucket| (bucket.day, bucket.counts.values().sum::<i64>()))
        .collect()
}

pub fn build_report(
    organization: &str,
    cutoff: NaiveDate,
    data: &AnalyticsData,
    top_campaigns: usize,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Email Signature Report");
    let _ = writeln!(
        output,
        "Generated for {} on {} (activity since {})",
        organization, data.generated_on, cutoff
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(
        output,
        "- Health score: {} ({})",
        data.indicators.health_score,
        data.indicators.label().as_str()
    );
    let _ = writeln!(
        output,
        "- Signature adoption: {}/{} employees ({}%, {})",
        data.users_with_signature,
        data.total_users,
        data.adoption_rate,
        tier_marker(data.adoption_rate)
    );
    let _ = writeln!(
        output,
        "- Deployments: {} runs, {}/{} mailboxes updated ({}% success, {}; {}% errors, {})",
        data.total_deployments,
        data.mailboxes_updated,
        data.mailboxes_targeted,
        data.deployment_success_rate,
        tier_marker(data.deployment_success_rate),
        data.deployment_error_rate,
        error_marker(data.deployment_error_rate)
    );
    let _ = writeln!(
        output,
        "- Clicks: {} from {} people",
        data.total_clicks, data.unique_clickers
    );
    let _ = writeln!(
        output,
        "- Compliance issues: {}, department coverage {}%",
        data.indicators.compliance_issues, data.indicators.department_coverage
    );

    if !data.sync.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Directory Sync");
        for status in &data.sync {
            let last_sync = status
                .last_synced_at
                .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
                .unwrap_or_else(|| "never".to_string());
            let state = if status.connected { "connected" } else { "disconnected" };
            let _ = writeln!(output, "- {}: {} (last sync {})", status.provider, state, last_sync);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Campaigns");

    if data.campaigns.is_empty() {
        let _ = writeln!(output, "No campaign activity for this window.");
    } else {
        for campaign in data.campaigns.iter().take(top_campaigns) {
            let _ = writeln!(
                output,
                "- {} [{}]: {} clicks, {} unique, top link {}",
                campaign.name,
                campaign.status.as_str(),
                campaign.total_clicks,
                campaign.unique_clickers,
                campaign.top_link.as_deref().unwrap_or("-")
            );
        }
    }

    let totals = daily_totals(&data.clicks_by_day);
    if !totals.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Daily Clicks");
        for (day, total) in totals {
            let _ = writeln!(output, "- {}: {}", day, total);
        }
    }

    if !data.utm_sources.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Traffic Sources");
        for row in &data.utm_sources {
            let _ = writeln!(
                output,
                "- {}: {} clicks ({} unique)",
                row.value, row.clicks, row.unique_clickers
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Departments (lowest adoption first)");

    if data.departments_by_risk.is_empty() {
        let _ = writeln!(output, "No departments on the roster.");
    } else {
        for stat in &data.departments_by_risk {
            let _ = writeln!(
                output,
                "- {}: {}/{} ({}%, {})",
                stat.department,
                stat.deployed_users,
                stat.total_users,
                stat.adoption_rate,
                tier_marker(stat.adoption_rate)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Teams");
    for team in &data.teams {
        let missing: Vec<&str> = team
            .members
            .iter()
            .filter(|member| !member.has_signature)
            .map(|member| member.email.as_str())
            .collect();
        let _ = writeln!(
            output,
            "- {}: {}/{} ({}%, {})",
            team.category.as_str(),
            team.deployed_users,
            team.total_users,
            team.adoption_rate,
            team.tier.as_str()
        );
        if !missing.is_empty() {
            let _ = writeln!(output, "  - missing signatures: {}", missing.join(", "));
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Templates");

    if data.template_performance.is_empty() {
        let _ = writeln!(output, "No deployments in this window.");
    } else {
        for template in &data.template_performance {
            let last = template
                .last_deployed
                .map(|at| at.date_naive().to_string())
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                output,
                "- {}: {} deployments, {} mailboxes, {}% success ({}), last {}",
                template.name,
                template.deployment_count,
                template.users_deployed,
                template.success_rate,
                tier_marker(template.success_rate),
                last
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::TeamMapping;
    use crate::models::{
        ClickRecord, DeploymentRecord, DeploymentTemplate, RecordSet, RosterRecord,
    };
    use uuid::Uuid;
    use crate::snapshot::build_snapshot;

    fn snapshot() -> AnalyticsData {
        let records = RecordSet {
            clicks: vec![ClickRecord {
                link_url: "https://a.com".to_string(),
                link_type: None,
                campaign_name: Some("Launch".to_string()),
                utm_source: Some("signature".to_string()),
                utm_medium: None,
                utm_campaign: None,
                utm_content: None,
                user_id: Some("u1".to_string()),
                clicked_at: "2024-01-01T10:00:00Z".parse().unwrap(),
            }],
            roster: vec![RosterRecord {
                email: "ben@acme.io".to_string(),
                name: "Ben".to_string(),
                department: Some("Sales".to_string()),
                has_signature: false,
                template_name: None,
                last_deployed_at: None,
            }],
            ..Default::default()
        };
        let today = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        build_snapshot(&records, today, &TeamMapping::default())
    }

    #[test]
    fn report_lists_sections() {
        let cutoff = NaiveDate::from_ymd_opt(2023, 12, 6).unwrap();
        let report = build_report("Acme", cutoff, &snapshot(), 10);

        assert!(report.starts_with("# Email Signature Report"));
        assert!(report.contains("Generated for Acme on 2024-01-05 (activity since 2023-12-06)"));
        assert!(report.contains("- Launch [unknown]: 1 clicks, 1 unique, top link https://a.com"));
        assert!(report.contains("- 2024-01-01: 1"));
        assert!(report.contains("- Sales: 0/1 (0%, attention)"));
        assert!(report.contains("missing signatures: ben@acme.io"));
        assert!(report.contains("No deployments in this window."));
        assert!(report.contains("(0% success, attention; 0% errors, ok)"));
    }

    #[test]
    fn report_marks_deployment_and_template_rates() {
        let deployment = |successful: i64, failed: i64| DeploymentRecord {
            id: Uuid::new_v4(),
            status: "completed".to_string(),
            total_users: 10,
            successful_count: successful,
            failed_count: failed,
            created_at: "2024-01-02T09:00:00Z".parse().unwrap(),
            template: Some(DeploymentTemplate {
                id: Uuid::nil(),
                name: "Corporate".to_string(),
            }),
        };
        let records = RecordSet {
            deployments: vec![deployment(6, 4), deployment(7, 3)],
            ..Default::default()
        };
        let today = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let data = build_snapshot(&records, today, &TeamMapping::default());
        let report = build_report("Acme", today, &data, 10);

        assert!(report.contains("13/20 mailboxes updated (65% success, watch; 35% errors, watch)"));
        assert!(report.contains(
            "- Corporate: 2 deployments, 13 mailboxes, 65% success (watch), last 2024-01-02"
        ));
    }

    #[test]
    fn report_handles_empty_snapshot() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let data = build_snapshot(&RecordSet::default(), today, &TeamMapping::default());
        let report = build_report("Acme", today, &data, 10);
        assert!(report.contains("No campaign activity for this window."));
        assert!(report.contains("No departments on the roster."));
        assert!(!report.contains("## Daily Clicks"));
    }
}
