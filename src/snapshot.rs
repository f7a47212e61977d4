use std::collections::HashSet;

use chrono::{Duration, NaiveDate};

use crate::campaigns::{self, UtmDimension};
use crate::coverage::{self, TeamCategory, TeamMapping};
use crate::grouping::rate;
use crate::models::{AnalyticsData, ConnectionRecord, RecordSet, SyncStatus};
use crate::templates;
use crate::timeseries;

/// First day of a `since_days` window ending on `today`.
pub fn cutoff_date(today: NaiveDate, since_days: i64) -> NaiveDate {
    today - Duration::days(since_days.max(1))
}

fn sync_status(connection: &ConnectionRecord) -> SyncStatus {
    let status = connection.status.to_lowercase();
    SyncStatus {
        provider: connection.provider.clone(),
        connected: status == "connected" || status == "active",
        last_synced_at: connection.last_synced_at,
    }
}

/// Builds the full reporting snapshot. Pure: the same records, date and
/// mapping always give the same result.
pub fn build_snapshot(records: &RecordSet, today: NaiveDate, mapping: &TeamMapping) -> AnalyticsData {
    let total_users = records.roster.len() as i64;
    let users_with_signature = records
        .roster
        .iter()
        .filter(|member| member.has_signature)
        .count() as i64;

    let mailboxes_targeted: i64 = records.deployments.iter().map(|d| d.total_users).sum();
    let mailboxes_updated: i64 = records.deployments.iter().map(|d| d.successful_count).sum();
    let mailboxes_failed: i64 = records.deployments.iter().map(|d| d.failed_count).sum();

    let unique_clickers = records
        .clicks
        .iter()
        .filter_map(|click| click.user_id.as_deref())
        .collect::<HashSet<_>>()
        .len() as i64;

    let derived = campaigns::derive_campaigns(&records.clicks, &records.templates, today);
    let clicks_by_day = timeseries::clicks_by_campaign(&records.clicks, &derived);

    AnalyticsData {
        generated_on: today,
        total_users,
        users_with_signature,
        adoption_rate: rate(users_with_signature, total_users),
        total_templates: records.templates.len() as i64,
        total_deployments: records.deployments.len() as i64,
        mailboxes_targeted,
        mailboxes_updated,
        mailboxes_failed,
        deployment_success_rate: rate(mailboxes_updated, mailboxes_targeted),
        deployment_error_rate: rate(mailboxes_failed, mailboxes_targeted),
        total_clicks: records.clicks.len() as i64,
        unique_clickers,
        campaigns: derived,
        departments: coverage::department_stats(&records.roster),
        departments_by_risk: coverage::departments_by_risk(&records.roster),
        teams: [TeamCategory::Sales, TeamCategory::Marketing]
            .into_iter()
            .map(|category| coverage::team_coverage(&records.roster, category, mapping))
            .collect(),
        template_performance: templates::template_performance(&records.deployments),
        clicks_by_day,
        deployments_by_day: timeseries::deployments_by_status(&records.deployments),
        utm_sources: campaigns::utm_breakdown(&records.clicks, UtmDimension::Source),
        utm_mediums: campaigns::utm_breakdown(&records.clicks, UtmDimension::Medium),
        utm_campaigns: campaigns::utm_breakdown(&records.clicks, UtmDimension::Campaign),
        utm_contents: campaigns::utm_breakdown(&records.clicks, UtmDimension::Content),
        link_types: campaigns::utm_breakdown(&records.clicks, UtmDimension::LinkType),
        sync: records.connections.iter().map(sync_status).collect(),
        indicators: records.indicators,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthIndicators;
    use crate::models::{ClickRecord, DeploymentRecord, DeploymentTemplate, RosterRecord};
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    fn at(value: &str) -> DateTime<Utc> {
        value.parse().unwrap()
    }

    fn records() -> RecordSet {
        let template = Uuid::new_v4();
        RecordSet {
            clicks: vec![
                ClickRecord {
                    link_url: "https://a.com".to_string(),
                    link_type: Some("website".to_string()),
                    campaign_name: Some("Launch".to_string()),
                    utm_source: Some("signature".to_string()),
                    utm_medium: Some("email".to_string()),
                    utm_campaign: Some("launch".to_string()),
                    utm_content: None,
                    user_id: Some("u1".to_string()),
                    clicked_at: at("2024-01-01T10:00:00Z"),
                },
                ClickRecord {
                    link_url: "https://b.com".to_string(),
                    link_type: Some("social".to_string()),
                    campaign_name: None,
                    utm_source: None,
                    utm_medium: None,
                    utm_campaign: None,
                    utm_content: None,
                    user_id: Some("u2".to_string()),
                    clicked_at: at("2024-01-02T10:00:00Z"),
                },
            ],
            templates: Vec::new(),
            roster: vec![
                RosterRecord {
                    email: "ana@acme.io".to_string(),
                    name: "Ana".to_string(),
                    department: Some("Sales".to_string()),
                    has_signature: true,
                    template_name: Some("Corporate".to_string()),
                    last_deployed_at: Some(at("2024-01-01T09:00:00Z")),
                },
                RosterRecord {
                    email: "ben@acme.io".to_string(),
                    name: "Ben".to_string(),
                    department: Some("Engineering".to_string()),
                    has_signature: false,
                    template_name: None,
                    last_deployed_at: None,
                },
                RosterRecord {
                    email: "cy@acme.io".to_string(),
                    name: "Cy".to_string(),
                    department: Some("Engineering".to_string()),
                    has_signature: false,
                    template_name: None,
                    last_deployed_at: None,
                },
            ],
            deployments: vec![DeploymentRecord {
                id: Uuid::new_v4(),
                status: "Completed".to_string(),
                total_users: 3,
                successful_count: 1,
                failed_count: 2,
                created_at: at("2024-01-01T09:00:00Z"),
                template: Some(DeploymentTemplate {
                    id: template,
                    name: "Corporate".to_string(),
                }),
            }],
            connections: vec![
                ConnectionRecord {
                    provider: "google_workspace".to_string(),
                    status: "Connected".to_string(),
                    last_synced_at: Some(at("2024-01-02T00:00:00Z")),
                },
                ConnectionRecord {
                    provider: "microsoft_365".to_string(),
                    status: "error".to_string(),
                    last_synced_at: None,
                },
            ],
            indicators: HealthIndicators {
                health_score: 72,
                compliance_issues: 1,
                error_rate: 4,
                department_coverage: 50,
            },
        }
    }

    #[test]
    fn snapshot_totals() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let snapshot = build_snapshot(&records(), today, &TeamMapping::default());

        assert_eq!(snapshot.total_users, 3);
        assert_eq!(snapshot.users_with_signature, 1);
        assert_eq!(snapshot.adoption_rate, 33);
        assert_eq!(snapshot.deployment_success_rate, 33);
        assert_eq!(snapshot.deployment_error_rate, 67);
        assert_eq!(snapshot.total_clicks, 2);
        assert_eq!(snapshot.unique_clickers, 2);
        assert_eq!(snapshot.campaigns.len(), 1);
        assert_eq!(snapshot.campaigns[0].name, "Launch");
        assert_eq!(snapshot.departments_by_risk[0].department, "Engineering");
        assert_eq!(snapshot.teams[0].category, TeamCategory::Sales);
        assert_eq!(snapshot.teams[0].adoption_rate, 100);
        assert_eq!(snapshot.deployments_by_day[0].counts["completed"], 1);
        assert_eq!(snapshot.clicks_by_day.len(), 1);
        assert_eq!(snapshot.clicks_by_day[0].counts.len(), 1);
        assert_eq!(snapshot.clicks_by_day[0].counts["Launch"], 1);
        assert_eq!(snapshot.utm_campaigns[0].value, "launch");
        assert_eq!(snapshot.utm_campaigns[1].value, "(none)");
        assert_eq!(snapshot.utm_contents.len(), 1);
        assert_eq!(snapshot.utm_contents[0].clicks, 2);
        assert_eq!(snapshot.indicators.health_score, 72);
        assert!(snapshot.sync[0].connected);
        assert!(!snapshot.sync[1].connected);
    }

    #[test]
    fn snapshot_is_idempotent() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let records = records();
        let mapping = TeamMapping::default();
        assert_eq!(
            build_snapshot(&records, today, &mapping),
            build_snapshot(&records, today, &mapping)
        );
    }

    #[test]
    fn empty_records_give_zeroed_snapshot() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let snapshot = build_snapshot(&RecordSet::default(), today, &TeamMapping::default());
        assert_eq!(snapshot.adoption_rate, 0);
        assert_eq!(snapshot.deployment_success_rate, 0);
        assert!(snapshot.campaigns.is_empty());
        assert!(snapshot.clicks_by_day.is_empty());
        assert_eq!(snapshot.teams.len(), 2);
    }

    #[test]
    fn cutoff_date_respects_since_days() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(cutoff_date(today, 14), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(cutoff_date(today, 0), NaiveDate::from_ymd_opt(2024, 3, 14).unwrap());
    }
}
