//! Daily chart series.
//!
//! Days are the UTC calendar date of the stored instant. Every series, seeded
//! or seen in the input, is present on every day, zero-filled, so charts never
//! have holes.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::NaiveDate;

use crate::grouping::{key_or_sentinel, NO_CAMPAIGN};
use crate::models::{Campaign, ClickRecord, DailyBucket, DeploymentRecord};

/// Buckets `records` by day. `seed` names series that appear on every day even
/// when no record carries them.
pub fn bucket_by_day<T, D, S>(
    records: &[T],
    seed: &[String],
    day_of: D,
    series_of: S,
) -> Vec<DailyBucket>
where
    D: Fn(&T) -> NaiveDate,
    S: Fn(&T) -> String,
{
    let series: BTreeSet<String> = seed
        .iter()
        .cloned()
        .chain(records.iter().map(&series_of))
        .collect();
    let mut days: BTreeMap<NaiveDate, BTreeMap<String, i64>> = BTreeMap::new();

    for record in records {
        let counts = days.entry(day_of(record)).or_insert_with(|| {
            series
                .iter()
                .map(|name| (name.clone(), 0))
                .collect()
        });
        *counts.entry(series_of(record)).or_insert(0) += 1;
    }

    days.into_iter()
        .map(|(day, counts)| DailyBucket { day, counts })
        .collect()
}

/// Daily clicks per derived campaign. The series are exactly the campaign
/// names, so banner-only campaigns chart as zero and clicks in a dropped
/// `(no campaign)` bucket are left out.
pub fn clicks_by_campaign(clicks: &[ClickRecord], campaigns: &[Campaign]) -> Vec<DailyBucket> {
    let names: Vec<String> = campaigns.iter().map(|campaign| campaign.name.clone()).collect();
    let known: HashSet<&str> = names.iter().map(String::as_str).collect();
    let campaign_of = |click: &ClickRecord| key_or_sentinel(click.campaign_name.as_deref(), NO_CAMPAIGN);

    let charted: Vec<&ClickRecord> = clicks
        .iter()
        .filter(|click| known.contains(campaign_of(click).as_str()))
        .collect();

    bucket_by_day(
        &charted,
        &names,
        |click| click.clicked_at.date_naive(),
        |click| campaign_of(*click),
    )
}

pub fn deployments_by_status(deployments: &[DeploymentRecord]) -> Vec<DailyBucket> {
    bucket_by_day(
        deployments,
        &[],
        |deployment| deployment.created_at.date_naive(),
        |deployment| deployment.status.to_lowercase(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaigns::derive_campaigns;
    use crate::models::{TemplateBlock, TemplateRecord};
    use chrono::{DateTime, Utc};
    use serde_json::json;
    use uuid::Uuid;

    fn click(campaign: Option<&str>, at: &str) -> ClickRecord {
        ClickRecord {
            link_url: "https://example.com".to_string(),
            link_type: None,
            campaign_name: campaign.map(str::to_string),
            utm_source: None,
            utm_medium: None,
            utm_campaign: None,
            utm_content: None,
            user_id: Some("u1".to_string()),
            clicked_at: at.parse::<DateTime<Utc>>().unwrap(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn chart(clicks: &[ClickRecord], templates: &[TemplateRecord]) -> Vec<DailyBucket> {
        clicks_by_campaign(clicks, &derive_campaigns(clicks, templates, today()))
    }

    #[test]
    fn every_day_has_every_campaign() {
        let clicks = vec![
            click(Some("Launch"), "2024-01-03T09:00:00Z"),
            click(Some("Launch"), "2024-01-01T10:00:00Z"),
            click(Some("Webinar"), "2024-01-02T10:00:00Z"),
            click(Some("Promo"), "2024-01-01T23:59:59Z"),
        ];
        let buckets = chart(&clicks, &[]);

        assert_eq!(buckets.len(), 3);
        for bucket in &buckets {
            assert_eq!(bucket.counts.len(), 3, "day {}", bucket.day);
        }
        assert_eq!(buckets[0].counts["Launch"], 1);
        assert_eq!(buckets[0].counts["Promo"], 1);
        assert_eq!(buckets[0].counts["Webinar"], 0);
        assert_eq!(buckets[1].counts["Webinar"], 1);
        assert_eq!(buckets[1].counts["Launch"], 0);
    }

    #[test]
    fn series_match_derived_campaigns() {
        let clicks = vec![
            click(Some("Launch"), "2024-01-01T10:00:00Z"),
            click(None, "2024-01-01T11:00:00Z"),
            click(None, "2024-01-02T11:00:00Z"),
        ];
        let templates = vec![TemplateRecord {
            id: Uuid::new_v4(),
            name: "Default".to_string(),
            blocks: vec![TemplateBlock {
                kind: "banner".to_string(),
                content: json!({ "campaignName": "Summit" }),
            }],
        }];
        let buckets = chart(&clicks, &templates);

        assert_eq!(buckets.len(), 1);
        let keys: Vec<&str> = buckets[0].counts.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Launch", "Summit"]);
        assert_eq!(buckets[0].counts["Launch"], 1);
        assert_eq!(buckets[0].counts["Summit"], 0);
    }

    #[test]
    fn sentinel_is_charted_when_it_is_the_only_campaign() {
        let clicks = vec![click(None, "2024-01-01T10:00:00Z")];
        let buckets = chart(&clicks, &[]);
        assert_eq!(buckets[0].counts[NO_CAMPAIGN], 1);
    }

    #[test]
    fn days_are_ascending() {
        let clicks = vec![
            click(Some("A"), "2024-02-10T00:00:00Z"),
            click(Some("A"), "2023-12-31T12:00:00Z"),
            click(Some("A"), "2024-01-15T08:00:00Z"),
        ];
        let days: Vec<String> = chart(&clicks, &[])
            .iter()
            .map(|bucket| bucket.day.to_string())
            .collect();
        assert_eq!(days, vec!["2023-12-31", "2024-01-15", "2024-02-10"]);
    }

    #[test]
    fn bucketing_uses_utc_date_of_stored_instant() {
        let clicks = vec![click(Some("A"), "2024-01-01T23:30:00-05:00")];
        let buckets = chart(&clicks, &[]);
        assert_eq!(buckets[0].day, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn seeded_series_appear_without_records() {
        let rows = vec![("2024-01-01", "a"), ("2024-01-02", "b")];
        let seed = vec!["z".to_string()];
        let buckets = bucket_by_day(
            &rows,
            &seed,
            |row| row.0.parse().unwrap(),
            |row| row.1.to_string(),
        );
        for bucket in &buckets {
            assert_eq!(bucket.counts.len(), 3);
            assert_eq!(bucket.counts["z"], 0);
        }
    }

    #[test]
    fn empty_input_has_no_buckets() {
        assert!(chart(&[], &[]).is_empty());
    }
}
