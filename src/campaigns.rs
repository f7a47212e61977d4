use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;

use crate::grouping::{self, key_or_sentinel, Groups, NONE, NO_CAMPAIGN};
use crate::models::{
    Campaign, CampaignStatus, ClickRecord, TemplateBlock, TemplateRecord, UtmBreakdown,
};

/// Campaign metadata carried by a `banner` template block.
///
/// A date-only bound is held as midnight of that day. A timestamped bound
/// keeps its wall-clock time, so a start later on the current day has not
/// begun yet.
#[derive(Debug, Clone, PartialEq)]
pub struct BannerCampaign {
    pub name: String,
    pub starts_at: Option<NaiveDateTime>,
    pub ends_at: Option<NaiveDateTime>,
}

impl BannerCampaign {
    pub fn status_on(&self, today: NaiveDate) -> CampaignStatus {
        let today = today.and_time(NaiveTime::MIN);
        match (self.starts_at, self.ends_at) {
            (Some(start), _) if today < start => CampaignStatus::Scheduled,
            (_, Some(end)) if today > end => CampaignStatus::Expired,
            _ => CampaignStatus::Active,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BannerContent {
    campaign_name: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

/// Accepts `YYYY-MM-DD`, an RFC 3339 timestamp or a timestamp without offset.
/// Timestamps keep the time as written.
fn parse_banner_date(raw: Option<&str>, campaign: &str) -> Option<NaiveDateTime> {
    let raw = raw.filter(|value| !value.is_empty())?;
    let parsed = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN))
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|at| at.naive_local()))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"));
    match parsed {
        Ok(at) => Some(at),
        Err(err) => {
            tracing::warn!(campaign, value = raw, error = %err, "ignoring unparseable banner date");
            None
        }
    }
}

fn banner_from_block(block: &TemplateBlock) -> Option<BannerCampaign> {
    if block.kind != "banner" {
        return None;
    }
    let content: BannerContent = serde_json::from_value(block.content.clone()).ok()?;
    let name = content.campaign_name.filter(|name| !name.is_empty())?;

    Some(BannerCampaign {
        starts_at: parse_banner_date(content.start_date.as_deref(), &name),
        ends_at: parse_banner_date(content.end_date.as_deref(), &name),
        name,
    })
}

/// Banner campaigns in template order, then block order.
pub fn banner_campaigns(templates: &[TemplateRecord]) -> Vec<BannerCampaign> {
    templates
        .iter()
        .flat_map(|template| template.blocks.iter())
        .filter_map(banner_from_block)
        .collect()
}

fn group_clicks_by_campaign(clicks: &[ClickRecord]) -> Groups {
    grouping::group_by(
        clicks,
        |click| key_or_sentinel(click.campaign_name.as_deref(), NO_CAMPAIGN),
        |click| click.user_id.as_deref(),
        |click| Some(click.link_url.as_str()),
    )
}

/// Joins click history with banner definitions into the campaign list,
/// busiest first.
///
/// When a campaign name appears in several templates the first banner found
/// decides its status.
pub fn derive_campaigns(
    clicks: &[ClickRecord],
    templates: &[TemplateRecord],
    today: NaiveDate,
) -> Vec<Campaign> {
    let groups = group_clicks_by_campaign(clicks);
    let banners = banner_campaigns(templates);

    let mut names: Vec<&str> = groups.keys().collect();
    for banner in &banners {
        if !names.contains(&banner.name.as_str()) {
            names.push(banner.name.as_str());
        }
    }
    if names.len() > 1 {
        names.retain(|name| *name != NO_CAMPAIGN);
    }

    let mut campaigns: Vec<Campaign> = names
        .into_iter()
        .map(|name| {
            let status = banners
                .iter()
                .find(|banner| banner.name == name)
                .map(|banner| banner.status_on(today))
                .unwrap_or(CampaignStatus::Unknown);

            match groups.get(name) {
                Some(group) => Campaign {
                    name: name.to_string(),
                    status,
                    total_clicks: group.total,
                    unique_clickers: group.unique_count(),
                    top_link: group.top_sub_key().map(str::to_string),
                },
                None => Campaign {
                    name: name.to_string(),
                    status,
                    total_clicks: 0,
                    unique_clickers: 0,
                    top_link: None,
                },
            }
        })
        .collect();

    campaigns.sort_by(|a, b| b.total_clicks.cmp(&a.total_clicks));
    campaigns
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtmDimension {
    Source,
    Medium,
    Campaign,
    Content,
    LinkType,
}

impl UtmDimension {
    fn value_of<'a>(&self, click: &'a ClickRecord) -> Option<&'a str> {
        match self {
            UtmDimension::Source => click.utm_source.as_deref(),
            UtmDimension::Medium => click.utm_medium.as_deref(),
            UtmDimension::Campaign => click.utm_campaign.as_deref(),
            UtmDimension::Content => click.utm_content.as_deref(),
            UtmDimension::LinkType => click.link_type.as_deref(),
        }
    }
}

/// Click totals per value of one attribution dimension, busiest first.
pub fn utm_breakdown(clicks: &[ClickRecord], dimension: UtmDimension) -> Vec<UtmBreakdown> {
    let groups = grouping::group_by(
        clicks,
        |click| key_or_sentinel(dimension.value_of(click), NONE),
        |click| click.user_id.as_deref(),
        |_| None,
    );

    let mut rows: Vec<UtmBreakdown> = groups
        .iter()
        .map(|(value, group)| UtmBreakdown {
            value: value.to_string(),
            clicks: group.total,
            unique_clickers: group.unique_count(),
        })
        .collect();

    rows.sort_by(|a, b| b.clicks.cmp(&a.clicks));
    rows
}
