use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::coverage::TeamCoverage;
use crate::health::HealthIndicators;

/// One tracked click on a signature link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickRecord {
    pub link_url: String,
    pub link_type: Option<String>,
    pub campaign_name: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_content: Option<String>,
    pub user_id: Option<String>,
    pub clicked_at: DateTime<Utc>,
}

/// A content block inside a signature template. `content` is free-form and
/// only interpreted for `banner` blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub blocks: Vec<TemplateBlock>,
}

/// One employee on the organization roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterRecord {
    pub email: String,
    pub name: String,
    pub department: Option<String>,
    pub has_signature: bool,
    pub template_name: Option<String>,
    pub last_deployed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentTemplate {
    pub id: Uuid,
    pub name: String,
}

/// A batch push of a template to a set of mailboxes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub id: Uuid,
    pub status: String,
    pub total_users: i64,
    pub successful_count: i64,
    pub failed_count: i64,
    pub created_at: DateTime<Utc>,
    pub template: Option<DeploymentTemplate>,
}

/// A mail-provider directory connection (Google Workspace, Microsoft 365, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub provider: String,
    pub status: String,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Everything fetched for one organization and date window.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RecordSet {
    pub clicks: Vec<ClickRecord>,
    pub templates: Vec<TemplateRecord>,
    pub roster: Vec<RosterRecord>,
    pub deployments: Vec<DeploymentRecord>,
    pub connections: Vec<ConnectionRecord>,
    pub indicators: HealthIndicators,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Active,
    Scheduled,
    Expired,
    Unknown,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Active => "active",
            CampaignStatus::Scheduled => "scheduled",
            CampaignStatus::Expired => "expired",
            CampaignStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Campaign {
    pub name: String,
    pub status: CampaignStatus,
    pub total_clicks: i64,
    pub unique_clickers: i64,
    pub top_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentStat {
    pub department: String,
    pub total_users: i64,
    pub deployed_users: i64,
    pub adoption_rate: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplatePerformance {
    pub id: Uuid,
    pub name: String,
    pub deployment_count: i64,
    pub users_deployed: i64,
    pub success_rate: i64,
    pub last_deployed: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmployeeSignatureStatus {
    pub email: String,
    pub name: String,
    pub department: Option<String>,
    pub has_signature: bool,
    pub template_name: Option<String>,
    pub last_deployed_at: Option<DateTime<Utc>>,
}

impl From<&RosterRecord> for EmployeeSignatureStatus {
    fn from(record: &RosterRecord) -> Self {
        EmployeeSignatureStatus {
            email: record.email.clone(),
            name: record.name.clone(),
            department: record.department.clone(),
            has_signature: record.has_signature,
            template_name: record.template_name.clone(),
            last_deployed_at: record.last_deployed_at,
        }
    }
}

/// Click totals for one value of a UTM dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtmBreakdown {
    pub value: String,
    pub clicks: i64,
    pub unique_clickers: i64,
}

/// One x-axis tick of a daily chart: every known series is present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyBucket {
    pub day: NaiveDate,
    pub counts: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatus {
    pub provider: String,
    pub connected: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Full reporting snapshot for one organization. Rebuilt from scratch on
/// every load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsData {
    pub generated_on: NaiveDate,
    pub total_users: i64,
    pub users_with_signature: i64,
    pub adoption_rate: i64,
    pub total_templates: i64,
    pub total_deployments: i64,
    pub mailboxes_targeted: i64,
    pub mailboxes_updated: i64,
    pub mailboxes_failed: i64,
    pub deployment_success_rate: i64,
    pub deployment_error_rate: i64,
    pub total_clicks: i64,
    pub unique_clickers: i64,
    pub campaigns: Vec<Campaign>,
    pub departments: Vec<DepartmentStat>,
    pub departments_by_risk: Vec<DepartmentStat>,
    pub teams: Vec<TeamCoverage>,
    pub template_performance: Vec<TemplatePerformance>,
    pub clicks_by_day: Vec<DailyBucket>,
    pub deployments_by_day: Vec<DailyBucket>,
    pub utm_sources: Vec<UtmBreakdown>,
    pub utm_mediums: Vec<UtmBreakdown>,
    pub utm_campaigns: Vec<UtmBreakdown>,
    pub utm_contents: Vec<UtmBreakdown>,
    pub link_types: Vec<UtmBreakdown>,
    pub sync: Vec<SyncStatus>,
    pub indicators: HealthIndicators,
}
