use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde_json::json;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::health::HealthIndicators;
use crate::models::{
    ClickRecord, ConnectionRecord, DeploymentRecord, DeploymentTemplate, RecordSet, RosterRecord,
    TemplateBlock, TemplateRecord,
};

/// Organization created by `seed`.
pub const SEED_ORGANIZATION: &str = "6f1c2d3e-8a4b-4c5d-9e6f-7a8b9c0d1e2f";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<Uuid> {
    let organization_id = Uuid::parse_str(SEED_ORGANIZATION)?;
    let now = Utc::now();
    let today = now.date_naive();

    sqlx::query(
        r#"
        INSERT INTO signature_insights.organizations (id, name)
        VALUES ($1, $2)
        ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
        "#,
    )
    .bind(organization_id)
    .bind("Northwind Traders")
    .execute(pool)
    .await?;

    let templates = vec![
        (
            "Corporate",
            json!([
                { "type": "text", "content": { "text": "{{name}} | {{title}}" } },
                {
                    "type": "banner",
                    "content": {
                        "campaignName": "Spring Launch",
                        "startDate": (today - Duration::days(20)).to_string(),
                        "endDate": (today + Duration::days(40)).to_string(),
                        "linkUrl": "https://northwind.example.com/launch"
                    }
                }
            ]),
        ),
        (
            "Events",
            json!([
                {
                    "type": "banner",
                    "content": {
                        "campaignName": "Partner Summit",
                        "startDate": (today + Duration::days(30)).to_string(),
                        "endDate": (today + Duration::days(32)).to_string()
                    }
                }
            ]),
        ),
    ];

    let mut template_ids = Vec::new();
    for (name, blocks) in templates {
        let template_id: Uuid = sqlx::query(
            r#"
            INSERT INTO signature_insights.templates (id, organization_id, name, blocks)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (organization_id, name) DO UPDATE SET blocks = EXCLUDED.blocks
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(name)
        .bind(Json(blocks))
        .fetch_one(pool)
        .await?
        .try_get("id")?;
        template_ids.push(template_id);
    }
    let corporate = template_ids[0];

    let users = vec![
        ("avery.lee@northwind.example.com", "Avery Lee", Some("Sales"), true),
        ("jules.moreno@northwind.example.com", "Jules Moreno", Some("Sales"), false),
        ("kiara.patel@northwind.example.com", "Kiara Patel", Some("Marketing"), true),
        ("sam.okafor@northwind.example.com", "Sam Okafor", Some("Engineering"), true),
        ("rin.tanaka@northwind.example.com", "Rin Tanaka", Some("Engineering"), false),
        ("lea.fischer@northwind.example.com", "Lea Fischer", None, false),
    ];

    for (email, name, department, deployed) in users {
        let (template_id, last_deployed_at) = if deployed {
            (Some(corporate), Some(now - Duration::days(3)))
        } else {
            (None, None)
        };
        sqlx::query(
            r#"
            INSERT INTO signature_insights.users
            (id, organization_id, email, full_name, department, template_id, last_deployed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (organization_id, email) DO UPDATE
            SET full_name = EXCLUDED.full_name,
                department = EXCLUDED.department,
                template_id = EXCLUDED.template_id,
                last_deployed_at = EXCLUDED.last_deployed_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(email)
        .bind(name)
        .bind(department)
        .bind(template_id)
        .bind(last_deployed_at)
        .execute(pool)
        .await?;
    }

    let deployments = vec![
        ("seed-deploy-001", "completed", 4i64, 3i64, 1i64, 10i64),
        ("seed-deploy-002", "completed", 2, 2, 0, 3),
        ("seed-deploy-003", "failed", 2, 0, 2, 1),
    ];

    for (source_key, status, total, successful, failed, days_ago) in deployments {
        sqlx::query(
            r#"
            INSERT INTO signature_insights.deployments
            (id, organization_id, template_id, status, total_users, successful_count, failed_count, created_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(corporate)
        .bind(status)
        .bind(total)
        .bind(successful)
        .bind(failed)
        .bind(now - Duration::days(days_ago))
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    let clicks = vec![
        ("seed-click-001", "avery", "https://northwind.example.com/launch", "banner", Some("Spring Launch"), 6),
        ("seed-click-002", "kiara", "https://northwind.example.com/launch", "banner", Some("Spring Launch"), 5),
        ("seed-click-003", "avery", "https://northwind.example.com/pricing", "banner", Some("Spring Launch"), 5),
        ("seed-click-004", "sam", "https://linkedin.com/company/northwind", "social", None, 2),
    ];

    for (source_key, user_id, link_url, link_type, campaign, days_ago) in clicks {
        sqlx::query(
            r#"
            INSERT INTO signature_insights.clicks
            (id, organization_id, user_id, link_url, link_type, campaign_name,
             utm_source, utm_medium, utm_campaign, clicked_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, 'email_signature', 'email', $7, $8, $9)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(user_id)
        .bind(link_url)
        .bind(link_type)
        .bind(campaign)
        .bind(campaign.map(|name| name.to_lowercase().replace(' ', "-")))
        .bind(now - Duration::days(days_ago))
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO signature_insights.connections (id, organization_id, provider, status, last_synced_at)
        VALUES ($1, $2, 'google_workspace', 'connected', $3)
        ON CONFLICT (organization_id, provider) DO UPDATE
        SET status = EXCLUDED.status, last_synced_at = EXCLUDED.last_synced_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(organization_id)
    .bind(now - Duration::hours(2))
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO signature_insights.organization_health
        (organization_id, health_score, compliance_issues, error_rate, department_coverage)
        VALUES ($1, 68, 2, 17, 67)
        ON CONFLICT (organization_id) DO UPDATE
        SET health_score = EXCLUDED.health_score,
            compliance_issues = EXCLUDED.compliance_issues,
            error_rate = EXCLUDED.error_rate,
            department_coverage = EXCLUDED.department_coverage,
            updated_at = now()
        "#,
    )
    .bind(organization_id)
    .execute(pool)
    .await?;

    Ok(organization_id)
}

pub async fn fetch_organization_name(
    pool: &PgPool,
    organization_id: Uuid,
) -> anyhow::Result<Option<String>> {
    let row = sqlx::query("SELECT name FROM signature_insights.organizations WHERE id = $1")
        .bind(organization_id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(row.try_get("name")?)),
        None => Ok(None),
    }
}

pub async fn fetch_clicks(
    pool: &PgPool,
    organization_id: Uuid,
    since_date: NaiveDate,
) -> anyhow::Result<Vec<ClickRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT link_url, link_type, campaign_name, utm_source, utm_medium,
               utm_campaign, utm_content, user_id, clicked_at
        FROM signature_insights.clicks
        WHERE organization_id = $1 AND clicked_at >= $2
        ORDER BY clicked_at
        "#,
    )
    .bind(organization_id)
    .bind(start_of_day(since_date))
    .fetch_all(pool)
    .await
    .context("failed to fetch clicks")?;

    let mut clicks = Vec::with_capacity(rows.len());
    for row in rows {
        clicks.push(ClickRecord {
            link_url: row.try_get("link_url")?,
            link_type: row.try_get("link_type")?,
            campaign_name: row.try_get("campaign_name")?,
            utm_source: row.try_get("utm_source")?,
            utm_medium: row.try_get("utm_medium")?,
            utm_campaign: row.try_get("utm_campaign")?,
            utm_content: row.try_get("utm_content")?,
            user_id: row.try_get("user_id")?,
            clicked_at: row.try_get("clicked_at")?,
        });
    }

    Ok(clicks)
}

pub async fn fetch_templates(
    pool: &PgPool,
    organization_id: Uuid,
) -> anyhow::Result<Vec<TemplateRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, blocks
        FROM signature_insights.templates
        WHERE organization_id = $1
        ORDER BY created_at, name
        "#,
    )
    .bind(organization_id)
    .fetch_all(pool)
    .await
    .context("failed to fetch templates")?;

    let mut templates = Vec::with_capacity(rows.len());
    for row in rows {
        let Json(blocks): Json<Vec<TemplateBlock>> = row.try_get("blocks")?;
        templates.push(TemplateRecord {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            blocks,
        });
    }

    Ok(templates)
}

pub async fn fetch_roster(
    pool: &PgPool,
    organization_id: Uuid,
) -> anyhow::Result<Vec<RosterRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT u.email, u.full_name, u.department, u.last_deployed_at,
               (u.template_id IS NOT NULL AND u.last_deployed_at IS NOT NULL) AS has_signature,
               t.name AS template_name
        FROM signature_insights.users u
        LEFT JOIN signature_insights.templates t ON t.id = u.template_id
        WHERE u.organization_id = $1
        ORDER BY u.full_name
        "#,
    )
    .bind(organization_id)
    .fetch_all(pool)
    .await
    .context("failed to fetch roster")?;

    let mut roster = Vec::with_capacity(rows.len());
    for row in rows {
        roster.push(RosterRecord {
            email: row.try_get("email")?,
            name: row.try_get("full_name")?,
            department: row.try_get("department")?,
            has_signature: row.try_get("has_signature")?,
            template_name: row.try_get("template_name")?,
            last_deployed_at: row.try_get("last_deployed_at")?,
        });
    }

    Ok(roster)
}

pub async fn fetch_deployments(
    pool: &PgPool,
    organization_id: Uuid,
    since_date: NaiveDate,
) -> anyhow::Result<Vec<DeploymentRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT d.id, d.status, d.total_users, d.successful_count, d.failed_count,
               d.created_at, t.id AS template_id, t.name AS template_name
        FROM signature_insights.deployments d
        LEFT JOIN signature_insights.templates t ON t.id = d.template_id
        WHERE d.organization_id = $1 AND d.created_at >= $2
        ORDER BY d.created_at
        "#,
    )
    .bind(organization_id)
    .bind(start_of_day(since_date))
    .fetch_all(pool)
    .await
    .context("failed to fetch deployments")?;

    let mut deployments = Vec::with_capacity(rows.len());
    for row in rows {
        let template_id: Option<Uuid> = row.try_get("template_id")?;
        let template_name: Option<String> = row.try_get("template_name")?;
        deployments.push(DeploymentRecord {
            id: row.try_get("id")?,
            status: row.try_get("status")?,
            total_users: row.try_get("total_users")?,
            successful_count: row.try_get("successful_count")?,
            failed_count: row.try_get("failed_count")?,
            created_at: row.try_get("created_at")?,
            template: template_id
                .zip(template_name)
                .map(|(id, name)| DeploymentTemplate { id, name }),
        });
    }

    Ok(deployments)
}

pub async fn fetch_connections(
    pool: &PgPool,
    organization_id: Uuid,
) -> anyhow::Result<Vec<ConnectionRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT provider, status, last_synced_at
        FROM signature_insights.connections
        WHERE organization_id = $1
        ORDER BY provider
        "#,
    )
    .bind(organization_id)
    .fetch_all(pool)
    .await
    .context("failed to fetch connections")?;

    let mut connections = Vec::with_capacity(rows.len());
    for row in rows {
        connections.push(ConnectionRecord {
            provider: row.try_get("provider")?,
            status: row.try_get("status")?,
            last_synced_at: row.try_get("last_synced_at")?,
        });
    }

    Ok(connections)
}

/// Indicators default to zero when nothing has been computed upstream yet.
pub async fn fetch_indicators(
    pool: &PgPool,
    organization_id: Uuid,
) -> anyhow::Result<HealthIndicators> {
    let row = sqlx::query(
        r#"
        SELECT health_score, compliance_issues, error_rate, department_coverage
        FROM signature_insights.organization_health
        WHERE organization_id = $1
        "#,
    )
    .bind(organization_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch health indicators")?;

    let Some(row) = row else {
        return Ok(HealthIndicators::default());
    };

    Ok(HealthIndicators {
        health_score: row.try_get("health_score")?,
        compliance_issues: row.try_get("compliance_issues")?,
        error_rate: row.try_get("error_rate")?,
        department_coverage: row.try_get("department_coverage")?,
    })
}

/// Loads every table the snapshot needs for one organization. Clicks and
/// deployments are limited to `since_date` onwards.
pub async fn fetch_records(
    pool: &PgPool,
    organization_id: Uuid,
    since_date: NaiveDate,
) -> anyhow::Result<RecordSet> {
    let (clicks, templates, roster, deployments, connections, indicators) = tokio::try_join!(
        fetch_clicks(pool, organization_id, since_date),
        fetch_templates(pool, organization_id),
        fetch_roster(pool, organization_id),
        fetch_deployments(pool, organization_id, since_date),
        fetch_connections(pool, organization_id),
        fetch_indicators(pool, organization_id),
    )?;

    tracing::debug!(
        organization = %organization_id,
        since = %since_date,
        clicks = clicks.len(),
        templates = templates.len(),
        roster = roster.len(),
        deployments = deployments.len(),
        "records fetched"
    );

    Ok(RecordSet {
        clicks,
        templates,
        roster,
        deployments,
        connections,
        indicators,
    })
}

pub async fn import_clicks_csv(
    pool: &PgPool,
    organization_id: Uuid,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        link_url: String,
        link_type: Option<String>,
        campaign_name: Option<String>,
        utm_source: Option<String>,
        utm_medium: Option<String>,
        utm_campaign: Option<String>,
        utm_content: Option<String>,
        user_id: Option<String>,
        clicked_at: DateTime<Utc>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid click row {}", line + 1))?;
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO signature_insights.clicks
            (id, organization_id, user_id, link_url, link_type, campaign_name,
             utm_source, utm_medium, utm_campaign, utm_content, clicked_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(&row.user_id)
        .bind(&row.link_url)
        .bind(&row.link_type)
        .bind(&row.campaign_name)
        .bind(&row.utm_source)
        .bind(&row.utm_medium)
        .bind(&row.utm_campaign)
        .bind(&row.utm_content)
        .bind(row.clicked_at)
        .bind(&source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        } else {
            tracing::debug!(source_key = %source_key, "click already imported");
        }
    }

    Ok(inserted)
}
