use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use signature_insights::coverage::{self, TeamCategory, TeamMapping};
use signature_insights::refresh::RefreshCycle;
use signature_insights::{db, logging, report, snapshot, AnalyticsData, Config};

#[derive(Parser)]
#[command(name = "signature-insights")]
#[command(about = "Adoption, deployment and campaign reporting for company email signatures", long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Team {
    Sales,
    Marketing,
    Other,
}

impl From<Team> for TeamCategory {
    fn from(team: Team) -> Self {
        match team {
            Team::Sales => TeamCategory::Sales,
            Team::Marketing => TeamCategory::Marketing,
            Team::Other => TeamCategory::Other,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo organization
    Seed,
    /// Import signature link clicks from a CSV file
    Import {
        #[arg(long)]
        org: Uuid,
        #[arg(long)]
        csv: PathBuf,
    },
    /// List campaigns by clicks
    Campaigns {
        #[arg(long)]
        org: Uuid,
        #[arg(long)]
        since_days: Option<i64>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show signature adoption by department, or the members of one team
    Departments {
        #[arg(long)]
        org: Uuid,
        #[arg(long, value_enum)]
        team: Option<Team>,
    },
    /// Write the full report
    Report {
        #[arg(long)]
        org: Uuid,
        #[arg(long)]
        since_days: Option<i64>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
    },
    /// Rebuild the snapshot on an interval and print a summary line
    Watch {
        #[arg(long)]
        org: Uuid,
        #[arg(long)]
        since_days: Option<i64>,
        #[arg(long, default_value_t = 60)]
        interval_secs: u64,
    },
}

struct Loaded {
    organization: String,
    cutoff: NaiveDate,
    data: AnalyticsData,
}

/// Fetches and aggregates one snapshot. `None` when the organization does not
/// exist.
async fn load_snapshot(
    pool: &PgPool,
    organization_id: Uuid,
    since_days: i64,
    mapping: &TeamMapping,
) -> anyhow::Result<Option<Loaded>> {
    let Some(organization) = db::fetch_organization_name(pool, organization_id).await? else {
        tracing::info!(organization = %organization_id, "organization not found");
        return Ok(None);
    };

    let today = Utc::now().date_naive();
    let cutoff = snapshot::cutoff_date(today, since_days);
    let records = db::fetch_records(pool, organization_id, cutoff).await?;
    let data = snapshot::build_snapshot(&records, today, mapping);

    Ok(Some(Loaded {
        organization,
        cutoff,
        data,
    }))
}

async fn watch(
    pool: PgPool,
    organization_id: Uuid,
    since_days: i64,
    mapping: TeamMapping,
    interval: Duration,
) -> anyhow::Result<()> {
    let mapping = Arc::new(mapping);
    let (mut cycle, mut results) = RefreshCycle::new();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if cycle.is_busy() {
                    tracing::warn!("previous refresh still running, starting over");
                }
                let pool = pool.clone();
                let mapping = Arc::clone(&mapping);
                cycle.start(async move {
                    load_snapshot(&pool, organization_id, since_days, &mapping).await
                });
            }
            Some((ticket, result)) = results.recv() => {
                match cycle.accept(ticket, result) {
                    Some(Ok(Some(loaded))) => {
                        let data = &loaded.data;
                        println!(
                            "[{}] {}: adoption {}%, {} clicks, {} campaigns, health {}",
                            Utc::now().format("%H:%M:%S"),
                            loaded.organization,
                            data.adoption_rate,
                            data.total_clicks,
                            data.campaigns.len(),
                            data.indicators.health_score
                        );
                    }
                    Some(Ok(None)) => println!("Organization not found."),
                    Some(Err(err)) => tracing::error!(error = %err, "refresh failed"),
                    None => {}
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("failed to load config")?;
    logging::init(&config.logging);
    let mapping = config.teams.mapping()?;

    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let organization_id = db::seed(&pool).await?;
            println!("Seed data inserted for organization {organization_id}.");
        }
        Commands::Import { org, csv } => {
            let inserted = db::import_clicks_csv(&pool, org, &csv).await?;
            println!("Inserted {inserted} clicks from {}.", csv.display());
        }
        Commands::Campaigns {
            org,
            since_days,
            limit,
        } => {
            let since_days = since_days.unwrap_or(config.report.since_days);
            let Some(loaded) = load_snapshot(&pool, org, since_days, &mapping).await? else {
                println!("Organization not found.");
                return Ok(());
            };

            if loaded.data.campaigns.is_empty() {
                println!("No campaign activity for this window.");
                return Ok(());
            }

            println!("Campaigns since {}:", loaded.cutoff);
            for campaign in loaded
                .data
                .campaigns
                .iter()
                .take(limit.unwrap_or(config.report.top_campaigns))
            {
                println!(
                    "- {} [{}] {} clicks from {} people, top link {}",
                    campaign.name,
                    campaign.status.as_str(),
                    campaign.total_clicks,
                    campaign.unique_clickers,
                    campaign.top_link.as_deref().unwrap_or("-")
                );
            }
        }
        Commands::Departments { org, team } => {
            if db::fetch_organization_name(&pool, org).await?.is_none() {
                println!("Organization not found.");
                return Ok(());
            }
            let roster = db::fetch_roster(&pool, org).await?;

            match team {
                Some(team) => {
                    let coverage = coverage::team_coverage(&roster, team.into(), &mapping);
                    println!(
                        "{} team: {}/{} with signatures ({}%, {})",
                        coverage.category.as_str(),
                        coverage.deployed_users,
                        coverage.total_users,
                        coverage.adoption_rate,
                        coverage.tier.as_str()
                    );
                    for member in &coverage.members {
                        println!(
                            "- {} <{}> {}: {}",
                            member.name,
                            member.email,
                            member.department.as_deref().unwrap_or("-"),
                            member.template_name.as_deref().unwrap_or("no signature")
                        );
                    }
                }
                None => {
                    let stats = coverage::departments_by_risk(&roster);
                    if stats.is_empty() {
                        println!("No departments on the roster.");
                        return Ok(());
                    }
                    for stat in &stats {
                        println!(
                            "- {}: {}/{} ({}%)",
                            stat.department, stat.deployed_users, stat.total_users, stat.adoption_rate
                        );
                    }
                    let flagged = coverage::flagged_departments(&stats);
                    if !flagged.is_empty() {
                        println!("{} department(s) below 50% adoption.", flagged.len());
                    }
                }
            }
        }
        Commands::Report {
            org,
            since_days,
            out,
            format,
        } => {
            let since_days = since_days.unwrap_or(config.report.since_days);
            let Some(loaded) = load_snapshot(&pool, org, since_days, &mapping).await? else {
                println!("Organization not found.");
                return Ok(());
            };

            let contents = match format {
                OutputFormat::Markdown => report::build_report(
                    &loaded.organization,
                    loaded.cutoff,
                    &loaded.data,
                    config.report.top_campaigns,
                ),
                OutputFormat::Json => serde_json::to_string_pretty(&loaded.data)?,
            };
            std::fs::write(&out, contents)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Watch {
            org,
            since_days,
            interval_secs,
        } => {
            let since_days = since_days.unwrap_or(config.report.since_days);
            watch(
                pool,
                org,
                since_days,
                mapping,
                Duration::from_secs(interval_secs.max(1)),
            )
            .await?;
        }
    }

    Ok(())
}
