use std::collections::HashMap;

use uuid::Uuid;

use crate::grouping::rate;
use crate::models::{DeploymentRecord, TemplatePerformance};

#[derive(Default)]
struct TemplateTotals {
    name: String,
    deployments: i64,
    targeted: i64,
    updated: i64,
    last_deployed: Option<chrono::DateTime<chrono::Utc>>,
}

/// Rolls deployment history up per template, most deployed first.
/// Deployments whose template was deleted are skipped.
pub fn template_performance(deployments: &[DeploymentRecord]) -> Vec<TemplatePerformance> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut totals: HashMap<Uuid, TemplateTotals> = HashMap::new();

    for deployment in deployments {
        let Some(template) = &deployment.template else {
            continue;
        };
        let entry = totals.entry(template.id).or_insert_with(|| {
            order.push(template.id);
            TemplateTotals {
                name: template.name.clone(),
                ..Default::default()
            }
        });
        entry.deployments += 1;
        entry.targeted += deployment.total_users;
        entry.updated += deployment.successful_count;
        entry.last_deployed = entry.last_deployed.max(Some(deployment.created_at));
    }

    let mut performance: Vec<TemplatePerformance> = order
        .into_iter()
        .filter_map(|id| {
            let totals = totals.remove(&id)?;
            Some(TemplatePerformance {
                id,
                name: totals.name,
                deployment_count: totals.deployments,
                users_deployed: totals.updated,
                success_rate: rate(totals.updated, totals.targeted),
                last_deployed: totals.last_deployed,
            })
        })
        .collect();

    performance.sort_by(|a, b| b.deployment_count.cmp(&a.deployment_count));
    performance
}
