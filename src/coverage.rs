use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grouping::{rate, OrderedMap};
use crate::health::AdoptionTier;
use crate::models::{DepartmentStat, EmployeeSignatureStatus, RosterRecord};

/// Per-department adoption in the order departments first appear on the
/// roster. Employees without a department are left out; department strings
/// are grouped exactly as stored.
pub fn department_stats(roster: &[RosterRecord]) -> Vec<DepartmentStat> {
    let mut departments: OrderedMap<(i64, i64)> = OrderedMap::new();

    for member in roster {
        let department = match member.department.as_deref() {
            Some(department) if !department.is_empty() => department,
            _ => continue,
        };
        let entry = departments.entry_or_default(department);
        entry.0 += 1;
        if member.has_signature {
            entry.1 += 1;
        }
    }

    departments
        .iter()
        .map(|(department, &(total, deployed))| DepartmentStat {
            department: department.to_string(),
            total_users: total,
            deployed_users: deployed,
            adoption_rate: rate(deployed, total),
        })
        .collect()
}

/// Department stats with the lowest adoption first.
pub fn departments_by_risk(roster: &[RosterRecord]) -> Vec<DepartmentStat> {
    let mut stats = department_stats(roster);
    stats.sort_by_key(|stat| stat.adoption_rate);
    stats
}

/// Departments below the attention threshold.
pub fn flagged_departments(stats: &[DepartmentStat]) -> Vec<&DepartmentStat> {
    stats
        .iter()
        .filter(|stat| AdoptionTier::from_rate(stat.adoption_rate).needs_attention())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamCategory {
    Sales,
    Marketing,
    Other,
}

impl TeamCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamCategory::Sales => "sales",
            TeamCategory::Marketing => "marketing",
            TeamCategory::Other => "other",
        }
    }
}

/// Explicit department to team lookup. Department names match
/// case-insensitively and exactly; unlisted departments are `Other`.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamMapping {
    by_department: HashMap<String, TeamCategory>,
}

impl Default for TeamMapping {
    fn default() -> Self {
        let sales = ["Sales", "Business Development", "Account Management"];
        let marketing = ["Marketing", "Brand", "Communications"];
        let entries = sales
            .iter()
            .map(|name| (TeamCategory::Sales, name.to_string()))
            .chain(
                marketing
                    .iter()
                    .map(|name| (TeamCategory::Marketing, name.to_string())),
            );
        TeamMapping {
            by_department: entries
                .map(|(category, name)| (name.to_lowercase(), category))
                .collect(),
        }
    }
}

impl TeamMapping {
    /// Builds the lookup, rejecting a department assigned to two teams.
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (TeamCategory, String)>,
    {
        let mut by_department = HashMap::new();
        for (category, department) in entries {
            let key = department.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            match by_department.insert(key, category) {
                Some(previous) if previous != category => {
                    return Err(Error::Config(format!(
                        "department '{}' is mapped to both {} and {}",
                        department.trim(),
                        previous.as_str(),
                        category.as_str()
                    )));
                }
                _ => {}
            }
        }
        Ok(TeamMapping { by_department })
    }

    pub fn category_of(&self, department: Option<&str>) -> TeamCategory {
        department
            .map(|name| name.trim().to_lowercase())
            .and_then(|key| self.by_department.get(&key).copied())
            .unwrap_or(TeamCategory::Other)
    }
}

/// Roster members whose department maps to `category`.
pub fn team_members(
    roster: &[RosterRecord],
    category: TeamCategory,
    mapping: &TeamMapping,
) -> Vec<EmployeeSignatureStatus> {
    roster
        .iter()
        .filter(|member| mapping.category_of(member.department.as_deref()) == category)
        .map(EmployeeSignatureStatus::from)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamCoverage {
    pub category: TeamCategory,
    pub total_users: i64,
    pub deployed_users: i64,
    pub adoption_rate: i64,
    pub tier: AdoptionTier,
    pub members: Vec<EmployeeSignatureStatus>,
}

pub fn team_coverage(
    roster: &[RosterRecord],
    category: TeamCategory,
    mapping: &TeamMapping,
) -> TeamCoverage {
    let members = team_members(roster, category, mapping);
    let total_users = members.len() as i64;
    let deployed_users = members.iter().filter(|member| member.has_signature).count() as i64;
    let adoption_rate = rate(deployed_users, total_users);

    TeamCoverage {
        category,
        total_users,
        deployed_users,
        adoption_rate,
        tier: AdoptionTier::from_rate(adoption_rate),
        members,
    }
}
