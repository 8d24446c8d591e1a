use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::models::Role;
use crate::policy::{scope, Actor};
use crate::store::{DefectCounts, DefectStore, ProjectCounts};

/// Dashboard numbers for one actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub statistics: DefectCounts,
    /// Empty for every role except manager.
    pub projects_stats: Vec<ProjectCounts>,
}

/// Counts over exactly the defects `actor` can list.
pub fn aggregate<S: DefectStore + ?Sized>(
    store: &S,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<Statistics> {
    let predicate = scope(actor);
    let statistics = store.aggregate_counts(&predicate, now)?;

    let projects_stats = match actor.role {
        Role::Manager => store.aggregate_by_project(&predicate, now)?,
        Role::Engineer | Role::Observer => Vec::new(),
    };

    debug!(
        role = %actor.role,
        total = statistics.total_defects,
        projects = projects_stats.len(),
        "aggregated defect statistics"
    );
    Ok(Statistics {
        statistics,
        projects_stats,
    })
}
