//! The persistence contract the engine runs against.
//!
//! Implementations must evaluate predicates inside the store (not by
//! scanning rows in process) and must fail whole: a query either returns a
//! complete answer or a [`CoreError::Persistence`](crate::error::CoreError).

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::filter::Predicate;
use crate::models::DefectRow;
use crate::sort::SortSpec;

/// Totals over one access-scoped defect set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DefectCounts {
    pub total_defects: u64,
    pub in_progress: u64,
    pub overdue: u64,
    pub in_review: u64,
    pub high_priority: u64,
    pub closed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectCounts {
    pub project_id: i64,
    pub project_name: String,
    pub total_defects: u64,
    pub in_progress: u64,
    pub closed: u64,
}

pub trait DefectStore {
    /// One page of matching rows plus the total number of matches, taken
    /// from the same snapshot.
    fn query(
        &self,
        predicate: &Predicate,
        sort: SortSpec,
        offset: u64,
        limit: u64,
        now: DateTime<Utc>,
    ) -> Result<(Vec<DefectRow>, u64)>;

    fn aggregate_counts(&self, predicate: &Predicate, now: DateTime<Utc>) -> Result<DefectCounts>;

    /// Counts per project, including projects with no matching defects.
    fn aggregate_by_project(
        &self,
        predicate: &Predicate,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProjectCounts>>;
}
