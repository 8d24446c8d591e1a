//! Defect predicates and the filter compiler.
//!
//! A [`Predicate`] is an immutable conjunction of [`Clause`]s. Clauses are
//! kept in an ordered set, so the order in which a predicate was assembled
//! never changes the value that comes out.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::models::{Defect, Priority, Status};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Clause {
    Status(Status),
    StatusIn(BTreeSet<Status>),
    Priority(Priority),
    Project(i64),
    Assignee(i64),
    /// Assigned to or created by the user.
    InvolvesUser(i64),
    /// Lowercased substring of title or description.
    Search(String),
    /// Past due and still new or in progress.
    Overdue,
}

impl Clause {
    pub fn matches(&self, defect: &Defect, now: DateTime<Utc>) -> bool {
        match self {
            Clause::Status(status) => defect.status == *status,
            Clause::StatusIn(statuses) => statuses.contains(&defect.status),
            Clause::Priority(priority) => defect.priority == *priority,
            Clause::Project(id) => defect.project_id == *id,
            Clause::Assignee(id) => defect.assignee_id == Some(*id),
            Clause::InvolvesUser(id) => {
                defect.assignee_id == Some(*id) || defect.creator_id == *id
            }
            Clause::Search(term) => {
                defect.title.to_lowercase().contains(term.as_str())
                    || defect.description.to_lowercase().contains(term.as_str())
            }
            Clause::Overdue => defect.is_overdue_at(now),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Predicate {
    clauses: BTreeSet<Clause>,
}

impl Predicate {
    /// Matches every defect.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn builder() -> PredicateBuilder {
        PredicateBuilder::default()
    }

    /// Conjunction of both predicates.
    pub fn and(&self, other: &Predicate) -> Predicate {
        Predicate {
            clauses: self.clauses.union(&other.clauses).cloned().collect(),
        }
    }

    pub fn clauses(&self) -> impl Iterator<Item = &Clause> {
        self.clauses.iter()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, defect: &Defect, now: DateTime<Utc>) -> bool {
        self.clauses.iter().all(|clause| clause.matches(defect, now))
    }
}

#[derive(Debug, Clone, Default)]
pub struct PredicateBuilder {
    clauses: BTreeSet<Clause>,
}

impl PredicateBuilder {
    pub fn clause(mut self, clause: Clause) -> Self {
        self.clauses.insert(clause);
        self
    }

    pub fn status(self, status: Status) -> Self {
        self.clause(Clause::Status(status))
    }

    pub fn status_in(self, statuses: impl IntoIterator<Item = Status>) -> Self {
        self.clause(Clause::StatusIn(statuses.into_iter().collect()))
    }

    pub fn priority(self, priority: Priority) -> Self {
        self.clause(Clause::Priority(priority))
    }

    pub fn project(self, project_id: i64) -> Self {
        self.clause(Clause::Project(project_id))
    }

    pub fn assignee(self, user_id: i64) -> Self {
        self.clause(Clause::Assignee(user_id))
    }

    pub fn involves_user(self, user_id: i64) -> Self {
        self.clause(Clause::InvolvesUser(user_id))
    }

    pub fn search(self, term: &str) -> Self {
        self.clause(Clause::Search(term.to_lowercase()))
    }

    pub fn overdue(self) -> Self {
        self.clause(Clause::Overdue)
    }

    pub fn build(self) -> Predicate {
        Predicate {
            clauses: self.clauses,
        }
    }
}

/// Raw, client-supplied listing filters. Every field is optional and empty
/// values count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterParams {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub project_id: Option<String>,
    pub assignee_id: Option<String>,
    pub search: Option<String>,
    pub overdue: Option<String>,
}

/// Validate the supplied filters and AND them into one predicate.
pub fn compile(params: &FilterParams) -> Result<Predicate> {
    let mut builder = Predicate::builder();

    if let Some(raw) = present(&params.status) {
        builder = builder.status(raw.parse()?);
    }
    if let Some(raw) = present(&params.priority) {
        builder = builder.priority(raw.parse()?);
    }
    if let Some(raw) = present(&params.project_id) {
        builder = builder.project(parse_id("project_id", raw)?);
    }
    if let Some(raw) = present(&params.assignee_id) {
        builder = builder.assignee(parse_id("assignee_id", raw)?);
    }
    if let Some(raw) = present(&params.search) {
        builder = builder.search(raw);
    }
    if let Some(raw) = present(&params.overdue) {
        if parse_flag("overdue", raw)? {
            builder = builder.overdue();
        }
    }

    let predicate = builder.build();
    debug!(clauses = predicate.clauses.len(), "compiled listing filters");
    Ok(predicate)
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_id(field: &'static str, raw: &str) -> Result<i64> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(CoreError::validation(
            field,
            format!("'{}' is not a positive integer id", raw),
        )),
    }
}

fn parse_flag(field: &'static str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(CoreError::validation(
            field,
            format!("'{}' is not a boolean", raw),
        )),
    }
}
