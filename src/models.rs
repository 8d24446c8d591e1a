use chrono::{DateTime, NaiveDate, SecondsFormat, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Manager,
    Engineer,
    Observer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Manager => "manager",
            Role::Engineer => "engineer",
            Role::Observer => "observer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unknown role never widens visibility; it is rejected as a policy error.
impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manager" => Ok(Role::Manager),
            "engineer" => Ok(Role::Engineer),
            "observer" => Ok(Role::Observer),
            other => Err(CoreError::Policy(format!("unrecognized role '{}'", other))),
        }
    }
}

/// Workflow status. Declaration order is the workflow order used for sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    New,
    InProgress,
    Review,
    Closed,
}

impl Status {
    pub const ALL: [Status; 4] = [Status::New, Status::InProgress, Status::Review, Status::Closed];

    /// Statuses in which a past due date makes a defect overdue.
    pub const OPEN: [Status; 2] = [Status::New, Status::InProgress];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::New => "new",
            Status::InProgress => "in_progress",
            Status::Review => "review",
            Status::Closed => "closed",
        }
    }

    pub fn is_open(&self) -> bool {
        Status::OPEN.contains(self)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                CoreError::validation(
                    "status",
                    format!(
                        "invalid status '{}'. Must be one of: new, in_progress, review, closed",
                        s
                    ),
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|priority| priority.as_str() == s)
            .ok_or_else(|| {
                CoreError::validation(
                    "priority",
                    format!("invalid priority '{}'. Must be one of: low, medium, high", s),
                )
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Stored verbatim; parsed into a [`Role`] when the user acts.
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub defects_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defect {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: Status,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub creator_id: i64,
    pub assignee_id: Option<i64>,
    pub project_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Defect {
    /// Derived at read time: past due and still new or in progress.
    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.due_date, Some(due) if due < now) && self.status.is_open()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub defect_id: i64,
    pub text: String,
    pub author_id: i64,
    pub author: String,
    pub author_role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub defect_id: i64,
    pub filename: String,
    pub original_name: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A defect joined with the names and counts the listing needs.
#[derive(Debug, Clone)]
pub struct DefectRow {
    pub defect: Defect,
    pub creator: String,
    pub assignee: Option<String>,
    pub project_name: String,
    pub comments_count: i64,
    pub attachments_count: i64,
}

impl DefectRow {
    pub fn into_item(self, now: DateTime<Utc>) -> DefectItem {
        let is_overdue = self.defect.is_overdue_at(now);
        DefectItem {
            defect: self.defect,
            creator: self.creator,
            assignee: self.assignee,
            project_name: self.project_name,
            comments_count: self.comments_count,
            attachments_count: self.attachments_count,
            is_overdue,
        }
    }
}

/// Serialized shape of one listed defect.
#[derive(Debug, Clone, Serialize)]
pub struct DefectItem {
    #[serde(flatten)]
    pub defect: Defect,
    pub creator: String,
    pub assignee: Option<String>,
    pub project_name: String,
    pub comments_count: i64,
    pub attachments_count: i64,
    pub is_overdue: bool,
}

#[derive(Debug, Clone)]
pub struct NewDefect {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub project_id: i64,
    pub creator_id: i64,
    pub assignee_id: Option<i64>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update. `None` leaves a field untouched; for the nullable fields
/// `Some(None)` clears the value.
#[derive(Debug, Clone, Default)]
pub struct DefectUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub assignee_id: Option<Option<i64>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl DefectUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.assignee_id.is_none()
            && self.due_date.is_none()
    }
}

/// Fixed-width UTC form so stored timestamps sort lexically.
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Drops sub-microsecond digits so in-process comparisons agree with
/// comparisons against stored timestamps.
pub fn to_stored_precision(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(dt.nanosecond() / 1_000 * 1_000).unwrap_or(dt)
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_due_date(input: &str) -> Result<DateTime<Utc>, CoreError> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            CoreError::validation(
                "due_date",
                format!("invalid date '{}'. Use YYYY-MM-DD or RFC 3339", input),
            )
        })
}
