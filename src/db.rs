use chrono::{DateTime, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{CoreError, Result};
use crate::filter::{Clause, Predicate};
use crate::models::{
    format_timestamp, Attachment, Comment, Defect, DefectRow, DefectUpdate, NewDefect, Priority,
    Project, Role, Status, User,
};
use crate::sort::{SortField, SortSpec};
use crate::store::{DefectCounts, DefectStore, ProjectCounts};

const SCHEMA_VERSION: i32 = 1;

const DEFECT_COLUMNS: &str = "d.id, d.title, d.description, d.status, d.priority, d.due_date, \
     d.creator_id, d.assignee_id, d.project_id, d.created_at, d.updated_at";

const DEFECT_ROW_SELECT: &str = r#"
    SELECT d.id, d.title, d.description, d.status, d.priority, d.due_date,
           d.creator_id, d.assignee_id, d.project_id, d.created_at, d.updated_at,
           c.first_name || ' ' || c.last_name,
           a.first_name || ' ' || a.last_name,
           p.name,
           (SELECT COUNT(*) FROM comments cm WHERE cm.defect_id = d.id),
           (SELECT COUNT(*) FROM attachments at WHERE at.defect_id = d.id)
    FROM defects d
    JOIN users c ON c.id = d.creator_id
    LEFT JOIN users a ON a.id = d.assignee_id
    JOIN projects p ON p.id = d.project_id
"#;

#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.register_functions()?;
        db.init_schema()?;
        Ok(db)
    }

    /// `fold(text)` lowercases with full Unicode rules, which SQLite's own
    /// `lower()` does not.
    fn register_functions(&self) -> Result<()> {
        self.conn.create_scalar_function(
            "fold",
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let text: Option<String> = ctx.get(0)?;
                Ok(text.map(|t| t.to_lowercase()))
            },
        )?;
        Ok(())
    }

    fn init_schema(&self) -> Result<()> {
        let version: i32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version < SCHEMA_VERSION {
            self.conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    email TEXT NOT NULL UNIQUE,
                    first_name TEXT NOT NULL,
                    last_name TEXT NOT NULL,
                    role TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS projects (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    description TEXT,
                    location TEXT,
                    start_date TEXT,
                    end_date TEXT,
                    is_active INTEGER NOT NULL DEFAULT 1,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS defects (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL,
                    status TEXT NOT NULL DEFAULT 'new',
                    priority TEXT NOT NULL DEFAULT 'medium',
                    due_date TEXT,
                    creator_id INTEGER NOT NULL,
                    assignee_id INTEGER,
                    project_id INTEGER NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    FOREIGN KEY (creator_id) REFERENCES users(id),
                    FOREIGN KEY (assignee_id) REFERENCES users(id),
                    FOREIGN KEY (project_id) REFERENCES projects(id)
                );

                CREATE TABLE IF NOT EXISTS comments (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    defect_id INTEGER NOT NULL,
                    author_id INTEGER NOT NULL,
                    text TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    FOREIGN KEY (defect_id) REFERENCES defects(id) ON DELETE CASCADE,
                    FOREIGN KEY (author_id) REFERENCES users(id)
                );

                CREATE TABLE IF NOT EXISTS attachments (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    defect_id INTEGER NOT NULL,
                    filename TEXT NOT NULL,
                    original_name TEXT NOT NULL,
                    uploaded_at TEXT NOT NULL,
                    FOREIGN KEY (defect_id) REFERENCES defects(id) ON DELETE CASCADE
                );

                CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);
                CREATE INDEX IF NOT EXISTS idx_projects_active ON projects(is_active);
                CREATE INDEX IF NOT EXISTS idx_defects_status_priority ON defects(status, priority);
                CREATE INDEX IF NOT EXISTS idx_defects_project_status ON defects(project_id, status);
                CREATE INDEX IF NOT EXISTS idx_defects_assignee_status ON defects(assignee_id, status);
                CREATE INDEX IF NOT EXISTS idx_defects_due_status ON defects(due_date, status);
                CREATE INDEX IF NOT EXISTS idx_defects_creator ON defects(creator_id);
                CREATE INDEX IF NOT EXISTS idx_defects_created ON defects(created_at);
                CREATE INDEX IF NOT EXISTS idx_comments_defect ON comments(defect_id);
                CREATE INDEX IF NOT EXISTS idx_attachments_defect ON attachments(defect_id);
                "#,
            )?;

            self.conn
                .execute_batch(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))?;
            info!(version = SCHEMA_VERSION, "initialized defect schema");
        }

        self.conn.execute_batch("PRAGMA foreign_keys = ON")?;

        Ok(())
    }

    // Users
    pub fn create_user(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        role: Role,
    ) -> Result<i64> {
        if email.trim().is_empty() {
            return Err(CoreError::validation("email", "must not be empty"));
        }
        let now = format_timestamp(Utc::now());
        self.conn.execute(
            "INSERT INTO users (email, first_name, last_name, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![email, first_name, last_name, role.as_str(), now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, email, first_name, last_name, role, created_at FROM users WHERE id = ?1",
                [id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn list_users(&self, role: Option<Role>) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, email, first_name, last_name, role, created_at FROM users \
             WHERE ?1 IS NULL OR role = ?1 ORDER BY first_name, last_name, id",
        )?;
        let users = stmt
            .query_map([role.map(|r| r.as_str())], user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    // Projects
    pub fn create_project(&self, project: &NewProject) -> Result<i64> {
        if project.name.trim().is_empty() {
            return Err(CoreError::validation("name", "project name is required"));
        }
        let now = format_timestamp(Utc::now());
        self.conn.execute(
            "INSERT INTO projects (name, description, location, start_date, end_date, is_active, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                project.name,
                project.description,
                project.location,
                project.start_date.map(format_timestamp),
                project.end_date.map(format_timestamp),
                project.is_active,
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_project(&self, id: i64) -> Result<Option<Project>> {
        let project = self
            .conn
            .query_row(
                "SELECT p.id, p.name, p.description, p.location, p.start_date, p.end_date, p.is_active, p.created_at, \
                 (SELECT COUNT(*) FROM defects d WHERE d.project_id = p.id) \
                 FROM projects p WHERE p.id = ?1",
                [id],
                project_from_row,
            )
            .optional()?;
        Ok(project)
    }

    pub fn list_projects(&self, active_only: bool) -> Result<Vec<Project>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.id, p.name, p.description, p.location, p.start_date, p.end_date, p.is_active, p.created_at, \
             (SELECT COUNT(*) FROM defects d WHERE d.project_id = p.id) \
             FROM projects p WHERE ?1 = 0 OR p.is_active = 1 ORDER BY p.name, p.id",
        )?;
        let projects = stmt
            .query_map([active_only], project_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(projects)
    }

    // Defect CRUD
    pub fn create_defect(&self, defect: &NewDefect) -> Result<i64> {
        self.create_defect_at(defect, Utc::now())
    }

    pub fn create_defect_at(&self, defect: &NewDefect, now: DateTime<Utc>) -> Result<i64> {
        if defect.title.trim().is_empty() {
            return Err(CoreError::validation("title", "title is required"));
        }
        if defect.description.trim().is_empty() {
            return Err(CoreError::validation("description", "description is required"));
        }
        if !self.exists("projects", defect.project_id)? {
            return Err(CoreError::validation(
                "project_id",
                format!("project #{} not found", defect.project_id),
            ));
        }
        if !self.exists("users", defect.creator_id)? {
            return Err(CoreError::validation(
                "creator_id",
                format!("user #{} not found", defect.creator_id),
            ));
        }
        if let Some(assignee) = defect.assignee_id {
            if !self.exists("users", assignee)? {
                return Err(CoreError::validation(
                    "assignee_id",
                    format!("user #{} not found", assignee),
                ));
            }
        }

        let now = format_timestamp(now);
        self.conn.execute(
            "INSERT INTO defects (title, description, status, priority, due_date, creator_id, assignee_id, project_id, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                defect.title,
                defect.description,
                Status::New,
                defect.priority,
                defect.due_date.map(format_timestamp),
                defect.creator_id,
                defect.assignee_id,
                defect.project_id,
                now
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, project_id = defect.project_id, "created defect");
        Ok(id)
    }

    pub fn get_defect(&self, id: i64) -> Result<Option<Defect>> {
        let sql = format!("SELECT {} FROM defects d WHERE d.id = ?1", DEFECT_COLUMNS);
        let defect = self
            .conn
            .query_row(&sql, [id], |row| defect_from_row(row))
            .optional()?;
        Ok(defect)
    }

    pub fn get_defect_row(&self, id: i64) -> Result<Option<DefectRow>> {
        let sql = format!("{} WHERE d.id = ?1", DEFECT_ROW_SELECT);
        let row = self
            .conn
            .query_row(&sql, [id], defect_row_from_row)
            .optional()?;
        Ok(row)
    }

    pub fn update_defect(&self, id: i64, update: &DefectUpdate) -> Result<bool> {
        self.update_defect_at(id, update, Utc::now())
    }

    /// Applies the changes and bumps `updated_at` in one statement.
    /// `updated_at` never moves behind `created_at`.
    pub fn update_defect_at(
        &self,
        id: i64,
        update: &DefectUpdate,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        if let Some(title) = &update.title {
            if title.trim().is_empty() {
                return Err(CoreError::validation("title", "title must not be empty"));
            }
        }
        if let Some(description) = &update.description {
            if description.trim().is_empty() {
                return Err(CoreError::validation("description", "description must not be empty"));
            }
        }
        if let Some(Some(assignee)) = update.assignee_id {
            if !self.exists("users", assignee)? {
                return Err(CoreError::validation(
                    "assignee_id",
                    format!("user #{} not found", assignee),
                ));
            }
        }

        let mut updates = vec!["updated_at = MAX(?1, created_at)".to_string()];
        let mut params_vec: Vec<Box<dyn ToSql>> = vec![Box::new(format_timestamp(now))];

        if let Some(title) = &update.title {
            updates.push(format!("title = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(title.clone()));
        }
        if let Some(description) = &update.description {
            updates.push(format!("description = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(description.clone()));
        }
        if let Some(priority) = update.priority {
            updates.push(format!("priority = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(priority));
        }
        if let Some(status) = update.status {
            updates.push(format!("status = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(status));
        }
        if let Some(assignee) = update.assignee_id {
            updates.push(format!("assignee_id = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(assignee));
        }
        if let Some(due_date) = update.due_date {
            updates.push(format!("due_date = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(due_date.map(format_timestamp)));
        }

        params_vec.push(Box::new(id));
        let sql = format!(
            "UPDATE defects SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len()
        );

        let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let rows = self.conn.execute(&sql, params_refs.as_slice())?;
        debug!(id, changed = rows > 0, "updated defect");
        Ok(rows > 0)
    }

    /// Comments and attachments go with it.
    pub fn delete_defect(&self, id: i64) -> Result<bool> {
        let rows = self.conn.execute("DELETE FROM defects WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    // Comments
    pub fn add_comment(&self, defect_id: i64, author_id: i64, text: &str) -> Result<i64> {
        if text.trim().is_empty() {
            return Err(CoreError::validation("text", "comment text is required"));
        }
        let now = format_timestamp(Utc::now());
        self.conn.execute(
            "INSERT INTO comments (defect_id, author_id, text, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![defect_id, author_id, text, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_comments(&self, defect_id: i64) -> Result<Vec<Comment>> {
        let mut stmt = self.conn.prepare(
            "SELECT cm.id, cm.defect_id, cm.text, cm.author_id, u.first_name || ' ' || u.last_name, u.role, cm.created_at \
             FROM comments cm JOIN users u ON u.id = cm.author_id \
             WHERE cm.defect_id = ?1 ORDER BY cm.created_at, cm.id",
        )?;
        let comments = stmt
            .query_map([defect_id], |row| {
                Ok(Comment {
                    id: row.get(0)?,
                    defect_id: row.get(1)?,
                    text: row.get(2)?,
                    author_id: row.get(3)?,
                    author: row.get(4)?,
                    author_role: row.get(5)?,
                    created_at: timestamp(row, 6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    // Attachments (metadata only)
    pub fn add_attachment(&self, defect_id: i64, filename: &str, original_name: &str) -> Result<i64> {
        if filename.trim().is_empty() {
            return Err(CoreError::validation("filename", "filename is required"));
        }
        let now = format_timestamp(Utc::now());
        self.conn.execute(
            "INSERT INTO attachments (defect_id, filename, original_name, uploaded_at) VALUES (?1, ?2, ?3, ?4)",
            params![defect_id, filename, original_name, now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_attachments(&self, defect_id: i64) -> Result<Vec<Attachment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, defect_id, filename, original_name, uploaded_at FROM attachments \
             WHERE defect_id = ?1 ORDER BY uploaded_at, id",
        )?;
        let attachments = stmt
            .query_map([defect_id], |row| {
                Ok(Attachment {
                    id: row.get(0)?,
                    defect_id: row.get(1)?,
                    filename: row.get(2)?,
                    original_name: row.get(3)?,
                    uploaded_at: timestamp(row, 4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(attachments)
    }

    fn exists(&self, table: &'static str, id: i64) -> Result<bool> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", table);
        let found: bool = self.conn.query_row(&sql, [id], |row| row.get(0))?;
        Ok(found)
    }
}

impl DefectStore for Database {
    fn query(
        &self,
        predicate: &Predicate,
        sort: SortSpec,
        offset: u64,
        limit: u64,
        now: DateTime<Utc>,
    ) -> Result<(Vec<DefectRow>, u64)> {
        let (where_sql, where_params) = render_predicate(predicate, now);

        // Count and page come from the same snapshot.
        let tx = self.conn.unchecked_transaction()?;

        let total: i64 = tx.query_row(
            &format!("SELECT COUNT(*) FROM defects d WHERE {}", where_sql),
            params_from_iter(where_params.iter()),
            |row| row.get(0),
        )?;

        let sql = format!(
            "{} WHERE {} ORDER BY {} {}, d.id ASC LIMIT ? OFFSET ?",
            DEFECT_ROW_SELECT,
            where_sql,
            order_expression(sort.field),
            sort.direction
        );
        let mut page_params = where_params;
        page_params.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        page_params.push(Value::Integer(i64::try_from(offset).unwrap_or(i64::MAX)));

        let rows = {
            let mut stmt = tx.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(page_params.iter()), defect_row_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };
        tx.commit()?;

        Ok((rows, total.max(0) as u64))
    }

    fn aggregate_counts(&self, predicate: &Predicate, now: DateTime<Utc>) -> Result<DefectCounts> {
        let (where_sql, where_params) = render_predicate(predicate, now);
        let sql = format!(
            "SELECT COUNT(*), \
             COALESCE(SUM(CASE WHEN d.status = '{in_progress}' THEN 1 ELSE 0 END), 0), \
             COALESCE(SUM(CASE WHEN {overdue} THEN 1 ELSE 0 END), 0), \
             COALESCE(SUM(CASE WHEN d.status = '{review}' THEN 1 ELSE 0 END), 0), \
             COALESCE(SUM(CASE WHEN d.priority = '{high}' THEN 1 ELSE 0 END), 0), \
             COALESCE(SUM(CASE WHEN d.status = '{closed}' THEN 1 ELSE 0 END), 0) \
             FROM defects d WHERE {where_sql}",
            in_progress = Status::InProgress,
            overdue = overdue_sql(),
            review = Status::Review,
            high = Priority::High,
            closed = Status::Closed,
            where_sql = where_sql,
        );

        let mut all_params = vec![Value::Text(format_timestamp(now))];
        all_params.extend(where_params);

        let counts = self
            .conn
            .query_row(&sql, params_from_iter(all_params.iter()), |row| {
                Ok(DefectCounts {
                    total_defects: count(row, 0)?,
                    in_progress: count(row, 1)?,
                    overdue: count(row, 2)?,
                    in_review: count(row, 3)?,
                    high_priority: count(row, 4)?,
                    closed: count(row, 5)?,
                })
            })?;
        Ok(counts)
    }

    fn aggregate_by_project(
        &self,
        predicate: &Predicate,
        now: DateTime<Utc>,
    ) -> Result<Vec<ProjectCounts>> {
        let (where_sql, where_params) = render_predicate(predicate, now);
        // Predicate lives in the join condition so empty projects survive.
        let sql = format!(
            "SELECT p.id, p.name, COUNT(d.id), \
             COALESCE(SUM(CASE WHEN d.status = '{in_progress}' THEN 1 ELSE 0 END), 0), \
             COALESCE(SUM(CASE WHEN d.status = '{closed}' THEN 1 ELSE 0 END), 0) \
             FROM projects p LEFT JOIN defects d ON d.project_id = p.id AND ({where_sql}) \
             GROUP BY p.id, p.name ORDER BY p.id",
            in_progress = Status::InProgress,
            closed = Status::Closed,
            where_sql = where_sql,
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let projects = stmt
            .query_map(params_from_iter(where_params.iter()), |row| {
                Ok(ProjectCounts {
                    project_id: row.get(0)?,
                    project_name: row.get(1)?,
                    total_defects: count(row, 2)?,
                    in_progress: count(row, 3)?,
                    closed: count(row, 4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(projects)
    }
}

/// Render a predicate as a SQL condition over alias `d`, with positional
/// parameters in textual order.
fn render_predicate(predicate: &Predicate, now: DateTime<Utc>) -> (String, Vec<Value>) {
    let mut conditions = Vec::new();
    let mut params = Vec::new();

    for clause in predicate.clauses() {
        match clause {
            Clause::Status(status) => {
                conditions.push("d.status = ?".to_string());
                params.push(Value::Text(status.as_str().to_string()));
            }
            Clause::StatusIn(statuses) => {
                if statuses.is_empty() {
                    conditions.push("0".to_string());
                    continue;
                }
                let marks = vec!["?"; statuses.len()].join(", ");
                conditions.push(format!("d.status IN ({})", marks));
                params.extend(statuses.iter().map(|s| Value::Text(s.as_str().to_string())));
            }
            Clause::Priority(priority) => {
                conditions.push("d.priority = ?".to_string());
                params.push(Value::Text(priority.as_str().to_string()));
            }
            Clause::Project(id) => {
                conditions.push("d.project_id = ?".to_string());
                params.push(Value::Integer(*id));
            }
            Clause::Assignee(id) => {
                conditions.push("d.assignee_id = ?".to_string());
                params.push(Value::Integer(*id));
            }
            Clause::InvolvesUser(id) => {
                conditions.push("(d.assignee_id = ? OR d.creator_id = ?)".to_string());
                params.push(Value::Integer(*id));
                params.push(Value::Integer(*id));
            }
            Clause::Search(term) => {
                conditions.push(
                    "(instr(fold(d.title), ?) > 0 OR instr(fold(d.description), ?) > 0)"
                        .to_string(),
                );
                params.push(Value::Text(term.clone()));
                params.push(Value::Text(term.clone()));
            }
            Clause::Overdue => {
                conditions.push(overdue_sql());
                params.push(Value::Text(format_timestamp(now)));
            }
        }
    }

    if conditions.is_empty() {
        ("1".to_string(), params)
    } else {
        (conditions.join(" AND "), params)
    }
}

/// Overdue condition with a single `?` for the request's `now`.
fn overdue_sql() -> String {
    let open = Status::OPEN
        .iter()
        .map(|s| format!("'{}'", s))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "(d.due_date IS NOT NULL AND d.due_date < ? AND d.status IN ({}))",
        open
    )
}

/// Priority and status sort by rank, not alphabetically.
fn order_expression(field: SortField) -> String {
    match field {
        SortField::DueDate => "d.due_date".to_string(),
        SortField::Priority => rank_case("d.priority", Priority::ALL.iter().map(|p| p.as_str())),
        SortField::Status => rank_case("d.status", Status::ALL.iter().map(|s| s.as_str())),
        SortField::Title => "fold(d.title)".to_string(),
        SortField::CreatedAt => "d.created_at".to_string(),
        SortField::UpdatedAt => "d.updated_at".to_string(),
    }
}

fn rank_case<'a>(column: &str, values: impl Iterator<Item = &'a str>) -> String {
    let arms: Vec<String> = values
        .enumerate()
        .map(|(rank, value)| format!("WHEN '{}' THEN {}", value, rank + 1))
        .collect();
    format!("CASE {} {} ELSE 0 END", column, arms.join(" "))
}

impl ToSql for Status {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Status {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: CoreError| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for Priority {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Priority {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: CoreError| FromSqlError::Other(Box::new(e)))
    }
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_datetime(idx, &raw)
}

fn optional_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<String>>(idx)?
        .map(|raw| parse_datetime(idx, &raw))
        .transpose()
}

fn parse_datetime(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn count(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let n: i64 = row.get(idx)?;
    Ok(n.max(0) as u64)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        role: row.get(4)?,
        created_at: timestamp(row, 5)?,
    })
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        location: row.get(3)?,
        start_date: optional_timestamp(row, 4)?,
        end_date: optional_timestamp(row, 5)?,
        is_active: row.get(6)?,
        created_at: timestamp(row, 7)?,
        defects_count: row.get(8)?,
    })
}

fn defect_from_row(row: &Row<'_>) -> rusqlite::Result<Defect> {
    Ok(Defect {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
        priority: row.get(4)?,
        due_date: optional_timestamp(row, 5)?,
        creator_id: row.get(6)?,
        assignee_id: row.get(7)?,
        project_id: row.get(8)?,
        created_at: timestamp(row, 9)?,
        updated_at: timestamp(row, 10)?,
    })
}

fn defect_row_from_row(row: &Row<'_>) -> rusqlite::Result<DefectRow> {
    Ok(DefectRow {
        defect: defect_from_row(row)?,
        creator: row.get(11)?,
        assignee: row.get(12)?,
        project_name: row.get(13)?,
        comments_count: row.get(14)?,
        attachments_count: row.get(15)?,
    })
}
