pub mod attach;
pub mod comment;
pub mod create;
pub mod delete;
pub mod export;
pub mod init;
pub mod list;
pub mod project;
pub mod show;
pub mod stats;
pub mod update;
pub mod user;

use anyhow::{bail, Result};
use defectline::check_visibility;
use defectline::db::Database;
use defectline::models::Defect;
use defectline::Actor;

/// Load a defect the actor is allowed to see. Hidden defects are reported
/// as access denied, missing ones as not found.
pub fn load_visible(db: &Database, actor: &Actor, id: i64) -> Result<Defect> {
    let defect = match db.get_defect(id)? {
        Some(d) => d,
        None => bail!("Defect #{} not found", id),
    };
    if !check_visibility(actor, &defect) {
        tracing::warn!(id, user_id = actor.user_id, role = %actor.role, "defect not visible");
        bail!("Access denied to defect #{}", id);
    }
    Ok(defect)
}

pub fn truncate(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars - 3).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
pub mod test_support {
    use defectline::db::{Database, NewProject};
    use defectline::models::{NewDefect, Priority, Role};
    use defectline::Actor;
    use tempfile::tempdir;

    pub struct Team {
        pub db: Database,
        pub _dir: tempfile::TempDir,
        pub manager: Actor,
        pub engineer: Actor,
        pub other_engineer: Actor,
        pub observer: Actor,
        pub project: i64,
    }

    pub fn setup_test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).unwrap();
        (db, dir)
    }

    pub fn team() -> Team {
        let (db, dir) = setup_test_db();
        let manager = db.create_user("m@site.test", "Max", "Orlov", Role::Manager).unwrap();
        let engineer = db.create_user("e@site.test", "Eva", "Popova", Role::Engineer).unwrap();
        let other = db.create_user("e2@site.test", "Ilya", "Frolov", Role::Engineer).unwrap();
        let observer = db.create_user("o@site.test", "Olga", "Zueva", Role::Observer).unwrap();
        let project = db
            .create_project(&NewProject {
                name: "Tower A".to_string(),
                is_active: true,
                ..NewProject::default()
            })
            .unwrap();
        Team {
            db,
            _dir: dir,
            manager: Actor::new(Role::Manager, manager),
            engineer: Actor::new(Role::Engineer, engineer),
            other_engineer: Actor::new(Role::Engineer, other),
            observer: Actor::new(Role::Observer, observer),
            project,
        }
    }

    /// Created by the manager, assigned to `team.engineer`.
    pub fn assigned_defect(team: &Team, title: &str) -> i64 {
        team.db
            .create_defect(&NewDefect {
                title: title.to_string(),
                description: "Found on walkthrough".to_string(),
                priority: Priority::Medium,
                project_id: team.project,
                creator_id: team.manager.user_id,
                assignee_id: Some(team.engineer.user_id),
                due_date: None,
            })
            .unwrap()
    }
}
