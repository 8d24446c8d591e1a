use anyhow::{bail, Result};

use defectline::db::{Database, NewProject};
use defectline::models::{parse_due_date, Project, Role};
use defectline::Actor;

pub struct AddArgs<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub location: Option<&'a str>,
    pub start: Option<&'a str>,
    pub end: Option<&'a str>,
    pub inactive: bool,
}

pub fn add(db: &Database, actor: &Actor, args: &AddArgs<'_>) -> Result<i64> {
    if actor.role != Role::Manager {
        bail!("Access denied: only managers can create projects");
    }

    let id = db.create_project(&NewProject {
        name: args.name.trim().to_string(),
        description: args.description.map(str::to_string),
        location: args.location.map(str::to_string),
        start_date: args.start.map(parse_due_date).transpose()?,
        end_date: args.end.map(parse_due_date).transpose()?,
        is_active: !args.inactive,
    })?;
    println!("Created project #{}", id);
    Ok(id)
}

pub fn list(db: &Database, all: bool, json: bool) -> Result<Vec<Project>> {
    let projects = db.list_projects(!all)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&projects)?);
        return Ok(projects);
    }

    if projects.is_empty() {
        println!("No projects found.");
        return Ok(projects);
    }

    for p in &projects {
        let marker = if p.is_active { "" } else { " (inactive)" };
        println!(
            "#{:<4} {:<30} {:>4} defects{}",
            p.id,
            super::truncate(&p.name, 30),
            p.defects_count,
            marker
        );
    }
    Ok(projects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{assigned_defect, team};

    fn named(name: &str) -> AddArgs<'_> {
        AddArgs {
            name,
            description: None,
            location: Some("North site"),
            start: Some("2024-03-01"),
            end: None,
            inactive: false,
        }
    }

    #[test]
    fn test_manager_adds_project() {
        let t = team();
        let id = add(&t.db, &t.manager, &named("Tower B")).unwrap();
        let project = t.db.get_project(id).unwrap().unwrap();
        assert_eq!(project.location.as_deref(), Some("North site"));
        assert!(project.start_date.is_some());
    }

    #[test]
    fn test_engineer_cannot_add_project() {
        let t = team();
        assert!(add(&t.db, &t.engineer, &named("Tower B")).is_err());
    }

    #[test]
    fn test_list_hides_inactive_by_default() {
        let t = team();
        let mut args = named("Old site");
        args.inactive = true;
        add(&t.db, &t.manager, &args).unwrap();

        assert_eq!(list(&t.db, false, true).unwrap().len(), 1);
        assert_eq!(list(&t.db, true, true).unwrap().len(), 2);
    }

    #[test]
    fn test_list_reports_defect_counts() {
        let t = team();
        assigned_defect(&t, "One");
        assigned_defect(&t, "Two");
        let projects = list(&t.db, false, false).unwrap();
        assert_eq!(projects[0].defects_count, 2);
    }
}
